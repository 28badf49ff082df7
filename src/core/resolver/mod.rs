//! Maps a transformation name to the ordered stylesheet files it applies.

use crate::core::catalog::{TransformationCatalog, NONE_TRANSFORMATION};
use crate::core::error::TransformError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolves a transformation name to absolute stylesheet paths.
///
/// Implementations must validate every path before returning so that a
/// misconfigured pipeline fails before any engine process is spawned.
pub trait StylesheetResolver: Send + Sync + 'static {
    fn resolve(&self, transformation: &str) -> Result<Vec<PathBuf>, TransformError>;
}

/// Resolves from the files listed in the catalog, in listed order.
pub struct CatalogResolver {
    catalog: Arc<TransformationCatalog>,
    stylesheets_dir: PathBuf,
}

impl CatalogResolver {
    pub fn new(catalog: Arc<TransformationCatalog>, stylesheets_dir: PathBuf) -> Self {
        Self {
            catalog,
            stylesheets_dir: absolutize(stylesheets_dir),
        }
    }
}

impl StylesheetResolver for CatalogResolver {
    fn resolve(&self, transformation: &str) -> Result<Vec<PathBuf>, TransformError> {
        let spec = self
            .catalog
            .get(transformation)
            .ok_or_else(|| TransformError::UnknownTransformation(transformation.to_string()))?;

        if spec.is_passthrough() {
            return Ok(Vec::new());
        }
        if spec.steps.is_empty() {
            return Err(TransformError::EmptyStepList(transformation.to_string()));
        }

        // Checked on every call: stylesheets may be replaced between requests.
        spec.steps
            .iter()
            .map(|step| {
                let path = self.stylesheets_dir.join(&step.filename);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(TransformError::StylesheetNotFound {
                        transformation: transformation.to_string(),
                        stylesheet: step.filename.clone(),
                    })
                }
            })
            .collect()
    }
}

/// Legacy discovery: every `*.xsl` / `*.xslt` file directly inside
/// `<stylesheets_dir>/<transformation>/`, applied in lexicographic filename
/// order (so `01-clean.xsl` runs before `02-map.xsl`).
pub struct DirectoryResolver {
    stylesheets_dir: PathBuf,
}

impl DirectoryResolver {
    pub fn new(stylesheets_dir: PathBuf) -> Self {
        Self {
            stylesheets_dir: absolutize(stylesheets_dir),
        }
    }
}

impl StylesheetResolver for DirectoryResolver {
    fn resolve(&self, transformation: &str) -> Result<Vec<PathBuf>, TransformError> {
        if transformation == NONE_TRANSFORMATION {
            return Ok(Vec::new());
        }
        if transformation.contains(['/', '\\']) || transformation.starts_with('.') {
            return Err(TransformError::UnknownTransformation(
                transformation.to_string(),
            ));
        }

        let dir = self.stylesheets_dir.join(transformation);
        if !dir.is_dir() {
            return Err(TransformError::UnknownTransformation(
                transformation.to_string(),
            ));
        }

        let entries = fs::read_dir(&dir).map_err(|err| {
            TransformError::io(format!("failed to list {}", dir.display()), err)
        })?;
        let mut stylesheets: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_stylesheet(path))
            .collect();
        stylesheets.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        if stylesheets.is_empty() {
            return Err(TransformError::EmptyStepList(transformation.to_string()));
        }
        Ok(stylesheets)
    }
}

fn is_stylesheet(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("xsl") | Some("xslt")
    )
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    std::path::absolute(&path).unwrap_or(path)
}
