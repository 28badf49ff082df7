//! Files created on behalf of a single pipeline run.

use crate::core::error::TransformError;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Handle to one artifact slot of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactId(usize);

/// Owns every artifact a run allocates.
///
/// Names are `<transformation>_<uuid>.xml` and are reserved on disk at
/// allocation, so concurrent runs never share a path. Anything still owned
/// when the set is dropped is removed, which covers early returns and
/// cancelled runs alike.
pub struct RunArtifacts {
    work_dir: PathBuf,
    prefix: String,
    slots: Vec<Option<PathBuf>>,
}

impl RunArtifacts {
    pub fn new(work_dir: &Path, transformation: &str) -> Result<Self, TransformError> {
        fs::create_dir_all(work_dir).map_err(|err| {
            TransformError::io(
                format!("failed to create work directory {}", work_dir.display()),
                err,
            )
        })?;
        Ok(Self {
            work_dir: work_dir.to_path_buf(),
            prefix: sanitize_prefix(transformation),
            slots: Vec::new(),
        })
    }

    /// Reserve a fresh, empty artifact file.
    pub fn allocate(&mut self) -> Result<ArtifactId, TransformError> {
        loop {
            let candidate = self
                .work_dir
                .join(format!("{}_{}.xml", self.prefix, Uuid::new_v4().simple()));
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
            {
                Ok(_) => {
                    self.slots.push(Some(candidate));
                    return Ok(ArtifactId(self.slots.len() - 1));
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    return Err(TransformError::io(
                        format!("failed to create artifact {}", candidate.display()),
                        err,
                    ))
                }
            }
        }
    }

    /// Path of a still-owned artifact.
    pub fn path(&self, id: ArtifactId) -> &Path {
        self.slots
            .get(id.0)
            .and_then(Option::as_deref)
            .unwrap_or_else(|| Path::new(""))
    }

    /// Delete an artifact now; a failed delete is logged, not raised.
    pub fn discard(&mut self, id: ArtifactId) {
        if let Some(path) = self.slots.get_mut(id.0).and_then(Option::take) {
            remove_best_effort(&path);
        }
    }

    /// Hand an artifact over to the caller; it is no longer cleaned up.
    pub fn persist(&mut self, id: ArtifactId) -> Option<PathBuf> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }

    /// Number of artifacts still owned by the run.
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Best-effort removal of everything still owned.
    pub fn release_all(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(path) = slot.take() {
                remove_best_effort(&path);
            }
        }
    }
}

impl Drop for RunArtifacts {
    fn drop(&mut self) {
        self.release_all();
    }
}

fn remove_best_effort(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::trace!(path = %path.display(), "removed artifact"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(
            path = %path.display(),
            error = %err,
            "failed to remove intermediate artifact"
        ),
    }
}

fn sanitize_prefix(transformation: &str) -> String {
    let cleaned: String = transformation
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "xmlbridge".to_string()
    } else {
        cleaned
    }
}
