//! Runs a named transformation end to end.

use crate::core::artifacts::{ArtifactId, RunArtifacts};
use crate::core::canonical;
use crate::core::catalog::TransformationCatalog;
use crate::core::config::{BridgeConfig, ResolverKind};
use crate::core::engine::{CommandProcessor, ProcessInvocation, XsltProcessor};
use crate::core::error::TransformError;
use crate::core::resolver::{CatalogResolver, DirectoryResolver, StylesheetResolver};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// Settings fixed for the lifetime of a [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory receiving intermediate and final artifacts.
    pub work_dir: PathBuf,
    /// Time budget for each stylesheet application.
    pub timeout: Duration,
}

impl Settings {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Settings {
            work_dir: config
                .work_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            timeout: config.engine.timeout(),
        }
    }

    /// Same settings with a different per-step timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Progress of a single run, as reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Resolving,
    Stepping { step: usize, of: usize },
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Resolving => write!(f, "resolving"),
            RunState::Stepping { step, of } => write!(f, "stepping {}/{}", step, of),
            RunState::Finalizing => write!(f, "finalizing"),
            RunState::Done => write!(f, "done"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// Chains stylesheet applications and produces one canonical XML file.
///
/// A pipeline is cheap to clone and shares nothing mutable between runs, so
/// any number of [`Pipeline::transform`] futures may be polled concurrently.
#[derive(Clone)]
pub struct Pipeline {
    catalog: Arc<TransformationCatalog>,
    resolver: Arc<dyn StylesheetResolver>,
    processor: Arc<dyn XsltProcessor>,
    settings: Settings,
}

impl Pipeline {
    pub fn new(
        catalog: Arc<TransformationCatalog>,
        resolver: Arc<dyn StylesheetResolver>,
        processor: Arc<dyn XsltProcessor>,
        settings: Settings,
    ) -> Self {
        Pipeline {
            catalog,
            resolver,
            processor,
            settings,
        }
    }

    /// Wire the catalog, the configured resolver and the command-line engine.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::from_config_with_settings(config, Settings::from_config(config))
    }

    /// Like [`Pipeline::from_config`], with run settings chosen by the caller.
    pub fn from_config_with_settings(config: &BridgeConfig, settings: Settings) -> Self {
        let catalog = Arc::new(TransformationCatalog::from_config(config));
        let resolver: Arc<dyn StylesheetResolver> = match config.resolver {
            ResolverKind::Catalog => Arc::new(CatalogResolver::new(
                Arc::clone(&catalog),
                config.stylesheets_dir.clone(),
            )),
            ResolverKind::Directory => {
                Arc::new(DirectoryResolver::new(config.stylesheets_dir.clone()))
            }
        };
        let processor = Arc::new(CommandProcessor::new(&config.engine));
        Pipeline::new(catalog, resolver, processor, settings)
    }

    pub fn catalog(&self) -> &TransformationCatalog {
        &self.catalog
    }

    pub fn resolver(&self) -> &dyn StylesheetResolver {
        self.resolver.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Apply `transformation` to the document at `input`.
    ///
    /// Returns the path of a new canonical XML file in the work directory; the
    /// caller owns it. The input file is never modified. On failure every
    /// artifact created by this run has been removed.
    pub async fn transform(
        &self,
        input: &Path,
        transformation: &str,
    ) -> Result<PathBuf, TransformError> {
        let run_id = Uuid::new_v4().simple().to_string();
        let span = tracing::info_span!(
            "transform",
            transformation = %transformation,
            run_id = %run_id
        );

        async {
            let start = Instant::now();
            match self.execute(input, transformation).await {
                Ok(result) => {
                    tracing::info!(
                        state = %RunState::Done,
                        output = %result.display(),
                        duration_ms = start.elapsed().as_millis() as u64,
                        "transformation completed"
                    );
                    Ok(result)
                }
                Err(err) => {
                    tracing::warn!(
                        state = %RunState::Failed,
                        code = err.code(),
                        error = %err,
                        "transformation failed"
                    );
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, input: &Path, transformation: &str) -> Result<PathBuf, TransformError> {
        tracing::debug!(state = %RunState::Resolving, input = %input.display(), "resolving");
        if !input.is_file() {
            return Err(TransformError::InputNotFound(input.to_path_buf()));
        }
        let stylesheets = self.resolver.resolve(transformation)?;

        let mut artifacts = RunArtifacts::new(&self.settings.work_dir, transformation)?;

        let candidate = if stylesheets.is_empty() {
            let copy = artifacts.allocate()?;
            fs::copy(input, artifacts.path(copy)).map_err(|err| {
                TransformError::io(
                    format!(
                        "failed to copy {} into {}",
                        input.display(),
                        artifacts.path(copy).display()
                    ),
                    err,
                )
            })?;
            copy
        } else {
            self.run_steps(&mut artifacts, input, &stylesheets).await?
        };

        tracing::debug!(state = %RunState::Finalizing, "canonicalizing result");
        canonical::canonicalize_file(artifacts.path(candidate))?;

        artifacts
            .persist(candidate)
            .ok_or_else(|| TransformError::Io {
                context: "final artifact was released before it could be returned".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }

    /// Run every stylesheet in order, keeping at most two artifacts alive.
    async fn run_steps(
        &self,
        artifacts: &mut RunArtifacts,
        input: &Path,
        stylesheets: &[PathBuf],
    ) -> Result<ArtifactId, TransformError> {
        let total = stylesheets.len();
        let mut previous: Option<ArtifactId> = None;

        for (index, stylesheet) in stylesheets.iter().enumerate() {
            let output = artifacts.allocate()?;
            let source = match previous {
                Some(id) => artifacts.path(id).to_path_buf(),
                None => input.to_path_buf(),
            };
            let invocation = ProcessInvocation {
                input: source,
                stylesheet: stylesheet.clone(),
                output: artifacts.path(output).to_path_buf(),
                timeout: self.settings.timeout,
            };

            let state = RunState::Stepping {
                step: index + 1,
                of: total,
            };
            tracing::debug!(
                state = %state,
                stylesheet = %stylesheet.display(),
                "applying stylesheet"
            );
            self.processor.run(&invocation).await?;

            if let Some(id) = previous.take() {
                artifacts.discard(id);
            }
            previous = Some(output);
        }

        previous.ok_or_else(|| TransformError::EmptyStepList(String::new()))
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("transformations", &self.catalog.len())
            .field("settings", &self.settings)
            .finish()
    }
}
