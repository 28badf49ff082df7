use std::path::PathBuf;
use std::time::Duration;

/// Errors raised while resolving or executing a transformation pipeline.
///
/// Every variant reaches the caller of [`crate::core::Pipeline::transform`]
/// unchanged; nothing is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Transformation type '{0}' is not configured.")]
    UnknownTransformation(String),

    #[error("Transformation '{0}' does not have a listed set of files.")]
    EmptyStepList(String),

    #[error("Stylesheet file '{stylesheet}' not found.")]
    StylesheetNotFound {
        transformation: String,
        stylesheet: String,
    },

    #[error("Input document {} not found or unreadable", .0.display())]
    InputNotFound(PathBuf),

    /// Carries the engine's error stream verbatim.
    #[error("{stderr}")]
    TransformationFailed {
        stylesheet: PathBuf,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error(
        "Transformation with {} exceeded {}",
        .stylesheet.display(),
        format_timeout(.timeout)
    )]
    TransformationTimeout {
        stylesheet: PathBuf,
        timeout: Duration,
    },

    #[error("failed to launch XSLT engine '{program}': {source}")]
    EngineUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not well-formed XML: {reason}", .path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

fn format_timeout(timeout: &Duration) -> String {
    humantime::format_duration(*timeout).to_string()
}

impl TransformError {
    pub fn io<C: Into<String>>(context: C, source: std::io::Error) -> Self {
        TransformError::Io {
            context: context.into(),
            source,
        }
    }

    /// Stable diagnostic code, suitable for log correlation.
    pub fn code(&self) -> &'static str {
        match self {
            TransformError::UnknownTransformation(_) => "XB-RES-001",
            TransformError::EmptyStepList(_) => "XB-RES-002",
            TransformError::StylesheetNotFound { .. } => "XB-RES-003",
            TransformError::InputNotFound(_) => "XB-RUN-001",
            TransformError::TransformationFailed { .. } => "XB-ENG-001",
            TransformError::TransformationTimeout { .. } => "XB-ENG-002",
            TransformError::EngineUnavailable { .. } => "XB-ENG-003",
            TransformError::MalformedDocument { .. } => "XB-FMT-001",
            TransformError::Io { .. } => "XB-IO-001",
        }
    }

    /// True when the failure comes from the deployed configuration rather than
    /// from the document being transformed.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            TransformError::UnknownTransformation(_)
                | TransformError::EmptyStepList(_)
                | TransformError::StylesheetNotFound { .. }
                | TransformError::EngineUnavailable { .. }
        )
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
