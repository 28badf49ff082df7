use crate::core::catalog::Operation;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

/// Main configuration loaded from xmlbridge.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Directory the configured stylesheet filenames are resolved against
    #[serde(default = "default_stylesheets_dir")]
    pub stylesheets_dir: PathBuf,

    /// Directory receiving intermediate and final artifacts (default: system temp dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    /// Stylesheet discovery strategy
    #[serde(default)]
    pub resolver: ResolverKind,

    /// External XSLT engine invocation
    #[serde(default)]
    pub engine: EngineConfig,

    /// Named transformations, in file order
    #[serde(default)]
    pub transformation: IndexMap<String, TransformationEntry>,
}

/// How a transformation name maps to stylesheet files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Files listed under `[transformation.<name>]`, in listed order.
    #[default]
    Catalog,
    /// Every `*.xsl`/`*.xslt` under `<stylesheets_dir>/<name>/`, sorted by filename.
    Directory,
}

/// External engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Executable to launch
    #[serde(default = "default_engine_program")]
    pub program: String,

    /// Arguments placed before the source/stylesheet/output triple
    #[serde(default = "default_engine_args")]
    pub args: Vec<String>,

    #[serde(default = "default_source_prefix")]
    pub source_prefix: String,

    #[serde(default = "default_stylesheet_prefix")]
    pub stylesheet_prefix: String,

    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Per-stylesheet time budget in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// One `[transformation.<name>]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationEntry {
    /// Human-readable label shown to callers
    pub label: String,

    /// Direction of the conversion relative to the hosting system
    #[serde(default)]
    pub operation: Operation,

    /// Stylesheet filenames applied in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Default functions
fn default_stylesheets_dir() -> PathBuf {
    PathBuf::from("resources/stylesheets")
}

fn default_engine_program() -> String {
    "java".to_string()
}

fn default_engine_args() -> Vec<String> {
    vec![
        "-jar".to_string(),
        "resources/scripts/saxon-he-10.6.jar".to_string(),
    ]
}

fn default_source_prefix() -> String {
    "-s:".to_string()
}

fn default_stylesheet_prefix() -> String {
    "-xsl:".to_string()
}

fn default_output_prefix() -> String {
    "-o:".to_string()
}

pub(crate) fn default_timeout_secs() -> u64 {
    300
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            stylesheets_dir: default_stylesheets_dir(),
            work_dir: None,
            resolver: ResolverKind::default(),
            engine: EngineConfig::default(),
            transformation: IndexMap::new(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            program: default_engine_program(),
            args: default_engine_args(),
            source_prefix: default_source_prefix(),
            stylesheet_prefix: default_stylesheet_prefix(),
            output_prefix: default_output_prefix(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
