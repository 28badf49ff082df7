use super::BridgeConfig;
use crate::core::error::ConfigError;
use std::env;
use std::path::{Path, PathBuf};

/// Default configuration filename looked up in a directory.
pub const CONFIG_FILE_NAME: &str = "xmlbridge.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from `dir/xmlbridge.toml`.
    /// Environment variables override config file values.
    /// A missing file yields defaults plus env overrides.
    pub fn load_from_dir(dir: &Path) -> Result<BridgeConfig, ConfigError> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        let mut config = Self::load_from_file(&config_path)?.unwrap_or_default();
        Self::resolve_relative_paths(&mut config, dir);
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Load config from an explicit path; the file must exist.
    pub fn load_from_path(path: &Path) -> Result<BridgeConfig, ConfigError> {
        let mut config = Self::load_from_file(path)?.ok_or_else(|| ConfigError::Read {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
        })?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::resolve_relative_paths(&mut config, &base);
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Load config from specific file path.
    /// Returns Ok(None) if file doesn't exist.
    pub fn load_from_file(path: &Path) -> Result<Option<BridgeConfig>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: BridgeConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Some(config))
    }

    /// Relative directories in the file are anchored at the file's directory
    /// so the process working directory does not matter.
    fn resolve_relative_paths(config: &mut BridgeConfig, base: &Path) {
        if config.stylesheets_dir.is_relative() {
            config.stylesheets_dir = base.join(&config.stylesheets_dir);
        }
        if let Some(work_dir) = config.work_dir.as_mut() {
            if work_dir.is_relative() {
                *work_dir = base.join(&*work_dir);
            }
        }

        // Engine files (a jar, a wrapper script) are anchored only when they
        // exist next to the config; bare names stay on PATH lookup.
        let program = Path::new(&config.engine.program);
        if program.components().count() > 1 {
            if let Some(anchored) = anchor_existing(base, &config.engine.program) {
                config.engine.program = anchored;
            }
        }
        for arg in config.engine.args.iter_mut() {
            if arg.starts_with('-') {
                continue;
            }
            if let Some(anchored) = anchor_existing(base, arg) {
                *arg = anchored;
            }
        }
    }

    /// Apply environment variable overrides to the configuration.
    /// Environment variables take precedence over config file values.
    fn apply_env_overrides(config: &mut BridgeConfig) {
        if let Ok(dir) = env::var("XMLBRIDGE_STYLESHEETS_DIR") {
            config.stylesheets_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = env::var("XMLBRIDGE_WORK_DIR") {
            config.work_dir = Some(PathBuf::from(dir));
        }

        if let Ok(program) = env::var("XMLBRIDGE_ENGINE_PROGRAM") {
            config.engine.program = program;
        }

        if let Ok(timeout_str) = env::var("XMLBRIDGE_ENGINE_TIMEOUT_SECS") {
            if let Ok(timeout_secs) = timeout_str.parse::<u64>() {
                config.engine.timeout_secs = timeout_secs;
            }
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "XMLBRIDGE_STYLESHEETS_DIR - Override the stylesheets root directory",
            "XMLBRIDGE_WORK_DIR - Override the directory receiving intermediate artifacts",
            "XMLBRIDGE_ENGINE_PROGRAM - Override the XSLT engine executable (default: java)",
            "XMLBRIDGE_ENGINE_TIMEOUT_SECS - Override the per-stylesheet timeout (default: 300)",
            "XMLBRIDGE_LOG_DIR - Override the log file directory",
        ]
    }
}

fn anchor_existing(base: &Path, value: &str) -> Option<String> {
    let path = Path::new(value);
    if path.is_absolute() {
        return None;
    }
    let anchored = base.join(path);
    anchored
        .exists()
        .then(|| anchored.to_string_lossy().into_owned())
}
