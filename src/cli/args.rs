use crate::core::catalog::Operation;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// XML document to convert
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Name of the configured transformation to apply (`none` only reformats)
    #[arg(short, long, value_name = "NAME")]
    pub transformation: String,

    /// Move the result here instead of leaving it in the work directory
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Per-stylesheet time budget, e.g. `90s` or `5m` (default: engine.timeout_secs)
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show transformations in this direction
    #[arg(long, value_name = "OPERATION", value_parser = parse_operation)]
    pub operation: Option<Operation>,

    /// Emit the catalog as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Check a single transformation instead of the whole catalog
    #[arg(value_name = "NAME")]
    pub transformation: Option<String>,
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    let timeout = humantime::parse_duration(value).map_err(|err| err.to_string())?;
    if timeout.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(timeout)
}

fn parse_operation(value: &str) -> Result<Operation, String> {
    value.parse()
}
