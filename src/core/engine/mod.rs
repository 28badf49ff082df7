//! Out-of-process XSLT engine adapter.

use crate::core::config::EngineConfig;
use crate::core::error::TransformError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// One engine call: apply `stylesheet` to `input`, writing `output`.
#[derive(Clone, Debug)]
pub struct ProcessInvocation {
    pub input: PathBuf,
    pub stylesheet: PathBuf,
    pub output: PathBuf,
    pub timeout: Duration,
}

/// Applies a single stylesheet.
///
/// On success exactly one file exists at `invocation.output`. On failure the
/// output path may hold partial content; removing it is the caller's job.
#[async_trait]
pub trait XsltProcessor: Send + Sync + 'static {
    async fn run(&self, invocation: &ProcessInvocation) -> Result<(), TransformError>;
}

/// Launches the configured engine executable once per invocation.
pub struct CommandProcessor {
    program: String,
    args: Vec<String>,
    source_prefix: String,
    stylesheet_prefix: String,
    output_prefix: String,
}

impl CommandProcessor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            source_prefix: config.source_prefix.clone(),
            stylesheet_prefix: config.stylesheet_prefix.clone(),
            output_prefix: config.output_prefix.clone(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program: configured leading args, then source,
    /// stylesheet and destination, each behind its prefix.
    pub fn arguments(&self, invocation: &ProcessInvocation) -> Vec<OsString> {
        let mut arguments: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        arguments.push(prefixed(&self.source_prefix, &invocation.input));
        arguments.push(prefixed(&self.stylesheet_prefix, &invocation.stylesheet));
        arguments.push(prefixed(&self.output_prefix, &invocation.output));
        arguments
    }
}

#[async_trait]
impl XsltProcessor for CommandProcessor {
    async fn run(&self, invocation: &ProcessInvocation) -> Result<(), TransformError> {
        let mut command = Command::new(&self.program);
        command
            .args(self.arguments(invocation))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            program = %self.program,
            input = %invocation.input.display(),
            stylesheet = %invocation.stylesheet.display(),
            output = %invocation.output.display(),
            timeout_ms = invocation.timeout.as_millis() as u64,
            "launching XSLT engine"
        );

        let start = Instant::now();
        let mut child = command
            .spawn()
            .map_err(|source| TransformError::EngineUnavailable {
                program: self.program.clone(),
                source,
            })?;

        // Both pipes are drained concurrently so a chatty engine cannot block on a full buffer.
        let mut stdout_task = drain(child.stdout.take());
        let mut stderr_task = drain(child.stderr.take());

        // One deadline covers the exit and both pipes: a helper process that
        // inherited the pipes must not hold the run past its budget.
        let deadline = tokio::time::Instant::now() + invocation.timeout;
        let completed = tokio::time::timeout_at(deadline, async {
            let status = child.wait().await?;
            let stdout = (&mut stdout_task).await.unwrap_or_default();
            let stderr = (&mut stderr_task).await.unwrap_or_default();
            Ok::<_, std::io::Error>((status, stdout, stderr))
        })
        .await;

        let (status, stdout, stderr) = match completed {
            Ok(Ok(finished)) => finished,
            Ok(Err(err)) => {
                return Err(TransformError::io(
                    format!("failed waiting for XSLT engine '{}'", self.program),
                    err,
                ))
            }
            Err(_) => {
                stdout_task.abort();
                stderr_task.abort();
                if let Ok(None) = child.try_wait() {
                    if let Err(err) = child.kill().await {
                        tracing::warn!(
                            program = %self.program,
                            error = %err,
                            "failed to kill timed out XSLT engine"
                        );
                    }
                }
                tracing::warn!(
                    stylesheet = %invocation.stylesheet.display(),
                    timeout_ms = invocation.timeout.as_millis() as u64,
                    "XSLT engine timed out"
                );
                return Err(TransformError::TransformationTimeout {
                    stylesheet: invocation.stylesheet.clone(),
                    timeout: invocation.timeout,
                });
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        if !status.success() {
            tracing::debug!(
                exit_code = status.code().unwrap_or(-1),
                duration_ms,
                "XSLT engine reported failure"
            );
            return Err(TransformError::TransformationFailed {
                stylesheet: invocation.stylesheet.clone(),
                exit_code: status.code(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            });
        }

        if !stdout.is_empty() {
            tracing::trace!(
                stdout = %String::from_utf8_lossy(&stdout),
                "XSLT engine stdout"
            );
        }
        tracing::debug!(duration_ms, "XSLT engine finished");
        Ok(())
    }
}

fn prefixed(prefix: &str, path: &Path) -> OsString {
    let mut argument = OsString::from(prefix);
    argument.push(path.as_os_str());
    argument
}

fn drain<R>(reader: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Some(mut reader) = reader {
            if let Err(err) = reader.read_to_end(&mut buffer).await {
                tracing::debug!(error = %err, "failed reading XSLT engine output");
            }
        }
        buffer
    })
}
