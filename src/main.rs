use clap::Parser;
use std::process::ExitCode;
use xmlbridge::cli::{self, Args};
use xmlbridge::core::{ConfigError, TransformError};

/// Exit status for configuration problems, as opposed to a failed run.
const EXIT_CONFIGURATION: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config_file = args.config_file();
    let logging =
        xmlbridge::logging::init(config_file.as_deref(), args.verbose, args.machine_output());
    let _logging = match logging {
        Ok(guard) => {
            tracing::debug!(
                console = %guard.console_output(),
                log_file = ?guard.log_file_path(),
                "logging initialized"
            );
            Some(guard)
        }
        Err(err) => {
            eprintln!("warning: logging disabled: {:#}", err);
            None
        }
    };

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let configuration = err.downcast_ref::<ConfigError>().is_some()
                || err
                    .downcast_ref::<TransformError>()
                    .is_some_and(TransformError::is_configuration_error);
            if configuration {
                ExitCode::from(EXIT_CONFIGURATION)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
