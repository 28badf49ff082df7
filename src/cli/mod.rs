pub mod args;
pub mod commands;

pub use args::{CheckArgs, ListArgs, TransformArgs};
use crate::core::config::loader::CONFIG_FILE_NAME;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser, Debug)]
#[command(name = "xmlbridge")]
#[command(version = crate::VERSION)]
#[command(about = "Convert XML documents between schemas by chaining XSLT stylesheets")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Configuration is read from ./xmlbridge.toml unless --config is given.\n\
Environment overrides: XMLBRIDGE_STYLESHEETS_DIR, XMLBRIDGE_WORK_DIR,\n\
XMLBRIDGE_ENGINE_PROGRAM, XMLBRIDGE_ENGINE_TIMEOUT_SECS, XMLBRIDGE_LOG_DIR."
)]
pub struct Args {
    /// Path to the configuration file (default: ./xmlbridge.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// The configuration file this invocation reads, if any.
    pub fn config_file(&self) -> Option<PathBuf> {
        match &self.config {
            Some(path) => Some(path.clone()),
            None => std::env::current_dir()
                .ok()
                .map(|cwd| cwd.join(CONFIG_FILE_NAME))
                .filter(|path| path.is_file()),
        }
    }

    /// True when stdout carries a machine-readable document.
    pub fn machine_output(&self) -> bool {
        matches!(&self.command, Command::List(list) if list.json)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        about = "Apply a named transformation to a document",
        long_about = "Transform resolves the transformation's stylesheets, runs each through the configured XSLT engine in order, and writes one canonical, indented XML file.",
        after_help = "Example:\n    xmlbridge transform article.xml --transformation jatsToTei --output article.tei.xml"
    )]
    Transform(TransformArgs),
    #[command(
        about = "List configured transformations",
        long_about = "List prints every transformation in the catalog, including the built-in `none` pass-through.",
        after_help = "Example:\n    xmlbridge list --operation import --json"
    )]
    List(ListArgs),
    #[command(
        about = "Validate configuration and stylesheet availability",
        long_about = "Check validates the configuration file and resolves each transformation, reporting every missing or unconfigured stylesheet.",
        after_help = "Example:\n    xmlbridge check --config /etc/xmlbridge/xmlbridge.toml"
    )]
    Check(CheckArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    let config_file = args.config_file();
    match args.command {
        Command::Transform(transform_args) => {
            commands::transform(config_file.as_deref(), transform_args).await
        }
        Command::List(list_args) => commands::list(config_file.as_deref(), list_args),
        Command::Check(check_args) => commands::check(config_file.as_deref(), check_args),
    }
}
