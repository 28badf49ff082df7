use crate::{
    cli::args::{CheckArgs, ListArgs, TransformArgs},
    core::{
        catalog::TransformationSpec, BridgeConfig, ConfigLoader, ConfigValidator, Pipeline,
        ResolverKind, Settings, StylesheetResolver,
    },
    Result,
};
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::{
    env, fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Load and validate the configuration for this invocation.
fn load_config(config_file: Option<&Path>) -> Result<BridgeConfig> {
    let config = match config_file {
        Some(path) => ConfigLoader::load_from_path(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => {
            let cwd = env::current_dir().context("failed to determine current directory")?;
            ConfigLoader::load_from_dir(&cwd)?
        }
    };
    ConfigValidator::validate(&config)?;
    Ok(config)
}

pub async fn transform(config_file: Option<&Path>, args: TransformArgs) -> Result<()> {
    let config = load_config(config_file)?;
    let mut settings = Settings::from_config(&config);
    if let Some(timeout) = args.timeout {
        settings = settings.with_timeout(timeout);
    }
    let pipeline = Pipeline::from_config_with_settings(&config, settings);

    tracing::info!(
        input = %args.input.display(),
        transformation = %args.transformation,
        "starting transformation"
    );
    let result = pipeline
        .transform(&args.input, &args.transformation)
        .await
        .with_context(|| {
            format!(
                "transformation '{}' of {} failed",
                args.transformation,
                args.input.display()
            )
        })?;

    let delivered = match &args.output {
        Some(destination) => deliver(&result, destination)?,
        None => result,
    };
    println!("{}", delivered.display());
    Ok(())
}

/// Move the result to `destination`, copying when a rename is not possible.
fn deliver(result: &Path, destination: &Path) -> Result<PathBuf> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    if fs::rename(result, destination).is_err() {
        fs::copy(result, destination).with_context(|| {
            format!(
                "failed to copy {} to {}",
                result.display(),
                destination.display()
            )
        })?;
        if let Err(err) = fs::remove_file(result) {
            tracing::warn!(path = %result.display(), error = %err, "failed to remove result after copy");
        }
    }
    Ok(destination.to_path_buf())
}

#[derive(Serialize)]
struct CatalogEntry<'a> {
    name: &'a str,
    label: &'a str,
    operation: String,
    stylesheets: Vec<&'a str>,
}

impl<'a> From<&'a TransformationSpec> for CatalogEntry<'a> {
    fn from(spec: &'a TransformationSpec) -> Self {
        CatalogEntry {
            name: &spec.name,
            label: &spec.label,
            operation: spec.operation.to_string(),
            stylesheets: spec.steps.iter().map(|s| s.filename.as_str()).collect(),
        }
    }
}

pub fn list(config_file: Option<&Path>, args: ListArgs) -> Result<()> {
    let config = load_config(config_file)?;
    let pipeline = Pipeline::from_config(&config);
    let catalog = pipeline.catalog();
    let specs: Vec<&TransformationSpec> = match args.operation {
        Some(operation) => catalog.by_operation(operation).collect(),
        None => catalog.iter().collect(),
    };
    let entries: Vec<CatalogEntry<'_>> = specs.into_iter().map(CatalogEntry::from).collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &entries)?;
        writeln!(out)?;
        return Ok(());
    }

    for entry in &entries {
        writeln!(
            out,
            "{:<24} {:<8} {} ({} stylesheet{})",
            entry.name,
            entry.operation,
            entry.label,
            entry.stylesheets.len(),
            if entry.stylesheets.len() == 1 { "" } else { "s" }
        )?;
    }
    Ok(())
}

pub fn check(config_file: Option<&Path>, args: CheckArgs) -> Result<()> {
    let config = load_config(config_file)?;
    let pipeline = Pipeline::from_config(&config);

    let names: Vec<String> = match &args.transformation {
        Some(name) => vec![name.clone()],
        None => match config.resolver {
            ResolverKind::Catalog => pipeline
                .catalog()
                .configured()
                .map(|spec| spec.name.clone())
                .collect(),
            ResolverKind::Directory => directory_transformations(&config.stylesheets_dir)?,
        },
    };

    let failures = report_resolution(pipeline.resolver(), &names);
    if failures > 0 {
        return Err(anyhow!(
            "{} of {} transformation(s) failed validation",
            failures,
            names.len()
        ));
    }
    println!("configuration OK ({} transformation(s))", names.len());
    Ok(())
}

/// Resolve each name and print one line per result; returns the failure count.
fn report_resolution(resolver: &dyn StylesheetResolver, names: &[String]) -> usize {
    let mut failures = 0;
    for name in names {
        match resolver.resolve(name) {
            Ok(stylesheets) => println!("ok     {} ({} stylesheet(s))", name, stylesheets.len()),
            Err(err) => {
                failures += 1;
                println!("error  {} [{}] {}", name, err.code(), err);
            }
        }
    }
    failures
}

/// Subdirectory names of the stylesheets root, sorted.
fn directory_transformations(stylesheets_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(stylesheets_dir).with_context(|| {
        format!(
            "failed to list stylesheets directory {}",
            stylesheets_dir.display()
        )
    })?;
    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    Ok(names)
}
