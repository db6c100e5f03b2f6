//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main:
//! - parses CLI arguments and loads `EngineConfig`
//! - initializes tracing
//! - builds the `QuoteEngine` and dispatches the subcommand
//! - prints text or JSON and writes optional exports

use clap::Parser;
use serde::Serialize;
use tracing::info;

use crate::cli::{AnalyzeArgs, CatalogArgs, ClassifyArgs, Cli, Command, EstimateArgs, UpdateArgs};
use crate::config::EngineConfig;
use crate::domain::ProjectRequest;
use crate::error::{AppError, QuoteError};
use crate::pricing::MaterialCatalog;

pub mod engine;

pub use engine::QuoteEngine;

/// Entry point for the `quote` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut config = EngineConfig::from_env()?;
    if let Some(dir) = &cli.model_dir {
        config.model_dir = dir.clone();
    }
    if let Some(path) = &cli.catalog {
        config.catalog_path = Some(path.clone());
    }
    crate::logging::init_tracing(&config.log_level);

    match cli.command {
        Command::Classify(args) => handle_classify(&config, args),
        Command::Analyze(args) => handle_analyze(&config, args),
        Command::Estimate(args) => handle_estimate(&config, args),
        Command::Update(args) => handle_update(&config, args),
        Command::Catalog(args) => handle_catalog(&config, args),
    }
}

fn handle_classify(config: &EngineConfig, args: ClassifyArgs) -> Result<(), AppError> {
    let attrs = args.job.attributes();
    let risk = if args.rules_only {
        QuoteEngine::new(None).classify_rules_only(&attrs)
    } else {
        QuoteEngine::from_config(config)?.classify(&attrs)
    };

    if args.json {
        println!("{}", to_json(&risk)?);
    } else {
        print!("{}", crate::report::format_risk(&risk));
    }
    Ok(())
}

fn handle_analyze(config: &EngineConfig, args: AnalyzeArgs) -> Result<(), AppError> {
    let engine = QuoteEngine::from_config(config)?;
    let request = request_from_args(&args);
    let quote = engine.analyze(&request)?;

    if args.json {
        println!("{}", to_json(&quote)?);
    } else {
        print!("{}", crate::report::format_quote(&quote));
    }

    if let Some(path) = &args.export {
        crate::io::write_quote_json(path, &quote)?;
        info!(path = %path.display(), "exported quote");
    }
    Ok(())
}

fn handle_estimate(config: &EngineConfig, args: EstimateArgs) -> Result<(), AppError> {
    let catalog = load_catalog(config)?;
    let estimate = crate::pricing::estimate(args.area, &catalog);

    if args.json {
        println!("{}", to_json(&estimate)?);
    } else {
        print!("{}", crate::report::format_estimate(args.area, &estimate));
    }
    Ok(())
}

fn handle_update(config: &EngineConfig, args: UpdateArgs) -> Result<(), AppError> {
    let batch = crate::io::read_batch_json(&args.batch)?;
    let engine = QuoteEngine::from_config(config)?;
    engine.update(&batch)?;

    let generation = engine.statistical().and_then(|s| s.generation()).unwrap_or(0);
    println!(
        "Model updated: generation {generation}, {} samples in batch, stored in '{}'",
        batch.len(),
        config.model_dir.display()
    );
    Ok(())
}

fn handle_catalog(config: &EngineConfig, args: CatalogArgs) -> Result<(), AppError> {
    let catalog = load_catalog(config)?;
    match &args.write {
        Some(path) => {
            crate::io::write_catalog_json(path, &catalog)?;
            println!("Wrote {} materials to '{}'", catalog.len(), path.display());
        }
        None => print!("{}", crate::report::format_catalog(&catalog)),
    }
    Ok(())
}

/// Build a project request from `analyze` flags.
pub fn request_from_args(args: &AnalyzeArgs) -> ProjectRequest {
    ProjectRequest {
        name: args.name.clone(),
        client: args.client.clone(),
        attributes: args.job.attributes(),
        area_m2: args.area.unwrap_or(0.0),
        length_m: args.length.unwrap_or(0.0),
        width_m: args.width.unwrap_or(0.0),
        labor_percent: args.labor_percent,
        margin_percent: args.margin_percent,
    }
}

fn load_catalog(config: &EngineConfig) -> Result<MaterialCatalog, QuoteError> {
    match &config.catalog_path {
        Some(path) => crate::io::read_catalog_json(path),
        None => Ok(MaterialCatalog::seeded()),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::new(4, format!("Failed to encode JSON output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_flags_become_a_request() {
        let cli = Cli::parse_from([
            "quote",
            "analyze",
            "--name",
            "Canopy",
            "--client",
            "ACME",
            "--height",
            "3",
            "--area",
            "12.5",
            "--margin-percent",
            "20",
        ]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let req = request_from_args(&args);
        assert_eq!(req.name, "Canopy");
        assert_eq!(req.effective_area(), 12.5);
        assert_eq!(req.labor_percent, None);
        assert_eq!(req.margin_percent, Some(20.0));
    }
}
