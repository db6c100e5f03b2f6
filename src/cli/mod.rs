//! Command-line parsing for the metalwork quoting engine.
//!
//! Parsing stays here; dispatch lives in [`crate::app`].

use std::convert::Infallible;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Complexity, Environment, ProjectAttributes};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "quote", version, about = "Risk-adjusted quoting for metalwork projects")]
pub struct Cli {
    /// Directory holding the persisted risk scaler and model (overrides QUOTE_MODEL_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,

    /// Material catalog JSON (overrides QUOTE_CATALOG; built-in catalog otherwise).
    #[arg(long, global = true, value_name = "JSON")]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify the risk of a job.
    Classify(ClassifyArgs),
    /// Classify, estimate materials and price a project.
    Analyze(AnalyzeArgs),
    /// Estimate materials for an area.
    Estimate(EstimateArgs),
    /// Retrain the statistical classifier on a labelled batch.
    Update(UpdateArgs),
    /// Print the material catalog, or write it to a JSON file.
    Catalog(CatalogArgs),
}

/// Job attributes shared by `classify` and `analyze`.
#[derive(Debug, Args, Clone)]
pub struct JobArgs {
    /// Maximum working height in metres.
    #[arg(long, default_value_t = 0.0)]
    pub height: f64,

    /// Structural complexity: low, medium or high (also baixa, media, alta).
    /// Unrecognized labels are read as low.
    #[arg(long, value_parser = parse_complexity, default_value = "low")]
    pub complexity: Complexity,

    /// Environmental exposure: controlled, outdoor or outdoor-adverse (also
    /// controlado, externo, externo_adverso). Unrecognized labels are read as controlled.
    #[arg(long, value_parser = parse_environment, default_value = "controlled")]
    pub environment: Environment,

    /// Free-form job description.
    #[arg(long)]
    pub description: Option<String>,
}

// Labels follow the same lenient policy as the JSON inputs, so these never fail.
fn parse_complexity(label: &str) -> Result<Complexity, Infallible> {
    Ok(Complexity::parse_lenient(label))
}

fn parse_environment(label: &str) -> Result<Environment, Infallible> {
    Ok(Environment::parse_lenient(label))
}

impl JobArgs {
    pub fn attributes(&self) -> ProjectAttributes {
        ProjectAttributes {
            description: self.description.clone(),
            ..ProjectAttributes::new(self.height, self.complexity, self.environment)
        }
    }
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Skip the statistical classifier.
    #[arg(long)]
    pub rules_only: bool,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Project name.
    #[arg(long)]
    pub name: String,

    /// Client name.
    #[arg(long, default_value = "")]
    pub client: String,

    #[command(flatten)]
    pub job: JobArgs,

    /// Project area in m².
    #[arg(long, conflicts_with_all = ["length", "width"])]
    pub area: Option<f64>,

    /// Project length in metres (area = length × width).
    #[arg(long, requires = "width")]
    pub length: Option<f64>,

    /// Project width in metres.
    #[arg(long, requires = "length")]
    pub width: Option<f64>,

    /// Labor as a percent of materials.
    #[arg(long)]
    pub labor_percent: Option<f64>,

    /// Profit margin percent.
    #[arg(long)]
    pub margin_percent: Option<f64>,

    /// Write the quote as JSON to this file.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct EstimateArgs {
    /// Project area in m².
    #[arg(long)]
    pub area: f64,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// JSON array of `{ "features": [h, c, e], "tier": 0..=3 }`.
    #[arg(long, value_name = "JSON")]
    pub batch: PathBuf,
}

#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// Write the active catalog to this file instead of printing it.
    #[arg(long, value_name = "JSON")]
    pub write: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_with_dimensions() {
        let cli = Cli::parse_from([
            "quote",
            "--model-dir",
            "/tmp/m",
            "analyze",
            "--name",
            "Gate",
            "--height",
            "4.5",
            "--complexity",
            "high",
            "--environment",
            "outdoor-adverse",
            "--length",
            "4",
            "--width",
            "2.5",
        ]);
        assert_eq!(cli.model_dir, Some(PathBuf::from("/tmp/m")));
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.job.attributes(), ProjectAttributes::new(4.5, Complexity::High, Environment::OutdoorAdverse));
        assert_eq!((args.length, args.width), (Some(4.0), Some(2.5)));
        assert!(args.area.is_none());
    }

    #[test]
    fn area_conflicts_with_dimensions() {
        let res = Cli::try_parse_from(["quote", "analyze", "--name", "x", "--area", "10", "--length", "2", "--width", "5"]);
        assert!(res.is_err());
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["quote", "estimate", "--area", "12", "--catalog", "c.json"]).unwrap();
        assert_eq!(cli.catalog, Some(PathBuf::from("c.json")));
    }

    #[test]
    fn job_labels_are_parsed_leniently() {
        let cli = Cli::try_parse_from([
            "quote",
            "classify",
            "--complexity",
            "ALTA",
            "--environment",
            "underwater",
        ])
        .unwrap();
        let Command::Classify(args) = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(args.job.complexity, Complexity::High);
        assert_eq!(args.job.environment, Environment::Controlled);

        let cli = Cli::try_parse_from(["quote", "classify", "--height", "2"]).unwrap();
        let Command::Classify(args) = cli.command else {
            panic!("expected classify");
        };
        assert_eq!((args.job.complexity, args.job.environment), (Complexity::Low, Environment::Controlled));
    }
}
