//! Command line argument parsing for the halberd CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::loader::IndexConfig;

/// Halberd - query DSL evaluation and aggregation over JSON documents
#[derive(Parser, Debug, Clone)]
#[command(name = "halberd")]
#[command(about = "Evaluate query DSL requests and aggregations over JSON documents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct HalberdArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Engine configuration file (JSON)
    #[arg(long, value_name = "CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Worker threads used for evaluation
    #[arg(long, env = "HALBERD_PARALLELISM", global = true)]
    pub parallelism: Option<usize>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl HalberdArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }

    /// Default log directive for the effective verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbosity() {
            0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        }
    }

    /// Engine configuration from `--config` and `--parallelism`.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(parallelism) = self.parallelism {
            config = config.with_parallelism(parallelism);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a request against a document repository
    Search(SearchArgs),

    /// Parse a request and compile its templates
    Validate(ValidateArgs),

    /// Show the analyzer's tokens for a text
    Analyze(AnalyzeArgs),
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Repository root directory
    #[arg(long, value_name = "DIR")]
    pub root: PathBuf,

    /// Repository owner
    #[arg(long, default_value = "")]
    pub owner: String,

    /// Deployment stage
    #[arg(long, default_value = "")]
    pub stage: String,

    /// Configuration repository ("owner/name")
    #[arg(long)]
    pub repo: String,

    /// Branch
    #[arg(long, default_value = "main")]
    pub branch: String,

    /// Default index id
    #[arg(long, default_value = "")]
    pub index: String,

    /// Request file (JSON), or `-` for stdin
    #[arg(value_name = "QUERY_FILE")]
    pub query_file: PathBuf,

    /// Cancel the search after this many milliseconds
    #[arg(long, value_name = "MILLIS")]
    pub timeout_ms: Option<u64>,
}

impl SearchArgs {
    /// Repository coordinates for the loader.
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            owner: self.owner.clone(),
            stage: self.stage.clone(),
            repo: self.repo.clone(),
            branch: self.branch.clone(),
            id: self.index.clone(),
        }
    }
}

/// Arguments for validating a request
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Request file (JSON), or `-` for stdin
    #[arg(value_name = "QUERY_FILE")]
    pub query_file: PathBuf,
}

/// Arguments for analyzing text
#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Text to analyze
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Use phrase mode (ordered unigrams, no shingles)
    #[arg(long)]
    pub phrase: bool,
}

/// Output formats available in CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}
