use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pipeline::DEFAULT_MAX_CONCURRENT_SHARDS;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
}

/// Main application configuration derived from CLI
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub root: PathBuf,
    pub output: PathBuf,
    pub workers: usize,
    pub schema_path: Option<PathBuf>,
    pub multi_value_delimiter: String,
    pub verbose: bool,
    pub quiet: bool,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            root: cli.root.clone(),
            output: cli.output.clone(),
            workers: cli.get_workers(),
            schema_path: cli.schema.clone(),
            multi_value_delimiter: cli.multi_value_delimiter.clone(),
            verbose: cli.verbose,
            quiet: cli.quiet,
        }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Flatten a corpus of extracted Form 990 XML filings into one CSV table
#[derive(Parser, Debug, Clone)]
#[command(name = "flatten-xml")]
#[command(about = "Flatten extracted XML filing shards into a single CSV table")]
#[command(version)]
pub struct Cli {
    /// Root directory containing one extracted subdirectory per archive
    #[arg(help = "Corpus root directory (one subdirectory per archive)")]
    pub root: PathBuf,

    /// Output CSV path, recreated on every run
    #[arg(short = 'o', long = "output", default_value = "flattened.csv")]
    pub output: PathBuf,

    /// Number of concurrent shard workers
    #[arg(short = 'w', long = "workers", help = "Concurrent shard workers")]
    pub workers: Option<usize>,

    /// JSON header schema overriding the built-in canonical columns
    #[arg(long = "schema")]
    pub schema: Option<PathBuf>,

    /// Delimiter joining repeated values that share one cell
    #[arg(long = "multi-value-delimiter", default_value = "|")]
    pub multi_value_delimiter: String,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.root.exists() {
            return Err(format!("Root does not exist: {}", self.root.display()));
        }
        if !self.root.is_dir() {
            return Err(format!("Root is not a directory: {}", self.root.display()));
        }
        if let Some(workers) = self.workers
            && workers == 0
        {
            return Err("Number of workers must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn get_workers(&self) -> usize {
        self.workers.unwrap_or(DEFAULT_MAX_CONCURRENT_SHARDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_basic_cli_parsing() {
        let args = vec!["flatten-xml", "/tmp"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.root, PathBuf::from("/tmp"));
        assert_eq!(cli.output, PathBuf::from("flattened.csv"));
        assert_eq!(cli.get_workers(), DEFAULT_MAX_CONCURRENT_SHARDS);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let args = vec!["flatten-xml", "/tmp", "--quiet", "--verbose"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let args = vec!["flatten-xml", "/tmp", "--workers", "0"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_config_from_cli() {
        let args = vec![
            "flatten-xml",
            "/tmp",
            "-o",
            "table.csv",
            "-w",
            "4",
            "--multi-value-delimiter",
            ";",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let config = Config::from_cli(&cli);

        assert_eq!(config.output, PathBuf::from("table.csv"));
        assert_eq!(config.workers, 4);
        assert_eq!(config.multi_value_delimiter, ";");
        assert_eq!(config.verbosity(), VerbosityLevel::Normal);
    }
}
