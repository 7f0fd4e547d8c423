//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// NerLens - named-entity annotation for text files
///
/// Sends every line of a text file to a NER service, highlights the
/// entities it finds and reports how often each entity type occurs.
///
/// Examples:
///   nerlens --input notes.txt
///   nerlens --input notes.txt --format markdown --output notes.md
///   nerlens --input notes.txt --relay http://localhost:3000
///   nerlens --serve --listen 127.0.0.1:3000
///   nerlens --input notes.txt --dry-run
///   nerlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Text file to analyze, one entry per line
    ///
    /// Empty lines are skipped. Not required with --init-config or --serve.
    #[arg(
        short,
        long,
        value_name = "FILE",
        required_unless_present_any = ["init_config", "serve"]
    )]
    pub input: Option<PathBuf>,

    /// Output file path for the report
    ///
    /// Defaults to nerlens_report.<ext> for the chosen format.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (html, markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// TextRazor API endpoint URL
    #[arg(long, value_name = "URL", env = "NERLENS_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Send lines through a relay instead of calling TextRazor directly
    ///
    /// The relay holds the API key; see --serve.
    #[arg(long, value_name = "URL")]
    pub relay: Option<String>,

    /// TextRazor API key
    #[arg(long, value_name = "KEY", env = "TEXTRAZOR_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .nerlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum number of lines to analyze
    #[arg(long, value_name = "COUNT")]
    pub max_lines: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: read and list the lines without calling the provider
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with code 2 if any line failed to process
    ///
    /// Useful for CI pipelines.
    #[arg(long)]
    pub fail_on_error: bool,

    /// Run the relay server instead of analyzing a file
    #[arg(long, conflicts_with_all = ["input", "dry_run"])]
    pub serve: bool,

    /// Address the relay server listens on
    #[arg(long, value_name = "ADDR", requires = "serve")]
    pub listen: Option<String>,

    /// Generate a default .nerlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Self-contained HTML page (default)
    #[default]
    Html,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// File extension used for reports in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        for (flag, url) in [("Endpoint", &self.endpoint), ("Relay", &self.relay)] {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(format!("{} URL must start with 'http://' or 'https://'", flag));
                }
            }
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.max_lines == Some(0) {
            return Err("Max lines must be at least 1".to_string());
        }

        if self.serve {
            if self.relay.is_some() {
                return Err("A relay server cannot forward to another relay".to_string());
            }
            return Ok(());
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            if !input.is_file() {
                return Err(format!("Input path is not a file: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose_default` is the config file's `[general] verbose`; `--quiet`
    /// still wins over it.
    pub fn log_level(&self, verbose_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
