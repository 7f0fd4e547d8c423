//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.nerlens.toml` files.

use crate::cli::OutputFormat;
use crate::provider::{ClientConfig, DEFAULT_ENDPOINT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".nerlens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Annotation provider settings.
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Input file settings.
    #[serde(default)]
    pub input: InputSettings,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Relay server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report output path. Defaults to `nerlens_report.<ext>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Annotation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// TextRazor API URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Relay endpoint to use instead of calling TextRazor directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_url: Option<String>,

    /// TextRazor API key. Usually supplied via `TEXTRAZOR_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            relay_url: None,
            api_key: None,
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("nerlens/{}", env!("CARGO_PKG_VERSION"))
}

impl ProviderSettings {
    /// Client settings for calling TextRazor directly.
    pub fn textrazor_client(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            timeout_seconds: self.timeout_seconds,
            user_agent: self.user_agent.clone(),
        }
    }

    /// Client settings for calling the relay, if one is configured.
    pub fn relay_client(&self) -> Option<ClientConfig> {
        self.relay_url.as_ref().map(|url| ClientConfig {
            endpoint: url.clone(),
            api_key: None,
            timeout_seconds: self.timeout_seconds,
            user_agent: self.user_agent.clone(),
        })
    }
}

/// Input file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSettings {
    /// File extensions accepted as input.
    #[serde(default = "default_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum number of lines to analyze.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lines: Option<usize>,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            allowed_extensions: default_extensions(),
            max_file_size: default_max_file_size(),
            max_lines: None,
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["txt".to_string()]
}

fn default_max_file_size() -> u64 {
    1024 * 1024 // 1MB
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report title.
    #[serde(default = "default_title")]
    pub title: String,

    /// List the entities of each line below its text.
    #[serde(default = "default_true")]
    pub include_badges: bool,

    /// Include the failed lines section.
    #[serde(default = "default_true")]
    pub include_failures: bool,

    /// Number of types in the "top types" table.
    #[serde(default = "default_top_types")]
    pub top_types: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            include_badges: true,
            include_failures: true,
            top_types: default_top_types(),
        }
    }
}

fn default_title() -> String {
    "NerLens Entity Report".to_string()
}

fn default_true() -> bool {
    true
}

fn default_top_types() -> usize {
    5
}

/// Relay server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the relay listens on.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:3000".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the CLI actually provides override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(ref endpoint) = args.endpoint {
            self.provider.endpoint = endpoint.clone();
        }
        if let Some(ref relay) = args.relay {
            self.provider.relay_url = Some(relay.clone());
        }
        if let Some(ref api_key) = args.api_key {
            self.provider.api_key = Some(api_key.clone());
        }
        if let Some(timeout) = args.timeout {
            self.provider.timeout_seconds = timeout;
        }

        if let Some(max_lines) = args.max_lines {
            self.input.max_lines = Some(max_lines);
        }

        if let Some(ref listen) = args.listen {
            self.server.listen = listen.clone();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Path the report is written to.
    pub fn output_path(&self) -> PathBuf {
        match self.general.output {
            Some(ref output) => PathBuf::from(output),
            None => PathBuf::from(format!(
                "nerlens_report.{}",
                self.general.format.extension()
            )),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.endpoint, "https://api.textrazor.com/");
        assert_eq!(config.provider.timeout_seconds, 30);
        assert!(config.provider.api_key.is_none());
        assert_eq!(config.input.allowed_extensions, vec!["txt"]);
        assert_eq!(config.general.format, OutputFormat::Html);
        assert_eq!(config.output_path(), PathBuf::from("nerlens_report.html"));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.md"
format = "markdown"
verbose = true

[provider]
relay_url = "http://localhost:3000"
timeout_seconds = 10

[input]
max_lines = 50

[report]
title = "Weekly entities"
top_types = 3
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.output_path(), PathBuf::from("custom_report.md"));
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert!(config.general.verbose);
        assert_eq!(config.provider.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.provider.timeout_seconds, 10);
        assert_eq!(config.input.max_lines, Some(50));
        assert_eq!(config.report.title, "Weekly entities");
        assert_eq!(config.report.top_types, 3);
        assert!(config.report.include_badges);

        let relay = config.provider.relay_client().unwrap();
        assert_eq!(relay.endpoint, "http://localhost:3000");
        assert!(relay.api_key.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[server]\nlisten = \"0.0.0.0:8080\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:8080");

        std::fs::write(&path, "[server\nbroken").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let args = Args::parse_from([
            "nerlens",
            "--input",
            "lines.txt",
            "--format",
            "json",
            "--api-key",
            "secret",
            "--timeout",
            "5",
            "--max-lines",
            "7",
        ]);

        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.output_path(), PathBuf::from("nerlens_report.json"));
        assert_eq!(config.provider.api_key.as_deref(), Some("secret"));
        assert_eq!(config.provider.timeout_seconds, 5);
        assert_eq!(config.input.max_lines, Some(7));
        assert_eq!(config.provider.textrazor_client().timeout_seconds, 5);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[provider]"));
        assert!(toml_str.contains("[input]"));
        assert!(!toml_str.contains("api_key"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.listen, "127.0.0.1:3000");
    }
}
