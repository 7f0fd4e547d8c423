//! NerLens - named-entity annotation for text files
//!
//! A CLI tool that sends each line of a text file to a NER service,
//! highlights the detected entities and reports per-type statistics.
//! It can also run as a relay that holds the service credential.
//!
//! Exit codes:
//!   0 - Success (or line failures without --fail-on-error)
//!   1 - Runtime error (config, input file, missing credential, etc.)
//!   2 - Some lines failed and --fail-on-error is set

mod analysis;
mod annotate;
mod cli;
mod config;
mod input;
mod models;
mod pipeline;
mod provider;
mod relay;
mod report;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use pipeline::LineAnalyzer;
use provider::{AnnotationProvider, RelayClient, TextRazorClient};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so [general] verbose applies
    let config = match load_config(&args) {
        Ok(mut config) => {
            config.merge_with_args(&args);
            config
        }
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("NerLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let result = if args.serve {
        run_relay(&config).await.map(|_| 0)
    } else {
        run_analysis(&args, &config).await
    };

    match result {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("NerLens failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .nerlens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the endpoint, input limits, report and relay.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the relay server until it is stopped.
async fn run_relay(config: &Config) -> Result<()> {
    let client = TextRazorClient::new(&config.provider.textrazor_client())
        .context("Cannot start relay")?;

    println!("🛰️  Starting relay on {}", config.server.listen);
    println!("   Upstream: {}", client.endpoint());

    relay::serve(&config.server.listen, Arc::new(client)).await
}

/// Run the complete annotation workflow. Returns exit code (0 or 2).
async fn run_analysis(args: &Args, config: &Config) -> Result<i32> {
    let start_time = Instant::now();

    let input_path = args
        .input
        .as_deref()
        .context("An input file is required (use --input)")?;

    // Step 1: Read the lines
    println!("📥 Reading lines from: {}", input_path.display());
    let input_config = input::InputConfig::from(&config.input);
    let lines = input::read_lines(input_path, &input_config)?;
    info!("{} lines to annotate", lines.len());

    // Handle --dry-run: list lines and exit
    if args.dry_run {
        return handle_dry_run(&lines);
    }

    // Step 2: Build the provider
    println!("🤖 Initializing annotation provider...");
    let provider = build_provider(config)?;
    println!("   Timeout: {}s", config.provider.timeout_seconds);

    let analyzer = LineAnalyzer::new(provider);

    // Step 3: Annotate line by line
    println!("\n🔬 Annotating {} lines...\n", lines.len());

    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(lines.len() as u64)
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let outcome = analyzer
        .run_batch_with(&lines, |step| {
            progress.set_position((step.index + 1) as u64);
            if !step.succeeded {
                progress.set_message(format!("failed: {}", step.line));
            }
            debug!("Line {}/{} done", step.index + 1, step.total);
        })
        .await;
    progress.finish_with_message("done");
    debug!(
        "Batch {} attempted {} of {} lines",
        outcome.generation,
        outcome.attempted,
        lines.len()
    );
    if outcome.superseded {
        warn!("Batch {} was superseded; its results were discarded", outcome.generation);
    }

    for notice in &outcome.notices {
        if notice.is_failure() {
            eprintln!("{}", notice);
        } else {
            println!("{}", notice);
        }
    }
    if analyzer.last_call_failed() {
        warn!("The last provider call failed");
    }

    // Step 4: Build and save the report
    println!("\n📝 Generating report...");

    let duration = start_time.elapsed().as_secs_f64();
    let report = report::build_report(
        &input_path.display().to_string(),
        analyzer.provider_name(),
        lines.len(),
        &outcome,
        duration,
    );

    let output = match config.general.format {
        OutputFormat::Html => report::generate_html_report(&report, &config.report),
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
        OutputFormat::Json => report::generate_json_report(&report)?,
    };

    let output_path = config.output_path();
    report::write_report(&output, &output_path)?;

    // Print summary
    println!("\n📊 Analysis Summary:");
    for line in analysis::generate_summary_text(&report.summary, &report.entity_counts).lines() {
        println!("   {}", line);
    }
    if report.has_failures() {
        println!("   Lines failed: {}", report.failures.len());
    }
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Analysis complete! Report saved to: {}",
        output_path.display()
    );

    if args.fail_on_error && report.has_failures() {
        eprintln!(
            "\n⛔ {} line(s) failed to process. Failing (exit code 2).",
            report.failures.len()
        );
        return Ok(2);
    }

    Ok(0)
}

/// Build the provider selected by the configuration.
fn build_provider(config: &Config) -> Result<Box<dyn AnnotationProvider>> {
    if let Some(relay_config) = config.provider.relay_client() {
        let client = RelayClient::new(&relay_config).context("Failed to create relay client")?;
        println!("   Relay: {}", client.url());
        return Ok(Box::new(client));
    }

    let client = TextRazorClient::new(&config.provider.textrazor_client())
        .context("Failed to create TextRazor client")?;
    println!("   TextRazor: {}", client.endpoint());
    Ok(Box::new(client))
}

/// Handle --dry-run: print the lines that would be annotated, exit.
fn handle_dry_run(lines: &[String]) -> Result<i32> {
    println!("\n🔍 Dry run: reading lines (no provider calls)...\n");
    println!("   Found {} lines that would be annotated:\n", lines.len());

    for (i, line) in lines.iter().enumerate() {
        println!("     {:>4}. {}", i + 1, line);
    }

    println!("\n✅ Dry run complete. No provider calls were made.");
    Ok(0)
}

/// Load configuration from file or use defaults.
///
/// Runs before the subscriber is installed, so problems are reported on
/// stderr directly.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
