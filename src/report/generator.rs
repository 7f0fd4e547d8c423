//! Report assembly plus Markdown and JSON rendering.

use crate::analysis::{
    aggregate, busiest_lines, entities_per_line, mean_confidence_by_type, summarize, top_types,
    type_shares,
};
use crate::annotate::{escape_html, highlight_line};
use crate::config::ReportConfig;
use crate::models::{
    AnnotatedLine, BatchSummary, EntityCount, LineFailure, LineResult, Notice, Report,
    ReportMetadata,
};
use crate::pipeline::BatchOutcome;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;

/// Assemble the report for a finished batch.
pub fn build_report(
    source: &str,
    provider: &str,
    lines_submitted: usize,
    outcome: &BatchOutcome,
    duration_seconds: f64,
) -> Report {
    let entity_counts = aggregate(&outcome.results);
    let summary = summarize(&entity_counts, outcome.results.len());

    let lines = outcome
        .results
        .iter()
        .map(|result| AnnotatedLine {
            text: result.text.clone(),
            html: highlight_line(result),
            entities: result.entities.clone(),
        })
        .collect();

    let failures: Vec<LineFailure> = outcome
        .notices
        .iter()
        .filter_map(|notice| match notice {
            Notice::LineFailed { line, reason } => Some(LineFailure {
                line: line.clone(),
                reason: reason.clone(),
            }),
            Notice::BatchSucceeded { .. } => None,
        })
        .collect();

    let metadata = ReportMetadata {
        source: source.to_string(),
        analysis_date: Utc::now(),
        provider: provider.to_string(),
        lines_submitted,
        lines_processed: outcome.results.len(),
        lines_failed: outcome.failure_count(),
        duration_seconds,
    };

    Report {
        metadata,
        summary,
        entity_counts,
        lines,
        failures,
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!("# {}\n\n", options.title));

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(
        &report.summary,
        &report.entity_counts,
        options.top_types,
    ));
    output.push_str(&generate_lines_section(report, options.include_badges));

    if options.include_failures {
        output.push_str(&generate_failures_section(&report.failures));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", markdown_text(&metadata.source)));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Provider:** {}\n",
        markdown_text(&metadata.provider)
    ));
    section.push_str(&format!(
        "- **Lines Submitted:** {}\n",
        metadata.lines_submitted
    ));
    section.push_str(&format!(
        "- **Lines Processed:** {}\n",
        metadata.lines_processed
    ));
    if metadata.lines_failed > 0 {
        section.push_str(&format!("- **Lines Failed:** {}\n", metadata.lines_failed));
    }
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the summary section.
fn generate_summary_section(
    summary: &BatchSummary,
    counts: &[EntityCount],
    top_n: usize,
) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Lines | Entities | Most Frequent Type |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} |\n\n",
        summary.total_lines,
        summary.total_entities,
        markdown_text(&summary.top_type)
    ));

    if counts.is_empty() {
        section.push_str("No entities were found in the processed lines.\n\n");
        return section;
    }

    // Insertion order, as aggregated
    section.push_str("### Entities by Type\n\n");
    section.push_str("| Type | Count | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for (count, (_, share)) in counts.iter().zip(type_shares(counts)) {
        section.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            markdown_text(&count.entity_type),
            count.count,
            share
        ));
    }
    section.push('\n');

    let top = top_types(counts, top_n);
    if !top.is_empty() {
        section.push_str("### Top Types\n\n");
        for (i, count) in top.iter().enumerate() {
            section.push_str(&format!(
                "{}. {} ({})\n",
                i + 1,
                markdown_text(&count.entity_type),
                count.count
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the annotated lines section.
fn generate_lines_section(report: &Report, include_badges: bool) -> String {
    let mut section = String::new();

    section.push_str("## Annotated Lines\n\n");

    if report.lines.is_empty() {
        section.push_str("No lines were processed.\n\n");
        return section;
    }

    let results: Vec<LineResult> = report
        .lines
        .iter()
        .map(|line| LineResult {
            text: line.text.clone(),
            entities: line.entities.clone(),
        })
        .collect();

    section.push_str(&format!(
        "*Average entities per line: {:.2}*\n\n",
        entities_per_line(&results)
    ));

    let confidence = mean_confidence_by_type(&results);
    if !confidence.is_empty() {
        section.push_str("### Mean Confidence by Type\n\n");
        section.push_str("| Type | Confidence |\n");
        section.push_str("|:---|:---:|\n");
        for (entity_type, mean) in &confidence {
            section.push_str(&format!("| {} | {:.2} |\n", markdown_text(entity_type), mean));
        }
        section.push('\n');
    }

    let busiest = busiest_lines(&results, 5);
    if !busiest.is_empty() {
        section.push_str("### Busiest Lines\n\n");
        section.push_str("| Line | Entities |\n");
        section.push_str("|:---|:---:|\n");
        for (line, count) in busiest {
            section.push_str(&format!("| {} | {} |\n", markdown_text(&line.text), count));
        }
        section.push('\n');
    }

    section.push_str("### Lines\n\n");
    for (i, line) in report.lines.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, markdown_text(&line.text)));

        if include_badges && !line.entities.is_empty() {
            let badges: Vec<String> = line
                .entities
                .iter()
                .map(|e| {
                    format!(
                        "**{}** ({})",
                        markdown_text(&e.matched_text),
                        markdown_text(e.primary_type())
                    )
                })
                .collect();
            section.push_str(&format!("   - {}\n", badges.join(", ")));
        }
    }
    section.push('\n');

    section
}

/// Generate the failed lines section.
fn generate_failures_section(failures: &[LineFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Failed Lines\n\n");
    for failure in failures {
        section.push_str(&format!(
            "- ❌ \"{}\" ({})\n",
            markdown_text(&failure.line),
            markdown_text(&failure.reason)
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by NerLens v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Render untrusted text as literal Markdown.
///
/// Inline syntax characters are backslash-escaped, a leading list marker is
/// neutralised and markup characters become HTML entities.
fn markdown_text(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());

    for (i, c) in raw.chars().enumerate() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '|' | '#' | '~' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '-' | '+' if i == 0 => {
                escaped.push('\\');
                escaped.push(c);
            }
            other => escaped.push(other),
        }
    }

    escape_html(&escaped)
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
