//! Data models for the entity annotation pipeline.
//!
//! This module contains the core data structures shared by the provider
//! clients, the line orchestrator, the aggregator and the report writer.

use crate::annotate::SafeHtml;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type label used when an entity carries no type at all.
pub const UNKNOWN_TYPE: &str = "Unknown";

/// Placeholder shown as the top type of a batch without entities.
pub const NO_TOP_TYPE: &str = "-";

/// A named mention detected by the annotation provider.
///
/// Field names on the wire follow the TextRazor response format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Provider-assigned identity (may repeat across lines).
    #[serde(default)]
    pub entity_id: String,
    /// Category labels, primary category first.
    #[serde(rename = "type", default)]
    pub entity_type: Vec<String>,
    /// Provider confidence in [0, 1].
    #[serde(default)]
    pub confidence_score: f64,
    /// Exact substring of the line that triggered the match.
    pub matched_text: String,
    /// Secondary taxonomy labels (advisory only).
    #[serde(
        rename = "dbpediaTypes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub external_types: Option<Vec<String>>,
}

impl Entity {
    /// Returns the primary category, or `"Unknown"` when no type is present.
    pub fn primary_type(&self) -> &str {
        self.entity_type
            .first()
            .map(String::as_str)
            .unwrap_or(UNKNOWN_TYPE)
    }
}

/// Entity payload of a single annotation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationResponse {
    /// Detected entities; absent or null on the wire means none.
    #[serde(default)]
    pub entities: Option<Vec<Entity>>,
}

impl AnnotationResponse {
    /// Consume the response and return its entities (empty when absent).
    pub fn into_entities(self) -> Vec<Entity> {
        self.entities.unwrap_or_default()
    }
}

/// Envelope returned by TextRazor and by the relay endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderEnvelope {
    #[serde(default)]
    pub response: AnnotationResponse,
}

/// One input line paired with the entities detected in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineResult {
    /// The line exactly as it was submitted.
    pub text: String,
    /// Entities in provider order.
    pub entities: Vec<Entity>,
}

/// Number of entities sharing a primary type across a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCount {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub count: usize,
}

/// Summary statistics of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Number of lines processed successfully.
    pub total_lines: usize,
    /// Number of entities across all processed lines.
    pub total_entities: usize,
    /// Most frequent primary type, or `"-"` when there is none.
    pub top_type: String,
}

/// Outcome notice produced by the orchestrator for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// A single line could not be annotated.
    LineFailed { line: String, reason: String },
    /// The batch produced at least one result.
    BatchSucceeded { processed: usize },
}

impl Notice {
    /// Returns true for failure notices.
    pub fn is_failure(&self) -> bool {
        matches!(self, Notice::LineFailed { .. })
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::LineFailed { line, reason } => {
                write!(f, "❌ Error processing line: \"{}\" ({})", line, reason)
            }
            Notice::BatchSucceeded { processed } => {
                write!(f, "✅ Successfully processed {} lines!", processed)
            }
        }
    }
}

/// A line failure as listed in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineFailure {
    pub line: String,
    pub reason: String,
}

/// A processed line together with its rendered markup.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedLine {
    /// Original line text.
    pub text: String,
    /// Escaped markup with entity spans.
    pub html: SafeHtml,
    /// Entities detected in the line.
    pub entities: Vec<Entity>,
}

/// Metadata about the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Input file the lines were read from.
    pub source: String,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Name of the annotation provider used.
    pub provider: String,
    /// Number of lines submitted.
    pub lines_submitted: usize,
    /// Number of lines annotated successfully.
    pub lines_processed: usize,
    /// Number of lines whose annotation failed.
    pub lines_failed: usize,
    /// Duration of the analysis in seconds.
    pub duration_seconds: f64,
}

/// The complete annotation report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: BatchSummary,
    /// Counts per type in first-seen order.
    pub entity_counts: Vec<EntityCount>,
    pub lines: Vec<AnnotatedLine>,
    pub failures: Vec<LineFailure>,
}

impl Report {
    /// Returns true when at least one line failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
