//! Report generation.
//!
//! Builds a [`Report`](crate::models::Report) from a finished batch and
//! renders it as a self-contained HTML page, Markdown or JSON.

pub mod generator;
pub mod html;

pub use generator::{build_report, generate_json_report, generate_markdown_report, write_report};
pub use html::generate_html_report;
