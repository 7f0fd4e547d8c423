//! Entity highlighting.
//!
//! Turns a line of text and its entities into escaped markup in which
//! every entity occurrence is wrapped in a typed span.

pub mod highlight;

pub use highlight::{escape_html, highlight_line, SafeHtml};
