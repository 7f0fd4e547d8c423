//! Escaping and entity span injection.
//!
//! All output goes through [`SafeHtml`], which can only be built from
//! escaped text or from the span markup produced here. Raw text cannot
//! reach the output without being escaped first.

use crate::models::{Entity, LineResult, UNKNOWN_TYPE};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::sync::OnceLock;
use tracing::debug;

/// Escape the markup-significant characters `& < > " '`.
pub fn escape_html(unsafe_text: &str) -> String {
    let mut escaped = String::with_capacity(unsafe_text.len());

    for c in unsafe_text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }

    escaped
}

/// Markup that is safe to embed verbatim in an HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeHtml(String);

impl SafeHtml {
    /// Append untrusted text, escaping it.
    pub fn push_text(&mut self, raw: &str) {
        self.0.push_str(&escape_html(raw));
    }

    /// Append an entity span around `matched`.
    pub fn push_entity(&mut self, matched: &str, entity_type: &str) {
        self.0.push_str("<span class=\"entity-badge\" data-entity-type=\"");
        self.push_text(entity_type);
        self.0.push_str("\">");
        self.push_text(matched);
        self.0.push_str("</span>");
    }

    /// Append fixed markup written into the program.
    pub fn push_static(&mut self, markup: &'static str) {
        self.0.push_str(markup);
    }

    /// Append another fragment that is already safe.
    pub fn push_safe(&mut self, other: &SafeHtml) {
        self.0.push_str(other.as_str());
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

// Serialized as the plain markup string; there is no way back in.
impl Serialize for SafeHtml {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Text to highlight and the type label to attach to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightItem {
    pub matched_text: String,
    pub entity_type: Option<String>,
}

impl HighlightItem {
    pub fn new(matched_text: impl Into<String>, entity_type: Option<&str>) -> Self {
        Self {
            matched_text: matched_text.into(),
            entity_type: entity_type.map(String::from),
        }
    }

    fn type_label(&self) -> &str {
        self.entity_type.as_deref().unwrap_or(UNKNOWN_TYPE)
    }
}

impl From<&Entity> for HighlightItem {
    fn from(entity: &Entity) -> Self {
        Self::new(entity.matched_text.clone(), Some(entity.primary_type()))
    }
}

/// A run of the source line, either untouched or claimed by an entity.
#[derive(Debug, Clone, Copy)]
enum Segment<'a> {
    Plain(&'a str),
    Marked { text: &'a str, entity_type: &'a str },
}

/// Wrap every whole-word, case-insensitive occurrence of each item.
///
/// Items are applied in order. Text already claimed by an earlier item is
/// never matched again, so a later item cannot reach into generated spans.
pub fn highlight_entities(text: &str, items: &[HighlightItem]) -> SafeHtml {
    let mut segments = vec![Segment::Plain(text)];

    for item in items {
        let Some(pattern) = word_pattern(&item.matched_text) else {
            debug!("Skipping entity with unusable text: {:?}", item.matched_text);
            continue;
        };

        let entity_type = item.type_label();
        segments = segments
            .into_iter()
            .flat_map(|segment| split_segment(segment, &pattern, entity_type))
            .collect();
    }

    let mut html = SafeHtml::default();
    for segment in segments {
        match segment {
            Segment::Plain(raw) => html.push_text(raw),
            Segment::Marked { text, entity_type } => html.push_entity(text, entity_type),
        }
    }

    html
}

/// Highlight a processed line using the primary type of each entity.
pub fn highlight_line(line: &LineResult) -> SafeHtml {
    let items: Vec<HighlightItem> = line.entities.iter().map(HighlightItem::from).collect();
    highlight_entities(&line.text, &items)
}

/// Whether `c` is a word character in the sense of the regex `\w` class,
/// so `\b` is only placed where it can hold.
fn is_word_char(c: char) -> bool {
    static WORD_CHAR: OnceLock<Option<Regex>> = OnceLock::new();

    WORD_CHAR
        .get_or_init(|| Regex::new(r"^\w$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(c.encode_utf8(&mut [0; 4])))
}

/// Build a literal, case-insensitive pattern for `needle`.
///
/// Word boundaries are only asserted on edges that are word characters;
/// a boundary next to punctuation such as the `+` in `C++` can never hold.
fn word_pattern(needle: &str) -> Option<Regex> {
    if needle.trim().is_empty() {
        return None;
    }

    let starts_with_word = needle.chars().next().is_some_and(is_word_char);
    let ends_with_word = needle.chars().last().is_some_and(is_word_char);

    let mut pattern = String::from("(?i)");
    if starts_with_word {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(needle));
    if ends_with_word {
        pattern.push_str(r"\b");
    }

    Regex::new(&pattern).ok()
}

fn split_segment<'a>(
    segment: Segment<'a>,
    pattern: &Regex,
    entity_type: &'a str,
) -> Vec<Segment<'a>> {
    let Segment::Plain(raw) = segment else {
        return vec![segment];
    };

    let mut parts = Vec::new();
    let mut cursor = 0;

    for found in pattern.find_iter(raw) {
        if found.start() > cursor {
            parts.push(Segment::Plain(&raw[cursor..found.start()]));
        }
        parts.push(Segment::Marked {
            text: found.as_str(),
            entity_type,
        });
        cursor = found.end();
    }

    if cursor < raw.len() {
        parts.push(Segment::Plain(&raw[cursor..]));
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str, entity_type: &str) -> HighlightItem {
        HighlightItem::new(text, Some(entity_type))
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<div class="a">Tom & Jerry's</div>"#),
            "&lt;div class=&quot;a&quot;&gt;Tom &amp; Jerry&#039;s&lt;/div&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_highlight_two_entities() {
        let html = highlight_entities(
            "George Bush was president of USA.",
            &[item("George Bush", "Person"), item("USA", "Country")],
        );

        assert_eq!(
            html.as_str(),
            "<span class=\"entity-badge\" data-entity-type=\"Person\">George Bush</span> \
             was president of \
             <span class=\"entity-badge\" data-entity-type=\"Country\">USA</span>."
        );
    }

    #[test]
    fn test_whole_word_only() {
        let html = highlight_entities("USAF and USA", &[item("USA", "Country")]);

        assert!(html.as_str().starts_with("USAF and "));
        assert_eq!(html.as_str().matches("<span").count(), 1);
        assert!(html
            .as_str()
            .ends_with("<span class=\"entity-badge\" data-entity-type=\"Country\">USA</span>"));
    }

    #[test]
    fn test_case_insensitive_keeps_source_casing() {
        let html = highlight_entities("Visit the USA soon", &[item("usa", "Country")]);
        assert!(html.as_str().contains("data-entity-type=\"Country\">USA</span>"));
    }

    #[test]
    fn test_every_occurrence_is_wrapped() {
        let html = highlight_entities("Paris, paris and PARIS", &[item("Paris", "City")]);
        assert_eq!(html.as_str().matches("data-entity-type=\"City\"").count(), 3);
    }

    #[test]
    fn test_pattern_characters_are_literal() {
        let html = highlight_entities("U.S. and UxSx", &[item("U.S.", "Country")]);
        assert_eq!(html.as_str().matches("<span").count(), 1);
        assert!(html.as_str().contains(">U.S.</span>"));

        let html = highlight_entities("I write C++ daily", &[item("C++", "Language")]);
        assert!(html.as_str().contains(">C++</span>"));

        let html = highlight_entities("cost (approx) $5", &[item("(approx", "Misc")]);
        assert!(html.as_str().contains(">(approx</span>"));
    }

    #[test]
    fn test_missing_type_defaults_to_unknown() {
        let html = highlight_entities("Apple rocks", &[HighlightItem::new("Apple", None)]);
        assert!(html.as_str().contains("data-entity-type=\"Unknown\""));
    }

    #[test]
    fn test_text_is_escaped() {
        let html = highlight_entities(
            "<script>alert('x')</script> & Bob",
            &[item("Bob", "Person")],
        );

        let outside_spans = html
            .as_str()
            .replace("<span class=\"entity-badge\" data-entity-type=\"Person\">", "")
            .replace("</span>", "");
        assert!(!outside_spans.contains('<'));
        assert!(!outside_spans.contains('>'));
        assert!(!outside_spans.contains('\''));
        assert!(outside_spans.contains("&lt;script&gt;"));
        assert!(outside_spans.contains("&amp; Bob"));
    }

    #[test]
    fn test_type_and_match_are_escaped() {
        let html = highlight_entities(
            "AT&T \"quoted\"",
            &[item("AT&T", "\"><img src=x>"), item("quoted", "O'Brien")],
        );

        assert!(html.as_str().contains(
            "data-entity-type=\"&quot;&gt;&lt;img src=x&gt;\">AT&amp;T</span>"
        ));
        assert!(html.as_str().contains("data-entity-type=\"O&#039;Brien\">quoted</span>"));
        assert!(!html.as_str().contains("<img"));
    }

    #[test]
    fn test_later_entities_do_not_match_generated_markup() {
        let html = highlight_entities(
            "The entity badge span",
            &[item("badge", "Thing"), item("entity", "Thing"), item("span", "Thing")],
        );

        assert_eq!(html.as_str().matches("<span").count(), 3);
        assert_eq!(html.as_str().matches("</span>").count(), 3);
        assert!(html.as_str().starts_with("The <span class=\"entity-badge\""));
    }

    #[test]
    fn test_overlapping_entities_keep_first_claim() {
        let html = highlight_entities(
            "New York City",
            &[item("New York City", "City"), item("York", "Person")],
        );

        assert_eq!(html.as_str().matches("<span").count(), 1);
        assert!(!html.as_str().contains("Person"));
    }

    #[test]
    fn test_trailing_non_word_symbol_still_matches() {
        let html = highlight_entities("an area of 5 km² here", &[item("km²", "Unit")]);
        assert_eq!(
            html.as_str(),
            "an area of 5 <span class=\"entity-badge\" data-entity-type=\"Unit\">km²</span> here"
        );

        let html = highlight_entities("x² grows", &[item("x²", "Math")]);
        assert!(html.as_str().starts_with("<span class=\"entity-badge\" data-entity-type=\"Math\">x²</span>"));
    }

    #[test]
    fn test_serializes_as_markup_string() {
        let html = highlight_entities("a < b", &[]);
        assert_eq!(serde_json::to_string(&html).unwrap(), "\"a &lt; b\"");
    }

    #[test]
    fn test_entity_reference_text_is_not_matched() {
        let html = highlight_entities("salt & pepper", &[item("amp", "Unit")]);
        assert_eq!(html.as_str(), "salt &amp; pepper");
    }

    #[test]
    fn test_empty_matched_text_is_skipped() {
        let html = highlight_entities("nothing here", &[item("", "Void"), item("  ", "Void")]);
        assert_eq!(html.as_str(), "nothing here");
    }

    #[test]
    fn test_highlight_line_uses_primary_type() {
        let line = LineResult {
            text: "Google hired Ada".to_string(),
            entities: vec![
                Entity {
                    entity_id: "Google".to_string(),
                    entity_type: vec!["Organisation".to_string(), "Company".to_string()],
                    confidence_score: 0.9,
                    matched_text: "Google".to_string(),
                    external_types: None,
                },
                Entity {
                    entity_id: "Ada".to_string(),
                    entity_type: vec![],
                    confidence_score: 0.4,
                    matched_text: "Ada".to_string(),
                    external_types: None,
                },
            ],
        };

        let html = highlight_line(&line);
        assert!(html.as_str().contains("data-entity-type=\"Organisation\">Google</span>"));
        assert!(html.as_str().contains("data-entity-type=\"Unknown\">Ada</span>"));
    }
}
