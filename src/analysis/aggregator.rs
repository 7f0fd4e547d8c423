//! Entity aggregation and statistics.
//!
//! This module reduces the lines of a batch into per-type counts and
//! summary statistics. All functions take shared slices; orderings needed
//! for ranking are computed on copies, so the first-seen order of the
//! counts is never disturbed.

use crate::models::{BatchSummary, EntityCount, LineResult, NO_TOP_TYPE};
use std::collections::HashMap;

/// Count entities by primary type, in first-seen order.
pub fn aggregate(results: &[LineResult]) -> Vec<EntityCount> {
    let mut counts: Vec<EntityCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for entity in results.iter().flat_map(|r| &r.entities) {
        let entity_type = entity.primary_type();
        match index.get(entity_type) {
            Some(&slot) => counts[slot].count += 1,
            None => {
                index.insert(entity_type, counts.len());
                counts.push(EntityCount {
                    entity_type: entity_type.to_string(),
                    count: 1,
                });
            }
        }
    }

    counts
}

/// Copy of `counts` sorted by descending count; ties keep their order.
pub fn rank_by_count(counts: &[EntityCount]) -> Vec<EntityCount> {
    let mut ranked = counts.to_vec();
    ranked.sort_by_key(|c| std::cmp::Reverse(c.count));
    ranked
}

/// Get the `n` most frequent types.
pub fn top_types(counts: &[EntityCount], n: usize) -> Vec<EntityCount> {
    let mut ranked = rank_by_count(counts);
    ranked.truncate(n);
    ranked
}

/// Summarize a batch from its counts.
pub fn summarize(counts: &[EntityCount], total_lines: usize) -> BatchSummary {
    let total_entities = counts.iter().map(|c| c.count).sum();
    let top_type = rank_by_count(counts)
        .into_iter()
        .next()
        .map(|c| c.entity_type)
        .unwrap_or_else(|| NO_TOP_TYPE.to_string());

    BatchSummary {
        total_lines,
        total_entities,
        top_type,
    }
}

/// Percentage share of each type, in the order of `counts`.
pub fn type_shares(counts: &[EntityCount]) -> Vec<(String, f64)> {
    let total: usize = counts.iter().map(|c| c.count).sum();
    if total == 0 {
        return Vec::new();
    }

    counts
        .iter()
        .map(|c| (c.entity_type.clone(), c.count as f64 * 100.0 / total as f64))
        .collect()
}

/// Average number of entities per processed line.
pub fn entities_per_line(results: &[LineResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }

    let total: usize = results.iter().map(|r| r.entities.len()).sum();
    total as f64 / results.len() as f64
}

/// Mean provider confidence per primary type, in first-seen order.
pub fn mean_confidence_by_type(results: &[LineResult]) -> Vec<(String, f64)> {
    let mut sums: Vec<(String, f64, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for entity in results.iter().flat_map(|r| &r.entities) {
        let entity_type = entity.primary_type();
        let slot = *index.entry(entity_type).or_insert_with(|| {
            sums.push((entity_type.to_string(), 0.0, 0));
            sums.len() - 1
        });
        sums[slot].1 += entity.confidence_score;
        sums[slot].2 += 1;
    }

    sums.into_iter()
        .map(|(entity_type, sum, n)| (entity_type, sum / n as f64))
        .collect()
}

/// Lines with the most entities, busiest first.
pub fn busiest_lines(results: &[LineResult], n: usize) -> Vec<(&LineResult, usize)> {
    let mut lines: Vec<_> = results
        .iter()
        .map(|r| (r, r.entities.len()))
        .filter(|(_, count)| *count > 0)
        .collect();

    lines.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    lines.truncate(n);

    lines
}

/// Generate a text summary of batch statistics.
pub fn generate_summary_text(summary: &BatchSummary, counts: &[EntityCount]) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Lines processed: {}", summary.total_lines));
    lines.push(format!("Total entities: {}", summary.total_entities));
    lines.push(format!("Most frequent entity type: {}", summary.top_type));

    if !counts.is_empty() {
        lines.push(String::new());
        lines.push("By Type:".to_string());

        for count in counts {
            lines.push(format!("- {}: {}", count.entity_type, count.count));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, UNKNOWN_TYPE};

    fn entity(types: &[&str], confidence: f64) -> Entity {
        Entity {
            entity_id: "id".to_string(),
            entity_type: types.iter().map(|t| t.to_string()).collect(),
            confidence_score: confidence,
            matched_text: "text".to_string(),
            external_types: None,
        }
    }

    fn line(entities: Vec<Entity>) -> LineResult {
        LineResult {
            text: "some line".to_string(),
            entities,
        }
    }

    fn count(entity_type: &str, count: usize) -> EntityCount {
        EntityCount {
            entity_type: entity_type.to_string(),
            count,
        }
    }

    fn sample_batch() -> Vec<LineResult> {
        vec![
            line(vec![entity(&["Place"], 0.9), entity(&["Person", "Agent"], 0.5)]),
            line(vec![]),
            line(vec![
                entity(&["Person"], 0.7),
                entity(&[], 0.2),
                entity(&["Person"], 0.6),
            ]),
        ]
    }

    #[test]
    fn test_aggregate_first_seen_order() {
        let counts = aggregate(&sample_batch());
        assert_eq!(
            counts,
            vec![count("Place", 1), count("Person", 3), count(UNKNOWN_TYPE, 1)]
        );
    }

    #[test]
    fn test_aggregate_conserves_entity_total() {
        let batch = sample_batch();
        let counts = aggregate(&batch);

        let entities: usize = batch.iter().map(|r| r.entities.len()).sum();
        let counted: usize = counts.iter().map(|c| c.count).sum();
        assert_eq!(entities, counted);
        assert!(counts.iter().all(|c| c.count >= 1));
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let batch = sample_batch();
        let mut reversed = batch.clone();
        reversed.reverse();

        let mut forward = aggregate(&batch);
        let mut backward = aggregate(&reversed);
        forward.sort_by(|a, b| a.entity_type.cmp(&b.entity_type));
        backward.sort_by(|a, b| a.entity_type.cmp(&b.entity_type));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_empty_type_counts_as_unknown() {
        let counts = aggregate(&[line(vec![entity(&[], 0.3), entity(&[], 0.4)])]);
        assert_eq!(counts, vec![count(UNKNOWN_TYPE, 2)]);
    }

    #[test]
    fn test_summarize() {
        let counts = vec![count("Place", 1), count("Person", 3), count("Thing", 3)];
        let summary = summarize(&counts, 4);

        assert_eq!(summary.total_lines, 4);
        assert_eq!(summary.total_entities, 7);
        // Ties go to the type seen first.
        assert_eq!(summary.top_type, "Person");
        // Caller's order is untouched.
        assert_eq!(counts[0].entity_type, "Place");
    }

    #[test]
    fn test_summarize_empty_uses_placeholder() {
        let summary = summarize(&[], 0);
        assert_eq!(summary.total_entities, 0);
        assert_eq!(summary.top_type, NO_TOP_TYPE);
    }

    #[test]
    fn test_top_types() {
        let counts = vec![count("A", 1), count("B", 5), count("C", 2)];
        let top = top_types(&counts, 2);

        assert_eq!(top, vec![count("B", 5), count("C", 2)]);
    }

    #[test]
    fn test_type_shares() {
        let shares = type_shares(&[count("A", 1), count("B", 3)]);
        assert_eq!(shares[0], ("A".to_string(), 25.0));
        assert_eq!(shares[1], ("B".to_string(), 75.0));

        assert!(type_shares(&[]).is_empty());
    }

    #[test]
    fn test_entities_per_line_and_confidence() {
        let batch = sample_batch();
        assert!((entities_per_line(&batch) - 5.0 / 3.0).abs() < 1e-9);
        assert_eq!(entities_per_line(&[]), 0.0);

        let confidence = mean_confidence_by_type(&batch);
        assert_eq!(confidence[0].0, "Place");
        assert!((confidence[0].1 - 0.9).abs() < 1e-9);
        assert_eq!(confidence[1].0, "Person");
        assert!((confidence[1].1 - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_busiest_lines() {
        let batch = sample_batch();
        let busiest = busiest_lines(&batch, 5);

        assert_eq!(busiest.len(), 2);
        assert_eq!(busiest[0].1, 3);
        assert_eq!(busiest[1].1, 2);
    }

    #[test]
    fn test_generate_summary_text() {
        let counts = vec![count("Person", 2)];
        let text = generate_summary_text(&summarize(&counts, 1), &counts);

        assert!(text.contains("Lines processed: 1"));
        assert!(text.contains("Most frequent entity type: Person"));
        assert!(text.contains("- Person: 2"));
    }
}
