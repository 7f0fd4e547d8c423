//! Self-contained HTML report page.
//!
//! Every piece of report data is written through [`SafeHtml`]; only the
//! fixed page skeleton is appended verbatim.

use crate::analysis::{mean_confidence_by_type, top_types, type_shares};
use crate::annotate::SafeHtml;
use crate::config::ReportConfig;
use crate::models::{AnnotatedLine, LineResult, Report};

const STYLE: &str = r#"<style>
body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 960px; color: #222; }
h1 { margin-bottom: 0.25rem; }
.meta { color: #666; font-size: 0.9rem; }
.stats { display: flex; gap: 1rem; margin: 1.5rem 0; }
.stat { flex: 1; border: 1px solid #ddd; border-radius: 6px; padding: 1rem; text-align: center; }
.stat .value { font-size: 1.8rem; font-weight: bold; }
table { border-collapse: collapse; width: 100%; margin-bottom: 1.5rem; }
th, td { border-bottom: 1px solid #eee; padding: 0.4rem; text-align: left; }
.bar { background: #4a90d9; height: 0.8rem; border-radius: 3px; }
.lines li { margin-bottom: 0.8rem; line-height: 1.6; }
.entity-badge { background: #fff3b0; border-radius: 3px; padding: 0 0.2rem; }
.entity-badge::after { content: attr(data-entity-type); font-size: 0.7rem; color: #555; margin-left: 0.3rem; }
.entity-tag { display: inline-block; background: #e8eefc; border-radius: 10px; padding: 0 0.5rem; margin-right: 0.3rem; font-size: 0.8rem; }
.failures li { color: #b00020; }
</style>"#;

/// Generate the HTML report page.
pub fn generate_html_report(report: &Report, options: &ReportConfig) -> String {
    let mut page = SafeHtml::default();

    page.push_static("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>");
    page.push_text(&options.title);
    page.push_static("</title>\n");
    page.push_static(STYLE);
    page.push_static("\n</head>\n<body>\n<h1>");
    page.push_text(&options.title);
    page.push_static("</h1>\n");

    push_metadata(&mut page, report);
    push_stats(&mut page, report);
    push_counts(&mut page, report, options.top_types);
    push_lines(&mut page, &report.lines, options.include_badges);

    if options.include_failures {
        push_failures(&mut page, report);
    }

    page.push_static("<footer class=\"meta\">Report generated by NerLens v");
    page.push_text(env!("CARGO_PKG_VERSION"));
    page.push_static("</footer>\n</body>\n</html>\n");

    page.into_string()
}

fn push_metadata(page: &mut SafeHtml, report: &Report) {
    let metadata = &report.metadata;

    page.push_static("<p class=\"meta\">Source: <code>");
    page.push_text(&metadata.source);
    page.push_static("</code> &middot; Provider: ");
    page.push_text(&metadata.provider);
    page.push_static(" &middot; ");
    page.push_text(
        &metadata
            .analysis_date
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
    );
    page.push_static(" &middot; ");
    page.push_text(&format!("{:.1}s", metadata.duration_seconds));
    page.push_static("</p>\n");
}

fn push_stat(page: &mut SafeHtml, label: &'static str, value: &str) {
    page.push_static("<div class=\"stat\"><div class=\"value\">");
    page.push_text(value);
    page.push_static("</div><div>");
    page.push_static(label);
    page.push_static("</div></div>\n");
}

fn push_stats(page: &mut SafeHtml, report: &Report) {
    page.push_static("<section class=\"stats\">\n");
    push_stat(page, "Lines processed", &report.summary.total_lines.to_string());
    push_stat(page, "Total entities", &report.summary.total_entities.to_string());
    push_stat(page, "Most frequent type", &report.summary.top_type);
    if report.metadata.lines_failed > 0 {
        push_stat(page, "Lines failed", &report.metadata.lines_failed.to_string());
    }
    page.push_static("</section>\n");
}

fn push_counts(page: &mut SafeHtml, report: &Report, top_n: usize) {
    let counts = &report.entity_counts;

    page.push_static("<section>\n<h2>Entities by Type</h2>\n");
    if counts.is_empty() {
        page.push_static("<p>No entities were found in the processed lines.</p>\n</section>\n");
        return;
    }

    page.push_static("<table>\n<tr><th>Type</th><th>Count</th><th>Share</th></tr>\n");
    for (count, (_, share)) in counts.iter().zip(type_shares(counts)) {
        page.push_static("<tr><td>");
        page.push_text(&count.entity_type);
        page.push_static("</td><td>");
        page.push_text(&count.count.to_string());
        page.push_static("</td><td><div class=\"bar\" style=\"width: ");
        page.push_text(&format!("{:.1}%", share));
        page.push_static("\"></div></td></tr>\n");
    }
    page.push_static("</table>\n");

    page.push_static("<h3>Top Types</h3>\n<ol>\n");
    for count in top_types(counts, top_n) {
        page.push_static("<li>");
        page.push_text(&format!("{} ({})", count.entity_type, count.count));
        page.push_static("</li>\n");
    }
    page.push_static("</ol>\n");

    let results: Vec<LineResult> = report
        .lines
        .iter()
        .map(|line| LineResult {
            text: line.text.clone(),
            entities: line.entities.clone(),
        })
        .collect();

    page.push_static("<h3>Mean Confidence</h3>\n<table>\n<tr><th>Type</th><th>Confidence</th></tr>\n");
    for (entity_type, mean) in mean_confidence_by_type(&results) {
        page.push_static("<tr><td>");
        page.push_text(&entity_type);
        page.push_static("</td><td>");
        page.push_text(&format!("{:.2}", mean));
        page.push_static("</td></tr>\n");
    }
    page.push_static("</table>\n</section>\n");
}

fn push_lines(page: &mut SafeHtml, lines: &[AnnotatedLine], include_badges: bool) {
    page.push_static("<section>\n<h2>Annotated Lines</h2>\n");
    if lines.is_empty() {
        page.push_static("<p>No lines were processed.</p>\n</section>\n");
        return;
    }

    page.push_static("<ol class=\"lines\">\n");
    for line in lines {
        page.push_static("<li><div>");
        page.push_safe(&line.html);
        page.push_static("</div>");

        if include_badges && !line.entities.is_empty() {
            page.push_static("<div>");
            for entity in &line.entities {
                page.push_static("<span class=\"entity-tag\">");
                page.push_text(entity.primary_type());
                page.push_static("</span>");
            }
            page.push_static("</div>");
        }

        page.push_static("</li>\n");
    }
    page.push_static("</ol>\n</section>\n");
}

fn push_failures(page: &mut SafeHtml, report: &Report) {
    if !report.has_failures() {
        return;
    }

    page.push_static("<section>\n<h2>Failed Lines</h2>\n<ul class=\"failures\">\n");
    for failure in &report.failures {
        page.push_static("<li>&quot;");
        page.push_text(&failure.line);
        page.push_static("&quot; (");
        page.push_text(&failure.reason);
        page.push_static(")</li>\n");
    }
    page.push_static("</ul>\n</section>\n");
}
