//! HTML status page generation
//!
//! The page is regenerated from every checkpoint and refreshes itself every
//! five seconds, so a browser pointed at the file follows the crawl live.

use crate::state::{CrawlProgress, CrawlStatus};
use chrono::{DateTime, Utc};

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; }
    h1, h2, h3 { margin-top: 20px; }
    .progress-bar-container { width: 100%; background-color: #f0f0f0; border-radius: 4px; margin: 10px 0; }
    .progress-bar { height: 24px; background-color: #4CAF50; border-radius: 4px; text-align: center; line-height: 24px; color: white; }
    .agency { margin: 20px 0; padding: 10px; border: 1px solid #ddd; border-radius: 4px; }
    .status { padding: 10px; border-radius: 4px; margin-bottom: 20px; font-weight: bold; }
    .running { background-color: #e7f3ff; color: #0066cc; }
    .completed { background-color: #e6ffe6; color: #006600; }
    .error { background-color: #ffebe6; color: #cc0000; }
    .incomplete { background-color: #fff4e0; color: #995c00; }
"#;

/// Renders the status page for a checkpoint
///
/// # Arguments
///
/// * `progress` - The checkpoint to render
/// * `now` - Reference time for the elapsed-minutes figure
pub fn render_status_page(progress: &CrawlProgress, now: DateTime<Utc>) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("  <title>Agency Word Count Progress</title>\n");
    html.push_str("  <meta http-equiv=\"refresh\" content=\"5\">\n");
    html.push_str(&format!("  <style>{}</style>\n", STYLE));
    html.push_str("</head>\n<body>\n");
    html.push_str("  <h1>Agency Word Count Progress</h1>\n");

    html.push_str(&format!(
        "  <div class=\"status {}\">Status: {}</div>\n",
        status_class(progress.status),
        progress.status.label()
    ));

    if let Some(error) = &progress.error {
        html.push_str(&format!("  <p>Error: {}</p>\n", escape_html(error)));
    }

    let percent = progress.percent_complete();
    html.push_str(&progress_bar(percent, &format!("{}% Complete", percent)));

    let current = if progress.current_agency.is_empty() {
        "Not started".to_string()
    } else {
        escape_html(&progress.current_agency)
    };
    html.push_str(&format!("  <p>Currently processing: {}</p>\n", current));
    html.push_str(&format!(
        "  <p>Elapsed time: {} minutes</p>\n",
        progress.elapsed_minutes(now)
    ));
    html.push_str(&format!(
        "  <p>Agencies completed: {} / {}</p>\n",
        progress.completed_agencies, progress.total_agencies
    ));

    html.push_str("  <h2>Agency Details</h2>\n");
    for name in progress.agency_names() {
        let Some(agency) = progress.agencies_progress.get(name) else {
            continue;
        };
        let agency_percent = agency.percent_complete();

        html.push_str("  <div class=\"agency\">\n");
        html.push_str(&format!("    <h3>{}</h3>\n", escape_html(name)));
        html.push_str(&progress_bar(agency_percent, &format!("{}%", agency_percent)));
        html.push_str(&format!(
            "    <p>Words counted: {}</p>\n",
            group_thousands(agency.word_count)
        ));
        html.push_str(&format!(
            "    <p>Parts processed: {} / {}</p>\n",
            agency.completed_parts, agency.total_parts
        ));
        html.push_str("  </div>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn status_class(status: CrawlStatus) -> &'static str {
    match status {
        CrawlStatus::Initializing | CrawlStatus::Running => "running",
        CrawlStatus::Completed => "completed",
        CrawlStatus::Incomplete => "incomplete",
        CrawlStatus::Error => "error",
    }
}

fn progress_bar(percent: u32, label: &str) -> String {
    format!(
        "  <div class=\"progress-bar-container\"><div class=\"progress-bar\" style=\"width: {}%;\">{}</div></div>\n",
        percent, label
    )
}

/// Escapes text for inclusion in HTML element content
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Formats an integer with comma thousands separators
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
