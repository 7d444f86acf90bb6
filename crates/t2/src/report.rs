//! `logs.html`: links into OpenSearch Dashboards for one test run.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use handlebars::Handlebars;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

const LOGS_HTML_TEMPLATE: &str = include_str!("../templates/logs.html.hbs");

/// Margin added on both sides of the run's time frame.
const WINDOW_MARGIN_MINUTES: i64 = 5;

const WINDOW_FORMAT: &str = "%Y-%m-%dT%H:%M:00Z";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to render logs.html: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("Failed to write logs.html: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
struct LogsContext<'a> {
    cluster_id: &'a str,
    date_from: String,
    date_to: String,
    opensearch_dashboards_url: &'a str,
}

/// Time frame `[start - 5min, stop + 5min]`, truncated to the minute.
#[must_use]
pub fn log_window(start: DateTime<Utc>, stop: DateTime<Utc>) -> (String, String) {
    let margin = Duration::minutes(WINDOW_MARGIN_MINUTES);
    (
        (start - margin).format(WINDOW_FORMAT).to_string(),
        (stop + margin).format(WINDOW_FORMAT).to_string(),
    )
}

/// Render the page for a test run.
///
/// # Errors
/// Returns an error if the template fails to render.
pub fn render_logs_html(
    cluster_id: &str,
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    dashboards_url: &str,
) -> Result<String, ReportError> {
    let (date_from, date_to) = log_window(start, stop);
    let context = LogsContext {
        cluster_id,
        date_from,
        date_to,
        opensearch_dashboards_url: dashboards_url.trim_end_matches('/'),
    };
    Ok(Handlebars::new().render_template(LOGS_HTML_TEMPLATE, &context)?)
}

/// Render the page for a test run and write it to `path`.
///
/// # Errors
/// Returns an error if rendering or writing fails.
pub fn write_logs_html(
    path: &Path,
    cluster_id: &str,
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    dashboards_url: &str,
) -> Result<(), ReportError> {
    let html = render_logs_html(cluster_id, start, stop, dashboards_url)?;
    std::fs::write(path, html)?;
    info!(path = %path.display(), "Wrote log links");
    Ok(())
}
