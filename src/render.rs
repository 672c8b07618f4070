#![cfg(feature = "web")]

use handlebars::Handlebars;
use serde::Serialize;

use crate::downloader::{Download, PNG_MIME, data_uri};
use crate::state::{Phase, Settlement, ViewState};

const PAGE_TEMPLATE: &str = "index";
const PAGE_TITLE: &str = "Excel Analyzer WebSaaS";

/// What the page template gets to see
#[derive(Debug, Serialize)]
pub struct PageView {
    pub title: &'static str,
    pub loading: bool,
    pub selected_name: Option<String>,
    pub filter_column: String,
    pub filter_value: String,
    pub query: String,
    /// One line about the running or last submission
    pub status: Option<String>,
    /// Pretty-printed summary, absent when there is no result
    pub summary: Option<String>,
    pub chart_src: Option<String>,
    pub chart_width: u32,
    pub chart_height: u32,
    pub download: Option<DownloadLink>,
    /// Alert message as a JSON string literal, safe inside `<script>`
    pub alert: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadLink {
    pub href: String,
    pub file_name: String,
}

impl PageView {
    /// Build the page from a state snapshot plus anything queued for one-time
    /// delivery (an alert and a download).
    pub fn new(state: &ViewState, alert: Option<String>, download: Option<Download>) -> Self {
        let result = state.result.as_deref();
        Self {
            title: PAGE_TITLE,
            loading: state.is_loading(),
            selected_name: state.selected.as_ref().map(|f| f.name.clone()),
            filter_column: state.filter.column.clone().unwrap_or_default(),
            filter_value: state.filter.value.clone().unwrap_or_default(),
            query: state.query.clone(),
            status: status_line(&state.phase),
            summary: result.map(|r| r.summary_pretty()),
            chart_src: result.map(|r| data_uri(PNG_MIME, &r.chart.png)),
            chart_width: result.map(|r| r.chart.width).unwrap_or_default(),
            chart_height: result.map(|r| r.chart.height).unwrap_or_default(),
            download: download.map(|d| DownloadLink {
                href: d.data_uri(),
                file_name: d.file_name,
            }),
            alert: alert.map(|message| script_string(&message)),
        }
    }
}

fn status_line(phase: &Phase) -> Option<String> {
    const STAMP: &str = "%Y-%m-%d %H:%M:%S UTC";
    match phase {
        Phase::Idle => None,
        Phase::Submitting { file_name, .. } => Some(format!("Analyzing {file_name}...")),
        Phase::Settled(Settlement::Ok { at }) => {
            Some(format!("Last analysis: {}", at.format(STAMP)))
        }
        Phase::Settled(Settlement::Err { message, at }) => {
            Some(format!("Last attempt failed at {}: {message}", at.format(STAMP)))
        }
    }
}

/// JSON-quote `s` and neutralise `<` so it can't close the script element
fn script_string(s: &str) -> String {
    serde_json::Value::String(s.to_string())
        .to_string()
        .replace('<', "\\u003c")
}

/// Renders the upload page.
pub struct PageRenderer {
    registry: Handlebars<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, handlebars::TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_template_string(PAGE_TEMPLATE, include_str!("./templates/index.hbs"))?;
        Ok(Self { registry })
    }

    pub fn render(&self, view: &PageView) -> Result<String, handlebars::RenderError> {
        self.registry.render(PAGE_TEMPLATE, view)
    }
}
