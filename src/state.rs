//! View state of the upload page and its transitions.
//!
//! All changes go through [`update`], which mutates a [`ViewState`] and
//! returns the [`Effect`]s the caller has to run. Nothing in here performs
//! I/O, so every transition can be exercised directly in tests.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ClientError;
use crate::model::{AnalysisFilter, AnalysisResult, SelectedFile};

/// Where the page is in its submit cycle
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Nothing submitted yet
    Idle,
    /// A request is in flight
    Submitting { id: Uuid, file_name: String },
    /// The last request finished
    Settled(Settlement),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Ok { at: DateTime<Utc> },
    Err { message: String, at: DateTime<Utc> },
}

/// Everything the page shows, in one record.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub selected: Option<SelectedFile>,
    pub filter: AnalysisFilter,
    pub result: Option<Arc<AnalysisResult>>,
    pub phase: Phase,
    pub query: String,
    /// Message waiting to be shown as a blocking alert
    pub alert: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            selected: None,
            filter: AnalysisFilter::default(),
            result: None,
            phase: Phase::Idle,
            query: String::new(),
            alert: None,
        }
    }
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Submitting { .. })
    }
}

/// Inputs to [`update`]
#[derive(Debug)]
pub enum Msg {
    SelectFile(SelectedFile),
    ClearSelection,
    SetFilter(AnalysisFilter),
    SetQuery(String),
    /// The "Analyze with AI" button. Not wired to anything.
    AnalyzeWithAi,
    Submit,
    Settled {
        id: Uuid,
        outcome: Result<AnalysisResult, ClientError>,
    },
    /// The download effect of a finished submission failed
    DownloadFailed(ClientError),
    DismissAlert,
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send the captured file to the analysis service
    Upload {
        id: Uuid,
        file: SelectedFile,
        filter: AnalysisFilter,
    },
    /// Hand the analyzed workbook to the download sink
    Download(Arc<AnalysisResult>),
    /// Show a blocking message to the user
    Alert(String),
}

/// Apply `msg` to `state` and return the effects to run.
pub fn update(state: &mut ViewState, msg: Msg) -> Vec<Effect> {
    match msg {
        Msg::SelectFile(file) => {
            state.selected = Some(file);
            Vec::new()
        }
        Msg::ClearSelection => {
            state.selected = None;
            Vec::new()
        }
        Msg::SetFilter(filter) => {
            state.filter = filter;
            Vec::new()
        }
        Msg::SetQuery(query) => {
            state.query = query;
            Vec::new()
        }
        Msg::AnalyzeWithAi => Vec::new(),
        Msg::Submit => {
            if state.is_loading() {
                log::debug!("submit ignored, a request is already in flight");
                return Vec::new();
            }
            let Some(file) = state.selected.clone() else {
                return alert(state, ClientError::NoFileSelected.to_string());
            };
            let id = Uuid::new_v4();
            state.phase = Phase::Submitting {
                id,
                file_name: file.name.clone(),
            };
            vec![Effect::Upload {
                id,
                file,
                filter: state.filter.clone(),
            }]
        }
        Msg::Settled { id, outcome } => {
            match &state.phase {
                Phase::Submitting { id: current, .. } if *current == id => {}
                _ => {
                    log::warn!("dropping stale result for submission {id}");
                    return Vec::new();
                }
            }
            let at = Utc::now();
            match outcome {
                Ok(result) => {
                    let result = Arc::new(result);
                    state.result = Some(result.clone());
                    state.phase = Phase::Settled(Settlement::Ok { at });
                    vec![Effect::Download(result)]
                }
                Err(err) => {
                    let message = format!("Error uploading file: {err}");
                    state.phase = Phase::Settled(Settlement::Err {
                        message: message.clone(),
                        at,
                    });
                    alert(state, message)
                }
            }
        }
        Msg::DownloadFailed(err) => alert(
            state,
            format!(
                "Error saving {}: {err}",
                crate::downloader::OUTPUT_FILE_NAME
            ),
        ),
        Msg::DismissAlert => {
            state.alert = None;
            Vec::new()
        }
    }
}

fn alert(state: &mut ViewState, message: String) -> Vec<Effect> {
    state.alert = Some(message.clone());
    vec![Effect::Alert(message)]
}
