use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::downloader::{Download, DownloadSink};
use crate::error::ClientError;
use crate::model::{AnalysisFilter, AnalysisResult, SelectedFile};
use crate::service::AnalysisService;
use crate::state::{Effect, Msg, ViewState, update};

/// What a call to [`UploadClient::submit`] ended in
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The analysis came back and its workbook was delivered
    Completed(Arc<AnalysisResult>),
    /// Nothing was sent; a request was already in flight
    Busy,
    /// Nothing was sent; no file was selected
    Rejected(String),
    /// The request, the response or the download failed
    Failed(String),
}

/// The upload view: one state record, one analysis service, one download sink.
///
/// Every change goes through [`update`]. The state lock is never held across
/// the network call, so the page can still be rendered while a request is in
/// flight.
pub struct UploadClient<S, D> {
    state: Mutex<ViewState>,
    service: S,
    sink: D,
}

impl<S: AnalysisService, D: DownloadSink> UploadClient<S, D> {
    pub fn new(service: S, sink: D) -> Self {
        Self {
            state: Mutex::new(ViewState::default()),
            service,
            sink,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// A copy of the current view state
    pub fn snapshot(&self) -> ViewState {
        self.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading()
    }

    pub fn select_file(&self, file: SelectedFile) {
        if file.kind() == crate::model::FileKind::Other {
            log::warn!(
                "{} is not one of .{}, the service will probably reject it",
                file.name,
                crate::model::ACCEPTED_EXTENSIONS.join(", .")
            );
        }
        self.dispatch(Msg::SelectFile(file));
    }

    pub fn clear_selection(&self) {
        self.dispatch(Msg::ClearSelection);
    }

    pub fn set_filter(&self, filter: AnalysisFilter) {
        self.dispatch(Msg::SetFilter(filter));
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.dispatch(Msg::SetQuery(query.into()));
    }

    /// The "Analyze with AI" button. Does nothing.
    pub fn analyze_with_ai(&self) {
        self.dispatch(Msg::AnalyzeWithAi);
    }

    /// Take the pending alert, if any
    pub fn take_alert(&self) -> Option<String> {
        let mut state = self.lock();
        let alert = state.alert.clone();
        update(&mut state, Msg::DismissAlert);
        alert
    }

    /// Upload the selected file and wait for the analysis.
    pub async fn submit(&self) -> SubmitOutcome {
        let effects = self.dispatch(Msg::Submit);
        let Some(effect) = effects.into_iter().next() else {
            return SubmitOutcome::Busy;
        };

        let (id, file, filter) = match effect {
            Effect::Upload { id, file, filter } => (id, file, filter),
            Effect::Alert(message) => return SubmitOutcome::Rejected(message),
            Effect::Download(result) => return SubmitOutcome::Completed(result),
        };

        log::info!("submission {id}: analyzing {}", file.name);
        let guard = CancelGuard {
            state: &self.state,
            id,
            armed: true,
        };
        let outcome = self.service.analyze(file, filter).await;
        guard.disarm();
        if let Err(err) = &outcome {
            log::error!("submission {id} failed: {err}");
        }

        let mut completed = None;
        for effect in self.dispatch(Msg::Settled { id, outcome }) {
            match effect {
                Effect::Download(result) => {
                    if let Err(err) = self.sink.deliver(Download::output_of(&result)) {
                        log::error!("submission {id}: could not deliver download: {err}");
                        return match self.dispatch(Msg::DownloadFailed(err)).pop() {
                            Some(Effect::Alert(message)) => SubmitOutcome::Failed(message),
                            _ => SubmitOutcome::Failed(String::new()),
                        };
                    }
                    completed = Some(result);
                }
                Effect::Alert(message) => return SubmitOutcome::Failed(message),
                Effect::Upload { .. } => {}
            }
        }

        match completed {
            Some(result) => {
                log::info!("submission {id} completed");
                SubmitOutcome::Completed(result)
            }
            // The settle message was stale; someone else owns the state now
            None => SubmitOutcome::Busy,
        }
    }

    fn dispatch(&self, msg: Msg) -> Vec<Effect> {
        update(&mut self.lock(), msg)
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<ViewState>) -> MutexGuard<'_, ViewState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Settles the submission as failed if the submit future is dropped
/// mid-request, e.g. when the browser goes away.
struct CancelGuard<'a> {
    state: &'a Mutex<ViewState>,
    id: Uuid,
    armed: bool,
}

impl CancelGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            log::warn!("submission {} cancelled before it settled", self.id);
            update(
                &mut lock_state(self.state),
                Msg::Settled {
                    id: self.id,
                    outcome: Err(ClientError::Transport("Request cancelled".to_string())),
                },
            );
        }
    }
}
