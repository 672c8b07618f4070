#![cfg(feature = "web")]

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::client::{SubmitOutcome, UploadClient};
use crate::config::{ClientConfig, WebConfig};
use crate::downloader::{Download, OUTPUT_FILE_NAME, PNG_MIME, QueuedSink, XLSX_MIME};
use crate::model::{AnalysisFilter, SelectedFile};
use crate::render::{PageRenderer, PageView};
use crate::service::{AnalysisService, FILE_FIELD, HttpAnalysisService};

/// Shared state of the web front: the single upload view and its renderer.
pub struct AppState<S> {
    pub client: UploadClient<S, Arc<QueuedSink>>,
    pub downloads: Arc<QueuedSink>,
    renderer: PageRenderer,
}

impl<S: AnalysisService> AppState<S> {
    pub fn new(service: S) -> Result<Self, Box<dyn std::error::Error>> {
        let downloads = Arc::new(QueuedSink::new());
        Ok(Self {
            client: UploadClient::new(service, downloads.clone()),
            downloads,
            renderer: PageRenderer::new()?,
        })
    }

    /// Render the page, handing out the pending alert once. The download is
    /// passed in only by the upload that produced it.
    fn page(&self, download: Option<Download>) -> Response {
        let alert = self.client.take_alert();
        let view = PageView::new(&self.client.snapshot(), alert, download);
        match self.renderer.render(&view) {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                log::error!("failed to render page: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
            }
        }
    }
}

/// Build the router for the web front
pub fn router<S: AnalysisService>(state: Arc<AppState<S>>, web: &WebConfig) -> Router {
    Router::new()
        .route("/", get(serve_page::<S>))
        .route("/analyze", post(analyze::<S>))
        .route("/download/analyzed_output.xlsx", get(download_output::<S>))
        .route("/chart.png", get(chart_image::<S>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(web.max_upload_bytes())),
        )
        .with_state(state)
}

pub async fn run(client: ClientConfig, web: WebConfig) -> Result<(), Box<dyn std::error::Error>> {
    let service = HttpAnalysisService::new(&client)?;
    log::info!("analysis endpoint: {}", service.url());

    let state = Arc::new(AppState::new(service)?);
    let app = router(state, &web);

    let listener = TcpListener::bind(web.bind).await?;
    log::info!("Listening on http://{}", web.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_page<S: AnalysisService>(State(state): State<Arc<AppState<S>>>) -> Response {
    state.page(None)
}

/// Form fields of one `POST /analyze`
#[derive(Default)]
struct UploadForm {
    file: Option<SelectedFile>,
    column_filter: Option<String>,
    value_filter: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, String> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let field_name = field.name().unwrap_or("unknown").to_string();
        match field_name.as_str() {
            FILE_FIELD => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| e.to_string())?;
                // Browsers send an empty, nameless part when nothing was picked
                if !file_name.is_empty() || !bytes.is_empty() {
                    form.file = Some(SelectedFile::new(file_name, bytes.to_vec()));
                }
            }
            "column_filter" => form.column_filter = Some(field.text().await.map_err(|e| e.to_string())?),
            "value_filter" => form.value_filter = Some(field.text().await.map_err(|e| e.to_string())?),
            other => log::debug!("ignoring form field {other}"),
        }
    }

    Ok(form)
}

async fn analyze<S: AnalysisService>(
    State(state): State<Arc<AppState<S>>>,
    multipart: Multipart,
) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            log::warn!("rejecting upload: {e}");
            return (StatusCode::BAD_REQUEST, format!("Invalid upload: {e}")).into_response();
        }
    };

    match form.file {
        Some(file) => state.client.select_file(file),
        None => state.client.clear_selection(),
    }
    state
        .client
        .set_filter(AnalysisFilter::new(form.column_filter, form.value_filter));

    let (status, download) = match state.client.submit().await {
        SubmitOutcome::Completed(_) => (StatusCode::OK, state.downloads.take()),
        SubmitOutcome::Busy => (StatusCode::CONFLICT, None),
        SubmitOutcome::Rejected(_) => (StatusCode::BAD_REQUEST, None),
        SubmitOutcome::Failed(_) => (StatusCode::BAD_GATEWAY, None),
    };

    let mut response = state.page(download);
    if response.status() == StatusCode::OK {
        *response.status_mut() = status;
    }
    response
}

async fn download_output<S: AnalysisService>(State(state): State<Arc<AppState<S>>>) -> Response {
    let Some(result) = state.client.snapshot().result else {
        return (StatusCode::NOT_FOUND, "No analyzed file yet").into_response();
    };
    let download = Download::output_of(&result);
    (
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{OUTPUT_FILE_NAME}\""),
            ),
        ],
        download.bytes,
    )
        .into_response()
}

async fn chart_image<S: AnalysisService>(State(state): State<Arc<AppState<S>>>) -> Response {
    match state.client.snapshot().result {
        Some(result) => ([(header::CONTENT_TYPE, PNG_MIME)], result.chart.png.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "No chart yet").into_response(),
    }
}
