use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use std::future::Future;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::model::{AnalysisFilter, AnalysisResponse, AnalysisResult, SelectedFile};

/// Multipart field carrying the file
pub const FILE_FIELD: &str = "file";

/// The remote analysis endpoint.
///
/// Implemented over HTTP by [`HttpAnalysisService`]. Tests swap in fakes.
pub trait AnalysisService: Send + Sync + 'static {
    fn analyze(
        &self,
        file: SelectedFile,
        filter: AnalysisFilter,
    ) -> impl Future<Output = Result<AnalysisResult, ClientError>> + Send;
}

/// Posts files to `<endpoint>/analyze` as multipart form data.
#[derive(Debug, Clone)]
pub struct HttpAnalysisService {
    client: Client,
    url: Url,
}

impl HttpAnalysisService {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let url = config.analyze_url()?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn form(file: SelectedFile, filter: &AnalysisFilter) -> Result<Form, ClientError> {
        let mime = file.kind().mime();
        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(mime)
            .map_err(ClientError::from)?;
        let mut form = Form::new().part(FILE_FIELD, part);
        if let Some((column, value)) = filter.pair() {
            form = form
                .text("column_filter", column.to_string())
                .text("value_filter", value.to_string());
        }
        Ok(form)
    }
}

impl AnalysisService for HttpAnalysisService {
    async fn analyze(
        &self,
        file: SelectedFile,
        filter: AnalysisFilter,
    ) -> Result<AnalysisResult, ClientError> {
        log::info!(
            "uploading {} ({} bytes) to {}",
            file.name,
            file.bytes.len(),
            self.url
        );
        let form = Self::form(file, &filter)?;
        let response = self.client.post(self.url.clone()).multipart(form).send().await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        let parsed: AnalysisResponse = serde_json::from_slice(&body)
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;
        AnalysisResult::try_from(parsed)
    }
}

/// Pull a readable message out of an error body, FastAPI `{"detail": ...}` first
fn error_detail(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        return match value.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        };
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text.chars().take(200).collect())
    }
}
