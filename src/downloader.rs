use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::ClientError;
use crate::model::AnalysisResult;

/// Name the analyzed workbook is always delivered under
pub const OUTPUT_FILE_NAME: &str = "analyzed_output.xlsx";

/// MIME type of Office Open XML spreadsheets
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// MIME type of the chart image
pub const PNG_MIME: &str = "image/png";

/// Build a `data:` URI for inline use as a link or image source
///
/// # Examples
/// ```
/// use excel_analyzer::downloader::{data_uri, PNG_MIME};
///
/// assert_eq!(data_uri(PNG_MIME, b"hi"), "data:image/png;base64,aGk=");
/// ```
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// A file ready to be handed to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Download {
    /// The workbook part of an analysis, as `analyzed_output.xlsx`
    pub fn output_of(result: &AnalysisResult) -> Self {
        Self {
            file_name: OUTPUT_FILE_NAME.to_string(),
            mime: XLSX_MIME.to_string(),
            bytes: result.output_file.clone(),
        }
    }

    pub fn data_uri(&self) -> String {
        data_uri(&self.mime, &self.bytes)
    }
}

/// Where the automatic download of a successful analysis ends up.
///
/// Invoked only from the success transition, never from rendering.
pub trait DownloadSink: Send + Sync + 'static {
    fn deliver(&self, download: Download) -> Result<(), ClientError>;
}

impl<T: DownloadSink> DownloadSink for Arc<T> {
    fn deliver(&self, download: Download) -> Result<(), ClientError> {
        (**self).deliver(download)
    }
}

/// Writes downloads into a directory, overwriting earlier ones.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a download of the given name would be written to
    pub fn target(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, download: Download) -> Result<(), ClientError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.target(&download.file_name);
        fs::write(&path, &download.bytes)?;
        log::info!("saved {} ({} bytes)", path.display(), download.bytes.len());
        Ok(())
    }
}

/// Holds the latest download until a front end picks it up.
///
/// The web front drains it only in the response to the upload that produced
/// it, whose page then clicks a `download` link once.
#[derive(Debug, Default)]
pub struct QueuedSink {
    pending: Mutex<Option<Download>>,
}

impl QueuedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the pending download, leaving the queue empty
    pub fn take(&self) -> Option<Download> {
        self.pending.lock().ok().and_then(|mut pending| pending.take())
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.is_some())
            .unwrap_or(false)
    }
}

impl DownloadSink for QueuedSink {
    fn deliver(&self, download: Download) -> Result<(), ClientError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| ClientError::Download("download queue poisoned".to_string()))?;
        *pending = Some(download);
        Ok(())
    }
}
