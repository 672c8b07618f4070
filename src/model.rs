use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use serde::Deserialize;
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;

use crate::error::ClientError;

/// Extensions the analysis service accepts
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

/// Spreadsheet kind, derived from the file name's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Xlsx,
    Xls,
    Csv,
    Other,
}

impl FileKind {
    /// MIME type sent with the multipart `file` part
    pub fn mime(self) -> &'static str {
        match self {
            FileKind::Xlsx => crate::downloader::XLSX_MIME,
            FileKind::Xls => "application/vnd.ms-excel",
            FileKind::Csv => "text/csv",
            FileKind::Other => "application/octet-stream",
        }
    }
}

/// A file the user picked, with its bytes already read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its file name
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { name, bytes })
    }

    pub fn kind(&self) -> FileKind {
        let ext = self
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" => FileKind::Xlsx,
            "xls" => FileKind::Xls,
            "csv" => FileKind::Csv,
            _ => FileKind::Other,
        }
    }

}

/// Optional row filter understood by the analysis service.
///
/// Only sent when both halves are present, as the multipart text fields
/// `column_filter` and `value_filter` next to the file. A service that reads
/// the filter from a JSON request model instead (the reference FastAPI
/// handler declares `req: AnalysisRequest`) ignores these fields and
/// analyzes the whole sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisFilter {
    pub column: Option<String>,
    pub value: Option<String>,
}

impl AnalysisFilter {
    pub fn new(column: Option<String>, value: Option<String>) -> Self {
        let clean = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        Self {
            column: clean(column),
            value: clean(value),
        }
    }

    /// The `(column, value)` pair, if the filter is complete
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (&self.column, &self.value) {
            (Some(c), Some(v)) => Some((c.as_str(), v.as_str())),
            _ => None,
        }
    }
}

/// Body returned by `POST /analyze`, exactly as it comes over the wire.
#[derive(Debug, Deserialize)]
pub struct AnalysisResponse {
    pub summary: Option<Value>,
    pub chart_image: Option<String>,
    pub output_file: Option<String>,
}

/// A decoded chart image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// The decoded analysis, as held in view state.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub summary: Value,
    pub chart: ChartImage,
    pub output_file: Vec<u8>,
}

impl AnalysisResult {
    /// Summary as a two-space indented JSON dump
    pub fn summary_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.summary).unwrap_or_else(|_| self.summary.to_string())
    }
}

impl TryFrom<AnalysisResponse> for AnalysisResult {
    type Error = ClientError;

    fn try_from(response: AnalysisResponse) -> Result<Self, Self::Error> {
        let summary = response
            .summary
            .ok_or_else(|| missing_field("summary"))?;
        let chart_b64 = response
            .chart_image
            .ok_or_else(|| missing_field("chart_image"))?;
        let output_b64 = response
            .output_file
            .ok_or_else(|| missing_field("output_file"))?;

        let png = decode_base64("chart_image", &chart_b64)?;
        let (width, height) = png_dimensions(&png)?;
        let output_file = decode_base64("output_file", &output_b64)?;
        if !output_file.starts_with(b"PK") {
            log::warn!(
                "output_file ({} bytes) does not look like an Office Open XML package",
                output_file.len()
            );
        }

        Ok(Self {
            summary,
            chart: ChartImage { png, width, height },
            output_file,
        })
    }
}

fn missing_field(name: &str) -> ClientError {
    ClientError::MalformedResponse(format!("missing field `{name}`"))
}

fn decode_base64(field: &str, data: &str) -> Result<Vec<u8>, ClientError> {
    STANDARD
        .decode(data.trim())
        .map_err(|e| ClientError::MalformedResponse(format!("`{field}` is not valid base64: {e}")))
}

fn png_dimensions(png: &[u8]) -> Result<(u32, u32), ClientError> {
    let mut reader = image::io::Reader::new(Cursor::new(png));
    reader.set_format(ImageFormat::Png);
    reader
        .into_dimensions()
        .map_err(|e| ClientError::MalformedResponse(format!("`chart_image` is not a PNG: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::new(3, 2);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn kind_follows_extension_case_insensitively() {
        assert_eq!(SelectedFile::new("a.XLSX", vec![]).kind(), FileKind::Xlsx);
        assert_eq!(SelectedFile::new("b.csv", vec![]).kind(), FileKind::Csv);
        assert_eq!(SelectedFile::new("c.xls", vec![]).kind(), FileKind::Xls);
        assert_eq!(SelectedFile::new("notes.txt", vec![]).kind(), FileKind::Other);
        assert_eq!(SelectedFile::new("README", vec![]).kind(), FileKind::Other);
    }

    #[test]
    fn filter_needs_both_halves() {
        let half = AnalysisFilter::new(Some("region".into()), None);
        assert_eq!(half.pair(), None);

        let blank = AnalysisFilter::new(Some("region".into()), Some("  ".into()));
        assert_eq!(blank.pair(), None);

        let full = AnalysisFilter::new(Some("region".into()), Some("EU".into()));
        assert_eq!(full.pair(), Some(("region", "EU")));
    }

    #[test]
    fn decodes_complete_response() {
        let png = tiny_png();
        let response = AnalysisResponse {
            summary: Some(json!({"rows": 10})),
            chart_image: Some(STANDARD.encode(&png)),
            output_file: Some(STANDARD.encode(b"PK\x03\x04rest")),
        };

        let result = AnalysisResult::try_from(response).unwrap();
        assert_eq!(result.chart.png, png);
        assert_eq!((result.chart.width, result.chart.height), (3, 2));
        assert_eq!(result.output_file, b"PK\x03\x04rest");
        assert_eq!(result.summary_pretty(), "{\n  \"rows\": 10\n}");
    }

    #[test]
    fn missing_field_is_malformed() {
        let response = AnalysisResponse {
            summary: Some(json!({})),
            chart_image: None,
            output_file: Some(String::new()),
        };
        let err = AnalysisResult::try_from(response).unwrap_err();
        assert_eq!(
            err,
            ClientError::MalformedResponse("missing field `chart_image`".to_string())
        );
    }

    #[test]
    fn non_png_chart_is_malformed() {
        let response = AnalysisResponse {
            summary: Some(json!(null)),
            chart_image: Some(STANDARD.encode(b"GIF89a")),
            output_file: Some(String::new()),
        };
        let err = AnalysisResult::try_from(response).unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse(msg) if msg.contains("not a PNG")));
    }

    #[test]
    fn bad_base64_is_malformed() {
        let response = AnalysisResponse {
            summary: Some(json!(1)),
            chart_image: Some("***".to_string()),
            output_file: Some(String::new()),
        };
        assert!(matches!(
            AnalysisResult::try_from(response),
            Err(ClientError::MalformedResponse(_))
        ));
    }
}
