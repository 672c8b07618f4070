/*!
# Excel Analyzer

A small client for a remote spreadsheet analysis service, built in Rust.

## Overview

The user picks an Excel (`.xlsx`, `.xls`) or CSV file and uploads it to the
analysis service's `/analyze` endpoint. The service answers with a summary of
the data, a bar chart of column averages and a processed workbook. The client
shows the summary and the chart and saves the workbook as
`analyzed_output.xlsx` without asking.

## Architecture

There is one view, the upload page, with two front ends on top of it:

### Web front (`excel-analyzer`)
- **Technologies**: axum, handlebars, tower-http
- Serves the upload page, relays the browser's upload to the analysis service
  and renders the result. The processed workbook is delivered with a `download`
  link that the page clicks once.

### Command-line front (`excel-analyzer-cli`)
- Uploads one file, prints the summary and writes the workbook (and optionally
  the chart) to disk.

### Core
- **View state**: a single [`state::ViewState`] record, changed only by
  [`state::update`]. Phases are `Idle`, `Submitting` and `Settled`.
- **Upload client**: [`client::UploadClient`] runs the effects `update` asks
  for: the upload, the download and alerts.
- **Analysis service**: [`service::HttpAnalysisService`] posts the file as
  multipart form data with reqwest.

## Key Behaviour

- At most one request is in flight; a second submit is ignored
- Submitting without a file shows "Please select a file first." and sends nothing
- A failed request leaves the previous result on screen and shows an alert
- The endpoint is configured once at startup (`--endpoint` / `ANALYZER_ENDPOINT`)

## Modules

- **config**: command-line/environment configuration
- **error**: the client error type
- **model**: selected file, filter and analysis result types
- **state**: view state and its transitions
- **service**: the analysis service seam and its HTTP implementation
- **downloader**: data URIs and download sinks
- **client**: the upload view driver
- **render**: page rendering (web feature)
- **app**: routing and handlers (web feature)

## Endpoints of the web front

- `/` - The upload page
- `/analyze` - Multipart upload (`file`, optional `column_filter`/`value_filter`)
- `/download/analyzed_output.xlsx` - Latest processed workbook
- `/chart.png` - Latest chart
*/

pub mod app;
pub mod client;
pub mod config;
pub mod downloader;
pub mod error;
pub mod model;
pub mod render;
pub mod service;
pub mod state;

/// Re-export the types most callers need
pub use client::{SubmitOutcome, UploadClient};
pub use config::ClientConfig;
pub use downloader::{DirectorySink, Download, DownloadSink, OUTPUT_FILE_NAME};
pub use error::ClientError;
pub use model::{AnalysisFilter, AnalysisResult, SelectedFile};
pub use service::{AnalysisService, HttpAnalysisService};
pub use state::{ViewState, update};
