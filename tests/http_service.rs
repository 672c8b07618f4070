//! HTTP tests for the analysis service client
//!
//! Runs a small axum stub of the `/analyze` endpoint on a random local port.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use excel_analyzer::{
    AnalysisFilter, AnalysisService, ClientConfig, ClientError, HttpAnalysisService, SelectedFile,
};
use serde_json::json;
use tokio::net::TcpListener;

/// What the stub saw in the last request
#[derive(Default, Debug, Clone)]
struct Received {
    fields: Vec<(String, Option<String>, Vec<u8>)>,
}

#[derive(Clone)]
struct Stub {
    received: Arc<Mutex<Received>>,
    reply: (StatusCode, serde_json::Value),
}

fn chart_png() -> Vec<u8> {
    let img = image::RgbImage::new(10, 5);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();
    out.into_inner()
}

fn workbook() -> Vec<u8> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_number(0, 0, 10.0).unwrap();
    workbook.save_to_buffer().unwrap()
}

async fn analyze(State(stub): State<Stub>, mut multipart: Multipart) -> impl IntoResponse {
    let mut received = Received::default();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        received.fields.push((name, file_name, bytes));
    }
    *stub.received.lock().unwrap() = received;
    (stub.reply.0, Json(stub.reply.1.clone()))
}

/// Start the stub and return its base URL
async fn spawn_stub(status: StatusCode, body: serde_json::Value) -> (String, Arc<Mutex<Received>>) {
    let received = Arc::new(Mutex::new(Received::default()));
    let stub = Stub {
        received: received.clone(),
        reply: (status, body),
    };
    let app = Router::new()
        .route("/analyze", post(analyze))
        .with_state(stub);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), received)
}

fn service(endpoint: &str) -> HttpAnalysisService {
    HttpAnalysisService::new(&ClientConfig::with_endpoint(endpoint)).unwrap()
}

#[tokio::test]
async fn test_successful_analysis() {
    let png = chart_png();
    let xlsx = workbook();
    let (endpoint, received) = spawn_stub(
        StatusCode::OK,
        json!({
            "summary": {"rows": 10},
            "chart_image": STANDARD.encode(&png),
            "output_file": STANDARD.encode(&xlsx),
        }),
    )
    .await;

    let file = SelectedFile::new("sales.xlsx", b"spreadsheet bytes".to_vec());
    let result = service(&endpoint)
        .analyze(file, AnalysisFilter::default())
        .await
        .unwrap();

    assert_eq!(result.summary, json!({"rows": 10}));
    assert_eq!(result.chart.png, png);
    assert_eq!((result.chart.width, result.chart.height), (10, 5));
    assert_eq!(result.output_file, xlsx);

    let received = received.lock().unwrap().clone();
    assert_eq!(received.fields.len(), 1);
    let (name, file_name, bytes) = &received.fields[0];
    assert_eq!(name, "file");
    assert_eq!(file_name.as_deref(), Some("sales.xlsx"));
    assert_eq!(bytes, b"spreadsheet bytes");
}

#[tokio::test]
async fn test_filter_fields_are_sent() {
    let (endpoint, received) = spawn_stub(
        StatusCode::OK,
        json!({
            "summary": {},
            "chart_image": STANDARD.encode(chart_png()),
            "output_file": STANDARD.encode(workbook()),
        }),
    )
    .await;

    let filter = AnalysisFilter::new(Some("region".into()), Some("EU".into()));
    service(&endpoint)
        .analyze(SelectedFile::new("sales.csv", b"a,b\n1,2\n".to_vec()), filter)
        .await
        .unwrap();

    let received = received.lock().unwrap().clone();
    let text = |key: &str| {
        received
            .fields
            .iter()
            .find(|(name, _, _)| name == key)
            .map(|(_, _, bytes)| String::from_utf8(bytes.clone()).unwrap())
    };
    assert_eq!(text("column_filter").as_deref(), Some("region"));
    assert_eq!(text("value_filter").as_deref(), Some("EU"));
}

#[tokio::test]
async fn test_server_error_carries_detail() {
    let (endpoint, _) = spawn_stub(
        StatusCode::BAD_REQUEST,
        json!({"detail": "Only Excel or CSV files allowed"}),
    )
    .await;

    let err = service(&endpoint)
        .analyze(SelectedFile::new("notes.txt", vec![1]), AnalysisFilter::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ClientError::Status {
            status: 400,
            detail: Some("Only Excel or CSV files allowed".to_string()),
        }
    );
}

#[tokio::test]
async fn test_missing_fields_are_malformed() {
    let (endpoint, _) = spawn_stub(StatusCode::OK, json!({"summary": {"rows": 1}})).await;

    let err = service(&endpoint)
        .analyze(SelectedFile::new("a.xlsx", vec![1]), AnalysisFilter::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = service(&format!("http://{addr}"))
        .analyze(SelectedFile::new("a.xlsx", vec![1]), AnalysisFilter::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let app = Router::new().route(
        "/analyze",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            StatusCode::OK
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = ClientConfig {
        endpoint: format!("http://{addr}"),
        timeout_secs: Some(1),
    };
    let err = HttpAnalysisService::new(&config)
        .unwrap()
        .analyze(SelectedFile::new("a.xlsx", vec![1]), AnalysisFilter::default())
        .await
        .unwrap_err();

    match err {
        ClientError::Transport(message) => assert!(message.contains("timed out"), "{message}"),
        other => panic!("expected a transport error, got {other:?}"),
    }
}
