use clap::Args;
use reqwest::Url;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ClientError;

/// Endpoint used when nothing else is configured
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// How to reach the analysis service. Resolved once at startup.
#[derive(Debug, Clone, Args)]
pub struct ClientConfig {
    /// Base URL of the analysis service; `/analyze` is appended
    #[arg(long, env = "ANALYZER_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Give up on a request after this many seconds (no limit by default)
    #[arg(long, env = "ANALYZER_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Full URL of the analyze call
    ///
    /// # Examples
    /// ```
    /// use excel_analyzer::config::ClientConfig;
    ///
    /// let config = ClientConfig::with_endpoint("https://analyzer.example.com/api/");
    /// assert_eq!(
    ///     config.analyze_url().unwrap().as_str(),
    ///     "https://analyzer.example.com/api/analyze"
    /// );
    /// ```
    pub fn analyze_url(&self) -> Result<Url, ClientError> {
        let base = self.endpoint.trim().trim_end_matches('/');
        let url = Url::parse(&format!("{base}/analyze"))
            .map_err(|e| ClientError::Config(format!("endpoint `{}`: {e}", self.endpoint)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ClientError::Config(format!(
                "endpoint `{}` uses unsupported scheme `{other}`",
                self.endpoint
            ))),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }
}

/// Settings of the web front.
#[derive(Debug, Clone, Args)]
pub struct WebConfig {
    /// Address the web front listens on
    #[arg(long, env = "ANALYZER_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Largest accepted upload, in megabytes
    #[arg(long, env = "ANALYZER_MAX_UPLOAD_MB", default_value_t = 25)]
    pub max_upload_mb: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_upload_mb: 25,
        }
    }
}

impl WebConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
