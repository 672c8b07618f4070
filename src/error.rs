use thiserror::Error;

/// Everything that can go wrong between picking a file and receiving the
/// analyzed workbook.
///
/// Variants carry plain strings so that errors can be cloned into view state
/// and compared in tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Submit was requested without a selected file
    #[error("Please select a file first.")]
    NoFileSelected,

    /// Connection failure, timeout or an unreadable response body
    #[error("{0}")]
    Transport(String),

    /// The service answered with a non-2xx status
    #[error("Request failed with status code {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    /// The body was not the JSON object we expect
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The download sink could not store the output workbook
    #[error("{0}")]
    Download(String),

    /// Invalid configuration, reported at startup
    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {d}"),
        None => String::new(),
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ClientError::Transport(format!("Request timed out: {err}"));
        }
        ClientError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Download(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_includes_detail_when_present() {
        let err = ClientError::Status {
            status: 400,
            detail: Some("Only Excel or CSV files allowed".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Request failed with status code 400: Only Excel or CSV files allowed"
        );

        let bare = ClientError::Status {
            status: 502,
            detail: None,
        };
        assert_eq!(bare.to_string(), "Request failed with status code 502");
    }

    #[test]
    fn transport_message_is_passed_through() {
        let err = ClientError::Transport("Network Error".to_string());
        assert_eq!(err.to_string(), "Network Error");
    }
}
