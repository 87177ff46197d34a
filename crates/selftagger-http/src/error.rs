//! Error types for selftagger-http

use thiserror::Error;

/// Errors raised by the HTTP clients before they are mapped onto the
/// attempt error taxonomy.
#[derive(Error, Debug)]
pub enum HttpError {
    /// Client construction failed
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// Request could not be sent or the body could not be read
    #[error("request to {url} failed: {detail}")]
    Transport { url: String, detail: String },

    /// Non-success status
    #[error("{url} returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    /// Response body was not what we expected
    #[error("unexpected response from {url}: {detail}")]
    Decode { url: String, detail: String },

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HttpError {
    pub(crate) fn transport(url: &str, err: reqwest::Error) -> Self {
        HttpError::Transport {
            url: url.to_string(),
            detail: err.to_string(),
        }
    }
}

/// Result type for selftagger-http operations
pub type Result<T> = std::result::Result<T, HttpError>;

/// Longest response body kept in an error message.
pub(crate) const MAX_ERROR_BODY: usize = 512;

pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body_short() {
        assert_eq!(truncate_body("oops"), "oops");
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(MAX_ERROR_BODY);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= MAX_ERROR_BODY + 3);
    }
}
