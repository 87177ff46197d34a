//! Shared reqwest client construction and response helpers.

use std::time::Duration;

use crate::error::{truncate_body, HttpError, Result};

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("selftagger/", env!("CARGO_PKG_VERSION"));

/// Connect timeout only; request bodies may be slow image downloads.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the client every collaborator shares.
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| HttpError::Client(e.to_string()))
}

/// Pass successful responses through; turn anything else into
/// [`HttpError::Status`] with a truncated body.
pub(crate) async fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HttpError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body: truncate_body(&body),
    })
}
