//! Page and image downloads.

use async_trait::async_trait;
use selftagger_core::{FetchError, PageFetcher};
use tracing::debug;

use crate::client::check_status;
use crate::error::HttpError;

/// Plain GETs with the shared client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, HttpError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HttpError::transport(url, e))?;
        check_status(url, response).await
    }
}

impl From<HttpError> for FetchError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Status { url, status, .. } => FetchError::Status { url, status },
            HttpError::Transport { url, detail } | HttpError::Decode { url, detail } => {
                FetchError::Transport { url, detail }
            }
            other => FetchError::Transport {
                url: String::new(),
                detail: other.to_string(),
            },
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url).await?;
        let text = response
            .text()
            .await
            .map_err(|e| HttpError::transport(url, e))?;
        Ok(text)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| HttpError::transport(url, e))?;
        Ok(bytes.to_vec())
    }
}
