//! Image-annotation client.
//!
//! POSTs an annotate request to the vision endpoint with the API key in the
//! query string.

use async_trait::async_trait;
use selftagger_core::{AnnotateRequest, AnnotateResponse, AnnotationError, Annotator};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::check_status;
use crate::error::HttpError;

/// Default annotation endpoint.
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Vision API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Annotate endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key sent as the `key` query parameter
    pub api_key: String,
}

fn default_endpoint() -> String {
    DEFAULT_VISION_ENDPOINT.to_string()
}

impl VisionConfig {
    pub fn new(api_key: &str) -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: api_key.to_string(),
        }
    }

    /// Use a different endpoint
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

/// Annotation client
pub struct VisionClient {
    config: VisionConfig,
    client: reqwest::Client,
}

impl VisionClient {
    pub fn new(config: VisionConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

impl From<HttpError> for AnnotationError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Status { status, body, .. } => AnnotationError::Service { status, body },
            HttpError::Decode { detail, .. } => AnnotationError::Malformed(detail),
            other => AnnotationError::Transport(other.to_string()),
        }
    }
}

#[async_trait]
impl Annotator for VisionClient {
    async fn annotate(&self, request: &AnnotateRequest) -> Result<AnnotateResponse, AnnotationError> {
        let url = &self.config.endpoint;
        debug!(endpoint = %url, "requesting annotations");

        let response = self
            .client
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| HttpError::transport(url, e))?;
        let response = check_status(url, response).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::transport(url, e))?;
        let parsed = serde_json::from_slice(&body).map_err(|e| HttpError::Decode {
            url: url.clone(),
            detail: e.to_string(),
        })?;
        Ok(parsed)
    }
}
