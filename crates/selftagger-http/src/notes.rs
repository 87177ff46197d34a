//! Note router target: one POST fans the entry out to the router's own
//! destinations.

use async_trait::async_trait;
use selftagger_core::{NoteEntry, PublishJob, PublishTarget, RouterTarget};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::check_status;
use crate::error::{HttpError, Result};

/// Note router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRouterConfig {
    /// Router endpoint
    pub url: String,
    /// Bearer token, if the router wants one
    #[serde(default)]
    pub token: Option<String>,
    /// Destinations the router should post to
    #[serde(default)]
    pub targets: Vec<RouterTarget>,
}

impl NoteRouterConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            token: None,
            targets: Vec::new(),
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_target(mut self, target: RouterTarget) -> Self {
        self.targets.push(target);
        self
    }
}

pub struct NoteRouterTarget {
    config: NoteRouterConfig,
    client: reqwest::Client,
}

impl NoteRouterTarget {
    pub fn new(config: NoteRouterConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn entry(&self, job: &PublishJob) -> NoteEntry {
        NoteEntry::from_job(job, &self.config.targets)
    }

    async fn post(&self, job: &PublishJob) -> Result<()> {
        let url = &self.config.url;
        let entry = self.entry(job);
        debug!(url = %url, targets = entry.targets.len(), "posting note");

        let mut request = self.client.post(url).json(&entry);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| HttpError::transport(url, e))?;
        check_status(url, response).await?;

        info!(id = %job.generated_id, "note routed");
        Ok(())
    }
}

#[async_trait]
impl PublishTarget for NoteRouterTarget {
    fn name(&self) -> &str {
        "note-router"
    }

    async fn publish(&self, job: &PublishJob) -> std::result::Result<(), String> {
        self.post(job).await.map_err(|e| e.to_string())
    }
}
