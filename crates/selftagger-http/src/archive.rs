//! Git archive target
//!
//! Commits each published image and a JSON entry describing it into a
//! GitHub repository through the contents API:
//!
//! - `<prefix>/media/<id>.jpg` holds the image
//! - `<prefix>/entries/<id>.json` holds the [`ArchiveEntry`] without its buffer

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use selftagger_core::{ArchiveEntry, PublishJob, PublishTarget};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::check_status;
use crate::error::{HttpError, Result};

/// GitHub REST API root.
pub const GITHUB_API: &str = "https://api.github.com";

/// Archive repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Branch to commit to
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Token with contents write access
    #[serde(default)]
    pub token: String,
    /// Directory inside the repository; empty for the root
    #[serde(default)]
    pub path_prefix: String,
    /// API root, overridable for GitHub Enterprise
    #[serde(default = "default_api")]
    pub api_url: String,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_api() -> String {
    GITHUB_API.to_string()
}

impl ArchiveConfig {
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: default_branch(),
            token: String::new(),
            path_prefix: String::new(),
            api_url: default_api(),
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = token.to_string();
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.path_prefix = prefix.to_string();
        self
    }

    /// Repository path for a file, relative to the prefix.
    pub fn repo_path(&self, relative: &str) -> String {
        let prefix = self.path_prefix.trim_matches('/');
        if prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{prefix}/{relative}")
        }
    }

    /// Contents API URL for a repository path.
    pub fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url.trim_end_matches('/'),
            self.owner,
            self.repo,
            path
        )
    }
}

/// Body of a contents API create-file request.
#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
}

/// Publishes into a git repository.
pub struct GitArchiveTarget {
    config: ArchiveConfig,
    client: reqwest::Client,
}

impl GitArchiveTarget {
    pub fn new(config: ArchiveConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    async fn put_file(&self, path: &str, bytes: &[u8], message: &str) -> Result<()> {
        let url = self.config.contents_url(path);
        debug!(url = %url, bytes = bytes.len(), "committing file");

        let body = PutContents {
            message,
            content: STANDARD.encode(bytes),
            branch: &self.config.branch,
        };
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .json(&body)
            .send()
            .await
            .map_err(|e| HttpError::transport(&url, e))?;
        check_status(&url, response).await?;
        Ok(())
    }

    async fn archive(&self, job: &PublishJob) -> Result<()> {
        let message = commit_message(job);

        let media_path = self.config.repo_path(&format!("media/{}", job.media_filename()));
        self.put_file(&media_path, job.image.as_bytes(), &message)
            .await?;

        let entry = serde_json::to_vec_pretty(&ArchiveEntry::from_job(job).without_buffer())?;
        let entry_path = self
            .config
            .repo_path(&format!("entries/{}.json", job.generated_id));
        self.put_file(&entry_path, &entry, &message).await?;

        info!(
            repo = %format!("{}/{}", self.config.owner, self.config.repo),
            id = %job.generated_id,
            "archived"
        );
        Ok(())
    }
}

pub(crate) fn commit_message(job: &PublishJob) -> String {
    format!("Add {}", job.generated_id)
}

#[async_trait]
impl PublishTarget for GitArchiveTarget {
    fn name(&self) -> &str {
        "git-archive"
    }

    async fn publish(&self, job: &PublishJob) -> std::result::Result<(), String> {
        self.archive(job).await.map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use selftagger_core::ImagePayload;

    fn job() -> PublishJob {
        PublishJob {
            comment: "tag ur self I'm the cat".to_string(),
            tag: "cat".to_string(),
            image: ImagePayload::new(b"img".to_vec()),
            generated_id: "catAbC12345".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config: ArchiveConfig =
            serde_json::from_str(r#"{"owner": "stevedores-org", "repo": "tagged"}"#).unwrap();
        assert_eq!(config.branch, "main");
        assert_eq!(config.api_url, GITHUB_API);
        assert!(config.path_prefix.is_empty());
    }

    #[test]
    fn test_repo_path_with_and_without_prefix() {
        let config = ArchiveConfig::new("o", "r");
        assert_eq!(config.repo_path("media/a.jpg"), "media/a.jpg");

        let config = config.with_prefix("/bot/");
        assert_eq!(config.repo_path("media/a.jpg"), "bot/media/a.jpg");
    }

    #[test]
    fn test_contents_url() {
        let config = ArchiveConfig::new("stevedores-org", "tagged");
        assert_eq!(
            config.contents_url("entries/x.json"),
            "https://api.github.com/repos/stevedores-org/tagged/contents/entries/x.json"
        );
    }

    #[test]
    fn test_commit_message_and_body() {
        assert_eq!(commit_message(&job()), "Add catAbC12345");

        let body = PutContents {
            message: "Add catAbC12345",
            content: STANDARD.encode(b"img"),
            branch: "main",
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["content"], "aW1n");
        assert_eq!(value["branch"], "main");
    }

    #[test]
    fn test_target_name() {
        let target = GitArchiveTarget::new(ArchiveConfig::new("o", "r"), reqwest::Client::new());
        assert_eq!(target.name(), "git-archive");
        assert_eq!(target.config().repo, "r");
    }
}
