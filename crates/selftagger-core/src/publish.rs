//! Routing a publish job to disk (rehearsal) or to live targets.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::domain::{PublishJob, PublishReceipt};
use crate::error::{PublishError, TargetFailure};

/// A live destination for published images.
#[async_trait]
pub trait PublishTarget: Send + Sync {
    /// Stable name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Publish one job. The error message is reported verbatim.
    async fn publish(&self, job: &PublishJob) -> Result<(), String>;
}

/// Where a publish job goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishMode {
    /// Write the image under this directory instead of publishing.
    Rehearsal { scratch_dir: PathBuf },
    /// Dispatch to every configured target.
    Live,
}

impl PublishMode {
    pub fn is_rehearsal(&self) -> bool {
        matches!(self, PublishMode::Rehearsal { .. })
    }
}

/// Fans a publish job out to the configured targets and joins the results.
pub struct PublishRouter {
    mode: PublishMode,
    targets: Vec<Arc<dyn PublishTarget>>,
}

impl PublishRouter {
    pub fn new(mode: PublishMode, targets: Vec<Arc<dyn PublishTarget>>) -> Self {
        Self { mode, targets }
    }

    pub fn rehearsal(scratch_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            PublishMode::Rehearsal {
                scratch_dir: scratch_dir.into(),
            },
            Vec::new(),
        )
    }

    pub fn live(targets: Vec<Arc<dyn PublishTarget>>) -> Self {
        Self::new(PublishMode::Live, targets)
    }

    pub fn mode(&self) -> &PublishMode {
        &self.mode
    }

    pub fn target_names(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.name().to_string()).collect()
    }

    #[instrument(skip_all, fields(id = %job.generated_id))]
    pub async fn publish(&self, job: PublishJob) -> Result<PublishReceipt, PublishError> {
        let destinations = match &self.mode {
            PublishMode::Rehearsal { scratch_dir } => {
                let path = write_rehearsal(scratch_dir, &job).await?;
                vec![path.display().to_string()]
            }
            PublishMode::Live => self.dispatch(&job).await?,
        };

        Ok(PublishReceipt {
            generated_id: job.generated_id,
            tag: job.tag,
            comment: job.comment,
            destinations,
        })
    }

    /// Launch every target at once, wait for all of them, then decide.
    async fn dispatch(&self, job: &PublishJob) -> Result<Vec<String>, PublishError> {
        if self.targets.is_empty() {
            return Err(PublishError::NoTargets);
        }

        let shared = Arc::new(job.clone());
        let handles: Vec<_> = self
            .targets
            .iter()
            .map(|target| {
                let target = Arc::clone(target);
                let job = Arc::clone(&shared);
                let name = target.name().to_string();
                let handle = tokio::spawn(async move { target.publish(&job).await });
                (name, handle)
            })
            .collect();

        let (names, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let outcomes = futures::future::join_all(handles).await;

        let mut failures = Vec::new();
        for (name, outcome) in names.iter().zip(outcomes) {
            let message = match outcome {
                Ok(Ok(())) => {
                    info!(target_name = %name, "published");
                    continue;
                }
                Ok(Err(message)) => message,
                Err(join_error) => format!("task aborted: {join_error}"),
            };
            warn!(target_name = %name, error = %message, "publish target failed");
            failures.push(TargetFailure {
                target: name.clone(),
                message,
            });
        }

        if failures.is_empty() {
            Ok(names)
        } else {
            Err(PublishError::Targets {
                attempted: names.len(),
                failures,
            })
        }
    }
}

/// `<scratch>/would-have-posted-<id>.jpg`. The directory must already exist.
pub fn rehearsal_path(scratch_dir: &Path, job: &PublishJob) -> PathBuf {
    scratch_dir.join(format!("would-have-posted-{}", job.media_filename()))
}

async fn write_rehearsal(scratch_dir: &Path, job: &PublishJob) -> Result<PathBuf, PublishError> {
    if !tokio::fs::metadata(scratch_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        return Err(PublishError::ScratchDirMissing(scratch_dir.to_path_buf()));
    }

    let path = rehearsal_path(scratch_dir, job);
    info!(path = %path.display(), "writing rehearsal output");
    tokio::fs::write(&path, job.image.as_bytes())
        .await
        .map_err(|source| PublishError::Write {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// Archive-style entry: `{id, date, mediaFilename, caption, buffer}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub id: String,
    pub date: String,
    pub media_filename: String,
    pub caption: String,
    /// Base64 image; omitted when the image is stored separately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer: Option<String>,
}

impl ArchiveEntry {
    pub fn from_job(job: &PublishJob) -> Self {
        Self {
            id: job.generated_id.clone(),
            date: job.created_at.to_rfc3339(),
            media_filename: job.media_filename(),
            caption: job.comment.clone(),
            buffer: Some(STANDARD.encode(job.image.as_bytes())),
        }
    }

    /// Same entry without the image bytes.
    pub fn without_buffer(mut self) -> Self {
        self.buffer = None;
        self
    }
}

/// One named sub-target of a note router and its configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterTarget {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Router-style entry: `{id, text, altText, mediaFilename, buffer, targets}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEntry {
    pub id: String,
    pub text: String,
    pub alt_text: String,
    pub media_filename: String,
    pub buffer: String,
    pub targets: Vec<RouterTarget>,
}

impl NoteEntry {
    pub fn from_job(job: &PublishJob, targets: &[RouterTarget]) -> Self {
        Self {
            id: job.generated_id.clone(),
            text: job.comment.clone(),
            alt_text: job.tag.clone(),
            media_filename: job.media_filename(),
            buffer: STANDARD.encode(job.image.as_bytes()),
            targets: targets.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImagePayload;
    use crate::fakes::{FailingTarget, RecordingTarget};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

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
    fn test_archive_entry_shape() {
        let value = serde_json::to_value(ArchiveEntry::from_job(&job())).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "catAbC12345",
                "date": "2024-05-01T12:00:00+00:00",
                "mediaFilename": "catAbC12345.jpg",
                "caption": "tag ur self I'm the cat",
                "buffer": "aW1n"
            })
        );
        let bare = serde_json::to_value(ArchiveEntry::from_job(&job()).without_buffer()).unwrap();
        assert!(bare.get("buffer").is_none());
    }

    #[test]
    fn test_note_entry_shape() {
        let targets = vec![RouterTarget {
            kind: "mastodon".to_string(),
            config: json!({ "instance": "https://botsin.space" }),
        }];
        let value = serde_json::to_value(NoteEntry::from_job(&job(), &targets)).unwrap();
        assert_eq!(value["text"], "tag ur self I'm the cat");
        assert_eq!(value["altText"], "cat");
        assert_eq!(value["mediaFilename"], "catAbC12345.jpg");
        assert_eq!(value["targets"][0]["type"], "mastodon");
    }

    #[tokio::test]
    async fn test_rehearsal_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let router = PublishRouter::rehearsal(dir.path());
        let receipt = router.publish(job()).await.unwrap();

        let expected = dir.path().join("would-have-posted-catAbC12345.jpg");
        assert_eq!(std::fs::read(&expected).unwrap(), b"img");
        assert_eq!(receipt.destinations, vec![expected.display().to_string()]);
    }

    #[tokio::test]
    async fn test_rehearsal_requires_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let router = PublishRouter::rehearsal(&missing);
        let err = router.publish(job()).await.unwrap_err();
        assert!(matches!(err, PublishError::ScratchDirMissing(p) if p == missing));
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_live_reaches_every_target() {
        let a = Arc::new(RecordingTarget::new("archive"));
        let b = Arc::new(RecordingTarget::new("notes"));
        let router = PublishRouter::live(vec![a.clone(), b.clone()]);

        let receipt = router.publish(job()).await.unwrap();
        assert_eq!(receipt.destinations, vec!["archive", "notes"]);
        assert_eq!(a.published_ids(), vec!["catAbC12345"]);
        assert_eq!(b.published_ids(), vec!["catAbC12345"]);
    }

    #[tokio::test]
    async fn test_live_partial_failure_still_waits_for_all() {
        let ok = Arc::new(RecordingTarget::new("archive"));
        let bad = Arc::new(FailingTarget::new("notes", "HTTP 503"));
        let router = PublishRouter::live(vec![ok.clone(), bad.clone()]);

        let err = router.publish(job()).await.unwrap_err();
        assert_eq!(err.failed_targets(), vec!["notes"]);
        // No rollback: the successful target keeps its copy.
        assert_eq!(ok.published_ids(), vec!["catAbC12345"]);
        assert_eq!(bad.calls(), 1);
    }

    #[tokio::test]
    async fn test_live_without_targets_fails() {
        let router = PublishRouter::live(Vec::new());
        assert!(matches!(
            router.publish(job()).await,
            Err(PublishError::NoTargets)
        ));
    }
}
