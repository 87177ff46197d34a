//! Error taxonomy for a single attempt.
//!
//! Every stage of the attempt pipeline has its own error kind. The retry
//! controller treats all of them the same way: the attempt is discarded and a
//! fresh one starts from the fetch stage.

use std::path::PathBuf;

use crate::domain::CandidateSource;

/// The image could not be obtained from the source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {detail}")]
    Transport { url: String, detail: String },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not find image link in page from {url}")]
    LinkNotFound { url: String },

    #[error("image at {url} was empty")]
    EmptyImage { url: String },
}

/// The annotation service could not be reached or answered nonsense.
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("annotation request failed: {0}")]
    Transport(String),

    #[error("annotation service returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    #[error("annotation service error {code}: {message}")]
    Rejected { code: i64, message: String },

    #[error("malformed annotation response: {0}")]
    Malformed(String),
}

/// Every candidate was filtered out, or there were none to begin with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no suitable tags among {candidates} {candidate_set} candidates")]
pub struct NoTagError {
    pub candidate_set: CandidateSource,
    pub candidates: usize,
}

/// Failure of one live publish target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{target}: {message}")]
pub struct TargetFailure {
    pub target: String,
    pub message: String,
}

/// Publication failed, in rehearsal or live mode.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("scratch directory {} does not exist", .0.display())]
    ScratchDirMissing(PathBuf),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no publish targets are configured")]
    NoTargets,

    #[error("{} of {attempted} publish target(s) failed: {}", .failures.len(), join_failures(.failures))]
    Targets {
        attempted: usize,
        failures: Vec<TargetFailure>,
    },
}

impl PublishError {
    /// Names of the targets that failed, empty for rehearsal failures.
    pub fn failed_targets(&self) -> Vec<&str> {
        match self {
            PublishError::Targets { failures, .. } => {
                failures.iter().map(|f| f.target.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn join_failures(failures: &[TargetFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Any error that aborts an attempt.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("annotation failed: {0}")]
    Annotation(#[from] AnnotationError),

    #[error("tag selection failed: {0}")]
    NoTag(#[from] NoTagError),

    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
}

impl AttemptError {
    /// Short stable name of the error kind, used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::Fetch(_) => "fetch",
            AttemptError::Annotation(_) => "annotation",
            AttemptError::NoTag(_) => "no_tag",
            AttemptError::Publish(_) => "publish",
        }
    }
}
