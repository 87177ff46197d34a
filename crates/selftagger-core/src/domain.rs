//! Data carried through one attempt.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::randomness::RandomnessPolicy;

/// Length of the random suffix appended to a tag to form a publish id.
pub const ID_SUFFIX_LEN: usize = 8;

/// Raw image bytes as downloaded. Never mutated; cheap to clone.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload(Arc<[u8]>);

impl ImagePayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImagePayload({} bytes)", self.0.len())
    }
}

/// Descriptions returned by the annotation service, in service order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationResult {
    pub labels: Vec<String>,
    pub landmarks: Vec<String>,
    pub texts: Vec<String>,
}

/// Which annotation sequence a tag was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Labels,
    Landmarks,
    Texts,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::Labels => "labels",
            CandidateSource::Landmarks => "landmarks",
            CandidateSource::Texts => "texts",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The sequence chosen for selection and how the chosen tag is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCandidateSet<'a> {
    pub source: CandidateSource,
    pub candidates: &'a [String],
    pub quoted: bool,
}

/// A tag that survived filtering, with the caption built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedTag {
    pub tag: String,
    pub comment: String,
    pub source: CandidateSource,
    pub quoted: bool,
}

/// Everything a publish target needs. Built once per successful selection.
#[derive(Debug, Clone)]
pub struct PublishJob {
    pub comment: String,
    pub tag: String,
    pub image: ImagePayload,
    pub generated_id: String,
    pub created_at: DateTime<Utc>,
}

impl PublishJob {
    /// Build a job with a fresh id derived from the tag.
    pub fn new(selected: &SelectedTag, image: ImagePayload, rng: &dyn RandomnessPolicy) -> Self {
        Self {
            comment: selected.comment.clone(),
            tag: selected.tag.clone(),
            image,
            generated_id: generate_id(&selected.tag, rng),
            created_at: Utc::now(),
        }
    }

    /// File name used for the image wherever it is stored.
    pub fn media_filename(&self) -> String {
        format!("{}.jpg", self.generated_id)
    }
}

/// `<tag with spaces replaced by dashes><random alphanumeric suffix>`.
pub fn generate_id(tag: &str, rng: &dyn RandomnessPolicy) -> String {
    format!("{}{}", tag.replace(' ', "-"), rng.alphanumeric(ID_SUFFIX_LEN))
}

/// What a successful attempt published, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub generated_id: String,
    pub tag: String,
    pub comment: String,
    /// Names of live targets reached, or the file written in rehearsal mode.
    pub destinations: Vec<String>,
}

/// Snapshot of the data an attempt had produced when it failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InFlight {
    pub image_bytes: Option<usize>,
    pub annotation: Option<AnnotationResult>,
    pub tag: Option<String>,
    pub comment: Option<String>,
    pub generated_id: Option<String>,
}

impl InFlight {
    pub fn is_empty(&self) -> bool {
        *self == InFlight::default()
    }
}
