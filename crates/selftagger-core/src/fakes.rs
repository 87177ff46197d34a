//! In-memory fakes for the collaborator traits (testing only).
//!
//! Provides scripted randomness, pages, images and annotations, plus publish
//! targets that record or fail, so the pipeline and retry controller can be
//! exercised without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::annotation::{AnnotateRequest, AnnotateResponse, Annotator, EntityAnnotation, ImageResponse};
use crate::domain::{AnnotationResult, ImagePayload, InFlight, PublishJob, PublishReceipt};
use crate::error::{AnnotationError, AttemptError, FetchError};
use crate::pipeline::{Attempt, AttemptFailure, Stage};
use crate::publish::PublishTarget;
use crate::randomness::RandomnessPolicy;
use crate::source::{ImageSource, PageFetcher};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Pops the front of a script, repeating the last entry once one is left.
fn next_scripted<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

// ---------------------------------------------------------------------------
// ScriptedRandomness
// ---------------------------------------------------------------------------

/// Randomness that replays fixed answers.
///
/// Once a script runs out: coin flips come up tails, indices are `0`, and
/// suffixes count up (`00000001`, `00000002`, ...).
#[derive(Debug, Default)]
pub struct ScriptedRandomness {
    flips: Mutex<VecDeque<bool>>,
    indices: Mutex<VecDeque<usize>>,
    suffixes: Mutex<VecDeque<String>>,
    flips_used: AtomicU32,
    suffix_counter: AtomicU32,
}

impl ScriptedRandomness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flips(self, flips: impl IntoIterator<Item = bool>) -> Self {
        lock(&self.flips).extend(flips);
        self
    }

    pub fn with_indices(self, indices: impl IntoIterator<Item = usize>) -> Self {
        lock(&self.indices).extend(indices);
        self
    }

    pub fn with_suffixes<S: Into<String>>(self, suffixes: impl IntoIterator<Item = S>) -> Self {
        lock(&self.suffixes).extend(suffixes.into_iter().map(Into::into));
        self
    }

    /// Coin flips consumed so far.
    pub fn flips_used(&self) -> u32 {
        self.flips_used.load(Ordering::SeqCst)
    }
}

impl RandomnessPolicy for ScriptedRandomness {
    fn weighted_index(&self, weights: &[u32]) -> Option<usize> {
        if weights.iter().all(|w| *w == 0) {
            return None;
        }
        let scripted = lock(&self.indices).pop_front().unwrap_or(0);
        Some(scripted % weights.len())
    }

    fn coin_flip(&self) -> bool {
        self.flips_used.fetch_add(1, Ordering::SeqCst);
        lock(&self.flips).pop_front().unwrap_or(false)
    }

    fn alphanumeric(&self, len: usize) -> String {
        if let Some(s) = lock(&self.suffixes).pop_front() {
            return s;
        }
        let n = self.suffix_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{n:0>len$}")
    }
}

// ---------------------------------------------------------------------------
// StaticPages
// ---------------------------------------------------------------------------

/// URL-keyed canned responses. Unknown URLs fail with HTTP 404.
#[derive(Debug, Default)]
pub struct StaticPages {
    texts: Mutex<HashMap<String, VecDeque<String>>>,
    bytes: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<Vec<String>>,
}

impl StaticPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page body for `url`. The last queued body repeats.
    pub fn with_text(self, url: &str, body: &str) -> Self {
        lock(&self.texts)
            .entry(url.to_string())
            .or_default()
            .push_back(body.to_string());
        self
    }

    pub fn with_bytes(self, url: &str, bytes: Vec<u8>) -> Self {
        lock(&self.bytes).insert(url.to_string(), bytes);
        self
    }

    /// Every URL requested, in order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl PageFetcher for StaticPages {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        lock(&self.requests).push(url.to_string());
        lock(&self.texts)
            .get_mut(url)
            .and_then(next_scripted)
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        lock(&self.requests).push(url.to_string());
        lock(&self.bytes)
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

// ---------------------------------------------------------------------------
// StaticImageSource
// ---------------------------------------------------------------------------

/// Returns the same image every time and counts fetches.
#[derive(Debug)]
pub struct StaticImageSource {
    image: ImagePayload,
    calls: AtomicU32,
}

impl StaticImageSource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            image: ImagePayload::new(bytes),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSource for StaticImageSource {
    async fn fetch_image(&self) -> Result<ImagePayload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.image.clone())
    }
}

// ---------------------------------------------------------------------------
// ScriptedAnnotator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Reply {
    Annotate(AnnotationResult),
    Fail(String),
}

fn entities(descriptions: &[String]) -> Option<Vec<EntityAnnotation>> {
    if descriptions.is_empty() {
        return None;
    }
    Some(
        descriptions
            .iter()
            .map(|d| EntityAnnotation {
                description: d.clone(),
                score: None,
            })
            .collect(),
    )
}

/// Replays annotation results or transport failures. The last reply repeats.
#[derive(Debug, Default)]
pub struct ScriptedAnnotator {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<AnnotateRequest>>,
}

impl ScriptedAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(result: AnnotationResult) -> Self {
        Self::new().then_return(result)
    }

    pub fn failing(message: &str) -> Self {
        Self::new().then_fail(message)
    }

    pub fn then_return(self, result: AnnotationResult) -> Self {
        lock(&self.replies).push_back(Reply::Annotate(result));
        self
    }

    pub fn then_fail(self, message: &str) -> Self {
        lock(&self.replies).push_back(Reply::Fail(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn requests(&self) -> Vec<AnnotateRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl Annotator for ScriptedAnnotator {
    async fn annotate(&self, request: &AnnotateRequest) -> Result<AnnotateResponse, AnnotationError> {
        lock(&self.requests).push(request.clone());
        let mut replies = lock(&self.replies);
        let reply = next_scripted(&mut *replies)
            .unwrap_or_else(|| Reply::Fail("no scripted reply".to_string()));
        match reply {
            Reply::Annotate(result) => Ok(AnnotateResponse {
                responses: vec![ImageResponse {
                    label_annotations: entities(&result.labels),
                    landmark_annotations: entities(&result.landmarks),
                    text_annotations: entities(&result.texts),
                    error: None,
                }],
            }),
            Reply::Fail(message) => Err(AnnotationError::Transport(message)),
        }
    }
}

// ---------------------------------------------------------------------------
// Publish targets
// ---------------------------------------------------------------------------

/// Accepts everything and remembers what it was sent.
#[derive(Debug)]
pub struct RecordingTarget {
    name: String,
    jobs: Mutex<Vec<PublishJob>>,
}

impl RecordingTarget {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn jobs(&self) -> Vec<PublishJob> {
        lock(&self.jobs).clone()
    }

    pub fn published_ids(&self) -> Vec<String> {
        lock(&self.jobs)
            .iter()
            .map(|j| j.generated_id.clone())
            .collect()
    }
}

#[async_trait]
impl PublishTarget for RecordingTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, job: &PublishJob) -> Result<(), String> {
        lock(&self.jobs).push(job.clone());
        Ok(())
    }
}

/// Fails a number of times (or forever), then behaves like
/// [`RecordingTarget`].
#[derive(Debug)]
pub struct FailingTarget {
    name: String,
    message: String,
    remaining_failures: Mutex<Option<u32>>,
    calls: AtomicU32,
    published: Mutex<Vec<String>>,
}

impl FailingTarget {
    /// Fails every call.
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
            remaining_failures: Mutex::new(None),
            calls: AtomicU32::new(0),
            published: Mutex::new(Vec::new()),
        }
    }

    /// Fails the first `times` calls only.
    pub fn failing_times(self, times: u32) -> Self {
        *lock(&self.remaining_failures) = Some(times);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn published_ids(&self) -> Vec<String> {
        lock(&self.published).clone()
    }
}

#[async_trait]
impl PublishTarget for FailingTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, job: &PublishJob) -> Result<(), String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut remaining = lock(&self.remaining_failures);
        match remaining.as_mut() {
            None => return Err(self.message.clone()),
            Some(n) if *n > 0 => {
                *n -= 1;
                return Err(self.message.clone());
            }
            Some(_) => {}
        }
        lock(&self.published).push(job.generated_id.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedAttempt
// ---------------------------------------------------------------------------

/// Attempt that fails until a given call number, then succeeds.
#[derive(Debug)]
pub struct ScriptedAttempt {
    succeed_on: Option<u32>,
    calls: AtomicU32,
}

impl ScriptedAttempt {
    /// Succeeds on call `k` (1-based); earlier calls fail.
    pub fn succeeding_on(k: u32) -> Self {
        Self {
            succeed_on: Some(k),
            calls: AtomicU32::new(0),
        }
    }

    pub fn always_failing() -> Self {
        Self {
            succeed_on: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Attempt for ScriptedAttempt {
    async fn run(&self) -> Result<PublishReceipt, AttemptFailure> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.succeed_on.is_some_and(|k| call >= k) {
            return Ok(PublishReceipt {
                generated_id: format!("scripted{call}"),
                tag: "scripted".to_string(),
                comment: "tag ur self I'm the scripted".to_string(),
                destinations: vec!["scripted".to_string()],
            });
        }
        Err(AttemptFailure {
            stage: Stage::Annotate,
            error: AttemptError::Annotation(AnnotationError::Transport(format!(
                "scripted failure {call}"
            ))),
            in_flight: InFlight::default(),
        })
    }
}
