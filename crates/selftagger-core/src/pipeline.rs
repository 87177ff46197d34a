//! One attempt: fetch, annotate, select, publish.
//!
//! Stages run strictly in order and the first error ends the attempt. Nothing
//! survives a failed attempt; the retry controller starts the next one from
//! the fetch stage.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::annotation::{AnnotateRequest, AnnotateResponse, Annotator};
use crate::domain::{InFlight, PublishJob, PublishReceipt};
use crate::error::AttemptError;
use crate::obs;
use crate::publish::PublishRouter;
use crate::randomness::RandomnessPolicy;
use crate::selector::TagSelector;
use crate::source::ImageSource;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Annotate,
    Select,
    Publish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Annotate => "annotate",
            Stage::Select => "select",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an attempt ended early and what it had produced by then.
#[derive(Debug)]
pub struct AttemptFailure {
    pub stage: Stage,
    pub error: AttemptError,
    pub in_flight: InFlight,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage: {}", self.stage, self.error)
    }
}

impl std::error::Error for AttemptFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Anything the retry controller can run repeatedly.
#[async_trait]
pub trait Attempt: Send + Sync {
    async fn run(&self) -> Result<PublishReceipt, AttemptFailure>;
}

/// The four-stage pipeline wired to its collaborators.
pub struct AttemptPipeline {
    source: Arc<dyn ImageSource>,
    annotator: Arc<dyn Annotator>,
    selector: TagSelector,
    router: PublishRouter,
    rng: Arc<dyn RandomnessPolicy>,
}

impl AttemptPipeline {
    pub fn new(
        source: Arc<dyn ImageSource>,
        annotator: Arc<dyn Annotator>,
        selector: TagSelector,
        router: PublishRouter,
        rng: Arc<dyn RandomnessPolicy>,
    ) -> Self {
        Self {
            source,
            annotator,
            selector,
            router,
            rng,
        }
    }

    pub fn router(&self) -> &PublishRouter {
        &self.router
    }
}

fn fail(stage: Stage, in_flight: &InFlight) -> impl FnOnce(AttemptError) -> AttemptFailure + '_ {
    move |error| AttemptFailure {
        stage,
        error,
        in_flight: in_flight.clone(),
    }
}

#[async_trait]
impl Attempt for AttemptPipeline {
    async fn run(&self) -> Result<PublishReceipt, AttemptFailure> {
        let mut in_flight = InFlight::default();

        let image = self
            .source
            .fetch_image()
            .await
            .map_err(AttemptError::from)
            .map_err(fail(Stage::Fetch, &in_flight))?;
        in_flight.image_bytes = Some(image.len());
        debug!(bytes = image.len(), "image fetched");

        let request = AnnotateRequest::for_image(&image);
        let annotation = self
            .annotator
            .annotate(&request)
            .await
            .and_then(AnnotateResponse::into_result)
            .map_err(AttemptError::from)
            .map_err(fail(Stage::Annotate, &in_flight))?;
        debug!(
            labels = annotation.labels.len(),
            landmarks = annotation.landmarks.len(),
            texts = annotation.texts.len(),
            "image annotated"
        );
        in_flight.annotation = Some(annotation.clone());

        let selected = self
            .selector
            .select(&annotation, self.rng.as_ref())
            .map_err(AttemptError::from)
            .map_err(fail(Stage::Select, &in_flight))?;
        obs::emit_tag_selected(&selected);
        in_flight.tag = Some(selected.tag.clone());
        in_flight.comment = Some(selected.comment.clone());

        let job = PublishJob::new(&selected, image, self.rng.as_ref());
        in_flight.generated_id = Some(job.generated_id.clone());
        let receipt = self
            .router
            .publish(job)
            .await
            .map_err(AttemptError::from)
            .map_err(fail(Stage::Publish, &in_flight))?;

        info!(
            id = %receipt.generated_id,
            comment = %receipt.comment,
            destinations = ?receipt.destinations,
            "attempt published"
        );
        Ok(receipt)
    }
}
