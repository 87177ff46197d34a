//! Selftagger Core
//!
//! The attempt pipeline behind the selftagger bot:
//! - fetch a random image ([`source`])
//! - ask an annotation service what is in it ([`annotation`])
//! - pick one tag and caption it ([`selector`], [`filter`])
//! - publish it to disk or to live targets ([`publish`])
//!
//! [`retry::RetryController`] reruns the whole attempt on any failure, up to a
//! fixed number of attempts.

pub mod annotation;
pub mod domain;
pub mod error;
pub mod fakes;
pub mod filter;
pub mod obs;
pub mod pipeline;
pub mod publish;
pub mod randomness;
pub mod retry;
pub mod selector;
pub mod source;
pub mod telemetry;

pub use annotation::{AnnotateRequest, AnnotateResponse, Annotator};
pub use domain::{
    generate_id, AnnotationResult, CandidateSource, ImagePayload, InFlight, PublishJob,
    PublishReceipt, SelectedTag, TagCandidateSet,
};
pub use error::{
    AnnotationError, AttemptError, FetchError, NoTagError, PublishError, TargetFailure,
};
pub use filter::{AcceptAll, AllowedTagFilter, BlockedWords, WholesomenessCheck, DENYLIST};
pub use pipeline::{Attempt, AttemptFailure, AttemptPipeline, Stage};
pub use publish::{ArchiveEntry, NoteEntry, PublishMode, PublishRouter, PublishTarget, RouterTarget};
pub use randomness::{RandomnessPolicy, SeededRandomness, ThreadRandomness};
pub use retry::{ControllerState, RetryController, TerminalOutcome, DEFAULT_MAX_ATTEMPTS};
pub use selector::{format_comment, TagSelector};
pub use source::{extract_media_url, ImageSource, PageFetcher, RandomFileSource, DEFAULT_SOURCE_URL};
pub use telemetry::{init_tracing, LogFormat};
