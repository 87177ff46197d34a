//! Selftagger HTTP
//!
//! reqwest-backed implementations of the collaborators that
//! `selftagger-core` only knows as traits:
//!
//! - [`HttpFetcher`]: page and image downloads
//! - [`VisionClient`]: image annotation
//! - [`GitArchiveTarget`] and [`NoteRouterTarget`]: live publish targets

pub mod archive;
mod client;
pub mod error;
pub mod fetch;
pub mod notes;
pub mod vision;

pub use archive::{ArchiveConfig, GitArchiveTarget};
pub use client::{build_client, USER_AGENT};
pub use error::{HttpError, Result};
pub use fetch::HttpFetcher;
pub use notes::{NoteRouterConfig, NoteRouterTarget};
pub use vision::{VisionClient, VisionConfig, DEFAULT_VISION_ENDPOINT};
