//! Obtaining a random image.
//!
//! The source page is fetched as text, the preview link is pulled out of the
//! markup, and the linked image is fetched as raw bytes.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::domain::ImagePayload;
use crate::error::FetchError;

/// Random Wikimedia Commons file page.
pub const DEFAULT_SOURCE_URL: &str = "http://commons.wikimedia.org/wiki/Special:Random/File";

/// Plain HTTP GETs.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Produces one image per call.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self) -> Result<ImagePayload, FetchError>;
}

fn preview_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"Size of this preview: <a href="([^"]+)"(\s)"#)
            .unwrap_or_else(|e| panic!("preview link pattern is invalid: {e}"))
    })
}

/// The preview-size anchor href in a file description page.
pub fn extract_media_url(body: &str) -> Option<String> {
    let captures = preview_link_pattern().captures(body)?;
    let href = captures.get(1)?.as_str().replace("&amp;", "&");
    if href.starts_with("//") {
        Some(format!("https:{href}"))
    } else {
        Some(href)
    }
}

/// Fetches a random file page and downloads its preview image.
pub struct RandomFileSource {
    fetcher: Arc<dyn PageFetcher>,
    source_url: String,
}

impl RandomFileSource {
    pub fn new(fetcher: Arc<dyn PageFetcher>, source_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            source_url: source_url.into(),
        }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

#[async_trait]
impl ImageSource for RandomFileSource {
    async fn fetch_image(&self) -> Result<ImagePayload, FetchError> {
        let body = self.fetcher.get_text(&self.source_url).await?;
        let link = extract_media_url(&body).ok_or_else(|| FetchError::LinkNotFound {
            url: self.source_url.clone(),
        })?;
        debug!(link = %link, "found image link");

        let bytes = self.fetcher.get_bytes(&link).await?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyImage { url: link });
        }
        Ok(ImagePayload::new(bytes))
    }
}
