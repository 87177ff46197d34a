//! Which annotation strings are acceptable as tags.

use std::collections::HashSet;
use std::sync::Arc;

/// Generic or undesirable categories that never make a good tag.
/// Matched case-sensitively against the normalised candidate.
pub const DENYLIST: &[&str] = &[
    "font",
    "text",
    "architecture",
    "painting",
    "art",
    "artwork",
    "modern art",
    "visual arts",
    "drawing",
    "illustration",
    "sketch",
    "image",
    "photograph",
    "photography",
    "stock photography",
    "snapshot",
    "monochrome",
    "monochrome photography",
    "black and white",
    "black-and-white",
    "history",
    "ancient history",
    "vintage clothing",
    "retro style",
    "style",
    "paper",
    "paper product",
    "document",
    "rectangle",
    "pattern",
    "line",
    "design",
    "material property",
];

/// Shortest acceptable tag, in characters.
pub const MIN_TAG_CHARS: usize = 2;

/// Opaque judgement on whether a candidate is fit to publish.
pub trait WholesomenessCheck: Send + Sync {
    fn is_wholesome(&self, candidate: &str) -> bool;
}

/// Accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl WholesomenessCheck for AcceptAll {
    fn is_wholesome(&self, _candidate: &str) -> bool {
        true
    }
}

/// Words that make a candidate unfit to publish.
pub const BLOCKED_WORDS: &[&str] = &[
    "corpse",
    "cadaver",
    "gore",
    "nude",
    "nudity",
    "naked",
    "genitals",
    "swastika",
    "nazi",
    "lynching",
    "execution",
    "torture",
    "slave",
    "slavery",
    "suicide",
    "rape",
    "porn",
    "pornography",
];

/// Rejects a candidate if any of its lowercase words is blocked.
#[derive(Debug, Clone)]
pub struct BlockedWords {
    words: HashSet<String>,
}

impl BlockedWords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl Default for BlockedWords {
    fn default() -> Self {
        Self::new(BLOCKED_WORDS)
    }
}

impl WholesomenessCheck for BlockedWords {
    fn is_wholesome(&self, candidate: &str) -> bool {
        !candidate
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .any(|w| self.words.contains(&w.to_lowercase()))
    }
}

/// Collapse whitespace runs to single spaces and trim.
pub fn normalize(candidate: &str) -> String {
    candidate.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Predicate set a candidate must pass to become a tag.
#[derive(Clone)]
pub struct AllowedTagFilter {
    denylist: HashSet<String>,
    wholesomeness: Arc<dyn WholesomenessCheck>,
}

impl AllowedTagFilter {
    /// Fixed denylist plus the given wholesomeness check.
    pub fn new(wholesomeness: Arc<dyn WholesomenessCheck>) -> Self {
        Self {
            denylist: DENYLIST.iter().map(|s| s.to_string()).collect(),
            wholesomeness,
        }
    }

    /// Length and denylist checks only.
    pub fn is_acceptable(&self, normalized: &str) -> bool {
        normalized.chars().count() >= MIN_TAG_CHARS && !self.denylist.contains(normalized)
    }

    pub fn is_wholesome(&self, normalized: &str) -> bool {
        self.wholesomeness.is_wholesome(normalized)
    }

    /// Normalised form of `candidate` if it passes every check.
    pub fn admit(&self, candidate: &str) -> Option<String> {
        let normalized = normalize(candidate);
        (self.is_acceptable(&normalized) && self.is_wholesome(&normalized)).then_some(normalized)
    }

    /// Normalised survivors, in input order.
    pub fn retain(&self, candidates: &[String]) -> Vec<String> {
        candidates.iter().filter_map(|c| self.admit(c)).collect()
    }
}

impl Default for AllowedTagFilter {
    fn default() -> Self {
        Self::new(Arc::new(BlockedWords::default()))
    }
}

impl std::fmt::Debug for AllowedTagFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllowedTagFilter")
            .field("denylist", &self.denylist.len())
            .finish_non_exhaustive()
    }
}
