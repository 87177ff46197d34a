//! Tag selection policy.
//!
//! Priority, first match wins:
//! 1. more than one text annotation and a coin flip comes up heads: texts, quoted
//! 2. any landmark: landmarks
//! 3. labels
//!
//! The chosen set is filtered with [`AllowedTagFilter`] and one survivor is
//! drawn uniformly. Lower tiers are never consulted when the chosen tier
//! filters down to nothing.

use crate::domain::{AnnotationResult, CandidateSource, SelectedTag, TagCandidateSet};
use crate::error::NoTagError;
use crate::filter::AllowedTagFilter;
use crate::randomness::RandomnessPolicy;

/// Picks one tag and builds the caption for it.
#[derive(Debug, Clone, Default)]
pub struct TagSelector {
    filter: AllowedTagFilter,
}

impl TagSelector {
    pub fn new(filter: AllowedTagFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &AllowedTagFilter {
        &self.filter
    }

    /// Decide which annotation sequence to draw from.
    pub fn candidate_set<'a>(
        &self,
        annotation: &'a AnnotationResult,
        rng: &dyn RandomnessPolicy,
    ) -> TagCandidateSet<'a> {
        if annotation.texts.len() > 1 && rng.coin_flip() {
            TagCandidateSet {
                source: CandidateSource::Texts,
                candidates: &annotation.texts,
                quoted: true,
            }
        } else if !annotation.landmarks.is_empty() {
            TagCandidateSet {
                source: CandidateSource::Landmarks,
                candidates: &annotation.landmarks,
                quoted: false,
            }
        } else {
            TagCandidateSet {
                source: CandidateSource::Labels,
                candidates: &annotation.labels,
                quoted: false,
            }
        }
    }

    pub fn select(
        &self,
        annotation: &AnnotationResult,
        rng: &dyn RandomnessPolicy,
    ) -> Result<SelectedTag, NoTagError> {
        let set = self.candidate_set(annotation, rng);
        let mut survivors = self.filter.retain(set.candidates);

        let no_tag = || NoTagError {
            candidate_set: set.source,
            candidates: set.candidates.len(),
        };
        let index = rng.uniform_index(survivors.len()).ok_or_else(no_tag)?;
        if index >= survivors.len() {
            return Err(no_tag());
        }
        let tag = survivors.swap_remove(index);

        Ok(SelectedTag {
            comment: format_comment(&tag, set.quoted),
            tag,
            source: set.source,
            quoted: set.quoted,
        })
    }
}

/// Caption for a chosen tag.
pub fn format_comment(tag: &str, quoted: bool) -> String {
    if quoted {
        format!("tag ur self I'm \"{tag}\"")
    } else {
        format!("tag ur self I'm the {tag}")
    }
}
