//! Tag selection policy checks.

use std::sync::Arc;

use selftagger_core::fakes::ScriptedRandomness;
use selftagger_core::{
    AcceptAll, AllowedTagFilter, AnnotationResult, BlockedWords, CandidateSource,
    RandomnessPolicy, SeededRandomness, TagSelector, DENYLIST,
};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn permissive() -> TagSelector {
    TagSelector::new(AllowedTagFilter::new(Arc::new(AcceptAll)))
}

/// Small deterministic family of annotation results for property checks.
fn annotation_family(rng: &SeededRandomness) -> Vec<AnnotationResult> {
    let pool = [
        "cat", "dog", "x", "font", "text", "Eiffel Tower", "OPEN", "Big Ben", "tree", "a",
        "painting", "bridge",
    ];
    let mut family = Vec::new();
    for _ in 0..300 {
        let draw = |max: usize| -> Vec<String> {
            let n = rng.uniform_index(max + 1).unwrap_or(0);
            (0..n)
                .map(|_| pool[rng.uniform_index(pool.len()).unwrap_or(0)].to_string())
                .collect()
        };
        family.push(AnnotationResult {
            labels: draw(4),
            landmarks: draw(2),
            texts: draw(3),
        });
    }
    family
}

#[test]
fn scenario_a_labels_with_denylisted_font() {
    let annotation = AnnotationResult {
        labels: strings(&["cat", "font"]),
        landmarks: vec![],
        texts: vec![],
    };
    assert!(DENYLIST.contains(&"font"));

    for seed in 0..20 {
        let selected = TagSelector::default()
            .select(&annotation, &SeededRandomness::new(seed))
            .expect("cat should survive filtering");
        assert_eq!(selected.tag, "cat");
        assert_eq!(selected.comment, "tag ur self I'm the cat");
        assert_eq!(selected.source, CandidateSource::Labels);
    }
}

#[test]
fn scenario_b_landmark_beats_labels() {
    let annotation = AnnotationResult {
        labels: strings(&["cat"]),
        landmarks: strings(&["Eiffel Tower"]),
        texts: vec![],
    };

    let selector = TagSelector::default();
    let rng = ScriptedRandomness::new();
    let set = selector.candidate_set(&annotation, &rng);
    assert_eq!(set.source, CandidateSource::Landmarks);
    assert_eq!(set.candidates, &annotation.landmarks[..]);

    let selected = selector.select(&annotation, &rng).unwrap();
    assert_eq!(selected.tag, "Eiffel Tower");
    assert_eq!(selected.comment, "tag ur self I'm the Eiffel Tower");
    assert!(!selected.quoted);
}

#[test]
fn short_text_lists_never_quote() {
    let rng = SeededRandomness::new(11);
    let selector = permissive();
    for annotation in annotation_family(&rng) {
        if annotation.texts.len() > 1 {
            continue;
        }
        // Heads every time: the text tier still must not trigger.
        let heads = ScriptedRandomness::new().with_flips(vec![true; 4]);
        let set = selector.candidate_set(&annotation, &heads);
        assert!(!set.quoted);
        assert_ne!(set.source, CandidateSource::Texts);
        if let Ok(selected) = selector.select(&annotation, &heads) {
            assert!(!selected.quoted);
            assert_ne!(selected.source, CandidateSource::Texts);
        }
    }
}

#[test]
fn landmarks_used_whenever_text_tier_does_not_trigger() {
    let rng = SeededRandomness::new(23);
    let selector = permissive();
    for annotation in annotation_family(&rng) {
        if annotation.landmarks.is_empty() {
            continue;
        }
        let tails = ScriptedRandomness::new().with_flips([false]);
        let set = selector.candidate_set(&annotation, &tails);
        assert_eq!(set.source, CandidateSource::Landmarks);
        assert_eq!(set.candidates, &annotation.landmarks[..]);
    }
}

#[test]
fn rejected_candidates_never_selected() {
    let rng = SeededRandomness::new(5);
    let selector = TagSelector::new(AllowedTagFilter::new(Arc::new(BlockedWords::new([
        "bridge",
    ]))));

    for annotation in annotation_family(&rng) {
        match selector.select(&annotation, &rng) {
            Ok(selected) => {
                assert!(selected.tag.chars().count() > 1, "{:?}", selected.tag);
                assert!(!DENYLIST.contains(&selected.tag.as_str()));
                assert_ne!(selected.tag, "bridge");
                assert!(!selected.tag.is_empty());
            }
            Err(err) => {
                // Failure only when the chosen tier really had nothing usable.
                assert!(err.candidates <= 4);
            }
        }
    }
}

#[test]
fn fully_filtered_tier_is_a_failure_not_an_empty_tag() {
    let annotation = AnnotationResult {
        labels: strings(&["font", "text", "x", "painting"]),
        landmarks: vec![],
        texts: vec![],
    };
    let err = TagSelector::default()
        .select(&annotation, &SeededRandomness::new(1))
        .unwrap_err();
    assert_eq!(err.candidate_set, CandidateSource::Labels);
    assert_eq!(err.candidates, 4);
}

#[test]
fn texts_are_quoted_and_normalised() {
    let annotation = AnnotationResult {
        labels: strings(&["signage"]),
        landmarks: strings(&["Times Square"]),
        texts: strings(&["NO\nPARKING\nANY TIME", "PARKING"]),
    };
    let rng = ScriptedRandomness::new().with_flips([true]).with_indices([0]);
    let selected = permissive().select(&annotation, &rng).unwrap();
    assert_eq!(selected.source, CandidateSource::Texts);
    assert!(selected.quoted);
    assert_eq!(selected.tag, "NO PARKING ANY TIME");
    assert_eq!(selected.comment, "tag ur self I'm \"NO PARKING ANY TIME\"");
}

#[test]
fn selection_is_roughly_uniform() {
    let annotation = AnnotationResult {
        labels: strings(&["cat", "dog", "bird"]),
        landmarks: vec![],
        texts: vec![],
    };
    let rng = SeededRandomness::new(99);
    let selector = permissive();
    let mut counts = std::collections::HashMap::new();
    for _ in 0..3000 {
        let tag = selector.select(&annotation, &rng).unwrap().tag;
        *counts.entry(tag).or_insert(0u32) += 1;
    }
    assert_eq!(counts.len(), 3);
    for count in counts.values() {
        assert!((800..1200).contains(count), "{counts:?}");
    }
}
