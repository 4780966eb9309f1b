//! Word-level diarization error rate.
//!
//! Operates at word granularity instead of frame granularity: every
//! hypothesis word is compared against the reference entry it overlaps
//! most, under the optimal label mapping. Both sequences are walked
//! forward only, so the scan is linear in the number of words.

use std::collections::HashMap;

use crate::annotation::Annotation;
use crate::matcher::optimal_mapping;
use crate::support::restrict_to_common_support;
use crate::timeline::Timeline;
use crate::{Error, Result};

/// Per-word scoring detail, in hypothesis order.
#[derive(Debug, Clone, PartialEq)]
pub struct WordScore {
    pub start: f64,
    pub end: f64,
    pub label: String,
    pub correct: bool,
}

/// The outcome of a word-level DER computation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WderOutcome {
    pub total_words: usize,
    pub incorrect: usize,
    pub words: Vec<WordScore>,
}

impl WderOutcome {
    /// `incorrect / total_words`.
    ///
    /// With zero words and zero incorrect the rate is vacuously 1.0;
    /// zero words with incorrect words is impossible by construction and
    /// reported as an internal error.
    pub fn error_rate(&self) -> Result<f64> {
        if self.total_words == 0 {
            if self.incorrect == 0 {
                Ok(1.0)
            } else {
                Err(Error::msg(
                    "word DER invariant violated: incorrect words without any words",
                ))
            }
        } else {
            Ok(self.incorrect as f64 / self.total_words as f64)
        }
    }
}

/// Compute word-level DER for a reference/hypothesis pair.
///
/// The optimal label mapping is derived from the (optionally UEM-restricted)
/// pair; scoring then walks the full annotations. A hypothesis word is
/// correct when its mapped label equals the label of the reference entry it
/// overlaps most. Words labelled `unknown_label` are never correct but stay
/// in the denominator, as do words whose label has no mapped reference
/// identity.
pub fn wder(
    reference: &Annotation,
    hypothesis: &Annotation,
    uem: Option<&Timeline>,
    unknown_label: &str,
) -> WderOutcome {
    let support = restrict_to_common_support(reference, hypothesis, uem, 0.0, false);
    let mapping = optimal_mapping(&support.hypothesis, &support.reference);
    score_words(reference, hypothesis, &mapping, unknown_label)
}

fn score_words(
    reference: &Annotation,
    hypothesis: &Annotation,
    mapping: &HashMap<String, String>,
    unknown_label: &str,
) -> WderOutcome {
    let refs: Vec<_> = reference.iter().collect();
    let mut ref_idx = 0usize;

    let mut outcome = WderOutcome::default();
    for hyp in hypothesis.iter() {
        outcome.total_words += 1;
        let mut correct = false;

        let mapped = mapping.get(&hyp.label);
        if hyp.label != unknown_label && mapped.is_some() && ref_idx < refs.len() {
            // Advance through the reference, tracking the entry with the
            // largest overlap. The reference cursor only moves forward:
            // both sequences are sorted by start time.
            let mut max_overlap = hyp.segment.overlap_duration(&refs[ref_idx].segment);
            let mut max_label = refs[ref_idx].label.as_str();
            while ref_idx < refs.len() && hyp.segment.end > refs[ref_idx].segment.end {
                ref_idx += 1;
                if ref_idx >= refs.len() {
                    break;
                }
                let overlap = hyp.segment.overlap_duration(&refs[ref_idx].segment);
                if overlap > max_overlap {
                    max_overlap = overlap;
                    max_label = refs[ref_idx].label.as_str();
                }
            }

            if max_overlap > 0.0 {
                correct = mapped.is_some_and(|m| m == max_label);
            }
        }

        outcome.words.push(WordScore {
            start: hyp.segment.start,
            end: hyp.segment.end,
            label: hyp.label.clone(),
            correct,
        });
        if !correct {
            outcome.incorrect += 1;
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segment;
    use approx::assert_relative_eq;

    fn ann(entries: &[(f64, f64, &str)]) -> Annotation {
        Annotation::from_entries(
            entries
                .iter()
                .map(|&(s, e, l)| (Segment::new(s, e).unwrap(), l)),
        )
    }

    #[test]
    fn half_wrong_hypothesis_scores_half() {
        let reference = ann(&[(0.0, 1.0, "A"), (1.0, 2.0, "B")]);
        let hypothesis = ann(&[(0.0, 1.0, "A"), (1.0, 2.0, "A")]);
        let outcome = wder(&reference, &hypothesis, None, "UU");
        assert_eq!(outcome.total_words, 2);
        assert_eq!(outcome.incorrect, 1);
        assert_relative_eq!(outcome.error_rate().unwrap(), 0.5);
    }

    #[test]
    fn relabeled_words_are_correct_under_mapping() {
        let reference = ann(&[(0.0, 1.0, "A"), (1.0, 2.0, "B")]);
        let hypothesis = ann(&[(0.0, 1.0, "1"), (1.0, 2.0, "2")]);
        let outcome = wder(&reference, &hypothesis, None, "UU");
        assert_eq!(outcome.incorrect, 0);
        assert_relative_eq!(outcome.error_rate().unwrap(), 0.0);
    }

    #[test]
    fn unknown_words_count_but_never_match() {
        let reference = ann(&[(0.0, 2.0, "A")]);
        let hypothesis = ann(&[(0.0, 1.0, "A"), (1.0, 2.0, "UU")]);
        let outcome = wder(&reference, &hypothesis, None, "UU");
        assert_eq!(outcome.total_words, 2);
        assert_eq!(outcome.incorrect, 1);
        assert!(!outcome.words[1].correct);
    }

    #[test]
    fn word_outside_reference_is_incorrect() {
        let reference = ann(&[(0.0, 1.0, "A")]);
        let hypothesis = ann(&[(0.0, 1.0, "A"), (5.0, 6.0, "A")]);
        let outcome = wder(&reference, &hypothesis, None, "UU");
        assert_eq!(outcome.incorrect, 1);
    }

    #[test]
    fn picks_reference_with_largest_overlap() {
        let reference = ann(&[(0.0, 1.0, "A"), (1.0, 3.0, "B")]);
        // Word straddles the turn but mostly covers B.
        let hypothesis = ann(&[(0.6, 2.4, "B")]);
        let outcome = wder(&reference, &hypothesis, None, "UU");
        assert_eq!(outcome.incorrect, 0);
    }

    #[test]
    fn empty_hypothesis_is_vacuously_wrong() {
        let reference = ann(&[(0.0, 1.0, "A")]);
        let outcome = wder(&reference, &Annotation::default(), None, "UU");
        assert_eq!(outcome.total_words, 0);
        assert_relative_eq!(outcome.error_rate().unwrap(), 1.0);
    }

    #[test]
    fn invariant_violation_is_reported() {
        let outcome = WderOutcome {
            total_words: 0,
            incorrect: 1,
            words: Vec::new(),
        };
        assert!(outcome.error_rate().is_err());
    }
}
