//! Label matching and optimal label mapping.
//!
//! Two distinct jobs live here:
//! - [`match_labels`]: per comparison window, classify the concurrent
//!   reference/hypothesis labels into correct / confusion / miss /
//!   false-alarm counts.
//! - [`optimal_mapping`]: across two whole annotations, find the one-to-one
//!   hypothesis-to-reference label correspondence that maximizes total
//!   co-occurrence duration (Kuhn-Munkres assignment).

use std::collections::HashMap;

use pathfinding::prelude::{Matrix, kuhn_munkres};

use crate::annotation::Annotation;

/// Match counts for a single comparison window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchCounts {
    /// Size of the reference label multiset (the weighting denominator).
    pub total: usize,
    /// Hypothesis labels whose identity is present in the reference.
    pub correct: usize,
    /// Labels present on both sides but with mismatched identities.
    pub confusion: usize,
    /// Reference labels with no hypothesis counterpart.
    pub miss: usize,
    /// Hypothesis labels with no reference counterpart.
    pub false_alarm: usize,
}

/// Classify one window's reference and hypothesis label multisets.
///
/// `correct` pairs off identical labels one-to-one; of the leftovers,
/// `confusion` pairs as many reference/hypothesis labels as both sides still
/// have, and the remainders become `miss` and `false_alarm`.
pub fn match_labels(reference: &[&str], hypothesis: &[&str]) -> MatchCounts {
    let mut remaining: HashMap<&str, usize> = HashMap::new();
    for label in reference {
        *remaining.entry(label).or_insert(0) += 1;
    }

    let mut correct = 0;
    for label in hypothesis {
        if let Some(count) = remaining.get_mut(label) {
            if *count > 0 {
                *count -= 1;
                correct += 1;
            }
        }
    }

    let total = reference.len();
    let unmatched_ref = total - correct;
    let unmatched_hyp = hypothesis.len() - correct;
    let confusion = unmatched_ref.min(unmatched_hyp);

    MatchCounts {
        total,
        correct,
        confusion,
        miss: unmatched_ref - confusion,
        false_alarm: unmatched_hyp - confusion,
    }
}

/// Duration matrix of label co-occurrence between two annotations.
///
/// Rows follow `a`'s labels and columns `b`'s labels, both in first-seen
/// order — that ordering is what makes assignment tie-breaking
/// deterministic.
#[derive(Debug, Clone)]
pub struct Cooccurrence {
    pub rows: Vec<String>,
    pub cols: Vec<String>,
    pub durations: Vec<Vec<f64>>,
}

impl Cooccurrence {
    pub fn new(a: &Annotation, b: &Annotation) -> Self {
        let rows: Vec<String> = a.labels().into_iter().map(str::to_owned).collect();
        let cols: Vec<String> = b.labels().into_iter().map(str::to_owned).collect();
        let row_index: HashMap<&str, usize> =
            rows.iter().enumerate().map(|(i, l)| (l.as_str(), i)).collect();
        let col_index: HashMap<&str, usize> =
            cols.iter().enumerate().map(|(i, l)| (l.as_str(), i)).collect();

        let mut durations = vec![vec![0.0; cols.len()]; rows.len()];
        for ea in a.iter() {
            for eb in b.iter() {
                let overlap = ea.segment.overlap_duration(&eb.segment);
                if overlap > 0.0 {
                    durations[row_index[ea.label.as_str()]][col_index[eb.label.as_str()]] +=
                        overlap;
                }
            }
        }

        Self {
            rows,
            cols,
            durations,
        }
    }

    /// Total duration in the matrix.
    pub fn total(&self) -> f64 {
        self.durations.iter().flatten().sum()
    }
}

/// Durations are quantized to integer microseconds for the assignment
/// solver; co-occurrences below this resolution count as zero.
const TICKS_PER_SECOND: f64 = 1_000_000.0;

fn to_ticks(seconds: f64) -> i64 {
    (seconds * TICKS_PER_SECOND).round() as i64
}

/// Optimal one-to-one mapping from hypothesis labels to reference labels.
///
/// Solves the assignment problem over the co-occurrence matrix, maximizing
/// total matched duration. Ties resolve to the lowest first-seen row/column
/// index. Pairs with zero co-occurrence are left out of the mapping, as are
/// surplus labels when the two sides disagree on speaker count.
pub fn optimal_mapping(hypothesis: &Annotation, reference: &Annotation) -> HashMap<String, String> {
    let cooc = Cooccurrence::new(hypothesis, reference);
    let nrows = cooc.rows.len();
    let ncols = cooc.cols.len();
    if nrows == 0 || ncols == 0 {
        return HashMap::new();
    }

    // kuhn_munkres requires at least as many columns as rows; pad with
    // zero-weight phantom columns which can never enter the mapping.
    let width = ncols.max(nrows);
    let weights = Matrix::from_rows(cooc.durations.iter().map(|row| {
        (0..width).map(|c| row.get(c).copied().map_or(0, to_ticks))
    }))
    .expect("co-occurrence rows have uniform width");

    let (_, assignment) = kuhn_munkres(&weights);

    let mut mapping = HashMap::new();
    for (row, col) in assignment.into_iter().enumerate() {
        if col < ncols && cooc.durations[row][col] > 0.0 {
            mapping.insert(cooc.rows[row].clone(), cooc.cols[col].clone());
        }
    }
    mapping
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
    fn match_counts_for_identical_windows() {
        let counts = match_labels(&["A", "B"], &["A", "B"]);
        assert_eq!(
            counts,
            MatchCounts {
                total: 2,
                correct: 2,
                confusion: 0,
                miss: 0,
                false_alarm: 0
            }
        );
    }

    #[test]
    fn mismatched_labels_count_as_confusion() {
        let counts = match_labels(&["A"], &["B"]);
        assert_eq!(counts.correct, 0);
        assert_eq!(counts.confusion, 1);
        assert_eq!(counts.miss, 0);
        assert_eq!(counts.false_alarm, 0);
    }

    #[test]
    fn surplus_sides_become_miss_and_false_alarm() {
        let counts = match_labels(&["A", "B"], &[]);
        assert_eq!(counts.miss, 2);

        let counts = match_labels(&[], &["A"]);
        assert_eq!(counts.false_alarm, 1);
        assert_eq!(counts.total, 0);
    }

    #[test]
    fn duplicate_labels_pair_one_to_one() {
        let counts = match_labels(&["A", "A"], &["A"]);
        assert_eq!(counts.correct, 1);
        assert_eq!(counts.miss, 1);
    }

    #[test]
    fn cooccurrence_accumulates_overlap() {
        let hyp = ann(&[(0.0, 2.0, "h1"), (2.0, 4.0, "h2")]);
        let reference = ann(&[(0.0, 3.0, "A"), (3.0, 4.0, "B")]);
        let cooc = Cooccurrence::new(&hyp, &reference);
        assert_eq!(cooc.rows, vec!["h1", "h2"]);
        assert_eq!(cooc.cols, vec!["A", "B"]);
        assert_relative_eq!(cooc.durations[0][0], 2.0);
        assert_relative_eq!(cooc.durations[1][0], 1.0);
        assert_relative_eq!(cooc.durations[1][1], 1.0);
        assert_relative_eq!(cooc.total(), 4.0);
    }

    #[test]
    fn optimal_mapping_maximizes_total_overlap() {
        // h1 mostly covers A, h2 mostly covers B: the greedy-per-label and
        // optimal mappings agree here.
        let hyp = ann(&[(0.0, 2.0, "h1"), (2.0, 4.0, "h2")]);
        let reference = ann(&[(0.0, 1.9, "A"), (1.9, 4.0, "B")]);
        let mapping = optimal_mapping(&hyp, &reference);
        assert_eq!(mapping["h1"], "A");
        assert_eq!(mapping["h2"], "B");
    }

    #[test]
    fn optimal_mapping_trades_local_for_global() {
        // h1 overlaps A (2s) and B (1.5s); h2 overlaps A (1s) only.
        // Greedy would give h1->A, starving h2; optimal gives h1->B, h2->A
        // (total 2.5s beats 2.0s).
        let hyp = ann(&[(0.0, 3.5, "h1"), (4.0, 5.0, "h2")]);
        let reference = ann(&[(0.0, 2.0, "A"), (2.0, 3.5, "B"), (4.0, 5.0, "A")]);
        let mapping = optimal_mapping(&hyp, &reference);
        assert_eq!(mapping["h1"], "B");
        assert_eq!(mapping["h2"], "A");
    }

    #[test]
    fn surplus_hypothesis_labels_stay_unmapped() {
        let hyp = ann(&[(0.0, 1.0, "h1"), (1.0, 2.0, "h2")]);
        let reference = ann(&[(0.0, 2.0, "A")]);
        let mapping = optimal_mapping(&hyp, &reference);
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn disjoint_annotations_produce_empty_mapping() {
        let hyp = ann(&[(0.0, 1.0, "h1")]);
        let reference = ann(&[(5.0, 6.0, "A")]);
        assert!(optimal_mapping(&hyp, &reference).is_empty());
    }
}
