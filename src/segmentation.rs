//! Boundary-level segmentation metrics: purity, coverage, precision, recall.
//!
//! These score *where* speaker turns are placed, not who is speaking.
//! Callers are expected to merge each annotation with [`MergeGap::Any`]
//! first so that only genuine speaker-change boundaries remain.
//!
//! [`MergeGap::Any`]: crate::transform::MergeGap

use crate::annotation::Annotation;

/// Coverage: for each reference segment, the largest overlap contributed by
/// any single hypothesis segment, summed and normalized by total reference
/// duration. An empty reference scores 1.0.
pub fn segmentation_coverage(reference: &Annotation, hypothesis: &Annotation) -> f64 {
    let mut total = 0.0;
    let mut covered = 0.0;
    for ref_entry in reference.iter() {
        total += ref_entry.segment.duration();
        let best = hypothesis
            .iter()
            .map(|h| ref_entry.segment.overlap_duration(&h.segment))
            .fold(0.0, f64::max);
        covered += best;
    }
    if total == 0.0 { 1.0 } else { covered / total }
}

/// Purity: the dual of [`segmentation_coverage`], normalized by total
/// hypothesis duration.
pub fn segmentation_purity(reference: &Annotation, hypothesis: &Annotation) -> f64 {
    segmentation_coverage(hypothesis, reference)
}

/// Internal boundaries of an annotation: every segment end except the last.
fn boundaries(annotation: &Annotation) -> Vec<f64> {
    let mut ends: Vec<f64> = annotation.iter().map(|e| e.segment.end).collect();
    ends.pop();
    ends
}

/// Greedy one-to-one boundary matching: repeatedly pair the reference and
/// hypothesis boundaries with the smallest |delta| below `tolerance` until
/// none remain. Scan order (row-major, first-seen) breaks exact ties.
fn count_boundary_matches(reference: &[f64], hypothesis: &[f64], tolerance: f64) -> usize {
    let mut delta = vec![vec![f64::INFINITY; hypothesis.len()]; reference.len()];
    for (r, ref_boundary) in reference.iter().enumerate() {
        for (h, hyp_boundary) in hypothesis.iter().enumerate() {
            let d = (ref_boundary - hyp_boundary).abs();
            if d < tolerance {
                delta[r][h] = d;
            }
        }
    }

    let mut matches = 0;
    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for (r, row) in delta.iter().enumerate() {
            for (h, &d) in row.iter().enumerate() {
                if d.is_finite() && best.is_none_or(|(_, _, bd)| d < bd) {
                    best = Some((r, h, d));
                }
            }
        }
        let Some((r, h, _)) = best else {
            break;
        };
        matches += 1;
        for d in &mut delta[r] {
            *d = f64::INFINITY;
        }
        for row in &mut delta {
            row[h] = f64::INFINITY;
        }
    }
    matches
}

/// Precision: matched hypothesis boundaries over all hypothesis boundaries.
/// A hypothesis with no internal boundaries scores 1.0.
pub fn segmentation_precision(
    reference: &Annotation,
    hypothesis: &Annotation,
    tolerance: f64,
) -> f64 {
    let ref_boundaries = boundaries(reference);
    let hyp_boundaries = boundaries(hypothesis);
    if hyp_boundaries.is_empty() {
        return 1.0;
    }
    let matches = count_boundary_matches(&ref_boundaries, &hyp_boundaries, tolerance);
    matches as f64 / hyp_boundaries.len() as f64
}

/// Recall: matched reference boundaries over all reference boundaries.
pub fn segmentation_recall(reference: &Annotation, hypothesis: &Annotation, tolerance: f64) -> f64 {
    segmentation_precision(hypothesis, reference, tolerance)
}

/// The balanced F-measure of precision and recall; 0.0 when both are zero.
pub fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * (precision * recall) / (precision + recall)
    } else {
        0.0
    }
}
