//! Common-support restriction shared by every metric.
//!
//! Each metric starts the same way: crop reference and hypothesis to the
//! evaluated region, then partition that region into maximal pieces over
//! which both label sets are constant. This is a free function rather than
//! a base-class hook so each metric calls it explicitly.

use crate::annotation::Annotation;
use crate::segment::Segment;
use crate::timeline::Timeline;

/// Reference and hypothesis restricted to a shared evaluation region,
/// plus the common timeline partitioning that region.
#[derive(Debug, Clone)]
pub struct CommonSupport {
    pub reference: Annotation,
    pub hypothesis: Annotation,
    /// Maximal pieces over which both annotations' label sets are constant,
    /// sorted, disjoint, zero-duration pieces dropped.
    pub timeline: Vec<Segment>,
}

/// Timeline of collar exclusion zones: `[t - collar/2, t + collar/2]`
/// around every reference segment boundary.
fn collar_timeline(reference: &Annotation, collar: f64) -> Timeline {
    let half = collar / 2.0;
    Timeline::new(reference.iter().flat_map(|e| {
        [e.segment.start, e.segment.end].map(|t| Segment {
            start: (t - half).max(0.0),
            end: t + half,
        })
    }))
    .support(0.0)
}

/// Restrict `reference` and `hypothesis` to their common support.
///
/// - `uem`: optional external evaluation mask; when absent, the union of
///   both annotations' timelines is used.
/// - `collar`: total duration (seconds) excluded around each reference
///   segment boundary.
/// - `skip_overlap`: exclude regions where the reference has more than one
///   concurrent label.
pub fn restrict_to_common_support(
    reference: &Annotation,
    hypothesis: &Annotation,
    uem: Option<&Timeline>,
    collar: f64,
    skip_overlap: bool,
) -> CommonSupport {
    let mut mask = match uem {
        Some(uem) => uem.support(0.0),
        None => reference
            .timeline()
            .union(&hypothesis.timeline())
            .support(0.0),
    };

    if collar > 0.0 {
        mask = mask.subtract(&collar_timeline(reference, collar));
    }
    if skip_overlap {
        mask = mask.subtract(&reference.overlap_timeline());
    }

    let reference = reference.crop(&mask);
    let hypothesis = hypothesis.crop(&mask);

    // Common timeline: every boundary from either cropped annotation,
    // sorted and deduplicated, restricted to the covered support.
    let covered = reference
        .timeline()
        .union(&hypothesis.timeline())
        .support(0.0);
    let mut boundaries: Vec<f64> = reference
        .iter()
        .chain(hypothesis.iter())
        .flat_map(|e| [e.segment.start, e.segment.end])
        .collect();
    boundaries.sort_by(f64::total_cmp);
    boundaries.dedup();

    let mut timeline = Vec::new();
    for pair in boundaries.windows(2) {
        let piece = Segment {
            start: pair[0],
            end: pair[1],
        };
        if piece.is_empty() {
            continue;
        }
        if covered.iter().any(|s| s.overlaps(&piece)) {
            timeline.push(piece);
        }
    }

    CommonSupport {
        reference,
        hypothesis,
        timeline,
    }
}
