//! Annotation post-processing: overlap removal, adjacent-segment merging and
//! unknown-speaker stripping.
//!
//! Every function here is pure: the input annotation is never mutated, a new
//! one is returned. The pipeline order is fixed (see [`PostProcess::apply`])
//! and matches the order the parsers apply it in.

use crate::annotation::Annotation;
use crate::segment::Segment;

/// Default gap (seconds) under which adjacent same-speaker segments merge.
pub const DEFAULT_MERGE_GAP: f64 = 5.0;

/// Default label denoting an unknown speaker in hypothesis transcripts.
pub const UNKNOWN_LABEL: &str = "UU";

/// How aggressively adjacent same-label segments are merged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MergeGap {
    /// No merging at all.
    None,
    /// Merge same-label neighbours regardless of the gap between them.
    /// Used when only speaker-change boundaries matter.
    Any,
    /// Merge when `next.start - prev.end` is at most this many seconds.
    Max(f64),
}

impl MergeGap {
    fn allows(&self, gap: f64) -> bool {
        match self {
            MergeGap::None => false,
            MergeGap::Any => true,
            MergeGap::Max(max) => gap <= *max,
        }
    }
}

/// Merge consecutive same-label entries whose gap is allowed by `merge_gap`.
///
/// Walks entries in time order. A merged entry spans the bridged gap, so
/// merging across a positive gap grows the labelled duration; it never
/// shrinks it.
pub fn merge_adjacent(annotation: &Annotation, merge_gap: MergeGap) -> Annotation {
    if matches!(merge_gap, MergeGap::None) {
        return annotation.clone();
    }

    let mut merged: Vec<(Segment, String)> = Vec::new();
    for entry in annotation.iter() {
        match merged.last_mut() {
            Some((prev, label))
                if *label == entry.label && merge_gap.allows(entry.segment.start - prev.end) =>
            {
                prev.end = prev.end.max(entry.segment.end);
            }
            _ => merged.push((entry.segment, entry.label.clone())),
        }
    }
    Annotation::from_entries(merged)
}

/// Split temporally adjacent overlapping entries at the midpoint of the
/// overlapped region, truncating each entry to its own side.
///
/// After this pass no two consecutive entries overlap; applying it twice is
/// a no-op.
pub fn remove_overlaps(annotation: &Annotation) -> Annotation {
    let mut out: Vec<(Segment, String)> = Vec::new();
    let mut prev: Option<(Segment, String)> = None;

    for entry in annotation.iter() {
        let current = (entry.segment, entry.label.clone());
        match prev.take() {
            None => prev = Some(current),
            Some((prev_seg, prev_label)) => {
                if prev_seg.end > current.0.start {
                    // Split at the halfway point of the contested region.
                    // Clamp to the later entry's end so a fully nested entry
                    // cannot produce a reversed segment.
                    let split = ((prev_seg.end + current.0.start) / 2.0).min(current.0.end);
                    out.push((
                        Segment {
                            start: prev_seg.start,
                            end: split,
                        },
                        prev_label,
                    ));
                    prev = Some((
                        Segment {
                            start: split,
                            end: current.0.end.max(split),
                        },
                        current.1,
                    ));
                } else {
                    out.push((prev_seg, prev_label));
                    prev = Some(current);
                }
            }
        }
    }
    if let Some(last) = prev {
        out.push(last);
    }
    Annotation::from_entries(out)
}

/// Drop every entry labelled `label`.
pub fn remove_label(annotation: &Annotation, label: &str) -> Annotation {
    annotation.subset(&[label], true)
}

/// The standard post-parse pipeline applied to every input annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcess {
    pub merge_gap: MergeGap,
    pub remove_overlaps: bool,
    /// Only meaningful for hypothesis input parsed from the v2 JSON format;
    /// the reference formats have no unknown-speaker concept and parsers
    /// force this off for them.
    pub remove_unknown: bool,
    pub unknown_label: String,
}

impl Default for PostProcess {
    fn default() -> Self {
        Self {
            merge_gap: MergeGap::Max(DEFAULT_MERGE_GAP),
            remove_overlaps: true,
            remove_unknown: true,
            unknown_label: UNKNOWN_LABEL.to_owned(),
        }
    }
}

impl PostProcess {
    /// Run the pipeline: overlap split, then merge, then unknown removal.
    pub fn apply(&self, annotation: &Annotation) -> Annotation {
        let mut processed = if self.remove_overlaps {
            remove_overlaps(annotation)
        } else {
            annotation.clone()
        };
        processed = merge_adjacent(&processed, self.merge_gap);
        if self.remove_unknown {
            processed = remove_label(&processed, &self.unknown_label);
        }
        processed
    }
}
