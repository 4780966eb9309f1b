use std::collections::{HashMap, HashSet};

use crate::segment::Segment;
use crate::timeline::Timeline;

/// One labelled entry of an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub segment: Segment,
    /// Distinguishes concurrent entries: reference diarization may carry
    /// several simultaneous speakers, each on its own track.
    pub track: usize,
    pub label: String,
}

/// A mapping from time segments to speaker labels.
///
/// `Annotation` is an immutable value object: every transformation
/// (`crop`, `rename_labels`, `subset`, the `transform` module pipeline)
/// returns a new instance. Entries are kept sorted by
/// `(start, end, track)`, which makes iteration order deterministic and
/// lets the metrics walk reference and hypothesis in lockstep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    entries: Vec<Entry>,
}

impl Annotation {
    /// Build an annotation from `(segment, label)` pairs.
    ///
    /// Each pair gets its own track id, assigned in input order.
    pub fn from_entries<L>(entries: impl IntoIterator<Item = (Segment, L)>) -> Self
    where
        L: Into<String>,
    {
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(track, (segment, label))| Entry {
                segment,
                track,
                label: label.into(),
            })
            .collect();
        Self::from_raw(entries)
    }

    pub(crate) fn from_raw(mut entries: Vec<Entry>) -> Self {
        entries.sort_by(|a, b| {
            a.segment
                .cmp_by_time(&b.segment)
                .then(a.track.cmp(&b.track))
        });
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in `(start, end, track)` order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Distinct labels in first-seen (time) order.
    pub fn labels(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for entry in &self.entries {
            if seen.insert(entry.label.as_str()) {
                out.push(entry.label.as_str());
            }
        }
        out
    }

    /// The multiset of labels active during `window`.
    pub fn get_labels(&self, window: &Segment) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.segment.overlaps(window))
            .map(|e| e.label.as_str())
            .collect()
    }

    /// All entry extents as a timeline.
    pub fn timeline(&self) -> Timeline {
        Timeline::new(self.entries.iter().map(|e| e.segment))
    }

    /// Duration of the merged (disjoint) cover of all entries.
    pub fn support_duration(&self) -> f64 {
        self.timeline().duration()
    }

    /// Timeline of the entries carrying `label`.
    pub fn label_timeline(&self, label: &str) -> Timeline {
        Timeline::new(
            self.entries
                .iter()
                .filter(|e| e.label == label)
                .map(|e| e.segment),
        )
    }

    /// Merged duration of the entries carrying `label`.
    pub fn label_duration(&self, label: &str) -> f64 {
        self.label_timeline(label).duration()
    }

    /// Substitute labels according to `mapping`; labels without a mapping
    /// pass through unchanged.
    pub fn rename_labels(&self, mapping: &HashMap<String, String>) -> Annotation {
        let entries = self
            .entries
            .iter()
            .map(|e| Entry {
                segment: e.segment,
                track: e.track,
                label: mapping.get(&e.label).cloned().unwrap_or_else(|| e.label.clone()),
            })
            .collect();
        Self::from_raw(entries)
    }

    /// Replace every label with a fresh canonical one (`prefix0`, `prefix1`,
    /// …) assigned deterministically in first-seen order.
    pub fn relabel_sequential(&self, prefix: &str) -> Annotation {
        let mapping: HashMap<String, String> = self
            .labels()
            .into_iter()
            .enumerate()
            .map(|(i, label)| (label.to_owned(), format!("{prefix}{i}")))
            .collect();
        self.rename_labels(&mapping)
    }

    /// Keep (or, with `invert`, drop) the entries whose label is in `labels`.
    pub fn subset(&self, labels: &[&str], invert: bool) -> Annotation {
        let wanted: HashSet<&str> = labels.iter().copied().collect();
        let entries = self
            .entries
            .iter()
            .filter(|e| wanted.contains(e.label.as_str()) != invert)
            .cloned()
            .collect();
        Self::from_raw(entries)
    }

    /// Intersect every entry with `mask`, splitting entries that straddle
    /// mask boundaries. Labels and relative order are preserved.
    pub fn crop(&self, mask: &Timeline) -> Annotation {
        let mask = mask.support(0.0);
        let mut entries = Vec::new();
        for e in &self.entries {
            for piece in mask.iter() {
                if let Some(segment) = e.segment.intersection(piece) {
                    entries.push(Entry {
                        segment,
                        track: e.track,
                        label: e.label.clone(),
                    });
                }
            }
        }
        Self::from_raw(entries)
    }

    /// Regions where two or more entries are concurrently active,
    /// regardless of label. Used to exclude overlapped speech from scoring.
    pub fn overlap_timeline(&self) -> Timeline {
        let mut boundaries: Vec<f64> = self
            .entries
            .iter()
            .flat_map(|e| [e.segment.start, e.segment.end])
            .collect();
        boundaries.sort_by(f64::total_cmp);
        boundaries.dedup();

        let mut overlapped = Vec::new();
        for pair in boundaries.windows(2) {
            let piece = Segment {
                start: pair[0],
                end: pair[1],
            };
            if piece.is_empty() {
                continue;
            }
            let active = self
                .entries
                .iter()
                .filter(|e| e.segment.overlaps(&piece))
                .count();
            if active >= 2 {
                overlapped.push(piece);
            }
        }
        Timeline::new(overlapped).support(0.0)
    }
}
