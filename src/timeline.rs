use crate::segment::Segment;

/// An ordered collection of segments over a shared time axis.
///
/// A `Timeline` carries no labels; it is the set-arithmetic half of the data
/// model. Segments are kept sorted by `(start, end)` but may overlap — call
/// [`Timeline::support`] to collapse them into a sorted disjoint cover.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    segments: Vec<Segment>,
}

impl Timeline {
    pub fn new(segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut segments: Vec<Segment> = segments.into_iter().collect();
        segments.sort_by(Segment::cmp_by_time);
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Merge segments that overlap or whose gap is at most `gap` into a
    /// sorted, disjoint interval set.
    pub fn support(&self, gap: f64) -> Timeline {
        let mut merged: Vec<Segment> = Vec::new();
        for seg in &self.segments {
            match merged.last_mut() {
                Some(prev) if seg.start - prev.end <= gap => {
                    prev.end = prev.end.max(seg.end);
                }
                _ => merged.push(*seg),
            }
        }
        Timeline { segments: merged }
    }

    /// Total covered duration (overlapping segments counted once).
    pub fn duration(&self) -> f64 {
        self.support(0.0).segments.iter().map(Segment::duration).sum()
    }

    /// The smallest segment covering the whole timeline, if non-empty.
    pub fn extent(&self) -> Option<Segment> {
        let start = self.segments.first()?.start;
        let end = self
            .segments
            .iter()
            .map(|s| s.end)
            .fold(f64::NEG_INFINITY, f64::max);
        Some(Segment { start, end })
    }

    /// Intersection with another timeline.
    pub fn crop(&self, other: &Timeline) -> Timeline {
        let mask = other.support(0.0);
        let mut out = Vec::new();
        for seg in &self.segments {
            for piece in &mask.segments {
                if let Some(i) = seg.intersection(piece) {
                    out.push(i);
                }
            }
        }
        Timeline::new(out)
    }

    /// Set difference: the parts of `self` not covered by `other`.
    pub fn subtract(&self, other: &Timeline) -> Timeline {
        let mask = other.support(0.0);
        let mut out = Vec::new();
        for seg in &self.segments {
            let mut cursor = seg.start;
            for hole in &mask.segments {
                if hole.end <= cursor {
                    continue;
                }
                if hole.start >= seg.end {
                    break;
                }
                if hole.start > cursor {
                    out.push(Segment {
                        start: cursor,
                        end: hole.start.min(seg.end),
                    });
                }
                cursor = cursor.max(hole.end);
                if cursor >= seg.end {
                    break;
                }
            }
            if cursor < seg.end {
                out.push(Segment {
                    start: cursor,
                    end: seg.end,
                });
            }
        }
        Timeline::new(out)
    }

    /// Combined segment set of both timelines.
    pub fn union(&self, other: &Timeline) -> Timeline {
        Timeline::new(self.segments.iter().chain(other.segments.iter()).copied())
    }
}

impl FromIterator<Segment> for Timeline {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Timeline::new(iter)
    }
}
