use std::path::PathBuf;

use crate::corpus::CorpusOpts;
use crate::transform::{DEFAULT_MERGE_GAP, MergeGap, UNKNOWN_LABEL};

/// Report serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// Options that control how a scoring run is performed.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// The CLI is responsible for mapping user input into this type so that:
/// - the library remains reusable outside of a CLI context
/// - other frontends (APIs, tests, batch jobs) can construct options programmatically
#[derive(Debug, Clone)]
pub struct ScoreOpts {
    /// Root directory prepended to relative dbl entries.
    pub dbl_root: Option<PathBuf>,

    /// Tolerance (seconds) for matching speaker-change boundaries in the
    /// segmentation precision/recall metrics.
    pub segment_tolerance: f64,

    /// Largest same-speaker gap (seconds) bridged when building annotations
    /// for the frame- and word-level metrics. Zero disables merging
    /// entirely; negative merges across any gap.
    pub merge_gap: f64,

    /// Treat a missing hypothesis `.lab` file as a single unknown-speaker
    /// segment covering the audio, instead of failing the run.
    pub allow_missing_hyp_lab: bool,

    /// Emit per-word correctness detail alongside the summary.
    pub show_words: bool,

    /// When set, write the post-processed hypothesis back out as a `.lab`
    /// file at this path.
    pub output_hyp_label: Option<PathBuf>,

    /// The desired report format.
    pub output_format: OutputFormat,
}

impl Default for ScoreOpts {
    fn default() -> Self {
        Self {
            dbl_root: None,
            segment_tolerance: crate::corpus::DEFAULT_SEGMENT_TOLERANCE,
            merge_gap: DEFAULT_MERGE_GAP,
            allow_missing_hyp_lab: false,
            show_words: false,
            output_hyp_label: None,
            output_format: OutputFormat::default(),
        }
    }
}

impl ScoreOpts {
    /// The corpus-level subset of these options.
    ///
    /// The scalar `merge_gap` keeps the original flag semantics: negative
    /// means merge across any gap, zero means no merging at all.
    pub fn corpus_opts(&self) -> CorpusOpts {
        CorpusOpts {
            dbl_root: self.dbl_root.clone(),
            segment_tolerance: self.segment_tolerance,
            merge_gap: if self.merge_gap < 0.0 {
                MergeGap::Any
            } else if self.merge_gap == 0.0 {
                MergeGap::None
            } else {
                MergeGap::Max(self.merge_gap)
            },
            allow_missing_hyp_lab: self.allow_missing_hyp_lab,
            unknown_label: UNKNOWN_LABEL.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gap_for(merge_gap: f64) -> MergeGap {
        ScoreOpts {
            merge_gap,
            ..ScoreOpts::default()
        }
        .corpus_opts()
        .merge_gap
    }

    #[test]
    fn merge_gap_flag_keeps_sentinel_semantics() {
        assert_eq!(gap_for(-1.0), MergeGap::Any);
        assert_eq!(gap_for(0.0), MergeGap::None);
        assert_eq!(gap_for(5.0), MergeGap::Max(5.0));
    }

    #[test]
    fn zero_merge_gap_leaves_touching_segments_alone() {
        use crate::annotation::Annotation;
        use crate::segment::Segment;
        use crate::transform::merge_adjacent;

        let a = Annotation::from_entries([
            (Segment::new(0.0, 1.0).unwrap(), "A"),
            (Segment::new(1.0, 2.0).unwrap(), "A"),
        ]);
        let merged = merge_adjacent(&a, gap_for(0.0));
        assert_eq!(merged.len(), 2);
    }
}
