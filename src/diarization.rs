//! Frame-level diarization metrics: DER and its components, duration-based
//! precision/recall, Jaccard error rate, and cluster purity/coverage.
//!
//! All of these follow the same pattern: restrict both annotations to the
//! common support, apply the optimal label mapping where the metric calls
//! for one, walk the common timeline accumulating `duration x count`, then
//! divide with an explicit zero-denominator rule.

use crate::annotation::Annotation;
use crate::matcher::{Cooccurrence, match_labels, optimal_mapping};
use crate::support::restrict_to_common_support;
use crate::timeline::Timeline;

/// Configuration for the diarization error rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DerConfig {
    /// Weight applied to confused speech duration.
    pub confusion_weight: f64,
    /// Weight applied to missed speech duration.
    pub miss_weight: f64,
    /// Weight applied to false-alarm speech duration.
    pub false_alarm_weight: f64,
    /// Total duration (seconds) excluded around each reference segment
    /// boundary, to reduce sensitivity to boundary timing.
    pub collar: f64,
    /// Exclude regions where the reference has concurrent speakers.
    pub skip_overlap: bool,
}

impl Default for DerConfig {
    fn default() -> Self {
        Self {
            confusion_weight: 1.0,
            miss_weight: 1.0,
            false_alarm_weight: 1.0,
            collar: 0.0,
            skip_overlap: false,
        }
    }
}

/// Seconds-weighted DER components accumulated over the common timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerComponents {
    pub total: f64,
    pub correct: f64,
    pub confusion: f64,
    pub miss: f64,
    pub false_alarm: f64,
}

impl DerComponents {
    /// The weighted error rate.
    ///
    /// With no reference mass at all: 0.0 if the numerator is also zero,
    /// else 1.0 (being wrong with no ground truth is maximal error).
    pub fn error_rate(&self, config: &DerConfig) -> f64 {
        let numerator = config.confusion_weight * self.confusion
            + config.false_alarm_weight * self.false_alarm
            + config.miss_weight * self.miss;
        if self.total == 0.0 {
            if numerator == 0.0 { 0.0 } else { 1.0 }
        } else {
            numerator / self.total
        }
    }

    pub fn confusion_fraction(&self) -> f64 {
        self.fraction(self.confusion)
    }

    /// False-alarm duration over total (the "insertion" rate).
    pub fn insertion_fraction(&self) -> f64 {
        self.fraction(self.false_alarm)
    }

    /// Missed duration over total (the "deletion" rate).
    pub fn deletion_fraction(&self) -> f64 {
        self.fraction(self.miss)
    }

    fn fraction(&self, component: f64) -> f64 {
        if self.total == 0.0 {
            0.0
        } else {
            component / self.total
        }
    }
}

/// Compute DER components for a reference/hypothesis pair.
///
/// The optimal label mapping is computed on the collar-free restriction
/// (the collar only masks the error accumulation, not the mapping), then
/// the mapped hypothesis is scored window by window.
pub fn der_components(
    reference: &Annotation,
    hypothesis: &Annotation,
    uem: Option<&Timeline>,
    config: &DerConfig,
) -> DerComponents {
    let mapping_support = restrict_to_common_support(reference, hypothesis, uem, 0.0, false);
    let mapping = optimal_mapping(&mapping_support.hypothesis, &mapping_support.reference);
    let hypothesis = hypothesis.rename_labels(&mapping);

    let support = restrict_to_common_support(
        reference,
        &hypothesis,
        uem,
        config.collar,
        config.skip_overlap,
    );

    let mut detail = DerComponents::default();
    for piece in &support.timeline {
        let duration = piece.duration();
        let r = support.reference.get_labels(piece);
        let h = support.hypothesis.get_labels(piece);
        let counts = match_labels(&r, &h);

        detail.total += duration * counts.total as f64;
        detail.correct += duration * counts.correct as f64;
        detail.confusion += duration * counts.confusion as f64;
        detail.miss += duration * counts.miss as f64;
        detail.false_alarm += duration * counts.false_alarm as f64;
    }
    detail
}

/// The diarization error rate for a reference/hypothesis pair.
pub fn der(
    reference: &Annotation,
    hypothesis: &Annotation,
    uem: Option<&Timeline>,
    config: &DerConfig,
) -> f64 {
    der_components(reference, hypothesis, uem, config).error_rate(config)
}

fn precision_recall_components(
    reference: &Annotation,
    hypothesis: &Annotation,
    uem: Option<&Timeline>,
) -> (f64, f64, f64) {
    let support = restrict_to_common_support(reference, hypothesis, uem, 0.0, false);
    let mapping = optimal_mapping(&support.hypothesis, &support.reference);
    let hypothesis = support.hypothesis.rename_labels(&mapping);

    let mut retrieved = 0.0;
    let mut relevant = 0.0;
    let mut relevant_retrieved = 0.0;
    for piece in &support.timeline {
        let duration = piece.duration();
        let r = support.reference.get_labels(piece);
        let h = hypothesis.get_labels(piece);
        let counts = match_labels(&r, &h);

        retrieved += duration * h.len() as f64;
        relevant += duration * counts.total as f64;
        relevant_retrieved += duration * counts.correct as f64;
    }
    (retrieved, relevant, relevant_retrieved)
}

fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        1.0
    } else {
        numerator / denominator
    }
}

/// Duration-weighted precision: correctly matched duration over total
/// hypothesis duration. Nothing retrieved scores 1.0 (no false positives).
pub fn diarization_precision(
    reference: &Annotation,
    hypothesis: &Annotation,
    uem: Option<&Timeline>,
) -> f64 {
    let (retrieved, _, relevant_retrieved) =
        precision_recall_components(reference, hypothesis, uem);
    safe_ratio(relevant_retrieved, retrieved)
}

/// Duration-weighted recall: correctly matched duration over total
/// reference duration.
pub fn diarization_recall(
    reference: &Annotation,
    hypothesis: &Annotation,
    uem: Option<&Timeline>,
) -> f64 {
    let (_, relevant, relevant_retrieved) =
        precision_recall_components(reference, hypothesis, uem);
    safe_ratio(relevant_retrieved, relevant)
}

/// Jaccard error rate: one minus the mean per-reference-speaker IoU of
/// active durations under the optimal label mapping.
///
/// Reference speakers with no mapped hypothesis speaker score an IoU of 0.
/// Zero-duration reference speakers carry no mass and are skipped entirely.
pub fn jaccard_error_rate(
    reference: &Annotation,
    hypothesis: &Annotation,
    uem: Option<&Timeline>,
) -> f64 {
    let support = restrict_to_common_support(reference, hypothesis, uem, 0.0, false);
    let mapping = optimal_mapping(&support.hypothesis, &support.reference);
    let cooc = Cooccurrence::new(&support.reference, &support.hypothesis);

    let mut speaker_error = 0.0;
    let mut speakers = 0usize;
    for (row, ref_label) in cooc.rows.iter().enumerate() {
        let ref_duration = support.reference.label_duration(ref_label);
        if ref_duration == 0.0 {
            continue;
        }
        speakers += 1;

        // Reverse lookup: which hypothesis label was assigned to this
        // reference speaker, if any.
        let assigned = mapping
            .iter()
            .find(|(_, mapped)| *mapped == ref_label)
            .map(|(hyp_label, _)| hyp_label);

        let iou = match assigned {
            Some(hyp_label) => {
                let col = cooc
                    .cols
                    .iter()
                    .position(|c| c == hyp_label)
                    .expect("mapped label comes from the hypothesis");
                let intersection = cooc.durations[row][col];
                let union =
                    ref_duration + support.hypothesis.label_duration(hyp_label) - intersection;
                if union > 0.0 { intersection / union } else { 0.0 }
            }
            None => 0.0,
        };
        speaker_error += 1.0 - iou;
    }

    if speakers == 0 {
        0.0
    } else {
        speaker_error / speakers as f64
    }
}

/// Cluster purity: how well hypothesis clusters avoid mixing reference
/// speakers. Per hypothesis cluster, the duration of its dominant reference
/// speaker, summed and normalized by the total co-occurring duration.
pub fn diarization_purity(
    reference: &Annotation,
    hypothesis: &Annotation,
    uem: Option<&Timeline>,
) -> f64 {
    let support = restrict_to_common_support(reference, hypothesis, uem, 0.0, false);
    let cooc = Cooccurrence::new(&support.reference, &support.hypothesis);
    let largest: f64 = (0..cooc.cols.len())
        .map(|col| {
            cooc.durations
                .iter()
                .map(|row| row[col])
                .fold(0.0, f64::max)
        })
        .sum();
    safe_ratio(largest, cooc.total())
}

/// Cluster coverage: how well hypothesis clusters preserve reference speaker
/// continuity. The dual of [`diarization_purity`], normalized per reference
/// speaker.
pub fn diarization_coverage(
    reference: &Annotation,
    hypothesis: &Annotation,
    uem: Option<&Timeline>,
) -> f64 {
    let support = restrict_to_common_support(reference, hypothesis, uem, 0.0, false);
    let cooc = Cooccurrence::new(&support.reference, &support.hypothesis);
    let largest: f64 = cooc
        .durations
        .iter()
        .map(|row| row.iter().copied().fold(0.0, f64::max))
        .sum();
    safe_ratio(largest, cooc.total())
}
