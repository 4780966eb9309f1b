//! Corpus-level scoring: run every metric over paired lists of reference
//! and hypothesis files and fold the per-file results into duration- and
//! word-weighted corpus averages.
//!
//! Accumulation is a single sequential fold in dbl order, so corpus output
//! is reproducible run to run. Each pair is independent; the sums are
//! commutative, so a parallel fan-out would be safe, but nothing here
//! requires one.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::annotation::Annotation;
use crate::diarization::{
    DerConfig, der_components, diarization_coverage, diarization_purity, jaccard_error_rate,
};
use crate::formats::{
    FileFormat, annotation_from_file, load_dbl, resolve_dbl_entry, unknown_word_count,
};
use crate::segment::Segment;
use crate::segmentation::{
    f1_score, segmentation_coverage, segmentation_precision, segmentation_purity,
    segmentation_recall,
};
use crate::transform::{DEFAULT_MERGE_GAP, MergeGap, PostProcess, UNKNOWN_LABEL};
use crate::words::{WderOutcome, wder};
use crate::{Error, Result};

/// Default tolerance (seconds) when matching hypothesized speaker-change
/// points against the reference.
pub const DEFAULT_SEGMENT_TOLERANCE: f64 = 1.0;

/// Configuration for corpus (and single-pair) scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusOpts {
    /// Root directory prepended to dbl basenames.
    pub dbl_root: Option<PathBuf>,
    /// Boundary-matching tolerance for the segmentation metrics.
    pub segment_tolerance: f64,
    /// Merge gap applied when building annotations for the frame- and
    /// word-level metrics (segmentation always merges across any gap).
    pub merge_gap: MergeGap,
    /// Score a missing hypothesis `.lab` as one synthetic unknown-speaker
    /// segment spanning the audio instead of failing hard.
    pub allow_missing_hyp_lab: bool,
    pub unknown_label: String,
}

impl Default for CorpusOpts {
    fn default() -> Self {
        Self {
            dbl_root: None,
            segment_tolerance: DEFAULT_SEGMENT_TOLERANCE,
            merge_gap: MergeGap::Max(DEFAULT_MERGE_GAP),
            allow_missing_hyp_lab: false,
            unknown_label: UNKNOWN_LABEL.to_owned(),
        }
    }
}

/// All metrics for a single reference/hypothesis file pair.
#[derive(Debug, Clone, Serialize)]
pub struct FileScore {
    pub reference: String,
    pub hypothesis: String,
    /// End of the last labelled reference segment.
    pub audio_duration: f64,
    pub ref_duration: f64,
    pub hyp_duration: f64,
    pub audio_labelled: f64,
    pub ref_labelled: f64,
    pub der: f64,
    pub insertion: f64,
    pub deletion: f64,
    pub confusion: f64,
    pub purity: f64,
    pub coverage: f64,
    pub jer: f64,
    pub seg_purity: f64,
    pub seg_coverage: f64,
    pub seg_precision: f64,
    pub seg_recall: f64,
    pub seg_f1: f64,
    pub word_der: f64,
    pub nwords: usize,
    pub speaker_uu_rate: f64,
    pub ref_speakers: usize,
    pub hyp_speakers: usize,
    pub nspeakers_discrepancy: i64,
    pub abs_nspeakers_discrepancy: i64,
    pub rate_nspeakers_correct: f64,
    pub rate_nspeakers_plus_one: f64,
    pub rate_nspeakers_plus_many: f64,
    pub rate_nspeakers_minus_one: f64,
    pub rate_nspeakers_minus_many: f64,
    pub rate_single_speaker_issue: f64,
    /// Per-word detail, kept for `--show-words`; not serialized into
    /// reports.
    #[serde(skip_serializing)]
    pub word_scores: Vec<crate::words::WordScore>,
}

/// Corpus-level weighted averages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorpusScore {
    pub total_nfiles: usize,
    pub total_audio_duration: f64,
    pub total_ref_duration: f64,
    pub total_hyp_duration: f64,
    pub audio_labelled: f64,
    pub ref_labelled: f64,
    pub total_nwords: usize,
    pub average_der: f64,
    pub average_jer: f64,
    pub average_insertion: f64,
    pub average_deletion: f64,
    pub average_confusion: f64,
    pub average_purity: f64,
    pub average_coverage: f64,
    pub average_seg_purity: f64,
    pub average_seg_coverage: f64,
    pub average_seg_precision: f64,
    pub average_seg_recall: f64,
    pub average_seg_f1: f64,
    pub average_word_der: f64,
    pub average_speaker_uu_rate: f64,
    pub average_nspeakers_ref: f64,
    pub average_nspeakers_hyp: f64,
    pub average_nspeakers_discrepancy: f64,
    pub average_nspeakers_abs_discrepancy: f64,
    pub rate_nspeakers_correct: f64,
    pub rate_nspeakers_plus_one: f64,
    pub rate_nspeakers_plus_many: f64,
    pub rate_nspeakers_minus_one: f64,
    pub rate_nspeakers_minus_many: f64,
    pub rate_single_speaker_issue: f64,
}

/// The hypothesis input for one pair: a real file, or the synthetic
/// unknown-speaker stand-in for a missing `.lab`.
enum HypSource<'a> {
    File(&'a Path),
    Synthetic(Annotation),
}

impl HypSource<'_> {
    fn annotation(&self, config: &PostProcess) -> Result<Annotation> {
        match self {
            HypSource::File(path) => annotation_from_file(path, config),
            HypSource::Synthetic(raw) => Ok(config.apply(raw)),
        }
    }
}

fn resolve_hyp_source<'a>(
    hyp_path: &'a Path,
    audio_duration: f64,
    opts: &CorpusOpts,
) -> Result<HypSource<'a>> {
    if hyp_path.is_file() {
        return Ok(HypSource::File(hyp_path));
    }
    match FileFormat::from_path(hyp_path)? {
        FileFormat::Lab if opts.allow_missing_hyp_lab => {
            warn!(path = %hyp_path.display(), "hypothesis lab missing, scoring synthetic unknown-speaker segment");
            let raw = Annotation::from_entries([(
                Segment::new(0.0, audio_duration.max(0.0))?,
                opts.unknown_label.clone(),
            )]);
            Ok(HypSource::Synthetic(raw))
        }
        _ => Err(Error::MissingFile {
            role: "hypothesis",
            path: hyp_path.to_path_buf(),
        }),
    }
}

fn ref_config(opts: &CorpusOpts, merge_gap: MergeGap) -> PostProcess {
    // References carry no unknown-speaker concept; never strip from them.
    PostProcess {
        merge_gap,
        remove_overlaps: true,
        remove_unknown: false,
        unknown_label: opts.unknown_label.clone(),
    }
}

fn hyp_config(opts: &CorpusOpts, merge_gap: MergeGap, remove_unknown: bool) -> PostProcess {
    PostProcess {
        merge_gap,
        remove_overlaps: true,
        remove_unknown,
        unknown_label: opts.unknown_label.clone(),
    }
}

fn count_speakers(annotation: &Annotation, unknown_label: &str) -> usize {
    annotation
        .labels()
        .into_iter()
        .filter(|l| *l != unknown_label)
        .count()
}

/// Compute every per-file metric for one reference/hypothesis pair.
pub fn score_pair(ref_path: &Path, hyp_path: &Path, opts: &CorpusOpts) -> Result<FileScore> {
    if !ref_path.is_file() {
        return Err(Error::MissingFile {
            role: "reference",
            path: ref_path.to_path_buf(),
        });
    }

    let reference = annotation_from_file(ref_path, &ref_config(opts, opts.merge_gap))?;
    let audio_duration = reference.timeline().extent().map_or(0.0, |e| e.end);
    let ref_duration = reference.support_duration();

    let hyp_source = resolve_hyp_source(hyp_path, audio_duration, opts)?;

    // Frame-level metrics use the unknown-stripped hypothesis.
    let hypothesis = hyp_source.annotation(&hyp_config(opts, opts.merge_gap, true))?;
    let hyp_duration = hypothesis.support_duration();

    let der_config = DerConfig::default();
    let detail = der_components(&reference, &hypothesis, None, &der_config);
    let purity = diarization_purity(&reference, &hypothesis, None);
    let coverage = diarization_coverage(&reference, &hypothesis, None);
    let jer = jaccard_error_rate(&reference, &hypothesis, None);

    // Segmentation metrics only care about speaker-change boundaries, so
    // same-speaker gaps are merged away entirely.
    let seg_reference = annotation_from_file(ref_path, &ref_config(opts, MergeGap::Any))?;
    let seg_hypothesis = hyp_source.annotation(&hyp_config(opts, MergeGap::Any, true))?;
    let seg_purity = segmentation_purity(&seg_reference, &seg_hypothesis);
    let seg_coverage = segmentation_coverage(&seg_reference, &seg_hypothesis);
    let seg_precision =
        segmentation_precision(&seg_reference, &seg_hypothesis, opts.segment_tolerance);
    let seg_recall = segmentation_recall(&seg_reference, &seg_hypothesis, opts.segment_tolerance);
    let seg_f1 = f1_score(seg_precision, seg_recall);

    // Word-level DER keeps the hypothesis at word granularity: no merging,
    // unknown-speaker words retained (they score as wrong).
    let word_hypothesis = hyp_source.annotation(&hyp_config(opts, MergeGap::None, false))?;
    let word_outcome: WderOutcome = wder(&reference, &word_hypothesis, None, &opts.unknown_label);
    let nwords = word_outcome.total_words;
    let word_der = word_outcome.error_rate()?;
    let unknown_words = match &hyp_source {
        HypSource::File(path) => unknown_word_count(path, &opts.unknown_label)?,
        HypSource::Synthetic(_) => 0,
    };
    let speaker_uu_rate = if nwords > 0 {
        unknown_words as f64 / nwords as f64
    } else {
        0.0
    };

    // Speaker-count discrepancy buckets.
    let ref_speakers = count_speakers(&reference, &opts.unknown_label);
    let hyp_speakers = count_speakers(&hypothesis, &opts.unknown_label);
    let discrepancy = hyp_speakers as i64 - ref_speakers as i64;
    let mut rate_correct = 0.0;
    let mut rate_plus_one = 0.0;
    let mut rate_plus_many = 0.0;
    let mut rate_minus_one = 0.0;
    let mut rate_minus_many = 0.0;
    let mut rate_single_speaker = 0.0;
    match discrepancy {
        0 => rate_correct = 1.0,
        1 => rate_plus_one = 1.0,
        d if d > 1 => rate_plus_many = 1.0,
        _ => {
            if hyp_speakers == 1 {
                rate_single_speaker = 1.0;
            }
            if discrepancy == -1 {
                rate_minus_one = 1.0;
            } else {
                rate_minus_many = 1.0;
            }
        }
    }

    Ok(FileScore {
        reference: ref_path.display().to_string(),
        hypothesis: hyp_path.display().to_string(),
        audio_duration,
        ref_duration,
        hyp_duration,
        audio_labelled: if audio_duration > 0.0 {
            hyp_duration / audio_duration
        } else {
            0.0
        },
        ref_labelled: if ref_duration > 0.0 {
            hyp_duration / ref_duration
        } else {
            0.0
        },
        der: detail.error_rate(&der_config),
        insertion: detail.insertion_fraction(),
        deletion: detail.deletion_fraction(),
        confusion: detail.confusion_fraction(),
        purity,
        coverage,
        jer,
        seg_purity,
        seg_coverage,
        seg_precision,
        seg_recall,
        seg_f1,
        word_der,
        nwords,
        speaker_uu_rate,
        ref_speakers,
        hyp_speakers,
        nspeakers_discrepancy: discrepancy,
        abs_nspeakers_discrepancy: discrepancy.abs(),
        rate_nspeakers_correct: rate_correct,
        rate_nspeakers_plus_one: rate_plus_one,
        rate_nspeakers_plus_many: rate_plus_many,
        rate_nspeakers_minus_one: rate_minus_one,
        rate_nspeakers_minus_many: rate_minus_many,
        rate_single_speaker_issue: rate_single_speaker,
        word_scores: word_outcome.words,
    })
}

/// Score a whole corpus described by two parallel dbl files.
///
/// Rate metrics are weighted by reference labelled duration, word DER by
/// word count, speaker statistics by file count. A parse failure on any
/// pair aborts the run.
pub fn score_corpus(
    reference_dbl: &Path,
    hypothesis_dbl: &Path,
    opts: &CorpusOpts,
) -> Result<(CorpusScore, Vec<FileScore>)> {
    let references = load_dbl(reference_dbl)?;
    let hypotheses = load_dbl(hypothesis_dbl)?;
    if references.len() != hypotheses.len() {
        return Err(Error::msg(format!(
            "dbl length mismatch: {} reference files vs {} hypothesis files",
            references.len(),
            hypotheses.len()
        )));
    }

    let mut file_scores = Vec::with_capacity(references.len());
    for (i, (reference, hypothesis)) in references.iter().zip(&hypotheses).enumerate() {
        debug!(
            reference,
            hypothesis,
            progress = format!("{}/{}", i + 1, references.len()),
            "scoring file pair"
        );
        let ref_path = resolve_dbl_entry(reference, opts.dbl_root.as_deref());
        let hyp_path = resolve_dbl_entry(hypothesis, opts.dbl_root.as_deref());
        file_scores.push(score_pair(&ref_path, &hyp_path, opts)?);
    }

    Ok((aggregate(&file_scores), file_scores))
}

/// Fold per-file scores into corpus averages.
pub fn aggregate(files: &[FileScore]) -> CorpusScore {
    let mut corpus = CorpusScore {
        total_nfiles: files.len(),
        ..CorpusScore::default()
    };

    let mut total_ref_speakers = 0usize;
    let mut total_hyp_speakers = 0usize;
    let mut total_abs_discrepancy = 0i64;
    let mut weighted_word_der = 0.0;
    let mut speaker_uu_rate_sum = 0.0;

    for file in files {
        let w = file.ref_duration;
        corpus.total_audio_duration += file.audio_duration;
        corpus.total_ref_duration += file.ref_duration;
        corpus.total_hyp_duration += file.hyp_duration;
        corpus.total_nwords += file.nwords;

        corpus.average_der += file.der * w;
        corpus.average_jer += file.jer * w;
        corpus.average_insertion += file.insertion * w;
        corpus.average_deletion += file.deletion * w;
        corpus.average_confusion += file.confusion * w;
        corpus.average_purity += file.purity * w;
        corpus.average_coverage += file.coverage * w;
        corpus.average_seg_purity += file.seg_purity * w;
        corpus.average_seg_coverage += file.seg_coverage * w;
        corpus.average_seg_precision += file.seg_precision * w;
        corpus.average_seg_recall += file.seg_recall * w;
        corpus.average_seg_f1 += file.seg_f1 * w;

        weighted_word_der += file.word_der * file.nwords as f64;
        speaker_uu_rate_sum += file.speaker_uu_rate;

        total_ref_speakers += file.ref_speakers;
        total_hyp_speakers += file.hyp_speakers;
        total_abs_discrepancy += file.abs_nspeakers_discrepancy;
        corpus.rate_nspeakers_correct += file.rate_nspeakers_correct;
        corpus.rate_nspeakers_plus_one += file.rate_nspeakers_plus_one;
        corpus.rate_nspeakers_plus_many += file.rate_nspeakers_plus_many;
        corpus.rate_nspeakers_minus_one += file.rate_nspeakers_minus_one;
        corpus.rate_nspeakers_minus_many += file.rate_nspeakers_minus_many;
        corpus.rate_single_speaker_issue += file.rate_single_speaker_issue;
    }

    // Duration-weighted rates.
    let ref_duration = corpus.total_ref_duration;
    if ref_duration > 0.0 {
        for rate in [
            &mut corpus.average_der,
            &mut corpus.average_jer,
            &mut corpus.average_insertion,
            &mut corpus.average_deletion,
            &mut corpus.average_confusion,
            &mut corpus.average_purity,
            &mut corpus.average_coverage,
            &mut corpus.average_seg_purity,
            &mut corpus.average_seg_coverage,
            &mut corpus.average_seg_precision,
            &mut corpus.average_seg_recall,
            &mut corpus.average_seg_f1,
        ] {
            *rate /= ref_duration;
        }
    }

    if corpus.total_audio_duration > 0.0 {
        corpus.audio_labelled = corpus.total_hyp_duration / corpus.total_audio_duration;
    }
    if ref_duration > 0.0 {
        corpus.ref_labelled = corpus.total_hyp_duration / ref_duration;
    }

    // Word-count-weighted word DER.
    if corpus.total_nwords > 0 {
        corpus.average_word_der = weighted_word_der / corpus.total_nwords as f64;
    }

    // File-count-weighted speaker statistics.
    if !files.is_empty() {
        let nfiles = files.len() as f64;
        corpus.average_speaker_uu_rate = speaker_uu_rate_sum / nfiles;
        corpus.average_nspeakers_ref = total_ref_speakers as f64 / nfiles;
        corpus.average_nspeakers_hyp = total_hyp_speakers as f64 / nfiles;
        corpus.average_nspeakers_discrepancy =
            corpus.average_nspeakers_hyp - corpus.average_nspeakers_ref;
        corpus.average_nspeakers_abs_discrepancy = total_abs_discrepancy as f64 / nfiles;
        corpus.rate_nspeakers_correct /= nfiles;
        corpus.rate_nspeakers_plus_one /= nfiles;
        corpus.rate_nspeakers_plus_many /= nfiles;
        corpus.rate_nspeakers_minus_one /= nfiles;
        corpus.rate_nspeakers_minus_many /= nfiles;
        corpus.rate_single_speaker_issue /= nfiles;
    }

    corpus
}
