use approx::assert_relative_eq;

use diarate::annotation::Annotation;
use diarate::diarization::{
    DerConfig, der, der_components, diarization_coverage, diarization_purity, jaccard_error_rate,
};
use diarate::segment::Segment;
use diarate::segmentation::{segmentation_precision, segmentation_recall};
use diarate::timeline::Timeline;
use diarate::words::wder;

fn ann(entries: &[(f64, f64, &str)]) -> Annotation {
    Annotation::from_entries(
        entries
            .iter()
            .map(|&(s, e, l)| (Segment::new(s, e).unwrap(), l)),
    )
}

#[test]
fn der_decomposes_into_named_components() {
    // 10s reference: A then B. The hypothesis confuses 2s, misses 1s and
    // hallucinates 1s after the end.
    let reference = ann(&[(0.0, 5.0, "A"), (5.0, 10.0, "B")]);
    let hypothesis = ann(&[(0.0, 7.0, "h1"), (7.0, 9.0, "h2"), (10.0, 11.0, "h2")]);

    let config = DerConfig::default();
    let detail = der_components(&reference, &hypothesis, None, &config);
    assert_relative_eq!(detail.total, 10.0);
    assert_relative_eq!(detail.confusion, 2.0);
    assert_relative_eq!(detail.miss, 1.0);
    assert_relative_eq!(detail.false_alarm, 1.0);
    assert_relative_eq!(detail.error_rate(&config), 0.4);
}

#[test]
fn mapping_is_globally_optimal_not_greedy() {
    // h1 overlaps A the most, but assigning h1 to A would orphan B.
    // The optimal assignment takes the global maximum instead.
    let reference = ann(&[(0.0, 6.0, "A"), (6.0, 10.0, "B")]);
    let hypothesis = ann(&[(0.0, 4.0, "h1"), (4.0, 10.0, "h2")]);

    // Greedy (h2 -> A by largest single overlap is wrong here): optimal is
    // h1 -> A (4s) plus h2 -> B (4s) = 8s correct, versus h2 -> A (2s
    // correct on A) at most 6s.
    let rate = der(&reference, &hypothesis, None, &DerConfig::default());
    assert_relative_eq!(rate, 0.2);
}

#[test]
fn uem_restricts_every_metric() {
    let reference = ann(&[(0.0, 10.0, "A")]);
    let hypothesis = ann(&[(0.0, 5.0, "h1"), (5.0, 10.0, "h2")]);
    let uem = Timeline::new([Segment::new(0.0, 5.0).unwrap()]);

    // Inside the UEM the hypothesis is perfect.
    assert_relative_eq!(
        der(&reference, &hypothesis, Some(&uem), &DerConfig::default()),
        0.0
    );
    assert_relative_eq!(jaccard_error_rate(&reference, &hypothesis, Some(&uem)), 0.0);
    assert_relative_eq!(diarization_purity(&reference, &hypothesis, Some(&uem)), 1.0);
    assert_relative_eq!(
        diarization_coverage(&reference, &hypothesis, Some(&uem)),
        1.0
    );

    // Over the full extent the split costs coverage.
    assert!(diarization_coverage(&reference, &hypothesis, None) < 1.0);
}

#[test]
fn segmentation_and_frame_metrics_disagree_on_relabeling() {
    // Boundaries are perfect but the second half is attributed to the
    // wrong speaker: segmentation metrics stay clean, DER does not.
    let reference = ann(&[(0.0, 5.0, "A"), (5.0, 10.0, "B")]);
    let hypothesis = ann(&[(0.0, 5.0, "h1"), (5.0, 10.0, "h1")]);

    assert_relative_eq!(segmentation_precision(&reference, &hypothesis, 0.5), 1.0);
    assert_relative_eq!(segmentation_recall(&reference, &hypothesis, 0.5), 1.0);
    assert!(der(&reference, &hypothesis, None, &DerConfig::default()) > 0.0);
}

#[test]
fn word_and_frame_views_of_the_same_errors() {
    let reference = ann(&[(0.0, 2.0, "A"), (2.0, 4.0, "B")]);
    // Four words, the last one attributed to the wrong cluster.
    let hypothesis = ann(&[
        (0.0, 1.0, "h1"),
        (1.0, 2.0, "h1"),
        (2.0, 3.0, "h2"),
        (3.0, 4.0, "h1"),
    ]);

    let outcome = wder(&reference, &hypothesis, None, "UU");
    assert_eq!(outcome.total_words, 4);
    assert_eq!(outcome.incorrect, 1);
    assert_relative_eq!(outcome.error_rate().unwrap(), 0.25);
    assert_relative_eq!(
        der(&reference, &hypothesis, None, &DerConfig::default()),
        0.25
    );
}
