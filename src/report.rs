//! Report emission: the scored corpus serialized as JSON or CSV.
//!
//! The JSON report is a single document with the invocation arguments,
//! per-file scores and corpus averages. CSV output is split across two
//! files (details and summary) since the two tables share no columns.

use std::io::Write;

use serde::Serialize;
use serde_json::json;

use crate::Result;
use crate::corpus::{CorpusScore, FileScore};

/// Invocation context echoed into the JSON report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportArgs {
    pub reference: String,
    pub hypothesis: String,
    pub segment_tolerance: f64,
}

const DETAIL_COLUMNS: &[&str] = &[
    "reference",
    "hypothesis",
    "audio_duration",
    "ref_duration",
    "hyp_duration",
    "audio_labelled",
    "ref_labelled",
    "der",
    "insertion",
    "deletion",
    "confusion",
    "purity",
    "coverage",
    "jer",
    "seg_purity",
    "seg_coverage",
    "seg_precision",
    "seg_recall",
    "seg_f1",
    "word_der",
    "nwords",
    "speaker_uu_rate",
    "ref_speakers",
    "hyp_speakers",
    "nspeakers_discrepancy",
    "abs_nspeakers_discrepancy",
];

const SUMMARY_COLUMNS: &[&str] = &[
    "total_nfiles",
    "total_audio_duration",
    "total_ref_duration",
    "total_hyp_duration",
    "audio_labelled",
    "ref_labelled",
    "total_nwords",
    "average_der",
    "average_jer",
    "average_insertion",
    "average_deletion",
    "average_confusion",
    "average_purity",
    "average_coverage",
    "average_seg_purity",
    "average_seg_coverage",
    "average_seg_precision",
    "average_seg_recall",
    "average_seg_f1",
    "average_word_der",
    "average_speaker_uu_rate",
    "average_nspeakers_ref",
    "average_nspeakers_hyp",
    "average_nspeakers_discrepancy",
    "average_nspeakers_abs_discrepancy",
    "rate_nspeakers_correct",
    "rate_nspeakers_plus_one",
    "rate_nspeakers_plus_many",
    "rate_nspeakers_minus_one",
    "rate_nspeakers_minus_many",
    "rate_single_speaker_issue",
];

/// Write the full corpus report as pretty-printed JSON.
pub fn write_json<W: Write>(
    mut writer: W,
    args: &ReportArgs,
    files: &[FileScore],
    overall: &CorpusScore,
) -> Result<()> {
    let report = json!({
        "args": args,
        "files": files,
        "overall": overall,
    });
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.write_all(b"\n")?;
    Ok(())
}

fn csv_field(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => {
            if s.contains([',', '"', '\n']) {
                format!("\"{}\"", s.replace('"', "\"\""))
            } else {
                s.clone()
            }
        }
        other => other.to_string(),
    }
}

fn write_csv_row<W: Write>(
    writer: &mut W,
    columns: &[&str],
    record: &serde_json::Value,
) -> Result<()> {
    let row: Vec<String> = columns
        .iter()
        .map(|c| {
            record
                .get(c)
                .map_or_else(String::new, |v| csv_field(v))
        })
        .collect();
    writeln!(writer, "{}", row.join(","))?;
    Ok(())
}

/// Write one CSV row per scored file pair.
pub fn write_csv_details<W: Write>(mut writer: W, files: &[FileScore]) -> Result<()> {
    writeln!(writer, "{}", DETAIL_COLUMNS.join(","))?;
    for file in files {
        let record = serde_json::to_value(file)?;
        write_csv_row(&mut writer, DETAIL_COLUMNS, &record)?;
    }
    Ok(())
}

/// Write the corpus averages as a single-row CSV.
pub fn write_csv_summary<W: Write>(mut writer: W, overall: &CorpusScore) -> Result<()> {
    writeln!(writer, "{}", SUMMARY_COLUMNS.join(","))?;
    let record = serde_json::to_value(overall)?;
    write_csv_row(&mut writer, SUMMARY_COLUMNS, &record)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> FileScore {
        FileScore {
            reference: "ref/a.lab".into(),
            hypothesis: "hyp/a.lab".into(),
            audio_duration: 10.0,
            ref_duration: 8.0,
            hyp_duration: 7.5,
            audio_labelled: 0.75,
            ref_labelled: 0.9375,
            der: 0.125,
            insertion: 0.0,
            deletion: 0.0625,
            confusion: 0.0625,
            purity: 0.9,
            coverage: 0.95,
            jer: 0.2,
            seg_purity: 0.9,
            seg_coverage: 0.9,
            seg_precision: 1.0,
            seg_recall: 0.5,
            seg_f1: 2.0 / 3.0,
            word_der: 0.1,
            nwords: 40,
            speaker_uu_rate: 0.05,
            ref_speakers: 2,
            hyp_speakers: 2,
            nspeakers_discrepancy: 0,
            abs_nspeakers_discrepancy: 0,
            rate_nspeakers_correct: 1.0,
            rate_nspeakers_plus_one: 0.0,
            rate_nspeakers_plus_many: 0.0,
            rate_nspeakers_minus_one: 0.0,
            rate_nspeakers_minus_many: 0.0,
            rate_single_speaker_issue: 0.0,
            word_scores: Vec::new(),
        }
    }

    #[test]
    fn json_report_has_all_sections() -> anyhow::Result<()> {
        let mut buf = Vec::new();
        let overall = crate::corpus::aggregate(&[sample_file()]);
        write_json(&mut buf, &ReportArgs::default(), &[sample_file()], &overall)?;
        let parsed: serde_json::Value = serde_json::from_slice(&buf)?;
        assert!(parsed.get("args").is_some());
        assert_eq!(parsed["files"].as_array().map(Vec::len), Some(1));
        assert_eq!(parsed["overall"]["total_nfiles"], 1);
        Ok(())
    }

    #[test]
    fn details_csv_has_header_and_one_row_per_file() -> anyhow::Result<()> {
        let mut buf = Vec::new();
        write_csv_details(&mut buf, &[sample_file(), sample_file()])?;
        let text = String::from_utf8(buf)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("reference,hypothesis,audio_duration"));
        assert!(lines[1].starts_with("ref/a.lab,hyp/a.lab,"));
        for line in &lines {
            assert_eq!(line.matches(',').count(), DETAIL_COLUMNS.len() - 1);
        }
        Ok(())
    }

    #[test]
    fn summary_csv_is_a_single_row() -> anyhow::Result<()> {
        let mut buf = Vec::new();
        let overall = crate::corpus::aggregate(&[sample_file()]);
        write_csv_summary(&mut buf, &overall)?;
        let text = String::from_utf8(buf)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1].split(',').count(),
            SUMMARY_COLUMNS.len(),
            "summary row must cover every column"
        );
        Ok(())
    }

    #[test]
    fn fields_with_commas_are_quoted() -> anyhow::Result<()> {
        let mut file = sample_file();
        file.reference = "ref/a,b.lab".into();
        let mut buf = Vec::new();
        write_csv_details(&mut buf, &[file])?;
        let text = String::from_utf8(buf)?;
        assert!(text.contains("\"ref/a,b.lab\""));
        Ok(())
    }
}
