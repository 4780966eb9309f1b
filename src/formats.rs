//! Input file parsing.
//!
//! Every supported format boils down to the same contract: a sequence of
//! `(start, end, label)` tuples which is then built into an [`Annotation`]
//! and run through the standard [`PostProcess`] pipeline.
//!
//! Supported formats:
//! - `.lab` — `<start> <end> <label>` per line
//! - `.ctm` — `<id> <channel> <start> <duration> <label> <score>` per line
//! - `.json` — either a Speechmatics-style v2 transcript (a `results` list of
//!   word tokens) or the flat reference format (a list of
//!   `{speaker_name, start, duration}` objects)
//! - `.dbl` — a plain list of basenames used to pair up corpora

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::annotation::Annotation;
use crate::segment::Segment;
use crate::transform::PostProcess;
use crate::{Error, Result};

/// The closed set of supported annotation file formats, selected by
/// file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Lab,
    Ctm,
    Json,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<FileFormat> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("lab") => Ok(FileFormat::Lab),
            Some("ctm") => Ok(FileFormat::Ctm),
            Some("json") => Ok(FileFormat::Json),
            _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// A raw `(start, end, label)` tuple as produced by any parser.
pub type RawEntry = (f64, f64, String);

fn format_error(path: &Path, line_no: usize, line: &str, reason: impl Into<String>) -> Error {
    Error::Format {
        path: path.to_path_buf(),
        line_no,
        line: line.to_owned(),
        reason: reason.into(),
    }
}

fn parse_f64(token: &str, path: &Path, line_no: usize, line: &str) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| format_error(path, line_no, line, format!("not a number: {token:?}")))
}

/// Parse a `.lab` file: `<start> <end> <label>` per line, blank lines skipped.
pub fn load_lab(path: &Path) -> Result<Vec<RawEntry>> {
    let content = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() != 3 {
            return Err(format_error(
                path,
                line_no,
                line,
                format!("expected 3 fields, found {}", tokens.len()),
            ));
        }
        let start = parse_f64(tokens[0], path, line_no, line)?;
        let end = parse_f64(tokens[1], path, line_no, line)?;
        entries.push((start, end, tokens[2].to_owned()));
    }
    Ok(entries)
}

/// Parse a `.ctm` file: `<id> <channel> <start> <duration> <label> <score>`;
/// `end = start + duration`.
pub fn load_ctm(path: &Path) -> Result<Vec<RawEntry>> {
    let content = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() != 6 {
            return Err(format_error(
                path,
                line_no,
                line,
                format!("expected 6 fields, found {}", tokens.len()),
            ));
        }
        let start = parse_f64(tokens[2], path, line_no, line)?;
        let duration = parse_f64(tokens[3], path, line_no, line)?;
        entries.push((start, start + duration, tokens[4].to_owned()));
    }
    Ok(entries)
}

#[derive(Debug, Deserialize)]
struct V2Alternative {
    speaker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct V2Token {
    start_time: f64,
    end_time: f64,
    #[serde(rename = "type")]
    kind: Option<String>,
    alternatives: Vec<V2Alternative>,
}

/// Speechmatics-style v2 transcript: either `{"results": [...]}` or a bare
/// top-level token array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum V2Transcript {
    Wrapped { results: Vec<V2Token> },
    Bare(Vec<V2Token>),
}

impl V2Transcript {
    fn into_tokens(self) -> Vec<V2Token> {
        match self {
            V2Transcript::Wrapped { results } => results,
            V2Transcript::Bare(tokens) => tokens,
        }
    }
}

/// Flat reference format: `{speaker_name, word?, start, duration}` objects.
#[derive(Debug, Deserialize)]
struct ReferenceWord {
    speaker_name: String,
    start: f64,
    duration: f64,
}

/// The entries parsed from a `.json` input, plus which of the two JSON
/// dialects matched (unknown-speaker handling differs between them).
#[derive(Debug)]
pub struct ParsedJson {
    pub entries: Vec<RawEntry>,
    pub is_v2: bool,
}

fn v2_label(token: &V2Token, unknown_label: &str) -> String {
    token
        .alternatives
        .first()
        .and_then(|a| a.speaker.clone())
        .unwrap_or_else(|| unknown_label.to_owned())
}

/// Parse a `.json` input, trying the v2 transcript format first and backing
/// off to the flat reference format.
pub fn load_json(path: &Path, unknown_label: &str) -> Result<ParsedJson> {
    let content = fs::read_to_string(path)?;

    if let Ok(transcript) = serde_json::from_str::<V2Transcript>(&content) {
        let entries = transcript
            .into_tokens()
            .iter()
            .map(|t| (t.start_time, t.end_time, v2_label(t, unknown_label)))
            .collect();
        return Ok(ParsedJson {
            entries,
            is_v2: true,
        });
    }

    if let Ok(words) = serde_json::from_str::<Vec<ReferenceWord>>(&content) {
        let entries = words
            .iter()
            .map(|w| {
                (
                    w.start,
                    w.start + w.duration,
                    w.speaker_name.replace(' ', "_"),
                )
            })
            .collect();
        return Ok(ParsedJson {
            entries,
            is_v2: false,
        });
    }

    Err(Error::msg(format!(
        "unsupported diarization json format: {}",
        path.display()
    )))
}

/// Count the v2 `word` tokens labelled with the unknown-speaker sentinel.
///
/// Returns 0 for anything that is not a v2 JSON transcript: the unknown
/// speaker is a v2-only concept.
pub fn unknown_word_count(path: &Path, unknown_label: &str) -> Result<usize> {
    if !matches!(FileFormat::from_path(path), Ok(FileFormat::Json)) {
        return Ok(0);
    }
    let content = fs::read_to_string(path)?;
    let Ok(transcript) = serde_json::from_str::<V2Transcript>(&content) else {
        return Ok(0);
    };
    let count = transcript
        .into_tokens()
        .iter()
        .filter(|t| {
            t.kind.as_deref() == Some("word") && v2_label(t, unknown_label) == unknown_label
        })
        .count();
    Ok(count)
}

/// Load a `.dbl` file: one basename per line, blank lines skipped.
pub fn load_dbl(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Resolve a dbl basename against an optional root directory.
pub fn resolve_dbl_entry(basename: &str, root: Option<&Path>) -> PathBuf {
    match root {
        Some(root) => root.join(basename),
        None => PathBuf::from(basename),
    }
}

fn build_annotation(entries: Vec<RawEntry>) -> Result<Annotation> {
    let mut segments = Vec::with_capacity(entries.len());
    for (start, end, label) in entries {
        segments.push((Segment::new(start, end)?, label));
    }
    Ok(Annotation::from_entries(segments))
}

/// Parse any supported file into a post-processed [`Annotation`].
///
/// The `config` pipeline is applied after parsing. When the file turns out
/// to be in the flat reference JSON format, unknown-speaker removal is
/// forcibly disabled — that format has no unknown-speaker concept.
pub fn annotation_from_file(path: &Path, config: &PostProcess) -> Result<Annotation> {
    let format = FileFormat::from_path(path)?;
    let (entries, config) = match format {
        FileFormat::Lab => (load_lab(path)?, config.clone()),
        FileFormat::Ctm => (load_ctm(path)?, config.clone()),
        FileFormat::Json => {
            let parsed = load_json(path, &config.unknown_label)?;
            let mut config = config.clone();
            if !parsed.is_v2 {
                config.remove_unknown = false;
            }
            (parsed.entries, config)
        }
    };
    let annotation = build_annotation(entries)?;
    Ok(config.apply(&annotation))
}

/// Write an annotation in lab format: `<start> <end> <label>` per line.
pub fn write_lab<W: Write>(annotation: &Annotation, mut w: W) -> Result<()> {
    for entry in annotation.iter() {
        writeln!(w, "{} {} {}", entry.segment.start, entry.segment.end, entry.label)?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::MergeGap;
    use approx::assert_relative_eq;
    use std::io::Write as _;

    fn write_temp(ext: &str, content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join(format!("input.{ext}"))).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        dir
    }

    fn plain_config() -> PostProcess {
        PostProcess {
            merge_gap: MergeGap::None,
            remove_overlaps: false,
            remove_unknown: true,
            ..PostProcess::default()
        }
    }

    #[test]
    fn lab_round_trip() {
        let dir = write_temp("lab", "0.0 1.5 spk1\n\n2.0 3.0 spk2\n");
        let path = dir.path().join("input.lab");
        let annotation = annotation_from_file(&path, &plain_config()).unwrap();
        assert_eq!(annotation.len(), 2);
        assert_eq!(annotation.labels(), vec!["spk1", "spk2"]);

        let mut out = Vec::new();
        write_lab(&annotation, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0 1.5 spk1\n2 3 spk2\n");
    }

    #[test]
    fn lab_malformed_line_is_surfaced() {
        let dir = write_temp("lab", "0.0 1.5 spk1\n0.0 oops\n");
        let path = dir.path().join("input.lab");
        let err = annotation_from_file(&path, &plain_config()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 2"), "unexpected error: {msg}");
        assert!(msg.contains("oops"), "unexpected error: {msg}");
    }

    #[test]
    fn ctm_end_is_start_plus_duration() {
        let dir = write_temp("ctm", "utt1 1 0.5 1.25 spk1 0.9\n");
        let path = dir.path().join("input.ctm");
        let annotation = annotation_from_file(&path, &plain_config()).unwrap();
        let entry = annotation.iter().next().unwrap();
        assert_relative_eq!(entry.segment.end, 1.75);
        assert_eq!(entry.label, "spk1");
    }

    #[test]
    fn ctm_wrong_field_count_is_surfaced() {
        let dir = write_temp("ctm", "utt1 1 0.5 1.25 spk1 0.9\nutt1 1 2.0 spk2\n");
        let path = dir.path().join("input.ctm");
        let err = annotation_from_file(&path, &plain_config()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 2"), "unexpected error: {msg}");
        assert!(msg.contains("expected 6 fields"), "unexpected error: {msg}");
    }

    #[test]
    fn ctm_non_numeric_duration_is_surfaced() {
        let dir = write_temp("ctm", "utt1 1 0.5 long spk1 0.9\n");
        let path = dir.path().join("input.ctm");
        let err = annotation_from_file(&path, &plain_config()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("not a number"), "unexpected error: {msg}");
        assert!(msg.contains("long"), "unexpected error: {msg}");
    }

    #[test]
    fn unknown_word_count_is_zero_for_non_json_inputs() {
        let dir = write_temp("lab", "0.0 1.0 UU\n");
        let path = dir.path().join("input.lab");
        assert_eq!(unknown_word_count(&path, "UU").unwrap(), 0);
    }

    #[test]
    fn v2_json_parses_and_strips_unknown() {
        let json = r#"{"results": [
            {"start_time": 0.0, "end_time": 1.0, "type": "word",
             "alternatives": [{"speaker": "S1"}]},
            {"start_time": 1.0, "end_time": 2.0, "type": "word",
             "alternatives": [{"speaker": "UU"}]}
        ]}"#;
        let dir = write_temp("json", json);
        let path = dir.path().join("input.json");
        let annotation = annotation_from_file(&path, &plain_config()).unwrap();
        assert_eq!(annotation.labels(), vec!["S1"]);
        assert_eq!(unknown_word_count(&path, "UU").unwrap(), 1);
    }

    #[test]
    fn reference_json_fallback_keeps_all_speakers() {
        let json = r#"[
            {"speaker_name": "Speaker 1", "word": "Seems", "start": 0.75, "duration": 0.29},
            {"speaker_name": "UU", "word": "odd", "start": 1.2, "duration": 0.3}
        ]"#;
        let dir = write_temp("json", json);
        let path = dir.path().join("input.json");
        let annotation = annotation_from_file(&path, &plain_config()).unwrap();
        // Fallback format has no unknown-speaker concept: nothing is removed,
        // and spaces in speaker names become underscores.
        assert_eq!(annotation.labels(), vec!["Speaker_1", "UU"]);
        assert_eq!(unknown_word_count(&path, "UU").unwrap(), 0);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = write_temp("txt", "0 1 a\n");
        let path = dir.path().join("input.txt");
        assert!(matches!(
            annotation_from_file(&path, &plain_config()),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn reversed_segment_is_rejected_at_parse_time() {
        let dir = write_temp("lab", "2.0 1.0 spk1\n");
        let path = dir.path().join("input.lab");
        assert!(matches!(
            annotation_from_file(&path, &plain_config()),
            Err(Error::InvalidSegment { .. })
        ));
    }

    #[test]
    fn dbl_lists_basenames() {
        let dir = write_temp("dbl", "file_a\nfile_b\n\n");
        let path = dir.path().join("input.dbl");
        let entries = load_dbl(&path).unwrap();
        assert_eq!(entries, vec!["file_a", "file_b"]);
        assert_eq!(
            resolve_dbl_entry("file_a.lab", Some(Path::new("/corpus"))),
            PathBuf::from("/corpus/file_a.lab")
        );
    }
}
