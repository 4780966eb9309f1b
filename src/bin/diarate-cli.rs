use anyhow::{Result, bail};
use clap::Parser;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use diarate::corpus::{FileScore, score_corpus, score_pair};
use diarate::formats::{annotation_from_file, write_lab};
use diarate::logging;
use diarate::opts::{OutputFormat, ScoreOpts};
use diarate::report::{ReportArgs, write_csv_details, write_csv_summary, write_json};
use diarate::transform::PostProcess;

fn main() -> Result<()> {
    logging::init();
    let params = get_params()?;
    let opts = params.score_opts();

    if params.is_corpus_run() != (params.hypothesis.extension().is_some_and(|e| e == "dbl")) {
        bail!("reference and hypothesis must both be dbl lists, or neither");
    }

    if params.is_corpus_run() {
        run_corpus(&params, &opts)
    } else {
        run_pair(&params, &opts)
    }
}

fn run_corpus(params: &Params, opts: &ScoreOpts) -> Result<()> {
    let corpus_opts = opts.corpus_opts();
    let (overall, files) = score_corpus(&params.reference, &params.hypothesis, &corpus_opts)?;

    let args = ReportArgs {
        reference: params.reference.display().to_string(),
        hypothesis: params.hypothesis.display().to_string(),
        segment_tolerance: opts.segment_tolerance,
    };

    match opts.output_format {
        OutputFormat::Json => {
            let path = params.outdir.join("results.json");
            write_json(writer_for(&path)?, &args, &files, &overall)?;
            println!("wrote {}", path.display());
        }
        OutputFormat::Csv => {
            let details = params.outdir.join("results-details.csv");
            write_csv_details(writer_for(&details)?, &files)?;
            let summary = params.outdir.join("results-summary.csv");
            write_csv_summary(writer_for(&summary)?, &overall)?;
            println!("wrote {} and {}", details.display(), summary.display());
        }
    }

    print_summary(&mut io::stdout().lock(), &overall)?;
    Ok(())
}

fn run_pair(params: &Params, opts: &ScoreOpts) -> Result<()> {
    let corpus_opts = opts.corpus_opts();
    let score = score_pair(&params.reference, &params.hypothesis, &corpus_opts)?;

    if let Some(out_path) = &opts.output_hyp_label {
        let config = PostProcess {
            merge_gap: corpus_opts.merge_gap,
            remove_overlaps: true,
            remove_unknown: true,
            unknown_label: corpus_opts.unknown_label.clone(),
        };
        let hypothesis = annotation_from_file(&params.hypothesis, &config)?;
        write_lab(&hypothesis, writer_for(out_path)?)?;
        println!("wrote {}", out_path.display());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match opts.output_format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &score)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            write_csv_details(&mut out, std::slice::from_ref(&score))?;
        }
    }

    print_file_summary(&mut out, &score)?;
    if opts.show_words {
        print_words(&mut out, &score)?;
    }
    Ok(())
}

fn writer_for(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

fn print_file_summary<W: Write>(out: &mut W, score: &FileScore) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "diarization error rate:  {:7.2}%", score.der * 100.0)?;
    writeln!(out, "  insertion:             {:7.2}%", score.insertion * 100.0)?;
    writeln!(out, "  deletion:              {:7.2}%", score.deletion * 100.0)?;
    writeln!(out, "  confusion:             {:7.2}%", score.confusion * 100.0)?;
    writeln!(out, "jaccard error rate:      {:7.2}%", score.jer * 100.0)?;
    writeln!(out, "purity:                  {:7.2}%", score.purity * 100.0)?;
    writeln!(out, "coverage:                {:7.2}%", score.coverage * 100.0)?;
    writeln!(out, "segmentation precision:  {:7.2}%", score.seg_precision * 100.0)?;
    writeln!(out, "segmentation recall:     {:7.2}%", score.seg_recall * 100.0)?;
    writeln!(out, "segmentation f1:         {:7.2}%", score.seg_f1 * 100.0)?;
    writeln!(out, "word DER:                {:7.2}%", score.word_der * 100.0)?;
    writeln!(
        out,
        "speakers (ref/hyp):      {} / {}",
        score.ref_speakers, score.hyp_speakers
    )?;
    Ok(())
}

fn print_summary<W: Write>(out: &mut W, overall: &diarate::corpus::CorpusScore) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "files scored:            {}", overall.total_nfiles)?;
    writeln!(out, "average DER:             {:7.2}%", overall.average_der * 100.0)?;
    writeln!(out, "average JER:             {:7.2}%", overall.average_jer * 100.0)?;
    writeln!(out, "average word DER:        {:7.2}%", overall.average_word_der * 100.0)?;
    writeln!(
        out,
        "speaker count correct:   {:7.2}%",
        overall.rate_nspeakers_correct * 100.0
    )?;
    Ok(())
}

fn print_words<W: Write>(out: &mut W, score: &FileScore) -> Result<()> {
    writeln!(out)?;
    for word in &score.word_scores {
        writeln!(
            out,
            "{:9.2} {:9.2}  {}  {}",
            word.start,
            word.end,
            if word.correct { "ok " } else { "ERR" },
            word.label
        )?;
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "diarate")]
#[command(about = "A diarization scoring CLI")]
struct Params {
    /// Reference label file, or a dbl list of reference files.
    pub reference: PathBuf,

    /// Hypothesis label file, or a dbl list of hypothesis files.
    pub hypothesis: PathBuf,

    /// Root directory prepended to relative dbl entries.
    #[arg(long = "dbl-root")]
    pub dbl_root: Option<PathBuf>,

    #[arg(
        short = 'o',
        long = "output-format",
        value_enum,
        default_value_t = OutputFormat::Json
    )]
    pub output_format: OutputFormat,

    /// Tolerance in seconds when matching speaker-change boundaries.
    #[arg(long = "segmentation-tolerance", default_value_t = 1.0)]
    pub segment_tolerance: f64,

    /// Largest same-speaker gap in seconds to merge; zero disables merging,
    /// negative merges any gap.
    #[arg(long = "merge-gap", default_value_t = diarate::transform::DEFAULT_MERGE_GAP)]
    pub merge_gap: f64,

    /// Print per-word correctness detail (single-pair runs only).
    #[arg(long = "show-words", default_value_t = false)]
    pub show_words: bool,

    /// Write the post-processed hypothesis as a lab file to this path.
    #[arg(long = "output-hyp-label")]
    pub output_hyp_label: Option<PathBuf>,

    /// Score a missing hypothesis lab file as a single unknown-speaker
    /// segment instead of failing.
    #[arg(long = "allow-missing-hyp-lab", default_value_t = false)]
    pub allow_missing_hyp_lab: bool,

    /// Directory for corpus report files.
    #[arg(long = "outdir", default_value = ".")]
    pub outdir: PathBuf,
}

impl Params {
    fn is_corpus_run(&self) -> bool {
        self.reference.extension().is_some_and(|e| e == "dbl")
    }

    fn score_opts(&self) -> ScoreOpts {
        ScoreOpts {
            dbl_root: self.dbl_root.clone(),
            segment_tolerance: self.segment_tolerance,
            merge_gap: self.merge_gap,
            allow_missing_hyp_lab: self.allow_missing_hyp_lab,
            show_words: self.show_words,
            output_hyp_label: self.output_hyp_label.clone(),
            output_format: self.output_format,
        }
    }
}

fn get_params() -> Result<Params> {
    Ok(Params::parse())
}
