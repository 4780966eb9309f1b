//! `diarate` — a scoring library for speaker diarization output.
//!
//! This crate provides:
//! - Time-interval primitives (segments, timelines, labelled annotations)
//! - Label file parsing (lab, ctm, transcript JSON, dbl lists)
//! - Frame-level metrics (DER, JER, purity/coverage) under an optimal
//!   speaker mapping
//! - Boundary- and word-level metrics (segmentation precision/recall,
//!   word DER)
//! - Corpus aggregation and report emission (JSON, CSV)
//!
//! The library is designed to be used by both CLI tools and batch pipelines,
//! with an emphasis on deterministic output and minimal surprises.

// High-level API (most consumers should start here).
pub mod corpus;
pub mod opts;

// Time-interval primitives.
pub mod annotation;
pub mod segment;
pub mod timeline;

// Label file parsing and post-processing.
pub mod formats;
pub mod transform;

// Metric computation.
pub mod diarization;
pub mod matcher;
pub mod segmentation;
pub mod support;
pub mod words;

// Report emission.
pub mod report;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

mod error;

pub use error::{Error, Result};
