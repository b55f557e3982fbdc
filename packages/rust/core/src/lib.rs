//! Pipeline orchestration, corpus combination, and grounding assembly.
//!
//! This crate ties the leaf crates together:
//! - [`pipeline`] — acquire / convert stages over a manifest
//! - [`combiner`] — merge per-document artifacts into one provenance-tagged corpus
//! - [`grounding`] — wrap the corpus in the strict-citation grounding context

pub mod combiner;
pub mod grounding;
pub mod pipeline;

pub use combiner::{CombineResult, combine};
pub use grounding::{Answer, AnswerProvider, AnswerUsage, GroundingRequest, assemble_grounding};
pub use pipeline::{
    ConvertSummary, FetchOptions, PipelinePaths, ProgressReporter, SilentProgress, acquire,
    convert,
};
