//! Pipeline orchestration for the llms.txt generator.
//!
//! This crate ties together extraction, normalization, change detection,
//! manifest rendering, and sibling-file updates into the `generate` and
//! `preview` workflows.

pub mod cache;
pub mod normalize;
pub mod pipeline;

pub use cache::{ChangeCache, content_hash};
pub use llmstxt_discovery::PatchOutcome;
pub use normalize::normalize;
pub use pipeline::{
    GenerationOutcome, Preview, ProgressReporter, SilentProgress, generate, generate_at, preview,
};
