//! Content extraction strategies.
//!
//! This crate provides:
//! - [`Strategy`]: the closed set of content sources (WordPress-style REST
//!   API, local Markdown/HTML tree, remote sitemap graph)
//! - [`Extraction`]: records plus the units that were skipped along the way
//! - [`Transport`]: the retrying HTTP client the remote strategies share

pub mod strategies;
pub mod transport;

use llmstxt_shared::ContentRecord;
use tracing::debug;

pub use strategies::Strategy;
pub use transport::Transport;

/// A unit (file, page, post, child sitemap) that produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedUnit {
    pub unit: String,
    pub reason: String,
}

/// Output of one strategy run.
///
/// Per-unit failures never abort extraction; they are collected here and
/// reported once by the caller.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<ContentRecord>,
    pub skipped: Vec<SkippedUnit>,
}

impl Extraction {
    pub fn push(&mut self, record: ContentRecord) {
        self.records.push(record);
    }

    pub fn skip(&mut self, unit: impl Into<String>, reason: impl ToString) {
        let unit = unit.into();
        let reason = reason.to_string();
        debug!(%unit, %reason, "skipped");
        self.skipped.push(SkippedUnit { unit, reason });
    }

    pub fn extend(&mut self, other: Extraction) {
        self.records.extend(other.records);
        self.skipped.extend(other.skipped);
    }
}
