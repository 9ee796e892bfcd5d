//! The extraction strategies.
//!
//! Exactly one strategy is selected per run, from `GeneratorConfig::extractor`.

mod local_tree;
mod remote_cms;
mod sitemap_graph;

use tracing::{info, instrument};

use llmstxt_shared::{ExtractorKind, GeneratorConfig, Result};

use crate::Extraction;

pub use local_tree::url_for_relative_path;
pub use remote_cms::api_base;
pub use sitemap_graph::{root_sitemap_url, title_from_url};

/// A content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// WordPress-style REST API.
    RemoteCms,
    /// Local Markdown/HTML content tree.
    LocalFileTree,
    /// Remote `sitemap.xml` (or sitemap index).
    SitemapGraph,
}

impl Strategy {
    /// The strategy configured for this run.
    pub fn from_config(config: &GeneratorConfig) -> Self {
        match config.extractor {
            ExtractorKind::WordPress => Self::RemoteCms,
            ExtractorKind::Static => Self::LocalFileTree,
            ExtractorKind::Sitemap => Self::SitemapGraph,
        }
    }

    /// Name as written in the config and the cache.
    pub fn name(self) -> &'static str {
        match self {
            Self::RemoteCms => ExtractorKind::WordPress.as_str(),
            Self::LocalFileTree => ExtractorKind::Static.as_str(),
            Self::SitemapGraph => ExtractorKind::Sitemap.as_str(),
        }
    }

    /// Check strategy-specific settings before anything is fetched.
    pub fn validate(self, config: &GeneratorConfig) -> Result<()> {
        match self {
            Self::RemoteCms => remote_cms::validate(config),
            Self::LocalFileTree => local_tree::validate(config),
            Self::SitemapGraph => sitemap_graph::validate(config),
        }
    }

    /// Pull records from the source.
    ///
    /// Errors are reserved for failures that leave nothing to extract from
    /// (for example an unusable HTTP client); everything per-unit lands in
    /// [`Extraction::skipped`].
    #[instrument(skip_all, fields(strategy = self.name()))]
    pub async fn extract(self, config: &GeneratorConfig) -> Result<Extraction> {
        let extraction = match self {
            Self::RemoteCms => remote_cms::extract(config).await?,
            Self::LocalFileTree => local_tree::extract(config).await?,
            Self::SitemapGraph => sitemap_graph::extract(config).await?,
        };

        info!(
            items = extraction.records.len(),
            skipped = extraction.skipped.len(),
            "extraction complete"
        );
        Ok(extraction)
    }
}
