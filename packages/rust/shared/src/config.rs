//! Generator configuration.
//!
//! The config file (`llms_config.toml` by default) is deserialized into
//! [`AppConfig`], where every key has a default. [`GeneratorConfig`] is the
//! validated, immutable form the pipeline runs on; it is built exactly once
//! per run via `GeneratorConfig::try_from(&app_config)`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{LlmsTxtError, Result};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "llms_config.toml";

// ---------------------------------------------------------------------------
// Config structs (matching llms_config.toml schema)
// ---------------------------------------------------------------------------

/// Top-level config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Public base URL of the site.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Site name shown in the manifest header.
    #[serde(default = "default_site_name")]
    pub site_name: String,

    /// One-line site description for the manifest header.
    #[serde(default = "default_description")]
    pub description: String,

    /// Contact address for the manifest header.
    #[serde(default = "default_contact_email")]
    pub contact_email: String,

    /// Extraction strategy: "wordpress", "static" or "sitemap".
    #[serde(default = "default_extractor")]
    pub extractor: String,

    /// Where the manifest is written.
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Directory holding the site's `sitemap.xml` / `robots.txt` candidates.
    #[serde(default = "default_site_root")]
    pub site_root: String,

    #[serde(default = "default_true")]
    pub auto_update_sitemap: bool,

    #[serde(default = "default_true")]
    pub auto_update_robots: bool,

    /// Copy sibling files aside before rewriting them.
    #[serde(default = "default_true")]
    pub backup_files: bool,

    #[serde(default = "default_max_items")]
    pub max_items: usize,

    #[serde(default = "default_min_word_count")]
    pub min_word_count: u64,

    #[serde(default)]
    pub include_drafts: bool,

    /// Change-cache file path.
    #[serde(default = "default_cache_file")]
    pub cache_file: String,

    /// Cache lifetime in seconds.
    #[serde(default = "default_cache_duration")]
    pub cache_duration: u64,

    /// `[wordpress]` section.
    #[serde(default)]
    pub wordpress: WordPressConfig,

    /// `[static]` section.
    #[serde(default, rename = "static")]
    pub static_site: StaticConfig,

    /// `[sitemap]` section.
    #[serde(default)]
    pub sitemap: SitemapConfig,

    /// `[output]` section.
    #[serde(default)]
    pub output: OutputConfig,

    /// `[performance]` section.
    #[serde(default)]
    pub performance: PerformanceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            site_name: default_site_name(),
            description: default_description(),
            contact_email: default_contact_email(),
            extractor: default_extractor(),
            output_path: default_output_path(),
            site_root: default_site_root(),
            auto_update_sitemap: true,
            auto_update_robots: true,
            backup_files: true,
            max_items: default_max_items(),
            min_word_count: default_min_word_count(),
            include_drafts: false,
            cache_file: default_cache_file(),
            cache_duration: default_cache_duration(),
            wordpress: WordPressConfig::default(),
            static_site: StaticConfig::default(),
            sitemap: SitemapConfig::default(),
            output: OutputConfig::default(),
            performance: PerformanceConfig::default(),
        }
    }
}

fn default_site_url() -> String {
    "https://example.com".into()
}
fn default_site_name() -> String {
    "My Website".into()
}
fn default_description() -> String {
    "A website with great content".into()
}
fn default_contact_email() -> String {
    "contact@example.com".into()
}
fn default_extractor() -> String {
    "sitemap".into()
}
fn default_output_path() -> String {
    "./llms.txt".into()
}
fn default_site_root() -> String {
    ".".into()
}
fn default_true() -> bool {
    true
}
fn default_max_items() -> usize {
    1000
}
fn default_min_word_count() -> u64 {
    50
}
fn default_cache_file() -> String {
    ".llms_cache.json".into()
}
fn default_cache_duration() -> u64 {
    3600
}
fn default_auto() -> String {
    "auto".into()
}

/// `[wordpress]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordPressConfig {
    /// REST API base, or "auto" to derive `<site_url>/wp-json/wp/v2`.
    #[serde(default = "default_auto")]
    pub api_url: String,

    /// Items per page (the API caps this at 100).
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Post types to page through.
    #[serde(default = "default_post_types")]
    pub post_types: Vec<String>,

    /// Category slugs or names to exclude.
    #[serde(default = "default_exclude_categories")]
    pub exclude_categories: Vec<String>,
}

impl Default for WordPressConfig {
    fn default() -> Self {
        Self {
            api_url: default_auto(),
            per_page: default_per_page(),
            post_types: default_post_types(),
            exclude_categories: default_exclude_categories(),
        }
    }
}

fn default_per_page() -> u32 {
    100
}
fn default_post_types() -> Vec<String> {
    vec!["posts".into(), "pages".into()]
}
fn default_exclude_categories() -> Vec<String> {
    vec!["uncategorized".into()]
}

/// `[static]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticConfig {
    /// Root of the content tree.
    #[serde(default = "default_content_directory")]
    pub content_directory: String,

    /// Include globs, matched against paths relative to the root.
    #[serde(default = "default_file_patterns")]
    pub file_patterns: Vec<String>,

    /// Exclude globs, checked before any file is parsed.
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            content_directory: default_content_directory(),
            file_patterns: default_file_patterns(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

fn default_content_directory() -> String {
    "./content".into()
}
fn default_file_patterns() -> Vec<String> {
    vec!["*.md".into(), "*.html".into()]
}
fn default_exclude_patterns() -> Vec<String> {
    vec!["admin/*".into(), "private/*".into(), "draft/*".into()]
}

/// `[sitemap]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapConfig {
    /// Root sitemap URL, or "auto" for `<site_url>/sitemap.xml`.
    #[serde(default = "default_auto")]
    pub url: String,

    /// Global URL budget shared across all child sitemaps.
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            url: default_auto(),
            max_urls: default_max_urls(),
            timeout: default_timeout(),
        }
    }
}

fn default_max_urls() -> usize {
    10_000
}
fn default_timeout() -> u64 {
    30
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// "title", "word_count" or "last_modified".
    #[serde(default = "default_sort_by")]
    pub sort_by: String,

    /// "asc" or "desc".
    #[serde(default = "default_sort_order")]
    pub sort_order: String,

    #[serde(default = "default_true")]
    pub include_stats: bool,

    #[serde(default)]
    pub group_by_type: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sort_by: default_sort_by(),
            sort_order: default_sort_order(),
            include_stats: true,
            group_by_type: false,
        }
    }
}

fn default_sort_by() -> String {
    "last_modified".into()
}
fn default_sort_order() -> String {
    "desc".into()
}

/// `[performance]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Worker pool size for local file scanning.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Pause between consecutive requests to a remote source.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Total attempts per request (1 = no retry).
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base backoff, doubled after every failed attempt.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            request_delay_ms: default_request_delay_ms(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_max_workers() -> usize {
    4
}
fn default_request_delay_ms() -> u64 {
    100
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}

// ---------------------------------------------------------------------------
// Validated config (runtime, built once from AppConfig)
// ---------------------------------------------------------------------------

/// Which extraction strategy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    /// WordPress-style REST API.
    WordPress,
    /// Local Markdown/HTML tree.
    Static,
    /// Remote sitemap graph.
    Sitemap,
}

impl ExtractorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WordPress => "wordpress",
            Self::Static => "static",
            Self::Sitemap => "sitemap",
        }
    }
}

impl std::str::FromStr for ExtractorKind {
    type Err = LlmsTxtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wordpress" => Ok(Self::WordPress),
            "static" => Ok(Self::Static),
            "sitemap" => Ok(Self::Sitemap),
            other => Err(LlmsTxtError::config(format!(
                "unknown extractor '{other}' (expected wordpress, static or sitemap)"
            ))),
        }
    }
}

/// Record ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Title,
    WordCount,
    LastModified,
    /// Kept so the normalizer can report it; order is left untouched.
    Unrecognized(String),
}

impl SortKey {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "title" => Self::Title,
            "word_count" => Self::WordCount,
            "last_modified" => Self::LastModified,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// "desc" (any casing) sorts descending; everything else ascending.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            Self::Descending
        } else {
            Self::Ascending
        }
    }
}

/// RemoteCMS settings.
#[derive(Debug, Clone)]
pub struct WordPressSettings {
    /// Explicit API base; `None` means derive it from the site URL.
    pub api_url: Option<String>,
    pub per_page: u32,
    pub post_types: Vec<String>,
    pub exclude_categories: Vec<String>,
}

/// LocalFileTree settings.
#[derive(Debug, Clone)]
pub struct StaticSettings {
    pub content_directory: PathBuf,
    pub file_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

/// SitemapGraph settings.
#[derive(Debug, Clone)]
pub struct SitemapSettings {
    /// Explicit root sitemap; `None` means `<site_url>/sitemap.xml`.
    pub url: Option<String>,
    pub max_urls: usize,
    pub timeout: Duration,
}

/// Renderer and ranker settings.
#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    pub include_stats: bool,
    pub group_by_type: bool,
}

/// Transport and worker-pool settings.
#[derive(Debug, Clone)]
pub struct PerformanceSettings {
    pub max_workers: usize,
    pub request_delay: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

/// Fully validated configuration for one generation run.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub site_url: Url,
    pub site_name: String,
    pub description: String,
    pub contact_email: String,
    pub extractor: ExtractorKind,
    pub output_path: PathBuf,
    pub site_root: PathBuf,
    pub auto_update_sitemap: bool,
    pub auto_update_robots: bool,
    pub backup_files: bool,
    pub max_items: usize,
    pub min_word_count: u64,
    pub include_drafts: bool,
    pub cache_file: PathBuf,
    pub cache_duration: Duration,
    pub wordpress: WordPressSettings,
    pub static_site: StaticSettings,
    pub sitemap: SitemapSettings,
    pub output: OutputSettings,
    pub performance: PerformanceSettings,
    manifest_file_name: String,
    manifest_url: Url,
}

impl GeneratorConfig {
    /// File name of the manifest (e.g. `llms.txt`).
    pub fn manifest_file_name(&self) -> &str {
        &self.manifest_file_name
    }

    /// Absolute public URL of the manifest.
    pub fn manifest_url(&self) -> &Url {
        &self.manifest_url
    }
}

/// `url` with its path ending in `/`, so relative joins keep the last
/// path segment (`https://example.com/docs` + `llms.txt` stays under `/docs/`).
pub fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

impl TryFrom<&AppConfig> for GeneratorConfig {
    type Error = LlmsTxtError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let site_url = Url::parse(config.site_url.trim()).map_err(|e| {
            LlmsTxtError::config(format!("invalid site_url '{}': {e}", config.site_url))
        })?;
        let site_url = with_trailing_slash(site_url);
        if site_url.scheme() != "http" && site_url.scheme() != "https" {
            return Err(LlmsTxtError::config(format!(
                "site_url must be http(s), got '{}'",
                site_url.scheme()
            )));
        }

        let extractor: ExtractorKind = config.extractor.parse()?;

        let output_path = PathBuf::from(&config.output_path);
        let manifest_file_name = output_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                LlmsTxtError::config(format!(
                    "output_path '{}' has no file name",
                    config.output_path
                ))
            })?;
        let manifest_url = site_url.join(&manifest_file_name).map_err(|e| {
            LlmsTxtError::config(format!("cannot derive manifest URL: {e}"))
        })?;

        if config.max_items == 0 {
            return Err(LlmsTxtError::config("max_items must be at least 1"));
        }
        if config.performance.max_workers == 0 {
            return Err(LlmsTxtError::config("performance.max_workers must be at least 1"));
        }
        if config.performance.retry_attempts == 0 {
            return Err(LlmsTxtError::config(
                "performance.retry_attempts must be at least 1",
            ));
        }

        Ok(Self {
            site_url,
            site_name: config.site_name.clone(),
            description: config.description.clone(),
            contact_email: config.contact_email.clone(),
            extractor,
            output_path,
            site_root: PathBuf::from(&config.site_root),
            auto_update_sitemap: config.auto_update_sitemap,
            auto_update_robots: config.auto_update_robots,
            backup_files: config.backup_files,
            max_items: config.max_items,
            min_word_count: config.min_word_count,
            include_drafts: config.include_drafts,
            cache_file: PathBuf::from(&config.cache_file),
            cache_duration: Duration::from_secs(config.cache_duration),
            wordpress: WordPressSettings {
                api_url: explicit(&config.wordpress.api_url),
                per_page: config.wordpress.per_page.clamp(1, 100),
                post_types: config.wordpress.post_types.clone(),
                exclude_categories: config.wordpress.exclude_categories.clone(),
            },
            static_site: StaticSettings {
                content_directory: PathBuf::from(&config.static_site.content_directory),
                file_patterns: config.static_site.file_patterns.clone(),
                exclude_patterns: config.static_site.exclude_patterns.clone(),
            },
            sitemap: SitemapSettings {
                url: explicit(&config.sitemap.url),
                max_urls: config.sitemap.max_urls,
                timeout: Duration::from_secs(config.sitemap.timeout),
            },
            output: OutputSettings {
                sort_by: SortKey::parse(&config.output.sort_by),
                sort_order: SortOrder::parse(&config.output.sort_order),
                include_stats: config.output.include_stats,
                group_by_type: config.output.group_by_type,
            },
            performance: PerformanceSettings {
                max_workers: config.performance.max_workers,
                request_delay: Duration::from_millis(config.performance.request_delay_ms),
                retry_attempts: config.performance.retry_attempts,
                retry_delay: Duration::from_millis(config.performance.retry_delay_ms),
            },
            manifest_file_name,
            manifest_url,
        })
    }
}

/// `"auto"` (or blank) means "derive it"; anything else is an explicit value.
fn explicit(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the config at `path`. Returns defaults if the file does not exist.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(path)
}

/// Load the config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LlmsTxtError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LlmsTxtError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file at `path`. Refuses to overwrite an existing file.
pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(LlmsTxtError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LlmsTxtError::io(parent, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| LlmsTxtError::config(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| LlmsTxtError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}
