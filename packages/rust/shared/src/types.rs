//! Core domain types: the uniform content record and the persisted cache entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{LlmsTxtError, Result};

/// Generator identity written into manifests, cache entries and robots comments.
pub const GENERATOR_NAME: &str = "llmstxt";

/// Generator version (the workspace version).
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// License advertised in the manifest footer.
pub const GENERATOR_LICENSE: &str = "MIT";

/// Reading speed used to derive `reading_time`.
pub const WORDS_PER_MINUTE: f64 = 250.0;

/// Maximum description length (in characters) before the ellipsis marker.
pub const DESCRIPTION_LIMIT: usize = 300;

// ---------------------------------------------------------------------------
// ContentType
// ---------------------------------------------------------------------------

/// Kind of content a record describes.
///
/// Sources may supply their own tag (e.g. a `type:` front matter key), which
/// is carried verbatim in [`ContentType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentType {
    Article,
    Page,
    Documentation,
    Other(String),
}

impl ContentType {
    /// The lower-case label used in the manifest and in statistics.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Article => "article",
            Self::Page => "page",
            Self::Documentation => "documentation",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for ContentType {
    fn from(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "article" => Self::Article,
            "page" => Self::Page,
            "documentation" => Self::Documentation,
            _ => Self::Other(trimmed.to_string()),
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ContentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ContentRecord
// ---------------------------------------------------------------------------

/// One normalized unit of extracted content metadata.
///
/// Records are built by the extraction strategies and are immutable
/// afterwards. `reading_time` is derived from `word_count` and cannot be set
/// directly, so it is present exactly when the word count is positive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRecord {
    title: String,
    url: String,
    content_type: ContentType,
    description: Option<String>,
    last_modified: Option<String>,
    tags: Vec<String>,
    word_count: Option<u64>,
    author: Option<String>,
    language: Option<String>,
    reading_time: Option<u64>,
}

impl ContentRecord {
    /// Start a record. Fails when the title is empty or whitespace-only.
    ///
    /// Text fields are kept on one line: every whitespace run, newlines
    /// included, becomes a single space.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content_type: ContentType,
    ) -> Result<Self> {
        let title = single_line(&title.into());
        if title.is_empty() {
            return Err(LlmsTxtError::validation("record title is empty"));
        }

        Ok(Self {
            title,
            url: url.into(),
            content_type,
            description: None,
            last_modified: None,
            tags: Vec::new(),
            word_count: None,
            author: None,
            language: None,
            reading_time: None,
        })
    }

    /// Set the description, truncated to [`DESCRIPTION_LIMIT`] characters.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = non_blank(description)
            .map(|d| truncate_with_ellipsis(&d, DESCRIPTION_LIMIT));
        self
    }

    pub fn with_last_modified(mut self, last_modified: Option<String>) -> Self {
        self.last_modified = non_blank(last_modified);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags
            .into_iter()
            .map(|t| single_line(&t))
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// Set the word count and derive the reading time from it.
    pub fn with_word_count(mut self, word_count: Option<u64>) -> Self {
        self.word_count = word_count;
        self.reading_time = word_count.and_then(reading_time_for);
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = non_blank(author);
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = non_blank(language);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn word_count(&self) -> Option<u64> {
        self.word_count
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn reading_time(&self) -> Option<u64> {
        self.reading_time
    }
}

/// Minutes of reading for `word_count` words; `None` for zero words.
///
/// Halves round to even, so 625 words read in 2 minutes and 875 in 4.
fn reading_time_for(word_count: u64) -> Option<u64> {
    if word_count == 0 {
        return None;
    }
    let minutes = (word_count as f64 / WORDS_PER_MINUTE).round_ties_even() as u64;
    Some(minutes.max(1))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| single_line(&v)).filter(|v| !v.is_empty())
}

/// Collapse every whitespace run in `text` into one space and trim the ends.
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `text` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// CacheEntry
// ---------------------------------------------------------------------------

/// Persisted change-detection state (the cache file's JSON object).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// SHA-256 of the canonical record serialization.
    pub content_hash: String,
    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
    /// Generator version that wrote the entry.
    pub generator_version: String,
    /// Number of records in the manifest.
    #[serde(default)]
    pub item_count: usize,
    /// Wall-clock seconds the generating run took.
    #[serde(default)]
    pub generation_time: f64,
    /// Name of the strategy that produced the records.
    #[serde(default)]
    pub extractor_used: String,
}
