//! Local content tree strategy (Markdown and HTML files on disk).
//!
//! Files are enumerated up front, then a fixed pool of workers drains a
//! shared queue, each worker turning one file into at most one record.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use llmstxt_shared::{
    ContentRecord, ContentType, GeneratorConfig, LlmsTxtError, Result, with_trailing_slash,
};
use llmstxt_text::{
    detect_language, first_heading, first_sentence, html_to_text, split_front_matter,
    strip_markdown_links, title_from_stem, word_count,
};

use crate::Extraction;

/// Extensions rewritten to `.html` when building a file's public URL.
const MARKDOWN_EXTENSIONS: &[&str] = &[".md", ".markdown", ".mdx"];

/// Everything a worker needs to process one file.
struct FileContext {
    root: PathBuf,
    site_url: Url,
    exclude: GlobSet,
    min_word_count: u64,
}

pub(super) fn validate(config: &GeneratorConfig) -> Result<()> {
    let dir = &config.static_site.content_directory;
    let meta = std::fs::metadata(dir).map_err(|e| LlmsTxtError::io(dir, e))?;
    if !meta.is_dir() {
        return Err(LlmsTxtError::config(format!(
            "static.content_directory {} is not a directory",
            dir.display()
        )));
    }
    include_set(&config.static_site.file_patterns)?;
    exclude_set(&config.static_site.exclude_patterns)?;
    Ok(())
}

#[instrument(skip_all, fields(root = %config.static_site.content_directory.display()))]
pub(super) async fn extract(config: &GeneratorConfig) -> Result<Extraction> {
    let settings = &config.static_site;
    let include = include_set(&settings.file_patterns)?;
    let root = settings.content_directory.clone();

    let walk_root = root.clone();
    let (files, walk_skips) = tokio::task::spawn_blocking(move || collect_files(&walk_root, &include))
        .await
        .map_err(|e| LlmsTxtError::io(&root, std::io::Error::other(e)))?;
    info!(files = files.len(), "found content files");

    let context = Arc::new(FileContext {
        root,
        site_url: config.site_url.clone(),
        exclude: exclude_set(&settings.exclude_patterns)?,
        min_word_count: config.min_word_count,
    });
    let queue = Arc::new(Mutex::new(VecDeque::from(files)));
    let results = Arc::new(Mutex::new(walk_skips));

    let workers = config.performance.max_workers.max(1);
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let context = Arc::clone(&context);
        let queue = Arc::clone(&queue);
        let results = Arc::clone(&results);
        handles.push(tokio::spawn(async move {
            loop {
                let Some(path) = queue.lock().await.pop_front() else {
                    break;
                };
                let unit = path.display().to_string();
                match process_file(&context, &path).await {
                    Ok(Some(record)) => results.lock().await.push(record),
                    Ok(None) => {}
                    Err(e) => results.lock().await.skip(unit, e),
                }
            }
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "content worker failed");
        }
    }

    let mut extraction = std::mem::take(&mut *results.lock().await);
    // Workers finish in arbitrary order.
    extraction.records.sort_by(|a, b| a.url().cmp(b.url()));
    Ok(extraction)
}

// ---------------------------------------------------------------------------
// Enumeration
// ---------------------------------------------------------------------------

/// `*` crosses directory separators, as in a recursive glob.
fn include_set(patterns: &[String]) -> Result<GlobSet> {
    build_set(patterns, false)
}

/// Exclusions match per path segment and are tried against every trailing
/// sub-path of a file's relative path.
fn exclude_set(patterns: &[String]) -> Result<GlobSet> {
    build_set(patterns, true)
}

fn build_set(patterns: &[String], literal_separator: bool) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(literal_separator)
            .build()
            .map_err(|e| LlmsTxtError::config(format!("invalid glob '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| LlmsTxtError::config(format!("invalid glob set: {e}")))
}

/// Recursively list files under `root` that match `include`, sorted.
/// Unreadable directories become skipped units.
fn collect_files(root: &Path, include: &GlobSet) -> (Vec<PathBuf>, Extraction) {
    let mut files = Vec::new();
    let mut skips = Extraction::default();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                skips.skip(dir.display().to_string(), LlmsTxtError::io(&dir, e));
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                let rel = relative_path(root, &path);
                let name = entry.file_name().to_string_lossy().into_owned();
                if include.is_match(&rel) || include.is_match(&name) {
                    files.push(path);
                }
            }
        }
    }

    files.sort();
    (files, skips)
}

/// `path` relative to `root`, `/`-separated.
fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_excluded(exclude: &GlobSet, rel: &str) -> bool {
    if exclude.is_empty() {
        return false;
    }
    let mut tail = rel;
    loop {
        if exclude.is_match(tail) {
            return true;
        }
        match tail.split_once('/') {
            Some((_, rest)) => tail = rest,
            None => return false,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-file transform
// ---------------------------------------------------------------------------

/// Public URL for a content file: Markdown extensions become `.html` and the
/// path is resolved against `site_url`.
pub fn url_for_relative_path(site_url: &Url, rel: &str) -> Result<Url> {
    let lowered = rel.to_ascii_lowercase();
    let url_path = MARKDOWN_EXTENSIONS
        .iter()
        .find(|ext| lowered.ends_with(*ext))
        .map_or_else(
            || rel.to_string(),
            |ext| format!("{}.html", &rel[..rel.len() - ext.len()]),
        );
    with_trailing_slash(site_url.clone())
        .join(&url_path)
        .map_err(|e| LlmsTxtError::validation(format!("cannot build URL for '{rel}': {e}")))
}

/// `Ok(None)` means the file was deliberately left out (excluded pattern).
async fn process_file(context: &FileContext, path: &Path) -> Result<Option<ContentRecord>> {
    let rel = relative_path(&context.root, path);
    if is_excluded(&context.exclude, &rel) {
        debug!(file = %rel, "excluded");
        return Ok(None);
    }

    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LlmsTxtError::io(path, e))?;
    let (front, body) = split_front_matter(&raw)?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = front
        .title
        .or_else(|| first_heading(body))
        .unwrap_or_else(|| title_from_stem(&stem));

    let is_html = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));
    let text = if is_html {
        html_to_text(body)
    } else {
        body.to_string()
    };
    let clean = strip_markdown_links(&text);
    let words = word_count(&clean);
    if words < context.min_word_count {
        return Err(LlmsTxtError::validation(format!(
            "below minimum word count ({words} < {})",
            context.min_word_count
        )));
    }

    let url = url_for_relative_path(&context.site_url, &rel)?;
    let content_type = front
        .content_type
        .as_deref()
        .map_or(ContentType::Article, ContentType::from);
    let description = front.description.or_else(|| first_sentence(&clean));
    let language = front.language.or_else(|| detect_language(&clean));
    let last_modified = tokio::fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .ok()
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Secs, true));

    let record = ContentRecord::new(title, url.as_str(), content_type)?
        .with_description(description)
        .with_last_modified(last_modified)
        .with_tags(front.tags)
        .with_author(front.author)
        .with_word_count(Some(words))
        .with_language(language);
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmstxt_shared::AppConfig;
    use tempfile::TempDir;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ")
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn config_for(dir: &TempDir, min_word_count: u64) -> GeneratorConfig {
        let mut app = AppConfig::default();
        app.extractor = "static".into();
        app.site_url = "https://example.com/".into();
        app.min_word_count = min_word_count;
        app.static_site.content_directory = dir.path().display().to_string();
        GeneratorConfig::try_from(&app).unwrap()
    }

    #[test]
    fn markdown_urls_become_html() {
        let base = Url::parse("https://example.com/").unwrap();
        assert_eq!(
            url_for_relative_path(&base, "blog/post.md").unwrap().as_str(),
            "https://example.com/blog/post.html"
        );
        assert_eq!(
            url_for_relative_path(&base, "notes.MDX").unwrap().as_str(),
            "https://example.com/notes.html"
        );
        assert_eq!(
            url_for_relative_path(&base, "about.html").unwrap().as_str(),
            "https://example.com/about.html"
        );
    }

    #[test]
    fn urls_keep_site_path_prefix() {
        let base = Url::parse("https://example.com/docs").unwrap();
        assert_eq!(
            url_for_relative_path(&base, "guide/intro.md").unwrap().as_str(),
            "https://example.com/docs/guide/intro.html"
        );
    }

    #[test]
    fn exclusion_is_right_anchored() {
        let set = exclude_set(&["admin/*".to_string(), "*.tmp".to_string()]).unwrap();
        assert!(is_excluded(&set, "admin/index.md"));
        assert!(is_excluded(&set, "site/admin/index.md"));
        assert!(!is_excluded(&set, "admin/deep/index.md"));
        assert!(is_excluded(&set, "notes/scratch.tmp"));
        assert!(!is_excluded(&set, "blog/post.md"));
    }

    #[test]
    fn validate_checks_directory_and_globs() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir, 0);
        assert!(validate(&config).is_ok());

        let mut app = AppConfig::default();
        app.static_site.content_directory = dir.path().join("missing").display().to_string();
        assert!(validate(&GeneratorConfig::try_from(&app).unwrap()).is_err());

        let mut app = AppConfig::default();
        app.static_site.content_directory = dir.path().display().to_string();
        app.static_site.exclude_patterns = vec!["[broken".into()];
        assert!(validate(&GeneratorConfig::try_from(&app).unwrap()).is_err());
    }

    #[tokio::test]
    async fn short_file_dropped_long_file_kept() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "short.md", &words(20));
        write(
            dir.path(),
            "hello.md",
            &format!("---\ntitle: Hello World\ntags: [rust, web]\n---\n{}\n", words(120)),
        );

        let extraction = extract(&config_for(&dir, 50)).await.unwrap();
        assert_eq!(extraction.records.len(), 1);
        let record = &extraction.records[0];
        assert_eq!(record.title(), "Hello World");
        assert_eq!(record.url(), "https://example.com/hello.html");
        assert_eq!(record.word_count(), Some(120));
        assert_eq!(record.reading_time(), Some(1));
        assert_eq!(record.tags(), ["rust".to_string(), "web".to_string()]);
        assert_eq!(record.content_type(), &ContentType::Article);
        assert!(record.last_modified().unwrap().ends_with('Z'));

        assert_eq!(extraction.skipped.len(), 1);
        assert!(extraction.skipped[0].unit.ends_with("short.md"));
    }

    #[tokio::test]
    async fn title_falls_back_to_heading_then_stem() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "my-post-name.md", "Plain text without any heading here.");
        write(dir.path(), "guide.md", "# The Guide\n\nRead [this](x.md) first.");

        let extraction = extract(&config_for(&dir, 1)).await.unwrap();
        let titles: Vec<&str> = extraction.records.iter().map(|r| r.title()).collect();
        assert_eq!(titles, ["The Guide", "My Post Name"]);

        let guide = &extraction.records[0];
        assert_eq!(guide.word_count(), Some(5));
        assert_eq!(guide.description(), Some("# The Guide Read first"));
        let post = &extraction.records[1];
        assert_eq!(post.description(), Some("Plain text without any heading here"));
        assert_eq!(post.language(), None);
    }

    #[tokio::test]
    async fn block_scalar_front_matter_is_one_line() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "notes.md",
            "---\ntitle: >\n  Release\n  Notes\ndescription: |\n  First line\n\n  # Not a heading\n---\nbody words here",
        );

        let extraction = extract(&config_for(&dir, 1)).await.unwrap();
        let record = &extraction.records[0];
        assert_eq!(record.title(), "Release Notes");
        assert_eq!(record.description(), Some("First line # Not a heading"));
    }

    #[tokio::test]
    async fn html_and_nested_files() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "docs/setup_notes.html",
            "<html><body><p>Install the tool and run it.</p><script>ignored()</script></body></html>",
        );
        write(dir.path(), "docs/image.png", "not content");

        let extraction = extract(&config_for(&dir, 1)).await.unwrap();
        assert_eq!(extraction.records.len(), 1);
        let record = &extraction.records[0];
        assert_eq!(record.title(), "Setup Notes");
        assert_eq!(record.url(), "https://example.com/docs/setup_notes.html");
        assert_eq!(record.word_count(), Some(6));
        assert_eq!(record.language(), Some("en"));
    }

    #[tokio::test]
    async fn excluded_and_malformed_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "private/secret.md", &words(10));
        write(dir.path(), "draft/wip.md", &words(10));
        write(dir.path(), "broken.md", "---\n- just\n- a list\n---\nbody text");
        write(
            dir.path(),
            "typed.md",
            "---\ntype: tutorial\ndescription: Custom text\nlang: fr\n---\nun deux trois",
        );

        let extraction = extract(&config_for(&dir, 1)).await.unwrap();
        assert_eq!(extraction.records.len(), 1);
        let record = &extraction.records[0];
        assert_eq!(record.content_type(), &ContentType::Other("tutorial".into()));
        assert_eq!(record.description(), Some("Custom text"));
        assert_eq!(record.language(), Some("fr"));

        // Excluded files are dropped silently; bad front matter is reported.
        assert_eq!(extraction.skipped.len(), 1);
        assert!(extraction.skipped[0].unit.ends_with("broken.md"));
    }
}
