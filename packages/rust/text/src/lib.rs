//! Text utilities shared by the extraction strategies.
//!
//! HTML-to-plain-text conversion, Markdown link/image stripping, YAML front
//! matter splitting, a coarse language heuristic, and the title casing rules
//! used to derive titles from file names and URL slugs.

mod frontmatter;
mod language;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node};

pub use frontmatter::{FrontMatter, split_front_matter};
pub use language::detect_language;

/// Characters kept when a first sentence becomes a description.
pub const SENTENCE_LIMIT: usize = 200;

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

/// Convert an HTML fragment or document to whitespace-collapsed plain text.
///
/// `<script>` and `<style>` contents are dropped. Every line is trimmed, runs
/// of two or more spaces split phrases, and the surviving phrases are joined
/// with single spaces.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let doc = Html::parse_fragment(html);
    let mut raw = String::new();
    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let skipped = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| matches!(el.name(), "script" | "style"))
        });
        if !skipped {
            raw.push_str(text);
        }
    }

    collapse_phrases(&raw)
}

/// Regex fallback: remove anything that looks like a tag.
pub fn strip_tags(text: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

    TAG_RE.replace_all(text, "").trim().to_string()
}

fn collapse_phrases(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

/// Remove Markdown images and links entirely (label included).
pub fn strip_markdown_links(md: &str) -> String {
    static IMAGE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"!\[.*?\]\(.*?\)").expect("valid regex"));
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[.*?\]\(.*?\)").expect("valid regex"));

    let without_images = IMAGE_RE.replace_all(md, "");
    LINK_RE.replace_all(&without_images, "").into_owned()
}

/// Text of the first `# ` heading, if any.
pub fn first_heading(md: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("valid regex"));

    H1_RE
        .captures(md)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
}

/// First sentence of `text` on one line, cut to [`SENTENCE_LIMIT`]
/// characters with `...` when shortened. Sentences end at runs of `.`, `!`
/// or `?`.
pub fn first_sentence(text: &str) -> Option<String> {
    static SENTENCE_END_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid regex"));

    let sentence = llmstxt_shared::single_line(SENTENCE_END_RE.split(text).next()?);
    if sentence.is_empty() {
        return None;
    }
    Some(llmstxt_shared::truncate_with_ellipsis(
        &sentence,
        SENTENCE_LIMIT,
    ))
}

/// Whitespace-separated token count.
pub fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

// ---------------------------------------------------------------------------
// Casing
// ---------------------------------------------------------------------------

/// Title-case `text`: a letter following a letter is lowered, any other
/// letter is raised. `my post name` becomes `My Post Name`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Upper-case the first character and lower-case the rest.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Title from a file stem: `-` and `_` become spaces, then [`title_case`].
pub fn title_from_stem(stem: &str) -> String {
    title_case(&stem.replace(['-', '_'], " ")).trim().to_string()
}
