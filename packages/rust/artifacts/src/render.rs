//! Manifest renderer.
//!
//! Output is a pure function of the record list, the configuration and the
//! supplied clock, so equal inputs render byte-identical manifests.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, instrument};

use llmstxt_shared::{
    ContentRecord, GENERATOR_LICENSE, GENERATOR_NAME, GENERATOR_VERSION, GeneratorConfig,
    single_line,
};

/// Horizontal rule closing the header and framing the footer.
pub const RULE: &str = "# ==========================================";

/// Prefix of the first header line.
pub const HEADER_PREFIX: &str = "# LLMs.txt for ";

/// Tags shown per record.
const MAX_TAGS: usize = 10;

/// Render the complete manifest.
#[instrument(skip_all, fields(items = records.len()))]
pub fn render_manifest(
    records: &[ContentRecord],
    config: &GeneratorConfig,
    now: DateTime<Utc>,
) -> String {
    let mut out = render_header(config, now);

    if config.output.include_stats {
        out.push_str(&render_statistics(records, now));
    }

    if config.output.group_by_type {
        out.push_str(&render_grouped(records));
    } else {
        for record in records {
            out.push_str(&render_record(record));
        }
    }

    out.push_str(&render_footer(records.len(), now));

    debug!(bytes = out.len(), "manifest rendered");
    out
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ---------------------------------------------------------------------------
// Header / footer
// ---------------------------------------------------------------------------

fn render_header(config: &GeneratorConfig, now: DateTime<Utc>) -> String {
    let contact = if config.contact_email.trim().is_empty() {
        "N/A"
    } else {
        config.contact_email.as_str()
    };

    let mut out = String::new();
    out.push_str(&format!("{HEADER_PREFIX}{}\n", config.site_name));
    out.push_str("#\n");
    out.push_str(&format!("# Generated on: {}\n", timestamp(now)));
    out.push_str(&format!("# Generator: {GENERATOR_NAME} v{GENERATOR_VERSION}\n"));
    out.push_str(&format!("# Author: {contact}\n"));
    out.push_str(&format!("# Website: {}\n", config.site_url));
    out.push_str(&format!("# Description: {}\n", config.description));
    out.push_str("#\n");
    out.push_str("# This file provides structured information about our website's content\n");
    out.push_str("# for Large Language Models (LLMs) and AI systems.\n");
    out.push_str("#\n");
    out.push_str("# Learn more about LLMs.txt: https://llmstxt.org/\n");
    out.push_str("#\n");
    out.push_str(RULE);
    out.push_str("\n\n");
    out
}

fn render_footer(total: usize, now: DateTime<Utc>) -> String {
    let mut out = String::from("\n");
    out.push_str(RULE);
    out.push_str("\n# End of LLMs.txt\n");
    out.push_str(RULE);
    out.push_str("\n#\n");
    out.push_str(&format!("# Generated by: {GENERATOR_NAME} v{GENERATOR_VERSION}\n"));
    out.push_str(&format!("# License: {GENERATOR_LICENSE}\n"));
    out.push_str("#\n");
    out.push_str(&format!("# Total content items: {total}\n"));
    out.push_str(&format!("# Generated on: {}\n", timestamp(now)));
    out.push_str("#\n");
    out.push_str("# This file follows the LLMs.txt specification\n");
    out.push_str("# Learn more: https://llmstxt.org/\n");
    out.push_str("#\n");
    out.push_str(RULE);
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

fn render_statistics(records: &[ContentRecord], now: DateTime<Utc>) -> String {
    let total_items = records.len();
    let total_words: u64 = records.iter().filter_map(ContentRecord::word_count).sum();
    let average = match total_items {
        0 => 0,
        n => total_words / n as u64,
    };

    let types = counts_in_order(records.iter().map(|r| r.content_type().as_str()));
    let languages = counts_in_order(records.iter().map(|r| r.language().unwrap_or("unknown")));

    let mut out = String::from("# Statistics\n");
    out.push_str(&format!("# Total items: {total_items}\n"));
    out.push_str(&format!("# Total words: {}\n", group_thousands(total_words)));
    out.push_str(&format!("# Average words per item: {average}\n"));
    out.push_str(&format!("# Content types: {types}\n"));
    out.push_str(&format!("# Languages: {languages}\n"));
    out.push_str(&format!(
        "# Last updated: {}\n\n",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out
}

/// `a(2), b(1)` with keys in first-seen order.
fn counts_in_order<'a>(keys: impl Iterator<Item = &'a str>) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for key in keys {
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key, 1)),
        }
    }
    counts
        .iter()
        .map(|(k, n)| format!("{k}({n})"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `12345` -> `12,345`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

fn render_grouped(records: &[ContentRecord]) -> String {
    let mut groups: Vec<(&str, Vec<&ContentRecord>)> = Vec::new();
    for record in records {
        let kind = record.content_type().as_str();
        match groups.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, members)) => members.push(record),
            None => groups.push((kind, vec![record])),
        }
    }

    let mut out = String::new();
    for (kind, members) in groups {
        out.push_str(&format!(
            "\n# ========== {} ({} items) ==========\n\n",
            kind.to_uppercase(),
            members.len()
        ));
        for record in members {
            out.push_str(&render_record(record));
        }
    }
    out
}

/// One record block, terminated by a blank line.
pub fn render_record(record: &ContentRecord) -> String {
    let mut lines = vec![
        format!("# {}", record.title()),
        format!("URL: {}", record.url()),
        format!("Type: {}", record.content_type()),
    ];

    // Length is capped by `ContentRecord::with_description`.
    if let Some(description) = record.description() {
        let clean = single_line(&llmstxt_text::strip_tags(description));
        if !clean.is_empty() {
            lines.push(format!("Description: {clean}"));
        }
    }
    if let Some(modified) = record.last_modified() {
        lines.push(format!("Last Modified: {modified}"));
    }
    if let Some(author) = record.author() {
        lines.push(format!("Author: {author}"));
    }
    if let Some(language) = record.language() {
        lines.push(format!("Language: {language}"));
    }
    if !record.tags().is_empty() {
        let shown: Vec<&str> = record
            .tags()
            .iter()
            .take(MAX_TAGS)
            .map(String::as_str)
            .collect();
        lines.push(format!("Tags: {}", shown.join(", ")));
    }
    if let Some(words) = record.word_count().filter(|n| *n > 0) {
        lines.push(format!("Word Count: {words}"));
    }
    if let Some(minutes) = record.reading_time() {
        lines.push(format!("Reading Time: {minutes} minutes"));
    }

    let mut block = lines.join("\n");
    block.push_str("\n\n");
    block
}
