//! Manifest parser and validator.
//!
//! Reads a generated `llms.txt` back into entries:
//! - Header: comment lines up to the first rule line
//! - Optional `# Statistics` block
//! - Optional group headers: `# ========== TYPE (n items) ==========`
//! - Entries: `# Title` followed by `Key: value` field lines
//! - Footer: everything after the closing rule line

use std::sync::LazyLock;

use regex::Regex;

use crate::render::{HEADER_PREFIX, RULE};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A parsed manifest.
#[derive(Debug, Clone, Default)]
pub struct ParsedManifest {
    /// Site name from the `# LLMs.txt for` header line.
    pub site_name: Option<String>,
    /// Entries in file order.
    pub entries: Vec<ManifestEntry>,
}

/// One `# Title` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub title: String,
    /// `(key, value)` field lines in file order.
    pub fields: Vec<(String, String)>,
}

impl ManifestEntry {
    /// First value for `key`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn url(&self) -> Option<&str> {
        self.field("URL")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.field("Type")
    }
}

/// Result of validating a manifest.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub entries: usize,
    pub issues: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `# ========== TYPE (n items) ==========`.
static GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^# =+ .+ \(\d+ items\) =+$").expect("group regex"));

/// Matches `Key: value`.
static FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][A-Za-z ]*):\s?(.*)$").expect("field regex"));

/// Lines the header check inspects.
const HEADER_WINDOW: usize = 10;

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse manifest text into entries. Never fails; unknown lines are ignored.
pub fn parse_manifest(content: &str) -> ParsedManifest {
    let lines: Vec<&str> = content.lines().collect();

    let site_name = lines
        .iter()
        .take(HEADER_WINDOW)
        .find_map(|l| l.strip_prefix(HEADER_PREFIX))
        .map(|name| name.trim().to_string());

    // Body runs from the line after the header rule to the footer rule.
    let body_start = lines
        .iter()
        .position(|l| l.trim_end() == RULE)
        .map_or(0, |i| i + 1);
    let body_end = lines[body_start..]
        .iter()
        .position(|l| l.trim_end() == RULE)
        .map_or(lines.len(), |i| body_start + i);

    let mut entries = Vec::new();
    let mut current: Option<ManifestEntry> = None;
    let mut in_stats = false;

    for (idx, raw) in lines[body_start..body_end].iter().enumerate() {
        let line = raw.trim_end();

        if line.is_empty() {
            in_stats = false;
            continue;
        }
        if in_stats {
            continue;
        }

        if line == "# Statistics"
            && lines
                .get(body_start + idx + 1)
                .is_some_and(|next| next.starts_with("# Total items:"))
        {
            in_stats = true;
            continue;
        }

        if GROUP_RE.is_match(line) || line.starts_with(HEADER_PREFIX) {
            continue;
        }

        if let Some(title) = line.strip_prefix("# ") {
            if let Some(done) = current.take() {
                entries.push(done);
            }
            current = Some(ManifestEntry {
                title: title.trim().to_string(),
                fields: Vec::new(),
            });
            continue;
        }

        if let (Some(entry), Some(caps)) = (current.as_mut(), FIELD_RE.captures(line)) {
            push_field(entry, &caps[1], &caps[2]);
        }
    }

    if let Some(done) = current.take() {
        entries.push(done);
    }

    ParsedManifest { site_name, entries }
}

fn push_field(entry: &mut ManifestEntry, key: &str, value: &str) {
    entry
        .fields
        .push((key.trim().to_string(), value.trim().to_string()));
}

/// Check a manifest for structural problems.
pub fn validate_manifest(content: &str) -> ValidationReport {
    let parsed = parse_manifest(content);
    let mut issues = Vec::new();

    if parsed.site_name.is_none() {
        issues.push(format!(
            "missing '{}' header in the first {HEADER_WINDOW} lines",
            HEADER_PREFIX.trim_end()
        ));
    }
    if parsed.entries.is_empty() {
        issues.push("no content items found".to_string());
    }
    for entry in &parsed.entries {
        if entry.url().is_none() {
            issues.push(format!("entry '{}' has no URL", entry.title));
        }
        if entry.content_type().is_none() {
            issues.push(format!("entry '{}' has no Type", entry.title));
        }
    }

    ValidationReport {
        entries: parsed.entries.len(),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_manifest;
    use chrono::{TimeZone, Utc};
    use llmstxt_shared::{AppConfig, ContentRecord, ContentType, GeneratorConfig};

    fn fixture(name: &str) -> String {
        let path = format!("../../../fixtures/manifests/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn parses_rendered_manifest() {
        let mut app = AppConfig::default();
        app.output.group_by_type = true;
        let config = GeneratorConfig::try_from(&app).unwrap();
        let records = vec![
            ContentRecord::new("Statistics", "https://example.com/stats", ContentType::Page)
                .unwrap(),
            ContentRecord::new("Hello World", "https://example.com/hello.html", ContentType::Article)
                .unwrap()
                .with_word_count(Some(120))
                .with_tags(vec!["rust".into()]),
        ];
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let text = render_manifest(&records, &config, now);

        let parsed = parse_manifest(&text);
        assert_eq!(parsed.site_name.as_deref(), Some("My Website"));
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].title, "Statistics");
        assert_eq!(parsed.entries[1].url(), Some("https://example.com/hello.html"));
        assert_eq!(parsed.entries[1].field("Reading Time"), Some("1 minutes"));
        assert_eq!(parsed.entries[1].field("Tags"), Some("rust"));

        let report = validate_manifest(&text);
        assert!(report.is_valid(), "{:?}", report.issues);
        assert_eq!(report.entries, 2);
    }

    #[test]
    fn valid_fixture() {
        let report = validate_manifest(&fixture("valid.txt"));
        assert!(report.is_valid(), "{:?}", report.issues);
        assert_eq!(report.entries, 3);
    }

    #[test]
    fn broken_fixture_reports_issues() {
        let report = validate_manifest(&fixture("broken.txt"));
        assert!(!report.is_valid());
        assert!(report.issues.iter().any(|i| i.contains("header")));
        assert!(report.issues.iter().any(|i| i.contains("'Orphan' has no URL")));
        assert!(report.issues.iter().any(|i| i.contains("'Untyped' has no Type")));
    }

    #[test]
    fn empty_manifest() {
        let report = validate_manifest("");
        assert_eq!(report.entries, 0);
        assert_eq!(report.issues.len(), 2);
    }
}
