//! Filtering, ordering and truncation of extracted records.

use std::cmp::Ordering;

use tracing::{debug, warn};

use llmstxt_shared::{ContentRecord, GeneratorConfig, SortKey, SortOrder};

const DRAFT_MARKER: &str = "draft";

/// Apply the configured quality filters, sort, and cap to `records`.
///
/// Steps, in order:
/// 1. drop records whose word count is known and below `min_word_count`
/// 2. drop drafts (tag `draft`, or `draft` anywhere in the title) unless
///    `include_drafts` is set
/// 3. stable sort by `output.sort_by` / `output.sort_order`
/// 4. keep the first `max_items`
pub fn normalize(records: Vec<ContentRecord>, config: &GeneratorConfig) -> Vec<ContentRecord> {
    let before = records.len();

    let mut kept: Vec<ContentRecord> = records
        .into_iter()
        .filter(|r| r.word_count().is_none_or(|n| n >= config.min_word_count))
        .filter(|r| config.include_drafts || !is_draft(r))
        .collect();

    sort_records(&mut kept, &config.output.sort_by, config.output.sort_order);
    kept.truncate(config.max_items);

    debug!(before, after = kept.len(), "normalized records");
    kept
}

fn is_draft(record: &ContentRecord) -> bool {
    record
        .tags()
        .iter()
        .any(|t| t.eq_ignore_ascii_case(DRAFT_MARKER))
        || record.title().to_lowercase().contains(DRAFT_MARKER)
}

fn sort_records(records: &mut [ContentRecord], key: &SortKey, order: SortOrder) {
    let compare: fn(&ContentRecord, &ContentRecord) -> Ordering = match key {
        SortKey::Title => |a, b| a.title().to_lowercase().cmp(&b.title().to_lowercase()),
        SortKey::WordCount => |a, b| {
            a.word_count()
                .unwrap_or(0)
                .cmp(&b.word_count().unwrap_or(0))
        },
        SortKey::LastModified => |a, b| {
            a.last_modified()
                .unwrap_or_default()
                .cmp(b.last_modified().unwrap_or_default())
        },
        SortKey::Unrecognized(name) => {
            warn!(sort_by = %name, "unrecognized sort key, keeping extraction order");
            return;
        }
    };

    match order {
        SortOrder::Ascending => records.sort_by(compare),
        SortOrder::Descending => records.sort_by(|a, b| compare(b, a)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmstxt_shared::{AppConfig, ContentType};

    fn record(title: &str, words: Option<u64>, modified: Option<&str>) -> ContentRecord {
        ContentRecord::new(title, format!("https://example.com/{title}"), ContentType::Page)
            .unwrap()
            .with_word_count(words)
            .with_last_modified(modified.map(str::to_string))
    }

    fn config(edit: impl FnOnce(&mut AppConfig)) -> GeneratorConfig {
        let mut app = AppConfig::default();
        app.min_word_count = 10;
        edit(&mut app);
        GeneratorConfig::try_from(&app).unwrap()
    }

    fn titles(records: &[ContentRecord]) -> Vec<&str> {
        records.iter().map(|r| r.title()).collect()
    }

    #[test]
    fn short_records_dropped_unknown_counts_kept() {
        let out = normalize(
            vec![
                record("short", Some(9), None),
                record("exact", Some(10), None),
                record("unknown", None, None),
            ],
            &config(|_| {}),
        );
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.title() != "short"));
    }

    #[test]
    fn drafts_dropped_in_any_casing() {
        let tagged = record("Notes", Some(20), None).with_tags(vec!["DRAFT".into()]);
        let records = vec![
            record("My Draft post", Some(20), None),
            record("REDRAFTED", Some(20), None),
            record("dRaFt", Some(20), None),
            tagged,
            record("Published", Some(20), None),
        ];

        let out = normalize(records.clone(), &config(|_| {}));
        assert_eq!(titles(&out), ["Published"]);

        let out = normalize(records, &config(|app| app.include_drafts = true));
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn sorts_by_each_key() {
        let records = vec![
            record("beta", Some(30), Some("2024-02-01")),
            record("Alpha", None, None),
            record("gamma", Some(20), Some("2024-03-01")),
        ];

        let by = |key: &str, order: &str| {
            let out = normalize(
                records.clone(),
                &config(|app| {
                    app.min_word_count = 0;
                    app.output.sort_by = key.into();
                    app.output.sort_order = order.into();
                }),
            );
            titles(&out).into_iter().map(str::to_string).collect::<Vec<_>>()
        };

        assert_eq!(by("title", "asc"), ["Alpha", "beta", "gamma"]);
        assert_eq!(by("title", "DESC"), ["gamma", "beta", "Alpha"]);
        assert_eq!(by("word_count", "asc"), ["Alpha", "gamma", "beta"]);
        assert_eq!(by("last_modified", "desc"), ["gamma", "beta", "Alpha"]);
        assert_eq!(by("popularity", "desc"), ["beta", "Alpha", "gamma"]);
    }

    #[test]
    fn descending_sort_is_stable() {
        let records = vec![
            record("first", Some(20), Some("2024-01-01")),
            record("second", Some(20), Some("2024-01-01")),
            record("newest", Some(20), Some("2024-09-01")),
        ];
        let out = normalize(records, &config(|_| {}));
        assert_eq!(titles(&out), ["newest", "first", "second"]);
    }

    #[test]
    fn truncates_to_max_items() {
        let records = (0..5)
            .map(|i| record(&format!("item{i}"), Some(100), None))
            .collect();
        let out = normalize(records, &config(|app| app.max_items = 3));
        assert_eq!(out.len(), 3);
    }
}
