//! End-to-end `generate` pipeline:
//! validate → extract → normalize → hash/compare → render → write → siblings → cache.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use llmstxt_artifacts::render_manifest;
use llmstxt_discovery::{PatchOutcome, SiblingUpdater};
use llmstxt_extract::{SkippedUnit, Strategy};
use llmstxt_shared::{
    CacheEntry, ContentRecord, GENERATOR_VERSION, GeneratorConfig, Result, write_atomic,
};

use crate::cache::{ChangeCache, content_hash};
use crate::normalize::normalize;

/// What a `generate` run did.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// A new manifest was written.
    Generated {
        path: PathBuf,
        items: usize,
        skipped: usize,
        content_hash: String,
        siblings: Vec<PatchOutcome>,
        elapsed: Duration,
    },
    /// The records hash to the cached value; nothing was written.
    Unchanged { items: usize, content_hash: String },
    /// Nothing survived extraction and normalization; nothing was written.
    NoContent { skipped: usize },
}

/// Extracted and normalized records, without any writes.
#[derive(Debug, Clone)]
pub struct Preview {
    pub records: Vec<ContentRecord>,
    pub skipped: Vec<SkippedUnit>,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the run has an outcome.
    fn done(&self, outcome: &GenerationOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _outcome: &GenerationOutcome) {}
}

/// Run the pipeline with the current time.
pub async fn generate(
    config: &GeneratorConfig,
    force: bool,
    progress: &dyn ProgressReporter,
) -> Result<GenerationOutcome> {
    generate_at(config, force, Utc::now(), progress).await
}

/// Run the pipeline as of `now`.
///
/// Strategy validation, rendering and the manifest write are fatal. Sibling
/// updates and the cache write are not: failures are logged and the run
/// still succeeds.
#[instrument(skip_all, fields(extractor = config.extractor.as_str(), force))]
pub async fn generate_at(
    config: &GeneratorConfig,
    force: bool,
    now: DateTime<Utc>,
    progress: &dyn ProgressReporter,
) -> Result<GenerationOutcome> {
    let start = Instant::now();
    let strategy = Strategy::from_config(config);

    // --- Phase 1: Extract + normalize ---
    let Preview { records, skipped } = collect(config, strategy, progress).await?;
    if records.is_empty() {
        warn!(skipped = skipped.len(), "no content found, manifest not written");
        let outcome = GenerationOutcome::NoContent {
            skipped: skipped.len(),
        };
        progress.done(&outcome);
        return Ok(outcome);
    }

    // --- Phase 2: Change detection ---
    progress.phase("Checking for changes");
    let hash = content_hash(&records)?;
    let cache = ChangeCache::new(&config.cache_file, config.cache_duration);
    if !force && cache.is_unchanged(&hash, now) {
        info!(items = records.len(), "content unchanged, skipping generation");
        let outcome = GenerationOutcome::Unchanged {
            items: records.len(),
            content_hash: hash,
        };
        progress.done(&outcome);
        return Ok(outcome);
    }

    // --- Phase 3: Render + write ---
    progress.phase("Writing manifest");
    let manifest = render_manifest(&records, config, now);
    write_atomic(&config.output_path, &manifest)?;
    info!(
        path = %config.output_path.display(),
        items = records.len(),
        bytes = manifest.len(),
        "manifest written"
    );

    // --- Phase 4: Sibling files ---
    progress.phase("Updating sitemap and robots.txt");
    let siblings = update_siblings(config, now);

    // --- Phase 5: Cache ---
    let elapsed = start.elapsed();
    let entry = CacheEntry {
        content_hash: hash.clone(),
        timestamp: now,
        generator_version: GENERATOR_VERSION.to_string(),
        item_count: records.len(),
        generation_time: elapsed.as_secs_f64(),
        extractor_used: strategy.name().to_string(),
    };
    if let Err(e) = cache.store(&entry) {
        warn!(path = %cache.path().display(), error = %e, "failed to write cache");
    }

    info!(
        items = records.len(),
        skipped = skipped.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "generation complete"
    );

    let outcome = GenerationOutcome::Generated {
        path: config.output_path.clone(),
        items: records.len(),
        skipped: skipped.len(),
        content_hash: hash,
        siblings,
        elapsed,
    };
    progress.done(&outcome);
    Ok(outcome)
}

/// Extract and normalize without writing anything.
#[instrument(skip_all, fields(extractor = config.extractor.as_str()))]
pub async fn preview(config: &GeneratorConfig, progress: &dyn ProgressReporter) -> Result<Preview> {
    collect(config, Strategy::from_config(config), progress).await
}

async fn collect(
    config: &GeneratorConfig,
    strategy: Strategy,
    progress: &dyn ProgressReporter,
) -> Result<Preview> {
    progress.phase("Validating configuration");
    strategy.validate(config)?;

    progress.phase("Extracting content");
    let extraction = strategy.extract(config).await?;
    for unit in &extraction.skipped {
        warn!(unit = %unit.unit, reason = %unit.reason, "skipped");
    }

    progress.phase("Ranking content");
    let records = normalize(extraction.records, config);
    Ok(Preview {
        records,
        skipped: extraction.skipped,
    })
}

fn update_siblings(config: &GeneratorConfig, now: DateTime<Utc>) -> Vec<PatchOutcome> {
    let updater = SiblingUpdater::new(&config.site_root, config.backup_files, now);
    let mut outcomes = Vec::new();

    if config.auto_update_sitemap {
        match updater.update_sitemap(config.manifest_url()) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!(error = %e, "sitemap update failed"),
        }
    }
    if config.auto_update_robots {
        match updater.update_robots(config.manifest_file_name()) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!(error = %e, "robots.txt update failed"),
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use llmstxt_shared::AppConfig;
    use std::path::Path;
    use tempfile::TempDir;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
    }

    /// A static site with one long and one short page under `<tmp>/content`.
    fn site() -> (TempDir, GeneratorConfig) {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        std::fs::create_dir_all(&content).unwrap();
        std::fs::write(content.join("short.md"), words(20)).unwrap();
        std::fs::write(
            content.join("hello.md"),
            format!("---\ntitle: Hello World\n---\n{}\n", words(120)),
        )
        .unwrap();

        let config = config_in(dir.path());
        (dir, config)
    }

    fn config_in(root: &Path) -> GeneratorConfig {
        let mut app = AppConfig::default();
        app.extractor = "static".into();
        app.site_url = "https://example.com".into();
        app.site_name = "Example".into();
        app.static_site.content_directory = root.join("content").display().to_string();
        app.output_path = root.join("llms.txt").display().to_string();
        app.cache_file = root.join(".llms_cache.json").display().to_string();
        app.site_root = root.display().to_string();
        GeneratorConfig::try_from(&app).unwrap()
    }

    #[tokio::test]
    async fn generates_manifest_and_patches_robots() {
        let (dir, config) = site();

        let outcome = generate_at(&config, false, now(), &SilentProgress)
            .await
            .unwrap();
        let GenerationOutcome::Generated {
            items,
            skipped,
            siblings,
            ..
        } = &outcome
        else {
            panic!("expected Generated, got {outcome:?}");
        };
        assert_eq!(*items, 1);
        assert_eq!(*skipped, 1);
        assert_eq!(
            *siblings,
            [
                PatchOutcome::NoCandidate,
                PatchOutcome::Created {
                    path: dir.path().join("robots.txt")
                },
            ]
        );

        let manifest = std::fs::read_to_string(dir.path().join("llms.txt")).unwrap();
        assert!(manifest.starts_with("# LLMs.txt for Example\n"));
        assert!(manifest.contains("# Hello World\nURL: https://example.com/hello.html\n"));
        assert!(manifest.contains("Reading Time: 1 minutes"));
        assert!(!manifest.contains("short.html"));

        let robots = std::fs::read_to_string(dir.path().join("robots.txt")).unwrap();
        assert_eq!(robots.matches("Allow: /llms.txt").count(), 1);

        let cache: CacheEntry = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(".llms_cache.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(cache.item_count, 1);
        assert_eq!(cache.extractor_used, "static");
        assert_eq!(cache.timestamp, now());
    }

    #[tokio::test]
    async fn multi_line_metadata_renders_one_entry_per_file() {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        std::fs::create_dir_all(&content).unwrap();
        std::fs::write(
            content.join("guide.md"),
            format!("Welcome to the guide\n\n# Overview\n\n{}. End.", words(80)),
        )
        .unwrap();
        std::fs::write(
            content.join("notes.md"),
            format!(
                "---\ntitle: |\n  Release\n  Notes\ndescription: |\n  Summary\n\n  # Changes\n---\n{}",
                words(60)
            ),
        )
        .unwrap();

        let config = config_in(dir.path());
        let outcome = generate_at(&config, false, now(), &SilentProgress)
            .await
            .unwrap();
        assert!(matches!(outcome, GenerationOutcome::Generated { items: 2, .. }));

        let manifest = std::fs::read_to_string(dir.path().join("llms.txt")).unwrap();
        let report = llmstxt_artifacts::validate_manifest(&manifest);
        assert!(report.is_valid(), "{:?}", report.issues);
        assert_eq!(report.entries, 2);

        assert!(manifest.contains("# Overview\nURL: https://example.com/guide.html\n"));
        assert!(
            manifest
                .lines()
                .any(|l| l.starts_with("Description: Welcome to the guide # Overview word0"))
        );
        assert!(manifest.contains("# Release Notes\nURL: https://example.com/notes.html\n"));
        assert!(manifest.contains("Description: Summary # Changes\n"));
    }

    #[tokio::test]
    async fn unchanged_content_writes_nothing() {
        let (dir, config) = site();
        generate_at(&config, false, now(), &SilentProgress)
            .await
            .unwrap();

        let manifest_path = dir.path().join("llms.txt");
        std::fs::remove_file(&manifest_path).unwrap();
        let robots_before = std::fs::read(dir.path().join("robots.txt")).unwrap();

        let outcome = generate_at(&config, false, now(), &SilentProgress)
            .await
            .unwrap();
        assert!(matches!(outcome, GenerationOutcome::Unchanged { items: 1, .. }));
        assert!(!manifest_path.exists());
        assert_eq!(std::fs::read(dir.path().join("robots.txt")).unwrap(), robots_before);

        let outcome = generate_at(&config, true, now(), &SilentProgress)
            .await
            .unwrap();
        assert!(matches!(outcome, GenerationOutcome::Generated { .. }));
        assert!(manifest_path.exists());
    }

    #[tokio::test]
    async fn robots_patch_is_idempotent_across_runs() {
        let (dir, config) = site();
        let robots = dir.path().join("robots.txt");
        std::fs::write(&robots, "User-agent: *\nDisallow: /private/").unwrap();

        generate_at(&config, true, now(), &SilentProgress)
            .await
            .unwrap();
        let first = std::fs::read(&robots).unwrap();
        let text = String::from_utf8(first.clone()).unwrap();
        assert!(text.starts_with("User-agent: *\nDisallow: /private/\n"));
        assert_eq!(text.matches("Allow:").count(), 1);
        assert!(dir.path().join("robots.txt.backup_20250314_092653").exists());

        generate_at(&config, true, now(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&robots).unwrap(), first);
    }

    #[tokio::test]
    async fn empty_site_is_no_content() {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        std::fs::create_dir_all(&content).unwrap();
        std::fs::write(content.join("stub.md"), "too short").unwrap();

        let config = config_in(dir.path());
        let outcome = generate_at(&config, false, now(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(outcome, GenerationOutcome::NoContent { skipped: 1 });
        assert!(!dir.path().join("llms.txt").exists());
        assert!(!dir.path().join(".llms_cache.json").exists());
    }

    #[tokio::test]
    async fn invalid_strategy_settings_abort() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        assert!(
            generate_at(&config, false, now(), &SilentProgress)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn sitemap_index_budget_end_to_end() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let base = server.uri();
        let urlset = |section: &str| {
            let urls: String = (1..=3)
                .map(|i| format!("<url><loc>{base}/{section}/entry-{i}</loc></url>"))
                .collect();
            format!("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">{urls}</urlset>")
        };
        let index = format!(
            "<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\
             <sitemap><loc>{base}/a.xml</loc></sitemap>\
             <sitemap><loc>{base}/b.xml</loc></sitemap>\
             </sitemapindex>"
        );
        for (at, body) in [
            ("/sitemap.xml", index),
            ("/a.xml", urlset("blog")),
            ("/b.xml", urlset("docs")),
        ] {
            Mock::given(method("GET"))
                .and(path(at))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&server)
                .await;
        }

        let dir = TempDir::new().unwrap();
        let mut app = AppConfig::default();
        app.site_url = base.clone();
        app.sitemap.max_urls = 4;
        app.performance.request_delay_ms = 0;
        app.output_path = dir.path().join("llms.txt").display().to_string();
        app.cache_file = dir.path().join("cache.json").display().to_string();
        app.site_root = dir.path().display().to_string();
        let config = GeneratorConfig::try_from(&app).unwrap();

        let outcome = generate_at(&config, false, now(), &SilentProgress)
            .await
            .unwrap();
        assert!(matches!(outcome, GenerationOutcome::Generated { items: 4, .. }));

        let manifest = std::fs::read_to_string(dir.path().join("llms.txt")).unwrap();
        let report = llmstxt_artifacts::validate_manifest(&manifest);
        assert!(report.is_valid(), "{:?}", report.issues);
        assert_eq!(report.entries, 4);
    }

    #[tokio::test]
    async fn preview_writes_nothing() {
        let (dir, config) = site();
        let result = preview(&config, &SilentProgress).await.unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].title(), "Hello World");
        assert_eq!(result.skipped.len(), 1);
        assert!(!dir.path().join("llms.txt").exists());
        assert!(!dir.path().join("robots.txt").exists());
    }
}
