//! Sibling discovery-file updater.
//!
//! Registers the manifest in the site's `sitemap.xml` and `robots.txt`.
//! Each operation picks the first existing candidate under the site root,
//! backs it up when configured, and rewrites it only if the manifest is not
//! already listed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use url::Url;

use llmstxt_shared::{LlmsTxtError, Result, write_atomic};

use crate::robots::patch_robots;
use crate::sitemap::{SitemapKind, insert_url, parse_sitemap};

/// Sitemap locations, in lookup order.
pub const SITEMAP_CANDIDATES: &[&str] = &[
    "sitemap.xml",
    "sitemap_index.xml",
    "public/sitemap.xml",
    "static/sitemap.xml",
];

/// Robots locations, in lookup order. The first is created when none exist.
pub const ROBOTS_CANDIDATES: &[&str] = &["robots.txt", "public/robots.txt", "static/robots.txt"];

/// What a patch operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// An existing file was rewritten.
    Updated {
        path: PathBuf,
        backup: Option<PathBuf>,
    },
    /// No candidate existed; a new file was written.
    Created { path: PathBuf },
    /// The manifest was already registered; nothing was written.
    AlreadyPresent { path: PathBuf },
    /// The file exists but cannot take the entry.
    Skipped { path: PathBuf, reason: String },
    /// No candidate file exists.
    NoCandidate,
}

impl PatchOutcome {
    /// Whether the operation wrote to disk.
    pub fn wrote(&self) -> bool {
        matches!(self, Self::Updated { .. } | Self::Created { .. })
    }
}

/// Patches sibling files relative to a site root.
#[derive(Debug, Clone)]
pub struct SiblingUpdater {
    root: PathBuf,
    backups: bool,
    now: DateTime<Utc>,
}

impl SiblingUpdater {
    pub fn new(root: impl Into<PathBuf>, backups: bool, now: DateTime<Utc>) -> Self {
        Self {
            root: root.into(),
            backups,
            now,
        }
    }

    /// Add `manifest_url` to the first sitemap candidate.
    #[instrument(skip_all, fields(url = %manifest_url))]
    pub fn update_sitemap(&self, manifest_url: &Url) -> Result<PatchOutcome> {
        let Some(path) = first_existing(&self.root, SITEMAP_CANDIDATES) else {
            debug!(root = %self.root.display(), "no sitemap candidate found");
            return Ok(PatchOutcome::NoCandidate);
        };

        let content = read(&path)?;
        if parse_sitemap(&content)?.kind == SitemapKind::Index {
            info!(path = %path.display(), "sitemap is an index, leaving it untouched");
            return Ok(PatchOutcome::Skipped {
                path,
                reason: "sitemap index".into(),
            });
        }

        match insert_url(&content, manifest_url.as_str(), self.now.date_naive())? {
            Some(patched) => {
                let backup = self.backup(&path)?;
                write_atomic(&path, &patched)?;
                info!(path = %path.display(), "registered manifest in sitemap");
                Ok(PatchOutcome::Updated { path, backup })
            }
            None => {
                debug!(path = %path.display(), "manifest already in sitemap");
                Ok(PatchOutcome::AlreadyPresent { path })
            }
        }
    }

    /// Add an `Allow:` line for `manifest_file_name` to the first robots
    /// candidate, creating the first candidate when none exists.
    #[instrument(skip_all, fields(file = manifest_file_name))]
    pub fn update_robots(&self, manifest_file_name: &str) -> Result<PatchOutcome> {
        let Some(path) = first_existing(&self.root, ROBOTS_CANDIDATES) else {
            let path = self.root.join(ROBOTS_CANDIDATES[0]);
            let content = patch_robots("", manifest_file_name).unwrap_or_default();
            write_atomic(&path, &content)?;
            info!(path = %path.display(), "created robots.txt");
            return Ok(PatchOutcome::Created { path });
        };

        let content = read(&path)?;
        match patch_robots(&content, manifest_file_name) {
            Some(patched) => {
                let backup = self.backup(&path)?;
                write_atomic(&path, &patched)?;
                info!(path = %path.display(), "registered manifest in robots.txt");
                Ok(PatchOutcome::Updated { path, backup })
            }
            None => {
                debug!(path = %path.display(), "manifest already in robots.txt");
                Ok(PatchOutcome::AlreadyPresent { path })
            }
        }
    }

    fn backup(&self, path: &Path) -> Result<Option<PathBuf>> {
        if !self.backups {
            return Ok(None);
        }

        let backup = backup_path(path, self.now);
        std::fs::copy(path, &backup).map_err(|e| LlmsTxtError::io(&backup, e))?;
        debug!(backup = %backup.display(), "created backup");
        Ok(Some(backup))
    }
}

/// `<name>.backup_<YYYYmmdd_HHMMSS>` next to `path`.
pub fn backup_path(path: &Path, now: DateTime<Utc>) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.backup_{}", now.format("%Y%m%d_%H%M%S")))
}

fn first_existing(root: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|c| root.join(c))
        .find(|p| p.is_file())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| LlmsTxtError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
    }

    fn manifest_url() -> Url {
        Url::parse("https://example.com/llms.txt").unwrap()
    }

    fn urlset() -> String {
        std::fs::read_to_string("../../../fixtures/sitemaps/urlset.xml").expect("fixture")
    }

    #[test]
    fn backup_name_format() {
        let p = backup_path(Path::new("/site/public/sitemap.xml"), now());
        assert_eq!(
            p,
            PathBuf::from("/site/public/sitemap.xml.backup_20250314_092653")
        );
    }

    #[test]
    fn sitemap_first_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("public")).unwrap();
        std::fs::write(dir.path().join("public/sitemap.xml"), urlset()).unwrap();
        std::fs::write(dir.path().join("static.xml"), "unrelated").unwrap();

        let updater = SiblingUpdater::new(dir.path(), false, now());
        let outcome = updater.update_sitemap(&manifest_url()).unwrap();
        assert_eq!(
            outcome,
            PatchOutcome::Updated {
                path: dir.path().join("public/sitemap.xml"),
                backup: None
            }
        );
    }

    #[test]
    fn sitemap_patch_is_idempotent_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.xml");
        std::fs::write(&path, urlset()).unwrap();

        let updater = SiblingUpdater::new(dir.path(), true, now());
        let first = updater.update_sitemap(&manifest_url()).unwrap();
        assert!(first.wrote());
        let after_first = std::fs::read(&path).unwrap();

        let backup = dir.path().join("sitemap.xml.backup_20250314_092653");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), urlset());

        let second = updater.update_sitemap(&manifest_url()).unwrap();
        assert_eq!(second, PatchOutcome::AlreadyPresent { path: path.clone() });
        assert_eq!(std::fs::read(&path).unwrap(), after_first);
    }

    #[test]
    fn empty_sitemap_gets_manifest_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.xml");
        std::fs::write(
            &path,
            "<?xml version=\"1.0\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\"/>\n",
        )
        .unwrap();

        let updater = SiblingUpdater::new(dir.path(), false, now());
        let first = updater.update_sitemap(&manifest_url()).unwrap();
        assert_eq!(
            first,
            PatchOutcome::Updated {
                path: path.clone(),
                backup: None
            }
        );
        let patched = std::fs::read_to_string(&path).unwrap();
        assert!(patched.contains("<loc>https://example.com/llms.txt</loc>"));
        assert!(patched.trim_end().ends_with("</urlset>"));

        let second = updater.update_sitemap(&manifest_url()).unwrap();
        assert_eq!(second, PatchOutcome::AlreadyPresent { path: path.clone() });
        assert_eq!(std::fs::read_to_string(&path).unwrap(), patched);
    }

    #[test]
    fn sitemap_index_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let index =
            std::fs::read_to_string("../../../fixtures/sitemaps/index.xml").expect("fixture");
        std::fs::write(dir.path().join("sitemap_index.xml"), &index).unwrap();

        let updater = SiblingUpdater::new(dir.path(), true, now());
        let outcome = updater.update_sitemap(&manifest_url()).unwrap();
        assert!(matches!(outcome, PatchOutcome::Skipped { .. }));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("sitemap_index.xml")).unwrap(),
            index
        );
    }

    #[test]
    fn no_sitemap_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let updater = SiblingUpdater::new(dir.path(), true, now());
        assert_eq!(
            updater.update_sitemap(&manifest_url()).unwrap(),
            PatchOutcome::NoCandidate
        );
    }

    #[test]
    fn malformed_sitemap_is_error_and_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.xml");
        std::fs::write(&path, "<urlset><url>").unwrap();

        let updater = SiblingUpdater::new(dir.path(), true, now());
        assert!(updater.update_sitemap(&manifest_url()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<urlset><url>");
    }

    #[test]
    fn robots_created_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let updater = SiblingUpdater::new(dir.path(), true, now());

        let outcome = updater.update_robots("llms.txt").unwrap();
        let path = dir.path().join("robots.txt");
        assert_eq!(outcome, PatchOutcome::Created { path: path.clone() });
        assert!(std::fs::read_to_string(&path).unwrap().contains("Allow: /llms.txt"));
    }

    #[test]
    fn robots_patch_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("static")).unwrap();
        let path = dir.path().join("static/robots.txt");
        std::fs::write(&path, "User-agent: *\nDisallow: /private\n").unwrap();

        let updater = SiblingUpdater::new(dir.path(), false, now());
        assert!(updater.update_robots("llms.txt").unwrap().wrote());
        let after_first = std::fs::read(&path).unwrap();

        let second = updater.update_robots("llms.txt").unwrap();
        assert!(!second.wrote());
        assert_eq!(std::fs::read(&path).unwrap(), after_first);

        let text = String::from_utf8(after_first).unwrap();
        assert_eq!(text.matches("Allow:").count(), 1);
    }
}
