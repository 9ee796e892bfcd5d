//! Sitemap strategy: one record per content URL listed in the site's sitemap.
//!
//! The root may be a `<urlset>` or a `<sitemapindex>`. Index children are
//! fetched in document order and share a single `max_urls` budget.

use std::collections::VecDeque;

use tracing::{debug, info, instrument};
use url::Url;

use llmstxt_discovery::{SitemapDocument, SitemapKind, parse_sitemap};
use llmstxt_shared::{ContentRecord, ContentType, GeneratorConfig, LlmsTxtError, Result};
use llmstxt_text::capitalize;

use crate::Extraction;
use crate::transport::Transport;

/// How many levels of nested sitemap indexes are followed below the root.
const MAX_INDEX_DEPTH: usize = 2;

/// URLs containing any of these (lower-cased) are not content.
const NON_CONTENT_MARKERS: &[&str] = &[
    "/admin",
    "/api",
    "/wp-admin",
    "/wp-content",
    "/wp-includes",
    ".xml",
    ".js",
    ".css",
    ".png",
    ".jpg",
    ".jpeg",
    ".gif",
    ".svg",
    "/feed",
    "/rss",
    "/sitemap",
    "/robots.txt",
];

/// URLs containing any of these are articles rather than pages.
const ARTICLE_MARKERS: &[&str] = &["/blog/", "/post/", "/article/", "/news/", "/press/"];

/// Slugs that name a site's landing page.
const HOME_SLUGS: &[&str] = &["index", "home", "default"];

/// The root sitemap: the configured `sitemap.url`, or `<site_url>/sitemap.xml`.
pub fn root_sitemap_url(config: &GeneratorConfig) -> Result<Url> {
    let raw = match &config.sitemap.url {
        Some(explicit) => explicit.clone(),
        None => format!(
            "{}/sitemap.xml",
            config.site_url.as_str().trim_end_matches('/')
        ),
    };
    Url::parse(&raw).map_err(|e| LlmsTxtError::config(format!("invalid sitemap URL '{raw}': {e}")))
}

pub(super) fn validate(config: &GeneratorConfig) -> Result<()> {
    root_sitemap_url(config)?;
    if config.sitemap.max_urls == 0 {
        return Err(LlmsTxtError::config("sitemap.max_urls must be greater than 0"));
    }
    Ok(())
}

#[instrument(skip_all, fields(max_urls = config.sitemap.max_urls))]
pub(super) async fn extract(config: &GeneratorConfig) -> Result<Extraction> {
    let root_url = root_sitemap_url(config)?;
    let transport = Transport::new(&config.performance, config.sitemap.timeout)?;
    let mut extraction = Extraction::default();
    let mut remaining = config.sitemap.max_urls;

    info!(url = %root_url, "fetching sitemap");
    let root = match fetch_sitemap(&transport, &root_url).await {
        Ok(doc) => doc,
        Err(e) => {
            extraction.skip(root_url.as_str(), e);
            return Ok(extraction);
        }
    };

    if root.kind == SitemapKind::UrlSet {
        extract_urlset(&root, &mut remaining, &mut extraction);
        return Ok(extraction);
    }

    info!(children = root.entries.len(), "processing sitemap index");
    let mut pending: VecDeque<(String, usize)> =
        root.entries.into_iter().map(|e| (e.loc, 1)).collect();
    let mut first = true;

    while let Some((loc, depth)) = pending.pop_front() {
        if remaining == 0 {
            debug!("URL budget exhausted");
            break;
        }
        if !first {
            tokio::time::sleep(config.performance.request_delay).await;
        }
        first = false;

        let child = match Url::parse(&loc) {
            Ok(url) => fetch_sitemap(&transport, &url).await,
            Err(e) => Err(LlmsTxtError::parse(format!("invalid sitemap location: {e}"))),
        };
        let child = match child {
            Ok(doc) => doc,
            Err(e) => {
                extraction.skip(loc, e);
                continue;
            }
        };

        match child.kind {
            SitemapKind::UrlSet => {
                let before = extraction.records.len();
                extract_urlset(&child, &mut remaining, &mut extraction);
                info!(sitemap = %loc, items = extraction.records.len() - before, "processed child sitemap");
            }
            SitemapKind::Index if depth < MAX_INDEX_DEPTH => {
                for entry in child.entries.into_iter().rev() {
                    pending.push_front((entry.loc, depth + 1));
                }
            }
            SitemapKind::Index => {
                extraction.skip(loc, "sitemap index nested too deeply");
            }
        }
    }

    Ok(extraction)
}

async fn fetch_sitemap(transport: &Transport, url: &Url) -> Result<SitemapDocument> {
    let body = transport.get_text(url).await?;
    parse_sitemap(&body)
}

/// Turn `<url>` entries into records until `remaining` hits zero.
/// Non-content URLs are passed over without spending budget.
fn extract_urlset(doc: &SitemapDocument, remaining: &mut usize, extraction: &mut Extraction) {
    for entry in &doc.entries {
        if *remaining == 0 {
            break;
        }

        let lowered = entry.loc.to_lowercase();
        if NON_CONTENT_MARKERS.iter().any(|m| lowered.contains(m)) {
            debug!(url = %entry.loc, "non-content URL");
            continue;
        }

        let url = match Url::parse(&entry.loc) {
            Ok(url) => url,
            Err(e) => {
                extraction.skip(entry.loc.as_str(), LlmsTxtError::parse(format!("invalid URL: {e}")));
                continue;
            }
        };

        let content_type = if ARTICLE_MARKERS.iter().any(|m| lowered.contains(m)) {
            ContentType::Article
        } else {
            ContentType::Page
        };

        match ContentRecord::new(title_from_url(&url), entry.loc.as_str(), content_type) {
            Ok(record) => {
                extraction.push(record.with_last_modified(entry.lastmod.clone()));
                *remaining -= 1;
            }
            Err(e) => extraction.skip(entry.loc.as_str(), e),
        }
    }
}

/// Title from a URL's last path segment: `my-first-post` → `My First Post`.
/// The root path and `index`/`home`/`default` slugs become `Home Page`.
pub fn title_from_url(url: &Url) -> String {
    let path = url.path().trim_matches('/');
    let slug = path.rsplit('/').next().unwrap_or_default();
    let title = slug
        .split('-')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() || HOME_SLUGS.contains(&title.to_lowercase().as_str()) {
        "Home Page".to_string()
    } else {
        title
    }
}
