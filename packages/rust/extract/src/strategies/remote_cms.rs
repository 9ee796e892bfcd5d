//! WordPress-style REST API strategy.
//!
//! Pages through `<api>/<post_type>` for every configured post type, newest
//! modification first, excluding configured categories.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use url::Url;

use llmstxt_shared::{ContentRecord, ContentType, GeneratorConfig, LlmsTxtError, Result};
use llmstxt_text::{detect_language, html_to_text, word_count};

use crate::Extraction;
use crate::transport::Transport;

/// Per-request timeout for API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the page count of a collection.
const TOTAL_PAGES_HEADER: &str = "X-WP-TotalPages";

// ---------------------------------------------------------------------------
// API payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct Rendered {
    #[serde(default)]
    rendered: String,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    id: Option<u64>,
    title: Rendered,
    link: String,
    #[serde(default)]
    content: Rendered,
    #[serde(default)]
    excerpt: Rendered,
    #[serde(default)]
    modified: Option<String>,
    #[serde(default, rename = "_embedded")]
    embedded: Option<Embedded>,
}

#[derive(Debug, Default, Deserialize)]
struct Embedded {
    #[serde(default)]
    author: Vec<Author>,
    #[serde(default, rename = "wp:term")]
    terms: Vec<Vec<Term>>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Term {
    #[serde(default)]
    taxonomy: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    id: u64,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    name: String,
}

// ---------------------------------------------------------------------------
// Strategy entry points
// ---------------------------------------------------------------------------

/// The REST API base: the configured `api_url`, or `<site_url>/wp-json/wp/v2`.
pub fn api_base(config: &GeneratorConfig) -> Result<Url> {
    match &config.wordpress.api_url {
        Some(explicit) => Url::parse(explicit)
            .map_err(|e| LlmsTxtError::config(format!("invalid wordpress.api_url '{explicit}': {e}"))),
        None => join_segment(&config.site_url, "wp-json/wp/v2"),
    }
}

pub(super) fn validate(config: &GeneratorConfig) -> Result<()> {
    api_base(config)?;
    if config.wordpress.post_types.is_empty() {
        return Err(LlmsTxtError::config("wordpress.post_types must not be empty"));
    }
    Ok(())
}

#[instrument(skip_all, fields(site = %config.site_url))]
pub(super) async fn extract(config: &GeneratorConfig) -> Result<Extraction> {
    let base = api_base(config)?;
    let transport = Transport::new(&config.performance, REQUEST_TIMEOUT)?;

    let excluded = resolve_excluded_categories(&transport, &base, config).await;

    let mut extraction = Extraction::default();
    for post_type in &config.wordpress.post_types {
        fetch_post_type(&transport, &base, post_type, &excluded, config, &mut extraction).await;
    }
    Ok(extraction)
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// IDs of categories listed in `exclude_categories`, matched by slug or by
/// case-insensitive name. Failures only disable the exclusion.
async fn resolve_excluded_categories(
    transport: &Transport,
    base: &Url,
    config: &GeneratorConfig,
) -> Vec<u64> {
    let wanted = &config.wordpress.exclude_categories;
    if wanted.is_empty() {
        return Vec::new();
    }

    let url = match join_segment(base, "categories") {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, "cannot build categories URL");
            return Vec::new();
        }
    };

    match transport.get_json::<Vec<Category>>(&url, &[]).await {
        Ok((categories, _)) => categories
            .into_iter()
            .filter(|c| {
                wanted
                    .iter()
                    .any(|w| *w == c.slug || w.eq_ignore_ascii_case(&c.name))
            })
            .map(|c| c.id)
            .collect(),
        Err(e) => {
            warn!(error = %e, "could not fetch categories, exclusion disabled");
            Vec::new()
        }
    }
}

async fn fetch_post_type(
    transport: &Transport,
    base: &Url,
    post_type: &str,
    excluded: &[u64],
    config: &GeneratorConfig,
    extraction: &mut Extraction,
) {
    let endpoint = match join_segment(base, post_type) {
        Ok(url) => url,
        Err(e) => {
            extraction.skip(post_type, e);
            return;
        }
    };

    let mut page: u32 = 1;
    loop {
        let mut query = vec![
            ("per_page", config.wordpress.per_page.to_string()),
            ("page", page.to_string()),
            ("status", "publish".to_string()),
            ("_embed", "true".to_string()),
            ("orderby", "modified".to_string()),
            ("order", "desc".to_string()),
        ];
        if !excluded.is_empty() {
            let ids: Vec<String> = excluded.iter().map(u64::to_string).collect();
            query.push(("categories_exclude", ids.join(",")));
        }

        info!(post_type, page, "fetching page");
        let (posts, headers) = match transport.get_json::<Vec<Value>>(&endpoint, &query).await {
            Ok(found) => found,
            Err(e) => {
                extraction.skip(format!("{post_type} page {page}"), e);
                return;
            }
        };
        if posts.is_empty() {
            return;
        }

        for raw in posts {
            let unit = post_unit(post_type, &raw);
            match serde_json::from_value::<Post>(raw)
                .map_err(LlmsTxtError::from)
                .and_then(|post| post_to_record(post, post_type))
            {
                Ok(record) => extraction.push(record),
                Err(e) => extraction.skip(unit, e),
            }
        }

        let total_pages = headers
            .get(TOTAL_PAGES_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(1);
        if page >= total_pages {
            return;
        }

        page += 1;
        tokio::time::sleep(config.performance.request_delay).await;
    }
}

fn post_unit(post_type: &str, raw: &Value) -> String {
    match raw.get("id").and_then(Value::as_u64) {
        Some(id) => format!("{post_type}#{id}"),
        None => format!("{post_type}#unknown"),
    }
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

fn post_to_record(post: Post, post_type: &str) -> Result<ContentRecord> {
    let title = html_to_text(&post.title.rendered);
    let body = html_to_text(&post.content.rendered);
    let excerpt = html_to_text(&post.excerpt.rendered);

    let description = if excerpt.is_empty() {
        body.clone()
    } else {
        excerpt
    };

    let embedded = post.embedded.unwrap_or_default();
    let author = embedded
        .author
        .into_iter()
        .next()
        .and_then(|a| a.name.or(a.display_name));
    let tags = embedded
        .terms
        .into_iter()
        .flatten()
        .filter(|t| matches!(t.taxonomy.as_deref(), Some("post_tag" | "category")))
        .filter_map(|t| t.name)
        .collect();

    let content_type = if post_type == "posts" {
        ContentType::Article
    } else {
        ContentType::Page
    };

    let record = ContentRecord::new(title, post.link, content_type)
        .map_err(|e| match post.id {
            Some(id) => LlmsTxtError::validation(format!("post {id}: {e}")),
            None => e,
        })?
        .with_description(Some(description))
        .with_last_modified(post.modified)
        .with_author(author)
        .with_tags(tags)
        .with_word_count(Some(word_count(&body)))
        .with_language(detect_language(&body));
    Ok(record)
}

/// Append a path segment to `base` without dropping its last segment.
fn join_segment(base: &Url, segment: &str) -> Result<Url> {
    let joined = format!("{}/{segment}", base.as_str().trim_end_matches('/'));
    Url::parse(&joined).map_err(|e| LlmsTxtError::config(format!("invalid URL '{joined}': {e}")))
}
