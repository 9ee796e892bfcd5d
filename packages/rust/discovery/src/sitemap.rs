//! Sitemap XML dialect (`urlset` / `sitemapindex`).
//!
//! Parsing is streaming (`quick-xml`) so the byte offset of the closing
//! `</urlset>` tag can be recorded. The sibling updater inserts new entries
//! at that offset and leaves the rest of the file untouched. An empty
//! self-closing `<urlset/>` root is expanded into an open/close pair.

use std::ops::Range;

use chrono::NaiveDate;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::instrument;

use llmstxt_shared::{LlmsTxtError, Result};

/// Namespace of the sitemap protocol.
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Root element of a sitemap document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    /// `<urlset>` of `<url>` entries.
    UrlSet,
    /// `<sitemapindex>` of `<sitemap>` entries pointing at other sitemaps.
    Index,
}

/// One `<url>` or `<sitemap>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<String>,
}

/// A parsed sitemap document.
#[derive(Debug, Clone)]
pub struct SitemapDocument {
    pub kind: SitemapKind,
    pub entries: Vec<SitemapEntry>,
    urlset_close: Option<usize>,
    urlset_empty: Option<Range<usize>>,
}

impl SitemapDocument {
    /// Whether any entry's `<loc>` equals `loc` exactly.
    pub fn contains_loc(&self, loc: &str) -> bool {
        self.entries.iter().any(|e| e.loc == loc)
    }

    /// Byte offset of the `<` of the closing `</urlset>` tag.
    pub fn urlset_close_offset(&self) -> Option<usize> {
        self.urlset_close
    }

    /// Byte span of a self-closing `<urlset .../>` root.
    pub fn empty_urlset_span(&self) -> Option<Range<usize>> {
        self.urlset_empty.clone()
    }
}

#[derive(Clone, Copy)]
enum Field {
    Loc,
    Lastmod,
}

#[derive(Default)]
struct PendingEntry {
    loc: Option<String>,
    lastmod: Option<String>,
}

/// Parse a sitemap or sitemap index.
///
/// Entries without a non-empty `<loc>` are dropped. Any root element other
/// than `urlset` / `sitemapindex` is an error, as is malformed XML.
#[instrument(skip(xml), fields(xml_len = xml.len()))]
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut kind = None;
    let mut depth = 0usize;
    let mut entries = Vec::new();
    let mut pending: Option<PendingEntry> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();
    let mut urlset_close = None;
    let mut urlset_empty = None;

    loop {
        let position = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                match depth {
                    1 => kind = Some(root_kind(name.as_ref())?),
                    2 if matches!(name.as_ref(), b"url" | b"sitemap") => {
                        pending = Some(PendingEntry::default());
                    }
                    3 if pending.is_some() => {
                        field = match name.as_ref() {
                            b"loc" => Some(Field::Loc),
                            b"lastmod" => Some(Field::Lastmod),
                            _ => None,
                        };
                        text.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    let root = root_kind(e.local_name().as_ref())?;
                    if root == SitemapKind::UrlSet {
                        let start = byte_offset(position)?;
                        let end = byte_offset(reader.buffer_position())?;
                        let start = xml[start..end].find('<').map_or(start, |i| start + i);
                        urlset_empty = Some(start..end);
                    }
                    kind = Some(root);
                }
            }
            Ok(Event::Text(e)) => {
                if field.is_some() {
                    let unescaped = e
                        .unescape()
                        .map_err(|e| LlmsTxtError::parse(format!("sitemap text: {e}")))?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(e)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                match depth {
                    3 => {
                        if let (Some(f), Some(entry)) = (field.take(), pending.as_mut()) {
                            let value = text.trim().to_string();
                            match f {
                                Field::Loc => entry.loc = Some(value),
                                Field::Lastmod => {
                                    entry.lastmod = Some(value).filter(|v| !v.is_empty());
                                }
                            }
                        }
                    }
                    2 => {
                        if let Some(entry) = pending.take() {
                            if let Some(loc) = entry.loc.filter(|l| !l.is_empty()) {
                                entries.push(SitemapEntry {
                                    loc,
                                    lastmod: entry.lastmod,
                                });
                            }
                        }
                    }
                    1 if kind == Some(SitemapKind::UrlSet) => {
                        urlset_close = Some(byte_offset(position)?);
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(LlmsTxtError::parse(format!(
                    "XML parse error at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(LlmsTxtError::parse("unexpected end of sitemap document"));
    }
    let kind = kind.ok_or_else(|| LlmsTxtError::parse("sitemap has no root element"))?;

    Ok(SitemapDocument {
        kind,
        entries,
        urlset_close,
        urlset_empty,
    })
}

fn byte_offset(position: u64) -> Result<usize> {
    usize::try_from(position)
        .map_err(|_| LlmsTxtError::parse("sitemap offset does not fit in memory"))
}

fn root_kind(name: &[u8]) -> Result<SitemapKind> {
    match name {
        b"urlset" => Ok(SitemapKind::UrlSet),
        b"sitemapindex" => Ok(SitemapKind::Index),
        other => Err(LlmsTxtError::parse(format!(
            "unexpected sitemap root element <{}>",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// The `<url>` block appended for a new location.
pub fn url_entry_xml(loc: &str, lastmod: NaiveDate) -> String {
    format!(
        "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>daily</changefreq>\n    <priority>0.8</priority>\n  </url>\n",
        quick_xml::escape::escape(loc),
        lastmod.format("%Y-%m-%d"),
    )
}

/// Insert a `<url>` for `loc` before `</urlset>`.
///
/// Returns `Ok(None)` when `loc` is already listed. Every byte outside the
/// inserted block is preserved. Sitemap indexes cannot be patched.
pub fn insert_url(xml: &str, loc: &str, lastmod: NaiveDate) -> Result<Option<String>> {
    let doc = parse_sitemap(xml)?;
    if doc.kind != SitemapKind::UrlSet {
        return Err(LlmsTxtError::validation(
            "sitemap index files cannot hold page entries",
        ));
    }
    if doc.contains_loc(loc) {
        return Ok(None);
    }

    let block = url_entry_xml(loc, lastmod);
    let mut patched = String::with_capacity(xml.len() + block.len() + 16);

    if let Some(offset) = doc.urlset_close_offset() {
        patched.push_str(&xml[..offset]);
        patched.push_str(&block);
        patched.push_str(&xml[offset..]);
    } else if let Some(span) = doc.empty_urlset_span() {
        let open_tag = xml[span.clone()].trim_end_matches("/>").trim_end();
        patched.push_str(&xml[..span.start]);
        patched.push_str(open_tag);
        patched.push_str(">\n");
        patched.push_str(&block);
        patched.push_str("</urlset>");
        patched.push_str(&xml[span.end..]);
    } else {
        return Err(LlmsTxtError::parse("sitemap has no closing </urlset> tag"));
    }
    Ok(Some(patched))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        let path = format!("../../../fixtures/sitemaps/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn parses_urlset() {
        let doc = parse_sitemap(&fixture("urlset.xml")).unwrap();
        assert_eq!(doc.kind, SitemapKind::UrlSet);
        assert_eq!(doc.entries.len(), 5);
        assert_eq!(doc.entries[0].loc, "https://example.com/");
        assert_eq!(doc.entries[1].lastmod.as_deref(), Some("2024-05-01"));
        assert!(doc.urlset_close_offset().is_some());
    }

    #[test]
    fn parses_index() {
        let doc = parse_sitemap(&fixture("index.xml")).unwrap();
        assert_eq!(doc.kind, SitemapKind::Index);
        assert_eq!(doc.entries.len(), 2);
        assert!(doc.entries[0].loc.ends_with("/sitemap-posts.xml"));
        assert!(doc.urlset_close_offset().is_none());
    }

    #[test]
    fn entity_and_cdata_locations() {
        let xml = r#"<?xml version="1.0"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/?a=1&amp;b=2</loc></url>
  <url><loc><![CDATA[https://example.com/cdata]]></loc></url>
  <url><lastmod>2024-01-01</lastmod></url>
</urlset>"#;
        let doc = parse_sitemap(xml).unwrap();
        let locs: Vec<&str> = doc.entries.iter().map(|e| e.loc.as_str()).collect();
        assert_eq!(locs, ["https://example.com/?a=1&b=2", "https://example.com/cdata"]);
    }

    #[test]
    fn rejects_bad_documents() {
        assert!(parse_sitemap("<html><body/></html>").is_err());
        assert!(parse_sitemap("<urlset><url><loc>x</url></urlset>").is_err());
        assert!(parse_sitemap("").is_err());
    }

    #[test]
    fn insert_preserves_other_bytes() {
        let xml = fixture("urlset.xml");
        let patched = insert_url(&xml, "https://example.com/llms.txt", day())
            .unwrap()
            .expect("inserted");

        let offset = xml.rfind("</urlset>").unwrap();
        assert!(patched.starts_with(&xml[..offset]));
        assert!(patched.ends_with(&xml[offset..]));
        assert!(patched.contains("<loc>https://example.com/llms.txt</loc>"));
        assert!(patched.contains("<lastmod>2025-03-14</lastmod>"));
        assert!(patched.contains("<changefreq>daily</changefreq>"));
        assert!(patched.contains("<priority>0.8</priority>"));

        let reparsed = parse_sitemap(&patched).unwrap();
        assert_eq!(reparsed.entries.len(), 6);
    }

    #[test]
    fn insert_is_idempotent() {
        let xml = fixture("urlset.xml");
        let once = insert_url(&xml, "https://example.com/llms.txt", day())
            .unwrap()
            .unwrap();
        assert!(
            insert_url(&once, "https://example.com/llms.txt", day())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn insert_escapes_location() {
        let xml = "<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\"></urlset>";
        let patched = insert_url(xml, "https://example.com/llms.txt?a=1&b=2", day())
            .unwrap()
            .unwrap();
        assert!(patched.contains("<loc>https://example.com/llms.txt?a=1&amp;b=2</loc>"));
        assert!(
            parse_sitemap(&patched)
                .unwrap()
                .contains_loc("https://example.com/llms.txt?a=1&b=2")
        );
    }

    #[test]
    fn insert_expands_self_closing_urlset() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\"/>\n";
        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(doc.kind, SitemapKind::UrlSet);
        assert!(doc.entries.is_empty());
        assert!(doc.urlset_close_offset().is_none());

        let patched = insert_url(xml, "https://example.com/llms.txt", day())
            .unwrap()
            .expect("inserted");
        assert!(patched.starts_with(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n  <url>\n"
        ));
        assert!(patched.ends_with("  </url>\n</urlset>\n"));

        let reparsed = parse_sitemap(&patched).unwrap();
        assert!(reparsed.contains_loc("https://example.com/llms.txt"));
        assert!(
            insert_url(&patched, "https://example.com/llms.txt", day())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn insert_refuses_index() {
        assert!(insert_url(&fixture("index.xml"), "https://example.com/llms.txt", day()).is_err());
    }
}
