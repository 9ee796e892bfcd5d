//! Site discovery files: the sitemap XML dialect and `robots.txt`.
//!
//! The extraction side reads sitemaps through [`parse_sitemap`]; the
//! publishing side registers a generated manifest in the site's own
//! `sitemap.xml` and `robots.txt` through [`SiblingUpdater`].

mod robots;
mod siblings;
mod sitemap;

pub use robots::patch_robots;
pub use siblings::{
    PatchOutcome, ROBOTS_CANDIDATES, SITEMAP_CANDIDATES, SiblingUpdater, backup_path,
};
pub use sitemap::{
    SITEMAP_NAMESPACE, SitemapDocument, SitemapEntry, SitemapKind, insert_url, parse_sitemap,
    url_entry_xml,
};
