//! Manifest artifact: rendering and read-back validation.
//!
//! - [`render_manifest`] turns a ranked record list into `llms.txt` text
//! - [`parse_manifest`] / [`validate_manifest`] read that text back

mod parser;
mod render;

pub use parser::{ManifestEntry, ParsedManifest, ValidationReport, parse_manifest, validate_manifest};
pub use render::{HEADER_PREFIX, RULE, group_thousands, render_manifest, render_record};
