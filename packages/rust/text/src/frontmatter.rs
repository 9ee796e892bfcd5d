//! YAML front matter (`---` fenced) splitting.

use serde_yaml::Value;

use llmstxt_shared::{LlmsTxtError, Result};

/// Metadata keys recognized in a content file's front matter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    pub title: Option<String>,
    /// `description`, falling back to `excerpt`.
    pub description: Option<String>,
    /// `tags`, falling back to `categories`. A scalar becomes one tag.
    pub tags: Vec<String>,
    pub author: Option<String>,
    /// `language`, falling back to `lang`.
    pub language: Option<String>,
    /// Content type tag (`type`).
    pub content_type: Option<String>,
}

/// Split `input` into its front matter and body.
///
/// Files without an opening `---` line (or without a closing one) have no
/// front matter and the whole input is the body. A fenced block that is not
/// a YAML mapping is an error.
pub fn split_front_matter(input: &str) -> Result<(FrontMatter, &str)> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    let Some(after_open) = strip_fence_line(input) else {
        return Ok((FrontMatter::default(), input));
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return Ok((parse_yaml(yaml)?, body));
        }
        offset += line.len();
    }

    Ok((FrontMatter::default(), input))
}

fn strip_fence_line(input: &str) -> Option<&str> {
    let rest = input.strip_prefix("---")?;
    let (first_line, remainder) = match rest.find('\n') {
        Some(idx) => (&rest[..idx], &rest[idx + 1..]),
        None => (rest, ""),
    };
    first_line.trim().is_empty().then_some(remainder)
}

fn parse_yaml(yaml: &str) -> Result<FrontMatter> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::default());
    }

    let value: Value = serde_yaml::from_str(yaml)
        .map_err(|e| LlmsTxtError::parse(format!("front matter: {e}")))?;
    let map = match value {
        Value::Mapping(map) => map,
        Value::Null => return Ok(FrontMatter::default()),
        _ => return Err(LlmsTxtError::parse("front matter is not a mapping")),
    };

    let get = |key: &str| map.get(key).filter(|v| !v.is_null());
    let text = |key: &str| get(key).and_then(scalar_text).filter(|s| !s.is_empty());

    Ok(FrontMatter {
        title: text("title"),
        description: text("description").or_else(|| text("excerpt")),
        tags: get("tags")
            .or_else(|| get("categories"))
            .map(tag_list)
            .unwrap_or_default(),
        author: text("author"),
        language: text("language").or_else(|| text("lang")),
        content_type: text("type"),
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn tag_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}
