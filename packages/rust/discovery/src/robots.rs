//! `robots.txt` advisory block for the manifest.

use llmstxt_shared::GENERATOR_NAME;

/// Append an `Allow:` block for `manifest_file_name` to `content`.
///
/// Returns `None` when the content already mentions the file name (compared
/// case-insensitively), so repeated calls leave the file unchanged.
pub fn patch_robots(content: &str, manifest_file_name: &str) -> Option<String> {
    if content
        .to_lowercase()
        .contains(&manifest_file_name.to_lowercase())
    {
        return None;
    }

    let mut patched = String::with_capacity(content.len() + 160);
    patched.push_str(content);
    if !content.is_empty() && !content.ends_with('\n') {
        patched.push('\n');
    }
    patched.push_str(&allow_block(manifest_file_name));
    Some(patched)
}

fn allow_block(manifest_file_name: &str) -> String {
    format!(
        "\n# LLMs.txt for AI and language models\n# Learn more: https://llmstxt.org/\n# Generated by: {GENERATOR_NAME}\nAllow: /{manifest_file_name}\n"
    )
}
