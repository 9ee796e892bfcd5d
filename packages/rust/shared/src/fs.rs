//! Filesystem helpers.

use std::path::{Path, PathBuf};

use crate::error::{LlmsTxtError, Result};

/// Write `contents` to `path` via a sibling temp file and a rename, creating
/// parent directories as needed.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LlmsTxtError::validation(format!("{} has no file name", path.display())))?;

    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        std::fs::create_dir_all(parent).map_err(|e| LlmsTxtError::io(parent, e))?;
    }

    let temp = match parent {
        Some(parent) => parent.join(format!(".{file_name}.tmp")),
        None => PathBuf::from(format!(".{file_name}.tmp")),
    };

    std::fs::write(&temp, contents).map_err(|e| LlmsTxtError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| LlmsTxtError::io(path, e))?;

    Ok(())
}
