//! Filesystem helpers for saving export artifacts

use crate::config::FileCollisionAction;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Highest ` (n)` suffix tried before giving up
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Get a unique path for a file, handling collisions according to the specified action
///
/// Returns `Ok(None)` when the file exists and the action is
/// [`FileCollisionAction::Skip`]. For Rename a ` (n)` suffix is added to the
/// stem; Overwrite always returns the original path.
///
/// # Examples
///
/// ```
/// use qbo_sync::utils::get_unique_path;
/// use qbo_sync::config::FileCollisionAction;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/Acme_USA_invoice.xlsx");
/// let unique = get_unique_path(path, FileCollisionAction::Rename).unwrap();
/// // If the file exists, returns /tmp/Acme_USA_invoice (1).xlsx, and so on
/// ```
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> Result<Option<PathBuf>> {
    if !path.exists() || action == FileCollisionAction::Overwrite {
        return Ok(Some(path.to_path_buf()));
    }
    if action == FileCollisionAction::Skip {
        return Ok(None);
    }

    let invalid = |what: &str| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("no {what} in {}", path.display()),
        ))
    };
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| invalid("file stem"))?;
    let parent = path.parent().ok_or_else(|| invalid("parent directory"))?;
    let suffix = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    (1..=MAX_RENAME_ATTEMPTS)
        .map(|n| parent.join(format!("{stem} ({n}){suffix}")))
        .find(|candidate| !candidate.exists())
        .map(|candidate| Ok(Some(candidate)))
        .unwrap_or_else(|| {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!(
                    "{} still collides after {MAX_RENAME_ATTEMPTS} renames",
                    path.display()
                ),
            )))
        })
}

/// Make an artifact name safe to use as a single path component
///
/// Path separators, reserved characters and control characters become `_`.
/// Leading dots are stripped so the result is never hidden or `..`.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "export".to_string()
    } else {
        trimmed.to_string()
    }
}
