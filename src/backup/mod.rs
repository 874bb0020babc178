use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, info};
use walkdir::WalkDir;

use crate::error::{Result, UpdaterError};

/// Timestamp suffix used in backup folder names, e.g. `20250401_103000`.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Sibling folder `<folder>_backup_<stamp>`.
pub fn backup_path(folder: &Path, stamp: &str) -> PathBuf {
    let resolved = fs::canonicalize(folder).unwrap_or_else(|_| folder.to_path_buf());
    let name = resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mods".into());
    let parent = resolved.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{name}_backup_{stamp}"))
}

/// Recursively copy `folder` into `dest`, which must not exist yet.
pub fn create_backup_at(folder: &Path, dest: &Path) -> Result<PathBuf> {
    if !folder.is_dir() {
        return Err(UpdaterError::BackupFailed(format!(
            "{} is not a directory",
            folder.display()
        )));
    }
    fs::create_dir(dest).map_err(|e| {
        UpdaterError::BackupFailed(format!("cannot create {}: {e}", dest.display()))
    })?;

    let mut copied = 0usize;
    for entry in WalkDir::new(folder).min_depth(1) {
        let entry = entry.map_err(|e| UpdaterError::BackupFailed(format!("walk error: {e}")))?;
        let relative = entry
            .path()
            .strip_prefix(folder)
            .map_err(|e| UpdaterError::BackupFailed(e.to_string()))?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| {
                UpdaterError::BackupFailed(format!("cannot create {}: {e}", target.display()))
            })?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| {
                UpdaterError::BackupFailed(format!(
                    "cannot copy {}: {e}",
                    entry.path().display()
                ))
            })?;
            copied += 1;
        }
        debug!("backup: {}", relative.display());
    }

    info!("backup: copied {copied} files to {}", dest.display());
    Ok(dest.to_path_buf())
}
