//! Filesystem helpers shared by the stores.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use framemark_core::Result;
use tracing::{debug, warn};

/// Sibling path the new contents are staged in before the rename.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `data` so that readers see either the old or the
/// new contents, never a mix.
///
/// Parent directories are created as needed. On failure the previous file is
/// left untouched.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    debug!(path = %path.display(), size = data.len(), "atomic_write");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            warn!(parent = %parent.display(), error = %e, "atomic_write: create_dir_all failed");
            e
        })?;
    }

    // Atomic write: temp file + rename
    let temp_path = temp_path_for(path);
    let staged = fs::File::create(&temp_path).and_then(|mut file| {
        file.write_all(data)?;
        file.sync_all()
    });
    if let Err(e) = staged {
        warn!(temp_path = %temp_path.display(), error = %e, "atomic_write: staging failed");
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    fs::rename(&temp_path, path).map_err(|e| {
        warn!(from = %temp_path.display(), to = %path.display(), error = %e, "atomic_write: rename failed");
        let _ = fs::remove_file(&temp_path);
        e
    })?;

    Ok(())
}
