//! Atomic JSON persistence for the daemon's state stores.
//!
//! Every store (queue, counter, schedule, session) is a single JSON file
//! replaced atomically on write: the new contents go to a temp file in the
//! same directory, the file is fsynced, then renamed over the final path.
//! A crash at any point leaves either the old complete file or the new
//! complete file, never a partial write.

use crate::error::{PosterError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Load a JSON state file.
///
/// Returns `Ok(None)` when the file does not exist; a present but unparsable
/// file is an error (the caller decides whether that is fatal).
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PosterError::Store(format!("cannot parse {}: {e}", path.display())))
}

/// Persist a value as pretty JSON via atomic replace-on-write.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| PosterError::Store(format!("cannot serialize {}: {e}", path.display())))?;

    let parent = path.parent().ok_or_else(|| {
        PosterError::Store(format!("path has no parent directory: {}", path.display()))
    })?;
    fs::create_dir_all(parent)?;

    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    // Make the rename itself durable.
    #[cfg(unix)]
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }

    Ok(())
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
