//! Saved-state files.
//!
//! Resume data, settings, and other persisted trees are written bencoded.
//! Saves go through a sibling temporary file and a rename so that a crash
//! mid-write never leaves a half-written state file behind.

use std::fs;
use std::io::Write;
use std::path::Path;

use riptide_variant::Variant;
use thiserror::Error;
use tracing::{debug, warn};

use crate::decode::decode;
use crate::encode::encode;
use crate::error::DecodeError;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt state file: {0}")]
    Corrupt(#[from] DecodeError),
}

/// Writes `value` to `path` atomically. The payload lands in `<path>.tmp`
/// first and is renamed into place, so readers only ever observe the old
/// contents or the new.
pub fn save_file(path: &Path, value: &Variant<'_>) -> Result<(), FileError> {
    let payload = encode(value);
    let tmp = tmp_path(path);

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    match result {
        Ok(()) => {
            debug!(path = %path.display(), bytes = payload.len(), "saved state file");
            Ok(())
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to save state file");
            // Best effort; the rename may have failed with the tmp intact.
            let _ = fs::remove_file(&tmp);
            Err(err.into())
        }
    }
}

/// Reads and parses the state file at `path`. A file that exists but does
/// not parse is reported as [`FileError::Corrupt`]; callers treat that the
/// same as a missing file and start from no prior state.
pub fn load_file(path: &Path) -> Result<Variant<'static>, FileError> {
    let payload = fs::read(path)?;
    match decode(&payload) {
        Ok(value) => {
            debug!(path = %path.display(), bytes = payload.len(), "loaded state file");
            Ok(value)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring corrupt state file");
            Err(err.into())
        }
    }
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    name.into()
}
