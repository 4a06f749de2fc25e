//! JSON settings files.
//!
//! Same atomic-rename discipline as the binary state files, but human
//! readable: saves are always pretty-printed.

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

    #[error("corrupt settings file: {0}")]
    Corrupt(#[from] DecodeError),
}

/// Writes `value` to `path` as pretty JSON, atomically via `<path>.tmp`.
pub fn save_file(path: &Path, value: &Variant<'_>) -> Result<(), FileError> {
    let payload = encode(value, true);
    let tmp = tmp_path(path);

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    match result {
        Ok(()) => {
            debug!(path = %path.display(), bytes = payload.len(), "saved settings file");
            Ok(())
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to save settings file");
            let _ = fs::remove_file(&tmp);
            Err(err.into())
        }
    }
}

/// Reads and parses the settings file at `path`. A corrupt file is an error
/// the caller treats as no prior settings.
pub fn load_file(path: &Path) -> Result<Variant<'static>, FileError> {
    let payload = fs::read(path)?;
    match decode(&payload) {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring corrupt settings file");
            Err(err.into())
        }
    }
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    name.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Variant::new_dict();
        settings.insert("peer-port", Variant::Int(51413)).unwrap();
        settings.insert("dht-enabled", Variant::Bool(true)).unwrap();

        save_file(&path, &settings).unwrap();
        let loaded = load_file(&path).unwrap();
        assert_eq!(loaded.get_int("peer-port"), Some(51413));
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_saved_file_is_pretty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Variant::new_dict();
        settings.insert("peer-port", Variant::Int(51413)).unwrap();
        save_file(&path, &settings).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n    \"peer-port\": 51413\n}\n");
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(
            load_file(&path),
            Err(FileError::Corrupt(_))
        ));
    }
}
