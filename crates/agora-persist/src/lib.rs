//! Shared persistence helpers for the Agora marketplace core.
//!
//! Both the content store and the escrow ledger keep their durable state
//! as JSON documents on the local filesystem. This crate provides the
//! common write path: every document is written to a temp file in the
//! destination directory and then renamed into place, so a reader never
//! observes a torn or half-written document and a crashed write leaves
//! the previous version intact.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Errors from persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Create a directory (and parents) if it does not exist.
pub fn ensure_dir(path: &Path) -> PersistResult<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Write raw bytes atomically: temp file in the same directory, then rename.
///
/// Overwrites any existing file at `path`. The rename is the commit point.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> PersistResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| PersistError::Io(e.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "persisted document");
    Ok(())
}

/// Serialize a value as pretty JSON.
///
/// Split out from [`write_json_atomic`] so callers that need all-or-nothing
/// multi-document updates can serialize everything before touching disk.
pub fn to_json_vec<T: Serialize>(value: &T) -> PersistResult<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| PersistError::Serialization(e.to_string()))
}

/// Serialize a value as pretty JSON and write it atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> PersistResult<()> {
    write_bytes_atomic(path, &to_json_vec(value)?)
}

/// Read and deserialize a JSON document.
///
/// Returns `Ok(None)` if the file does not exist. A present but
/// undecodable document is an error, not an empty result.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> PersistResult<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value =
        serde_json::from_slice(&bytes).map_err(|e| PersistError::Serialization(e.to_string()))?;
    Ok(Some(value))
}

/// Read a JSON document, initializing the file with a default value if missing.
pub fn read_json_or_init<T: DeserializeOwned + Serialize + Default>(
    path: &Path,
) -> PersistResult<T> {
    match read_json(path)? {
        Some(value) => Ok(value),
        None => {
            let value = T::default();
            write_json_atomic(path, &value)?;
            Ok(value)
        }
    }
}
