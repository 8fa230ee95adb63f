//! Filesystem helpers

use crate::{Error, Result};
use std::io::Write;
use std::path::Path;

/// Write `contents` to `path` atomically
///
/// The data goes to a temporary file in the same directory, is flushed and
/// synced, then renamed over the target. Readers see either the old file or
/// the new one, never a torn write.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(contents)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    temp_file
        .persist(path)
        .map_err(|e| Error::Io(e.error))?;

    tracing::debug!(path = %path.display(), bytes = contents.len(), "Atomic write complete");
    Ok(())
}

/// Serialize `value` as JSON and write it atomically
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec(value)?;
    write_atomic(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_file_and_parents() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("log.json");

        write_atomic(&target, b"{\"a\":1}").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("log.json");
        std::fs::write(&target, "old contents that are longer").unwrap();

        write_atomic(&target, b"new").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        // No stray temp files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_json_atomic() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("values.json");

        write_json_atomic(&target, &vec![1.5, 2.5]).unwrap();

        let loaded: Vec<f64> =
            serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(loaded, vec![1.5, 2.5]);
    }
}
