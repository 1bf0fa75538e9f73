//! Transcript backup file
//!
//! The backup is rewritten in full after every reply. Writes land in a
//! temporary file next to the target and are renamed over it, so a crash
//! mid-write leaves the previous backup intact.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

use super::turn::{Transcript, Turn};

/// Default backup file name
pub const DEFAULT_BACKUP_FILE: &str = "ChatHistoryBackup.txt";

/// Writes and reads the JSON transcript backup
#[derive(Debug, Clone)]
pub struct TranscriptBackup {
    path: PathBuf,
}

impl TranscriptBackup {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backup file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the backup with `transcript`
    ///
    /// # Errors
    ///
    /// Returns error if the temporary file cannot be written or renamed
    pub fn write(&self, transcript: &Transcript) -> Result<()> {
        write_json_atomic(&self.path, transcript)?;
        tracing::debug!(path = %self.path.display(), turns = transcript.len(), "transcript backup written");
        Ok(())
    }

    /// Load the last written transcript, if any
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(&self) -> Result<Option<Vec<Turn>>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Serialize `value` as pretty JSON into `path` via write-then-rename
///
/// # Errors
///
/// Returns error if serialization, the write, or the rename fails
pub fn write_json_atomic<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let backup = TranscriptBackup::new(dir.path().join("history.json"));

        let transcript = Transcript::from(vec![Turn::system("sys"), Turn::user("hi")]);
        backup.write(&transcript).unwrap();

        let loaded = backup.load().unwrap().unwrap();
        assert_eq!(loaded, vec![Turn::system("sys"), Turn::user("hi")]);
    }

    #[test]
    fn rewrite_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let backup = TranscriptBackup::new(dir.path().join("history.json"));

        backup
            .write(&Transcript::from(vec![Turn::user("a"), Turn::assistant("b")]))
            .unwrap();
        backup
            .write(&Transcript::from(vec![Turn::user("c")]))
            .unwrap();

        assert_eq!(backup.load().unwrap().unwrap(), vec![Turn::user("c")]);
        // No temporary files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_backup_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let backup = TranscriptBackup::new(dir.path().join("absent.json"));
        assert!(backup.load().unwrap().is_none());
    }

    #[test]
    fn corrupt_backup_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "[{\"role\":").unwrap();
        assert!(TranscriptBackup::new(path).load().is_err());
    }
}
