//! Per-job temporary files.
//!
//! Input that arrives as bytes (drag-and-drop) has no path the external tool
//! can open, so it is written into a job directory under the temp root. The
//! embedded tool payload is staged there too when no installed script is
//! configured. The directory is removed when the job ends.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Errors from temp file operations.
#[derive(Error, Debug)]
pub enum TempFileError {
    #[error("Failed to create temp directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write temp file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove '{path}': {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid temp file name: '{0}'")]
    InvalidName(String),
}

/// Script or binary run by the external tool's runtime.
#[derive(Debug, Clone)]
pub struct ToolPayload {
    /// File name used when staging.
    pub file_name: String,
    /// File contents.
    pub bytes: Cow<'static, [u8]>,
}

impl ToolPayload {
    /// Payload compiled into the binary.
    pub fn embedded(file_name: impl Into<String>, bytes: &'static [u8]) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: Cow::Borrowed(bytes),
        }
    }

    /// Payload built at runtime.
    pub fn owned(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: Cow::Owned(bytes),
        }
    }
}

/// A unique job directory under the temp root.
#[derive(Debug)]
pub struct TempFiles {
    job_id: String,
    job_dir: PathBuf,
    staged_payload: Option<PathBuf>,
}

impl TempFiles {
    /// Create `<root>/<uuid>`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, TempFileError> {
        let job_id = Uuid::new_v4().to_string();
        let job_dir = root.as_ref().join(&job_id);

        fs::create_dir_all(&job_dir).map_err(|source| TempFileError::CreateDir {
            path: job_dir.clone(),
            source,
        })?;

        tracing::debug!("Created temp dir {}", job_dir.display());

        Ok(Self {
            job_id,
            job_dir,
            staged_payload: None,
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    /// Write `bytes` to `<job dir>/<name>`, replacing any stale file.
    ///
    /// Only the final component of `name` is used.
    pub fn materialize(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, TempFileError> {
        let file_name = Path::new(name)
            .file_name()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| TempFileError::InvalidName(name.to_string()))?;

        let path = self.job_dir.join(file_name);
        fs::write(&path, bytes).map_err(|source| TempFileError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("Materialized {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Delete a file. Already missing is not an error.
    pub fn remove(&self, path: &Path) -> Result<(), TempFileError> {
        remove_file_if_exists(path)
    }

    /// Write the tool payload once and return its path.
    ///
    /// Later calls return the cached path without touching the disk.
    pub fn stage_payload(&mut self, payload: &ToolPayload) -> Result<PathBuf, TempFileError> {
        if let Some(path) = &self.staged_payload {
            return Ok(path.clone());
        }

        let path = self.materialize(&payload.file_name, &payload.bytes)?;
        self.staged_payload = Some(path.clone());
        Ok(path)
    }

    /// Path of the staged payload, if any.
    pub fn staged_payload(&self) -> Option<&Path> {
        self.staged_payload.as_deref()
    }

    /// Remove the job directory and everything in it.
    pub fn cleanup(&mut self) {
        self.staged_payload = None;
        if !self.job_dir.exists() {
            return;
        }
        match fs::remove_dir_all(&self.job_dir) {
            Ok(()) => tracing::debug!("Removed temp dir {}", self.job_dir.display()),
            Err(e) => tracing::warn!(
                "Failed to remove temp dir {}: {}",
                self.job_dir.display(),
                e
            ),
        }
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Delete a file, treating "not found" as success.
pub fn remove_file_if_exists(path: &Path) -> Result<(), TempFileError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(TempFileError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn job_dirs_are_unique() {
        let root = tempdir().unwrap();
        let a = TempFiles::new(root.path()).unwrap();
        let b = TempFiles::new(root.path()).unwrap();

        assert_ne!(a.job_dir(), b.job_dir());
        assert!(a.job_dir().is_dir());
        assert!(a.job_dir().starts_with(root.path()));
    }

    #[test]
    fn materialize_writes_bytes() {
        let root = tempdir().unwrap();
        let temp = TempFiles::new(root.path()).unwrap();

        let path = temp.materialize("clip.wav", &[1, 2, 3]).unwrap();
        assert_eq!(path.file_name().unwrap(), "clip.wav");
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn materialize_overwrites_stale_file() {
        let root = tempdir().unwrap();
        let temp = TempFiles::new(root.path()).unwrap();

        temp.materialize("clip.wav", b"old contents").unwrap();
        let path = temp.materialize("clip.wav", b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn materialize_strips_directories() {
        let root = tempdir().unwrap();
        let temp = TempFiles::new(root.path()).unwrap();

        let path = temp.materialize("../../etc/clip.wav", b"x").unwrap();
        assert_eq!(path.parent().unwrap(), temp.job_dir());
    }

    #[test]
    fn materialize_rejects_empty_name() {
        let root = tempdir().unwrap();
        let temp = TempFiles::new(root.path()).unwrap();

        assert!(matches!(
            temp.materialize("", b"x"),
            Err(TempFileError::InvalidName(_))
        ));
        assert!(temp.materialize("..", b"x").is_err());
    }

    #[test]
    fn remove_missing_file_is_ok() {
        let root = tempdir().unwrap();
        let temp = TempFiles::new(root.path()).unwrap();

        let path = temp.materialize("clip.wav", b"x").unwrap();
        temp.remove(&path).unwrap();
        assert!(!path.exists());
        temp.remove(&path).unwrap();
    }

    #[test]
    fn payload_is_staged_once() {
        let root = tempdir().unwrap();
        let mut temp = TempFiles::new(root.path()).unwrap();
        let payload = ToolPayload::embedded("chopper.py", b"print('hi')\n");

        let first = temp.stage_payload(&payload).unwrap();
        fs::write(&first, b"edited").unwrap();

        let second = temp.stage_payload(&payload).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read(&second).unwrap(), b"edited");
        assert_eq!(temp.staged_payload(), Some(first.as_path()));
    }

    #[test]
    fn drop_removes_job_dir() {
        let root = tempdir().unwrap();
        let job_dir = {
            let temp = TempFiles::new(root.path()).unwrap();
            temp.materialize("clip.wav", b"x").unwrap();
            temp.job_dir().to_path_buf()
        };
        assert!(!job_dir.exists());
    }

    #[test]
    fn cleanup_is_repeatable() {
        let root = tempdir().unwrap();
        let mut temp = TempFiles::new(root.path()).unwrap();
        temp.cleanup();
        temp.cleanup();
        assert!(!temp.job_dir().exists());
    }
}
