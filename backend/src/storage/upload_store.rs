use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid file name")]
    InvalidFileName,
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Flat directory of uploaded images. Names are sanitized but not made
/// unique, so a second upload with the same name replaces the first.
#[derive(Clone, Debug)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })
    }

    /// Where `file_name` would be stored, or `InvalidFileName` when nothing
    /// survives sanitization.
    pub fn target_path(&self, file_name: &str) -> Result<PathBuf, StorageError> {
        let safe_name = sanitize_filename(file_name);
        if safe_name.is_empty() {
            return Err(StorageError::InvalidFileName);
        }
        Ok(self.dir.join(safe_name))
    }

    /// Creates (or truncates) the file `file_name` maps to, ready for the
    /// body to be written chunk by chunk.
    pub fn open(&self, file_name: &str) -> Result<UploadFile, StorageError> {
        let path = self.target_path(file_name)?;
        let file = File::create(&path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(UploadFile {
            path,
            file,
            written: 0,
        })
    }
}

/// An upload being written to disk.
#[derive(Debug)]
pub struct UploadFile {
    path: PathBuf,
    file: File,
    written: usize,
}

impl UploadFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.file
            .write_all(chunk)
            .map_err(|source| StorageError::Io {
                path: self.path.clone(),
                source,
            })?;
        self.written += chunk.len();
        Ok(())
    }
}

/// Reduces a client-supplied name to `[A-Za-z0-9_.-]` with no directory
/// components. May return an empty string.
pub fn sanitize_filename(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}
