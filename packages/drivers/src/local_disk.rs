use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use vdoc_core::path;
use vdoc_driver::{DocumentStat, Driver, DriverError};

/// A driver mapping store addresses onto files below a root directory.
#[derive(Debug)]
pub struct LocalDriver {
    root: PathBuf,
}

fn not_found_is_none<T>(result: io::Result<T>) -> Result<Option<T>, DriverError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn modified(metadata: &fs::Metadata) -> Option<DateTime<Utc>> {
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

impl LocalDriver {
    /// Open a driver rooted at an existing, writable directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<LocalDriver, DriverError> {
        let root = root.into();
        let invalid = |message: &str| DriverError::InvalidAddress {
            uri: root.display().to_string(),
            message: message.to_string(),
        };

        let attr = fs::metadata(&root)?;
        if !attr.is_dir() {
            return Err(invalid("root path must be a directory"));
        }
        if attr.permissions().readonly() {
            return Err(invalid("root directory must be writable"));
        }

        Ok(LocalDriver {
            root: root.canonicalize()?,
        })
    }

    /// Directory every address resolves beneath.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, uri: &str) -> Result<PathBuf, DriverError> {
        let mut file_path = self.root.clone();
        for segment in path::segments(uri) {
            if segment == ".." || segment == "." {
                return Err(DriverError::InvalidAddress {
                    uri: uri.to_string(),
                    message: "path escapes the driver root".to_string(),
                });
            }
            file_path.push(segment);
        }
        Ok(file_path)
    }

    fn ensure_parent(file_path: &Path) -> Result<(), DriverError> {
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl Driver for LocalDriver {
    fn read(&mut self, uri: &str) -> Result<Option<Bytes>, DriverError> {
        let file_path = self.file_path(uri)?;
        tracing::debug!("Reading {}...", file_path.display());
        if file_path.is_dir() {
            return Ok(None);
        }
        Ok(not_found_is_none(fs::read(&file_path))?.map(Bytes::from))
    }

    fn write(&mut self, uri: &str, document: Bytes) -> Result<(), DriverError> {
        let file_path = self.file_path(uri)?;
        tracing::debug!("Writing {}...", file_path.display());
        Self::ensure_parent(&file_path)?;
        fs::write(&file_path, &document)?;
        Ok(())
    }

    fn append(&mut self, uri: &str, chunk: Bytes) -> Result<(), DriverError> {
        let file_path = self.file_path(uri)?;
        tracing::debug!("Appending {} bytes to {}...", chunk.len(), file_path.display());
        Self::ensure_parent(&file_path)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;
        file.write_all(&chunk)?;
        Ok(())
    }

    fn stat(&mut self, uri: &str) -> Result<DocumentStat, DriverError> {
        let file_path = self.file_path(uri)?;
        let metadata = match fs::symlink_metadata(&file_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DocumentStat::missing()),
            Err(e) => return Ok(DocumentStat::failed(e.to_string())),
        };
        let mtime = modified(&metadata);
        let file_type = metadata.file_type();
        Ok(if file_type.is_symlink() {
            DocumentStat::symlink(mtime)
        } else if file_type.is_dir() {
            DocumentStat::directory(mtime)
        } else {
            DocumentStat::file(metadata.len(), mtime)
        })
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), DriverError> {
        let from_path = self.file_path(from)?;
        let to_path = self.file_path(to)?;
        tracing::debug!("Moving {} to {}...", from_path.display(), to_path.display());
        Self::ensure_parent(&to_path)?;
        fs::rename(&from_path, &to_path)?;
        Ok(())
    }

    fn delete(&mut self, uri: &str) -> Result<(), DriverError> {
        let file_path = self.file_path(uri)?;
        if file_path == self.root {
            return Err(DriverError::InvalidAddress {
                uri: uri.to_string(),
                message: "refusing to delete the driver root".to_string(),
            });
        }
        tracing::debug!("Deleting {}...", file_path.display());
        let metadata = fs::symlink_metadata(&file_path)?;
        if metadata.is_dir() {
            fs::remove_dir_all(&file_path)?;
        } else {
            fs::remove_file(&file_path)?;
        }
        Ok(())
    }

    fn list_dir(&mut self, uri: &str) -> Result<Vec<String>, DriverError> {
        let file_path = self.file_path(uri)?;
        tracing::debug!("Listing {}...", file_path.display());
        let mut names = Vec::new();
        for entry in fs::read_dir(&file_path)? {
            let entry = entry?;
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}
