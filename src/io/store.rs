use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::model::document::Document;
use crate::parse::{ParseError, parse_document, serialize_document};

/// Modification times closer than this are treated as unchanged
const MODIFIED_TOLERANCE: Duration = Duration::from_secs(1);

/// Error type for backing store I/O
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} changed on disk during the update")]
    Changed { path: PathBuf },
    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Durable home of a document.
///
/// Structural mutation happens on the in-memory [`Document`] (see
/// `ops::task_ops`); the store only loads, persists, and reports whether
/// someone else changed the file since the last load or save.
pub trait BackingStore {
    fn read(&mut self) -> Result<Document, StoreError>;
    fn write(&mut self, doc: &Document) -> Result<(), StoreError>;
    /// True when the durable copy changed since the last `read`/`write`
    fn check_modified(&self) -> bool;
    /// Path shown to the user and used for the recent-file registry
    fn path(&self) -> &Path;
}

/// A markdown file on the local filesystem
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore {
            path: path.into(),
            last_modified: None,
        }
    }

    fn current_mtime(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }
}

impl BackingStore for FileStore {
    fn read(&mut self) -> Result<Document, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "file missing, starting from default document");
                Document::default_content().to_string()
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let doc = parse_document(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        self.last_modified = self.current_mtime();
        Ok(doc)
    }

    fn write(&mut self, doc: &Document) -> Result<(), StoreError> {
        let content = serialize_document(doc);
        atomic_write(&self.path, content.as_bytes()).map_err(|source| {
            warn!(path = %self.path.display(), error = %source, "write failed");
            StoreError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        self.last_modified = self.current_mtime();
        debug!(path = %self.path.display(), bytes = content.len(), "saved");
        Ok(())
    }

    fn check_modified(&self) -> bool {
        let Some(now) = self.current_mtime() else {
            // Deleted (or never created) files do not count as changed
            return false;
        };
        match self.last_modified {
            Some(seen) => {
                let drift = now.duration_since(seen).unwrap_or_else(|e| e.duration());
                drift > MODIFIED_TOLERANCE
            }
            None => true,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
