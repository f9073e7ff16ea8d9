//! Where reduced documents are kept between sessions.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::report::Document;

/// Load and store a report document.
pub trait ReportStore {
    /// The stored document, or `None` if nothing was stored yet.
    fn load(&self) -> Result<Option<Document>>;

    /// Replace the stored document.
    fn store(&mut self, document: &Document) -> Result<()>;
}

/// In-memory store, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    document: Option<Document>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored document, if any.
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }
}

impl ReportStore for MemoryStore {
    fn load(&self) -> Result<Option<Document>> {
        Ok(self.document.clone())
    }

    fn store(&mut self, document: &Document) -> Result<()> {
        self.document = Some(document.clone());
        Ok(())
    }
}

/// A document stored as pretty-printed JSON in one file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`. The file is created on first store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportStore for JsonFileStore {
    fn load(&self) -> Result<Option<Document>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        Document::from_json_str(&text).map(Some)
    }

    fn store(&mut self, document: &Document) -> Result<()> {
        let text = document.to_json_string()?;
        fs::write(&self.path, text)?;
        log::debug!("report written to {}", self.path.display());
        Ok(())
    }
}
