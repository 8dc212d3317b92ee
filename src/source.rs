//! Page sources: where raw positioned primitives come from.
//!
//! The engine reads pages through the [`PageSource`] trait so that any
//! document reader can feed it. [`RawDocument`] is the built-in source for
//! the JSON interchange format:
//!
//! ```json
//! {"pages": [{"width": 612, "height": 792, "primitives": [
//!     {"kind": "text", "text": "Hello", "font": {"name": "Helvetica", "size": 12},
//!      "bbox": [72, 72, 110, 84]}
//! ]}]}
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::RawPage;

/// Random access to the pages of a document.
///
/// Implementations must be shareable across worker threads. Pages outside
/// the caller's selection are never requested.
pub trait PageSource: Sync {
    /// Total number of pages in the document.
    fn page_count(&self) -> usize;

    /// Load one page by 0-based index.
    fn load_page(&self, index: usize) -> Result<RawPage>;
}

/// A fully loaded document in the interchange format.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    pub pages: Vec<RawPage>,
}

impl RawDocument {
    /// Create a document from pages.
    pub fn new(pages: Vec<RawPage>) -> Self {
        Self { pages }
    }

    /// Load a document from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a document from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|e| Error::Source(e.to_string()))
    }

    /// Load a document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Source(e.to_string()))
    }

    /// Load a document from a JSON file without blocking the runtime.
    #[cfg(feature = "async")]
    pub async fn from_path_async<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read(path.as_ref()).await?;
        serde_json::from_slice(&data).map_err(|e| Error::Source(e.to_string()))
    }
}

impl PageSource for RawDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn load_page(&self, index: usize) -> Result<RawPage> {
        self.pages
            .get(index)
            .cloned()
            .ok_or(Error::PageOutOfRange(index as u32 + 1, self.pages.len() as u32))
    }
}

impl PageSource for Vec<RawPage> {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn load_page(&self, index: usize) -> Result<RawPage> {
        self.get(index)
            .cloned()
            .ok_or(Error::PageOutOfRange(index as u32 + 1, self.len() as u32))
    }
}
