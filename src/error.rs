//! Error types for pageflow.

use std::any::Any;
use std::io;
use thiserror::Error;

/// Result type alias for pageflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during layout analysis.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The page source could not be decoded.
    #[error("Invalid page source: {0}")]
    Source(String),

    /// A bounding box with non-finite or inverted coordinates.
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    /// A primitive has a degenerate or out-of-page bounding box.
    #[error("Malformed primitive {index} on page {page}: {reason}")]
    MalformedInput {
        /// 0-based page index
        page: usize,
        /// Position of the primitive in the page's primitive list
        index: usize,
        /// What was wrong with it
        reason: String,
    },

    /// A page has no text primitives to compute statistics from.
    #[error("Page {0} has no text primitives")]
    StatisticsUnavailable(usize),

    /// The table detector did not answer in time.
    #[error("Table detector '{strategy}' timed out after {timeout_ms} ms on page {page}")]
    CollaboratorTimeout {
        /// 0-based page index
        page: usize,
        /// Detector strategy tag
        strategy: String,
        /// Configured timeout
        timeout_ms: u128,
    },

    /// The table detector failed.
    #[error("Table detector failed on page {page}: {message}")]
    Collaborator {
        /// 0-based page index
        page: usize,
        /// Failure description
        message: String,
    },

    /// A page's pipeline hit an unrecoverable invariant violation.
    #[error("Page {page} failed: {message}")]
    PageTaskPanic {
        /// 0-based page index
        page: usize,
        /// Panic payload or violation description
        message: String,
    },

    /// Region precedence was cyclic; regions were ordered by position.
    #[error("Cyclic region graph on page {0}, regions ordered by position")]
    CyclicRegionGraph(usize),

    /// An aside was constructed with another aside inside it.
    #[error("An aside cannot contain another aside")]
    NestedAside,

    /// No pages were available for analysis.
    #[error("Document has no pages to analyze")]
    NoPages,

    /// None of the selected pages carries any primitive.
    #[error("Document contains no content")]
    NoContent,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// Error during rendering (JSON, text).
    #[error("Rendering error: {0}")]
    Render(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error only affects the page it was raised on.
    pub fn is_page_local(&self) -> bool {
        matches!(
            self,
            Error::MalformedInput { .. }
                | Error::StatisticsUnavailable(_)
                | Error::CollaboratorTimeout { .. }
                | Error::Collaborator { .. }
                | Error::PageTaskPanic { .. }
                | Error::CyclicRegionGraph(_)
        )
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
