//! # pageflow
//!
//! Layout analysis and reading-order reconstruction for positioned page
//! content.
//!
//! A document reader hands over, per page, positioned text runs, vector
//! drawings and images. pageflow groups them into lines and blocks, finds
//! columns, asides, headers and footers, linearises everything into the
//! order a person would read it, assigns heading levels, assembles lists,
//! merges detected tables and builds a heading hierarchy for the whole
//! document.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pageflow::{analyze_file, render};
//!
//! fn main() -> pageflow::Result<()> {
//!     let doc = analyze_file("document.json")?;
//!
//!     let json = render::to_json(&doc, render::JsonFormat::Pretty)?;
//!     println!("{}", json);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Reading order**: multi-column layouts, page-width bands and asides
//! - **Text roles**: heading levels from document font statistics
//! - **Lists and tables**: labelled blocks become lists; ruled grids and
//!   pluggable detectors become tables
//! - **Parallel processing**: pages run on a Rayon pool and come back in
//!   page order
//! - **Fault isolation**: a failing page never takes its siblings down

pub mod engine;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod render;
pub mod source;

// Re-export commonly used types
pub use engine::{Engine, EngineOptions, PageSelection};
pub use error::{Error, Result};
pub use geometry::BoundingBox;
pub use layout::{CleanupOptions, CleanupPreset, TableCandidate, TableDetector, TablePage};
pub use model::{
    AnalyzedDocument, Aside, FontInfo, LayoutElement, Outline, PageFailure, PageHierarchyEntry,
    PageResult, RawPage, RawPrimitive, Table, TableStrategy, TextBlock, TextBlockType, TextList,
};
pub use render::{AnalysisStats, JsonFormat};
pub use source::{PageSource, RawDocument};

use std::path::Path;

/// Analyze every page of a document with default options.
///
/// # Example
///
/// ```
/// use pageflow::{analyze, FontInfo, RawPage, RawPrimitive};
///
/// let page = RawPage::letter().with(RawPrimitive::text(
///     "Hello",
///     FontInfo::new("Helvetica", 12.0),
///     [72.0, 72.0, 110.0, 84.0],
/// ));
/// let doc = analyze(&vec![page]).unwrap();
/// assert_eq!(doc.plain_text(), "Hello");
/// ```
pub fn analyze<S: PageSource + ?Sized>(source: &S) -> Result<AnalyzedDocument> {
    Engine::default().analyze(source)
}

/// Analyze a document with custom options.
///
/// # Example
///
/// ```no_run
/// use pageflow::{analyze_with_options, EngineOptions, PageSelection, RawDocument};
///
/// let doc = RawDocument::from_path("document.json")?;
/// let options = EngineOptions::new()
///     .with_pages(PageSelection::parse("1-5")?)
///     .sequential();
/// let result = analyze_with_options(&doc, options)?;
/// # Ok::<(), pageflow::Error>(())
/// ```
pub fn analyze_with_options<S: PageSource + ?Sized>(
    source: &S,
    options: EngineOptions,
) -> Result<AnalyzedDocument> {
    Engine::new(options).analyze(source)
}

/// Load a JSON page file and analyze it.
///
/// # Example
///
/// ```no_run
/// use pageflow::analyze_file;
///
/// let doc = analyze_file("document.json").unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn analyze_file<P: AsRef<Path>>(path: P) -> Result<AnalyzedDocument> {
    let source = RawDocument::from_path(path)?;
    analyze(&source)
}

/// Load a JSON page file and analyze it with custom options.
pub fn analyze_file_with_options<P: AsRef<Path>>(
    path: P,
    options: EngineOptions,
) -> Result<AnalyzedDocument> {
    let source = RawDocument::from_path(path)?;
    analyze_with_options(&source, options)
}

/// Extract reading-order plain text from a JSON page file.
///
/// # Example
///
/// ```no_run
/// use pageflow::extract_text;
///
/// let text = extract_text("document.json").unwrap();
/// println!("{}", text);
/// ```
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let doc = analyze_file(path)?;
    render::to_text(&doc)
}

/// Analyze a JSON page file and render it as JSON.
///
/// # Example
///
/// ```no_run
/// use pageflow::{to_json, JsonFormat};
///
/// let json = to_json("document.json", JsonFormat::Pretty).unwrap();
/// std::fs::write("output.json", json).unwrap();
/// ```
pub fn to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let doc = analyze_file(path)?;
    render::to_json(&doc, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{"pages": [
        {"width": 612, "height": 792, "primitives": [
            {"kind": "text", "text": "Report", "font": {"name": "Helvetica-Bold", "size": 24}, "bbox": [72, 72, 200, 96]},
            {"kind": "text", "text": "The body of the report.", "font": {"name": "Helvetica", "size": 12}, "bbox": [72, 110, 300, 122]},
            {"kind": "text", "text": "More body text follows.", "font": {"name": "Helvetica", "size": 12}, "bbox": [72, 124, 300, 136]}
        ]}
    ]}"#;

    fn sample_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_analyze_file() {
        let file = sample_file();
        let doc = analyze_file(file.path()).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.hierarchy.len(), 1);
        assert_eq!(doc.hierarchy[0].text, "Report");
    }

    #[test]
    fn test_extract_text() {
        let file = sample_file();
        let text = extract_text(file.path()).unwrap();
        assert!(text.starts_with("Report\n\n"));
        assert!(text.contains("The body of the report."));
    }

    #[test]
    fn test_to_json_compact() {
        let file = sample_file();
        let json = to_json(file.path(), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));
        assert!(json.contains("\"name\":\"textblock\""));
        assert!(!json.contains("\"bbox\""));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(analyze_file("/nonexistent/pages.json"), Err(Error::Io(_))));
    }
}
