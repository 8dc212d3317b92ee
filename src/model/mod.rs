//! Document model types for layout analysis.
//!
//! Input types ([`RawPage`], [`RawPrimitive`]) describe what the document
//! reader hands over: positioned text runs, drawings and images. Output
//! types ([`LayoutElement`], [`PageResult`], [`AnalyzedDocument`]) describe
//! the ordered semantic tree produced for each page.

mod document;
mod element;
mod font;
mod page;
mod primitive;
mod table;
mod text;

pub use document::{
    AnalysisProfile, AnalyzedDocument, Outline, OutlineItem, PageFailure, PageHierarchyEntry,
};
pub use element::{
    Aside, DrawingElement, ImageElement, LayoutElement, LayoutElementGroup, PageSection, TextList,
    TextListItem,
};
pub use font::{FontInfo, SIZE_EPSILON};
pub use page::PageResult;
pub use primitive::{
    Drawing, DrawingHint, DrawingKind, Image, Primitive, RawPage, RawPrimitive, TextRun,
};
pub use table::{Table, TableCell, TableStrategy};
pub use text::{Line, Span, TextBlock, TextBlockType};
