//! Rendering of analyzed documents: JSON, plain text and statistics.

mod json;
mod stats;
mod text;
pub mod visitor;

pub use json::{to_json, to_json_value, JsonFormat};
pub use stats::AnalysisStats;
pub use text::{page_to_text, to_text};
pub use visitor::{walk_document, walk_elements, ElementVisitor, VisitorAction};
