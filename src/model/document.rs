//! Document-level results.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::{PageResult, TextBlockType};
use crate::error::Error;
use crate::layout::FontStatistics;

/// The result of analyzing a document.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedDocument {
    /// Successfully analyzed pages in page order
    pub pages: Vec<PageResult>,

    /// Heading hierarchy across all pages
    pub hierarchy: Vec<PageHierarchyEntry>,

    /// Pages whose analysis failed
    pub failures: Vec<PageFailure>,

    /// Timing and scheduling information
    pub profile: AnalysisProfile,

    /// Document-wide font statistics
    pub font_statistics: FontStatistics,

    /// Whether output should carry bounding boxes and font statistics
    #[serde(skip)]
    pub detailed: bool,
}

impl AnalyzedDocument {
    /// Get the number of analyzed pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Get a page by number (1-indexed).
    pub fn get_page(&self, page_num: u32) -> Option<&PageResult> {
        self.pages.iter().find(|p| p.number == page_num)
    }

    /// Check if any page failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Get plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .map(PageResult::plain_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the nested heading outline.
    pub fn outline(&self) -> Outline {
        Outline::from_hierarchy(&self.hierarchy)
    }
}

/// A page whose pipeline failed; sibling pages are unaffected.
#[derive(Debug, Clone, Serialize)]
pub struct PageFailure {
    /// 0-based page index
    pub page: usize,

    #[serde(serialize_with = "serialize_display")]
    pub error: Arc<Error>,
}

impl PageFailure {
    pub fn new(page: usize, error: Error) -> Self {
        Self {
            page,
            error: Arc::new(error),
        }
    }
}

fn serialize_display<S: Serializer>(error: &Arc<Error>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error.as_ref())
}

/// One heading in the document hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageHierarchyEntry {
    /// 0-based page index
    pub page: usize,

    /// Position in the page's ordered sequence, plus the position inside an
    /// aside when the heading sits in one
    pub index: (usize, Option<usize>),

    pub text: String,

    /// Dominant font size of the heading
    pub size: f32,

    /// Heading level 1-5
    pub level: u8,

    pub assigned_heading: TextBlockType,

    /// Outline number, e.g. `[2, 1]` for the first sub-heading of the second
    /// top-level heading
    pub number: Vec<u32>,
}

/// Document outline (table of contents).
#[derive(Debug, Clone, Default, Serialize)]
pub struct Outline {
    /// Top-level outline items
    pub items: Vec<OutlineItem>,
}

impl Outline {
    /// Create a new empty outline.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Nest hierarchy entries by heading level.
    pub fn from_hierarchy(entries: &[PageHierarchyEntry]) -> Self {
        let mut outline = Outline::new();
        // Path of open items as indices from the top level down.
        let mut path: Vec<(u8, usize)> = Vec::new();

        for entry in entries {
            while path.last().map(|(lvl, _)| *lvl >= entry.level).unwrap_or(false) {
                path.pop();
            }
            let item = OutlineItem::from_entry(entry);

            let mut siblings = &mut outline.items;
            for (_, idx) in &path {
                siblings = &mut siblings[*idx].children;
            }
            siblings.push(item);
            path.push((entry.level, siblings.len() - 1));
        }
        outline
    }

    /// Add an item to the outline.
    pub fn add_item(&mut self, item: OutlineItem) {
        self.items.push(item);
    }

    /// Check if the outline is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the total number of items (including nested).
    pub fn total_items(&self) -> usize {
        fn count_items(items: &[OutlineItem]) -> usize {
            items
                .iter()
                .map(|item| 1 + count_items(&item.children))
                .sum()
        }
        count_items(&self.items)
    }
}

/// A single outline item.
#[derive(Debug, Clone, Serialize)]
pub struct OutlineItem {
    /// Item title
    pub title: String,

    /// Target page number (1-indexed)
    pub page: u32,

    /// Heading level (1 = top level)
    pub level: u8,

    /// Dotted outline number, e.g. "2.1"
    pub number: String,

    /// Child items
    pub children: Vec<OutlineItem>,
}

impl OutlineItem {
    fn from_entry(entry: &PageHierarchyEntry) -> Self {
        Self {
            title: entry.text.clone(),
            page: entry.page as u32 + 1,
            level: entry.level,
            number: entry
                .number
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join("."),
            children: Vec::new(),
        }
    }
}

/// Timing and scheduling information for one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisProfile {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,

    /// Time spent in the document statistics pass
    pub statistics_ms: u64,

    /// Time spent in the per-page pass
    pub pages_ms: u64,

    /// Worker threads used for the per-page pass
    pub workers: usize,
}

impl AnalysisProfile {
    /// Total wall-clock time of the run in milliseconds.
    pub fn elapsed_ms(&self) -> i64 {
        (self.finished - self.started).num_milliseconds()
    }
}
