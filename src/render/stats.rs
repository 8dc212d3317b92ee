//! Content statistics for an analyzed document.

use serde::{Deserialize, Serialize};

use super::visitor::{walk_document, ElementVisitor, VisitorAction};
use crate::model::{
    AnalyzedDocument, Aside, ImageElement, PageResult, Table, TextBlock, TextList, TextListItem,
};

/// Counts of what the analysis found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Total number of pages analyzed
    pub page_count: u32,

    /// Pages that failed
    pub failed_page_count: u32,

    /// Text blocks outside lists and tables
    pub block_count: u32,

    pub heading_count: u32,

    pub list_count: u32,

    pub list_item_count: u32,

    pub table_count: u32,

    pub image_count: u32,

    pub aside_count: u32,

    /// Approximate word count (whitespace-separated tokens)
    pub word_count: u32,

    /// Character count (excluding whitespace)
    pub char_count: u32,
}

impl AnalysisStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect statistics over every analyzed page.
    pub fn from_document(doc: &AnalyzedDocument) -> Self {
        let mut stats = Self::new();
        walk_document(&mut stats, doc);
        stats.failed_page_count = doc.failures.len() as u32;
        stats
    }

    /// Add word and character counts from text.
    pub fn count_text(&mut self, text: &str) {
        self.word_count += text.split_whitespace().count() as u32;
        self.char_count += text.chars().filter(|c| !c.is_whitespace()).count() as u32;
    }

    /// Merge another stats instance into this one.
    pub fn merge(&mut self, other: &AnalysisStats) {
        self.page_count += other.page_count;
        self.failed_page_count += other.failed_page_count;
        self.block_count += other.block_count;
        self.heading_count += other.heading_count;
        self.list_count += other.list_count;
        self.list_item_count += other.list_item_count;
        self.table_count += other.table_count;
        self.image_count += other.image_count;
        self.aside_count += other.aside_count;
        self.word_count += other.word_count;
        self.char_count += other.char_count;
    }
}

impl ElementVisitor for AnalysisStats {
    fn on_page_start(&mut self, _page: &PageResult) {
        self.page_count += 1;
    }

    fn visit_text_block(&mut self, block: &TextBlock, _depth: usize) -> VisitorAction {
        self.block_count += 1;
        if block.is_heading() {
            self.heading_count += 1;
        }
        self.count_text(block.text());
        VisitorAction::Continue
    }

    fn visit_list(&mut self, _list: &TextList, _depth: usize) -> VisitorAction {
        self.list_count += 1;
        VisitorAction::Continue
    }

    fn visit_list_item(&mut self, item: &TextListItem, _depth: usize) -> VisitorAction {
        self.list_item_count += 1;
        for element in &item.items {
            self.count_text(&element.plain_text());
        }
        VisitorAction::SkipChildren
    }

    fn visit_table(&mut self, table: &Table, _depth: usize) -> VisitorAction {
        self.table_count += 1;
        self.count_text(&table.plain_text());
        VisitorAction::SkipChildren
    }

    fn visit_aside(&mut self, _aside: &Aside, _depth: usize) -> VisitorAction {
        self.aside_count += 1;
        VisitorAction::Continue
    }

    fn visit_image(&mut self, _image: &ImageElement, _depth: usize) -> VisitorAction {
        self.image_count += 1;
        VisitorAction::Continue
    }
}
