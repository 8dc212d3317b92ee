//! Plain text rendering of the reading order.

use super::visitor::{walk_elements, ElementVisitor, VisitorAction};
use crate::error::Result;
use crate::model::{AnalyzedDocument, Aside, PageResult, Table, TextBlock, TextListItem};

/// Indentation per aside level.
const ASIDE_INDENT: &str = "    ";

/// Convert a document to plain text, one blank line between blocks.
pub fn to_text(doc: &AnalyzedDocument) -> Result<String> {
    let output = doc
        .pages
        .iter()
        .map(page_to_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    Ok(output.trim().to_string())
}

/// Convert one page to plain text.
pub fn page_to_text(page: &PageResult) -> String {
    let mut writer = TextWriter::default();
    walk_elements(&mut writer, &page.elements);
    writer.flush_list();
    writer.blocks.join("\n\n")
}

#[derive(Default)]
struct TextWriter {
    blocks: Vec<String>,
    asides: usize,
    /// Lines of the list being written
    list: Vec<String>,
}

impl TextWriter {
    fn push(&mut self, text: &str) {
        let prefix = ASIDE_INDENT.repeat(self.asides);
        let indented = text
            .lines()
            .map(|l| format!("{}{}", prefix, l))
            .collect::<Vec<_>>()
            .join("\n");
        if !indented.trim().is_empty() {
            self.blocks.push(indented);
        }
    }

    fn flush_list(&mut self) {
        if !self.list.is_empty() {
            let list = std::mem::take(&mut self.list).join("\n");
            self.push(&list);
        }
    }
}

impl ElementVisitor for TextWriter {
    fn visit_text_block(&mut self, block: &TextBlock, _depth: usize) -> VisitorAction {
        self.flush_list();
        self.push(block.text());
        VisitorAction::Continue
    }

    fn visit_list_item(&mut self, item: &TextListItem, _depth: usize) -> VisitorAction {
        let body = item
            .items
            .iter()
            .map(|e| e.plain_text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        self.list.push(format!("{} {}", item.label, body));
        VisitorAction::SkipChildren
    }

    fn visit_table(&mut self, table: &Table, _depth: usize) -> VisitorAction {
        self.flush_list();
        self.push(&table.plain_text());
        VisitorAction::SkipChildren
    }

    fn visit_aside(&mut self, _aside: &Aside, _depth: usize) -> VisitorAction {
        self.flush_list();
        self.asides += 1;
        VisitorAction::Continue
    }

    fn leave_aside(&mut self, _aside: &Aside, _depth: usize) {
        self.flush_list();
        self.asides = self.asides.saturating_sub(1);
    }
}
