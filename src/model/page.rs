//! Page-level results.

use serde::Serialize;

use super::LayoutElement;

/// The analyzed content of one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    /// 0-based page index
    pub index: usize,

    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Content in reading order
    pub elements: Vec<LayoutElement>,

    /// Recurring top-of-page content, kept out of the reading order
    pub header: Vec<LayoutElement>,

    /// Recurring bottom-of-page content, kept out of the reading order
    pub footer: Vec<LayoutElement>,

    /// Printed page label taken from a numeric header or footer
    pub page_label: Option<String>,

    /// Recoverable problems met while analyzing the page
    pub warnings: Vec<String>,
}

impl PageResult {
    /// Create an empty result for a page.
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            number: index as u32 + 1,
            width,
            height,
            elements: Vec::new(),
            header: Vec::new(),
            footer: Vec::new(),
            page_label: None,
            warnings: Vec::new(),
        }
    }

    /// Get plain text content of the page.
    pub fn plain_text(&self) -> String {
        self.elements
            .iter()
            .map(LayoutElement::plain_text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Check if the page has no ordered content.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Record a recoverable problem.
    pub fn warn(&mut self, warning: impl std::fmt::Display) {
        self.warnings.push(warning.to_string());
    }

    /// Get page dimensions as (width, height) tuple.
    pub fn dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_page_new() {
        let page = PageResult::new(4, 612.0, 792.0);
        assert_eq!(page.number, 5);
        assert!(page.is_empty());
        assert_eq!(page.dimensions(), (612.0, 792.0));
    }

    #[test]
    fn test_warn_uses_error_display() {
        let mut page = PageResult::new(0, 612.0, 792.0);
        page.warn(Error::StatisticsUnavailable(0));
        assert_eq!(page.warnings, vec!["Page 0 has no text primitives"]);
    }
}
