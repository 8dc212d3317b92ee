//! Page hierarchy: the heading outline across all pages.

use crate::model::{LayoutElement, LayoutElementGroup, PageHierarchyEntry, PageResult, TextBlock};

/// Number of heading levels tracked.
const LEVELS: usize = 5;

/// Collect every heading in page order, numbering them the way a nested
/// outline does: a heading bumps its own level's counter and resets all
/// deeper ones.
pub fn build_hierarchy(pages: &[PageResult]) -> Vec<PageHierarchyEntry> {
    let mut counters = [0u32; LEVELS];
    let mut entries = Vec::new();

    let mut push = |page: usize, index: (usize, Option<usize>), block: &TextBlock| {
        let Some(level) = block.kind().heading_level() else {
            return;
        };
        let depth = (level as usize).clamp(1, LEVELS);
        counters[depth - 1] += 1;
        for deeper in counters.iter_mut().skip(depth) {
            *deeper = 0;
        }
        entries.push(PageHierarchyEntry {
            page,
            index,
            text: block.text().to_string(),
            size: block.font_size(),
            level,
            assigned_heading: block.kind(),
            number: counters[..depth].to_vec(),
        });
    };

    for page in pages {
        for (i, element) in page.elements.iter().enumerate() {
            match element {
                LayoutElement::TextBlock(block) => push(page.index, (i, None), block),
                LayoutElement::Aside(aside) => {
                    for (j, item) in aside.items().iter().enumerate() {
                        if let Some(block) = item.as_text_block() {
                            push(page.index, (i, Some(j)), block);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    log::debug!("Built hierarchy with {} headings", entries.len());
    entries
}
