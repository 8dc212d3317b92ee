//! Visitor pattern for walking analyzed pages.
//!
//! Implement [`ElementVisitor`] to collect or render whatever you need from
//! the ordered element tree without matching on every element kind.
//!
//! # Example
//!
//! ```
//! use pageflow::model::TextBlock;
//! use pageflow::render::visitor::{ElementVisitor, VisitorAction};
//!
//! struct Headings(Vec<String>);
//!
//! impl ElementVisitor for Headings {
//!     fn visit_text_block(&mut self, block: &TextBlock, _depth: usize) -> VisitorAction {
//!         if block.is_heading() {
//!             self.0.push(block.text().to_string());
//!         }
//!         VisitorAction::Continue
//!     }
//! }
//! ```

use crate::model::{
    AnalyzedDocument, Aside, DrawingElement, ImageElement, LayoutElement, LayoutElementGroup,
    PageResult, PageSection, Table, TextBlock, TextList, TextListItem,
};

/// Action returned by visitor methods to control the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisitorAction {
    /// Keep walking, descending into children.
    #[default]
    Continue,

    /// Do not descend into this element's children.
    SkipChildren,

    /// Stop the walk.
    Stop,
}

/// Trait for visiting layout elements.
///
/// `depth` is 0 for top-level elements of a page and grows by one for every
/// enclosing group. All methods continue by default.
pub trait ElementVisitor {
    fn on_page_start(&mut self, page: &PageResult) {
        let _ = page;
    }

    fn on_page_end(&mut self, page: &PageResult) {
        let _ = page;
    }

    fn visit_text_block(&mut self, block: &TextBlock, depth: usize) -> VisitorAction {
        let _ = (block, depth);
        VisitorAction::Continue
    }

    fn visit_list(&mut self, list: &TextList, depth: usize) -> VisitorAction {
        let _ = (list, depth);
        VisitorAction::Continue
    }

    fn visit_list_item(&mut self, item: &TextListItem, depth: usize) -> VisitorAction {
        let _ = (item, depth);
        VisitorAction::Continue
    }

    /// Children are the cell contents, row by row.
    fn visit_table(&mut self, table: &Table, depth: usize) -> VisitorAction {
        let _ = (table, depth);
        VisitorAction::Continue
    }

    fn visit_aside(&mut self, aside: &Aside, depth: usize) -> VisitorAction {
        let _ = (aside, depth);
        VisitorAction::Continue
    }

    /// Called after an aside's children, when they were walked.
    fn leave_aside(&mut self, aside: &Aside, depth: usize) {
        let _ = (aside, depth);
    }

    fn visit_section(&mut self, section: &PageSection, depth: usize) -> VisitorAction {
        let _ = (section, depth);
        VisitorAction::Continue
    }

    fn visit_image(&mut self, image: &ImageElement, depth: usize) -> VisitorAction {
        let _ = (image, depth);
        VisitorAction::Continue
    }

    fn visit_drawing(&mut self, drawing: &DrawingElement, depth: usize) -> VisitorAction {
        let _ = (drawing, depth);
        VisitorAction::Continue
    }
}

/// Walk every analyzed page in order. Header and footer content is not
/// part of the walk.
pub fn walk_document<V: ElementVisitor + ?Sized>(visitor: &mut V, doc: &AnalyzedDocument) {
    for page in &doc.pages {
        visitor.on_page_start(page);
        let action = walk_elements(visitor, &page.elements);
        visitor.on_page_end(page);
        if action == VisitorAction::Stop {
            break;
        }
    }
}

/// Walk a sequence of elements depth-first. Returns [`VisitorAction::Stop`]
/// when the visitor stopped the walk.
pub fn walk_elements<V: ElementVisitor + ?Sized>(
    visitor: &mut V,
    elements: &[LayoutElement],
) -> VisitorAction {
    walk_at(visitor, elements, 0)
}

fn walk_at<V: ElementVisitor + ?Sized>(
    visitor: &mut V,
    elements: &[LayoutElement],
    depth: usize,
) -> VisitorAction {
    for element in elements {
        if walk_one(visitor, element, depth) == VisitorAction::Stop {
            return VisitorAction::Stop;
        }
    }
    VisitorAction::Continue
}

fn walk_one<V: ElementVisitor + ?Sized>(
    visitor: &mut V,
    element: &LayoutElement,
    depth: usize,
) -> VisitorAction {
    let action = match element {
        LayoutElement::TextBlock(block) => visitor.visit_text_block(block, depth),
        LayoutElement::Image(image) => visitor.visit_image(image, depth),
        LayoutElement::Drawing(drawing) => visitor.visit_drawing(drawing, depth),
        LayoutElement::Section(section) => match visitor.visit_section(section, depth) {
            VisitorAction::Continue => walk_at(visitor, &section.items, depth + 1),
            other => other,
        },
        LayoutElement::Aside(aside) => match visitor.visit_aside(aside, depth) {
            VisitorAction::Continue => {
                let action = walk_at(visitor, aside.items(), depth + 1);
                visitor.leave_aside(aside, depth);
                action
            }
            other => other,
        },
        LayoutElement::TextList(list) => match visitor.visit_list(list, depth) {
            VisitorAction::Continue => {
                for item in &list.items {
                    let action = match visitor.visit_list_item(item, depth + 1) {
                        VisitorAction::Continue => walk_at(visitor, &item.items, depth + 2),
                        other => other,
                    };
                    if action == VisitorAction::Stop {
                        return VisitorAction::Stop;
                    }
                }
                VisitorAction::Continue
            }
            other => other,
        },
        LayoutElement::Table(table) => match visitor.visit_table(table, depth) {
            VisitorAction::Continue => {
                for cell in table.cells.iter().flatten() {
                    if walk_at(visitor, &cell.items, depth + 1) == VisitorAction::Stop {
                        return VisitorAction::Stop;
                    }
                }
                VisitorAction::Continue
            }
            other => other,
        },
    };
    match action {
        VisitorAction::Stop => VisitorAction::Stop,
        _ => VisitorAction::Continue,
    }
}
