//! Layout elements: the polymorphic output unit of a page.

use serde::Serialize;

use super::{DrawingKind, Table, TextBlock};
use crate::error::{Error, Result};
use crate::geometry::BoundingBox;

/// One element in a page's ordered sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum LayoutElement {
    /// A boxed or shaded container read out of line
    Aside(Aside),

    /// A vector drawing kept as content
    Drawing(DrawingElement),

    /// A raster image
    Image(ImageElement),

    /// A grouped section of the page
    #[serde(rename = "pagesection")]
    Section(PageSection),

    /// A classified text block
    TextBlock(TextBlock),

    /// A table
    Table(Table),

    /// An ordered or unordered list
    TextList(TextList),
}

impl LayoutElement {
    /// The `name` tag used in serialized output.
    pub fn name(&self) -> &'static str {
        match self {
            LayoutElement::Aside(_) => "aside",
            LayoutElement::Drawing(_) => "drawing",
            LayoutElement::Image(_) => "image",
            LayoutElement::Section(_) => "pagesection",
            LayoutElement::TextBlock(_) => "textblock",
            LayoutElement::Table(_) => "table",
            LayoutElement::TextList(_) => "textlist",
        }
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        match self {
            LayoutElement::Aside(a) => a.bbox,
            LayoutElement::Drawing(d) => Some(d.bbox),
            LayoutElement::Image(i) => Some(i.bbox),
            LayoutElement::Section(s) => s.bbox,
            LayoutElement::TextBlock(b) => Some(*b.bbox()),
            LayoutElement::Table(t) => Some(t.bbox),
            LayoutElement::TextList(l) => l.bbox,
        }
    }

    pub fn as_text_block(&self) -> Option<&TextBlock> {
        match self {
            LayoutElement::TextBlock(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_aside(&self) -> bool {
        matches!(self, LayoutElement::Aside(_))
    }

    /// Whether this element or anything nested in it is an aside.
    fn contains_aside(&self) -> bool {
        match self {
            LayoutElement::Aside(_) => true,
            LayoutElement::Section(s) => s.items.iter().any(LayoutElement::contains_aside),
            LayoutElement::TextList(l) => l
                .items
                .iter()
                .flat_map(|i| i.items.iter())
                .any(LayoutElement::contains_aside),
            LayoutElement::Table(t) => t
                .cells
                .iter()
                .flatten()
                .flat_map(|c| c.items.iter())
                .any(LayoutElement::contains_aside),
            _ => false,
        }
    }

    /// Plain text of the element and its children.
    pub fn plain_text(&self) -> String {
        match self {
            LayoutElement::TextBlock(b) => b.text().to_string(),
            LayoutElement::Aside(a) => join_text(&a.items, "\n"),
            LayoutElement::Section(s) => join_text(&s.items, "\n"),
            LayoutElement::TextList(l) => l
                .items
                .iter()
                .map(|i| format!("{} {}", i.label, join_text(&i.items, " ")))
                .collect::<Vec<_>>()
                .join("\n"),
            LayoutElement::Table(t) => t.plain_text(),
            LayoutElement::Drawing(_) | LayoutElement::Image(_) => String::new(),
        }
    }
}

fn join_text(items: &[LayoutElement], sep: &str) -> String {
    items
        .iter()
        .map(LayoutElement::plain_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Common access to elements that own an ordered child sequence.
pub trait LayoutElementGroup {
    /// Child elements in reading order.
    fn items(&self) -> &[LayoutElement];

    /// Union of the child boxes.
    fn group_bbox(&self) -> Option<BoundingBox> {
        let boxes: Vec<BoundingBox> = self.items().iter().filter_map(|e| e.bbox()).collect();
        BoundingBox::merge_all(&boxes)
    }
}

/// A visually isolated container. Never holds another aside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aside {
    items: Vec<LayoutElement>,
    bbox: Option<BoundingBox>,
}

impl Aside {
    /// Build an aside, rejecting nested asides at any depth.
    pub fn new(items: Vec<LayoutElement>) -> Result<Self> {
        if items.iter().any(LayoutElement::contains_aside) {
            return Err(Error::NestedAside);
        }
        let mut aside = Self { items, bbox: None };
        aside.bbox = aside.group_bbox();
        Ok(aside)
    }

    /// Build an aside whose box is the enclosing frame rather than the
    /// union of its content.
    pub fn framed(items: Vec<LayoutElement>, frame: BoundingBox) -> Result<Self> {
        let mut aside = Self::new(items)?;
        aside.bbox = Some(frame);
        Ok(aside)
    }

    pub fn bbox(&self) -> Option<&BoundingBox> {
        self.bbox.as_ref()
    }

    /// Replace the content, re-checking the no-nesting rule. The frame box
    /// is widened to cover the new content.
    pub fn replace_items(&mut self, items: Vec<LayoutElement>) -> Result<()> {
        if items.iter().any(LayoutElement::contains_aside) {
            return Err(Error::NestedAside);
        }
        self.items = items;
        self.bbox = match (self.bbox, self.group_bbox()) {
            (Some(frame), Some(content)) => Some(frame.merge(&content)),
            (frame, content) => frame.or(content),
        };
        Ok(())
    }
}

impl LayoutElementGroup for Aside {
    fn items(&self) -> &[LayoutElement] {
        &self.items
    }
}

/// A section of a page. Default sections are bands between full-width
/// rules; non-inline sections hold out-of-line content such as figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSection {
    pub items: Vec<LayoutElement>,
    pub bbox: Option<BoundingBox>,
    pub default: bool,
    pub inline: bool,
}

impl PageSection {
    /// An out-of-line section wrapping the given items.
    pub fn out_of_line(items: Vec<LayoutElement>) -> Self {
        let mut section = Self {
            items,
            bbox: None,
            default: false,
            inline: false,
        };
        section.bbox = section.group_bbox();
        section
    }
}

impl LayoutElementGroup for PageSection {
    fn items(&self) -> &[LayoutElement] {
        &self.items
    }
}

/// A drawing kept in the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawingElement {
    pub kind: DrawingKind,
    pub bbox: BoundingBox,
}

/// An image kept in the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageElement {
    pub bbox: BoundingBox,
    pub source: Option<String>,
}

/// A list assembled from labelled blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextList {
    pub ordered: bool,
    pub items: Vec<TextListItem>,
    pub bbox: Option<BoundingBox>,
}

impl TextList {
    pub fn new(ordered: bool, items: Vec<TextListItem>) -> Self {
        let boxes: Vec<BoundingBox> = items.iter().filter_map(|i| i.bbox).collect();
        Self {
            ordered,
            bbox: BoundingBox::merge_all(&boxes),
            items,
        }
    }
}

/// One entry of a [`TextList`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename = "textlistitem")]
pub struct TextListItem {
    /// The label as printed (e.g. "(a)", "•")
    pub label: String,
    pub items: Vec<LayoutElement>,
    pub bbox: Option<BoundingBox>,
}

impl TextListItem {
    pub fn new(label: impl Into<String>, items: Vec<LayoutElement>) -> Self {
        let mut item = Self {
            label: label.into(),
            items,
            bbox: None,
        };
        item.bbox = item.group_bbox();
        item
    }
}

impl LayoutElementGroup for TextListItem {
    fn items(&self) -> &[LayoutElement] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FontInfo, Line, Span, TextBlockType};

    fn block(text: &str, y: f32) -> LayoutElement {
        let span = Span::new(
            text,
            FontInfo::new("Helvetica", 12.0),
            BoundingBox::new(72.0, y, 300.0, y + 12.0).unwrap(),
        );
        let line = Line::new(vec![span]).unwrap();
        LayoutElement::TextBlock(TextBlock::new(TextBlockType::Paragraph, vec![line]).unwrap())
    }

    #[test]
    fn test_aside_rejects_nested_aside() {
        let inner = Aside::new(vec![block("inner", 100.0)]).unwrap();
        let err = Aside::new(vec![block("outer", 80.0), LayoutElement::Aside(inner.clone())]);
        assert!(matches!(err, Err(Error::NestedAside)));

        let section = PageSection::out_of_line(vec![LayoutElement::Aside(inner)]);
        let err = Aside::new(vec![LayoutElement::Section(section)]);
        assert!(matches!(err, Err(Error::NestedAside)));
    }

    #[test]
    fn test_aside_replace_items_revalidates() {
        let mut aside = Aside::new(vec![block("a", 100.0)]).unwrap();
        let inner = Aside::new(vec![block("b", 120.0)]).unwrap();
        assert!(aside
            .replace_items(vec![LayoutElement::Aside(inner)])
            .is_err());
        assert_eq!(aside.items().len(), 1);

        aside
            .replace_items(vec![block("a", 100.0), block("c", 140.0)])
            .unwrap();
        assert_eq!(aside.bbox().unwrap().y1(), 152.0);
    }

    #[test]
    fn test_element_names() {
        let value = serde_json::to_value(block("x", 10.0)).unwrap();
        assert_eq!(value["name"], "textblock");
        assert_eq!(value["type"], "paragraph");

        let list = TextList::new(true, vec![TextListItem::new("1.", vec![block("x", 10.0)])]);
        let value = serde_json::to_value(LayoutElement::TextList(list)).unwrap();
        assert_eq!(value["name"], "textlist");
        assert_eq!(value["ordered"], true);
        assert_eq!(value["items"][0]["name"], "textlistitem");
        assert_eq!(value["items"][0]["items"][0]["name"], "textblock");

        let section = LayoutElement::Section(PageSection::out_of_line(vec![block("x", 10.0)]));
        assert_eq!(section.name(), "pagesection");
        let value = serde_json::to_value(&section).unwrap();
        assert_eq!(value["name"], "pagesection");
        assert_eq!(value["items"][0]["name"], "textblock");
    }

    #[test]
    fn test_plain_text() {
        let aside = Aside::new(vec![block("one", 10.0), block("two", 30.0)]).unwrap();
        assert_eq!(LayoutElement::Aside(aside).plain_text(), "one\ntwo");
    }
}
