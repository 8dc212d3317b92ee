//! Positioned leaf content handed over by the document reader.
//!
//! [`RawPrimitive`] is the reader-facing interchange form with unchecked
//! coordinates. [`RawPrimitive::validate`] turns it into a [`Primitive`]
//! whose bounding box is known to be well formed and on the page.

use serde::{Deserialize, Serialize};

use super::FontInfo;
use crate::error::{Error, Result};
use crate::geometry::BoundingBox;

/// How far a primitive may stick out of the page before it is rejected.
const PAGE_TOLERANCE: f32 = 2.0;

/// One page as produced by the document reader.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPage {
    /// Page width in points
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Positioned primitives in reader order
    #[serde(default)]
    pub primitives: Vec<RawPrimitive>,
}

impl RawPage {
    /// Create an empty page.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            primitives: Vec::new(),
        }
    }

    /// Create an empty US Letter page (612 x 792 points).
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// Add a primitive and return self.
    pub fn with(mut self, primitive: RawPrimitive) -> Self {
        self.primitives.push(primitive);
        self
    }

    /// Add a primitive.
    pub fn push(&mut self, primitive: RawPrimitive) {
        self.primitives.push(primitive);
    }

    /// Number of text primitives on the page.
    pub fn text_count(&self) -> usize {
        self.primitives
            .iter()
            .filter(|p| matches!(p, RawPrimitive::Text { .. }))
            .count()
    }
}

/// Reader hint for what a vector drawing represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingHint {
    /// A straight stroke (separator or table ruling)
    Rule,
    /// A closed rectangular outline
    Box,
    /// A filled rectangle
    Fill,
    /// A small glyph-like mark in front of text
    Bullet,
    /// Arbitrary vector artwork
    Figure,
}

/// A primitive with unchecked coordinates, as produced by the reader.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawPrimitive {
    /// A run of text in one font
    Text {
        text: String,
        font: FontInfo,
        bbox: [f32; 4],
    },
    /// A vector path or fill
    Drawing {
        bbox: [f32; 4],
        #[serde(default)]
        hint: Option<DrawingHint>,
    },
    /// A raster image
    Image {
        bbox: [f32; 4],
        #[serde(default)]
        source: Option<String>,
    },
}

impl RawPrimitive {
    /// Create a text primitive.
    pub fn text(text: impl Into<String>, font: FontInfo, bbox: [f32; 4]) -> Self {
        RawPrimitive::Text {
            text: text.into(),
            font,
            bbox,
        }
    }

    /// Create a drawing primitive.
    pub fn drawing(bbox: [f32; 4], hint: Option<DrawingHint>) -> Self {
        RawPrimitive::Drawing { bbox, hint }
    }

    /// Create an image primitive.
    pub fn image(bbox: [f32; 4]) -> Self {
        RawPrimitive::Image { bbox, source: None }
    }

    fn bbox(&self) -> [f32; 4] {
        match self {
            RawPrimitive::Text { bbox, .. }
            | RawPrimitive::Drawing { bbox, .. }
            | RawPrimitive::Image { bbox, .. } => *bbox,
        }
    }

    /// Check coordinates against the page and build a [`Primitive`].
    ///
    /// Returns `Ok(None)` for content that carries nothing (whitespace-only
    /// text) and [`Error::MalformedInput`] for degenerate or off-page boxes.
    pub fn validate(
        &self,
        page: usize,
        index: usize,
        width: f32,
        height: f32,
    ) -> Result<Option<Primitive>> {
        let malformed = |reason: String| Error::MalformedInput {
            page,
            index,
            reason,
        };

        let bbox = BoundingBox::from_array(self.bbox())
            .map_err(|e| malformed(e.to_string()))?
            .on_page(page);

        let page_box = BoundingBox::new(0.0, 0.0, width.max(0.0), height.max(0.0))
            .map_err(|e| malformed(e.to_string()))?
            .expand(PAGE_TOLERANCE);
        if !page_box.contains(&bbox) {
            return Err(malformed(format!(
                "bounding box {:?} lies outside the {}x{} page",
                bbox.to_array(),
                width,
                height
            )));
        }

        match self {
            RawPrimitive::Text { text, font, .. } => {
                if !(font.size.is_finite() && font.size > 0.0) {
                    return Err(malformed(format!("invalid font size {}", font.size)));
                }
                if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
                    return Err(malformed("text run has zero area".to_string()));
                }
                if text.trim().is_empty() {
                    return Ok(None);
                }
                Ok(Some(Primitive::Text(TextRun {
                    text: text.clone(),
                    font: font.clone().normalized(),
                    bbox,
                })))
            }
            RawPrimitive::Drawing { hint, .. } => Ok(Some(Primitive::Drawing(Drawing {
                kind: DrawingKind::classify(*hint, &bbox),
                bbox,
            }))),
            RawPrimitive::Image { source, .. } => {
                if bbox.area() <= 0.0 {
                    return Err(malformed("image has zero area".to_string()));
                }
                Ok(Some(Primitive::Image(Image {
                    bbox,
                    source: source.clone(),
                })))
            }
        }
    }
}

/// A run of text in a single font.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub font: FontInfo,
    pub bbox: BoundingBox,
}

/// What a vector drawing is taken to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingKind {
    /// Straight horizontal or vertical stroke
    Line,
    /// Closed or filled rectangle
    Rect,
    /// Small mark used as a list bullet
    Bullet,
    /// Anything else
    Unknown,
}

impl DrawingKind {
    /// Derive the kind from the reader hint, falling back to the shape.
    pub fn classify(hint: Option<DrawingHint>, bbox: &BoundingBox) -> Self {
        match hint {
            Some(DrawingHint::Rule) => DrawingKind::Line,
            Some(DrawingHint::Box) | Some(DrawingHint::Fill) => DrawingKind::Rect,
            Some(DrawingHint::Bullet) => DrawingKind::Bullet,
            Some(DrawingHint::Figure) => DrawingKind::Unknown,
            None => {
                let (w, h) = (bbox.width(), bbox.height());
                if w.min(h) <= 2.0 && w.max(h) > 5.0 {
                    DrawingKind::Line
                } else if w <= 8.0 && h <= 8.0 {
                    DrawingKind::Bullet
                } else {
                    DrawingKind::Rect
                }
            }
        }
    }
}

/// A vector drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    pub kind: DrawingKind,
    pub bbox: BoundingBox,
}

impl Drawing {
    /// Whether this is a horizontal rule.
    pub fn is_horizontal_rule(&self) -> bool {
        self.kind == DrawingKind::Line && self.bbox.height() <= self.bbox.width()
    }

    /// Whether this is a vertical rule.
    pub fn is_vertical_rule(&self) -> bool {
        self.kind == DrawingKind::Line && self.bbox.width() < self.bbox.height()
    }
}

/// A raster image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub bbox: BoundingBox,
    pub source: Option<String>,
}

/// A validated leaf content item owned by one page.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Text(TextRun),
    Drawing(Drawing),
    Image(Image),
}

impl Primitive {
    pub fn bbox(&self) -> &BoundingBox {
        match self {
            Primitive::Text(t) => &t.bbox,
            Primitive::Drawing(d) => &d.bbox,
            Primitive::Image(i) => &i.bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> FontInfo {
        FontInfo::new("Helvetica", 12.0)
    }

    #[test]
    fn test_validate_text() {
        let raw = RawPrimitive::text("Hello", font(), [72.0, 72.0, 120.0, 84.0]);
        let prim = raw.validate(0, 0, 612.0, 792.0).unwrap().unwrap();
        assert!(matches!(prim, Primitive::Text(ref t) if t.text == "Hello"));
        assert_eq!(prim.bbox().page(), 0);
    }

    #[test]
    fn test_validate_rejects_inverted_box() {
        let raw = RawPrimitive::text("Bad", font(), [120.0, 72.0, 72.0, 84.0]);
        let err = raw.validate(3, 5, 612.0, 792.0).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { page: 3, index: 5, .. }));
    }

    #[test]
    fn test_validate_rejects_off_page_box() {
        let raw = RawPrimitive::image([700.0, 10.0, 800.0, 50.0]);
        assert!(raw.validate(0, 0, 612.0, 792.0).is_err());
    }

    #[test]
    fn test_validate_skips_blank_text() {
        let raw = RawPrimitive::text("   ", font(), [72.0, 72.0, 120.0, 84.0]);
        assert!(raw.validate(0, 0, 612.0, 792.0).unwrap().is_none());
    }

    #[test]
    fn test_drawing_classification() {
        let rule = BoundingBox::new(0.0, 100.0, 400.0, 100.5).unwrap();
        assert_eq!(DrawingKind::classify(None, &rule), DrawingKind::Line);

        let dot = BoundingBox::new(0.0, 0.0, 4.0, 4.0).unwrap();
        assert_eq!(DrawingKind::classify(None, &dot), DrawingKind::Bullet);

        let frame = BoundingBox::new(0.0, 0.0, 200.0, 100.0).unwrap();
        assert_eq!(DrawingKind::classify(None, &frame), DrawingKind::Rect);
        assert_eq!(
            DrawingKind::classify(Some(DrawingHint::Figure), &frame),
            DrawingKind::Unknown
        );
    }

    #[test]
    fn test_deserialize_raw_page() {
        let json = r#"{
            "width": 612, "height": 792,
            "primitives": [
                {"kind": "text", "text": "Hi", "font": {"name": "Arial", "size": 12}, "bbox": [10, 10, 30, 22]},
                {"kind": "drawing", "bbox": [0, 100, 612, 101], "hint": "rule"},
                {"kind": "image", "bbox": [50, 200, 250, 400]}
            ]
        }"#;
        let page: RawPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.primitives.len(), 3);
        assert_eq!(page.text_count(), 1);
    }
}
