//! Text containers: spans, lines and classified blocks.

use serde::{Deserialize, Serialize};

use super::FontInfo;
use crate::geometry::BoundingBox;

/// A maximal run of text sharing one font.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename = "span")]
pub struct Span {
    pub text: String,
    pub font: FontInfo,
    pub bbox: BoundingBox,
}

impl Span {
    pub fn new(text: impl Into<String>, font: FontInfo, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            font,
            bbox,
        }
    }

    /// Number of characters, ignoring whitespace.
    pub fn weight(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }
}

/// One visual line of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename = "line")]
pub struct Line {
    /// Spans in left-to-right order
    #[serde(rename = "items")]
    pub spans: Vec<Span>,

    /// Union of the span boxes
    pub bbox: BoundingBox,
}

impl Line {
    /// Create a line from spans. Returns `None` for an empty span list.
    pub fn new(spans: Vec<Span>) -> Option<Self> {
        let bbox = BoundingBox::merge_all(spans.iter().map(|s| &s.bbox))?;
        Some(Self { spans, bbox })
    }

    /// Plain text of the line with spans separated by a space when they
    /// are visually apart.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut prev: Option<&Span> = None;
        for span in &self.spans {
            if let Some(p) = prev {
                let gap = span.bbox.x0() - p.bbox.x1();
                if gap > p.font.size * 0.15
                    && !out.ends_with(char::is_whitespace)
                    && !span.text.starts_with(char::is_whitespace)
                {
                    out.push(' ');
                }
            }
            out.push_str(&span.text);
            prev = Some(span);
        }
        out.trim().to_string()
    }

    /// Font covering the most characters on the line.
    pub fn dominant_font(&self) -> Option<&FontInfo> {
        dominant(self.spans.iter())
    }

    /// Character count, ignoring whitespace.
    pub fn weight(&self) -> usize {
        self.spans.iter().map(Span::weight).sum()
    }

    /// Remove the first `chars` characters of text (plus following
    /// whitespace) from the front of the line. Spans that become empty are
    /// dropped. Returns `None` when nothing is left.
    pub fn strip_prefix_chars(&self, chars: usize) -> Option<Line> {
        let mut remaining = chars;
        let mut spans = Vec::with_capacity(self.spans.len());
        let mut trimming = true;
        for span in &self.spans {
            if !trimming {
                spans.push(span.clone());
                continue;
            }
            let source = span.text.trim_start();
            let count = source.chars().count();
            if remaining >= count {
                remaining -= count;
                continue;
            }
            let rest: String = source.chars().skip(remaining).collect();
            remaining = 0;
            let rest = rest.trim_start();
            if rest.is_empty() {
                continue;
            }
            trimming = false;
            let mut span = span.clone();
            span.text = rest.to_string();
            spans.push(span);
        }
        Line::new(spans)
    }
}

/// Semantic type of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBlockType {
    Paragraph,
    H1,
    H2,
    H3,
    H4,
    H5,
    /// Body-sized text set entirely in bold or italic
    Emphasis,
    /// Text below body size
    Small,
}

impl TextBlockType {
    /// Heading level 1-5, `None` for non-headings.
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            TextBlockType::H1 => Some(1),
            TextBlockType::H2 => Some(2),
            TextBlockType::H3 => Some(3),
            TextBlockType::H4 => Some(4),
            TextBlockType::H5 => Some(5),
            _ => None,
        }
    }

    /// Heading type for a level; levels past 5 clamp to `H5`.
    pub fn heading(level: u8) -> Self {
        match level {
            0 | 1 => TextBlockType::H1,
            2 => TextBlockType::H2,
            3 => TextBlockType::H3,
            4 => TextBlockType::H4,
            _ => TextBlockType::H5,
        }
    }

    pub fn is_heading(&self) -> bool {
        self.heading_level().is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextBlockType::Paragraph => "paragraph",
            TextBlockType::H1 => "h1",
            TextBlockType::H2 => "h2",
            TextBlockType::H3 => "h3",
            TextBlockType::H4 => "h4",
            TextBlockType::H5 => "h5",
            TextBlockType::Emphasis => "emphasis",
            TextBlockType::Small => "small",
        }
    }
}

/// A classified run of lines forming one semantic unit.
///
/// The type and content are fixed at construction; later stages build new
/// blocks instead of editing existing ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    #[serde(rename = "type")]
    kind: TextBlockType,

    #[serde(rename = "block_text")]
    text: String,

    #[serde(rename = "items")]
    lines: Vec<Line>,

    bbox: BoundingBox,
}

impl TextBlock {
    /// Build a block from lines. Returns `None` for an empty line list.
    pub fn new(kind: TextBlockType, lines: Vec<Line>) -> Option<Self> {
        let bbox = BoundingBox::merge_all(lines.iter().map(|l| &l.bbox))?;
        let text = join_lines(&lines);
        Some(Self {
            kind,
            text,
            lines,
            bbox,
        })
    }

    pub fn kind(&self) -> TextBlockType {
        self.kind
    }

    /// Flattened plain text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Font covering the most characters in the block.
    pub fn dominant_font(&self) -> Option<&FontInfo> {
        dominant(self.lines.iter().flat_map(|l| l.spans.iter()))
    }

    /// Size of the dominant font, zero for a block without spans.
    pub fn font_size(&self) -> f32 {
        self.dominant_font().map(|f| f.size).unwrap_or(0.0)
    }

    pub fn is_heading(&self) -> bool {
        self.kind.is_heading()
    }
}

/// Join line texts, undoing end-of-line hyphenation before a lowercase
/// continuation.
fn join_lines(lines: &[Line]) -> String {
    let mut out = String::new();
    for line in lines {
        let text = line.text();
        if text.is_empty() {
            continue;
        }
        if out.is_empty() {
            out.push_str(&text);
            continue;
        }
        let hyphenated = out.ends_with('-')
            && out
                .chars()
                .rev()
                .nth(1)
                .map(|c| c.is_alphabetic())
                .unwrap_or(false)
            && text.starts_with(|c: char| c.is_lowercase());
        if hyphenated {
            out.pop();
        } else {
            out.push(' ');
        }
        out.push_str(&text);
    }
    out
}

fn dominant<'a>(spans: impl Iterator<Item = &'a Span>) -> Option<&'a FontInfo> {
    let mut best: Option<(&FontInfo, usize)> = None;
    let mut tallies: Vec<(&FontInfo, usize)> = Vec::new();
    for span in spans {
        let weight = span.weight().max(1);
        match tallies.iter_mut().find(|(f, _)| f.is_equivalent(&span.font)) {
            Some(entry) => entry.1 += weight,
            None => tallies.push((&span.font, weight)),
        }
    }
    for (font, weight) in tallies {
        if best.map(|(_, w)| weight > w).unwrap_or(true) {
            best = Some((font, weight));
        }
    }
    best.map(|(f, _)| f)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x0: f32, x1: f32, size: f32) -> Span {
        Span::new(
            text,
            FontInfo::new("Helvetica", size),
            BoundingBox::new(x0, 100.0, x1, 100.0 + size).unwrap(),
        )
    }

    #[test]
    fn test_line_text_inserts_space_between_apart_spans() {
        let line = Line::new(vec![span("Hello", 0.0, 30.0, 12.0), span("world", 34.0, 64.0, 12.0)])
            .unwrap();
        assert_eq!(line.text(), "Hello world");
        assert_eq!(line.bbox.to_array(), [0.0, 100.0, 64.0, 112.0]);
    }

    #[test]
    fn test_empty_line_rejected() {
        assert!(Line::new(Vec::new()).is_none());
        assert!(TextBlock::new(TextBlockType::Paragraph, Vec::new()).is_none());
    }

    #[test]
    fn test_block_text_dehyphenates() {
        let l1 = Line::new(vec![span("infor-", 0.0, 40.0, 12.0)]).unwrap();
        let l2 = Line::new(vec![span("mation flows", 0.0, 70.0, 12.0)]).unwrap();
        let block = TextBlock::new(TextBlockType::Paragraph, vec![l1, l2]).unwrap();
        assert_eq!(block.text(), "information flows");
    }

    #[test]
    fn test_strip_prefix() {
        let line = Line::new(vec![span("(a)", 0.0, 15.0, 12.0), span(" First", 18.0, 50.0, 12.0)])
            .unwrap();
        let stripped = line.strip_prefix_chars(3).unwrap();
        assert_eq!(stripped.spans.len(), 1);
        assert_eq!(stripped.text(), "First");
        assert!(stripped.bbox.x0() >= 18.0);
    }

    #[test]
    fn test_dominant_font() {
        let mut bold = span("Hi", 0.0, 10.0, 12.0);
        bold.font = bold.font.bold();
        let line = Line::new(vec![bold, span("a longer tail", 12.0, 80.0, 12.0)]).unwrap();
        assert!(!line.dominant_font().unwrap().bold);
    }

    #[test]
    fn test_block_serialized_shape() {
        let line = Line::new(vec![span("Title", 0.0, 40.0, 24.0)]).unwrap();
        let block = TextBlock::new(TextBlockType::H1, vec![line]).unwrap();
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "h1");
        assert_eq!(value["block_text"], "Title");
        assert_eq!(value["items"][0]["name"], "line");
        assert_eq!(value["items"][0]["items"][0]["name"], "span");
        assert_eq!(value["items"][0]["items"][0]["font"]["name"], "font");
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(TextBlockType::heading(2), TextBlockType::H2);
        assert_eq!(TextBlockType::heading(9), TextBlockType::H5);
        assert_eq!(TextBlockType::H3.heading_level(), Some(3));
        assert!(!TextBlockType::Small.is_heading());
    }
}
