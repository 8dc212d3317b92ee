//! Primitive grouping: text runs into lines, lines into candidate blocks.
//!
//! Runs join a line when their vertical centres agree within a fraction of
//! the font size and the horizontal gap is small compared with both the font
//! size and the document's column gap. Lines join a block when the font
//! stays equivalent, the vertical gap stays close to the block's leading,
//! and the left edges align (a first-line or hanging indent is allowed).

use super::cleanup::is_bullet_glyph;
use super::lists::parse_label;
use super::Calibration;
use crate::geometry::{BoundingBox, Normalization};
use crate::model::{
    Drawing, DrawingKind, FontInfo, Image, Line, Span, TextBlock, TextBlockType, TextRun,
};

/// Vertical centre tolerance for runs on one line, as a fraction of size.
const LINE_CENTER_TOLERANCE: f32 = 0.3;

/// Largest run gap within a line, as a multiple of font size.
const LINE_GAP_FACTOR: f32 = 1.2;

/// Largest run gap within a line, as a fraction of the column gap.
const LINE_COLUMN_GAP_FACTOR: f32 = 0.6;

/// Largest distance from a bullet to its text, as a multiple of size.
const BULLET_REACH: f32 = 3.0;

/// First-line and hanging indents, as a multiple of size.
const MAX_INDENT: f32 = 4.0;

/// A group of lines that provisionally form one block. Its type is
/// assigned later by the role classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateBlock {
    pub lines: Vec<Line>,
    pub bbox: BoundingBox,
}

impl CandidateBlock {
    fn from_line(line: Line) -> Self {
        Self {
            bbox: line.bbox,
            lines: vec![line],
        }
    }

    fn push(&mut self, line: Line) {
        self.bbox = self.bbox.merge(&line.bbox);
        self.lines.push(line);
    }

    /// Font covering the most characters in the block.
    pub fn dominant_font(&self) -> Option<&FontInfo> {
        let mut best: Option<(&FontInfo, usize)> = None;
        let mut tallies: Vec<(&FontInfo, usize)> = Vec::new();
        for span in self.lines.iter().flat_map(|l| l.spans.iter()) {
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

    pub fn font_size(&self) -> f32 {
        self.dominant_font().map(|f| f.size).unwrap_or(0.0)
    }

    /// Plain text of the block's lines joined with spaces.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether every span is bold, or every span is italic.
    pub fn is_uniformly_styled(&self) -> bool {
        let mut spans = self.lines.iter().flat_map(|l| l.spans.iter()).peekable();
        if spans.peek().is_none() {
            return false;
        }
        let (mut bold, mut italic) = (true, true);
        for span in spans {
            bold &= span.font.bold;
            italic &= span.font.italic;
        }
        bold || italic
    }

    /// Fix the block's type.
    pub fn classify(self, kind: TextBlockType) -> Option<TextBlock> {
        TextBlock::new(kind, self.lines)
    }

    fn first_gap(&self) -> f32 {
        match (self.lines.first(), self.lines.get(1)) {
            (Some(a), Some(b)) => (b.bbox.y0() - a.bbox.y1()).max(0.0),
            _ => 0.0,
        }
    }

    /// Whether `line` continues this block.
    fn accepts(&self, line: &Line) -> bool {
        let Some(last) = self.lines.last() else {
            return false;
        };
        let (Some(font), Some(line_font)) = (self.dominant_font(), line.dominant_font()) else {
            return false;
        };
        if !font.is_equivalent(line_font) {
            return false;
        }
        let size = font.size;

        if line.bbox.center_y() <= last.bbox.y1() - LINE_CENTER_TOLERANCE * size {
            return false;
        }
        let gap = (line.bbox.y0() - last.bbox.y1()).max(0.0);
        let limit = if self.lines.len() >= 2 {
            self.first_gap() + (0.25 * size).max(1.0)
        } else {
            0.8 * size
        };
        if gap > limit {
            return false;
        }

        if last.bbox.x_overlap_fraction(&line.bbox, Normalization::Min) <= 0.5 {
            return false;
        }

        let dx = line.bbox.x0() - last.bbox.x0();
        let aligned = dx.abs() <= size
            || (line.bbox.center_x() - last.bbox.center_x()).abs() <= size
            || (self.lines.len() == 1 && dx < 0.0 && -dx <= MAX_INDENT * size)
            || (self.lines.len() == 1
                && dx > 0.0
                && dx <= MAX_INDENT * size
                && parse_label(&last.text()).is_some());
        if !aligned {
            return false;
        }

        parse_label(&line.text()).is_none()
    }
}

/// Output of the grouping stage for one page.
#[derive(Debug, Clone, Default)]
pub struct GroupedPage {
    pub blocks: Vec<CandidateBlock>,
    pub drawings: Vec<Drawing>,
    pub images: Vec<Image>,
}

/// Groups runs into lines and lines into candidate blocks.
#[derive(Debug, Clone)]
pub struct Grouper {
    column_gap: f32,
}

impl Grouper {
    pub fn new(calibration: &Calibration) -> Self {
        Self {
            column_gap: calibration.column_gap,
        }
    }

    /// Run the full grouping stage.
    pub fn group(
        &self,
        runs: Vec<TextRun>,
        drawings: Vec<Drawing>,
        images: Vec<Image>,
    ) -> GroupedPage {
        let lines = self.group_lines(runs);
        let (lines, drawings) = attach_drawn_bullets(lines, drawings);
        let blocks = self.group_blocks(lines);
        log::debug!(
            "Grouped {} blocks, {} drawings, {} images",
            blocks.len(),
            drawings.len(),
            images.len()
        );
        GroupedPage {
            blocks,
            drawings,
            images,
        }
    }

    /// Cluster runs into lines, sorted top to bottom then left to right.
    pub fn group_lines(&self, runs: Vec<TextRun>) -> Vec<Line> {
        let mut runs = merge_drop_caps(runs);
        runs.sort_by(|a, b| {
            a.bbox
                .x0()
                .total_cmp(&b.bbox.x0())
                .then(a.bbox.y0().total_cmp(&b.bbox.y0()))
        });

        let mut open: Vec<Vec<TextRun>> = Vec::new();
        for run in runs {
            let target = open
                .iter()
                .enumerate()
                .filter_map(|(i, line)| {
                    let last = line.last()?;
                    let size = run.font.size.max(last.font.size);
                    let dy = (last.bbox.center_y() - run.bbox.center_y()).abs();
                    if dy > LINE_CENTER_TOLERANCE * size {
                        return None;
                    }
                    let gap = run.bbox.x0() - last.bbox.x1();
                    let limit = (size * LINE_GAP_FACTOR).min(self.column_gap * LINE_COLUMN_GAP_FACTOR);
                    if gap > limit || gap < -0.5 * size {
                        return None;
                    }
                    Some((i, gap.abs() + dy))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i);

            match target {
                Some(i) => open[i].push(run),
                None => open.push(vec![run]),
            }
        }

        let mut lines: Vec<Line> = open.into_iter().filter_map(build_line).collect();
        sort_lines(&mut lines);
        merge_bullet_lines(lines)
    }

    /// Cluster lines into candidate blocks.
    pub fn group_blocks(&self, lines: Vec<Line>) -> Vec<CandidateBlock> {
        let mut blocks: Vec<CandidateBlock> = Vec::new();

        for line in lines {
            let target = blocks
                .iter()
                .enumerate()
                .filter(|(_, b)| b.accepts(&line))
                .filter(|(i, b)| !is_blocked(&blocks, *i, b, &line))
                .map(|(i, b)| {
                    let gap = b
                        .lines
                        .last()
                        .map(|l| l.bbox.vertical_gap(&line.bbox))
                        .unwrap_or(f32::MAX);
                    (i, gap)
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i);

            match target {
                Some(i) => blocks[i].push(line),
                None => blocks.push(CandidateBlock::from_line(line)),
            }
        }

        blocks
    }
}

/// Whether another block sits between block `index` and `line`.
fn is_blocked(blocks: &[CandidateBlock], index: usize, block: &CandidateBlock, line: &Line) -> bool {
    let Some(last) = block.lines.last() else {
        return false;
    };
    let (top, bottom) = (last.bbox.y1(), line.bbox.y0());
    blocks.iter().enumerate().any(|(j, other)| {
        j != index
            && other.bbox.y0() >= top - 0.5
            && other.bbox.y1() <= bottom + 0.5
            && other.bbox.x_overlap(&line.bbox) > 0.0
            && other.bbox.x_overlap(&last.bbox) > 0.0
    })
}

fn sort_lines(lines: &mut [Line]) {
    lines.sort_by(|a, b| {
        a.bbox
            .y0()
            .total_cmp(&b.bbox.y0())
            .then(a.bbox.x0().total_cmp(&b.bbox.x0()))
    });
}

/// Build a line from left-to-right runs, merging runs with equivalent fonts
/// into spans.
fn build_line(runs: Vec<TextRun>) -> Option<Line> {
    let mut spans: Vec<Span> = Vec::new();
    for run in runs {
        match spans.last_mut() {
            Some(span) if span.font.is_equivalent(&run.font) => {
                let gap = run.bbox.x0() - span.bbox.x1();
                if gap > span.font.size * 0.15
                    && !span.text.ends_with(char::is_whitespace)
                    && !run.text.starts_with(char::is_whitespace)
                {
                    span.text.push(' ');
                }
                span.text.push_str(&run.text);
                span.bbox = span.bbox.merge(&run.bbox);
            }
            _ => spans.push(Span::new(run.text, run.font, run.bbox)),
        }
    }
    Line::new(spans)
}

fn line_size(line: &Line) -> f32 {
    line.dominant_font().map(|f| f.size).unwrap_or(line.bbox.height())
}

/// Join lines that hold only a bullet glyph to the text on their right.
fn merge_bullet_lines(lines: Vec<Line>) -> Vec<Line> {
    let mut slots: Vec<Option<Line>> = lines.into_iter().map(Some).collect();

    for i in 0..slots.len() {
        let Some(bullet) = slots[i].as_ref() else {
            continue;
        };
        if !is_bullet_glyph(&bullet.text()) {
            continue;
        }
        let size = line_size(bullet);
        let target = slots
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .filter_map(|(j, slot)| slot.as_ref().map(|l| (j, l)))
            .filter(|(_, l)| {
                let dx = l.bbox.x0() - bullet.bbox.x1();
                dx >= -0.5
                    && dx <= BULLET_REACH * size.max(line_size(l))
                    && (l.bbox.center_y() - bullet.bbox.center_y()).abs() <= 0.5 * line_size(l)
            })
            .min_by(|a, b| a.1.bbox.x0().total_cmp(&b.1.bbox.x0()))
            .map(|(j, _)| j);

        if let Some(j) = target {
            if let (Some(bullet), Some(text)) = (slots[i].take(), slots[j].take()) {
                let mut spans = bullet.spans;
                spans.extend(text.spans);
                slots[j] = Line::new(spans);
            }
        }
    }

    let mut lines: Vec<Line> = slots.into_iter().flatten().collect();
    sort_lines(&mut lines);
    lines
}

/// Fold a single oversized initial (drop cap) into the run it starts.
fn merge_drop_caps(runs: Vec<TextRun>) -> Vec<TextRun> {
    let mut slots: Vec<Option<TextRun>> = runs.into_iter().map(Some).collect();

    for i in 0..slots.len() {
        let Some(cap) = slots[i].as_ref() else {
            continue;
        };
        let mut chars = cap.text.trim().chars();
        if !matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic()) {
            continue;
        }
        let target = slots
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .filter_map(|(j, slot)| slot.as_ref().map(|r| (j, r)))
            .filter(|(_, r)| {
                let size = r.font.size;
                let dx = r.bbox.x0() - cap.bbox.x1();
                cap.font.size >= 2.0 * size
                    && dx >= -1.0
                    && dx <= 2.0 * size
                    && r.bbox.y0() >= cap.bbox.y0() - size
                    && r.bbox.y0() <= cap.bbox.y1()
            })
            .min_by(|a, b| {
                a.1.bbox
                    .y0()
                    .total_cmp(&b.1.bbox.y0())
                    .then(a.1.bbox.x0().total_cmp(&b.1.bbox.x0()))
            })
            .map(|(j, _)| j);

        if let Some(j) = target {
            if let (Some(cap), Some(mut run)) = (slots[i].take(), slots[j].take()) {
                run.text = format!("{}{}", cap.text.trim(), run.text.trim_start());
                if let Ok(cap_box) =
                    BoundingBox::new(cap.bbox.x0(), run.bbox.y0(), cap.bbox.x1(), run.bbox.y1())
                {
                    run.bbox = run.bbox.merge(&cap_box.on_page(run.bbox.page()));
                }
                slots[j] = Some(run);
            }
        }
    }

    slots.into_iter().flatten().collect()
}

/// Prefix lines with a bullet when a drawn bullet mark sits just left of
/// them. Unused drawings are handed back.
fn attach_drawn_bullets(mut lines: Vec<Line>, drawings: Vec<Drawing>) -> (Vec<Line>, Vec<Drawing>) {
    let mut rest = Vec::with_capacity(drawings.len());

    for drawing in drawings {
        if drawing.kind != DrawingKind::Bullet {
            rest.push(drawing);
            continue;
        }
        let target = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| {
                let size = line_size(l);
                let dx = l.bbox.x0() - drawing.bbox.x1();
                dx >= -0.5
                    && dx <= BULLET_REACH * size
                    && (l.bbox.center_y() - drawing.bbox.center_y()).abs() <= 0.5 * size
            })
            .min_by(|a, b| a.1.bbox.x0().total_cmp(&b.1.bbox.x0()))
            .map(|(i, _)| i);

        match target {
            Some(i) if !lines[i].text().starts_with('•') => {
                let line = &lines[i];
                let font = line
                    .dominant_font()
                    .cloned()
                    .unwrap_or_else(|| FontInfo::new("", line.bbox.height()));
                let mut spans = vec![Span::new("•", font, drawing.bbox)];
                spans.extend(line.spans.iter().cloned());
                if let Some(merged) = Line::new(spans) {
                    lines[i] = merged;
                }
            }
            Some(_) => {}
            None => rest.push(drawing),
        }
    }

    (lines, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, x0: f32, y0: f32, width: f32, size: f32) -> TextRun {
        TextRun {
            text: text.to_string(),
            font: FontInfo::new("Helvetica", size),
            bbox: BoundingBox::new(x0, y0, x0 + width, y0 + size).unwrap(),
        }
    }

    fn grouper() -> Grouper {
        Grouper::new(&Calibration::default())
    }

    #[test]
    fn test_runs_on_same_baseline_form_one_line() {
        let runs = vec![
            run("world", 110.0, 100.0, 30.0, 12.0),
            run("Hello", 72.0, 100.5, 34.0, 12.0),
        ];
        let lines = grouper().group_lines(runs);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "Hello world");
        assert_eq!(lines[0].spans.len(), 1);
    }

    #[test]
    fn test_column_gap_splits_lines() {
        let runs = vec![
            run("left column", 72.0, 100.0, 200.0, 12.0),
            run("right column", 300.0, 100.0, 200.0, 12.0),
        ];
        let lines = grouper().group_lines(runs);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_font_change_creates_span() {
        let mut bold = run("Note:", 72.0, 100.0, 30.0, 12.0);
        bold.font = bold.font.bold();
        let runs = vec![bold, run("read this", 105.0, 100.0, 50.0, 12.0)];
        let lines = grouper().group_lines(runs);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spans.len(), 2);
    }

    #[test]
    fn test_paragraph_lines_form_block() {
        let runs = vec![
            run("First line of text", 72.0, 100.0, 400.0, 12.0),
            run("second line of text", 72.0, 114.0, 400.0, 12.0),
            run("third line", 72.0, 128.0, 200.0, 12.0),
        ];
        let g = grouper();
        let blocks = g.group_blocks(g.group_lines(runs));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines.len(), 3);
    }

    #[test]
    fn test_paragraph_gap_splits_blocks() {
        let runs = vec![
            run("First paragraph line one", 72.0, 100.0, 400.0, 12.0),
            run("first paragraph line two", 72.0, 114.0, 400.0, 12.0),
            run("Second paragraph", 72.0, 140.0, 400.0, 12.0),
        ];
        let g = grouper();
        let blocks = g.group_blocks(g.group_lines(runs));
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_font_size_change_splits_blocks() {
        let runs = vec![
            run("Heading", 72.0, 100.0, 120.0, 18.0),
            run("Body text follows", 72.0, 121.0, 400.0, 12.0),
        ];
        let g = grouper();
        let blocks = g.group_blocks(g.group_lines(runs));
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_labelled_line_starts_block() {
        let runs = vec![
            run("(a) first item", 72.0, 100.0, 300.0, 12.0),
            run("(b) second item", 72.0, 114.0, 300.0, 12.0),
        ];
        let g = grouper();
        let blocks = g.group_blocks(g.group_lines(runs));
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_lone_bullet_merges_with_text() {
        let runs = vec![
            run("•", 72.0, 100.0, 5.0, 12.0),
            run("Bulleted text", 92.0, 100.0, 100.0, 12.0),
        ];
        let lines = grouper().group_lines(runs);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].text().starts_with('•'));
    }

    #[test]
    fn test_drop_cap_merges() {
        let runs = vec![
            run("O", 72.0, 100.0, 30.0, 36.0),
            run("nce upon a time", 106.0, 100.0, 200.0, 12.0),
            run("there was a page", 106.0, 114.0, 200.0, 12.0),
        ];
        let lines = grouper().group_lines(runs);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "Once upon a time");
    }

    #[test]
    fn test_drawn_bullet_attaches() {
        let lines = grouper().group_lines(vec![run("Item", 90.0, 100.0, 40.0, 12.0)]);
        let dot = Drawing {
            kind: DrawingKind::Bullet,
            bbox: BoundingBox::new(76.0, 104.0, 80.0, 108.0).unwrap(),
        };
        let (lines, rest) = attach_drawn_bullets(lines, vec![dot]);
        assert!(rest.is_empty());
        assert_eq!(lines[0].text(), "• Item");
    }
}
