//! Region classification.
//!
//! Each connected component of the layout graph gets one label. Content
//! inside an enclosure is an aside (all components in one enclosure form a
//! single aside). A component in the top or bottom margin band whose lines
//! all recur across the sampled pages is a header or footer. Anything else
//! is page-width when it spans most of the body, else a column.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use super::graph::{Band, LayoutGraph, NodeKind};
use super::grouper::CandidateBlock;
use super::Calibration;
use crate::geometry::BoundingBox;
use crate::model::Line;

/// Components spanning this fraction of the body width are page-width.
const PAGE_WIDTH_FRACTION: f32 = 0.85;

/// Share of sampled pages a margin line must recur on.
const RECURRENCE: f32 = 0.6;

/// Fewest sampled pages for recurrence to mean anything.
const MIN_SAMPLED_PAGES: usize = 2;

/// Vertical bucket size for margin signatures, in points.
const SIGNATURE_BUCKET: f32 = 6.0;

fn page_label_regex() -> &'static Regex {
    static PAGE_LABEL: OnceLock<Regex> = OnceLock::new();
    PAGE_LABEL.get_or_init(|| {
        Regex::new(r"(?i)^\s*[-–—]?\s*(?:page\s+)?(\d+|[ivxlcdm]+)\s*[-–—]?\s*$")
            .expect("page label pattern is valid")
    })
}

fn digits_regex() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"\d+").expect("digit pattern is valid"))
}

/// The page number printed in a header or footer line, if that is all the
/// line holds.
pub fn page_label(text: &str) -> Option<String> {
    page_label_regex()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Text shape used to recognise repeated margin lines: page numbers and
/// other digit runs collapse to `#`.
fn signature_text(text: &str) -> String {
    if page_label(text).is_some() {
        return "#".to_string();
    }
    let collapsed = digits_regex().replace_all(text.trim(), "#");
    collapsed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn bucket(bbox: &BoundingBox) -> i32 {
    (bbox.center_y() / SIGNATURE_BUCKET).round() as i32
}

/// Margin lines seen across the sampled pages.
#[derive(Debug, Clone, Default)]
pub struct MarginSignatures {
    /// Sampled pages (by observation order) each signature appeared on
    pages: HashMap<(Band, i32, String), HashSet<usize>>,
    sampled: usize,
}

impl MarginSignatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the margin lines of one sampled page.
    pub fn observe_page(&mut self, lines: &[Line], page_height: f32) {
        let page = self.sampled;
        self.sampled += 1;
        let mut seen = HashSet::new();
        for line in lines {
            let band = Band::of(&line.bbox, page_height);
            if band == Band::Body {
                continue;
            }
            let text = line.text();
            if text.is_empty() {
                continue;
            }
            seen.insert((band, bucket(&line.bbox), signature_text(&text)));
        }
        for signature in seen {
            self.pages.entry(signature).or_default().insert(page);
        }
    }

    /// Number of pages observed.
    pub fn sampled_pages(&self) -> usize {
        self.sampled
    }

    /// Whether a margin line recurs at about the same position on enough
    /// sampled pages. Each page counts once, however many neighbouring
    /// buckets it matched in.
    pub fn is_recurring(&self, band: Band, bbox: &BoundingBox, text: &str) -> bool {
        if band == Band::Body || self.sampled < MIN_SAMPLED_PAGES {
            return false;
        }
        let text = signature_text(text);
        let center = bucket(bbox);
        let pages: HashSet<usize> = (center - 1..=center + 1)
            .filter_map(|b| self.pages.get(&(band, b, text.clone())))
            .flatten()
            .copied()
            .collect();
        pages.len() as f32 >= self.sampled as f32 * RECURRENCE
    }
}

/// Layout role of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Column,
    Aside,
    Header,
    Footer,
    PageWidth,
}

impl RegionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::Column => "column",
            RegionKind::Aside => "aside",
            RegionKind::Header => "header",
            RegionKind::Footer => "footer",
            RegionKind::PageWidth => "page-width",
        }
    }

    /// Whether the region takes part in the main reading order.
    pub fn is_flow(&self) -> bool {
        matches!(self, RegionKind::Column | RegionKind::PageWidth)
    }
}

/// Graph nodes sharing one layout role.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub kind: RegionKind,
    /// Node indices, ascending
    pub nodes: Vec<usize>,
    pub bbox: BoundingBox,
    /// Enclosure backing an aside
    pub enclosure: Option<usize>,
}

impl Region {
    pub fn top(&self) -> f32 {
        self.bbox.y0()
    }
}

/// Labels graph components.
#[derive(Debug, Clone, Copy)]
pub struct RegionClassifier<'a> {
    signatures: &'a MarginSignatures,
    calibration: &'a Calibration,
}

impl<'a> RegionClassifier<'a> {
    pub fn new(signatures: &'a MarginSignatures, calibration: &'a Calibration) -> Self {
        Self {
            signatures,
            calibration,
        }
    }

    /// Label every component of the graph. Regions come out in the order
    /// of their first node.
    pub fn classify(&self, graph: &LayoutGraph, blocks: &[CandidateBlock]) -> Vec<Region> {
        let mut regions: Vec<Region> = Vec::new();
        let mut aside_of: HashMap<usize, usize> = HashMap::new();

        for component in graph.components() {
            let Some(bbox) = BoundingBox::merge_all(
                component.iter().filter_map(|&i| graph.node(i)).map(|n| &n.bbox),
            ) else {
                continue;
            };
            let enclosure = component
                .first()
                .and_then(|&i| graph.node(i))
                .and_then(|n| n.key.enclosure);

            if let Some(e) = enclosure {
                match aside_of.get(&e) {
                    Some(&r) => {
                        let region = &mut regions[r];
                        region.nodes.extend(component);
                        region.nodes.sort_unstable();
                        region.bbox = region.bbox.merge(&bbox);
                    }
                    None => {
                        aside_of.insert(e, regions.len());
                        regions.push(Region {
                            kind: RegionKind::Aside,
                            nodes: component,
                            bbox,
                            enclosure: Some(e),
                        });
                    }
                }
                continue;
            }

            let kind = self.label(graph, blocks, &component, &bbox);
            regions.push(Region {
                kind,
                nodes: component,
                bbox,
                enclosure: None,
            });
        }

        log::debug!(
            "Classified {} regions ({} asides)",
            regions.len(),
            aside_of.len()
        );
        regions
    }

    fn label(
        &self,
        graph: &LayoutGraph,
        blocks: &[CandidateBlock],
        component: &[usize],
        bbox: &BoundingBox,
    ) -> RegionKind {
        match Band::of(bbox, graph.height()) {
            Band::Top if self.is_recurring(graph, blocks, component, Band::Top) => {
                return RegionKind::Header
            }
            Band::Bottom if self.is_recurring(graph, blocks, component, Band::Bottom) => {
                return RegionKind::Footer
            }
            _ => {}
        }
        if bbox.width() >= self.calibration.body_width() * PAGE_WIDTH_FRACTION {
            RegionKind::PageWidth
        } else {
            RegionKind::Column
        }
    }

    /// Whether every text line of the component recurs on other pages.
    fn is_recurring(
        &self,
        graph: &LayoutGraph,
        blocks: &[CandidateBlock],
        component: &[usize],
        band: Band,
    ) -> bool {
        let mut lines = component
            .iter()
            .filter_map(|&i| match graph.node(i)?.kind {
                NodeKind::Block(b) => blocks.get(b),
                _ => None,
            })
            .flat_map(|b| b.lines.iter())
            .peekable();
        if lines.peek().is_none() {
            return false;
        }
        lines.all(|l| self.signatures.is_recurring(band, &l.bbox, &l.text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::grouper::GroupedPage;
    use crate::model::{Drawing, DrawingKind, FontInfo, Span};

    fn bbox(x0: f32, y0: f32, x1: f32, y1: f32) -> BoundingBox {
        BoundingBox::new(x0, y0, x1, y1).unwrap()
    }

    fn line(text: &str, x0: f32, y0: f32, x1: f32) -> Line {
        Line::new(vec![Span::new(
            text,
            FontInfo::new("Times", 10.0),
            bbox(x0, y0, x1, y0 + 10.0),
        )])
        .unwrap()
    }

    fn block(text: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> CandidateBlock {
        let first = line(text, x0, y0, x1);
        CandidateBlock {
            lines: vec![first],
            bbox: bbox(x0, y0, x1, y1),
        }
    }

    fn signatures(pages: usize) -> MarginSignatures {
        let mut signatures = MarginSignatures::new();
        for page in 1..=pages {
            let lines = vec![
                line("Annual Report 2023", 72.0, 30.0, 300.0),
                line(&format!("Page {}", page), 280.0, 760.0, 330.0),
                line("Body text", 72.0, 300.0, 540.0),
            ];
            signatures.observe_page(&lines, 792.0);
        }
        signatures
    }

    #[test]
    fn test_page_label() {
        assert_eq!(page_label("12"), Some("12".to_string()));
        assert_eq!(page_label("- 7 -"), Some("7".to_string()));
        assert_eq!(page_label("Page 3"), Some("3".to_string()));
        assert_eq!(page_label("xiv"), Some("xiv".to_string()));
        assert_eq!(page_label("Chapter 3"), None);
    }

    #[test]
    fn test_signature_recurrence() {
        let signatures = signatures(5);
        assert_eq!(signatures.sampled_pages(), 5);
        assert!(signatures.is_recurring(Band::Bottom, &bbox(280.0, 760.0, 330.0, 770.0), "Page 99"));
        assert!(signatures.is_recurring(Band::Top, &bbox(72.0, 31.0, 300.0, 41.0), "Annual Report 2024"));
        assert!(!signatures.is_recurring(Band::Top, &bbox(72.0, 30.0, 300.0, 40.0), "Preface"));
        assert!(!signatures.is_recurring(Band::Body, &bbox(72.0, 300.0, 540.0, 310.0), "Body text"));
    }

    #[test]
    fn test_page_counts_once_across_buckets() {
        let mut signatures = MarginSignatures::new();
        signatures.observe_page(
            &[
                line("Draft", 72.0, 30.0, 120.0),
                line("Draft", 72.0, 36.0, 120.0),
                line("Draft", 72.0, 42.0, 120.0),
            ],
            792.0,
        );
        signatures.observe_page(&[line("Body text", 72.0, 300.0, 540.0)], 792.0);
        signatures.observe_page(&[line("Body text", 72.0, 300.0, 540.0)], 792.0);
        assert!(!signatures.is_recurring(Band::Top, &bbox(72.0, 36.0, 120.0, 46.0), "Draft"));
    }

    #[test]
    fn test_single_sample_never_recurs() {
        let signatures = signatures(1);
        assert!(!signatures.is_recurring(Band::Bottom, &bbox(280.0, 760.0, 330.0, 770.0), "Page 1"));
    }

    #[test]
    fn test_region_labels() {
        let page = GroupedPage {
            blocks: vec![
                block("Annual Report 2023", 72.0, 30.0, 300.0, 40.0),
                block("Title spanning the page", 72.0, 90.0, 540.0, 110.0),
                block("left", 72.0, 130.0, 290.0, 300.0),
                block("right", 322.0, 130.0, 540.0, 300.0),
                block("boxed", 90.0, 420.0, 270.0, 460.0),
                block("Page 4", 280.0, 760.0, 330.0, 770.0),
            ],
            drawings: vec![Drawing {
                kind: DrawingKind::Rect,
                bbox: bbox(80.0, 410.0, 280.0, 470.0),
            }],
            images: Vec::new(),
        };
        let calibration = Calibration::default();
        let graph = LayoutGraph::build(&page, 612.0, 792.0, &calibration);
        let signatures = signatures(4);
        let regions = RegionClassifier::new(&signatures, &calibration).classify(&graph, &page.blocks);

        let kinds: Vec<RegionKind> = regions.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RegionKind::Header,
                RegionKind::PageWidth,
                RegionKind::Column,
                RegionKind::Column,
                RegionKind::Aside,
                RegionKind::Footer,
            ]
        );
        assert_eq!(regions[4].enclosure, Some(0));
    }

    #[test]
    fn test_unrepeated_margin_text_is_content() {
        let page = GroupedPage {
            blocks: vec![block("Preface", 72.0, 30.0, 200.0, 40.0)],
            ..Default::default()
        };
        let calibration = Calibration::default();
        let graph = LayoutGraph::build(&page, 612.0, 792.0, &calibration);
        let signatures = signatures(4);
        let regions = RegionClassifier::new(&signatures, &calibration).classify(&graph, &page.blocks);
        assert_eq!(regions[0].kind, RegionKind::Column);
    }

    #[test]
    fn test_components_in_one_enclosure_form_one_aside() {
        let page = GroupedPage {
            blocks: vec![
                block("one", 90.0, 200.0, 180.0, 220.0),
                block("two", 220.0, 300.0, 300.0, 320.0),
            ],
            drawings: vec![Drawing {
                kind: DrawingKind::Rect,
                bbox: bbox(80.0, 190.0, 320.0, 330.0),
            }],
            images: Vec::new(),
        };
        let calibration = Calibration::default();
        let graph = LayoutGraph::build(&page, 612.0, 792.0, &calibration);
        assert_eq!(graph.components().len(), 2);
        let signatures = MarginSignatures::new();
        let regions = RegionClassifier::new(&signatures, &calibration).classify(&graph, &page.blocks);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].kind, RegionKind::Aside);
        assert_eq!(regions[0].nodes, vec![0, 1]);
    }
}
