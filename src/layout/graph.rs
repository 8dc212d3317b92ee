//! Spatial adjacency graph over a page's blocks and figures.
//!
//! Nodes live in an arena and refer to the grouped page by index. Before
//! the graph is built, images and drawings are sorted into the roles they
//! play on the page:
//!
//! - background images (most of the page, with text on top) are dropped
//! - images and boxes that enclose text become enclosures (aside backings)
//! - boxes that enclose ruled grids are table frames
//! - full-width horizontal rules cut the page into sections
//! - remaining images and large figures become nodes
//!
//! Every node carries a partition key. Edges only join nodes with equal
//! keys, so content inside an enclosure never joins content outside it,
//! wide blocks and blocks reaching across a column gutter never glue
//! neighbouring columns together, and margin bands stay apart from the body.

use std::collections::VecDeque;

use super::grouper::GroupedPage;
use super::Calibration;
use crate::geometry::{BoundingBox, Normalization};
use crate::model::DrawingKind;

/// Height of the top and bottom margin bands, as a page fraction.
const MARGIN_BAND: f32 = 0.1;

/// Nodes at least this fraction of the body width are wide.
const WIDE_FRACTION: f32 = 0.6;

/// Horizontal rules longer than this page-width fraction split sections.
const FULL_WIDTH_RULE: f32 = 0.75;

/// Largest enclosure, as a fraction of the page area.
const ENCLOSURE_MAX_AREA: f32 = 0.6;

/// Images covering this fraction of the page are backgrounds.
const BACKGROUND_AREA: f32 = 0.6;

/// Images wider or taller than this page fraction are primary figures.
const PRIMARY_IMAGE: f32 = 0.6;

/// Share of a node that must fall inside an enclosure.
const ENCLOSED: f32 = 0.95;

/// Smallest side of a figure drawing kept as content.
const MIN_FIGURE: f32 = 20.0;

/// Smallest x-overlap fraction for a vertical edge.
const VERTICAL_OVERLAP: f32 = 0.1;

/// Slack used when testing whether one box sits between two others.
const BETWEEN_SLACK: f32 = 0.5;

/// Vertical band of the page a box falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Band {
    Top,
    Body,
    Bottom,
}

impl Band {
    pub fn of(bbox: &BoundingBox, page_height: f32) -> Self {
        if bbox.y1() <= page_height * MARGIN_BAND {
            Band::Top
        } else if bbox.y0() >= page_height * (1.0 - MARGIN_BAND) {
            Band::Bottom
        } else {
            Band::Body
        }
    }
}

/// What a graph node stands for. Indices point into the [`GroupedPage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Block(usize),
    Image(usize),
    Drawing(usize),
}

/// Nodes only connect when their keys are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    pub enclosure: Option<usize>,
    pub band: Band,
    pub wide: bool,
    pub section: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnclosureSource {
    /// A drawn box or fill
    Frame,
    /// An image with text on top
    Image,
}

/// A closed area whose content reads as an aside.
#[derive(Debug, Clone, PartialEq)]
pub struct Enclosure {
    pub bbox: BoundingBox,
    pub source: EnclosureSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub bbox: BoundingBox,
    pub key: PartitionKey,
    /// Large figure emitted out of line
    pub primary: bool,
}

/// Neighbours of one node, by direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Adjacency {
    pub up: Vec<usize>,
    pub down: Vec<usize>,
    pub left: Vec<usize>,
    pub right: Vec<usize>,
}

impl Adjacency {
    pub fn all(&self) -> impl Iterator<Item = usize> + '_ {
        self.up
            .iter()
            .chain(&self.down)
            .chain(&self.left)
            .chain(&self.right)
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.up.is_empty() && self.down.is_empty() && self.left.is_empty() && self.right.is_empty()
    }
}

/// Arena-backed adjacency graph for one page.
#[derive(Debug, Clone)]
pub struct LayoutGraph {
    nodes: Vec<Node>,
    adjacency: Vec<Adjacency>,
    enclosures: Vec<Enclosure>,
    rules: Vec<BoundingBox>,
    full_width_rules: Vec<BoundingBox>,
    table_frames: Vec<BoundingBox>,
    dropped_images: usize,
    width: f32,
    height: f32,
}

impl LayoutGraph {
    /// Build the graph for a grouped page.
    pub fn build(page: &GroupedPage, width: f32, height: f32, calibration: &Calibration) -> Self {
        let page_area = (width * height).max(1.0);
        let text_boxes: Vec<BoundingBox> = page.blocks.iter().map(|b| b.bbox).collect();
        let encloses_text =
            |area: &BoundingBox| text_boxes.iter().any(|t| area.overlap_with(t, Normalization::Second) >= ENCLOSED);

        let rules: Vec<BoundingBox> = page
            .drawings
            .iter()
            .filter(|d| d.kind == DrawingKind::Line)
            .map(|d| d.bbox)
            .collect();

        let mut full_width_rules: Vec<BoundingBox> = page
            .drawings
            .iter()
            .filter(|d| d.is_horizontal_rule() && d.bbox.width() > width * FULL_WIDTH_RULE)
            .map(|d| d.bbox)
            .collect();
        full_width_rules.sort_by(|a, b| a.center_y().total_cmp(&b.center_y()));

        let mut graph = Self {
            nodes: Vec::new(),
            adjacency: Vec::new(),
            enclosures: Vec::new(),
            rules,
            full_width_rules,
            table_frames: Vec::new(),
            dropped_images: 0,
            width,
            height,
        };

        let mut figures: Vec<(NodeKind, BoundingBox, bool)> = Vec::new();

        for (i, drawing) in page.drawings.iter().enumerate() {
            match drawing.kind {
                DrawingKind::Rect => {
                    let frame = drawing.bbox.expand(1.0);
                    let enclosed_rules = graph.rules.iter().filter(|r| frame.contains(r)).count();
                    if enclosed_rules >= 2 {
                        graph.table_frames.push(drawing.bbox);
                    } else if drawing.bbox.area() < page_area * ENCLOSURE_MAX_AREA
                        && encloses_text(&drawing.bbox)
                    {
                        graph.enclosures.push(Enclosure {
                            bbox: drawing.bbox,
                            source: EnclosureSource::Frame,
                        });
                    }
                }
                DrawingKind::Unknown
                    if drawing.bbox.width() >= MIN_FIGURE && drawing.bbox.height() >= MIN_FIGURE =>
                {
                    figures.push((NodeKind::Drawing(i), drawing.bbox, false));
                }
                _ => {}
            }
        }

        for (i, image) in page.images.iter().enumerate() {
            let area = image.bbox.area();
            let under_text = text_boxes.iter().any(|t| image.bbox.overlaps(t));
            if area >= page_area * BACKGROUND_AREA && under_text {
                log::debug!("Dropping background image {}", i);
                graph.dropped_images += 1;
            } else if area < page_area * ENCLOSURE_MAX_AREA && encloses_text(&image.bbox) {
                graph.enclosures.push(Enclosure {
                    bbox: image.bbox,
                    source: EnclosureSource::Image,
                });
            } else {
                let primary = image.bbox.width() > width * PRIMARY_IMAGE
                    || image.bbox.height() > height * PRIMARY_IMAGE;
                figures.push((NodeKind::Image(i), image.bbox, primary));
            }
        }

        let wide_limit = calibration.body_width() * WIDE_FRACTION;
        let nodes: Vec<(NodeKind, BoundingBox, bool)> = page
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (NodeKind::Block(i), b.bbox, false))
            .chain(figures)
            .collect();
        let keys: Vec<PartitionKey> = nodes
            .iter()
            .map(|(_, bbox, _)| PartitionKey {
                enclosure: graph.enclosure_of(bbox),
                band: Band::of(bbox, height),
                wide: bbox.width() >= wide_limit,
                section: graph
                    .full_width_rules
                    .iter()
                    .filter(|r| r.center_y() < bbox.center_y())
                    .count(),
            })
            .collect();
        let boxes: Vec<BoundingBox> = nodes.iter().map(|(_, bbox, _)| *bbox).collect();
        let gutter = calibration.horizontal_edge_limit();
        for (i, (kind, bbox, primary)) in nodes.into_iter().enumerate() {
            let mut key = keys[i];
            key.wide = key.wide || spans_gutter(i, &boxes, &keys, gutter);
            graph.nodes.push(Node {
                kind,
                bbox,
                key,
                primary,
            });
        }

        graph.connect(calibration);
        log::debug!(
            "Layout graph: {} nodes, {} enclosures, {} sections",
            graph.nodes.len(),
            graph.enclosures.len(),
            graph.full_width_rules.len() + 1
        );
        graph
    }

    /// Smallest enclosure holding the box.
    fn enclosure_of(&self, bbox: &BoundingBox) -> Option<usize> {
        self.enclosures
            .iter()
            .enumerate()
            .filter(|(_, e)| e.bbox.overlap_with(bbox, Normalization::Second) >= ENCLOSED)
            .min_by(|a, b| a.1.bbox.area().total_cmp(&b.1.bbox.area()))
            .map(|(i, _)| i)
    }

    fn connect(&mut self, calibration: &Calibration) {
        let n = self.nodes.len();
        self.adjacency = vec![Adjacency::default(); n];
        let v_limit = calibration.vertical_edge_limit();
        let h_limit = calibration.horizontal_edge_limit();

        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.nodes[i], &self.nodes[j]);
                if a.key != b.key {
                    continue;
                }
                if a.bbox.y_overlap(&b.bbox) > 0.0 {
                    let (left, right) = if a.bbox.center_x() <= b.bbox.center_x() {
                        (i, j)
                    } else {
                        (j, i)
                    };
                    if a.bbox.horizontal_gap(&b.bbox) < h_limit && !self.blocked_horizontally(left, right) {
                        self.adjacency[left].right.push(right);
                        self.adjacency[right].left.push(left);
                    }
                } else {
                    let (upper, lower) = if a.bbox.y0() <= b.bbox.y0() { (i, j) } else { (j, i) };
                    if a.bbox.x_overlap_fraction(&b.bbox, Normalization::Min) > VERTICAL_OVERLAP
                        && a.bbox.vertical_gap(&b.bbox) <= v_limit
                        && !self.blocked_vertically(upper, lower)
                    {
                        self.adjacency[upper].down.push(lower);
                        self.adjacency[lower].up.push(upper);
                    }
                }
            }
        }
    }

    /// Whether a node with the same key sits between `upper` and `lower`.
    fn blocked_vertically(&self, upper: usize, lower: usize) -> bool {
        let (u, l) = (&self.nodes[upper], &self.nodes[lower]);
        self.nodes.iter().enumerate().any(|(k, other)| {
            k != upper
                && k != lower
                && other.key == u.key
                && other.bbox.y0() >= u.bbox.y1() - BETWEEN_SLACK
                && other.bbox.y1() <= l.bbox.y0() + BETWEEN_SLACK
                && other.bbox.x_overlap(&u.bbox) > 0.0
                && other.bbox.x_overlap(&l.bbox) > 0.0
        })
    }

    /// Whether a node with the same key sits between `left` and `right`.
    fn blocked_horizontally(&self, left: usize, right: usize) -> bool {
        let (l, r) = (&self.nodes[left], &self.nodes[right]);
        self.nodes.iter().enumerate().any(|(k, other)| {
            k != left
                && k != right
                && other.key == l.key
                && other.bbox.x0() >= l.bbox.x1() - BETWEEN_SLACK
                && other.bbox.x1() <= r.bbox.x0() + BETWEEN_SLACK
                && other.bbox.y_overlap(&l.bbox) > 0.0
                && other.bbox.y_overlap(&r.bbox) > 0.0
        })
    }

    /// Connected components, each sorted by node index, ordered by their
    /// first node.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.nodes.len()];
        let mut components = Vec::new();
        for start in 0..self.nodes.len() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut queue = VecDeque::from([start]);
            let mut component = Vec::new();
            while let Some(i) = queue.pop_front() {
                component.push(i);
                for j in self.adjacency[i].all() {
                    if !seen[j] {
                        seen[j] = true;
                        queue.push_back(j);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn adjacency(&self, index: usize) -> Option<&Adjacency> {
        self.adjacency.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn enclosures(&self) -> &[Enclosure] {
        &self.enclosures
    }

    /// All straight rules on the page.
    pub fn rules(&self) -> &[BoundingBox] {
        &self.rules
    }

    /// Horizontal rules spanning most of the page width, top to bottom.
    pub fn full_width_rules(&self) -> &[BoundingBox] {
        &self.full_width_rules
    }

    pub fn table_frames(&self) -> &[BoundingBox] {
        &self.table_frames
    }

    /// Number of background images left out of the graph.
    pub fn dropped_images(&self) -> usize {
        self.dropped_images
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }
}

/// Whether node `i` reaches across a column gutter: it x-overlaps two
/// narrow nodes of the same partition that sit side by side, at least a
/// gutter apart.
fn spans_gutter(i: usize, boxes: &[BoundingBox], keys: &[PartitionKey], gutter: f32) -> bool {
    let node = &boxes[i];
    let under: Vec<&BoundingBox> = boxes
        .iter()
        .zip(keys)
        .enumerate()
        .filter(|&(k, (b, key))| {
            k != i
                && *key == keys[i]
                && !key.wide
                && b.y_overlap(node) <= 0.0
                && b.x_overlap(node) > 0.0
        })
        .map(|(_, (b, _))| b)
        .collect();
    under.iter().any(|a| {
        under
            .iter()
            .any(|b| b.x0() - a.x1() >= gutter && a.y_overlap(b) > 0.0)
    })
}
