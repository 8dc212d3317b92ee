//! Reading-order sequencing.
//!
//! Flow regions (columns and page-width regions) are ordered first. A
//! region's band is the number of page-width regions and full-width rules
//! above its top; lower bands come first. Within a band, regions that share
//! an x range read top to bottom and the rest read left to right, unless a
//! region starting between them spans both. The resulting precedence graph is linearised with a deterministic
//! topological sort; a cycle is broken by taking the pending region that
//! sits highest on the page.
//!
//! Each aside is hosted by the flow region it overlaps most and is emitted
//! where that region's content reaches the aside's top. An aside with no
//! host is ordered like a flow region of its own.
//!
//! The [`Sequencer`] then walks the plan as a state machine and yields
//! graph nodes and asides one at a time.

use std::cmp::Ordering;

use super::graph::LayoutGraph;
use super::regions::{Region, RegionKind};
use crate::geometry::BoundingBox;

/// One item of a page's reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequenced {
    /// A graph node
    Node(usize),
    /// An aside region, by region index
    Aside(usize),
}

/// Sequencer position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    /// Walking the items of a column region
    ScanColumns {
        region: usize,
        item: usize,
        aside: usize,
    },
    /// Walking the items of a page-width region
    EmitPageWidth {
        region: usize,
        item: usize,
        aside: usize,
    },
    /// About to emit an aside, then resume the region it interrupted
    EmitAside {
        region: usize,
        item: usize,
        aside: usize,
    },
    Done,
}

/// A region in reading order with its sorted items and hosted asides.
#[derive(Debug, Clone, PartialEq)]
struct PlanEntry {
    kind: RegionKind,
    items: Vec<usize>,
    /// (aside region, insert before item index)
    asides: Vec<(usize, usize)>,
}

/// Linearises a page's regions.
#[derive(Debug, Clone)]
pub struct Sequencer {
    order: Vec<usize>,
    plan: Vec<PlanEntry>,
    state: SequencerState,
    cycle_broken: bool,
}

impl Sequencer {
    /// Plan the reading order for a page. A precedence cycle is broken by
    /// position, see [`Sequencer::cycle_broken`].
    pub fn new(page: usize, regions: &[Region], graph: &LayoutGraph) -> Self {
        let flow: Vec<usize> = (0..regions.len())
            .filter(|&r| regions[r].kind.is_flow())
            .collect();

        let mut hosted: Vec<Vec<usize>> = vec![Vec::new(); regions.len()];
        let mut ordered: Vec<usize> = flow.clone();
        for (r, region) in regions.iter().enumerate() {
            if region.kind != RegionKind::Aside {
                continue;
            }
            match host_of(region, regions, &flow) {
                Some(host) => hosted[host].push(r),
                None => ordered.push(r),
            }
        }
        ordered.sort_unstable();

        let (order, cycle_broken) = topological_order(&ordered, regions, graph);
        if cycle_broken {
            log::warn!("Cyclic region precedence on page {}, ordering by position", page);
        }

        let plan = order
            .iter()
            .map(|&r| {
                let region = &regions[r];
                if region.kind == RegionKind::Aside {
                    return PlanEntry {
                        kind: RegionKind::Aside,
                        items: Vec::new(),
                        asides: vec![(r, 0)],
                    };
                }
                let items = sorted_items(&region.nodes, graph);
                let mut asides: Vec<(usize, usize)> = hosted[r]
                    .iter()
                    .map(|&a| {
                        let top = regions[a].top();
                        let at = items
                            .iter()
                            .position(|&n| graph.node(n).map(|n| n.bbox.y0() > top).unwrap_or(false))
                            .unwrap_or(items.len());
                        (a, at)
                    })
                    .collect();
                asides.sort_by(|a, b| {
                    a.1.cmp(&b.1)
                        .then(regions[a.0].top().total_cmp(&regions[b.0].top()))
                        .then(a.0.cmp(&b.0))
                });
                PlanEntry {
                    kind: region.kind,
                    items,
                    asides,
                }
            })
            .collect::<Vec<_>>();

        log::debug!("Page {} reading order over regions {:?}", page, order);

        let state = entry_state(&plan, 0, 0, 0);
        Self {
            order,
            plan,
            state,
            cycle_broken,
        }
    }

    /// Region indices in reading order, hosted asides excluded.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Whether region precedence was cyclic and had to be broken.
    pub fn cycle_broken(&self) -> bool {
        self.cycle_broken
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == SequencerState::Done
    }

    /// Rewind to the start of the page.
    pub fn reset(&mut self) {
        self.state = entry_state(&self.plan, 0, 0, 0);
    }
}

impl Iterator for Sequencer {
    type Item = Sequenced;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                SequencerState::ScanColumns {
                    region,
                    item,
                    aside,
                }
                | SequencerState::EmitPageWidth {
                    region,
                    item,
                    aside,
                } => {
                    let entry = &self.plan[region];
                    if let Some(&(_, at)) = entry.asides.get(aside) {
                        if at <= item {
                            self.state = SequencerState::EmitAside {
                                region,
                                item,
                                aside,
                            };
                            continue;
                        }
                    }
                    if let Some(&node) = entry.items.get(item) {
                        self.state = entry_state(&self.plan, region, item + 1, aside);
                        return Some(Sequenced::Node(node));
                    }
                    self.state = entry_state(&self.plan, region + 1, 0, 0);
                }

                SequencerState::EmitAside {
                    region,
                    item,
                    aside,
                } => {
                    let emitted = self.plan[region].asides.get(aside).map(|&(a, _)| a);
                    self.state = entry_state(&self.plan, region, item, aside + 1);
                    if let Some(a) = emitted {
                        return Some(Sequenced::Aside(a));
                    }
                }

                SequencerState::Done => return None,
            }
        }
    }
}

/// Scanning state for a plan position, `Done` past the end.
fn entry_state(plan: &[PlanEntry], region: usize, item: usize, aside: usize) -> SequencerState {
    match plan.get(region).map(|e| e.kind) {
        None => SequencerState::Done,
        Some(RegionKind::PageWidth) => SequencerState::EmitPageWidth {
            region,
            item,
            aside,
        },
        Some(_) => SequencerState::ScanColumns {
            region,
            item,
            aside,
        },
    }
}

/// Flow region an aside is read within: it must overlap the aside on both
/// axes; the largest x overlap wins.
fn host_of(aside: &Region, regions: &[Region], flow: &[usize]) -> Option<usize> {
    flow.iter()
        .copied()
        .filter(|&r| {
            let b = &regions[r].bbox;
            b.y_overlap(&aside.bbox) > 0.0 && b.x_overlap(&aside.bbox) > 0.0
        })
        .fold(None, |best: Option<(usize, f32)>, r| {
            let overlap = regions[r].bbox.x_overlap(&aside.bbox);
            match best {
                Some((_, o)) if o >= overlap => best,
                _ => Some((r, overlap)),
            }
        })
        .map(|(r, _)| r)
}

/// Node indices sorted top to bottom, then left to right.
pub(crate) fn sorted_items(nodes: &[usize], graph: &LayoutGraph) -> Vec<usize> {
    let mut items: Vec<(usize, BoundingBox)> = nodes
        .iter()
        .filter_map(|&n| graph.node(n).map(|node| (n, node.bbox)))
        .collect();
    items.sort_by(|(a, ba), (b, bb)| {
        ba.y0()
            .total_cmp(&bb.y0())
            .then(ba.x0().total_cmp(&bb.x0()))
            .then(a.cmp(b))
    });
    items.into_iter().map(|(n, _)| n).collect()
}

fn band(region: &Region, regions: &[Region], graph: &LayoutGraph) -> usize {
    let top = region.top();
    let page_width = regions
        .iter()
        .filter(|r| r.kind == RegionKind::PageWidth && r.bbox.center_y() < top)
        .count();
    let rules = graph
        .full_width_rules()
        .iter()
        .filter(|r| r.center_y() < top)
        .count();
    page_width + rules
}

/// Orders flow regions by pairwise precedence. Returns the order and
/// whether a precedence cycle had to be broken.
fn topological_order(
    candidates: &[usize],
    regions: &[Region],
    graph: &LayoutGraph,
) -> (Vec<usize>, bool) {
    let n = candidates.len();
    let bands: Vec<usize> = candidates
        .iter()
        .map(|&r| band(&regions[r], regions, graph))
        .collect();

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in 0..n {
            if i != j && precedes(i, j, candidates, &bands, regions) {
                successors[i].push(j);
            }
        }
    }

    let (order, broken) = linearize(&successors, |x, y| {
        let (a, b) = (&regions[candidates[x]].bbox, &regions[candidates[y]].bbox);
        bands[x]
            .cmp(&bands[y])
            .then(a.y0().total_cmp(&b.y0()))
            .then(a.x0().total_cmp(&b.x0()))
            .then(candidates[x].cmp(&candidates[y]))
    });
    (order.into_iter().map(|i| candidates[i]).collect(), broken)
}

/// Kahn's algorithm. Among ready nodes the smallest by `position` goes
/// first. When every pending node still waits on another, the smallest
/// pending node is forced out so the order always covers all nodes.
fn linearize<F>(successors: &[Vec<usize>], position: F) -> (Vec<usize>, bool)
where
    F: Fn(usize, usize) -> Ordering,
{
    let n = successors.len();
    let mut in_degree = vec![0usize; n];
    for next in successors {
        for &j in next {
            in_degree[j] += 1;
        }
    }

    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut broken = false;
    while order.len() < n {
        let ready = (0..n)
            .filter(|&i| !placed[i] && in_degree[i] == 0)
            .min_by(|&x, &y| position(x, y));
        let pick = match ready {
            Some(i) => i,
            None => {
                broken = true;
                match (0..n).filter(|&i| !placed[i]).min_by(|&x, &y| position(x, y)) {
                    Some(i) => i,
                    None => break,
                }
            }
        };
        placed[pick] = true;
        order.push(pick);
        for &j in &successors[pick] {
            in_degree[j] = in_degree[j].saturating_sub(1);
        }
    }
    (order, broken)
}

/// Whether candidate `i` reads before candidate `j`.
///
/// Regions sharing an x range read top to bottom. A region reads before one
/// to its right unless a third region, starting between their tops, spans
/// both; that region separates them into bands of their own.
fn precedes(
    i: usize,
    j: usize,
    candidates: &[usize],
    bands: &[usize],
    regions: &[Region],
) -> bool {
    if bands[i] != bands[j] {
        return bands[i] < bands[j];
    }
    let (a, b) = (&regions[candidates[i]], &regions[candidates[j]]);
    if a.bbox.x_overlap(&b.bbox) > 0.0 {
        return a.top() < b.top();
    }
    if a.bbox.x1() > b.bbox.x0() {
        return false;
    }
    let (upper, lower) = if a.top() <= b.top() {
        (a.top(), b.top())
    } else {
        (b.top(), a.top())
    };
    !(0..candidates.len()).any(|k| {
        let c = &regions[candidates[k]];
        k != i
            && k != j
            && bands[k] == bands[i]
            && c.top() > upper
            && c.top() < lower
            && c.bbox.x_overlap(&a.bbox) > 0.0
            && c.bbox.x_overlap(&b.bbox) > 0.0
    })
}
