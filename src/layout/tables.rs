//! Table detection and integration.
//!
//! Detectors sit behind the [`TableDetector`] trait so the built-in ruled
//! grid detector and an external model-based detector are interchangeable.
//! When both propose overlapping regions, the ruled candidate survives only
//! if its row and column counts agree with the rules drawn on the page.
//! Accepted tables replace the elements they cover.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{panic_message, Error, Result};
use crate::geometry::{BoundingBox, Normalization};
use crate::model::{
    LayoutElement, LayoutElementGroup, Line, Table, TableStrategy, TextBlock, TextBlockType,
};

/// Overlap at which two candidates compete for the same region.
const COMPETING_OVERLAP: f32 = 0.5;

/// Share of an element that must be covered for a table to replace it.
const REPLACED_COVERAGE: f32 = 0.5;

/// Everything a detector gets to see of a page.
#[derive(Debug, Clone, Default)]
pub struct TablePage {
    /// 0-based page index
    pub index: usize,
    pub width: f32,
    pub height: f32,
    /// Straight rules drawn on the page
    pub rules: Vec<BoundingBox>,
    /// Boxes drawn around ruled grids
    pub frames: Vec<BoundingBox>,
    /// Text lines, top to bottom
    pub lines: Vec<Line>,
}

impl TablePage {
    fn horizontal_rules(&self) -> impl Iterator<Item = &BoundingBox> {
        self.rules.iter().filter(|r| r.height() <= r.width())
    }

    fn vertical_rules(&self) -> impl Iterator<Item = &BoundingBox> {
        self.rules.iter().filter(|r| r.width() < r.height())
    }
}

/// A table region proposed by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct TableCandidate {
    pub bbox: BoundingBox,
    /// Row-major cell boxes
    pub cells: Vec<Vec<BoundingBox>>,
    pub strategy: TableStrategy,
    pub confidence: f32,
    pub row_header_index: Option<usize>,
    pub col_header_index: Option<usize>,
}

impl TableCandidate {
    pub fn new(bbox: BoundingBox, cells: Vec<Vec<BoundingBox>>, strategy: TableStrategy) -> Self {
        Self {
            bbox,
            cells,
            strategy,
            confidence: 1.0,
            row_header_index: None,
            col_header_index: None,
        }
    }

    /// Build a candidate from grid line positions.
    pub fn from_grid(xs: &[f32], ys: &[f32], strategy: TableStrategy) -> Result<Self> {
        let (Some(&x0), Some(&x1), Some(&y0), Some(&y1)) =
            (xs.first(), xs.last(), ys.first(), ys.last())
        else {
            return Err(Error::InvalidBoundingBox("empty table grid".to_string()));
        };
        let mut cells = Vec::with_capacity(ys.len().saturating_sub(1));
        for row in ys.windows(2) {
            let mut cols = Vec::with_capacity(xs.len().saturating_sub(1));
            for col in xs.windows(2) {
                cols.push(BoundingBox::new(col[0], row[0], col[1], row[1])?);
            }
            cells.push(cols);
        }
        Ok(Self::new(BoundingBox::new(x0, y0, x1, y1)?, cells, strategy))
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn columns(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn row_boxes(&self) -> Vec<BoundingBox> {
        self.cells
            .iter()
            .filter_map(|row| BoundingBox::merge_all(row))
            .collect()
    }

    fn col_boxes(&self) -> Vec<BoundingBox> {
        (0..self.columns())
            .filter_map(|c| BoundingBox::merge_all(self.cells.iter().filter_map(|row| row.get(c))))
            .collect()
    }
}

/// A source of table candidates.
pub trait TableDetector: Send + Sync {
    /// Strategy tag reported on the tables this detector produces.
    fn strategy(&self) -> TableStrategy;

    /// Propose table regions for a page.
    fn detect_tables(&self, page: &TablePage) -> Result<Vec<TableCandidate>>;

    /// Plain in-process computation that cannot hang. Such detectors are
    /// never put behind a timeout.
    fn runs_in_process(&self) -> bool {
        false
    }
}

/// Ruled-grid detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Rule positions closer than this merge into one grid line (points)
    pub snap_tolerance: f32,
    /// Reach used when testing whether rules touch (points)
    pub join_tolerance: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            snap_tolerance: 2.0,
            join_tolerance: 3.0,
        }
    }
}

/// Finds tables drawn as grids of horizontal and vertical rules.
#[derive(Debug, Clone, Default)]
pub struct RulesTableDetector {
    config: TableDetectorConfig,
}

impl RulesTableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Group rules and frames that touch into clusters.
    fn clusters(&self, page: &TablePage) -> Vec<Vec<BoundingBox>> {
        let shapes: Vec<BoundingBox> = page.rules.iter().chain(&page.frames).copied().collect();
        let mut parent: Vec<usize> = (0..shapes.len()).collect();

        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for i in 0..shapes.len() {
            let reach = shapes[i].expand(self.config.join_tolerance);
            for j in (i + 1)..shapes.len() {
                if reach.x_overlap(&shapes[j]) > 0.0 && reach.y_overlap(&shapes[j]) > 0.0 {
                    let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                    if a != b {
                        parent[b.max(a)] = a.min(b);
                    }
                }
            }
        }

        let mut groups: Vec<Vec<BoundingBox>> = Vec::new();
        let mut slot: Vec<Option<usize>> = vec![None; shapes.len()];
        for i in 0..shapes.len() {
            let root = find(&mut parent, i);
            match slot[root] {
                Some(g) => groups[g].push(shapes[i]),
                None => {
                    slot[root] = Some(groups.len());
                    groups.push(vec![shapes[i]]);
                }
            }
        }
        groups
    }

    fn grid_lines(&self, cluster: &[BoundingBox]) -> (Vec<f32>, Vec<f32>) {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for shape in cluster {
            let (w, h) = (shape.width(), shape.height());
            if h <= self.config.snap_tolerance && w > h {
                ys.push(shape.center_y());
            } else if w <= self.config.snap_tolerance && h > w {
                xs.push(shape.center_x());
            } else {
                xs.extend([shape.x0(), shape.x1()]);
                ys.extend([shape.y0(), shape.y1()]);
            }
        }
        (
            snap(xs, self.config.snap_tolerance),
            snap(ys, self.config.snap_tolerance),
        )
    }
}

impl TableDetector for RulesTableDetector {
    fn strategy(&self) -> TableStrategy {
        TableStrategy::Rules
    }

    fn runs_in_process(&self) -> bool {
        true
    }

    fn detect_tables(&self, page: &TablePage) -> Result<Vec<TableCandidate>> {
        let mut candidates = Vec::new();
        for cluster in self.clusters(page) {
            let (xs, ys) = self.grid_lines(&cluster);
            let (rows, cols) = (ys.len().saturating_sub(1), xs.len().saturating_sub(1));
            if rows < self.config.min_rows || cols < self.config.min_columns {
                continue;
            }
            log::debug!(
                "RulesTableDetector: {}x{} grid on page {}",
                rows,
                cols,
                page.index
            );
            candidates.push(TableCandidate::from_grid(&xs, &ys, TableStrategy::Rules)?);
        }
        Ok(candidates)
    }
}

/// Sort values and merge those closer than `tolerance`.
fn snap(mut values: Vec<f32>, tolerance: f32) -> Vec<f32> {
    values.sort_by(|a, b| a.total_cmp(b));
    let mut out: Vec<f32> = Vec::with_capacity(values.len());
    for v in values {
        match out.last() {
            Some(&last) if v - last <= tolerance => {}
            _ => out.push(v),
        }
    }
    out
}

/// Calls table detectors during the page pass.
///
/// In-process detectors always run inline on the page's thread. Other
/// detectors run inline when no timeout is set; with one, they run on a
/// bounded pool shared by the whole run and are abandoned there when they
/// miss the deadline.
pub struct DetectorRunner {
    timeout: Option<Duration>,
    pool: Option<ThreadPool>,
}

impl DetectorRunner {
    /// Call every detector on the caller's thread.
    pub fn inline() -> Self {
        Self {
            timeout: None,
            pool: None,
        }
    }

    /// Bound external detectors by `timeout`, running at most `threads` of
    /// them at once.
    pub fn bounded(timeout: Duration, threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("table-detector-{}", i))
            .build()
            .map_err(|e| Error::Other(format!("Failed to start table detector pool: {}", e)))?;
        Ok(Self {
            timeout: Some(timeout),
            pool: Some(pool),
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run one detector on one page.
    pub fn run(
        &self,
        detector: &Arc<dyn TableDetector>,
        page: &TablePage,
    ) -> Result<Vec<TableCandidate>> {
        let (Some(timeout), Some(pool)) = (self.timeout, self.pool.as_ref()) else {
            return detector.detect_tables(page);
        };
        if detector.runs_in_process() {
            return detector.detect_tables(page);
        }

        let (tx, rx) = bounded(1);
        let worker = Arc::clone(detector);
        let owned = page.clone();
        pool.spawn(move || {
            let index = owned.index;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| worker.detect_tables(&owned)))
                .unwrap_or_else(|payload| {
                    Err(Error::Collaborator {
                        page: index,
                        message: format!("detector panicked: {}", panic_message(payload.as_ref())),
                    })
                });
            let _ = tx.send(outcome);
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(Error::CollaboratorTimeout {
                page: page.index,
                strategy: detector.strategy().to_string(),
                timeout_ms: timeout.as_millis(),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Collaborator {
                page: page.index,
                message: format!("{} detector exited without a result", detector.strategy()),
            }),
        }
    }
}

impl std::fmt::Debug for DetectorRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorRunner")
            .field("timeout", &self.timeout)
            .field("threads", &self.pool.as_ref().map(|p| p.current_num_threads()))
            .finish()
    }
}

/// Resolves competing candidates and merges tables into a page.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableIntegrator;

impl TableIntegrator {
    pub fn new() -> Self {
        Self
    }

    /// Pick the winners among rules and model candidates.
    pub fn resolve(
        &self,
        rules: Vec<TableCandidate>,
        ml: Vec<TableCandidate>,
        page: &TablePage,
    ) -> Vec<TableCandidate> {
        let mut ml_dropped = vec![false; ml.len()];
        let mut accepted = Vec::new();

        for candidate in rules {
            let competing: Vec<usize> = ml
                .iter()
                .enumerate()
                .filter(|(_, m)| m.bbox.overlap_fraction(&candidate.bbox) >= COMPETING_OVERLAP)
                .map(|(i, _)| i)
                .collect();
            if competing.is_empty() {
                accepted.push(candidate);
            } else if grid_consistent(&candidate, page) {
                log::debug!(
                    "Page {}: ruled {}x{} table wins over model region",
                    page.index,
                    candidate.rows(),
                    candidate.columns()
                );
                for i in competing {
                    ml_dropped[i] = true;
                }
                accepted.push(candidate);
            } else {
                log::debug!(
                    "Page {}: ruled {}x{} table disagrees with drawn grid, using model region",
                    page.index,
                    candidate.rows(),
                    candidate.columns()
                );
            }
        }

        accepted.extend(
            ml.into_iter()
                .zip(ml_dropped)
                .filter(|(_, dropped)| !dropped)
                .map(|(m, _)| m),
        );
        accepted.sort_by(|a, b| {
            a.bbox
                .y0()
                .total_cmp(&b.bbox.y0())
                .then(a.bbox.x0().total_cmp(&b.bbox.x0()))
        });
        accepted
    }

    /// Fill a candidate's cells with the lines they cover. A ruled candidate
    /// is rejected when a covered line falls in no cell.
    pub fn build_table(&self, candidate: &TableCandidate, page: &TablePage) -> Option<Table> {
        let rows = candidate.rows();
        let cols = candidate.columns();
        if rows == 0 || cols == 0 {
            return None;
        }
        let mut grid: Vec<Vec<Vec<Line>>> = vec![vec![Vec::new(); cols]; rows];

        for line in &page.lines {
            let (cx, cy) = (line.bbox.center_x(), line.bbox.center_y());
            if !candidate.bbox.contains_point(cx, cy) {
                continue;
            }
            let cell = candidate.cells.iter().enumerate().find_map(|(r, row)| {
                row.iter()
                    .position(|c| c.contains_point(cx, cy))
                    .map(|c| (r, c))
            });
            match cell {
                Some((r, c)) => grid[r][c].push(line.clone()),
                None if candidate.strategy == TableStrategy::Rules => {
                    log::debug!(
                        "Page {}: line '{}' spans ruled cells, rejecting table",
                        page.index,
                        line.text()
                    );
                    return None;
                }
                None => {}
            }
        }

        let mut table = Table::new(
            candidate.bbox,
            candidate.row_boxes(),
            candidate.col_boxes(),
            candidate.strategy,
        );
        let header_row_bold = rows >= 2
            && grid[0].iter().any(|c| !c.is_empty())
            && grid[0]
                .iter()
                .flatten()
                .flat_map(|l| l.spans.iter())
                .all(|s| s.font.bold);
        for (r, row) in grid.into_iter().enumerate() {
            for (c, lines) in row.into_iter().enumerate() {
                if let (Some(block), Some(cell)) = (
                    TextBlock::new(TextBlockType::Paragraph, lines),
                    table.cells.get_mut(r).and_then(|row| row.get_mut(c)),
                ) {
                    cell.items.push(LayoutElement::TextBlock(block));
                }
            }
        }
        table.row_header_index = candidate
            .row_header_index
            .or(header_row_bold.then_some(0));
        table.col_header_index = candidate.col_header_index;
        Some(table)
    }

    /// Replace the elements each table covers with the table itself.
    pub fn integrate(&self, mut elements: Vec<LayoutElement>, tables: Vec<Table>) -> Vec<LayoutElement> {
        for table in tables {
            elements = place(elements, table);
        }
        elements
    }
}

/// Whether a ruled candidate's rows and columns agree with the rules drawn
/// across it. Outer borders may or may not be drawn as rules.
pub fn grid_consistent(candidate: &TableCandidate, page: &TablePage) -> bool {
    let tolerance = TableDetectorConfig::default().snap_tolerance;
    let area = candidate.bbox.expand(tolerance);
    let horizontal = snap(
        page.horizontal_rules()
            .filter(|r| {
                area.contains_point(r.center_x(), r.center_y())
                    && r.x_overlap_fraction(&candidate.bbox, Normalization::Second) >= 0.5
            })
            .map(|r| r.center_y())
            .collect(),
        tolerance,
    )
    .len();
    let vertical = snap(
        page.vertical_rules()
            .filter(|r| {
                area.contains_point(r.center_x(), r.center_y())
                    && r.y_overlap_fraction(&candidate.bbox, Normalization::Second) >= 0.5
            })
            .map(|r| r.center_x())
            .collect(),
        tolerance,
    )
    .len();

    let (rows, cols) = (candidate.rows(), candidate.columns());
    let fits = |drawn: usize, cells: usize| drawn + 1 == cells || drawn == cells + 1;
    fits(horizontal, rows) && fits(vertical, cols)
}

/// Asides are never replaced whole; tables go inside them instead.
fn covered(element: &LayoutElement, table: &Table) -> bool {
    !element.is_aside()
        && element
            .bbox()
            .map(|b| b.overlap_with(&table.bbox, Normalization::First) >= REPLACED_COVERAGE)
            .unwrap_or(false)
}

/// Put a table into a sequence, replacing what it covers. Falls back to
/// asides, then to inserting by position.
fn place(elements: Vec<LayoutElement>, table: Table) -> Vec<LayoutElement> {
    match replace_covered(elements, table) {
        Ok(elements) => elements,
        Err((mut elements, table)) => {
            let at = elements
                .iter()
                .position(|e| e.bbox().map(|b| b.y0() > table.bbox.y0()).unwrap_or(false))
                .unwrap_or(elements.len());
            elements.insert(at, LayoutElement::Table(table));
            elements
        }
    }
}

/// Replace covered elements at this level or inside an aside. Hands the
/// table back when it covers nothing.
fn replace_covered(
    elements: Vec<LayoutElement>,
    table: Table,
) -> std::result::Result<Vec<LayoutElement>, (Vec<LayoutElement>, Table)> {
    let flags: Vec<bool> = elements.iter().map(|e| covered(e, &table)).collect();
    if flags.iter().any(|&f| f) {
        let mut out = Vec::with_capacity(elements.len());
        let mut table = Some(table);
        for (element, is_covered) in elements.into_iter().zip(flags) {
            if !is_covered {
                out.push(element);
            } else if let Some(t) = table.take() {
                out.push(LayoutElement::Table(t));
            }
        }
        return Ok(out);
    }

    let mut elements = elements;
    let mut table = table;
    for element in elements.iter_mut() {
        let LayoutElement::Aside(aside) = element else {
            continue;
        };
        let inside = aside.bbox().map(|b| b.overlaps(&table.bbox)).unwrap_or(false);
        if !inside {
            continue;
        }
        match replace_covered(aside.items().to_vec(), table) {
            Ok(items) => {
                if let Err(e) = aside.replace_items(items) {
                    log::warn!("Could not place table inside aside: {}", e);
                }
                return Ok(elements);
            }
            Err((_, back)) => table = back,
        }
    }
    Err((elements, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;
    use crate::model::{Aside, FontInfo, Span};

    fn bbox(x0: f32, y0: f32, x1: f32, y1: f32) -> BoundingBox {
        BoundingBox::new(x0, y0, x1, y1).unwrap()
    }

    fn line(text: &str, x0: f32, y0: f32, x1: f32) -> Line {
        Line::new(vec![Span::new(
            text,
            FontInfo::new("Helvetica", 10.0),
            bbox(x0, y0, x1, y0 + 10.0),
        )])
        .unwrap()
    }

    fn paragraph(text: &str, x0: f32, y0: f32, x1: f32) -> LayoutElement {
        LayoutElement::TextBlock(
            TextBlock::new(TextBlockType::Paragraph, vec![line(text, x0, y0, x1)]).unwrap(),
        )
    }

    /// Rules for a grid with lines at the given positions.
    fn grid_rules(xs: &[f32], ys: &[f32]) -> Vec<BoundingBox> {
        let (left, right) = (xs[0], xs[xs.len() - 1]);
        let (top, bottom) = (ys[0], ys[ys.len() - 1]);
        let mut rules: Vec<BoundingBox> = ys.iter().map(|&y| bbox(left, y - 0.25, right, y + 0.25)).collect();
        rules.extend(xs.iter().map(|&x| bbox(x - 0.25, top, x + 0.25, bottom)));
        rules
    }

    #[test]
    fn test_detects_ruled_grid() {
        let page = TablePage {
            rules: grid_rules(&[100.0, 200.0, 300.0, 400.0], &[100.0, 120.0, 140.0, 160.0]),
            ..Default::default()
        };
        let candidates = RulesTableDetector::new().detect_tables(&page).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].rows(), 3);
        assert_eq!(candidates[0].columns(), 3);
        assert_eq!(candidates[0].bbox.to_array(), [100.0, 100.0, 400.0, 160.0]);
        assert!(grid_consistent(&candidates[0], &page));
    }

    #[test]
    fn test_frame_supplies_outer_border() {
        let mut rules = vec![bbox(100.0, 129.75, 300.0, 130.25)];
        rules.push(bbox(199.75, 100.0, 200.25, 160.0));
        let page = TablePage {
            rules,
            frames: vec![bbox(100.0, 100.0, 300.0, 160.0)],
            ..Default::default()
        };
        let candidates = RulesTableDetector::new().detect_tables(&page).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!((candidates[0].rows(), candidates[0].columns()), (2, 2));
        assert!(grid_consistent(&candidates[0], &page));
    }

    #[test]
    fn test_lone_rules_are_not_tables() {
        let page = TablePage {
            rules: vec![bbox(72.0, 300.0, 540.0, 300.5)],
            ..Default::default()
        };
        assert!(RulesTableDetector::new().detect_tables(&page).unwrap().is_empty());
    }

    fn competing(page_rules: Vec<BoundingBox>) -> (Vec<TableCandidate>, TablePage) {
        // Rules 3x3 over [100, 400] x [100, 200]; model 3x4 over [190, 490] x [100, 200]
        // overlap at 0.7.
        let rules = TableCandidate::from_grid(
            &[100.0, 200.0, 300.0, 400.0],
            &[100.0, 133.0, 166.0, 200.0],
            TableStrategy::Rules,
        )
        .unwrap();
        let ml = TableCandidate::from_grid(
            &[190.0, 265.0, 340.0, 415.0, 490.0],
            &[100.0, 133.0, 166.0, 200.0],
            TableStrategy::Ml,
        )
        .unwrap()
        .with_confidence(0.8);
        let page = TablePage {
            rules: page_rules,
            ..Default::default()
        };
        let resolved = TableIntegrator::new().resolve(vec![rules], vec![ml], &page);
        (resolved, page)
    }

    #[test]
    fn test_consistent_rules_win() {
        let drawn = grid_rules(&[100.0, 200.0, 300.0, 400.0], &[100.0, 133.0, 166.0, 200.0]);
        let (resolved, _) = competing(drawn);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].strategy, TableStrategy::Rules);
    }

    #[test]
    fn test_inconsistent_rules_lose() {
        let drawn = grid_rules(&[100.0, 175.0, 250.0, 325.0, 400.0, 475.0], &[100.0, 133.0, 166.0, 200.0]);
        let (resolved, _) = competing(drawn);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].strategy, TableStrategy::Ml);
        assert_eq!(resolved[0].columns(), 4);
    }

    #[test]
    fn test_build_table_fills_cells() {
        let page = TablePage {
            lines: vec![
                line("Name", 105.0, 105.0, 150.0),
                line("Value", 205.0, 105.0, 250.0),
                line("alpha", 105.0, 125.0, 150.0),
                line("1", 205.0, 125.0, 215.0),
                line("outside", 105.0, 300.0, 150.0),
            ],
            ..Default::default()
        };
        let candidate =
            TableCandidate::from_grid(&[100.0, 200.0, 300.0], &[100.0, 120.0, 140.0], TableStrategy::Rules)
                .unwrap();
        let table = TableIntegrator::new().build_table(&candidate, &page).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.plain_text(), "Name\tValue\nalpha\t1");
    }

    #[test]
    fn test_line_across_ruled_cells_rejects_table() {
        let page = TablePage {
            lines: vec![line("a heading wider than one cell", 150.0, 100.5, 250.0)],
            ..Default::default()
        };
        // The line's centre (200, 105.5) falls between the cells.
        let gapped = TableCandidate::new(
            bbox(100.0, 100.0, 300.0, 140.0),
            vec![
                vec![bbox(100.0, 100.0, 195.0, 104.0), bbox(205.0, 100.0, 300.0, 104.0)],
                vec![bbox(100.0, 106.0, 195.0, 140.0), bbox(205.0, 106.0, 300.0, 140.0)],
            ],
            TableStrategy::Rules,
        );
        assert!(TableIntegrator::new().build_table(&gapped, &page).is_none());
    }

    #[test]
    fn test_integrate_replaces_covered_elements() {
        let elements = vec![
            paragraph("before", 72.0, 50.0, 300.0),
            paragraph("Name", 105.0, 105.0, 150.0),
            paragraph("Value", 205.0, 105.0, 250.0),
            paragraph("after", 72.0, 200.0, 300.0),
        ];
        let table = Table::new(bbox(100.0, 100.0, 300.0, 140.0), Vec::new(), Vec::new(), TableStrategy::Rules);
        let out = TableIntegrator::new().integrate(elements, vec![table]);
        let names: Vec<&str> = out.iter().map(LayoutElement::name).collect();
        assert_eq!(names, vec!["textblock", "table", "textblock"]);
        assert_eq!(out[2].plain_text(), "after");
    }

    #[test]
    fn test_integrate_inside_aside() {
        let aside = Aside::new(vec![
            paragraph("Boxed", 105.0, 105.0, 150.0),
            paragraph("cells", 205.0, 105.0, 250.0),
        ])
        .unwrap();
        let elements = vec![paragraph("before", 72.0, 50.0, 300.0), LayoutElement::Aside(aside)];
        let table = Table::new(bbox(100.0, 100.0, 300.0, 120.0), Vec::new(), Vec::new(), TableStrategy::Ml);
        let out = TableIntegrator::new().integrate(elements, vec![table]);
        assert_eq!(out.len(), 2);
        match &out[1] {
            LayoutElement::Aside(a) => {
                assert_eq!(a.items().len(), 1);
                assert_eq!(a.items()[0].name(), "table");
            }
            other => panic!("expected aside, got {}", other.name()),
        }
    }

    struct SlowDetector;

    impl TableDetector for SlowDetector {
        fn strategy(&self) -> TableStrategy {
            TableStrategy::Ml
        }

        fn detect_tables(&self, _page: &TablePage) -> Result<Vec<TableCandidate>> {
            thread::sleep(Duration::from_millis(500));
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_detector_timeout() {
        let detector: Arc<dyn TableDetector> = Arc::new(SlowDetector);
        let page = TablePage {
            index: 4,
            ..Default::default()
        };
        let runner = DetectorRunner::bounded(Duration::from_millis(20), 1).unwrap();
        let result = runner.run(&detector, &page);
        assert!(matches!(
            result,
            Err(Error::CollaboratorTimeout { page: 4, .. })
        ));
    }

    /// Records the name of the thread each call ran on.
    struct ThreadRecorder {
        in_process: bool,
        threads: Mutex<Vec<Option<String>>>,
    }

    impl ThreadRecorder {
        fn new(in_process: bool) -> Arc<Self> {
            Arc::new(Self {
                in_process,
                threads: Mutex::new(Vec::new()),
            })
        }
    }

    impl TableDetector for ThreadRecorder {
        fn strategy(&self) -> TableStrategy {
            TableStrategy::Rules
        }

        fn detect_tables(&self, _page: &TablePage) -> Result<Vec<TableCandidate>> {
            let name = thread::current().name().map(str::to_string);
            self.threads.lock().unwrap().push(name);
            Ok(Vec::new())
        }

        fn runs_in_process(&self) -> bool {
            self.in_process
        }
    }

    #[test]
    fn test_in_process_detector_runs_inline() {
        assert!(RulesTableDetector::new().runs_in_process());

        let runner = DetectorRunner::bounded(Duration::from_secs(5), 2).unwrap();
        let recorder = ThreadRecorder::new(true);
        let detector: Arc<dyn TableDetector> = recorder.clone();
        for _ in 0..3 {
            runner.run(&detector, &TablePage::default()).unwrap();
        }

        let caller = thread::current().name().map(str::to_string);
        let threads = recorder.threads.lock().unwrap();
        assert_eq!(threads.len(), 3);
        assert!(threads.iter().all(|t| *t == caller));
    }

    #[test]
    fn test_external_detectors_share_a_bounded_pool() {
        let runner = DetectorRunner::bounded(Duration::from_secs(5), 2).unwrap();
        let recorder = ThreadRecorder::new(false);
        let detector: Arc<dyn TableDetector> = recorder.clone();
        for _ in 0..10 {
            runner.run(&detector, &TablePage::default()).unwrap();
        }

        let threads = recorder.threads.lock().unwrap();
        let mut names: Vec<&str> = threads.iter().filter_map(|t| t.as_deref()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(threads.len(), 10);
        assert!(!names.is_empty() && names.len() <= 2);
        assert!(names.iter().all(|n| n.starts_with("table-detector-")));
    }

    struct PanickingDetector;

    impl TableDetector for PanickingDetector {
        fn strategy(&self) -> TableStrategy {
            TableStrategy::Ml
        }

        fn detect_tables(&self, _page: &TablePage) -> Result<Vec<TableCandidate>> {
            panic!("model crashed")
        }
    }

    #[test]
    fn test_detector_panic_on_pool_is_an_error() {
        let runner = DetectorRunner::bounded(Duration::from_secs(5), 1).unwrap();
        let detector: Arc<dyn TableDetector> = Arc::new(PanickingDetector);
        let page = TablePage {
            index: 2,
            ..Default::default()
        };
        match runner.run(&detector, &page) {
            Err(Error::Collaborator { page, message }) => {
                assert_eq!(page, 2);
                assert!(message.contains("model crashed"));
            }
            other => panic!("expected collaborator error, got {:?}", other),
        }
        // The pool survives the panic.
        let recorder: Arc<dyn TableDetector> = ThreadRecorder::new(false);
        assert!(runner.run(&recorder, &page).unwrap().is_empty());
    }

    #[test]
    fn test_inline_runner_has_no_timeout() {
        let runner = DetectorRunner::inline();
        assert_eq!(runner.timeout(), None);
        let recorder = ThreadRecorder::new(false);
        let detector: Arc<dyn TableDetector> = recorder.clone();
        runner.run(&detector, &TablePage::default()).unwrap();
        let caller = thread::current().name().map(str::to_string);
        assert_eq!(recorder.threads.lock().unwrap()[0], caller);
    }
}
