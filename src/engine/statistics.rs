//! Document-wide statistics, computed once before the page pass.

use crate::error::{Error, Result};
use crate::layout::graph::Band;
use crate::layout::{median, Calibration, FontStatistics, Grouper, MarginSignatures};
use crate::model::Line;

use super::page::PreparedPage;

/// Pages narrower than this are never split into columns.
const MIN_COLUMN_PAGE_WIDTH: f32 = 250.0;

/// Width of one occupancy slice when looking for gutters.
const SLICE_WIDTH: f32 = 3.0;

/// Narrowest empty run accepted as a gutter.
const MIN_GUTTER: f32 = 12.0;

/// Lines wider than this share of the text extent span the gutter.
const SPANNING_LINE: f32 = 0.6;

/// Read-only statistics shared by every page task.
#[derive(Debug, Clone)]
pub struct DocumentStatistics {
    /// Font size distribution and heading clusters
    pub fonts: FontStatistics,

    /// Thresholds measured on the sampled pages
    pub calibration: Calibration,

    /// Recurring margin lines
    pub margins: MarginSignatures,

    /// Number of pages calibration was measured on
    pub sampled_pages: usize,
}

impl DocumentStatistics {
    /// Gather statistics over the selected pages, sampling at most
    /// `sample_pages` of them for calibration.
    pub fn collect(pages: &[PreparedPage], sample_pages: usize) -> Result<Self> {
        if pages.is_empty() {
            return Err(Error::NoPages);
        }
        if !pages.iter().any(PreparedPage::has_content) {
            return Err(Error::NoContent);
        }

        let mut fonts = FontStatistics::new();
        for run in pages.iter().flat_map(|p| p.runs.iter()) {
            fonts.add_run(run);
        }
        fonts.analyze();

        let mut heights = Vec::new();
        let mut gutters = Vec::new();
        let mut lefts = Vec::new();
        let mut rights = Vec::new();
        let mut margins = MarginSignatures::new();

        let sampled = sample(pages, sample_pages);
        for page in &sampled {
            let lines = Grouper::new(&Calibration::for_page_width(page.width))
                .group_lines(page.runs.clone());
            if lines.is_empty() {
                continue;
            }
            heights.extend(lines.iter().map(|l| l.bbox.height()));
            lefts.extend(lines.iter().map(|l| l.bbox.x0()).reduce(f32::min));
            rights.extend(lines.iter().map(|l| l.bbox.x1()).reduce(f32::max));
            gutters.extend(find_gutter(&lines, page.height));
            margins.observe_page(&lines, page.height);
        }

        let width = pages.first().map(|p| p.width).unwrap_or(612.0);
        let fallback = Calibration::for_page_width(width);
        let calibration = Calibration {
            median_line_height: median(&mut heights).unwrap_or(fallback.median_line_height),
            column_gap: median(&mut gutters).unwrap_or(fallback.column_gap),
            body_left: median(&mut lefts).unwrap_or(fallback.body_left),
            body_right: median(&mut rights).unwrap_or(fallback.body_right),
        };

        log::debug!(
            "Calibrated on {} pages: body size {:.1}, line height {:.1}, column gap {:.1}, body {:.1}..{:.1}",
            sampled.len(),
            fonts.body_size,
            calibration.median_line_height,
            calibration.column_gap,
            calibration.body_left,
            calibration.body_right
        );

        Ok(Self {
            fonts,
            calibration,
            margins,
            sampled_pages: sampled.len(),
        })
    }
}

/// Evenly spaced pages, at most `limit` of them.
fn sample(pages: &[PreparedPage], limit: usize) -> Vec<&PreparedPage> {
    let limit = limit.max(1);
    if pages.len() <= limit {
        return pages.iter().collect();
    }
    (0..limit).map(|i| &pages[i * pages.len() / limit]).collect()
}

/// Width of the widest vertical gutter between text columns on a page.
///
/// The text extent is cut into thin vertical slices and each line marks the
/// slices it covers; the best empty run in the middle of the page is the
/// gutter. Margin lines and lines spanning most of the extent are ignored
/// so they do not close the gutter.
fn find_gutter(lines: &[Line], page_height: f32) -> Option<f32> {
    let lines: Vec<&Line> = lines
        .iter()
        .filter(|l| Band::of(&l.bbox, page_height) == Band::Body)
        .collect();
    let min_x = lines.iter().map(|l| l.bbox.x0()).reduce(f32::min)?;
    let max_x = lines.iter().map(|l| l.bbox.x1()).reduce(f32::max)?;
    let extent = max_x - min_x;
    if extent < MIN_COLUMN_PAGE_WIDTH {
        return None;
    }

    let slices = (extent / SLICE_WIDTH) as usize + 1;
    let mut occupancy = vec![0usize; slices];
    for line in &lines {
        if line.bbox.width() > extent * SPANNING_LINE {
            continue;
        }
        let start = ((line.bbox.x0() - min_x) / SLICE_WIDTH) as usize;
        let end = ((line.bbox.x1() - min_x) / SLICE_WIDTH) as usize;
        for slot in occupancy
            .iter_mut()
            .take(end.min(slices - 1) + 1)
            .skip(start)
        {
            *slot += 1;
        }
    }

    let search_start = slices * 15 / 100;
    let search_end = slices * 85 / 100;
    let center = slices / 2;

    // (length, distance of its centre from the page centre)
    let mut best: Option<(usize, usize)> = None;
    let mut consider = |start: usize, len: usize| {
        let width = len as f32 * SLICE_WIDTH;
        if width < MIN_GUTTER {
            return;
        }
        // A gutter has text on both sides.
        let flanked = occupancy[..start].iter().any(|&c| c > 0)
            && occupancy[start + len..].iter().any(|&c| c > 0);
        if !flanked {
            return;
        }
        let distance = (start + len / 2).abs_diff(center);
        let better = match best {
            None => true,
            Some((best_len, best_distance)) => {
                let best_width = best_len as f32 * SLICE_WIDTH;
                width > best_width * 1.5 || (width >= best_width * 0.7 && distance < best_distance)
            }
        };
        if better {
            best = Some((len, distance));
        }
    };

    let mut run_start = 0;
    let mut run_len = 0;
    for (i, &count) in occupancy
        .iter()
        .enumerate()
        .take(search_end)
        .skip(search_start)
    {
        if count == 0 {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
        } else if run_len > 0 {
            consider(run_start, run_len);
            run_len = 0;
        }
    }
    if run_len > 0 {
        consider(run_start, run_len);
    }

    best.map(|(len, _)| len as f32 * SLICE_WIDTH)
}
