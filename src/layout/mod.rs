//! Layout analysis stages.
//!
//! Each page runs through these stages in order:
//!
//! 1. [`cleanup`] normalises run text and drops overprints
//! 2. [`grouper`] clusters runs into lines and lines into candidate blocks
//! 3. [`graph`] builds the spatial adjacency graph over blocks and figures
//! 4. [`regions`] labels graph components (column, aside, header, footer,
//!    page-width)
//! 5. [`reading_order`] linearises regions into one sequence
//! 6. [`roles`] assigns heading levels and text roles
//! 7. [`lists`] collapses labelled blocks into lists
//! 8. [`tables`] merges detected tables into the sequence
//!
//! [`hierarchy`] runs once over all pages afterwards.

pub mod cleanup;
pub mod graph;
pub mod grouper;
pub mod hierarchy;
pub mod lists;
pub mod reading_order;
pub mod regions;
pub mod roles;
pub mod tables;

pub use cleanup::{CleanupOptions, CleanupPreset};
pub use graph::{LayoutGraph, NodeKind};
pub use grouper::{CandidateBlock, GroupedPage, Grouper};
pub use hierarchy::build_hierarchy;
pub use lists::{LabelFamily, ListAssembler};
pub use reading_order::{Sequenced, Sequencer, SequencerState};
pub use regions::{MarginSignatures, Region, RegionClassifier, RegionKind};
pub use roles::{FontStatistics, RoleClassifier};
pub use tables::{
    DetectorRunner, RulesTableDetector, TableCandidate, TableDetector, TableDetectorConfig, TableIntegrator,
    TablePage,
};

use serde::Serialize;

/// Fallback column gap when no gutter is found on any sampled page.
pub const DEFAULT_COLUMN_GAP: f32 = 18.0;

/// Fallback line height when no text is sampled.
pub const DEFAULT_LINE_HEIGHT: f32 = 12.0;

/// Document-wide thresholds measured on sampled pages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    /// Median height of a text line
    pub median_line_height: f32,

    /// Median width of column gutters
    pub column_gap: f32,

    /// Median left edge of body text
    pub body_left: f32,

    /// Median right edge of body text
    pub body_right: f32,
}

impl Calibration {
    pub fn body_width(&self) -> f32 {
        (self.body_right - self.body_left).max(1.0)
    }

    /// Largest vertical gap bridged by a graph edge.
    pub fn vertical_edge_limit(&self) -> f32 {
        (self.median_line_height * 2.5).max(8.0)
    }

    /// Largest horizontal gap bridged by a graph edge.
    pub fn horizontal_edge_limit(&self) -> f32 {
        self.column_gap * 0.5
    }

    /// Calibration for a page of the given width with 1-inch margins.
    pub fn for_page_width(width: f32) -> Self {
        Self {
            median_line_height: DEFAULT_LINE_HEIGHT,
            column_gap: DEFAULT_COLUMN_GAP,
            body_left: 72.0_f32.min(width / 4.0),
            body_right: (width - 72.0).max(width * 0.75),
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::for_page_width(612.0)
    }
}

/// Median of a list of values, `None` when empty.
pub(crate) fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }

    #[test]
    fn test_default_calibration() {
        let cal = Calibration::default();
        assert_eq!(cal.body_width(), 468.0);
        assert_eq!(cal.vertical_edge_limit(), 30.0);
        assert_eq!(cal.horizontal_edge_limit(), 9.0);
    }
}
