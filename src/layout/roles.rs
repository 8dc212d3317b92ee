//! Text role classification from document-wide font statistics.
//!
//! The body size is the most common size weighted by character count.
//! Distinct size clusters above it rank as heading levels, larger first and
//! bold before regular at the same size. Classification looks only at
//! typography, never at the text itself.

use std::collections::BTreeMap;

use serde::Serialize;

use super::grouper::CandidateBlock;
use crate::model::{TextBlock, TextBlockType, TextRun};

/// Sizes this far above the body size are heading candidates.
const HEADING_MARGIN: f32 = 0.5;

/// Sizes this far below the body size are small print.
const SMALL_MARGIN: f32 = 1.0;

/// Blocks with more lines than this are never headings.
const MAX_HEADING_LINES: usize = 3;

/// Number of distinct heading levels.
const HEADING_LEVELS: usize = 5;

/// Body size used when no text has been observed.
const DEFAULT_BODY_SIZE: f32 = 12.0;

/// One distinct heading style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeadingCluster {
    pub size: f32,
    pub bold: bool,
    /// Heading level 1-5
    pub level: u8,
}

/// Font statistics for heading detection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FontStatistics {
    /// Body text font size (most common by characters)
    pub body_size: f32,

    /// Heading styles, largest first
    pub heading_clusters: Vec<HeadingCluster>,

    /// Characters observed per size (size x 10)
    pub size_histogram: BTreeMap<i32, usize>,

    /// Characters observed per (size x 10, bold)
    #[serde(skip)]
    style_histogram: BTreeMap<(i32, bool), usize>,
}

impl FontStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a run observation, weighted by its character count.
    pub fn add_run(&mut self, run: &TextRun) {
        let weight = run.text.chars().filter(|c| !c.is_whitespace()).count();
        self.add(run.font.size, run.font.bold, weight);
    }

    /// Add `weight` characters at a size.
    pub fn add(&mut self, size: f32, bold: bool, weight: usize) {
        if weight == 0 {
            return;
        }
        let key = size_key(size);
        *self.size_histogram.entry(key).or_insert(0) += weight;
        *self.style_histogram.entry((key, bold)).or_insert(0) += weight;
    }

    /// Fold another set of observations into this one.
    pub fn merge(&mut self, other: &FontStatistics) {
        for (key, count) in &other.size_histogram {
            *self.size_histogram.entry(*key).or_insert(0) += count;
        }
        for (key, count) in &other.style_histogram {
            *self.style_histogram.entry(*key).or_insert(0) += count;
        }
    }

    /// Whether any text has been observed.
    pub fn is_empty(&self) -> bool {
        self.size_histogram.is_empty()
    }

    /// Calculate body size and heading clusters.
    pub fn analyze(&mut self) {
        // Ties go to the smaller size: BTreeMap iterates ascending and
        // max_by_key keeps the last maximum, so iterate in reverse.
        let body_key = self
            .size_histogram
            .iter()
            .rev()
            .max_by_key(|(_, count)| **count)
            .map(|(key, _)| *key);
        self.body_size = body_key
            .map(|k| k as f32 / 10.0)
            .unwrap_or(DEFAULT_BODY_SIZE);

        let threshold = self.body_size + HEADING_MARGIN;
        let mut clusters: Vec<(f32, bool)> = self
            .style_histogram
            .keys()
            .map(|(key, bold)| (*key as f32 / 10.0, *bold))
            .filter(|(size, _)| *size > threshold)
            .collect();
        clusters.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));

        self.heading_clusters = clusters
            .into_iter()
            .enumerate()
            .map(|(i, (size, bold))| HeadingCluster {
                size,
                bold,
                level: (i + 1).min(HEADING_LEVELS) as u8,
            })
            .collect();
    }

    /// Heading level for a font, `None` for text at or below body size.
    pub fn heading_level(&self, size: f32, bold: bool) -> Option<u8> {
        if size <= self.body_size + HEADING_MARGIN {
            return None;
        }
        let key = size_key(size);
        if let Some(cluster) = self
            .heading_clusters
            .iter()
            .find(|c| size_key(c.size) == key && c.bold == bold)
        {
            return Some(cluster.level);
        }
        // Unseen style: take the level of the first cluster it is not
        // larger than.
        let level = self
            .heading_clusters
            .iter()
            .rev()
            .find(|c| c.size >= size)
            .map(|c| c.level)
            .unwrap_or(1);
        Some(level)
    }
}

fn size_key(size: f32) -> i32 {
    (size * 10.0).round() as i32
}

/// Assigns a [`TextBlockType`] to candidate blocks.
#[derive(Debug, Clone, Copy)]
pub struct RoleClassifier<'a> {
    stats: &'a FontStatistics,
}

impl<'a> RoleClassifier<'a> {
    pub fn new(stats: &'a FontStatistics) -> Self {
        Self { stats }
    }

    /// Decide the type of a block.
    pub fn role(&self, block: &CandidateBlock) -> TextBlockType {
        let Some(font) = block.dominant_font() else {
            return TextBlockType::Paragraph;
        };
        let size = font.size;

        if block.lines.len() <= MAX_HEADING_LINES {
            if let Some(level) = self.stats.heading_level(size, font.bold) {
                return TextBlockType::heading(level);
            }
        }

        if size < self.stats.body_size - SMALL_MARGIN {
            return TextBlockType::Small;
        }
        if (size - self.stats.body_size).abs() <= SMALL_MARGIN && block.is_uniformly_styled() {
            return TextBlockType::Emphasis;
        }
        TextBlockType::Paragraph
    }

    /// Classify a block, fixing its type.
    pub fn classify(&self, block: CandidateBlock) -> Option<TextBlock> {
        let kind = self.role(&block);
        block.classify(kind)
    }
}
