//! Engine options and page selection.

use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::layout::CleanupOptions;

/// Default bound on a single table detector call.
pub const DEFAULT_TABLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of pages sampled for document calibration.
pub const DEFAULT_SAMPLE_PAGES: usize = 32;

/// Options for analyzing a document.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Run the installed model-based table detector alongside the rules pass
    pub ml_tables: bool,

    /// Page selection (which pages to analyze)
    pub pages: PageSelection,

    /// Worker threads for the page pass (0 = one per CPU, 1 = synchronous)
    pub workers: usize,

    /// Include bounding boxes and font statistics in output
    pub detailed: bool,

    /// Bound on each table detector call (`None` runs detectors inline)
    pub table_timeout: Option<Duration>,

    /// Pages sampled for calibration
    pub sample_pages: usize,

    /// Text-run cleanup applied before grouping
    pub cleanup: CleanupOptions,
}

impl EngineOptions {
    /// Create new engine options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable model-based table detection.
    pub fn with_ml_tables(mut self, enabled: bool) -> Self {
        self.ml_tables = enabled;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Set the number of worker threads.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Run the page pass on the calling thread.
    pub fn sequential(mut self) -> Self {
        self.workers = 1;
        self
    }

    /// Include bounding boxes and font statistics in output.
    pub fn with_detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }

    /// Set the table detector timeout.
    pub fn with_table_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.table_timeout = timeout;
        self
    }

    /// Set how many pages are sampled for calibration.
    pub fn with_sample_pages(mut self, pages: usize) -> Self {
        self.sample_pages = pages.max(1);
        self
    }

    /// Set cleanup options.
    pub fn with_cleanup(mut self, cleanup: CleanupOptions) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Whether the page pass runs without a thread pool.
    pub fn is_sequential(&self) -> bool {
        self.workers == 1
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            ml_tables: false,
            pages: PageSelection::All,
            workers: 0,
            detailed: false,
            table_timeout: Some(DEFAULT_TABLE_TIMEOUT),
            sample_pages: DEFAULT_SAMPLE_PAGES,
            cleanup: CleanupOptions::default(),
        }
    }
}

/// Page selection for analysis. Page numbers are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A contiguous range of pages
    Range(RangeInclusive<u32>),
    /// Specific page numbers
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5-7").
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        if !s.contains(',') {
            if let Some((start, end)) = s.split_once('-') {
                let (start, end) = (page_number(start)?, page_number(end)?);
                if start > end {
                    return Err(Error::InvalidPageRange(s.to_string()));
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let (start, end) = (page_number(start)?, page_number(end)?);
                if start > end {
                    return Err(Error::InvalidPageRange(part.to_string()));
                }
                pages.extend(start..=end);
            } else {
                pages.push(page_number(part)?);
            }
        }

        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }

    /// 0-based indices of the selected pages in a document of
    /// `page_count` pages, ascending.
    ///
    /// A range reaching past the end is cut short; an explicitly listed
    /// page past the end is an error.
    pub fn indices(&self, page_count: usize) -> Result<Vec<usize>> {
        let count = page_count as u32;
        match self {
            PageSelection::All => Ok((0..page_count).collect()),
            PageSelection::Range(range) => Ok((*range.start()..=*range.end().min(&count))
                .filter(|&p| p >= 1)
                .map(|p| p as usize - 1)
                .collect()),
            PageSelection::Pages(pages) => pages
                .iter()
                .map(|&p| {
                    if p == 0 || p > count {
                        Err(Error::PageOutOfRange(p, count))
                    } else {
                        Ok(p as usize - 1)
                    }
                })
                .collect(),
        }
    }
}

impl FromStr for PageSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PageSelection::parse(s)
    }
}

fn page_number(s: &str) -> Result<u32> {
    match s.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(Error::InvalidPageRange(s.trim().to_string())),
        Ok(n) => Ok(n),
    }
}
