//! The analysis engine: document statistics, then every selected page in
//! parallel, then the document hierarchy.

mod options;
mod page;
mod scheduler;
mod statistics;

pub use options::{EngineOptions, PageSelection, DEFAULT_SAMPLE_PAGES, DEFAULT_TABLE_TIMEOUT};
pub use page::{PagePipeline, PreparedPage};
pub use scheduler::{build_pool, run_tasks};
pub use statistics::DocumentStatistics;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::layout::{build_hierarchy, DetectorRunner, RulesTableDetector, TableDetector};
use crate::model::{AnalysisProfile, AnalyzedDocument, PageFailure};
use crate::source::PageSource;

/// Layout analysis engine.
///
/// # Example
///
/// ```no_run
/// use pageflow::{Engine, EngineOptions, RawDocument};
///
/// let doc = RawDocument::from_path("document.json")?;
/// let engine = Engine::new(EngineOptions::new().with_workers(4));
/// let result = engine.analyze(&doc)?;
/// println!("{} pages, {} headings", result.page_count(), result.hierarchy.len());
/// # Ok::<(), pageflow::Error>(())
/// ```
#[derive(Clone)]
pub struct Engine {
    options: EngineOptions,
    rules: Arc<dyn TableDetector>,
    ml: Option<Arc<dyn TableDetector>>,
}

impl Engine {
    /// Create an engine with the built-in ruled-grid table detector.
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            rules: Arc::new(RulesTableDetector::new()),
            ml: None,
        }
    }

    /// Replace the rules-based table detector.
    pub fn with_rules_detector(mut self, detector: Arc<dyn TableDetector>) -> Self {
        self.rules = detector;
        self
    }

    /// Install a model-based table detector. It only runs when
    /// [`EngineOptions::ml_tables`] is set.
    pub fn with_ml_detector(mut self, detector: Arc<dyn TableDetector>) -> Self {
        self.ml = Some(detector);
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Analyze the selected pages of a document.
    ///
    /// Only the document-wide statistics pass can fail the run; a page that
    /// fails is recorded in [`AnalyzedDocument::failures`] and its siblings
    /// are unaffected.
    pub fn analyze<S: PageSource + ?Sized>(&self, source: &S) -> Result<AnalyzedDocument> {
        let started = Utc::now();
        let clock = Instant::now();

        let indices = self.options.pages.indices(source.page_count())?;
        if indices.is_empty() {
            return Err(Error::NoPages);
        }

        let pool = scheduler::build_pool(self.options.workers)?;
        let workers = pool.as_ref().map(|p| p.current_num_threads()).unwrap_or(1);
        log::debug!(
            "Analyzing {} of {} pages on {} workers",
            indices.len(),
            source.page_count(),
            workers
        );

        let cleanup = &self.options.cleanup;
        let loaded = scheduler::run_tasks(
            pool.as_ref(),
            indices.into_iter().map(|i| (i, ())).collect(),
            |index, _| {
                let raw = source.load_page(index)?;
                Ok(PreparedPage::prepare(index, raw, cleanup))
            },
        );

        let mut failures = Vec::new();
        let mut prepared = Vec::with_capacity(loaded.len());
        for (index, outcome) in loaded {
            match outcome {
                Ok(page) => prepared.push(page),
                Err(e) => {
                    log::warn!("Failed to load page {}: {}", index, e);
                    failures.push(PageFailure::new(index, e));
                }
            }
        }

        let statistics = DocumentStatistics::collect(&prepared, self.options.sample_pages)?;
        let statistics_ms = clock.elapsed().as_millis() as u64;

        let ml = match (&self.ml, self.options.ml_tables) {
            (Some(ml), true) => Some(ml),
            (None, true) => {
                log::warn!("Model-based table detection requested but no detector is installed");
                None
            }
            _ => None,
        };
        let external =
            !self.rules.runs_in_process() || ml.is_some_and(|d| !d.runs_in_process());
        let runner = match self.options.table_timeout {
            Some(timeout) if external => DetectorRunner::bounded(timeout, workers)?,
            _ => DetectorRunner::inline(),
        };
        let pipeline = PagePipeline::new(&statistics, &self.rules, ml, &runner);

        let page_clock = Instant::now();
        let analyzed = scheduler::run_tasks(
            pool.as_ref(),
            prepared.into_iter().map(|p| (p.index, p)).collect(),
            |_, page| pipeline.run(page),
        );
        let pages_ms = page_clock.elapsed().as_millis() as u64;

        let mut pages = Vec::with_capacity(analyzed.len());
        for (index, outcome) in analyzed {
            match outcome {
                Ok(page) => pages.push(page),
                Err(e) => {
                    log::warn!("Page {} failed: {}", index, e);
                    failures.push(PageFailure::new(index, e));
                }
            }
        }
        failures.sort_by_key(|f| f.page);

        let hierarchy = build_hierarchy(&pages);

        Ok(AnalyzedDocument {
            pages,
            hierarchy,
            failures,
            profile: AnalysisProfile {
                started,
                finished: Utc::now(),
                statistics_ms,
                pages_ms,
                workers,
            },
            font_statistics: statistics.fonts,
            detailed: self.options.detailed,
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("rules", &self.rules.strategy())
            .field("ml", &self.ml.as_ref().map(|d| d.strategy()))
            .finish()
    }
}
