//! The per-page pipeline.

use std::sync::Arc;

use super::statistics::DocumentStatistics;
use crate::error::{Error, Result};
use crate::layout::cleanup::clean_runs;
use crate::layout::reading_order::sorted_items;
use crate::layout::regions::page_label;
use crate::layout::{
    CandidateBlock, CleanupOptions, DetectorRunner, GroupedPage, Grouper, LayoutGraph, ListAssembler, NodeKind,
    Region, RegionClassifier, RegionKind, RoleClassifier, Sequenced, Sequencer, TableCandidate,
    TableDetector, TableIntegrator, TablePage,
};
use crate::model::{
    Aside, Drawing, DrawingElement, Image, ImageElement, LayoutElement, PageResult, PageSection,
    Primitive, RawPage, TextRun,
};

/// A page whose primitives have been validated and cleaned.
#[derive(Debug, Clone)]
pub struct PreparedPage {
    /// 0-based page index
    pub index: usize,
    pub width: f32,
    pub height: f32,
    pub runs: Vec<TextRun>,
    pub drawings: Vec<Drawing>,
    pub images: Vec<Image>,
    /// Primitives dropped during validation
    pub warnings: Vec<String>,
}

impl PreparedPage {
    /// Validate a raw page, dropping malformed primitives with a warning.
    pub fn prepare(index: usize, raw: RawPage, cleanup: &CleanupOptions) -> Self {
        let mut runs = Vec::new();
        let mut drawings = Vec::new();
        let mut images = Vec::new();
        let mut warnings = Vec::new();

        for (i, primitive) in raw.primitives.iter().enumerate() {
            match primitive.validate(index, i, raw.width, raw.height) {
                Ok(Some(Primitive::Text(run))) => runs.push(run),
                Ok(Some(Primitive::Drawing(drawing))) => drawings.push(drawing),
                Ok(Some(Primitive::Image(image))) => images.push(image),
                Ok(None) => {}
                Err(e) => {
                    log::warn!("{}", e);
                    warnings.push(e.to_string());
                }
            }
        }

        Self {
            index,
            width: raw.width,
            height: raw.height,
            runs: clean_runs(runs, cleanup),
            drawings,
            images,
            warnings,
        }
    }

    /// Whether anything survived validation.
    pub fn has_content(&self) -> bool {
        !(self.runs.is_empty() && self.drawings.is_empty() && self.images.is_empty())
    }
}

/// Runs stages 2 to 8 for one page against shared document statistics.
#[derive(Clone, Copy)]
pub struct PagePipeline<'a> {
    statistics: &'a DocumentStatistics,
    rules: &'a Arc<dyn TableDetector>,
    ml: Option<&'a Arc<dyn TableDetector>>,
    runner: &'a DetectorRunner,
}

impl<'a> PagePipeline<'a> {
    pub fn new(
        statistics: &'a DocumentStatistics,
        rules: &'a Arc<dyn TableDetector>,
        ml: Option<&'a Arc<dyn TableDetector>>,
        runner: &'a DetectorRunner,
    ) -> Self {
        Self {
            statistics,
            rules,
            ml,
            runner,
        }
    }

    /// Analyze one page. Errors here fail only this page.
    pub fn run(&self, page: PreparedPage) -> Result<PageResult> {
        let mut result = PageResult::new(page.index, page.width, page.height);
        result.warnings = page.warnings;

        if page.runs.is_empty() {
            let reason = Error::StatisticsUnavailable(page.index);
            log::debug!("{}", reason);
            result.warn(reason);
            return Ok(result);
        }

        let calibration = self.statistics.calibration;
        let grouped = Grouper::new(&calibration).group(page.runs, page.drawings, page.images);
        let graph = LayoutGraph::build(&grouped, page.width, page.height, &calibration);
        let regions = RegionClassifier::new(&self.statistics.margins, &calibration)
            .classify(&graph, &grouped.blocks);
        let sequencer = Sequencer::new(page.index, &regions, &graph);
        if sequencer.cycle_broken() {
            result.warn(Error::CyclicRegionGraph(page.index));
        }

        if graph.dropped_images() > 0 {
            log::debug!(
                "Page {}: dropped {} background images",
                page.index,
                graph.dropped_images()
            );
        }

        let lines = grouped
            .blocks
            .iter()
            .flat_map(|b| b.lines.iter().cloned())
            .collect();
        let mut slots = self.node_elements(grouped, &graph);

        for region in regions.iter() {
            let target = match region.kind {
                RegionKind::Header => &mut result.header,
                RegionKind::Footer => &mut result.footer,
                _ => continue,
            };
            target.extend(take_all(&mut slots, &region.nodes, &graph));
        }
        result.page_label = result
            .header
            .iter()
            .chain(result.footer.iter())
            .filter_map(LayoutElement::as_text_block)
            .find_map(|b| page_label(b.text()));

        let mut elements = Vec::new();
        for item in sequencer {
            match item {
                Sequenced::Node(n) => elements.extend(slots.get_mut(n).and_then(Option::take)),
                Sequenced::Aside(r) => {
                    if let Some(aside) = self.aside(&regions[r], &mut slots, &graph)? {
                        elements.push(LayoutElement::Aside(aside));
                    }
                }
            }
        }

        let elements = ListAssembler::new().assemble(elements);

        let table_page = TablePage {
            index: page.index,
            width: page.width,
            height: page.height,
            rules: graph.rules().to_vec(),
            frames: graph.table_frames().to_vec(),
            lines,
        };
        let ruled = self.detect(self.rules, &table_page, &mut result);
        let modelled = match self.ml {
            Some(ml) => self.detect(ml, &table_page, &mut result),
            None => Vec::new(),
        };
        let integrator = TableIntegrator::new();
        let tables: Vec<_> = integrator
            .resolve(ruled, modelled, &table_page)
            .iter()
            .filter_map(|candidate| integrator.build_table(candidate, &table_page))
            .collect();
        if !tables.is_empty() {
            log::debug!("Page {}: integrating {} tables", page.index, tables.len());
        }
        result.elements = integrator.integrate(elements, tables);

        log::debug!(
            "Page {}: {} regions, {} elements",
            page.index,
            regions.len(),
            result.elements.len()
        );
        Ok(result)
    }

    /// One output element per graph node, by node index.
    fn node_elements(&self, grouped: GroupedPage, graph: &LayoutGraph) -> Vec<Option<LayoutElement>> {
        let roles = RoleClassifier::new(&self.statistics.fonts);
        let GroupedPage {
            blocks,
            drawings,
            images,
        } = grouped;
        let mut blocks: Vec<Option<CandidateBlock>> = blocks.into_iter().map(Some).collect();

        graph
            .nodes()
            .iter()
            .map(|node| match node.kind {
                NodeKind::Block(i) => blocks
                    .get_mut(i)
                    .and_then(Option::take)
                    .and_then(|block| roles.classify(block))
                    .map(LayoutElement::TextBlock),
                NodeKind::Image(i) => images.get(i).map(|image| {
                    let element = LayoutElement::Image(ImageElement {
                        bbox: image.bbox,
                        source: image.source.clone(),
                    });
                    if node.primary {
                        LayoutElement::Section(PageSection::out_of_line(vec![element]))
                    } else {
                        element
                    }
                }),
                NodeKind::Drawing(i) => drawings.get(i).map(|drawing| {
                    LayoutElement::Drawing(DrawingElement {
                        kind: drawing.kind,
                        bbox: drawing.bbox,
                    })
                }),
            })
            .collect()
    }

    fn aside(
        &self,
        region: &Region,
        slots: &mut [Option<LayoutElement>],
        graph: &LayoutGraph,
    ) -> Result<Option<Aside>> {
        let items = take_all(slots, &region.nodes, graph);
        if items.is_empty() {
            return Ok(None);
        }
        let frame = region
            .enclosure
            .and_then(|e| graph.enclosures().get(e))
            .map(|e| e.bbox);
        let aside = match frame {
            Some(frame) => Aside::framed(items, frame)?,
            None => Aside::new(items)?,
        };
        Ok(Some(aside))
    }

    /// Call a detector, falling back to no candidates when it fails or
    /// times out.
    fn detect(
        &self,
        detector: &Arc<dyn TableDetector>,
        page: &TablePage,
        result: &mut PageResult,
    ) -> Vec<TableCandidate> {
        match self.runner.run(detector, page) {
            Ok(candidates) => candidates,
            Err(e) => {
                log::warn!("{}", e);
                result.warn(e);
                Vec::new()
            }
        }
    }
}

/// Take the elements of `nodes` in top-to-bottom order.
fn take_all(
    slots: &mut [Option<LayoutElement>],
    nodes: &[usize],
    graph: &LayoutGraph,
) -> Vec<LayoutElement> {
    sorted_items(nodes, graph)
        .into_iter()
        .filter_map(|n| slots.get_mut(n).and_then(Option::take))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RulesTableDetector;
    use crate::model::{DrawingHint, FontInfo, RawPrimitive, TextBlockType};

    fn font(size: f32) -> FontInfo {
        FontInfo::new("Helvetica", size)
    }

    fn statistics(pages: &[PreparedPage]) -> DocumentStatistics {
        DocumentStatistics::collect(pages, 32).unwrap()
    }

    fn rules() -> Arc<dyn TableDetector> {
        Arc::new(RulesTableDetector::new())
    }

    #[test]
    fn test_prepare_drops_malformed() {
        let raw = RawPage::letter()
            .with(RawPrimitive::text("Hello", font(12.0), [72.0, 72.0, 110.0, 84.0]))
            .with(RawPrimitive::text("Off", font(12.0), [700.0, 72.0, 740.0, 84.0]))
            .with(RawPrimitive::text("  ", font(12.0), [72.0, 90.0, 80.0, 102.0]));
        let page = PreparedPage::prepare(3, raw, &CleanupOptions::default());
        assert_eq!(page.runs.len(), 1);
        assert_eq!(page.warnings.len(), 1);
        assert!(page.warnings[0].contains("Malformed primitive 1 on page 3"));
    }

    #[test]
    fn test_page_without_text() {
        let raw = RawPage::letter().with(RawPrimitive::image([100.0, 100.0, 200.0, 200.0]));
        let pages = vec![
            PreparedPage::prepare(
                0,
                RawPage::letter().with(RawPrimitive::text("Body", font(12.0), [72.0, 72.0, 110.0, 84.0])),
                &CleanupOptions::default(),
            ),
            PreparedPage::prepare(1, raw, &CleanupOptions::default()),
        ];
        let stats = statistics(&pages);
        let detector = rules();
        let runner = DetectorRunner::inline();
        let pipeline = PagePipeline::new(&stats, &detector, None, &runner);
        let result = pipeline.run(pages[1].clone()).unwrap();
        assert!(result.elements.is_empty());
        assert_eq!(result.warnings, vec!["Page 1 has no text primitives"]);
    }

    #[test]
    fn test_headings_and_paragraph() {
        let mut raw = RawPage::letter()
            .with(RawPrimitive::text("Title", font(24.0), [72.0, 72.0, 200.0, 96.0]))
            .with(RawPrimitive::text("Section", font(18.0), [72.0, 120.0, 200.0, 138.0]));
        for i in 0..4 {
            let y = 160.0 + i as f32 * 14.0;
            raw.push(RawPrimitive::text(
                "body text of the page body text",
                font(12.0),
                [72.0, y, 400.0, y + 12.0],
            ));
        }
        let pages = vec![PreparedPage::prepare(0, raw, &CleanupOptions::default())];
        let stats = statistics(&pages);
        let detector = rules();
        let runner = DetectorRunner::inline();
        let pipeline = PagePipeline::new(&stats, &detector, None, &runner);
        let result = pipeline.run(pages[0].clone()).unwrap();

        let kinds: Vec<TextBlockType> = result
            .elements
            .iter()
            .filter_map(LayoutElement::as_text_block)
            .map(|b| b.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![TextBlockType::H1, TextBlockType::H2, TextBlockType::Paragraph]
        );
    }

    #[test]
    fn test_boxed_text_becomes_aside() {
        let mut raw = RawPage::letter();
        for i in 0..6 {
            let y = 100.0 + i as f32 * 14.0;
            raw.push(RawPrimitive::text(
                "main column text continues here",
                font(12.0),
                [72.0, y, 300.0, y + 12.0],
            ));
        }
        raw.push(RawPrimitive::drawing([340.0, 95.0, 540.0, 160.0], Some(DrawingHint::Box)));
        raw.push(RawPrimitive::text("Note", font(12.0), [350.0, 100.0, 400.0, 112.0]));
        raw.push(RawPrimitive::text("boxed remark", font(12.0), [350.0, 114.0, 460.0, 126.0]));

        let pages = vec![PreparedPage::prepare(0, raw, &CleanupOptions::default())];
        let stats = statistics(&pages);
        let detector = rules();
        let runner = DetectorRunner::inline();
        let pipeline = PagePipeline::new(&stats, &detector, None, &runner);
        let result = pipeline.run(pages[0].clone()).unwrap();

        let asides: Vec<&LayoutElement> = result.elements.iter().filter(|e| e.is_aside()).collect();
        assert_eq!(asides.len(), 1);
        assert!(asides[0].plain_text().contains("boxed remark"));
        assert!(result.elements[0].plain_text().starts_with("main column"));
    }
}
