//! Integration tests for JSON and text rendering and the element visitor.

use std::io::Write;

use pageflow::model::{ImageElement, TextListItem};
use pageflow::render::{self, walk_document, ElementVisitor, VisitorAction};
use pageflow::{
    analyze_file_with_options, AnalysisStats, AnalyzedDocument, Engine, EngineOptions, FontInfo,
    JsonFormat, RawDocument, RawPage, RawPrimitive, TextBlock,
};

const SAMPLE: &str = r#"{"pages": [
    {"width": 612, "height": 792, "primitives": [
        {"kind": "text", "text": "Annual Summary", "font": {"name": "Helvetica-Bold", "size": 24}, "bbox": [72, 90, 300, 114]},
        {"kind": "text", "text": "The year closed with steady growth.", "font": {"name": "Helvetica", "size": 12}, "bbox": [72, 130, 400, 142]},
        {"kind": "text", "text": "Costs stayed within the plan.", "font": {"name": "Helvetica", "size": 12}, "bbox": [72, 144, 400, 156]},
        {"kind": "text", "text": "• revenue up", "font": {"name": "Helvetica", "size": 12}, "bbox": [72, 190, 250, 202]},
        {"kind": "text", "text": "• costs flat", "font": {"name": "Helvetica", "size": 12}, "bbox": [72, 204, 250, 216]}
    ]},
    {"width": 612, "height": 792, "primitives": [
        {"kind": "text", "text": "Outlook", "font": {"name": "Helvetica-Bold", "size": 24}, "bbox": [72, 90, 200, 114]},
        {"kind": "text", "text": "Next year should be similar.", "font": {"name": "Helvetica", "size": 12}, "bbox": [72, 130, 400, 142]},
        {"kind": "image", "bbox": [72, 300, 540, 700], "source": "chart.png"}
    ]}
]}"#;

fn sample(detailed: bool) -> AnalyzedDocument {
    let source = RawDocument::from_json(SAMPLE).unwrap();
    Engine::new(EngineOptions::new().sequential().with_detailed(detailed))
        .analyze(&source)
        .unwrap()
}

#[test]
fn test_json_shape() {
    let doc = sample(false);
    let value = render::to_json_value(&doc).unwrap();

    let pages = value["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0]["number"], 1);

    let elements = pages[0]["elements"].as_array().unwrap();
    let names: Vec<&str> = elements
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["textblock", "textblock", "textlist"]);

    let hierarchy = value["hierarchy"].as_array().unwrap();
    assert_eq!(hierarchy.len(), 2);
    assert_eq!(hierarchy[0]["text"], "Annual Summary");
    assert_eq!(hierarchy[0]["index"], serde_json::json!([0, null]));
    assert_eq!(hierarchy[0]["assigned_heading"], "h1");
    assert_eq!(hierarchy[1]["page"], 1);
    assert_eq!(hierarchy[1]["number"], serde_json::json!([2]));

    assert!(value["failures"].as_array().unwrap().is_empty());
    assert!(value.get("font_statistics").is_none());
    assert!(!render::to_json(&doc, JsonFormat::Compact)
        .unwrap()
        .contains("\"bbox\""));
}

#[test]
fn test_detailed_json_keeps_boxes() {
    let doc = sample(true);
    let value = render::to_json_value(&doc).unwrap();

    assert!(value["pages"][0]["elements"][0].get("bbox").is_some());
    assert!(value.get("font_statistics").is_some());
}

#[test]
fn test_pretty_and_compact_parse_the_same() {
    let doc = sample(false);
    let pretty = render::to_json(&doc, JsonFormat::Pretty).unwrap();
    let compact = render::to_json(&doc, JsonFormat::Compact).unwrap();

    assert!(pretty.contains('\n'));
    assert!(!compact.contains('\n'));
    let a: serde_json::Value = serde_json::from_str(&pretty).unwrap();
    let b: serde_json::Value = serde_json::from_str(&compact).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_text_follows_reading_order() {
    let doc = sample(false);
    let text = render::to_text(&doc).unwrap();

    assert!(text.starts_with("Annual Summary\n\n"));
    assert!(text.contains("• revenue up\n• costs flat"));
    assert!(text.ends_with("Next year should be similar."));
    assert!(text.find("Annual").unwrap() < text.find("Outlook").unwrap());
}

#[test]
fn test_stats() {
    let doc = sample(false);
    let stats = AnalysisStats::from_document(&doc);

    assert_eq!(stats.page_count, 2);
    assert_eq!(stats.failed_page_count, 0);
    assert_eq!(stats.heading_count, 2);
    assert_eq!(stats.list_count, 1);
    assert_eq!(stats.list_item_count, 2);
    assert_eq!(stats.image_count, 1);
    assert_eq!(stats.table_count, 0);
}

/// Visitor that records headings and stops at the first image.
#[derive(Default)]
struct HeadingCollector {
    headings: Vec<String>,
    items: usize,
    stopped: bool,
}

impl ElementVisitor for HeadingCollector {
    fn visit_text_block(&mut self, block: &TextBlock, _depth: usize) -> VisitorAction {
        if block.is_heading() {
            self.headings.push(block.text().to_string());
        }
        VisitorAction::Continue
    }

    fn visit_list_item(&mut self, _item: &TextListItem, depth: usize) -> VisitorAction {
        assert_eq!(depth, 1);
        self.items += 1;
        VisitorAction::SkipChildren
    }

    fn visit_image(&mut self, _image: &ImageElement, _depth: usize) -> VisitorAction {
        self.stopped = true;
        VisitorAction::Stop
    }
}

#[test]
fn test_custom_visitor() {
    let doc = sample(false);
    let mut visitor = HeadingCollector::default();
    walk_document(&mut visitor, &doc);

    assert_eq!(visitor.headings, vec!["Annual Summary", "Outlook"]);
    assert_eq!(visitor.items, 2);
    assert!(visitor.stopped);
}

#[test]
fn test_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();

    let options = EngineOptions::new().sequential().with_pages("2".parse().unwrap());
    let doc = analyze_file_with_options(file.path(), options).unwrap();

    assert_eq!(doc.page_count(), 1);
    assert_eq!(doc.pages[0].number, 2);
    assert_eq!(doc.hierarchy[0].number, vec![1]);
}

#[test]
fn test_page_label_from_footer() {
    let pages: Vec<RawPage> = (1..=3)
        .map(|n| {
            let mut raw = RawPage::letter();
            for line in 0..3 {
                let y = 120.0 + line as f32 * 14.0;
                raw.push(RawPrimitive::text(
                    "body text on every page of the report",
                    FontInfo::new("Helvetica", 12.0),
                    [72.0, y, 400.0, y + 12.0],
                ));
            }
            raw.push(RawPrimitive::text(
                format!("{}", n + 10),
                FontInfo::new("Helvetica", 9.0),
                [300.0, 750.0, 312.0, 759.0],
            ));
            raw
        })
        .collect();

    let doc = Engine::new(EngineOptions::new().sequential())
        .analyze(&pages)
        .unwrap();

    for (page, label) in doc.pages.iter().zip(["11", "12", "13"]) {
        assert_eq!(page.page_label.as_deref(), Some(label));
        assert_eq!(page.footer.len(), 1);
        assert!(!render::page_to_text(page).contains(label));
    }
}
