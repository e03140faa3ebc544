//! Export integration tests
//!
//! Render markdown through a preview session, export it with the resvg
//! backend and read the PDF back with lopdf.

use std::path::Path;

use lopdf::content::Content;
use lopdf::{Document, Object};
use markview_pdf::{
    DirectionMode, ExportButton, ExportControl, ExportOptions, ExportOutcome, ExportReport,
    Gesture, NoopProgress, PdfExporter, PreviewSession, RecordingProgress, RenderOptions,
    ZoomDirection,
};
use tempfile::TempDir;

/// Options with an empty font database: text-bearing SVGs fall back
fn options(dir: &Path) -> ExportOptions {
    ExportOptions::builder()
        .output_dir(dir)
        .system_fonts(false)
        .build()
}

fn system_font_options(dir: &Path) -> ExportOptions {
    ExportOptions::builder()
        .output_dir(dir)
        .system_fonts(true)
        .build()
}

/// Rasterizing code and diagram cards needs at least one font face
fn system_fonts_available() -> bool {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    !db.is_empty()
}

async fn export(session: &PreviewSession, dir: &Path) -> ExportReport {
    export_with(session, options(dir)).await
}

async fn export_with(session: &PreviewSession, options: ExportOptions) -> ExportReport {
    let output = session.output().unwrap();
    let exporter = PdfExporter::new(options);
    match exporter
        .export(&output, &ExportButton::default(), &NoopProgress)
        .await
        .unwrap()
    {
        ExportOutcome::Exported(report) => report,
        ExportOutcome::Ignored => panic!("export ignored"),
    }
}

fn page_strings(doc: &Document, page: u32) -> Vec<String> {
    let pages = doc.get_pages();
    let content = doc.get_page_content(pages[&page]).unwrap();
    Content::decode(&content)
        .unwrap()
        .operations
        .into_iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.first() {
            Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        })
        .collect()
}

fn image_count(doc: &Document) -> usize {
    doc.objects
        .values()
        .filter(|obj| match obj {
            Object::Stream(stream) => stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|name| name == b"Image"),
            _ => false,
        })
        .count()
}

const MIXED: &str = "# Report\n\nIntro paragraph.\n\n\
    | Name | Value |\n|------|-------|\n| a | 1 |\n| b | 2 |\n\n\
    ```rust\nfn main() {}\n```\n\n> quoted\n\n---\n\n1. first\n2. second\n";

const TWO_DIAGRAMS: &str = "```mermaid\ngraph TD; A-->B\n```\n\n```mermaid\ngraph LR; C-->D\n```\n";

#[tokio::test]
async fn test_mixed_document_without_fonts() {
    let dir = TempDir::new().unwrap();
    let mut session = PreviewSession::with_defaults(RenderOptions::default());
    session.render(MIXED).await;

    let report = export(&session, dir.path()).await;
    assert_eq!(report.pages, 1);
    assert_eq!(report.blocks, 7);
    // the code block falls back to monospace text
    assert_eq!(report.fallbacks, 1);

    let doc = Document::load(&report.path).unwrap();
    let strings = page_strings(&doc, 1);
    let expected_strings = [
        "Report",
        "Intro paragraph.",
        "Name",
        "Value",
        "quoted",
        "first",
        "fn main() {}",
    ];
    for expected in expected_strings {
        assert!(
            strings.iter().any(|s| s == expected),
            "missing {expected:?} in {strings:?}"
        );
    }
    assert_eq!(image_count(&doc), 0);
}

#[tokio::test]
async fn test_mixed_document_rasterized() {
    if !system_fonts_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let mut session = PreviewSession::with_defaults(RenderOptions::default());
    session.render(MIXED).await;

    let report = export_with(&session, system_font_options(dir.path())).await;
    assert_eq!(report.blocks, 7);
    assert_eq!(report.fallbacks, 0);
    let doc = Document::load(&report.path).unwrap();
    // code block is embedded as an image
    assert_eq!(image_count(&doc), 1);
}

#[tokio::test]
async fn test_diagrams_without_fonts_become_placeholders() {
    let dir = TempDir::new().unwrap();
    let mut session = PreviewSession::with_defaults(RenderOptions::default());
    session.render(TWO_DIAGRAMS).await;

    let report = export(&session, dir.path()).await;
    assert_eq!(report.blocks, 2);
    assert_eq!(report.fallbacks, 2);
    let doc = Document::load(&report.path).unwrap();
    assert_eq!(image_count(&doc), 0);
}

#[tokio::test]
async fn test_diagram_exported_with_transform() {
    if !system_fonts_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let mut session = PreviewSession::with_defaults(RenderOptions::default());
    session.render(TWO_DIAGRAMS).await;
    let zoomed = session.gesture("mermaid-1", Gesture::Zoom(ZoomDirection::In));
    assert!(zoomed.scale > 1.0);

    let report = export_with(&session, system_font_options(dir.path())).await;
    assert_eq!(report.blocks, 2);
    assert_eq!(report.fallbacks, 0);
    let doc = Document::load(&report.path).unwrap();
    assert_eq!(image_count(&doc), 2);
    // interaction state is untouched by the export
    assert_eq!(session.transform("mermaid-1"), zoomed);
}

#[tokio::test]
async fn test_rule_only_document() {
    let dir = TempDir::new().unwrap();
    let mut session = PreviewSession::with_defaults(RenderOptions::default());
    session.render("---").await;

    let report = export(&session, dir.path()).await;
    assert_eq!(report.blocks, 1);
    assert_eq!(report.pages, 1);
    assert_eq!(Document::load(&report.path).unwrap().get_pages().len(), 1);
}

#[tokio::test]
async fn test_long_document_spans_pages() {
    let dir = TempDir::new().unwrap();
    let markdown: String = (0..150)
        .map(|i| format!("Paragraph number {i} with a few words.\n\n"))
        .collect();
    let mut session = PreviewSession::with_defaults(RenderOptions::default());
    session.render(&markdown).await;

    let report = export(&session, dir.path()).await;
    assert!(report.pages > 1);
    let doc = Document::load(&report.path).unwrap();
    assert_eq!(doc.get_pages().len(), report.pages);
    assert!(page_strings(&doc, 1).contains(&"Paragraph number 0 with a few words.".to_string()));
}

#[tokio::test]
async fn test_rtl_document() {
    let dir = TempDir::new().unwrap();
    let options = RenderOptions::builder().direction(DirectionMode::Rtl).build();
    let mut session = PreviewSession::with_defaults(options);
    session.render("# Title\n\n- one\n- two\n").await;

    let report = export(&session, dir.path()).await;
    assert_eq!(report.pages, 1);
    assert_eq!(report.fallbacks, 0);
}

#[tokio::test]
async fn test_missing_image_falls_back() {
    let dir = TempDir::new().unwrap();
    let mut session = PreviewSession::with_defaults(RenderOptions::default());
    session.render("![diagram](missing.png)\n\nAfter").await;

    let report = export(&session, dir.path()).await;
    assert_eq!(report.fallbacks, 1);
    let doc = Document::load(&report.path).unwrap();
    let strings = page_strings(&doc, 1);
    assert!(strings.iter().any(|s| s == "[Image: diagram]"));
    assert!(strings.iter().any(|s| s == "After"));
}

#[tokio::test]
async fn test_progress_and_control() {
    let dir = TempDir::new().unwrap();
    let mut session = PreviewSession::with_defaults(RenderOptions::default());
    let output = session.render("# A\n\nB\n\nC").await;

    let button = ExportButton::default();
    let progress = RecordingProgress::new();
    let exporter = PdfExporter::new(options(dir.path()));
    exporter.export(&output, &button, &progress).await.unwrap();

    assert_eq!(button.label(), "Download PDF");
    assert!(button.is_enabled());
    assert!(!exporter.is_busy());
    let events = progress.events();
    assert!(events.contains(&"progress:3/3".to_string()));
    assert_eq!(events.last().map(String::as_str), Some("start:Completed"));
}
