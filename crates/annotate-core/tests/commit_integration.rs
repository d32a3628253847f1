//! End-to-end commits through the lopdf backend
//!
//! Run with: cargo test -p annotate-core --test commit_integration

#[path = "common/fixtures.rs"]
mod fixtures;

use annotate_core::backend::{FieldSpec, MutableDocument, MutationBackend, TextRun};
use annotate_core::{
    AnnotateError, AnnotationBody, AnnotationPatch, Color, EngineConfig, LopdfBackend,
    LopdfDocument, Outcome, PdfRect, PdfSession, PointerEvent, Rotation, Tool, ToolProfile,
};
use fixtures::{create_pdf, create_test_pdf, page_operations, rectangles};
use lopdf::{Document, Object};
use pretty_assertions::assert_eq;

fn open(bytes: Vec<u8>, profile: ToolProfile) -> PdfSession<LopdfDocument> {
    PdfSession::open(&LopdfBackend, "input.pdf", bytes, profile, EngineConfig::default()).unwrap()
}

fn draw(session: &mut PdfSession<LopdfDocument>, from: (f64, f64), to: (f64, f64)) -> Outcome {
    session
        .pointer(PointerEvent::Down {
            x: from.0,
            y: from.1,
        })
        .unwrap();
    session
        .pointer(PointerEvent::Move { x: to.0, y: to.1 })
        .unwrap();
    session
        .pointer(PointerEvent::Up { x: to.0, y: to.1 })
        .unwrap()
}

/// Wraps the lopdf backend and fails the n-th drawing call (0-based)
struct FailingBackend {
    fail_at: usize,
}

struct FailingDocument {
    inner: LopdfDocument,
    fail_at: usize,
    calls: usize,
}

impl FailingDocument {
    fn tick(&mut self) -> annotate_core::Result<()> {
        let call = self.calls;
        self.calls += 1;
        if call == self.fail_at {
            Err(AnnotateError::Commit("font failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl MutationBackend for FailingBackend {
    type Document = FailingDocument;

    fn load(&self, bytes: &[u8]) -> annotate_core::Result<FailingDocument> {
        Ok(FailingDocument {
            inner: LopdfDocument::from_bytes(bytes)?,
            fail_at: self.fail_at,
            calls: 0,
        })
    }
}

impl MutableDocument for FailingDocument {
    fn page_count(&self) -> u32 {
        MutableDocument::page_count(&self.inner)
    }

    fn draw_rectangle(&mut self, page: u32, rect: PdfRect, fill: Color) -> annotate_core::Result<()> {
        self.tick()?;
        self.inner.draw_rectangle(page, rect, fill)
    }

    fn draw_text(&mut self, page: u32, run: &TextRun<'_>) -> annotate_core::Result<()> {
        self.tick()?;
        self.inner.draw_text(page, run)
    }

    fn measure_text(&self, text: &str, font: &str, size: f64) -> annotate_core::Result<f64> {
        self.inner.measure_text(text, font, size)
    }

    fn create_form_field(&mut self, page: u32, field: &FieldSpec<'_>) -> annotate_core::Result<()> {
        self.tick()?;
        self.inner.create_form_field(page, field)
    }

    fn set_rotation(&mut self, page: u32, rotation: Rotation) -> annotate_core::Result<()> {
        self.inner.set_rotation(page, rotation)
    }

    fn delete_pages(&mut self, pages: &[u32]) -> annotate_core::Result<()> {
        self.inner.delete_pages(pages)
    }

    fn save(&mut self) -> annotate_core::Result<Vec<u8>> {
        self.inner.save()
    }
}

#[test]
fn test_letter_redaction_lands_in_points() {
    let mut session = open(create_test_pdf(1), ToolProfile::Redactor);
    assert_eq!(session.render_state().unwrap().raster_size(), (918, 1188));

    session
        .set_tool(Tool::Draw(AnnotationBody::redaction()))
        .unwrap();
    assert!(matches!(
        draw(&mut session, (100.0, 100.0), (300.0, 160.0)),
        Outcome::Created(_)
    ));
    let bytes = session.commit(&LopdfBackend).unwrap();

    let rects = rectangles(&bytes, 0);
    assert_eq!(rects.len(), 1);
    let [x, y, w, h] = rects[0];
    assert!((x - 66.666_67).abs() < 1e-3, "x = {}", x);
    assert!((y - 685.333_3).abs() < 1e-3, "y = {}", y);
    assert!((w - 133.333_3).abs() < 1e-3, "w = {}", w);
    assert!((h - 40.0).abs() < 1e-3, "h = {}", h);
}

#[test]
fn test_small_drag_rejected_larger_accepted() {
    let mut session = open(create_test_pdf(1), ToolProfile::Redactor);
    session
        .set_tool(Tool::Draw(AnnotationBody::redaction()))
        .unwrap();

    assert_eq!(draw(&mut session, (10.0, 10.0), (13.0, 13.0)), Outcome::Dropped);
    assert!(session.store().is_empty());
    assert!(matches!(
        draw(&mut session, (10.0, 10.0), (16.0, 16.0)),
        Outcome::Created(_)
    ));
    assert_eq!(session.store().len(), 1);
}

#[test]
fn test_commit_failure_midway_is_atomic_and_retryable() {
    let source = create_test_pdf(1);
    let mut session = open(source.clone(), ToolProfile::Redactor);
    session
        .set_tool(Tool::Draw(AnnotationBody::redaction()))
        .unwrap();
    for i in 0..3 {
        let x = 20.0 + 150.0 * i as f64;
        draw(&mut session, (x, 20.0), (x + 100.0, 80.0));
    }
    assert_eq!(session.store().len(), 3);

    let result = session.commit(&FailingBackend { fail_at: 1 });
    assert!(matches!(result, Err(AnnotateError::Commit(_))));
    assert_eq!(session.source(), source.as_slice());
    assert_eq!(session.store().len(), 3);
    assert!(session.is_dirty());

    let bytes = session.commit(&LopdfBackend).unwrap();
    assert_eq!(rectangles(&bytes, 0).len(), 3);
    assert!(!session.is_dirty());
}

#[test]
fn test_z_order_survives_moves() {
    let mut session = open(create_test_pdf(1), ToolProfile::TextEditor);
    session
        .set_tool(Tool::Draw(AnnotationBody::redaction()))
        .unwrap();
    draw(&mut session, (10.0, 10.0), (110.0, 110.0));
    session
        .set_tool(Tool::Draw(AnnotationBody::white_out()))
        .unwrap();
    draw(&mut session, (300.0, 300.0), (400.0, 400.0));

    // Drag the black box far away; it must still be painted first
    session.set_tool(Tool::Select).unwrap();
    assert!(matches!(
        draw(&mut session, (50.0, 50.0), (550.0, 650.0)),
        Outcome::Updated(_)
    ));

    let bytes = session.commit(&LopdfBackend).unwrap();
    let fills: Vec<Vec<f32>> = page_operations(&bytes, 0)
        .iter()
        .filter(|op| op.operator == "rg")
        .map(|op| op.operands.iter().map(|o| o.as_float().unwrap()).collect())
        .collect();
    assert_eq!(fills, vec![vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]]);
}

#[test]
fn test_text_block_with_cover() {
    let mut session = open(create_test_pdf(1), ToolProfile::TextEditor);
    let body = AnnotationBody::Text {
        text: "Replacement".to_string(),
        style: Default::default(),
        cover: Some(PdfRect::new(98.0, 697.0, 40.0, 14.0)),
        cover_color: Color::WHITE,
    };
    session.set_tool(Tool::Draw(body)).unwrap();
    let Outcome::Created(id) = draw(&mut session, (150.0, 120.0), (450.0, 150.0)) else {
        panic!("text block was not created");
    };
    session
        .update_annotation(id, AnnotationPatch::payload("Replaced text"))
        .unwrap();

    let bytes = session.commit(&LopdfBackend).unwrap();
    let ops = page_operations(&bytes, 0);
    assert!(ops.iter().any(|op| op.operator == "re"));
    let shown: Vec<&Object> = ops
        .iter()
        .filter(|op| op.operator == "Tj")
        .map(|op| &op.operands[0])
        .collect();
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[1].as_str().unwrap(), b"Replaced text");
}

#[test]
fn test_unencodable_text_fails_commit() {
    let mut session = open(create_test_pdf(1), ToolProfile::TextEditor);
    session
        .set_tool(Tool::Draw(AnnotationBody::text("\u{65e5}\u{672c}")))
        .unwrap();
    draw(&mut session, (10.0, 10.0), (200.0, 40.0));
    assert!(matches!(
        session.commit(&LopdfBackend),
        Err(AnnotateError::Commit(_))
    ));
}

#[test]
fn test_form_fields_are_fillable() {
    let mut session = open(create_test_pdf(2), ToolProfile::FormCreator);
    session
        .set_tool(Tool::Draw(AnnotationBody::text_field("applicant")))
        .unwrap();
    draw(&mut session, (100.0, 100.0), (400.0, 130.0));
    session.go_to_page(1).unwrap();
    session
        .set_tool(Tool::Draw(AnnotationBody::checkbox("consent", false)))
        .unwrap();
    draw(&mut session, (100.0, 100.0), (120.0, 120.0));

    let bytes = session.commit(&LopdfBackend).unwrap();
    assert_eq!(session.output_filename(), "fillable_input.pdf");

    let doc = Document::load_mem(&bytes).unwrap();
    let acroform = doc
        .catalog()
        .unwrap()
        .get(b"AcroForm")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_dictionary(id))
        .unwrap();
    let fields = acroform.get(b"Fields").unwrap().as_array().unwrap();
    let names: Vec<Vec<u8>> = fields
        .iter()
        .map(|f| {
            let field = doc.get_dictionary(f.as_reference().unwrap()).unwrap();
            field.get(b"T").unwrap().as_str().unwrap().to_vec()
        })
        .collect();
    assert_eq!(names, vec![b"applicant".to_vec(), b"consent".to_vec()]);
}

#[test]
fn test_duplicate_field_names_fail_commit() {
    let mut session = open(create_test_pdf(1), ToolProfile::FormCreator);
    session
        .set_tool(Tool::Draw(AnnotationBody::text_field("name")))
        .unwrap();
    draw(&mut session, (100.0, 100.0), (300.0, 130.0));
    draw(&mut session, (100.0, 300.0), (300.0, 330.0));
    assert!(matches!(
        session.commit(&LopdfBackend),
        Err(AnnotateError::Commit(_))
    ));
}

#[test]
fn test_rotated_source_page() {
    // A landscape view of a portrait page: the raster is 792 x 612 at scale 1
    let mut session = open(create_pdf(1, [0, 0, 612, 792], 90), ToolProfile::Redactor);
    session.set_scale(1.0).unwrap();
    assert_eq!(session.render_state().unwrap().raster_size(), (792, 612));

    session
        .set_tool(Tool::Draw(AnnotationBody::redaction()))
        .unwrap();
    draw(&mut session, (0.0, 0.0), (100.0, 50.0));
    let bytes = session.commit(&LopdfBackend).unwrap();

    // View top-left is page origin for a quarter turn
    assert_eq!(rectangles(&bytes, 0), vec![[0.0, 0.0, 50.0, 100.0]]);
}

#[test]
fn test_media_box_origin_is_honoured() {
    let mut session = open(create_pdf(1, [100, 200, 712, 992], 0), ToolProfile::Redactor);
    session.set_scale(1.0).unwrap();
    session
        .set_tool(Tool::Draw(AnnotationBody::redaction()))
        .unwrap();
    draw(&mut session, (0.0, 0.0), (10.0, 10.0));
    let bytes = session.commit(&LopdfBackend).unwrap();
    assert_eq!(rectangles(&bytes, 0), vec![[100.0, 982.0, 10.0, 10.0]]);
}
