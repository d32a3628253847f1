//! Gesture scripts
//!
//! A script is a JSON array of steps replayed against a session, e.g.
//!
//! ```json
//! [
//!   { "op": "draw", "from": [100, 100], "to": [300, 160] },
//!   { "op": "page", "index": 1 },
//!   { "op": "draw", "from": [50, 50], "to": [200, 80],
//!     "body": { "type": "Field", "name": "signature", "widget": { "kind": "text" } } },
//!   { "op": "rotate", "page": 0, "turns": 1 },
//!   { "op": "delete_page", "page": 2 }
//! ]
//! ```
//!
//! Coordinates are raster pixels at the session's scale.

use annotate_core::{
    AnnotationBody, AnnotationId, AnnotationPatch, Outcome, PdfSession, PointerEvent,
    RenderDocument, Tool, ToolProfile,
};
use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Go to a page (0-indexed)
    Page { index: u32 },
    Scale { scale: f64 },
    /// Switch to drawing `body`, or to the select tool when absent
    Tool { body: Option<AnnotationBody> },
    /// Pointer down, move, up. With `body` the draw tool is switched first.
    Draw {
        from: [f64; 2],
        to: [f64; 2],
        #[serde(default)]
        body: Option<AnnotationBody>,
    },
    /// Pointer down, move, up with whatever tool is active
    Drag { from: [f64; 2], to: [f64; 2] },
    Pointer { event: PointerEvent },
    Update { id: u64, patch: AnnotationPatch },
    /// Delete an annotation, or the selection when `id` is absent
    Delete {
        #[serde(default)]
        id: Option<u64>,
    },
    Rotate { page: u32, turns: i64 },
    DeletePage { page: u32 },
}

pub fn parse(json: &str) -> Result<Vec<Step>> {
    serde_json::from_str(json).context("Invalid gesture script")
}

/// The body drawn when a script draws without naming one
pub fn default_body(profile: ToolProfile) -> AnnotationBody {
    match profile {
        ToolProfile::Redactor => AnnotationBody::redaction(),
        ToolProfile::FormCreator => AnnotationBody::text_field("field"),
        ToolProfile::TextEditor => AnnotationBody::text("Text"),
    }
}

/// Replay every step. Returns how many annotations were created.
pub fn replay<D: RenderDocument>(session: &mut PdfSession<D>, steps: &[Step]) -> Result<usize> {
    let mut created = 0;
    let mut field_count = 0;

    for (n, step) in steps.iter().enumerate() {
        let result = match step {
            Step::Page { index } => session.go_to_page(*index).map(|_| Outcome::Finished),
            Step::Scale { scale } => session.set_scale(*scale).map(|_| Outcome::Finished),
            Step::Tool { body } => {
                let tool = match body {
                    Some(body) => Tool::Draw(body.clone()),
                    None => Tool::Select,
                };
                session.set_tool(tool).map(|_| Outcome::Finished)
            }
            Step::Draw { from, to, body } => {
                let body = match body {
                    Some(body) => body.clone(),
                    None => {
                        // Unnamed fields get distinct names
                        field_count += 1;
                        match default_body(session.profile()) {
                            AnnotationBody::Field { widget, style, .. } => AnnotationBody::Field {
                                name: format!("field_{}", field_count),
                                widget,
                                style,
                            },
                            other => other,
                        }
                    }
                };
                session
                    .set_tool(Tool::Draw(body))
                    .and_then(|_| gesture(session, *from, *to))
            }
            Step::Drag { from, to } => gesture(session, *from, *to),
            Step::Pointer { event } => session.pointer(*event),
            Step::Update { id, patch } => session
                .update_annotation(AnnotationId(*id), patch.clone())
                .map(|_| Outcome::Updated(AnnotationId(*id))),
            Step::Delete { id } => match id {
                Some(id) => session
                    .remove_annotation(AnnotationId(*id))
                    .map(|_| Outcome::Finished),
                None => session.delete_selected().map(|_| Outcome::Finished),
            },
            Step::Rotate { page, turns } => {
                session.rotate_page(*page, *turns).map(|_| Outcome::Finished)
            }
            Step::DeletePage { page } => session.delete_page(*page).map(|_| Outcome::Finished),
        };

        match result.with_context(|| format!("Step {} ({:?}) failed", n + 1, step))? {
            Outcome::Created(id) => {
                created += 1;
                tracing::info!(step = n + 1, %id, "annotation created");
            }
            Outcome::Dropped => {
                tracing::warn!(step = n + 1, "gesture too small, nothing created");
            }
            outcome => tracing::debug!(step = n + 1, ?outcome, "step replayed"),
        }
    }

    if !session.controller().is_idle() {
        bail!("Script ends in the middle of a gesture");
    }
    Ok(created)
}

fn gesture<D: RenderDocument>(
    session: &mut PdfSession<D>,
    from: [f64; 2],
    to: [f64; 2],
) -> annotate_core::Result<Outcome> {
    session.pointer(PointerEvent::Down {
        x: from[0],
        y: from[1],
    })?;
    session.pointer(PointerEvent::Move { x: to[0], y: to[1] })?;
    session.pointer(PointerEvent::Up { x: to[0], y: to[1] })
}
