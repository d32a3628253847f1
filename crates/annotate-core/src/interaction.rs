//! Pointer-event state machine
//!
//! Turns pointer input on the rendered surface into store mutations. The
//! controller never touches a real surface, so it can be driven from tests,
//! the browser host or a replayed script alike.
//!
//! ```text
//!            down on handle        down on body         down on empty (draw tool)
//!   Idle ────────────────► Resizing   ──────► Moving    ──────────────► Drawing
//!    ▲                         │                 │                          │
//!    └───────── up / leave ────┴─────────────────┴──────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotationBody, AnnotationId, AnnotationPatch};
use crate::error::{AnnotateError, Result};
use crate::geometry::{Corner, PixelPoint, PixelRect};
use crate::page::RenderState;
use crate::store::AnnotationStore;

/// What a pointer-down on empty canvas does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tool {
    /// Only select, move and resize existing annotations
    Select,
    /// Draw new annotations with this body
    Draw(AnnotationBody),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PointerEvent {
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up { x: f64, y: f64 },
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Idle,
    Drawing {
        anchor: PixelPoint,
    },
    Moving {
        id: AnnotationId,
        anchor: PixelPoint,
        original: PixelRect,
    },
    Resizing {
        id: AnnotationId,
        handle: Corner,
        original: PixelRect,
    },
}

/// Result of feeding one event to the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Nothing happened
    Ignored,
    /// A gesture began
    Started,
    /// The live rectangle changed
    Preview(PixelRect),
    Created(AnnotationId),
    Updated(AnnotationId),
    /// A draw gesture ended too small and was discarded
    Dropped,
    /// The gesture ended without changing anything
    Finished,
    Deselected,
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    tool: Tool,
    mode: Mode,
    preview: Option<PixelRect>,
    handle_radius_px: f64,
}

impl InteractionController {
    pub fn new(handle_radius_px: f64) -> Self {
        Self {
            tool: Tool::Select,
            mode: Mode::Idle,
            preview: None,
            handle_radius_px,
        }
    }

    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    /// Switch tools. An open gesture is abandoned.
    pub fn set_tool(&mut self, tool: Tool) {
        self.cancel();
        self.tool = tool;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == Mode::Idle
    }

    /// Rectangle being drawn, moved or resized, for painting over the raster
    pub fn preview(&self) -> Option<PixelRect> {
        self.preview
    }

    /// The annotation being moved or resized, whose stored bounds are stale
    /// until the gesture ends
    pub fn active_annotation(&self) -> Option<AnnotationId> {
        match self.mode {
            Mode::Moving { id, .. } | Mode::Resizing { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Abandon the current gesture without touching the store
    pub fn cancel(&mut self) {
        self.mode = Mode::Idle;
        self.preview = None;
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        surface: &RenderState,
        store: &mut AnnotationStore,
    ) -> Result<Outcome> {
        match event {
            PointerEvent::Down { x, y } => self.pointer_down(PixelPoint::new(x, y), surface, store),
            PointerEvent::Move { x, y } => Ok(self.pointer_move(PixelPoint::new(x, y), surface, store)),
            PointerEvent::Up { x, y } => self.pointer_up(PixelPoint::new(x, y), surface, store),
            PointerEvent::Leave => self.pointer_leave(surface, store),
        }
    }

    pub fn pointer_down(
        &mut self,
        point: PixelPoint,
        surface: &RenderState,
        store: &mut AnnotationStore,
    ) -> Result<Outcome> {
        if !self.is_idle() {
            return Ok(Outcome::Ignored);
        }
        check_point(point)?;
        let point = clamp_point(point, surface);

        // Handles of the selection win over any body underneath them
        if let Some(selected) = store.selected_annotation() {
            if selected.page_index == surface.page_index {
                if let Some(handle) = self.nearest_handle(&selected.bounds, point) {
                    self.mode = Mode::Resizing {
                        id: selected.id,
                        handle,
                        original: selected.bounds,
                    };
                    self.preview = Some(selected.bounds);
                    return Ok(Outcome::Started);
                }
            }
        }

        if let Some(hit) = store.hit_test(surface.page_index, point) {
            let (id, bounds) = (hit.id, hit.bounds);
            store.select(Some(id))?;
            self.mode = Mode::Moving {
                id,
                anchor: point,
                original: bounds,
            };
            self.preview = Some(bounds);
            return Ok(Outcome::Started);
        }

        match self.tool {
            Tool::Draw(_) => {
                self.mode = Mode::Drawing { anchor: point };
                self.preview = Some(PixelRect::new(point.x, point.y, 0.0, 0.0));
                Ok(Outcome::Started)
            }
            Tool::Select => {
                if store.selected().is_some() {
                    store.select(None)?;
                    Ok(Outcome::Deselected)
                } else {
                    Ok(Outcome::Ignored)
                }
            }
        }
    }

    pub fn pointer_move(
        &mut self,
        point: PixelPoint,
        surface: &RenderState,
        store: &AnnotationStore,
    ) -> Outcome {
        if self.is_idle() || !(point.x.is_finite() && point.y.is_finite()) {
            return Outcome::Ignored;
        }
        let point = clamp_point(point, surface);

        let rect = match self.mode {
            Mode::Idle => return Outcome::Ignored,
            Mode::Drawing { anchor } => PixelRect::from_corners(anchor, point),
            Mode::Moving {
                anchor, original, ..
            } => {
                let moved = original.translate(point.x - anchor.x, point.y - anchor.y);
                clamp_rect(moved, surface)
            }
            Mode::Resizing {
                handle, original, ..
            } => clamp_rect(resize(original, handle, point, store.min_size_px()), surface),
        };
        self.preview = Some(rect);
        Outcome::Preview(rect)
    }

    pub fn pointer_up(
        &mut self,
        point: PixelPoint,
        surface: &RenderState,
        store: &mut AnnotationStore,
    ) -> Result<Outcome> {
        if self.is_idle() {
            return Ok(Outcome::Ignored);
        }
        self.pointer_move(point, surface, store);
        self.finish(surface, store)
    }

    /// Leaving the surface mid-gesture ends it at the last known position
    pub fn pointer_leave(
        &mut self,
        surface: &RenderState,
        store: &mut AnnotationStore,
    ) -> Result<Outcome> {
        if self.is_idle() {
            return Ok(Outcome::Ignored);
        }
        self.finish(surface, store)
    }

    /// Delete the selected annotation, if any
    pub fn delete_selected(&mut self, store: &mut AnnotationStore) -> Result<Option<AnnotationId>> {
        let Some(id) = store.selected() else {
            return Ok(None);
        };
        if self.active_annotation() == Some(id) {
            self.cancel();
        }
        store.remove(id)?;
        Ok(Some(id))
    }

    fn finish(&mut self, surface: &RenderState, store: &mut AnnotationStore) -> Result<Outcome> {
        let mode = self.mode;
        let preview = self.preview;
        self.cancel();

        let Some(rect) = preview else {
            return Ok(Outcome::Finished);
        };

        match mode {
            Mode::Idle => Ok(Outcome::Ignored),
            Mode::Drawing { .. } => {
                let Tool::Draw(body) = &self.tool else {
                    return Ok(Outcome::Dropped);
                };
                match store.create(surface.page_index, rect, body.clone()) {
                    Ok(id) => {
                        store.select(Some(id))?;
                        Ok(Outcome::Created(id))
                    }
                    Err(AnnotateError::DegenerateAnnotation { width, height, .. }) => {
                        tracing::debug!(width, height, "dropped degenerate annotation");
                        Ok(Outcome::Dropped)
                    }
                    Err(e) => Err(e),
                }
            }
            Mode::Moving { id, original, .. } | Mode::Resizing { id, original, .. } => {
                if rect == original {
                    return Ok(Outcome::Finished);
                }
                store.update(id, AnnotationPatch::bounds(rect))?;
                Ok(Outcome::Updated(id))
            }
        }
    }

    fn nearest_handle(&self, bounds: &PixelRect, point: PixelPoint) -> Option<Corner> {
        Corner::ALL
            .iter()
            .map(|corner| (*corner, bounds.corner(*corner).distance_to(&point)))
            .filter(|(_, distance)| *distance <= self.handle_radius_px)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(corner, _)| corner)
    }
}

fn check_point(point: PixelPoint) -> Result<()> {
    if point.x.is_finite() && point.y.is_finite() {
        Ok(())
    } else {
        Err(AnnotateError::InvalidGeometry(format!(
            "non-finite pointer position {:?}",
            point
        )))
    }
}

fn clamp_point(point: PixelPoint, surface: &RenderState) -> PixelPoint {
    PixelPoint::new(
        point.x.clamp(0.0, surface.pixel_width),
        point.y.clamp(0.0, surface.pixel_height),
    )
}

/// Keep a moved rectangle on the surface without changing its size
fn clamp_rect(rect: PixelRect, surface: &RenderState) -> PixelRect {
    let max_x = (surface.pixel_width - rect.width).max(0.0);
    let max_y = (surface.pixel_height - rect.height).max(0.0);
    PixelRect {
        x: rect.x.clamp(0.0, max_x),
        y: rect.y.clamp(0.0, max_y),
        ..rect
    }
}

/// Drag `handle` of `original` to `point`. The opposite corner stays put;
/// crossing it swaps edges instead of producing a negative size.
fn resize(original: PixelRect, handle: Corner, point: PixelPoint, min: f64) -> PixelRect {
    let fixed = original.corner(handle.opposite());

    let (x, width) = grow_axis(fixed.x, point.x, min);
    let (y, height) = grow_axis(fixed.y, point.y, min);
    PixelRect::new(x, y, width, height)
}

fn grow_axis(fixed: f64, moving: f64, min: f64) -> (f64, f64) {
    let size = (moving - fixed).abs().max(min);
    if moving >= fixed {
        (fixed, size)
    } else {
        (fixed - size, size)
    }
}
