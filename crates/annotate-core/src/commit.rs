//! Writing annotations into the document
//!
//! The commit reads the session's annotations, converts each one to page
//! space with the render state it was drawn on and issues drawing calls
//! against a freshly loaded copy of the source bytes. The source bytes are
//! never touched; a failure anywhere discards the copy.

use crate::annotation::{Alignment, Annotation, AnnotationBody, Color, TextStyle};
use crate::backend::{FieldSpec, MutableDocument, MutationBackend, TextRun};
use crate::config::EngineConfig;
use crate::error::{AnnotateError, Result};
use crate::fonts;
use crate::geometry::{PdfPoint, PdfRect, PixelRect, Rotation};
use crate::page::{Page, RenderState};
use crate::transform::{pixel_to_pdf, rect_pixel_to_pdf, view_axes};

/// Page-level edits made in the session, keyed by source page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageEdits {
    pub rotations: Vec<(u32, Rotation)>,
    pub deleted: Vec<u32>,
}

impl PageEdits {
    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty() && self.deleted.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommitEngine {
    cover_padding_pt: f64,
    line_height: f64,
}

impl Default for CommitEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl CommitEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            cover_padding_pt: config.cover_padding_pt,
            line_height: config.line_height,
        }
    }

    /// Produce new document bytes with every annotation written as page content.
    ///
    /// `pages` are the session's pages in display order and `scale` the render
    /// scale the annotation bounds are expressed in. Any failure is reported
    /// as [`AnnotateError::Commit`].
    pub fn commit<B: MutationBackend>(
        &self,
        backend: &B,
        source: &[u8],
        pages: &[Page],
        scale: f64,
        annotations: &[Annotation],
        edits: &PageEdits,
    ) -> Result<Vec<u8>> {
        tracing::info!(
            annotations = annotations.len(),
            rotated = edits.rotations.len(),
            deleted = edits.deleted.len(),
            "commit started"
        );

        let bytes = self
            .write(backend, source, pages, scale, annotations, edits)
            .map_err(|e| match e {
                AnnotateError::Commit(_) => e,
                other => AnnotateError::Commit(other.to_string()),
            })?;

        tracing::info!(bytes = bytes.len(), "commit finished");
        Ok(bytes)
    }

    fn write<B: MutationBackend>(
        &self,
        backend: &B,
        source: &[u8],
        pages: &[Page],
        scale: f64,
        annotations: &[Annotation],
        edits: &PageEdits,
    ) -> Result<Vec<u8>> {
        if let Some(orphan) = annotations
            .iter()
            .find(|a| !pages.iter().any(|p| p.index == a.page_index))
        {
            return Err(AnnotateError::PageOutOfRange {
                page: orphan.page_index,
                page_count: pages.len() as u32,
            });
        }

        let mut doc = backend.load(source)?;

        for page in pages {
            let mut on_page = annotations
                .iter()
                .filter(|a| a.page_index == page.index)
                .peekable();
            if on_page.peek().is_none() {
                continue;
            }
            let render = RenderState::for_page(page, scale)?;
            for annotation in on_page {
                self.write_annotation(&mut doc, page, &render, annotation)?;
            }
        }

        for (source_page, rotation) in &edits.rotations {
            doc.set_rotation(*source_page, *rotation)?;
        }
        doc.delete_pages(&edits.deleted)?;
        doc.save()
    }

    fn write_annotation<D: MutableDocument>(
        &self,
        doc: &mut D,
        page: &Page,
        render: &RenderState,
        annotation: &Annotation,
    ) -> Result<()> {
        match &annotation.body {
            AnnotationBody::Rectangle { fill } => {
                let rect = rect_pixel_to_pdf(annotation.bounds, render, page)?;
                doc.draw_rectangle(page.source_index, rect, *fill)
            }
            AnnotationBody::Text {
                text,
                style,
                cover,
                cover_color,
            } => {
                if let Some(cover) = cover {
                    self.write_cover(doc, page, *cover, *cover_color)?;
                }
                self.write_text(doc, page, render, annotation.bounds, text, style)
            }
            AnnotationBody::Field {
                name,
                widget,
                style,
            } => {
                let rect = rect_pixel_to_pdf(annotation.bounds, render, page)?;
                doc.create_form_field(
                    page.source_index,
                    &FieldSpec {
                        name,
                        rect,
                        widget: *widget,
                        font: style.pdf_font_name(),
                        size: style.font_size,
                        color: style.color,
                        rotation: page.rotation,
                    },
                )
            }
        }
    }

    fn write_cover<D: MutableDocument>(
        &self,
        doc: &mut D,
        page: &Page,
        cover: PdfRect,
        color: Color,
    ) -> Result<()> {
        doc.draw_rectangle(page.source_index, cover.inflate(self.cover_padding_pt), color)
    }

    /// Lay out `text` inside `bounds`, one run per line. Lines run along the
    /// view's x axis so the text reads upright on a rotated page.
    fn write_text<D: MutableDocument>(
        &self,
        doc: &mut D,
        page: &Page,
        render: &RenderState,
        bounds: PixelRect,
        text: &str,
        style: &TextStyle,
    ) -> Result<()> {
        let font = style.pdf_font_name();
        let size = style.font_size;
        if !size.is_finite() || size <= 0.0 {
            return Err(AnnotateError::Commit(format!("invalid font size {}", size)));
        }

        let top_left = pixel_to_pdf(bounds.top_left(), render, page)?;
        let ((rx, ry), (dx, dy)) = view_axes(page.rotation);
        let box_width = bounds.width / render.scale;
        let ascent = fonts::metrics(font).ascent_pt(size);

        for (i, line) in text.split('\n').enumerate() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let width = doc.measure_text(line, font, size)?;
            let offset = match style.alignment {
                Alignment::Left => 0.0,
                Alignment::Center => ((box_width - width) / 2.0).max(0.0),
                Alignment::Right => (box_width - width).max(0.0),
            };
            let down = ascent + i as f64 * self.line_height * size;
            let origin = PdfPoint::new(
                top_left.x + dx * down + rx * offset,
                top_left.y + dy * down + ry * offset,
            );

            doc.draw_text(
                page.source_index,
                &TextRun {
                    text: line,
                    font,
                    size,
                    color: style.color,
                    origin,
                    rotation: page.rotation,
                },
            )?;
        }
        Ok(())
    }
}
