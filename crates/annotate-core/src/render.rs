//! Page rasterization scheduling
//!
//! Rendering may be asynchronous in a host (a browser renders with PDF.js and
//! reports back later), so every render is identified by a ticket. Only the
//! most recently issued ticket can complete; anything older is stale and its
//! bitmap is dropped.

use serde::{Deserialize, Serialize};

use crate::backend::{Bitmap, RenderDocument};
use crate::error::{AnnotateError, Result};
use crate::page::Page;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderTicket {
    pub token: u64,
    pub page_index: u32,
    pub scale: f64,
}

impl RenderTicket {
    fn is_for(&self, page_index: u32, scale: f64) -> bool {
        self.page_index == page_index && self.scale == scale
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderRequest {
    /// The current bitmap already shows this page at this scale
    UpToDate,
    /// The same render is already outstanding
    InFlight(RenderTicket),
    /// A new render must be started for this ticket
    Start(RenderTicket),
}

#[derive(Debug, Default)]
pub struct PageRenderer {
    next_token: u64,
    outstanding: Option<RenderTicket>,
    current: Option<(RenderTicket, Bitmap)>,
}

impl PageRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for `page_index` at `scale`. Supersedes any outstanding render for
    /// a different page or scale.
    pub fn request(&mut self, page_index: u32, scale: f64) -> RenderRequest {
        if let Some(ticket) = self.outstanding {
            if ticket.is_for(page_index, scale) {
                return RenderRequest::InFlight(ticket);
            }
        }
        if let Some((ticket, _)) = &self.current {
            if ticket.is_for(page_index, scale) {
                self.outstanding = None;
                return RenderRequest::UpToDate;
            }
        }

        self.next_token += 1;
        let ticket = RenderTicket {
            token: self.next_token,
            page_index,
            scale,
        };
        if let Some(superseded) = self.outstanding.replace(ticket) {
            tracing::debug!(token = superseded.token, "render superseded");
        }
        tracing::debug!(token = ticket.token, page = page_index, scale, "render scheduled");
        RenderRequest::Start(ticket)
    }

    /// Deliver a finished render. Returns false, dropping the bitmap, when the
    /// ticket is no longer current.
    pub fn complete(&mut self, ticket: RenderTicket, bitmap: Bitmap) -> bool {
        match self.outstanding {
            Some(outstanding) if outstanding.token == ticket.token => {
                self.outstanding = None;
                self.current = Some((outstanding, bitmap));
                true
            }
            _ => {
                tracing::debug!(token = ticket.token, "discarding stale render");
                false
            }
        }
    }

    /// Forget a render that failed so the next request starts a fresh one
    pub fn abandon(&mut self, ticket: RenderTicket) {
        if self.outstanding.map(|t| t.token) == Some(ticket.token) {
            self.outstanding = None;
        }
    }

    pub fn is_current(&self, ticket: RenderTicket) -> bool {
        self.outstanding.map(|t| t.token) == Some(ticket.token)
    }

    /// Render through a synchronous backend using the same ticket discipline
    pub fn render_now<D: RenderDocument>(
        &mut self,
        doc: &D,
        page: &Page,
        scale: f64,
    ) -> Result<&Bitmap> {
        match self.request(page.index, scale) {
            RenderRequest::UpToDate => {}
            RenderRequest::Start(ticket) | RenderRequest::InFlight(ticket) => {
                let bitmap = match doc.rasterize(page, scale) {
                    Ok(bitmap) => bitmap,
                    Err(e) => {
                        self.abandon(ticket);
                        return Err(match e {
                            AnnotateError::Render(_) | AnnotateError::InvalidGeometry(_) => e,
                            other => AnnotateError::Render(other.to_string()),
                        });
                    }
                };
                self.complete(ticket, bitmap);
            }
        }
        self.current_bitmap()
            .ok_or_else(|| AnnotateError::Render("no bitmap after render".to_string()))
    }

    pub fn current(&self) -> Option<(RenderTicket, &Bitmap)> {
        self.current.as_ref().map(|(ticket, bitmap)| (*ticket, bitmap))
    }

    pub fn current_bitmap(&self) -> Option<&Bitmap> {
        self.current.as_ref().map(|(_, bitmap)| bitmap)
    }

    /// Drop the cached bitmap and any outstanding render, e.g. after the
    /// page's rotation changed or pages were deleted
    pub fn invalidate(&mut self) {
        self.current = None;
        self.outstanding = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageGeometry;
    use std::cell::Cell;

    fn bitmap(width: u32) -> Bitmap {
        Bitmap::filled(width, 1, [0, 0, 0, 255])
    }

    fn start(request: RenderRequest) -> RenderTicket {
        match request {
            RenderRequest::Start(ticket) => ticket,
            other => panic!("expected Start, got {:?}", other),
        }
    }

    #[test]
    fn test_new_request_starts_render() {
        let mut renderer = PageRenderer::new();
        let ticket = start(renderer.request(0, 1.5));
        assert_eq!(ticket.page_index, 0);
        assert!(renderer.complete(ticket, bitmap(1)));
        assert_eq!(renderer.current_bitmap(), Some(&bitmap(1)));
    }

    #[test]
    fn test_same_request_while_outstanding_is_in_flight() {
        let mut renderer = PageRenderer::new();
        let ticket = start(renderer.request(2, 1.0));
        assert_eq!(renderer.request(2, 1.0), RenderRequest::InFlight(ticket));
    }

    #[test]
    fn test_completed_render_is_up_to_date() {
        let mut renderer = PageRenderer::new();
        let ticket = start(renderer.request(0, 1.0));
        renderer.complete(ticket, bitmap(1));
        assert_eq!(renderer.request(0, 1.0), RenderRequest::UpToDate);
    }

    #[test]
    fn test_superseded_render_is_discarded() {
        let mut renderer = PageRenderer::new();
        let old = start(renderer.request(0, 1.0));
        let new = start(renderer.request(1, 1.0));
        assert!(new.token > old.token);

        // The old render finishes late and must never be painted
        assert!(!renderer.complete(old, bitmap(7)));
        assert!(renderer.current_bitmap().is_none());
        assert!(renderer.complete(new, bitmap(2)));
        assert_eq!(renderer.current().unwrap().0.page_index, 1);
    }

    #[test]
    fn test_scale_change_supersedes() {
        let mut renderer = PageRenderer::new();
        let first = start(renderer.request(0, 1.0));
        start(renderer.request(0, 2.0));
        assert!(!renderer.is_current(first));
    }

    #[test]
    fn test_returning_to_current_page_cancels_outstanding() {
        let mut renderer = PageRenderer::new();
        let shown = start(renderer.request(0, 1.0));
        renderer.complete(shown, bitmap(1));
        let pending = start(renderer.request(1, 1.0));
        assert_eq!(renderer.request(0, 1.0), RenderRequest::UpToDate);
        assert!(!renderer.complete(pending, bitmap(2)));
        assert_eq!(renderer.current_bitmap(), Some(&bitmap(1)));
    }

    #[test]
    fn test_double_completion_is_rejected() {
        let mut renderer = PageRenderer::new();
        let ticket = start(renderer.request(0, 1.0));
        assert!(renderer.complete(ticket, bitmap(1)));
        assert!(!renderer.complete(ticket, bitmap(2)));
        assert_eq!(renderer.current_bitmap(), Some(&bitmap(1)));
    }

    #[test]
    fn test_invalidate_forces_new_render() {
        let mut renderer = PageRenderer::new();
        let ticket = start(renderer.request(0, 1.0));
        renderer.complete(ticket, bitmap(1));
        renderer.invalidate();
        assert!(renderer.current_bitmap().is_none());
        start(renderer.request(0, 1.0));
    }

    struct CountingDoc {
        calls: Cell<u32>,
        fail: bool,
    }

    impl RenderDocument for CountingDoc {
        fn page_count(&self) -> u32 {
            1
        }

        fn page_geometry(&self, _page: u32) -> Result<PageGeometry> {
            Ok(PageGeometry::letter())
        }

        fn rasterize(&self, page: &Page, scale: f64) -> Result<Bitmap> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(AnnotateError::Load("rasterizer crashed".to_string()));
            }
            let (w, h) = crate::page::RenderState::for_page(page, scale)?.raster_size();
            Ok(Bitmap::filled(w, h, [255; 4]))
        }
    }

    #[test]
    fn test_render_now_caches() {
        let doc = CountingDoc {
            calls: Cell::new(0),
            fail: false,
        };
        let page = Page::new(0, PageGeometry::letter());
        let mut renderer = PageRenderer::new();

        let size = {
            let bitmap = renderer.render_now(&doc, &page, 1.5).unwrap();
            (bitmap.width, bitmap.height)
        };
        assert_eq!(size, (918, 1188));
        renderer.render_now(&doc, &page, 1.5).unwrap();
        assert_eq!(doc.calls.get(), 1);
    }

    #[test]
    fn test_render_now_failure_is_render_error() {
        let doc = CountingDoc {
            calls: Cell::new(0),
            fail: true,
        };
        let page = Page::new(0, PageGeometry::letter());
        let mut renderer = PageRenderer::new();
        assert!(matches!(
            renderer.render_now(&doc, &page, 1.0),
            Err(AnnotateError::Render(_))
        ));
        // A retry starts again rather than waiting on the failed ticket
        assert!(matches!(renderer.request(0, 1.0), RenderRequest::Start(_)));
    }
}
