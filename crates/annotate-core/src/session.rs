//! One editing session over one document
//!
//! `PdfSession` owns the source bytes, the page list with its session edits
//! (rotations, deletions), the current page and scale, and the store,
//! controller and renderer that work on them. Hosts drive everything through
//! it; the library backends are injected at `open` and `commit`.
//!
//! Annotation bounds are kept in the pixel space of the current scale and
//! page rotation. Changing either remaps them through page space so they keep
//! covering the same content.

use crate::annotation::{Annotation, AnnotationId, AnnotationPatch};
use crate::backend::{Bitmap, MutationBackend, RenderBackend, RenderDocument};
use crate::commit::{CommitEngine, PageEdits};
use crate::config::EngineConfig;
use crate::error::{AnnotateError, Result};
use crate::geometry::{PixelRect, Rotation};
use crate::interaction::{InteractionController, Outcome, PointerEvent, Tool};
use crate::page::{Page, RenderState};
use crate::render::{PageRenderer, RenderRequest, RenderTicket};
use crate::store::AnnotationStore;
use crate::tool::ToolProfile;
use crate::transform::remap_rect;

pub struct PdfSession<D: RenderDocument> {
    name: String,
    source: Vec<u8>,
    document: D,
    profile: ToolProfile,
    config: EngineConfig,
    /// Pages in display order; `Page::index` always equals the position
    pages: Vec<Page>,
    /// Rotation of each source page as loaded
    original_rotations: Vec<Rotation>,
    /// Source indices of deleted pages
    deleted: Vec<u32>,
    current_page: u32,
    scale: f64,
    store: AnnotationStore,
    controller: InteractionController,
    renderer: PageRenderer,
    /// Bumped on every rotate or delete
    page_revision: u64,
    exported_revision: u64,
}

impl<D: RenderDocument> PdfSession<D> {
    /// Load `bytes` with the rendering backend. `name` is the original file
    /// name, used to derive the output name.
    pub fn open<B>(
        backend: &B,
        name: impl Into<String>,
        bytes: Vec<u8>,
        profile: ToolProfile,
        config: EngineConfig,
    ) -> Result<Self>
    where
        B: RenderBackend<Document = D>,
    {
        config.validate()?;
        let document = backend.load(&bytes)?;
        let page_count = document.page_count();
        if page_count == 0 {
            return Err(AnnotateError::Load("PDF has no pages".to_string()));
        }

        let mut pages = Vec::with_capacity(page_count as usize);
        for index in 0..page_count {
            let page = Page::new(index, document.page_geometry(index)?);
            page.validate().map_err(|e| AnnotateError::Load(e.to_string()))?;
            pages.push(page);
        }
        let original_rotations = pages.iter().map(|p| p.rotation).collect();

        let name = name.into();
        tracing::info!(%name, pages = page_count, bytes = bytes.len(), ?profile, "session opened");

        Ok(Self {
            name,
            source: bytes,
            document,
            profile,
            store: AnnotationStore::new(config.min_size_px),
            controller: InteractionController::new(config.handle_radius_px),
            scale: config.default_scale,
            config,
            pages,
            original_rotations,
            deleted: Vec::new(),
            current_page: 0,
            renderer: PageRenderer::new(),
            page_revision: 0,
            exported_revision: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn profile(&self) -> ToolProfile {
        self.profile
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: u32) -> Result<&Page> {
        self.pages
            .get(index as usize)
            .ok_or(AnnotateError::PageOutOfRange {
                page: index,
                page_count: self.page_count(),
            })
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// Render state of the current page at the current scale
    pub fn render_state(&self) -> Result<RenderState> {
        RenderState::for_page(self.page(self.current_page)?, self.scale)
    }

    pub fn go_to_page(&mut self, index: u32) -> Result<()> {
        self.page(index)?;
        if index != self.current_page {
            self.controller.cancel();
            self.current_page = index;
        }
        Ok(())
    }

    /// Change the render scale. Every annotation is carried over to the new scale.
    pub fn set_scale(&mut self, scale: f64) -> Result<()> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(AnnotateError::InvalidGeometry(format!(
                "render scale must be positive, got {}",
                scale
            )));
        }
        if scale == self.scale {
            return Ok(());
        }

        self.controller.cancel();
        for page in self.pages.clone() {
            let from = RenderState::for_page(&page, self.scale)?;
            let to = RenderState::for_page(&page, scale)?;
            self.remap_page_annotations(page.index, (&from, &page), (&to, &page))?;
        }
        self.scale = scale;
        Ok(())
    }

    fn remap_page_annotations(
        &mut self,
        page_index: u32,
        from: (&RenderState, &Page),
        to: (&RenderState, &Page),
    ) -> Result<()> {
        let moves: Vec<(AnnotationId, PixelRect)> = self
            .store
            .list_for_page(page_index)
            .iter()
            .map(|a| (a.id, a.bounds))
            .collect();
        for (id, bounds) in moves {
            self.store.set_bounds_unchecked(id, remap_rect(bounds, from, to)?)?;
        }
        Ok(())
    }

    /// Ask for a render of the current page; see [`PageRenderer::request`]
    pub fn request_render(&mut self) -> Result<RenderRequest> {
        self.page(self.current_page)?;
        Ok(self.renderer.request(self.current_page, self.scale))
    }

    /// Deliver a host-side render. Returns false for a stale ticket.
    pub fn complete_render(&mut self, ticket: RenderTicket, bitmap: Bitmap) -> bool {
        self.renderer.complete(ticket, bitmap)
    }

    pub fn abandon_render(&mut self, ticket: RenderTicket) {
        self.renderer.abandon(ticket);
    }

    /// Render the current page with the session's own rendering backend
    pub fn render_current(&mut self) -> Result<&Bitmap> {
        let page = *self.page(self.current_page)?;
        self.renderer.render_now(&self.document, &page, self.scale)
    }

    pub fn renderer(&self) -> &PageRenderer {
        &self.renderer
    }

    /// Switch the pointer tool. Drawing a kind the profile does not permit is refused.
    pub fn set_tool(&mut self, tool: Tool) -> Result<()> {
        if let Tool::Draw(body) = &tool {
            self.profile.check(body.kind())?;
        }
        self.controller.set_tool(tool);
        Ok(())
    }

    /// Feed a pointer event on the current page's surface
    pub fn pointer(&mut self, event: PointerEvent) -> Result<Outcome> {
        let surface = self.render_state()?;
        self.controller.handle(event, &surface, &mut self.store)
    }

    /// Live rectangle of the gesture in progress
    pub fn preview(&self) -> Option<PixelRect> {
        self.controller.preview()
    }

    pub fn annotations_on_current_page(&self) -> Vec<&Annotation> {
        self.store.list_for_page(self.current_page)
    }

    pub fn select(&mut self, id: Option<AnnotationId>) -> Result<()> {
        self.store.select(id)
    }

    pub fn update_annotation(&mut self, id: AnnotationId, patch: AnnotationPatch) -> Result<()> {
        if self.controller.active_annotation() == Some(id) {
            self.controller.cancel();
        }
        self.store.update(id, patch)
    }

    pub fn remove_annotation(&mut self, id: AnnotationId) -> Result<Annotation> {
        if self.controller.active_annotation() == Some(id) {
            self.controller.cancel();
        }
        self.store.remove(id)
    }

    pub fn delete_selected(&mut self) -> Result<Option<AnnotationId>> {
        self.controller.delete_selected(&mut self.store)
    }

    /// Rotate a page clockwise by `quarter_turns`. Its annotations are
    /// carried over so they stay on the same content.
    pub fn rotate_page(&mut self, index: u32, quarter_turns: i64) -> Result<()> {
        let before = *self.page(index)?;
        let after = Page {
            rotation: before.rotation.turned(quarter_turns),
            ..before
        };
        if after.rotation == before.rotation {
            return Ok(());
        }

        self.controller.cancel();
        let from = RenderState::for_page(&before, self.scale)?;
        let to = RenderState::for_page(&after, self.scale)?;
        self.remap_page_annotations(index, (&from, &before), (&to, &after))?;
        self.pages[index as usize] = after;

        if index == self.current_page {
            self.renderer.invalidate();
        }
        self.page_revision += 1;
        tracing::debug!(page = index, rotation = after.rotation.degrees(), "page rotated");
        Ok(())
    }

    /// Remove a page and its annotations from the session
    pub fn delete_page(&mut self, index: u32) -> Result<()> {
        self.page(index)?;
        if self.pages.len() == 1 {
            return Err(AnnotateError::LastPage(index));
        }

        self.controller.cancel();
        let removed = self.pages.remove(index as usize);
        self.deleted.push(removed.source_index);
        for (position, page) in self.pages.iter_mut().enumerate() {
            page.index = position as u32;
        }
        let dropped = self.store.remove_page(index);

        if self.current_page > index || self.current_page as usize >= self.pages.len() {
            self.current_page = self.current_page.saturating_sub(1);
        }
        self.renderer.invalidate();
        self.page_revision += 1;
        tracing::debug!(page = index, annotations = dropped, "page deleted");
        Ok(())
    }

    /// Everything the session has changed, for staleness checks
    pub fn revision(&self) -> u64 {
        self.store.revision() + self.page_revision
    }

    /// Whether there are changes the last export does not contain
    pub fn is_dirty(&self) -> bool {
        self.revision() != self.exported_revision
    }

    fn page_edits(&self) -> PageEdits {
        let rotations = self
            .pages
            .iter()
            .filter(|p| {
                self.original_rotations
                    .get(p.source_index as usize)
                    .is_some_and(|original| *original != p.rotation)
            })
            .map(|p| (p.source_index, p.rotation))
            .collect();
        PageEdits {
            rotations,
            deleted: self.deleted.clone(),
        }
    }

    /// Write all annotations and page edits into a copy of the source.
    /// On failure the session is left exactly as it was.
    pub fn commit<M: MutationBackend>(&mut self, mutator: &M) -> Result<Vec<u8>> {
        let engine = CommitEngine::new(&self.config);
        let bytes = engine.commit(
            mutator,
            &self.source,
            &self.pages,
            self.scale,
            self.store.all(),
            &self.page_edits(),
        )?;
        self.exported_revision = self.revision();
        Ok(bytes)
    }

    pub fn output_filename(&self) -> String {
        self.profile.output_filename(&self.name)
    }

    /// Drop every annotation and page edit and return to the first page
    pub fn start_over(&mut self) -> Result<()> {
        let mut pages = Vec::with_capacity(self.original_rotations.len());
        for index in 0..self.document.page_count() {
            pages.push(Page::new(index, self.document.page_geometry(index)?));
        }

        self.pages = pages;
        self.deleted.clear();
        self.current_page = 0;
        self.scale = self.config.default_scale;
        self.store.clear();
        self.controller.set_tool(Tool::Select);
        self.renderer.invalidate();
        self.page_revision += 1;
        self.exported_revision = self.revision();
        Ok(())
    }
}
