//! Interactive PDF annotation engine
//!
//! Rasterize a page at any scale, let a user draw, move and resize
//! annotations on the raster, keep raster pixels and PDF points reconciled
//! across zoom and page rotation, and commit everything back into the
//! document in one atomic save.
//!
//! The PDF libraries are injected: rendering through [`RenderBackend`] and
//! writing through [`MutationBackend`]. [`LopdfBackend`] implements both.
//!
//! ```no_run
//! use annotate_core::{
//!     AnnotationBody, EngineConfig, LopdfBackend, PdfSession, PointerEvent, Tool, ToolProfile,
//! };
//!
//! # fn main() -> annotate_core::Result<()> {
//! let bytes = std::fs::read("contract.pdf").unwrap();
//! let mut session = PdfSession::open(
//!     &LopdfBackend,
//!     "contract.pdf",
//!     bytes,
//!     ToolProfile::Redactor,
//!     EngineConfig::default(),
//! )?;
//! session.set_tool(Tool::Draw(AnnotationBody::redaction()))?;
//! session.pointer(PointerEvent::Down { x: 100.0, y: 100.0 })?;
//! session.pointer(PointerEvent::Up { x: 300.0, y: 160.0 })?;
//! let redacted = session.commit(&LopdfBackend)?;
//! # Ok(())
//! # }
//! ```

pub mod annotation;
pub mod backend;
pub mod commit;
pub mod config;
pub mod error;
pub mod fonts;
pub mod geometry;
pub mod interaction;
pub mod page;
pub mod render;
pub mod session;
pub mod store;
pub mod tool;
pub mod transform;

pub use annotation::{
    Alignment, Annotation, AnnotationBody, AnnotationId, AnnotationKind, AnnotationPatch, Color,
    TextStyle, WidgetKind,
};
pub use backend::{
    Bitmap, LopdfBackend, LopdfDocument, MutableDocument, MutationBackend, RenderBackend,
    RenderDocument,
};
pub use commit::{CommitEngine, PageEdits};
pub use config::EngineConfig;
pub use error::{AnnotateError, Result};
pub use geometry::{Corner, PdfPoint, PdfRect, PixelPoint, PixelRect, Rotation};
pub use interaction::{InteractionController, Mode, Outcome, PointerEvent, Tool};
pub use page::{Page, PageGeometry, RenderState};
pub use render::{PageRenderer, RenderRequest, RenderTicket};
pub use session::PdfSession;
pub use store::{AnnotationStore, MIN_SIZE_PX};
pub use tool::ToolProfile;
pub use transform::{pdf_to_pixel, pixel_to_pdf, rect_pdf_to_pixel, rect_pixel_to_pdf};
