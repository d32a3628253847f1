use thiserror::Error;

use crate::annotation::{AnnotationId, AnnotationKind};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotateError {
    /// The source bytes could not be opened (corrupt, encrypted, no pages).
    #[error("Failed to load PDF: {0}")]
    Load(String),

    /// An internal geometry invariant was violated. Indicates a bug in the caller.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The attempted annotation is smaller than the minimum size. Expected
    /// during normal interaction and ignored by callers.
    #[error("Annotation {width}x{height}px is below the {min}px minimum")]
    DegenerateAnnotation { width: f64, height: f64, min: f64 },

    /// Writing annotations into the document failed. Nothing was written.
    #[error("Commit failed: {0}")]
    Commit(String),

    #[error("Rasterization failed: {0}")]
    Render(String),

    #[error("Unknown annotation {0}")]
    UnknownAnnotation(AnnotationId),

    #[error("Page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Cannot delete page {0}: a document needs at least one page")]
    LastPage(u32),

    #[error("{kind:?} annotations are not permitted by the {tool} tool")]
    KindNotPermitted { kind: AnnotationKind, tool: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AnnotateError>;
