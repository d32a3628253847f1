//! Page model and page geometry extraction
//!
//! Page geometry is read once when a document is loaded. Width, height and
//! origin come from the MediaBox, rotation from `/Rotate`; both may be
//! inherited from an ancestor in the page tree.

use lopdf::{Dictionary, Document, Object};
use serde::{Deserialize, Serialize};

use crate::error::{AnnotateError, Result};
use crate::geometry::Rotation;

/// US Letter, used when a page and all its ancestors lack a MediaBox
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Inheritable attributes are looked up at most this many levels up the tree
const MAX_TREE_DEPTH: usize = 32;

/// Geometry of one page as read from the source document
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Page width in points (1 point = 1/72 inch)
    pub width_pt: f64,
    /// Page height in points
    pub height_pt: f64,
    /// Lower-left corner of the MediaBox, usually the origin
    pub origin_x: f64,
    pub origin_y: f64,
    pub rotation: Rotation,
}

impl PageGeometry {
    pub fn letter() -> Self {
        Self {
            width_pt: 612.0,
            height_pt: 792.0,
            origin_x: 0.0,
            origin_y: 0.0,
            rotation: Rotation::None,
        }
    }
}

/// A page of the session's document
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Current position in the session (0-indexed)
    pub index: u32,
    /// Position in the original byte source (0-indexed)
    pub source_index: u32,
    pub width_pt: f64,
    pub height_pt: f64,
    pub origin_x: f64,
    pub origin_y: f64,
    pub rotation: Rotation,
}

impl Page {
    pub fn new(index: u32, geometry: PageGeometry) -> Self {
        Self {
            index,
            source_index: index,
            width_pt: geometry.width_pt,
            height_pt: geometry.height_pt,
            origin_x: geometry.origin_x,
            origin_y: geometry.origin_y,
            rotation: geometry.rotation,
        }
    }

    /// Width and height as displayed, after rotation
    pub fn displayed_size(&self) -> (f64, f64) {
        if self.rotation.swaps_axes() {
            (self.height_pt, self.width_pt)
        } else {
            (self.width_pt, self.height_pt)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(self.width_pt) || !valid(self.height_pt) {
            return Err(AnnotateError::InvalidGeometry(format!(
                "page {} has malformed size {}x{}",
                self.index, self.width_pt, self.height_pt
            )));
        }
        if !self.origin_x.is_finite() || !self.origin_y.is_finite() {
            return Err(AnnotateError::InvalidGeometry(format!(
                "page {} has a non-finite origin",
                self.index
            )));
        }
        Ok(())
    }
}

/// How a page is currently rasterized
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    pub page_index: u32,
    pub scale: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl RenderState {
    /// Derive the raster size of `page` at `scale`
    pub fn for_page(page: &Page, scale: f64) -> Result<Self> {
        page.validate()?;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(AnnotateError::InvalidGeometry(format!(
                "render scale must be positive, got {}",
                scale
            )));
        }
        let (width, height) = page.displayed_size();
        Ok(Self {
            page_index: page.index,
            scale,
            pixel_width: width * scale,
            pixel_height: height * scale,
        })
    }

    /// Whole-pixel raster size as produced by a rasterizer
    pub fn raster_size(&self) -> (u32, u32) {
        (
            self.pixel_width.round().max(1.0) as u32,
            self.pixel_height.round().max(1.0) as u32,
        )
    }
}

/// Read the geometry of every page, in page order
pub fn read_page_geometry(doc: &Document) -> Result<Vec<PageGeometry>> {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(AnnotateError::Load("PDF has no pages".to_string()));
    }

    let mut result = Vec::with_capacity(pages.len());
    for (page_num, page_id) in pages {
        let page_dict = doc
            .get_dictionary(page_id)
            .map_err(|e| AnnotateError::Load(format!("Page {} is unreadable: {}", page_num, e)))?;

        let media_box = match inherited(doc, page_dict, b"MediaBox") {
            Some(obj) => parse_box(doc, obj)
                .map_err(|e| AnnotateError::Load(format!("Page {}: {}", page_num, e)))?,
            None => DEFAULT_MEDIA_BOX,
        };

        let width_pt = (media_box[2] - media_box[0]).abs();
        let height_pt = (media_box[3] - media_box[1]).abs();
        if width_pt <= 0.0 || height_pt <= 0.0 {
            return Err(AnnotateError::Load(format!(
                "Page {} has an empty MediaBox",
                page_num
            )));
        }

        let rotation = inherited(doc, page_dict, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .map(|angle| Rotation::from_degrees(angle).unwrap_or_default())
            .unwrap_or_default();

        result.push(PageGeometry {
            width_pt,
            height_pt,
            origin_x: media_box[0].min(media_box[2]),
            origin_y: media_box[1].min(media_box[3]),
            rotation,
        });
    }

    Ok(result)
}

/// Look up an inheritable page attribute, walking `/Parent` links
pub(crate) fn inherited<'a>(doc: &'a Document, page_dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut dict = page_dict;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Parse a box array [x1, y1, x2, y2], following a reference if needed
fn parse_box(doc: &Document, obj: &Object) -> std::result::Result<[f64; 4], String> {
    let obj = match obj {
        Object::Reference(id) => doc
            .get_object(*id)
            .map_err(|e| format!("MediaBox reference is dangling: {}", e))?,
        other => other,
    };
    let array = obj
        .as_array()
        .map_err(|_| "MediaBox is not an array".to_string())?;
    if array.len() != 4 {
        return Err("MediaBox must have 4 elements".to_string());
    }

    let mut result = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        result[i] = match obj {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => return Err(format!("MediaBox element {} is not a number", i)),
        };
    }

    Ok(result)
}
