//! Coordinate transformation between raster pixels and PDF page space
//!
//! Pixels are first divided by the render scale to get view points `(u, v)`
//! (top-left origin of the page as displayed). View points are then mapped
//! onto the unrotated page, matching the PDF.js viewport convention:
//!
//! | rotation | page x       | page y       |
//! |----------|--------------|--------------|
//! | 0        | `x0 + u`     | `y0 + H - v` |
//! | 90       | `x0 + v`     | `y0 + u`     |
//! | 180      | `x0 + W - u` | `y0 + v`     |
//! | 270      | `x0 + W - v` | `y0 + H - u` |

use crate::error::{AnnotateError, Result};
use crate::geometry::{PdfPoint, PdfRect, PixelPoint, PixelRect, Rotation};
use crate::page::{Page, RenderState};

fn check(render: &RenderState, page: &Page) -> Result<()> {
    page.validate()?;
    if !render.scale.is_finite() || render.scale <= 0.0 {
        return Err(AnnotateError::InvalidGeometry(format!(
            "render scale must be positive, got {}",
            render.scale
        )));
    }
    if render.page_index != page.index {
        return Err(AnnotateError::InvalidGeometry(format!(
            "render state is for page {} but page {} was given",
            render.page_index, page.index
        )));
    }
    Ok(())
}

fn check_finite(x: f64, y: f64) -> Result<()> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(AnnotateError::InvalidGeometry(format!(
            "non-finite point ({}, {})",
            x, y
        )))
    }
}

/// Convert a raster pixel to a point in page user space
pub fn pixel_to_pdf(point: PixelPoint, render: &RenderState, page: &Page) -> Result<PdfPoint> {
    check(render, page)?;
    check_finite(point.x, point.y)?;

    let u = point.x / render.scale;
    let v = point.y / render.scale;
    let (w, h) = (page.width_pt, page.height_pt);

    let (x, y) = match page.rotation {
        Rotation::None => (u, h - v),
        Rotation::Quarter => (v, u),
        Rotation::Half => (w - u, v),
        Rotation::ThreeQuarter => (w - v, h - u),
    };

    Ok(PdfPoint::new(page.origin_x + x, page.origin_y + y))
}

/// Convert a point in page user space to a raster pixel. Inverse of [`pixel_to_pdf`].
pub fn pdf_to_pixel(point: PdfPoint, render: &RenderState, page: &Page) -> Result<PixelPoint> {
    check(render, page)?;
    check_finite(point.x, point.y)?;

    let px = point.x - page.origin_x;
    let py = point.y - page.origin_y;
    let (w, h) = (page.width_pt, page.height_pt);

    let (u, v) = match page.rotation {
        Rotation::None => (px, h - py),
        Rotation::Quarter => (py, px),
        Rotation::Half => (w - px, py),
        Rotation::ThreeQuarter => (h - py, w - px),
    };

    Ok(PixelPoint::new(u * render.scale, v * render.scale))
}

/// Convert a raster rectangle to a page-space rectangle (lower-left origin)
pub fn rect_pixel_to_pdf(rect: PixelRect, render: &RenderState, page: &Page) -> Result<PdfRect> {
    let a = pixel_to_pdf(rect.top_left(), render, page)?;
    let b = pixel_to_pdf(rect.bottom_right(), render, page)?;
    Ok(PdfRect::from_corners(a, b))
}

/// Convert a page-space rectangle to a raster rectangle (top-left origin)
pub fn rect_pdf_to_pixel(rect: PdfRect, render: &RenderState, page: &Page) -> Result<PixelRect> {
    let a = pdf_to_pixel(PdfPoint::new(rect.x, rect.y), render, page)?;
    let b = pdf_to_pixel(PdfPoint::new(rect.right(), rect.top()), render, page)?;
    Ok(PixelRect::from_corners(a, b))
}

/// Carry a raster rectangle from one view of a page to another (new scale
/// and/or rotation) so it keeps covering the same page area.
pub fn remap_rect(
    rect: PixelRect,
    from: (&RenderState, &Page),
    to: (&RenderState, &Page),
) -> Result<PixelRect> {
    let pdf = rect_pixel_to_pdf(rect, from.0, from.1)?;
    rect_pdf_to_pixel(pdf, to.0, to.1)
}

/// Unit vectors, in page space, of the view's rightward and downward axes.
/// Text laid out along them reads upright on the rotated display.
pub fn view_axes(rotation: Rotation) -> ((f64, f64), (f64, f64)) {
    match rotation {
        Rotation::None => ((1.0, 0.0), (0.0, -1.0)),
        Rotation::Quarter => ((0.0, 1.0), (1.0, 0.0)),
        Rotation::Half => ((-1.0, 0.0), (0.0, 1.0)),
        Rotation::ThreeQuarter => ((0.0, -1.0), (-1.0, 0.0)),
    }
}
