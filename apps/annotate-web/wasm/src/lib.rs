//! WASM bindings for the annotation engine
//!
//! The browser renders pages with PDF.js; everything else (annotation state,
//! pointer handling, coordinate conversion and the final commit) lives in
//! Rust behind `AnnotateSession`. JavaScript only forwards DOM events and
//! paints what the session reports.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { AnnotateSession } from './pkg/annotate_wasm.js';
//!
//! await init();
//!
//! const session = new AnnotateSession("contract.pdf", bytes, "redact");
//! const render = session.beginRender();
//! if (render.status === "start") {
//!     await pdfjsPage.render({ canvasContext, viewport }).promise;
//!     session.finishRender(render.token, canvas.width, canvas.height);
//! }
//! canvas.onpointerdown = (e) => session.pointerDown(e.offsetX, e.offsetY);
//! // ...
//! downloadBlob(session.export(), session.outputFilename());
//! ```

pub mod annotate_session;

use annotate_core::{LopdfBackend, RenderBackend, RenderDocument};
use wasm_bindgen::prelude::*;

pub use annotate_session::AnnotateSession;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Page geometry of a PDF without opening a session
#[wasm_bindgen(js_name = getPageGeometry)]
pub fn get_page_geometry(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let doc = LopdfBackend
        .load(bytes)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let pages = (0..doc.page_count())
        .map(|i| doc.page_geometry(i))
        .collect::<annotate_core::Result<Vec<_>>>()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&pages)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
