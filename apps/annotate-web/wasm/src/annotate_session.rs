//! Browser-facing editing session
//!
//! Wraps `PdfSession` for JavaScript. Pixel coordinates are canvas pixels at
//! the session's scale; the page raster itself is produced by PDF.js and
//! announced through the render ticket calls.

use annotate_core::{
    AnnotateError, AnnotationBody, AnnotationId, AnnotationPatch, Bitmap, Color, EngineConfig,
    LopdfBackend, LopdfDocument, Outcome, Page, PdfSession, PixelRect, PointerEvent,
    RenderRequest, RenderTicket, TextStyle, Tool, ToolProfile,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn js_err(e: AnnotateError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Pointer outcome as reported to JavaScript
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointerReport {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<AnnotationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rect: Option<PixelRect>,
}

impl From<Outcome> for PointerReport {
    fn from(outcome: Outcome) -> Self {
        let (kind, id, rect) = match outcome {
            Outcome::Ignored => ("ignored", None, None),
            Outcome::Started => ("started", None, None),
            Outcome::Preview(rect) => ("preview", None, Some(rect)),
            Outcome::Created(id) => ("created", Some(id), None),
            Outcome::Updated(id) => ("updated", Some(id), None),
            Outcome::Dropped => ("dropped", None, None),
            Outcome::Finished => ("finished", None, None),
            Outcome::Deselected => ("deselected", None, None),
        };
        PointerReport { kind, id, rect }
    }
}

/// Answer to `beginRender`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

impl From<RenderRequest> for RenderReport {
    fn from(request: RenderRequest) -> Self {
        let (status, ticket) = match request {
            RenderRequest::UpToDate => ("up_to_date", None),
            RenderRequest::InFlight(ticket) => ("in_flight", Some(ticket)),
            RenderRequest::Start(ticket) => ("start", Some(ticket)),
        };
        RenderReport {
            status,
            token: ticket.map(|t| t.token),
            page: ticket.map(|t| t.page_index),
            scale: ticket.map(|t| t.scale),
        }
    }
}

/// Page geometry plus its raster size at the session scale
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub page: Page,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

/// Parse a tool description: "select", "redact", "whiteout", "text",
/// "textfield:<name>", "checkbox:<name>" or an annotation body as JSON
pub(crate) fn parse_tool(spec: &str) -> Result<Tool, String> {
    let spec = spec.trim();
    if spec.starts_with('{') {
        let body: AnnotationBody =
            serde_json::from_str(spec).map_err(|e| format!("Invalid tool body: {}", e))?;
        return Ok(Tool::Draw(body));
    }

    let (name, arg) = match spec.split_once(':') {
        Some((name, arg)) => (name, Some(arg.trim())),
        None => (spec, None),
    };
    let field_name = || {
        arg.filter(|a| !a.is_empty())
            .ok_or_else(|| format!("Tool {:?} needs a field name", name))
    };

    Ok(match name {
        "select" => Tool::Select,
        "redact" => Tool::Draw(AnnotationBody::redaction()),
        "whiteout" => Tool::Draw(AnnotationBody::white_out()),
        "text" => Tool::Draw(AnnotationBody::text(arg.unwrap_or(""))),
        "textfield" => Tool::Draw(AnnotationBody::text_field(field_name()?)),
        "checkbox" => Tool::Draw(AnnotationBody::checkbox(field_name()?, false)),
        other => return Err(format!("Unknown tool {:?}", other)),
    })
}

#[wasm_bindgen]
pub struct AnnotateSession {
    inner: PdfSession<LopdfDocument>,
    /// Last ticket handed to JavaScript
    ticket: Option<RenderTicket>,
}

impl AnnotateSession {
    fn pointer(&mut self, event: PointerEvent) -> Result<JsValue, JsValue> {
        let outcome = self.inner.pointer(event).map_err(js_err)?;
        to_js(&PointerReport::from(outcome))
    }
}

#[wasm_bindgen]
impl AnnotateSession {
    /// Open `bytes` for the given tool ("redact", "forms" or "text")
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str, bytes: &[u8], tool: &str) -> Result<AnnotateSession, JsValue> {
        Self::with_config(name, bytes, tool, "{}")
    }

    /// Like the constructor, with an engine configuration as JSON
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(
        name: &str,
        bytes: &[u8],
        tool: &str,
        config_json: &str,
    ) -> Result<AnnotateSession, JsValue> {
        let profile: ToolProfile = tool.parse().map_err(js_err)?;
        let config = EngineConfig::from_json_str(config_json).map_err(js_err)?;
        let inner = PdfSession::open(&LopdfBackend, name, bytes.to_vec(), profile, config)
            .map_err(js_err)?;
        Ok(AnnotateSession {
            inner,
            ticket: None,
        })
    }

    #[wasm_bindgen(getter, js_name = documentName)]
    pub fn document_name(&self) -> String {
        self.inner.name().to_string()
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.inner.page_count()
    }

    #[wasm_bindgen(getter, js_name = currentPage)]
    pub fn current_page(&self) -> u32 {
        self.inner.current_page()
    }

    #[wasm_bindgen(getter)]
    pub fn scale(&self) -> f64 {
        self.inner.scale()
    }

    /// Original bytes, for PDF.js to render
    #[wasm_bindgen(js_name = getDocumentBytes)]
    pub fn get_document_bytes(&self) -> js_sys::Uint8Array {
        let source = self.inner.source();
        let array = js_sys::Uint8Array::new_with_length(source.len() as u32);
        array.copy_from(source);
        array
    }

    /// Page geometry plus its current raster size
    #[wasm_bindgen(js_name = pageInfo)]
    pub fn page_info(&self, index: u32) -> Result<JsValue, JsValue> {
        let page = *self.inner.page(index).map_err(js_err)?;
        let state =
            annotate_core::RenderState::for_page(&page, self.inner.scale()).map_err(js_err)?;
        to_js(&PageReport {
            page,
            pixel_width: state.pixel_width,
            pixel_height: state.pixel_height,
        })
    }

    #[wasm_bindgen(js_name = goToPage)]
    pub fn go_to_page(&mut self, index: u32) -> Result<(), JsValue> {
        self.inner.go_to_page(index).map_err(js_err)
    }

    #[wasm_bindgen(js_name = setScale)]
    pub fn set_scale(&mut self, scale: f64) -> Result<(), JsValue> {
        self.inner.set_scale(scale).map_err(js_err)
    }

    /// Ask whether the current page needs rendering. Returns
    /// `{status: "up_to_date" | "in_flight" | "start", token, page, scale}`.
    #[wasm_bindgen(js_name = beginRender)]
    pub fn begin_render(&mut self) -> Result<JsValue, JsValue> {
        let request = self.inner.request_render().map_err(js_err)?;
        if let RenderRequest::Start(ticket) | RenderRequest::InFlight(ticket) = request {
            self.ticket = Some(ticket);
        }
        to_js(&RenderReport::from(request))
    }

    /// Report that PDF.js finished painting `token`. Returns false when the
    /// render is stale and the canvas should not be shown.
    #[wasm_bindgen(js_name = finishRender)]
    pub fn finish_render(&mut self, token: u64, width: u32, height: u32) -> bool {
        let Some(ticket) = self.ticket.filter(|t| t.token == token) else {
            return false;
        };
        // The canvas keeps the pixels
        let marker = Bitmap {
            width,
            height,
            rgba: Vec::new(),
        };
        self.inner.complete_render(ticket, marker)
    }

    #[wasm_bindgen(js_name = failRender)]
    pub fn fail_render(&mut self, token: u64) {
        if let Some(ticket) = self.ticket.filter(|t| t.token == token) {
            self.inner.abandon_render(ticket);
        }
    }

    /// Select the pointer tool; see `parse_tool` for the accepted forms
    #[wasm_bindgen(js_name = setTool)]
    pub fn set_tool(&mut self, spec: &str) -> Result<(), JsValue> {
        let tool = parse_tool(spec).map_err(|e| JsValue::from_str(&e))?;
        self.inner.set_tool(tool).map_err(js_err)
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f64, y: f64) -> Result<JsValue, JsValue> {
        self.pointer(PointerEvent::Down { x, y })
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Result<JsValue, JsValue> {
        self.pointer(PointerEvent::Move { x, y })
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, x: f64, y: f64) -> Result<JsValue, JsValue> {
        self.pointer(PointerEvent::Up { x, y })
    }

    #[wasm_bindgen(js_name = pointerLeave)]
    pub fn pointer_leave(&mut self) -> Result<JsValue, JsValue> {
        self.pointer(PointerEvent::Leave)
    }

    /// Rectangle of the gesture in progress, or null
    pub fn preview(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.preview())
    }

    /// Annotations of the current page, in paint order, as JSON
    pub fn annotations(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.annotations_on_current_page())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(getter)]
    pub fn selected(&self) -> Option<u64> {
        self.inner.store().selected().map(|id| id.0)
    }

    pub fn select(&mut self, id: Option<u64>) -> Result<(), JsValue> {
        self.inner.select(id.map(AnnotationId)).map_err(js_err)
    }

    /// New text for a text block, or new name for a form field
    #[wasm_bindgen(js_name = setText)]
    pub fn set_text(&mut self, id: u64, text: &str) -> Result<(), JsValue> {
        self.inner
            .update_annotation(AnnotationId(id), AnnotationPatch::payload(text))
            .map_err(js_err)
    }

    /// Replace the text style; `style_json` is a serialized `TextStyle`
    #[wasm_bindgen(js_name = setStyle)]
    pub fn set_style(&mut self, id: u64, style_json: &str) -> Result<(), JsValue> {
        let style: TextStyle = serde_json::from_str(style_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid style: {}", e)))?;
        let patch = AnnotationPatch {
            style: Some(style),
            ..Default::default()
        };
        self.inner
            .update_annotation(AnnotationId(id), patch)
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = setFill)]
    pub fn set_fill(&mut self, id: u64, hex: &str) -> Result<(), JsValue> {
        let fill = Color::try_from(hex.to_string()).map_err(|e| JsValue::from_str(&e))?;
        let patch = AnnotationPatch {
            fill: Some(fill),
            ..Default::default()
        };
        self.inner
            .update_annotation(AnnotationId(id), patch)
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = setChecked)]
    pub fn set_checked(&mut self, id: u64, checked: bool) -> Result<(), JsValue> {
        let patch = AnnotationPatch {
            checked: Some(checked),
            ..Default::default()
        };
        self.inner
            .update_annotation(AnnotationId(id), patch)
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = removeAnnotation)]
    pub fn remove_annotation(&mut self, id: u64) -> Result<(), JsValue> {
        self.inner
            .remove_annotation(AnnotationId(id))
            .map(|_| ())
            .map_err(js_err)
    }

    /// Delete the selected annotation; returns its id, if there was one
    #[wasm_bindgen(js_name = deleteSelected)]
    pub fn delete_selected(&mut self) -> Result<Option<u64>, JsValue> {
        self.inner
            .delete_selected()
            .map(|id| id.map(|id| id.0))
            .map_err(js_err)
    }

    /// Rotate a page clockwise by quarter turns (negative for counter-clockwise)
    #[wasm_bindgen(js_name = rotatePage)]
    pub fn rotate_page(&mut self, index: u32, quarter_turns: i32) -> Result<(), JsValue> {
        self.inner
            .rotate_page(index, quarter_turns as i64)
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = deletePage)]
    pub fn delete_page(&mut self, index: u32) -> Result<(), JsValue> {
        self.inner.delete_page(index).map_err(js_err)
    }

    /// Commit everything and return the new PDF
    pub fn export(&mut self) -> Result<js_sys::Uint8Array, JsValue> {
        let bytes = self.inner.commit(&LopdfBackend).map_err(js_err)?;
        let array = js_sys::Uint8Array::new_with_length(bytes.len() as u32);
        array.copy_from(&bytes);
        Ok(array)
    }

    #[wasm_bindgen(js_name = outputFilename)]
    pub fn output_filename(&self) -> String {
        self.inner.output_filename()
    }

    /// Whether there are edits the last export does not contain
    #[wasm_bindgen(js_name = isDirty)]
    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }

    #[wasm_bindgen(js_name = startOver)]
    pub fn start_over(&mut self) -> Result<(), JsValue> {
        self.ticket = None;
        self.inner.start_over().map_err(js_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotate_core::WidgetKind;
    use serde_json::json;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_named_tools() {
        assert_eq!(parse_tool("select").unwrap(), Tool::Select);
        assert_eq!(
            parse_tool("redact").unwrap(),
            Tool::Draw(AnnotationBody::redaction())
        );
        assert_eq!(
            parse_tool("checkbox: agree").unwrap(),
            Tool::Draw(AnnotationBody::checkbox("agree", false))
        );
        assert!(parse_tool("textfield").is_err());
        assert!(parse_tool("lasso").is_err());
    }

    #[test]
    fn test_parse_json_tool() {
        let tool = parse_tool(r#"{"type": "Field", "name": "dob", "widget": {"kind": "text"}}"#)
            .unwrap();
        let Tool::Draw(AnnotationBody::Field { name, widget, .. }) = tool else {
            panic!("expected a field tool, got {:?}", tool);
        };
        assert_eq!(name, "dob");
        assert_eq!(widget, WidgetKind::Text);
    }

    #[test]
    fn test_pointer_report_is_a_plain_object() {
        assert_eq!(
            serde_json::to_value(PointerReport::from(Outcome::Created(AnnotationId(4)))).unwrap(),
            json!({ "kind": "created", "id": 4 })
        );
        assert_eq!(
            serde_json::to_value(PointerReport::from(Outcome::Preview(PixelRect::new(
                1.0, 2.0, 3.0, 4.0
            ))))
            .unwrap(),
            json!({ "kind": "preview", "rect": { "x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0 } })
        );
        assert_eq!(
            serde_json::to_value(PointerReport::from(Outcome::Dropped)).unwrap(),
            json!({ "kind": "dropped" })
        );
    }

    #[test]
    fn test_render_report() {
        let ticket = RenderTicket {
            token: 3,
            page_index: 1,
            scale: 1.5,
        };
        assert_eq!(
            serde_json::to_value(RenderReport::from(RenderRequest::Start(ticket))).unwrap(),
            json!({ "status": "start", "token": 3, "page": 1, "scale": 1.5 })
        );
        assert_eq!(
            serde_json::to_value(RenderReport::from(RenderRequest::UpToDate)).unwrap(),
            json!({ "status": "up_to_date" })
        );
    }

    #[test]
    fn test_page_report_uses_camel_case() {
        let page = Page::new(0, annotate_core::PageGeometry::letter());
        let value = serde_json::to_value(PageReport {
            page,
            pixel_width: 918.0,
            pixel_height: 1188.0,
        })
        .unwrap();
        assert_eq!(value["pixelWidth"], json!(918.0));
        assert_eq!(value["pixelHeight"], json!(1188.0));
        assert_eq!(value["page"]["width_pt"], json!(612.0));
    }
}
