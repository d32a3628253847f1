//! Annotation model
//!
//! An annotation is a rectangle on a rendered page plus a body describing
//! what it becomes when committed: an opaque box, a block of text, or an
//! interactive form field.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{PdfRect, PixelRect};

/// Opaque annotation identity. Ids are handed out monotonically and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub u64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    Rectangle,
    TextBlock,
    FormField,
}

/// RGB colour with components in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// Parse `#rrggbb` (leading `#` optional). Anything unparseable is black.
    pub fn from_hex(color: &str) -> Self {
        Self::parse_hex(color).unwrap_or(Color::BLACK)
    }

    fn parse_hex(color: &str) -> Option<Self> {
        let hex = color.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Color {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse_hex(&value).ok_or_else(|| format!("invalid colour {:?}", value))
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_hex()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    #[serde(default)]
    pub color: Color,
    /// Font family as the host knows it. Mapped to a PDF standard font.
    #[serde(default)]
    pub font_name: Option<String>,
    #[serde(default)]
    pub is_italic: bool,
    #[serde(default)]
    pub is_bold: bool,
    #[serde(default)]
    pub alignment: Alignment,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            color: Color::BLACK,
            font_name: None,
            is_italic: false,
            is_bold: false,
            alignment: Alignment::Left,
        }
    }
}

impl TextStyle {
    /// Map the host font name plus bold/italic flags to one of the standard 14 fonts.
    ///
    /// Browser-side names look like "serif", "BCDEEE+ArialMT" or "g_d0_f1";
    /// anything unrecognised falls back to Helvetica.
    pub fn pdf_font_name(&self) -> &'static str {
        let family = self
            .font_name
            .as_deref()
            .map(font_family)
            .unwrap_or(FontFamily::Helvetica);

        let lower = self.font_name.as_deref().unwrap_or("").to_lowercase();
        let bold = self.is_bold || lower.contains("bold");
        let italic = self.is_italic || lower.contains("italic") || lower.contains("oblique");

        match family {
            FontFamily::Times => match (bold, italic) {
                (true, true) => "Times-BoldItalic",
                (true, false) => "Times-Bold",
                (false, true) => "Times-Italic",
                (false, false) => "Times-Roman",
            },
            FontFamily::Helvetica => match (bold, italic) {
                (true, true) => "Helvetica-BoldOblique",
                (true, false) => "Helvetica-Bold",
                (false, true) => "Helvetica-Oblique",
                (false, false) => "Helvetica",
            },
            FontFamily::Courier => match (bold, italic) {
                (true, true) => "Courier-BoldOblique",
                (true, false) => "Courier-Bold",
                (false, true) => "Courier-Oblique",
                (false, false) => "Courier",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FontFamily {
    Times,
    Helvetica,
    Courier,
}

fn font_family(name: &str) -> FontFamily {
    let lower = name.to_lowercase();

    // CSS generic families
    match lower.as_str() {
        "serif" => return FontFamily::Times,
        "sans-serif" | "cursive" | "fantasy" => return FontFamily::Helvetica,
        "monospace" => return FontFamily::Courier,
        _ => {}
    }

    if lower.contains("times") || lower.contains("georgia") || lower.contains("garamond") {
        return FontFamily::Times;
    }

    if lower.contains("courier")
        || lower.contains("mono")
        || lower.contains("consolas")
        || lower.contains("monaco")
    {
        return FontFamily::Courier;
    }

    FontFamily::Helvetica
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WidgetKind {
    Text,
    Checkbox { checked: bool },
}

/// What an annotation becomes when committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnnotationBody {
    /// Opaque filled box. Black for redaction, white for white-out.
    Rectangle { fill: Color },
    /// A block of text. `cover` is the page-space box of original text to paint over.
    Text {
        text: String,
        #[serde(default)]
        style: TextStyle,
        #[serde(default)]
        cover: Option<PdfRect>,
        #[serde(default = "default_cover_color")]
        cover_color: Color,
    },
    /// An interactive AcroForm field named `name`
    Field {
        name: String,
        widget: WidgetKind,
        #[serde(default)]
        style: TextStyle,
    },
}

fn default_cover_color() -> Color {
    Color::WHITE
}

impl AnnotationBody {
    pub fn redaction() -> Self {
        AnnotationBody::Rectangle { fill: Color::BLACK }
    }

    pub fn white_out() -> Self {
        AnnotationBody::Rectangle { fill: Color::WHITE }
    }

    pub fn text(text: impl Into<String>) -> Self {
        AnnotationBody::Text {
            text: text.into(),
            style: TextStyle::default(),
            cover: None,
            cover_color: Color::WHITE,
        }
    }

    pub fn text_field(name: impl Into<String>) -> Self {
        AnnotationBody::Field {
            name: name.into(),
            widget: WidgetKind::Text,
            style: TextStyle::default(),
        }
    }

    pub fn checkbox(name: impl Into<String>, checked: bool) -> Self {
        AnnotationBody::Field {
            name: name.into(),
            widget: WidgetKind::Checkbox { checked },
            style: TextStyle::default(),
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationBody::Rectangle { .. } => AnnotationKind::Rectangle,
            AnnotationBody::Text { .. } => AnnotationKind::TextBlock,
            AnnotationBody::Field { .. } => AnnotationKind::FormField,
        }
    }

    /// Text content or field name
    pub fn payload(&self) -> Option<&str> {
        match self {
            AnnotationBody::Rectangle { .. } => None,
            AnnotationBody::Text { text, .. } => Some(text),
            AnnotationBody::Field { name, .. } => Some(name),
        }
    }

    pub fn style(&self) -> Option<&TextStyle> {
        match self {
            AnnotationBody::Rectangle { .. } => None,
            AnnotationBody::Text { style, .. } | AnnotationBody::Field { style, .. } => Some(style),
        }
    }

    /// Apply the payload/style parts of a patch. Returns whether anything changed.
    pub(crate) fn apply(&mut self, patch: &AnnotationPatch) -> bool {
        let mut changed = false;
        match self {
            AnnotationBody::Rectangle { fill } => {
                if let Some(color) = patch.fill {
                    changed |= *fill != color;
                    *fill = color;
                }
            }
            AnnotationBody::Text { text, style, .. } => {
                if let Some(payload) = &patch.payload {
                    changed |= text != payload;
                    *text = payload.clone();
                }
                if let Some(new_style) = &patch.style {
                    changed |= style != new_style;
                    *style = new_style.clone();
                }
            }
            AnnotationBody::Field {
                name,
                widget,
                style,
            } => {
                if let Some(payload) = &patch.payload {
                    changed |= name != payload;
                    *name = payload.clone();
                }
                if let Some(new_style) = &patch.style {
                    changed |= style != new_style;
                    *style = new_style.clone();
                }
                if let (WidgetKind::Checkbox { checked }, Some(value)) = (widget, patch.checked) {
                    changed |= *checked != value;
                    *checked = value;
                }
            }
        }
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub page_index: u32,
    /// Bounds on the raster the annotation was drawn on
    pub bounds: PixelRect,
    pub body: AnnotationBody,
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        self.body.kind()
    }
}

/// Partial update of an annotation. `None` fields are left alone; fields that
/// do not apply to the annotation's kind are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPatch {
    #[serde(default)]
    pub bounds: Option<PixelRect>,
    /// New text (TextBlock) or field name (FormField)
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub style: Option<TextStyle>,
    #[serde(default)]
    pub fill: Option<Color>,
    #[serde(default)]
    pub checked: Option<bool>,
}

impl AnnotationPatch {
    pub fn bounds(bounds: PixelRect) -> Self {
        Self {
            bounds: Some(bounds),
            ..Default::default()
        }
    }

    pub fn payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn style(font: &str, bold: bool, italic: bool) -> TextStyle {
        TextStyle {
            font_name: Some(font.to_string()),
            is_bold: bold,
            is_italic: italic,
            ..Default::default()
        }
    }

    #[test]
    fn test_font_mapping_generic_families() {
        assert_eq!(style("serif", false, false).pdf_font_name(), "Times-Roman");
        assert_eq!(style("sans-serif", false, false).pdf_font_name(), "Helvetica");
        assert_eq!(style("monospace", false, false).pdf_font_name(), "Courier");
        assert_eq!(style("cursive", false, false).pdf_font_name(), "Helvetica");
    }

    #[test]
    fn test_font_mapping_embedded_names() {
        assert_eq!(style("BCDEEE+TimesNewRomanPSMT", false, false).pdf_font_name(), "Times-Roman");
        assert_eq!(style("BCDEEE+ArialMT", false, false).pdf_font_name(), "Helvetica");
        assert_eq!(style("Arial-BoldMT", false, false).pdf_font_name(), "Helvetica-Bold");
        assert_eq!(style("Consolas", false, false).pdf_font_name(), "Courier");
        assert_eq!(style("g_d0_f1", false, false).pdf_font_name(), "Helvetica");
    }

    #[test]
    fn test_font_mapping_flags() {
        assert_eq!(style("serif", true, true).pdf_font_name(), "Times-BoldItalic");
        assert_eq!(style("serif", false, true).pdf_font_name(), "Times-Italic");
        assert_eq!(style("sans-serif", false, true).pdf_font_name(), "Helvetica-Oblique");
        assert_eq!(style("monospace", true, false).pdf_font_name(), "Courier-Bold");
        assert_eq!(TextStyle::default().pdf_font_name(), "Helvetica");
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::from_hex("#ffffff"), Color::WHITE);
        assert_eq!(Color::from_hex("000000"), Color::BLACK);
        assert_eq!(Color::from_hex("nonsense"), Color::BLACK);
        assert_eq!(Color::from_hex("#FF8000").to_hex(), "#ff8000");
    }

    #[test]
    fn test_color_serde_rejects_garbage() {
        assert!(serde_json::from_str::<Color>("\"#12345\"").is_err());
        let color: Color = serde_json::from_str("\"#00ff00\"").unwrap();
        assert_eq!(color, Color { r: 0.0, g: 1.0, b: 0.0 });
    }

    #[test]
    fn test_body_kind_and_payload() {
        assert_eq!(AnnotationBody::redaction().kind(), AnnotationKind::Rectangle);
        assert_eq!(AnnotationBody::text("hi").kind(), AnnotationKind::TextBlock);
        assert_eq!(AnnotationBody::checkbox("agree", true).kind(), AnnotationKind::FormField);
        assert_eq!(AnnotationBody::text_field("name").payload(), Some("name"));
        assert_eq!(AnnotationBody::white_out().payload(), None);
    }

    #[test]
    fn test_body_json_shape() {
        let json = r##"{"type":"Field","name":"agree","widget":{"kind":"checkbox","checked":true}}"##;
        let body: AnnotationBody = serde_json::from_str(json).unwrap();
        assert_eq!(body, AnnotationBody::checkbox("agree", true));

        let json = r##"{"type":"Text","text":"Orlando"}"##;
        let body: AnnotationBody = serde_json::from_str(json).unwrap();
        assert_eq!(body, AnnotationBody::text("Orlando"));
    }

    #[test]
    fn test_patch_ignores_inapplicable_fields() {
        let mut body = AnnotationBody::redaction();
        assert!(!body.apply(&AnnotationPatch::payload("ignored")));
        assert_eq!(body, AnnotationBody::redaction());

        let mut body = AnnotationBody::checkbox("a", false);
        let patch = AnnotationPatch {
            checked: Some(true),
            ..Default::default()
        };
        assert!(body.apply(&patch));
        assert_eq!(body, AnnotationBody::checkbox("a", true));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(AnnotationId(7).to_string(), "#7");
    }
}
