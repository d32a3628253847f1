//! Contracts with the external PDF libraries
//!
//! The engine never talks to a PDF library directly. Rendering goes through
//! [`RenderBackend`] and writing through [`MutationBackend`]; both are
//! injected by the host. [`LopdfBackend`] implements both over `lopdf`.
//!
//! Page numbers in these traits are 0-based positions in the source document.

use std::collections::{BTreeMap, HashMap, HashSet};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::annotation::{Color, WidgetKind};
use crate::error::{AnnotateError, Result};
use crate::fonts;
use crate::geometry::{PdfPoint, PdfRect, Rotation};
use crate::page::{inherited, read_page_geometry, Page, PageGeometry, RenderState};
use crate::transform::view_axes;

/// An RGBA raster, row-major, 4 bytes per pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Bitmap {
    pub fn filled(width: u32, height: u32, pixel: [u8; 4]) -> Self {
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            rgba.extend_from_slice(&pixel);
        }
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]])
    }

    fn put_pixel(&mut self, x: u32, y: u32, pixel: [u8; 4]) {
        if x < self.width && y < self.height {
            let i = (y as usize * self.width as usize + x as usize) * 4;
            self.rgba[i..i + 4].copy_from_slice(&pixel);
        }
    }
}

pub trait RenderBackend {
    type Document: RenderDocument;

    fn load(&self, bytes: &[u8]) -> Result<Self::Document>;
}

pub trait RenderDocument {
    fn page_count(&self) -> u32;

    fn page_geometry(&self, page: u32) -> Result<PageGeometry>;

    /// Rasterize `page`, as currently rotated, at `scale`
    fn rasterize(&self, page: &Page, scale: f64) -> Result<Bitmap>;
}

/// One line of text placed at a baseline origin in page space
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun<'a> {
    pub text: &'a str,
    /// Standard-14 font name
    pub font: &'static str,
    pub size: f64,
    pub color: Color,
    pub origin: PdfPoint,
    /// Rotation of the page as displayed; text runs along the view's x axis
    pub rotation: Rotation,
}

/// An interactive form field to add to a page
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec<'a> {
    pub name: &'a str,
    pub rect: PdfRect,
    pub widget: WidgetKind,
    pub font: &'static str,
    pub size: f64,
    pub color: Color,
    pub rotation: Rotation,
}

pub trait MutationBackend {
    type Document: MutableDocument;

    fn load(&self, bytes: &[u8]) -> Result<Self::Document>;
}

pub trait MutableDocument {
    fn page_count(&self) -> u32;

    /// Paint an opaque rectangle into the page content
    fn draw_rectangle(&mut self, page: u32, rect: PdfRect, fill: Color) -> Result<()>;

    fn draw_text(&mut self, page: u32, run: &TextRun<'_>) -> Result<()>;

    /// Advance width in points of `text` set in `font` at `size`
    fn measure_text(&self, text: &str, font: &str, size: f64) -> Result<f64>;

    fn create_form_field(&mut self, page: u32, field: &FieldSpec<'_>) -> Result<()>;

    fn set_rotation(&mut self, page: u32, rotation: Rotation) -> Result<()>;

    fn delete_pages(&mut self, pages: &[u32]) -> Result<()>;

    fn save(&mut self) -> Result<Vec<u8>>;
}

/// Both library contracts over `lopdf`.
///
/// Rasterization produces a blank page-sized raster with a thin border; real
/// page pixels come from the host's renderer through the render ticket API.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

impl RenderBackend for LopdfBackend {
    type Document = LopdfDocument;

    fn load(&self, bytes: &[u8]) -> Result<LopdfDocument> {
        LopdfDocument::from_bytes(bytes)
    }
}

impl MutationBackend for LopdfBackend {
    type Document = LopdfDocument;

    fn load(&self, bytes: &[u8]) -> Result<LopdfDocument> {
        LopdfDocument::from_bytes(bytes)
    }
}

const PAGE_BACKGROUND: [u8; 4] = [255, 255, 255, 255];
const PAGE_BORDER: [u8; 4] = [220, 220, 220, 255];

pub struct LopdfDocument {
    doc: Document,
    /// Page object ids by source position
    page_ids: Vec<ObjectId>,
    geometry: Vec<PageGeometry>,
    deleted: HashSet<u32>,
    /// Drawing operations per page, written out on save
    pending: BTreeMap<ObjectId, Vec<Operation>>,
    font_objects: HashMap<&'static str, ObjectId>,
    /// Resource name of each font already registered on a page
    page_fonts: HashMap<(ObjectId, &'static str), String>,
    field_names: HashSet<String>,
}

impl LopdfDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes).map_err(|e| AnnotateError::Load(e.to_string()))?;
        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(AnnotateError::Load(
                "encrypted PDFs are not supported".to_string(),
            ));
        }

        let geometry = read_page_geometry(&doc)?;
        let page_ids = doc.get_pages().into_values().collect();
        let field_names = existing_field_names(&doc);
        tracing::debug!(pages = geometry.len(), bytes = bytes.len(), "parsed document");

        Ok(Self {
            doc,
            page_ids,
            geometry,
            deleted: HashSet::new(),
            pending: BTreeMap::new(),
            font_objects: HashMap::new(),
            page_fonts: HashMap::new(),
            field_names,
        })
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        if self.deleted.contains(&page) {
            return Err(AnnotateError::Commit(format!("page {} was deleted", page)));
        }
        self.page_ids
            .get(page as usize)
            .copied()
            .ok_or(AnnotateError::PageOutOfRange {
                page,
                page_count: self.page_ids.len() as u32,
            })
    }

    fn push_ops(&mut self, page_id: ObjectId, ops: Vec<Operation>) {
        self.pending.entry(page_id).or_default().extend(ops);
    }

    /// Shared font object for a standard font, created on first use
    fn font_object(&mut self, base_font: &'static str) -> ObjectId {
        if let Some(id) = self.font_objects.get(base_font) {
            return *id;
        }
        let mut font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base_font,
        };
        if !matches!(base_font, "Symbol" | "ZapfDingbats") {
            font.set("Encoding", "WinAnsiEncoding");
        }
        let id = self.doc.add_object(font);
        self.font_objects.insert(base_font, id);
        id
    }

    /// Register `base_font` in the page's resources and return its resource name
    fn ensure_font(&mut self, page_id: ObjectId, base_font: &'static str) -> Result<String> {
        if let Some(name) = self.page_fonts.get(&(page_id, base_font)) {
            return Ok(name.clone());
        }
        let font_id = self.font_object(base_font);

        let mut fonts = self.page_font_dict(page_id);
        let mut n = 1;
        let name = loop {
            let candidate = format!("FAnn{}", n);
            if fonts.get(candidate.as_bytes()).is_err() {
                break candidate;
            }
            n += 1;
        };
        fonts.set(name.clone(), Object::Reference(font_id));
        self.page_resources_mut(page_id)?
            .set("Font", Object::Dictionary(fonts));

        self.page_fonts.insert((page_id, base_font), name.clone());
        Ok(name)
    }

    /// Copy of the page's font resource dictionary, following references and inheritance
    fn page_font_dict(&self, page_id: ObjectId) -> Dictionary {
        let Ok(page) = self.doc.get_dictionary(page_id) else {
            return Dictionary::new();
        };
        inherited(&self.doc, page, b"Resources")
            .and_then(|obj| resolve_dict(&self.doc, obj))
            .and_then(|resources| resources.get(b"Font").ok())
            .and_then(|obj| resolve_dict(&self.doc, obj))
            .cloned()
            .unwrap_or_default()
    }

    /// The page's own resource dictionary. Inherited resources are copied
    /// onto the page first so that changes stay local to it.
    fn page_resources_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary> {
        enum Location {
            Indirect(ObjectId),
            Direct,
            Missing(Dictionary),
        }

        let location = {
            let page = self.doc.get_dictionary(page_id).map_err(commit_error)?;
            match page.get(b"Resources") {
                Ok(Object::Reference(id)) => Location::Indirect(*id),
                Ok(Object::Dictionary(_)) => Location::Direct,
                _ => Location::Missing(
                    inherited(&self.doc, page, b"Resources")
                        .and_then(|obj| resolve_dict(&self.doc, obj))
                        .cloned()
                        .unwrap_or_default(),
                ),
            }
        };

        match location {
            Location::Indirect(id) => self
                .doc
                .get_object_mut(id)
                .and_then(|obj| obj.as_dict_mut())
                .map_err(commit_error),
            Location::Direct | Location::Missing(_) => {
                let page = self
                    .doc
                    .get_object_mut(page_id)
                    .and_then(|obj| obj.as_dict_mut())
                    .map_err(commit_error)?;
                if let Location::Missing(resources) = location {
                    page.set("Resources", Object::Dictionary(resources));
                }
                page.get_mut(b"Resources")
                    .and_then(|obj| obj.as_dict_mut())
                    .map_err(commit_error)
            }
        }
    }

    /// Wrap the existing content in q/Q and append the pending operations,
    /// so the original graphics state cannot leak into the new drawing.
    fn flush_pending(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        for (page_id, operations) in pending {
            let bytes = Content { operations }.encode().map_err(commit_error)?;

            let open = self
                .doc
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            let close = self
                .doc
                .add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
            let added = self.doc.add_object(Stream::new(Dictionary::new(), bytes));

            let mut contents = vec![Object::Reference(open)];
            contents.extend(self.existing_contents(page_id)?);
            contents.push(Object::Reference(close));
            contents.push(Object::Reference(added));

            let page = self
                .doc
                .get_object_mut(page_id)
                .and_then(|obj| obj.as_dict_mut())
                .map_err(commit_error)?;
            page.set("Contents", Object::Array(contents));
        }
        Ok(())
    }

    fn existing_contents(&self, page_id: ObjectId) -> Result<Vec<Object>> {
        let page = self.doc.get_dictionary(page_id).map_err(commit_error)?;
        Ok(match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(streams)) => streams.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(streams)) => streams.clone(),
            _ => Vec::new(),
        })
    }

    fn add_to_acroform(&mut self, widget_id: ObjectId, font: &'static str) -> Result<()> {
        let existing = self
            .doc
            .catalog()
            .map_err(commit_error)?
            .get(b"AcroForm")
            .ok()
            .cloned();

        let acroform_id = match existing {
            Some(Object::Reference(id)) => id,
            other => {
                let acroform = match other {
                    Some(Object::Dictionary(dict)) => dict,
                    _ => dictionary! { "Fields" => Vec::<Object>::new() },
                };
                let id = self.doc.add_object(acroform);
                self.doc
                    .catalog_mut()
                    .map_err(commit_error)?
                    .set("AcroForm", Object::Reference(id));
                id
            }
        };

        // Resolve everything that may be indirect before taking the mutable borrow
        let (mut fields, mut resources, mut fonts) = {
            let acroform = self.doc.get_dictionary(acroform_id).map_err(commit_error)?;
            let fields = acroform
                .get(b"Fields")
                .ok()
                .and_then(|obj| resolve_array(&self.doc, obj))
                .cloned()
                .unwrap_or_default();
            let resources = acroform
                .get(b"DR")
                .ok()
                .and_then(|obj| resolve_dict(&self.doc, obj))
                .cloned()
                .unwrap_or_default();
            let fonts = resources
                .get(b"Font")
                .ok()
                .and_then(|obj| resolve_dict(&self.doc, obj))
                .cloned()
                .unwrap_or_default();
            (fields, resources, fonts)
        };

        fields.push(Object::Reference(widget_id));
        for base_font in [font, "Helvetica"] {
            if fonts.get(base_font.as_bytes()).is_err() {
                let id = self.font_object(base_font);
                fonts.set(base_font, Object::Reference(id));
            }
        }
        resources.set("Font", Object::Dictionary(fonts));

        let acroform = self
            .doc
            .get_object_mut(acroform_id)
            .and_then(|obj| obj.as_dict_mut())
            .map_err(commit_error)?;
        acroform.set("Fields", Object::Array(fields));
        acroform.set("DR", Object::Dictionary(resources));
        // Viewers regenerate widget appearances from DA
        acroform.set("NeedAppearances", true);
        if acroform.get(b"DA").is_err() {
            acroform.set("DA", Object::string_literal("/Helvetica 0 Tf 0 g"));
        }
        Ok(())
    }

    fn add_to_page_annots(&mut self, page_id: ObjectId, annot_id: ObjectId) -> Result<()> {
        let annots_ref = {
            let page = self.doc.get_dictionary(page_id).map_err(commit_error)?;
            page.get(b"Annots").ok().and_then(|obj| obj.as_reference().ok())
        };
        if let Some(annots_id) = annots_ref {
            if let Ok(Object::Array(annots)) = self.doc.get_object_mut(annots_id) {
                annots.push(Object::Reference(annot_id));
                return Ok(());
            }
        }

        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(|obj| obj.as_dict_mut())
            .map_err(commit_error)?;
        if let Ok(Object::Array(ref mut annots)) = page.get_mut(b"Annots") {
            annots.push(Object::Reference(annot_id));
        } else {
            page.set("Annots", Object::Array(vec![Object::Reference(annot_id)]));
        }
        Ok(())
    }

    fn checkbox_appearance(&mut self, rect: PdfRect, color: Color) -> Dictionary {
        let zapf = self.font_object("ZapfDingbats");
        let size = (rect.height.min(rect.width) * 0.8).max(1.0);
        // ZapfDingbats "4" is a check mark about 0.85 em wide
        let x = (rect.width - size * 0.846) / 2.0;
        let y = (rect.height - size * 0.7) / 2.0;

        let on = format!(
            "q {} {} {} rg BT /ZaDb {:.2} Tf {:.2} {:.2} Td (4) Tj ET Q",
            color.r, color.g, color.b, size, x, y
        );
        let bbox = vec![
            Object::Integer(0),
            Object::Integer(0),
            real(rect.width),
            real(rect.height),
        ];

        let on_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => bbox.clone(),
                "Resources" => dictionary! {
                    "Font" => dictionary! { "ZaDb" => Object::Reference(zapf) },
                },
            },
            on.into_bytes(),
        ));
        let off_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => bbox,
            },
            Vec::new(),
        ));

        dictionary! {
            "N" => dictionary! {
                "Yes" => Object::Reference(on_id),
                "Off" => Object::Reference(off_id),
            },
        }
    }
}

impl RenderDocument for LopdfDocument {
    fn page_count(&self) -> u32 {
        self.geometry.len() as u32
    }

    fn page_geometry(&self, page: u32) -> Result<PageGeometry> {
        self.geometry
            .get(page as usize)
            .copied()
            .ok_or(AnnotateError::PageOutOfRange {
                page,
                page_count: self.geometry.len() as u32,
            })
    }

    fn rasterize(&self, page: &Page, scale: f64) -> Result<Bitmap> {
        self.page_geometry(page.source_index)?;
        let (width, height) = RenderState::for_page(page, scale)?.raster_size();

        let mut bitmap = Bitmap::filled(width, height, PAGE_BACKGROUND);
        if width >= 4 && height >= 4 {
            for x in 0..width {
                bitmap.put_pixel(x, 0, PAGE_BORDER);
                bitmap.put_pixel(x, height - 1, PAGE_BORDER);
            }
            for y in 0..height {
                bitmap.put_pixel(0, y, PAGE_BORDER);
                bitmap.put_pixel(width - 1, y, PAGE_BORDER);
            }
        }
        Ok(bitmap)
    }
}

impl MutableDocument for LopdfDocument {
    fn page_count(&self) -> u32 {
        (self.page_ids.len() - self.deleted.len()) as u32
    }

    fn draw_rectangle(&mut self, page: u32, rect: PdfRect, fill: Color) -> Result<()> {
        let page_id = self.page_id(page)?;
        self.push_ops(
            page_id,
            vec![
                Operation::new("q", vec![]),
                Operation::new("rg", color_operands(fill)),
                Operation::new(
                    "re",
                    vec![real(rect.x), real(rect.y), real(rect.width), real(rect.height)],
                ),
                Operation::new("f", vec![]),
                Operation::new("Q", vec![]),
            ],
        );
        Ok(())
    }

    fn draw_text(&mut self, page: u32, run: &TextRun<'_>) -> Result<()> {
        let page_id = self.page_id(page)?;
        let encoded = fonts::encode_win_ansi(run.text).map_err(|ch| unencodable(ch, run.font))?;
        let resource = self.ensure_font(page_id, run.font)?;

        let ((rx, ry), (dx, dy)) = view_axes(run.rotation);
        // Glyphs stand on the view's upward axis
        let (ux, uy) = (-dx, -dy);

        self.push_ops(
            page_id,
            vec![
                Operation::new("q", vec![]),
                Operation::new("BT", vec![]),
                Operation::new("rg", color_operands(run.color)),
                Operation::new(
                    "Tf",
                    vec![Object::Name(resource.into_bytes()), real(run.size)],
                ),
                Operation::new(
                    "Tm",
                    vec![
                        real(rx),
                        real(ry),
                        real(ux),
                        real(uy),
                        real(run.origin.x),
                        real(run.origin.y),
                    ],
                ),
                Operation::new("Tj", vec![Object::String(encoded, StringFormat::Literal)]),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        );
        Ok(())
    }

    fn measure_text(&self, text: &str, font: &str, size: f64) -> Result<f64> {
        let encoded = fonts::encode_win_ansi(text).map_err(|ch| unencodable(ch, font))?;
        Ok(fonts::metrics(font).encoded_width(&encoded, size))
    }

    fn create_form_field(&mut self, page: u32, field: &FieldSpec<'_>) -> Result<()> {
        let page_id = self.page_id(page)?;
        if field.name.trim().is_empty() {
            return Err(AnnotateError::Commit(
                "form field name must not be empty".to_string(),
            ));
        }
        if !self.field_names.insert(field.name.to_string()) {
            return Err(AnnotateError::Commit(format!(
                "duplicate form field name {:?}",
                field.name
            )));
        }

        let rect = field.rect;
        let mut widget = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => vec![real(rect.x), real(rect.y), real(rect.right()), real(rect.top())],
            "F" => 4i64,
            "P" => Object::Reference(page_id),
            "T" => Object::String(encode_text_string(field.name), StringFormat::Literal),
        };
        let mut appearance_characteristics = dictionary! {
            "R" => field.rotation.degrees(),
        };

        match field.widget {
            WidgetKind::Text => {
                widget.set("FT", "Tx");
                widget.set("V", Object::string_literal(""));
                widget.set(
                    "DA",
                    Object::string_literal(format!(
                        "/{} {} Tf {} {} {} rg",
                        field.font, field.size, field.color.r, field.color.g, field.color.b
                    )),
                );
            }
            WidgetKind::Checkbox { checked } => {
                let state = if checked { "Yes" } else { "Off" };
                widget.set("FT", "Btn");
                widget.set("V", state);
                widget.set("AS", state);
                widget.set(
                    "DA",
                    Object::string_literal(format!(
                        "/ZapfDingbats 0 Tf {} {} {} rg",
                        field.color.r, field.color.g, field.color.b
                    )),
                );
                appearance_characteristics.set("CA", Object::string_literal("4"));
                let appearance = self.checkbox_appearance(rect, field.color);
                widget.set("AP", appearance);
            }
        }
        widget.set("MK", appearance_characteristics);

        let widget_id = self.doc.add_object(widget);
        let font = match field.widget {
            WidgetKind::Text => field.font,
            WidgetKind::Checkbox { .. } => "ZapfDingbats",
        };
        self.add_to_acroform(widget_id, font)?;
        self.add_to_page_annots(page_id, widget_id)
    }

    fn set_rotation(&mut self, page: u32, rotation: Rotation) -> Result<()> {
        let page_id = self.page_id(page)?;
        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(|obj| obj.as_dict_mut())
            .map_err(commit_error)?;
        page.set("Rotate", rotation.degrees());
        Ok(())
    }

    fn delete_pages(&mut self, pages: &[u32]) -> Result<()> {
        if pages.is_empty() {
            return Ok(());
        }
        let current = self.doc.get_pages();
        let mut numbers = Vec::with_capacity(pages.len());
        let mut ids = Vec::with_capacity(pages.len());
        for page in pages {
            let id = self.page_id(*page)?;
            let number = current
                .iter()
                .find(|(_, page_id)| **page_id == id)
                .map(|(number, _)| *number)
                .ok_or_else(|| AnnotateError::Commit(format!("page {} is not in the page tree", page)))?;
            numbers.push(number);
            ids.push(id);
        }
        numbers.sort_unstable();
        numbers.dedup();
        if numbers.len() >= current.len() {
            return Err(AnnotateError::Commit(
                "cannot delete every page of a document".to_string(),
            ));
        }

        self.doc.delete_pages(&numbers);
        for (page, id) in pages.iter().zip(ids) {
            self.deleted.insert(*page);
            self.pending.remove(&id);
        }
        Ok(())
    }

    fn save(&mut self) -> Result<Vec<u8>> {
        self.flush_pending()?;
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| AnnotateError::Commit(format!("Save failed: {}", e)))?;
        Ok(buffer)
    }
}

fn commit_error(e: lopdf::Error) -> AnnotateError {
    AnnotateError::Commit(e.to_string())
}

fn unencodable(ch: char, font: &str) -> AnnotateError {
    AnnotateError::Commit(format!(
        "character {:?} (U+{:04X}) cannot be set in {}",
        ch, ch as u32, font
    ))
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn color_operands(color: Color) -> Vec<Object> {
    vec![
        Object::Real(color.r),
        Object::Real(color.g),
        Object::Real(color.b),
    ]
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn resolve_array<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Vec<Object>> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok(),
        Object::Array(array) => Some(array),
        _ => None,
    }
}

/// PDF text string: plain bytes for ASCII, UTF-16BE with a byte order mark otherwise
fn encode_text_string(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        return text.as_bytes().to_vec();
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|b| *b as char).collect()
}

fn existing_field_names(doc: &Document) -> HashSet<String> {
    let fields = doc
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"AcroForm").ok())
        .and_then(|obj| resolve_dict(doc, obj))
        .and_then(|acroform| acroform.get(b"Fields").ok())
        .and_then(|obj| resolve_array(doc, obj));

    let mut names = HashSet::new();
    for field in fields.into_iter().flatten() {
        if let Some(Object::String(name, _)) =
            resolve_dict(doc, field).and_then(|dict| dict.get(b"T").ok())
        {
            names.insert(decode_text_string(name));
        }
    }
    names
}
