use std::io::BufWriter;
use std::mem;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::Object::{Array, Dictionary, Integer, Reference};
use lopdf::StringFormat::Literal;
use time::OffsetDateTime;

use crate::canvas::{Canvas, Color, TextStyle};
use crate::error::{ContextError, ErrorKind};
use crate::fonts::{PdfFont, FONT_RESOURCE_NAME};

/// A page of the document and the content stream operations drawn on it so far.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    operations: Vec<Operation>,
}

impl PdfPage {
    /// Converts a distance from the top edge into the bottom-up PDF coordinate.
    fn flip(&self, y: f32) -> f32 {
        self.height - y
    }

    fn content_stream(&self) -> Result<lopdf::Stream, ContextError> {
        let content = Content {
            operations: self.operations.clone(),
        };
        let encoded_content = content.encode().map_err(|error| {
            ContextError::with_error(ErrorKind::Canvas, "Failed to encode the page content", &error)
        })?;

        Ok(lopdf::Stream::new(lopdf::Dictionary::new(), encoded_content))
    }
}

/// The canvas session a report is drawn into: a high-level interface to the underlying
/// `lopdf::Document` that keeps the pages and their content until `write_all` assembles
/// the object graph.
///
/// The output only depends on what was drawn and on the identifiers and dates given to
/// `write_all`, so the same calls always produce the same bytes.
pub struct PdfDocument {
    font: PdfFont,
    /// The underlying PDF document, exposed as an escape hatch to `lopdf`.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, used for the first half of the trailer `ID`.
    pub identifier: String,
    /// Written to the `Title` entry of the document information.
    pub title: String,
    /// Written to the `Creator` and `Producer` entries of the document information.
    pub creator: String,
    pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Creates an empty PDF 1.5 document written with the built-in Helvetica font.
    pub fn new(identifier: String) -> Self {
        PdfDocument {
            font: PdfFont::Helvetica,
            inner_document: lopdf::Document::with_version("1.5"),
            identifier,
            title: String::new(),
            creator: String::new(),
            pages: Vec::new(),
        }
    }

    /// Replaces the built-in font with the TTF/OTF font found at the given path.
    pub fn with_embedded_font(mut self, font_path: &Path) -> Result<Self, ContextError> {
        self.font = PdfFont::from_path(font_path)?;
        log::debug!("Embedding the font {:?}", font_path);

        Ok(self)
    }

    /// Sets the title and creator recorded in the document information dictionary.
    pub fn with_metadata(mut self, title: impl Into<String>, creator: impl Into<String>) -> Self {
        self.title = title.into();
        self.creator = creator.into();
        self
    }

    /// The pages drawn so far, in order.
    pub fn pages(&self) -> &[PdfPage] {
        &self.pages
    }

    /// Assembles the catalog, the page tree, the fonts and the document information into
    /// the underlying document. Must be called once, after all drawing is done.
    ///
    /// # Arguments
    ///
    /// * `instance_id` - The second half of the trailer `ID`.
    /// * `creation_date` - Recorded as both the creation and the modification date.
    pub fn write_all(
        &mut self,
        instance_id: &str,
        creation_date: &OffsetDateTime,
    ) -> Result<(), ContextError> {
        if self.pages.is_empty() {
            return Err(ContextError::with_context(
                ErrorKind::Canvas,
                "Unable to write a document without pages",
            ));
        }

        let pdf_date = to_pdf_timestamp_format(creation_date);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Title", lopdf::Object::String(self.title.clone().into_bytes(), Literal)),
            ("Creator", lopdf::Object::String(self.creator.clone().into_bytes(), Literal)),
            ("Producer", lopdf::Object::String(self.creator.clone().into_bytes(), Literal)),
            ("CreationDate", lopdf::Object::String(pdf_date.clone().into_bytes(), Literal)),
            ("ModDate", lopdf::Object::String(pdf_date.into_bytes(), Literal)),
            ("Trapped", "False".into()),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        let pages_id = self.inner_document.new_object_id();
        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("PageMode", "UseNone".into()),
            ("Pages", Reference(pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        let font_dictionary = self.font.insert_into_document(&mut self.inner_document);
        let font_id = self.inner_document.add_object(Dictionary(font_dictionary));
        let resources_id = self.inner_document.add_object(lopdf::Dictionary::from_iter(vec![(
            "Font",
            Dictionary(lopdf::Dictionary::from_iter(vec![(
                FONT_RESOURCE_NAME,
                Reference(font_id),
            )])),
        )]));

        let mut page_ids = Vec::<lopdf::Object>::with_capacity(self.pages.len());
        for page in self.pages.iter() {
            let page_box: lopdf::Object =
                vec![0.into(), 0.into(), page.width.into(), page.height.into()].into();
            let content_id = self.inner_document.add_object(page.content_stream()?);
            let page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Parent", Reference(pages_id)),
                ("Rotate", Integer(0)),
                ("MediaBox", page_box.clone()),
                ("CropBox", page_box),
                ("Resources", Reference(resources_id)),
                ("Contents", Reference(content_id)),
            ]);
            page_ids.push(Reference(self.inner_document.add_object(page_dictionary)));
        }

        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(self.pages.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document.objects.insert(pages_id, Dictionary(pages));

        self.inner_document.trailer.set("Root", Reference(catalog_id));
        self.inner_document.trailer.set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                lopdf::Object::String(self.identifier.clone().into_bytes(), Literal),
                lopdf::Object::String(instance_id.as_bytes().to_vec(), Literal),
            ]),
        );
        log::debug!("Assembled a document of {} pages", self.pages.len());

        Ok(())
    }

    /// Optimize the PDF document (only superficially): unused objects are dropped and
    /// the streams are compressed.
    pub fn optimize(&mut self) {
        self.inner_document.prune_objects();
        self.inner_document.delete_zero_length_streams();
        self.inner_document.renumber_objects();
        self.inner_document.compress();
    }

    /// Serializes the assembled document, which is the body of the rendered report.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Canvas,
                "Error while saving the PDF document to bytes",
                &error,
            )
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    fn get_mut_page(&mut self, page_index: usize) -> Result<&mut PdfPage, ContextError> {
        self.pages.get_mut(page_index).ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::Canvas,
                format!("Failed to find the page with index {}", page_index),
            )
        })
    }
}

impl Canvas for PdfDocument {
    fn add_page(&mut self, width: f32, height: f32) -> Result<usize, ContextError> {
        if !(width > 0.0 && height > 0.0) {
            return Err(ContextError::with_context(
                ErrorKind::Canvas,
                format!("Invalid page size {}x{}", width, height),
            ));
        }
        self.pages.push(PdfPage {
            width,
            height,
            operations: Vec::new(),
        });

        Ok(self.pages.len() - 1)
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page_index: usize) -> Result<(f32, f32), ContextError> {
        self.pages
            .get(page_index)
            .map(|page| (page.width, page.height))
            .ok_or_else(|| {
                ContextError::with_context(
                    ErrorKind::Canvas,
                    format!("Failed to find the page with index {}", page_index),
                )
            })
    }

    fn draw_text(
        &mut self,
        page_index: usize,
        text: &str,
        position: [f32; 2],
        style: TextStyle,
    ) -> Result<(), ContextError> {
        let encoded_text = self.font.encode_text(text);
        let baseline_offset = self.font.ascent() * style.font_size;
        let page = self.get_mut_page(page_index)?;
        let [x, y] = position;
        let baseline = page.flip(y + baseline_offset);

        page.operations.extend(vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![FONT_RESOURCE_NAME.into(), style.font_size.into()],
            ),
            Operation::new("Td", vec![x.into(), baseline.into()]),
            Operation::new(
                "rg",
                style.color.components().into_iter().map(lopdf::Object::Real).collect(),
            ),
            Operation::new("Tj", vec![encoded_text]),
            Operation::new("ET", vec![]),
        ]);

        Ok(())
    }

    fn draw_line(
        &mut self,
        page_index: usize,
        from: [f32; 2],
        to: [f32; 2],
        color: Color,
        line_width: f32,
    ) -> Result<(), ContextError> {
        let page = self.get_mut_page(page_index)?;
        let [x0, y0] = from;
        let [x1, y1] = to;
        let (y0, y1) = (page.flip(y0), page.flip(y1));

        // The stroke state is scoped to the segment with q/Q
        page.operations.extend(vec![
            Operation::new("q", vec![]),
            Operation::new(
                "RG",
                color.components().into_iter().map(lopdf::Object::Real).collect(),
            ),
            Operation::new("w", vec![line_width.into()]),
            Operation::new("m", vec![x0.into(), y0.into()]),
            Operation::new("l", vec![x1.into(), y1.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }
}

/// Writes a timestamp as a PDF date string, e.g. `D:20240311090000+00'00'`.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}
