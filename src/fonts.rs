use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use lopdf::Object::{self, Array, Dictionary, Integer, Name, Reference};
use lopdf::StringFormat;
use owned_ttf_parser::{AsFaceRef as _, Face, OwnedFace};
use unicode_normalization::UnicodeNormalization as _;

use crate::error::{ContextError, ErrorKind};

/// Name under which the report font is registered in every page's resources.
pub(crate) const FONT_RESOURCE_NAME: &str = "F0";

/// Ascent of Helvetica as a fraction of the em, from its AFM metrics (718/1000).
const HELVETICA_ASCENT: f32 = 0.718;

/// The font all the text of a document is written with.
#[derive(Debug, Clone)]
pub enum PdfFont {
    /// Helvetica, one of the standard fonts every PDF reader provides, so nothing is embedded.
    /// Text is encoded with `WinAnsiEncoding`.
    Helvetica,
    /// A TrueType font embedded in the document as a CID font, addressed by glyph IDs.
    Embedded(EmbeddedFont),
}

impl PdfFont {
    /// Loads a TTF (or TTF-flavoured OTF) font file to be embedded.
    pub fn from_path(font_path: &Path) -> Result<Self, ContextError> {
        let font_bytes = std::fs::read(font_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Font,
                format!("Failed to read the font {:?}", font_path),
                &error,
            )
        })?;

        Ok(PdfFont::Embedded(EmbeddedFont::from_bytes(font_bytes)?))
    }

    /// Distance from the top of a line of text to its baseline, as a fraction of the font size.
    pub fn ascent(&self) -> f32 {
        match self {
            PdfFont::Helvetica => HELVETICA_ASCENT,
            PdfFont::Embedded(font) => font.face.ascent(),
        }
    }

    /// Converts the text into the string operand of a `Tj` operator for this font.
    /// Characters the font cannot show are logged, then replaced or dropped.
    pub fn encode_text(&self, text: &str) -> Object {
        match self {
            PdfFont::Helvetica => {
                let bytes = text
                    .nfc()
                    .map(|character| {
                        win_ansi_byte(character).unwrap_or_else(|| {
                            log::warn!(
                                "Unable to encode the character {:?} with Helvetica, replacing it",
                                character
                            );
                            b'?'
                        })
                    })
                    .collect();
                Object::String(bytes, StringFormat::Literal)
            }
            PdfFont::Embedded(font) => {
                let glyph_id_bytes = text
                    .nfc()
                    .filter_map(|character| {
                        let glyph_id = font.face.glyph_id(character);
                        if glyph_id.is_none() {
                            log::warn!("Unable to find the character {:?} in the font", character);
                        }
                        glyph_id
                    })
                    .flat_map(|glyph_id| glyph_id.to_be_bytes())
                    .collect();
                Object::String(glyph_id_bytes, StringFormat::Hexadecimal)
            }
        }
    }

    /// Builds the font dictionary, adding the objects it refers to into the document.
    pub(crate) fn insert_into_document(&self, inner_document: &mut lopdf::Document) -> lopdf::Dictionary {
        match self {
            PdfFont::Helvetica => lopdf::Dictionary::from_iter(vec![
                ("Type", Name(b"Font".to_vec())),
                ("Subtype", Name(b"Type1".to_vec())),
                ("BaseFont", Name(b"Helvetica".to_vec())),
                ("Encoding", Name(b"WinAnsiEncoding".to_vec())),
            ]),
            PdfFont::Embedded(font) => font.insert_into_document(inner_document),
        }
    }
}

/// Maps a character to its code in `WinAnsiEncoding` (Windows-1252), if it has one.
fn win_ansi_byte(character: char) -> Option<u8> {
    let byte = match character {
        ' '..='~' | '\u{A0}'..='\u{FF}' => character as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };

    Some(byte)
}

/// A parsed TrueType face together with its measure of units per em.
#[derive(Clone, Debug)]
struct TtfFontFace {
    inner: Arc<OwnedFace>,
    units_per_em: u16,
}

impl TtfFontFace {
    fn from_bytes(data: Vec<u8>) -> Result<Self, ContextError> {
        let face = OwnedFace::from_vec(data, 0).map_err(|error| {
            ContextError::with_error(ErrorKind::Font, "Failed to parse the font", &error)
        })?;
        let units_per_em = face.as_face_ref().units_per_em();

        Ok(Self {
            inner: Arc::new(face),
            units_per_em,
        })
    }

    fn face(&self) -> &Face<'_> {
        self.inner.as_face_ref()
    }

    fn ascent(&self) -> f32 {
        f32::from(self.face().ascender()) / f32::from(self.units_per_em)
    }

    fn glyph_id(&self, character: char) -> Option<u16> {
        self.face().glyph_index(character).map(|glyph_id| glyph_id.0)
    }

    /// The first character of the unicode subtables mapped to each (non-zero) glyph ID.
    fn glyph_characters(&self) -> HashMap<u16, char> {
        let mut glyph_characters = HashMap::with_capacity(self.face().number_of_glyphs().into());
        let Some(cmap) = self.face().tables().cmap else {
            return glyph_characters;
        };

        for subtable in cmap.subtables.into_iter().filter(|subtable| subtable.is_unicode()) {
            subtable.codepoints(|codepoint| {
                let Ok(character) = char::try_from(codepoint) else {
                    return;
                };
                if let Some(glyph_index) = subtable.glyph_index(codepoint).filter(|index| index.0 > 0) {
                    glyph_characters.entry(glyph_index.0).or_insert(character);
                }
            });
        }

        glyph_characters
    }

    /// Horizontal advance of a glyph in font units.
    fn glyph_width(&self, glyph_id: u16) -> Option<u32> {
        self.face()
            .glyph_hor_advance(owned_ttf_parser::GlyphId(glyph_id))
            .map(u32::from)
    }

    /// Converts a distance in font units to the 1000 unit em of PDF glyph space.
    fn to_glyph_space(&self, units: i32) -> i64 {
        (units as f32 * 1000.0 / f32::from(self.units_per_em)).round() as i64
    }
}

/// A TrueType font ready to be embedded, keeping the raw bytes for the `FontFile2` stream.
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    bytes: Arc<Vec<u8>>,
    face: TtfFontFace,
}

impl EmbeddedFont {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ContextError> {
        let face = TtfFontFace::from_bytes(bytes.clone())?;

        Ok(EmbeddedFont {
            bytes: Arc::new(bytes),
            face,
        })
    }

    /// Inserts the font program, its descriptor, the descendant CID font and the
    /// `ToUnicode` map, returning the `Type0` font dictionary referring to them.
    fn insert_into_document(&self, inner_document: &mut lopdf::Document) -> lopdf::Dictionary {
        let face = self.face.face();
        let base_font = Name(FONT_RESOURCE_NAME.as_bytes().to_vec());

        let glyph_characters = BTreeMap::from_iter(self.face.glyph_characters());
        let to_unicode_stream = lopdf::Stream::new(
            lopdf::Dictionary::new(),
            to_unicode_cmap(&glyph_characters).into_bytes(),
        );
        let to_unicode_id = inner_document.add_object(to_unicode_stream);

        let font_file_stream = lopdf::Stream::new(
            lopdf::Dictionary::from_iter(vec![("Length1", Integer(self.bytes.len() as i64))]),
            self.bytes.to_vec(),
        )
        .with_compression(false);
        let font_file_id = inner_document.add_object(font_file_stream);

        let font_descriptor = lopdf::Dictionary::from_iter(vec![
            ("Type", Name(b"FontDescriptor".to_vec())),
            ("FontName", base_font.clone()),
            ("Ascent", Integer(self.face.to_glyph_space(face.ascender().into()))),
            ("Descent", Integer(self.face.to_glyph_space(face.descender().into()))),
            (
                "CapHeight",
                Integer(self.face.to_glyph_space(face.capital_height().unwrap_or(face.ascender()).into())),
            ),
            ("ItalicAngle", Integer(0)),
            // Nonsymbolic
            ("Flags", Integer(32)),
            ("StemV", Integer(80)),
            ("FontBBox", Array(self.font_bounding_box())),
            ("FontFile2", Reference(font_file_id)),
        ]);
        let font_descriptor_id = inner_document.add_object(font_descriptor);

        let descendant_font = lopdf::Dictionary::from_iter(vec![
            ("Type", Name(b"Font".to_vec())),
            ("Subtype", Name(b"CIDFontType2".to_vec())),
            ("BaseFont", base_font.clone()),
            (
                "CIDSystemInfo",
                Dictionary(lopdf::Dictionary::from_iter(vec![
                    ("Registry", Object::string_literal("Adobe")),
                    ("Ordering", Object::string_literal("Identity")),
                    ("Supplement", Integer(0)),
                ])),
            ),
            ("W", Array(self.glyph_widths())),
            ("DW", Integer(1000)),
            ("FontDescriptor", Reference(font_descriptor_id)),
        ]);

        lopdf::Dictionary::from_iter(vec![
            ("Type", Name(b"Font".to_vec())),
            ("Subtype", Name(b"Type0".to_vec())),
            ("BaseFont", base_font),
            ("Encoding", Name(b"Identity-H".to_vec())),
            ("DescendantFonts", Array(vec![Dictionary(descendant_font)])),
            ("ToUnicode", Reference(to_unicode_id)),
        ])
    }

    /// The box enclosing every glyph of the face, in glyph space.
    fn font_bounding_box(&self) -> Vec<Object> {
        let bounding_box = self.face.face().global_bounding_box();
        [bounding_box.x_min, bounding_box.y_min, bounding_box.x_max, bounding_box.y_max]
            .into_iter()
            .map(|units| Integer(self.face.to_glyph_space(units.into())))
            .collect()
    }

    /// The `W` array of the CID font: runs of consecutive glyph IDs followed by
    /// their widths scaled to a 1000 unit em, e.g. `[20 [500 610 333]]`.
    fn glyph_widths(&self) -> Vec<Object> {
        let scale = 1000.0 / f32::from(self.face.units_per_em);
        let mut width_objects = Vec::new();
        let mut run_start = 0;
        let mut run_widths = Vec::<Object>::new();

        for glyph_id in 0..self.face.face().number_of_glyphs() {
            let Some(width) = self.face.glyph_width(glyph_id) else {
                log::warn!("Glyph {} has no horizontal advance, leaving it out of the widths", glyph_id);
                continue;
            };

            let expected_glyph_id = run_start + run_widths.len() as u16;
            if glyph_id != expected_glyph_id && !run_widths.is_empty() {
                width_objects.push(Integer(i64::from(run_start)));
                width_objects.push(Array(std::mem::take(&mut run_widths)));
            }
            if run_widths.is_empty() {
                run_start = glyph_id;
            }
            run_widths.push(Integer((width as f32 * scale) as i64));
        }

        if !run_widths.is_empty() {
            width_objects.push(Integer(i64::from(run_start)));
            width_objects.push(Array(run_widths));
        }

        width_objects
    }
}

const CMAP_HEADER: &str = "/CIDInit /ProcSet findresource begin\n\
12 dict begin\n\
begincmap\n\
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
/CMapName /Adobe-Identity-UCS def\n\
/CMapType 2 def\n\
1 begincodespacerange\n\
<0000> <FFFF>\n\
endcodespacerange\n";

const CMAP_FOOTER: &str = "endcmap\n\
CMapName currentdict /CMap defineresource pop\n\
end\n\
end\n";

/// Builds the `ToUnicode` CMap so that text written with glyph IDs can be searched and copied.
///
/// A `beginbfchar` block holds at most 100 entries and all of its glyph IDs must share
/// the same high byte, so a new block is opened whenever either limit is hit.
fn to_unicode_cmap(glyph_characters: &BTreeMap<u16, char>) -> String {
    let mut blocks: Vec<Vec<(u16, char)>> = Vec::new();
    let mut current_high_byte = None;

    for (glyph_id, character) in glyph_characters.iter().filter(|(glyph_id, _)| **glyph_id > 0) {
        let high_byte = glyph_id >> 8;
        let start_new_block = match blocks.last() {
            Some(block) => current_high_byte != Some(high_byte) || block.len() >= 100,
            None => true,
        };
        if start_new_block {
            blocks.push(Vec::new());
            current_high_byte = Some(high_byte);
        }
        if let Some(block) = blocks.last_mut() {
            block.push((*glyph_id, *character));
        }
    }

    let mut cmap = String::from(CMAP_HEADER);
    for block in blocks {
        cmap.push_str(&format!("{} beginbfchar\n", block.len()));
        for (glyph_id, character) in block {
            let mut utf16 = [0u16; 2];
            let units = character
                .encode_utf16(&mut utf16)
                .iter()
                .map(|unit| format!("{:04x}", unit))
                .collect::<String>();
            cmap.push_str(&format!("<{:04x}> <{}>\n", glyph_id, units));
        }
        cmap.push_str("endbfchar\n");
    }
    cmap.push_str(CMAP_FOOTER);

    cmap
}
