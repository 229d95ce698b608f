use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};

/// An RGB color, stored with components in the `0.0..=1.0` range that PDF operators expect.
/// It is written in configuration files as a `#RRGGBB` hexadecimal string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Color {
    /// Builds a color from its 8-bit components.
    pub fn from_rgb8(red: u8, green: u8, blue: u8) -> Self {
        Color {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
        }
    }

    /// Parses a `#RRGGBB` (or `RRGGBB`) hexadecimal color.
    pub fn from_hex(hex: &str) -> Result<Self, ContextError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(ContextError::with_context(
                ErrorKind::Configuration,
                format!("Invalid color {:?}, expected the form #RRGGBB", hex),
            ));
        }

        let component = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    format!("Invalid color {:?}", hex),
                    &error,
                )
            })
        };

        Ok(Color::from_rgb8(component(0..2)?, component(2..4)?, component(4..6)?))
    }

    /// The color components as the array taken by the `rg` and `RG` operators.
    pub fn components(&self) -> [f32; 3] {
        [self.red, self.green, self.blue]
    }

    fn to_hex(self) -> String {
        let [red, green, blue] = self
            .components()
            .map(|component| (component.clamp(0.0, 1.0) * 255.0).round() as u8);
        format!("#{:02X}{:02X}{:02X}", red, green, blue)
    }
}

impl TryFrom<String> for Color {
    type Error = ContextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_hex()
    }
}

/// How a run of text is painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub color: Color,
}

impl TextStyle {
    pub fn new(font_size: f32, color: Color) -> Self {
        TextStyle { font_size, color }
    }
}

/// A drawing surface made of pages, addressed with a top-left origin in points.
///
/// Text is placed by the top of its box, which is how the report layouts are
/// expressed; implementations take care of converting to their own coordinates.
/// Pages are referred to by their zero-based index, as returned by `add_page`.
pub trait Canvas {
    /// Appends a page of the given size in points and returns its index.
    fn add_page(&mut self, width: f32, height: f32) -> Result<usize, ContextError>;

    /// The number of pages added so far.
    fn page_count(&self) -> usize;

    /// The width and height in points of the page at the given index.
    fn page_size(&self, page_index: usize) -> Result<(f32, f32), ContextError>;

    /// Writes a single line of text whose box has its top-left corner at `position`.
    fn draw_text(
        &mut self,
        page_index: usize,
        text: &str,
        position: [f32; 2],
        style: TextStyle,
    ) -> Result<(), ContextError>;

    /// Strokes a straight segment between two points.
    fn draw_line(
        &mut self,
        page_index: usize,
        from: [f32; 2],
        to: [f32; 2],
        color: Color,
        line_width: f32,
    ) -> Result<(), ContextError>;
}
