use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::format_description::OwnedFormatItem;

use crate::canvas::Color;
use crate::error::{ContextError, ErrorKind};

/// Every layout constant, color, size and label shared by the two reports.
///
/// All fields have defaults, so a configuration file only needs to mention what it overrides.
/// Distances are in PDF points measured from the top-left corner of the page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RendererConfiguration {
    /// Name of the product, used in the time report title and the footer attribution.
    pub product_name: String,
    pub page_width: f32,
    pub page_height: f32,
    /// The x coordinate every left-aligned line starts at.
    pub margin_left: f32,
    /// Where the cursor is placed after a page break.
    pub margin_top: f32,
    /// A new page is started before a project header when the cursor is past this value.
    pub page_break_threshold_project: f32,
    /// A new page is started before a task row when the cursor is past this value.
    pub page_break_threshold_task: f32,
    /// Distance of the footer line from the bottom edge of each page.
    pub footer_offset: f32,
    /// Distance of the footer attribution from the right edge of each page.
    pub footer_attribution_width: f32,
    /// Task titles are cut to this many characters in the tables.
    pub task_title_max_characters: usize,
    pub table_columns: TableColumns,
    pub palette: Palette,
    pub font_sizes: FontSizes,
    /// A `time` format description applied to every date shown in the reports.
    pub date_format: String,
    /// An optional TTF/OTF font embedded in place of the built-in Helvetica.
    pub font_path: Option<PathBuf>,
    /// Whether the document streams are compressed before being saved.
    pub compress: bool,
}

/// Left edges of the task table columns, plus the end of the rule under the header.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TableColumns {
    pub task: f32,
    pub status: f32,
    pub hours: f32,
    pub completed: f32,
    pub rule_end: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Palette {
    /// Titles and project names.
    pub accent: Color,
    /// Section headings.
    pub heading: Color,
    /// Regular body text.
    pub body: Color,
    /// Timestamps, table headers and footers.
    pub muted: Color,
    /// The rule under each table header.
    pub rule: Color,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FontSizes {
    pub title: f32,
    pub subtitle: f32,
    pub section: f32,
    pub project: f32,
    pub body: f32,
    pub fine_print: f32,
}

impl Default for RendererConfiguration {
    fn default() -> Self {
        RendererConfiguration {
            product_name: "TrackFlow".into(),
            page_width: 612.0,
            page_height: 792.0,
            margin_left: 50.0,
            margin_top: 50.0,
            page_break_threshold_project: 700.0,
            page_break_threshold_task: 720.0,
            footer_offset: 50.0,
            footer_attribution_width: 150.0,
            task_title_max_characters: 30,
            table_columns: TableColumns::default(),
            palette: Palette::default(),
            font_sizes: FontSizes::default(),
            date_format: "[month padding:none]/[day padding:none]/[year]".into(),
            font_path: None,
            compress: false,
        }
    }
}

impl Default for TableColumns {
    fn default() -> Self {
        TableColumns {
            task: 50.0,
            status: 250.0,
            hours: 350.0,
            completed: 450.0,
            rule_end: 550.0,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            accent: Color::from_rgb8(0x3B, 0x82, 0xF6),
            heading: Color::from_rgb8(0x00, 0x00, 0x00),
            body: Color::from_rgb8(0x33, 0x33, 0x33),
            muted: Color::from_rgb8(0x66, 0x66, 0x66),
            rule: Color::from_rgb8(0xCC, 0xCC, 0xCC),
        }
    }
}

impl Default for FontSizes {
    fn default() -> Self {
        FontSizes {
            title: 24.0,
            subtitle: 18.0,
            section: 16.0,
            project: 14.0,
            body: 12.0,
            fine_print: 10.0,
        }
    }
}

impl RendererConfiguration {
    /// Reads a JSON configuration file, filling every missing field with its default.
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents =
            std::fs::read_to_string(configuration_file_path).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Io,
                    format!(
                        "Failed to read the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;
        let configuration: RendererConfiguration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    format!(
                        "Failed to parse the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;
        configuration.validate()?;

        Ok(configuration)
    }

    /// Checks the values that would otherwise only fail halfway through a render.
    pub fn validate(&self) -> Result<(), ContextError> {
        if !(self.page_width > 0.0 && self.page_height > 0.0) {
            return Err(ContextError::with_context(
                ErrorKind::Configuration,
                format!(
                    "The page size must be positive, found {}x{}",
                    self.page_width, self.page_height
                ),
            ));
        }
        self.date_format_description()?;

        Ok(())
    }

    /// Compiles the configured date format into a reusable description.
    pub fn date_format_description(&self) -> Result<OwnedFormatItem, ContextError> {
        time::format_description::parse_owned::<2>(&self.date_format).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Configuration,
                format!("Invalid date format {:?}", self.date_format),
                &error,
            )
        })
    }
}
