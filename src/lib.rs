//! TrackFlow reports turns the time-tracking and project data aggregated by the TrackFlow
//! service into paginated PDF documents, ready to be sent as an HTTP response or saved to a file.
//!
//! The entry point is the `ReportRenderer`, which offers `render_time_report` and
//! `render_project_report`. Both take a fully populated input value and return the bytes
//! of the finished PDF, or a `ContextError` explaining why the document could not be produced.
//! Nothing is ever returned halfway: a render either completes or fails as a whole.

/// The module where the `ContextError` type, used throughout this library, is presented.
///
/// Every fallible function returns a `ContextError`, which carries an `ErrorKind` telling
/// malformed input apart from configuration, font, canvas and I/O failures, a human readable
/// context and, if the error was propagated, the message of its source.
pub mod error;

/// The module where the `RendererConfiguration` is presented.
///
/// Every constant of the report layouts lives here: page size, margins, the two page break
/// thresholds, the table columns, the palette, the font sizes, the date format and the labels.
/// A configuration can be read from a JSON file through `RendererConfiguration::from_path`,
/// in which case only the values to be overridden need to be present.
pub mod configuration;

/// The module where the report inputs are presented.
///
/// `TimeReportInput` and `ProjectReportInput` mirror the JSON payloads of the upstream
/// aggregation service (camelCase keys, RFC 3339 or `YYYY-MM-DD` timestamps) and can be
/// built either from code or with their `from_json_slice` constructors.
pub mod model;

/// The module where the `Canvas` trait is presented, together with the `Color` and
/// `TextStyle` types the reports are painted with.
pub mod canvas;

/// The fonts a document can be written with: the built-in Helvetica, which needs no
/// embedding, or a TrueType font loaded from a file and embedded as a CID font.
pub mod fonts;

/// The module where the `PdfDocument` canvas session is presented.
///
/// # Introduction
///
/// A `PdfDocument` collects the pages and their drawing operations, then assembles the
/// PDF object graph with `write_all` and serializes it with `save_to_bytes`. The low-level
/// work is delegated to the `lopdf` crate. The output contains no random identifiers, so the
/// same drawing calls always produce the same bytes.
pub mod pdf;

/// The module where the `ReportRenderer` is presented.
///
/// # Introduction
///
/// The time report is made of a header, the user details, a summary and one task table per
/// project, broken over as many pages as needed and closed by a `Page X of N` footer on every
/// page. The project report is a single page flow with an overview, the team members and a
/// task summary.
pub mod report;

pub use configuration::RendererConfiguration;
pub use error::{ContextError, ErrorKind};
pub use model::{ProjectReportInput, TimeReportInput};
pub use report::ReportRenderer;

/// The content type to send along with the rendered documents.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Renders a time report with the default configuration.
pub fn render_time_report(input: &TimeReportInput) -> Result<Vec<u8>, ContextError> {
    ReportRenderer::default().render_time_report(input)
}

/// Renders a project report with the default configuration.
pub fn render_project_report(input: &ProjectReportInput) -> Result<Vec<u8>, ContextError> {
    ReportRenderer::default().render_project_report(input)
}
