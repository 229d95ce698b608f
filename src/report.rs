use time::format_description::OwnedFormatItem;
use time::OffsetDateTime;

use crate::canvas::{Canvas, TextStyle};
use crate::configuration::RendererConfiguration;
use crate::error::{ContextError, ErrorKind};
use crate::model::{ProjectReportInput, ProjectTimeEntry, TimeReportInput};
use crate::pdf::PdfDocument;

/// Vertical step between consecutive body lines.
const LINE_HEIGHT: f32 = 15.0;
/// Space between a section heading and its first line.
const SECTION_GAP: f32 = 30.0;
/// Space from the first line of a four-line block to the next section heading.
const BLOCK_GAP: f32 = 80.0;

/// Where the next element goes: a page and a distance from its top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cursor {
    page_index: usize,
    y: f32,
}

/// Renders TrackFlow reports into PDF documents.
///
/// The renderer holds only its configuration, so one instance can serve any number of
/// renders, from any number of threads. Each render opens its own `PdfDocument` and
/// drops it before returning, whether it succeeded or not.
#[derive(Debug, Clone, Default)]
pub struct ReportRenderer {
    configuration: RendererConfiguration,
}

impl ReportRenderer {
    pub fn new(configuration: RendererConfiguration) -> Self {
        ReportRenderer { configuration }
    }

    pub fn configuration(&self) -> &RendererConfiguration {
        &self.configuration
    }

    /// Renders a time report stamped with the current date.
    pub fn render_time_report(&self, input: &TimeReportInput) -> Result<Vec<u8>, ContextError> {
        self.render_time_report_at(input, OffsetDateTime::now_utc())
    }

    /// Renders a time report as if generated at the given moment. The same input and
    /// moment always give the same bytes.
    pub fn render_time_report_at(
        &self,
        input: &TimeReportInput,
        generated_at: OffsetDateTime,
    ) -> Result<Vec<u8>, ContextError> {
        let mut document = self.open_document(&input.title, generated_at)?;
        self.draw_time_report(&mut document, input, generated_at)?;
        let pdf_bytes = self.finish_document(document, generated_at)?;
        log::info!("Rendered the time report {:?} ({} bytes)", input.title, pdf_bytes.len());

        Ok(pdf_bytes)
    }

    /// Renders a project report stamped with the current date.
    pub fn render_project_report(
        &self,
        input: &ProjectReportInput,
    ) -> Result<Vec<u8>, ContextError> {
        self.render_project_report_at(input, OffsetDateTime::now_utc())
    }

    /// Renders a project report as if generated at the given moment, after validating it.
    pub fn render_project_report_at(
        &self,
        input: &ProjectReportInput,
        generated_at: OffsetDateTime,
    ) -> Result<Vec<u8>, ContextError> {
        input.validate()?;
        let mut document = self.open_document(&input.name, generated_at)?;
        self.draw_project_report(&mut document, input, generated_at)?;
        let pdf_bytes = self.finish_document(document, generated_at)?;
        log::info!("Rendered the project report {:?} ({} bytes)", input.name, pdf_bytes.len());

        Ok(pdf_bytes)
    }

    /// Draws the time report: header, details, summary, the per-project task tables
    /// with their page breaks and finally the footer of every page. The report starts on
    /// a new page, and only its own pages are numbered.
    pub fn draw_time_report<C: Canvas>(
        &self,
        canvas: &mut C,
        input: &TimeReportInput,
        generated_at: OffsetDateTime,
    ) -> Result<(), ContextError> {
        let configuration = &self.configuration;
        let palette = &configuration.palette;
        let sizes = &configuration.font_sizes;
        let date_format = configuration.date_format_description()?;
        let x = configuration.margin_left;

        let first_page = canvas.add_page(configuration.page_width, configuration.page_height)?;
        let title = format!("{} Time Report", configuration.product_name);
        canvas.draw_text(first_page, &title, [x, 50.0], TextStyle::new(sizes.title, palette.accent))?;
        canvas.draw_text(
            first_page,
            &format!("Generated on {}", format_date(&generated_at, &date_format)?),
            [x, 80.0],
            TextStyle::new(sizes.body, palette.muted),
        )?;

        self.draw_section_heading(canvas, first_page, "Report Details", 120.0)?;
        self.draw_body_lines(
            canvas,
            first_page,
            145.0,
            &[
                format!("User: {}", input.user.name),
                format!("Email: {}", input.user.email),
                format!("Period: {}", input.date_range),
            ],
        )?;

        let mut y = 210.0;
        self.draw_section_heading(canvas, first_page, "Summary", y)?;
        y += SECTION_GAP;
        let summary = &input.summary;
        self.draw_body_lines(
            canvas,
            first_page,
            y,
            &[
                format!("Total Hours Worked: {}h", format_number(summary.total_hours)),
                format!("Total Tasks: {}", summary.total_tasks),
                format!("Completed Tasks: {}", summary.completed_tasks),
                format!("Productivity Rate: {}%", format_number(summary.productivity)),
            ],
        )?;

        y += BLOCK_GAP;
        self.draw_section_heading(canvas, first_page, "Project Breakdown", y)?;
        let mut cursor = Cursor {
            page_index: first_page,
            y: y + SECTION_GAP,
        };
        for project in input.projects.iter() {
            self.draw_project_breakdown(canvas, &mut cursor, project, &date_format)?;
        }

        self.draw_footers(canvas, first_page)
    }

    /// Draws the project report as a single flow. There are no page breaks: a long
    /// team list runs past the bottom of the page, which is only reported in the logs.
    pub fn draw_project_report<C: Canvas>(
        &self,
        canvas: &mut C,
        input: &ProjectReportInput,
        generated_at: OffsetDateTime,
    ) -> Result<(), ContextError> {
        let configuration = &self.configuration;
        let palette = &configuration.palette;
        let sizes = &configuration.font_sizes;
        let date_format = configuration.date_format_description()?;
        let x = configuration.margin_left;

        let page = canvas.add_page(configuration.page_width, configuration.page_height)?;
        canvas.draw_text(page, "Project Report", [x, 50.0], TextStyle::new(sizes.title, palette.accent))?;
        canvas.draw_text(page, &input.name, [x, 80.0], TextStyle::new(sizes.subtitle, palette.body))?;
        canvas.draw_text(
            page,
            &format!("Generated on {}", format_date(&generated_at, &date_format)?),
            [x, 105.0],
            TextStyle::new(sizes.body, palette.muted),
        )?;

        let mut y = 140.0;
        self.draw_section_heading(canvas, page, "Project Overview", y)?;
        y += SECTION_GAP;
        self.draw_body_lines(
            canvas,
            page,
            y,
            &[
                format!("Status: {}", input.status),
                format!("Start Date: {}", format_date(&input.start_date, &date_format)?),
                format!("Due Date: {}", format_date(&input.due_date, &date_format)?),
                format!("Progress: {}%", format_number(input.progress)),
            ],
        )?;

        y += BLOCK_GAP;
        self.draw_section_heading(canvas, page, "Team Members", y)?;
        y += SECTION_GAP;
        for member in input.team_members.iter() {
            canvas.draw_text(
                page,
                &format!("{} ({})", member.name, member.role),
                [x, y],
                TextStyle::new(sizes.body, palette.body),
            )?;
            y += LINE_HEIGHT;
        }

        y += SECTION_GAP;
        self.draw_section_heading(canvas, page, "Task Summary", y)?;
        y += SECTION_GAP;
        self.draw_body_lines(
            canvas,
            page,
            y,
            &[
                format!("Total Tasks: {}", input.total_tasks),
                format!("Completed: {}", input.completed_tasks),
                format!("In Progress: {}", input.in_progress_tasks),
                format!("Pending: {}", input.pending_tasks),
            ],
        )?;

        let last_line = y + 3.0 * LINE_HEIGHT;
        let page_bottom = configuration.page_height - configuration.margin_top;
        if last_line > page_bottom {
            log::warn!(
                "The project report {:?} runs past the bottom margin (last line at {}, margin at {}) \
                 and is cut off, as this report is never paginated",
                input.name,
                last_line,
                page_bottom
            );
        }

        Ok(())
    }

    /// One project of the breakdown: its header, the task table header and one row per task.
    fn draw_project_breakdown<C: Canvas>(
        &self,
        canvas: &mut C,
        cursor: &mut Cursor,
        project: &ProjectTimeEntry,
        date_format: &OwnedFormatItem,
    ) -> Result<(), ContextError> {
        let configuration = &self.configuration;
        let palette = &configuration.palette;
        let sizes = &configuration.font_sizes;
        let columns = &configuration.table_columns;
        let x = configuration.margin_left;

        self.break_page_past(canvas, cursor, configuration.page_break_threshold_project)?;
        canvas.draw_text(
            cursor.page_index,
            &project.name,
            [x, cursor.y],
            TextStyle::new(sizes.project, palette.accent),
        )?;
        cursor.y += 20.0;
        canvas.draw_text(
            cursor.page_index,
            &format!(
                "Hours: {}h | Tasks Completed: {}",
                format_number(project.total_hours),
                project.tasks_completed
            ),
            [x, cursor.y],
            TextStyle::new(sizes.body, palette.body),
        )?;
        cursor.y += 25.0;

        let header_style = TextStyle::new(sizes.fine_print, palette.muted);
        for (label, column) in [
            ("Task", columns.task),
            ("Status", columns.status),
            ("Hours", columns.hours),
            ("Completed", columns.completed),
        ] {
            canvas.draw_text(cursor.page_index, label, [column, cursor.y], header_style)?;
        }
        cursor.y += LINE_HEIGHT;
        canvas.draw_line(
            cursor.page_index,
            [x, cursor.y],
            [columns.rule_end, cursor.y],
            palette.rule,
            1.0,
        )?;
        cursor.y += 10.0;

        let row_style = TextStyle::new(sizes.fine_print, palette.body);
        for task in project.tasks.iter() {
            self.break_page_past(canvas, cursor, configuration.page_break_threshold_task)?;
            let completed = match &task.completed_at {
                Some(completed_at) => format_date(completed_at, date_format)?,
                None => "-".to_string(),
            };
            let hours = format!("{}h", format_number(task.hours));
            let cells = [
                (truncate_characters(&task.title, configuration.task_title_max_characters), columns.task),
                (task.status.as_str(), columns.status),
                (hours.as_str(), columns.hours),
                (completed.as_str(), columns.completed),
            ];
            for (text, column) in cells {
                canvas.draw_text(cursor.page_index, text, [column, cursor.y], row_style)?;
            }
            cursor.y += LINE_HEIGHT;
        }
        cursor.y += 20.0;

        Ok(())
    }

    /// Starts a new page when the cursor is strictly past the threshold.
    fn break_page_past<C: Canvas>(
        &self,
        canvas: &mut C,
        cursor: &mut Cursor,
        threshold: f32,
    ) -> Result<(), ContextError> {
        if cursor.y > threshold {
            let page_index =
                canvas.add_page(self.configuration.page_width, self.configuration.page_height)?;
            log::debug!(
                "Cursor at {} is past {}, continuing on page {}",
                cursor.y,
                threshold,
                page_index + 1
            );
            *cursor = Cursor {
                page_index,
                y: self.configuration.margin_top,
            };
        }

        Ok(())
    }

    /// Stamps `Page X of N` and the product attribution at the bottom of every page from
    /// `first_page` on, each page being measured on its own. Pages the canvas held before
    /// the report are neither stamped nor counted.
    fn draw_footers<C: Canvas>(&self, canvas: &mut C, first_page: usize) -> Result<(), ContextError> {
        let configuration = &self.configuration;
        let style = TextStyle::new(configuration.font_sizes.fine_print, configuration.palette.muted);
        let attribution = format!("Generated by {}", configuration.product_name);
        let page_count = canvas.page_count() - first_page;

        for page_index in first_page..canvas.page_count() {
            let (width, height) = canvas.page_size(page_index)?;
            let y = height - configuration.footer_offset;
            canvas.draw_text(
                page_index,
                &format!("Page {} of {}", page_index - first_page + 1, page_count),
                [configuration.margin_left, y],
                style,
            )?;
            canvas.draw_text(
                page_index,
                &attribution,
                [width - configuration.footer_attribution_width, y],
                style,
            )?;
        }

        Ok(())
    }

    fn draw_section_heading<C: Canvas>(
        &self,
        canvas: &mut C,
        page_index: usize,
        heading: &str,
        y: f32,
    ) -> Result<(), ContextError> {
        let style = TextStyle::new(
            self.configuration.font_sizes.section,
            self.configuration.palette.heading,
        );
        canvas.draw_text(page_index, heading, [self.configuration.margin_left, y], style)
    }

    /// Draws consecutive body lines starting at `y`, one line height apart.
    fn draw_body_lines<C: Canvas>(
        &self,
        canvas: &mut C,
        page_index: usize,
        y: f32,
        lines: &[String],
    ) -> Result<(), ContextError> {
        let style = self.body_style();
        for (index, line) in lines.iter().enumerate() {
            let line_y = y + index as f32 * LINE_HEIGHT;
            canvas.draw_text(page_index, line, [self.configuration.margin_left, line_y], style)?;
        }

        Ok(())
    }

    fn body_style(&self) -> TextStyle {
        TextStyle::new(self.configuration.font_sizes.body, self.configuration.palette.body)
    }

    fn open_document(
        &self,
        title: &str,
        generated_at: OffsetDateTime,
    ) -> Result<PdfDocument, ContextError> {
        let identifier = format!("{:032x}", generated_at.unix_timestamp_nanos().unsigned_abs());
        let document = PdfDocument::new(identifier)
            .with_metadata(title, self.configuration.product_name.clone());

        match &self.configuration.font_path {
            Some(font_path) => document.with_embedded_font(font_path),
            None => Ok(document),
        }
    }

    fn finish_document(
        &self,
        mut document: PdfDocument,
        generated_at: OffsetDateTime,
    ) -> Result<Vec<u8>, ContextError> {
        let instance_id = document.identifier.clone();
        document.write_all(&instance_id, &generated_at)?;
        if self.configuration.compress {
            document.optimize();
        }

        document.save_to_bytes()
    }
}

/// Formats a timestamp in its own offset with the configured date format.
fn format_date(date: &OffsetDateTime, date_format: &OwnedFormatItem) -> Result<String, ContextError> {
    date.format(date_format).map_err(|error| {
        ContextError::with_error(
            ErrorKind::InvalidInput,
            format!("Failed to format the date {}", date),
            &error,
        )
    })
}

/// The longest prefix of `text` holding at most `maximum_characters` characters.
///
/// Characters are Unicode scalar values, so a title made of characters outside the Basic
/// Multilingual Plane (emoji for instance) keeps as many of them as any other title,
/// where a count of UTF-16 code units would keep half as many.
fn truncate_characters(text: &str, maximum_characters: usize) -> &str {
    match text.char_indices().nth(maximum_characters) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Writes a number the way JavaScript turns it into a string: shortest round-trip digits,
/// `0` for negative zero, and an exponent with an explicit sign outside `[1e-6, 1e21)`.
fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let exponential = format!("{:e}", value);
        match exponential.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => exponential,
        }
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Color;
    use crate::model::{ReportUser, TaskEntry, TeamMember, TimeSummary};
    use time::macros::datetime;

    #[derive(Debug, Clone, PartialEq)]
    struct DrawnText {
        page_index: usize,
        text: String,
        position: [f32; 2],
        style: TextStyle,
    }

    /// Keeps every drawing call instead of producing a document.
    #[derive(Default)]
    struct RecordingCanvas {
        page_sizes: Vec<(f32, f32)>,
        texts: Vec<DrawnText>,
        lines: Vec<(usize, [f32; 2], [f32; 2], Color)>,
    }

    impl RecordingCanvas {
        fn text(&self, text: &str) -> &DrawnText {
            self.texts
                .iter()
                .find(|drawn| drawn.text == text)
                .unwrap_or_else(|| panic!("{:?} was never drawn", text))
        }

        fn texts_in_column(&self, x: f32) -> Vec<&str> {
            self.texts
                .iter()
                .filter(|drawn| drawn.position[0] == x && drawn.style.font_size == 10.0)
                .map(|drawn| drawn.text.as_str())
                .collect()
        }
    }

    impl Canvas for RecordingCanvas {
        fn add_page(&mut self, width: f32, height: f32) -> Result<usize, ContextError> {
            self.page_sizes.push((width, height));
            Ok(self.page_sizes.len() - 1)
        }

        fn page_count(&self) -> usize {
            self.page_sizes.len()
        }

        fn page_size(&self, page_index: usize) -> Result<(f32, f32), ContextError> {
            self.page_sizes.get(page_index).copied().ok_or_else(|| {
                ContextError::with_context(ErrorKind::Canvas, "missing page")
            })
        }

        fn draw_text(
            &mut self,
            page_index: usize,
            text: &str,
            position: [f32; 2],
            style: TextStyle,
        ) -> Result<(), ContextError> {
            self.page_size(page_index)?;
            self.texts.push(DrawnText {
                page_index,
                text: text.to_string(),
                position,
                style,
            });
            Ok(())
        }

        fn draw_line(
            &mut self,
            page_index: usize,
            from: [f32; 2],
            to: [f32; 2],
            color: Color,
            _line_width: f32,
        ) -> Result<(), ContextError> {
            self.page_size(page_index)?;
            self.lines.push((page_index, from, to, color));
            Ok(())
        }
    }

    const GENERATED_AT: OffsetDateTime = datetime!(2024-03-11 09:00:00 UTC);

    fn task(title: &str) -> TaskEntry {
        TaskEntry {
            title: title.to_string(),
            status: "completed".to_string(),
            hours: 1.5,
            completed_at: None,
        }
    }

    fn project(name: &str, task_count: usize) -> ProjectTimeEntry {
        ProjectTimeEntry {
            name: name.to_string(),
            total_hours: 1.5 * task_count as f64,
            tasks_completed: task_count as u32,
            tasks: (0..task_count).map(|index| task(&format!("Task {}", index))).collect(),
        }
    }

    fn time_report(projects: Vec<ProjectTimeEntry>) -> TimeReportInput {
        TimeReportInput {
            title: "Weekly report".to_string(),
            date_range: "Mar 4 - Mar 10, 2024".to_string(),
            user: ReportUser {
                name: "Sam Rivera".to_string(),
                email: "sam@example.com".to_string(),
            },
            projects,
            summary: TimeSummary {
                total_hours: 37.5,
                total_tasks: 12,
                completed_tasks: 9,
                productivity: 135.5,
            },
        }
    }

    fn project_report(team_size: usize) -> ProjectReportInput {
        ProjectReportInput {
            name: "Apollo".to_string(),
            status: "active".to_string(),
            start_date: datetime!(2024-01-15 00:00:00 UTC),
            due_date: datetime!(2024-06-30 00:00:00 UTC),
            progress: 42.5,
            team_members: (0..team_size)
                .map(|index| TeamMember {
                    name: format!("Member {}", index),
                    role: "Engineer".to_string(),
                })
                .collect(),
            total_tasks: 10,
            completed_tasks: 4,
            in_progress_tasks: 3,
            pending_tasks: 3,
        }
    }

    fn draw_time_report(input: &TimeReportInput) -> RecordingCanvas {
        let mut canvas = RecordingCanvas::default();
        ReportRenderer::default()
            .draw_time_report(&mut canvas, input, GENERATED_AT)
            .unwrap();
        canvas
    }

    #[test]
    fn a_time_report_without_projects_keeps_its_header_and_summary() {
        let canvas = draw_time_report(&time_report(Vec::new()));

        assert_eq!(canvas.page_count(), 1);
        let drawn: Vec<(&str, [f32; 2])> = canvas
            .texts
            .iter()
            .map(|drawn| (drawn.text.as_str(), drawn.position))
            .collect();
        similar_asserts::assert_eq!(
            drawn,
            vec![
                ("TrackFlow Time Report", [50.0, 50.0]),
                ("Generated on 3/11/2024", [50.0, 80.0]),
                ("Report Details", [50.0, 120.0]),
                ("User: Sam Rivera", [50.0, 145.0]),
                ("Email: sam@example.com", [50.0, 160.0]),
                ("Period: Mar 4 - Mar 10, 2024", [50.0, 175.0]),
                ("Summary", [50.0, 210.0]),
                ("Total Hours Worked: 37.5h", [50.0, 240.0]),
                ("Total Tasks: 12", [50.0, 255.0]),
                ("Completed Tasks: 9", [50.0, 270.0]),
                ("Productivity Rate: 135.5%", [50.0, 285.0]),
                ("Project Breakdown", [50.0, 320.0]),
                ("Page 1 of 1", [50.0, 742.0]),
                ("Generated by TrackFlow", [462.0, 742.0]),
            ]
        );
        assert!(canvas.lines.is_empty());
    }

    #[test]
    fn the_project_table_is_laid_out_under_its_header() {
        let mut input = time_report(vec![project("Website", 1)]);
        input.projects[0].total_hours = 8.0;
        let canvas = draw_time_report(&input);

        let name = canvas.text("Website");
        assert_eq!(name.position, [50.0, 350.0]);
        assert_eq!(name.style, TextStyle::new(14.0, Color::from_rgb8(0x3B, 0x82, 0xF6)));
        assert_eq!(canvas.text("Hours: 8h | Tasks Completed: 1").position, [50.0, 370.0]);
        assert_eq!(canvas.text("Status").position, [250.0, 395.0]);
        assert_eq!(canvas.text("Hours").position, [350.0, 395.0]);
        assert_eq!(canvas.text("Completed").position, [450.0, 395.0]);
        assert_eq!(
            canvas.lines,
            vec![(0, [50.0, 410.0], [550.0, 410.0], Color::from_rgb8(0xCC, 0xCC, 0xCC))]
        );
        assert_eq!(canvas.text("Task 0").position, [50.0, 420.0]);
        assert_eq!(canvas.text("1.5h").position, [350.0, 420.0]);
        assert_eq!(canvas.text("-").position, [450.0, 420.0]);
    }

    #[test]
    fn task_rows_past_the_task_threshold_continue_on_a_new_page() {
        // Rows start at 420 and step by 15: the row at 720 still fits, the next one moves
        let canvas = draw_time_report(&time_report(vec![project("Website", 25)]));

        assert_eq!(canvas.page_count(), 2);
        let last_on_first_page = canvas.text("Task 20");
        assert_eq!((last_on_first_page.page_index, last_on_first_page.position[1]), (0, 720.0));
        let rows_on_second_page: Vec<(&str, f32)> = canvas
            .texts
            .iter()
            .filter(|drawn| drawn.page_index == 1 && drawn.text.starts_with("Task "))
            .map(|drawn| (drawn.text.as_str(), drawn.position[1]))
            .collect();
        similar_asserts::assert_eq!(
            rows_on_second_page,
            vec![("Task 21", 50.0), ("Task 22", 65.0), ("Task 23", 80.0), ("Task 24", 95.0)]
        );
    }

    #[test]
    fn project_headers_past_the_project_threshold_start_a_new_page() {
        // 19 rows leave the cursor at 725 once the project is closed
        let canvas = draw_time_report(&time_report(vec![project("Website", 19), project("Mobile", 1)]));

        let header = canvas.text("Mobile");
        assert_eq!((header.page_index, header.position[1]), (1, 50.0));
        assert_eq!(canvas.page_count(), 2);
    }

    #[test]
    fn headers_under_the_project_threshold_keep_their_page_while_rows_move() {
        // 17 rows leave the cursor at 695: the header stays, its first row lands at 765 > 720
        let input = time_report(vec![project("Website", 17), project("Mobile", 2)]);
        let canvas = draw_time_report(&input);

        let header = canvas.text("Mobile");
        assert_eq!((header.page_index, header.position[1]), (0, 695.0));
        let first_rows: Vec<(usize, f32)> = canvas
            .texts
            .iter()
            .filter(|drawn| drawn.text == "Task 0" || drawn.text == "Task 1")
            .skip(2)
            .map(|drawn| (drawn.page_index, drawn.position[1]))
            .collect();
        assert_eq!(first_rows, vec![(1, 50.0), (1, 65.0)]);
    }

    #[test]
    fn footers_number_every_page_against_the_total() {
        let projects = (0..6).map(|index| project(&format!("Project {}", index), 12)).collect();
        let canvas = draw_time_report(&time_report(projects));
        let page_count = canvas.page_count();
        assert!(page_count > 1);

        let footers: Vec<(usize, String)> = canvas
            .texts
            .iter()
            .filter(|drawn| drawn.text.starts_with("Page "))
            .map(|drawn| (drawn.page_index, drawn.text.clone()))
            .collect();
        let expected: Vec<(usize, String)> = (0..page_count)
            .map(|page_index| (page_index, format!("Page {} of {}", page_index + 1, page_count)))
            .collect();
        similar_asserts::assert_eq!(footers, expected);
        assert_eq!(
            canvas
                .texts
                .iter()
                .filter(|drawn| drawn.text == "Generated by TrackFlow")
                .count(),
            page_count
        );
    }

    #[test]
    fn long_task_titles_are_cut_to_thirty_characters() {
        let mut input = time_report(vec![project("Website", 0)]);
        input.projects[0].tasks = vec![
            task("Refactor the authentication middleware for SSO"),
            task("Exactly thirty characters long"),
            task("Résumé parsing — édition spéciale"),
        ];
        let canvas = draw_time_report(&input);

        similar_asserts::assert_eq!(
            canvas.texts_in_column(50.0),
            vec![
                "Task",
                "Refactor the authentication mi",
                "Exactly thirty characters long",
                "Résumé parsing — édition spéci",
                "Page 1 of 1",
            ]
        );
        assert_eq!(input.projects[0].tasks[0].title, "Refactor the authentication middleware for SSO");
    }

    #[test]
    fn completion_dates_are_formatted_or_replaced_by_a_dash() {
        let mut input = time_report(vec![project("Website", 2)]);
        input.projects[0].tasks[1].completed_at = Some(datetime!(2024-03-05 16:20:00 UTC));
        let canvas = draw_time_report(&input);

        similar_asserts::assert_eq!(canvas.texts_in_column(450.0), vec!["Completed", "-", "3/5/2024"]);
    }

    #[test]
    fn the_date_format_comes_from_the_configuration() {
        let renderer = ReportRenderer::new(RendererConfiguration {
            date_format: "[year]-[month]-[day]".into(),
            ..RendererConfiguration::default()
        });
        let mut canvas = RecordingCanvas::default();
        renderer
            .draw_time_report(&mut canvas, &time_report(Vec::new()), GENERATED_AT)
            .unwrap();

        canvas.text("Generated on 2024-03-11");
    }

    #[test]
    fn the_project_report_follows_its_fixed_layout() {
        let mut canvas = RecordingCanvas::default();
        ReportRenderer::default()
            .draw_project_report(&mut canvas, &project_report(2), GENERATED_AT)
            .unwrap();

        let drawn: Vec<(&str, f32)> = canvas
            .texts
            .iter()
            .map(|drawn| (drawn.text.as_str(), drawn.position[1]))
            .collect();
        similar_asserts::assert_eq!(
            drawn,
            vec![
                ("Project Report", 50.0),
                ("Apollo", 80.0),
                ("Generated on 3/11/2024", 105.0),
                ("Project Overview", 140.0),
                ("Status: active", 170.0),
                ("Start Date: 1/15/2024", 185.0),
                ("Due Date: 6/30/2024", 200.0),
                ("Progress: 42.5%", 215.0),
                ("Team Members", 250.0),
                ("Member 0 (Engineer)", 280.0),
                ("Member 1 (Engineer)", 295.0),
                ("Task Summary", 340.0),
                ("Total Tasks: 10", 370.0),
                ("Completed: 4", 385.0),
                ("In Progress: 3", 400.0),
                ("Pending: 3", 415.0),
            ]
        );
    }

    #[test]
    fn the_project_report_never_breaks_pages_nor_adds_footers() {
        let mut canvas = RecordingCanvas::default();
        ReportRenderer::default()
            .draw_project_report(&mut canvas, &project_report(120), GENERATED_AT)
            .unwrap();

        assert_eq!(canvas.page_count(), 1);
        assert!(canvas.texts.iter().all(|drawn| drawn.page_index == 0));
        assert!(!canvas.texts.iter().any(|drawn| drawn.text.starts_with("Page ")));
        // 280 + 120 * 15 + 30 + 30 + 45
        assert_eq!(canvas.text("Pending: 3").position[1], 2185.0);
    }

    #[test]
    fn invalid_project_reports_are_rejected_before_rendering() {
        let mut input = project_report(1);
        input.name = " ".to_string();

        let error = ReportRenderer::default()
            .render_project_report_at(&input, GENERATED_AT)
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn pages_already_on_the_canvas_are_not_numbered() {
        let mut canvas = RecordingCanvas::default();
        canvas.add_page(612.0, 792.0).unwrap();
        ReportRenderer::default()
            .draw_time_report(&mut canvas, &time_report(vec![project("Website", 25)]), GENERATED_AT)
            .unwrap();

        assert_eq!(canvas.page_count(), 3);
        assert!(canvas.texts.iter().all(|drawn| drawn.page_index > 0));
        assert_eq!(canvas.text("TrackFlow Time Report").page_index, 1);
        let footers: Vec<(usize, &str)> = canvas
            .texts
            .iter()
            .filter(|drawn| drawn.text.starts_with("Page "))
            .map(|drawn| (drawn.page_index, drawn.text.as_str()))
            .collect();
        assert_eq!(footers, vec![(1, "Page 1 of 2"), (2, "Page 2 of 2")]);
    }

    /// Refuses to add more pages than it was given room for.
    struct FullCanvas {
        inner: RecordingCanvas,
        maximum_pages: usize,
    }

    impl Canvas for FullCanvas {
        fn add_page(&mut self, width: f32, height: f32) -> Result<usize, ContextError> {
            if self.inner.page_count() == self.maximum_pages {
                return Err(ContextError::with_context(ErrorKind::Canvas, "full"));
            }
            self.inner.add_page(width, height)
        }

        fn page_count(&self) -> usize {
            self.inner.page_count()
        }

        fn page_size(&self, page_index: usize) -> Result<(f32, f32), ContextError> {
            self.inner.page_size(page_index)
        }

        fn draw_text(
            &mut self,
            page_index: usize,
            text: &str,
            position: [f32; 2],
            style: TextStyle,
        ) -> Result<(), ContextError> {
            self.inner.draw_text(page_index, text, position, style)
        }

        fn draw_line(
            &mut self,
            page_index: usize,
            from: [f32; 2],
            to: [f32; 2],
            color: Color,
            line_width: f32,
        ) -> Result<(), ContextError> {
            self.inner.draw_line(page_index, from, to, color, line_width)
        }
    }

    #[test]
    fn a_canvas_failure_midway_stops_the_report() {
        let mut canvas = FullCanvas {
            inner: RecordingCanvas::default(),
            maximum_pages: 1,
        };
        let error = ReportRenderer::default()
            .draw_time_report(&mut canvas, &time_report(vec![project("Website", 25)]), GENERATED_AT)
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Canvas);
        assert_eq!(error.to_string(), "full");
        // Nothing after the failing break was drawn, footers included
        assert!(canvas.inner.texts.iter().any(|drawn| drawn.text == "Task 20"));
        assert!(!canvas.inner.texts.iter().any(|drawn| drawn.text == "Task 21"));
        assert!(!canvas.inner.texts.iter().any(|drawn| drawn.text.starts_with("Page ")));
    }

    #[test]
    fn numbers_are_written_like_javascript_strings() {
        assert_eq!(format_number(7.5), "7.5");
        assert_eq!(format_number(8.0), "8");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(123456789012345680000.0), "123456789012345680000");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn negative_zero_hours_are_shown_as_zero() {
        let mut input = time_report(vec![project("Website", 1)]);
        input.projects[0].tasks[0].hours = -0.0;
        let canvas = draw_time_report(&input);

        similar_asserts::assert_eq!(canvas.texts_in_column(350.0), vec!["Hours", "0h"]);
    }

    #[test]
    fn truncation_never_splits_a_character() {
        assert_eq!(truncate_characters("ééé", 2), "éé");
        assert_eq!(truncate_characters("short", 30), "short");
        assert_eq!(truncate_characters("", 30), "");
        // Emoji count as one character each
        assert_eq!(truncate_characters(&"🚀".repeat(20), 30), "🚀".repeat(20));
    }
}
