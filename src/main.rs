use std::path::{Path, PathBuf};

use clap::Parser;
use trackflow_reports::{
    ContextError, ErrorKind, ProjectReportInput, RendererConfiguration, ReportRenderer,
    TimeReportInput,
};

/// Renders TrackFlow reports from their JSON data into PDF files.
#[derive(Parser, Debug)]
#[command(version, long_about = None)]
struct CliArguments {
    #[command(subcommand)]
    report: ReportCommand,
}

#[derive(clap::Subcommand, Debug)]
enum ReportCommand {
    /// Render a time report.
    Time(RenderArguments),
    /// Render a project report.
    Project(RenderArguments),
}

#[derive(clap::Args, Debug)]
struct RenderArguments {
    /// The path of the JSON report data.
    #[arg(short = 'i', long = "input", value_name = "json_file")]
    input_path: PathBuf,
    /// The path of the output PDF file.
    #[arg(short = 'o', long = "output", value_name = "file_path")]
    output_file_path: PathBuf,
    /// A JSON renderer configuration overriding the defaults.
    #[arg(short = 'c', long = "configuration", value_name = "json_file")]
    configuration_path: Option<PathBuf>,
    /// Compress the streams of the output document.
    #[arg(long)]
    compress: bool,
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    let arguments = CliArguments::parse();
    log::debug!("{:?}", arguments);

    let (render_arguments, pdf_bytes) = match &arguments.report {
        ReportCommand::Time(render_arguments) => {
            let renderer = renderer_from_arguments(render_arguments)?;
            let input = TimeReportInput::from_json_slice(&read_file(&render_arguments.input_path)?)?;
            (render_arguments, renderer.render_time_report(&input)?)
        }
        ReportCommand::Project(render_arguments) => {
            let renderer = renderer_from_arguments(render_arguments)?;
            let input =
                ProjectReportInput::from_json_slice(&read_file(&render_arguments.input_path)?)?;
            (render_arguments, renderer.render_project_report(&input)?)
        }
    };

    std::fs::write(&render_arguments.output_file_path, pdf_bytes).map_err(|error| {
        ContextError::with_error(ErrorKind::Io, "Failed to write the output file", &error)
    })?;
    log::info!(
        "Saved the report to the path: {:?}",
        render_arguments.output_file_path
    );

    Ok(())
}

fn renderer_from_arguments(arguments: &RenderArguments) -> Result<ReportRenderer, ContextError> {
    let mut configuration = match &arguments.configuration_path {
        Some(configuration_path) => RendererConfiguration::from_path(configuration_path)?,
        None => RendererConfiguration::default(),
    };
    configuration.compress |= arguments.compress;

    Ok(ReportRenderer::new(configuration))
}

fn read_file(path: &Path) -> Result<Vec<u8>, ContextError> {
    std::fs::read(path).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Io,
            format!("Failed to read the report data {:?}", path),
            &error,
        )
    })
}
