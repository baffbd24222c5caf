//! CLI entry point for the water consumption report generator.
//!
//! Provides subcommands for generating the full report for a date range,
//! analyzing an already-downloaded export, and downloading the raw export
//! CSV from the telemetry backend.

mod infra;
mod services;

use crate::infra::metam::client::MetamClient;
use crate::services::export_api::ExportApi;
use anyhow::{Context, Result, bail};
use chrono::{Local, Months, NaiveDate};
use clap::{Parser, Subcommand};
use hidro_report::{
    fetch::{BasicClient, fetch_bytes},
    output::{print_json, write_daily_csv, write_report_text, write_summary_json},
    parser::parse_readings,
    report::{NumberFormat, render_report},
    stats::ConsumptionReport,
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "hidro_report")]
#[command(about = "Water-meter consumption report generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the consumption report for a date range
    Report {
        /// First day of the range (YYYY-MM-DD); defaults to one month ago
        #[arg(short, long)]
        start: Option<NaiveDate>,

        /// Last day of the range (YYYY-MM-DD); defaults to yesterday
        #[arg(short, long)]
        end: Option<NaiveDate>,

        /// Local file or URL to read instead of calling the telemetry API
        #[arg(long, value_name = "FILE_OR_URL")]
        source: Option<String>,

        /// Directory to write the report outputs to
        #[arg(short, long, default_value = "reports")]
        output_dir: String,

        /// Use plain 1234.56 number formatting instead of 1.234,56
        #[arg(long, default_value_t = false)]
        plain_numbers: bool,
    },
    /// Analyze an export and print the summary as JSON
    Analyze {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// First day of the range (YYYY-MM-DD); defaults to one month ago
        #[arg(short, long)]
        start: Option<NaiveDate>,

        /// Last day of the range (YYYY-MM-DD); defaults to yesterday
        #[arg(short, long)]
        end: Option<NaiveDate>,
    },
    /// Download the raw CSV export for a date range
    Fetch {
        /// First day of the range (YYYY-MM-DD); defaults to one month ago
        #[arg(short, long)]
        start: Option<NaiveDate>,

        /// Last day of the range (YYYY-MM-DD); defaults to yesterday
        #[arg(short, long)]
        end: Option<NaiveDate>,

        /// File to save the export to
        #[arg(short, long, default_value = "export.csv")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/hidro_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("hidro_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            start,
            end,
            source,
            output_dir,
            plain_numbers,
        } => {
            let (start, end) = resolve_range(start, end)?;

            std::fs::create_dir_all(&output_dir)?;
            let out = Path::new(&output_dir);

            let bytes = match &source {
                Some(src) => fetcher(src).await?,
                None => {
                    let bytes = download_export(start, end).await?;
                    // Keep the raw export next to the generated report
                    std::fs::write(out.join("export.csv"), &bytes)?;
                    bytes
                }
            };

            let readings = parse_readings(&bytes)?;
            info!(readings = readings.len(), %start, %end, "export parsed, aggregating");

            let report = ConsumptionReport::compute(readings, start, end)?;

            let number_format = if plain_numbers {
                NumberFormat::plain()
            } else {
                NumberFormat::pt_br()
            };
            let stamp = Local::now().format("%d%m%y");
            let report_path = out.join(format!("report_{stamp}.md"));

            write_report_text(&report_path, &render_report(&report, &number_format))?;
            write_daily_csv(&out.join("daily_consumption.csv"), &report.daily)?;
            write_summary_json(&out.join("summary.json"), &report)?;

            info!(
                report = %report_path.display(),
                total = report.total,
                peak = report.peak.as_ref().map(|p| p.consumption),
                "report generated"
            );
        }
        Commands::Analyze { source, start, end } => {
            let (start, end) = resolve_range(start, end)?;
            let bytes = fetcher(&source).await?;
            let readings = parse_readings(&bytes)?;
            let report = ConsumptionReport::compute(readings, start, end)?;

            print_json(&report)?;
        }
        Commands::Fetch { start, end, output } => {
            let (start, end) = resolve_range(start, end)?;
            let bytes = download_export(start, end).await?;
            std::fs::write(&output, &bytes)?;

            info!(output, bytes = bytes.len(), "export saved");
        }
    }

    Ok(())
}

/// Applies the historical defaults (one month back through yesterday) and
/// validates the range. Dates on or after today only warn; readings for the
/// current day are typically still incomplete.
fn resolve_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(NaiveDate, NaiveDate)> {
    let today = Local::now().date_naive();
    let start = start.unwrap_or_else(|| {
        today
            .checked_sub_months(Months::new(1))
            .unwrap_or(today)
    });
    let end = end.unwrap_or_else(|| today.pred_opt().unwrap_or(today));

    if start > end {
        bail!("start date {start} is after end date {end}");
    }
    if end >= today {
        warn!(%end, "end date is not before today; the report may be incomplete");
    }

    Ok((start, end))
}

/// Loads export data from a local file path or fetches it over HTTP.
#[tracing::instrument(fields(source = %source))]
async fn fetcher(source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http") {
        let client = BasicClient::new();
        fetch_bytes(&client, source).await?
    } else {
        std::fs::read(source)?
    };
    Ok(bytes)
}

/// Resolves the export link via the telemetry API and downloads the CSV.
#[tracing::instrument(fields(start = %start, end = %end))]
async fn download_export(start: NaiveDate, end: NaiveDate) -> Result<Vec<u8>> {
    let api = MetamClient::from_env()?;
    let url = api.export_url(start, end).await?;
    info!("export link resolved, downloading");

    // The export link is pre-signed; no auth header on the download itself.
    let client = BasicClient::new();
    let bytes = fetch_bytes(&client, &url)
        .await
        .context("export download failed")?;

    info!(bytes = bytes.len(), "export downloaded");
    Ok(bytes)
}
