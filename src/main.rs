use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use time::{macros::format_description, OffsetDateTime};

use purchase_log_report::{
    report::export_detail_csv, summarize, write_report, RecordExtractor, RunConfiguration,
    WorkDispatcher,
};

#[derive(Parser)]
#[command(name = "Purchase Log Report")]
#[command(about = "Extracts purchase records from folders of text logs and writes a multi-sheet summary workbook.")]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "config.txt", help = "Path to the key=value configuration file")]
    config: PathBuf,

    #[arg(short, long, default_value = "INFO", help = "Logging level (DEBUG, INFO, WARN, ERROR)")]
    log_level: String,

    #[arg(long, help = "Disable the progress bar")]
    no_progress: bool,
}

fn setup_logging(log_level_str: &str) -> Result<()> {
    let log_level = match log_level_str.to_uppercase().as_str() {
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARN" | "WARNING" => LevelFilter::Warn,
        "ERROR" => LevelFilter::Error,
        other => {
            eprintln!("Invalid log level '{}', defaulting to INFO.", other);
            LevelFilter::Info
        }
    };

    SimpleLogger::new()
        .with_level(log_level)
        .with_timestamp_format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .init()?;
    Ok(())
}

fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s {}ms", seconds, elapsed.subsec_millis())
    }
}

fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_else(|_| at.to_string())
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level)?;
    info!("Starting Purchase Log Report v{}", env!("CARGO_PKG_VERSION"));

    let config = RunConfiguration::load(&cli.config)
        .with_context(|| format!("Error reading configuration settings from {}", cli.config.display()))?;
    info!("Input directory: {}", config.input_root.display());
    info!("Report destination: {}", config.report_path.display());

    let dispatcher = WorkDispatcher::new(
        RecordExtractor::new(),
        config.partition_size,
        &config.file_extension,
    )
    .with_progress(!cli.no_progress);

    let started_at = now();
    let processing_start_time = Instant::now();
    let dispatch = dispatcher
        .run(&config.input_root)
        .with_context(|| format!("Failed to process {}", config.input_root.display()))?;
    let processing_duration = processing_start_time.elapsed();
    let finished_at = now();

    info!("--- Execution Summary ---");
    info!(" Start Time: {}", format_timestamp(started_at));
    info!(" End Time: {}", format_timestamp(finished_at));
    info!(" Total Execution Time: {}", format_elapsed(processing_duration));
    info!(" Number of Threads Used: {}", dispatch.worker_count);
    info!(" Folders: {}, Input Files: {}", dispatch.folder_count, dispatch.file_count);
    dispatch.stats.log_current_stats("Final");

    let files_with_errors = dispatch.files_with_errors();
    if files_with_errors > 0 {
        warn!("{} files encountered errors during processing.", files_with_errors);
        for err in dispatch.errors.iter().take(5) {
            warn!("  {}", err);
        }
        if dispatch.errors.len() > 5 {
            warn!("  ... and {} more errors not shown here.", dispatch.errors.len() - 5);
        }
    }

    let store = summarize(&dispatch.records);
    store.log_summary();

    write_report(&dispatch.records, &store, &config.report_path)
        .with_context(|| format!("Failed to save report to {}", config.report_path.display()))?;

    if let Some(csv_path) = &config.output_path {
        if let Err(e) = export_detail_csv(&dispatch.records, csv_path) {
            error!("{}", e);
        }
    }

    if files_with_errors > 0 {
        Err(anyhow!(
            "Processing finished with errors in {} files; see log for details.",
            files_with_errors
        ))
    } else {
        info!("Processing finished.");
        Ok(())
    }
}
