//! renalrisk: CKD risk scoring from the command line.
//!
//! # Usage
//!
//! ```bash
//! renalrisk score [FILE|-]        # JSON object or array of measurements
//! renalrisk demo                  # register the demo cohort, print the roster
//! renalrisk trends <PATIENT_ID>   # lab trend series from the demo cohort
//! ```
//!
//! Results go to stdout as JSON; logs go to stderr (or a file, see
//! `RENALRISK_LOG_MODE`).

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use renalrisk::adapters::sanitize::SanitizingMakeWriter;
use renalrisk::adapters::InMemoryStorage;
use renalrisk::application::{load_model, seed_demo, RecordService, ScoringService};
use renalrisk::domain::parse_measurements;
use renalrisk::{EngineConfig, ValidationMode};

enum Command {
    /// `None` or `-` reads stdin
    Score(Option<PathBuf>),
    Demo,
    Trends(String),
}

fn usage() -> String {
    "Usage: renalrisk score [FILE|-] | renalrisk demo | renalrisk trends <PATIENT_ID>".to_string()
}

fn parse_args() -> Result<Command, String> {
    let mut args = std::env::args().skip(1);
    let command = args.next().ok_or_else(usage)?;

    let parsed = match command.as_str() {
        "score" => match args.next() {
            None => Command::Score(None),
            Some(p) if p == "-" => Command::Score(None),
            Some(p) => Command::Score(Some(PathBuf::from(p))),
        },
        "demo" => Command::Demo,
        "trends" => Command::Trends(args.next().ok_or_else(usage)?),
        "-h" | "--help" => return Err(usage()),
        other => return Err(format!("Unknown command '{other}'\n{}", usage())),
    };

    if args.next().is_some() {
        return Err(usage());
    }
    Ok(parsed)
}

fn main() -> ExitCode {
    let command = match parse_args() {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::from(2);
        }
    };

    // Keep the guard alive so buffered log lines are flushed on exit.
    let _guard = match init_logging() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Install the tracing subscriber.
///
/// `RENALRISK_LOG_MODE=file` appends to `RENALRISK_LOG_FILE` (default
/// `renalrisk.log`); anything else logs to stderr, leaving stdout for results.
fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_mode = std::env::var("RENALRISK_LOG_MODE").unwrap_or_else(|_| "stderr".to_string());

    let (writer, guard) = if log_mode == "file" {
        let log_file =
            std::env::var("RENALRISK_LOG_FILE").unwrap_or_else(|_| "renalrisk.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: a missing directory surfaces as the open error below.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}

fn run(command: Command) -> Result<()> {
    let config = EngineConfig::from_env_or_default();
    tracing::info!(
        "Starting renalrisk (model={:?}, validation={:?})",
        config.model_variant,
        config.validation
    );

    let model = load_model(&config).context("Failed to build risk model")?;
    let scoring = ScoringService::new(model);

    match command {
        Command::Score(path) => score(&scoring, path, config.validation),
        Command::Demo => {
            let records = RecordService::new(Arc::new(InMemoryStorage::new()), scoring)
                .with_upload_limit(config.free_lab_uploads);
            seed_demo(&records)?;
            print_json(&records.roster()?)
        }
        Command::Trends(patient_id) => {
            let records = RecordService::new(Arc::new(InMemoryStorage::new()), scoring)
                .with_upload_limit(config.free_lab_uploads);
            seed_demo(&records)?;
            print_json(&records.trends(&patient_id)?)
        }
    }
}

fn score<M>(
    scoring: &ScoringService<M>,
    path: Option<PathBuf>,
    validation: ValidationMode,
) -> Result<()>
where
    M: renalrisk::ports::RiskModel + ?Sized,
{
    let input = match &path {
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read {}", p.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let measurements = parse_measurements(&input).context("Invalid measurement JSON")?;
    tracing::info!("Scoring {} measurement(s)", measurements.len());

    if validation == ValidationMode::Strict {
        let mut failures = Vec::new();
        for (i, m) in measurements.iter().enumerate() {
            if let Err(e) = renalrisk::domain::validate_measurement(m) {
                failures.push(format!("record {i}: {e}"));
            }
        }
        if !failures.is_empty() {
            bail!("Strict validation failed:\n{}", failures.join("\n"));
        }
    }

    print_json(&scoring.score_batch_parallel(&measurements))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
