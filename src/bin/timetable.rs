//! Command line front-end: parse local timetables or poll the upstream ones.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use timetable::schedule::{
    GroupMap, ParseReport, Snapshot, WeekTarget, compute_free_rooms, extract_teachers,
    format_timestamp,
};
use timetable::ingest::{JsonDirStore, ScheduleStore};
use timetable::{AppConfig, Error, Result};

/// Weekly timetable ingestion
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse local .xls files and write one snapshot
    Parse {
        /// Timetable workbooks, parsed in order into one group map
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output directory (overrides the configured one)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Poll the configured sources and write a snapshot on every change
    #[cfg(feature = "http")]
    Watch,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match load_config(cli.config.as_ref()) {
        Ok(config) => match cli.command {
            Commands::Parse { files, out } => parse(&config, &files, out).await,
            #[cfg(feature = "http")]
            Commands::Watch => watch(&config).await,
        },
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_file(path),
        None => Ok(AppConfig::default()),
    }
}

async fn parse(config: &AppConfig, files: &[PathBuf], out: Option<PathBuf>) -> Result<()> {
    let aggregator = config.aggregator()?;
    let mut groups = GroupMap::new();
    let mut report = ParseReport::default();

    for path in files {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot read file");
                continue;
            }
        };
        match aggregator.parse_bytes(&bytes, &mut groups) {
            Ok(file_report) => {
                tracing::info!(path = %path.display(), sheets = file_report.sheets, new_groups = file_report.new_groups, "parsed");
                report.merge(file_report);
            }
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "parse failed"),
        }
    }

    if groups.is_empty() {
        return Err(Error::Config("no groups found in the given files".to_string()));
    }

    let now = config.poll.local_now(Utc::now());
    let updated_at = format_timestamp(now);
    let rooms = aggregator.lexicon().rooms();
    let (free_rooms, teachers) = rayon::join(
        || compute_free_rooms(&groups, rooms),
        || extract_teachers(&groups, &updated_at),
    );
    let target = WeekTarget::from_dates(&report.dates, now.date());
    tracing::info!(groups = groups.len(), teachers = teachers.len(), week = ?report.week_number, ?target, "snapshot ready");

    let store = JsonDirStore::new(out.unwrap_or_else(|| config.out_dir.clone()));
    let snapshot = Snapshot::build(groups, free_rooms, teachers, target, now)?
        .with_academic_week(report.week_number);
    for (key, value) in snapshot.entries() {
        store.put(key, value).await?;
    }
    tracing::info!(dir = %store.dir().display(), "snapshot written");
    Ok(())
}

#[cfg(feature = "http")]
async fn watch(config: &AppConfig) -> Result<()> {
    use timetable::ingest::{HttpSource, IngestionCycle};

    tracing::info!(sources = config.sources.len(), "starting polling loop");
    let cycle = IngestionCycle::new(
        HttpSource::new()?,
        JsonDirStore::new(config.out_dir.clone()),
        config.sources.clone(),
        config.aggregator()?,
    );

    loop {
        let now = Utc::now();
        if let Err(err) = cycle.run_once(config.poll.local_now(now)).await {
            tracing::error!(error = %err, "cycle failed");
        }
        let pause = config.poll.interval_at(Utc::now());
        tracing::debug!(?pause, "sleeping");
        tokio::time::sleep(pause).await;
    }
}
