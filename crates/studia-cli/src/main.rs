//! Studia CLI: submit study materials and watch them move through the
//! ingestion pipeline.
//!
//! Configuration comes from the environment (see studia-core's IngestConfig);
//! a local .env file is honored.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use studia_cli::init_tracing;
use studia_core::{
    content_type_for_extension, format_file_size, sanitize_filename, AppError, FileValidator,
    IngestConfig, SubmissionRequest,
};
use studia_ingest::{IngestionTracker, SubmissionEvent, TrackerConfig};

#[derive(Parser)]
#[command(name = "studia", about = "Studia ingestion CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit files for ingestion and watch them through the pipeline
    Ingest {
        /// Paths of the files to submit
        files: Vec<PathBuf>,
        /// Print the final submission list as JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize submissions")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ingest { files, json } => ingest(files, json).await,
    }
}

async fn ingest(files: Vec<PathBuf>, json: bool) -> anyhow::Result<()> {
    if files.is_empty() {
        anyhow::bail!("No files given");
    }

    let config = IngestConfig::from_env().context("Load ingest configuration")?;
    let validator = FileValidator::from(&config);

    let mut requests = Vec::with_capacity(files.len());
    for path in &files {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Read metadata for {}", path.display()))?;
        let filename = sanitize_filename(
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default(),
        );
        let media_type = content_type_for_extension(&filename);
        validator
            .validate_all(&filename, media_type, metadata.len())
            .map_err(AppError::from)
            .with_context(|| format!("Rejected {}", path.display()))?;
        requests.push(SubmissionRequest {
            filename,
            size_bytes: metadata.len(),
            media_type: media_type.to_string(),
        });
    }

    let tracker = IngestionTracker::new(TrackerConfig::from(&config));
    let mut events = tracker.subscribe();
    let ids = tracker.submit_batch(requests)?;
    println!("Accepted {} file(s)", ids.len());

    loop {
        match events.recv().await {
            Ok(event) => match event {
                SubmissionEvent::Progressed {
                    id,
                    progress_percent,
                } => {
                    tracing::debug!(submission_id = %id, progress_percent, "Upload progress");
                }
                SubmissionEvent::ProcessingStarted { id } => {
                    println!("{}  processing", id);
                }
                SubmissionEvent::Completed { id } => {
                    println!("{}  completed", id);
                }
                SubmissionEvent::Failed { id, error } => {
                    println!("{}  failed: {}", id, error);
                }
                SubmissionEvent::Accepted { .. } | SubmissionEvent::Removed { .. } => {}
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event stream lagged");
            }
            Err(RecvError::Closed) => break,
        }
        if tracker.list().iter().all(|s| s.is_terminal()) {
            break;
        }
    }

    let submissions = tracker.list();
    if json {
        print_json(&submissions)?;
    } else {
        for s in &submissions {
            println!(
                "{}  {}  {}  {}",
                s.id,
                s.name,
                format_file_size(s.size_bytes),
                s.status
            );
        }
    }
    Ok(())
}
