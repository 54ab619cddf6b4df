//! Configuration module
//!
//! This module provides configuration for the ingestion tracker and its
//! validation layer, loaded from the environment with sensible defaults.

use std::env;

// Common constants
const PROGRESS_STEP_PERCENT: u8 = 10;
const PROGRESS_TICK_MS: u64 = 200;
const PROCESSING_DELAY_MS: u64 = 500;
const COMPLETION_DELAY_MS: u64 = 2000;
const BATCH_STAGGER_MS: u64 = 500;
const EVENT_BUFFER_SIZE: usize = 256;
const MAX_FILE_SIZE_MB: usize = 10;

const DEFAULT_ALLOWED_EXTENSIONS: &str = "pdf,doc,docx,txt,png,jpg,jpeg";
const DEFAULT_ALLOWED_CONTENT_TYPES: &str = "application/pdf,application/msword,\
application/vnd.openxmlformats-officedocument.wordprocessingml.document,\
text/plain,image/png,image/jpeg";

/// Ingestion service configuration
#[derive(Clone, Debug)]
pub struct IngestConfig {
    /// Upload progress step applied per tick, in percentage points.
    pub progress_step_percent: u8,
    /// Interval between upload progress ticks.
    pub progress_tick_ms: u64,
    /// Delay between a finished upload and the start of processing.
    pub processing_delay_ms: u64,
    /// Delay between the start of processing and completion.
    pub completion_delay_ms: u64,
    /// Per-file stagger applied to batch submissions.
    pub batch_stagger_ms: u64,
    /// Capacity of the submission event channel.
    pub event_buffer_size: usize,
    // File acceptance policy (enforced by callers, see validation module)
    pub max_file_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            progress_step_percent: PROGRESS_STEP_PERCENT,
            progress_tick_ms: PROGRESS_TICK_MS,
            processing_delay_ms: PROCESSING_DELAY_MS,
            completion_delay_ms: COMPLETION_DELAY_MS,
            batch_stagger_ms: BATCH_STAGGER_MS,
            event_buffer_size: EVENT_BUFFER_SIZE,
            max_file_size_bytes: (MAX_FILE_SIZE_MB * 1024 * 1024) as u64,
            allowed_extensions: parse_csv(DEFAULT_ALLOWED_EXTENSIONS),
            allowed_content_types: parse_csv(DEFAULT_ALLOWED_CONTENT_TYPES),
        }
    }
}

impl IngestConfig {
    /// Load configuration from the environment, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let progress_step_percent = env::var("INGEST_PROGRESS_STEP_PERCENT")
            .unwrap_or_else(|_| PROGRESS_STEP_PERCENT.to_string())
            .parse::<u8>()
            .unwrap_or(PROGRESS_STEP_PERCENT);

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let allowed_extensions = parse_csv(
            &env::var("ALLOWED_EXTENSIONS")
                .unwrap_or_else(|_| DEFAULT_ALLOWED_EXTENSIONS.to_string()),
        );

        let allowed_content_types = parse_csv(
            &env::var("ALLOWED_CONTENT_TYPES")
                .unwrap_or_else(|_| DEFAULT_ALLOWED_CONTENT_TYPES.to_string()),
        );

        let config = Self {
            progress_step_percent,
            progress_tick_ms: env::var("INGEST_PROGRESS_TICK_MS")
                .unwrap_or_else(|_| PROGRESS_TICK_MS.to_string())
                .parse()
                .unwrap_or(PROGRESS_TICK_MS),
            processing_delay_ms: env::var("INGEST_PROCESSING_DELAY_MS")
                .unwrap_or_else(|_| PROCESSING_DELAY_MS.to_string())
                .parse()
                .unwrap_or(PROCESSING_DELAY_MS),
            completion_delay_ms: env::var("INGEST_COMPLETION_DELAY_MS")
                .unwrap_or_else(|_| COMPLETION_DELAY_MS.to_string())
                .parse()
                .unwrap_or(COMPLETION_DELAY_MS),
            batch_stagger_ms: env::var("INGEST_BATCH_STAGGER_MS")
                .unwrap_or_else(|_| BATCH_STAGGER_MS.to_string())
                .parse()
                .unwrap_or(BATCH_STAGGER_MS),
            event_buffer_size: env::var("INGEST_EVENT_BUFFER_SIZE")
                .unwrap_or_else(|_| EVENT_BUFFER_SIZE.to_string())
                .parse()
                .unwrap_or(EVENT_BUFFER_SIZE),
            max_file_size_bytes: (max_file_size_mb * 1024 * 1024) as u64,
            allowed_extensions,
            allowed_content_types,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings under which the tracker cannot make progress.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.progress_step_percent == 0 {
            return Err(anyhow::anyhow!(
                "INGEST_PROGRESS_STEP_PERCENT must be greater than 0"
            ));
        }
        if self.event_buffer_size == 0 {
            return Err(anyhow::anyhow!(
                "INGEST_EVENT_BUFFER_SIZE must be greater than 0"
            ));
        }
        Ok(())
    }
}

fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
