//! Transport seam for submission advancement.
//!
//! The tracker does not know how bytes move or how processing happens; a
//! [`Transport`] drives one submission through its stages via the
//! [`StageHandle`] it is given. [`SimulatedTransport`] is the default
//! implementation: fixed-delay timers standing in for a real upload and
//! processing backend. A production transport replaces the delays with real
//! completion signals; the status contract stays the same.

use std::time::Duration;

use async_trait::async_trait;

use studia_core::{models::PROGRESS_COMPLETE, AppError, SubmissionRequest};

use crate::tracker::{StageHandle, TrackerConfig};

/// Drives one submission through upload and processing.
///
/// The tracker marks the submission `completed` when `run` returns `Ok`, and
/// `failed` (with the error detail attached) when it returns `Err`. `run`
/// races the submission's cancellation token inside the tracker, so it may
/// be dropped mid-await; in-run, a `false` from the handle means the
/// submission is gone or already past the stage, and the transport should
/// return `Ok` without further work.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn run(&self, file: &SubmissionRequest, handle: &StageHandle)
        -> Result<(), AppError>;
}

/// Fixed-delay transport reproducing the observed demo behavior: progress
/// ticks in fixed steps, then two staged delays for processing and
/// completion.
pub struct SimulatedTransport {
    progress_step_percent: u8,
    progress_tick: Duration,
    processing_delay: Duration,
    completion_delay: Duration,
}

impl SimulatedTransport {
    pub fn new(
        progress_step_percent: u8,
        progress_tick: Duration,
        processing_delay: Duration,
        completion_delay: Duration,
    ) -> Self {
        Self {
            // A zero step would never reach the ceiling
            progress_step_percent: progress_step_percent.max(1),
            progress_tick,
            processing_delay,
            completion_delay,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(
            config.progress_step_percent,
            config.progress_tick,
            config.processing_delay,
            config.completion_delay,
        )
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn run(
        &self,
        _file: &SubmissionRequest,
        handle: &StageHandle,
    ) -> Result<(), AppError> {
        let mut progress: u8 = 0;
        while progress < PROGRESS_COMPLETE {
            tokio::time::sleep(self.progress_tick).await;
            if handle.is_cancelled() {
                return Ok(());
            }
            progress = progress
                .saturating_add(self.progress_step_percent)
                .min(PROGRESS_COMPLETE);
            if !handle.set_progress(progress) {
                return Ok(());
            }
        }

        tokio::time::sleep(self.processing_delay).await;
        if !handle.begin_processing() {
            return Ok(());
        }

        tokio::time::sleep(self.completion_delay).await;
        Ok(())
    }
}
