//! Ingestion tracker: submission collection, timer-driven advancement, and
//! cancellation.
//!
//! The tracker exclusively owns its submissions. `submit`, `remove`, `fail`,
//! `get`, and `list` are synchronous and non-blocking; the asynchronous part
//! is the per-submission driver task spawned on `submit`, which advances the
//! submission through its lifecycle via the configured [`Transport`].
//! Removal cancels the driver, and every mutation goes through the guarded
//! transitions on [`Submission`], so a driver firing after its submission was
//! removed or failed observes a no-op instead of mutating stale state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use validator::Validate;

use studia_core::{
    AppError, IngestConfig, LogLevel, Submission, SubmissionRequest, SubmissionStatus,
};

use crate::events::SubmissionEvent;
use crate::transport::{SimulatedTransport, Transport};

#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Upload progress step applied per tick, in percentage points.
    pub progress_step_percent: u8,
    /// Interval between upload progress ticks.
    pub progress_tick: Duration,
    /// Delay between a finished upload and the start of processing.
    pub processing_delay: Duration,
    /// Delay between the start of processing and completion.
    pub completion_delay: Duration,
    /// Per-file stagger applied to batch submissions.
    pub batch_stagger: Duration,
    /// Capacity of the event channel; lagging subscribers lose oldest events.
    pub event_buffer_size: usize,
}

impl From<&IngestConfig> for TrackerConfig {
    fn from(config: &IngestConfig) -> Self {
        Self {
            progress_step_percent: config.progress_step_percent,
            progress_tick: Duration::from_millis(config.progress_tick_ms),
            processing_delay: Duration::from_millis(config.processing_delay_ms),
            completion_delay: Duration::from_millis(config.completion_delay_ms),
            batch_stagger: Duration::from_millis(config.batch_stagger_ms),
            event_buffer_size: config.event_buffer_size,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

struct Entry {
    submission: Submission,
    cancel: CancellationToken,
}

/// A poisoned lock cannot expose a torn update: every mutation is a single
/// guarded transition on one entry.
fn lock_entries(state: &Mutex<Vec<Entry>>) -> MutexGuard<'_, Vec<Entry>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct IngestionTracker {
    state: Arc<Mutex<Vec<Entry>>>,
    events: broadcast::Sender<SubmissionEvent>,
    transport: Arc<dyn Transport>,
    config: TrackerConfig,
}

impl IngestionTracker {
    /// Create a tracker driven by the [`SimulatedTransport`] built from
    /// `config`'s timings.
    pub fn new(config: TrackerConfig) -> Self {
        let transport = Arc::new(SimulatedTransport::from_config(&config));
        Self::with_transport(config, transport)
    }

    /// Create a tracker driven by a custom transport (e.g. a real upload and
    /// processing backend). The status contract is unchanged: the tracker
    /// marks the submission completed when `Transport::run` returns `Ok`,
    /// failed when it returns `Err`.
    pub fn with_transport(config: TrackerConfig, transport: Arc<dyn Transport>) -> Self {
        let (events, _rx) = broadcast::channel(config.event_buffer_size);
        Self {
            state: Arc::new(Mutex::new(Vec::new())),
            events,
            transport,
            config,
        }
    }

    /// Subscribe to submission lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.events.subscribe()
    }

    /// Accept a file for ingestion and start driving it through the
    /// lifecycle. Returns the new submission's id.
    ///
    /// Must be called within a Tokio runtime: the driver task is spawned
    /// here. Only request well-formedness is checked; file acceptance policy
    /// (size caps, allowed types) is the caller's concern.
    pub fn submit(&self, request: SubmissionRequest) -> Result<Uuid, AppError> {
        request.validate()?;
        Ok(self.accept(request, Duration::ZERO))
    }

    /// Accept several files at once, in order, staggering each driver start
    /// by the configured delay per index. All-or-nothing: if any request is
    /// malformed, none is accepted.
    pub fn submit_batch(
        &self,
        requests: Vec<SubmissionRequest>,
    ) -> Result<Vec<Uuid>, AppError> {
        for request in &requests {
            request.validate()?;
        }
        let ids = requests
            .into_iter()
            .enumerate()
            .map(|(index, request)| {
                self.accept(request, self.config.batch_stagger * index as u32)
            })
            .collect();
        Ok(ids)
    }

    fn accept(&self, request: SubmissionRequest, initial_delay: Duration) -> Uuid {
        let submission = Submission::new(
            request.filename.clone(),
            request.size_bytes,
            request.media_type.clone(),
        );
        let id = submission.id;
        let name = submission.name.clone();
        let cancel = CancellationToken::new();

        {
            let mut entries = lock_entries(&self.state);
            entries.push(Entry {
                submission,
                cancel: cancel.clone(),
            });
        }

        tracing::info!(
            submission_id = %id,
            filename = %name,
            size_bytes = request.size_bytes,
            media_type = %request.media_type,
            "Submission accepted"
        );
        let _ = self.events.send(SubmissionEvent::Accepted { id, name });

        self.spawn_driver(id, request, cancel, initial_delay);
        id
    }

    fn spawn_driver(
        &self,
        id: Uuid,
        request: SubmissionRequest,
        cancel: CancellationToken,
        initial_delay: Duration,
    ) {
        let handle = StageHandle {
            id,
            state: Arc::downgrade(&self.state),
            events: self.events.clone(),
            cancel: cancel.clone(),
        };
        let transport = Arc::clone(&self.transport);

        tokio::spawn(async move {
            if !initial_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(initial_delay) => {}
                }
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(submission_id = %id, "Driver cancelled");
                    return;
                }
                result = transport.run(&request, &handle) => result,
            };

            match result {
                Ok(()) => {
                    if handle.complete() {
                        tracing::info!(submission_id = %id, "Submission completed");
                    }
                }
                Err(e) => {
                    let recoverable = e.is_recoverable();
                    match e.log_level() {
                        LogLevel::Debug => tracing::debug!(
                            submission_id = %id, error = %e, recoverable, "Transport failed"
                        ),
                        LogLevel::Warn => tracing::warn!(
                            submission_id = %id, error = %e, recoverable, "Transport failed"
                        ),
                        LogLevel::Error => tracing::error!(
                            submission_id = %id, error = %e, recoverable, "Transport failed"
                        ),
                    }
                    handle.fail(&e.to_string());
                }
            }
        });
    }

    /// Remove a submission in any state. Cancels its pending driver so no
    /// later firing can mutate or resurrect the entry. Returns false (a
    /// no-op, not an error) if the id is unknown.
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = {
            let mut entries = lock_entries(&self.state);
            match entries.iter().position(|e| e.submission.id == id) {
                Some(index) => {
                    let entry = entries.remove(index);
                    entry.cancel.cancel();
                    true
                }
                None => false,
            }
        };
        if removed {
            tracing::info!(submission_id = %id, "Submission removed");
            let _ = self.events.send(SubmissionEvent::Removed { id });
        }
        removed
    }

    /// Map an out-of-band backend error onto the terminal `failed` state and
    /// stop the submission's driver. No-op on an unknown id or a submission
    /// already in a terminal state.
    pub fn fail(&self, id: Uuid, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let failed = {
            let mut entries = lock_entries(&self.state);
            match entries.iter_mut().find(|e| e.submission.id == id) {
                Some(entry) => {
                    if entry.submission.fail(reason.clone()) {
                        entry.cancel.cancel();
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        };
        if failed {
            tracing::warn!(submission_id = %id, error = %reason, "Submission failed");
            let _ = self.events.send(SubmissionEvent::Failed { id, error: reason });
        }
        failed
    }

    /// Snapshot of one submission.
    pub fn get(&self, id: Uuid) -> Result<Submission, AppError> {
        let entries = lock_entries(&self.state);
        entries
            .iter()
            .find(|e| e.submission.id == id)
            .map(|e| e.submission.clone())
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))
    }

    /// Snapshots of all current submissions, in acceptance order.
    pub fn list(&self) -> Vec<Submission> {
        let entries = lock_entries(&self.state);
        entries.iter().map(|e| e.submission.clone()).collect()
    }

    pub fn len(&self) -> usize {
        lock_entries(&self.state).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write access handed to a [`Transport`] for one submission.
///
/// Holds only a weak reference to the tracker state: a dropped tracker ends
/// its drivers. Every method is a guarded transition; once the submission is
/// removed, failed, or past the relevant stage, the method reports that and
/// the transport should stop.
pub struct StageHandle {
    id: Uuid,
    state: Weak<Mutex<Vec<Entry>>>,
    events: broadcast::Sender<SubmissionEvent>,
    cancel: CancellationToken,
}

impl StageHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// True once the submission was removed or failed out-of-band.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Raise upload progress. Returns whether the submission is still
    /// tracked and uploading; a `false` tells the transport to stop.
    pub fn set_progress(&self, percent: u8) -> bool {
        let state = match self.state.upgrade() {
            Some(state) => state,
            None => return false,
        };
        let event = {
            let mut entries = lock_entries(&state);
            match entries.iter_mut().find(|e| e.submission.id == self.id) {
                Some(entry) => {
                    if entry.submission.status != SubmissionStatus::Uploading {
                        return false;
                    }
                    if entry.submission.apply_progress(percent) {
                        Some(SubmissionEvent::Progressed {
                            id: self.id,
                            progress_percent: entry.submission.progress_percent,
                        })
                    } else {
                        None
                    }
                }
                None => return false,
            }
        };
        if let Some(event) = event {
            let _ = self.events.send(event);
        }
        true
    }

    /// Move the submission from `uploading` to `processing`, pinning its
    /// progress at 100. Returns whether the transition applied.
    pub fn begin_processing(&self) -> bool {
        let state = match self.state.upgrade() {
            Some(state) => state,
            None => return false,
        };
        let applied = {
            let mut entries = lock_entries(&state);
            match entries.iter_mut().find(|e| e.submission.id == self.id) {
                Some(entry) => entry.submission.begin_processing(),
                None => false,
            }
        };
        if applied {
            tracing::debug!(submission_id = %self.id, "Processing started");
            let _ = self
                .events
                .send(SubmissionEvent::ProcessingStarted { id: self.id });
        }
        applied
    }

    pub(crate) fn complete(&self) -> bool {
        let state = match self.state.upgrade() {
            Some(state) => state,
            None => return false,
        };
        let applied = {
            let mut entries = lock_entries(&state);
            match entries.iter_mut().find(|e| e.submission.id == self.id) {
                Some(entry) => entry.submission.complete(),
                None => false,
            }
        };
        if applied {
            let _ = self.events.send(SubmissionEvent::Completed { id: self.id });
        }
        applied
    }

    pub(crate) fn fail(&self, reason: &str) -> bool {
        let state = match self.state.upgrade() {
            Some(state) => state,
            None => return false,
        };
        let applied = {
            let mut entries = lock_entries(&state);
            match entries.iter_mut().find(|e| e.submission.id == self.id) {
                Some(entry) => entry.submission.fail(reason),
                None => false,
            }
        };
        if applied {
            let _ = self.events.send(SubmissionEvent::Failed {
                id: self.id,
                error: reason.to_string(),
            });
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(filename: &str) -> SubmissionRequest {
        SubmissionRequest {
            filename: filename.to_string(),
            size_bytes: 2048,
            media_type: "application/pdf".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn submit_creates_uploading_submission() {
        let tracker = IngestionTracker::new(TrackerConfig::default());
        let id = tracker.submit(request("notes.pdf")).unwrap();

        let submission = tracker.get(id).unwrap();
        assert_eq!(submission.name, "notes.pdf");
        assert_eq!(submission.status, SubmissionStatus::Uploading);
        assert_eq!(submission.progress_percent, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_rejects_malformed_request() {
        let tracker = IngestionTracker::new(TrackerConfig::default());
        let err = tracker.submit(request("")).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_batch_is_all_or_nothing() {
        let tracker = IngestionTracker::new(TrackerConfig::default());
        let result =
            tracker.submit_batch(vec![request("a.pdf"), request(""), request("b.pdf")]);
        assert!(result.is_err());
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn remove_unknown_id_is_a_noop() {
        let tracker = IngestionTracker::new(TrackerConfig::default());
        assert!(!tracker.remove(Uuid::new_v4()));
    }

    #[tokio::test(start_paused = true)]
    async fn get_unknown_id_is_not_found() {
        let tracker = IngestionTracker::new(TrackerConfig::default());
        let err = tracker.get(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_sees_accepted_event() {
        let tracker = IngestionTracker::new(TrackerConfig::default());
        let mut events = tracker.subscribe();
        let id = tracker.submit(request("notes.pdf")).unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            SubmissionEvent::Accepted {
                id,
                name: "notes.pdf".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fail_is_terminal_and_idempotent() {
        let tracker = IngestionTracker::new(TrackerConfig::default());
        let id = tracker.submit(request("notes.pdf")).unwrap();

        assert!(tracker.fail(id, "quota exceeded"));
        assert!(!tracker.fail(id, "again"));

        let submission = tracker.get(id).unwrap();
        assert_eq!(submission.status, SubmissionStatus::Failed);
        assert_eq!(submission.error.as_deref(), Some("quota exceeded"));
    }
}
