//! Submission lifecycle events.
//!
//! Every observable change to a submission is published on the tracker's
//! broadcast channel, so display surfaces react to transitions instead of
//! polling snapshots.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmissionEvent {
    /// A submission was accepted and entered the `uploading` state.
    Accepted { id: Uuid, name: String },
    /// Upload progress advanced.
    Progressed { id: Uuid, progress_percent: u8 },
    /// Upload finished; processing began.
    ProcessingStarted { id: Uuid },
    /// The submission reached the terminal `completed` state.
    Completed { id: Uuid },
    /// The submission reached the terminal `failed` state.
    Failed { id: Uuid, error: String },
    /// The submission was removed by explicit request.
    Removed { id: Uuid },
}

impl SubmissionEvent {
    /// The submission this event concerns.
    pub fn submission_id(&self) -> Uuid {
        match self {
            SubmissionEvent::Accepted { id, .. }
            | SubmissionEvent::Progressed { id, .. }
            | SubmissionEvent::ProcessingStarted { id }
            | SubmissionEvent::Completed { id }
            | SubmissionEvent::Failed { id, .. }
            | SubmissionEvent::Removed { id } => *id,
        }
    }
}
