use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Progress ceiling for an upload. A submission leaves `Uploading` only once
/// its progress is pinned at this value.
pub const PROGRESS_COMPLETE: u8 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl SubmissionStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Completed | SubmissionStatus::Failed)
    }
}

impl Display for SubmissionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SubmissionStatus::Uploading => write!(f, "uploading"),
            SubmissionStatus::Processing => write!(f, "processing"),
            SubmissionStatus::Completed => write!(f, "completed"),
            SubmissionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploading" => Ok(SubmissionStatus::Uploading),
            "processing" => Ok(SubmissionStatus::Processing),
            "completed" => Ok(SubmissionStatus::Completed),
            "failed" => Ok(SubmissionStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid submission status: {}", s)),
        }
    }
}

/// Request to submit a file for ingestion
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmissionRequest {
    /// Original filename
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub filename: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// Content type (MIME type); may be empty when unknown
    #[serde(default)]
    pub media_type: String,
}

/// One file accepted for ingestion, tracked through upload, processing,
/// and completion.
///
/// All lifecycle mutations go through the guarded methods below. Each method
/// returns whether it applied; an illegal transition is a no-op, so a stale
/// timer firing after the submission moved on (or was removed and replaced)
/// cannot corrupt state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub name: String,
    pub size_bytes: u64,
    pub media_type: String,
    pub progress_percent: u8,
    pub status: SubmissionStatus,
    /// Failure detail; set only on transition to `Failed`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the submission reaches a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Create a new submission in the initial `Uploading` state at 0%.
    pub fn new(name: String, size_bytes: u64, media_type: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            size_bytes,
            media_type,
            progress_percent: 0,
            status: SubmissionStatus::Uploading,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Raise upload progress to `percent`, capped at [`PROGRESS_COMPLETE`].
    ///
    /// Applies only while `Uploading` and only if the value actually
    /// increases; progress never decreases.
    pub fn apply_progress(&mut self, percent: u8) -> bool {
        if self.status != SubmissionStatus::Uploading {
            return false;
        }
        let next = percent.min(PROGRESS_COMPLETE);
        if next <= self.progress_percent {
            return false;
        }
        self.progress_percent = next;
        self.updated_at = Utc::now();
        true
    }

    /// Move from `Uploading` to `Processing`, pinning progress at 100.
    pub fn begin_processing(&mut self) -> bool {
        if self.status != SubmissionStatus::Uploading {
            return false;
        }
        self.progress_percent = PROGRESS_COMPLETE;
        self.status = SubmissionStatus::Processing;
        self.updated_at = Utc::now();
        true
    }

    /// Move from `Processing` to the terminal `Completed` state.
    pub fn complete(&mut self) -> bool {
        if self.status != SubmissionStatus::Processing {
            return false;
        }
        self.status = SubmissionStatus::Completed;
        let now = Utc::now();
        self.updated_at = now;
        self.completed_at = Some(now);
        true
    }

    /// Move from any non-terminal state to the terminal `Failed` state,
    /// attaching the failure detail.
    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = SubmissionStatus::Failed;
        self.error = Some(reason.into());
        let now = Utc::now();
        self.updated_at = now;
        self.completed_at = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> Submission {
        Submission::new("notes.pdf".to_string(), 2048, "application/pdf".to_string())
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SubmissionStatus::Uploading.to_string(), "uploading");
        assert_eq!(SubmissionStatus::Processing.to_string(), "processing");
        assert_eq!(SubmissionStatus::Completed.to_string(), "completed");
        assert_eq!(SubmissionStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            "uploading".parse::<SubmissionStatus>().unwrap(),
            SubmissionStatus::Uploading
        );
        assert_eq!(
            "processing".parse::<SubmissionStatus>().unwrap(),
            SubmissionStatus::Processing
        );
        assert_eq!(
            "completed".parse::<SubmissionStatus>().unwrap(),
            SubmissionStatus::Completed
        );
        assert_eq!(
            "failed".parse::<SubmissionStatus>().unwrap(),
            SubmissionStatus::Failed
        );
        assert!("invalid_status".parse::<SubmissionStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!SubmissionStatus::Uploading.is_terminal());
        assert!(!SubmissionStatus::Processing.is_terminal());
        assert!(SubmissionStatus::Completed.is_terminal());
        assert!(SubmissionStatus::Failed.is_terminal());
    }

    #[test]
    fn test_new_submission_initial_state() {
        let s = submission();
        assert_eq!(s.status, SubmissionStatus::Uploading);
        assert_eq!(s.progress_percent, 0);
        assert_eq!(s.error, None);
        assert_eq!(s.completed_at, None);
    }

    #[test]
    fn test_progress_is_monotonic_and_capped() {
        let mut s = submission();
        assert!(s.apply_progress(10));
        assert!(s.apply_progress(30));
        // Equal or lower values are rejected
        assert!(!s.apply_progress(30));
        assert!(!s.apply_progress(5));
        assert_eq!(s.progress_percent, 30);
        // Values above the ceiling are capped
        assert!(s.apply_progress(250));
        assert_eq!(s.progress_percent, PROGRESS_COMPLETE);
        assert!(!s.apply_progress(250));
    }

    #[test]
    fn test_progress_rejected_outside_uploading() {
        let mut s = submission();
        s.begin_processing();
        assert!(!s.apply_progress(50));
        assert_eq!(s.progress_percent, PROGRESS_COMPLETE);

        let mut s = submission();
        s.fail("transport reset");
        assert!(!s.apply_progress(50));
        assert_eq!(s.progress_percent, 0);
    }

    #[test]
    fn test_begin_processing_pins_progress() {
        let mut s = submission();
        s.apply_progress(70);
        assert!(s.begin_processing());
        assert_eq!(s.status, SubmissionStatus::Processing);
        assert_eq!(s.progress_percent, PROGRESS_COMPLETE);
        // Not applicable twice
        assert!(!s.begin_processing());
    }

    #[test]
    fn test_complete_requires_processing() {
        let mut s = submission();
        // Cannot skip the processing stage
        assert!(!s.complete());
        assert!(s.begin_processing());
        assert!(s.complete());
        assert_eq!(s.status, SubmissionStatus::Completed);
        assert!(s.completed_at.is_some());
        // Terminal: no further transition
        assert!(!s.complete());
        assert!(!s.begin_processing());
    }

    #[test]
    fn test_fail_from_any_non_terminal_state() {
        let mut s = submission();
        assert!(s.fail("connection reset"));
        assert_eq!(s.status, SubmissionStatus::Failed);
        assert_eq!(s.error.as_deref(), Some("connection reset"));

        let mut s = submission();
        s.begin_processing();
        assert!(s.fail("extraction crashed"));
        assert_eq!(s.status, SubmissionStatus::Failed);
    }

    #[test]
    fn test_fail_is_terminal() {
        let mut s = submission();
        s.fail("first");
        assert!(!s.fail("second"));
        assert_eq!(s.error.as_deref(), Some("first"));
        assert!(!s.complete());
        assert!(!s.begin_processing());
    }

    #[test]
    fn test_request_validation() {
        let ok = SubmissionRequest {
            filename: "notes.pdf".to_string(),
            size_bytes: 2048,
            media_type: "application/pdf".to_string(),
        };
        assert!(ok.validate().is_ok());

        let empty = SubmissionRequest {
            filename: String::new(),
            size_bytes: 2048,
            media_type: String::new(),
        };
        assert!(empty.validate().is_err());

        let long = SubmissionRequest {
            filename: "x".repeat(256),
            size_bytes: 0,
            media_type: String::new(),
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_status_serde_round_trip() {
        let json = serde_json::to_string(&SubmissionStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let status: SubmissionStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, SubmissionStatus::Failed);
    }
}
