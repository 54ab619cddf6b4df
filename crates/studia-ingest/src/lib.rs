//! Studia Ingest
//!
//! Tracks file submissions through the `uploading → processing → completed`
//! lifecycle. The [`IngestionTracker`] owns the submission collection; a
//! [`Transport`] implementation drives each submission asynchronously, and
//! display surfaces observe snapshots ([`IngestionTracker::list`]) or the
//! event stream ([`IngestionTracker::subscribe`]).

pub mod events;
pub mod tracker;
pub mod transport;

// Re-export commonly used types
pub use events::SubmissionEvent;
pub use tracker::{IngestionTracker, StageHandle, TrackerConfig};
pub use transport::{SimulatedTransport, Transport};
