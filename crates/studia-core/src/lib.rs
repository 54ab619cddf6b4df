//! Studia Core Library
//!
//! This crate provides core domain models, error types, configuration, and validation
//! that are shared across all Studia ingestion components.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::IngestConfig;
pub use error::{AppError, LogLevel};
pub use models::{Submission, SubmissionRequest, SubmissionStatus};
pub use validation::{
    content_type_for_extension, format_file_size, sanitize_filename, FileValidator,
    ValidationError,
};
