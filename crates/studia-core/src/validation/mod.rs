//! Validation modules

pub mod file;

pub use file::{
    content_type_for_extension, format_file_size, sanitize_filename, FileValidator,
    ValidationError,
};
