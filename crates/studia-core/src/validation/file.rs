//! File acceptance policy.
//!
//! The tracker itself accepts any well-formed submission request; whether a
//! file should be offered to it at all (size cap, allowed extensions and
//! content types) is the caller's decision. This module is that caller-side
//! facility, built from [`IngestConfig`](crate::IngestConfig) limits.

use std::path::Path;

use crate::error::AppError;

/// Common validation errors for submitted files
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::FileTooLarge { size, max } => {
                AppError::PayloadTooLarge { size, limit: max }
            }
            other => AppError::InvalidInput(other.to_string()),
        }
    }
}

/// Submitted file validator
///
/// Provides acceptance checks for study-material files without coupling to
/// how the file is later transported or processed.
pub struct FileValidator {
    max_file_size: u64,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl FileValidator {
    pub fn new(
        max_file_size: u64,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
            allowed_content_types,
        }
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate file extension
    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    /// Validate content type. An empty content type passes: the submitter may
    /// not know it, and the extension check still applies.
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        if content_type.is_empty() {
            return Ok(());
        }

        let normalized = content_type.to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Validate all aspects of a file
    pub fn validate_all(
        &self,
        filename: &str,
        content_type: &str,
        file_size: u64,
    ) -> Result<(), ValidationError> {
        self.validate_file_size(file_size)?;
        self.validate_extension(filename)?;
        self.validate_content_type(content_type)?;
        Ok(())
    }
}

impl From<&crate::IngestConfig> for FileValidator {
    fn from(config: &crate::IngestConfig) -> Self {
        Self::new(
            config.max_file_size_bytes,
            config.allowed_extensions.clone(),
            config.allowed_content_types.clone(),
        )
    }
}

/// Strip path components and unsafe characters from a user-supplied filename.
pub fn sanitize_filename(filename: &str) -> String {
    const MAX: usize = 255;
    let path = Path::new(filename);
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    if base.contains("..") {
        return "invalid_filename".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim().is_empty() || s.len() < 3 {
        "file".to_string()
    } else {
        s
    }
}

/// Render a byte count for display surfaces ("2 KB", "1.5 MB").
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

/// Best-effort MIME type for a filename's extension. Returns an empty string
/// for unknown extensions (the tracker treats an empty media type as unknown).
pub fn content_type_for_extension(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IngestConfig;

    fn validator() -> FileValidator {
        FileValidator::from(&IngestConfig::default())
    }

    #[test]
    fn test_validate_file_size() {
        let v = validator();
        assert!(v.validate_file_size(2048).is_ok());
        assert!(matches!(
            v.validate_file_size(0),
            Err(ValidationError::EmptyFile)
        ));
        assert!(matches!(
            v.validate_file_size(11 * 1024 * 1024),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_extension() {
        let v = validator();
        assert!(v.validate_extension("notes.pdf").is_ok());
        assert!(v.validate_extension("SCAN.JPEG").is_ok());
        assert!(matches!(
            v.validate_extension("archive.zip"),
            Err(ValidationError::InvalidExtension { .. })
        ));
        assert!(matches!(
            v.validate_extension("no_extension"),
            Err(ValidationError::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_validate_content_type() {
        let v = validator();
        assert!(v.validate_content_type("application/pdf").is_ok());
        assert!(v.validate_content_type("Image/PNG").is_ok());
        // Unknown is allowed; the extension check still applies
        assert!(v.validate_content_type("").is_ok());
        assert!(matches!(
            v.validate_content_type("application/zip"),
            Err(ValidationError::InvalidContentType { .. })
        ));
    }

    #[test]
    fn test_validate_all() {
        let v = validator();
        assert!(v.validate_all("notes.pdf", "application/pdf", 2048).is_ok());
        assert!(v.validate_all("notes.pdf", "", 2048).is_ok());
        assert!(v
            .validate_all("notes.exe", "application/pdf", 2048)
            .is_err());
    }

    #[test]
    fn test_too_large_maps_to_payload_too_large() {
        let v = validator();
        let err: AppError = v.validate_file_size(11 * 1024 * 1024).unwrap_err().into();
        assert_eq!(err.error_code(), "PAYLOAD_TOO_LARGE");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("notes.pdf"), "notes.pdf");
        assert_eq!(sanitize_filename("/tmp/notes.pdf"), "notes.pdf");
        assert_eq!(sanitize_filename("my notes!.pdf"), "my_notes_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "invalid_filename");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 bytes");
        assert_eq!(format_file_size(512), "512 bytes");
        assert_eq!(format_file_size(2048), "2.00 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for_extension("notes.pdf"), "application/pdf");
        assert_eq!(content_type_for_extension("scan.JPG"), "image/jpeg");
        assert_eq!(content_type_for_extension("data.bin"), "");
        assert_eq!(content_type_for_extension("no_extension"), "");
    }
}
