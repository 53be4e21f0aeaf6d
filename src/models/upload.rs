//! A single browser submission and the outcome reported back for it.

use bytes::Bytes;
use thiserror::Error;

/// Content type assumed when the browser does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One file taken from a multipart form submission.
///
/// `file_name` and `content_type` come straight from the client and are
/// untrusted; they are only displayed, used for naming, and passed through
/// as metadata.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadRequest {
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.into()),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Input rejected before any storage call was made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a file.")]
    Missing,
    #[error("Please select a file. The selected file is empty.")]
    Empty,
    #[error("The file exceeds the maximum upload size of {}.", size_label(.max_bytes))]
    TooLarge { max_bytes: usize },
    #[error("The upload could not be read. Please try again.")]
    Unreadable,
}

/// Result of one upload attempt, shown on the next render only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub success: bool,
    pub message: String,
}

impl UploadOutcome {
    pub fn succeeded(file_name: &str) -> Self {
        Self {
            success: true,
            message: format!("File '{}' uploaded successfully!", file_name),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for UploadOutcome {
    fn from(err: ValidationError) -> Self {
        Self::failed(err.to_string())
    }
}

fn size_label(bytes: &usize) -> String {
    format_size(*bytes)
}

/// Render a byte count in the largest whole binary unit, e.g. `10 MiB`.
pub fn format_size(bytes: usize) -> String {
    const UNITS: [(usize, &str); 3] = [(1 << 30, "GiB"), (1 << 20, "MiB"), (1 << 10, "KiB")];
    for (factor, unit) in UNITS {
        if bytes >= factor && bytes % factor == 0 {
            return format!("{} {}", bytes / factor, unit);
        }
    }
    format!("{} bytes", bytes)
}
