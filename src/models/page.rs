//! Render model for the single upload page.

use super::upload::UploadOutcome;
use serde::Serialize;

/// Shown in place of the listing when it cannot be fetched on a plain page load.
pub const LISTING_UNAVAILABLE: &str = "Unable to load the list of uploaded files.";

/// Everything the index template needs for one render.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct IndexPage {
    /// Outcome text of the submission that produced this page, if any.
    pub message: Option<String>,
    pub is_success: bool,
    /// Stored object names in backend order; `None` when the listing is omitted.
    pub files: Option<Vec<String>>,
    pub listing_error: Option<String>,
    /// Human-readable upload cap shown next to the file input.
    pub max_upload: String,
}

impl IndexPage {
    pub fn with_outcome(mut self, outcome: UploadOutcome) -> Self {
        self.is_success = outcome.success;
        self.message = Some(outcome.message);
        self
    }
}
