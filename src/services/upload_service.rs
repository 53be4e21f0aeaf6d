//! Upload workflow: validate one submission, hand it to storage, then
//! rebuild the page model from a fresh listing.

use crate::{
    models::{
        page::{IndexPage, LISTING_UNAVAILABLE},
        upload::{UploadOutcome, UploadRequest, ValidationError, format_size},
    },
    services::storage_service::FileStorage,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// The only text a user sees when storage fails.
pub const UPLOAD_FAILED_MESSAGE: &str =
    "An error occurred while uploading the file. Please try again.";

#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn FileStorage>,
    max_upload_bytes: usize,
}

impl UploadService {
    pub fn new(storage: Arc<dyn FileStorage>, max_upload_bytes: usize) -> Self {
        Self {
            storage,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Page for a plain load. A failed listing is reported in its place.
    pub async fn render_initial(&self) -> IndexPage {
        match self.storage.list().await {
            Ok(files) => IndexPage {
                files: Some(files),
                ..self.blank_page()
            },
            Err(err) => {
                warn!(error = %err, "could not list uploaded files");
                IndexPage {
                    listing_error: Some(LISTING_UNAVAILABLE.into()),
                    ..self.blank_page()
                }
            }
        }
    }

    /// Validate and store `upload`, then relist.
    ///
    /// At most one write reaches the backend; nothing is retried.
    pub async fn handle_submission(&self, upload: Option<UploadRequest>) -> IndexPage {
        let outcome = match self.validate(upload) {
            Ok(upload) => self.store(upload).await,
            Err(err) => err.into(),
        };
        self.finish(outcome).await
    }

    /// Page for a submission rejected before it could be fully read.
    pub async fn reject(&self, err: ValidationError) -> IndexPage {
        self.finish(err.into()).await
    }

    fn validate(&self, upload: Option<UploadRequest>) -> Result<UploadRequest, ValidationError> {
        let upload = upload.ok_or(ValidationError::Missing)?;
        if upload.file_name.trim().is_empty() {
            return Err(ValidationError::Missing);
        }
        if upload.is_empty() {
            return Err(ValidationError::Empty);
        }
        if upload.len() > self.max_upload_bytes {
            return Err(ValidationError::TooLarge {
                max_bytes: self.max_upload_bytes,
            });
        }
        Ok(upload)
    }

    async fn store(&self, upload: UploadRequest) -> UploadOutcome {
        info!(
            file_name = %upload.file_name,
            size_bytes = upload.len(),
            content_type = %upload.content_type,
            "uploading file"
        );

        let UploadRequest {
            file_name,
            content_type,
            data,
        } = upload;

        match self.storage.upload(data, &file_name, &content_type).await {
            Ok(_) => UploadOutcome::succeeded(&file_name),
            Err(err) => {
                error!(file_name = %file_name, error = %err, "file upload failed");
                UploadOutcome::failed(UPLOAD_FAILED_MESSAGE)
            }
        }
    }

    async fn finish(&self, outcome: UploadOutcome) -> IndexPage {
        let files = match self.storage.list().await {
            Ok(files) => Some(files),
            Err(err) => {
                warn!(error = %err, "could not list uploaded files after submission");
                None
            }
        };
        IndexPage {
            files,
            ..self.blank_page()
        }
        .with_outcome(outcome)
    }

    fn blank_page(&self) -> IndexPage {
        IndexPage {
            max_upload: format_size(self.max_upload_bytes),
            ..Default::default()
        }
    }
}
