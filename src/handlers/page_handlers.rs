//! The upload page.
//!
//! - GET  /  -> current listing
//! - POST /  -> multipart upload (field `file`), then the same page with an outcome
//!
//! Both always answer `200` with HTML; failures are shown on the page.

use crate::{
    errors::AppError,
    models::{
        page::IndexPage,
        upload::{UploadRequest, ValidationError},
    },
    state::AppState,
};
use axum::{
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::Html,
};
use bytes::BytesMut;
use tracing::warn;

/// Form field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

/// `GET /`
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let page = state.uploads.render_initial().await;
    render(&state, &page)
}

/// `POST /`
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Html<String>, AppError> {
    let max_bytes = state.uploads.max_upload_bytes();
    let page = match multipart {
        Ok(multipart) => match read_upload(multipart, max_bytes).await {
            Ok(upload) => state.uploads.handle_submission(upload).await,
            Err(err) => state.uploads.reject(err).await,
        },
        Err(rejection) => {
            warn!(error = %rejection, "upload request was not multipart");
            state.uploads.reject(ValidationError::Missing).await
        }
    };
    render(&state, &page)
}

fn render(state: &AppState, page: &IndexPage) -> Result<Html<String>, AppError> {
    Ok(Html(state.views.render_index(page)?))
}

/// Pull the `file` field out of the form, buffering at most `max_bytes`.
///
/// Reading stops as soon as the cap is crossed. A form without a file (or
/// with an empty file name, which is what browsers send when nothing was
/// picked) yields `None`.
async fn read_upload(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<Option<UploadRequest>, ValidationError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| read_error(err, max_bytes))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            return Ok(None);
        }
        let content_type = field.content_type().map(str::to_string);

        let mut data = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|err| read_error(err, max_bytes))?
        {
            if data.len() + chunk.len() > max_bytes {
                return Err(ValidationError::TooLarge { max_bytes });
            }
            data.extend_from_slice(&chunk);
        }

        return Ok(Some(UploadRequest::new(
            file_name,
            content_type,
            data.freeze(),
        )));
    }

    Ok(None)
}

fn read_error(err: MultipartError, max_bytes: usize) -> ValidationError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::TooLarge { max_bytes }
    } else {
        warn!(error = %err, "failed to read multipart upload");
        ValidationError::Unreadable
    }
}
