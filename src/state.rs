use crate::{
    services::{storage_service::FileStorage, upload_service::UploadService},
    views::Views,
};
use std::sync::Arc;

/// Shared by every handler; cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn FileStorage>,
    pub uploads: UploadService,
    pub views: Arc<Views>,
}

impl AppState {
    pub fn new(storage: Arc<dyn FileStorage>, max_upload_bytes: usize, views: Views) -> Self {
        Self {
            uploads: UploadService::new(storage.clone(), max_upload_bytes),
            storage,
            views: Arc::new(views),
        }
    }
}
