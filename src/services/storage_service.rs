//! src/services/storage_service.rs
//!
//! Storage gateway: writes uploaded files into the configured container and
//! enumerates what is there. All durable state lives in the backend; this
//! file holds no cache and retries nothing.

use crate::services::container::BlobContainer;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::{Attribute, ObjectStore, PutMode, PutOptions, PutPayload, path::Path};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// UTC timestamp prefix of every stored name, e.g. `20240305_101530`.
pub const BLOB_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("container `{container}` request failed with status {status}: {detail}")]
    Provisioning {
        container: String,
        status: u16,
        detail: String,
    },
    #[error("`{name}` is not a valid object name: {source}")]
    InvalidName {
        name: String,
        source: object_store::path::Error,
    },
    #[error("{0} credentials cannot be used for container requests")]
    UnsupportedCredential(&'static str),
    #[error(transparent)]
    ObjectStore(#[from] object_store::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl StorageError {
    /// Short category, safe to expose without backend response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Provisioning { .. } => "provisioning",
            Self::InvalidName { .. } => "invalid_name",
            Self::UnsupportedCredential(_) => "unsupported_credential",
            Self::ObjectStore(_) => "object_store",
            Self::Http(_) => "http",
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// What the upload workflow needs from a storage backend.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `data` under a freshly generated name and return that name.
    async fn upload(
        &self,
        data: Bytes,
        original_name: &str,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Names of every object in the container, in backend order.
    async fn list(&self) -> StorageResult<Vec<String>>;
}

/// [`FileStorage`] over a single [`BlobContainer`].
///
/// The container is provisioned lazily on each upload. Listing a container
/// that does not exist yet yields no names.
#[derive(Clone)]
pub struct BlobStorageService {
    container: Arc<dyn BlobContainer>,
    clock: fn() -> DateTime<Utc>,
}

impl BlobStorageService {
    pub fn new(container: Arc<dyn BlobContainer>) -> Self {
        Self {
            container,
            clock: Utc::now,
        }
    }

    pub fn container_name(&self) -> &str {
        self.container.name()
    }
}

#[async_trait]
impl FileStorage for BlobStorageService {
    async fn upload(
        &self,
        data: Bytes,
        original_name: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        let blob_name = blob_name((self.clock)(), original_name);
        let location = Path::parse(&blob_name).map_err(|source| StorageError::InvalidName {
            name: blob_name.clone(),
            source,
        })?;

        if self.container.create_if_not_exists().await? {
            info!(container = %self.container.name(), "provisioned upload container");
        }

        let mut opts = PutOptions {
            mode: PutMode::Overwrite,
            ..Default::default()
        };
        opts.attributes
            .insert(Attribute::ContentType, content_type.to_string().into());

        let size_bytes = data.len();
        self.container
            .store()
            .put_opts(&location, PutPayload::from(data), opts)
            .await?;

        info!(
            container = %self.container.name(),
            blob_name = %blob_name,
            size_bytes,
            "file stored"
        );
        Ok(blob_name)
    }

    async fn list(&self) -> StorageResult<Vec<String>> {
        if !self.container.exists().await? {
            debug!(container = %self.container.name(), "container missing, nothing to list");
            return Ok(Vec::new());
        }

        let store = self.container.store();
        let listed = store
            .list(None)
            .map_ok(|meta| meta.location.to_string())
            .try_collect::<Vec<_>>()
            .await;

        match listed {
            Ok(names) => Ok(names),
            Err(object_store::Error::NotFound { .. }) => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Stored name for `original_name` uploaded at `at`: `<yyyyMMdd_HHmmss>_<original>`.
pub fn blob_name(at: DateTime<Utc>, original_name: &str) -> String {
    format!("{}_{}", at.format(BLOB_TIMESTAMP_FORMAT), original_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::container::MemoryContainer;
    use chrono::TimeZone;
    use object_store::ObjectStoreExt;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 10, 15, 30).unwrap()
    }

    fn service() -> (BlobStorageService, Arc<MemoryContainer>) {
        let container = Arc::new(MemoryContainer::new("uploads"));
        let service = BlobStorageService {
            container: container.clone(),
            clock: fixed_clock,
        };
        (service, container)
    }

    #[test]
    fn name_is_timestamp_then_original() {
        assert_eq!(
            blob_name(fixed_clock(), "report.pdf"),
            "20240305_101530_report.pdf"
        );
        assert_eq!(
            blob_name(fixed_clock(), "archive.tar.gz"),
            "20240305_101530_archive.tar.gz"
        );
    }

    #[tokio::test]
    async fn list_on_missing_container_is_empty() {
        let (service, container) = service();
        assert!(service.list().await.unwrap().is_empty());
        assert!(!container.exists().await.unwrap());
    }

    #[tokio::test]
    async fn upload_provisions_container_and_stores_content_type() {
        let (service, container) = service();
        let name = service
            .upload(Bytes::from_static(b"%PDF-1.7"), "report.pdf", "application/pdf")
            .await
            .unwrap();
        assert_eq!(name, "20240305_101530_report.pdf");
        assert!(container.exists().await.unwrap());

        let stored = container.store().get(&Path::parse(&name).unwrap()).await.unwrap();
        assert_eq!(
            stored
                .attributes
                .get(&Attribute::ContentType)
                .map(|v| v.to_string())
                .as_deref(),
            Some("application/pdf")
        );
        assert_eq!(stored.bytes().await.unwrap(), Bytes::from_static(b"%PDF-1.7"));
    }

    #[tokio::test]
    async fn repeated_uploads_reuse_the_container() {
        let (service, _container) = service();
        service
            .upload(Bytes::from_static(b"one"), "a.txt", "text/plain")
            .await
            .unwrap();
        service
            .upload(Bytes::from_static(b"two"), "b.txt", "text/plain")
            .await
            .unwrap();
        assert_eq!(
            service.list().await.unwrap(),
            vec!["20240305_101530_a.txt", "20240305_101530_b.txt"]
        );
    }

    #[tokio::test]
    async fn same_second_same_name_overwrites() {
        let (service, container) = service();
        service
            .upload(Bytes::from_static(b"first"), "a.txt", "text/plain")
            .await
            .unwrap();
        let name = service
            .upload(Bytes::from_static(b"second"), "a.txt", "text/plain")
            .await
            .unwrap();

        assert_eq!(service.list().await.unwrap(), vec![name.clone()]);
        let stored = container.store().get(&Path::parse(&name).unwrap()).await.unwrap();
        assert_eq!(stored.bytes().await.unwrap(), Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn names_are_stored_verbatim() {
        let (service, container) = service();
        for original in ["Q1 #3.pdf", "100%.txt", "notes~draft.md"] {
            let name = service
                .upload(Bytes::from_static(b"x"), original, "text/plain")
                .await
                .unwrap();
            assert_eq!(name, format!("20240305_101530_{}", original));
            assert!(service.list().await.unwrap().contains(&name));

            let stored = container.store().head(&Path::parse(&name).unwrap()).await.unwrap();
            assert_eq!(stored.location.as_ref(), name);
        }
    }

    #[tokio::test]
    async fn unrepresentable_names_are_refused() {
        let (service, _container) = service();
        let err = service
            .upload(Bytes::from_static(b"x"), "a//b.txt", "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidName { .. }));
        assert_eq!(err.kind(), "invalid_name");
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn uploaded_name_appears_in_listing() {
        let container = Arc::new(MemoryContainer::new("uploads"));
        let service = BlobStorageService::new(container);
        let name = service
            .upload(Bytes::from_static(b"hello"), "notes.md", "text/markdown")
            .await
            .unwrap();
        assert!(name.ends_with("_notes.md"));
        assert!(service.list().await.unwrap().contains(&name));
    }
}
