//! Container handles: the namespace a [`BlobStorageService`](super::storage_service::BlobStorageService)
//! writes into, plus the container-level calls `object_store` does not cover.

use crate::services::storage_service::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use object_store::{
    ObjectStore,
    azure::{AzureCredential, AzureCredentialProvider, MicrosoftAzureBuilder},
    memory::InMemory,
};
use reqwest::{Client, Method, StatusCode, header};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::debug;

/// Blob REST API version sent with container-level requests.
const AZURE_API_VERSION: &str = "2023-11-03";

/// A named object container in some storage backend.
#[async_trait]
pub trait BlobContainer: Send + Sync {
    /// Container name as configured.
    fn name(&self) -> &str;

    /// Object-level access scoped to this container.
    fn store(&self) -> Arc<dyn ObjectStore>;

    /// Create the container unless it is already there.
    ///
    /// Returns `true` when this call created it. An existing container is not
    /// an error.
    async fn create_if_not_exists(&self) -> StorageResult<bool>;

    async fn exists(&self) -> StorageResult<bool>;
}

/// Azure Blob Storage container.
///
/// Object reads and writes go through [`object_store::azure::MicrosoftAzure`];
/// create/exists are plain Blob REST calls authorised with the credential the
/// store's own provider resolves from the environment (managed identity,
/// workload identity, SAS).
pub struct AzureContainer {
    name: String,
    url: String,
    store: Arc<dyn ObjectStore>,
    credentials: AzureCredentialProvider,
    http: Client,
}

impl AzureContainer {
    pub fn new(account: &str, container: &str, endpoint: &str) -> StorageResult<Self> {
        let store = MicrosoftAzureBuilder::from_env()
            .with_account(account)
            .with_container_name(container)
            .with_endpoint(endpoint.to_string())
            .with_allow_http(endpoint.starts_with("http://"))
            .build()?;
        let credentials = store.credentials().clone();

        Ok(Self {
            name: container.to_string(),
            url: container_url(endpoint, container),
            store: Arc::new(store),
            credentials,
            http: Client::new(),
        })
    }

    async fn container_request(&self, method: Method) -> StorageResult<reqwest::Response> {
        let credential = self.credentials.get_credential().await?;
        let request = self
            .http
            .request(method, &self.url)
            .query(&[("restype", "container")])
            .header("x-ms-version", AZURE_API_VERSION)
            .header(
                "x-ms-date",
                Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            )
            .header(header::CONTENT_LENGTH, "0");

        let request = match credential.as_ref() {
            AzureCredential::BearerToken(token) => request.bearer_auth(token),
            AzureCredential::SASToken(pairs) => request.query(pairs),
            _ => return Err(StorageError::UnsupportedCredential("shared access key")),
        };

        Ok(request.send().await?)
    }

    async fn provisioning_error(&self, response: reqwest::Response) -> StorageError {
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        StorageError::Provisioning {
            container: self.name.clone(),
            status,
            detail,
        }
    }
}

#[async_trait]
impl BlobContainer for AzureContainer {
    fn name(&self) -> &str {
        &self.name
    }

    fn store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    async fn create_if_not_exists(&self) -> StorageResult<bool> {
        let response = self.container_request(Method::PUT).await?;
        match create_outcome(response.status()) {
            Some(created) => {
                if created {
                    debug!(container = %self.name, "created container");
                }
                Ok(created)
            }
            None => Err(self.provisioning_error(response).await),
        }
    }

    async fn exists(&self) -> StorageResult<bool> {
        let response = self.container_request(Method::HEAD).await?;
        match exists_outcome(response.status()) {
            Some(exists) => Ok(exists),
            None => Err(self.provisioning_error(response).await),
        }
    }
}

/// Process-local container backed by [`InMemory`].
///
/// Starts out missing, like a freshly configured cloud container.
pub struct MemoryContainer {
    name: String,
    store: Arc<dyn ObjectStore>,
    created: AtomicBool,
}

impl MemoryContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: Arc::new(InMemory::new()),
            created: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl BlobContainer for MemoryContainer {
    fn name(&self) -> &str {
        &self.name
    }

    fn store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    async fn create_if_not_exists(&self) -> StorageResult<bool> {
        Ok(!self.created.swap(true, Ordering::SeqCst))
    }

    async fn exists(&self) -> StorageResult<bool> {
        Ok(self.created.load(Ordering::SeqCst))
    }
}

/// `Create Container` status: `Some(true)` created, `Some(false)` already there.
fn create_outcome(status: StatusCode) -> Option<bool> {
    match status {
        StatusCode::CREATED => Some(true),
        StatusCode::CONFLICT => Some(false),
        _ => None,
    }
}

/// `Get Container Properties` status: `Some(exists)`, or `None` on failure.
fn exists_outcome(status: StatusCode) -> Option<bool> {
    match status {
        status if status.is_success() => Some(true),
        StatusCode::NOT_FOUND => Some(false),
        _ => None,
    }
}

fn container_url(endpoint: &str, container: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), container)
}
