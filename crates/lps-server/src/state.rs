use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use lps_blob::{BlobStore, InMemoryBlobStore};
use lps_payload::{PayloadClientV2, PayloadService};
use lps_store::{DocumentStore, InMemoryDocumentStore};

use crate::config::{ServerConfig, SigningKeys};
use crate::error::ServerResult;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PayloadService>,
    /// Child-collection access goes through the capability client.
    pub client: PayloadClientV2,
    pub keys: Arc<SigningKeys>,
    /// Cancelled on shutdown; long-running calls observe it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        config: &ServerConfig,
    ) -> ServerResult<Self> {
        let service = Arc::new(PayloadService::new(store, blobs, config.payload.clone())?);
        Ok(Self {
            client: PayloadClientV2::from_service(service.clone()),
            service,
            keys: Arc::new(config.signing.keys()?),
            shutdown: CancellationToken::new(),
        })
    }

    /// State backed by the in-memory document and blob stores.
    pub fn in_memory(config: &ServerConfig) -> ServerResult<Self> {
        Self::new(
            Arc::new(InMemoryDocumentStore::with_config(config.store.clone())),
            Arc::new(InMemoryBlobStore::new()),
            config,
        )
    }
}
