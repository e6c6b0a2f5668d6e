use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use lps_types::PartitionKey;

use crate::error::{StoreError, StoreResult};
use crate::retry::RetryPolicy;
use crate::traits::{BatchOperation, DocumentStore};

/// Writes a set of operations as one atomic unit against one partition.
///
/// Transient failures are retried according to the [`RetryPolicy`]; every
/// attempt resubmits the complete batch, and since the store applies a batch
/// all-or-nothing a failed attempt leaves nothing behind to duplicate.
/// Anything else fails on the first attempt.
pub struct BatchWriter {
    store: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn write(
        &self,
        collection: &str,
        partition: &PartitionKey,
        operations: Vec<BatchOperation>,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        if operations.is_empty() {
            return Err(StoreError::InvalidArgument("batch is empty".into()));
        }
        let cap = self.store.max_batch_operations();
        if operations.len() > cap {
            return Err(StoreError::InvalidArgument(format!(
                "batch of {} operations exceeds limit of {cap}",
                operations.len()
            )));
        }

        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(StoreError::Cancelled);
            }
            attempt += 1;
            let result = self
                .store
                .execute_batch(collection, partition, operations.clone())
                .await;

            let (kind, retry_after, message) = match result {
                Ok(()) => {
                    debug!(
                        collection,
                        partition = %partition,
                        operations = operations.len(),
                        attempt,
                        "batch committed"
                    );
                    return Ok(());
                }
                Err(StoreError::Transient {
                    kind,
                    retry_after,
                    message,
                }) => (kind, retry_after, message),
                Err(other) => return Err(other),
            };

            if !self.policy.should_retry(attempt) {
                error!(
                    collection,
                    partition = %partition,
                    attempts = attempt,
                    status = kind.status_code(),
                    "batch retries exhausted"
                );
                return Err(StoreError::RetriesExhausted {
                    attempts: attempt,
                    kind,
                    message,
                });
            }

            let delay = self.policy.delay_for(attempt, retry_after);
            warn!(
                collection,
                partition = %partition,
                attempt,
                status = kind.status_code(),
                delay_ms = delay.as_millis() as u64,
                "transient batch failure, retrying"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(StoreError::Cancelled),
            }
        }
    }
}
