use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lps_types::{ContinuationToken, PartitionKey};

use crate::document::StoredDocument;
use crate::error::{StoreError, StoreResult, TransientKind};
use crate::predicate::Predicate;
use crate::traits::{BatchOperation, DocumentStore, Page};

/// Limits applied by [`InMemoryDocumentStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryConfig {
    /// Hard cap on documents per query page.
    pub max_page_size: usize,
    /// Hard cap on operations per batch.
    pub max_batch_operations: usize,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            max_batch_operations: 100,
        }
    }
}

/// Cursor state serialized into the opaque token.
#[derive(Serialize, Deserialize)]
struct Cursor {
    instance: Uuid,
    collection: String,
    partition: String,
    after: String,
}

#[derive(Default)]
struct Faults {
    batch: VecDeque<StoreError>,
    query: VecDeque<StoreError>,
    write: VecDeque<StoreError>,
    batch_attempts: u32,
}

type PartitionMap = BTreeMap<String, StoredDocument>;

/// In-memory partitioned document store.
///
/// Documents are ordered by id within a partition, so a page cursor is just
/// the last id emitted. Tokens are bound to the issuing instance, collection
/// and partition; replaying one anywhere else fails with
/// `InvalidContinuationToken`. Transient failures can be queued for tests of
/// the retry path.
pub struct InMemoryDocumentStore {
    instance: Uuid,
    config: InMemoryConfig,
    partitions: RwLock<HashMap<(String, PartitionKey), PartitionMap>>,
    faults: Mutex<Faults>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_config(InMemoryConfig::default())
    }

    pub fn with_config(config: InMemoryConfig) -> Self {
        Self {
            instance: Uuid::now_v7(),
            config,
            partitions: RwLock::new(HashMap::new()),
            faults: Mutex::new(Faults::default()),
        }
    }

    pub fn config(&self) -> &InMemoryConfig {
        &self.config
    }

    /// Number of documents in one partition of a collection.
    pub fn count(&self, collection: &str, partition: &PartitionKey) -> usize {
        self.partitions
            .read()
            .expect("lock poisoned")
            .get(&(collection.to_string(), partition.clone()))
            .map_or(0, BTreeMap::len)
    }

    /// Queue an error to be returned by the next batch attempt.
    pub fn inject_batch_failure(&self, err: StoreError) {
        self.faults.lock().expect("lock poisoned").batch.push_back(err);
    }

    /// Queue `n` transient failures of `kind` for upcoming batch attempts.
    pub fn fail_next_batches(&self, n: usize, kind: TransientKind) {
        let mut faults = self.faults.lock().expect("lock poisoned");
        for i in 0..n {
            faults
                .batch
                .push_back(StoreError::transient(kind, format!("injected failure {}", i + 1)));
        }
    }

    /// Queue an error to be returned by the next page query.
    pub fn inject_query_failure(&self, err: StoreError) {
        self.faults.lock().expect("lock poisoned").query.push_back(err);
    }

    /// Queue an error to be returned by the next single-document create,
    /// replace or delete.
    pub fn inject_write_failure(&self, err: StoreError) {
        self.faults.lock().expect("lock poisoned").write.push_back(err);
    }

    fn take_write_fault(&self) -> StoreResult<()> {
        match self.faults.lock().expect("lock poisoned").write.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Total `execute_batch` calls seen, including failed ones.
    pub fn batch_attempts(&self) -> u32 {
        self.faults.lock().expect("lock poisoned").batch_attempts
    }

    fn key(collection: &str, partition: &PartitionKey) -> (String, PartitionKey) {
        (collection.to_string(), partition.clone())
    }

    fn encode_cursor(&self, collection: &str, partition: &PartitionKey, after: &str) -> StoreResult<ContinuationToken> {
        let cursor = Cursor {
            instance: self.instance,
            collection: collection.to_string(),
            partition: partition.as_str().to_string(),
            after: after.to_string(),
        };
        Ok(ContinuationToken::new(hex::encode(serde_json::to_vec(&cursor)?)))
    }

    fn decode_cursor(
        &self,
        collection: &str,
        partition: &PartitionKey,
        token: &ContinuationToken,
    ) -> StoreResult<String> {
        let raw = hex::decode(token.as_str())
            .map_err(|e| StoreError::InvalidContinuationToken(e.to_string()))?;
        let cursor: Cursor = serde_json::from_slice(&raw)
            .map_err(|e| StoreError::InvalidContinuationToken(e.to_string()))?;
        if cursor.instance != self.instance {
            return Err(StoreError::InvalidContinuationToken(
                "token was issued by another store".into(),
            ));
        }
        if cursor.collection != collection || cursor.partition != partition.as_str() {
            return Err(StoreError::InvalidContinuationToken(format!(
                "token belongs to {}/{}",
                cursor.collection, cursor.partition
            )));
        }
        Ok(cursor.after)
    }

    fn not_found(collection: &str, partition: &PartitionKey, id: &str) -> StoreError {
        StoreError::NotFound {
            collection: collection.to_string(),
            partition: partition.to_string(),
            id: id.to_string(),
        }
    }

    fn conflict(collection: &str, partition: &PartitionKey, id: &str) -> StoreError {
        StoreError::Conflict {
            collection: collection.to_string(),
            partition: partition.to_string(),
            id: id.to_string(),
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply(
    docs: &mut PartitionMap,
    collection: &str,
    partition: &PartitionKey,
    op: BatchOperation,
) -> StoreResult<()> {
    match op {
        BatchOperation::Create(doc) => {
            if docs.contains_key(&doc.id) {
                return Err(InMemoryDocumentStore::conflict(collection, partition, &doc.id));
            }
            docs.insert(doc.id.clone(), doc);
        }
        BatchOperation::Upsert(doc) => {
            docs.insert(doc.id.clone(), doc);
        }
        BatchOperation::Replace(doc) => {
            if !docs.contains_key(&doc.id) {
                return Err(InMemoryDocumentStore::not_found(collection, partition, &doc.id));
            }
            docs.insert(doc.id.clone(), doc);
        }
        BatchOperation::Delete { id } => {
            if docs.remove(&id).is_none() {
                return Err(InMemoryDocumentStore::not_found(collection, partition, &id));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create(&self, collection: &str, doc: StoredDocument) -> StoreResult<()> {
        self.take_write_fault()?;
        let mut map = self.partitions.write().expect("lock poisoned");
        let docs = map.entry(Self::key(collection, &doc.partition)).or_default();
        if docs.contains_key(&doc.id) {
            return Err(Self::conflict(collection, &doc.partition, &doc.id));
        }
        docs.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn read(
        &self,
        collection: &str,
        partition: &PartitionKey,
        id: &str,
    ) -> StoreResult<Option<StoredDocument>> {
        let map = self.partitions.read().expect("lock poisoned");
        Ok(map
            .get(&Self::key(collection, partition))
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn replace(&self, collection: &str, doc: StoredDocument) -> StoreResult<()> {
        self.take_write_fault()?;
        let mut map = self.partitions.write().expect("lock poisoned");
        match map
            .get_mut(&Self::key(collection, &doc.partition))
            .and_then(|docs| docs.get_mut(&doc.id))
        {
            Some(slot) => {
                *slot = doc;
                Ok(())
            }
            None => Err(Self::not_found(collection, &doc.partition, &doc.id)),
        }
    }

    async fn delete(
        &self,
        collection: &str,
        partition: &PartitionKey,
        id: &str,
    ) -> StoreResult<bool> {
        self.take_write_fault()?;
        let mut map = self.partitions.write().expect("lock poisoned");
        let key = Self::key(collection, partition);
        let Some(docs) = map.get_mut(&key) else {
            return Ok(false);
        };
        let removed = docs.remove(id).is_some();
        if docs.is_empty() {
            map.remove(&key);
        }
        Ok(removed)
    }

    async fn query_page(
        &self,
        collection: &str,
        partition: &PartitionKey,
        predicate: &Predicate,
        continuation: Option<&ContinuationToken>,
        max_items: Option<usize>,
    ) -> StoreResult<Page> {
        if let Some(err) = self.faults.lock().expect("lock poisoned").query.pop_front() {
            return Err(err);
        }
        let after = continuation
            .map(|t| self.decode_cursor(collection, partition, t))
            .transpose()?;
        let limit = max_items
            .unwrap_or(self.config.max_page_size)
            .clamp(1, self.config.max_page_size.max(1));

        let map = self.partitions.read().expect("lock poisoned");
        let Some(docs) = map.get(&Self::key(collection, partition)) else {
            return Ok(Page::default());
        };
        let lower = match &after {
            Some(id) => Bound::Excluded(id.clone()),
            None => Bound::Unbounded,
        };
        // One extra match tells us whether another page exists.
        let mut documents: Vec<StoredDocument> = docs
            .range((lower, Bound::Unbounded))
            .map(|(_, doc)| doc)
            .filter(|doc| predicate.matches(&doc.body))
            .take(limit + 1)
            .cloned()
            .collect();

        let continuation = if documents.len() > limit {
            documents.truncate(limit);
            match documents.last() {
                Some(last) => Some(self.encode_cursor(collection, partition, &last.id)?),
                None => None,
            }
        } else {
            None
        };
        Ok(Page {
            documents,
            continuation,
        })
    }

    async fn execute_batch(
        &self,
        collection: &str,
        partition: &PartitionKey,
        operations: Vec<BatchOperation>,
    ) -> StoreResult<()> {
        {
            let mut faults = self.faults.lock().expect("lock poisoned");
            faults.batch_attempts += 1;
            if let Some(err) = faults.batch.pop_front() {
                return Err(err);
            }
        }
        if operations.len() > self.config.max_batch_operations {
            return Err(StoreError::InvalidArgument(format!(
                "batch of {} operations exceeds limit of {}",
                operations.len(),
                self.config.max_batch_operations
            )));
        }
        for op in &operations {
            if let Some(p) = op.partition() {
                if p != partition {
                    return Err(StoreError::InvalidArgument(format!(
                        "operation on {} targets partition {p}, batch is scoped to {partition}",
                        op.id()
                    )));
                }
            }
        }

        let key = Self::key(collection, partition);
        let mut map = self.partitions.write().expect("lock poisoned");
        let mut staged = map.get(&key).cloned().unwrap_or_default();
        for op in operations {
            apply(&mut staged, collection, partition, op)?;
        }
        if staged.is_empty() {
            map.remove(&key);
        } else {
            map.insert(key, staged);
        }
        Ok(())
    }

    fn max_batch_operations(&self) -> usize {
        self.config.max_batch_operations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pk(s: &str) -> PartitionKey {
        PartitionKey::new(s).unwrap()
    }

    fn doc(id: &str, partition: &str, kind: &str) -> StoredDocument {
        StoredDocument {
            id: id.into(),
            partition: pk(partition),
            body: json!({"id": id, "kind": kind}),
        }
    }

    async fn seed(store: &InMemoryDocumentStore, n: usize) {
        for i in 0..n {
            store
                .create("c", doc(&format!("d{i:03}"), "p", if i % 2 == 0 { "even" } else { "odd" }))
                .await
                .unwrap();
        }
    }

    // -----------------------------------------------------------------------
    // Point operations
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_read_replace_delete() {
        let store = InMemoryDocumentStore::new();
        store.create("c", doc("a", "p", "x")).await.unwrap();
        let read = store.read("c", &pk("p"), "a").await.unwrap().unwrap();
        assert_eq!(read.body["kind"], "x");

        store.replace("c", doc("a", "p", "y")).await.unwrap();
        let read = store.read("c", &pk("p"), "a").await.unwrap().unwrap();
        assert_eq!(read.body["kind"], "y");

        assert!(store.delete("c", &pk("p"), "a").await.unwrap());
        assert!(!store.delete("c", &pk("p"), "a").await.unwrap());
        assert!(store.read("c", &pk("p"), "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let store = InMemoryDocumentStore::new();
        store.create("c", doc("a", "p", "x")).await.unwrap();
        let err = store.create("c", doc("a", "p", "x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn partitions_are_isolated() {
        let store = InMemoryDocumentStore::new();
        store.create("c", doc("a", "p1", "x")).await.unwrap();
        store.create("c", doc("a", "p2", "x")).await.unwrap();
        assert!(store.read("c", &pk("p3"), "a").await.unwrap().is_none());
        assert_eq!(store.count("c", &pk("p1")), 1);
        assert_eq!(store.count("other", &pk("p1")), 0);
    }

    #[tokio::test]
    async fn replace_missing_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let err = store.replace("c", doc("a", "p", "x")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    // -----------------------------------------------------------------------
    // Paging
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn pages_are_bounded_and_cover_everything() {
        let store = InMemoryDocumentStore::with_config(InMemoryConfig {
            max_page_size: 4,
            ..Default::default()
        });
        seed(&store, 10).await;

        let mut seen = Vec::new();
        let mut token = None;
        loop {
            let page = store
                .query_page("c", &pk("p"), &Predicate::All, token.as_ref(), None)
                .await
                .unwrap();
            assert!(page.documents.len() <= 4);
            seen.extend(page.documents.into_iter().map(|d| d.id));
            match page.continuation {
                Some(t) => token = Some(t),
                None => break,
            }
        }
        let expected: Vec<String> = (0..10).map(|i| format!("d{i:03}")).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn exact_multiple_has_no_trailing_token() {
        let store = InMemoryDocumentStore::with_config(InMemoryConfig {
            max_page_size: 5,
            ..Default::default()
        });
        seed(&store, 5).await;
        let page = store
            .query_page("c", &pk("p"), &Predicate::All, None, None)
            .await
            .unwrap();
        assert_eq!(page.documents.len(), 5);
        assert!(page.continuation.is_none());
    }

    #[tokio::test]
    async fn predicate_filters_within_page() {
        let store = InMemoryDocumentStore::new();
        seed(&store, 6).await;
        let page = store
            .query_page("c", &pk("p"), &Predicate::eq("kind", "odd"), None, Some(2))
            .await
            .unwrap();
        let ids: Vec<_> = page.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["d001", "d003"]);
        assert!(page.continuation.is_some());
    }

    #[tokio::test]
    async fn foreign_tokens_are_rejected() {
        let store = InMemoryDocumentStore::with_config(InMemoryConfig {
            max_page_size: 1,
            ..Default::default()
        });
        seed(&store, 3).await;
        let page = store
            .query_page("c", &pk("p"), &Predicate::All, None, None)
            .await
            .unwrap();
        let token = page.continuation.unwrap();

        let err = store
            .query_page("c", &pk("other"), &Predicate::All, Some(&token), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidContinuationToken(_)));

        let other = InMemoryDocumentStore::new();
        let err = other
            .query_page("c", &pk("p"), &Predicate::All, Some(&token), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidContinuationToken(_)));

        let garbage = ContinuationToken::new("not a cursor");
        let err = store
            .query_page("c", &pk("p"), &Predicate::All, Some(&garbage), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidContinuationToken(_)));
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let store = InMemoryDocumentStore::new();
        store.create("c", doc("b", "p", "x")).await.unwrap();
        let ops = vec![
            BatchOperation::Create(doc("a", "p", "x")),
            BatchOperation::Create(doc("b", "p", "x")),
        ];
        let err = store.execute_batch("c", &pk("p"), ops).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert!(store.read("c", &pk("p"), "a").await.unwrap().is_none());
        assert_eq!(store.count("c", &pk("p")), 1);
    }

    #[tokio::test]
    async fn batch_rejects_cross_partition_ops() {
        let store = InMemoryDocumentStore::new();
        let ops = vec![BatchOperation::Upsert(doc("a", "q", "x"))];
        let err = store.execute_batch("c", &pk("p"), ops).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn batch_rejects_oversize() {
        let store = InMemoryDocumentStore::with_config(InMemoryConfig {
            max_batch_operations: 2,
            ..Default::default()
        });
        let ops = (0..3)
            .map(|i| BatchOperation::Create(doc(&format!("d{i}"), "p", "x")))
            .collect();
        let err = store.execute_batch("c", &pk("p"), ops).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn injected_faults_are_consumed_in_order() {
        let store = InMemoryDocumentStore::new();
        store.fail_next_batches(1, TransientKind::RateLimited);
        let ops = vec![BatchOperation::Create(doc("a", "p", "x"))];
        let err = store
            .execute_batch("c", &pk("p"), ops.clone())
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.count("c", &pk("p")), 0);

        store.execute_batch("c", &pk("p"), ops).await.unwrap();
        assert_eq!(store.count("c", &pk("p")), 1);
        assert_eq!(store.batch_attempts(), 2);
    }

    #[tokio::test]
    async fn injected_write_fault_fails_one_write() {
        let store = InMemoryDocumentStore::new();
        store.create("c", doc("a", "p", "x")).await.unwrap();
        store.inject_write_failure(StoreError::transient(TransientKind::ServiceUnavailable, "down"));

        let err = store.replace("c", doc("a", "p", "y")).await.unwrap_err();
        assert!(err.is_transient());
        let kept = store.read("c", &pk("p"), "a").await.unwrap().unwrap();
        assert_eq!(kept, doc("a", "p", "x"));

        store.replace("c", doc("a", "p", "y")).await.unwrap();
        assert!(store.delete("c", &pk("p"), "a").await.unwrap());
    }
}
