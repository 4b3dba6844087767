/// Mutation batching and the commit protocol
use crate::convert::*;
use crate::error::{ClientError, Result};
use crate::service::DatastoreRpc;
use bytes::Bytes;
use dstore_core::{DatasetConfig, Entity, Key};
use dstore_proto::{self as proto, mutation::Operation};
use tracing::debug;

/// A single pending write
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Create; fails server-side if the entity exists
    Insert(Entity),
    /// Replace; fails server-side if the entity does not exist
    Update(Entity),
    /// Create or replace
    Upsert(Entity),
    Delete(Key),
}

impl Mutation {
    fn to_proto(&self) -> proto::Mutation {
        let operation = match self {
            Mutation::Insert(entity) => Operation::Insert(entity_to_proto(entity)),
            Mutation::Update(entity) => Operation::Update(entity_to_proto(entity)),
            Mutation::Upsert(entity) => Operation::Upsert(entity_to_proto(entity)),
            Mutation::Delete(key) => Operation::Delete(key_to_proto(key)),
        };
        proto::Mutation {
            operation: Some(operation),
        }
    }

    fn key_mut(&mut self) -> &mut Key {
        match self {
            Mutation::Insert(entity) | Mutation::Update(entity) | Mutation::Upsert(entity) => {
                entity.key_mut()
            }
            Mutation::Delete(key) => key,
        }
    }
}

/// Ordered set of mutations sent as one commit request
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    mutations: Vec<Mutation>,
}

impl MutationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue entities to be created
    pub fn insert<I>(&mut self, entities: I) -> &mut Self
    where
        I: IntoIterator<Item = Entity>,
    {
        self.mutations.extend(entities.into_iter().map(Mutation::Insert));
        self
    }

    /// Queue entities to replace existing ones
    pub fn update<I>(&mut self, entities: I) -> &mut Self
    where
        I: IntoIterator<Item = Entity>,
    {
        self.mutations.extend(entities.into_iter().map(Mutation::Update));
        self
    }

    /// Queue entities to be created or replaced
    pub fn upsert<I>(&mut self, entities: I) -> &mut Self
    where
        I: IntoIterator<Item = Entity>,
    {
        self.mutations.extend(entities.into_iter().map(Mutation::Upsert));
        self
    }

    /// Alias for [`upsert`](Self::upsert)
    pub fn save<I>(&mut self, entities: I) -> &mut Self
    where
        I: IntoIterator<Item = Entity>,
    {
        self.upsert(entities)
    }

    /// Queue keys (or entities, by their key) to be deleted
    pub fn delete<I, K>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.mutations
            .extend(keys.into_iter().map(|key| Mutation::Delete(key.into())));
        self
    }

    pub fn push(&mut self, mutation: Mutation) -> &mut Self {
        self.mutations.push(mutation);
        self
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Give every key without a project or namespace the dataset's defaults
    pub fn stamp_keys(&mut self, config: &DatasetConfig) {
        for mutation in &mut self.mutations {
            mutation
                .key_mut()
                .stamp_defaults(&config.project_id, config.namespace.as_deref());
        }
    }

    /// Build the commit request for this batch
    pub fn to_request(&self, project_id: &str, transaction: Option<&Bytes>) -> proto::CommitRequest {
        let (mode, transaction_selector) = match transaction {
            Some(handle) => (
                proto::CommitMode::Transactional,
                Some(proto::commit_request::TransactionSelector::Transaction(
                    handle.to_vec(),
                )),
            ),
            None => (proto::CommitMode::NonTransactional, None),
        };

        proto::CommitRequest {
            project_id: project_id.to_string(),
            mode: mode as i32,
            transaction_selector,
            mutations: self.mutations.iter().map(Mutation::to_proto).collect(),
        }
    }

    /// Send the batch as a single commit and return the written entities.
    ///
    /// Entities come back in the order they were queued, with their keys
    /// completed from the response and marked persisted. Deletes produce no
    /// entity.
    pub async fn commit(
        mut self,
        rpc: &dyn DatastoreRpc,
        config: &DatasetConfig,
        transaction: Option<&Bytes>,
    ) -> Result<Vec<Entity>> {
        self.stamp_keys(config);
        let request = self.to_request(&config.project_id, transaction);

        debug!(
            project = %config.project_id,
            mutations = request.mutations.len(),
            transactional = transaction.is_some(),
            "Dispatching commit"
        );

        let response = rpc.commit(request).await?;
        self.apply_results(response.mutation_results)
    }

    /// Fold per-mutation results back onto the queued entities
    fn apply_results(self, results: Vec<proto::MutationResult>) -> Result<Vec<Entity>> {
        if results.len() != self.mutations.len() {
            return Err(ClientError::Protocol(format!(
                "commit returned {} mutation results for {} mutations",
                results.len(),
                self.mutations.len()
            )));
        }

        let mut written = Vec::with_capacity(self.mutations.len());
        for (mutation, result) in self.mutations.into_iter().zip(results) {
            let mut entity = match mutation {
                Mutation::Insert(entity) | Mutation::Update(entity) | Mutation::Upsert(entity) => {
                    entity
                }
                Mutation::Delete(_) => continue,
            };

            if let Some(assigned) = result.key {
                let assigned = proto_key_to_key(assigned)?;
                if assigned.is_incomplete() {
                    return Err(ClientError::Protocol(format!(
                        "commit returned an incomplete key for kind {:?}",
                        assigned.kind()
                    )));
                }
                entity.key_mut().complete_with(&assigned);
            }
            if entity.key().is_complete() {
                entity = entity.into_persisted();
            }
            written.push(entity);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tonic::Status;

    /// Answers commits with a fixed result list and remembers the request
    struct CommitStub {
        results: Vec<proto::MutationResult>,
        seen: Mutex<Option<proto::CommitRequest>>,
    }

    impl CommitStub {
        fn new(results: Vec<proto::MutationResult>) -> Self {
            Self {
                results,
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl DatastoreRpc for CommitStub {
        async fn lookup(&self, _: proto::LookupRequest) -> std::result::Result<proto::LookupResponse, Status> {
            Err(Status::unimplemented("lookup"))
        }

        async fn run_query(
            &self,
            _: proto::RunQueryRequest,
        ) -> std::result::Result<proto::RunQueryResponse, Status> {
            Err(Status::unimplemented("run_query"))
        }

        async fn begin_transaction(
            &self,
            _: proto::BeginTransactionRequest,
        ) -> std::result::Result<proto::BeginTransactionResponse, Status> {
            Err(Status::unimplemented("begin_transaction"))
        }

        async fn commit(&self, request: proto::CommitRequest) -> std::result::Result<proto::CommitResponse, Status> {
            *self.seen.lock() = Some(request);
            Ok(proto::CommitResponse {
                mutation_results: self.results.clone(),
                index_updates: 0,
            })
        }

        async fn rollback(
            &self,
            _: proto::RollbackRequest,
        ) -> std::result::Result<proto::RollbackResponse, Status> {
            Err(Status::unimplemented("rollback"))
        }

        async fn allocate_ids(
            &self,
            _: proto::AllocateIdsRequest,
        ) -> std::result::Result<proto::AllocateIdsResponse, Status> {
            Err(Status::unimplemented("allocate_ids"))
        }
    }

    fn assigned(kind: &str, id: i64) -> proto::MutationResult {
        proto::MutationResult {
            key: Some(key_to_proto(&Key::with_id(kind, id).with_project("test-project"))),
            version: 1,
            conflict_detected: false,
        }
    }

    fn no_key() -> proto::MutationResult {
        proto::MutationResult::default()
    }

    #[tokio::test]
    async fn test_insert_completes_keys_in_order() {
        let stub = CommitStub::new(vec![assigned("Task", 1), assigned("Task", 2)]);
        let config = DatasetConfig::new("test-project");

        let mut batch = MutationBatch::new();
        batch.insert([
            Entity::new(Key::new("Task")).with("n", 1i64),
            Entity::new(Key::new("Task")).with("n", 2i64),
        ]);
        let written = batch.commit(&stub, &config, None).await.unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(written[0].key().id(), Some(1));
        assert_eq!(written[1].key().id(), Some(2));
        assert!(written.iter().all(|e| e.is_persisted() && e.key().is_complete()));

        let request = stub.seen.lock().take().unwrap();
        assert_eq!(request.mode(), proto::CommitMode::NonTransactional);
        assert!(request.transaction_selector.is_none());
    }

    #[tokio::test]
    async fn test_complete_key_without_result_key_is_persisted() {
        let stub = CommitStub::new(vec![no_key(), no_key(), no_key()]);
        let config = DatasetConfig::new("test-project");

        let mut batch = MutationBatch::new();
        batch
            .save([Entity::new(Key::with_name("Task", "a"))])
            .update([Entity::new(Key::new("Task"))])
            .delete([Key::with_id("Task", 9)]);
        let written = batch.commit(&stub, &config, None).await.unwrap();

        assert_eq!(written.len(), 2);
        assert!(written[0].is_persisted());
        assert_eq!(written[0].key().project(), Some("test-project"));
        assert!(!written[1].is_persisted());
    }

    #[tokio::test]
    async fn test_result_count_mismatch_is_fatal() {
        let stub = CommitStub::new(vec![assigned("Task", 1)]);
        let config = DatasetConfig::new("test-project");

        let mut batch = MutationBatch::new();
        batch.insert([Entity::new(Key::new("Task")), Entity::new(Key::new("Task"))]);
        let err = batch.commit(&stub, &config, None).await.unwrap_err();

        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_incomplete_result_key_is_rejected() {
        let incomplete = proto::MutationResult {
            key: Some(key_to_proto(&Key::new("Task").with_project("test-project"))),
            version: 1,
            conflict_detected: false,
        };
        let stub = CommitStub::new(vec![incomplete]);
        let config = DatasetConfig::new("test-project");

        let mut batch = MutationBatch::new();
        batch.insert([Entity::new(Key::new("Task"))]);
        let err = batch.commit(&stub, &config, None).await.unwrap_err();

        assert!(matches!(err, ClientError::Protocol(_)));
        assert_eq!(err.code(), "PROTOCOL_VIOLATION");
    }

    #[test]
    fn test_transactional_request() {
        let mut batch = MutationBatch::new();
        batch.delete([Key::with_id("Task", 1)]);
        let handle = Bytes::from_static(b"txn-1");

        let request = batch.to_request("test-project", Some(&handle));
        assert_eq!(request.mode(), proto::CommitMode::Transactional);
        assert_eq!(
            request.transaction_selector,
            Some(proto::commit_request::TransactionSelector::Transaction(b"txn-1".to_vec()))
        );
        assert_eq!(request.mutations.len(), 1);
    }

    #[test]
    fn test_delete_accepts_entities() {
        let mut batch = MutationBatch::new();
        batch.delete([Entity::new(Key::with_name("Task", "gone"))]);
        assert_eq!(batch.mutations(), &[Mutation::Delete(Key::with_name("Task", "gone"))]);
        assert!(!batch.is_empty());
    }
}
