/// Test utilities and helpers for dstore testing
///
/// `MockDatastore` stands in for the RPC service: responses are queued per
/// method ahead of time and every request is recorded for later inspection.

use async_trait::async_trait;
use dstore_client::convert::{entity_to_proto, key_to_proto};
use dstore_client::{Dataset, DatastoreRpc};
use dstore_core::{DatasetConfig, Entity, Key};
use dstore_proto as proto;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Once};
use tonic::Status;
use tracing_subscriber::EnvFilter;

/// Project every test dataset runs against
pub const PROJECT: &str = "my-todo-project";

type Queue<T> = Mutex<VecDeque<Result<T, Status>>>;

/// A request the mock received
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Lookup(proto::LookupRequest),
    RunQuery(proto::RunQueryRequest),
    BeginTransaction(proto::BeginTransactionRequest),
    Commit(proto::CommitRequest),
    Rollback(proto::RollbackRequest),
    AllocateIds(proto::AllocateIdsRequest),
}

/// Scripted, recording RPC stub
#[derive(Default)]
pub struct MockDatastore {
    lookups: Queue<proto::LookupResponse>,
    queries: Queue<proto::RunQueryResponse>,
    begins: Queue<proto::BeginTransactionResponse>,
    commits: Queue<proto::CommitResponse>,
    rollbacks: Queue<proto::RollbackResponse>,
    allocations: Queue<proto::AllocateIdsResponse>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockDatastore {
    /// Create a shared mock with nothing queued
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn expect_lookup(&self, response: proto::LookupResponse) -> &Self {
        self.lookups.lock().push_back(Ok(response));
        self
    }

    pub fn expect_run_query(&self, response: proto::RunQueryResponse) -> &Self {
        self.queries.lock().push_back(Ok(response));
        self
    }

    pub fn expect_begin_transaction(&self, handle: &[u8]) -> &Self {
        self.begins.lock().push_back(Ok(proto::BeginTransactionResponse {
            transaction: handle.to_vec(),
        }));
        self
    }

    pub fn expect_commit(&self, response: proto::CommitResponse) -> &Self {
        self.commits.lock().push_back(Ok(response));
        self
    }

    pub fn expect_rollback(&self) -> &Self {
        self.rollbacks.lock().push_back(Ok(proto::RollbackResponse {}));
        self
    }

    pub fn expect_allocate_ids(&self, response: proto::AllocateIdsResponse) -> &Self {
        self.allocations.lock().push_back(Ok(response));
        self
    }

    pub fn fail_lookup(&self, status: Status) -> &Self {
        self.lookups.lock().push_back(Err(status));
        self
    }

    pub fn fail_run_query(&self, status: Status) -> &Self {
        self.queries.lock().push_back(Err(status));
        self
    }

    pub fn fail_begin_transaction(&self, status: Status) -> &Self {
        self.begins.lock().push_back(Err(status));
        self
    }

    pub fn fail_commit(&self, status: Status) -> &Self {
        self.commits.lock().push_back(Err(status));
        self
    }

    pub fn fail_rollback(&self, status: Status) -> &Self {
        self.rollbacks.lock().push_back(Err(status));
        self
    }

    /// Every request received, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn commit_requests(&self) -> Vec<proto::CommitRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Commit(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn run_query_requests(&self) -> Vec<proto::RunQueryRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::RunQuery(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn lookup_requests(&self) -> Vec<proto::LookupRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Lookup(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn rollback_requests(&self) -> Vec<proto::RollbackRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Rollback(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn record<T>(&self, call: RecordedCall, queue: &Queue<T>, method: &str) -> Result<T, Status> {
        self.calls.lock().push(call);
        queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Status::failed_precondition(format!("unexpected {} call", method))))
    }
}

#[async_trait]
impl DatastoreRpc for MockDatastore {
    async fn lookup(&self, request: proto::LookupRequest) -> Result<proto::LookupResponse, Status> {
        self.record(RecordedCall::Lookup(request), &self.lookups, "lookup")
    }

    async fn run_query(&self, request: proto::RunQueryRequest) -> Result<proto::RunQueryResponse, Status> {
        self.record(RecordedCall::RunQuery(request), &self.queries, "run_query")
    }

    async fn begin_transaction(
        &self,
        request: proto::BeginTransactionRequest,
    ) -> Result<proto::BeginTransactionResponse, Status> {
        self.record(RecordedCall::BeginTransaction(request), &self.begins, "begin_transaction")
    }

    async fn commit(&self, request: proto::CommitRequest) -> Result<proto::CommitResponse, Status> {
        self.record(RecordedCall::Commit(request), &self.commits, "commit")
    }

    async fn rollback(&self, request: proto::RollbackRequest) -> Result<proto::RollbackResponse, Status> {
        self.record(RecordedCall::Rollback(request), &self.rollbacks, "rollback")
    }

    async fn allocate_ids(
        &self,
        request: proto::AllocateIdsRequest,
    ) -> Result<proto::AllocateIdsResponse, Status> {
        self.record(RecordedCall::AllocateIds(request), &self.allocations, "allocate_ids")
    }
}

/// Dataset for `PROJECT` backed by `mock`
pub fn test_dataset(mock: &Arc<MockDatastore>) -> Dataset {
    let rpc: Arc<dyn DatastoreRpc> = mock.clone();
    Dataset::new(rpc, DatasetConfig::new(PROJECT)).expect("Failed to create dataset")
}

/// Install a fmt subscriber honouring `RUST_LOG`, once per process
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Response builders
// ============================================================================

/// Commit result assigning `key` to the mutation
pub fn assigned(key: &Key) -> proto::MutationResult {
    proto::MutationResult {
        key: Some(key_to_proto(key)),
        version: 1,
        conflict_detected: false,
    }
}

/// Commit result without a key, as returned for complete keys
pub fn unchanged() -> proto::MutationResult {
    proto::MutationResult {
        key: None,
        version: 1,
        conflict_detected: false,
    }
}

pub fn commit_response(results: Vec<proto::MutationResult>) -> proto::CommitResponse {
    proto::CommitResponse {
        mutation_results: results,
        index_updates: 0,
    }
}

/// Commit response assigning ids `ids` to entities of `kind`, in order
pub fn commit_with_ids(kind: &str, ids: impl IntoIterator<Item = i64>) -> proto::CommitResponse {
    commit_response(
        ids.into_iter()
            .map(|id| assigned(&Key::with_id(kind, id).with_project(PROJECT)))
            .collect(),
    )
}

pub fn entity_result(entity: &Entity, cursor: &[u8]) -> proto::EntityResult {
    proto::EntityResult {
        entity: Some(entity_to_proto(entity)),
        version: 1,
        cursor: cursor.to_vec(),
    }
}

pub fn lookup_response(found: &[Entity], missing: &[Key], deferred: &[Key]) -> proto::LookupResponse {
    proto::LookupResponse {
        found: found.iter().map(|e| entity_result(e, b"")).collect(),
        missing: missing
            .iter()
            .map(|k| entity_result(&Entity::new(k.clone()), b""))
            .collect(),
        deferred: deferred.iter().map(key_to_proto).collect(),
    }
}

/// Run-query response with one cursor per entity
pub fn query_response(
    entities: &[(Entity, &[u8])],
    end_cursor: &[u8],
    more_results: proto::MoreResultsType,
) -> proto::RunQueryResponse {
    proto::RunQueryResponse {
        batch: Some(proto::QueryResultBatch {
            skipped_results: 0,
            skipped_cursor: Vec::new(),
            entity_result_type: proto::ResultType::Full as i32,
            entity_results: entities
                .iter()
                .map(|(entity, cursor)| entity_result(entity, cursor))
                .collect(),
            end_cursor: end_cursor.to_vec(),
            more_results: more_results as i32,
        }),
        query: None,
    }
}

/// A `Task` entity with the given id and description, in `PROJECT`
pub fn task(id: i64, description: &str) -> Entity {
    Entity::new(Key::with_id("Task", id).with_project(PROJECT)).with("description", description)
}
