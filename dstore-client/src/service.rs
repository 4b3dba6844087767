/// The RPC stub the client dispatches to
///
/// Transport, authentication, timeouts and cancellation all live behind this
/// trait. Implementations must tolerate concurrent independent calls.

use async_trait::async_trait;
use dstore_proto as proto;
use tonic::Status;

#[async_trait]
pub trait DatastoreRpc: Send + Sync {
    /// Look up entities by key
    async fn lookup(&self, request: proto::LookupRequest) -> Result<proto::LookupResponse, Status>;

    /// Run a structured or GQL query and return one batch of results
    async fn run_query(&self, request: proto::RunQueryRequest) -> Result<proto::RunQueryResponse, Status>;

    /// Open a transaction and return its opaque handle
    async fn begin_transaction(
        &self,
        request: proto::BeginTransactionRequest,
    ) -> Result<proto::BeginTransactionResponse, Status>;

    /// Apply a batch of mutations atomically
    async fn commit(&self, request: proto::CommitRequest) -> Result<proto::CommitResponse, Status>;

    /// Release a transaction without applying it
    async fn rollback(&self, request: proto::RollbackRequest) -> Result<proto::RollbackResponse, Status>;

    /// Reserve ids for incomplete keys
    async fn allocate_ids(
        &self,
        request: proto::AllocateIdsRequest,
    ) -> Result<proto::AllocateIdsResponse, Status>;
}
