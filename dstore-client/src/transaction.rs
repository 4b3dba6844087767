/// Transaction lifecycle: begin, queue, commit or roll back
use crate::batch::MutationBatch;
use crate::convert::*;
use crate::error::{BoxError, Result, RollbackError, TransactionError};
use crate::lookup::Lookup;
use crate::query::{AnyQuery, QueryPages};
use crate::results::QueryResultPage;
use crate::service::DatastoreRpc;
use bytes::Bytes;
use dstore_core::{DatasetConfig, Entity, Key};
use dstore_proto as proto;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a transaction is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

/// Value produced by a transaction closure, with the entities its commit wrote
#[derive(Debug)]
pub struct TransactionOutcome<T> {
    pub value: T,
    pub entities: Vec<Entity>,
}

/// An open transaction.
///
/// Writes are queued locally and sent as one transactional commit. Reads go to
/// the service right away and see the transaction's snapshot. `commit` and
/// `rollback` consume the transaction.
pub struct Transaction {
    rpc: Arc<dyn DatastoreRpc>,
    config: DatasetConfig,
    id: Bytes,
    pending: MutationBatch,
    state: TransactionState,
}

impl Transaction {
    pub(crate) async fn begin(rpc: Arc<dyn DatastoreRpc>, config: DatasetConfig) -> Result<Self> {
        debug!(project = %config.project_id, "Dispatching begin transaction");
        let response = rpc
            .begin_transaction(proto::BeginTransactionRequest {
                project_id: config.project_id.clone(),
            })
            .await?;

        let id = Bytes::from(response.transaction);
        info!(project = %config.project_id, transaction = id.len(), "Transaction started");

        Ok(Self {
            rpc,
            config,
            id,
            pending: MutationBatch::new(),
            state: TransactionState::Active,
        })
    }

    /// Opaque handle assigned by the service
    pub fn id(&self) -> &Bytes {
        &self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Mutations queued so far
    pub fn pending(&self) -> &MutationBatch {
        &self.pending
    }

    pub fn save<I>(&mut self, entities: I) -> &mut Self
    where
        I: IntoIterator<Item = Entity>,
    {
        self.pending.save(entities);
        self
    }

    pub fn upsert<I>(&mut self, entities: I) -> &mut Self
    where
        I: IntoIterator<Item = Entity>,
    {
        self.pending.upsert(entities);
        self
    }

    pub fn insert<I>(&mut self, entities: I) -> &mut Self
    where
        I: IntoIterator<Item = Entity>,
    {
        self.pending.insert(entities);
        self
    }

    pub fn update<I>(&mut self, entities: I) -> &mut Self
    where
        I: IntoIterator<Item = Entity>,
    {
        self.pending.update(entities);
        self
    }

    pub fn delete<I, K>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.pending.delete(keys);
        self
    }

    /// Look up one entity inside the transaction
    pub async fn find(&self, key: Key) -> Result<Option<Entity>> {
        Ok(self.find_all([key]).await?.into_entities().into_iter().next())
    }

    /// Look up several entities inside the transaction
    pub async fn find_all<I, K>(&self, keys: I) -> Result<QueryResultPage>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        let keys = keys.into_iter().map(|key| {
            let mut key = key.into();
            key.stamp_defaults(&self.config.project_id, self.config.namespace.as_deref());
            key
        });

        Lookup::new()
            .keys(keys)
            .in_transaction(self.id.clone())
            .execute(self.rpc.as_ref(), &self.config.project_id)
            .await
    }

    /// Run a query inside the transaction and return its first page
    pub async fn run(&self, query: impl Into<AnyQuery>) -> Result<QueryResultPage> {
        let mut pages = QueryPages::new(
            Arc::clone(&self.rpc),
            &self.config.project_id,
            self.config.namespace.as_deref(),
            Some(transaction_read_options(&self.id)),
            &query.into(),
        );
        Ok(pages.next_page().await?.unwrap_or_default())
    }

    /// Commit the queued mutations.
    ///
    /// If the commit fails the transaction is rolled back and the failure is
    /// reported as a [`TransactionError`].
    pub async fn commit(mut self) -> Result<Vec<Entity>> {
        match self.finish().await {
            Ok(entities) => Ok(entities),
            Err(err) => Err(self.abort(Box::new(err)).await.into()),
        }
    }

    /// Discard the queued mutations and release the transaction
    pub async fn rollback(mut self) -> Result<()> {
        self.pending = MutationBatch::new();
        let result = self.send_rollback().await;
        self.state = TransactionState::RolledBack;
        result?;
        info!(project = %self.config.project_id, "Transaction rolled back");
        Ok(())
    }

    async fn finish(&mut self) -> Result<Vec<Entity>> {
        let pending = std::mem::take(&mut self.pending);
        let entities = pending
            .commit(self.rpc.as_ref(), &self.config, Some(&self.id))
            .await?;

        self.state = TransactionState::Committed;
        info!(
            project = %self.config.project_id,
            entities = entities.len(),
            "Transaction committed"
        );
        Ok(entities)
    }

    /// Roll back after `cause` and wrap both outcomes into one error
    pub(crate) async fn abort(&mut self, cause: BoxError) -> TransactionError {
        let result = self.send_rollback().await;
        self.state = TransactionState::RolledBack;

        match result {
            Ok(()) => {
                info!(project = %self.config.project_id, "Transaction rolled back after failure");
                TransactionError::Aborted { cause }
            }
            Err(status) => {
                warn!(
                    project = %self.config.project_id,
                    error = %status.message(),
                    "Transaction rollback failed"
                );
                TransactionError::RollbackFailed {
                    rollback: RollbackError::new(status, cause),
                }
            }
        }
    }

    async fn send_rollback(&self) -> std::result::Result<(), tonic::Status> {
        debug!(project = %self.config.project_id, "Dispatching rollback");
        self.rpc
            .rollback(proto::RollbackRequest {
                project_id: self.config.project_id.clone(),
                transaction: self.id.to_vec(),
            })
            .await?;
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            warn!(
                project = %self.config.project_id,
                pending = self.pending.len(),
                "Transaction dropped without commit or rollback"
            );
        }
    }
}

/// Run `f` inside a new transaction and commit what it queued.
///
/// A failure from `f` or from the commit rolls the transaction back. A failure
/// to begin is returned as is.
pub(crate) async fn run_in_transaction<F, T, E>(
    rpc: Arc<dyn DatastoreRpc>,
    config: DatasetConfig,
    f: F,
) -> Result<TransactionOutcome<T>>
where
    F: for<'t> FnOnce(&'t mut Transaction) -> BoxFuture<'t, std::result::Result<T, E>>,
    E: Into<BoxError>,
{
    let mut transaction = Transaction::begin(rpc, config).await?;

    match f(&mut transaction).await {
        Ok(value) => {
            let entities = transaction.commit().await?;
            Ok(TransactionOutcome { value, entities })
        }
        Err(err) => Err(transaction.abort(err.into()).await.into()),
    }
}
