/// Dataset facade over the RPC stub
use crate::batch::MutationBatch;
use crate::convert::*;
use crate::error::{BoxError, ClientError, Result};
use crate::lookup::Lookup;
use crate::query::{AnyQuery, QueryPages};
use crate::results::QueryResultPage;
use crate::service::DatastoreRpc;
use crate::transaction::{self, Transaction, TransactionOutcome};
use dstore_core::{
    DatasetConfig, Entity, Error, GqlQuery, Key, KeyId, PathElement, Query, QueryOptions,
    ReadConsistency, ReadOptions,
};
use dstore_proto as proto;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// Entry point for reading and writing one project's entities.
///
/// Cloning is cheap; clones share the same stub.
///
/// # Example
/// ```no_run
/// # use std::sync::Arc;
/// # use dstore_client::{Dataset, DatastoreRpc};
/// # use dstore_core::DatasetConfig;
/// # async fn example(rpc: Arc<dyn DatastoreRpc>) -> dstore_client::Result<()> {
/// let dataset = Dataset::new(rpc, DatasetConfig::new("my-todo-project"))?;
///
/// let task = dataset.entity(dataset.incomplete_key("Task"), |task| {
///     task.set("description", "Learn Rust");
///     task.set("done", false);
/// });
/// let saved = dataset.save([task]).await?;
/// assert!(saved[0].is_persisted());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Dataset {
    rpc: Arc<dyn DatastoreRpc>,
    config: DatasetConfig,
}

impl Dataset {
    /// Create a dataset dispatching to `rpc`
    pub fn new(rpc: Arc<dyn DatastoreRpc>, config: DatasetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { rpc, config })
    }

    pub fn project_id(&self) -> &str {
        &self.config.project_id
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    /// Complete key in this dataset's project and namespace
    pub fn key(&self, kind: impl Into<String>, id: impl Into<KeyId>) -> Key {
        let key = match id.into() {
            KeyId::Id(id) => Key::with_id(kind, id),
            KeyId::Name(name) => Key::with_name(kind, name),
        };
        self.stamp(key)
    }

    /// Key without an identifier, to be completed on insert
    pub fn incomplete_key(&self, kind: impl Into<String>) -> Key {
        self.stamp(Key::new(kind))
    }

    /// Key from a flat `(kind, id)` path
    pub fn key_path<I, P>(&self, path: I) -> Result<Key>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathElement>,
    {
        Ok(self.stamp(Key::from_path(path)?))
    }

    /// New entity with `key`, handed once to `configure` before it is returned
    pub fn entity(&self, key: Key, configure: impl FnOnce(&mut Entity)) -> Entity {
        let mut entity = Entity::new(self.stamp(key));
        configure(&mut entity);
        entity
    }

    pub fn query(&self, kind: impl Into<String>) -> Query {
        Query::new().kind(kind)
    }

    pub fn gql(&self, query_string: impl Into<String>) -> GqlQuery {
        GqlQuery::new(query_string)
    }

    fn stamp(&self, mut key: Key) -> Key {
        key.stamp_defaults(&self.config.project_id, self.config.namespace.as_deref());
        key
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Reserve `count` ids for an incomplete key
    pub async fn allocate_ids(&self, key: &Key, count: usize) -> Result<Vec<Key>> {
        let key = self.stamp(key.clone());
        if key.is_complete() {
            return Err(Error::incomplete_key_required().into());
        }
        if count == 0 {
            return Err(Error::InvalidArgument("count must be at least 1".to_string()).into());
        }

        let wire_key = key_to_proto(&key);
        let request = proto::AllocateIdsRequest {
            project_id: self.config.project_id.clone(),
            keys: vec![wire_key; count],
        };
        debug!(project = %self.config.project_id, count, kind = key.kind(), "Dispatching allocate ids");

        let response = self.rpc.allocate_ids(request).await?;
        let keys = response
            .keys
            .into_iter()
            .map(proto_key_to_key)
            .collect::<Result<Vec<_>>>()?;

        if let Some(incomplete) = keys.iter().find(|k| k.is_incomplete()) {
            return Err(ClientError::Protocol(format!(
                "allocate ids returned incomplete key {}",
                incomplete
            )));
        }
        Ok(keys)
    }

    /// Create or replace entities
    pub async fn save<I>(&self, entities: I) -> Result<Vec<Entity>>
    where
        I: IntoIterator<Item = Entity>,
    {
        self.commit(|batch| {
            batch.save(entities);
        })
        .await
    }

    /// Create or replace entities
    pub async fn upsert<I>(&self, entities: I) -> Result<Vec<Entity>>
    where
        I: IntoIterator<Item = Entity>,
    {
        self.commit(|batch| {
            batch.upsert(entities);
        })
        .await
    }

    /// Create entities that must not exist yet
    pub async fn insert<I>(&self, entities: I) -> Result<Vec<Entity>>
    where
        I: IntoIterator<Item = Entity>,
    {
        self.commit(|batch| {
            batch.insert(entities);
        })
        .await
    }

    /// Replace entities that must already exist
    pub async fn update<I>(&self, entities: I) -> Result<Vec<Entity>>
    where
        I: IntoIterator<Item = Entity>,
    {
        self.commit(|batch| {
            batch.update(entities);
        })
        .await
    }

    /// Delete by key, or by entity
    pub async fn delete<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.commit(|batch| {
            batch.delete(keys);
        })
        .await?;
        Ok(())
    }

    /// Commit a batch of mixed mutations filled in by `fill`
    pub async fn commit<F>(&self, fill: F) -> Result<Vec<Entity>>
    where
        F: FnOnce(&mut MutationBatch),
    {
        let mut batch = MutationBatch::new();
        fill(&mut batch);
        batch.commit(self.rpc.as_ref(), &self.config, None).await
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Look up a single entity
    pub async fn find(&self, key: Key) -> Result<Option<Entity>> {
        self.find_with(key, ReadOptions::new()).await
    }

    /// Look up a single entity with explicit read options
    pub async fn find_with(&self, key: Key, options: ReadOptions) -> Result<Option<Entity>> {
        let page = self.find_all([key], options).await?;
        Ok(page.into_entities().into_iter().next())
    }

    /// Look up several entities.
    ///
    /// The page separates found entities from missing and deferred keys.
    pub async fn find_all<I, K>(&self, keys: I, options: ReadOptions) -> Result<QueryResultPage>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        let keys = keys.into_iter().map(|key| self.stamp(key.into()));
        Lookup::new()
            .keys(keys)
            .consistency(self.consistency(options.consistency))
            .execute(self.rpc.as_ref(), &self.config.project_id)
            .await
    }

    /// Run a query and return its first page
    pub async fn run(&self, query: impl Into<AnyQuery>, options: QueryOptions) -> Result<QueryResultPage> {
        let mut pages = self.run_pages(query, options);
        Ok(pages.next_page().await?.unwrap_or_default())
    }

    /// Run a query as a lazy sequence of pages
    pub fn run_pages(&self, query: impl Into<AnyQuery>, options: QueryOptions) -> QueryPages {
        let namespace = options.namespace.or_else(|| self.config.namespace.clone());
        QueryPages::new(
            Arc::clone(&self.rpc),
            &self.config.project_id,
            namespace.as_deref(),
            consistency_read_options(self.consistency(options.read.consistency)),
            &query.into(),
        )
    }

    fn consistency(&self, requested: Option<ReadConsistency>) -> Option<ReadConsistency> {
        requested.or(self.config.default_consistency)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Open a transaction to drive by hand
    pub async fn begin_transaction(&self) -> Result<Transaction> {
        Transaction::begin(Arc::clone(&self.rpc), self.config.clone()).await
    }

    /// Run `f` in a transaction and commit what it queued.
    ///
    /// If `f` or the commit fails the transaction is rolled back and a
    /// [`TransactionError`](crate::TransactionError) carrying the failure is
    /// returned.
    ///
    /// ```no_run
    /// # use dstore_client::Dataset;
    /// # async fn example(dataset: Dataset) -> dstore_client::Result<()> {
    /// let key = dataset.key("Task", "sample");
    /// let outcome = dataset
    ///     .transaction(|tx| {
    ///         Box::pin(async move {
    ///             if tx.find(key.clone()).await?.is_none() {
    ///                 tx.save([Entity::new(key)]);
    ///             }
    ///             Ok::<_, anyhow::Error>(())
    ///         })
    ///     })
    ///     .await?;
    /// # use dstore_core::Entity;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn transaction<F, T, E>(&self, f: F) -> Result<TransactionOutcome<T>>
    where
        F: for<'t> FnOnce(&'t mut Transaction) -> BoxFuture<'t, std::result::Result<T, E>>,
        E: Into<BoxError>,
    {
        transaction::run_in_transaction(Arc::clone(&self.rpc), self.config.clone(), f).await
    }
}
