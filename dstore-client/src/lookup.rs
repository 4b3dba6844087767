/// Lookup by key
use crate::convert::*;
use crate::error::Result;
use crate::results::QueryResultPage;
use crate::service::DatastoreRpc;
use bytes::Bytes;
use dstore_core::{Key, ReadConsistency};
use dstore_proto as proto;
use tracing::{debug, warn};

/// Lookup request builder
pub struct Lookup {
    keys: Vec<Key>,
    consistency: Option<ReadConsistency>,
    transaction: Option<Bytes>,
}

impl Lookup {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            consistency: None,
            transaction: None,
        }
    }

    pub fn key(mut self, key: Key) -> Self {
        self.keys.push(key);
        self
    }

    pub fn keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn consistency(mut self, consistency: Option<ReadConsistency>) -> Self {
        self.consistency = consistency;
        self
    }

    /// Read inside a transaction; takes precedence over any consistency
    pub fn in_transaction(mut self, transaction: Bytes) -> Self {
        self.transaction = Some(transaction);
        self
    }

    pub fn to_request(&self, project_id: &str) -> proto::LookupRequest {
        let read_options = match &self.transaction {
            Some(handle) => Some(transaction_read_options(handle)),
            None => consistency_read_options(self.consistency),
        };

        proto::LookupRequest {
            project_id: project_id.to_string(),
            read_options,
            keys: self.keys.iter().map(key_to_proto).collect(),
        }
    }

    /// Execute the lookup; no keys means no call
    pub async fn execute(self, rpc: &dyn DatastoreRpc, project_id: &str) -> Result<QueryResultPage> {
        if self.keys.is_empty() {
            return Ok(QueryResultPage::default());
        }

        let request = self.to_request(project_id);
        debug!(
            project = %project_id,
            keys = request.keys.len(),
            transactional = self.transaction.is_some(),
            "Dispatching lookup"
        );

        let page = QueryResultPage::from_lookup(rpc.lookup(request).await?)?;
        if !page.deferred().is_empty() {
            warn!(deferred = page.deferred().len(), "Lookup deferred some keys");
        }
        Ok(page)
    }
}

impl Default for Lookup {
    fn default() -> Self {
        Self::new()
    }
}
