//! dstore client library
//!
//! This crate turns high-level reads, writes, queries and transactions into
//! calls on an injected [`DatastoreRpc`] stub and interprets the responses.

pub mod error;
pub mod service;
pub mod convert;
pub mod batch;
pub mod lookup;
pub mod results;
pub mod query;
pub mod transaction;
pub mod dataset;

// Re-export key types
pub use batch::{Mutation, MutationBatch};
pub use dataset::Dataset;
pub use dstore_core::{
    Cursor, DatasetConfig, Entity, GqlQuery, Key, Query, QueryOptions, ReadConsistency, ReadOptions,
    Value,
};
pub use error::{BoxError, ClientError, Result, RollbackError, TransactionError};
pub use lookup::Lookup;
pub use query::{AnyQuery, QueryPages};
pub use results::{MoreResults, QueryResultPage};
pub use service::DatastoreRpc;
pub use transaction::{Transaction, TransactionOutcome, TransactionState};
