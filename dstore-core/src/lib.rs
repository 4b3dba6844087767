//! Data model for the dstore client: keys, entities, values, cursors and
//! query builders. Nothing in this crate talks to the network.

pub mod config;
pub mod cursor;
pub mod entity;
pub mod error;
pub mod gql;
pub mod key;
pub mod query;
pub mod types;

pub use config::DatasetConfig;
pub use cursor::Cursor;
pub use entity::{Entity, Properties};
pub use error::{Error, Result};
pub use gql::{GqlBinding, GqlQuery};
pub use key::{Key, KeyId, PathElement};
pub use query::{Direction, FilterOp, PropertyFilter, PropertyOrder, Query};
pub use types::*;
