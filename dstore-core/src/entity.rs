use crate::key::Key;
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Property map of an entity
pub type Properties = HashMap<String, Value>;

/// An entity: a key plus named properties
///
/// `is_persisted` reports whether a commit writing this entity succeeded.
/// Entities built here or decoded from reads start unpersisted; the client
/// rebuilds committed entities with [`Entity::into_persisted`], and callers
/// outside the commit path should not use it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    key: Key,
    properties: Properties,
    #[serde(default)]
    exclude_from_indexes: HashSet<String>,
    #[serde(skip)]
    persisted: bool,
}

impl Entity {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            properties: HashMap::new(),
            exclude_from_indexes: HashSet::new(),
            persisted: false,
        }
    }

    /// Build an entity from an existing property map
    pub fn with_properties(key: Key, properties: Properties) -> Self {
        Self {
            properties,
            ..Self::new(key)
        }
    }

    /// Set a property and return the entity, for chained construction
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn key_mut(&mut self) -> &mut Key {
        &mut self.key
    }

    /// Replace the key, returning the previous one
    pub fn set_key(&mut self, key: Key) -> Key {
        std::mem::replace(&mut self.key, key)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.properties.remove(name)
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// Keep the named property out of the store's indexes
    pub fn exclude_from_indexes(&mut self, name: impl Into<String>) {
        self.exclude_from_indexes.insert(name.into());
    }

    pub fn include_in_indexes(&mut self, name: &str) {
        self.exclude_from_indexes.remove(name);
    }

    pub fn is_excluded_from_indexes(&self, name: &str) -> bool {
        self.exclude_from_indexes.contains(name)
    }

    /// True once a commit that wrote this entity has succeeded
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Rebuild this entity as written by a successful commit.
    /// Requires a complete key; only the commit path calls this.
    #[doc(hidden)]
    pub fn into_persisted(self) -> Self {
        debug_assert!(self.key.is_complete());
        Self {
            persisted: true,
            ..self
        }
    }
}

/// Deleting an entity deletes its key
impl From<Entity> for Key {
    fn from(entity: Entity) -> Self {
        entity.key
    }
}

impl From<&Entity> for Key {
    fn from(entity: &Entity) -> Self {
        entity.key.clone()
    }
}
