/// Hierarchical keys
///
/// A key is a path of (kind, identifier) segments scoped to a project and an
/// optional namespace. The last segment is the key's own identity; everything
/// before it is the ancestor path.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one path segment: a numeric id or a string name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyId {
    Id(i64),
    Name(String),
}

impl KeyId {
    pub fn as_id(&self) -> Option<i64> {
        match self {
            KeyId::Id(id) => Some(*id),
            KeyId::Name(_) => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            KeyId::Name(name) => Some(name),
            KeyId::Id(_) => None,
        }
    }

    /// Empty names do not identify anything.
    fn is_usable(&self) -> bool {
        match self {
            KeyId::Id(_) => true,
            KeyId::Name(name) => !name.is_empty(),
        }
    }
}

impl From<i64> for KeyId {
    fn from(id: i64) -> Self {
        KeyId::Id(id)
    }
}

impl From<i32> for KeyId {
    fn from(id: i32) -> Self {
        KeyId::Id(i64::from(id))
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        KeyId::Name(name.to_string())
    }
}

impl From<String> for KeyId {
    fn from(name: String) -> Self {
        KeyId::Name(name)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Id(id) => write!(f, "{}", id),
            KeyId::Name(name) => write!(f, "{:?}", name),
        }
    }
}

/// One (kind, identifier) segment of a key path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathElement {
    pub kind: String,
    pub id: Option<KeyId>,
}

impl PathElement {
    pub fn new(kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id.into()),
        }
    }

    /// A segment still waiting for a server-assigned id
    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.kind.is_empty() && self.id.as_ref().is_some_and(KeyId::is_usable)
    }
}

impl<K: Into<String>, I: Into<KeyId>> From<(K, I)> for PathElement {
    fn from((kind, id): (K, I)) -> Self {
        PathElement::new(kind, id)
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}({})", self.kind, id),
            None => write!(f, "{}(?)", self.kind),
        }
    }
}

/// Key of an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    kind: String,
    id: Option<KeyId>,
    ancestors: Vec<PathElement>,
    project: Option<String>,
    namespace: Option<String>,
}

impl Key {
    /// Create an incomplete key of the given kind
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            ancestors: Vec::new(),
            project: None,
            namespace: None,
        }
    }

    /// Create a key identified by a numeric id
    pub fn with_id(kind: impl Into<String>, id: i64) -> Self {
        let mut key = Self::new(kind);
        key.id = Some(KeyId::Id(id));
        key
    }

    /// Create a key identified by a string name
    pub fn with_name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        let mut key = Self::new(kind);
        key.id = Some(KeyId::Name(name.into()));
        key
    }

    /// Build a key from a flat path.
    ///
    /// The last element becomes the key's own identity (it may be incomplete);
    /// all preceding elements become ancestors and must be complete.
    ///
    /// # Example
    /// ```
    /// # use dstore_core::{Key, PathElement};
    /// let key = Key::from_path([
    ///     PathElement::new("OtherThing", "root"),
    ///     PathElement::new("ThatThing", 6789),
    ///     PathElement::new("ThisThing", 1234),
    /// ])
    /// .unwrap();
    /// assert_eq!(key.kind(), "ThisThing");
    /// assert_eq!(key.parent().unwrap().id(), Some(6789));
    /// ```
    pub fn from_path<I, P>(path: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathElement>,
    {
        let mut elements: Vec<PathElement> = path.into_iter().map(Into::into).collect();
        let own = elements
            .pop()
            .ok_or_else(|| Error::MalformedKey("key path must not be empty".to_string()))?;

        if own.kind.is_empty() {
            return Err(Error::MalformedKey("key kind must not be empty".to_string()));
        }
        validate_ancestors(&elements)?;

        Ok(Self {
            kind: own.kind,
            id: own.id,
            ancestors: elements,
            project: None,
            namespace: None,
        })
    }

    /// Set the project this key belongs to
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Set the namespace this key belongs to
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Place this key under `parent`, replacing any existing ancestors.
    ///
    /// Fails if the parent path contains an incomplete segment.
    pub fn with_parent(mut self, parent: &Key) -> Result<Self> {
        let ancestors = parent.path();
        validate_ancestors(&ancestors)?;
        self.ancestors = ancestors;
        if self.project.is_none() {
            self.project = parent.project.clone();
        }
        if self.namespace.is_none() {
            self.namespace = parent.namespace.clone();
        }
        Ok(self)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> Option<i64> {
        self.id.as_ref().and_then(KeyId::as_id)
    }

    pub fn name(&self) -> Option<&str> {
        self.id.as_ref().and_then(KeyId::as_name)
    }

    pub fn key_id(&self) -> Option<&KeyId> {
        self.id.as_ref()
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn ancestors(&self) -> &[PathElement] {
        &self.ancestors
    }

    /// Set a numeric id, clearing any name
    pub fn set_id(&mut self, id: i64) {
        self.id = Some(KeyId::Id(id));
    }

    /// Set a string name, clearing any id
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.id = Some(KeyId::Name(name.into()));
    }

    pub fn set_project(&mut self, project: Option<String>) {
        self.project = project;
    }

    pub fn set_namespace(&mut self, namespace: Option<String>) {
        self.namespace = namespace;
    }

    /// Ancestors followed by the key's own segment
    pub fn path(&self) -> Vec<PathElement> {
        let mut path = self.ancestors.clone();
        path.push(PathElement {
            kind: self.kind.clone(),
            id: self.id.clone(),
        });
        path
    }

    /// The key one level up, sharing project and namespace
    pub fn parent(&self) -> Option<Key> {
        let mut ancestors = self.ancestors.clone();
        let own = ancestors.pop()?;
        Some(Key {
            kind: own.kind,
            id: own.id,
            ancestors,
            project: self.project.clone(),
            namespace: self.namespace.clone(),
        })
    }

    /// A key is complete when it has a project, a kind, and an identifier on
    /// every path segment.
    pub fn is_complete(&self) -> bool {
        self.project.as_deref().is_some_and(|p| !p.is_empty())
            && !self.kind.is_empty()
            && self.id.as_ref().is_some_and(KeyId::is_usable)
            && self.ancestors.iter().all(PathElement::is_complete)
    }

    pub fn is_incomplete(&self) -> bool {
        !self.is_complete()
    }

    /// Fill in project and namespace where this key has none.
    pub fn stamp_defaults(&mut self, project: &str, namespace: Option<&str>) {
        if self.project.is_none() {
            self.project = Some(project.to_string());
        }
        if self.namespace.is_none() {
            self.namespace = namespace.map(str::to_string);
        }
    }

    /// Adopt the identity the store assigned in `assigned`.
    ///
    /// The key is updated in place: its own identifier is replaced and missing
    /// project/namespace are taken over, ancestors are left untouched.
    pub fn complete_with(&mut self, assigned: &Key) {
        if assigned.id.is_some() {
            self.id = assigned.id.clone();
        }
        if self.project.is_none() {
            self.project = assigned.project.clone();
        }
        if self.namespace.is_none() {
            self.namespace = assigned.namespace.clone();
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segments: Vec<String> = self.path().iter().map(ToString::to_string).collect();
        write!(f, "{}", segments.join("/"))
    }
}

fn validate_ancestors(ancestors: &[PathElement]) -> Result<()> {
    for (position, element) in ancestors.iter().enumerate() {
        if !element.is_complete() {
            return Err(Error::MalformedKey(format!(
                "ancestor {} at position {} is incomplete",
                element, position
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn three_level_path() -> Vec<PathElement> {
        vec![
            PathElement::new("OtherThing", "root"),
            PathElement::new("ThatThing", 6789),
            PathElement::new("ThisThing", 1234),
        ]
    }

    #[test]
    fn test_key_with_id_and_name() {
        let key = Key::with_id("ThisThing", 1234);
        assert_eq!(key.kind(), "ThisThing");
        assert_eq!(key.id(), Some(1234));
        assert_eq!(key.name(), None);

        let key = Key::with_name("ThisThing", "charlie");
        assert_eq!(key.id(), None);
        assert_eq!(key.name(), Some("charlie"));
    }

    #[test]
    fn test_setting_id_clears_name() {
        let mut key = Key::with_name("User", "alice");
        key.set_id(7);
        assert_eq!(key.id(), Some(7));
        assert_eq!(key.name(), None);
    }

    #[test]
    fn test_key_parent_and_grandparent() {
        let key = Key::from_path(three_level_path())
            .unwrap()
            .with_project("custom-ds")
            .with_namespace("custom-ns");

        assert_eq!(key.path(), three_level_path());

        let parent = key.parent().unwrap();
        assert_eq!(parent.kind(), "ThatThing");
        assert_eq!(parent.id(), Some(6789));
        assert_eq!(parent.path(), three_level_path()[..2].to_vec());
        assert_eq!(parent.project(), Some("custom-ds"));
        assert_eq!(parent.namespace(), Some("custom-ns"));

        let grandparent = parent.parent().unwrap();
        assert_eq!(grandparent.name(), Some("root"));
        assert_eq!(grandparent.path(), three_level_path()[..1].to_vec());
        assert!(grandparent.parent().is_none());
    }

    #[test]
    fn test_from_path_rejects_empty_path() {
        let err = Key::from_path(Vec::<PathElement>::new()).unwrap_err();
        assert!(matches!(err, Error::MalformedKey(_)));
    }

    #[test]
    fn test_from_path_rejects_incomplete_ancestor() {
        let err = Key::from_path([
            PathElement::incomplete("Parent"),
            PathElement::new("Child", 1),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::MalformedKey(_)));
    }

    #[test]
    fn test_from_path_allows_incomplete_leaf() {
        let key = Key::from_path([PathElement::new("Parent", "p"), PathElement::incomplete("Child")])
            .unwrap()
            .with_project("proj");
        assert!(key.is_incomplete());
        assert_eq!(key.ancestors().len(), 1);
    }

    #[test]
    fn test_with_parent_copies_scope() {
        let parent = Key::with_name("Org", "acme").with_project("p").with_namespace("ns");
        let key = Key::new("User").with_parent(&parent).unwrap();
        assert_eq!(key.project(), Some("p"));
        assert_eq!(key.namespace(), Some("ns"));
        assert_eq!(key.parent(), Some(parent));

        let err = Key::new("User").with_parent(&Key::new("Org")).unwrap_err();
        assert!(matches!(err, Error::MalformedKey(_)));
    }

    #[test]
    fn test_completeness_requires_project() {
        let key = Key::with_id("Task", 5);
        assert!(key.is_incomplete());
        assert!(key.clone().with_project("p").is_complete());
        assert!(Key::with_name("Task", "").with_project("p").is_incomplete());
    }

    #[test]
    fn test_complete_with_mutates_in_place() {
        let parent = Key::with_name("Org", "acme");
        let mut key = Key::new("User").with_parent(&parent).unwrap().with_project("p");
        let assigned = Key::from_path([PathElement::new("Org", "acme"), PathElement::new("User", 99)])
            .unwrap()
            .with_project("p");

        key.complete_with(&assigned);
        assert!(key.is_complete());
        assert_eq!(key.id(), Some(99));
        assert_eq!(key.ancestors(), parent.path().as_slice());
    }

    #[test]
    fn test_stamp_defaults_keeps_existing_scope() {
        let mut key = Key::new("Task").with_namespace("mine");
        key.stamp_defaults("proj", Some("other"));
        assert_eq!(key.project(), Some("proj"));
        assert_eq!(key.namespace(), Some("mine"));
    }

    #[test]
    fn test_key_display() {
        let key = Key::from_path(three_level_path()).unwrap();
        assert_eq!(key.to_string(), "OtherThing(\"root\")/ThatThing(6789)/ThisThing(1234)");
        assert_eq!(Key::new("Task").to_string(), "Task(?)");
    }

    fn key_id_strategy() -> impl Strategy<Value = KeyId> {
        prop_oneof![
            any::<i64>().prop_map(KeyId::Id),
            "[a-z]{1,8}".prop_map(KeyId::Name),
        ]
    }

    fn path_strategy() -> impl Strategy<Value = Vec<PathElement>> {
        prop::collection::vec(
            ("[A-Z][a-z]{0,6}", key_id_strategy())
                .prop_map(|(kind, id)| PathElement { kind, id: Some(id) }),
            1..6,
        )
    }

    proptest! {
        #[test]
        fn prop_parent_path_drops_last_segment(path in path_strategy()) {
            let key = Key::from_path(path.clone()).unwrap();
            match key.parent() {
                Some(parent) => prop_assert_eq!(parent.path(), path[..path.len() - 1].to_vec()),
                None => prop_assert_eq!(path.len(), 1),
            }
        }

        #[test]
        fn prop_complete_is_negation_of_incomplete(
            path in path_strategy(),
            leaf_incomplete in any::<bool>(),
            project in proptest::option::of("[a-z]{0,5}"),
        ) {
            let mut key = Key::from_path(path).unwrap();
            if leaf_incomplete {
                key = Key::new(key.kind().to_string()).with_parent(&key).unwrap();
            }
            key.set_project(project);
            prop_assert_eq!(key.is_complete(), !key.is_incomplete());
        }
    }
}
