/// Result pages returned by lookups and queries
use crate::convert::*;
use crate::error::{ClientError, Result};
use dstore_core::{Cursor, Entity, Error, Key};
use dstore_proto as proto;

/// Whether more results exist beyond a query batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MoreResults {
    /// The service did not say
    #[default]
    Unspecified,
    /// There may be more results after the end cursor
    NotFinished,
    /// The query limit was reached
    MoreResultsAfterLimit,
    /// The end cursor of the query was reached
    MoreResultsAfterCursor,
    NoMoreResults,
}

impl From<proto::MoreResultsType> for MoreResults {
    fn from(value: proto::MoreResultsType) -> Self {
        match value {
            proto::MoreResultsType::Unspecified => MoreResults::Unspecified,
            proto::MoreResultsType::NotFinished => MoreResults::NotFinished,
            proto::MoreResultsType::MoreResultsAfterLimit => MoreResults::MoreResultsAfterLimit,
            proto::MoreResultsType::MoreResultsAfterCursor => MoreResults::MoreResultsAfterCursor,
            proto::MoreResultsType::NoMoreResults => MoreResults::NoMoreResults,
        }
    }
}

/// One page of entities from a lookup or a query.
///
/// Query pages keep a cursor per entity so a caller can resume right after any
/// of them. Lookup pages instead report keys the service deferred and entities
/// it could not find.
#[derive(Debug, Clone, Default)]
pub struct QueryResultPage {
    entities: Vec<Entity>,
    cursors: Vec<Option<Cursor>>,
    deferred: Vec<Key>,
    missing: Vec<Entity>,
    end_cursor: Option<Cursor>,
    skipped_results: i32,
    more_results: MoreResults,
}

impl QueryResultPage {
    /// Build a page from a lookup response
    pub fn from_lookup(response: proto::LookupResponse) -> Result<Self> {
        let entities = response
            .found
            .into_iter()
            .map(proto_entity_result_to_entity)
            .collect::<Result<Vec<_>>>()?;
        let missing = response
            .missing
            .into_iter()
            .map(proto_entity_result_to_entity)
            .collect::<Result<Vec<_>>>()?;
        let deferred = response
            .deferred
            .into_iter()
            .map(proto_key_to_key)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            cursors: vec![None; entities.len()],
            entities,
            deferred,
            missing,
            ..Self::default()
        })
    }

    /// Build a page from a run-query response
    pub fn from_query(response: &proto::RunQueryResponse) -> Result<Self> {
        let batch = response
            .batch
            .as_ref()
            .ok_or_else(|| ClientError::Protocol("run query response without a batch".to_string()))?;

        let mut entities = Vec::with_capacity(batch.entity_results.len());
        let mut cursors = Vec::with_capacity(batch.entity_results.len());
        for result in &batch.entity_results {
            cursors.push(non_empty_cursor(&result.cursor));
            entities.push(proto_entity_result_to_entity(result.clone())?);
        }

        Ok(Self {
            entities,
            cursors,
            end_cursor: non_empty_cursor(&batch.end_cursor),
            skipped_results: batch.skipped_results,
            more_results: batch.more_results().into(),
            ..Self::default()
        })
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn into_entities(self) -> Vec<Entity> {
        self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    /// Keys the service did not process; look them up again
    pub fn deferred(&self) -> &[Key] {
        &self.deferred
    }

    /// Entities that do not exist, each carrying only its key
    pub fn missing(&self) -> &[Entity] {
        &self.missing
    }

    pub fn end_cursor(&self) -> Option<&Cursor> {
        self.end_cursor.as_ref()
    }

    pub fn skipped_results(&self) -> i32 {
        self.skipped_results
    }

    pub fn more_results(&self) -> MoreResults {
        self.more_results
    }

    /// Cursor pointing just past `entity`.
    ///
    /// `entity` must be borrowed from this page; equal entities from elsewhere
    /// are not members.
    pub fn cursor_for(&self, entity: &Entity) -> Result<Cursor> {
        let position = self
            .entities
            .iter()
            .position(|member| std::ptr::eq(member, entity))
            .ok_or_else(|| Error::NotFound(format!("entity {} is not part of this page", entity.key())))?;
        self.cursor_at(position)
    }

    /// Cursor for the entity at `index`
    pub fn cursor_at(&self, index: usize) -> Result<Cursor> {
        self.cursors
            .get(index)
            .and_then(Clone::clone)
            .ok_or_else(|| Error::NotFound(format!("no cursor at position {}", index)).into())
    }

    /// Entities paired with their cursors
    pub fn iter_with_cursors(&self) -> impl Iterator<Item = (&Entity, Option<&Cursor>)> {
        self.entities
            .iter()
            .zip(self.cursors.iter().map(Option::as_ref))
    }

    pub fn is_not_finished(&self) -> bool {
        self.more_results == MoreResults::NotFinished
    }

    pub fn is_more_after_limit(&self) -> bool {
        self.more_results == MoreResults::MoreResultsAfterLimit
    }

    pub fn is_more_after_cursor(&self) -> bool {
        self.more_results == MoreResults::MoreResultsAfterCursor
    }

    pub fn is_no_more(&self) -> bool {
        self.more_results == MoreResults::NoMoreResults
    }
}

impl IntoIterator for QueryResultPage {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResultPage {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

fn non_empty_cursor(bytes: &[u8]) -> Option<Cursor> {
    (!bytes.is_empty()).then(|| Cursor::from_bytes(bytes.to_vec()))
}
