/// Query dispatch and pagination
use crate::convert::*;
use crate::error::Result;
use crate::results::QueryResultPage;
use crate::service::DatastoreRpc;
use dstore_core::{Entity, GqlQuery, Query};
use dstore_proto::{self as proto, run_query_request::QueryType};
use futures::stream::{self, Stream};
use std::sync::Arc;
use tracing::debug;

/// Either kind of query accepted by `run`
#[derive(Debug, Clone, PartialEq)]
pub enum AnyQuery {
    Structured(Query),
    Gql(GqlQuery),
}

impl AnyQuery {
    /// Snapshot the query into its wire form
    pub fn to_proto(&self) -> QueryType {
        match self {
            AnyQuery::Structured(query) => QueryType::Query(query_to_proto(query)),
            AnyQuery::Gql(gql) => QueryType::GqlQuery(gql_to_proto(gql)),
        }
    }
}

impl From<Query> for AnyQuery {
    fn from(query: Query) -> Self {
        AnyQuery::Structured(query)
    }
}

impl From<GqlQuery> for AnyQuery {
    fn from(query: GqlQuery) -> Self {
        AnyQuery::Gql(query)
    }
}

/// Lazy sequence of result pages for one query.
///
/// Each call to [`next_page`](Self::next_page) issues exactly one RPC. The
/// sequence continues while the service reports `NOT_FINISHED` and returns an
/// end cursor, which becomes the start cursor of the next request.
pub struct QueryPages {
    rpc: Arc<dyn DatastoreRpc>,
    project_id: String,
    partition_id: Option<proto::PartitionId>,
    read_options: Option<proto::ReadOptions>,
    next: Option<QueryType>,
    request_limit: Option<usize>,
    requests_made: usize,
}

impl QueryPages {
    pub(crate) fn new(
        rpc: Arc<dyn DatastoreRpc>,
        project_id: &str,
        namespace: Option<&str>,
        read_options: Option<proto::ReadOptions>,
        query: &AnyQuery,
    ) -> Self {
        Self {
            rpc,
            project_id: project_id.to_string(),
            partition_id: namespace.map(|ns| partition_id(project_id, Some(ns))),
            read_options,
            next: Some(query.to_proto()),
            request_limit: None,
            requests_made: 0,
        }
    }

    /// Cap the number of follow-up requests after the first page
    pub fn request_limit(mut self, limit: usize) -> Self {
        self.request_limit = Some(limit);
        self
    }

    /// Number of RPCs issued so far
    pub fn requests_made(&self) -> usize {
        self.requests_made
    }

    /// Fetch the next page, or `None` once the sequence is exhausted
    pub async fn next_page(&mut self) -> Result<Option<QueryResultPage>> {
        if let Some(limit) = self.request_limit {
            if self.requests_made > limit {
                self.next = None;
            }
        }
        let Some(query_type) = self.next.take() else {
            return Ok(None);
        };

        let request = proto::RunQueryRequest {
            project_id: self.project_id.clone(),
            partition_id: self.partition_id.clone(),
            read_options: self.read_options.clone(),
            query_type: Some(query_type.clone()),
        };
        debug!(
            project = %self.project_id,
            gql = matches!(query_type, QueryType::GqlQuery(_)),
            page = self.requests_made + 1,
            "Dispatching run query"
        );

        let response = self.rpc.run_query(request).await?;
        self.requests_made += 1;

        let page = QueryResultPage::from_query(&response)?;
        self.next = continuation(query_type, response.query, &page);
        Ok(Some(page))
    }

    /// Drain every remaining page into one list of entities
    pub async fn all_entities(mut self) -> Result<Vec<Entity>> {
        let mut entities = Vec::new();
        while let Some(page) = self.next_page().await? {
            entities.extend(page.into_entities());
        }
        Ok(entities)
    }

    /// View the remaining pages as a stream
    pub fn into_stream(self) -> impl Stream<Item = Result<QueryResultPage>> + Send {
        stream::try_unfold(self, |mut pages| async move {
            Ok(pages.next_page().await?.map(|page| (page, pages)))
        })
    }
}

/// Query for the page after `page`, if there is one.
///
/// GQL follow-ups use the structured query the service echoed back. Limit and
/// offset are reduced by what this page already consumed.
fn continuation(
    previous: QueryType,
    echoed: Option<proto::Query>,
    page: &QueryResultPage,
) -> Option<QueryType> {
    if !page.is_not_finished() {
        return None;
    }
    let end_cursor = page.end_cursor()?;

    let mut query = match previous {
        QueryType::Query(query) => query,
        QueryType::GqlQuery(_) => echoed?,
    };

    query.start_cursor = end_cursor.as_bytes().to_vec();
    if let Some(limit) = query.limit {
        let remaining = limit.saturating_sub(page.len() as i32);
        if remaining <= 0 {
            return None;
        }
        query.limit = Some(remaining);
    }
    query.offset = (query.offset - page.skipped_results()).max(0);

    Some(QueryType::Query(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dstore_core::{Cursor, Key};

    fn page(more: proto::MoreResultsType, entities: usize, skipped: i32, end: &[u8]) -> QueryResultPage {
        let entity_results = (0..entities)
            .map(|i| proto::EntityResult {
                entity: Some(entity_to_proto(&Entity::new(Key::with_id("Task", i as i64 + 1)))),
                version: 1,
                cursor: Vec::new(),
            })
            .collect();
        let response = proto::RunQueryResponse {
            batch: Some(proto::QueryResultBatch {
                entity_results,
                skipped_results: skipped,
                end_cursor: end.to_vec(),
                more_results: more as i32,
                ..Default::default()
            }),
            query: None,
        };
        QueryResultPage::from_query(&response).unwrap()
    }

    #[test]
    fn test_any_query_from() {
        let structured: AnyQuery = Query::new().kind("Task").into();
        assert!(matches!(structured.to_proto(), QueryType::Query(_)));

        let gql: AnyQuery = GqlQuery::new("SELECT * FROM Task").into();
        assert!(matches!(gql.to_proto(), QueryType::GqlQuery(_)));
    }

    #[test]
    fn test_continuation_threads_cursor_limit_and_offset() {
        let query = Query::new().kind("Task").limit(5).offset(3);
        let previous = AnyQuery::from(query).to_proto();
        let current = page(proto::MoreResultsType::NotFinished, 2, 3, b"end");

        match continuation(previous, None, &current) {
            Some(QueryType::Query(next)) => {
                assert_eq!(next.start_cursor, b"end".to_vec());
                assert_eq!(next.limit, Some(3));
                assert_eq!(next.offset, 0);
            }
            other => panic!("expected a follow-up query, got {:?}", other),
        }
    }

    #[test]
    fn test_continuation_stops() {
        let previous = || AnyQuery::from(Query::new().kind("Task").limit(2)).to_proto();

        let done = page(proto::MoreResultsType::NoMoreResults, 1, 0, b"end");
        assert!(continuation(previous(), None, &done).is_none());

        let no_cursor = page(proto::MoreResultsType::NotFinished, 1, 0, b"");
        assert!(continuation(previous(), None, &no_cursor).is_none());

        let limit_used = page(proto::MoreResultsType::NotFinished, 2, 0, b"end");
        assert!(continuation(previous(), None, &limit_used).is_none());
    }

    #[test]
    fn test_gql_continuation_uses_echoed_query() {
        let previous = AnyQuery::from(GqlQuery::new("SELECT * FROM Task")).to_proto();
        let current = page(proto::MoreResultsType::NotFinished, 1, 0, b"end");

        assert!(continuation(previous.clone(), None, &current).is_none());

        let echoed = query_to_proto(&Query::new().kind("Task").start(Cursor::from_bytes(&b"old"[..])));
        match continuation(previous, Some(echoed), &current) {
            Some(QueryType::Query(next)) => {
                assert_eq!(next.kind[0].name, "Task");
                assert_eq!(next.start_cursor, b"end".to_vec());
            }
            other => panic!("expected a follow-up query, got {:?}", other),
        }
    }
}
