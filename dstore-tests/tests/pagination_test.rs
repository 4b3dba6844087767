use dstore_client::QueryOptions;
use dstore_core::{Cursor, Entity, Key};
use dstore_proto::{self as proto, run_query_request::QueryType};
use dstore_test_utils::*;
use futures::TryStreamExt;

fn page_of(ids: &[i64], end: &[u8], more: proto::MoreResultsType) -> proto::RunQueryResponse {
    let entities: Vec<(Entity, &[u8])> = ids
        .iter()
        .map(|id| (task(*id, "page item"), &b"item-cursor"[..]))
        .collect();
    query_response(&entities, end, more)
}

fn structured(request: &proto::RunQueryRequest) -> &proto::Query {
    match &request.query_type {
        Some(QueryType::Query(query)) => query,
        other => panic!("expected a structured query, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pages_follow_end_cursor_until_finished() {
    init_tracing();
    let mock = MockDatastore::new();
    mock.expect_run_query(page_of(&[1, 2], b"cursor-1", proto::MoreResultsType::NotFinished))
        .expect_run_query(page_of(&[3, 4], b"cursor-2", proto::MoreResultsType::NotFinished))
        .expect_run_query(page_of(&[5], b"cursor-3", proto::MoreResultsType::NoMoreResults));
    let dataset = test_dataset(&mock);

    let mut pages = dataset.run_pages(dataset.query("Task"), QueryOptions::new());
    let mut seen = Vec::new();
    while let Some(page) = pages.next_page().await.unwrap() {
        seen.push(page.len());
    }

    assert_eq!(seen, vec![2, 2, 1]);
    assert_eq!(pages.requests_made(), 3);
    assert!(pages.next_page().await.unwrap().is_none());

    let requests = mock.run_query_requests();
    assert_eq!(requests.len(), 3);
    assert!(structured(&requests[0]).start_cursor.is_empty());
    assert_eq!(structured(&requests[1]).start_cursor, b"cursor-1".to_vec());
    assert_eq!(structured(&requests[2]).start_cursor, b"cursor-2".to_vec());
}

#[tokio::test]
async fn test_more_after_limit_stops_paging() {
    let mock = MockDatastore::new();
    mock.expect_run_query(page_of(&[1, 2], b"cursor-1", proto::MoreResultsType::MoreResultsAfterLimit));
    let dataset = test_dataset(&mock);

    let entities = dataset
        .run_pages(dataset.query("Task").limit(2), QueryOptions::new())
        .all_entities()
        .await
        .unwrap();

    assert_eq!(entities.len(), 2);
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_request_limit_caps_follow_ups() {
    let mock = MockDatastore::new();
    for _ in 0..3 {
        mock.expect_run_query(page_of(&[1], b"more", proto::MoreResultsType::NotFinished));
    }
    let dataset = test_dataset(&mock);

    let entities = dataset
        .run_pages(dataset.query("Task"), QueryOptions::new())
        .request_limit(1)
        .all_entities()
        .await
        .unwrap();

    assert_eq!(entities.len(), 2);
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_follow_ups_reduce_limit_and_offset() {
    let mock = MockDatastore::new();
    let mut first = page_of(&[1, 2], b"cursor-1", proto::MoreResultsType::NotFinished);
    if let Some(batch) = first.batch.as_mut() {
        batch.skipped_results = 1;
    }
    mock.expect_run_query(first)
        .expect_run_query(page_of(&[3], b"cursor-2", proto::MoreResultsType::NoMoreResults));
    let dataset = test_dataset(&mock);

    let query = dataset.query("Task").limit(5).offset(3);
    let entities = dataset
        .run_pages(query, QueryOptions::new())
        .all_entities()
        .await
        .unwrap();
    assert_eq!(entities.len(), 3);

    let requests = mock.run_query_requests();
    let follow_up = structured(&requests[1]);
    assert_eq!(follow_up.limit, Some(3));
    assert_eq!(follow_up.offset, 2);
}

#[tokio::test]
async fn test_gql_follow_up_uses_echoed_query() {
    let mock = MockDatastore::new();
    let mut first = page_of(&[1], b"cursor-1", proto::MoreResultsType::NotFinished);
    first.query = Some(proto::Query {
        kind: vec![proto::KindExpression {
            name: "Task".to_string(),
        }],
        ..Default::default()
    });
    mock.expect_run_query(first)
        .expect_run_query(page_of(&[2], b"", proto::MoreResultsType::NoMoreResults));
    let dataset = test_dataset(&mock);

    let pages = dataset.run_pages(dataset.gql("SELECT * FROM Task"), QueryOptions::new().namespace("ns"));
    let collected: Vec<_> = pages.into_stream().try_collect().await.unwrap();
    assert_eq!(collected.len(), 2);

    let requests = mock.run_query_requests();
    assert!(matches!(requests[0].query_type, Some(QueryType::GqlQuery(_))));
    let follow_up = structured(&requests[1]);
    assert_eq!(follow_up.kind[0].name, "Task");
    assert_eq!(follow_up.start_cursor, b"cursor-1".to_vec());
    assert_eq!(
        requests[1].partition_id.as_ref().map(|p| p.namespace_id.as_str()),
        Some("ns")
    );
}

#[tokio::test]
async fn test_page_error_ends_stream() {
    let mock = MockDatastore::new();
    mock.expect_run_query(page_of(&[1], b"cursor-1", proto::MoreResultsType::NotFinished))
        .fail_run_query(tonic::Status::unavailable("backend down"));
    let dataset = test_dataset(&mock);

    let mut pages = dataset.run_pages(dataset.query("Task"), QueryOptions::new());
    assert!(pages.next_page().await.unwrap().is_some());
    let err = pages.next_page().await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_resume_from_cursor_of_entity() {
    let mock = MockDatastore::new();
    let entities = vec![
        (task(1, "first"), &b"after-first"[..]),
        (task(2, "second"), &b"after-second"[..]),
    ];
    mock.expect_run_query(query_response(&entities, b"after-second", proto::MoreResultsType::MoreResultsAfterLimit))
        .expect_run_query(page_of(&[2], b"", proto::MoreResultsType::NoMoreResults));
    let dataset = test_dataset(&mock);

    let page = dataset
        .run(dataset.query("Task").limit(2), QueryOptions::new())
        .await
        .unwrap();
    let first = &page.entities()[0];
    assert_eq!(first.key(), &Key::with_id("Task", 1).with_project(PROJECT));

    let cursor = page.cursor_for(first).unwrap();
    let text = cursor.to_base64();
    let resumed = Cursor::from_base64(&text).unwrap();
    assert_eq!(resumed, cursor);

    dataset
        .run(dataset.query("Task").start(resumed), QueryOptions::new())
        .await
        .unwrap();
    assert_eq!(
        structured(&mock.run_query_requests()[1]).start_cursor,
        b"after-first".to_vec()
    );
}
