//! Tests for QuerySession: submission, polling, completion shapes, failures.

use std::time::Duration;

use serde_json::json;

use lambda_query::*;

use crate::support::*;

#[tokio::test]
async fn test_queued_running_completed_polls_twice() {
    let transport = ScriptedTransport::new(vec![
        Ok(submitted("q-1", "QUEUED")),
        Ok(polled("RUNNING")),
        Ok(completed_nested(25, "c0")),
        Ok(page(10, Some("c1"))),
        Ok(page(10, Some("c2"))),
        Ok(page(5, None)),
    ]);
    let cfg = service();
    let mut session = QuerySession::new(spec(10), &transport, &cfg, fast_options());

    let report = session.run().await.expect("session");

    assert_eq!(report.status_polls, 2);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.documents_fetched, 25);
    assert_eq!(report.total_result_count, Some(25));
    assert_eq!(report.query_id, "q-1");
    assert!(report.total_time >= report.query_time);

    assert_eq!(session.status(), QueryStatus::Done);
    assert_eq!(session.query_id(), "q-1");
    assert!(session.started_at().is_some());

    assert_eq!(
        transport.urls(),
        vec![
            format!("{API_SERVER}/v1/orgs/self/ws/taxi/lambdas/trips/tags/latest"),
            status_url("q-1"),
            status_url("q-1"),
            page_url("q-1", "c0", 10),
            page_url("q-1", "c1", 10),
            page_url("q-1", "c2", 10),
        ]
    );
}

#[tokio::test]
async fn test_submit_body_carries_async_options() {
    let transport = ScriptedTransport::new(vec![
        Ok(json!({
            "query_id": "q-2",
            "status": "COMPLETED",
            "results_total_doc_count": 3,
            "pagination": {"start_cursor": "s", "current_page_doc_count": 3}
        })),
        Ok(page(3, None)),
    ]);
    let cfg = service();
    let mut session = QuerySession::new(spec(50), &transport, &cfg, fast_options());
    session.run().await.expect("session");

    let calls = transport.calls();
    let Call::Post { body, .. } = &calls[0] else {
        panic!("first call must be the submit POST");
    };
    assert_eq!(body["async_options"]["client_timeout_ms"], 1);
    assert_eq!(body["async_options"]["timeout_ms"], 1_800_000);
    assert_eq!(body["async_options"]["max_initial_results"], 50);
    assert_eq!(body["parameters"][0]["name"], "borough");
}

#[tokio::test]
async fn test_immediate_inline_completion_skips_polling() {
    let transport = ScriptedTransport::new(vec![
        Ok(json!({
            "query_id": "q-3",
            "status": "COMPLETED",
            "results_total_doc_count": 12,
            "pagination": {"start_cursor": "first", "current_page_doc_count": 10}
        })),
        Ok(page(10, Some("second"))),
        Ok(page(2, None)),
    ]);
    let cfg = service();
    let mut session = QuerySession::new(spec(10), &transport, &cfg, fast_options());

    let report = session.run().await.expect("session");

    assert_eq!(report.status_polls, 0);
    assert_eq!(report.total_result_count, Some(12));
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(transport.urls()[1], page_url("q-3", "first", 10));
}

#[tokio::test]
async fn test_submit_failure_stops_immediately() {
    let transport = ScriptedTransport::new(vec![
        Err(http_error(401, "Unauthorized")),
        Ok(polled("RUNNING")),
    ]);
    let cfg = service();
    let mut session = QuerySession::new(spec(10), &transport, &cfg, fast_options());

    let err = session.run().await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Submit));
    assert!(err.to_string().contains("401"));
    assert_eq!(transport.calls().len(), 1);
    assert_eq!(session.status(), QueryStatus::Error);
    assert_eq!(session.query_id(), "");
}

#[tokio::test]
async fn test_status_failure_stops_immediately() {
    let transport = ScriptedTransport::new(vec![
        Ok(submitted("q-4", "RUNNING")),
        Err(http_error(500, "Internal Server Error")),
        Ok(completed_nested(1, "c0")),
    ]);
    let cfg = service();
    let mut session = QuerySession::new(spec(10), &transport, &cfg, fast_options());

    let err = session.run().await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Status));
    assert_eq!(transport.calls().len(), 2);
    assert_eq!(session.status(), QueryStatus::Error);
}

#[tokio::test]
async fn test_page_failure_stops_immediately() {
    let transport = ScriptedTransport::new(vec![
        Ok(submitted("q-5", "QUEUED")),
        Ok(completed_nested(30, "c0")),
        Ok(page(10, Some("c1"))),
        Err(http_error(404, "Not Found")),
        Ok(page(10, None)),
    ]);
    let cfg = service();
    let mut session = QuerySession::new(spec(10), &transport, &cfg, fast_options());

    let err = session.run().await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Page));
    assert_eq!(transport.calls().len(), 4);
    assert_eq!(session.total_result_count(), Some(30));
}

#[tokio::test]
async fn test_missing_query_id_is_protocol_error() {
    let transport = ScriptedTransport::new(vec![Ok(json!({"status": "QUEUED"}))]);
    let cfg = service();
    let mut session = QuerySession::new(spec(10), &transport, &cfg, fast_options());

    let err = session.run().await.unwrap_err();

    assert!(matches!(err, QueryError::Protocol(_)));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn test_unrecognized_status_is_fatal() {
    let transport = ScriptedTransport::new(vec![
        Ok(submitted("q-6", "QUEUED")),
        Ok(polled("SUSPENDED")),
    ]);
    let cfg = service();
    let mut session = QuerySession::new(spec(10), &transport, &cfg, fast_options());

    let err = session.run().await.unwrap_err();

    match err {
        QueryError::UnrecognizedStatus { query_id, status } => {
            assert_eq!(query_id, "q-6");
            assert_eq!(status, "SUSPENDED");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn test_service_error_status_fails_query() {
    let transport = ScriptedTransport::new(vec![
        Ok(submitted("q-7", "RUNNING")),
        Ok(json!({"data": {"status": "ERROR", "query_errors": [{"message": "division by zero"}]}})),
    ]);
    let mut options = fast_options();
    options.error_policy = QueryErrorPolicy::PollThrough;
    let cfg = service();
    let mut session = QuerySession::new(spec(10), &transport, &cfg, options);

    let err = session.run().await.unwrap_err();

    assert!(matches!(err, QueryError::QueryFailed { ref errors, .. } if errors.contains("division by zero")));
    assert_eq!(session.status(), QueryStatus::Error);
}

#[tokio::test]
async fn test_terminate_on_error_policy() {
    let transport = ScriptedTransport::new(vec![
        Ok(submitted("q-8", "QUEUED")),
        Ok(json!({"data": {"status": "RUNNING", "query_errors": ["slow shard"]}})),
        Ok(completed_nested(0, "c0")),
    ]);
    let mut options = fast_options();
    options.error_policy = QueryErrorPolicy::TerminateOnError;
    let cfg = service();
    let mut session = QuerySession::new(spec(10), &transport, &cfg, options);

    let err = session.run().await.unwrap_err();

    assert!(matches!(err, QueryError::QueryFailed { .. }));
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn test_poll_through_policy_keeps_polling() {
    let transport = ScriptedTransport::new(vec![
        Ok(submitted("q-9", "QUEUED")),
        Ok(json!({"data": {"status": "RUNNING", "query_errors": ["slow shard"]}})),
        Ok(json!({"data": {"status": "RUNNING", "query_errors": ["slow shard"]}})),
        Ok(completed_nested(0, "c0")),
        Ok(page(0, None)),
    ]);
    let cfg = service();
    let mut session = QuerySession::new(spec(10), &transport, &cfg, fast_options());

    let report = session.run().await.expect("session");

    assert_eq!(report.status_polls, 3);
    assert_eq!(report.pages_fetched, 1);
}

#[tokio::test]
async fn test_deadline_stops_polling() {
    let transport = ScriptedTransport::new(vec![Ok(submitted("q-10", "QUEUED"))]);
    let mut options = fast_options();
    options.deadline = Some(Duration::ZERO);
    let cfg = service();
    let mut session = QuerySession::new(spec(10), &transport, &cfg, options);

    let err = session.run().await.unwrap_err();

    assert!(matches!(err, QueryError::DeadlineExceeded { .. }));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn test_pagination_disabled() {
    let transport = ScriptedTransport::new(vec![
        Ok(submitted("q-11", "RUNNING")),
        Ok(completed_nested(99, "c0")),
    ]);
    let mut options = fast_options();
    options.paginate = false;
    let cfg = service();
    let mut session = QuerySession::new(spec(10), &transport, &cfg, options);

    let report = session.run().await.expect("session");

    assert_eq!(report.pages_fetched, 0);
    assert_eq!(report.total_result_count, Some(99));
    assert_eq!(transport.calls().len(), 2);
    assert_eq!(session.status(), QueryStatus::Done);
}

#[tokio::test]
async fn test_pagination_disabled_tolerates_missing_count() {
    let transport = ScriptedTransport::new(vec![
        Ok(submitted("q-12", "RUNNING")),
        Ok(polled("COMPLETED")),
    ]);
    let mut options = fast_options();
    options.paginate = false;
    let cfg = service();
    let mut session = QuerySession::new(spec(10), &transport, &cfg, options);

    let report = session.run().await.expect("session");

    assert_eq!(report.total_result_count, None);
    assert_eq!(report.pages_fetched, 0);
    assert_eq!(transport.calls().len(), 2);
    assert_eq!(session.status(), QueryStatus::Done);
}

#[tokio::test]
async fn test_version_selector_url() {
    let spec = QuerySpec::builder("taxi", "trips")
        .version("abc123")
        .page_size(5)
        .build()
        .unwrap();
    let transport = ScriptedTransport::new(vec![Err(http_error(400, "Bad Request"))]);
    let cfg = service();
    let mut session = QuerySession::new(spec, &transport, &cfg, fast_options());

    let _ = session.run().await;

    assert_eq!(
        transport.urls(),
        vec![format!("{API_SERVER}/v1/orgs/self/ws/taxi/lambdas/trips/versions/abc123")]
    );
}
