//! REST sink against a mock PostgREST endpoint

use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rollcall::capture::capture;
use rollcall::config::SinkConfig;
use rollcall::sink::{RemoteError, RemoteSink, RestSink};
use rollcall::storage::MemoryStore;
use rollcall::sync::{SyncOutcome, SyncTrigger};

use super::fixtures::{POSTGREST_CONFLICT_BODY, POSTGREST_UNAVAILABLE_BODY};

fn sink_config(url: String) -> SinkConfig {
    SinkConfig {
        url,
        api_key: Some("anon-key".to_string()),
        timeout_secs: 2,
        max_retries: 2,
        retry_base_delay_ms: 10,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_batch_posted_with_wire_shape() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/attendance"))
        .and(query_param("on_conflict", "id"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = RestSink::new(&sink_config(mock_server.uri())).unwrap();
    let records = vec![capture("04A1B2C3").unwrap(), capture("QR-17").unwrap()];
    sink.submit_batch(&records).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].headers.get("prefer").unwrap().to_str().unwrap(),
        "return=minimal,resolution=ignore-duplicates"
    );
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["rfid_tag"], "04A1B2C3");
    assert_eq!(rows[0]["status"], "Present");
    assert_eq!(rows[0]["id"], records[0].id().to_string());
    assert_eq!(rows[0]["timestamp"], records[0].timestamp_iso());
    assert_eq!(rows[0]["date"], records[0].date().to_string());
    assert_eq!(rows[1]["rfid_tag"], "QR-17");
}

#[tokio::test]
async fn test_transient_error_retried_then_accepted() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string(POSTGREST_UNAVAILABLE_BODY))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = RestSink::new(&sink_config(mock_server.uri())).unwrap();
    sink.submit_batch(&[capture("A").unwrap()]).await.unwrap();
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string(POSTGREST_CONFLICT_BODY))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = RestSink::new(&sink_config(mock_server.uri())).unwrap();
    let err = sink.submit_batch(&[capture("A").unwrap()]).await.unwrap_err();

    match err {
        RemoteError::Http { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("not-null"));
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_maps_to_timeout_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let config = SinkConfig {
        timeout_secs: 1,
        max_retries: 0,
        ..sink_config(mock_server.uri())
    };
    let sink = RestSink::new(&config).unwrap();
    let err = sink.submit_batch(&[capture("A").unwrap()]).await.unwrap_err();
    assert_eq!(err, RemoteError::Timeout);
}

#[tokio::test]
async fn test_non_idempotent_sink_omits_conflict_target() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = SinkConfig {
        idempotent: false,
        ..sink_config(mock_server.uri())
    };
    let sink = RestSink::new(&config).unwrap();
    let record = capture("A").unwrap();
    sink.submit_batch(std::slice::from_ref(&record)).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].url.query().is_none());
    assert_eq!(
        requests[0].headers.get("prefer").unwrap().to_str().unwrap(),
        "return=minimal"
    );

    // Tables without an `id` column reject unknown keys
    let rows: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(rows[0].get("id").is_none());
    assert_eq!(rows[0]["rfid_tag"], "A");
    assert_eq!(rows[0]["status"], "Present");
    assert_eq!(rows[0]["timestamp"], record.timestamp_iso());
}

#[tokio::test]
async fn test_orchestrator_drains_through_rest_sink() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/attendance"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = std::sync::Arc::new(RestSink::new(&sink_config(mock_server.uri())).unwrap());
    let queue = rollcall::storage::DurableQueue::open(MemoryStore::new(), "offline_attendance").unwrap();
    let orch = rollcall::SyncOrchestrator::new(
        queue,
        sink,
        rollcall::connectivity::ConnectivityMonitor::new(false),
    );

    for tag in ["A", "B", "C"] {
        orch.record_scan(tag).await.unwrap();
    }
    assert_eq!(
        orch.sync_now(SyncTrigger::Manual).await,
        SyncOutcome::Synced {
            delivered: 3,
            pending: 0
        }
    );

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body.as_array().unwrap().len(), 3);
}
