//! Command surface against a mocked remote service.

mod support;

use fieldsync_api::commands;
use fieldsync_domain::{
    ConnectionType, ConnectivitySnapshot, FieldSyncError, NetworkQuality, NewRecord, QueueStats,
    RecordStatus, SyncErrorKind, SyncPhase,
};
use serde_json::json;
use support::test_context;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn wifi() -> ConnectivitySnapshot {
    ConnectivitySnapshot::online(ConnectionType::Wifi)
}

async fn accept_records(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/records"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "remoteId": "srv-1" })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn sync_now_drains_after_connectivity_is_reported() {
    let server = MockServer::start().await;
    accept_records(&server).await;
    let (ctx, _dir) = test_context(&format!("{}/api", server.uri()), false).await;

    for n in 0..3 {
        commands::enqueue_record(&ctx, NewRecord::new(json!({ "n": n }))).await.unwrap();
    }

    let refused = commands::sync_now(&ctx).await.unwrap();
    assert!(refused.was_refused());
    assert_eq!(refused.errors[0].kind, SyncErrorKind::NetworkUnavailable);
    assert_eq!(commands::last_sync_timestamp(&ctx).await.unwrap(), None);

    let status = commands::report_connectivity(&ctx, wifi());
    assert_eq!(status.quality, NetworkQuality::Excellent);
    assert_eq!(commands::network_status(&ctx), status);

    let mut progress = commands::subscribe_progress(&ctx);
    let result = commands::sync_now(&ctx).await.unwrap();
    assert_eq!(result.synced_count, 3);
    assert_eq!(commands::pending_count(&ctx).await.unwrap(), 0);
    assert!(commands::last_sync_timestamp(&ctx).await.unwrap().is_some());

    let mut saw_created = false;
    while let Ok(event) = progress.try_recv() {
        saw_created |= event.phase == SyncPhase::RecordCreated;
    }
    assert!(saw_created);
}

#[tokio::test]
async fn failed_records_can_be_listed_reset_and_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/records"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad payload"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    accept_records(&server).await;

    let (ctx, _dir) = test_context(&format!("{}/api", server.uri()), false).await;
    commands::report_connectivity(&ctx, wifi());
    let id = commands::enqueue_record(&ctx, NewRecord::new(json!({ "n": 1 }))).await.unwrap();

    let first = commands::sync_now(&ctx).await.unwrap();
    assert_eq!(first.failed_count, 1);

    let failed = commands::failed_records(&ctx).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].retry_count, 3);

    let stats = commands::queue_stats(&ctx).await.unwrap();
    assert_eq!(stats.failed, 1);

    let reset = commands::reset_record(&ctx, &id).await.unwrap();
    assert_eq!(reset.status, RecordStatus::Pending);
    assert_eq!(reset.retry_count, 0);

    let result = commands::sync_now(&ctx).await.unwrap();
    assert_eq!(result.synced_count, 1);
    assert_eq!(*commands::subscribe_queue(&ctx).borrow(), QueueStats::default());
}

#[tokio::test]
async fn retry_record_rejects_unknown_ids() {
    let (ctx, _dir) = test_context("http://127.0.0.1:9/api", false).await;
    let err = commands::retry_record(&ctx, "missing").await.unwrap_err();
    assert!(matches!(err, FieldSyncError::NotFound(_)));
    assert!(!commands::cancel_sync(&ctx));
}

#[tokio::test]
async fn retry_all_failed_with_empty_queue_does_nothing() {
    let (ctx, _dir) = test_context("http://127.0.0.1:9/api", false).await;
    commands::report_connectivity(&ctx, wifi());
    let result = commands::retry_all_failed(&ctx).await.unwrap();
    assert_eq!(result.attempted, 0);
}

#[tokio::test]
async fn enqueue_rejects_null_payload() {
    let (ctx, _dir) = test_context("http://127.0.0.1:9/api", false).await;
    let err = commands::enqueue_record(&ctx, NewRecord::new(serde_json::Value::Null)).await.unwrap_err();
    assert!(matches!(err, FieldSyncError::InvalidInput(_)));
}

#[tokio::test]
async fn delete_remote_record_hits_the_records_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/records/srv-9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/records/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (ctx, _dir) = test_context(&format!("{}/api", server.uri()), false).await;
    commands::delete_remote_record(&ctx, "srv-9").await.unwrap();

    let err = commands::delete_remote_record(&ctx, "gone").await.unwrap_err();
    assert!(matches!(err, FieldSyncError::NotFound(_)));

    let err = commands::delete_remote_record(&ctx, " ").await.unwrap_err();
    assert!(matches!(err, FieldSyncError::InvalidInput(_)));
}

#[tokio::test]
async fn foreground_signal_triggers_auto_sync_after_debounce() {
    let server = MockServer::start().await;
    accept_records(&server).await;
    let (ctx, _dir) = test_context(&format!("{}/api", server.uri()), true).await;

    commands::enqueue_record(&ctx, NewRecord::new(json!({ "n": 1 }))).await.unwrap();
    commands::report_connectivity(&ctx, wifi());
    assert!(commands::app_foregrounded(&ctx).await);

    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if commands::pending_count(&ctx).await.unwrap() == 0 {
            break;
        }
    }
    assert_eq!(commands::pending_count(&ctx).await.unwrap(), 0);
    ctx.shutdown().await.unwrap();
}
