//! HTTP notification API

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use registry_core::{
    api::{ApiServer, ApiServerConfig, HealthResponse},
    BroadcastNotifier, ContainerBody, MemoryStorage, NotificationKind, RegistryServer,
};
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_reports_subscribers() {
    let notifier = BroadcastNotifier::default();
    let _listener = notifier.subscribe();
    let server = ApiServer::new(ApiServerConfig::default(), notifier);

    let response = server
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.subscribers, 1);
    assert_eq!(health.instance_id, server.instance_id());
}

#[tokio::test]
async fn test_notifications_endpoint_is_an_event_stream() {
    let notifier = BroadcastNotifier::default();
    let server = ApiServer::new(ApiServerConfig::default(), notifier.clone());

    let response = server
        .router()
        .oneshot(
            Request::builder()
                .uri("/v1/notifications?kind=DELETED&prefix=projects/p")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
    assert_eq!(notifier.subscriber_count(), 1);

    drop(response);
    assert_eq!(notifier.subscriber_count(), 0);
}

#[tokio::test]
async fn test_bad_query_is_rejected() {
    let server = ApiServer::new(ApiServerConfig::default(), BroadcastNotifier::default());
    let response = server
        .router()
        .oneshot(
            Request::builder()
                .uri("/v1/notifications?kind=EXPLODED")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mutations_reach_subscribers() {
    let notifier = BroadcastNotifier::default();
    let mut rx = notifier.subscribe();
    let server = RegistryServer::new(Arc::new(MemoryStorage::new()), Arc::new(notifier));

    server
        .create_project(Some("p"), &ContainerBody::default())
        .await
        .unwrap();
    server.delete_project("projects/p", false).await.unwrap();

    let created = rx.recv().await.unwrap();
    assert_eq!(created.kind, NotificationKind::Created);
    assert_eq!(created.resource, "projects/p");
    let deleted = rx.recv().await.unwrap();
    assert_eq!(deleted.kind, NotificationKind::Deleted);
}
