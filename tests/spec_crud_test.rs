//! Spec create/get/update/delete and view semantics

mod common;

use common::{create_test_registry, seed_spec, seed_version, DISCOVERY_DOC};
use registry_core::{
    types::sha256_hex, ArtifactValue, ListRequest, NotificationKind, RegistryError, SpecBody,
    View,
};

const VERSION: &str = "projects/p/apis/a/versions/v";

#[tokio::test]
async fn test_basic_view_never_reads_contents() {
    let reg = create_test_registry();
    seed_version(&reg.server, "p", "a", "v").await;
    seed_spec(&reg.server, VERSION, "s", "discovery", DISCOVERY_DOC.as_bytes()).await;
    let reads = reg.storage.content_reads();
    assert_eq!(reads, 0);

    let basic = reg
        .server
        .get_spec(&format!("{}/specs/s", VERSION), View::Basic)
        .await
        .unwrap();
    assert!(basic.contents.is_none());
    assert_eq!(basic.size_bytes, DISCOVERY_DOC.len() as i64);
    assert_eq!(basic.hash, sha256_hex(DISCOVERY_DOC.as_bytes()));

    let listed = reg
        .server
        .list_specs(VERSION, &ListRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.items.len(), 1);
    assert!(listed.items[0].contents.is_none());
    assert_eq!(reg.storage.content_reads(), reads);

    let full = reg
        .server
        .get_spec(&format!("{}/specs/s", VERSION), View::Full)
        .await
        .unwrap();
    assert_eq!(full.contents.as_deref(), Some(DISCOVERY_DOC.as_bytes()));
    assert_eq!(reg.storage.content_reads(), reads + 1);
}

#[tokio::test]
async fn test_create_spec_preconditions() {
    let reg = create_test_registry();
    let body = SpecBody {
        style: "openapi/v3".into(),
        ..SpecBody::default()
    };

    let err = reg
        .server
        .create_spec(VERSION, Some("s"), &body)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    seed_version(&reg.server, "p", "a", "v").await;
    reg.server.create_spec(VERSION, Some("s"), &body).await.unwrap();
    let err = reg
        .server
        .create_spec(VERSION, Some("s"), &body)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyExists(_)));

    let err = reg
        .server
        .create_spec("projects/p/apis/a", Some("s"), &body)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_update_spec_keeps_or_replaces_contents() {
    let reg = create_test_registry();
    seed_version(&reg.server, "p", "a", "v").await;
    let created = seed_spec(&reg.server, VERSION, "s", "discovery", b"{\"a\":1}").await;
    let name = created.name.to_string();

    let described = reg
        .server
        .update_spec(
            &name,
            &SpecBody {
                description: "library surface".into(),
                ..SpecBody::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(described.style, "discovery");
    assert_eq!(described.hash, created.hash);
    assert!(described.update_time >= created.update_time);
    assert_eq!(described.create_time, created.create_time);

    reg.server
        .update_spec(
            &name,
            &SpecBody {
                style: "openapi/v3".into(),
                contents: Some(b"openapi: 3.0.0".to_vec()),
                ..SpecBody::default()
            },
        )
        .await
        .unwrap();
    let full = reg.server.get_spec(&name, View::Full).await.unwrap();
    assert_eq!(full.style, "openapi/v3");
    assert_eq!(full.description, "");
    assert_eq!(full.contents.as_deref(), Some(&b"openapi: 3.0.0"[..]));

    let err = reg
        .server
        .update_spec(&format!("{}/specs/nope", VERSION), &SpecBody::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_spec_removes_artifacts_first() {
    let reg = create_test_registry();
    seed_version(&reg.server, "p", "a", "v").await;
    let spec = seed_spec(&reg.server, VERSION, "s", "discovery", b"{}").await;
    let spec_name = spec.name.to_string();
    reg.server
        .create_artifact(&spec_name, Some("lint"), &ArtifactValue::Bool { value: true })
        .await
        .unwrap();
    let before = reg.notifier.notifications().len();

    reg.server.delete_spec(&spec_name).await.unwrap();

    let events: Vec<_> = reg.notifier.events().into_iter().skip(before).collect();
    assert_eq!(
        events,
        vec![
            (NotificationKind::Deleted, format!("{}/artifacts/lint", spec_name)),
            (NotificationKind::Deleted, spec_name.clone()),
        ]
    );
    assert!(reg
        .server
        .get_spec(&spec_name, View::Basic)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(reg.server.delete_spec(&spec_name).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_list_specs_filter_and_wildcard_parent() {
    let reg = create_test_registry();
    seed_version(&reg.server, "p", "a", "v").await;
    seed_version(&reg.server, "p", "b", "v").await;
    seed_spec(&reg.server, VERSION, "one", "openapi/v2", b"{}").await;
    seed_spec(&reg.server, "projects/p/apis/b/versions/v", "two", "openapi/v3", b"{}").await;
    seed_spec(&reg.server, "projects/p/apis/b/versions/v", "three", "discovery", b"{}").await;

    let page = reg
        .server
        .list_specs(
            "projects/p/apis/-/versions/v",
            &ListRequest {
                filter: r#"style.startsWith("openapi")"#.into(),
                ..ListRequest::default()
            },
        )
        .await
        .unwrap();
    let ids: Vec<&str> = page.items.iter().map(|s| s.name.spec_id.as_str()).collect();
    assert_eq!(ids, vec!["one", "two"]);

    let err = reg
        .server
        .list_specs(
            VERSION,
            &ListRequest {
                filter: r#"mime_type == "x""#.into(),
                ..ListRequest::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArgument(_)));
}
