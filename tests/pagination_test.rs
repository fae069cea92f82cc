//! Paging through listings with tokens

mod common;

use common::{create_test_registry, seed_version};
use registry_core::{ContainerBody, ListRequest, RegistryError};
use std::collections::BTreeSet;

async fn seed_projects(server: &registry_core::RegistryServer, n: usize) {
    for i in 0..n {
        server
            .create_project(Some(&format!("p{:03}", i)), &ContainerBody::default())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_pages_are_disjoint_and_complete() {
    let reg = create_test_registry();
    seed_projects(&reg.server, 137).await;

    let mut request = ListRequest::with_page_size(10);
    let mut seen = Vec::new();
    let mut pages = 0;
    loop {
        let page = reg.server.list_projects(&request).await.unwrap();
        assert!(page.items.len() <= 10);
        pages += 1;
        seen.extend(page.items.into_iter().map(|p| p.name.to_string()));
        if page.next_page_token.is_empty() {
            break;
        }
        request.page_token = page.next_page_token;
    }

    assert_eq!(pages, 14);
    assert_eq!(seen.len(), 137);
    let unique: BTreeSet<_> = seen.iter().cloned().collect();
    assert_eq!(unique.len(), 137);

    let everything = reg
        .server
        .list_projects(&ListRequest::with_page_size(137))
        .await
        .unwrap();
    assert!(everything.next_page_token.is_empty());
    let all: Vec<String> = everything.items.iter().map(|p| p.name.to_string()).collect();
    assert_eq!(seen, all);
}

#[tokio::test]
async fn test_insert_before_cursor_does_not_shift_pages() {
    let reg = create_test_registry();
    seed_projects(&reg.server, 20).await;

    let first = reg
        .server
        .list_projects(&ListRequest::with_page_size(10))
        .await
        .unwrap();
    reg.server
        .create_project(Some("a-late-arrival"), &ContainerBody::default())
        .await
        .unwrap();

    let second = reg
        .server
        .list_projects(&ListRequest {
            page_token: first.next_page_token.clone(),
            ..ListRequest::with_page_size(10)
        })
        .await
        .unwrap();
    assert_eq!(second.items[0].name.to_string(), "projects/p010");
    assert_eq!(second.items.len(), 10);
    assert!(second.next_page_token.is_empty());
}

#[tokio::test]
async fn test_page_size_rules() {
    let reg = create_test_registry();
    seed_projects(&reg.server, 60).await;

    let default_page = reg
        .server
        .list_projects(&ListRequest::default())
        .await
        .unwrap();
    assert_eq!(default_page.items.len(), 50);
    assert!(!default_page.next_page_token.is_empty());

    let huge = reg
        .server
        .list_projects(&ListRequest::with_page_size(100_000))
        .await
        .unwrap();
    assert_eq!(huge.items.len(), 60);
    assert!(huge.next_page_token.is_empty());

    let err = reg
        .server
        .list_projects(&ListRequest::with_page_size(-1))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_token_rejected_under_different_filter() {
    let reg = create_test_registry();
    seed_version(&reg.server, "p", "a", "v").await;
    for i in 0..5 {
        seed_version(&reg.server, "p", "a", &format!("v{}", i)).await;
    }

    let first = reg
        .server
        .list_versions(
            "projects/p/apis/a",
            &ListRequest {
                filter: r#"name.contains("/v")"#.into(),
                ..ListRequest::with_page_size(2)
            },
        )
        .await
        .unwrap();
    assert!(!first.next_page_token.is_empty());

    let err = reg
        .server
        .list_versions(
            "projects/p/apis/a",
            &ListRequest {
                page_token: first.next_page_token,
                ..ListRequest::with_page_size(2)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArgument(_)));

    let err = reg
        .server
        .list_versions(
            "projects/p/apis/a",
            &ListRequest {
                page_token: "%%% not a token".into(),
                ..ListRequest::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArgument(_)));
}
