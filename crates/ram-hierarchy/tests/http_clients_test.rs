//! Contract tests for the hierarchy HTTP collaborators.
//!
//! These tests use wiremock to stand in for the document store behind the
//! hierarchy cache and for the live resource-manager directory.
//!
//! | Collaborator          | Path                               | Test |
//! |-----------------------|------------------------------------|------|
//! | DocumentStoreClient   | `GET /{collection}/{key}`          | `store_*` |
//! | ResourceManagerClient | `GET /v3/{collection}/{id}`        | `directory_*` |
//! | HierarchyResolver     | both                               | `resolver_*` |

use std::sync::Arc;
use std::time::Duration;

use ram_core::AncestorKind;
use ram_hierarchy::{
    CacheError, DirectoryError, DirectoryLookup, DocumentStoreClient, HierarchyCache,
    HierarchyResolver, ResolverConfig, ResourceManagerClient,
};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer) -> DocumentStoreClient {
    DocumentStoreClient::new(reqwest::Client::new(), server.uri().parse().unwrap(), "assets")
}

fn directory(server: &MockServer) -> ResourceManagerClient {
    ResourceManagerClient::new(reqwest::Client::new(), server.uri().parse().unwrap())
}

// ── DocumentStoreClient ──────────────────────────────────────────────

#[tokio::test]
async fn store_returns_document_on_hit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assets/folder-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "resource": {"data": {"displayName": "Finance"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let doc = store(&server).lookup("folder-key").await.unwrap().unwrap();
    assert_eq!(doc["resource"]["data"]["displayName"], "Finance");
}

#[tokio::test]
async fn store_treats_404_as_miss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(store(&server).lookup("absent").await.unwrap().is_none());
}

#[tokio::test]
async fn store_surfaces_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    match store(&server).lookup("k").await.unwrap_err() {
        CacheError::ApiError { status, body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected ApiError, got: {other:?}"),
    }
}

#[tokio::test]
async fn store_rejects_non_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    assert!(matches!(
        store(&server).lookup("k").await,
        Err(CacheError::Deserialization { .. })
    ));
}

// ── ResourceManagerClient ────────────────────────────────────────────

#[tokio::test]
async fn directory_reads_display_name_per_kind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/organizations/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "organizations/42",
            "displayName": "example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/projects/web-prod"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "projects/123",
            "projectId": "web-prod",
            "displayName": "Web Production"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = directory(&server);
    assert_eq!(
        client.display_name(AncestorKind::Organization, "42").await.unwrap(),
        "example.com"
    );
    assert_eq!(
        client.display_name(AncestorKind::Project, "web-prod").await.unwrap(),
        "Web Production"
    );
}

#[tokio::test]
async fn directory_maps_404_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(matches!(
        directory(&server).display_name(AncestorKind::Folder, "1").await,
        Err(DirectoryError::NotFound(_))
    ));
}

#[tokio::test]
async fn directory_requires_display_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "folders/1"})))
        .mount(&server)
        .await;

    assert!(matches!(
        directory(&server).display_name(AncestorKind::Folder, "1").await,
        Err(DirectoryError::MissingDisplayName { .. })
    ));
}

#[tokio::test]
async fn directory_permission_denied_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
        .mount(&server)
        .await;

    match directory(&server).display_name(AncestorKind::Folder, "1").await.unwrap_err() {
        DirectoryError::ApiError { status, .. } => assert_eq!(status, 403),
        other => panic!("expected ApiError, got: {other:?}"),
    }
}

// ── HierarchyResolver over HTTP ──────────────────────────────────────

#[tokio::test]
async fn resolver_falls_back_to_directory_after_cache_misses() {
    let cache_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/assets/.+folders.+77$"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&cache_server)
        .await;

    let dir_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/folders/77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"displayName": "Platform"})))
        .expect(1)
        .mount(&dir_server)
        .await;

    let resolver = HierarchyResolver::new(
        Arc::new(store(&cache_server)),
        Arc::new(directory(&dir_server)),
        ResolverConfig {
            max_attempts: 2,
            backoff_step: Duration::from_millis(1),
        },
    );

    let names = resolver
        .resolve_display_names(&["folders/77".to_string(), "tagValues/3".to_string()])
        .await;
    assert_eq!(names, vec!["Platform".to_string(), "unknown".to_string()]);
}

#[tokio::test]
async fn resolver_survives_unreachable_collaborators() {
    // Closed port: every request fails at the transport layer.
    let dead: url::Url = "http://127.0.0.1:1".parse().unwrap();
    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let resolver = HierarchyResolver::new(
        Arc::new(DocumentStoreClient::new(http.clone(), dead.clone(), "assets")),
        Arc::new(ResourceManagerClient::new(http, dead)),
        ResolverConfig {
            max_attempts: 2,
            backoff_step: Duration::ZERO,
        },
    );

    let names = resolver
        .resolve_display_names(&["projects/1".to_string(), "organizations/2".to_string()])
        .await;
    assert_eq!(names, vec!["unknown".to_string(), "unknown".to_string()]);
}
