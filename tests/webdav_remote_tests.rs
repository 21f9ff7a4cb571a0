//! WebDAV adapter behavior against a mocked server.

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use collectsync::errors::RemoteError;
use collectsync::models::EntryKind;
use collectsync::services::webdav::{RetryConfig, WebDAVConfig, WebDAVRemote};
use collectsync::storage::RemoteStorage;

fn remote_for(server: &MockServer) -> WebDAVRemote {
    let config = WebDAVConfig::new(
        server.uri(),
        "alice".to_string(),
        "secret".to_string(),
    );
    WebDAVRemote::new_with_retry(
        config,
        RetryConfig {
            max_retries: 1,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
            rate_limit_backoff_ms: 1,
        },
    )
    .expect("failed to build WebDAV remote")
}

fn multistatus(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(207).set_body_string(body.to_string())
}

fn dir_response(href: &str, name: &str) -> String {
    format!(
        r#"<d:response>
            <d:href>{href}</d:href>
            <d:propstat>
                <d:prop>
                    <d:displayname>{name}</d:displayname>
                    <d:getetag>"{name}etag"</d:getetag>
                    <d:resourcetype><d:collection/></d:resourcetype>
                </d:prop>
                <d:status>HTTP/1.1 200 OK</d:status>
            </d:propstat>
        </d:response>"#
    )
}

fn file_response(href: &str, name: &str, size: u64) -> String {
    format!(
        r#"<d:response>
            <d:href>{href}</d:href>
            <d:propstat>
                <d:prop>
                    <d:displayname>{name}</d:displayname>
                    <d:getlastmodified>Thu, 24 Jul 2025 19:16:19 GMT</d:getlastmodified>
                    <d:getetag>"{name}etag"</d:getetag>
                    <d:getcontentlength>{size}</d:getcontentlength>
                    <d:resourcetype/>
                </d:prop>
                <d:status>HTTP/1.1 200 OK</d:status>
            </d:propstat>
        </d:response>"#
    )
}

fn wrap_multistatus(responses: &[String]) -> String {
    format!(
        r#"<?xml version="1.0"?><d:multistatus xmlns:d="DAV:">{}</d:multistatus>"#,
        responses.join("")
    )
}

#[tokio::test]
async fn stat_maps_404_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/Collectives/missing.md"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    let result = remote.stat("/Collectives/missing.md").await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn stat_reports_the_entry_kind() {
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/Collectives"))
        .and(header("Depth", "0"))
        .respond_with(multistatus(&wrap_multistatus(&[dir_response(
            "/Collectives/",
            "Collectives",
        )])))
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    let kind = remote.stat("/Collectives").await.unwrap();
    assert_eq!(kind, Some(EntryKind::Directory));
}

#[tokio::test]
async fn stat_sends_a_depth_zero_propfind() {
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/Collectives"))
        .and(header("Depth", "0"))
        .and(body_string_contains("getetag"))
        .respond_with(multistatus(&wrap_multistatus(&[dir_response(
            "/Collectives/",
            "Collectives",
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    remote.stat("/Collectives").await.unwrap();
}

#[tokio::test]
async fn create_directory_succeeds_on_201() {
    let server = MockServer::start().await;

    Mock::given(method("MKCOL"))
        .and(path("/Collectives/notes"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    remote.create_directory("/Collectives/notes").await.unwrap();
}

#[tokio::test]
async fn create_directory_reports_already_exists_on_405() {
    let server = MockServer::start().await;

    Mock::given(method("MKCOL"))
        .and(path("/Collectives"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    let err = remote.create_directory("/Collectives").await.unwrap_err();
    assert!(err.is_already_exists());
}

#[tokio::test]
async fn recursive_listing_walks_subdirectories() {
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/Collectives"))
        .and(header("Depth", "1"))
        .respond_with(multistatus(&wrap_multistatus(&[
            dir_response("/Collectives/", "Collectives"),
            dir_response("/Collectives/notes/", "notes"),
            file_response("/Collectives/top.md", "top.md", 10),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("PROPFIND"))
        .and(path("/Collectives/notes"))
        .and(header("Depth", "1"))
        .respond_with(multistatus(&wrap_multistatus(&[
            dir_response("/Collectives/notes/", "notes"),
            file_response("/Collectives/notes/deep.md", "deep.md", 20),
        ])))
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    let entries = remote.list_directory_recursive("/Collectives").await.unwrap();

    let mut paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "/Collectives/notes",
            "/Collectives/notes/deep.md",
            "/Collectives/top.md",
        ]
    );

    let files: Vec<_> = entries.iter().filter(|e| e.is_markdown_file()).collect();
    assert_eq!(files.len(), 2);
}

#[tokio::test]
async fn listing_a_missing_root_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/Collectives"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    let err = remote
        .list_directory_recursive("/Collectives")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn get_and_put_round_trip_content() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/Collectives/a.md"))
        .and(body_string_contains("hello"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Collectives/a.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    remote
        .put_file_content("/Collectives/a.md", "hello")
        .await
        .unwrap();
    let content = remote.get_file_content("/Collectives/a.md").await.unwrap();
    assert_eq!(content, "hello");
}

#[tokio::test]
async fn unauthorized_is_a_connection_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Collectives/a.md"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    let err = remote.get_file_content("/Collectives/a.md").await.unwrap_err();
    assert!(matches!(err, RemoteError::Unauthorized { .. }));
    assert!(err.is_connection_error());
}

#[tokio::test]
async fn server_errors_are_retried_then_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Collectives/a.md"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2) // initial attempt + one retry
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    let err = remote.get_file_content("/Collectives/a.md").await.unwrap_err();
    assert!(matches!(err, RemoteError::Server { status: 503, .. }));
}

#[tokio::test]
async fn paths_with_spaces_are_percent_encoded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Collectives/my%20notes/a%20b.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string("spaced"))
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    let content = remote
        .get_file_content("/Collectives/my notes/a b.md")
        .await
        .unwrap();
    assert_eq!(content, "spaced");
}
