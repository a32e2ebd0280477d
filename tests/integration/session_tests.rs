//! Session persistence across client instances

use crate::common::{anonymous_client, client, html, mount_login};
use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer};

#[tokio::test]
async fn test_saved_session_is_reused_without_login() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/course/5/gradebook/"))
        .and(header("cookie", "sessionid=abc123"))
        .respond_with(html("<html><body>no groups</body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session_path = dir.path().join("session.json");

    let first = client(&server);
    first.login().await.expect("login");
    first.save_session(&session_path).expect("save");

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&session_path).unwrap()).unwrap();
    assert_eq!(saved["username"], "ivan");
    assert_eq!(saved["cookies"][0]["name"], "sessionid");
    assert!(!saved.to_string().contains("secret"));

    // No credentials: only the restored cookie can authenticate
    let second = anonymous_client(&server);
    assert!(second.load_session(&session_path).expect("load"));
    assert_eq!(second.username(), "ivan");

    let gradebook = second.fetch_gradebook(5).await.expect("gradebook");
    assert_eq!(gradebook.course_id, 5);
    assert!(gradebook.groups.is_empty());
}

#[tokio::test]
async fn test_cleared_session_logs_in_again() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;

    let client = client(&server);
    client.login().await.expect("login");
    client.clear_session();
    assert!(client.cookies().is_empty());

    Mock::given(method("GET"))
        .and(path("/course/5/queue"))
        .and(header("cookie", "sessionid=abc123"))
        .respond_with(html("<html>queue</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let body = client.fetch_queue_page(5).await.expect("queue page");
    assert_eq!(body, "<html>queue</html>");
}

#[tokio::test]
async fn test_restored_cookies_keep_their_path_scope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/course/5/gradebook/"))
        .and(header("cookie", "sessionid=abc123"))
        .respond_with(html("<html><body>no groups</body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session_path = dir.path().join("session.json");
    let session = serde_json::json!({
        "username": "ivan",
        "cookies": [
            {"name": "sessionid", "value": "abc123", "domain": "127.0.0.1", "path": "/"},
            {"name": "filter", "value": "mine", "domain": "127.0.0.1", "path": "/course/5/grade"},
            {"name": "tracker", "value": "x", "domain": "example.com", "path": "/"}
        ]
    });
    std::fs::write(&session_path, session.to_string()).unwrap();

    let client = anonymous_client(&server);
    assert!(client.load_session(&session_path).expect("load"));
    assert_eq!(client.cookies().len(), 2);
    assert_eq!(client.cookie("tracker"), None);

    // `/course/5/grade` is a string prefix of the gradebook path but not a path match
    let gradebook = client.fetch_gradebook(5).await.expect("gradebook");
    assert_eq!(gradebook.course_id, 5);
}
