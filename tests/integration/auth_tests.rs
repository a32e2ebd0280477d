//! Login and session-renewal behavior

use crate::common::{client, html, mount_login, mount_login_form, to_login, LOGIN_PAGE};
use anytask_scraper::AnytaskError;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    let client = client(&server);
    client.login().await.expect("login");

    assert!(client.is_authenticated());
    assert_eq!(client.cookie("sessionid").as_deref(), Some("abc123"));
}

#[tokio::test]
async fn test_login_posts_form_fields() {
    let server = MockServer::start().await;
    mount_login_form(&server).await;

    Mock::given(method("POST"))
        .and(path("/accounts/login/"))
        .and(body_string_contains("csrfmiddlewaretoken=logintoken"))
        .and(body_string_contains("username=ivan"))
        .and(body_string_contains("password=secret"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("home"))
        .mount(&server)
        .await;

    client(&server).login().await.expect("login");
}

#[tokio::test]
async fn test_login_without_csrf_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/login/"))
        .respond_with(html("<html><form><input id=\"id_username\"></form></html>"))
        .mount(&server)
        .await;

    let err = client(&server).login().await.unwrap_err();
    assert!(err.is_auth(), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let server = MockServer::start().await;
    mount_login_form(&server).await;
    Mock::given(method("POST"))
        .and(path("/accounts/login/"))
        .respond_with(html(LOGIN_PAGE))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client.login().await.unwrap_err();
    assert!(matches!(err, AnytaskError::Auth(_)));
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_login_without_credentials() {
    let server = MockServer::start().await;
    let client = crate::common::anonymous_client(&server);
    assert!(client.login().await.unwrap_err().is_auth());
}

#[tokio::test]
async fn test_first_request_logs_in() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/course/5"))
        .and(header("cookie", "sessionid=abc123"))
        .respond_with(html("<html>course 5</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server).fetch_course_page(5).await.expect("course page");
    assert!(body.contains("course 5"));
}

#[tokio::test]
async fn test_expired_session_relogs_once() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/course/5"))
        .respond_with(html("<html>course 5</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/course/5"))
        .respond_with(to_login("/course/5"))
        .up_to_n_times(1)
        .expect(1)
        .with_priority(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client.login().await.expect("login");

    let body = client.fetch_course_page(5).await.expect("course page after relogin");
    assert!(body.contains("course 5"));
    assert!(client.is_authenticated());
}

#[tokio::test]
async fn test_second_login_form_is_auth_error() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/course/5"))
        .respond_with(to_login("/course/5"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    client.login().await.expect("login");

    let err = client.fetch_course_page(5).await.unwrap_err();
    assert!(err.is_auth(), "unexpected error: {}", err);
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_expired_session_without_credentials() {
    let server = MockServer::start().await;
    mount_login_form(&server).await;
    Mock::given(method("GET"))
        .and(path("/course/5"))
        .respond_with(to_login("/course/5"))
        .mount(&server)
        .await;

    let client = crate::common::anonymous_client(&server);
    let err = client.fetch_course_page(5).await.unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/course/9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = crate::common::anonymous_client(&server)
        .fetch_course_page(9)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn test_redirect_loop_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .mount(&server)
        .await;

    let err = crate::common::anonymous_client(&server)
        .fetch_page("/loop")
        .await
        .unwrap_err();
    assert!(matches!(err, AnytaskError::RedirectLimit { .. }));
}
