//! Shared mock-server fixtures

use anytask_scraper::{AnytaskClient, ClientConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Login form as the site renders it
pub const LOGIN_PAGE: &str = r#"<html><body>
<form method="post" action="/accounts/login/">
<input type="hidden" name="csrfmiddlewaretoken" value="logintoken">
<input type="text" name="username" id="id_username">
<input type="password" name="password" id="id_password">
</form>
</body></html>"#;

pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Redirect to the login form, the way the site answers an expired session
pub fn to_login(next: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header(
        "location",
        format!("/accounts/login/?next={}", next).as_str(),
    )
}

/// Anonymous client pointed at the mock server
pub fn anonymous_client(server: &MockServer) -> AnytaskClient {
    AnytaskClient::new(ClientConfig::with_base_url(server.uri())).expect("client")
}

pub fn client(server: &MockServer) -> AnytaskClient {
    anonymous_client(server).with_credentials("ivan", "secret")
}

/// Serves the login form on GET
pub async fn mount_login_form(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/accounts/login/"))
        .respond_with(html(LOGIN_PAGE))
        .mount(server)
        .await;
}

/// Mounts a working login: the form, a POST that sets `sessionid` and the home page
///
/// `expected_posts` is verified when the server is dropped.
pub async fn mount_login(server: &MockServer, expected_posts: u64) {
    mount_login_form(server).await;

    Mock::given(method("POST"))
        .and(path("/accounts/login/"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/")
                .insert_header("set-cookie", "sessionid=abc123; Path=/; HttpOnly"),
        )
        .expect(expected_posts)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><body>Welcome</body></html>"))
        .mount(server)
        .await;
}
