//! Colab notebook downloads through the Drive export strategies

use crate::common::anonymous_client;
use anytask_scraper::client::{AttemptOutcome, NotebookFetcher, NotebookStrategy};
use anytask_scraper::{ClientConfig, DownloadFailure};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COLAB_URL: &str = "https://colab.research.google.com/drive/1AbCdEf?usp=sharing";
const NOTEBOOK: &str = r#"{"cells": [], "metadata": {}, "nbformat": 4}"#;

fn fetcher(server: &MockServer) -> NotebookFetcher {
    let uri = server.uri();
    NotebookFetcher::new(&ClientConfig::default())
        .expect("fetcher")
        .with_strategies(
            vec![
                NotebookStrategy::new("first", format!("{}/first?id={{id}}", uri)),
                NotebookStrategy::new("second", format!("{}/second?id={{id}}", uri)),
            ],
            format!("{}/confirm?id={{id}}&token={{token}}", uri),
        )
}

fn drive_warning() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(
            "<!DOCTYPE html><html><body>Google Drive can't scan this file for viruses.\
             <a href=\"/uc?export=download&confirm=Xy_9&id=1AbCdEf\">Download anyway</a></body></html>",
        )
        .insert_header("content-type", "text/html")
}

#[tokio::test]
async fn test_falls_through_to_next_strategy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/first"))
        .and(query_param("id", "1AbCdEf"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NOTEBOOK))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("colab_1.ipynb");
    let report = fetcher(&server).fetch(COLAB_URL, &dest).await;

    assert!(report.result.is_success());
    assert_eq!(report.result.reason(), "ok");
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(
        report.attempts[0].outcome,
        AttemptOutcome::Failed(DownloadFailure::Http(500))
    );
    assert_eq!(report.attempts[1].strategy, "second");
    assert_eq!(std::fs::read_to_string(dest).unwrap(), NOTEBOOK);
}

#[tokio::test]
async fn test_confirmation_page_is_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(drive_warning())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/confirm"))
        .and(query_param("id", "1AbCdEf"))
        .and(query_param("token", "Xy_9"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NOTEBOOK))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let report = fetcher(&server)
        .fetch(COLAB_URL, &dir.path().join("nb.ipynb"))
        .await;

    assert_eq!(report.result.reason(), "ok_after_confirm");
    assert_eq!(report.attempts.len(), 1);
}

#[tokio::test]
async fn test_all_strategies_fail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Sign in</body></html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("nb.ipynb");
    let report = fetcher(&server).fetch(COLAB_URL, &dest).await;

    assert!(!report.result.is_success());
    assert_eq!(
        report.attempts[0].outcome,
        AttemptOutcome::Failed(DownloadFailure::DriveHtmlPage)
    );
    assert_eq!(report.result.reason(), "not_json_content");
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_client_uses_configured_fetcher() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NOTEBOOK))
        .mount(&server)
        .await;

    let client = anonymous_client(&server).with_notebook_fetcher(fetcher(&server));
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("nested/colab.ipynb");
    let result = client.download_colab_notebook(COLAB_URL, &dest).await;

    assert!(result.is_success());
    assert!(dest.exists());
}
