//! Attachment downloads and their validation

use crate::common::{anonymous_client, client, html, mount_login, mount_login_form, to_login, LOGIN_PAGE};
use anytask_scraper::output::download_submission_files;
use anytask_scraper::{Comment, DownloadFailure, FileAttachment, Submission};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn file(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "application/octet-stream")
}

fn leftovers(dir: &TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect()
}

#[tokio::test]
async fn test_download_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/files/solution.py"))
        .respond_with(file("print('hello')\n"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("solution.py");
    let result = anonymous_client(&server)
        .download_file("/media/files/solution.py", &dest)
        .await
        .expect("download");

    assert!(result.is_success());
    assert_eq!(result.reason(), "ok");
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "print('hello')\n");
    assert_eq!(leftovers(&dir), vec!["solution.py".to_string()]);
}

#[tokio::test]
async fn test_empty_download_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/files/empty.py"))
        .respond_with(file(""))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("empty.py");
    let result = anonymous_client(&server)
        .download_file("/media/files/empty.py", &dest)
        .await
        .expect("download");

    assert_eq!(result.failure(), Some(&DownloadFailure::EmptyFile));
    assert_eq!(result.reason(), "empty_file");
    assert!(leftovers(&dir).is_empty());
}

#[tokio::test]
async fn test_html_login_page_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/files/hw.py"))
        .respond_with(html(LOGIN_PAGE))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("hw.py");
    let result = anonymous_client(&server)
        .download_file("/media/files/hw.py", &dest)
        .await
        .expect("download");

    assert_eq!(result.failure(), Some(&DownloadFailure::LoginRedirect));
    assert!(leftovers(&dir).is_empty());
}

#[tokio::test]
async fn test_notebook_must_be_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/files/hw.ipynb"))
        .respond_with(file("not a notebook"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let result = anonymous_client(&server)
        .download_file("/media/files/hw.ipynb", dir.path().join("hw.ipynb"))
        .await
        .expect("download");
    assert_eq!(result.failure(), Some(&DownloadFailure::InvalidNotebookFormat));
}

#[tokio::test]
async fn test_http_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/files/gone.py"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let result = anonymous_client(&server)
        .download_file("/media/files/gone.py", dir.path().join("gone.py"))
        .await
        .expect("download");
    assert_eq!(result.reason(), "http_404");
    assert!(leftovers(&dir).is_empty());
}

#[tokio::test]
async fn test_login_redirect_without_credentials_is_auth_error() {
    let server = MockServer::start().await;
    mount_login_form(&server).await;
    Mock::given(method("GET"))
        .and(path("/media/files/hw.py"))
        .respond_with(to_login("/media/files/hw.py"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = anonymous_client(&server)
        .download_file("/media/files/hw.py", dir.path().join("hw.py"))
        .await
        .unwrap_err();
    assert!(err.is_auth());
    assert!(leftovers(&dir).is_empty());
}

#[tokio::test]
async fn test_login_redirect_relogs_and_retries() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/media/files/hw.py"))
        .respond_with(file("x = 1\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/files/hw.py"))
        .respond_with(to_login("/media/files/hw.py"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client.login().await.expect("login");

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("hw.py");
    let result = client.download_file("/media/files/hw.py", &dest).await.expect("download");
    assert!(result.is_success());
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "x = 1\n");
}

#[tokio::test]
async fn test_submission_files_batch_continues_after_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/files/a.py"))
        .respond_with(file("a = 1\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/files/b.py"))
        .respond_with(file(""))
        .mount(&server)
        .await;

    let attachment = |name: &str| FileAttachment {
        filename: name.to_string(),
        download_url: format!("/media/files/{}", name),
        is_notebook: false,
    };
    let submission = Submission {
        issue_id: 77,
        student_name: "Ivan Petrov".to_string(),
        comments: vec![Comment {
            files: vec![attachment("b.py"), attachment("a.py")],
            links: vec![
                "https://colab.research.google.com/".to_string(),
                "https://example.com/notes".to_string(),
                "https://colab.research.google.com/notebooks/intro.ipynb".to_string(),
            ],
            ..Comment::default()
        }],
        ..Submission::default()
    };

    let dir = TempDir::new().unwrap();
    let saved = download_submission_files(&anonymous_client(&server), &submission, dir.path())
        .await
        .expect("batch");

    let student_dir = dir.path().join("Ivan_Petrov");
    assert_eq!(saved.get("a.py"), Some(&student_dir.join("a.py")));
    assert!(!saved.contains_key("b.py"));
    assert!(!student_dir.join("b.py").exists());

    // Colab links without a file id fall back to numbered link files
    let first = student_dir.join("colab_77_1.url.txt");
    let second = student_dir.join("colab_77_2.url.txt");
    assert_eq!(saved.get("https://colab.research.google.com/"), Some(&first));
    assert_eq!(
        saved.get("https://colab.research.google.com/notebooks/intro.ipynb"),
        Some(&second)
    );
    assert!(!saved.contains_key("https://example.com/notes"));
    assert_eq!(
        std::fs::read_to_string(first).unwrap(),
        "https://colab.research.google.com/"
    );
    assert_eq!(
        std::fs::read_to_string(second).unwrap(),
        "https://colab.research.google.com/notebooks/intro.ipynb"
    );
}
