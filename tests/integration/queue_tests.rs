//! Review queue pagination and the cached application context

use crate::common::{anonymous_client, html};
use anytask_scraper::AppContext;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUEUE_PAGE: &str = r#"<html><script>
var data = { 'csrfmiddlewaretoken': 'queuetoken', 'course_id': 5 };
</script></html>"#;

fn rows(range: std::ops::Range<usize>) -> Vec<Value> {
    range
        .map(|i| {
            json!({
                "student_name": format!("Student {}", i),
                "student_url": format!("/users/s{}/", i),
                "task_title": "HW 1",
                "update_time": "06-02-2025",
                "mark": i,
                "status_color": "success",
                "status_name": "На проверке",
                "responsible_name": "Anna",
                "responsible_url": "/users/anna/",
                "has_issue_access": i % 2 == 0,
                "issue_url": format!("/issue/{}", i),
            })
        })
        .collect()
}

async fn mount_queue_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/course/5/queue"))
        .respond_with(html(QUEUE_PAGE))
        .mount(server)
        .await;
}

/// Mounts one AJAX page answering the request that starts at `start`
async fn mount_ajax_page(server: &MockServer, start: usize, total: usize, page: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path("/course/ajax_get_queue"))
        .and(body_string_contains(format!("&start={}&", start).as_str()))
        .and(body_string_contains("csrfmiddlewaretoken=queuetoken"))
        .and(body_string_contains("length=100"))
        .and(header("referer", format!("{}/course/5/queue", server.uri()).as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"draw": 1, "recordsTotal": total, "data": page})),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pagination_collects_all_rows_in_order() {
    let server = MockServer::start().await;
    mount_queue_page(&server).await;
    mount_ajax_page(&server, 0, 250, rows(0..100)).await;
    mount_ajax_page(&server, 100, 250, rows(100..200)).await;
    mount_ajax_page(&server, 200, 250, rows(200..250)).await;

    let queue = anonymous_client(&server)
        .fetch_review_queue(5)
        .await
        .expect("queue");

    assert_eq!(queue.course_id, 5);
    assert_eq!(queue.entries.len(), 250);
    assert_eq!(queue.entries[0].student_name, "Student 0");
    assert_eq!(queue.entries[149].student_name, "Student 149");
    assert_eq!(queue.entries[249].student_name, "Student 249");
    assert_eq!(queue.entries[3].mark, "3");
    assert!(queue.submissions.is_empty());
}

#[tokio::test]
async fn test_short_page_stops_pagination() {
    let server = MockServer::start().await;
    mount_queue_page(&server).await;
    // The total overstates the rows; a short page still ends the loop
    mount_ajax_page(&server, 0, 500, rows(0..40)).await;

    let rows = anonymous_client(&server)
        .fetch_all_queue_entries(5, "queuetoken", "")
        .await
        .expect("rows");
    assert_eq!(rows.len(), 40);
}

#[tokio::test]
async fn test_empty_queue() {
    let server = MockServer::start().await;
    mount_queue_page(&server).await;
    mount_ajax_page(&server, 0, 0, Vec::new()).await;

    let queue = anonymous_client(&server)
        .fetch_review_queue(5)
        .await
        .expect("queue");
    assert!(queue.entries.is_empty());
}

#[tokio::test]
async fn test_missing_queue_csrf() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/course/5/queue"))
        .respond_with(html("<html>no token here</html>"))
        .mount(&server)
        .await;

    let err = anonymous_client(&server)
        .fetch_review_queue(5)
        .await
        .unwrap_err();
    assert!(!err.is_auth());
    assert!(err.to_string().contains("CSRF"));
}

const ISSUE_PAGE: &str = r#"<html><body>
<ul class="breadcrumb"><li>Issue: 42</li></ul>
</body></html>"#;

#[tokio::test]
async fn test_context_fetches_queue_once_and_deep_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/course/5/queue"))
        .respond_with(html(QUEUE_PAGE))
        .expect(1)
        .mount(&server)
        .await;
    mount_ajax_page(&server, 0, 4, rows(0..4)).await;

    Mock::given(method("GET"))
        .and(path("/issue/0"))
        .respond_with(html(ISSUE_PAGE))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/issue/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let ctx = AppContext::new(anonymous_client(&server));
    let first = ctx.get_or_fetch_queue(5).await.expect("queue");
    let again = ctx.get_or_fetch_queue(5).await.expect("cached queue");
    assert_eq!(first, again);

    let report = ctx.deep_fetch_queue(5).await.expect("deep fetch");
    assert_eq!(report.fetched, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "/issue/2");

    let queue = ctx.get_or_fetch_queue(5).await.expect("queue");
    assert_eq!(queue.submissions["/issue/0"].issue_id, 42);

    let cached = ctx
        .get_or_fetch_submission(5, "/issue/0")
        .await
        .expect("cached submission");
    assert_eq!(cached.issue_id, 42);
}
