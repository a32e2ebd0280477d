//! Data source seam between the cache and the network

use crate::client::AnytaskClient;
use crate::models::{Course, Gradebook, ReviewQueue, Submission};
use crate::Result;
use async_trait::async_trait;

/// Anything that can produce course data; the live implementation is
/// [`AnytaskClient`], tests plug in doubles
#[async_trait]
pub trait CourseSource: Send + Sync {
    async fn fetch_course(&self, course_id: u64) -> Result<Course>;

    async fn fetch_review_queue(&self, course_id: u64) -> Result<ReviewQueue>;

    async fn fetch_gradebook(&self, course_id: u64) -> Result<Gradebook>;

    /// Fetches one issue page by its (possibly relative) URL
    async fn fetch_submission(&self, issue_url: &str) -> Result<Submission>;
}

#[async_trait]
impl CourseSource for AnytaskClient {
    async fn fetch_course(&self, course_id: u64) -> Result<Course> {
        AnytaskClient::fetch_course(self, course_id).await
    }

    async fn fetch_review_queue(&self, course_id: u64) -> Result<ReviewQueue> {
        AnytaskClient::fetch_review_queue(self, course_id).await
    }

    async fn fetch_gradebook(&self, course_id: u64) -> Result<Gradebook> {
        AnytaskClient::fetch_gradebook(self, course_id).await
    }

    async fn fetch_submission(&self, issue_url: &str) -> Result<Submission> {
        AnytaskClient::fetch_submission(self, issue_url).await
    }
}
