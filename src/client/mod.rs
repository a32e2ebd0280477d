//! HTTP session client for anytask.org
//!
//! This module handles everything that talks to the site:
//! - Form login with CSRF token and transparent re-login on session expiry
//! - Page fetches for courses, queues, submissions and gradebooks
//! - Paginated review-queue AJAX requests
//! - Validated file downloads and external notebook fetches
//! - Session persistence to a JSON cookie file

mod cookies;
mod download;
mod http;
mod notebook;
mod session;

pub use cookies::{CookieJar, StoredCookie};
pub use download::{validate_download, DownloadFailure, DownloadResult, DownloadStatus};
pub use http::{build_http_client, Page};
pub use notebook::{
    extract_drive_file_id, Attempt, AttemptOutcome, NotebookFetcher, NotebookReport,
    NotebookStrategy,
};
pub use session::SessionFile;

use crate::models::{Course, Gradebook, QueuePage, QueueRow, ReviewQueue, Submission};
use crate::parser;
use crate::{AnytaskError, Result};
use http::RequestSpec;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

/// Default site root
pub const DEFAULT_BASE_URL: &str = "https://anytask.org";

/// Rows requested per queue AJAX call
pub const QUEUE_PAGE_SIZE: usize = 100;

pub(crate) const LOGIN_PATH: &str = "/accounts/login/";

/// Connection settings for [`AnytaskClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Site root without trailing slash
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            user_agent: format!(
                "Mozilla/5.0 (compatible; anytask-scraper/{})",
                env!("CARGO_PKG_VERSION")
            ),
            max_redirects: 10,
        }
    }
}

impl ClientConfig {
    /// Config pointing at another site root, e.g. a mock server
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Credentials {
    username: String,
    password: String,
}

/// Authenticated anytask.org session
///
/// All methods take `&self`; the cookie jar and login state live behind
/// interior locks so one client can be shared by concurrent fetches.
#[derive(Debug)]
pub struct AnytaskClient {
    config: ClientConfig,
    http: Client,
    notebooks: NotebookFetcher,
    jar: Arc<CookieJar>,
    credentials: Mutex<Credentials>,
    authenticated: AtomicBool,
    login_lock: tokio::sync::Mutex<()>,
}

/// Locks a std mutex, recovering the data if a holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AnytaskClient {
    /// Creates an unauthenticated client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let jar = Arc::new(CookieJar::new());
        let http =
            build_http_client(&config, Arc::clone(&jar)).map_err(|source| AnytaskError::Http {
                url: config.base_url.clone(),
                source,
            })?;
        let notebooks = NotebookFetcher::new(&config)?;

        Ok(Self {
            config,
            http,
            notebooks,
            jar,
            credentials: Mutex::new(Credentials::default()),
            authenticated: AtomicBool::new(false),
            login_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Sets the username and password used for (re-)login
    pub fn with_credentials(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        *lock(&self.credentials) = Credentials {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Replaces the external notebook fetcher
    pub fn with_notebook_fetcher(mut self, notebooks: NotebookFetcher) -> Self {
        self.notebooks = notebooks;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn username(&self) -> String {
        lock(&self.credentials).username.clone()
    }

    /// True when both username and password are known
    pub fn has_credentials(&self) -> bool {
        let creds = lock(&self.credentials);
        !creds.username.is_empty() && !creds.password.is_empty()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    /// Snapshot of the current cookies
    pub fn cookies(&self) -> Vec<StoredCookie> {
        self.jar.snapshot()
    }

    /// Value of the cookie called `name`, if set
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.jar.get(name)
    }

    /// Resolves a site path (or absolute URL) against the base URL
    pub fn absolute_url(&self, path_or_url: &str) -> Result<Url> {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            return Ok(Url::parse(path_or_url)?);
        }
        let path = if path_or_url.starts_with('/') {
            path_or_url.to_string()
        } else {
            format!("/{}", path_or_url)
        };
        Ok(Url::parse(&format!("{}{}", self.config.base_url, path))?)
    }

    /// Logs in with the stored credentials
    ///
    /// # Errors
    ///
    /// [`AnytaskError::Auth`] when credentials are missing, the login page
    /// has no CSRF token, or the site shows the login form again.
    pub async fn login(&self) -> Result<()> {
        let _guard = self.login_lock.lock().await;

        let creds = lock(&self.credentials).clone();
        if creds.username.is_empty() || creds.password.is_empty() {
            return Err(AnytaskError::auth("No credentials available for login"));
        }

        let login_url = self.absolute_url(LOGIN_PATH)?;
        let page = self
            .send_page(&RequestSpec::get(login_url.clone()))
            .await?
            .error_for_status()?;

        let csrf = parser::extract_csrf_from_login_page(&page.body)
            .ok_or_else(|| AnytaskError::auth("Could not find CSRF token on login page"))?;

        let form = vec![
            ("csrfmiddlewaretoken".to_string(), csrf),
            ("username".to_string(), creds.username.clone()),
            ("password".to_string(), creds.password),
            ("next".to_string(), String::new()),
        ];
        let response = self
            .send_page(&RequestSpec::post(login_url.clone(), form).with_referer(login_url.as_str()))
            .await?;

        if response.is_login_form() {
            self.authenticated.store(false, Ordering::SeqCst);
            return Err(AnytaskError::auth(
                "Login failed: check username and password",
            ));
        }
        response.error_for_status()?;

        self.authenticated.store(true, Ordering::SeqCst);
        tracing::info!("Logged in as {}", creds.username);
        Ok(())
    }

    /// Sends a request inside the session, renewing it once if it expired
    pub(crate) async fn execute(&self, spec: RequestSpec) -> Result<Page> {
        if !self.is_authenticated() && self.has_credentials() {
            self.login().await?;
        }

        let page = self.send_page(&spec).await?;
        if !page.is_login_form() {
            return page.error_for_status();
        }

        self.authenticated.store(false, Ordering::SeqCst);
        if !self.has_credentials() {
            return Err(AnytaskError::auth(
                "Session expired and no credentials are available to log in again",
            ));
        }

        tracing::info!("Session expired, logging in again");
        self.login().await?;

        let retried = self.send_page(&spec).await?;
        if retried.is_login_form() {
            self.authenticated.store(false, Ordering::SeqCst);
            return Err(AnytaskError::auth("Session rejected after logging in again"));
        }
        retried.error_for_status()
    }

    /// Authenticated GET returning the page body
    pub async fn fetch_page(&self, path_or_url: &str) -> Result<String> {
        let url = self.absolute_url(path_or_url)?;
        Ok(self.execute(RequestSpec::get(url)).await?.body)
    }

    pub async fn fetch_course_page(&self, course_id: u64) -> Result<String> {
        tracing::info!("Fetching course {}", course_id);
        self.fetch_page(&format!("/course/{}", course_id)).await
    }

    /// Fetches and parses a course page
    pub async fn fetch_course(&self, course_id: u64) -> Result<Course> {
        let html = self.fetch_course_page(course_id).await?;
        Ok(parser::parse_course_page(&html, course_id))
    }

    /// Fetches a task's description from its edit page
    pub async fn fetch_task_description(&self, task_id: u64) -> Result<String> {
        let html = self.fetch_page(&format!("/task/edit/{}", task_id)).await?;
        Ok(parser::parse_task_edit_page(&html))
    }

    /// Fills in missing descriptions of teacher-view tasks
    ///
    /// Failures are logged and leave the description empty.
    pub async fn fill_task_descriptions(&self, course: &mut Course) {
        for task in course.tasks.iter_mut() {
            if task.description.as_deref().is_some_and(|d| !d.is_empty()) || task.edit_url.is_none()
            {
                continue;
            }
            match self.fetch_task_description(task.task_id).await {
                Ok(text) if !text.is_empty() => task.description = Some(text),
                Ok(_) => {}
                Err(e) if e.is_auth() => {
                    tracing::warn!("Stopping description fetch: {}", e);
                    return;
                }
                Err(e) => tracing::warn!("No description for task {}: {}", task.task_id, e),
            }
        }
    }

    pub async fn fetch_queue_page(&self, course_id: u64) -> Result<String> {
        tracing::info!("Fetching review queue page for course {}", course_id);
        self.fetch_page(&format!("/course/{}/queue?update_time=", course_id))
            .await
    }

    /// Requests one page of queue rows
    pub async fn fetch_queue_ajax(
        &self,
        course_id: u64,
        csrf: &str,
        start: usize,
        length: usize,
        filter: &str,
    ) -> Result<QueuePage> {
        let url = self.absolute_url("/course/ajax_get_queue")?;
        let referer = self.absolute_url(&format!("/course/{}/queue", course_id))?;
        let form = vec![
            ("csrfmiddlewaretoken".to_string(), csrf.to_string()),
            ("lang".to_string(), "ru".to_string()),
            ("timezone".to_string(), "Europe/Moscow".to_string()),
            ("course_id".to_string(), course_id.to_string()),
            ("draw".to_string(), "1".to_string()),
            ("start".to_string(), start.to_string()),
            ("length".to_string(), length.to_string()),
            ("filter".to_string(), filter.to_string()),
            (
                "order".to_string(),
                r#"[{"column":3,"dir":"desc"}]"#.to_string(),
            ),
        ];

        let page = self
            .execute(RequestSpec::post(url, form).with_referer(referer.as_str()))
            .await?;
        Ok(serde_json::from_str(&page.body)?)
    }

    /// Collects every queue row in arrival order
    ///
    /// Stops when a page comes back short or the offset reaches the
    /// reported total.
    pub async fn fetch_all_queue_entries(
        &self,
        course_id: u64,
        csrf: &str,
        filter: &str,
    ) -> Result<Vec<QueueRow>> {
        let mut rows = Vec::new();
        let mut start = 0usize;

        loop {
            let page = self
                .fetch_queue_ajax(course_id, csrf, start, QUEUE_PAGE_SIZE, filter)
                .await?;
            let received = page.data.len();
            let total = page.records_total as usize;
            rows.extend(page.data);
            start += QUEUE_PAGE_SIZE;

            tracing::debug!(
                "Queue page for course {}: {} rows, {} of {} requested",
                course_id,
                received,
                start.min(total),
                total
            );

            if start >= total || received < QUEUE_PAGE_SIZE {
                break;
            }
        }

        tracing::info!("Fetched {} queue rows for course {}", rows.len(), course_id);
        Ok(rows)
    }

    /// Fetches the full review queue of a course
    pub async fn fetch_review_queue(&self, course_id: u64) -> Result<ReviewQueue> {
        let html = self.fetch_queue_page(course_id).await?;
        let csrf = parser::extract_csrf_from_queue_page(&html).ok_or_else(|| {
            AnytaskError::HtmlParse {
                url: format!("/course/{}/queue", course_id),
                message: "no CSRF token on queue page".to_string(),
            }
        })?;

        let rows = self.fetch_all_queue_entries(course_id, &csrf, "").await?;
        let entries = rows.into_iter().map(parser::queue_entry_from_row).collect();
        Ok(ReviewQueue::new(course_id, entries))
    }

    pub async fn fetch_submission_page(&self, issue_url: &str) -> Result<String> {
        self.fetch_page(issue_url).await
    }

    /// Fetches and parses one issue page
    pub async fn fetch_submission(&self, issue_url: &str) -> Result<Submission> {
        let html = self.fetch_submission_page(issue_url).await?;
        let issue_id = parser::extract_issue_id_from_breadcrumb(&html).ok_or_else(|| {
            AnytaskError::HtmlParse {
                url: issue_url.to_string(),
                message: "no issue id in breadcrumb".to_string(),
            }
        })?;
        Ok(parser::parse_submission_page(&html, issue_id))
    }

    pub async fn fetch_gradebook_page(&self, course_id: u64) -> Result<String> {
        tracing::info!("Fetching gradebook for course {}", course_id);
        self.fetch_page(&format!("/course/{}/gradebook/", course_id))
            .await
    }

    /// Fetches and parses a course gradebook
    pub async fn fetch_gradebook(&self, course_id: u64) -> Result<Gradebook> {
        let html = self.fetch_gradebook_page(course_id).await?;
        Ok(parser::parse_gradebook_page(&html, course_id))
    }
}
