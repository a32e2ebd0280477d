//! Low-level HTTP plumbing: client construction and manual redirects

use super::{AnytaskClient, ClientConfig, CookieJar, LOGIN_PATH};
use crate::{AnytaskError, Result};
use reqwest::header::{CONTENT_TYPE, LOCATION, REFERER};
use reqwest::{redirect::Policy, Client, Method, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Builds the HTTP client used for anytask.org requests
///
/// Redirects are disabled here; [`AnytaskClient`] follows them itself so
/// the final URL can be checked for the login form. reqwest reads and
/// updates `jar` on every hop.
pub fn build_http_client(
    config: &ClientConfig,
    jar: Arc<CookieJar>,
) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .cookie_provider(jar)
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// One outgoing request, replayable for redirects and auth retries
#[derive(Debug, Clone)]
pub(crate) struct RequestSpec {
    pub method: Method,
    pub url: Url,
    pub form: Option<Vec<(String, String)>>,
    pub referer: Option<String>,
}

impl RequestSpec {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            form: None,
            referer: None,
        }
    }

    pub fn post(url: Url, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::POST,
            url,
            form: Some(form),
            referer: None,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }
}

/// A fully read response at the end of a redirect chain
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects
    pub url: Url,
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl Page {
    pub(crate) async fn read(response: Response) -> Result<Self> {
        let url = response.url().clone();
        let status = response.status().as_u16();
        let content_type = content_type_of(&response);
        let body = response.text().await.map_err(|source| AnytaskError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(Self {
            url,
            status,
            content_type,
            body,
        })
    }

    /// True when the chain ended on the login form
    ///
    /// Both conditions are needed: the login URL alone also appears in
    /// `next=` links, and the field id alone appears in unrelated forms.
    pub fn is_login_form(&self) -> bool {
        is_login_url(&self.url) && self.body.contains("id_username")
    }

    /// Fails with [`AnytaskError::Status`] for non-2xx responses
    pub fn error_for_status(self) -> Result<Self> {
        if (200..300).contains(&self.status) {
            Ok(self)
        } else {
            Err(AnytaskError::Status {
                url: self.url.to_string(),
                status: self.status,
            })
        }
    }
}

pub(crate) fn is_login_url(url: &Url) -> bool {
    url.as_str().contains(LOGIN_PATH)
}

pub(crate) fn content_type_of(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

impl AnytaskClient {
    /// Sends a request, following redirects by hand
    ///
    /// 301/302/303 turn a POST into a body-less GET, like browsers do.
    pub(crate) async fn send_following(&self, spec: &RequestSpec) -> Result<Response> {
        let mut method = spec.method.clone();
        let mut url = spec.url.clone();
        let mut form = spec.form.clone();

        for _ in 0..=self.config.max_redirects {
            let mut builder = self.http.request(method.clone(), url.clone());

            if let Some(referer) = &spec.referer {
                builder = builder.header(REFERER, referer.as_str());
            }
            if let Some(form) = &form {
                builder = builder.form(form);
            }

            let response = builder.send().await.map_err(|source| AnytaskError::Http {
                url: url.to_string(),
                source,
            })?;

            let status = response.status();
            if !status.is_redirection() {
                return Ok(response);
            }

            let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            else {
                return Ok(response);
            };

            let next = url.join(location)?;
            tracing::debug!("Redirect {} -> {} ({})", url, next, status.as_u16());

            if matches!(
                status,
                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
            ) && method == Method::POST
            {
                method = Method::GET;
                form = None;
            }
            url = next;
        }

        Err(AnytaskError::RedirectLimit {
            url: spec.url.to_string(),
        })
    }

    /// Sends a request and reads the whole body
    pub(crate) async fn send_page(&self, spec: &RequestSpec) -> Result<Page> {
        let response = self.send_following(spec).await?;
        Page::read(response).await
    }
}
