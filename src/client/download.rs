//! Validated file downloads
//!
//! Bodies are streamed to `<name>.tmp` and renamed only after the first
//! kilobyte passes validation, so a login page or an error page never ends
//! up under the name of a real submission file.

use super::http::{content_type_of, is_login_url, RequestSpec};
use super::{AnytaskClient, Page};
use crate::{AnytaskError, Result};
use reqwest::Response;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Bytes inspected by [`validate_download`]
const SNIFF_LEN: usize = 1024;

/// Why a download was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadFailure {
    EmptyFile,
    /// The body is the anytask login page
    LoginRedirect,
    /// The body is a Jupyter server page instead of the notebook
    JupyterServerHtml,
    HtmlInsteadOfFile,
    /// A `.ipynb` file that is not JSON
    InvalidNotebookFormat,
    /// Declared `text/html` for a file that is not HTML
    ContentTypeHtmlMismatch,
    Http(u16),
    Transport(String),
    /// No Drive file id in a notebook link
    NoFileId,
    /// Drive kept answering with an HTML page
    DriveHtmlPage,
    NotJson,
    AllStrategiesFailed,
}

impl fmt::Display for DownloadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFile => write!(f, "empty_file"),
            Self::LoginRedirect => write!(f, "login_redirect"),
            Self::JupyterServerHtml => write!(f, "jupyter_server_html"),
            Self::HtmlInsteadOfFile => write!(f, "html_instead_of_file"),
            Self::InvalidNotebookFormat => write!(f, "invalid_notebook_format"),
            Self::ContentTypeHtmlMismatch => write!(f, "content_type_html_mismatch"),
            Self::Http(code) => write!(f, "http_{}", code),
            Self::Transport(e) => write!(f, "download_error: {}", e),
            Self::NoFileId => write!(f, "no_file_id_in_url"),
            Self::DriveHtmlPage => write!(f, "google_drive_html_page"),
            Self::NotJson => write!(f, "not_json_content"),
            Self::AllStrategiesFailed => write!(f, "all_strategies_failed"),
        }
    }
}

/// How a download ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Saved,
    /// Saved after following a Drive confirmation token
    SavedAfterConfirm,
    Failed(DownloadFailure),
}

/// Outcome of one download; failures are values, not errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Final path the file was (or would have been) written to
    pub path: PathBuf,
    pub status: DownloadStatus,
}

impl DownloadResult {
    pub fn saved(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            status: DownloadStatus::Saved,
        }
    }

    pub fn failed(path: impl Into<PathBuf>, failure: DownloadFailure) -> Self {
        Self {
            path: path.into(),
            status: DownloadStatus::Failed(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.status, DownloadStatus::Failed(_))
    }

    pub fn failure(&self) -> Option<&DownloadFailure> {
        match &self.status {
            DownloadStatus::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Short machine-readable reason, `ok` on success
    pub fn reason(&self) -> String {
        match &self.status {
            DownloadStatus::Saved => "ok".to_string(),
            DownloadStatus::SavedAfterConfirm => "ok_after_confirm".to_string(),
            DownloadStatus::Failed(failure) => failure.to_string(),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// True if the bytes look like the start of an HTML document
fn looks_like_html(head: &[u8]) -> bool {
    let lower = head.to_ascii_lowercase();
    let trimmed = lower.trim_ascii_start();
    trimmed.starts_with(b"<!doctype html")
        || trimmed.starts_with(b"<html")
        || contains(&trimmed[..trimmed.len().min(500)], b"<head>")
}

/// Checks the first bytes of a downloaded file
///
/// # Arguments
///
/// * `head` - Up to the first kilobyte of the file; empty means an empty file
/// * `content_type` - The response `Content-Type` header
/// * `file_name` - Final file name, used for its extension
pub fn validate_download(
    head: &[u8],
    content_type: &str,
    file_name: &str,
) -> std::result::Result<(), DownloadFailure> {
    if head.is_empty() {
        return Err(DownloadFailure::EmptyFile);
    }

    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if looks_like_html(head) {
        if contains(head, b"id_username") || contains(head, b"/accounts/login/") {
            return Err(DownloadFailure::LoginRedirect);
        }
        if contains(head, b"Jupyter Server") || contains(head, b"Jupyter Notebook") {
            return Err(DownloadFailure::JupyterServerHtml);
        }
        return Err(DownloadFailure::HtmlInsteadOfFile);
    }

    if extension == "ipynb" && !head.trim_ascii_start().starts_with(b"{") {
        return Err(DownloadFailure::InvalidNotebookFormat);
    }

    let expects_html = extension == "html" || extension == "htm";
    if content_type.to_ascii_lowercase().contains("text/html") && !expects_html {
        return Err(DownloadFailure::ContentTypeHtmlMismatch);
    }

    Ok(())
}

pub(crate) fn temp_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    output.with_file_name(name)
}

async fn read_head(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut head = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        let n = file.read(&mut head[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    head.truncate(filled);
    Ok(head)
}

async fn stream_to_file(mut response: Response, path: &Path) -> Result<()> {
    let url = response.url().to_string();
    let mut file = tokio::fs::File::create(path).await?;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|source| AnytaskError::Http {
            url: url.clone(),
            source,
        })?
    {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

impl AnytaskClient {
    /// Downloads a site file to `output`
    ///
    /// Validation and transport failures come back inside the
    /// [`DownloadResult`]; only authentication failures are errors.
    pub async fn download_file(
        &self,
        url: &str,
        output: impl AsRef<Path>,
    ) -> Result<DownloadResult> {
        let output = output.as_ref();
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = temp_path(output);

        let content_type = match self.download_to(url, &tmp).await {
            Ok(content_type) => content_type,
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                return match e {
                    AnytaskError::Auth(_) => Err(e),
                    AnytaskError::Status { status, .. } => {
                        tracing::warn!("Download of {} failed with HTTP {}", url, status);
                        Ok(DownloadResult::failed(output, DownloadFailure::Http(status)))
                    }
                    other => {
                        tracing::warn!("Download of {} failed: {}", url, other);
                        Ok(DownloadResult::failed(
                            output,
                            DownloadFailure::Transport(other.to_string()),
                        ))
                    }
                };
            }
        };

        let head = read_head(&tmp).await?;
        let file_name = output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if let Err(failure) = validate_download(&head, &content_type, &file_name) {
            tracing::warn!("Rejected download {} -> {}: {}", url, output.display(), failure);
            let _ = tokio::fs::remove_file(&tmp).await;
            return Ok(DownloadResult::failed(output, failure));
        }

        tokio::fs::rename(&tmp, output).await?;
        tracing::debug!("Saved {}", output.display());
        Ok(DownloadResult::saved(output))
    }

    /// Streams a URL into `tmp`, returning the response content type
    ///
    /// A login redirect triggers one re-login; whatever the retry returns is
    /// written out and left to validation.
    async fn download_to(&self, url: &str, tmp: &Path) -> Result<String> {
        if !self.is_authenticated() && self.has_credentials() {
            self.login().await?;
        }

        let spec = RequestSpec::get(self.absolute_url(url)?);
        let mut response = self.send_following(&spec).await?;

        if is_login_url(response.url()) {
            let page = Page::read(response).await?;
            if !page.is_login_form() {
                let page = page.error_for_status()?;
                tokio::fs::write(tmp, page.body.as_bytes()).await?;
                return Ok(page.content_type);
            }

            if !self.has_credentials() {
                return Err(AnytaskError::auth(
                    "Session expired and no credentials are available to log in again",
                ));
            }
            tracing::info!("Session expired during download, logging in again");
            self.login().await?;
            response = self.send_following(&spec).await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(AnytaskError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = content_type_of(&response);
        stream_to_file(response, tmp).await?;
        Ok(content_type)
    }
}
