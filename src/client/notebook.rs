//! External notebook fetches (Colab links backed by Google Drive)

use super::{AnytaskClient, ClientConfig, DownloadFailure, DownloadResult, DownloadStatus};
use crate::{AnytaskError, Result};
use regex::Regex;
use reqwest::Client;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static FILE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:/drive/|/notebook/d/|/file/d/|drive/)([a-zA-Z0-9_-]+)").expect("file id pattern")
});

static QUERY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]id=([a-zA-Z0-9_-]+)").expect("query id pattern"));

static CONFIRM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"confirm=([a-zA-Z0-9_-]+)").expect("confirm pattern"));

/// Extracts the Drive file id from a Colab or Drive link
pub fn extract_drive_file_id(url: &str) -> Option<String> {
    FILE_ID_RE
        .captures(url)
        .or_else(|| QUERY_ID_RE.captures(url))
        .map(|caps| caps[1].to_string())
}

/// A candidate download URL; `{id}` is replaced by the file id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookStrategy {
    pub name: String,
    pub template: String,
}

impl NotebookStrategy {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    fn url_for(&self, file_id: &str) -> String {
        self.template.replace("{id}", file_id)
    }
}

/// Result of one request to one strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Saved,
    SavedAfterConfirm,
    Failed(DownloadFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: String,
    pub url: String,
    pub outcome: AttemptOutcome,
}

/// Final result plus every attempt made on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookReport {
    pub result: DownloadResult,
    pub attempts: Vec<Attempt>,
}

/// Tries a fixed list of Drive export URLs until one yields notebook JSON
#[derive(Debug, Clone)]
pub struct NotebookFetcher {
    http: Client,
    strategies: Vec<NotebookStrategy>,
    /// Retry URL for Drive's "can't scan this file" page; `{id}` and `{token}`
    confirm_template: String,
}

impl NotebookFetcher {
    /// Creates a fetcher with the Google Drive export strategies
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|source| AnytaskError::Http {
                url: "https://drive.google.com".to_string(),
                source,
            })?;

        Ok(Self {
            http,
            strategies: vec![
                NotebookStrategy::new(
                    "usercontent",
                    "https://drive.usercontent.google.com/download?id={id}&export=download&confirm=t",
                ),
                NotebookStrategy::new("docs", "https://docs.google.com/uc?export=download&id={id}"),
                NotebookStrategy::new(
                    "drive",
                    "https://drive.google.com/uc?export=download&id={id}&confirm=t",
                ),
            ],
            confirm_template:
                "https://drive.usercontent.google.com/download?id={id}&export=download&confirm={token}"
                    .to_string(),
        })
    }

    /// Replaces the candidate URLs and the confirmation URL
    pub fn with_strategies(
        mut self,
        strategies: Vec<NotebookStrategy>,
        confirm_template: impl Into<String>,
    ) -> Self {
        self.strategies = strategies;
        self.confirm_template = confirm_template.into();
        self
    }

    pub fn strategies(&self) -> &[NotebookStrategy] {
        &self.strategies
    }

    /// Downloads the notebook behind `colab_url` to `output`
    ///
    /// Never fails outright: filesystem and network problems are recorded
    /// as failed attempts and the last reason is reported.
    pub async fn fetch(&self, colab_url: &str, output: &Path) -> NotebookReport {
        let mut attempts = Vec::new();

        let Some(file_id) = extract_drive_file_id(colab_url) else {
            return NotebookReport {
                result: DownloadResult::failed(output, DownloadFailure::NoFileId),
                attempts,
            };
        };

        let mut last_failure = DownloadFailure::AllStrategiesFailed;
        for strategy in &self.strategies {
            let url = strategy.url_for(&file_id);
            let outcome = self.attempt(&url, &file_id, output).await;
            tracing::debug!("Notebook strategy {} for {}: {:?}", strategy.name, file_id, outcome);

            let status = match &outcome {
                AttemptOutcome::Saved => Some(DownloadStatus::Saved),
                AttemptOutcome::SavedAfterConfirm => Some(DownloadStatus::SavedAfterConfirm),
                AttemptOutcome::Failed(failure) => {
                    last_failure = failure.clone();
                    None
                }
            };
            attempts.push(Attempt {
                strategy: strategy.name.clone(),
                url,
                outcome,
            });

            if let Some(status) = status {
                return NotebookReport {
                    result: DownloadResult {
                        path: output.to_path_buf(),
                        status,
                    },
                    attempts,
                };
            }
        }

        NotebookReport {
            result: DownloadResult::failed(output, last_failure),
            attempts,
        }
    }

    async fn attempt(&self, url: &str, file_id: &str, output: &Path) -> AttemptOutcome {
        match self.try_download(url, file_id, output).await {
            Ok(outcome) => outcome,
            Err(e) => AttemptOutcome::Failed(DownloadFailure::Transport(e.to_string())),
        }
    }

    async fn try_download(&self, url: &str, file_id: &str, output: &Path) -> Result<AttemptOutcome> {
        let (status, body) = self.get(url).await?;
        if status != 200 {
            return Ok(AttemptOutcome::Failed(DownloadFailure::Http(status)));
        }

        let head = &body[..body.len().min(1024)];
        let lower = head.to_ascii_lowercase();
        let trimmed = lower.trim_ascii_start();
        if trimmed.starts_with(b"<!doctype html") || trimmed.starts_with(b"<html") {
            let text = String::from_utf8_lossy(&body);
            if let Some(caps) = CONFIRM_RE.captures(&text) {
                let confirm_url = self
                    .confirm_template
                    .replace("{id}", file_id)
                    .replace("{token}", &caps[1]);
                let (status, confirmed) = self.get(&confirm_url).await?;
                if status == 200 && is_json_body(&confirmed) {
                    write_output(output, &confirmed).await?;
                    return Ok(AttemptOutcome::SavedAfterConfirm);
                }
            }
            return Ok(AttemptOutcome::Failed(DownloadFailure::DriveHtmlPage));
        }

        if !is_json_body(&body) {
            return Ok(AttemptOutcome::Failed(DownloadFailure::NotJson));
        }

        write_output(output, &body).await?;
        Ok(AttemptOutcome::Saved)
    }

    async fn get(&self, url: &str) -> Result<(u16, Vec<u8>)> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| AnytaskError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|source| AnytaskError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok((status, body.to_vec()))
    }
}

fn is_json_body(body: &[u8]) -> bool {
    body.trim_ascii_start().starts_with(b"{")
}

async fn write_output(output: &Path, body: &[u8]) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(output, body).await?;
    Ok(())
}

impl AnytaskClient {
    /// Downloads a Colab notebook through the Drive export strategies
    pub async fn download_colab_notebook(
        &self,
        colab_url: &str,
        output: impl AsRef<Path>,
    ) -> DownloadResult {
        let report = self.notebooks.fetch(colab_url, output.as_ref()).await;
        if !report.result.is_success() {
            tracing::warn!(
                "Notebook {} not downloaded after {} attempts: {}",
                colab_url,
                report.attempts.len(),
                report.result.reason()
            );
        }
        report.result
    }
}
