//! Anytask scraper: a typed client for the anytask.org course system
//!
//! This crate logs into anytask.org with a form session, fetches course,
//! review-queue, submission and gradebook pages, parses them into typed
//! records and exports them as JSON, CSV or Markdown.

pub mod cache;
pub mod client;
pub mod config;
pub mod models;
pub mod output;
pub mod parser;

use thiserror::Error;

/// Main error type for scraper operations
#[derive(Debug, Error)]
pub enum AnytaskError {
    /// Missing credentials, rejected login or an expired session that could not be renewed
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Too many redirects from {url}")]
    RedirectLimit { url: String },

    #[error("Unexpected page at {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AnytaskError {
    /// Creates an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Returns true for authentication failures
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Returns true for transport and HTTP status failures
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::Status { .. } | Self::RedirectLimit { .. }
        )
    }

    /// Returns the HTTP status code for status failures
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Settings and credentials file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for scraper operations
pub type Result<T> = std::result::Result<T, AnytaskError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use cache::{AppContext, CourseSource, LoadState, Resource};
pub use client::{AnytaskClient, ClientConfig, DownloadFailure, DownloadResult};
pub use models::{
    Comment, Course, FileAttachment, Gradebook, GradebookEntry, GradebookGroup, QueueEntry,
    ReviewQueue, StatusColor, Submission, Task,
};
