//! Session persistence: cookies and username in a JSON file

use super::{lock, AnytaskClient, StoredCookie};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::Ordering;
use url::Url;

/// On-disk session layout
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionFile {
    pub username: String,
    pub cookies: Vec<StoredCookie>,
}

impl SessionFile {
    /// Builds a session file from loosely typed JSON
    ///
    /// Returns `None` when `cookies` is not a list. Entries that are not
    /// objects or have no name are skipped; a missing path becomes `/`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let entries = value.get("cookies")?.as_array()?;
        let text = |v: &Value, key: &str| {
            v.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let cookies = entries
            .iter()
            .filter(|entry| entry.is_object())
            .filter_map(|entry| {
                let name = text(entry, "name");
                if name.is_empty() {
                    return None;
                }
                Some(StoredCookie::new(
                    name,
                    text(entry, "value"),
                    text(entry, "domain"),
                    text(entry, "path"),
                ))
            })
            .collect();

        Some(Self {
            username: text(value, "username"),
            cookies,
        })
    }
}

impl AnytaskClient {
    /// Restores cookies from a session file
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Cookies restored; the client now counts as logged in
    /// * `Ok(false)` - No file, or a file without a cookie list
    pub fn load_session(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No session file at {}", path.display());
            return Ok(false);
        }

        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        let Some(session) = SessionFile::from_value(&value) else {
            tracing::warn!("Session file {} has no cookie list", path.display());
            return Ok(false);
        };

        let site = Url::parse(&self.config.base_url)?;
        let restored = session
            .cookies
            .iter()
            .filter(|cookie| self.jar.insert(cookie, &site))
            .count();
        tracing::debug!("Restored {} of {} cookies", restored, session.cookies.len());

        {
            let mut creds = lock(&self.credentials);
            if creds.username.is_empty() && !session.username.is_empty() {
                creds.username = session.username;
            }
        }

        self.authenticated.store(true, Ordering::SeqCst);
        tracing::info!("Loaded session from {}", path.display());
        Ok(true)
    }

    /// Writes cookies and username to a session file, creating parent directories
    pub fn save_session(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let session = SessionFile {
            username: self.username(),
            cookies: self.jar.snapshot(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&session)?)?;
        tracing::info!("Saved session to {}", path.display());
        Ok(())
    }

    /// Drops every cookie and marks the session as logged out
    pub fn clear_session(&self) {
        self.jar.clear();
        self.authenticated.store(false, Ordering::SeqCst);
    }
}
