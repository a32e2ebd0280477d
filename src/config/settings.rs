use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Settings file looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = ".anytask_scraper_settings.json";

/// Keys a settings file may hold, in file order
pub const SETTINGS_KEYS: [&str; 6] = [
    "credentials_file",
    "session_file",
    "status_mode",
    "default_output",
    "save_session",
    "refresh_session",
];

/// Which status lines the CLI prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusMode {
    /// Progress and success lines as well as errors
    All,
    Errors,
}

impl fmt::Display for StatusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMode::All => write!(f, "all"),
            StatusMode::Errors => write!(f, "errors"),
        }
    }
}

impl FromStr for StatusMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusMode::All),
            "errors" => Ok(StatusMode::Errors),
            other => Err(ConfigError::Validation(format!(
                "status_mode must be 'all' or 'errors', got '{}'",
                other
            ))),
        }
    }
}

/// Saved CLI defaults
///
/// Every key is optional; an absent key means "use the built-in default".
/// Unknown keys in the file are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_mode: Option<StatusMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_session: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_session: Option<bool>,
}

impl Settings {
    /// Values written by `settings init`
    pub fn init_defaults() -> Self {
        Self {
            credentials_file: Some("./credentials.json".to_string()),
            session_file: Some("./.anytask_session.json".to_string()),
            status_mode: Some(StatusMode::Errors),
            default_output: Some("./output".to_string()),
            save_session: Some(true),
            refresh_session: Some(false),
        }
    }

    /// Loads settings; a missing file yields empty settings
    ///
    /// # Errors
    ///
    /// * `ConfigError::Io` - The file exists but cannot be read
    /// * `ConfigError::Parse` - Invalid JSON or a key with the wrong type
    /// * `ConfigError::Validation` - The top level is not a JSON object
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let raw: Value = serde_json::from_str(&content)?;
        if !raw.is_object() {
            return Err(ConfigError::Validation(
                "Settings file must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(raw)?)
    }

    /// Writes settings as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrites every key that is set in `updates`
    ///
    /// Returns true if at least one key was given.
    pub fn update(&mut self, updates: Settings) -> bool {
        let changed = !updates.is_empty();
        if updates.credentials_file.is_some() {
            self.credentials_file = updates.credentials_file;
        }
        if updates.session_file.is_some() {
            self.session_file = updates.session_file;
        }
        if updates.status_mode.is_some() {
            self.status_mode = updates.status_mode;
        }
        if updates.default_output.is_some() {
            self.default_output = updates.default_output;
        }
        if updates.save_session.is_some() {
            self.save_session = updates.save_session;
        }
        if updates.refresh_session.is_some() {
            self.refresh_session = updates.refresh_session;
        }
        changed
    }

    /// Removes the named keys, or every key when `keys` is empty
    pub fn clear(&mut self, keys: &[String]) -> ConfigResult<()> {
        if keys.is_empty() {
            *self = Self::default();
            return Ok(());
        }
        for key in keys {
            match key.as_str() {
                "credentials_file" => self.credentials_file = None,
                "session_file" => self.session_file = None,
                "status_mode" => self.status_mode = None,
                "default_output" => self.default_output = None,
                "save_session" => self.save_session = None,
                "refresh_session" => self.refresh_session = None,
                other => {
                    return Err(ConfigError::Validation(format!(
                        "Unknown settings key '{}'",
                        other
                    )))
                }
            }
        }
        Ok(())
    }

    /// Fills keys still unset in `self` from `saved`
    pub fn or(self, saved: &Settings) -> Settings {
        Settings {
            credentials_file: self.credentials_file.or_else(|| saved.credentials_file.clone()),
            session_file: self.session_file.or_else(|| saved.session_file.clone()),
            status_mode: self.status_mode.or(saved.status_mode),
            default_output: self.default_output.or_else(|| saved.default_output.clone()),
            save_session: self.save_session.or(saved.save_session),
            refresh_session: self.refresh_session.or(saved.refresh_session),
        }
    }
}
