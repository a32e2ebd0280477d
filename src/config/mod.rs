//! Configuration for the command-line front end
//!
//! This module handles the two files the CLI reads before touching the
//! network: a JSON settings file with saved defaults and a credentials file.
//!
//! # Example
//!
//! ```no_run
//! use anytask_scraper::config::{load_credentials_file, Settings};
//! use std::path::Path;
//!
//! let settings = Settings::load(Path::new(".anytask_scraper_settings.json")).unwrap();
//! if let Some(path) = &settings.credentials_file {
//!     let (username, _password) = load_credentials_file(Path::new(path)).unwrap();
//!     println!("Logging in as {}", username);
//! }
//! ```

mod credentials;
mod settings;

pub use credentials::{load_credentials_file, parse_credentials_text};
pub use settings::{Settings, StatusMode, DEFAULT_SETTINGS_FILE, SETTINGS_KEYS};
