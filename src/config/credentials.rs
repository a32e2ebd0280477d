use crate::{ConfigError, ConfigResult};
use serde_json::Value;
use std::path::Path;

/// Reads `(username, password)` from a credentials file
///
/// A `.json` file must hold an object with `username` and `password`.
/// Anything else is read as text; see [`parse_credentials_text`].
pub fn load_credentials_file(path: &Path) -> ConfigResult<(String, String)> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if !is_json {
        return Ok(parse_credentials_text(&text));
    }

    let payload: Value = serde_json::from_str(text.trim())?;
    let Some(object) = payload.as_object() else {
        return Err(ConfigError::Validation(
            "Credentials JSON must be an object".to_string(),
        ));
    };
    let field = |key: &str| match object.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string().trim().to_string(),
    };
    Ok((field("username"), field("password")))
}

/// Parses text credentials
///
/// Lines are `key=value` or `key: value` with keys `username`/`user`/`login`
/// and `password`/`pass`. Blank lines and `#` comments are skipped. If either
/// value is still missing, the first two plain lines fill the gaps.
pub fn parse_credentials_text(text: &str) -> (String, String) {
    let mut username = String::new();
    let mut password = String::new();
    let mut plain = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=').or_else(|| line.split_once(':')) else {
            plain.push(line);
            continue;
        };

        match key.trim().to_lowercase().as_str() {
            "username" | "user" | "login" => username = value.trim().to_string(),
            "password" | "pass" => password = value.trim().to_string(),
            _ => {}
        }
    }

    if (username.is_empty() || password.is_empty()) && plain.len() >= 2 {
        if username.is_empty() {
            username = plain[0].to_string();
        }
        if password.is_empty() {
            password = plain[1].to_string();
        }
    }

    (username, password)
}
