use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Streaming completion endpoint (the chat proxy route)
    pub completion_url: Option<String>,
    /// Base URL of the prompt, story-prompt and media services
    pub api_base_url: Option<String>,
    /// Bearer key sent to the content services
    pub api_key: Option<String>,
    /// Abort a reply when no chunk arrives for this many seconds
    pub stream_idle_timeout_secs: Option<u64>,
    /// Pause between rendered fragments, in milliseconds
    pub typewriter_delay_ms: Option<u64>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// Mark admin session cookies `Secure`
    pub production: Option<bool>,
}

/// Keys accepted by `basilisk set` / `basilisk unset`.
pub const CONFIG_KEYS: &[&str] = &[
    "completion-url",
    "api-url",
    "api-key",
    "idle-timeout",
    "typewriter-delay",
    "admin-username",
    "admin-password",
    "production",
];

impl Config {
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("A value is required for {key}"));
        }
        match key {
            "completion-url" => self.completion_url = Some(value.to_string()),
            "api-url" => self.api_base_url = Some(value.to_string()),
            "api-key" => self.api_key = Some(value.to_string()),
            "idle-timeout" => self.stream_idle_timeout_secs = Some(parse_number(key, value)?),
            "typewriter-delay" => self.typewriter_delay_ms = Some(parse_number(key, value)?),
            "admin-username" => self.admin_username = Some(value.to_string()),
            "admin-password" => self.admin_password = Some(value.to_string()),
            "production" => self.production = Some(parse_toggle(key, value)?),
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "completion-url" => self.completion_url = None,
            "api-url" => self.api_base_url = None,
            "api-key" => self.api_key = None,
            "idle-timeout" => self.stream_idle_timeout_secs = None,
            "typewriter-delay" => self.typewriter_delay_ms = None,
            "admin-username" => self.admin_username = None,
            "admin-password" => self.admin_password = None,
            "production" => self.production = None,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, String> {
    value
        .parse::<u64>()
        .map_err(|_| format!("{key} expects a whole number, got '{value}'"))
}

fn parse_toggle(key: &str, value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(format!("{key} expects on or off, got '{value}'")),
    }
}

fn unknown_key(key: &str) -> String {
    format!(
        "Unknown config key: {key} (expected one of: {})",
        CONFIG_KEYS.join(", ")
    )
}

/// Get a user-friendly display string for a path, using `~` for the home
/// directory on Unix-like systems.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
