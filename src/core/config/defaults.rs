//! Effective settings: environment overrides on top of the config file.

use std::time::Duration;

use crate::core::admin::AdminGate;
use crate::core::chat_stream::StreamSettings;
use crate::core::config::data::Config;

pub const DEFAULT_COMPLETION_URL: &str = "http://localhost:3000/api/createMessage";

pub const ENV_COMPLETION_URL: &str = "BASILISK_COMPLETION_URL";
pub const ENV_API_URL: &str = "BASILISK_API_URL";
pub const ENV_API_KEY: &str = "BASILISK_API_KEY";
pub const ENV_ADMIN_USERNAME: &str = "BASILISK_ADMIN_USERNAME";
pub const ENV_ADMIN_PASSWORD: &str = "BASILISK_ADMIN_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub completion_url: String,
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
    pub stream: StreamSettings,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub production: bool,
}

impl ResolvedSettings {
    pub fn admin_gate(&self) -> AdminGate {
        AdminGate::new(
            self.admin_username.clone(),
            self.admin_password.clone(),
            self.production,
        )
    }
}

impl Config {
    pub fn resolve(&self) -> ResolvedSettings {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup; blank values count
    /// as unset.
    pub fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> ResolvedSettings {
        let lookup = |key: &str, fallback: &Option<String>| {
            env(key)
                .filter(|value| !value.trim().is_empty())
                .or_else(|| fallback.clone().filter(|value| !value.trim().is_empty()))
        };

        ResolvedSettings {
            completion_url: lookup(ENV_COMPLETION_URL, &self.completion_url)
                .unwrap_or_else(|| DEFAULT_COMPLETION_URL.to_string()),
            api_base_url: lookup(ENV_API_URL, &self.api_base_url),
            api_key: lookup(ENV_API_KEY, &self.api_key),
            stream: StreamSettings {
                idle_timeout: self
                    .stream_idle_timeout_secs
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs),
                typewriter_delay: self
                    .typewriter_delay_ms
                    .filter(|ms| *ms > 0)
                    .map(Duration::from_millis),
            },
            admin_username: lookup(ENV_ADMIN_USERNAME, &self.admin_username),
            admin_password: lookup(ENV_ADMIN_PASSWORD, &self.admin_password),
            production: self.production.unwrap_or(false),
        }
    }
}
