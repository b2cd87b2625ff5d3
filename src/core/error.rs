use std::error::Error as StdError;
use std::fmt;

/// Failures that can end a request cycle or a service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The request could not be dispatched or the connection dropped.
    Network(String),

    /// The remote service answered with a non-success status.
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// A payload could not be parsed.
    Decode(String),

    /// The prompt configuration was unavailable or unusable.
    Configuration(String),
}

impl ChatError {
    pub fn network(err: impl fmt::Display) -> Self {
        ChatError::Network(err.to_string())
    }

    pub fn decode(err: impl fmt::Display) -> Self {
        ChatError::Decode(err.to_string())
    }

    /// Human-facing text for notifications; server bodies are prettified.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Server { status, body } => {
                format!("{} (HTTP {status})", format_api_error(body))
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Network(detail) => write!(f, "Network error: {detail}"),
            ChatError::Server { status, body } => {
                let body = body.trim();
                if body.is_empty() {
                    write!(f, "Server error: HTTP {status}")
                } else {
                    write!(f, "Server error: HTTP {status}: {body}")
                }
            }
            ChatError::Decode(detail) => write!(f, "Decode error: {detail}"),
            ChatError::Configuration(detail) => write!(f, "Configuration error: {detail}"),
        }
    }
}

impl StdError for ChatError {}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ChatError::decode(err)
        } else {
            ChatError::network(err)
        }
    }
}

/// Reasons a submission is turned away without touching the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    /// The text was empty or whitespace only.
    EmptyMessage,
    /// A request cycle is still in flight.
    Busy,
    /// No system message has been established yet.
    NotInitialized,
}

impl fmt::Display for SubmitRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitRejected::EmptyMessage => write!(f, "Message is empty"),
            SubmitRejected::Busy => write!(f, "Still waiting for the previous response"),
            SubmitRejected::NotInitialized => write!(f, "Conversation is not initialized yet"),
        }
    }
}

impl StdError for SubmitRejected {}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Render an error body for display, pretty-printing JSON when possible.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error: <empty>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            return match extract_error_summary(&json_value).filter(|s| !s.is_empty()) {
                Some(summary) => format!("API Error: {summary}\n{pretty_json}"),
                None => format!("API Error:\n{pretty_json}"),
            };
        }
    }

    format!("API Error: {trimmed}")
}
