//! Wire payloads exchanged with the chat proxy and the admin services.

use serde::{Deserialize, Serialize};

use crate::core::message::Message;

#[derive(Serialize)]
pub struct CompletionRequest<'a> {
    pub messages: &'a [Message],
}

/// One `data: ` payload from the completion stream.
#[derive(Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromptRecord {
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    pub system_message: String,
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<String>,
}

impl PromptRecord {
    pub fn new(system_message: impl Into<String>, greeting: Option<String>) -> Self {
        Self {
            id: None,
            system_message: system_message.into(),
            greeting,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    /// Greeting text when it carries anything besides whitespace.
    pub fn usable_greeting(&self) -> Option<&str> {
        self.greeting
            .as_deref()
            .filter(|greeting| !greeting.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoryPrompt {
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub system_message: String,
    #[serde(default)]
    pub user_prompt: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub caption: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_record_reads_service_shape() {
        let raw = r#"{
            "id": 1,
            "systemMessage": "Speak plainly.",
            "greeting": null,
            "isActive": true,
            "createdAt": "2024-11-02T10:00:00Z",
            "updatedAt": "2024-11-02T10:00:00Z"
        }"#;
        let record: PromptRecord = serde_json::from_str(raw).expect("prompt record");
        assert_eq!(record.id, Some(1));
        assert_eq!(record.system_message, "Speak plainly.");
        assert!(record.greeting.is_none());
        assert!(record.is_active);
    }

    #[test]
    fn prompt_record_update_omits_server_fields() {
        let record = PromptRecord::new("Be brief.", Some("Hail.".into()));
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "systemMessage": "Be brief.",
                "greeting": "Hail.",
                "isActive": true
            })
        );
    }

    #[test]
    fn blank_greeting_is_not_usable() {
        let record = PromptRecord::new("x", Some("   ".into()));
        assert_eq!(record.usable_greeting(), None);
        let record = PromptRecord::new("x", Some(" Welcome. ".into()));
        assert_eq!(record.usable_greeting(), Some(" Welcome. "));
    }

    #[test]
    fn completion_chunk_tolerates_missing_content() {
        let chunk: CompletionChunk = serde_json::from_str(r#"{"done":true}"#).expect("chunk");
        assert!(chunk.content.is_none());
    }

    #[test]
    fn story_prompt_serializes_camel_case() {
        let story = StoryPrompt {
            id: Some(4),
            name: "Vault".into(),
            description: "A sealed door".into(),
            system_message: "Narrate.".into(),
            user_prompt: "Open it.".into(),
            is_active: false,
        };
        let value = serde_json::to_value(&story).expect("serialize");
        assert_eq!(value["systemMessage"], "Narrate.");
        assert_eq!(value["userPrompt"], "Open it.");
        assert!(value.get("id").is_none());
    }
}
