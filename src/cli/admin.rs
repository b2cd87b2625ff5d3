//! Admin subcommands: prompt configuration, story prompts and the media feed.

use std::error::Error;

use clap::{Args, Subcommand};
use tracing::debug;

use crate::api::{PromptRecord, StoryPrompt};
use crate::core::admin::{AdminGate, AdminSession, AuthError};
use crate::core::config::defaults::ResolvedSettings;
use crate::core::services::ServiceClient;

#[derive(Args, Debug, Default, Clone)]
pub struct AdminCredentials {
    /// Admin username (required when admin credentials are configured)
    #[arg(long)]
    pub username: Option<String>,
    /// Admin password
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum PromptCommands {
    /// Print the active system message and greeting
    Show,
    /// Replace the active system message and greeting
    Set {
        #[arg(long)]
        system: String,
        #[arg(long)]
        greeting: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct StoryFields {
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long)]
    pub system: String,
    #[arg(long, default_value = "")]
    pub user_prompt: String,
    /// Store the story prompt as inactive
    #[arg(long)]
    pub inactive: bool,
}

impl StoryFields {
    fn into_prompt(self) -> StoryPrompt {
        StoryPrompt {
            id: None,
            name: self.name,
            description: self.description,
            system_message: self.system,
            user_prompt: self.user_prompt,
            is_active: !self.inactive,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum StoryCommands {
    /// List story prompts
    List,
    /// Create a story prompt
    Create {
        #[command(flatten)]
        fields: StoryFields,
    },
    /// Replace a story prompt
    Update {
        id: i64,
        #[command(flatten)]
        fields: StoryFields,
    },
    /// Delete a story prompt
    Delete { id: i64 },
}

/// Log in when the gate has credentials configured. An unconfigured gate
/// leaves admin commands open, matching a local development setup.
pub fn authorize(
    gate: &AdminGate,
    credentials: &AdminCredentials,
) -> Result<Option<AdminSession>, AuthError> {
    if !gate.is_configured() {
        return Ok(None);
    }
    let session = gate.login(
        credentials.username.as_deref().unwrap_or_default(),
        credentials.password.as_deref().unwrap_or_default(),
    )?;
    debug!(cookie = session.set_cookie_header(), "Admin login accepted");
    Ok(Some(session))
}

pub async fn run_prompt_command(
    command: PromptCommands,
    client: &ServiceClient,
    settings: &ResolvedSettings,
    credentials: &AdminCredentials,
) -> Result<(), Box<dyn Error>> {
    match command {
        PromptCommands::Show => {
            let prompt = client.active_prompt().await?;
            println!("System message:\n{}\n", prompt.system_message);
            match prompt.usable_greeting() {
                Some(greeting) => println!("Greeting:\n{greeting}"),
                None => println!("Greeting: (generated at startup)"),
            }
        }
        PromptCommands::Set { system, greeting } => {
            authorize(&settings.admin_gate(), credentials)?;
            if system.trim().is_empty() {
                return Err("The system message cannot be empty".into());
            }
            client
                .update_prompt(&PromptRecord::new(system, greeting))
                .await?;
            println!("✅ Updated the active prompt");
        }
    }
    Ok(())
}

pub async fn run_story_command(
    command: StoryCommands,
    client: &ServiceClient,
    settings: &ResolvedSettings,
    credentials: &AdminCredentials,
) -> Result<(), Box<dyn Error>> {
    if !matches!(command, StoryCommands::List) {
        authorize(&settings.admin_gate(), credentials)?;
    }

    match command {
        StoryCommands::List => {
            let stories = client.list_story_prompts().await?;
            if stories.is_empty() {
                println!("No story prompts.");
            }
            for story in stories {
                println!("{}", story_line(&story));
            }
        }
        StoryCommands::Create { fields } => {
            let created = client.create_story_prompt(&fields.into_prompt()).await?;
            println!("✅ Created {}", story_line(&created));
        }
        StoryCommands::Update { id, fields } => {
            let updated = client
                .update_story_prompt(id, &fields.into_prompt())
                .await?;
            println!("✅ Updated {}", story_line(&updated));
        }
        StoryCommands::Delete { id } => {
            client.delete_story_prompt(id).await?;
            println!("✅ Deleted story prompt {id}");
        }
    }
    Ok(())
}

pub async fn run_feed(client: &ServiceClient) -> Result<(), Box<dyn Error>> {
    for item in client.media_feed().await? {
        println!("{}", item.content);
        if let Some(caption) = item.caption.as_deref().filter(|c| !c.is_empty()) {
            println!("  {caption}");
        }
        if let Some(url) = &item.media_url {
            println!("  {url}");
        }
        println!();
    }
    Ok(())
}

fn story_line(story: &StoryPrompt) -> String {
    let id = story
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let status = if story.is_active { "" } else { " (inactive)" };
    if story.description.is_empty() {
        format!("[{id}] {}{status}", story.name)
    } else {
        format!("[{id}] {}{status}: {}", story.name, story.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(username: &str, password: &str) -> AdminCredentials {
        AdminCredentials {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn unconfigured_gate_allows_admin_commands() {
        let gate = AdminGate::new(None, None, false);
        assert_eq!(authorize(&gate, &AdminCredentials::default()), Ok(None));
    }

    #[test]
    fn configured_gate_requires_matching_login() {
        let gate = AdminGate::new(Some("warden".into()), Some("s3cret".into()), false);
        assert_eq!(
            authorize(&gate, &AdminCredentials::default()),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            authorize(&gate, &creds("warden", "nope")),
            Err(AuthError::InvalidCredentials)
        );
        let session = authorize(&gate, &creds("warden", "s3cret"))
            .expect("login")
            .expect("session");
        assert!(session.set_cookie_header().starts_with("admin_auth=true"));
    }

    #[test]
    fn story_lines_show_status_and_description() {
        let mut story = StoryPrompt {
            id: Some(3),
            name: "Vault".to_string(),
            description: String::new(),
            system_message: "Narrate.".to_string(),
            user_prompt: String::new(),
            is_active: true,
        };
        assert_eq!(story_line(&story), "[3] Vault");
        story.is_active = false;
        story.description = "A sealed room".to_string();
        assert_eq!(story_line(&story), "[3] Vault (inactive): A sealed room");
    }
}
