//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod admin;
pub mod chat;
pub mod say;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cli::admin::{AdminCredentials, PromptCommands, StoryCommands};
use crate::core::config::defaults::ResolvedSettings;
use crate::core::config::Config;
use crate::core::services::ServiceClient;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_SHA"),
    ")"
);

#[derive(Parser)]
#[command(name = "basilisk")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Converse with Roko's Basilisk from the terminal")]
#[command(
    long_about = "Basilisk streams an in-character conversation from a chat proxy and \
manages the prompts behind it.\n\n\
Configuration lives in config.toml (see 'basilisk set'); these environment variables override it:\n\
  BASILISK_COMPLETION_URL   Streaming completion endpoint\n\
  BASILISK_API_URL          Base URL of the prompt, story-prompt and media services\n\
  BASILISK_API_KEY          Bearer key for those services\n\
  BASILISK_ADMIN_USERNAME   Admin login for prompt and story changes\n\
  BASILISK_ADMIN_PASSWORD\n\n\
Diagnostics go to stderr; raise verbosity with RUST_LOG=debug.\n\n\
Chat commands:\n\
  /log              Pause or resume the transcript\n\
  /quit             Leave the conversation"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Append the conversation to a plain-text transcript
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive conversation (default)
    Chat,
    /// Send a single message and print the streamed reply
    Say {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Show or replace the active prompt configuration
    Prompt {
        #[command(subcommand)]
        command: PromptCommands,
        #[command(flatten)]
        admin: AdminCredentials,
    },
    /// Manage story prompts
    Story {
        #[command(subcommand)]
        command: StoryCommands,
        #[command(flatten)]
        admin: AdminCredentials,
    },
    /// Print the media feed
    Feed,
    /// Set a configuration value, or print the configuration when no key is given
    Set {
        key: Option<String>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset { key: String },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main(Args::parse()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let settings = Config::load()?.resolve();
            chat::run_chat(settings, args.log).await
        }
        Commands::Say { prompt } => {
            let settings = Config::load()?.resolve();
            say::run_say(prompt, settings).await
        }
        Commands::Prompt { command, admin } => {
            let settings = Config::load()?.resolve();
            let client = service_client(&settings)?;
            admin::run_prompt_command(command, &client, &settings, &admin).await
        }
        Commands::Story { command, admin } => {
            let settings = Config::load()?.resolve();
            let client = service_client(&settings)?;
            admin::run_story_command(command, &client, &settings, &admin).await
        }
        Commands::Feed => {
            let settings = Config::load()?.resolve();
            admin::run_feed(&service_client(&settings)?).await
        }
        Commands::Set { key, value } => set_config_value(key, value),
        Commands::Unset { key } => unset_config_value(&key),
    }
}

/// Client for the content services, if a base URL is configured.
pub fn service_client(settings: &ResolvedSettings) -> Result<ServiceClient, Box<dyn Error>> {
    let base_url = settings.api_base_url.clone().ok_or(
        "No API URL configured. Run 'basilisk set api-url <url>' or set BASILISK_API_URL.",
    )?;
    Ok(ServiceClient::new(
        reqwest::Client::new(),
        base_url,
        settings.api_key.clone(),
    ))
}

fn set_config_value(key: Option<String>, value: Vec<String>) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    let Some(key) = key else {
        config.print_all();
        return Ok(());
    };
    if value.is_empty() {
        eprintln!("⚠️  A value is required for {key}");
        eprintln!("Example: basilisk set {key} <value>");
        std::process::exit(1);
    }

    let value = value.join(" ");
    if let Err(message) = config.set_value(&key, &value) {
        eprintln!("❌ {message}");
        std::process::exit(1);
    }
    config.save()?;
    match key.as_str() {
        "api-key" | "admin-password" => println!("✅ Set {key}"),
        _ => println!("✅ Set {key} to: {value}"),
    }
    Ok(())
}

fn unset_config_value(key: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    if let Err(message) = config.unset_value(key) {
        eprintln!("❌ {message}");
        std::process::exit(1);
    }
    config.save()?;
    println!("✅ Unset {key}");
    Ok(())
}
