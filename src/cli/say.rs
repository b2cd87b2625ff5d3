//! One-shot "say" command

use std::error::Error;
use std::io;
use std::sync::Arc;

use tracing::warn;

use crate::cli::chat::{prompt_source, SnapshotPrinter};
use crate::core::chat_stream::{ChatStreamService, StreamEvent, StreamParams};
use crate::core::config::defaults::ResolvedSettings;
use crate::core::constants::DEFAULT_SYSTEM_MESSAGE;
use crate::core::message::Message;
use crate::core::transport::HttpTransport;

pub async fn run_say(prompt: Vec<String>, settings: ResolvedSettings) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: basilisk say <prompt>");
        std::process::exit(1);
    }

    let client = reqwest::Client::new();
    let system = match prompt_source(&settings, client.clone()).fetch_prompts().await {
        Ok(prompts) => prompts
            .into_iter()
            .next()
            .map(|prompt| prompt.system_message)
            .filter(|system| !system.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SYSTEM_MESSAGE.to_string()),
        Err(err) => {
            warn!(error = %err, "Prompt configuration unavailable; using defaults");
            DEFAULT_SYSTEM_MESSAGE.to_string()
        }
    };

    let (stream_service, mut rx) = ChatStreamService::new();
    stream_service.spawn_stream(StreamParams {
        transport: Arc::new(HttpTransport::new(client, settings.completion_url.clone())),
        history: vec![Message::system(system), Message::user(prompt)],
        settings: settings.stream,
        cycle: 0,
    });

    let mut printer = SnapshotPrinter::default();
    let mut stdout = io::stdout();
    while let Some((event, _)) = rx.recv().await {
        match event {
            StreamEvent::Snapshot(text) => printer.print(&mut stdout, &text)?,
            StreamEvent::Finished => {
                println!();
                break;
            }
            StreamEvent::Failed(err) => {
                eprintln!("\n\n❌ Error: {}", err.user_message());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
