//! Interactive line-based conversation.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::api::PromptRecord;
use crate::core::config::defaults::ResolvedSettings;
use crate::core::error::{ChatError, SubmitRejected};
use crate::core::services::{PromptSource, ServiceClient};
use crate::core::session::{ChatSession, CycleOutcome, InitOutcome};
use crate::core::signals::{Signal, SignalBus};
use crate::core::store::NotificationLevel;
use crate::core::transport::HttpTransport;
use crate::utils::logging::TranscriptLog;

/// Writes only the unseen tail of each cumulative snapshot.
#[derive(Debug, Default)]
pub struct SnapshotPrinter {
    printed: usize,
}

impl SnapshotPrinter {
    pub fn print(&mut self, out: &mut impl Write, snapshot: &str) -> io::Result<()> {
        let delta = snapshot.get(self.printed..).unwrap_or(snapshot);
        if !delta.is_empty() {
            write!(out, "{delta}")?;
            out.flush()?;
        }
        self.printed = snapshot.len();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.printed = 0;
    }
}

/// Stand-in when no content service is configured; the session falls back
/// to the built-in persona.
pub struct NoPromptService;

#[async_trait]
impl PromptSource for NoPromptService {
    async fn fetch_prompts(&self) -> Result<Vec<PromptRecord>, ChatError> {
        Err(ChatError::Configuration("no API URL configured".to_string()))
    }
}

pub fn prompt_source(settings: &ResolvedSettings, client: reqwest::Client) -> Arc<dyn PromptSource> {
    match settings.api_base_url.clone() {
        Some(base_url) => Arc::new(ServiceClient::new(client, base_url, settings.api_key.clone())),
        None => Arc::new(NoPromptService),
    }
}

fn show_prompt() -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()
}

pub async fn run_chat(settings: ResolvedSettings, log: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let client = reqwest::Client::new();
    let transport = Arc::new(HttpTransport::new(
        client.clone(),
        settings.completion_url.clone(),
    ));
    let prompts = prompt_source(&settings, client);

    let transcript = TranscriptLog::new(log)?;
    if transcript.is_active() {
        let started = Local::now().format("%Y-%m-%d %H:%M:%S");
        transcript.log_marker(&format!("Session started {started}"))?;
    }

    let signals = SignalBus::new();
    let _thinking = signals.subscribe(Signal::ResponseStarted, |_| eprint!("⋯ "));
    let _chime = signals.subscribe(Signal::ResponseFinished, |_| eprint!("\x07"));

    let mut session =
        ChatSession::new(transport, prompts, signals, settings.stream).with_transcript(transcript);

    if let InitOutcome::FellBack(err) = session.initialize().await {
        debug!(error = %err, "Started with the built-in persona");
    }
    if let Some(welcome) = session.store().messages().iter().rev().find(|m| m.is_assistant()) {
        println!("{}\n", welcome.content);
    }
    for notification in session.store().notifications() {
        match notification.level {
            NotificationLevel::Warning => eprintln!("⚠️  {}", notification.text),
            NotificationLevel::Error => eprintln!("❌ {}", notification.text),
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printer = SnapshotPrinter::default();
    let mut stdout = io::stdout();
    show_prompt()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match line.trim() {
                    "/quit" | "/exit" => break,
                    "/log" => match session.toggle_transcript() {
                        Ok(status) => eprintln!("{status}"),
                        Err(err) => eprintln!("❌ {err}"),
                    },
                    _ => match session.submit(&line) {
                        Ok(_) => printer.reset(),
                        Err(SubmitRejected::EmptyMessage) => show_prompt()?,
                        Err(rejected) => eprintln!("⚠️  {rejected}"),
                    },
                }
            }
            Some((event, cycle)) = session.next_event() => {
                match session.handle_event(event, cycle) {
                    None => {
                        if let Some(text) = session.store().streaming_content() {
                            printer.print(&mut stdout, text)?;
                        }
                    }
                    Some(CycleOutcome::Completed(reply)) => {
                        printer.print(&mut stdout, &reply.content)?;
                        println!("\n");
                        show_prompt()?;
                    }
                    Some(CycleOutcome::Failed(err)) => {
                        println!();
                        eprintln!("❌ {}", err.user_message());
                        show_prompt()?;
                    }
                }
            }
        }
    }

    println!();
    Ok(())
}
