//! The task that owns a conversation.
//!
//! [`ChatSession`] is the only writer of its [`ConversationStore`]. Stream
//! tasks report back over a channel and the session applies their events
//! in arrival order, so no locking is needed around the log.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::api::PromptRecord;
use crate::core::chat_stream::{ChatStreamService, StreamEvent, StreamParams, StreamSettings};
use crate::core::constants::{
    DEFAULT_PROMPT_WARNING, DEFAULT_SYSTEM_MESSAGE, DEFAULT_WELCOME_MESSAGE, WELCOME_INSTRUCTION,
};
use crate::core::decoder::SnapshotReader;
use crate::core::error::{ChatError, SubmitRejected};
use crate::core::message::Message;
use crate::core::services::PromptSource;
use crate::core::signals::SignalBus;
use crate::core::store::{ConversationSnapshot, ConversationStore, CycleId, NotificationLevel};
use crate::core::transport::CompletionTransport;
use crate::utils::logging::TranscriptLog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// The remote prompt configuration was applied.
    Configured { welcome: WelcomeSource },
    /// Built-in defaults were applied because the configuration failed.
    FellBack(ChatError),
    AlreadyInitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WelcomeSource {
    Greeting,
    Generated,
    Default,
    /// The log already had content, so no welcome was added.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(Message),
    Failed(ChatError),
}

pub struct ChatSession {
    store: ConversationStore,
    stream_service: ChatStreamService,
    events: mpsc::UnboundedReceiver<(StreamEvent, CycleId)>,
    transport: Arc<dyn CompletionTransport>,
    prompts: Arc<dyn PromptSource>,
    settings: StreamSettings,
    transcript: TranscriptLog,
    initialized: bool,
}

impl ChatSession {
    pub fn new(
        transport: Arc<dyn CompletionTransport>,
        prompts: Arc<dyn PromptSource>,
        signals: SignalBus,
        settings: StreamSettings,
    ) -> Self {
        let (stream_service, events) = ChatStreamService::new();
        Self {
            store: ConversationStore::new(signals),
            stream_service,
            events,
            transport,
            prompts,
            settings,
            transcript: TranscriptLog::disabled(),
            initialized: false,
        }
    }

    pub fn with_transcript(mut self, transcript: TranscriptLog) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.store.subscribe()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn dismiss_notification(&mut self, id: u64) -> bool {
        self.store.dismiss_notification(id)
    }

    /// Pause or resume the transcript, returning a status line.
    pub fn toggle_transcript(&mut self) -> Result<String, Box<dyn std::error::Error>> {
        self.transcript.toggle_logging()
    }

    /// Establish the system message and the opening line. Runs once; later
    /// calls return [`InitOutcome::AlreadyInitialized`] without any request.
    pub async fn initialize(&mut self) -> InitOutcome {
        if self.initialized {
            return InitOutcome::AlreadyInitialized;
        }

        let outcome = match self.load_configuration().await {
            Ok(prompt) => {
                let system = Message::system(prompt.system_message.clone());
                let welcome = if self.store.messages().is_empty() {
                    self.welcome_for(&system, &prompt).await
                } else {
                    None
                };
                let source = welcome
                    .as_ref()
                    .map(|(_, source)| *source)
                    .unwrap_or(WelcomeSource::Skipped);
                self.seed(system, welcome.map(|(message, _)| message));
                InitOutcome::Configured { welcome: source }
            }
            Err(err) => {
                warn!(error = %err, "Prompt configuration unavailable; using defaults");
                self.seed(
                    Message::system(DEFAULT_SYSTEM_MESSAGE),
                    Some(Message::assistant(DEFAULT_WELCOME_MESSAGE)),
                );
                self.store
                    .push_notification(NotificationLevel::Warning, DEFAULT_PROMPT_WARNING);
                InitOutcome::FellBack(err)
            }
        };

        self.initialized = true;
        debug!(outcome = ?outcome, "Conversation initialized");
        outcome
    }

    async fn load_configuration(&self) -> Result<PromptRecord, ChatError> {
        let prompt = self
            .prompts
            .fetch_prompts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Configuration("prompt list is empty".to_string()))?;
        if prompt.system_message.trim().is_empty() {
            return Err(ChatError::Configuration(
                "active prompt has no system message".to_string(),
            ));
        }
        Ok(prompt)
    }

    async fn welcome_for(
        &self,
        system: &Message,
        prompt: &PromptRecord,
    ) -> Option<(Message, WelcomeSource)> {
        if let Some(greeting) = prompt.usable_greeting() {
            return Some((Message::assistant(greeting), WelcomeSource::Greeting));
        }
        match self.generate_welcome(system).await {
            Ok(text) if !text.is_empty() => {
                Some((Message::assistant(text), WelcomeSource::Generated))
            }
            Ok(_) => Some((
                Message::assistant(DEFAULT_WELCOME_MESSAGE),
                WelcomeSource::Default,
            )),
            Err(err) => {
                warn!(error = %err, "Welcome generation failed; using default line");
                Some((
                    Message::assistant(DEFAULT_WELCOME_MESSAGE),
                    WelcomeSource::Default,
                ))
            }
        }
    }

    /// One-shot request for an in-character opening line. Not a user
    /// cycle: nothing is appended and no signals fire.
    async fn generate_welcome(&self, system: &Message) -> Result<String, ChatError> {
        let history = [system.clone(), Message::user(WELCOME_INSTRUCTION)];
        let stream = self.transport.send(&history).await?;
        let text = SnapshotReader::new(stream)
            .with_idle_timeout(self.settings.idle_timeout)
            .collect_text()
            .await?;
        Ok(clean_welcome(&text))
    }

    fn seed(&mut self, system: Message, welcome: Option<Message>) {
        if let Some(message) = &welcome {
            self.record(message);
        }
        self.store.seed(system, welcome);
    }

    fn record(&self, message: &Message) {
        if let Err(err) = self.transcript.log_message(message) {
            warn!(error = %err, "Failed to write transcript");
        }
    }

    /// Admit `text` and start streaming the reply in the background.
    pub fn submit(&mut self, text: &str) -> Result<CycleId, SubmitRejected> {
        let ticket = self.store.begin_cycle(text)?;
        if let Some(message) = ticket.history.last() {
            self.record(message);
        }
        self.stream_service.spawn_stream(StreamParams {
            transport: Arc::clone(&self.transport),
            history: ticket.history,
            settings: self.settings,
            cycle: ticket.id,
        });
        Ok(ticket.id)
    }

    pub async fn next_event(&mut self) -> Option<(StreamEvent, CycleId)> {
        self.events.recv().await
    }

    /// Apply one stream event. Returns the outcome when it ended the cycle.
    pub fn handle_event(&mut self, event: StreamEvent, cycle: CycleId) -> Option<CycleOutcome> {
        if !self.store.is_current_cycle(cycle) {
            debug!(cycle, "Ignoring event for stale cycle");
            return None;
        }
        match event {
            StreamEvent::Snapshot(text) => {
                self.store.apply_snapshot(cycle, text);
                None
            }
            StreamEvent::Finished => {
                let reply = self.store.complete_cycle(cycle)?;
                self.record(&reply);
                Some(CycleOutcome::Completed(reply))
            }
            StreamEvent::Failed(err) => {
                self.store.fail_cycle(cycle, &err);
                Some(CycleOutcome::Failed(err))
            }
        }
    }

    /// Submit `text` and drive the cycle to its terminal state.
    pub async fn send_message(&mut self, text: &str) -> Result<CycleOutcome, SubmitRejected> {
        let cycle = self.submit(text)?;
        loop {
            let Some((event, id)) = self.next_event().await else {
                let err = ChatError::Network("stream task ended unexpectedly".to_string());
                self.store.fail_cycle(cycle, &err);
                return Ok(CycleOutcome::Failed(err));
            };
            if let Some(outcome) = self.handle_event(event, id) {
                if id == cycle {
                    return Ok(outcome);
                }
            }
        }
    }
}

fn clean_welcome(text: &str) -> String {
    let text = text.trim();
    let text = text.strip_prefix('"').unwrap_or(text);
    let text = text.strip_suffix('"').unwrap_or(text);
    text.trim().to_string()
}
