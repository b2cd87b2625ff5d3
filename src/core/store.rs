//! Conversation state machine.
//!
//! One owner mutates the store; everyone else observes it through
//! [`ConversationStore::subscribe`], which hands out a watch receiver that
//! always holds the latest [`ConversationSnapshot`].
//!
//! A request cycle moves `Idle -> Sending -> Streaming -> Idle`. The
//! in-flight reply lives inside the `Streaming` state, so the streaming
//! buffer exists exactly while a reply is being streamed and is never part
//! of the log until the cycle completes.

use tokio::sync::watch;
use tracing::debug;

use crate::core::error::{ChatError, SubmitRejected};
use crate::core::message::Message;
use crate::core::signals::{Signal, SignalBus};

pub type CycleId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Sending { cycle: CycleId },
    Streaming { cycle: CycleId, buffer: String },
}

impl CycleState {
    fn cycle(&self) -> Option<CycleId> {
        match self {
            CycleState::Idle => None,
            CycleState::Sending { cycle } | CycleState::Streaming { cycle, .. } => Some(*cycle),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Warning,
    Error,
}

/// Transient, dismissable message for the user. Never sent to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub streaming: Option<String>,
    pub loading: bool,
    pub notifications: Vec<Notification>,
}

/// Handed out when a cycle is admitted: the id to tag stream events with
/// and the full history to send.
#[derive(Debug, Clone)]
pub struct CycleTicket {
    pub id: CycleId,
    pub history: Vec<Message>,
}

pub struct ConversationStore {
    messages: Vec<Message>,
    state: CycleState,
    notifications: Vec<Notification>,
    next_cycle: CycleId,
    next_notification: u64,
    signals: SignalBus,
    observers: watch::Sender<ConversationSnapshot>,
}

impl ConversationStore {
    pub fn new(signals: SignalBus) -> Self {
        let (observers, _) = watch::channel(ConversationSnapshot::default());
        Self {
            messages: Vec::new(),
            state: CycleState::Idle,
            notifications: Vec::new(),
            next_cycle: 1,
            next_notification: 1,
            signals,
            observers,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.observers.subscribe()
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            messages: self.messages.clone(),
            streaming: self.streaming_content().map(str::to_string),
            loading: self.is_loading(),
            notifications: self.notifications.clone(),
        }
    }

    fn publish(&self) {
        self.observers.send_replace(self.snapshot());
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn system_message(&self) -> Option<&Message> {
        self.messages.first().filter(|message| message.is_system())
    }

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        !matches!(self.state, CycleState::Idle)
    }

    pub fn streaming_content(&self) -> Option<&str> {
        match &self.state {
            CycleState::Streaming { buffer, .. } => Some(buffer),
            _ => None,
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn is_current_cycle(&self, cycle: CycleId) -> bool {
        self.state.cycle() == Some(cycle)
    }

    /// Establish the system message (and optional welcome) on an empty log.
    ///
    /// Returns `false` and leaves the log alone when it already has content.
    pub fn seed(&mut self, system: Message, welcome: Option<Message>) -> bool {
        if !self.messages.is_empty() {
            return false;
        }
        self.messages.push(system);
        self.messages.extend(welcome);
        self.publish();
        true
    }

    /// Admit a user submission and start a request cycle.
    pub fn begin_cycle(&mut self, text: &str) -> Result<CycleTicket, SubmitRejected> {
        if self.is_loading() {
            return Err(SubmitRejected::Busy);
        }
        if self.system_message().is_none() {
            return Err(SubmitRejected::NotInitialized);
        }
        if text.trim().is_empty() {
            return Err(SubmitRejected::EmptyMessage);
        }

        let cycle = self.next_cycle;
        self.next_cycle += 1;

        self.messages.push(Message::user(text));
        self.notifications
            .retain(|notification| notification.level != NotificationLevel::Error);
        self.state = CycleState::Sending { cycle };
        debug!(cycle, history = self.messages.len(), "Request cycle started");
        self.publish();
        self.signals.emit(Signal::ResponseStarted);

        Ok(CycleTicket {
            id: cycle,
            history: self.messages.clone(),
        })
    }

    /// Replace the streaming buffer with the latest cumulative text.
    pub fn apply_snapshot(&mut self, cycle: CycleId, text: String) -> bool {
        if !self.is_current_cycle(cycle) {
            return false;
        }
        self.state = CycleState::Streaming {
            cycle,
            buffer: text,
        };
        self.publish();
        true
    }

    /// Commit the streamed reply as an assistant message.
    pub fn complete_cycle(&mut self, cycle: CycleId) -> Option<Message> {
        if !self.is_current_cycle(cycle) {
            return None;
        }
        let content = match std::mem::replace(&mut self.state, CycleState::Idle) {
            CycleState::Streaming { buffer, .. } => buffer,
            _ => String::new(),
        };
        let reply = Message::assistant(content);
        self.messages.push(reply.clone());
        debug!(cycle, chars = reply.content.len(), "Request cycle completed");
        self.publish();
        self.signals.emit(Signal::ResponseFinished);
        Some(reply)
    }

    /// Abort the cycle, dropping any partial reply.
    pub fn fail_cycle(&mut self, cycle: CycleId, error: &ChatError) -> bool {
        if !self.is_current_cycle(cycle) {
            return false;
        }
        self.state = CycleState::Idle;
        debug!(cycle, error = %error, "Request cycle failed");
        self.push_notification_quiet(NotificationLevel::Error, error.user_message());
        self.publish();
        self.signals.emit(Signal::ResponseFinished);
        true
    }

    pub fn push_notification(&mut self, level: NotificationLevel, text: impl Into<String>) -> u64 {
        let id = self.push_notification_quiet(level, text.into());
        self.publish();
        id
    }

    fn push_notification_quiet(&mut self, level: NotificationLevel, text: String) -> u64 {
        let id = self.next_notification;
        self.next_notification += 1;
        self.notifications.push(Notification { id, level, text });
        id
    }

    pub fn dismiss_notification(&mut self, id: u64) -> bool {
        let before = self.notifications.len();
        self.notifications.retain(|notification| notification.id != id);
        let removed = self.notifications.len() != before;
        if removed {
            self.publish();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn seeded_store() -> ConversationStore {
        let mut store = ConversationStore::new(SignalBus::new());
        assert!(store.seed(
            Message::system("You are terse."),
            Some(Message::assistant("Speak, mortal."))
        ));
        store
    }

    #[test]
    fn successful_cycle_appends_user_then_assistant() {
        let mut store = seeded_store();
        let before = store.messages().to_vec();

        let ticket = store.begin_cycle("Hello").expect("admitted");
        assert_eq!(ticket.history.last(), Some(&Message::user("Hello")));
        assert!(store.apply_snapshot(ticket.id, "Ro".into()));
        assert!(store.apply_snapshot(ticket.id, "Roko".into()));
        let reply = store.complete_cycle(ticket.id).expect("completed");

        assert_eq!(reply, Message::assistant("Roko"));
        assert_eq!(store.messages().len(), before.len() + 2);
        assert_eq!(&store.messages()[..before.len()], before.as_slice());
        assert_eq!(
            &store.messages()[before.len()..],
            &[Message::user("Hello"), Message::assistant("Roko")]
        );
        assert_eq!(store.state(), &CycleState::Idle);
    }

    #[test]
    fn failed_cycle_keeps_user_message_only() {
        let mut store = seeded_store();
        let before = store.messages().len();

        let ticket = store.begin_cycle("Hello").expect("admitted");
        store.apply_snapshot(ticket.id, "partial".into());
        assert!(store.fail_cycle(ticket.id, &ChatError::Network("reset".into())));

        assert_eq!(store.messages().len(), before + 1);
        assert_eq!(store.messages().last(), Some(&Message::user("Hello")));
        assert!(store.streaming_content().is_none());
        assert!(!store.is_loading());
        assert_eq!(store.notifications().len(), 1);
        assert_eq!(store.notifications()[0].level, NotificationLevel::Error);
    }

    #[test]
    fn buffer_exists_only_while_streaming() {
        let mut store = seeded_store();
        assert!(store.streaming_content().is_none());

        let ticket = store.begin_cycle("Hi").expect("admitted");
        assert!(matches!(store.state(), CycleState::Sending { .. }));
        assert!(store.streaming_content().is_none());
        assert!(store.is_loading());

        store.apply_snapshot(ticket.id, "A".into());
        assert_eq!(store.streaming_content(), Some("A"));

        store.complete_cycle(ticket.id);
        assert!(store.streaming_content().is_none());
        assert!(!store.is_loading());
    }

    #[test]
    fn cycle_without_fragments_commits_empty_reply() {
        let mut store = seeded_store();
        let ticket = store.begin_cycle("Hi").expect("admitted");
        assert_eq!(
            store.complete_cycle(ticket.id),
            Some(Message::assistant(""))
        );
    }

    #[test]
    fn submission_while_loading_is_rejected_without_change() {
        let mut store = seeded_store();
        let ticket = store.begin_cycle("first").expect("admitted");
        store.apply_snapshot(ticket.id, "half".into());
        let messages = store.messages().to_vec();

        assert_eq!(
            store.begin_cycle("second").unwrap_err(),
            SubmitRejected::Busy
        );
        assert_eq!(store.messages(), messages.as_slice());
        assert_eq!(store.streaming_content(), Some("half"));
    }

    #[test]
    fn blank_and_uninitialized_submissions_are_rejected() {
        let mut store = ConversationStore::new(SignalBus::new());
        assert_eq!(
            store.begin_cycle("hello").unwrap_err(),
            SubmitRejected::NotInitialized
        );

        let mut store = seeded_store();
        assert_eq!(
            store.begin_cycle("   \n").unwrap_err(),
            SubmitRejected::EmptyMessage
        );
        assert!(!store.is_loading());
    }

    #[test]
    fn stale_cycle_events_are_ignored() {
        let mut store = seeded_store();
        let first = store.begin_cycle("one").expect("admitted");
        store.complete_cycle(first.id);
        let second = store.begin_cycle("two").expect("admitted");

        assert!(!store.apply_snapshot(first.id, "late".into()));
        assert!(store.complete_cycle(first.id).is_none());
        assert!(!store.fail_cycle(first.id, &ChatError::Network("late".into())));
        assert!(store.is_current_cycle(second.id));
    }

    #[test]
    fn seed_only_applies_to_empty_log() {
        let mut store = seeded_store();
        assert!(!store.seed(Message::system("other"), None));
        assert_eq!(store.system_message(), Some(&Message::system("You are terse.")));
    }

    #[test]
    fn new_cycle_clears_errors_but_keeps_warnings() {
        let mut store = seeded_store();
        store.push_notification(NotificationLevel::Warning, "Using default system message");
        let ticket = store.begin_cycle("a").expect("admitted");
        store.fail_cycle(ticket.id, &ChatError::Network("down".into()));
        assert_eq!(store.notifications().len(), 2);

        store.begin_cycle("b").expect("admitted");
        assert_eq!(store.notifications().len(), 1);
        assert_eq!(store.notifications()[0].level, NotificationLevel::Warning);
    }

    #[test]
    fn notifications_can_be_dismissed() {
        let mut store = seeded_store();
        let id = store.push_notification(NotificationLevel::Error, "boom");
        assert!(store.dismiss_notification(id));
        assert!(!store.dismiss_notification(id));
        assert!(store.notifications().is_empty());
    }

    #[test]
    fn signals_bracket_each_cycle() {
        let bus = SignalBus::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        for signal in [Signal::ResponseStarted, Signal::ResponseFinished] {
            let events = Arc::clone(&events);
            bus.on(signal, move |signal| events.lock().unwrap().push(signal));
        }
        let mut store = ConversationStore::new(bus);
        store.seed(Message::system("s"), None);

        let ok = store.begin_cycle("one").expect("admitted");
        store.apply_snapshot(ok.id, "x".into());
        store.complete_cycle(ok.id);
        let failed = store.begin_cycle("two").expect("admitted");
        store.fail_cycle(failed.id, &ChatError::Network("x".into()));
        let _ = store.begin_cycle("three");
        let _ = store.begin_cycle("rejected while busy");

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                Signal::ResponseStarted,
                Signal::ResponseFinished,
                Signal::ResponseStarted,
                Signal::ResponseFinished,
                Signal::ResponseStarted,
            ]
        );
    }

    #[test]
    fn observers_see_latest_snapshot() {
        let mut store = seeded_store();
        let observer = store.subscribe();

        let ticket = store.begin_cycle("Hello").expect("admitted");
        store.apply_snapshot(ticket.id, "Ro".into());
        {
            let seen = observer.borrow();
            assert!(seen.loading);
            assert_eq!(seen.streaming.as_deref(), Some("Ro"));
        }

        store.complete_cycle(ticket.id);
        let seen = observer.borrow();
        assert!(!seen.loading);
        assert!(seen.streaming.is_none());
        assert_eq!(seen.messages.last(), Some(&Message::assistant("Ro")));
    }
}
