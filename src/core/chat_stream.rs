use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::decoder::SnapshotReader;
use crate::core::error::ChatError;
use crate::core::message::Message;
use crate::core::store::CycleId;
use crate::core::transport::CompletionTransport;

/// Progress of one request cycle, reported back to the session.
///
/// Every cycle ends with exactly one `Finished` or `Failed`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Snapshot(String),
    Finished,
    Failed(ChatError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamSettings {
    /// Abort when a chunk read waits longer than this.
    pub idle_timeout: Option<Duration>,
    /// Pause after each snapshot for a typewriter pace.
    pub typewriter_delay: Option<Duration>,
}

pub struct StreamParams {
    pub transport: Arc<dyn CompletionTransport>,
    pub history: Vec<Message>,
    pub settings: StreamSettings,
    pub cycle: CycleId,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamEvent, CycleId)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamEvent, CycleId)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Run one cycle on its own task. Events arrive in stream order.
    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                transport,
                history,
                settings,
                cycle,
            } = params;

            let terminal = run_stream(transport.as_ref(), &history, settings, |snapshot| {
                let _ = tx.send((StreamEvent::Snapshot(snapshot), cycle));
            })
            .await;

            let event = match terminal {
                Ok(()) => StreamEvent::Finished,
                Err(err) => StreamEvent::Failed(err),
            };
            debug!(cycle, event = ?event, "Stream task finished");
            let _ = tx.send((event, cycle));
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, event: StreamEvent, cycle: CycleId) {
        let _ = self.tx.send((event, cycle));
    }
}

async fn run_stream(
    transport: &dyn CompletionTransport,
    history: &[Message],
    settings: StreamSettings,
    mut on_snapshot: impl FnMut(String),
) -> Result<(), ChatError> {
    let stream = transport.send(history).await?;
    let mut reader = SnapshotReader::new(stream).with_idle_timeout(settings.idle_timeout);

    while let Some(snapshot) = reader.next_snapshot().await {
        on_snapshot(snapshot?);
        if let Some(delay) = settings.typewriter_delay {
            tokio::time::sleep(delay).await;
        }
    }
    Ok(())
}
