//! Incremental decoding of the completion stream.
//!
//! The proxy frames its output as server-sent-event lines. Only lines that
//! start with `data: ` matter; their payload is a JSON object whose
//! `content` string is one fragment of the reply. The decoder accumulates
//! fragments and hands back the whole text so far after each one.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::StreamExt;
use memchr::memchr;
use tracing::{debug, warn};

use crate::api::CompletionChunk;
use crate::core::error::ChatError;
use crate::core::transport::ByteStream;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

enum LineOutcome {
    Ignored,
    Fragment(String),
    Malformed,
}

fn classify_line(raw: &[u8]) -> LineOutcome {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line,
        Err(err) => {
            warn!(error = %err, "Skipping stream line with invalid UTF-8");
            return LineOutcome::Malformed;
        }
    };

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return LineOutcome::Ignored;
    };
    if payload.trim() == DONE_SENTINEL {
        return LineOutcome::Ignored;
    }

    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => chunk
            .content
            .map(LineOutcome::Fragment)
            .unwrap_or(LineOutcome::Ignored),
        Err(err) => {
            warn!(error = %err, payload, "Skipping malformed stream fragment");
            LineOutcome::Malformed
        }
    }
}

/// Line-oriented decoder state for one response.
///
/// Bytes are held back until a newline arrives, so a multi-byte character
/// split across two chunks is decoded once both halves are present.
#[derive(Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    accumulated: String,
    fragments: usize,
    skipped: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns a cumulative snapshot per decoded fragment.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut snapshots = Vec::new();
        let mut consumed = 0;
        while let Some(relative) = memchr(b'\n', &self.buffer[consumed..]) {
            let end = consumed + relative;
            let outcome = classify_line(&self.buffer[consumed..end]);
            consumed = end + 1;
            self.apply(outcome, &mut snapshots);
        }
        if consumed > 0 {
            self.buffer.drain(..consumed);
        }

        snapshots
    }

    /// Flush a trailing line that was never newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        let mut snapshots = Vec::new();
        self.apply(classify_line(&rest), &mut snapshots);
        snapshots.pop()
    }

    fn apply(&mut self, outcome: LineOutcome, snapshots: &mut Vec<String>) {
        match outcome {
            LineOutcome::Ignored => {}
            LineOutcome::Fragment(content) => {
                self.accumulated.push_str(&content);
                self.fragments += 1;
                snapshots.push(self.accumulated.clone());
            }
            LineOutcome::Malformed => self.skipped += 1,
        }
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    pub fn skipped_fragments(&self) -> usize {
        self.skipped
    }
}

/// Lazily turns a [`ByteStream`] into cumulative text snapshots.
///
/// The sequence ends when the byte stream does, or after the first
/// transport error. It cannot be restarted.
pub struct SnapshotReader {
    stream: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    idle_timeout: Option<Duration>,
    exhausted: bool,
}

impl SnapshotReader {
    pub fn new(stream: ByteStream) -> Self {
        Self {
            stream,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            idle_timeout: None,
            exhausted: false,
        }
    }

    /// Fail the read when no chunk arrives within `limit`.
    pub fn with_idle_timeout(mut self, limit: Option<Duration>) -> Self {
        self.idle_timeout = limit;
        self
    }

    pub async fn next_snapshot(&mut self) -> Option<Result<String, ChatError>> {
        loop {
            if let Some(snapshot) = self.pending.pop_front() {
                return Some(Ok(snapshot));
            }
            if self.exhausted {
                return None;
            }

            match self.read_chunk().await {
                Ok(Some(chunk)) => self.pending.extend(self.decoder.push(&chunk)),
                Ok(None) => {
                    self.exhausted = true;
                    self.pending.extend(self.decoder.finish());
                    debug!(
                        fragments = self.decoder.fragment_count(),
                        skipped = self.decoder.skipped_fragments(),
                        "Completion stream ended"
                    );
                }
                Err(err) => {
                    self.exhausted = true;
                    self.pending.clear();
                    return Some(Err(err));
                }
            }
        }
    }

    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>, ChatError> {
        let next = match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, self.stream.next())
                .await
                .map_err(|_| {
                    ChatError::Network(format!(
                        "stream stalled: no data for {} ms",
                        limit.as_millis()
                    ))
                })?,
            None => self.stream.next().await,
        };
        next.transpose()
    }

    /// Drain the stream and return the final accumulated text.
    pub async fn collect_text(mut self) -> Result<String, ChatError> {
        while let Some(snapshot) = self.next_snapshot().await {
            snapshot?;
        }
        Ok(self.decoder.accumulated().to_string())
    }

    pub fn skipped_fragments(&self) -> usize {
        self.decoder.skipped_fragments()
    }
}
