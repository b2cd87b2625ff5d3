use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tracing::debug;

use crate::api::CompletionRequest;
use crate::core::error::ChatError;
use crate::core::message::Message;

/// Raw response body, chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ChatError>> + Send>>;

/// Sends the whole conversation to the completion endpoint.
///
/// The endpoint is stateless per request, so every call carries the full
/// history rather than a delta. Implementations never touch session state.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn send(&self, history: &[Message]) -> Result<ByteStream, ChatError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    completion_url: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, completion_url: impl Into<String>) -> Self {
        Self {
            client,
            completion_url: completion_url.into(),
        }
    }

    pub fn completion_url(&self) -> &str {
        &self.completion_url
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn send(&self, history: &[Message]) -> Result<ByteStream, ChatError> {
        debug!(
            url = %self.completion_url,
            messages = history.len(),
            "Dispatching completion request"
        );

        let response = self
            .client
            .post(&self.completion_url)
            .header("Content-Type", "application/json")
            .json(&CompletionRequest { messages: history })
            .send()
            .await
            .map_err(ChatError::network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            debug!(status = status.as_u16(), "Completion request rejected");
            return Err(ChatError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ChatError::network));
        Ok(Box::pin(stream))
    }
}
