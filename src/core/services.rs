//! Clients for the content service behind the chat proxy: the active
//! prompt configuration, story prompts, and the media feed.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::{MediaItem, PromptRecord, StoryPrompt};
use crate::core::error::ChatError;
use crate::utils::url::construct_api_url;

/// Where the session reads its prompt configuration from.
#[async_trait]
pub trait PromptSource: Send + Sync {
    /// All prompt records; element 0 is the active one.
    async fn fetch_prompts(&self) -> Result<Vec<PromptRecord>, ChatError>;
}

#[derive(Clone)]
pub struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ServiceClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = construct_api_url(&self.base_url, endpoint);
        debug!(%method, %url, "Service request");
        let request = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => request.bearer_auth(key),
            _ => request,
        }
    }

    async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ChatError> {
        let response = checked(request.send().await.map_err(ChatError::network)?).await?;
        let body = response.text().await.map_err(ChatError::network)?;
        serde_json::from_str(&body).map_err(ChatError::decode)
    }

    pub async fn active_prompt(&self) -> Result<PromptRecord, ChatError> {
        self.fetch_prompts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Configuration("no prompt configured".to_string()))
    }

    pub async fn update_prompt(&self, prompt: &PromptRecord) -> Result<PromptRecord, ChatError> {
        Self::execute(self.request(Method::PUT, "prompts/1").json(prompt)).await
    }

    pub async fn list_story_prompts(&self) -> Result<Vec<StoryPrompt>, ChatError> {
        Self::execute(self.request(Method::GET, "story-prompts")).await
    }

    pub async fn create_story_prompt(&self, prompt: &StoryPrompt) -> Result<StoryPrompt, ChatError> {
        Self::execute(self.request(Method::POST, "story-prompts").json(prompt)).await
    }

    pub async fn update_story_prompt(
        &self,
        id: i64,
        prompt: &StoryPrompt,
    ) -> Result<StoryPrompt, ChatError> {
        Self::execute(
            self.request(Method::PUT, &format!("story-prompts/{id}"))
                .json(prompt),
        )
        .await
    }

    pub async fn delete_story_prompt(&self, id: i64) -> Result<(), ChatError> {
        let request = self.request(Method::DELETE, &format!("story-prompts/{id}"));
        checked(request.send().await.map_err(ChatError::network)?).await?;
        Ok(())
    }

    pub async fn media_feed(&self) -> Result<Vec<MediaItem>, ChatError> {
        Self::execute(self.request(Method::GET, "tweets")).await
    }
}

#[async_trait]
impl PromptSource for ServiceClient {
    async fn fetch_prompts(&self) -> Result<Vec<PromptRecord>, ChatError> {
        Self::execute(self.request(Method::GET, "prompts")).await
    }
}

async fn checked(response: Response) -> Result<Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(ChatError::Server {
        status: status.as_u16(),
        body,
    })
}
