pub mod embeddings;
pub mod ollama;
pub mod openai;
pub mod structured;

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::ConversationMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl From<&ConversationMessage> for Message {
    fn from(msg: &ConversationMessage) -> Self {
        // Chat endpoints only know user/assistant, so worker attribution is
        // folded into the text.
        let content = match &msg.name {
            Some(name) => format!("[{name}] {}", msg.content),
            None => msg.content.clone(),
        };
        Self {
            role: msg.role.clone(),
            content,
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String>;
}

/// The hosted model as the graph sees it: every call is bounded by a
/// timeout and retried a fixed number of times before giving up.
pub struct DecisionOracle {
    llm: Box<dyn LlmProvider>,
    timeout: Duration,
    retries: u32,
    backoff: Duration,
}

impl DecisionOracle {
    pub fn new(llm: Box<dyn LlmProvider>, timeout: Duration, retries: u32) -> Self {
        Self {
            llm,
            timeout,
            retries,
            backoff: Duration::from_millis(500),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        let mut attempt = 0;
        loop {
            match self.chat_once(system_prompt, messages).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(error = %e, attempt, "oracle call failed, retrying");
                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Asks for a JSON answer of shape `T`. Output that cannot be parsed is
    /// treated like a failed call and retried.
    pub async fn decide<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        messages: &[Message],
    ) -> anyhow::Result<T> {
        let mut attempt = 0;
        loop {
            let reply = self.chat(system_prompt, messages).await?;
            match structured::parse_json::<T>(&reply) {
                Some(value) => return Ok(value),
                None if attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(attempt, "unparseable structured output, retrying");
                    tokio::time::sleep(self.backoff).await;
                }
                None => anyhow::bail!("oracle returned unparseable structured output: {reply}"),
            }
        }
    }

    async fn chat_once(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        tokio::time::timeout(self.timeout, self.llm.chat(system_prompt, messages))
            .await
            .with_context(|| format!("oracle call timed out after {:?}", self.timeout))?
    }
}
