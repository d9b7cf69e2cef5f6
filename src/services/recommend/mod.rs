pub mod memory;
pub mod retriever;

use anyhow::Context;
use tokio::sync::OnceCell;

use crate::services::ai::embeddings::Embedder;
use crate::services::ai::{DecisionOracle, Message};

use memory::ConversationMemory;
use retriever::{VectorIndex, ACTIVITIES, TOP_K};

const CONDENSE_PROMPT: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language. \
Reply with the standalone question only.";

fn answer_prompt(context: &str, chat_history: &str, question: &str) -> String {
    format!(
        r#"You are a helpful assistant that recommends activities based on the user's past and current inputs.

Context:
{context}

Chat History:
{chat_history}

User: {question}
Assistant:"#
    )
}

/// Retrieval-augmented activity chatbot with one shared memory buffer.
#[derive(Default)]
pub struct ActivityRecommender {
    index: OnceCell<VectorIndex>,
    memory: ConversationMemory,
}

impl ActivityRecommender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn reset(&self) {
        self.memory.clear();
        tracing::info!("chat memory cleared");
    }

    pub async fn reply(
        &self,
        oracle: &DecisionOracle,
        embedder: &dyn Embedder,
        message: &str,
    ) -> anyhow::Result<String> {
        let index = self
            .index
            .get_or_try_init(|| VectorIndex::build(embedder, &ACTIVITIES))
            .await?;

        let history = self.memory.transcript();
        let question = if self.memory.is_empty() {
            message.to_string()
        } else {
            let condensed = oracle
                .chat(
                    CONDENSE_PROMPT,
                    &[user(format!(
                        "Chat History:\n{history}\nFollow Up Input: {message}\nStandalone question:"
                    ))],
                )
                .await
                .context("failed to condense follow-up question")?;
            condensed.trim().to_string()
        };
        tracing::debug!(%question, "chat question");

        let query = embedder
            .embed(&question)
            .await
            .context("failed to embed question")?;
        let context = index.search(&query, TOP_K).join("\n\n");

        let answer = oracle
            .chat(&answer_prompt(&context, &history, &question), &[user(question.clone())])
            .await
            .context("failed to generate recommendation")?;
        let answer = answer.trim().to_string();

        self.memory.push(message, &answer);
        Ok(answer)
    }
}

fn user(content: String) -> Message {
    Message {
        role: "user".to_string(),
        content,
    }
}
