use std::sync::Mutex;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

/// Chat history shared by every caller of the chatbot.
#[derive(Debug, Default)]
pub struct ConversationMemory {
    turns: Mutex<Vec<Turn>>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, user: &str, assistant: &str) {
        self.guard().push(Turn {
            user: user.to_string(),
            assistant: assistant.to_string(),
        });
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.guard().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }

    /// "Human: ..\nAssistant: .." lines, oldest first.
    pub fn transcript(&self) -> String {
        self.guard()
            .iter()
            .map(|t| format!("Human: {}\nAssistant: {}", t.user, t.assistant))
            .collect::<Vec<_>>()
            .join("\n")
    }

    // A panic mid-push cannot leave a half-written turn, so a poisoned
    // buffer is still usable.
    fn guard(&self) -> std::sync::MutexGuard<'_, Vec<Turn>> {
        self.turns.lock().unwrap_or_else(|e| e.into_inner())
    }
}
