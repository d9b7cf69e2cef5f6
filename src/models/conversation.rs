use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            name: None,
        }
    }

    pub fn named(content: impl Into<String>, name: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            name: Some(name.to_string()),
        }
    }
}

/// Where the supervisor sends the conversation next.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Route {
    #[serde(rename = "information_node", alias = "information")]
    Information,
    #[serde(rename = "booking_node", alias = "booking")]
    Booking,
    #[serde(rename = "FINISH", alias = "finish", alias = "Finish")]
    Finish,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Information => "information_node",
            Route::Booking => "booking_node",
            Route::Finish => "FINISH",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingDecision {
    pub next: Route,
    #[serde(default)]
    pub reasoning: String,
}

/// Per-request state threaded through the routing graph. Owned by a single
/// in-flight request and dropped once the transcript is returned.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub messages: Vec<ConversationMessage>,
    pub id_number: i64,
    pub next: Option<Route>,
    pub query: String,
    pub current_reasoning: String,
}

impl AgentState {
    pub fn new(id_number: i64, query: &str) -> Self {
        Self {
            messages: vec![ConversationMessage::user(query)],
            id_number,
            next: None,
            query: String::new(),
            current_reasoning: String::new(),
        }
    }
}
