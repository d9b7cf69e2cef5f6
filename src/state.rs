use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::models::PatientId;
use crate::services::agent::{AgentGraph, GraphLimits, ToolContext};
use crate::services::ai::embeddings::Embedder;
use crate::services::ai::DecisionOracle;
use crate::services::recommend::ActivityRecommender;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub oracle: DecisionOracle,
    pub embedder: Box<dyn Embedder>,
    pub recommender: ActivityRecommender,
}

impl AppState {
    /// A routing graph scoped to one patient's request.
    pub fn graph(&self, patient: PatientId) -> AgentGraph<'_> {
        AgentGraph {
            oracle: &self.oracle,
            tools: ToolContext {
                db: &self.db,
                patient,
                export_path: self.config.availability_export.as_deref(),
            },
            limits: GraphLimits {
                max_steps: self.config.max_graph_steps,
                max_tool_calls: self.config.max_tool_calls,
                year: self.config.assistant_year,
            },
        }
    }
}
