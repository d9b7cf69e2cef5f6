use crate::models::AgentState;
use crate::services::ai::{DecisionOracle, Message};

use super::graph::GraphError;
use super::prompts;
use super::tools::{Tool, ToolContext, ToolSpec, WorkerTurn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Worker {
    Information,
    Booking,
}

impl Worker {
    pub fn name(&self) -> &'static str {
        match self {
            Worker::Information => "information_node",
            Worker::Booking => "booking_node",
        }
    }

    pub fn tools(&self) -> &'static [Tool] {
        match self {
            Worker::Information => &[
                Tool::CheckAvailabilityByDoctor,
                Tool::CheckAvailabilityBySpecialization,
            ],
            Worker::Booking => &[
                Tool::SetAppointment,
                Tool::CancelAppointment,
                Tool::RescheduleAppointment,
            ],
        }
    }

    fn role(&self) -> &'static str {
        match self {
            Worker::Information => prompts::INFORMATION_ROLE,
            Worker::Booking => prompts::BOOKING_ROLE,
        }
    }

    fn allows(&self, tool: &str) -> bool {
        self.tools().iter().any(|t| t.as_str() == tool.trim())
    }
}

/// Runs one worker visit: a tool-use loop against the oracle that ends with
/// the worker's reply text.
pub async fn run_worker(
    worker: Worker,
    oracle: &DecisionOracle,
    tools: &ToolContext<'_>,
    state: &AgentState,
    max_tool_calls: usize,
    year: i32,
) -> Result<String, GraphError> {
    let specs: Vec<ToolSpec> = worker.tools().iter().map(Tool::spec).collect();
    let system = prompts::worker_prompt(worker.role(), &specs, state.id_number, year);

    let mut scratch: Vec<Message> = state.messages.iter().map(Message::from).collect();
    let mut calls = 0;
    let mut last_result: Option<String> = None;

    loop {
        let reply = oracle
            .chat(&system, &scratch)
            .await
            .map_err(GraphError::Oracle)?;

        let call = match WorkerTurn::parse(&reply) {
            WorkerTurn::Reply(text) => return Ok(text),
            WorkerTurn::Call(call) => call,
        };

        if calls >= max_tool_calls {
            tracing::warn!(worker = worker.name(), calls, "tool call limit reached");
            return Ok(last_result.unwrap_or_else(|| reply.trim().to_string()));
        }
        calls += 1;

        let result = if worker.allows(&call.tool) {
            tools.execute(&call).map_err(GraphError::Store)?
        } else {
            format!(
                "Tool {} is not available here. Available tools: {}",
                call.tool,
                specs.iter().map(|s| s.name).collect::<Vec<_>>().join(", ")
            )
        };

        scratch.push(Message {
            role: "assistant".to_string(),
            content: reply.trim().to_string(),
        });
        let mut content = format!("Result of {}: {result}", call.tool);
        if calls >= max_tool_calls {
            content.push_str("\n\n");
            content.push_str(prompts::TOOL_LIMIT_NOTE);
        }
        scratch.push(Message {
            role: "user".to_string(),
            content,
        });
        last_result = Some(result);
    }
}
