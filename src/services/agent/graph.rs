use crate::models::{AgentState, ConversationMessage, Route, RoutingDecision};
use crate::services::ai::{DecisionOracle, Message};

use super::prompts;
use super::tools::ToolContext;
use super::workers::{run_worker, Worker};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("decision oracle failed: {0:#}")]
    Oracle(anyhow::Error),

    #[error("availability store failed: {0:#}")]
    Store(anyhow::Error),
}

/// States of the routing graph. `Supervisor` is the entry point and is
/// re-entered after every worker; `Finish` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Supervisor,
    Information,
    Booking,
    Finish,
}

impl Node {
    pub fn as_str(&self) -> &'static str {
        match self {
            Node::Supervisor => "supervisor",
            Node::Information => "information_node",
            Node::Booking => "booking_node",
            Node::Finish => "__end__",
        }
    }
}

impl From<Route> for Node {
    fn from(route: Route) -> Self {
        match route {
            Route::Information => Node::Information,
            Route::Booking => Node::Booking,
            Route::Finish => Node::Finish,
        }
    }
}

/// Changes a node makes to the conversation state. Messages are appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub next: Option<Route>,
    pub current_reasoning: Option<String>,
    pub query: Option<String>,
    pub messages: Vec<ConversationMessage>,
}

impl StateUpdate {
    pub fn apply(self, state: &mut AgentState) {
        if let Some(next) = self.next {
            state.next = Some(next);
        }
        if let Some(reasoning) = self.current_reasoning {
            state.current_reasoning = reasoning;
        }
        if let Some(query) = self.query {
            state.query = query;
        }
        state.messages.extend(self.messages);
    }
}

/// Supervisor transition. Depends only on the decision, so every edge of the
/// graph can be checked without a model.
pub fn supervisor_transition(state: &AgentState, decision: RoutingDecision) -> (Node, StateUpdate) {
    let mut update = StateUpdate {
        next: Some(decision.next),
        current_reasoning: Some(decision.reasoning),
        ..Default::default()
    };

    // First visit: remember the original query and put the patient id on
    // record for the workers.
    if state.messages.len() == 1 {
        update.query = Some(state.messages[0].content.clone());
        update
            .messages
            .push(ConversationMessage::user(prompts::identification_note(state.id_number)));
    }

    (Node::from(decision.next), update)
}

/// Worker transition: append the reply under the worker's name and go back
/// to the supervisor. Workers have no other exit.
pub fn worker_transition(worker: Worker, reply: String) -> (Node, StateUpdate) {
    let update = StateUpdate {
        messages: vec![ConversationMessage::named(reply, worker.name())],
        ..Default::default()
    };
    (Node::Supervisor, update)
}

#[derive(Debug, Clone, Copy)]
pub struct GraphLimits {
    pub max_steps: usize,
    pub max_tool_calls: usize,
    pub year: i32,
}

impl Default for GraphLimits {
    fn default() -> Self {
        Self {
            max_steps: 20,
            max_tool_calls: 5,
            year: 2024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Finished,
    StepLimit,
}

#[derive(Debug)]
pub struct GraphRun {
    pub state: AgentState,
    pub steps: usize,
    pub stop: StopReason,
}

pub struct AgentGraph<'a> {
    pub oracle: &'a DecisionOracle,
    pub tools: ToolContext<'a>,
    pub limits: GraphLimits,
}

impl AgentGraph<'_> {
    /// Runs from the supervisor until it picks FINISH or the step ceiling is
    /// hit. The ceiling wins over whatever the oracle says.
    pub async fn run(&self, mut state: AgentState) -> Result<GraphRun, GraphError> {
        let mut node = Node::Supervisor;
        let mut steps = 0;

        while node != Node::Finish {
            if steps >= self.limits.max_steps {
                tracing::warn!(
                    steps,
                    node = node.as_str(),
                    "step ceiling reached, stopping graph"
                );
                return Ok(GraphRun {
                    state,
                    steps,
                    stop: StopReason::StepLimit,
                });
            }

            let (next, update) = self.step(node, &state).await?;
            update.apply(&mut state);
            steps += 1;

            tracing::debug!(from = node.as_str(), to = next.as_str(), steps, "transition");
            node = next;
        }

        Ok(GraphRun {
            state,
            steps,
            stop: StopReason::Finished,
        })
    }

    pub async fn step(
        &self,
        node: Node,
        state: &AgentState,
    ) -> Result<(Node, StateUpdate), GraphError> {
        match node {
            Node::Supervisor => {
                let decision = self.route(state).await?;
                Ok(supervisor_transition(state, decision))
            }
            Node::Information => self.work(Worker::Information, state).await,
            Node::Booking => self.work(Worker::Booking, state).await,
            Node::Finish => Ok((Node::Finish, StateUpdate::default())),
        }
    }

    async fn route(&self, state: &AgentState) -> Result<RoutingDecision, GraphError> {
        let mut messages = vec![Message {
            role: "user".to_string(),
            content: prompts::identification_note(state.id_number),
        }];
        messages.extend(state.messages.iter().map(Message::from));

        let decision: RoutingDecision = self
            .oracle
            .decide(&prompts::supervisor_prompt(), &messages)
            .await
            .map_err(GraphError::Oracle)?;

        tracing::info!(
            patient_id = state.id_number,
            next = decision.next.as_str(),
            reasoning = %decision.reasoning,
            "routing decision"
        );
        Ok(decision)
    }

    async fn work(
        &self,
        worker: Worker,
        state: &AgentState,
    ) -> Result<(Node, StateUpdate), GraphError> {
        tracing::info!(worker = worker.name(), "entered worker");
        let reply = run_worker(
            worker,
            self.oracle,
            &self.tools,
            state,
            self.limits.max_tool_calls,
            self.limits.year,
        )
        .await?;
        Ok(worker_transition(worker, reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use rusqlite::Connection;

    use crate::db::{self, queries};
    use crate::models::{Doctor, PatientId, Slot, Specialization};
    use crate::services::ai::LlmProvider;

    const PATIENT: i64 = 1000097;

    /// Replays canned replies in order and records the system prompts it saw.
    struct ScriptedLlm {
        replies: Mutex<VecDeque<String>>,
        systems: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedLlm {
        fn new(replies: &[&str]) -> (Self, Arc<Mutex<Vec<String>>>) {
            let systems = Arc::new(Mutex::new(vec![]));
            let llm = Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                systems: systems.clone(),
            };
            (llm, systems)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn chat(&self, system_prompt: &str, _messages: &[Message]) -> anyhow::Result<String> {
            self.systems.lock().unwrap().push(system_prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }
    }

    /// Never lets the supervisor finish.
    struct IndecisiveLlm;

    #[async_trait]
    impl LlmProvider for IndecisiveLlm {
        async fn chat(&self, system_prompt: &str, _messages: &[Message]) -> anyhow::Result<String> {
            if system_prompt.contains("You are a supervisor") {
                Ok(r#"{"next":"information_node","reasoning":"check again"}"#.to_string())
            } else {
                Ok("Still checking.".to_string())
            }
        }
    }

    fn oracle(llm: impl LlmProvider + 'static) -> DecisionOracle {
        DecisionOracle::new(Box::new(llm), Duration::from_secs(5), 1)
            .with_backoff(Duration::from_millis(1))
    }

    fn setup_db() -> Mutex<Connection> {
        let conn = db::init_db(":memory:").unwrap();
        let at = NaiveDateTime::parse_from_str("2024-08-05 08:00", "%Y-%m-%d %H:%M").unwrap();
        queries::insert_slot(&conn, &Slot::open(at, Doctor::JaneSmith, Specialization::Orthodontist))
            .unwrap();
        Mutex::new(conn)
    }

    fn graph<'a>(oracle: &'a DecisionOracle, db: &'a Mutex<Connection>, max_steps: usize) -> AgentGraph<'a> {
        AgentGraph {
            oracle,
            tools: ToolContext {
                db,
                patient: PatientId::new(PATIENT).unwrap(),
                export_path: None,
            },
            limits: GraphLimits {
                max_steps,
                ..Default::default()
            },
        }
    }

    fn decision(next: Route) -> RoutingDecision {
        RoutingDecision {
            next,
            reasoning: "because".to_string(),
        }
    }

    #[test]
    fn test_supervisor_edges() {
        let state = AgentState::new(PATIENT, "hello");
        assert_eq!(supervisor_transition(&state, decision(Route::Information)).0, Node::Information);
        assert_eq!(supervisor_transition(&state, decision(Route::Booking)).0, Node::Booking);
        assert_eq!(supervisor_transition(&state, decision(Route::Finish)).0, Node::Finish);
    }

    #[test]
    fn test_worker_edges_return_to_supervisor() {
        for worker in [Worker::Information, Worker::Booking] {
            let (next, update) = worker_transition(worker, "done".to_string());
            assert_eq!(next, Node::Supervisor);
            assert_eq!(update.messages[0].name.as_deref(), Some(worker.name()));
        }
    }

    #[test]
    fn test_first_supervisor_visit_records_query() {
        let mut state = AgentState::new(PATIENT, "Is Dr. Jane Smith available?");
        let (_, update) = supervisor_transition(&state, decision(Route::Information));
        update.apply(&mut state);

        assert_eq!(state.query, "Is Dr. Jane Smith available?");
        assert_eq!(state.current_reasoning, "because");
        assert_eq!(state.next, Some(Route::Information));
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].content, "User's identification number is 1000097");

        // later visits only update the decision
        let (_, update) = supervisor_transition(&state, decision(Route::Finish));
        assert!(update.query.is_none());
        assert!(update.messages.is_empty());
    }

    #[tokio::test]
    async fn test_information_round_trip() {
        let (llm, systems) = ScriptedLlm::new(&[
            r#"{"next":"information_node","reasoning":"availability question"}"#,
            r#"{"tool":"check_availability_by_doctor","arguments":{"desired_date":"05-08-2024","doctor_name":"jane smith"}}"#,
            "Dr. Jane Smith is available at 08:00.",
            r#"{"next":"FINISH","reasoning":"answered"}"#,
        ]);
        let oracle = oracle(llm);
        let db = setup_db();

        let run = graph(&oracle, &db, 20)
            .run(AgentState::new(PATIENT, "Is Dr. Jane Smith available on 05-08-2024?"))
            .await
            .unwrap();

        assert_eq!(run.stop, StopReason::Finished);
        assert_eq!(run.steps, 3);
        let last = run.state.messages.last().unwrap();
        assert_eq!(last.name.as_deref(), Some("information_node"));
        assert_eq!(last.content, "Dr. Jane Smith is available at 08:00.");

        let systems = systems.lock().unwrap();
        assert!(systems[1].contains("check_availability_by_doctor"));
        assert!(!systems[1].contains("set_appointment"));
    }

    #[tokio::test]
    async fn test_worker_cannot_use_other_workers_tools() {
        let (llm, _) = ScriptedLlm::new(&[
            r#"{"next":"information_node","reasoning":"x"}"#,
            r#"{"tool":"set_appointment","arguments":{"desired_date":"05-08-2024 08:00","doctor_name":"jane smith"}}"#,
            "I can only look up availability.",
            r#"{"next":"FINISH","reasoning":"done"}"#,
        ]);
        let oracle = oracle(llm);
        let db = setup_db();

        graph(&oracle, &db, 20)
            .run(AgentState::new(PATIENT, "book jane smith"))
            .await
            .unwrap();

        let conn = db.lock().unwrap();
        let at = NaiveDateTime::parse_from_str("2024-08-05 08:00", "%Y-%m-%d %H:%M").unwrap();
        assert!(queries::is_slot_available(&conn, &at, Doctor::JaneSmith).unwrap());
    }

    #[tokio::test]
    async fn test_step_ceiling_beats_indecisive_oracle() {
        let oracle = oracle(IndecisiveLlm);
        let db = setup_db();

        let run = graph(&oracle, &db, 20)
            .run(AgentState::new(PATIENT, "hello"))
            .await
            .unwrap();

        assert_eq!(run.stop, StopReason::StepLimit);
        assert_eq!(run.steps, 20);
        // query + id note + one reply per worker visit (10 of the 20 steps)
        assert_eq!(run.state.messages.len(), 2 + 10);
    }

    #[tokio::test]
    async fn test_zero_ceiling_never_calls_oracle() {
        let (llm, systems) = ScriptedLlm::new(&[]);
        let oracle = oracle(llm);
        let db = setup_db();

        let run = graph(&oracle, &db, 0)
            .run(AgentState::new(PATIENT, "hello"))
            .await
            .unwrap();
        assert_eq!(run.stop, StopReason::StepLimit);
        assert!(systems.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_routing_fails_request() {
        let (llm, _) = ScriptedLlm::new(&["not json", "still not json"]);
        let oracle = oracle(llm);
        let db = setup_db();

        let err = graph(&oracle, &db, 20)
            .run(AgentState::new(PATIENT, "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Oracle(_)));
    }

    #[tokio::test]
    async fn test_tool_call_limit_ends_worker() {
        let call = r#"{"tool":"check_availability_by_doctor","arguments":{"desired_date":"05-08-2024","doctor_name":"jane smith"}}"#;
        let (llm, _) = ScriptedLlm::new(&[
            r#"{"next":"information_node","reasoning":"x"}"#,
            call,
            call,
            call,
            r#"{"next":"FINISH","reasoning":"done"}"#,
        ]);
        let oracle = oracle(llm);
        let db = setup_db();
        let mut g = graph(&oracle, &db, 20);
        g.limits.max_tool_calls = 2;

        let run = g.run(AgentState::new(PATIENT, "jane smith?")).await.unwrap();
        assert_eq!(run.stop, StopReason::Finished);
        assert_eq!(
            run.state.messages.last().unwrap().content,
            "Doctor availability for 05-08-2024\nAvailable slots: 08:00"
        );
    }
}
