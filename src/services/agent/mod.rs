pub mod graph;
pub mod prompts;
pub mod tools;
pub mod workers;

pub use graph::{AgentGraph, GraphError, GraphLimits, GraphRun, Node, StopReason};
pub use tools::ToolContext;
