pub mod conversation;
pub mod slot;
pub mod validation;

pub use conversation::{AgentState, ConversationMessage, Route, RoutingDecision};
pub use slot::{Doctor, Slot, Specialization, STORE_DATETIME_FORMAT};
pub use validation::{AppointmentDate, AppointmentDateTime, PatientId, ValidationError};
