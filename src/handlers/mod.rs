pub mod availability;
pub mod chat;
pub mod execute;
pub mod health;
