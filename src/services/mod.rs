pub mod agent;
pub mod ai;
pub mod availability;
pub mod booking;
pub mod recommend;
