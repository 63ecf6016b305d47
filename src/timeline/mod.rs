//! Timeline state and its orchestrator.

mod controller;
mod store;

pub use controller::{ControllerStatus, LoadOutcome, TimelineController};
pub use store::TimelineStore;
