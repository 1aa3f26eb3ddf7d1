//! State management with actor pattern
//!
//! StateManager owns the NoteStore and processes messages via channels,
//! providing serialized access to persistent state.

mod manager;
mod messages;

pub use manager::{PipelineStats, StateManager};
pub use messages::{StateCommand, StateError, StateResponse};
