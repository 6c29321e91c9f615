//! Pipeline module - Perceive → Reason → Act orchestration.

mod events;
mod executor;
mod merge;
mod orchestrator;
mod perception;

pub use events::*;
pub use executor::*;
pub use merge::*;
pub use orchestrator::*;
pub use perception::*;
