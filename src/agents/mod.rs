//! Agents - model-backed planner and reasoner, plus the reporter.

mod planner;
mod reasoner;
mod reporter;

pub use planner::*;
pub use reasoner::*;
pub use reporter::*;
