//! claimcheck - Claim verification via plan-and-execute web search and LLM reasoning.
//!
//! ## Architecture
//!
//! A run moves through three phases:
//! - **Perceive**: Planner decides whether to split the claim, Executor runs one
//!   search or a concurrent fan-out, results are merged into an evidence snapshot
//! - **Reason**: Reasoner judges the claim against that evidence only
//! - **Act**: Reporter renders the verdict
//!
//! Every run ends in an `AgentResult`, either completed or failed.
//!
//! ## Epistemic Design
//!
//! - K_i (Knowledge): Compile-time enforced invariants (verdict labels, tagged unions)
//! - B_i (Beliefs): Runtime fallible operations (Result, Option)
//! - I^R (Resolvable): User-configurable parameters
//! - I^B (Bounded): Network/API uncertainties (fallbacks, retry, backoff)

pub mod agents;
pub mod client;
pub mod models;
pub mod pipeline;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use agents::{Planner, Reasoner, Reporter};
pub use client::{ChatModel, LlmClient, SearchProvider, SerpClient};
pub use models::{AgentResult, ClaimCheckError, Config, Result, Verdict};
pub use pipeline::{AgentEvent, EventSink, FactCheckAgent, RecordingSink, TracingSink};
