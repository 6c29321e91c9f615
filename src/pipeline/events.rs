//! Structured run events.
//!
//! Components report what happened through an injected `EventSink` instead of
//! free-form log text, so tests can assert on the events themselves.

use crate::models::Strategy;
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Perceive,
    Reason,
    Act,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Perceive => write!(f, "perceive"),
            Phase::Reason => write!(f, "reason"),
            Phase::Act => write!(f, "act"),
        }
    }
}

/// Component that degraded to its fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Planner,
    Executor,
    Reasoner,
    Reporter,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Planner => write!(f, "planner"),
            Component::Executor => write!(f, "executor"),
            Component::Reasoner => write!(f, "reasoner"),
            Component::Reporter => write!(f, "reporter"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    PhaseStarted {
        phase: Phase,
    },
    PhaseCompleted {
        phase: Phase,
        elapsed_ms: u64,
    },
    PhaseFailed {
        phase: Phase,
        error: String,
    },
    StrategyChosen {
        strategy: Strategy,
        sub_query_count: usize,
    },
    SearchIssued {
        query: String,
        query_index: usize,
    },
    FallbackTriggered {
        component: Component,
        reason: String,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: AgentEvent);
}

/// Default sink: one tracing line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: AgentEvent) {
        match event {
            AgentEvent::PhaseStarted { phase } => info!(%phase, "Phase started"),
            AgentEvent::PhaseCompleted { phase, elapsed_ms } => {
                info!(%phase, elapsed_ms, "Phase completed")
            }
            AgentEvent::PhaseFailed { phase, error } => warn!(%phase, %error, "Phase failed"),
            AgentEvent::StrategyChosen {
                strategy,
                sub_query_count,
            } => info!(%strategy, sub_query_count, "Strategy chosen"),
            AgentEvent::SearchIssued { query, query_index } => {
                info!(query_index, query = %query, "Search issued")
            }
            AgentEvent::FallbackTriggered { component, reason } => {
                warn!(%component, %reason, "Fallback triggered")
            }
        }
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AgentEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AgentEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn fallbacks(&self) -> Vec<Component> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AgentEvent::FallbackTriggered { component, .. } => Some(component),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: AgentEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.emit(AgentEvent::PhaseStarted {
            phase: Phase::Perceive,
        });
        sink.emit(AgentEvent::FallbackTriggered {
            component: Component::Executor,
            reason: "boom".into(),
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            AgentEvent::PhaseStarted {
                phase: Phase::Perceive
            }
        );
        assert_eq!(sink.fallbacks(), vec![Component::Executor]);
    }

    #[test]
    fn test_event_serialization() {
        let event = AgentEvent::StrategyChosen {
            strategy: Strategy::Decomposed,
            sub_query_count: 2,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "strategy_chosen");
        assert_eq!(value["strategy"], "decomposed");
    }
}
