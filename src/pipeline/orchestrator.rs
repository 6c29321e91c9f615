//! Fact-check agent: Perceive → Reason → Act.
//!
//! Pipeline flow:
//! Claim → Planner → Executor → Perception → Reasoner → Reporter → AgentResult
//!
//! A Perceive failure aborts the run. The reasoner only fails for a missing
//! credential; the reporter never fails. Both terminal shapes carry the claim,
//! timestamp and elapsed time.

use super::events::{AgentEvent, Component, EventSink, Phase, TracingSink};
use super::executor::Executor;
use super::perception::build_perception;
use crate::agents::{PlanOutcome, Planner, Reasoner, Reporter};
use crate::client::{ChatModel, SearchProvider};
use crate::models::{
    ActionRecord, ActionStatus, AgentResult, ClaimCheckError, CompletedRun, Config, FailedRun,
    Perception, Phases, Reasoning, Result, RunSummary,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

pub struct FactCheckAgent {
    planner: Planner,
    executor: Executor,
    reasoner: Reasoner,
    reporter: Reporter,
    events: Arc<dyn EventSink>,
}

/// Builder for `FactCheckAgent`.
pub struct FactCheckAgentBuilder {
    model: Arc<dyn ChatModel>,
    search: Arc<dyn SearchProvider>,
    events: Arc<dyn EventSink>,
    reporter: Reporter,
    max_sub_queries: usize,
    planner_temperature: f64,
    reasoner_temperature: f64,
}

impl FactCheckAgentBuilder {
    /// Apply agent and sampling settings from configuration.
    pub fn config(mut self, config: &Config) -> Self {
        self.max_sub_queries = config.agent.max_sub_queries;
        self.planner_temperature = config.llm.planner_temperature;
        self.reasoner_temperature = config.llm.reasoner_temperature;
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn build(self) -> FactCheckAgent {
        FactCheckAgent {
            planner: Planner::new(
                Arc::clone(&self.model),
                self.max_sub_queries,
                self.planner_temperature,
            ),
            executor: Executor::new(self.search, Arc::clone(&self.events)),
            reasoner: Reasoner::new(self.model, self.reasoner_temperature),
            reporter: self.reporter,
            events: self.events,
        }
    }
}

impl FactCheckAgent {
    /// Start building an agent over the given collaborators.
    ///
    /// Defaults: tracing events, report to stdout, settings from `Config::default()`.
    pub fn builder(
        model: Arc<dyn ChatModel>,
        search: Arc<dyn SearchProvider>,
    ) -> FactCheckAgentBuilder {
        FactCheckAgentBuilder {
            model,
            search,
            events: Arc::new(TracingSink),
            reporter: Reporter::stdout(),
            max_sub_queries: 3,
            planner_temperature: 0.3,
            reasoner_temperature: 0.2,
        }
        .config(&Config::default())
    }

    /// Run one full check of `claim`. Never fails; errors become `AgentResult::Failed`.
    pub async fn check(&self, claim: &str) -> AgentResult {
        let run_id = Uuid::new_v4();
        let timestamp = Utc::now();
        let start = Instant::now();

        info!(%run_id, claim = %claim, "Starting fact check");

        let elapsed_ms = |start: Instant| start.elapsed().as_millis() as u64;
        let fail = |error: ClaimCheckError| {
            AgentResult::Failed(FailedRun {
                run_id,
                claim: claim.to_string(),
                execution_time_ms: elapsed_ms(start),
                timestamp,
                error: error.to_string(),
            })
        };

        let perception = match self.perceive(claim).await {
            Ok(p) => p,
            Err(e) => return fail(e),
        };

        let reasoning = match self.reason(claim, &perception).await {
            Ok(r) => r,
            Err(e) => return fail(e),
        };

        let action = self.act(claim, &perception, &reasoning);

        let summary = RunSummary {
            verdict: reasoning.verdict,
            confidence: reasoning.confidence,
            sources_analyzed: reasoning.sources_analyzed,
            strategy: perception.strategy,
        };

        let execution_time_ms = elapsed_ms(start);
        info!(
            %run_id,
            verdict = %summary.verdict,
            confidence = summary.confidence,
            execution_time_ms,
            "Fact check completed"
        );

        AgentResult::Completed(CompletedRun {
            run_id,
            claim: claim.to_string(),
            execution_time_ms,
            timestamp,
            phases: Phases {
                perception,
                reasoning,
                action,
            },
            summary,
        })
    }

    async fn perceive(&self, claim: &str) -> Result<Perception> {
        let phase = Phase::Perceive;
        let start = Instant::now();
        self.events.emit(AgentEvent::PhaseStarted { phase });

        let result: Result<Perception> = async {
            if claim.trim().is_empty() {
                return Err(ClaimCheckError::InvalidInput(
                    "claim must not be empty".to_string(),
                ));
            }

            let PlanOutcome { plan, skipped } = self.planner.plan(claim).await;
            if let Some(e) = skipped {
                self.events.emit(AgentEvent::FallbackTriggered {
                    component: Component::Planner,
                    reason: e.to_string(),
                });
            }

            let execution = self.executor.execute(claim, &plan).await?;
            self.events.emit(AgentEvent::StrategyChosen {
                strategy: execution.strategy(),
                sub_query_count: execution.sub_queries().map_or(0, <[String]>::len),
            });

            Ok(build_perception(claim, execution))
        }
        .await;

        self.finish_phase(phase, start, &result);
        result
    }

    async fn reason(&self, claim: &str, perception: &Perception) -> Result<Reasoning> {
        let phase = Phase::Reason;
        let start = Instant::now();
        self.events.emit(AgentEvent::PhaseStarted { phase });

        let result = self.reasoner.reason(claim, perception).await;
        if let Ok(reasoning) = &result {
            if reasoning.is_fallback() {
                self.events.emit(AgentEvent::FallbackTriggered {
                    component: Component::Reasoner,
                    reason: reasoning.explanation.clone(),
                });
            }
        }

        self.finish_phase(phase, start, &result);
        result
    }

    fn act(&self, claim: &str, perception: &Perception, reasoning: &Reasoning) -> ActionRecord {
        let phase = Phase::Act;
        let start = Instant::now();
        self.events.emit(AgentEvent::PhaseStarted { phase });

        let action = self.reporter.act(claim, perception, reasoning);
        if action.status == ActionStatus::Failed {
            self.events.emit(AgentEvent::FallbackTriggered {
                component: Component::Reporter,
                reason: action.error.clone().unwrap_or_default(),
            });
        }

        self.events.emit(AgentEvent::PhaseCompleted {
            phase,
            elapsed_ms: start.elapsed().as_millis() as u64,
        });
        action
    }

    fn finish_phase<T>(&self, phase: Phase, start: Instant, result: &Result<T>) {
        let event = match result {
            Ok(_) => AgentEvent::PhaseCompleted {
                phase,
                elapsed_ms: start.elapsed().as_millis() as u64,
            },
            Err(e) => AgentEvent::PhaseFailed {
                phase,
                error: e.to_string(),
            },
        };
        self.events.emit(event);
    }
}
