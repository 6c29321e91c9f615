//! Search executor: one search, or a concurrent fan-out over sub-queries.
//!
//! Pipeline flow:
//! Plan → (single search | fan-out → fan-in → merge) → ExecutionResult
//!
//! A failed fan-out falls back once to a single search over the original claim;
//! a failure of that fallback propagates.

use super::events::{AgentEvent, Component, EventSink};
use super::merge::merge_bundles;
use crate::client::SearchProvider;
use crate::models::{DecompositionPlan, ExecutionResult, SearchError, SearchResultBundle};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub struct Executor {
    search: Arc<dyn SearchProvider>,
    events: Arc<dyn EventSink>,
}

impl Executor {
    pub fn new(search: Arc<dyn SearchProvider>, events: Arc<dyn EventSink>) -> Self {
        Self { search, events }
    }

    /// Gather evidence for `claim` according to `plan`.
    pub async fn execute(
        &self,
        claim: &str,
        plan: &DecompositionPlan,
    ) -> Result<ExecutionResult, SearchError> {
        if !plan.needs_breakdown || plan.sub_queries.is_empty() {
            return self.single(claim).await;
        }

        match self.fan_out(&plan.sub_queries).await {
            Ok(per_query) => {
                let merged = merge_bundles(&per_query);
                debug!(
                    sub_queries = per_query.len(),
                    merged_organic = merged.organic.len(),
                    "Merged decomposed search results"
                );
                Ok(ExecutionResult::Decomposed {
                    sub_queries: plan.sub_queries.clone(),
                    reasoning: plan.reasoning.clone(),
                    merged,
                    per_query,
                })
            }
            Err(e) => {
                self.events.emit(AgentEvent::FallbackTriggered {
                    component: Component::Executor,
                    reason: e.to_string(),
                });
                self.single(claim).await
            }
        }
    }

    async fn single(&self, claim: &str) -> Result<ExecutionResult, SearchError> {
        self.events.emit(AgentEvent::SearchIssued {
            query: claim.to_string(),
            query_index: 0,
        });
        let bundle = self.search.search(claim).await?;
        Ok(ExecutionResult::Single { bundle })
    }

    /// Run every query concurrently and return bundles in query order.
    ///
    /// All tasks are drained before any failure is reported; completion order
    /// never affects the returned order.
    async fn fan_out(&self, queries: &[String]) -> Result<Vec<SearchResultBundle>, SearchError> {
        let mut tasks = JoinSet::new();

        for (index, query) in queries.iter().enumerate() {
            self.events.emit(AgentEvent::SearchIssued {
                query: query.clone(),
                query_index: index,
            });
            let search = Arc::clone(&self.search);
            let query = query.clone();
            tasks.spawn(async move { (index, search.search(&query).await) });
        }

        let mut slots: Vec<Option<SearchResultBundle>> = vec![None; queries.len()];
        let mut first_error: Option<SearchError> = None;

        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((index, Ok(bundle))) => {
                    slots[index] = Some(bundle);
                    continue;
                }
                Ok((index, Err(e))) => {
                    warn!(query_index = index, error = %e, "Sub-query search failed");
                    e
                }
                Err(e) => SearchError::FanOut(format!("search task aborted: {e}")),
            };
            if first_error.is_none() {
                first_error = Some(failure);
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| SearchError::FanOut(format!("sub-query {index} has no result")))
            })
            .collect()
    }
}
