//! Decomposition planner.
//!
//! Epistemic foundation:
//! - K_i: The model decides whether a claim splits and into which sub-queries
//! - B_i: The model call succeeds and matches the schema (might fail)
//! - I^B: Any failure degrades to a single search; planning never blocks a run

use crate::client::{ChatModel, OutputSchema, StructuredRequest, parse_structured};
use crate::models::{ClaimCheckError, DecompositionPlan, Result};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Planning result: the plan, plus the error that forced a single search.
#[derive(Debug)]
pub struct PlanOutcome {
    pub plan: DecompositionPlan,
    /// Set only when planning failed and the plan is the single-search fallback
    pub skipped: Option<ClaimCheckError>,
}

const PLANNER_SYSTEM_PROMPT: &str = "You plan web searches for a fact-checking agent. \
Decide whether the claim contains multiple independently verifiable assertions. \
Only if it does, break it into 2 to {max} focused search queries, each targeting one distinct aspect. \
If the claim is a single assertion, do not break it down and return an empty sub_queries list. \
Explain your decision briefly in `reasoning`.";

/// Raw planner reply as the schema describes it.
#[derive(Debug, Deserialize)]
struct PlannerReply {
    needs_breakdown: bool,
    sub_queries: Vec<String>,
    reasoning: String,
}

pub struct Planner {
    model: Arc<dyn ChatModel>,
    max_sub_queries: usize,
    temperature: f64,
}

impl Planner {
    pub fn new(model: Arc<dyn ChatModel>, max_sub_queries: usize, temperature: f64) -> Self {
        Self {
            model,
            max_sub_queries,
            temperature,
        }
    }

    fn schema(&self) -> OutputSchema {
        OutputSchema {
            name: "decomposition_plan",
            schema: json!({
                "type": "object",
                "properties": {
                    "needs_breakdown": {"type": "boolean"},
                    "sub_queries": {
                        "type": "array",
                        "items": {"type": "string"},
                        "maxItems": self.max_sub_queries
                    },
                    "reasoning": {"type": "string"}
                },
                "required": ["needs_breakdown", "sub_queries", "reasoning"],
                "additionalProperties": false
            }),
        }
    }

    /// Decide how to search for `claim`. Never fails.
    pub async fn plan(&self, claim: &str) -> PlanOutcome {
        match self.try_plan(claim).await {
            Ok(plan) => {
                debug!(
                    needs_breakdown = plan.needs_breakdown,
                    sub_queries = plan.sub_queries.len(),
                    "Decomposition planned"
                );
                PlanOutcome {
                    plan,
                    skipped: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Decomposition planning failed, using single search");
                PlanOutcome {
                    plan: DecompositionPlan::single(format!("Decomposition skipped: {e}")),
                    skipped: Some(e),
                }
            }
        }
    }

    async fn try_plan(&self, claim: &str) -> Result<DecompositionPlan> {
        let request = StructuredRequest {
            system_prompt: PLANNER_SYSTEM_PROMPT.replace("{max}", &self.max_sub_queries.to_string()),
            user_prompt: format!("Claim: \"{claim}\""),
            schema: self.schema(),
            temperature: Some(self.temperature),
        };

        let response = self.model.complete_structured(request).await?;
        let reply: PlannerReply = parse_structured(&response.content)?;
        self.validate(reply)
    }

    /// Enforce the 2..=max sub-query range.
    ///
    /// Extra sub-queries are dropped from the tail; a lone sub-query is no
    /// decomposition at all and becomes a single search over the claim.
    fn validate(&self, reply: PlannerReply) -> Result<DecompositionPlan> {
        if !reply.needs_breakdown {
            return Ok(DecompositionPlan::single(reply.reasoning));
        }

        let mut sub_queries: Vec<String> = reply
            .sub_queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();

        if sub_queries.is_empty() {
            return Err(ClaimCheckError::SchemaViolation(
                "needs_breakdown is true but no sub-queries were given".to_string(),
            ));
        }

        if sub_queries.len() == 1 {
            debug!("Only one sub-query returned, searching the claim directly");
            return Ok(DecompositionPlan::single(reply.reasoning));
        }

        if sub_queries.len() > self.max_sub_queries {
            warn!(
                returned = sub_queries.len(),
                max = self.max_sub_queries,
                "Too many sub-queries, keeping the first ones"
            );
            sub_queries.truncate(self.max_sub_queries);
        }

        Ok(DecompositionPlan::decomposed(sub_queries, reply.reasoning))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Scripted, ScriptedModel};

    fn planner(model: Arc<ScriptedModel>) -> Planner {
        Planner::new(model, 3, 0.3)
    }

    #[tokio::test]
    async fn test_decomposition_returned() {
        let model = Arc::new(ScriptedModel::replying(
            r#"{"needs_breakdown": true, "sub_queries": ["vaccines autism link", "childhood vaccine safety"], "reasoning": "two assertions"}"#,
        ));
        let outcome = planner(Arc::clone(&model))
            .plan("Vaccines cause autism and are unsafe for children")
            .await;
        assert!(outcome.skipped.is_none());
        let plan = outcome.plan;

        assert!(plan.needs_breakdown);
        assert_eq!(plan.sub_queries.len(), 2);
        assert_eq!(plan.reasoning, "two assertions");

        let request = model.last_request().unwrap();
        assert!(request.user_prompt.contains("Vaccines cause autism"));
        assert!(request.system_prompt.contains("2 to 3"));
        assert_eq!(request.schema.schema["properties"]["sub_queries"]["maxItems"], 3);
    }

    #[tokio::test]
    async fn test_no_breakdown_clears_sub_queries() {
        let model = Arc::new(ScriptedModel::replying(
            r#"{"needs_breakdown": false, "sub_queries": ["stray"], "reasoning": "single fact"}"#,
        ));
        let plan = planner(model).plan("The Eiffel Tower is in Paris").await.plan;

        assert!(!plan.needs_breakdown);
        assert!(plan.sub_queries.is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_degrades_to_single() {
        let model = Arc::new(ScriptedModel::new(vec![Scripted::Fail("network down".into())]));
        let outcome = planner(model).plan("claim").await;
        assert!(matches!(outcome.skipped, Some(ClaimCheckError::ParseError(_))));
        let plan = outcome.plan;

        assert!(!plan.needs_breakdown);
        assert!(plan.sub_queries.is_empty());
        assert!(!plan.reasoning.is_empty());
        assert!(plan.reasoning.contains("network down"));
    }

    #[tokio::test]
    async fn test_missing_credential_is_soft_skip() {
        let model = Arc::new(ScriptedModel::new(vec![Scripted::MissingKey]));
        let outcome = planner(model).plan("claim").await;
        assert!(outcome.skipped.is_some_and(|e| e.is_missing_credential()));
        let plan = outcome.plan;

        assert!(!plan.needs_breakdown);
        assert!(plan.reasoning.contains("Missing credential"));
    }

    #[tokio::test]
    async fn test_schema_violations_degrade() {
        for reply in [
            r#"{"needs_breakdown": "yes", "sub_queries": [], "reasoning": "x"}"#,
            r#"{"needs_breakdown": true, "sub_queries": [], "reasoning": "x"}"#,
            r#"{"needs_breakdown": true, "sub_queries": ["  "], "reasoning": "x"}"#,
            "I think this should be split.",
        ] {
            let model = Arc::new(ScriptedModel::replying(reply));
            let outcome = planner(model).plan("claim").await;
            assert!(outcome.skipped.is_some(), "reply should degrade: {reply}");
            assert!(!outcome.plan.needs_breakdown);
            assert!(outcome.plan.sub_queries.is_empty());
        }
    }

    #[tokio::test]
    async fn test_excess_sub_queries_truncated() {
        let model = Arc::new(ScriptedModel::replying(
            r#"{"needs_breakdown": true, "sub_queries": ["a", "b", "c", "d", "e", "f"], "reasoning": "many"}"#,
        ));
        let outcome = planner(model).plan("claim").await;

        assert!(outcome.skipped.is_none());
        assert!(outcome.plan.needs_breakdown);
        assert_eq!(outcome.plan.sub_queries, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_lone_sub_query_becomes_single_search() {
        let model = Arc::new(ScriptedModel::replying(
            r#"{"needs_breakdown": true, "sub_queries": ["eiffel tower location"], "reasoning": "one aspect"}"#,
        ));
        let outcome = planner(model).plan("The Eiffel Tower is in Paris").await;

        assert!(outcome.skipped.is_none());
        assert!(!outcome.plan.needs_breakdown);
        assert!(outcome.plan.sub_queries.is_empty());
        assert_eq!(outcome.plan.reasoning, "one aspect");
    }
}
