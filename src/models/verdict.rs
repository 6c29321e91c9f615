//! Planning, verdict and run-result types.
//!
//! K_i: A verdict is one of exactly six labels. A run ends in exactly one of
//! two shapes: completed or failed.

use super::{Perception, Strategy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Planner decision on whether to split a claim.
///
/// Invariant: `needs_breakdown` implies a non-empty `sub_queries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompositionPlan {
    pub needs_breakdown: bool,
    pub sub_queries: Vec<String>,
    pub reasoning: String,
}

impl DecompositionPlan {
    /// Search the claim as-is.
    pub fn single(reasoning: impl Into<String>) -> Self {
        Self {
            needs_breakdown: false,
            sub_queries: Vec::new(),
            reasoning: reasoning.into(),
        }
    }

    /// Split the claim into the given sub-queries.
    ///
    /// An empty list degrades to a single-search plan to keep the invariant.
    pub fn decomposed(sub_queries: Vec<String>, reasoning: impl Into<String>) -> Self {
        if sub_queries.is_empty() {
            return Self::single(reasoning);
        }
        Self {
            needs_breakdown: true,
            sub_queries,
            reasoning: reasoning.into(),
        }
    }
}

/// Truth assessment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "True")]
    True,
    #[serde(rename = "Likely True")]
    LikelyTrue,
    #[serde(rename = "Misleading")]
    Misleading,
    #[serde(rename = "False")]
    False,
    #[serde(rename = "Likely False")]
    LikelyFalse,
    #[serde(rename = "Unverifiable")]
    Unverifiable,
}

impl Verdict {
    pub const ALL: [Verdict; 6] = [
        Verdict::True,
        Verdict::LikelyTrue,
        Verdict::Misleading,
        Verdict::False,
        Verdict::LikelyFalse,
        Verdict::Unverifiable,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::True => "True",
            Verdict::LikelyTrue => "Likely True",
            Verdict::Misleading => "Misleading",
            Verdict::False => "False",
            Verdict::LikelyFalse => "Likely False",
            Verdict::Unverifiable => "Unverifiable",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Model ID recorded when the reasoner fell back to its safe default.
pub const FALLBACK_MODEL_ID: &str = "error-fallback";

/// Output of the reasoning phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reasoning {
    pub timestamp: DateTime<Utc>,
    pub claim: String,
    pub verdict: Verdict,
    pub explanation: String,

    /// Always within [0, 100]
    pub confidence: f64,

    pub sources_analyzed: usize,
    pub model_id: String,
}

impl Reasoning {
    /// Safe default after a failed model call.
    pub fn fallback(claim: &str, sources_analyzed: usize, cause: impl fmt::Display) -> Self {
        Self {
            timestamp: Utc::now(),
            claim: claim.to_string(),
            verdict: Verdict::Unverifiable,
            explanation: format!("Reasoning failed: {cause}"),
            confidence: 0.0,
            sources_analyzed,
            model_id: FALLBACK_MODEL_ID.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.model_id == FALLBACK_MODEL_ID
    }
}

/// Clamp a model-reported confidence into [0, 100].
///
/// Returns `None` for non-finite values, which no schema should let through.
pub fn clamp_confidence(raw: f64) -> Option<f64> {
    raw.is_finite().then(|| raw.clamp(0.0, 100.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Failed,
}

/// Record of what the act phase did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub timestamp: DateTime<Utc>,
    pub claim: String,
    pub actions_taken: Vec<String>,
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionRecord {
    pub fn failed(claim: &str, error: impl fmt::Display) -> Self {
        Self {
            timestamp: Utc::now(),
            claim: claim.to_string(),
            actions_taken: Vec::new(),
            status: ActionStatus::Failed,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phases {
    pub perception: Perception,
    pub reasoning: Reasoning,
    pub action: ActionRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub verdict: Verdict,
    pub confidence: f64,
    pub sources_analyzed: usize,
    pub strategy: Strategy,
}

/// A run that produced a verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedRun {
    pub run_id: Uuid,
    pub claim: String,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub phases: Phases,
    pub summary: RunSummary,
}

/// A run aborted before a verdict could be produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRun {
    pub run_id: Uuid,
    pub claim: String,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub error: String,
}

/// Terminal result of one agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AgentResult {
    Completed(CompletedRun),
    Failed(FailedRun),
}

impl AgentResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AgentResult::Completed(_))
    }

    pub fn claim(&self) -> &str {
        match self {
            AgentResult::Completed(run) => &run.claim,
            AgentResult::Failed(run) => &run.claim,
        }
    }

    pub fn execution_time_ms(&self) -> u64 {
        match self {
            AgentResult::Completed(run) => run.execution_time_ms,
            AgentResult::Failed(run) => run.execution_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_labels_round_trip() {
        for verdict in Verdict::ALL {
            let json = serde_json::to_string(&verdict).unwrap();
            assert_eq!(json, format!("\"{}\"", verdict.label()));
        }
        let parsed: Verdict = serde_json::from_str("\"Likely False\"").unwrap();
        assert_eq!(parsed, Verdict::LikelyFalse);
        assert!(serde_json::from_str::<Verdict>("\"Mostly True\"").is_err());
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(55.5), Some(55.5));
        assert_eq!(clamp_confidence(140.0), Some(100.0));
        assert_eq!(clamp_confidence(-3.0), Some(0.0));
        assert_eq!(clamp_confidence(f64::NAN), None);
        assert_eq!(clamp_confidence(f64::INFINITY), None);
    }

    #[test]
    fn test_fallback_reasoning() {
        let r = Reasoning::fallback("claim", 4, "timeout");
        assert_eq!(r.verdict, Verdict::Unverifiable);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.model_id, FALLBACK_MODEL_ID);
        assert!(r.explanation.contains("timeout"));
        assert!(r.is_fallback());
    }

    #[test]
    fn test_decomposed_plan_keeps_invariant() {
        let plan = DecompositionPlan::decomposed(Vec::new(), "nothing to split");
        assert!(!plan.needs_breakdown);

        let plan = DecompositionPlan::decomposed(vec!["a".into(), "b".into()], "two parts");
        assert!(plan.needs_breakdown);
        assert_eq!(plan.sub_queries.len(), 2);
    }

    #[test]
    fn test_failed_result_shape() {
        let result = AgentResult::Failed(FailedRun {
            run_id: Uuid::new_v4(),
            claim: "c".into(),
            execution_time_ms: 12,
            timestamp: Utc::now(),
            error: "search down".into(),
        });
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "search down");
        assert!(value.get("phases").is_none());
        assert!(!result.is_success());
        assert_eq!(result.execution_time_ms(), 12);
    }
}
