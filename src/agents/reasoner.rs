//! Verdict reasoner.
//!
//! Epistemic foundation:
//! - K_i: Verdict is one of six labels, confidence lies in [0, 100]
//! - B_i: The model call succeeds and matches the schema (might fail → fallback verdict)
//! - K_i violated if run without a credential: reasoning is mandatory, so that is fatal

use crate::client::{ChatModel, OutputSchema, StructuredRequest, parse_structured};
use crate::models::{
    ClaimCheckError, Perception, Reasoning, Result, Verdict, clamp_confidence,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

const REASONER_SYSTEM_PROMPT: &str = "You are a meticulous fact-checker. \
Judge the claim using ONLY the search evidence provided; do not rely on outside knowledge. \
Choose exactly one verdict: True, Likely True, Misleading, False, Likely False, Unverifiable. \
Use Unverifiable when the evidence is insufficient or contradictory. \
Give a confidence from 0 to 100 and an explanation that cites the evidence you relied on.";

#[derive(Debug, Deserialize)]
struct ReasonerReply {
    verdict: Verdict,
    explanation: String,
    confidence: f64,
}

pub struct Reasoner {
    model: Arc<dyn ChatModel>,
    temperature: f64,
}

impl Reasoner {
    pub fn new(model: Arc<dyn ChatModel>, temperature: f64) -> Self {
        Self { model, temperature }
    }

    fn schema() -> OutputSchema {
        let labels: Vec<&str> = Verdict::ALL.iter().map(Verdict::label).collect();
        OutputSchema {
            name: "claim_verdict",
            schema: json!({
                "type": "object",
                "properties": {
                    "verdict": {"type": "string", "enum": labels},
                    "explanation": {"type": "string"},
                    "confidence": {"type": "number", "minimum": 0, "maximum": 100}
                },
                "required": ["verdict", "explanation", "confidence"],
                "additionalProperties": false
            }),
        }
    }

    fn user_prompt(claim: &str, perception: &Perception) -> Result<String> {
        let evidence = serde_json::to_string_pretty(&perception.evidence)
            .map_err(|e| ClaimCheckError::Internal(format!("serializing evidence: {e}")))?;

        let strategy = match &perception.sub_queries {
            Some(queries) => format!(
                "The claim was searched as {} sub-queries: {}",
                queries.len(),
                queries.join(" | ")
            ),
            None => "The claim was searched directly.".to_string(),
        };

        Ok(format!(
            "Claim: \"{claim}\"\n\n{strategy}\n\nSearch evidence (JSON):\n{evidence}"
        ))
    }

    /// Judge `claim` against the perception's evidence.
    ///
    /// Only a missing credential is returned as an error; every other failure
    /// becomes an `Unverifiable` verdict with zero confidence.
    pub async fn reason(&self, claim: &str, perception: &Perception) -> Result<Reasoning> {
        let sources_analyzed = perception.metadata.organic_results_count;

        match self.try_reason(claim, perception).await {
            Ok(reasoning) => Ok(reasoning),
            Err(e) if e.is_missing_credential() => Err(e),
            Err(e) => {
                warn!(error = %e, "Reasoning failed, returning fallback verdict");
                Ok(Reasoning::fallback(claim, sources_analyzed, e))
            }
        }
    }

    async fn try_reason(&self, claim: &str, perception: &Perception) -> Result<Reasoning> {
        let request = StructuredRequest {
            system_prompt: REASONER_SYSTEM_PROMPT.to_string(),
            user_prompt: Self::user_prompt(claim, perception)?,
            schema: Self::schema(),
            temperature: Some(self.temperature),
        };

        let response = self.model.complete_structured(request).await?;
        let reply: ReasonerReply = parse_structured(&response.content)?;

        let confidence = clamp_confidence(reply.confidence).ok_or_else(|| {
            ClaimCheckError::SchemaViolation(format!(
                "confidence is not a finite number: {}",
                reply.confidence
            ))
        })?;

        debug!(
            verdict = %reply.verdict,
            confidence,
            model = %response.model,
            "Verdict reached"
        );

        Ok(Reasoning {
            timestamp: Utc::now(),
            claim: claim.to_string(),
            verdict: reply.verdict,
            explanation: reply.explanation,
            confidence,
            sources_analyzed: perception.metadata.organic_results_count,
            model_id: response.model,
        })
    }
}
