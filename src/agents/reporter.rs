//! Reporter: renders the verdict as a human-readable report.
//!
//! Reporting can never change a verdict or abort a run; write failures come
//! back as a failed `ActionRecord`.

use crate::models::{ActionRecord, ActionStatus, Perception, Reasoning};
use chrono::Utc;
use std::fmt::Write as _;
use std::io::Write;
use std::sync::Mutex;
use tracing::warn;

/// Number of sources listed in the report.
const TOP_SOURCES: usize = 5;

pub struct Reporter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl Reporter {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Reporter that discards its output.
    pub fn silent() -> Self {
        Self::new(std::io::sink())
    }

    /// Render the report for a finished reasoning phase.
    pub fn render(
        claim: &str,
        perception: &Perception,
        reasoning: &Reasoning,
    ) -> Result<String, std::fmt::Error> {
        let mut report = String::new();
        writeln!(report, "=== Fact Check Report ===")?;
        writeln!(report, "Claim:       {claim}")?;
        writeln!(report, "Verdict:     {}", reasoning.verdict)?;
        writeln!(report, "Confidence:  {:.0}%", reasoning.confidence)?;
        writeln!(report, "Strategy:    {}", perception.strategy)?;
        if let Some(queries) = &perception.sub_queries {
            for (i, query) in queries.iter().enumerate() {
                writeln!(report, "  [{}] {query}", i + 1)?;
            }
        }
        writeln!(report, "Sources:     {}", reasoning.sources_analyzed)?;
        writeln!(report, "Model:       {}", reasoning.model_id)?;
        writeln!(report)?;
        writeln!(report, "Explanation:")?;
        writeln!(report, "{}", reasoning.explanation)?;

        if !perception.evidence.organic.is_empty() {
            writeln!(report)?;
            writeln!(report, "Top sources:")?;
            for item in perception.evidence.organic.iter().take(TOP_SOURCES) {
                writeln!(report, "  - {} ({})", item.title, item.link)?;
            }
        }

        Ok(report)
    }

    /// Emit the report. Never fails; failures are recorded in the returned record.
    pub fn act(&self, claim: &str, perception: &Perception, reasoning: &Reasoning) -> ActionRecord {
        let report = match Self::render(claim, perception, reasoning) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Failed to render report");
                return ActionRecord::failed(claim, format!("rendering report: {e}"));
            }
        };

        let written = match self.out.lock() {
            Ok(mut out) => out
                .write_all(report.as_bytes())
                .and_then(|()| out.flush())
                .map_err(|e| e.to_string()),
            Err(_) => Err("report writer lock poisoned".to_string()),
        };

        match written {
            Ok(()) => ActionRecord {
                timestamp: Utc::now(),
                claim: claim.to_string(),
                actions_taken: vec!["rendered_report".to_string(), "emitted_report".to_string()],
                status: ActionStatus::Success,
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "Failed to emit report");
                ActionRecord::failed(claim, format!("emitting report: {e}"))
            }
        }
    }
}
