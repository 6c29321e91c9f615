//! Perception builder: executor output → cleaned evidence snapshot.

use crate::models::{
    ExecutionResult, KnowledgeFact, KnowledgePanel, OrganicResult, PaaAnswer, Perception,
    PerceptionMetadata, RelatedQuestion, SearchResultBundle,
};
use chrono::Utc;

fn clean_organic(item: &OrganicResult) -> OrganicResult {
    OrganicResult {
        title: item.title.clone(),
        description: item.description.clone(),
        link: item.link.clone(),
        display_link: item.display_link.clone(),
        provenance: None,
    }
}

fn clean_knowledge(panel: &KnowledgePanel) -> KnowledgePanel {
    KnowledgePanel {
        description: panel.description.clone(),
        facts: panel
            .facts
            .iter()
            .map(|f| KnowledgeFact {
                key: f.key.clone(),
                value: f.value.clone(),
            })
            .collect(),
    }
}

fn clean_question(q: &RelatedQuestion) -> RelatedQuestion {
    RelatedQuestion {
        question: q.question.clone(),
        answers: q
            .answers
            .iter()
            .map(|a| PaaAnswer {
                text: a.text.clone(),
            })
            .collect(),
    }
}

/// Project a bundle down to the fields reasoning consumes.
pub fn clean_bundle(bundle: &SearchResultBundle) -> SearchResultBundle {
    SearchResultBundle {
        organic: bundle.organic.iter().map(clean_organic).collect(),
        knowledge: bundle.knowledge.as_ref().map(clean_knowledge),
        people_also_ask: bundle.people_also_ask.iter().map(clean_question).collect(),
    }
}

/// Build the perception for `claim` from the executor's result.
///
/// Pure: no network or model calls. `raw` keeps the untrimmed result.
pub fn build_perception(claim: &str, execution: ExecutionResult) -> Perception {
    let strategy = execution.strategy();
    let evidence = clean_bundle(execution.evidence());
    let sub_queries = execution.sub_queries().map(<[String]>::to_vec);

    let metadata = PerceptionMetadata {
        organic_results_count: evidence.organic.len(),
        has_knowledge: evidence.knowledge.is_some(),
        paa_count: evidence.people_also_ask.len(),
        used_decomposition: sub_queries.is_some(),
    };

    Perception {
        timestamp: Utc::now(),
        claim: claim.to_string(),
        strategy,
        sub_queries,
        evidence,
        raw: execution,
        metadata,
    }
}
