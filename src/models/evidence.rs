//! Search evidence types.
//!
//! K_i: These types represent the evidence flowing from search through to reasoning.
//! Every value is built once per run and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which sub-query produced an organic result after a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// 0-based position of the source bundle in the merge input
    pub source_query_index: usize,

    /// `main-search` for a single bundle, else `sub-search-<n>` (1-based)
    pub source_label: String,
}

/// A standard (non-ad, non-panel) web search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Dedup identity key
    pub link: String,

    #[serde(default)]
    pub display_link: String,

    /// Set by the merger; absent on fresh search results and cleaned evidence
    #[serde(default, skip_serializing_if = "Option::is_none", flatten)]
    pub provenance: Option<Provenance>,
}

/// A single fact row in a knowledge panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeFact {
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub value: String,
}

/// Structured fact box associated with a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgePanel {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub facts: Vec<KnowledgeFact>,
}

/// An answer snippet under a related question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaaAnswer {
    #[serde(default)]
    pub text: String,
}

/// A "people also ask" related question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedQuestion {
    #[serde(default)]
    pub question: String,

    #[serde(default)]
    pub answers: Vec<PaaAnswer>,
}

/// Normalized result of one web search (or a merge of several).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultBundle {
    #[serde(default)]
    pub organic: Vec<OrganicResult>,

    #[serde(default)]
    pub knowledge: Option<KnowledgePanel>,

    #[serde(default)]
    pub people_also_ask: Vec<RelatedQuestion>,
}

/// Evidence-gathering strategy used for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One search over the claim itself
    Single,
    /// Concurrent searches over planner sub-queries, merged
    Decomposed,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Single => write!(f, "single"),
            Strategy::Decomposed => write!(f, "decomposed"),
        }
    }
}

/// Outcome of the executor: exactly one of the two shapes per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum ExecutionResult {
    Single {
        #[serde(flatten)]
        bundle: SearchResultBundle,
    },
    Decomposed {
        sub_queries: Vec<String>,
        reasoning: String,
        merged: SearchResultBundle,
        per_query: Vec<SearchResultBundle>,
    },
}

impl ExecutionResult {
    pub fn strategy(&self) -> Strategy {
        match self {
            ExecutionResult::Single { .. } => Strategy::Single,
            ExecutionResult::Decomposed { .. } => Strategy::Decomposed,
        }
    }

    /// The bundle handed to perception: the search itself, or the merged set.
    pub fn evidence(&self) -> &SearchResultBundle {
        match self {
            ExecutionResult::Single { bundle } => bundle,
            ExecutionResult::Decomposed { merged, .. } => merged,
        }
    }

    pub fn sub_queries(&self) -> Option<&[String]> {
        match self {
            ExecutionResult::Single { .. } => None,
            ExecutionResult::Decomposed { sub_queries, .. } => Some(sub_queries),
        }
    }
}

/// Counts derived from the cleaned evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerceptionMetadata {
    pub organic_results_count: usize,
    pub has_knowledge: bool,
    pub paa_count: usize,
    pub used_decomposition: bool,
}

/// Cleaned evidence snapshot handed to reasoning.
///
/// K_i: Built once by the perception builder, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perception {
    pub timestamp: DateTime<Utc>,
    pub claim: String,
    pub strategy: Strategy,
    pub sub_queries: Option<Vec<String>>,

    /// Evidence projected to the fields reasoning needs
    pub evidence: SearchResultBundle,

    /// Untrimmed executor output, kept for audit
    pub raw: ExecutionResult,

    pub metadata: PerceptionMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bundle_decodes_sparse_serp_payload() {
        let payload = json!({
            "organic": [
                {"title": "A", "link": "https://a.example", "rank": 1, "extensions": []},
                {"link": "https://b.example", "description": "b", "display_link": "b.example"}
            ],
            "knowledge": {"description": "panel", "facts": [{"key": "Born", "value": "1900"}], "images": []},
            "general": {"search_engine": "google"}
        });

        let bundle: SearchResultBundle = serde_json::from_value(payload).unwrap();
        assert_eq!(bundle.organic.len(), 2);
        assert_eq!(bundle.organic[0].description, "");
        assert!(bundle.organic[0].provenance.is_none());
        assert_eq!(bundle.knowledge.unwrap().facts[0].value, "1900");
        assert!(bundle.people_also_ask.is_empty());
    }

    #[test]
    fn test_execution_result_is_tagged_by_strategy() {
        let single = ExecutionResult::Single {
            bundle: SearchResultBundle::default(),
        };
        let value = serde_json::to_value(&single).unwrap();
        assert_eq!(value["strategy"], "single");
        assert!(value["organic"].is_array());

        let decomposed = ExecutionResult::Decomposed {
            sub_queries: vec!["a".into(), "b".into()],
            reasoning: "two assertions".into(),
            merged: SearchResultBundle::default(),
            per_query: vec![SearchResultBundle::default(); 2],
        };
        let value = serde_json::to_value(&decomposed).unwrap();
        assert_eq!(value["strategy"], "decomposed");
        assert_eq!(value["per_query"].as_array().unwrap().len(), 2);
        assert_eq!(decomposed.strategy(), Strategy::Decomposed);
        assert_eq!(decomposed.sub_queries().unwrap().len(), 2);
    }

    #[test]
    fn test_provenance_serializes_inline() {
        let item = OrganicResult {
            title: "t".into(),
            description: String::new(),
            link: "https://x.example".into(),
            display_link: "x.example".into(),
            provenance: Some(Provenance {
                source_query_index: 1,
                source_label: "sub-search-2".into(),
            }),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["source_query_index"], 1);
        assert_eq!(value["source_label"], "sub-search-2");
    }
}
