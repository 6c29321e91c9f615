//! Deterministic merge of several search bundles into one evidence set.
//!
//! Rules:
//! - organic: bundle order then item order, tagged with provenance, first link wins
//! - knowledge: first non-empty panel in bundle order
//! - people_also_ask: concatenated, duplicates kept

use crate::models::{Provenance, SearchResultBundle};
use std::collections::HashSet;

/// Label for results from bundle `index` when `total` bundles are merged.
pub fn source_label(index: usize, total: usize) -> String {
    if total == 1 {
        "main-search".to_string()
    } else {
        format!("sub-search-{}", index + 1)
    }
}

/// Merge bundles. Pure; inputs are left untouched.
pub fn merge_bundles(bundles: &[SearchResultBundle]) -> SearchResultBundle {
    let total = bundles.len();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut organic = Vec::new();

    for (index, bundle) in bundles.iter().enumerate() {
        for item in &bundle.organic {
            // Exact-string identity: no URL normalization.
            if !seen.insert(item.link.as_str()) {
                continue;
            }
            let mut tagged = item.clone();
            tagged.provenance = Some(Provenance {
                source_query_index: index,
                source_label: source_label(index, total),
            });
            organic.push(tagged);
        }
    }

    let knowledge = bundles.iter().find_map(|b| b.knowledge.clone());

    let people_also_ask = bundles
        .iter()
        .flat_map(|b| b.people_also_ask.iter().cloned())
        .collect();

    SearchResultBundle {
        organic,
        knowledge,
        people_also_ask,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bundle_with_links, knowledge, organic, question};

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut first = bundle_with_links("a", 2);
        first.organic[1].title = "first copy".into();
        let shared = first.organic[1].link.clone();

        let mut dup = organic(&shared);
        dup.title = "second copy".into();
        let second = SearchResultBundle {
            organic: vec![organic("https://b.example/0"), dup],
            ..Default::default()
        };

        let merged = merge_bundles(&[first, second]);
        let links: Vec<&str> = merged.organic.iter().map(|o| o.link.as_str()).collect();
        assert_eq!(
            links,
            vec!["https://a.example/0", "https://a.example/1", "https://b.example/0"]
        );

        let kept = &merged.organic[1];
        assert_eq!(kept.title, "first copy");
        assert_eq!(kept.provenance.as_ref().unwrap().source_query_index, 0);
    }

    #[test]
    fn test_every_distinct_link_exactly_once() {
        let bundles = vec![
            bundle_with_links("x", 5),
            bundle_with_links("x", 3),
            bundle_with_links("y", 4),
        ];
        let merged = merge_bundles(&bundles);
        assert_eq!(merged.organic.len(), 9);

        let distinct: HashSet<&str> = merged.organic.iter().map(|o| o.link.as_str()).collect();
        assert_eq!(distinct.len(), merged.organic.len());
    }

    #[test]
    fn test_duplicates_within_one_bundle_dropped() {
        let bundle = SearchResultBundle {
            organic: vec![
                organic("https://a.example/"),
                organic("https://a.example"),
                organic("https://a.example/"),
            ],
            ..Default::default()
        };
        let merged = merge_bundles(&[bundle]);
        // Trailing slash differs, so only the exact repeat is dropped.
        assert_eq!(merged.organic.len(), 2);
    }

    #[test]
    fn test_provenance_labels() {
        let merged = merge_bundles(&[bundle_with_links("solo", 1)]);
        let p = merged.organic[0].provenance.as_ref().unwrap();
        assert_eq!(p.source_label, "main-search");
        assert_eq!(p.source_query_index, 0);

        let merged = merge_bundles(&[bundle_with_links("a", 1), bundle_with_links("b", 1)]);
        let labels: Vec<&str> = merged
            .organic
            .iter()
            .map(|o| o.provenance.as_ref().unwrap().source_label.as_str())
            .collect();
        assert_eq!(labels, vec!["sub-search-1", "sub-search-2"]);
    }

    #[test]
    fn test_first_non_null_knowledge_wins() {
        let k = knowledge("K");
        let k2 = knowledge("K2");
        let bundles = vec![
            SearchResultBundle::default(),
            SearchResultBundle {
                knowledge: Some(k.clone()),
                ..Default::default()
            },
            SearchResultBundle {
                knowledge: Some(k2),
                ..Default::default()
            },
        ];
        assert_eq!(merge_bundles(&bundles).knowledge, Some(k));

        let none = vec![SearchResultBundle::default(), SearchResultBundle::default()];
        assert!(merge_bundles(&none).knowledge.is_none());
    }

    #[test]
    fn test_people_also_ask_not_deduplicated() {
        let q = question("Is it safe?");
        let bundles = vec![
            SearchResultBundle {
                people_also_ask: vec![q.clone()],
                ..Default::default()
            },
            SearchResultBundle {
                people_also_ask: vec![q.clone()],
                ..Default::default()
            },
        ];
        let merged = merge_bundles(&bundles);
        assert_eq!(merged.people_also_ask, vec![q.clone(), q]);
    }

    #[test]
    fn test_inputs_untouched() {
        let bundles = vec![bundle_with_links("a", 2), bundle_with_links("a", 2)];
        let before = bundles.clone();
        let _ = merge_bundles(&bundles);
        assert_eq!(bundles, before);
        assert!(bundles[0].organic.iter().all(|o| o.provenance.is_none()));
    }

    #[test]
    fn test_empty_input() {
        let merged = merge_bundles(&[]);
        assert!(merged.organic.is_empty());
        assert!(merged.knowledge.is_none());
        assert!(merged.people_also_ask.is_empty());
    }
}
