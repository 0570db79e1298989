use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::store::{GraphStore, NodeId};

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Visible nodes whose element fuzzily matches `query`, best match first.
pub fn search_nodes(store: &GraphStore, query: &str) -> Vec<NodeId> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut matches = store
        .node_ids()
        .filter(|id| store.nodes()[id.0].visible)
        .filter_map(|id| {
            fuzzy_match_score(&matcher, &store.nodes()[id.0].element, query).map(|score| (id, score))
        })
        .collect::<Vec<_>>();
    matches.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    matches.into_iter().map(|(id, _)| id).collect()
}
