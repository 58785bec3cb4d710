use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::dataset::Node;

pub const SEARCH_LIMIT: usize = 10;

const LABEL_WEIGHT: i64 = 3;
const CATEGORY_WEIGHT: i64 = 2;
const TAG_WEIGHT: i64 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchHit {
    pub index: usize,
    pub id: String,
    pub label: String,
    pub score: i64,
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

fn node_score(matcher: &SkimMatcherV2, node: &Node, query: &str) -> Option<i64> {
    let label = fuzzy_match_score(matcher, &node.label, query).map(|score| score * LABEL_WEIGHT);
    let id = fuzzy_match_score(matcher, &node.id, query).map(|score| score * LABEL_WEIGHT);
    let category = node
        .category
        .as_deref()
        .and_then(|category| fuzzy_match_score(matcher, category, query))
        .map(|score| score * CATEGORY_WEIGHT);
    let tags = node
        .tags
        .iter()
        .filter_map(|tag| fuzzy_match_score(matcher, tag, query))
        .max()
        .map(|score| score * TAG_WEIGHT);

    [label, id, category, tags].into_iter().flatten().max()
}

/// Ranked fuzzy matches over label, id, category and tags.
pub fn search_nodes(nodes: &[Node], query: &str) -> Vec<SearchHit> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut hits = nodes
        .iter()
        .filter_map(|node| {
            node_score(&matcher, node, query).map(|score| SearchHit {
                index: node.index,
                id: node.id.clone(),
                label: node.label.clone(),
                score,
            })
        })
        .collect::<Vec<_>>();

    hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.label.cmp(&b.label)));
    hits.truncate(SEARCH_LIMIT);
    hits
}
