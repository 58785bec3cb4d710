use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::palette::{INFERRED_EDGE_COLOR, Rgb};
use super::records::DatasetInput;
use super::relation::{NodeState, RelationType};
use crate::error::EngineError;

const NODE_RADIUS_MIN: f32 = 6.0;
const NODE_RADIUS_RANGE: f32 = 4.0;
const DEFAULT_SIZE_HINT: f32 = 0.5;
const DEFAULT_RELATION_STRENGTH: f32 = 0.5;
pub const INFERRED_EDGE_STRENGTH: f32 = 0.3;

/// Which edge sources feed the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// Explicit relations only.
    Explicit,
    /// Edges inferred from shared tags only.
    Inferred,
    #[default]
    Both,
}

impl DisplayMode {
    pub const ALL: [Self; 3] = [Self::Explicit, Self::Inferred, Self::Both];

    pub fn label(self) -> &'static str {
        match self {
            Self::Explicit => "explicit relations",
            Self::Inferred => "tag-inferred",
            Self::Both => "both",
        }
    }

    fn uses_explicit(self) -> bool {
        matches!(self, Self::Explicit | Self::Both)
    }

    fn uses_inferred(self) -> bool {
        matches!(self, Self::Inferred | Self::Both)
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "explicit" | "semantic" => Ok(Self::Explicit),
            "inferred" | "tags" => Ok(Self::Inferred),
            "both" | "mixed" => Ok(Self::Both),
            other => Err(format!(
                "unknown display mode '{other}' (expected explicit, inferred or both)"
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: String,
    pub index: usize,
    pub label: String,
    pub radius: f32,
    pub state: NodeState,
    pub tags: BTreeSet<String>,
    pub category: Option<String>,
    pub skin: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub source_index: usize,
    pub target_index: usize,
    pub relation_type: RelationType,
    pub color: Rgb,
    pub strength: f32,
    pub is_inferred: bool,
    pub shared_tags: Vec<String>,
}

impl Edge {
    pub fn touches(&self, index: usize) -> bool {
        self.source_index == index || self.target_index == index
    }

    pub fn touches_self(&self) -> bool {
        self.source_index == self.target_index
    }

    pub fn other(&self, index: usize) -> usize {
        if self.source_index == index {
            self.target_index
        } else {
            self.source_index
        }
    }
}

/// Typed node and edge lists with dense indices, produced from raw records.
#[derive(Clone, Debug, Default)]
pub struct KnowledgeGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    index_by_id: HashMap<String, usize>,
}

fn pair_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

fn node_radius(size_hint: Option<f32>) -> f32 {
    let hint = size_hint
        .filter(|hint| hint.is_finite())
        .unwrap_or(DEFAULT_SIZE_HINT)
        .clamp(0.0, 1.0);
    NODE_RADIUS_MIN + (hint * NODE_RADIUS_RANGE)
}

fn relation_strength(strength: Option<f32>) -> f32 {
    strength
        .filter(|strength| strength.is_finite())
        .unwrap_or(DEFAULT_RELATION_STRENGTH)
        .clamp(0.0, 1.0)
}

impl KnowledgeGraph {
    pub fn build(input: &DatasetInput, mode: DisplayMode) -> Result<Self, EngineError> {
        let mut nodes = Vec::with_capacity(input.nodes.len());
        let mut index_by_id = HashMap::with_capacity(input.nodes.len());

        for record in &input.nodes {
            let id = record.id.trim();
            if id.is_empty() {
                warn!(label = %record.label, "dropping node record without an id");
                continue;
            }
            if index_by_id.contains_key(id) {
                warn!(id, "dropping duplicate node record");
                continue;
            }

            let index = nodes.len();
            let label = if record.label.trim().is_empty() {
                id.to_owned()
            } else {
                record.label.trim().to_owned()
            };
            let tags = record
                .tags
                .iter()
                .map(|tag| tag.trim())
                .filter(|tag| !tag.is_empty())
                .map(str::to_owned)
                .collect::<BTreeSet<_>>();

            index_by_id.insert(id.to_owned(), index);
            nodes.push(Node {
                id: id.to_owned(),
                index,
                label,
                radius: node_radius(record.size_hint),
                state: NodeState::parse(record.state.as_deref(), record.review_list),
                tags,
                category: record.category.clone().filter(|category| !category.trim().is_empty()),
                skin: record.skin.clone(),
            });
        }

        if nodes.is_empty() {
            return Err(EngineError::EmptyDataset);
        }

        let mut graph = Self {
            nodes,
            edges: Vec::new(),
            index_by_id,
        };

        let mut connected = HashSet::new();
        if mode.uses_explicit() {
            graph.add_explicit_relations(input, &mut connected);
        }
        if mode.uses_inferred() && input.enable_tag_inference {
            graph.add_inferred_edges(&mut connected);
        }

        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            mode = %mode,
            "built knowledge graph"
        );
        Ok(graph)
    }

    fn add_explicit_relations(
        &mut self,
        input: &DatasetInput,
        connected: &mut HashSet<(usize, usize)>,
    ) {
        for relation in &input.relations {
            let source = self.index_of(relation.source_id.trim());
            let target = self.index_of(relation.target_id.trim());
            let (Some(source), Some(target)) = (source, target) else {
                debug!(
                    source = %relation.source_id,
                    target = %relation.target_id,
                    "skipping relation with unknown endpoint"
                );
                continue;
            };
            if source == target {
                debug!(id = %relation.source_id, "skipping self relation");
                continue;
            }
            if !connected.insert(pair_key(source, target)) {
                continue;
            }

            let relation_type = RelationType::parse(relation.relation_type.as_deref());
            self.edges.push(Edge {
                source_index: source,
                target_index: target,
                relation_type,
                color: relation_type.color(),
                strength: relation_strength(relation.strength),
                is_inferred: false,
                shared_tags: Vec::new(),
            });
        }
    }

    fn add_inferred_edges(&mut self, connected: &mut HashSet<(usize, usize)>) {
        for first in 0..self.nodes.len() {
            if self.nodes[first].tags.is_empty() {
                continue;
            }

            for second in (first + 1)..self.nodes.len() {
                if connected.contains(&(first, second)) {
                    continue;
                }

                let shared_tags = self.nodes[first]
                    .tags
                    .intersection(&self.nodes[second].tags)
                    .cloned()
                    .collect::<Vec<_>>();
                if shared_tags.is_empty() {
                    continue;
                }

                connected.insert((first, second));
                self.edges.push(Edge {
                    source_index: first,
                    target_index: second,
                    relation_type: RelationType::Similar,
                    color: INFERRED_EDGE_COLOR,
                    strength: INFERRED_EDGE_STRENGTH,
                    is_inferred: true,
                    shared_tags,
                });
            }
        }
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
