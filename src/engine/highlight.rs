use std::collections::HashSet;

use super::adjacency::AdjacencyIndex;
use super::config::HighlightConfig;

const LABEL_HOVERED: f32 = 1.0;
const LABEL_NEIGHBOR: f32 = 0.8;
const LABEL_DIMMED: f32 = 0.1;
const LABEL_IDLE: f32 = 0.6;
const LABEL_HOVERED_SIZE: f32 = 16.0 / 12.0;
const EDGE_LABEL_IDLE: f32 = 0.95;
const EDGE_LABEL_DIMMED: f32 = 0.1;
const EDGE_WIDTH_IDLE: f32 = 0.7;
const EDGE_WIDTH_DIMMED: f32 = 0.4;

/// Neighborhood of the hovered node. Recomputed only when the picked node
/// changes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HighlightState {
    pub target: Option<usize>,
    pub neighbor_set: HashSet<usize>,
    pub incident_edge_set: HashSet<usize>,
}

impl HighlightState {
    pub fn for_target(adjacency: &AdjacencyIndex, target: Option<usize>) -> Self {
        let Some(index) = target.filter(|&index| index < adjacency.node_count()) else {
            return Self::default();
        };

        Self {
            target: Some(index),
            neighbor_set: adjacency.neighbor_set(index),
            incident_edge_set: adjacency.incident_edge_set(index),
        }
    }

    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }
}

/// Hover and selection are independent. Hover drives emphasis; selection
/// persists after the pointer leaves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Interaction {
    pub hovered: Option<usize>,
    pub selected: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeVisual {
    pub scale: f32,
    pub emissive: f32,
    pub opacity: f32,
    /// 0 keeps the node color, 1 is fully dimmed.
    pub dim: f32,
    pub label_opacity: f32,
    pub label_size: f32,
}

impl NodeVisual {
    pub fn idle(config: &HighlightConfig) -> Self {
        Self {
            scale: 1.0,
            emissive: config.idle_emissive,
            opacity: 1.0,
            dim: 0.0,
            label_opacity: LABEL_IDLE,
            label_size: 1.0,
        }
    }

    pub fn approach(&mut self, target: &Self, factor: f32) {
        self.scale += (target.scale - self.scale) * factor;
        self.emissive += (target.emissive - self.emissive) * factor;
        self.opacity += (target.opacity - self.opacity) * factor;
        self.dim += (target.dim - self.dim) * factor;
        self.label_opacity += (target.label_opacity - self.label_opacity) * factor;
        self.label_size += (target.label_size - self.label_size) * factor;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeVisual {
    pub opacity: f32,
    pub width: f32,
    pub speed_multiplier: f32,
    pub label_opacity: f32,
}

impl EdgeVisual {
    pub fn idle(config: &HighlightConfig) -> Self {
        Self {
            opacity: config.edge_idle_opacity,
            width: EDGE_WIDTH_IDLE,
            speed_multiplier: 1.0,
            label_opacity: EDGE_LABEL_IDLE,
        }
    }

    pub fn approach(&mut self, target: &Self, factor: f32) {
        self.opacity += (target.opacity - self.opacity) * factor;
        self.width += (target.width - self.width) * factor;
        self.speed_multiplier += (target.speed_multiplier - self.speed_multiplier) * factor;
        self.label_opacity += (target.label_opacity - self.label_opacity) * factor;
    }
}

pub fn node_target(
    index: usize,
    interaction: Interaction,
    highlight: &HighlightState,
    config: &HighlightConfig,
) -> NodeVisual {
    let idle = NodeVisual::idle(config);

    if let Some(hovered) = highlight.target {
        return if index == hovered {
            NodeVisual {
                scale: config.hover_scale,
                emissive: config.hover_emissive,
                label_opacity: LABEL_HOVERED,
                label_size: LABEL_HOVERED_SIZE,
                ..idle
            }
        } else if highlight.neighbor_set.contains(&index) {
            NodeVisual {
                scale: config.neighbor_scale,
                emissive: config.neighbor_emissive,
                label_opacity: LABEL_NEIGHBOR,
                ..idle
            }
        } else {
            NodeVisual {
                scale: config.dimmed_scale,
                emissive: config.dimmed_emissive,
                opacity: config.dimmed_opacity,
                dim: 1.0,
                label_opacity: LABEL_DIMMED,
                ..idle
            }
        };
    }

    if interaction.selected == Some(index) {
        return NodeVisual {
            scale: config.selected_scale,
            emissive: config.selected_emissive,
            ..idle
        };
    }

    idle
}

pub fn edge_target(
    edge_index: usize,
    highlight: &HighlightState,
    config: &HighlightConfig,
    hover_speed_multiplier: f32,
) -> EdgeVisual {
    let idle = EdgeVisual::idle(config);
    if !highlight.is_active() {
        return idle;
    }

    if highlight.incident_edge_set.contains(&edge_index) {
        EdgeVisual {
            opacity: 1.0,
            width: 1.0,
            speed_multiplier: hover_speed_multiplier,
            label_opacity: 1.0,
        }
    } else {
        EdgeVisual {
            opacity: config.edge_dimmed_opacity,
            width: EDGE_WIDTH_DIMMED,
            speed_multiplier: 1.0,
            label_opacity: EDGE_LABEL_DIMMED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Edge, RelationType, palette::Rgb};

    fn edge(source_index: usize, target_index: usize) -> Edge {
        Edge {
            source_index,
            target_index,
            relation_type: RelationType::Reference,
            color: Rgb(0xaaaaaa),
            strength: 0.5,
            is_inferred: false,
            shared_tags: Vec::new(),
        }
    }

    fn star() -> AdjacencyIndex {
        AdjacencyIndex::build(5, &[edge(0, 1), edge(2, 0), edge(3, 4)])
    }

    #[test]
    fn hover_collects_neighbors_and_incident_edges() {
        let state = HighlightState::for_target(&star(), Some(0));
        assert_eq!(state.neighbor_set, HashSet::from([1, 2]));
        assert_eq!(state.incident_edge_set, HashSet::from([0, 1]));
    }

    #[test]
    fn hovering_nothing_clears_sets() {
        let state = HighlightState::for_target(&star(), None);
        assert!(state.neighbor_set.is_empty());
        assert!(state.incident_edge_set.is_empty());
        assert_eq!(state, HighlightState::for_target(&star(), Some(99)));
    }

    #[test]
    fn hover_targets_rank_target_over_neighbors_over_rest() {
        let config = HighlightConfig::default();
        let state = HighlightState::for_target(&star(), Some(0));
        let interaction = Interaction {
            hovered: Some(0),
            selected: Some(3),
        };

        let hovered = node_target(0, interaction, &state, &config);
        let neighbor = node_target(1, interaction, &state, &config);
        let other = node_target(3, interaction, &state, &config);

        assert_eq!(hovered.scale, 1.8);
        assert_eq!(neighbor.scale, 1.3);
        assert_eq!(other.scale, 0.6);
        assert_eq!(other.opacity, 0.3);
        assert_eq!(other.dim, 1.0);
        assert!(hovered.label_opacity > neighbor.label_opacity);
        assert!(neighbor.label_opacity > other.label_opacity);
    }

    #[test]
    fn selection_shows_when_nothing_is_hovered() {
        let config = HighlightConfig::default();
        let interaction = Interaction {
            hovered: None,
            selected: Some(2),
        };
        let state = HighlightState::default();

        assert_eq!(node_target(2, interaction, &state, &config).scale, 1.5);
        assert_eq!(node_target(2, interaction, &state, &config).emissive, 0.8);
        assert_eq!(node_target(1, interaction, &state, &config), NodeVisual::idle(&config));
    }

    #[test]
    fn incident_edges_speed_up_and_others_dim() {
        let config = HighlightConfig::default();
        let state = HighlightState::for_target(&star(), Some(0));

        let incident = edge_target(1, &state, &config, 4.0);
        assert_eq!(incident.speed_multiplier, 4.0);
        assert_eq!(incident.opacity, 1.0);

        let other = edge_target(2, &state, &config, 4.0);
        assert_eq!(other.speed_multiplier, 1.0);
        assert!((other.opacity - 0.1).abs() < 1e-6);

        let idle = edge_target(2, &HighlightState::default(), &config, 4.0);
        assert!((idle.opacity - 0.85).abs() < 1e-6);
    }

    #[test]
    fn approach_eases_instead_of_snapping() {
        let config = HighlightConfig::default();
        let mut current = NodeVisual::idle(&config);
        let target = NodeVisual {
            scale: 2.0,
            ..current
        };
        current.approach(&target, 0.1);
        assert!((current.scale - 1.1).abs() < 1e-6);
    }
}
