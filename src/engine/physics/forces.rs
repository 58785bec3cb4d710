use glam::{Vec3, vec3};

use super::octree::OctNode;

#[derive(Clone, Copy)]
pub(super) struct RepulsionParams {
    /// Repulsion already scaled by the current alpha.
    pub(super) strength: f32,
    pub(super) distance_min_sq: f32,
    pub(super) theta: f32,
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) max_collision_distance_sq: f32,
}

/// Deterministic direction for coincident points so they separate instead of
/// producing a zero-length normal.
pub(super) fn separation_direction(from: usize, to: usize, planar: bool) -> Vec3 {
    let turn = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    if planar {
        return vec3(turn.cos(), turn.sin(), 0.0);
    }

    let height = (((from + to) as f32) * 0.381_966).fract() * 2.0 - 1.0;
    let ring = (1.0 - height * height).max(0.0).sqrt();
    vec3(turn.cos() * ring, height, turn.sin() * ring)
}

fn repulsion_between(point_a: Vec3, point_b: Vec3, params: RepulsionParams, fallback: Vec3) -> Vec3 {
    let delta = point_a - point_b;
    let distance_sq = delta.length_squared();
    if distance_sq <= 1e-8 {
        return fallback * (params.strength / params.distance_min_sq.sqrt());
    }

    delta * (params.strength / distance_sq.max(params.distance_min_sq))
}

pub(super) fn accumulate_repulsion_for_node(
    node: &OctNode,
    index: usize,
    positions: &[Vec3],
    params: RepulsionParams,
    planar: bool,
    velocity_delta: &mut Vec3,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            let fallback = separation_direction(index, other_index, planar);
            *velocity_delta += repulsion_between(point, positions[other_index], params, fallback);
        }
        return;
    }

    let delta = point - node.center_of_mass;
    let distance_sq = delta.length_squared().max(params.distance_min_sq);
    let distance = distance_sq.sqrt();
    let can_approximate = !node.bounds.contains(point)
        && ((node.bounds.side_length() / distance) < params.theta)
        && node.mass > 1.0;

    if can_approximate {
        *velocity_delta += delta * ((params.strength * node.mass) / distance_sq);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_repulsion_for_node(child, index, positions, params, planar, velocity_delta);
    }
}

fn collide_pair(
    from: usize,
    to: usize,
    positions: &[Vec3],
    radii: &[f32],
    params: CollisionParams,
    planar: bool,
    velocity_deltas: &mut [Vec3],
) {
    let min_distance = radii[from] + radii[to];
    let delta = positions[from] - positions[to];
    let distance_sq = delta.length_squared();
    if distance_sq >= min_distance * min_distance {
        return;
    }

    let (direction, distance) = if distance_sq > 1e-8 {
        let distance = distance_sq.sqrt();
        (delta / distance, distance)
    } else {
        (separation_direction(from, to, planar), 0.0)
    };

    let push = (min_distance - distance) * params.strength;
    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let total = (from_sq + to_sq).max(f32::EPSILON);

    velocity_deltas[from] += direction * (push * (to_sq / total));
    velocity_deltas[to] -= direction * (push * (from_sq / total));
}

pub(super) fn accumulate_collision_pairs(
    node_a: &OctNode,
    node_b: &OctNode,
    same_node: bool,
    positions: &[Vec3],
    radii: &[f32],
    params: CollisionParams,
    planar: bool,
    velocity_deltas: &mut [Vec3],
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > params.max_collision_distance_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[(offset + 1)..] {
                    collide_pair(from, to, positions, radii, params, planar, velocity_deltas);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    collide_pair(from, to, positions, radii, params, planar, velocity_deltas);
                }
            }
        }
        return;
    }

    if same_node {
        for first in 0..node_a.children.len() {
            let Some(child_a) = node_a.children[first].as_ref() else {
                continue;
            };

            accumulate_collision_pairs(
                child_a,
                child_a,
                true,
                positions,
                radii,
                params,
                planar,
                velocity_deltas,
            );

            for second in (first + 1)..node_a.children.len() {
                let Some(child_b) = node_a.children[second].as_ref() else {
                    continue;
                };
                accumulate_collision_pairs(
                    child_a,
                    child_b,
                    false,
                    positions,
                    radii,
                    params,
                    planar,
                    velocity_deltas,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children.iter().flatten() {
            accumulate_collision_pairs(
                child,
                node_b,
                false,
                positions,
                radii,
                params,
                planar,
                velocity_deltas,
            );
        }
    } else {
        for child in node_b.children.iter().flatten() {
            accumulate_collision_pairs(
                node_a,
                child,
                false,
                positions,
                radii,
                params,
                planar,
                velocity_deltas,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separation_direction_is_unit_length() {
        for (from, to) in [(0, 1), (3, 7), (12, 40)] {
            assert!((separation_direction(from, to, false).length() - 1.0).abs() < 1e-4);
            let planar = separation_direction(from, to, true);
            assert_eq!(planar.z, 0.0);
            assert!((planar.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn repulsion_pushes_points_apart() {
        let positions = vec![vec3(-1.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0)];
        let tree = OctNode::build(&positions).expect("tree");
        let params = RepulsionParams {
            strength: 10.0,
            distance_min_sq: 1.0,
            theta: 0.9,
        };

        let mut left = Vec3::ZERO;
        accumulate_repulsion_for_node(&tree, 0, &positions, params, false, &mut left);
        let mut right = Vec3::ZERO;
        accumulate_repulsion_for_node(&tree, 1, &positions, params, false, &mut right);

        assert!(left.x < 0.0);
        assert!(right.x > 0.0);
        assert!((left + right).length() < 1e-5);
    }

    #[test]
    fn overlapping_spheres_receive_opposite_pushes() {
        let positions = vec![vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(50.0, 0.0, 0.0)];
        let radii = vec![2.0, 2.0, 2.0];
        let tree = OctNode::build(&positions).expect("tree");
        let mut deltas = vec![Vec3::ZERO; 3];

        accumulate_collision_pairs(
            &tree,
            &tree,
            true,
            &positions,
            &radii,
            CollisionParams {
                strength: 1.0,
                max_collision_distance_sq: 16.0,
            },
            false,
            &mut deltas,
        );

        assert!(deltas[0].x < 0.0);
        assert!(deltas[1].x > 0.0);
        assert_eq!(deltas[2], Vec3::ZERO);
    }
}
