mod forces;
mod octree;
mod seed;

use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use super::config::{Dimensions, PhysicsConfig};
use crate::dataset::{Edge, Node};
use forces::{
    CollisionParams, RepulsionParams, accumulate_collision_pairs, accumulate_repulsion_for_node,
    separation_direction,
};
use octree::OctNode;
use seed::{fibonacci_shell, random_shell_point};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationParticle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
}

#[derive(Clone, Copy, Debug)]
struct Spring {
    source: usize,
    target: usize,
    rest_length: f32,
    stiffness: f32,
    /// Share of the correction applied to the target, by relative degree.
    bias: f32,
}

impl SimulationParticle {
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

#[derive(Default)]
struct SolverScratch {
    positions: Vec<Vec3>,
    radii: Vec<f32>,
    velocity_deltas: Vec<Vec3>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Particles whose state went non-finite and were placed back on the shell.
    pub reseeded: usize,
}

/// Owns every particle position and velocity. Other components only read.
pub struct ForceSolver {
    particles: Vec<SimulationParticle>,
    springs: Vec<Spring>,
    alpha: f32,
    config: PhysicsConfig,
    rng: StdRng,
    scratch: SolverScratch,
    ticks: u64,
}

impl ForceSolver {
    pub fn new(nodes: &[Node], edges: &[Edge], config: PhysicsConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = nodes.len();
        let particles = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let radius = config.shell_radius_min
                    + rand::Rng::r#gen::<f32>(&mut rng) * config.shell_radius_range;
                SimulationParticle {
                    position: fibonacci_shell(index, count, radius, config.dimensions),
                    velocity: Vec3::ZERO,
                    radius: node.radius,
                }
            })
            .collect();

        let mut solver = Self {
            particles,
            springs: Vec::new(),
            alpha: 1.0,
            config,
            rng,
            scratch: SolverScratch::default(),
            ticks: 0,
        };
        solver.set_edges(edges);
        solver
    }

    /// Replaces the spring set while keeping particle state.
    pub fn set_edges(&mut self, edges: &[Edge]) {
        let count = self.particles.len();
        let mut degree = vec![0usize; count];
        for edge in edges {
            if edge.source_index < count && edge.target_index < count && !edge.touches_self() {
                degree[edge.source_index] += 1;
                degree[edge.target_index] += 1;
            }
        }

        self.springs = edges
            .iter()
            .filter(|edge| {
                edge.source_index < count && edge.target_index < count && !edge.touches_self()
            })
            .map(|edge| {
                let strength = edge.strength.clamp(0.0, 1.0);
                let source_degree = degree[edge.source_index] as f32;
                let target_degree = degree[edge.target_index] as f32;
                Spring {
                    source: edge.source_index,
                    target: edge.target_index,
                    rest_length: self.config.link_distance * (1.25 - 0.5 * strength),
                    stiffness: self.config.link_stiffness * strength,
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect();
    }

    pub fn warm_up(&mut self) {
        for _ in 0..self.config.warmup_ticks {
            self.tick();
        }
        debug!(
            ticks = self.config.warmup_ticks,
            alpha = self.alpha,
            "layout warm-up finished"
        );
    }

    pub fn reheat(&mut self, alpha: f32) {
        self.alpha = self.alpha.max(alpha.clamp(0.0, 1.0));
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn particles(&self) -> &[SimulationParticle] {
        &self.particles
    }

    pub fn position(&self, index: usize) -> Option<Vec3> {
        self.particles.get(index).map(|particle| particle.position)
    }

    /// Largest distance from the origin a particle may hold after a tick.
    pub fn hard_radius(&self) -> f32 {
        self.config.radial_target * (1.0 + self.config.radial_hard_margin)
    }

    pub fn tick(&mut self) -> TickReport {
        self.alpha += (0.0 - self.alpha) * self.config.alpha_decay;
        self.alpha = self.alpha.max(self.config.alpha_min);
        self.ticks += 1;

        if self.particles.is_empty() {
            return TickReport::default();
        }

        let mut reseeded = self.reseed_non_finite();
        let planar = self.config.dimensions == Dimensions::Two;
        self.apply_repulsion(planar);
        self.apply_springs(planar);
        for _ in 0..self.config.collision_iterations {
            self.apply_collision(planar);
        }
        self.apply_radial_pull();
        self.integrate(planar);
        self.shift_to_center();

        reseeded += self.reseed_non_finite();
        self.clamp_to_hard_radius();
        TickReport { reseeded }
    }

    fn apply_repulsion(&mut self, planar: bool) {
        let count = self.particles.len();
        if count < 2 {
            return;
        }

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch
            .positions
            .extend(self.particles.iter().map(|particle| particle.position));
        scratch.velocity_deltas.clear();
        scratch.velocity_deltas.resize(count, Vec3::ZERO);

        let Some(tree) = OctNode::build(&scratch.positions) else {
            return;
        };

        let params = RepulsionParams {
            strength: self.config.repulsion * self.alpha,
            distance_min_sq: self.config.repulsion_distance_min.powi(2),
            theta: self.config.barnes_hut_theta,
        };
        for (index, delta) in scratch.velocity_deltas.iter_mut().enumerate() {
            accumulate_repulsion_for_node(&tree, index, &scratch.positions, params, planar, delta);
        }

        for (particle, delta) in self.particles.iter_mut().zip(&scratch.velocity_deltas) {
            particle.velocity += *delta;
        }
    }

    fn apply_springs(&mut self, planar: bool) {
        for spring in &self.springs {
            let source = self.particles[spring.source];
            let target = self.particles[spring.target];
            if !(source.is_finite() && target.is_finite()) {
                continue;
            }

            let mut delta =
                (target.position + target.velocity) - (source.position + source.velocity);
            let mut length = delta.length();
            if length <= 1e-6 {
                delta = separation_direction(spring.source, spring.target, planar) * 1e-3;
                length = 1e-3;
            }

            let correction =
                delta * ((length - spring.rest_length) / length * self.alpha * spring.stiffness);
            self.particles[spring.target].velocity -= correction * spring.bias;
            self.particles[spring.source].velocity += correction * (1.0 - spring.bias);
        }
    }

    fn apply_collision(&mut self, planar: bool) {
        let count = self.particles.len();
        if count < 2 {
            return;
        }

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.radii.clear();
        let mut max_radius = 0.0_f32;
        for particle in &self.particles {
            scratch
                .positions
                .push(particle.position + particle.velocity);
            let collide_radius = particle.radius * self.config.collision_padding;
            scratch.radii.push(collide_radius);
            max_radius = max_radius.max(collide_radius);
        }
        scratch.velocity_deltas.clear();
        scratch.velocity_deltas.resize(count, Vec3::ZERO);

        if max_radius <= 0.0 {
            return;
        }
        let Some(tree) = OctNode::build(&scratch.positions) else {
            return;
        };

        let reach = max_radius * 2.0;
        accumulate_collision_pairs(
            &tree,
            &tree,
            true,
            &scratch.positions,
            &scratch.radii,
            CollisionParams {
                strength: self.config.collision_strength,
                max_collision_distance_sq: reach * reach,
            },
            planar,
            &mut scratch.velocity_deltas,
        );

        for (particle, delta) in self.particles.iter_mut().zip(&scratch.velocity_deltas) {
            particle.velocity += *delta;
        }
    }

    fn apply_radial_pull(&mut self) {
        let target = self.config.radial_target;
        let strength = self.config.radial_strength;
        for particle in &mut self.particles {
            let distance = particle.position.length();
            if distance > target {
                particle.velocity -= particle.position * ((distance - target) / distance * strength);
            }
        }
    }

    fn integrate(&mut self, planar: bool) {
        let keep = 1.0 - self.config.velocity_decay;
        for particle in &mut self.particles {
            particle.velocity *= keep;
            particle.position += particle.velocity;
            if planar {
                particle.position.z = 0.0;
                particle.velocity.z = 0.0;
            }
        }
    }

    fn shift_to_center(&mut self) {
        let mut centroid = Vec3::ZERO;
        let mut finite = 0usize;
        for particle in &self.particles {
            if particle.position.is_finite() {
                centroid += particle.position;
                finite += 1;
            }
        }
        if finite == 0 {
            return;
        }

        let shift = centroid / finite as f32 * self.config.center_strength;
        if shift.length_squared() <= 1e-12 {
            return;
        }
        for particle in &mut self.particles {
            particle.position -= shift;
        }
    }

    fn reseed_non_finite(&mut self) -> usize {
        let mut reseeded = 0;
        for (index, particle) in self.particles.iter_mut().enumerate() {
            if particle.is_finite() {
                continue;
            }

            particle.position = random_shell_point(
                &mut self.rng,
                self.config.shell_radius_min,
                self.config.shell_radius_range,
                self.config.dimensions,
            );
            particle.velocity = Vec3::ZERO;
            reseeded += 1;
            warn!(index, "non-finite particle reseeded onto the shell");
        }
        reseeded
    }

    fn clamp_to_hard_radius(&mut self) {
        let limit = self.hard_radius();
        for particle in &mut self.particles {
            let distance = particle.position.length();
            if distance <= limit {
                continue;
            }

            let outward = particle.position / distance;
            particle.position = outward * limit;
            let radial_speed = particle.velocity.dot(outward);
            if radial_speed > 0.0 {
                particle.velocity -= outward * radial_speed;
            }
        }
    }

    #[cfg(test)]
    fn poison(&mut self, index: usize) {
        self.particles[index].position = Vec3::splat(f32::NAN);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::dataset::{NodeState, RelationType, palette::Rgb};

    fn nodes(count: usize) -> Vec<Node> {
        (0..count)
            .map(|index| Node {
                id: format!("n{index}"),
                index,
                label: format!("Node {index}"),
                radius: 8.0,
                state: NodeState::Default,
                tags: BTreeSet::new(),
                category: None,
                skin: None,
            })
            .collect()
    }

    fn chain(count: usize, strength: f32) -> Vec<Edge> {
        (1..count)
            .map(|index| Edge {
                source_index: index - 1,
                target_index: index,
                relation_type: RelationType::Reference,
                color: Rgb(0xaaaaaa),
                strength,
                is_inferred: false,
                shared_tags: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn seeded_positions_lie_on_the_shell() {
        let solver = ForceSolver::new(&nodes(40), &[], PhysicsConfig::default(), 1);
        for particle in solver.particles() {
            let distance = particle.position.length();
            assert!((89.9..180.1).contains(&distance), "distance {distance}");
        }
    }

    #[test]
    fn positions_stay_finite_and_bounded_after_many_ticks() {
        let config = PhysicsConfig::default();
        let mut solver = ForceSolver::new(&nodes(120), &chain(120, 0.8), config, 7);
        for _ in 0..320 {
            solver.tick();
        }

        let limit = config.radial_target * (1.0 + config.radial_hard_margin) + 1e-3;
        for particle in solver.particles() {
            assert!(particle.position.is_finite());
            assert!(particle.position.length() <= limit);
        }
    }

    #[test]
    fn alpha_decays_to_its_floor() {
        let config = PhysicsConfig::default();
        let mut solver = ForceSolver::new(&nodes(3), &[], config, 1);
        let mut previous = solver.alpha();
        for _ in 0..50 {
            solver.tick();
            assert!(solver.alpha() < previous);
            previous = solver.alpha();
        }
        for _ in 0..1_000 {
            solver.tick();
        }
        assert!((solver.alpha() - config.alpha_min).abs() < 1e-6);

        solver.reheat(0.3);
        assert!((solver.alpha() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn non_finite_particles_are_reseeded() {
        let mut solver = ForceSolver::new(&nodes(10), &chain(10, 0.5), PhysicsConfig::default(), 2);
        for _ in 0..50 {
            solver.tick();
        }
        let before = solver
            .particles()
            .iter()
            .map(|particle| particle.position)
            .collect::<Vec<_>>();

        solver.poison(4);
        let report = solver.tick();

        assert_eq!(report.reseeded, 1);
        for particle in solver.particles() {
            assert!(particle.is_finite());
        }
        for index in [0, 1, 2, 7, 8, 9] {
            let moved = solver.particles()[index].position.distance(before[index]);
            assert!(moved < 40.0, "node {index} jumped {moved}");
        }
    }

    #[test]
    fn springs_ignore_non_finite_endpoints() {
        let mut solver = ForceSolver::new(&nodes(3), &chain(3, 1.0), PhysicsConfig::default(), 4);
        solver.poison(1);
        solver.apply_springs(false);

        assert!(solver.particles()[0].velocity.is_finite());
        assert!(solver.particles()[2].velocity.is_finite());
    }

    #[test]
    fn stronger_links_settle_closer() {
        let config = PhysicsConfig::default();
        let mut strong = ForceSolver::new(&nodes(2), &chain(2, 1.0), config, 3);
        let mut weak = ForceSolver::new(&nodes(2), &chain(2, 0.1), config, 3);
        for _ in 0..300 {
            strong.tick();
            weak.tick();
        }

        let gap = |solver: &ForceSolver| {
            solver.particles()[0]
                .position
                .distance(solver.particles()[1].position)
        };
        assert!(gap(&strong) < gap(&weak));
    }

    #[test]
    fn planar_mode_keeps_depth_at_zero() {
        let config = PhysicsConfig {
            dimensions: Dimensions::Two,
            ..PhysicsConfig::default()
        };
        let mut solver = ForceSolver::new(&nodes(20), &chain(20, 0.5), config, 5);
        for _ in 0..60 {
            solver.tick();
        }
        assert!(solver.particles().iter().all(|particle| particle.position.z == 0.0));
    }
}
