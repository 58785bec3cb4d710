use std::f32::consts::TAU;

use glam::{Mat4, Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::ConnectorConfig;
use crate::dataset::palette::Rgb;

const BRIGHTNESS_PALETTE: [f32; 4] = [2.5, 2.0, 1.8, 1.5];
const PARALLEL_THRESHOLD: f32 = 0.9;

/// Per-particle parameters sampled once when the batch is created.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectorParticle {
    pub phase: f32,
    pub speed: f32,
    pub scale: Vec3,
    pub radial_offset: f32,
    pub angle: f32,
    pub spin_axis: Vec3,
    pub spin_speed: f32,
    pub spin_phase: f32,
    pub brightness: f32,
}

/// Instance count for an edge before any budget scaling.
pub fn base_count_for_length(length: f32, config: &ConnectorConfig) -> usize {
    let raw = if length.is_finite() {
        (length.max(0.0) * config.density).floor() as usize
    } else {
        config.count_min
    };
    raw.clamp(config.count_min, config.count_max.max(config.count_min))
}

/// Orthonormal `(normal, binormal)` around a path tangent. The reference axis
/// switches to +X when the tangent is nearly vertical.
pub fn path_frame(tangent: Vec3) -> (Vec3, Vec3) {
    let tangent = tangent.try_normalize().unwrap_or(Vec3::Z);
    let reference = if tangent.dot(Vec3::Y).abs() > PARALLEL_THRESHOLD {
        Vec3::X
    } else {
        Vec3::Y
    };
    let binormal = tangent.cross(reference).normalize();
    let normal = binormal.cross(tangent).normalize();
    (normal, binormal)
}

/// Drifting belt of particles along one edge.
#[derive(Clone, Debug)]
pub struct ConnectorBatch {
    pub edge_index: usize,
    pub source_index: usize,
    pub target_index: usize,
    pub color: Rgb,
    base_count: usize,
    rendered_count: usize,
    particles: Vec<ConnectorParticle>,
    transforms: Vec<Mat4>,
}

impl ConnectorBatch {
    pub fn generate(
        edge_index: usize,
        source_index: usize,
        target_index: usize,
        color: Rgb,
        length: f32,
        config: &ConnectorConfig,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let base_count = base_count_for_length(length, config);
        let particles = (0..base_count)
            .map(|index| sample_particle(&mut rng, index, config))
            .collect::<Vec<_>>();

        Self {
            edge_index,
            source_index,
            target_index,
            color,
            base_count,
            rendered_count: base_count,
            particles,
            transforms: vec![Mat4::IDENTITY; base_count],
        }
    }

    pub fn base_count(&self) -> usize {
        self.base_count
    }

    pub fn rendered_count(&self) -> usize {
        self.rendered_count
    }

    pub fn particles(&self) -> &[ConnectorParticle] {
        &self.particles
    }

    /// Transforms of the particles drawn this frame.
    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms[..self.rendered_count]
    }

    /// Rewrites the first `rendered_count` transforms in place for the current
    /// endpoint positions. Nothing is allocated.
    pub fn update(
        &mut self,
        source: Vec3,
        target: Vec3,
        elapsed_secs: f32,
        speed_multiplier: f32,
        rendered_count: usize,
        particle_size: f32,
    ) {
        self.rendered_count = rendered_count.min(self.base_count);

        let path = target - source;
        let (normal, binormal) = path_frame(path);

        for (particle, transform) in self
            .particles
            .iter()
            .zip(self.transforms.iter_mut())
            .take(self.rendered_count)
        {
            let t = (particle.phase + elapsed_secs * particle.speed * speed_multiplier).rem_euclid(1.0);
            let offset = normal * (particle.angle.cos() * particle.radial_offset)
                + binormal * (particle.angle.sin() * particle.radial_offset);
            let position = source + path * t + offset;

            let spin = Quat::from_axis_angle(
                particle.spin_axis,
                elapsed_secs * particle.spin_speed + particle.spin_phase,
            );

            *transform =
                Mat4::from_scale_rotation_translation(particle.scale * particle_size, spin, position);
        }
    }
}

fn sample_particle(rng: &mut StdRng, index: usize, config: &ConnectorConfig) -> ConnectorParticle {
    let scale = Vec3::new(
        config.scale_min + rng.r#gen::<f32>() * config.scale_range,
        config.scale_min + rng.r#gen::<f32>() * config.scale_range,
        config.scale_min + rng.r#gen::<f32>() * config.scale_range,
    );
    let spin_axis = Vec3::new(
        rng.r#gen::<f32>() - 0.5,
        rng.r#gen::<f32>() - 0.5,
        rng.r#gen::<f32>() - 0.5,
    )
    .try_normalize()
    .unwrap_or(Vec3::Y);
    let brightness = BRIGHTNESS_PALETTE[rng.gen_range(0..BRIGHTNESS_PALETTE.len())]
        * (1.2 + rng.r#gen::<f32>() * 0.6);

    ConnectorParticle {
        phase: rng.r#gen::<f32>(),
        speed: config.speed_min + rng.r#gen::<f32>() * config.speed_range,
        scale,
        radial_offset: rng.r#gen::<f32>() * config.tube_radius,
        angle: rng.r#gen::<f32>() * TAU,
        spin_axis,
        spin_speed: (rng.r#gen::<f32>() - 0.5) * 2.0,
        spin_phase: index as f32,
        brightness,
    }
}
