use std::f32::consts::{PI, TAU};

use glam::{Vec3, vec3};
use rand::Rng;

use crate::engine::config::Dimensions;

/// Equal-area placement of point `index` of `count` on a shell of `radius`.
pub(super) fn fibonacci_shell(index: usize, count: usize, radius: f32, dimensions: Dimensions) -> Vec3 {
    let count = count.max(1) as f32;
    let offset = index as f32 + 0.5;

    match dimensions {
        Dimensions::Two => {
            let angle = offset * PI * (3.0 - 5.0_f32.sqrt());
            vec3(angle.cos() * radius, angle.sin() * radius, 0.0)
        }
        Dimensions::Three => {
            let polar = (1.0 - 2.0 * offset / count).clamp(-1.0, 1.0).acos();
            let azimuth = PI * (1.0 + 5.0_f32.sqrt()) * offset;
            vec3(
                radius * polar.sin() * azimuth.cos(),
                radius * polar.cos(),
                radius * polar.sin() * azimuth.sin(),
            )
        }
    }
}

/// Uniformly random point on a shell whose radius is drawn from
/// `[radius_min, radius_min + radius_range)`.
pub(super) fn random_shell_point<R: Rng>(
    rng: &mut R,
    radius_min: f32,
    radius_range: f32,
    dimensions: Dimensions,
) -> Vec3 {
    let radius = radius_min + rng.r#gen::<f32>() * radius_range;
    let azimuth = rng.r#gen::<f32>() * TAU;

    match dimensions {
        Dimensions::Two => vec3(azimuth.cos() * radius, azimuth.sin() * radius, 0.0),
        Dimensions::Three => {
            let polar = (2.0 * rng.r#gen::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
            vec3(
                radius * polar.sin() * azimuth.cos(),
                radius * polar.cos(),
                radius * polar.sin() * azimuth.sin(),
            )
        }
    }
}
