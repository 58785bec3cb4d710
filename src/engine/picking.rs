use glam::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        Some(Self { origin, direction })
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Distance along the ray to the first hit on the sphere, if any lies ahead.
pub fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let to_center = center - ray.origin;
    let along = to_center.dot(ray.direction);
    let closest_sq = to_center.length_squared() - along * along;
    let radius_sq = radius * radius;
    if closest_sq > radius_sq {
        return None;
    }

    let half_chord = (radius_sq - closest_sq).max(0.0).sqrt();
    let near = along - half_chord;
    let far = along + half_chord;
    if far < 0.0 {
        return None;
    }
    Some(if near >= 0.0 { near } else { far })
}

/// Nearest intersected sphere, as `(index, distance)`.
pub fn pick_nearest<I>(ray: &Ray, spheres: I) -> Option<(usize, f32)>
where
    I: IntoIterator<Item = (usize, Vec3, f32)>,
{
    spheres
        .into_iter()
        .filter_map(|(index, center, radius)| {
            ray_sphere(ray, center, radius).map(|distance| (index, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}
