use glam::{Vec3, vec3};

const OCTREE_LEAF_CAPACITY: usize = 12;
const OCTREE_MAX_DEPTH: usize = 10;

#[derive(Clone, Copy, Debug)]
pub(super) struct OctBounds {
    pub(super) center: Vec3,
    pub(super) half_extent: f32,
}

impl OctBounds {
    fn from_points(points: &[Vec3]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !min.is_finite() || !max.is_finite() {
            return None;
        }

        let center = (min + max) * 0.5;
        let span = (max - min).max(Vec3::ONE);
        let half_extent = (span.max_element() * 0.5) + 1.0;

        Some(Self {
            center,
            half_extent,
        })
    }

    pub(super) fn contains(self, point: Vec3) -> bool {
        let offset = (point - self.center).abs();
        offset.max_element() <= self.half_extent
    }

    fn child(self, octant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let sign = |bit: usize| if octant & bit == 0 { -quarter } else { quarter };

        Self {
            center: self.center + vec3(sign(1), sign(2), sign(4)),
            half_extent: quarter,
        }
    }

    fn octant_for(self, point: Vec3) -> usize {
        let mut octant = 0;
        if point.x >= self.center.x {
            octant |= 1;
        }
        if point.y >= self.center.y {
            octant |= 2;
        }
        if point.z >= self.center.z {
            octant |= 4;
        }
        octant
    }

    pub(super) fn side_length(self) -> f32 {
        self.half_extent * 2.0
    }

    pub(super) fn distance_sq_to(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let gap = ((self.center - other.center).abs() - Vec3::splat(reach)).max(Vec3::ZERO);
        gap.length_squared()
    }
}

/// Barnes-Hut cell over a set of point indices.
pub(super) struct OctNode {
    pub(super) bounds: OctBounds,
    pub(super) center_of_mass: Vec3,
    pub(super) mass: f32,
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<OctNode>>; 8],
}

impl OctNode {
    pub(super) fn build(positions: &[Vec3]) -> Option<Self> {
        let bounds = OctBounds::from_points(positions)?;
        let indices = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::build_node(bounds, indices, positions, 0))
    }

    fn build_node(bounds: OctBounds, indices: Vec<usize>, positions: &[Vec3], depth: usize) -> Self {
        let mut center_of_mass = Vec3::ZERO;
        for &index in &indices {
            center_of_mass += positions[index];
        }

        let mass = indices.len() as f32;
        if mass > 0.0 {
            center_of_mass /= mass;
        }

        let mut node = Self {
            bounds,
            center_of_mass,
            mass,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= OCTREE_MAX_DEPTH || node.indices.len() <= OCTREE_LEAF_CAPACITY {
            return node;
        }

        let mut buckets = std::array::from_fn::<_, 8, _>(|_| Vec::new());
        for &index in &node.indices {
            buckets[bounds.octant_for(positions[index])].push(index);
        }

        let non_empty = buckets.iter().filter(|bucket| !bucket.is_empty()).count();
        if non_empty <= 1 {
            return node;
        }

        for (octant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }

            node.children[octant] = Some(Box::new(Self::build_node(
                bounds.child(octant),
                bucket,
                positions,
                depth + 1,
            )));
        }
        node.indices.clear();
        node
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    #[cfg(test)]
    fn leaf_index_count(&self) -> usize {
        if self.is_leaf() {
            return self.indices.len();
        }
        self.children
            .iter()
            .flatten()
            .map(|child| child.leaf_index_count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_tree() {
        assert!(OctNode::build(&[]).is_none());
    }

    #[test]
    fn non_finite_input_has_no_tree() {
        assert!(OctNode::build(&[Vec3::ZERO, Vec3::splat(f32::NAN)]).is_none());
    }

    #[test]
    fn subdivides_and_keeps_every_point() {
        let positions = (0..200)
            .map(|index| {
                let t = index as f32;
                vec3((t * 7.3).sin() * 100.0, (t * 3.1).cos() * 100.0, t - 100.0)
            })
            .collect::<Vec<_>>();
        let tree = OctNode::build(&positions).expect("tree builds");

        assert!(!tree.is_leaf());
        assert_eq!(tree.mass, 200.0);
        assert_eq!(tree.leaf_index_count(), 200);
        for position in &positions {
            assert!(tree.bounds.contains(*position));
        }
    }

    #[test]
    fn disjoint_bounds_report_gap() {
        let a = OctBounds {
            center: Vec3::ZERO,
            half_extent: 1.0,
        };
        let b = OctBounds {
            center: vec3(5.0, 0.0, 0.0),
            half_extent: 1.0,
        };
        assert!((a.distance_sq_to(b) - 9.0).abs() < 1e-5);
        assert_eq!(a.distance_sq_to(a), 0.0);
    }
}
