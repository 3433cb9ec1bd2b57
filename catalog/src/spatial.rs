//! Nearest-neighbor search over sky positions.
//!
//! Positions are embedded on the unit sphere and stored in a 3-d k-d tree.
//! Chord length between unit vectors is a monotonic function of great-circle
//! angle, so pruning on squared chord length finds the same neighbors as the
//! haversine metric. Final ordering uses the haversine separation itself.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use log::debug;
use nalgebra::Vector3;

use crate::object::CatalogObject;

/// Great-circle separation between two points, all angles in radians.
///
/// Haversine form, well conditioned for the small separations typical of
/// a finder's field of view.
pub fn haversine_rad(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    let sin_ddec = ((dec2 - dec1) * 0.5).sin();
    let sin_dra = ((ra2 - ra1) * 0.5).sin();
    let h = sin_ddec * sin_ddec + dec1.cos() * dec2.cos() * sin_dra * sin_dra;
    2.0 * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Great-circle separation between two points, all angles in degrees.
pub fn angular_separation_deg(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    haversine_rad(
        ra1.to_radians(),
        dec1.to_radians(),
        ra2.to_radians(),
        dec2.to_radians(),
    )
    .to_degrees()
}

/// Unit vector for an (RA, Dec) position given in radians.
fn unit_vector(ra: f64, dec: f64) -> Vector3<f64> {
    let cos_dec = dec.cos();
    Vector3::new(cos_dec * ra.cos(), cos_dec * ra.sin(), dec.sin())
}

#[derive(Debug, Clone)]
struct KdNode {
    /// Index into the points array
    point_idx: usize,
    left: Option<usize>,
    right: Option<usize>,
    /// Split axis (0 = x, 1 = y, 2 = z)
    axis: usize,
}

/// Candidate neighbor ordered by squared chord length, then index.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist_sq: f64,
    idx: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then(self.idx.cmp(&other.idx))
    }
}

/// Immutable nearest-neighbor index over a set of catalog objects.
///
/// `objects[i]` is the object whose position is `positions[i]` (radians)
/// and `points[i]` (unit vector). Built once, never patched.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    objects: Vec<Arc<CatalogObject>>,
    positions: Vec<(f64, f64)>,
    points: Vec<Vector3<f64>>,
    nodes: Vec<KdNode>,
    excluded: usize,
}

impl SpatialIndex {
    /// Build an index over `objects`.
    ///
    /// Objects whose position is not finite or lies outside RA [0, 360) /
    /// Dec [-90, 90] are left out and counted in [`SpatialIndex::excluded`].
    /// An empty input yields an empty index.
    pub fn build(objects: &[Arc<CatalogObject>]) -> Self {
        let mut index = Self::default();

        for obj in objects {
            if !obj.has_valid_position() {
                debug!(
                    "Excluding {} from spatial index: RA={} Dec={}",
                    obj.designation(),
                    obj.ra_deg,
                    obj.dec_deg
                );
                index.excluded += 1;
                continue;
            }
            let ra = obj.ra_deg.to_radians();
            let dec = obj.dec_deg.to_radians();
            index.objects.push(Arc::clone(obj));
            index.positions.push((ra, dec));
            index.points.push(unit_vector(ra, dec));
        }

        let mut indices: Vec<usize> = (0..index.points.len()).collect();
        index.nodes.reserve(indices.len());
        Self::build_recursive(&index.points, &mut indices, 0, &mut index.nodes);
        index
    }

    fn build_recursive(
        points: &[Vector3<f64>],
        indices: &mut [usize],
        depth: usize,
        nodes: &mut Vec<KdNode>,
    ) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }

        let axis = depth % 3;
        let median = indices.len() / 2;
        indices.select_nth_unstable_by(median, |&a, &b| {
            points[a][axis]
                .total_cmp(&points[b][axis])
                .then(a.cmp(&b))
        });

        let node_idx = nodes.len();
        nodes.push(KdNode {
            point_idx: indices[median],
            left: None,
            right: None,
            axis,
        });

        let (left_indices, right_part) = indices.split_at_mut(median);
        let right_indices = &mut right_part[1..];

        let left = Self::build_recursive(points, left_indices, depth + 1, nodes);
        let right = Self::build_recursive(points, right_indices, depth + 1, nodes);
        nodes[node_idx].left = left;
        nodes[node_idx].right = right;

        Some(node_idx)
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects left out of the index because of invalid coordinates.
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    /// Indexed objects in index order.
    pub fn objects(&self) -> &[Arc<CatalogObject>] {
        &self.objects
    }

    /// The `n` objects closest to (`ra_deg`, `dec_deg`), nearest first.
    ///
    /// `n == 0` means every indexed object; larger `n` is clamped to the
    /// index size. Equal separations are ordered by index position.
    pub fn query(&self, ra_deg: f64, dec_deg: f64, n: usize) -> Vec<Arc<CatalogObject>> {
        self.query_with_distance(ra_deg, dec_deg, n)
            .into_iter()
            .map(|(obj, _)| obj)
            .collect()
    }

    /// Like [`SpatialIndex::query`], paired with separations in degrees.
    pub fn query_with_distance(
        &self,
        ra_deg: f64,
        dec_deg: f64,
        n: usize,
    ) -> Vec<(Arc<CatalogObject>, f64)> {
        if self.is_empty() {
            return Vec::new();
        }
        let k = if n == 0 { self.len() } else { n.min(self.len()) };

        let ra = ra_deg.to_radians();
        let dec = dec_deg.to_radians();

        let candidates: Vec<usize> = if k == self.len() {
            (0..self.len()).collect()
        } else {
            let query = unit_vector(ra, dec);
            let mut heap = BinaryHeap::with_capacity(k + 1);
            self.k_nearest_recursive(0, &query, k, &mut heap);
            heap.into_iter().map(|c| c.idx).collect()
        };

        let mut results: Vec<(usize, f64)> = candidates
            .into_iter()
            .map(|i| {
                let (obj_ra, obj_dec) = self.positions[i];
                (i, haversine_rad(ra, dec, obj_ra, obj_dec))
            })
            .collect();
        results.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        results
            .into_iter()
            .map(|(i, dist)| (Arc::clone(&self.objects[i]), dist.to_degrees()))
            .collect()
    }

    fn k_nearest_recursive(
        &self,
        node_idx: usize,
        query: &Vector3<f64>,
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let node = &self.nodes[node_idx];
        let point = &self.points[node.point_idx];

        let candidate = Candidate {
            dist_sq: (point - query).norm_squared(),
            idx: node.point_idx,
        };
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }

        let diff = query[node.axis] - point[node.axis];
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(first_idx) = first {
            self.k_nearest_recursive(first_idx, query, k, heap);
        }

        // The far side can only help if the splitting plane is within reach
        if let Some(second_idx) = second {
            let worst = heap.peek().map_or(f64::INFINITY, |c| c.dist_sq);
            if heap.len() < k || diff * diff <= worst {
                self.k_nearest_recursive(second_idx, query, k, heap);
            }
        }
    }
}
