use std::collections::BTreeSet;

use crate::config::PartitionConfig;
use crate::geometry::WallId;
use crate::math::intersect_3d::triangle_overlaps_box;
use crate::math::{Point3, Vector3};

/// Linear index of a subpartition: `x + y * n + z * n²`.
pub type SubpartIndex = usize;

/// Uniform grid of cubic subpartitions over the partition cube.
///
/// Besides the index arithmetic it owns, per subpartition, the set of walls
/// overlapping that cell.
#[derive(Debug, Clone)]
pub struct SubpartGrid {
    origin: Point3,
    edge_length: f64,
    inv_edge_length: f64,
    per_dimension: usize,
    walls_per_subpart: Vec<BTreeSet<WallId>>,
}

impl SubpartGrid {
    /// Creates an empty grid from a validated configuration.
    #[must_use]
    pub fn new(config: &PartitionConfig) -> Self {
        let per_dimension = config.subparts_per_dimension().max(1);
        let count = per_dimension.pow(3);
        Self {
            origin: config.origin_point(),
            edge_length: config.subpartition_edge_length,
            inv_edge_length: 1.0 / config.subpartition_edge_length,
            per_dimension,
            walls_per_subpart: vec![BTreeSet::new(); count],
        }
    }

    /// Edge length of one subpartition.
    #[must_use]
    pub fn edge_length(&self) -> f64 {
        self.edge_length
    }

    #[must_use]
    pub fn per_dimension(&self) -> usize {
        self.per_dimension
    }

    #[must_use]
    pub fn num_subparts(&self) -> usize {
        self.walls_per_subpart.len()
    }

    /// Lower-front-left corner of the partition.
    #[must_use]
    pub fn origin(&self) -> Point3 {
        self.origin
    }

    /// Upper-back-right corner of the partition.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn upper_corner(&self) -> Point3 {
        self.origin + Vector3::repeat(self.edge_length * self.per_dimension as f64)
    }

    /// Whether `pos` lies inside the partition (upper faces excluded).
    #[must_use]
    pub fn contains(&self, pos: &Point3) -> bool {
        self.subpart_coords(pos).is_some()
    }

    /// Integer cell coordinates of a position, `None` outside the partition.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn subpart_coords(&self, pos: &Point3) -> Option<[usize; 3]> {
        let rel = (pos - self.origin) * self.inv_edge_length;
        let mut coords = [0usize; 3];
        for (c, value) in coords.iter_mut().zip(rel.iter()) {
            let cell = value.floor();
            if !cell.is_finite() || cell < 0.0 || cell >= self.per_dimension as f64 {
                return None;
            }
            *c = cell as usize;
        }
        Some(coords)
    }

    /// Subpartition containing `pos`, `None` outside the partition.
    #[must_use]
    pub fn subpart_index(&self, pos: &Point3) -> Option<SubpartIndex> {
        self.subpart_coords(pos).map(|c| self.index_from_coords(c))
    }

    #[must_use]
    pub fn index_from_coords(&self, [x, y, z]: [usize; 3]) -> SubpartIndex {
        let n = self.per_dimension;
        x + y * n + z * n * n
    }

    #[must_use]
    pub fn coords_from_index(&self, index: SubpartIndex) -> [usize; 3] {
        let n = self.per_dimension;
        [index % n, (index / n) % n, index / (n * n)]
    }

    /// Lower-front-left corner of a subpartition.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn subpart_llf(&self, index: SubpartIndex) -> Point3 {
        let [x, y, z] = self.coords_from_index(index);
        self.origin + Vector3::new(x as f64, y as f64, z as f64) * self.edge_length
    }

    /// Upper-back-right corner of a subpartition.
    #[must_use]
    pub fn subpart_urb(&self, index: SubpartIndex) -> Point3 {
        self.subpart_llf(index) + Vector3::repeat(self.edge_length)
    }

    #[must_use]
    pub fn subpart_center(&self, index: SubpartIndex) -> Point3 {
        self.subpart_llf(index) + Vector3::repeat(0.5 * self.edge_length)
    }

    /// Subpartitions intersecting the box `[min, max]`, clamped to the grid.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn subparts_in_box(&self, min: &Point3, max: &Point3) -> Vec<SubpartIndex> {
        let last = (self.per_dimension - 1) as f64;
        let cell = |value: f64, axis: usize| {
            ((value - self.origin[axis]) * self.inv_edge_length)
                .floor()
                .clamp(0.0, last) as usize
        };
        let lo = [cell(min.x, 0), cell(min.y, 1), cell(min.z, 2)];
        let hi = [cell(max.x, 0), cell(max.y, 1), cell(max.z, 2)];

        let mut result = Vec::with_capacity((hi[0] - lo[0] + 1) * (hi[1] - lo[1] + 1) * (hi[2] - lo[2] + 1));
        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    result.push(self.index_from_coords([x, y, z]));
                }
            }
        }
        result
    }

    /// Subpartitions a triangle overlaps.
    #[must_use]
    pub fn subparts_overlapping_triangle(&self, tri: &[Point3; 3]) -> BTreeSet<SubpartIndex> {
        let min = tri[0].inf(&tri[1]).inf(&tri[2]);
        let max = tri[0].sup(&tri[1]).sup(&tri[2]);
        self.subparts_in_box(&min, &max)
            .into_iter()
            .filter(|&s| triangle_overlaps_box(tri, &self.subpart_llf(s), &self.subpart_urb(s)))
            .collect()
    }

    /// Walls overlapping a subpartition.
    #[must_use]
    pub fn walls_in(&self, index: SubpartIndex) -> &BTreeSet<WallId> {
        &self.walls_per_subpart[index]
    }

    /// Walls in any subpartition touched by the bounding box of a segment.
    #[must_use]
    pub fn walls_near_segment(&self, from: &Point3, to: &Point3) -> BTreeSet<WallId> {
        self.subparts_in_box(&from.inf(to), &from.sup(to))
            .into_iter()
            .flat_map(|s| self.walls_per_subpart[s].iter().copied())
            .collect()
    }

    pub fn insert_wall(&mut self, wall: WallId, subparts: &BTreeSet<SubpartIndex>) {
        for &s in subparts {
            self.walls_per_subpart[s].insert(wall);
        }
    }

    pub fn remove_wall(&mut self, wall: WallId, subparts: &BTreeSet<SubpartIndex>) {
        for &s in subparts {
            self.walls_per_subpart[s].remove(&wall);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> SubpartGrid {
        // origin -1, edge 2, subpart edge 0.5: 4 per dimension
        SubpartGrid::new(&PartitionConfig::default())
    }

    #[test]
    fn index_round_trip() {
        let g = grid();
        assert_eq!(g.num_subparts(), 64);
        for index in 0..g.num_subparts() {
            assert_eq!(g.index_from_coords(g.coords_from_index(index)), index);
            let center = g.subpart_center(index);
            assert_eq!(g.subpart_index(&center), Some(index));
        }
    }

    #[test]
    fn positions_map_by_integer_division() {
        let g = grid();
        assert_eq!(g.subpart_index(&Point3::new(-1.0, -1.0, -1.0)), Some(0));
        assert_eq!(g.subpart_index(&Point3::new(-0.4, -1.0, -1.0)), Some(1));
        assert_eq!(g.subpart_index(&Point3::new(-1.0, -0.4, -1.0)), Some(4));
        assert_eq!(g.subpart_index(&Point3::new(-1.0, -1.0, -0.4)), Some(16));
        assert_eq!(g.subpart_index(&Point3::new(0.99, 0.99, 0.99)), Some(63));
    }

    #[test]
    fn outside_positions_have_no_index() {
        let g = grid();
        assert_eq!(g.subpart_index(&Point3::new(1.0, 0.0, 0.0)), None);
        assert_eq!(g.subpart_index(&Point3::new(0.0, -1.5, 0.0)), None);
        assert_eq!(g.subpart_index(&Point3::new(f64::NAN, 0.0, 0.0)), None);
    }

    #[test]
    fn llf_recovers_cell_corner() {
        let g = grid();
        assert_relative_eq!(g.subpart_llf(21), Point3::new(-0.5, -0.5, -0.5));
        assert_relative_eq!(g.upper_corner(), Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn box_query_is_clamped() {
        let g = grid();
        let all = g.subparts_in_box(&Point3::new(-5.0, -5.0, -5.0), &Point3::new(5.0, 5.0, 5.0));
        assert_eq!(all.len(), 64);
        let one = g.subparts_in_box(&Point3::new(-0.9, -0.9, -0.9), &Point3::new(-0.8, -0.8, -0.8));
        assert_eq!(one, vec![0]);
    }

    #[test]
    fn triangle_in_plane_overlaps_a_layer_of_cells() {
        let g = grid();
        let tri = [
            Point3::new(-0.9, -0.9, 0.25),
            Point3::new(0.85, -0.9, 0.25),
            Point3::new(-0.9, 0.85, 0.25),
        ];
        let subparts = g.subparts_overlapping_triangle(&tri);
        // z = 0.25 lies in layer 2; the hypotenuse x + y = -0.05 leaves
        // the cells with i + j <= 3 of the 4x4 layer.
        assert!(subparts.iter().all(|&s| g.coords_from_index(s)[2] == 2));
        assert_eq!(subparts.len(), 10);
    }
}
