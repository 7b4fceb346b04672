use std::collections::BTreeSet;

use crate::error::GeometryError;
use crate::math::triangle::triangle_cross;
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::partition::SubpartIndex;

use super::object::ObjectId;
use super::surface_grid::SurfaceGrid;
use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for a wall in the geometry store.
    pub struct WallId;
}

/// Wall-local geometry derived from the current vertex positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallGeometry {
    /// Unit normal, `(v1 - v0) x (v2 - v0)` normalized.
    pub normal: Vector3,
    /// Unit vector along the first edge.
    pub unit_u: Vector3,
    /// `normal x unit_u`, completing the in-plane basis.
    pub unit_v: Vector3,
    /// Signed distance of the wall plane from the world origin.
    pub distance_to_origin: f64,
    pub area: f64,
}

impl WallGeometry {
    /// Computes the geometry of a triangle.
    ///
    /// # Errors
    ///
    /// Returns an error if the triangle has (near) zero area.
    pub fn from_points(points: &[Point3; 3]) -> Result<Self, GeometryError> {
        let cross = triangle_cross(points);
        let cross_len = cross.norm();
        let area = 0.5 * cross_len;
        let edge = points[1] - points[0];
        let edge_len = edge.norm();
        if cross_len < TOLERANCE || edge_len < TOLERANCE {
            return Err(GeometryError::DegenerateWall { area });
        }

        let normal = cross / cross_len;
        let unit_u = edge / edge_len;
        let unit_v = normal.cross(&unit_u);
        Ok(Self {
            normal,
            unit_u,
            unit_v,
            distance_to_origin: normal.dot(&points[0].coords),
            area,
        })
    }
}

/// Data associated with a triangular wall.
#[derive(Debug, Clone)]
pub struct WallData {
    pub vertices: [VertexId; 3],
    pub object: ObjectId,
    /// Position of this wall in its object's wall list.
    pub side: usize,
    /// Walls that are not movable veto every vertex move touching them.
    pub is_movable: bool,
    pub geometry: WallGeometry,
    /// Tile occupancy, allocated when the first surface molecule arrives.
    pub surface_grid: Option<SurfaceGrid>,
    /// Subpartitions this wall currently overlaps.
    pub present_in_subparts: BTreeSet<SubpartIndex>,
}

impl WallData {
    /// Creates a wall without a surface grid or subpartition membership.
    #[must_use]
    pub fn new(
        vertices: [VertexId; 3],
        object: ObjectId,
        side: usize,
        is_movable: bool,
        geometry: WallGeometry,
    ) -> Self {
        Self {
            vertices,
            object,
            side,
            is_movable,
            geometry,
            surface_grid: None,
            present_in_subparts: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn has_vertex(&self, vertex: VertexId) -> bool {
        self.vertices.contains(&vertex)
    }

    /// Returns the surface grid, creating it on first use.
    pub fn surface_grid_or_init(&mut self, density: f64) -> &mut SurfaceGrid {
        let area = self.geometry.area;
        self.surface_grid
            .get_or_insert_with(|| SurfaceGrid::new(area, density))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn geometry_of_tilted_triangle() {
        let pts = [
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 1.0),
            Point3::new(0.0, 2.0, 1.0),
        ];
        let g = WallGeometry::from_points(&pts).unwrap();
        assert_relative_eq!(g.area, 2.0);
        assert_relative_eq!(g.normal, Vector3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(g.unit_u, Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(g.unit_v, Vector3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(g.distance_to_origin, 1.0);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, 2.0, 2.0),
        ];
        assert!(matches!(
            WallGeometry::from_points(&pts),
            Err(GeometryError::DegenerateWall { .. })
        ));
    }
}
