use crate::catalog::SpeciesCatalog;
use crate::error::Result;
use crate::geometry::{CompartmentId, ObjectId};
use crate::math::Point3;
use crate::partition::Partition;

use super::MakeObject;

/// Corner `i` of the box takes max x if bit 0 is set, max y for bit 1 and
/// max z for bit 2. Two triangles per face, normals pointing outwards.
const BOX_TRIANGLES: [[usize; 3]; 12] = [
    [0, 2, 1],
    [1, 2, 3],
    [4, 5, 6],
    [5, 7, 6],
    [0, 1, 4],
    [1, 5, 4],
    [2, 6, 3],
    [3, 6, 7],
    [0, 4, 2],
    [2, 4, 6],
    [1, 3, 5],
    [3, 7, 5],
];

/// Creates a closed, axis-aligned box object from two corner points.
pub struct MakeBox {
    name: String,
    min_corner: Point3,
    max_corner: Point3,
    is_counted: bool,
    is_movable: bool,
    volume_compartment: Option<CompartmentId>,
    surface_compartment: Option<CompartmentId>,
}

impl MakeBox {
    /// Creates a new `MakeBox` operation for a counted, movable box.
    #[must_use]
    pub fn new(name: impl Into<String>, min_corner: Point3, max_corner: Point3) -> Self {
        Self {
            name: name.into(),
            min_corner,
            max_corner,
            is_counted: true,
            is_movable: true,
            volume_compartment: None,
            surface_compartment: None,
        }
    }

    #[must_use]
    pub fn counted(mut self, is_counted: bool) -> Self {
        self.is_counted = is_counted;
        self
    }

    #[must_use]
    pub fn movable(mut self, is_movable: bool) -> Self {
        self.is_movable = is_movable;
        self
    }

    #[must_use]
    pub fn compartments(
        mut self,
        volume: Option<CompartmentId>,
        surface: Option<CompartmentId>,
    ) -> Self {
        self.volume_compartment = volume;
        self.surface_compartment = surface;
        self
    }

    /// Executes the operation, adding the box to the partition.
    ///
    /// Vertex `i` of the object is corner `i` of the box, see the bit
    /// layout above.
    ///
    /// # Errors
    ///
    /// Returns an error if the box is flat or does not fit into the
    /// partition.
    pub fn execute<C: SpeciesCatalog>(&self, partition: &mut Partition<C>) -> Result<ObjectId> {
        let (lo, hi) = (self.min_corner, self.max_corner);
        let vertices = (0..8)
            .map(|i| {
                Point3::new(
                    if i & 1 == 0 { lo.x } else { hi.x },
                    if i & 2 == 0 { lo.y } else { hi.y },
                    if i & 4 == 0 { lo.z } else { hi.z },
                )
            })
            .collect();
        MakeObject::new(self.name.clone(), vertices, BOX_TRIANGLES.to_vec())
            .counted(self.is_counted)
            .movable(self.is_movable)
            .compartments(self.volume_compartment, self.surface_compartment)
            .execute(partition)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::ReactionCatalog;
    use crate::config::PartitionConfig;
    use crate::math::Vector3;
    use approx::assert_relative_eq;

    #[test]
    fn box_normals_point_outwards() {
        let mut partition = Partition::new(PartitionConfig::default(), ReactionCatalog::new()).unwrap();
        let object = MakeBox::new("box", Point3::new(-0.3, -0.3, -0.3), Point3::new(0.3, 0.3, 0.3))
            .execute(&mut partition)
            .unwrap();
        let geometry = partition.geometry();
        let walls = &geometry.object(object).unwrap().walls;
        assert_eq!(walls.len(), 12);

        let center = Point3::origin();
        let mut total_area = 0.0;
        for &wall in walls {
            let data = geometry.wall(wall).unwrap();
            let points = geometry.wall_points(wall).unwrap();
            let outward: Vector3 = points[0] - center;
            assert!(data.geometry.normal.dot(&outward) > 0.0);
            total_area += data.geometry.area;
        }
        assert_relative_eq!(total_area, 6.0 * 0.36, epsilon = 1e-12);
    }
}
