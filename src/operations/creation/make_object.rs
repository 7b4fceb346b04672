use std::collections::BTreeSet;

use crate::catalog::SpeciesCatalog;
use crate::error::{GeometryError, Result};
use crate::geometry::{
    CompartmentId, GeometryObject, ObjectId, RegionExpr, VertexData, WallGeometry,
};
use crate::math::Point3;
use crate::partition::Partition;

/// Creates a geometry object from a triangle mesh.
///
/// Walls are oriented by their vertex order; closed objects should list
/// their triangles counter-clockwise seen from outside. A region named
/// `"<name>[ALL]"` covering the whole object is always created, plus one
/// `"<name>[<region>]"` surface region per named wall subset.
pub struct MakeObject {
    name: String,
    vertices: Vec<Point3>,
    triangles: Vec<[usize; 3]>,
    is_counted: bool,
    is_movable: bool,
    volume_compartment: Option<CompartmentId>,
    surface_compartment: Option<CompartmentId>,
    surface_regions: Vec<(String, Vec<usize>)>,
}

impl MakeObject {
    /// Creates a new `MakeObject` operation for an uncounted, movable mesh.
    #[must_use]
    pub fn new(name: impl Into<String>, vertices: Vec<Point3>, triangles: Vec<[usize; 3]>) -> Self {
        Self {
            name: name.into(),
            vertices,
            triangles,
            is_counted: false,
            is_movable: true,
            volume_compartment: None,
            surface_compartment: None,
            surface_regions: Vec::new(),
        }
    }

    /// Whether the object takes part in counted-volume classification.
    #[must_use]
    pub fn counted(mut self, is_counted: bool) -> Self {
        self.is_counted = is_counted;
        self
    }

    /// Whether the object's walls may be moved by vertex moves.
    #[must_use]
    pub fn movable(mut self, is_movable: bool) -> Self {
        self.is_movable = is_movable;
        self
    }

    /// Compartments of the object's interior and of its surface.
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

    /// Adds a named surface region made of the given triangles.
    #[must_use]
    pub fn surface_region(mut self, name: impl Into<String>, sides: Vec<usize>) -> Self {
        self.surface_regions.push((name.into(), sides));
        self
    }

    /// Executes the operation, adding the object to the partition.
    ///
    /// Input is validated before anything is created.
    ///
    /// # Errors
    ///
    /// Returns an error if a vertex lies outside the partition, a triangle
    /// refers to a missing vertex or is degenerate, a surface region names
    /// a missing triangle, or a compartment does not exist.
    pub fn execute<C: SpeciesCatalog>(&self, partition: &mut Partition<C>) -> Result<ObjectId> {
        self.validate(partition)?;

        let mut object = GeometryObject::new(self.name.clone());
        object.is_counted = self.is_counted;
        object.volume_compartment = self.volume_compartment;
        object.surface_compartment = self.surface_compartment;
        let object_id = partition.geometry.add_object(object);

        let vertices: Vec<_> = self
            .vertices
            .iter()
            .map(|&point| {
                partition
                    .geometry
                    .add_vertex(VertexData::new(point, object_id))
            })
            .collect();

        let mut walls = Vec::with_capacity(self.triangles.len());
        for triangle in &self.triangles {
            let wall = partition.geometry.add_wall(
                object_id,
                triangle.map(|i| vertices[i]),
                self.is_movable,
            )?;
            partition.insert_wall_into_subparts(wall)?;
            walls.push(wall);
        }

        partition
            .geometry
            .add_region(format!("{}[ALL]", self.name), RegionExpr::Object(object_id))?;
        for (region, sides) in &self.surface_regions {
            let walls: BTreeSet<_> = sides.iter().map(|&side| walls[side]).collect();
            partition.geometry.add_region(
                format!("{}[{region}]", self.name),
                RegionExpr::Surface {
                    object: object_id,
                    walls,
                },
            )?;
        }

        if self.is_counted {
            partition.invalidate_waypoints();
            partition.reclassify_volume_molecules()?;
        }
        tracing::debug!(
            name = %self.name,
            vertices = vertices.len(),
            walls = walls.len(),
            counted = self.is_counted,
            "created geometry object"
        );
        Ok(object_id)
    }

    fn validate<C: SpeciesCatalog>(&self, partition: &Partition<C>) -> Result<()> {
        if let Some(&position) = self.vertices.iter().find(|p| !partition.grid.contains(p)) {
            return Err(GeometryError::VertexOutsidePartition { position }.into());
        }

        let count = self.vertices.len();
        for (triangle, indices) in self.triangles.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i >= count) {
                return Err(GeometryError::InvalidTriangle {
                    triangle,
                    index,
                    count,
                }
                .into());
            }
            WallGeometry::from_points(&indices.map(|i| self.vertices[i]))?;
        }

        let walls = self.triangles.len();
        for (_, sides) in &self.surface_regions {
            if let Some(&side) = sides.iter().find(|&&s| s >= walls) {
                return Err(GeometryError::InvalidRegionSide { side, count: walls }.into());
            }
        }

        for compartment in [self.volume_compartment, self.surface_compartment]
            .into_iter()
            .flatten()
        {
            partition.geometry.compartment(compartment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::ReactionCatalog;
    use crate::config::PartitionConfig;
    use crate::error::PartitionError;

    fn partition() -> Partition {
        Partition::new(PartitionConfig::default(), ReactionCatalog::new()).unwrap()
    }

    fn triangle() -> MakeObject {
        MakeObject::new(
            "tri",
            vec![
                Point3::new(-0.9, -0.9, 0.1),
                Point3::new(0.9, -0.9, 0.1),
                Point3::new(-0.9, 0.9, 0.1),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn walls_are_finalized_into_subparts() {
        let mut partition = partition();
        let object = triangle().execute(&mut partition).unwrap();
        let wall = partition.geometry().object(object).unwrap().walls[0];
        assert!(!partition.geometry().wall(wall).unwrap().present_in_subparts.is_empty());
        assert!(partition.wall_subparts_are_current(wall).unwrap());
        assert!(partition.geometry().find_region("tri[ALL]").is_some());
    }

    #[test]
    fn vertex_outside_partition_is_rejected() {
        let mut partition = partition();
        let result = MakeObject::new(
            "far",
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.5, 0.0, 0.0),
                Point3::new(0.0, 0.5, 0.0),
            ],
            vec![[0, 1, 2]],
        )
        .execute(&mut partition);
        assert!(matches!(
            result,
            Err(PartitionError::Geometry(GeometryError::VertexOutsidePartition { .. }))
        ));
        assert_eq!(partition.geometry().objects().count(), 0);
    }

    #[test]
    fn bad_triangle_index_is_rejected() {
        let mut partition = partition();
        let result = MakeObject::new("bad", vec![Point3::origin(); 3], vec![[0, 1, 3]])
            .execute(&mut partition);
        assert!(matches!(
            result,
            Err(PartitionError::Geometry(GeometryError::InvalidTriangle { index: 3, .. }))
        ));
    }

    #[test]
    fn named_surface_region() {
        let mut partition = partition();
        let object = triangle()
            .surface_region("top", vec![0])
            .execute(&mut partition)
            .unwrap();
        let region = partition.geometry().find_region("tri[top]").unwrap();
        let walls = partition.geometry().region_walls(region).unwrap();
        assert_eq!(
            walls.into_iter().collect::<Vec<_>>(),
            partition.geometry().object(object).unwrap().walls
        );
    }

    #[test]
    fn region_side_out_of_range_is_rejected() {
        let mut partition = partition();
        let result = triangle().surface_region("x", vec![1]).execute(&mut partition);
        assert!(matches!(
            result,
            Err(PartitionError::Geometry(GeometryError::InvalidRegionSide { side: 1, count: 1 }))
        ));
    }
}
