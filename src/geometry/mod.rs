pub mod compartment;
pub mod object;
pub mod region;
pub mod surface_grid;
pub mod vertex;
pub mod wall;

pub use compartment::{CompartmentData, CompartmentId};
pub use object::{GeometryObject, ObjectId};
pub use region::{RegionData, RegionExpr, RegionId};
pub use surface_grid::{SurfaceGrid, TileIndex};
pub use vertex::{VertexData, VertexId};
pub use wall::{WallData, WallGeometry, WallId};

use std::collections::BTreeSet;

use crate::error::GeometryError;
use crate::math::Point3;
use slotmap::{SecondaryMap, SlotMap};

/// Central arena that owns all mesh entities.
///
/// Entities reference each other via typed IDs (generational indices), so
/// walls point at vertices and objects, regions at objects and other
/// regions, and compartments at each other without any ownership cycles.
/// Nothing is ever removed, so IDs stay valid for the lifetime of the store.
#[derive(Debug, Default)]
pub struct GeometryStore {
    vertices: SlotMap<VertexId, VertexData>,
    walls: SlotMap<WallId, WallData>,
    objects: SlotMap<ObjectId, GeometryObject>,
    regions: SlotMap<RegionId, RegionData>,
    compartments: SlotMap<CompartmentId, CompartmentData>,
    vertex_walls: SecondaryMap<VertexId, Vec<WallId>>,
}

impl GeometryStore {
    /// Creates a new, empty geometry store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Object operations ---

    /// Inserts an object and returns its ID.
    pub fn add_object(&mut self, data: GeometryObject) -> ObjectId {
        self.objects.insert(data)
    }

    /// Returns a reference to the object data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn object(&self, id: ObjectId) -> Result<&GeometryObject, GeometryError> {
        self.objects
            .get(id)
            .ok_or_else(|| GeometryError::EntityNotFound("object".into()))
    }

    /// Returns a mutable reference to the object data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut GeometryObject, GeometryError> {
        self.objects
            .get_mut(id)
            .ok_or_else(|| GeometryError::EntityNotFound("object".into()))
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &GeometryObject)> {
        self.objects.iter()
    }

    /// Looks up an object by name.
    #[must_use]
    pub fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find_map(|(id, obj)| (obj.name == name).then_some(id))
    }

    /// Whether any object takes part in counted volumes.
    #[must_use]
    pub fn has_counted_objects(&self) -> bool {
        self.objects.values().any(|obj| obj.is_counted)
    }

    // --- Vertex operations ---

    /// Inserts a vertex and returns its ID.
    pub fn add_vertex(&mut self, data: VertexData) -> VertexId {
        let object = data.object;
        let id = self.vertices.insert(data);
        self.vertex_walls.insert(id, Vec::new());
        if let Some(obj) = self.objects.get_mut(object) {
            obj.vertices.push(id);
        }
        id
    }

    /// Returns a reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex(&self, id: VertexId) -> Result<&VertexData, GeometryError> {
        self.vertices
            .get(id)
            .ok_or_else(|| GeometryError::EntityNotFound("vertex".into()))
    }

    /// Returns a mutable reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex_mut(&mut self, id: VertexId) -> Result<&mut VertexData, GeometryError> {
        self.vertices
            .get_mut(id)
            .ok_or_else(|| GeometryError::EntityNotFound("vertex".into()))
    }

    /// Walls using a vertex.
    #[must_use]
    pub fn walls_of_vertex(&self, id: VertexId) -> &[WallId] {
        self.vertex_walls.get(id).map_or(&[], Vec::as_slice)
    }

    /// Vertices connected to `id` by a wall edge.
    #[must_use]
    pub fn vertex_neighbors(&self, id: VertexId) -> BTreeSet<VertexId> {
        self.walls_of_vertex(id)
            .iter()
            .filter_map(|&w| self.walls.get(w))
            .flat_map(|wall| wall.vertices)
            .filter(|&v| v != id)
            .collect()
    }

    // --- Wall operations ---

    /// Creates a wall of `object` from three of its vertices.
    ///
    /// # Errors
    ///
    /// Returns an error if the object or a vertex is missing, a vertex
    /// belongs to another object, or the triangle is degenerate.
    pub fn add_wall(
        &mut self,
        object: ObjectId,
        vertices: [VertexId; 3],
        is_movable: bool,
    ) -> Result<WallId, GeometryError> {
        let mut points = [Point3::origin(); 3];
        for (point, &vertex) in points.iter_mut().zip(&vertices) {
            let data = self.vertex(vertex)?;
            if data.object != object {
                return Err(GeometryError::ForeignVertex { vertex, object });
            }
            *point = data.point;
        }
        let geometry = WallGeometry::from_points(&points)?;
        let side = self.object(object)?.walls.len();

        let id = self
            .walls
            .insert(WallData::new(vertices, object, side, is_movable, geometry));
        self.object_mut(object)?.walls.push(id);
        for vertex in vertices {
            if let Some(walls) = self.vertex_walls.get_mut(vertex) {
                walls.push(id);
            }
        }
        Ok(id)
    }

    /// Returns a reference to the wall data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn wall(&self, id: WallId) -> Result<&WallData, GeometryError> {
        self.walls
            .get(id)
            .ok_or_else(|| GeometryError::EntityNotFound("wall".into()))
    }

    /// Returns a mutable reference to the wall data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn wall_mut(&mut self, id: WallId) -> Result<&mut WallData, GeometryError> {
        self.walls
            .get_mut(id)
            .ok_or_else(|| GeometryError::EntityNotFound("wall".into()))
    }

    pub fn walls(&self) -> impl Iterator<Item = (WallId, &WallData)> {
        self.walls.iter()
    }

    /// Current corner positions of a wall.
    ///
    /// # Errors
    ///
    /// Returns an error if the wall or one of its vertices is missing.
    pub fn wall_points(&self, id: WallId) -> Result<[Point3; 3], GeometryError> {
        let wall = self.wall(id)?;
        Ok([
            self.vertex(wall.vertices[0])?.point,
            self.vertex(wall.vertices[1])?.point,
            self.vertex(wall.vertices[2])?.point,
        ])
    }

    /// Recomputes a wall's normal, basis and area from its vertices.
    ///
    /// A wall that collapsed to zero area keeps its previous geometry.
    /// Returns the area before the update.
    ///
    /// # Errors
    ///
    /// Returns an error if the wall or one of its vertices is missing.
    pub fn update_wall_geometry(&mut self, id: WallId) -> Result<f64, GeometryError> {
        let points = self.wall_points(id)?;
        let wall = self.wall_mut(id)?;
        let previous_area = wall.geometry.area;
        match WallGeometry::from_points(&points) {
            Ok(geometry) => wall.geometry = geometry,
            Err(err) => tracing::warn!(wall = ?id, %err, "wall degenerated, keeping previous geometry"),
        }
        Ok(previous_area)
    }

    // --- Region operations ---

    /// Inserts a region and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression refers to a missing object,
    /// region or wall, or a surface region lists a wall of another object.
    pub fn add_region(
        &mut self,
        name: impl Into<String>,
        expr: RegionExpr,
    ) -> Result<RegionId, GeometryError> {
        match &expr {
            RegionExpr::Object(object) => {
                self.object(*object)?;
            }
            RegionExpr::Surface { object, walls } => {
                for &wall in walls {
                    if self.wall(wall)?.object != *object {
                        return Err(GeometryError::ForeignWall(wall));
                    }
                }
            }
            RegionExpr::Union(a, b)
            | RegionExpr::Difference(a, b)
            | RegionExpr::Intersection(a, b) => {
                self.region(*a)?;
                self.region(*b)?;
            }
        }
        let object = match &expr {
            RegionExpr::Object(object) | RegionExpr::Surface { object, .. } => Some(*object),
            _ => None,
        };
        let id = self.regions.insert(RegionData {
            name: name.into(),
            expr,
        });
        if let Some(object) = object {
            self.object_mut(object)?.regions.push(id);
        }
        Ok(id)
    }

    /// Returns a reference to the region data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn region(&self, id: RegionId) -> Result<&RegionData, GeometryError> {
        self.regions
            .get(id)
            .ok_or_else(|| GeometryError::EntityNotFound("region".into()))
    }

    /// Looks up a region by name.
    #[must_use]
    pub fn find_region(&self, name: &str) -> Option<RegionId> {
        self.regions
            .iter()
            .find_map(|(id, region)| (region.name == name).then_some(id))
    }

    /// Evaluates a region expression to the set of walls it covers.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is missing.
    pub fn region_walls(&self, id: RegionId) -> Result<BTreeSet<WallId>, GeometryError> {
        Ok(match &self.region(id)?.expr {
            RegionExpr::Object(object) => self.object(*object)?.walls.iter().copied().collect(),
            RegionExpr::Surface { walls, .. } => walls.clone(),
            RegionExpr::Union(a, b) => &self.region_walls(*a)? | &self.region_walls(*b)?,
            RegionExpr::Difference(a, b) => &self.region_walls(*a)? - &self.region_walls(*b)?,
            RegionExpr::Intersection(a, b) => &self.region_walls(*a)? & &self.region_walls(*b)?,
        })
    }

    /// Whether a point lying inside exactly the objects in `containing` is
    /// inside the volume described by a region.
    ///
    /// Surface regions enclose no volume.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced region is missing.
    pub fn region_contains(
        &self,
        id: RegionId,
        containing: &BTreeSet<ObjectId>,
    ) -> Result<bool, GeometryError> {
        Ok(match &self.region(id)?.expr {
            RegionExpr::Object(object) => containing.contains(object),
            RegionExpr::Surface { .. } => false,
            RegionExpr::Union(a, b) => {
                self.region_contains(*a, containing)? || self.region_contains(*b, containing)?
            }
            RegionExpr::Difference(a, b) => {
                self.region_contains(*a, containing)? && !self.region_contains(*b, containing)?
            }
            RegionExpr::Intersection(a, b) => {
                self.region_contains(*a, containing)? && self.region_contains(*b, containing)?
            }
        })
    }

    // --- Compartment operations ---

    /// Inserts a compartment below `parent` and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent does not exist.
    pub fn add_compartment(
        &mut self,
        name: impl Into<String>,
        is_3d: bool,
        parent: Option<CompartmentId>,
    ) -> Result<CompartmentId, GeometryError> {
        if let Some(parent) = parent {
            self.compartment(parent)?;
        }
        let id = self
            .compartments
            .insert(CompartmentData::new(name, is_3d, parent));
        if let Some(parent) = parent.and_then(|p| self.compartments.get_mut(p)) {
            parent.children.push(id);
        }
        Ok(id)
    }

    /// Returns a reference to the compartment data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn compartment(&self, id: CompartmentId) -> Result<&CompartmentData, GeometryError> {
        self.compartments
            .get(id)
            .ok_or_else(|| GeometryError::EntityNotFound("compartment".into()))
    }

    /// Looks up a compartment by name.
    #[must_use]
    pub fn find_compartment(&self, name: &str) -> Option<CompartmentId> {
        self.compartments
            .iter()
            .find_map(|(id, c)| (c.name == name).then_some(id))
    }
}
