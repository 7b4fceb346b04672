use super::compartment::CompartmentId;
use super::region::RegionId;
use super::vertex::VertexId;
use super::wall::WallId;

slotmap::new_key_type! {
    /// Unique identifier for a geometry object in the geometry store.
    pub struct ObjectId;
}

/// A named, closed or open triangle mesh.
#[derive(Debug, Clone)]
pub struct GeometryObject {
    pub name: String,
    /// Vertices owned by this object.
    pub vertices: Vec<VertexId>,
    /// Walls in side order; a wall's `side` indexes this list.
    pub walls: Vec<WallId>,
    /// Whether points inside this object are tracked by counted volumes.
    pub is_counted: bool,
    /// Volume compartment enclosed by the object, if any.
    pub volume_compartment: Option<CompartmentId>,
    /// Surface compartment formed by the object's walls, if any.
    pub surface_compartment: Option<CompartmentId>,
    /// Regions defined on this object, the whole-object region first.
    pub regions: Vec<RegionId>,
}

impl GeometryObject {
    /// Creates an empty, uncounted object.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
            walls: Vec::new(),
            is_counted: false,
            volume_compartment: None,
            surface_compartment: None,
            regions: Vec::new(),
        }
    }
}
