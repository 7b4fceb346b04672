use crate::math::Point3;

use super::object::ObjectId;

slotmap::new_key_type! {
    /// Unique identifier for a vertex in the geometry store.
    pub struct VertexId;
}

/// Data associated with a mesh vertex.
///
/// A vertex belongs to exactly one geometry object and is shared by every
/// wall of that object that uses it.
#[derive(Debug, Clone)]
pub struct VertexData {
    /// The 3D position of the vertex.
    pub point: Point3,
    /// The object owning this vertex.
    pub object: ObjectId,
}

impl VertexData {
    /// Creates a new vertex of `object` at the given point.
    #[must_use]
    pub fn new(point: Point3, object: ObjectId) -> Self {
        Self { point, object }
    }
}
