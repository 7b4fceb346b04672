use std::collections::BTreeSet;

use super::object::ObjectId;
use super::wall::WallId;

slotmap::new_key_type! {
    /// Unique identifier for a region in the geometry store.
    pub struct RegionId;
}

/// Boolean expression defining a region.
///
/// Operands always refer to regions created earlier, so expressions are
/// acyclic.
#[derive(Debug, Clone)]
pub enum RegionExpr {
    /// The whole object: its volume and all of its walls.
    Object(ObjectId),
    /// A named subset of one object's walls.
    Surface {
        object: ObjectId,
        walls: BTreeSet<WallId>,
    },
    Union(RegionId, RegionId),
    Difference(RegionId, RegionId),
    Intersection(RegionId, RegionId),
}

/// Data associated with a region.
#[derive(Debug, Clone)]
pub struct RegionData {
    pub name: String,
    pub expr: RegionExpr,
}
