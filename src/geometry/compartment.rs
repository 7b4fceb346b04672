slotmap::new_key_type! {
    /// Unique identifier for a compartment in the geometry store.
    pub struct CompartmentId;
}

/// A node of the compartment hierarchy.
///
/// Volume (3D) and surface (2D) compartments alternate along the
/// hierarchy: a 3D compartment's children are the 2D compartments bounding
/// the volumes nested in it, whose own children are those inner 3D
/// compartments.
#[derive(Debug, Clone)]
pub struct CompartmentData {
    pub name: String,
    pub is_3d: bool,
    pub parent: Option<CompartmentId>,
    pub children: Vec<CompartmentId>,
}

impl CompartmentData {
    /// Creates a compartment without children.
    #[must_use]
    pub fn new(name: impl Into<String>, is_3d: bool, parent: Option<CompartmentId>) -> Self {
        Self {
            name: name.into(),
            is_3d,
            parent,
            children: Vec::new(),
        }
    }
}
