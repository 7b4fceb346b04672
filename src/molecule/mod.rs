mod store;

pub use store::MoleculeStore;

use std::fmt;

use crate::catalog::SpeciesId;
use crate::counted_volume::CountedVolumeIndex;
use crate::geometry::{CompartmentId, TileIndex, WallId};
use crate::math::{Point2, Point3};
use crate::partition::SubpartIndex;

/// Stable molecule identifier, independent of the storage slot.
///
/// IDs increase monotonically and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MoleculeId(pub u64);

impl fmt::Display for MoleculeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of a molecule diffusing in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeMolecule {
    pub position: Point3,
    /// Subpartition containing `position`.
    pub subpart: SubpartIndex,
    /// Subpartition under which the reactant index currently files this
    /// molecule; lags behind `subpart` until synchronized.
    pub reactant_subpart: SubpartIndex,
    pub counted_volume: CountedVolumeIndex,
}

/// State of a molecule bound to a wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMolecule {
    pub wall: WallId,
    pub tile: TileIndex,
    /// Barycentric position on the wall, see
    /// [`barycentric`](crate::math::triangle::barycentric).
    pub barycentric: Point2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoleculeKind {
    Volume(VolumeMolecule),
    Surface(SurfaceMolecule),
}

/// A single molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    pub id: MoleculeId,
    pub species: SpeciesId,
    pub compartment: Option<CompartmentId>,
    pub kind: MoleculeKind,
    defunct: bool,
}

impl Molecule {
    #[must_use]
    pub fn new(
        id: MoleculeId,
        species: SpeciesId,
        compartment: Option<CompartmentId>,
        kind: MoleculeKind,
    ) -> Self {
        Self {
            id,
            species,
            compartment,
            kind,
            defunct: false,
        }
    }

    #[must_use]
    pub fn is_defunct(&self) -> bool {
        self.defunct
    }

    #[must_use]
    pub fn is_volume(&self) -> bool {
        matches!(self.kind, MoleculeKind::Volume(_))
    }

    #[must_use]
    pub fn is_surface(&self) -> bool {
        matches!(self.kind, MoleculeKind::Surface(_))
    }

    #[must_use]
    pub fn as_volume(&self) -> Option<&VolumeMolecule> {
        match &self.kind {
            MoleculeKind::Volume(vm) => Some(vm),
            MoleculeKind::Surface(_) => None,
        }
    }

    pub fn as_volume_mut(&mut self) -> Option<&mut VolumeMolecule> {
        match &mut self.kind {
            MoleculeKind::Volume(vm) => Some(vm),
            MoleculeKind::Surface(_) => None,
        }
    }

    #[must_use]
    pub fn as_surface(&self) -> Option<&SurfaceMolecule> {
        match &self.kind {
            MoleculeKind::Surface(sm) => Some(sm),
            MoleculeKind::Volume(_) => None,
        }
    }

    pub fn as_surface_mut(&mut self) -> Option<&mut SurfaceMolecule> {
        match &mut self.kind {
            MoleculeKind::Surface(sm) => Some(sm),
            MoleculeKind::Volume(_) => None,
        }
    }

    pub(crate) fn mark_defunct(&mut self) {
        self.defunct = true;
    }
}
