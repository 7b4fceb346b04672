use thiserror::Error;

use crate::catalog::SpeciesId;
use crate::geometry::{ObjectId, RegionId, VertexId, WallId};
use crate::math::Point3;
use crate::molecule::MoleculeId;

/// Top-level error type for the partition core.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Molecule(#[from] MoleculeError),

    #[error(transparent)]
    Pairing(#[from] PairingError),

    #[error(transparent)]
    VertexMove(#[from] VertexMoveError),
}

impl PartitionError {
    /// Returns `true` for errors that signal a programming error upstream.
    ///
    /// The driver is expected to terminate the run on these instead of
    /// trying to recover.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Molecule(MoleculeError::OutsidePartition { .. })
                | Self::VertexMove(VertexMoveError::DuplicateVertex(_))
        )
    }
}

/// Errors in the partition configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error(
        "partition edge length {edge_length} is not a multiple of the subpartition edge length {subpartition_edge_length}"
    )]
    NotMultipleOfSubpartition {
        edge_length: f64,
        subpartition_edge_length: f64,
    },

    #[error("partition origin {axis} = {value} does not lie on the subpartition grid")]
    MisalignedOrigin { axis: char, value: f64 },
}

/// Errors related to the geometry store.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("degenerate wall with area {area}")]
    DegenerateWall { area: f64 },

    #[error("vertex at {position} lies outside the partition")]
    VertexOutsidePartition { position: Point3 },

    #[error("vertex {vertex:?} does not belong to object {object:?}")]
    ForeignVertex { vertex: VertexId, object: ObjectId },

    #[error("triangle {triangle} references vertex index {index} out of {count}")]
    InvalidTriangle {
        triangle: usize,
        index: usize,
        count: usize,
    },

    #[error("surface region refers to side {side} of an object with {count} walls")]
    InvalidRegionSide { side: usize, count: usize },

    #[error("region {0:?} is not a surface region of a single object")]
    NotSurfaceRegion(RegionId),

    #[error("wall {0:?} does not belong to the requested object")]
    ForeignWall(WallId),
}

/// Errors related to molecule creation and lookup.
#[derive(Debug, Error)]
pub enum MoleculeError {
    #[error("molecule position {position} lies outside the partition")]
    OutsidePartition { position: Point3 },

    #[error("molecule with id {0} does not exist")]
    NotFound(MoleculeId),

    #[error("molecule id {0} is already in use")]
    IdInUse(MoleculeId),

    #[error("molecule id {0} may belong to a removed molecule and cannot be reused")]
    IdRetired(MoleculeId),

    #[error("species {0:?} is not known to the catalog")]
    UnknownSpecies(SpeciesId),

    #[error("species {0:?} is a surface species, not a volume species")]
    NotVolumeSpecies(SpeciesId),

    #[error("species {0:?} is a volume species, not a surface species")]
    NotSurfaceSpecies(SpeciesId),

    #[error("molecule with id {0} is not a volume molecule")]
    NotVolumeMolecule(MoleculeId),

    #[error("barycentric coordinates ({u}, {v}) lie outside the wall")]
    OutsideWall { u: f64, v: f64 },

    #[error("tile {tile} of wall {wall:?} is already occupied by molecule {occupant}")]
    TileOccupied {
        wall: WallId,
        tile: usize,
        occupant: MoleculeId,
    },

    #[error("wall {0:?} has no free surface tile")]
    NoFreeTile(WallId),

    #[error("object {0:?} has no walls")]
    NoWalls(ObjectId),
}

/// Recoverable errors of pairing requests.
///
/// The `Display` text is the human-readable message handed back to
/// callbacks and the binding layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairingError {
    #[error("Molecule with id {0} does not exist.")]
    MoleculeNotFound(MoleculeId),

    #[error("Molecule with id {0} is not a surface molecule.")]
    NotSurfaceMolecule(MoleculeId),

    #[error("Molecule with id {molecule} is already paired with molecule {partner}.")]
    AlreadyPaired {
        molecule: MoleculeId,
        partner: MoleculeId,
    },

    #[error("Molecules {first} and {second} are both on object '{object}', paired molecules must be on different objects.")]
    SameObject {
        first: MoleculeId,
        second: MoleculeId,
        object: String,
    },

    #[error("Molecules {first} and {second} are not paired with each other.")]
    NotPaired {
        first: MoleculeId,
        second: MoleculeId,
    },
}

/// Errors related to vertex-move batches.
#[derive(Debug, Error)]
pub enum VertexMoveError {
    #[error("vertex {0:?} was requested to move more than once in a single batch")]
    DuplicateVertex(VertexId),

    #[error("vertex {0:?} does not exist")]
    UnknownVertex(VertexId),
}

/// Convenience type alias for results using [`PartitionError`].
pub type Result<T> = std::result::Result<T, PartitionError>;
