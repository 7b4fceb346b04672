mod molecules;
mod pairing;
mod reactant_index;
mod subpart_grid;


pub use reactant_index::ReactantIndex;
pub use subpart_grid::{SubpartGrid, SubpartIndex};

use std::collections::{BTreeSet, HashMap};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::catalog::{ReactantClassId, ReactionCatalog, SpeciesCatalog, SpeciesId};
use crate::config::PartitionConfig;
use crate::counted_volume::{CountedVolumeIndex, CountedVolumeTable, Waypoint};
use crate::error::Result;
use crate::geometry::{CompartmentId, GeometryStore, WallId};
use crate::molecule::{MoleculeId, MoleculeStore};

/// Spatial and state core of a simulation.
///
/// A partition is a cube split into uniform subpartitions. It exclusively
/// owns the geometry, the molecules, the reactant index, the counted-volume
/// table and the waypoint grid; everything else refers to them by ID.
///
/// # Re-entrancy
///
/// Every mutating operation takes `&mut self`, so while one event mutates
/// the partition no callback can hold another reference to it. Callbacks
/// fired from within an event receive at most a shared borrow and can only
/// use the read accessors; structural changes (molecule creation, vertex
/// moves) have to be queued by the driver until the event finishes.
#[derive(Debug)]
pub struct Partition<C: SpeciesCatalog = ReactionCatalog> {
    pub(crate) config: PartitionConfig,
    pub(crate) grid: SubpartGrid,
    pub(crate) geometry: GeometryStore,
    pub(crate) molecules: MoleculeStore,
    pub(crate) reactants: ReactantIndex,
    pub(crate) catalog: C,
    /// Species seen in at least one molecule so far.
    pub(crate) known_species: BTreeSet<SpeciesId>,
    /// Reactant classes the reactant index has been populated for.
    pub(crate) known_reactant_classes: BTreeSet<ReactantClassId>,
    pub(crate) paired: HashMap<MoleculeId, MoleculeId>,
    pub(crate) counted_volumes: CountedVolumeTable,
    pub(crate) waypoints: Vec<Waypoint>,
    pub(crate) waypoints_initialized: bool,
    pub(crate) compartment_cache: HashMap<CountedVolumeIndex, Option<CompartmentId>>,
    /// Auxiliary random stream, independent of the diffusion stream.
    pub(crate) rng: ChaCha8Rng,
}

impl<C: SpeciesCatalog> Partition<C> {
    /// Creates an empty partition.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: PartitionConfig, catalog: C) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            origin = ?config.origin,
            edge_length = config.edge_length,
            subparts_per_dimension = config.subparts_per_dimension(),
            "creating partition"
        );
        Ok(Self {
            grid: SubpartGrid::new(&config),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            geometry: GeometryStore::new(),
            molecules: MoleculeStore::new(),
            reactants: ReactantIndex::new(),
            catalog,
            known_species: BTreeSet::new(),
            known_reactant_classes: BTreeSet::new(),
            paired: HashMap::new(),
            counted_volumes: CountedVolumeTable::new(),
            waypoints: Vec::new(),
            waypoints_initialized: false,
            compartment_cache: HashMap::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    #[must_use]
    pub fn grid(&self) -> &SubpartGrid {
        &self.grid
    }

    #[must_use]
    pub fn geometry(&self) -> &GeometryStore {
        &self.geometry
    }

    /// Mutable access to the geometry for adding compartments and regions.
    ///
    /// Vertices must only be moved through
    /// [`MoveVertices`](crate::operations::vertex_move::MoveVertices), which
    /// keeps the spatial indices consistent.
    pub fn geometry_mut(&mut self) -> &mut GeometryStore {
        &mut self.geometry
    }

    #[must_use]
    pub fn molecules(&self) -> &MoleculeStore {
        &self.molecules
    }

    #[must_use]
    pub fn reactant_index(&self) -> &ReactantIndex {
        &self.reactants
    }

    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    #[must_use]
    pub fn counted_volumes(&self) -> &CountedVolumeTable {
        &self.counted_volumes
    }

    /// Whether points are classified against counted geometry at all.
    #[must_use]
    pub fn tracks_counted_volumes(&self) -> bool {
        self.config.use_counted_volumes && self.geometry.has_counted_objects()
    }

    /// Recomputes the subpartitions overlapped by a wall and compares them
    /// with the recorded set and with the grid's per-subpartition lists.
    ///
    /// # Errors
    ///
    /// Returns an error if the wall does not exist.
    pub fn wall_subparts_are_current(&self, wall: WallId) -> Result<bool> {
        let points = self.geometry.wall_points(wall)?;
        let expected = self.grid.subparts_overlapping_triangle(&points);
        let recorded = &self.geometry.wall(wall)?.present_in_subparts;
        let registered = (0..self.grid.num_subparts())
            .filter(|&s| self.grid.walls_in(s).contains(&wall))
            .collect::<BTreeSet<_>>();
        Ok(*recorded == expected && registered == expected)
    }

    /// Places a wall into the subpartitions it overlaps now.
    pub(crate) fn insert_wall_into_subparts(&mut self, wall: WallId) -> Result<()> {
        let points = self.geometry.wall_points(wall)?;
        let subparts = self.grid.subparts_overlapping_triangle(&points);
        self.grid.insert_wall(wall, &subparts);
        self.geometry.wall_mut(wall)?.present_in_subparts = subparts;
        Ok(())
    }

    /// Takes a wall out of every subpartition it was recorded in.
    pub(crate) fn remove_wall_from_subparts(&mut self, wall: WallId) -> Result<()> {
        let subparts = std::mem::take(&mut self.geometry.wall_mut(wall)?.present_in_subparts);
        self.grid.remove_wall(wall, &subparts);
        Ok(())
    }
}
