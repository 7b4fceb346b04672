use std::collections::BTreeSet;

use crate::catalog::{ReactantClassId, SpeciesCatalog, SpeciesId, SpeciesInfo};
use crate::counted_volume::CountedVolumeIndex;
use crate::error::{MoleculeError, Result};
use crate::geometry::{CompartmentId, ObjectId, WallId};
use crate::math::triangle::{barycentric, closest_point_on_triangle, point_from_barycentric};
use crate::math::{Point2, Point3, BARYCENTRIC_TOLERANCE};
use crate::molecule::{Molecule, MoleculeId, MoleculeKind, SurfaceMolecule, VolumeMolecule};
use crate::scheduler::{EventScheduler, MoleculeRouting};

use super::{Partition, SubpartIndex};

impl<C: SpeciesCatalog> Partition<C> {
    // --- Creation ---

    /// Adds a volume molecule at `position`.
    ///
    /// The molecule's compartment is derived from the counted volume its
    /// position lies in.
    ///
    /// # Errors
    ///
    /// Returns [`MoleculeError::OutsidePartition`] if `position` lies
    /// outside the partition (a fatal error, see
    /// [`PartitionError::is_fatal`](crate::error::PartitionError::is_fatal)),
    /// or an error if the species is unknown or is a surface species.
    pub fn add_volume_molecule(&mut self, species: SpeciesId, position: Point3) -> Result<MoleculeId> {
        self.add_volume_molecule_with_id(None, species, position)
    }

    /// Adds a volume molecule, optionally with an ID taken from a checkpoint.
    ///
    /// # Errors
    ///
    /// See [`add_volume_molecule`](Self::add_volume_molecule); also fails if
    /// `id` is held by a stored molecule.
    pub fn add_volume_molecule_with_id(
        &mut self,
        id: Option<MoleculeId>,
        species: SpeciesId,
        position: Point3,
    ) -> Result<MoleculeId> {
        let Some(subpart) = self.grid.subpart_index(&position) else {
            return Err(MoleculeError::OutsidePartition { position }.into());
        };
        if self.species_info(species)?.is_surface {
            return Err(MoleculeError::NotVolumeSpecies(species).into());
        }

        let counted_volume = self.counted_volume_at(&position)?;
        let compartment = self.compartment_of_counted_volume(counted_volume);
        let id = self.molecules.reserve_id(id)?;
        self.register_species(species);

        let molecule = Molecule::new(
            id,
            species,
            compartment,
            MoleculeKind::Volume(VolumeMolecule {
                position,
                subpart,
                reactant_subpart: subpart,
                counted_volume,
            }),
        );
        let schedulable = self.species_info(species)?.can_initiate_events();
        self.molecules.insert(molecule, schedulable);

        for class in self.indexed_classes(species) {
            self.reactants.insert(class, subpart, id);
        }
        tracing::trace!(%id, ?species, subpart, "added volume molecule");
        Ok(id)
    }

    /// Adds a surface molecule to `wall` at barycentric position `(u, v)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the species is unknown or not a surface species,
    /// the wall does not exist, `(u, v)` lies outside the wall, or the tile
    /// under `(u, v)` is occupied.
    pub fn add_surface_molecule(
        &mut self,
        species: SpeciesId,
        wall: WallId,
        barycentric: Point2,
    ) -> Result<MoleculeId> {
        self.add_surface_molecule_with_id(None, species, wall, barycentric)
    }

    /// Adds a surface molecule, optionally with an ID taken from a checkpoint.
    ///
    /// # Errors
    ///
    /// See [`add_surface_molecule`](Self::add_surface_molecule); also fails
    /// if `id` is held by a stored molecule.
    pub fn add_surface_molecule_with_id(
        &mut self,
        id: Option<MoleculeId>,
        species: SpeciesId,
        wall: WallId,
        barycentric: Point2,
    ) -> Result<MoleculeId> {
        let (u, v) = (barycentric.x, barycentric.y);
        if u < -BARYCENTRIC_TOLERANCE
            || v < -BARYCENTRIC_TOLERANCE
            || u + v > 1.0 + BARYCENTRIC_TOLERANCE
        {
            return Err(MoleculeError::OutsideWall { u, v }.into());
        }
        if !self.species_info(species)?.is_surface {
            return Err(MoleculeError::NotSurfaceSpecies(species).into());
        }

        let density = self.config.surface_grid_density;
        let wall_data = self.geometry.wall_mut(wall)?;
        let grid = wall_data.surface_grid_or_init(density);
        let tile = grid.tile_for_barycentric(u, v);
        if let Some(occupant) = grid.occupant(tile) {
            return Err(MoleculeError::TileOccupied {
                wall,
                tile,
                occupant,
            }
            .into());
        }
        let object = wall_data.object;

        let id = self.molecules.reserve_id(id)?;
        if let Some(grid) = self.geometry.wall_mut(wall)?.surface_grid.as_mut() {
            grid.occupy(tile, id).map_err(|occupant| MoleculeError::TileOccupied {
                wall,
                tile,
                occupant,
            })?;
        }
        self.register_species(species);

        let compartment = self.geometry.object(object)?.surface_compartment;
        let molecule = Molecule::new(
            id,
            species,
            compartment,
            MoleculeKind::Surface(SurfaceMolecule {
                wall,
                tile,
                barycentric,
            }),
        );
        let schedulable = self.species_info(species)?.can_initiate_events();
        self.molecules.insert(molecule, schedulable);
        tracing::trace!(%id, ?species, ?wall, tile, "added surface molecule");
        Ok(id)
    }

    /// Adds a surface molecule on the wall of `object` closest to `position`,
    /// on the free tile closest to the projected point.
    ///
    /// # Errors
    ///
    /// Returns an error if the object has no walls, the species is not a
    /// surface species, or the chosen wall has no free tile.
    pub fn add_surface_molecule_at(
        &mut self,
        species: SpeciesId,
        object: ObjectId,
        position: &Point3,
    ) -> Result<MoleculeId> {
        let (wall, closest) = self
            .find_closest_wall(position, Some(object))?
            .ok_or(MoleculeError::NoWalls(object))?;
        let points = self.geometry.wall_points(wall)?;
        let (u, v) = barycentric(&closest, &points).unwrap_or((0.0, 0.0));

        let density = self.config.surface_grid_density;
        let grid = self.geometry.wall_mut(wall)?.surface_grid_or_init(density);
        let tile = grid.tile_for_barycentric(u, v);
        let position = if grid.occupant(tile).is_none() {
            Point2::new(u, v)
        } else {
            let free = grid
                .nearest_free_tile(u, v)
                .ok_or(MoleculeError::NoFreeTile(wall))?;
            let (cu, cv) = grid.tile_center(free);
            Point2::new(cu, cv)
        };
        self.add_surface_molecule(species, wall, position)
    }

    // --- Removal ---

    /// Marks a molecule defunct.
    ///
    /// A volume molecule leaves the reactant index, a surface molecule
    /// frees its tile, and any pairing is dissolved. The storage slot is
    /// reclaimed by the next [`defragment_molecules`](Self::defragment_molecules).
    ///
    /// # Errors
    ///
    /// Returns an error if the molecule does not exist.
    pub fn set_molecule_as_defunct(&mut self, id: MoleculeId) -> Result<()> {
        let molecule = self
            .molecules
            .mark_defunct(id)
            .ok_or(MoleculeError::NotFound(id))?;

        match molecule.kind {
            MoleculeKind::Volume(vm) => {
                for class in self.indexed_classes(molecule.species) {
                    self.reactants.erase_existing(class, vm.reactant_subpart, id);
                }
            }
            MoleculeKind::Surface(sm) => {
                if let Some(grid) = self.geometry.wall_mut(sm.wall)?.surface_grid.as_mut() {
                    if grid.occupant(sm.tile) == Some(id) {
                        grid.vacate(sm.tile);
                    }
                }
            }
        }
        if let Some(partner) = self.paired.remove(&id) {
            self.paired.remove(&partner);
            tracing::debug!(%id, %partner, "defunct molecule was unpaired");
        }
        Ok(())
    }

    /// Drops defunct molecules from storage. Molecule IDs stay valid.
    ///
    /// Returns the number of reclaimed slots.
    pub fn defragment_molecules(&mut self) -> usize {
        self.molecules.defragment()
    }

    // --- Queries ---

    /// Whether `id` refers to a live molecule.
    #[must_use]
    pub fn does_molecule_exist(&self, id: MoleculeId) -> bool {
        self.molecules.exists(id)
    }

    /// Returns a live molecule.
    ///
    /// # Errors
    ///
    /// Returns an error if the molecule does not exist.
    pub fn get_molecule(&self, id: MoleculeId) -> Result<&Molecule> {
        Ok(self.molecules.get(id).ok_or(MoleculeError::NotFound(id))?)
    }

    #[must_use]
    pub fn molecule_species(&self, id: MoleculeId) -> Option<SpeciesId> {
        self.molecules.get(id).map(|m| m.species)
    }

    /// Wall of a surface molecule.
    #[must_use]
    pub fn molecule_wall(&self, id: MoleculeId) -> Option<WallId> {
        self.molecules.get(id)?.as_surface().map(|sm| sm.wall)
    }

    /// Position of a molecule; surface molecules are mapped from their
    /// barycentric position on the current wall shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the molecule or its wall does not exist.
    pub fn molecule_position(&self, id: MoleculeId) -> Result<Point3> {
        match &self.get_molecule(id)?.kind {
            MoleculeKind::Volume(vm) => Ok(vm.position),
            MoleculeKind::Surface(sm) => {
                let points = self.geometry.wall_points(sm.wall)?;
                Ok(point_from_barycentric(
                    &points,
                    sm.barycentric.x,
                    sm.barycentric.y,
                ))
            }
        }
    }

    /// Live molecules that schedule their own events.
    pub fn schedulable_molecule_ids(&self) -> impl Iterator<Item = MoleculeId> + '_ {
        self.molecules.schedulable_ids()
    }

    /// Volume molecules in `subpart` that can react with `species`.
    #[must_use]
    pub fn candidate_partners(
        &self,
        species: SpeciesId,
        subpart: SubpartIndex,
    ) -> Option<&BTreeSet<MoleculeId>> {
        let class = self.catalog.reactant_class(species)?;
        self.reactants.get(class, subpart)
    }

    /// Wall closest to `position`, optionally restricted to one object,
    /// together with the closest point on it.
    ///
    /// # Errors
    ///
    /// Returns an error if `object` does not exist.
    pub fn find_closest_wall(
        &self,
        position: &Point3,
        object: Option<ObjectId>,
    ) -> Result<Option<(WallId, Point3)>> {
        let walls: Vec<WallId> = match object {
            Some(object) => self.geometry.object(object)?.walls.clone(),
            None => self.geometry.walls().map(|(id, _)| id).collect(),
        };
        let mut best: Option<(WallId, Point3, f64)> = None;
        for wall in walls {
            let points = self.geometry.wall_points(wall)?;
            let closest = closest_point_on_triangle(position, &points);
            let dist = (closest - position).norm_squared();
            if best.is_none_or(|(_, _, d)| dist < d) {
                best = Some((wall, closest, dist));
            }
        }
        Ok(best.map(|(wall, closest, _)| (wall, closest)))
    }

    /// Decides how the scheduler handles a newly created molecule.
    ///
    /// # Errors
    ///
    /// Returns an error if the molecule or its species does not exist.
    pub fn route_new_molecule(
        &self,
        id: MoleculeId,
        scheduler: &impl EventScheduler,
    ) -> Result<MoleculeRouting> {
        let species = self.get_molecule(id)?.species;
        if !self.species_info(species)?.can_initiate_events() {
            return Ok(MoleculeRouting::Unscheduled);
        }
        Ok(match scheduler.active_diffusion_event() {
            Some(event) => MoleculeRouting::JoinLiveEvent(event),
            None => MoleculeRouting::Standalone,
        })
    }

    // --- Motion ---

    /// Moves a volume molecule, keeping its subpartition and counted
    /// volume current.
    ///
    /// The reactant index is left alone until
    /// [`update_reactant_subpart`](Self::update_reactant_subpart).
    ///
    /// # Errors
    ///
    /// Returns an error if the molecule does not exist, is not a volume
    /// molecule, or `position` lies outside the partition.
    pub fn move_volume_molecule(&mut self, id: MoleculeId, position: Point3) -> Result<()> {
        let Some(subpart) = self.grid.subpart_index(&position) else {
            return Err(MoleculeError::OutsidePartition { position }.into());
        };
        if !self.get_molecule(id)?.is_volume() {
            return Err(MoleculeError::NotVolumeMolecule(id).into());
        }
        let counted_volume = self.counted_volume_at(&position)?;
        let compartment = self.compartment_of_counted_volume(counted_volume);
        self.set_volume_molecule_state(id, position, subpart, counted_volume, compartment)
    }

    /// Re-files a volume molecule in the reactant index under its current
    /// subpartition.
    ///
    /// # Errors
    ///
    /// Returns an error if the molecule does not exist or is not a volume
    /// molecule.
    pub fn update_reactant_subpart(&mut self, id: MoleculeId) -> Result<()> {
        let molecule = self.get_molecule(id)?;
        let species = molecule.species;
        let vm = *molecule
            .as_volume()
            .ok_or(MoleculeError::NotVolumeMolecule(id))?;
        if vm.subpart == vm.reactant_subpart {
            return Ok(());
        }
        for class in self.indexed_classes(species) {
            self.reactants.erase_existing(class, vm.reactant_subpart, id);
            self.reactants.insert(class, vm.subpart, id);
        }
        if let Some(vm) = self.molecules.get_mut(id).and_then(Molecule::as_volume_mut) {
            vm.reactant_subpart = vm.subpart;
        }
        Ok(())
    }

    /// Recomputes counted volume and compartment of every live volume
    /// molecule, after counted geometry changed.
    pub(crate) fn reclassify_volume_molecules(&mut self) -> Result<()> {
        let ids: Vec<_> = self
            .molecules
            .iter()
            .filter(|m| m.is_volume())
            .map(|m| m.id)
            .collect();
        ids.into_iter()
            .try_for_each(|id| self.reclassify_volume_molecule(id))
    }

    pub(crate) fn reclassify_volume_molecule(&mut self, id: MoleculeId) -> Result<()> {
        let vm = *self
            .get_molecule(id)?
            .as_volume()
            .ok_or(MoleculeError::NotVolumeMolecule(id))?;
        let counted_volume = self.counted_volume_at(&vm.position)?;
        let compartment = self.compartment_of_counted_volume(counted_volume);
        self.set_volume_molecule_state(id, vm.position, vm.subpart, counted_volume, compartment)
    }

    pub(crate) fn set_volume_molecule_state(
        &mut self,
        id: MoleculeId,
        position: Point3,
        subpart: SubpartIndex,
        counted_volume: CountedVolumeIndex,
        compartment: Option<CompartmentId>,
    ) -> Result<()> {
        let molecule = self
            .molecules
            .get_mut(id)
            .ok_or(MoleculeError::NotFound(id))?;
        molecule.compartment = compartment;
        let vm = molecule
            .as_volume_mut()
            .ok_or(MoleculeError::NotVolumeMolecule(id))?;
        vm.position = position;
        vm.subpart = subpart;
        vm.counted_volume = counted_volume;
        Ok(())
    }

    // --- Species bookkeeping ---

    fn species_info(&self, species: SpeciesId) -> Result<&SpeciesInfo> {
        Ok(self
            .catalog
            .species_info(species)
            .ok_or(MoleculeError::UnknownSpecies(species))?)
    }

    /// Reactant classes under which volume molecules of `species` are filed.
    fn indexed_classes(&self, species: SpeciesId) -> Vec<ReactantClassId> {
        self.catalog
            .reacting_classes(species)
            .into_iter()
            .filter(|class| self.known_reactant_classes.contains(class))
            .collect()
    }

    /// Handles the first instance of a species.
    ///
    /// Builds the species' reactant class; if the class is new to this
    /// partition, every live volume molecule that can react with it is
    /// filed under it.
    fn register_species(&mut self, species: SpeciesId) {
        if !self.known_species.insert(species) {
            return;
        }
        self.catalog.materialize_reactant_class(species);
        let Some(class) = self.catalog.reactant_class(species) else {
            return;
        };
        if !self.known_reactant_classes.insert(class) {
            return;
        }

        let mut filed = 0usize;
        for molecule in self.molecules.iter() {
            let Some(vm) = molecule.as_volume() else {
                continue;
            };
            if self.catalog.can_react(molecule.species, species) {
                self.reactants.insert(class, vm.reactant_subpart, molecule.id);
                filed += 1;
            }
        }
        tracing::debug!(?species, ?class, filed, "new reactant class");
    }
}
