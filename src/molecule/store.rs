use std::collections::HashMap;

use crate::catalog::SpeciesId;
use crate::error::MoleculeError;

use super::{Molecule, MoleculeId};

/// Backing storage for all molecules of a partition.
///
/// Molecules live in a flat vector; an ID-to-slot map keeps external IDs
/// valid across [`defragment`](Self::defragment). Defunct molecules keep
/// their slot until the next defragmentation but are invisible to every
/// lookup and iterator.
#[derive(Debug, Default)]
pub struct MoleculeStore {
    molecules: Vec<Molecule>,
    id_to_index: HashMap<MoleculeId, usize>,
    next_id: u64,
    /// IDs below this may belong to molecules dropped by `defragment`.
    reclaimed_below: u64,
    schedulable: Vec<MoleculeId>,
    populations: HashMap<SpeciesId, u64>,
}

impl MoleculeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The ID the next molecule without a checkpoint ID will receive.
    #[must_use]
    pub fn next_id(&self) -> MoleculeId {
        MoleculeId(self.next_id)
    }

    /// Hands out a fresh ID, or accepts `requested` (from a checkpoint) and
    /// advances the counter past it.
    ///
    /// Checkpoint IDs may arrive in any order until the first
    /// defragmentation that reclaims storage; after that, an unknown ID is
    /// only accepted at or above the counter value of that moment.
    ///
    /// # Errors
    ///
    /// Returns an error if `requested` is held by a stored molecule, or may
    /// have belonged to a molecule dropped from storage.
    pub(crate) fn reserve_id(
        &mut self,
        requested: Option<MoleculeId>,
    ) -> Result<MoleculeId, MoleculeError> {
        match requested {
            Some(id) if self.id_to_index.contains_key(&id) => Err(MoleculeError::IdInUse(id)),
            Some(id) if id.0 < self.reclaimed_below => Err(MoleculeError::IdRetired(id)),
            Some(id) => {
                self.next_id = self.next_id.max(id.0 + 1);
                Ok(id)
            }
            None => {
                let id = MoleculeId(self.next_id);
                self.next_id += 1;
                Ok(id)
            }
        }
    }

    /// Appends a molecule whose ID came from [`reserve_id`](Self::reserve_id).
    pub(crate) fn insert(&mut self, molecule: Molecule, schedulable: bool) {
        let id = molecule.id;
        *self.populations.entry(molecule.species).or_default() += 1;
        self.id_to_index.insert(id, self.molecules.len());
        self.molecules.push(molecule);
        if schedulable {
            self.schedulable.push(id);
        }
    }

    /// Returns a live molecule.
    #[must_use]
    pub fn get(&self, id: MoleculeId) -> Option<&Molecule> {
        self.id_to_index
            .get(&id)
            .map(|&index| &self.molecules[index])
            .filter(|m| !m.is_defunct())
    }

    pub(crate) fn get_mut(&mut self, id: MoleculeId) -> Option<&mut Molecule> {
        let index = *self.id_to_index.get(&id)?;
        Some(&mut self.molecules[index]).filter(|m| !m.is_defunct())
    }

    /// Whether `id` refers to a live molecule.
    #[must_use]
    pub fn exists(&self, id: MoleculeId) -> bool {
        self.get(id).is_some()
    }

    /// Marks a molecule defunct and returns its last state.
    pub(crate) fn mark_defunct(&mut self, id: MoleculeId) -> Option<Molecule> {
        let molecule = self.get_mut(id)?;
        molecule.mark_defunct();
        let snapshot = molecule.clone();
        if let Some(count) = self.populations.get_mut(&snapshot.species) {
            *count = count.saturating_sub(1);
        }
        Some(snapshot)
    }

    /// Live molecules in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &Molecule> {
        self.molecules.iter().filter(|m| !m.is_defunct())
    }

    /// Live molecules that schedule their own events, in creation order.
    pub fn schedulable_ids(&self) -> impl Iterator<Item = MoleculeId> + '_ {
        self.schedulable.iter().copied().filter(|&id| self.exists(id))
    }

    /// Number of live molecules of a species.
    #[must_use]
    pub fn population(&self, species: SpeciesId) -> u64 {
        self.populations.get(&species).copied().unwrap_or(0)
    }

    /// Number of live molecules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of occupied storage slots, defunct ones included.
    #[must_use]
    pub fn storage_len(&self) -> usize {
        self.molecules.len()
    }

    /// Drops defunct molecules from storage and rebuilds the ID map.
    ///
    /// Returns the number of slots reclaimed.
    pub fn defragment(&mut self) -> usize {
        let before = self.molecules.len();
        self.molecules.retain(|m| !m.is_defunct());
        self.id_to_index = self
            .molecules
            .iter()
            .enumerate()
            .map(|(index, m)| (m.id, index))
            .collect();
        let live = &self.id_to_index;
        self.schedulable.retain(|id| live.contains_key(id));
        let reclaimed = before - self.molecules.len();
        if reclaimed > 0 {
            self.reclaimed_below = self.next_id;
        }
        reclaimed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::counted_volume::CountedVolumeIndex;
    use crate::math::Point3;
    use crate::molecule::{MoleculeKind, VolumeMolecule};

    fn volume(id: MoleculeId, species: u32) -> Molecule {
        Molecule::new(
            id,
            SpeciesId(species),
            None,
            MoleculeKind::Volume(VolumeMolecule {
                position: Point3::origin(),
                subpart: 0,
                reactant_subpart: 0,
                counted_volume: CountedVolumeIndex::OUTSIDE_ALL,
            }),
        )
    }

    fn add(store: &mut MoleculeStore, species: u32) -> MoleculeId {
        let id = store.reserve_id(None).unwrap();
        store.insert(volume(id, species), true);
        id
    }

    #[test]
    fn ids_increase_and_are_not_reused() {
        let mut store = MoleculeStore::new();
        let a = add(&mut store, 0);
        let b = add(&mut store, 0);
        assert!(b > a);
        store.mark_defunct(b).unwrap();
        store.defragment();
        let c = add(&mut store, 0);
        assert!(c > b);
    }

    #[test]
    fn checkpoint_id_advances_counter() {
        let mut store = MoleculeStore::new();
        let id = store.reserve_id(Some(MoleculeId(41))).unwrap();
        store.insert(volume(id, 0), false);
        assert_eq!(store.next_id(), MoleculeId(42));
        assert!(matches!(
            store.reserve_id(Some(MoleculeId(41))),
            Err(MoleculeError::IdInUse(MoleculeId(41)))
        ));
    }

    #[test]
    fn checkpoint_id_of_reclaimed_molecule_is_rejected() {
        let mut store = MoleculeStore::new();
        let a = store.reserve_id(Some(MoleculeId(7))).unwrap();
        store.insert(volume(a, 0), false);
        let b = store.reserve_id(Some(MoleculeId(3))).unwrap();
        store.insert(volume(b, 0), false);

        store.mark_defunct(b).unwrap();
        assert_eq!(store.defragment(), 1);
        assert!(matches!(
            store.reserve_id(Some(MoleculeId(3))),
            Err(MoleculeError::IdRetired(MoleculeId(3)))
        ));
        assert!(matches!(
            store.reserve_id(Some(MoleculeId(5))),
            Err(MoleculeError::IdRetired(MoleculeId(5)))
        ));
        assert_eq!(store.reserve_id(Some(MoleculeId(8))).unwrap(), MoleculeId(8));
    }

    #[test]
    fn defunct_molecules_disappear_from_lookups() {
        let mut store = MoleculeStore::new();
        let a = add(&mut store, 3);
        let b = add(&mut store, 3);
        assert_eq!(store.population(SpeciesId(3)), 2);

        store.mark_defunct(a).unwrap();
        assert!(!store.exists(a));
        assert!(store.get(a).is_none());
        assert!(store.mark_defunct(a).is_none());
        assert_eq!(store.population(SpeciesId(3)), 1);
        assert_eq!(store.schedulable_ids().collect::<Vec<_>>(), vec![b]);
        assert_eq!(store.iter().count(), 1);
        assert_eq!(store.storage_len(), 2);
    }

    #[test]
    fn defragment_keeps_ids_valid() {
        let mut store = MoleculeStore::new();
        let ids: Vec<_> = (0..5).map(|_| add(&mut store, 1)).collect();
        store.mark_defunct(ids[1]).unwrap();
        store.mark_defunct(ids[3]).unwrap();

        assert_eq!(store.defragment(), 2);
        assert_eq!(store.storage_len(), 3);
        for &id in &[ids[0], ids[2], ids[4]] {
            assert_eq!(store.get(id).unwrap().id, id);
        }
        assert!(!store.exists(ids[3]));
    }
}
