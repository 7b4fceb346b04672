mod compartments;
mod raycast;
mod waypoints;

pub use waypoints::Waypoint;

use std::collections::{BTreeSet, HashMap};

use crate::geometry::ObjectId;

/// Index into the counted-volume table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountedVolumeIndex(pub u32);

impl CountedVolumeIndex {
    /// The empty counted volume.
    pub const OUTSIDE_ALL: Self = Self(0);
}

/// Counted objects whose interior contains a point.
///
/// Every distinct set is stored once in a [`CountedVolumeTable`] and
/// referred to by a small [`CountedVolumeIndex`]; index 0 is always the
/// empty set, "outside everything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CountedVolume {
    pub containing: BTreeSet<ObjectId>,
}

impl CountedVolume {
    #[must_use]
    pub fn new(containing: BTreeSet<ObjectId>) -> Self {
        Self { containing }
    }

    #[must_use]
    pub fn is_outside_all(&self) -> bool {
        self.containing.is_empty()
    }

    /// Flips membership of `object`, as crossing one of its walls does.
    pub fn toggle(&mut self, object: ObjectId) {
        if !self.containing.remove(&object) {
            self.containing.insert(object);
        }
    }
}

/// Deduplicated storage of counted volumes.
#[derive(Debug, Clone)]
pub struct CountedVolumeTable {
    volumes: Vec<CountedVolume>,
    lookup: HashMap<CountedVolume, CountedVolumeIndex>,
}

impl Default for CountedVolumeTable {
    fn default() -> Self {
        let outside = CountedVolume::default();
        Self {
            lookup: HashMap::from([(outside.clone(), CountedVolumeIndex::OUTSIDE_ALL)]),
            volumes: vec![outside],
        }
    }
}

impl CountedVolumeTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `volume`, adding it on first sight.
    #[allow(clippy::cast_possible_truncation)]
    pub fn find_or_insert(&mut self, volume: CountedVolume) -> CountedVolumeIndex {
        if let Some(&index) = self.lookup.get(&volume) {
            return index;
        }
        let index = CountedVolumeIndex(self.volumes.len() as u32);
        self.volumes.push(volume.clone());
        self.lookup.insert(volume, index);
        index
    }

    #[must_use]
    pub fn get(&self, index: CountedVolumeIndex) -> Option<&CountedVolume> {
        self.volumes.get(index.0 as usize)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Never true: the outside volume is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn outside_volume_is_always_index_zero() {
        let mut table = CountedVolumeTable::new();
        assert_eq!(table.len(), 1);
        assert!(table.get(CountedVolumeIndex::OUTSIDE_ALL).unwrap().is_outside_all());
        assert_eq!(
            table.find_or_insert(CountedVolume::default()),
            CountedVolumeIndex::OUTSIDE_ALL
        );
    }

    #[test]
    fn equal_sets_share_an_index() {
        let mut objects: SlotMap<ObjectId, ()> = SlotMap::with_key();
        let a = objects.insert(());
        let b = objects.insert(());

        let mut table = CountedVolumeTable::new();
        let ab = table.find_or_insert(CountedVolume::new(BTreeSet::from([a, b])));
        let only_a = table.find_or_insert(CountedVolume::new(BTreeSet::from([a])));
        assert_ne!(ab, only_a);
        assert_eq!(table.find_or_insert(CountedVolume::new(BTreeSet::from([b, a]))), ab);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn toggle_flips_membership() {
        let mut objects: SlotMap<ObjectId, ()> = SlotMap::with_key();
        let a = objects.insert(());
        let mut volume = CountedVolume::default();
        volume.toggle(a);
        assert!(volume.containing.contains(&a));
        volume.toggle(a);
        assert!(volume.is_outside_all());
    }
}
