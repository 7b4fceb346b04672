use std::collections::{BTreeSet, HashMap};

use crate::catalog::ReactantClassId;
use crate::molecule::MoleculeId;

use super::SubpartIndex;

/// Candidate bimolecular partners, filed by reactant class and subpartition.
///
/// `get(class, subpart)` lists the volume molecules in `subpart` that can
/// react with a molecule whose species belongs to `class`, so a diffusing
/// molecule finds its partners with one lookup per visited subpartition.
/// Tables and sets are allocated on first insertion only.
#[derive(Debug, Default)]
pub struct ReactantIndex {
    per_class: HashMap<ReactantClassId, HashMap<SubpartIndex, BTreeSet<MoleculeId>>>,
}

impl ReactantIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: ReactantClassId, subpart: SubpartIndex, id: MoleculeId) {
        self.per_class
            .entry(class)
            .or_default()
            .entry(subpart)
            .or_default()
            .insert(id);
    }

    /// Removes an entry if present; returns whether it was there.
    pub fn erase(&mut self, class: ReactantClassId, subpart: SubpartIndex, id: MoleculeId) -> bool {
        let Some(table) = self.per_class.get_mut(&class) else {
            return false;
        };
        let Some(set) = table.get_mut(&subpart) else {
            return false;
        };
        let removed = set.remove(&id);
        if set.is_empty() {
            table.remove(&subpart);
        }
        removed
    }

    /// Removes an entry that must be present.
    ///
    /// A missing entry means the index and the molecule store disagree;
    /// debug builds panic on it.
    pub fn erase_existing(&mut self, class: ReactantClassId, subpart: SubpartIndex, id: MoleculeId) {
        let removed = self.erase(class, subpart, id);
        debug_assert!(
            removed,
            "molecule {id} missing from reactant class {class:?} in subpart {subpart}"
        );
    }

    /// Molecules in `subpart` that can react with `class`.
    #[must_use]
    pub fn get(&self, class: ReactantClassId, subpart: SubpartIndex) -> Option<&BTreeSet<MoleculeId>> {
        self.per_class.get(&class)?.get(&subpart)
    }

    #[must_use]
    pub fn has_class(&self, class: ReactantClassId) -> bool {
        self.per_class.contains_key(&class)
    }

    /// Whether `id` is filed anywhere in the index.
    #[must_use]
    pub fn contains_molecule(&self, id: MoleculeId) -> bool {
        self.per_class
            .values()
            .flat_map(HashMap::values)
            .any(|set| set.contains(&id))
    }

    /// Every `(class, subpart)` under which `id` is filed.
    #[must_use]
    pub fn locations_of(&self, id: MoleculeId) -> BTreeSet<(ReactantClassId, SubpartIndex)> {
        self.per_class
            .iter()
            .flat_map(|(&class, table)| {
                table
                    .iter()
                    .filter(|(_, set)| set.contains(&id))
                    .map(move |(&subpart, _)| (class, subpart))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ReactantClassId = ReactantClassId(0);
    const B: ReactantClassId = ReactantClassId(1);

    #[test]
    fn tables_are_created_lazily() {
        let mut index = ReactantIndex::new();
        assert!(!index.has_class(A));
        assert!(index.get(A, 3).is_none());
        index.insert(A, 3, MoleculeId(1));
        assert!(index.has_class(A));
        assert!(!index.has_class(B));
        assert_eq!(index.get(A, 3).map(BTreeSet::len), Some(1));
    }

    #[test]
    fn erase_tolerates_absence() {
        let mut index = ReactantIndex::new();
        assert!(!index.erase(A, 0, MoleculeId(1)));
        index.insert(A, 0, MoleculeId(1));
        assert!(index.erase(A, 0, MoleculeId(1)));
        assert!(index.get(A, 0).is_none());
        assert!(!index.contains_molecule(MoleculeId(1)));
    }

    #[test]
    #[should_panic(expected = "missing from reactant class")]
    #[cfg(debug_assertions)]
    fn erase_existing_flags_double_removal() {
        let mut index = ReactantIndex::new();
        index.insert(A, 0, MoleculeId(1));
        index.erase_existing(A, 0, MoleculeId(1));
        index.erase_existing(A, 0, MoleculeId(1));
    }

    #[test]
    fn locations_cover_all_classes() {
        let mut index = ReactantIndex::new();
        index.insert(A, 0, MoleculeId(5));
        index.insert(B, 7, MoleculeId(5));
        index.insert(B, 7, MoleculeId(6));
        assert_eq!(
            index.locations_of(MoleculeId(5)),
            BTreeSet::from([(A, 0), (B, 7)])
        );
    }
}
