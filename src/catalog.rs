use std::collections::{BTreeMap, BTreeSet};

/// Identifier of a species in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeciesId(pub u32);

/// Identifier of a reactant class: species sharing the same set of
/// bimolecular partners share a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReactantClassId(pub u32);

/// What the partition needs to know about one species.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesInfo {
    pub name: String,
    pub is_surface: bool,
    pub diffusion_constant: f64,
    pub has_unimolecular_reactions: bool,
}

impl SpeciesInfo {
    /// A diffusing volume species without unimolecular reactions.
    #[must_use]
    pub fn volume(name: impl Into<String>, diffusion_constant: f64) -> Self {
        Self {
            name: name.into(),
            is_surface: false,
            diffusion_constant,
            has_unimolecular_reactions: false,
        }
    }

    /// A diffusing surface species without unimolecular reactions.
    #[must_use]
    pub fn surface(name: impl Into<String>, diffusion_constant: f64) -> Self {
        Self {
            is_surface: true,
            ..Self::volume(name, diffusion_constant)
        }
    }

    #[must_use]
    pub fn can_diffuse(&self) -> bool {
        self.diffusion_constant > 0.0
    }

    /// Whether molecules of this species schedule their own events.
    #[must_use]
    pub fn can_initiate_events(&self) -> bool {
        self.can_diffuse() || self.has_unimolecular_reactions
    }
}

/// The species and reaction catalog as seen by the partition.
///
/// The partition only needs to know what a species is (volume or surface,
/// whether it moves or reacts on its own) and which bimolecular partners it
/// has. Rates and reaction products live elsewhere.
pub trait SpeciesCatalog {
    fn species_info(&self, species: SpeciesId) -> Option<&SpeciesInfo>;

    /// Reactant class of a species, `None` until the class has been
    /// materialized or when the species has no bimolecular reactions.
    fn reactant_class(&self, species: SpeciesId) -> Option<ReactantClassId>;

    /// Materialized reactant classes `species` has a bimolecular reaction with.
    fn reacting_classes(&self, species: SpeciesId) -> BTreeSet<ReactantClassId>;

    /// Whether two species have a bimolecular reaction.
    fn can_react(&self, a: SpeciesId, b: SpeciesId) -> bool;

    /// Builds the reaction class of a species on its first use.
    fn materialize_reactant_class(&mut self, species: SpeciesId);
}

/// Table-driven catalog: species plus the unordered pairs that react.
#[derive(Debug, Clone, Default)]
pub struct ReactionCatalog {
    species: Vec<SpeciesInfo>,
    bimolecular: BTreeSet<(SpeciesId, SpeciesId)>,
    classes: BTreeMap<SpeciesId, ReactantClassId>,
    partner_sets: Vec<BTreeSet<SpeciesId>>,
}

impl ReactionCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a species and returns its ID.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_species(&mut self, info: SpeciesInfo) -> SpeciesId {
        self.species.push(info);
        SpeciesId(self.species.len() as u32 - 1)
    }

    /// Declares a bimolecular reaction between `a` and `b`.
    pub fn add_bimolecular_reaction(&mut self, a: SpeciesId, b: SpeciesId) {
        self.bimolecular.insert((a.min(b), a.max(b)));
    }

    /// Whether the reactant class of `species` has been built.
    #[must_use]
    pub fn is_materialized(&self, species: SpeciesId) -> bool {
        self.classes.contains_key(&species)
    }

    fn partners(&self, species: SpeciesId) -> BTreeSet<SpeciesId> {
        self.bimolecular
            .iter()
            .filter_map(|&(a, b)| {
                if a == species {
                    Some(b)
                } else if b == species {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    }
}

impl SpeciesCatalog for ReactionCatalog {
    fn species_info(&self, species: SpeciesId) -> Option<&SpeciesInfo> {
        self.species.get(species.0 as usize)
    }

    fn reactant_class(&self, species: SpeciesId) -> Option<ReactantClassId> {
        self.classes.get(&species).copied()
    }

    fn reacting_classes(&self, species: SpeciesId) -> BTreeSet<ReactantClassId> {
        self.partners(species)
            .into_iter()
            .filter_map(|partner| self.reactant_class(partner))
            .collect()
    }

    fn can_react(&self, a: SpeciesId, b: SpeciesId) -> bool {
        self.bimolecular.contains(&(a.min(b), a.max(b)))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn materialize_reactant_class(&mut self, species: SpeciesId) {
        if self.is_materialized(species) {
            return;
        }
        let partners = self.partners(species);
        if partners.is_empty() {
            return;
        }
        let class = match self.partner_sets.iter().position(|set| *set == partners) {
            Some(existing) => ReactantClassId(existing as u32),
            None => {
                self.partner_sets.push(partners);
                ReactantClassId(self.partner_sets.len() as u32 - 1)
            }
        };
        self.classes.insert(species, class);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_with_same_partners_share_a_class() {
        let mut catalog = ReactionCatalog::new();
        let a = catalog.add_species(SpeciesInfo::volume("A", 1e-6));
        let b = catalog.add_species(SpeciesInfo::volume("B", 1e-6));
        let c = catalog.add_species(SpeciesInfo::volume("C", 1e-6));
        catalog.add_bimolecular_reaction(a, c);
        catalog.add_bimolecular_reaction(b, c);

        for s in [a, b, c] {
            catalog.materialize_reactant_class(s);
        }
        assert_eq!(catalog.reactant_class(a), catalog.reactant_class(b));
        assert_ne!(catalog.reactant_class(a), catalog.reactant_class(c));
        assert!(catalog.can_react(c, a));
        assert!(!catalog.can_react(a, b));
    }

    #[test]
    fn reacting_classes_only_cover_materialized_partners() {
        let mut catalog = ReactionCatalog::new();
        let a = catalog.add_species(SpeciesInfo::volume("A", 1e-6));
        let b = catalog.add_species(SpeciesInfo::volume("B", 1e-6));
        catalog.add_bimolecular_reaction(a, b);

        catalog.materialize_reactant_class(a);
        assert!(catalog.reacting_classes(a).is_empty());
        let class_a = catalog.reactant_class(a).into_iter().collect::<BTreeSet<_>>();
        assert_eq!(catalog.reacting_classes(b), class_a);
    }

    #[test]
    fn species_without_reactions_has_no_class() {
        let mut catalog = ReactionCatalog::new();
        let a = catalog.add_species(SpeciesInfo::surface("S", 0.0));
        catalog.materialize_reactant_class(a);
        assert_eq!(catalog.reactant_class(a), None);
        assert!(!catalog.species_info(a).is_some_and(SpeciesInfo::can_initiate_events));
    }
}
