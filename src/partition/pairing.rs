use crate::catalog::SpeciesCatalog;
use crate::error::PairingError;
use crate::geometry::ObjectId;
use crate::molecule::MoleculeId;

use super::Partition;

impl<C: SpeciesCatalog> Partition<C> {
    /// Pairs two surface molecules on different objects.
    ///
    /// Paired molecules couple the motion of their objects: when vertex
    /// moves displace one of them, the other object's mesh follows.
    ///
    /// # Errors
    ///
    /// Returns a [`PairingError`] and leaves the pairing unchanged if a
    /// molecule does not exist, is not a surface molecule, is already
    /// paired, or both lie on the same object.
    pub fn pair_molecules(&mut self, first: MoleculeId, second: MoleculeId) -> Result<(), PairingError> {
        let first_object = self.surface_object(first)?;
        let second_object = self.surface_object(second)?;
        for id in [first, second] {
            if let Some(&partner) = self.paired.get(&id) {
                return Err(PairingError::AlreadyPaired {
                    molecule: id,
                    partner,
                });
            }
        }
        if first_object == second_object {
            let object = self
                .geometry
                .object(first_object)
                .map(|o| o.name.clone())
                .unwrap_or_default();
            return Err(PairingError::SameObject {
                first,
                second,
                object,
            });
        }

        self.paired.insert(first, second);
        self.paired.insert(second, first);
        tracing::debug!(%first, %second, "paired molecules");
        Ok(())
    }

    /// Dissolves the pairing of two molecules.
    ///
    /// # Errors
    ///
    /// Returns a [`PairingError`] if a molecule does not exist or the two
    /// are not paired with each other.
    pub fn unpair_molecules(&mut self, first: MoleculeId, second: MoleculeId) -> Result<(), PairingError> {
        for id in [first, second] {
            if !self.molecules.exists(id) {
                return Err(PairingError::MoleculeNotFound(id));
            }
        }
        if self.paired.get(&first) != Some(&second) {
            return Err(PairingError::NotPaired { first, second });
        }
        self.paired.remove(&first);
        self.paired.remove(&second);
        Ok(())
    }

    /// Partner of a paired molecule.
    #[must_use]
    pub fn get_paired_molecule(&self, id: MoleculeId) -> Option<MoleculeId> {
        self.paired.get(&id).copied()
    }

    fn surface_object(&self, id: MoleculeId) -> Result<ObjectId, PairingError> {
        let molecule = self
            .molecules
            .get(id)
            .ok_or(PairingError::MoleculeNotFound(id))?;
        let wall = molecule
            .as_surface()
            .ok_or(PairingError::NotSurfaceMolecule(id))?
            .wall;
        self.geometry
            .wall(wall)
            .map(|w| w.object)
            .map_err(|_| PairingError::MoleculeNotFound(id))
    }
}
