use std::collections::BTreeSet;

use crate::catalog::SpeciesCatalog;
use crate::error::Result;
use crate::geometry::{CompartmentId, RegionId};
use crate::math::Point3;
use crate::partition::Partition;

use super::CountedVolumeIndex;

impl<C: SpeciesCatalog> Partition<C> {
    /// Innermost 3D compartment of a counted volume, `None` outside every
    /// compartment. Results are cached per counted volume.
    pub fn compartment_of_counted_volume(&mut self, index: CountedVolumeIndex) -> Option<CompartmentId> {
        if let Some(&cached) = self.compartment_cache.get(&index) {
            return cached;
        }
        let resolved = self.resolve_compartment(index);
        self.compartment_cache.insert(index, resolved);
        resolved
    }

    /// Innermost 3D compartment containing `position`.
    ///
    /// # Errors
    ///
    /// Returns an error if `position` lies outside the partition.
    pub fn compartment_at(&mut self, position: &Point3) -> Result<Option<CompartmentId>> {
        let index = self.counted_volume_at(position)?;
        Ok(self.compartment_of_counted_volume(index))
    }

    /// Whether `position` lies in the volume described by a region.
    ///
    /// Only counted objects take part in classification, so a region over
    /// uncounted objects contains no point.
    ///
    /// # Errors
    ///
    /// Returns an error if `position` lies outside the partition or the
    /// region does not exist.
    pub fn region_contains_point(&mut self, region: RegionId, position: &Point3) -> Result<bool> {
        let index = self.counted_volume_at(position)?;
        let containing = self
            .counted_volumes
            .get(index)
            .map(|volume| volume.containing.clone())
            .unwrap_or_default();
        Ok(self.geometry.region_contains(region, &containing)?)
    }

    /// Walks from the outermost member compartment down through children
    /// that are members too. Surface compartments between two volume
    /// compartments are stepped over.
    fn resolve_compartment(&self, index: CountedVolumeIndex) -> Option<CompartmentId> {
        let volume = self.counted_volumes.get(index)?;
        let members: BTreeSet<CompartmentId> = volume
            .containing
            .iter()
            .filter_map(|&object| self.geometry.object(object).ok()?.volume_compartment)
            .filter(|&c| self.geometry.compartment(c).is_ok_and(|data| data.is_3d))
            .collect();

        let mut current = members
            .iter()
            .copied()
            .find(|&c| !self.has_member_ancestor(c, &members))?;
        while let Some(next) = self
            .volume_children(current)
            .into_iter()
            .find(|child| members.contains(child))
        {
            current = next;
        }
        Some(current)
    }

    fn has_member_ancestor(&self, compartment: CompartmentId, members: &BTreeSet<CompartmentId>) -> bool {
        let mut parent = self.geometry.compartment(compartment).ok().and_then(|c| c.parent);
        while let Some(id) = parent {
            if members.contains(&id) {
                return true;
            }
            parent = self.geometry.compartment(id).ok().and_then(|c| c.parent);
        }
        false
    }

    /// 3D children of a compartment, looking through 2D children.
    fn volume_children(&self, compartment: CompartmentId) -> Vec<CompartmentId> {
        let Ok(data) = self.geometry.compartment(compartment) else {
            return Vec::new();
        };
        let mut result = Vec::new();
        for &child in &data.children {
            let Ok(child_data) = self.geometry.compartment(child) else {
                continue;
            };
            if child_data.is_3d {
                result.push(child);
            } else {
                result.extend(child_data.children.iter().copied().filter(|&grandchild| {
                    self.geometry
                        .compartment(grandchild)
                        .is_ok_and(|g| g.is_3d)
                }));
            }
        }
        result
    }
}
