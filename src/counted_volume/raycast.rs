use crate::catalog::SpeciesCatalog;
use crate::error::{MoleculeError, Result};
use crate::geometry::ObjectId;
use crate::math::intersect_3d::{segment_triangle_intersect, SegmentHit};
use crate::math::{Point3, Vector3};
use crate::partition::Partition;

use super::{CountedVolume, CountedVolumeIndex};

/// Ray directions tried in turn by from-scratch classification. None of
/// them is parallel to a coordinate axis or plane, so axis-aligned meshes
/// are rarely grazed.
const RAY_DIRECTIONS: [[f64; 3]; 8] = [
    [1.0, 0.013_7, 0.007_3],
    [0.021_1, 1.0, 0.034_9],
    [0.008_3, 0.019_7, -1.0],
    [-1.0, 0.031_3, -0.011_9],
    [0.577_1, 0.571_3, 0.583_7],
    [-0.563_3, 0.589_1, -0.577_9],
    [0.043_1, -1.0, 0.027_7],
    [0.707_3, -0.002_9, -0.706_1],
];

/// Counted walls crossed by a segment.
#[derive(Debug, Default)]
pub(crate) struct Crossings {
    /// Owning object of each cleanly crossed wall, one entry per crossing.
    pub objects: Vec<ObjectId>,
    /// Number of walls touched degenerately.
    pub redo: usize,
}

impl Crossings {
    pub fn is_clean(&self) -> bool {
        self.redo == 0
    }
}

impl<C: SpeciesCatalog> Partition<C> {
    /// Counted volume containing `position`, found by raycasting from the
    /// waypoint of its subpartition.
    ///
    /// Falls back to [`counted_volume_from_scratch`](Self::counted_volume_from_scratch)
    /// when the segment from the waypoint touches a wall degenerately.
    ///
    /// # Errors
    ///
    /// Returns an error if `position` lies outside the partition.
    pub fn counted_volume_at(&mut self, position: &Point3) -> Result<CountedVolumeIndex> {
        let Some(subpart) = self.grid.subpart_index(position) else {
            return Err(MoleculeError::OutsidePartition {
                position: *position,
            }
            .into());
        };
        if !self.tracks_counted_volumes() {
            return Ok(CountedVolumeIndex::OUTSIDE_ALL);
        }
        self.ensure_waypoints()?;

        let Some(&waypoint) = self.waypoints.get(subpart) else {
            return self.classify_from_scratch(position);
        };
        let crossings = self.counted_crossings(&waypoint.position, position)?;
        if !crossings.is_clean() {
            return self.classify_from_scratch(position);
        }
        let mut volume = self
            .counted_volumes
            .get(waypoint.counted_volume)
            .cloned()
            .unwrap_or_default();
        for object in crossings.objects {
            volume.toggle(object);
        }
        Ok(self.counted_volumes.find_or_insert(volume))
    }

    /// Counted volume containing `position`, found by raycasting from
    /// outside all geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if `position` lies outside the partition.
    pub fn counted_volume_from_scratch(&mut self, position: &Point3) -> Result<CountedVolumeIndex> {
        if !self.grid.contains(position) {
            return Err(MoleculeError::OutsidePartition {
                position: *position,
            }
            .into());
        }
        if !self.tracks_counted_volumes() {
            return Ok(CountedVolumeIndex::OUTSIDE_ALL);
        }
        self.classify_from_scratch(position)
    }

    #[must_use]
    pub fn counted_volume(&self, index: CountedVolumeIndex) -> Option<&CountedVolume> {
        self.counted_volumes.get(index)
    }

    /// Casts rays towards the outside until one crosses every counted wall
    /// cleanly. If all directions graze a wall, the last ray's clean
    /// crossings are used.
    pub(crate) fn classify_from_scratch(&mut self, position: &Point3) -> Result<CountedVolumeIndex> {
        // Geometry never leaves the partition, so this reaches past all of it.
        let reach = 2.0 * 3f64.sqrt() * self.config.edge_length;
        let mut last = Crossings::default();
        for (attempt, direction) in RAY_DIRECTIONS.iter().enumerate() {
            let far = position + Vector3::from(*direction).normalize() * reach;
            let crossings = self.counted_crossings(position, &far)?;
            if crossings.is_clean() {
                return Ok(self.volume_from_outside(&crossings));
            }
            tracing::trace!(attempt, redo = crossings.redo, "ray grazed a wall, trying next direction");
            last = crossings;
        }
        tracing::warn!(
            ?position,
            redo = last.redo,
            "every ray direction grazed a wall, counting clean crossings only"
        );
        Ok(self.volume_from_outside(&last))
    }

    /// Counted walls crossed by the segment `from .. to`.
    pub(crate) fn counted_crossings(&self, from: &Point3, to: &Point3) -> Result<Crossings> {
        let displacement = to - from;
        let mut crossings = Crossings::default();
        for wall_id in self.grid.walls_near_segment(from, to) {
            let wall = self.geometry.wall(wall_id)?;
            if !self.geometry.object(wall.object)?.is_counted {
                continue;
            }
            let points = self.geometry.wall_points(wall_id)?;
            match segment_triangle_intersect(from, &displacement, &points) {
                SegmentHit::Miss => {}
                SegmentHit::Hit { .. } => crossings.objects.push(wall.object),
                SegmentHit::Redo => crossings.redo += 1,
            }
        }
        Ok(crossings)
    }

    fn volume_from_outside(&mut self, crossings: &Crossings) -> CountedVolumeIndex {
        let mut volume = CountedVolume::default();
        for &object in &crossings.objects {
            volume.toggle(object);
        }
        self.counted_volumes.find_or_insert(volume)
    }
}
