use rand::Rng;

use crate::catalog::SpeciesCatalog;
use crate::error::Result;
use crate::math::triangle::closest_point_on_triangle;
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::partition::{Partition, SubpartIndex};

use super::CountedVolumeIndex;

/// Placement attempts per waypoint before falling back to the
/// subpartition center and a from-scratch classification.
const WAYPOINT_ATTEMPTS: usize = 8;

/// Largest perturbation of a waypoint, as a fraction of the subpartition edge.
const PERTURBATION: f64 = 0.1;

/// Reference point of one subpartition with a known counted volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Point3,
    pub counted_volume: CountedVolumeIndex,
}

impl<C: SpeciesCatalog> Partition<C> {
    /// Waypoints in subpartition order; empty until initialized.
    #[must_use]
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Places one waypoint per subpartition and classifies it.
    ///
    /// Subpartitions are visited in index order (x fastest), so every
    /// waypoint but the first has an already classified neighbor at x-1,
    /// y-1 or z-1. A waypoint starts at its subpartition's center and is
    /// moved randomly while it lies on a wall or the segment from its
    /// neighbor touches a counted wall degenerately. Without counted
    /// geometry all waypoints lie in counted volume 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the geometry store is inconsistent.
    pub fn initialize_waypoints(&mut self) -> Result<()> {
        let count = self.grid.num_subparts();
        let track = self.tracks_counted_volumes();
        let mut waypoints: Vec<Waypoint> = Vec::with_capacity(count);

        for index in 0..count {
            let center = self.grid.subpart_center(index);
            if !track {
                waypoints.push(Waypoint {
                    position: center,
                    counted_volume: CountedVolumeIndex::OUTSIDE_ALL,
                });
                continue;
            }

            let previous = self.waypoint_predecessor(index).map(|p| waypoints[p]);
            let waypoint = match self.place_waypoint(index, &center, previous.as_ref())? {
                Some((position, true)) if self.config.reuse_waypoint_counted_volumes => Waypoint {
                    position,
                    counted_volume: previous.map_or(CountedVolumeIndex::OUTSIDE_ALL, |p| {
                        p.counted_volume
                    }),
                },
                Some((position, _)) => Waypoint {
                    position,
                    counted_volume: self.classify_from_scratch(&position)?,
                },
                None => {
                    tracing::warn!(
                        subpart = index,
                        attempts = WAYPOINT_ATTEMPTS,
                        "could not place waypoint, classifying subpartition center from scratch"
                    );
                    Waypoint {
                        position: center,
                        counted_volume: self.classify_from_scratch(&center)?,
                    }
                }
            };
            waypoints.push(waypoint);
        }

        self.waypoints = waypoints;
        self.waypoints_initialized = true;
        Ok(())
    }

    pub(crate) fn ensure_waypoints(&mut self) -> Result<()> {
        if self.waypoints_initialized {
            return Ok(());
        }
        self.initialize_waypoints()
    }

    /// Marks the waypoints stale; they are rebuilt on next use.
    pub(crate) fn invalidate_waypoints(&mut self) {
        self.waypoints_initialized = false;
    }

    /// Finds a usable waypoint position for a subpartition.
    ///
    /// Returns the position and whether the segment from the previous
    /// waypoint crosses no counted wall (`false` without a predecessor),
    /// or `None` once the attempts are used up.
    fn place_waypoint(
        &mut self,
        index: SubpartIndex,
        center: &Point3,
        previous: Option<&Waypoint>,
    ) -> Result<Option<(Point3, bool)>> {
        for attempt in 0..WAYPOINT_ATTEMPTS {
            let candidate = if attempt == 0 {
                *center
            } else {
                self.perturb(center)
            };
            if self.lies_on_wall(index, &candidate)? {
                tracing::trace!(subpart = index, attempt, "waypoint lies on a wall");
                continue;
            }
            let Some(previous) = previous else {
                return Ok(Some((candidate, false)));
            };
            let crossings = self.counted_crossings(&previous.position, &candidate)?;
            if !crossings.is_clean() {
                tracing::trace!(subpart = index, attempt, "segment from previous waypoint grazes a wall");
                continue;
            }
            return Ok(Some((candidate, crossings.objects.is_empty())));
        }
        Ok(None)
    }

    fn waypoint_predecessor(&self, index: SubpartIndex) -> Option<SubpartIndex> {
        let n = self.grid.per_dimension();
        match self.grid.coords_from_index(index) {
            [x, _, _] if x > 0 => Some(index - 1),
            [_, y, _] if y > 0 => Some(index - n),
            [_, _, z] if z > 0 => Some(index - n * n),
            _ => None,
        }
    }

    fn lies_on_wall(&self, index: SubpartIndex, position: &Point3) -> Result<bool> {
        for &wall in self.grid.walls_in(index) {
            let points = self.geometry.wall_points(wall)?;
            let closest = closest_point_on_triangle(position, &points);
            if (closest - position).norm() < TOLERANCE {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn perturb(&mut self, center: &Point3) -> Point3 {
        let reach = PERTURBATION * self.grid.edge_length();
        let offset = Vector3::new(
            self.rng.gen_range(-reach..reach),
            self.rng.gen_range(-reach..reach),
            self.rng.gen_range(-reach..reach),
        );
        center + offset
    }
}
