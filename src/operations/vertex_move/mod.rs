mod collide;
mod paired;
mod relocate;

use std::collections::{BTreeSet, HashSet};

use rand::seq::SliceRandom;

use crate::catalog::SpeciesCatalog;
use crate::error::{Result, VertexMoveError};
use crate::geometry::{ObjectId, VertexId, WallId};
use crate::math::Vector3;
use crate::partition::Partition;

/// Request to displace one vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexMove {
    pub vertex: VertexId,
    pub displacement: Vector3,
}

impl VertexMove {
    #[must_use]
    pub fn new(vertex: VertexId, displacement: Vector3) -> Self {
        Self {
            vertex,
            displacement,
        }
    }
}

/// A wall of a moving object that ran into a wall of another object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WallCollision {
    pub moving_wall: WallId,
    pub colliding_wall: WallId,
}

/// Result of a vertex-move batch.
#[derive(Debug, Clone, Default)]
pub struct VertexMoveOutcome {
    /// Wall pairs that stopped or cancelled a displacement.
    pub colliding_walls: BTreeSet<WallCollision>,
    /// Moves applied to other objects because of paired molecules.
    pub vertex_moves_due_to_paired_molecules: Vec<VertexMove>,
}

/// Moves a batch of vertices.
///
/// The batch is split by geometry object. For each object the requested
/// displacements are first clamped against the walls of other objects,
/// then applied while keeping the subpartition grid, volume molecules,
/// surface grids and reactant index consistent. Finally, objects holding
/// surface molecules paired with moved ones are moved along.
///
/// Every vertex may appear only once per batch. Displacements that would
/// carry a vertex through a wall of another object are shortened to stop
/// [`vertex_move_min_gap`](crate::config::PartitionConfig::vertex_move_min_gap)
/// in front of it; displacements whose new edges would pierce another
/// object are dropped. Vertices of non-movable walls stay put.
pub struct MoveVertices {
    moves: Vec<VertexMove>,
    propagate_to_paired: bool,
}

impl MoveVertices {
    /// Creates a new `MoveVertices` operation.
    #[must_use]
    pub fn new(moves: Vec<VertexMove>) -> Self {
        Self {
            moves,
            propagate_to_paired: true,
        }
    }

    /// Disables moving objects coupled through paired molecules.
    #[must_use]
    pub fn without_paired_propagation(mut self) -> Self {
        self.propagate_to_paired = false;
        self
    }

    /// Executes the batch.
    ///
    /// # Errors
    ///
    /// Returns [`VertexMoveError::DuplicateVertex`] (fatal) if a vertex is
    /// requested twice, or [`VertexMoveError::UnknownVertex`]; in both
    /// cases no vertex has been moved.
    pub fn execute<C: SpeciesCatalog>(&self, partition: &mut Partition<C>) -> Result<VertexMoveOutcome> {
        let mut batches = self.group_by_object(partition)?;
        if partition.config.randomize_vertex_move_order {
            batches.shuffle(&mut partition.rng);
            for (_, moves) in &mut batches {
                moves.shuffle(&mut partition.rng);
            }
        }

        let mut outcome = VertexMoveOutcome::default();
        let mut applied = Vec::with_capacity(batches.len());
        for (object, moves) in batches {
            let moves =
                collide::resolve_collisions(partition, object, &moves, &mut outcome.colliding_walls)?;
            applied.push(relocate::apply_object_moves(partition, object, &moves)?);
        }

        let moved_counted = applied.iter().any(|a| {
            !a.moves.is_empty()
                && partition
                    .geometry
                    .object(a.object)
                    .is_ok_and(|object| object.is_counted)
        });
        if moved_counted && partition.waypoints_initialized {
            tracing::debug!("counted geometry moved, rebuilding waypoints");
            partition.invalidate_waypoints();
            partition.initialize_waypoints()?;
        } else if moved_counted {
            partition.invalidate_waypoints();
        }
        for id in applied.iter().flat_map(|a| a.relocated.iter().copied()) {
            if partition.does_molecule_exist(id) {
                partition.reclassify_volume_molecule(id)?;
            }
        }

        if self.propagate_to_paired {
            let requested: BTreeSet<VertexId> = self.moves.iter().map(|m| m.vertex).collect();
            let generated = paired::paired_vertex_moves(partition, &applied, &requested)?;
            if !generated.is_empty() {
                let secondary = MoveVertices::new(generated.clone())
                    .without_paired_propagation()
                    .execute(partition)?;
                for collision in &secondary.colliding_walls {
                    tracing::warn!(
                        moving_wall = ?collision.moving_wall,
                        colliding_wall = ?collision.colliding_wall,
                        "moving paired molecules caused a wall collision"
                    );
                }
                outcome.colliding_walls.extend(secondary.colliding_walls);
            }
            outcome.vertex_moves_due_to_paired_molecules = generated;
        }
        Ok(outcome)
    }

    /// Validates the requests and splits them by object, objects in order
    /// of first appearance.
    fn group_by_object<C: SpeciesCatalog>(
        &self,
        partition: &Partition<C>,
    ) -> Result<Vec<(ObjectId, Vec<VertexMove>)>> {
        let mut seen = HashSet::with_capacity(self.moves.len());
        let mut batches: Vec<(ObjectId, Vec<VertexMove>)> = Vec::new();
        for m in &self.moves {
            if !seen.insert(m.vertex) {
                return Err(VertexMoveError::DuplicateVertex(m.vertex).into());
            }
            let object = partition
                .geometry
                .vertex(m.vertex)
                .map_err(|_| VertexMoveError::UnknownVertex(m.vertex))?
                .object;
            match batches.iter_mut().find(|(o, _)| *o == object) {
                Some((_, moves)) => moves.push(*m),
                None => batches.push((object, vec![*m])),
            }
        }
        Ok(batches)
    }
}
