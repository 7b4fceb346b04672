use std::collections::BTreeSet;

use crate::catalog::SpeciesCatalog;
use crate::error::Result;
use crate::geometry::{ObjectId, VertexId, WallId};
use crate::math::intersect_3d::{segment_triangle_intersect, SegmentHit};
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::partition::Partition;

use super::{VertexMove, WallCollision};

/// First wall of another object met by a segment.
enum Obstacle {
    None,
    Wall { t: f64, wall: WallId },
    Redo(WallId),
}

/// Filters and clamps the moves of one object against all other objects.
///
/// Returns the surviving moves in request order; collisions are added to
/// `collisions`.
pub(super) fn resolve_collisions<C: SpeciesCatalog>(
    partition: &Partition<C>,
    object: ObjectId,
    moves: &[VertexMove],
    collisions: &mut BTreeSet<WallCollision>,
) -> Result<Vec<VertexMove>> {
    let mut resolved = Vec::with_capacity(moves.len());
    for m in moves {
        if !vertex_is_movable(partition, m.vertex)? {
            tracing::debug!(vertex = ?m.vertex, "vertex belongs to a non-movable wall, move vetoed");
            continue;
        }
        if let Some(clamped) = clamp_move(partition, object, m, collisions)? {
            resolved.push(clamped);
        }
    }
    cancel_piercing_edges(partition, object, &mut resolved, collisions)?;
    Ok(resolved)
}

fn vertex_is_movable<C: SpeciesCatalog>(partition: &Partition<C>, vertex: VertexId) -> Result<bool> {
    for &wall in partition.geometry.walls_of_vertex(vertex) {
        if !partition.geometry.wall(wall)?.is_movable {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Shortens a move so that the vertex stops the minimum gap in front of
/// the first wall of another object on its way.
///
/// Returns `None` when the move is discarded: its path touches a wall
/// degenerately, or nothing is left of it after clamping.
fn clamp_move<C: SpeciesCatalog>(
    partition: &Partition<C>,
    object: ObjectId,
    m: &VertexMove,
    collisions: &mut BTreeSet<WallCollision>,
) -> Result<Option<VertexMove>> {
    let origin = partition.geometry.vertex(m.vertex)?.point;
    let displacement = m.displacement;
    let length = displacement.norm();
    if length < TOLERANCE {
        return Ok(None);
    }

    if !partition.grid.contains(&(origin + displacement)) {
        tracing::debug!(vertex = ?m.vertex, "vertex would leave the partition, move discarded");
        return Ok(None);
    }

    let (t, wall) = match first_obstacle(partition, object, &origin, &displacement)? {
        Obstacle::None => return Ok(Some(*m)),
        Obstacle::Redo(wall) => {
            tracing::debug!(vertex = ?m.vertex, ?wall, "vertex path grazes a wall, move discarded");
            return Ok(None);
        }
        Obstacle::Wall { t, wall } => (t, wall),
    };

    record(partition, m.vertex, wall, collisions);
    let normal = partition.geometry.wall(wall)?.geometry.normal;
    let cos = (normal.dot(&displacement) / length).abs().max(TOLERANCE);
    let backoff = partition.config.vertex_move_min_gap / cos / length;
    let t = (t - backoff).max(0.0);
    tracing::debug!(vertex = ?m.vertex, ?wall, fraction = t, "vertex move clamped by a wall");
    if t * length < TOLERANCE {
        return Ok(None);
    }
    Ok(Some(VertexMove::new(m.vertex, displacement * t)))
}

/// Drops moves until no edge from a moved vertex to a fixed neighbor
/// passes through another object.
fn cancel_piercing_edges<C: SpeciesCatalog>(
    partition: &Partition<C>,
    object: ObjectId,
    moves: &mut Vec<VertexMove>,
    collisions: &mut BTreeSet<WallCollision>,
) -> Result<()> {
    loop {
        let moved: BTreeSet<VertexId> = moves.iter().map(|m| m.vertex).collect();
        let mut cancelled = None;
        'moves: for m in moves.iter() {
            let target = partition.geometry.vertex(m.vertex)?.point + m.displacement;
            for neighbor in partition.geometry.vertex_neighbors(m.vertex) {
                if moved.contains(&neighbor) {
                    continue;
                }
                let from = partition.geometry.vertex(neighbor)?.point;
                match first_obstacle(partition, object, &from, &(target - from))? {
                    Obstacle::None => {}
                    Obstacle::Wall { wall, .. } | Obstacle::Redo(wall) => {
                        cancelled = Some((m.vertex, wall));
                        break 'moves;
                    }
                }
            }
        }

        let Some((vertex, wall)) = cancelled else {
            return Ok(());
        };
        tracing::debug!(?vertex, ?wall, "moved edge would pierce a wall, move cancelled");
        record(partition, vertex, wall, collisions);
        moves.retain(|m| m.vertex != vertex);
    }
}

/// Nearest wall of another object crossed by `origin .. origin + displacement`.
fn first_obstacle<C: SpeciesCatalog>(
    partition: &Partition<C>,
    object: ObjectId,
    origin: &Point3,
    displacement: &Vector3,
) -> Result<Obstacle> {
    let end = origin + displacement;
    let mut nearest = Obstacle::None;
    for wall in partition.grid.walls_near_segment(origin, &end) {
        if partition.geometry.wall(wall)?.object == object {
            continue;
        }
        let points = partition.geometry.wall_points(wall)?;
        match segment_triangle_intersect(origin, displacement, &points) {
            SegmentHit::Miss => {}
            SegmentHit::Redo => return Ok(Obstacle::Redo(wall)),
            SegmentHit::Hit { t, .. } => {
                if !matches!(nearest, Obstacle::Wall { t: best, .. } if best <= t) {
                    nearest = Obstacle::Wall { t, wall };
                }
            }
        }
    }
    Ok(nearest)
}

fn record<C: SpeciesCatalog>(
    partition: &Partition<C>,
    vertex: VertexId,
    colliding_wall: WallId,
    collisions: &mut BTreeSet<WallCollision>,
) {
    for &moving_wall in partition.geometry.walls_of_vertex(vertex) {
        collisions.insert(WallCollision {
            moving_wall,
            colliding_wall,
        });
    }
}
