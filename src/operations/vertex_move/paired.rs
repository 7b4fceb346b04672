use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::catalog::SpeciesCatalog;
use crate::error::Result;
use crate::geometry::VertexId;
use crate::math::triangle::point_from_barycentric;
use crate::math::Vector3;
use crate::molecule::Molecule;
use crate::partition::Partition;

use super::relocate::AppliedMoves;
use super::VertexMove;

/// Moves that make partners of moved paired molecules follow.
///
/// A moved paired molecule was displaced by the average displacement of
/// its wall's three vertices. Its partner's wall vertex closest to the
/// partner receives that displacement; a vertex targeted several times
/// gets the mean. Vertices already part of the original batch are left
/// alone.
pub(super) fn paired_vertex_moves<C: SpeciesCatalog>(
    partition: &Partition<C>,
    applied: &[AppliedMoves],
    requested: &BTreeSet<VertexId>,
) -> Result<Vec<VertexMove>> {
    let mut targets: BTreeMap<VertexId, Vec<Vector3>> = BTreeMap::new();

    for batch in applied {
        if batch.paired.is_empty() {
            continue;
        }
        let displacements: HashMap<_, _> = batch
            .moves
            .iter()
            .map(|m| (m.vertex, m.displacement))
            .collect();
        let mut partner_objects = BTreeSet::new();

        for &id in &batch.paired {
            let Some(local) = partition.molecules.get(id).and_then(Molecule::as_surface) else {
                continue;
            };
            let Some(&partner_id) = partition.paired.get(&id) else {
                continue;
            };
            let Some(partner) = partition.molecules.get(partner_id).and_then(Molecule::as_surface)
            else {
                continue;
            };

            let local_wall = partition.geometry.wall(local.wall)?;
            let displacement = local_wall
                .vertices
                .iter()
                .map(|v| displacements.get(v).copied().unwrap_or_else(Vector3::zeros))
                .sum::<Vector3>()
                / 3.0;

            let partner_wall = partition.geometry.wall(partner.wall)?;
            partner_objects.insert(partner_wall.object);
            let points = partition.geometry.wall_points(partner.wall)?;
            let position = point_from_barycentric(&points, partner.barycentric.x, partner.barycentric.y);
            let nearest = partner_wall
                .vertices
                .iter()
                .zip(&points)
                .min_by(|(_, a), (_, b)| {
                    (*a - position)
                        .norm_squared()
                        .total_cmp(&(*b - position).norm_squared())
                })
                .map(|(&vertex, _)| vertex);

            if let Some(vertex) = nearest.filter(|v| !requested.contains(v)) {
                targets.entry(vertex).or_default().push(displacement);
            }
        }

        if partner_objects.len() > 1 {
            tracing::warn!(
                object = ?batch.object,
                partners = partner_objects.len(),
                "paired molecules of one object are paired with more than one other object"
            );
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let moves = targets
        .into_iter()
        .map(|(vertex, displacements)| {
            let count = displacements.len() as f64;
            let mean = displacements.into_iter().sum::<Vector3>() / count;
            VertexMove::new(vertex, mean)
        })
        .collect();
    Ok(moves)
}
