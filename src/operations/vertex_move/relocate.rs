use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::catalog::SpeciesCatalog;
use crate::counted_volume::CountedVolumeIndex;
use crate::error::Result;
use crate::geometry::{ObjectId, SurfaceGrid, WallId};
use crate::math::triangle::{closest_point_on_triangle, point_in_swept_prism};
use crate::math::{Point2, Point3, Vector3, TOLERANCE};
use crate::molecule::{Molecule, MoleculeId};
use crate::partition::Partition;

use super::VertexMove;

/// What applying one object's moves did.
#[derive(Debug)]
pub(super) struct AppliedMoves {
    pub object: ObjectId,
    pub moves: Vec<VertexMove>,
    /// Walls with at least one moved vertex.
    pub walls: BTreeSet<WallId>,
    /// Volume molecules pushed aside by the moving walls.
    pub relocated: Vec<MoleculeId>,
    /// Surface molecules on moved walls that have a partner.
    pub paired: Vec<MoleculeId>,
}

/// Volume molecule swept over by a moving wall.
struct SweptMolecule {
    id: MoleculeId,
    position: Point3,
    wall: WallId,
    /// `1.0` if the molecule was in front of the wall before the move.
    side: f64,
}

/// Applies clamped moves of one object and repairs everything that
/// depends on its wall positions.
pub(super) fn apply_object_moves<C: SpeciesCatalog>(
    partition: &mut Partition<C>,
    object: ObjectId,
    moves: &[VertexMove],
) -> Result<AppliedMoves> {
    let mut applied = AppliedMoves {
        object,
        moves: moves.to_vec(),
        walls: BTreeSet::new(),
        relocated: Vec::new(),
        paired: Vec::new(),
    };
    if moves.is_empty() {
        return Ok(applied);
    }

    let displacements: HashMap<_, _> = moves.iter().map(|m| (m.vertex, m.displacement)).collect();
    applied.walls = moves
        .iter()
        .flat_map(|m| partition.geometry.walls_of_vertex(m.vertex).iter().copied())
        .collect();

    // Wall shapes before and after.
    let mut sweeps = BTreeMap::new();
    for &wall in &applied.walls {
        let old = partition.geometry.wall_points(wall)?;
        let vertices = partition.geometry.wall(wall)?.vertices;
        let mut new = old;
        for (point, vertex) in new.iter_mut().zip(vertices) {
            if let Some(d) = displacements.get(&vertex) {
                *point += *d;
            }
        }
        sweeps.insert(wall, (old, new));
    }

    let swept = find_swept_molecules(partition, &sweeps)?;
    let surface: Vec<MoleculeId> = {
        let mut ids: Vec<_> = partition
            .molecules
            .iter()
            .filter(|m| m.as_surface().is_some_and(|sm| applied.walls.contains(&sm.wall)))
            .map(|m| m.id)
            .collect();
        ids.sort_unstable();
        ids
    };
    applied.paired = surface
        .iter()
        .copied()
        .filter(|id| partition.paired.contains_key(id))
        .collect();

    for &wall in &applied.walls {
        partition.remove_wall_from_subparts(wall)?;
    }
    for m in moves {
        partition.geometry.vertex_mut(m.vertex)?.point += m.displacement;
    }
    let mut resized = BTreeSet::new();
    for &wall in &applied.walls {
        let previous_area = partition.geometry.update_wall_geometry(wall)?;
        let area = partition.geometry.wall(wall)?.geometry.area;
        if (area - previous_area).abs() > TOLERANCE * previous_area.max(1.0) {
            resized.insert(wall);
        }
    }
    for &wall in &applied.walls {
        partition.insert_wall_into_subparts(wall)?;
    }

    applied.relocated = relocate_volume_molecules(partition, &swept)?;
    rebuild_surface_grids(partition, &resized, &surface)?;
    tracing::debug!(
        ?object,
        vertices = moves.len(),
        walls = applied.walls.len(),
        relocated = applied.relocated.len(),
        regridded = resized.len(),
        "applied vertex moves"
    );
    Ok(applied)
}

/// Volume molecules lying in the volume a wall sweeps through.
fn find_swept_molecules<C: SpeciesCatalog>(
    partition: &Partition<C>,
    sweeps: &BTreeMap<WallId, ([Point3; 3], [Point3; 3])>,
) -> Result<Vec<SweptMolecule>> {
    let mut subparts = BTreeSet::new();
    for (old, new) in sweeps.values() {
        let min = old.iter().chain(new).fold(old[0], |acc, p| acc.inf(p));
        let max = old.iter().chain(new).fold(old[0], |acc, p| acc.sup(p));
        subparts.extend(partition.grid.subparts_in_box(&min, &max));
    }

    let mut swept = Vec::new();
    for molecule in partition.molecules.iter() {
        let Some(vm) = molecule.as_volume() else {
            continue;
        };
        if !subparts.contains(&vm.subpart) {
            continue;
        }
        let hit = sweeps
            .iter()
            .find(|(_, (old, new))| point_in_swept_prism(&vm.position, old, new));
        if let Some((&wall, (old, _))) = hit {
            let normal = partition.geometry.wall(wall)?.geometry.normal;
            let side = if normal.dot(&(vm.position - old[0])) < 0.0 {
                -1.0
            } else {
                1.0
            };
            swept.push(SweptMolecule {
                id: molecule.id,
                position: vm.position,
                wall,
                side,
            });
        }
    }
    Ok(swept)
}

/// Moves swept molecules to the closest point of their wall's new shape,
/// the minimum gap off the wall on the side they came from.
fn relocate_volume_molecules<C: SpeciesCatalog>(
    partition: &mut Partition<C>,
    swept: &[SweptMolecule],
) -> Result<Vec<MoleculeId>> {
    let gap = partition.config.vertex_move_min_gap;
    let mut relocated = Vec::with_capacity(swept.len());
    for molecule in swept {
        let points = partition.geometry.wall_points(molecule.wall)?;
        let normal: Vector3 = partition.geometry.wall(molecule.wall)?.geometry.normal;
        let position =
            closest_point_on_triangle(&molecule.position, &points) + normal * (molecule.side * gap);
        let Some(subpart) = partition.grid.subpart_index(&position) else {
            tracing::warn!(id = %molecule.id, ?position, "relocated molecule would leave the partition, left in place");
            continue;
        };
        let current = partition.get_molecule(molecule.id)?;
        let compartment = current.compartment;
        let counted_volume = current
            .as_volume()
            .map_or(CountedVolumeIndex::OUTSIDE_ALL, |vm| vm.counted_volume);
        partition.set_volume_molecule_state(
            molecule.id,
            position,
            subpart,
            counted_volume,
            compartment,
        )?;
        partition.update_reactant_subpart(molecule.id)?;
        relocated.push(molecule.id);
    }
    Ok(relocated)
}

/// Replaces the surface grids of resized walls and puts their molecules,
/// in ID order, on the free tile closest to their barycentric position.
fn rebuild_surface_grids<C: SpeciesCatalog>(
    partition: &mut Partition<C>,
    resized: &BTreeSet<WallId>,
    surface: &[MoleculeId],
) -> Result<()> {
    let density = partition.config.surface_grid_density;
    for &wall in resized {
        let data = partition.geometry.wall_mut(wall)?;
        if data.surface_grid.is_some() {
            data.surface_grid = Some(SurfaceGrid::new(data.geometry.area, density));
        }
    }

    let mut homeless = Vec::new();
    for &id in surface {
        let Some(sm) = partition.molecules.get(id).and_then(Molecule::as_surface).copied() else {
            continue;
        };
        if !resized.contains(&sm.wall) {
            continue;
        }
        let grid = partition
            .geometry
            .wall_mut(sm.wall)?
            .surface_grid_or_init(density);
        let (u, v) = (sm.barycentric.x, sm.barycentric.y);
        let preferred = grid.tile_for_barycentric(u, v);
        let (tile, barycentric) = if grid.occupant(preferred).is_none() {
            (preferred, sm.barycentric)
        } else if let Some(free) = grid.nearest_free_tile(u, v) {
            let (cu, cv) = grid.tile_center(free);
            (free, Point2::new(cu, cv))
        } else {
            homeless.push(id);
            continue;
        };
        if grid.occupy(tile, id).is_err() {
            homeless.push(id);
            continue;
        }
        if let Some(sm) = partition.molecules.get_mut(id).and_then(Molecule::as_surface_mut) {
            sm.tile = tile;
            sm.barycentric = barycentric;
        }
    }

    for id in homeless {
        tracing::warn!(%id, "no free tile left on shrunken wall, molecule removed");
        partition.set_molecule_as_defunct(id)?;
    }
    Ok(())
}
