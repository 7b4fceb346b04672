use crate::molecule::MoleculeId;

/// Index of a tile within a wall's surface grid.
pub type TileIndex = usize;

/// Triangular tiling of a wall holding at most one surface molecule per tile.
///
/// Each wall edge is split into `strips` pieces, giving `strips²` congruent
/// tiles. Tiles are addressed through barycentric coordinates `(u, v)` of
/// the wall (weights of its second and third vertex), which stay valid
/// while the wall deforms.
///
/// Rows run along `v`. Row `j` holds `strips - j` upright tiles
/// interleaved with `strips - j - 1` inverted ones.
#[derive(Debug, Clone)]
pub struct SurfaceGrid {
    strips: usize,
    occupancy: Vec<Option<MoleculeId>>,
}

impl SurfaceGrid {
    /// Creates an empty grid sized for a wall of `area` at `density` tiles
    /// per unit area.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn new(area: f64, density: f64) -> Self {
        let strips = (area * density).sqrt().ceil().max(1.0) as usize;
        Self {
            strips,
            occupancy: vec![None; strips * strips],
        }
    }

    /// Number of tiles along each wall edge.
    #[must_use]
    pub fn strips(&self) -> usize {
        self.strips
    }

    #[must_use]
    pub fn num_tiles(&self) -> usize {
        self.occupancy.len()
    }

    /// Tile containing the barycentric position `(u, v)`.
    ///
    /// Positions slightly outside the wall are clamped to the nearest tile.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn tile_for_barycentric(&self, u: f64, v: f64) -> TileIndex {
        let n = self.strips;
        let su = u.clamp(0.0, 1.0) * n as f64;
        let sv = v.clamp(0.0, 1.0) * n as f64;

        let j = (sv.floor() as usize).min(n - 1);
        let i = (su.floor() as usize).min(n - 1 - j);
        let fu = su - i as f64;
        let fv = sv - j as f64;
        let inverted = fu + fv > 1.0 && i + j + 1 < n;
        self.index_of(i, j, inverted)
    }

    /// Barycentric coordinates of a tile's centroid.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tile_center(&self, tile: TileIndex) -> (f64, f64) {
        let (i, j, inverted) = self.tile_coords(tile);
        let offset = if inverted { 2.0 / 3.0 } else { 1.0 / 3.0 };
        let n = self.strips as f64;
        ((i as f64 + offset) / n, (j as f64 + offset) / n)
    }

    #[must_use]
    pub fn occupant(&self, tile: TileIndex) -> Option<MoleculeId> {
        self.occupancy.get(tile).copied().flatten()
    }

    /// Places `molecule` on `tile`.
    ///
    /// # Errors
    ///
    /// Returns the current occupant if the tile is taken.
    pub fn occupy(&mut self, tile: TileIndex, molecule: MoleculeId) -> Result<(), MoleculeId> {
        match self.occupancy.get_mut(tile) {
            Some(Some(occupant)) => Err(*occupant),
            Some(slot) => {
                *slot = Some(molecule);
                Ok(())
            }
            None => Err(molecule),
        }
    }

    /// Clears a tile, returning its previous occupant.
    pub fn vacate(&mut self, tile: TileIndex) -> Option<MoleculeId> {
        self.occupancy.get_mut(tile).and_then(Option::take)
    }

    /// Free tile whose centroid is closest to `(u, v)`; ties go to the
    /// lower tile index.
    #[must_use]
    pub fn nearest_free_tile(&self, u: f64, v: f64) -> Option<TileIndex> {
        let mut best: Option<(TileIndex, f64)> = None;
        for tile in (0..self.num_tiles()).filter(|&t| self.occupancy[t].is_none()) {
            let (cu, cv) = self.tile_center(tile);
            let dist = (cu - u).powi(2) + (cv - v).powi(2);
            if best.is_none_or(|(_, d)| dist < d) {
                best = Some((tile, dist));
            }
        }
        best.map(|(tile, _)| tile)
    }

    /// Number of occupied tiles.
    #[must_use]
    pub fn num_occupied(&self) -> usize {
        self.occupancy.iter().filter(|slot| slot.is_some()).count()
    }

    fn index_of(&self, i: usize, j: usize, inverted: bool) -> TileIndex {
        2 * self.strips * j - j * j + 2 * i + usize::from(inverted)
    }

    fn tile_coords(&self, tile: TileIndex) -> (usize, usize, bool) {
        let n = self.strips;
        let mut j = 0;
        let mut row_start = 0;
        while j + 1 < n && tile >= row_start + 2 * (n - j) - 1 {
            row_start += 2 * (n - j) - 1;
            j += 1;
        }
        let within = tile - row_start;
        (within / 2, j, within % 2 == 1)
    }
}
