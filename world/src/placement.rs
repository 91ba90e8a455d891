//! Random cell selection for agent start positions and goals.

use kinetic_grid_core::{CellCoord, GridDimensions};
use rand::Rng;

/// Draws a uniformly random cell inside the grid.
///
/// Returns the origin for grids without cells.
pub fn random_cell<R: Rng + ?Sized>(rng: &mut R, grid: GridDimensions) -> CellCoord {
    if grid.columns() == 0 || grid.rows() == 0 {
        return CellCoord::new(0, 0);
    }
    let column = rng.gen_range(0..grid.columns());
    let row = rng.gen_range(0..grid.rows());
    CellCoord::new(
        i32::try_from(column).unwrap_or(i32::MAX),
        i32::try_from(row).unwrap_or(i32::MAX),
    )
}

/// Draws random cells until one is not reported as occupied.
///
/// Gives up after `attempts` draws and falls back to the origin, even when the
/// origin itself is occupied.
pub fn random_free_cell<R, F>(
    rng: &mut R,
    grid: GridDimensions,
    attempts: u32,
    mut is_occupied: F,
) -> CellCoord
where
    R: Rng + ?Sized,
    F: FnMut(CellCoord) -> bool,
{
    for _ in 0..attempts {
        let cell = random_cell(rng, grid);
        if !is_occupied(cell) {
            return cell;
        }
    }
    CellCoord::new(0, 0)
}
