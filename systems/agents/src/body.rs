//! Grid-bound body: logical cell plus a continuous physical position.

use glam::Vec2;
use gridwalk_core::{AgentId, Coord2D, Direction8};
use gridwalk_world::Grid;
use rand::Rng;

/// A body occupying one grid cell.
///
/// The logical `grid_position` only changes through the occupancy-aware
/// setters, which keep the grid's occupant sets in step. The physical
/// position is free-floating and is pulled towards the logical cell by
/// interpolation.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    id: AgentId,
    grid_position: Coord2D,
    dimensions: Coord2D,
    physical: Vec2,
}

impl Body {
    /// Creates a body whose physical position sits exactly on `position`.
    ///
    /// The body is not registered on any grid until it is placed.
    #[must_use]
    pub fn new(id: AgentId, position: Coord2D, dimensions: Coord2D) -> Self {
        Self {
            id,
            grid_position: position,
            dimensions,
            physical: cell_center(position),
        }
    }

    /// Identifier used as the occupant entry.
    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Logical cell of the body.
    #[must_use]
    pub fn grid_position(&self) -> Coord2D {
        self.grid_position
    }

    /// Bounding dimensions in cells.
    #[must_use]
    pub fn dimensions(&self) -> Coord2D {
        self.dimensions
    }

    /// Continuous position, in cell units.
    #[must_use]
    pub fn physical_position(&self) -> Vec2 {
        self.physical
    }

    /// Moves the physical position without touching the grid.
    pub fn set_physical_position(&mut self, position: Vec2) {
        self.physical = position;
    }

    /// Chebyshev distance from the logical cell to `coord`.
    #[must_use]
    pub fn distance_to(&self, coord: Coord2D) -> u32 {
        self.grid_position.distance_to(coord)
    }

    /// Reports whether the body could enter `(x, y)`.
    #[must_use]
    pub fn can_set_position(&self, grid: &Grid, x: i32, y: i32, ignore_occupied: bool) -> bool {
        grid.can_occupy(Coord2D::new(x, y), ignore_occupied)
    }

    /// Checked move to `(x, y)`; the occupant sets change atomically on success.
    pub fn set_position(&mut self, grid: &mut Grid, x: i32, y: i32, ignore_occupied: bool) -> bool {
        let to = Coord2D::new(x, y);
        if !grid.set_position(self.id, to, ignore_occupied) {
            return false;
        }
        self.grid_position = to;
        true
    }

    /// Forced move that ignores passability and occupancy.
    ///
    /// Out-of-grid coordinates are clamped; the cell actually entered is returned.
    pub fn set_position_unsafe(&mut self, grid: &mut Grid, x: i32, y: i32) -> Coord2D {
        self.grid_position = grid.set_position_unsafe(self.id, Coord2D::new(x, y));
        self.grid_position
    }

    /// Checked move by one cell in `direction`.
    pub fn step(&mut self, grid: &mut Grid, direction: Direction8, ignore_occupied: bool) -> bool {
        let to = self.grid_position.step(direction);
        self.set_position(grid, to.x(), to.y(), ignore_occupied)
    }

    /// Removes the body from its cell's occupants.
    ///
    /// The logical position is kept so the body can be placed again.
    pub fn remove_from_grid(&self, grid: &mut Grid) -> Option<Coord2D> {
        grid.remove_body(self.id)
    }

    /// Random cell just outside the body's bounds.
    ///
    /// Each axis is pushed by `1..=dim/2 + 1` cells in a random direction.
    pub fn nearby_coord<R: Rng + ?Sized>(&self, rng: &mut R) -> Coord2D {
        nearby_coord(self.grid_position, self.dimensions, rng)
    }

    /// Soft snap: truncates the physical position into the logical cell.
    ///
    /// Only the body's own bookkeeping changes; callers re-register the
    /// body on the grid with one of the setters.
    pub fn snap_to_grid(&mut self) -> Coord2D {
        let snapped = Coord2D::new(self.physical.x as i32, self.physical.y as i32);
        self.align(snapped)
    }

    /// Hard snap: rounds the physical position into the logical cell.
    pub fn hard_snap_to_grid(&mut self) -> Coord2D {
        let rounded = self.physical.round();
        let snapped = Coord2D::new(rounded.x as i32, rounded.y as i32);
        self.align(snapped)
    }

    /// Pulls the physical position towards the logical cell.
    ///
    /// `factor` is clamped to `0..=1`; one lands exactly on the cell.
    pub fn interpolate(&mut self, factor: f32) {
        let target = cell_center(self.grid_position);
        self.physical = self.physical.lerp(target, factor.clamp(0.0, 1.0));
    }

    fn align(&mut self, coord: Coord2D) -> Coord2D {
        self.grid_position = coord;
        self.physical = cell_center(coord);
        coord
    }
}

/// Random cell just outside a `dimensions` sized footprint around `center`.
pub(crate) fn nearby_coord<R: Rng + ?Sized>(
    center: Coord2D,
    dimensions: Coord2D,
    rng: &mut R,
) -> Coord2D {
    let pad_x = rng.gen_range(1..dimensions.x().max(1) / 2 + 2);
    let pad_y = rng.gen_range(1..dimensions.y().max(1) / 2 + 2);
    let sign_x = if rng.gen_bool(0.5) { -1 } else { 1 };
    let sign_y = if rng.gen_bool(0.5) { -1 } else { 1 };
    center + Coord2D::new(sign_x * pad_x, sign_y * pad_y)
}

fn cell_center(coord: Coord2D) -> Vec2 {
    Vec2::new(coord.x() as f32, coord.y() as f32)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn body_at(x: i32, y: i32) -> Body {
        Body::new(AgentId::new(1), Coord2D::new(x, y), Coord2D::new(1, 1))
    }

    #[test]
    fn checked_moves_respect_occupancy() {
        let mut grid = Grid::new(8).expect("grid");
        let mut body = body_at(2, 2);
        assert!(body.set_position(&mut grid, 2, 2, false));
        assert!(grid.set_position(AgentId::new(2), Coord2D::new(3, 2), false));

        assert!(!body.can_set_position(&grid, 3, 2, false));
        assert!(!body.step(&mut grid, Direction8::East, false));
        assert!(body.step(&mut grid, Direction8::East, true));
        assert_eq!(body.grid_position(), Coord2D::new(3, 2));
        assert_eq!(grid.cell(Coord2D::new(3, 2)).occupant_count(), 2);
        assert!(!grid.cell(Coord2D::new(2, 2)).is_occupied());
    }

    #[test]
    fn unsafe_moves_clamp_to_the_grid() {
        let mut grid = Grid::new(4).expect("grid");
        let mut body = body_at(1, 1);
        assert_eq!(body.set_position_unsafe(&mut grid, 9, -3), Coord2D::new(3, 0));
        assert_eq!(grid.position_of(body.id()), Some(Coord2D::new(3, 0)));
        assert_eq!(body.remove_from_grid(&mut grid), Some(Coord2D::new(3, 0)));
        assert_eq!(body.grid_position(), Coord2D::new(3, 0));
        assert_eq!(grid.body_count(), 0);
    }

    #[test]
    fn snapping_truncates_or_rounds() {
        let mut body = body_at(0, 0);
        body.set_physical_position(Vec2::new(2.7, 4.2));
        assert_eq!(body.snap_to_grid(), Coord2D::new(2, 4));
        body.set_physical_position(Vec2::new(2.7, 4.2));
        assert_eq!(body.hard_snap_to_grid(), Coord2D::new(3, 4));
        assert_eq!(body.physical_position(), Vec2::new(3.0, 4.0));
    }

    #[test]
    fn nearby_coord_stays_outside_the_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let body = Body::new(AgentId::new(3), Coord2D::new(10, 10), Coord2D::new(3, 3));
        for _ in 0..64 {
            let near = body.nearby_coord(&mut rng);
            let dx = (near.x() - 10).abs();
            let dy = (near.y() - 10).abs();
            assert!((1..=2).contains(&dx), "dx {dx}");
            assert!((1..=2).contains(&dy), "dy {dy}");
        }
    }

    #[test]
    fn interpolation_converges_on_the_cell() {
        let mut body = body_at(0, 0);
        body.set_physical_position(Vec2::new(4.0, 0.0));
        body.interpolate(0.5);
        assert_eq!(body.physical_position(), Vec2::new(2.0, 0.0));
        body.interpolate(3.0);
        assert_eq!(body.physical_position(), Vec2::ZERO);
    }
}
