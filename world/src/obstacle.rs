//! Static footprints stamped into the grid.

use gridwalk_core::{AgentId, Coord2D};
use tracing::debug;

use crate::{Grid, GridError};

/// A static body (structure, resource node) covering a rectangular footprint.
///
/// The footprint is centred on `position`: its lower corner is
/// `position + offset - dimensions / 2` (component-wise floor).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Obstacle {
    id: AgentId,
    position: Coord2D,
    dimensions: Coord2D,
    offset: Coord2D,
}

impl Obstacle {
    /// Creates a new obstacle description.
    #[must_use]
    pub const fn new(id: AgentId, position: Coord2D, dimensions: Coord2D) -> Self {
        Self {
            id,
            position,
            dimensions,
            offset: Coord2D::new(0, 0),
        }
    }

    /// Shifts the footprint relative to the obstacle position.
    #[must_use]
    pub const fn with_offset(mut self, offset: Coord2D) -> Self {
        self.offset = offset;
        self
    }

    /// Body identifier registered as occupant of every footprint cell.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Anchor position of the obstacle.
    #[must_use]
    pub const fn position(&self) -> Coord2D {
        self.position
    }

    /// Footprint extent in cells.
    #[must_use]
    pub const fn dimensions(&self) -> Coord2D {
        self.dimensions
    }

    /// Lower corner of the footprint.
    #[must_use]
    pub fn origin(&self) -> Coord2D {
        let half = Coord2D::new(
            self.dimensions.x().div_euclid(2),
            self.dimensions.y().div_euclid(2),
        );
        self.position + self.offset - half
    }

    /// Coordinates covered by the footprint, row by row.
    pub fn footprint(&self) -> impl Iterator<Item = Coord2D> {
        let origin = self.origin();
        let width = self.dimensions.x().max(0);
        let height = self.dimensions.y().max(0);
        (0..height).flat_map(move |dy| (0..width).map(move |dx| origin + Coord2D::new(dx, dy)))
    }

    /// Marks the footprint impassable and registers the obstacle as occupant.
    ///
    /// Nothing is modified when any footprint cell lies outside the grid.
    pub fn bake_to_grid(&self, grid: &mut Grid) -> Result<(), GridError> {
        self.ensure_inside(grid)?;
        for coord in self.footprint() {
            let cell = grid.cell_mut_unchecked(coord);
            cell.cover();
            cell.add_occupant(self.id);
        }
        debug!(
            target: "gridwalk::world",
            obstacle = %self.id,
            origin = %self.origin(),
            dimensions = %self.dimensions,
            "obstacle baked"
        );
        Ok(())
    }

    /// Reverses [`Obstacle::bake_to_grid`].
    ///
    /// Cells stay impassable while another baked footprint still covers them.
    pub fn unbake_from_grid(&self, grid: &mut Grid) -> Result<(), GridError> {
        self.ensure_inside(grid)?;
        for coord in self.footprint() {
            let cell = grid.cell_mut_unchecked(coord);
            if cell.remove_occupant(self.id) {
                cell.uncover();
            }
        }
        debug!(
            target: "gridwalk::world",
            obstacle = %self.id,
            origin = %self.origin(),
            "obstacle unbaked"
        );
        Ok(())
    }

    fn ensure_inside(&self, grid: &Grid) -> Result<(), GridError> {
        match self.footprint().find(|coord| !grid.contains(*coord)) {
            Some(coord) => Err(GridError::FootprintOutOfBounds {
                obstacle: self.id,
                coord,
            }),
            None => Ok(()),
        }
    }
}
