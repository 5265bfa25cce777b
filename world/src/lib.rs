#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative navigation grid for gridwalk.
//!
//! The [`Grid`] owns every [`Cell`] and the index of body positions. Occupant
//! lists are only ever written through the grid's position operations and
//! through [`Obstacle`] bake/unbake, so a cell's occupants always match the
//! bodies whose recorded position is that cell. Read-only spatial queries for
//! external collaborators live in [`query`]. Systems running on other threads
//! share the grid through [`SharedGrid`].

use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use gridwalk_core::{AgentId, Coord2D, Direction8};
use thiserror::Error;
use tracing::trace;

mod cell;
mod obstacle;

pub use cell::Cell;
pub use obstacle::Obstacle;

/// Errors raised by strict grid operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// A grid must contain at least one cell.
    #[error("grid size must be greater than zero")]
    ZeroSize,
    /// A coordinate fell outside of the grid.
    #[error("coordinate {coord} lies outside of a {size}x{size} grid")]
    OutOfBounds {
        /// Offending coordinate.
        coord: Coord2D,
        /// Edge length of the grid.
        size: u32,
    },
    /// An obstacle footprint extends past the grid edge.
    #[error("footprint of obstacle {obstacle} leaves the grid at {coord}")]
    FootprintOutOfBounds {
        /// Obstacle being baked or unbaked.
        obstacle: AgentId,
        /// First footprint coordinate outside of the grid.
        coord: Coord2D,
    },
}

/// Fixed-size square array of cells plus the position index of moving bodies.
#[derive(Clone, Debug)]
pub struct Grid {
    size: u32,
    cells: Vec<Cell>,
    positions: HashMap<AgentId, Coord2D>,
}

impl Grid {
    /// Creates an all-passable grid with `size` cells per edge.
    pub fn new(size: u32) -> Result<Self, GridError> {
        if size == 0 {
            return Err(GridError::ZeroSize);
        }
        let edge = i32::try_from(size).map_err(|_| GridError::OutOfBounds {
            coord: Coord2D::new(i32::MAX, i32::MAX),
            size,
        })?;
        let cells = (0..edge)
            .flat_map(|y| (0..edge).map(move |x| Cell::new(Coord2D::new(x, y))))
            .collect();
        Ok(Self {
            size,
            cells,
            positions: HashMap::new(),
        })
    }

    /// Edge length of the grid in cells.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Reports whether the coordinate lies within the grid.
    #[must_use]
    pub fn contains(&self, coord: Coord2D) -> bool {
        let inside = |value: i32| u32::try_from(value).map_or(false, |value| value < self.size);
        inside(coord.x()) && inside(coord.y())
    }

    /// Clamps a coordinate onto the nearest in-bounds cell.
    #[must_use]
    pub fn clamp(&self, coord: Coord2D) -> Coord2D {
        let max = self.max_index();
        Coord2D::new(coord.x().clamp(0, max), coord.y().clamp(0, max))
    }

    /// Cell at `(x, y)`, clamping out-of-range input onto the grid edge.
    ///
    /// Never fails. Use [`Grid::get`] to treat out-of-range input as an error.
    #[must_use]
    pub fn at(&self, x: i32, y: i32) -> &Cell {
        &self.cells[self.index(Coord2D::new(x, y))]
    }

    /// Mutable cell at `(x, y)` with the same clamping as [`Grid::at`].
    pub fn at_mut(&mut self, x: i32, y: i32) -> &mut Cell {
        let index = self.index(Coord2D::new(x, y));
        &mut self.cells[index]
    }

    /// Clamped cell lookup by coordinate.
    #[must_use]
    pub fn cell(&self, coord: Coord2D) -> &Cell {
        self.at(coord.x(), coord.y())
    }

    /// Strict cell lookup.
    pub fn get(&self, coord: Coord2D) -> Result<&Cell, GridError> {
        self.ensure_contains(coord)?;
        Ok(self.cell(coord))
    }

    /// Strict mutable cell lookup.
    pub fn get_mut(&mut self, coord: Coord2D) -> Result<&mut Cell, GridError> {
        self.ensure_contains(coord)?;
        Ok(self.cell_mut_unchecked(coord))
    }

    /// Iterates every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Moore neighbourhood of `coord`, counter-clockwise from `+x`.
    ///
    /// Each neighbour is clamped, so cells on the edge report themselves or a
    /// duplicate in place of the missing neighbours.
    #[must_use]
    pub fn neighbors(&self, coord: Coord2D) -> [Coord2D; 8] {
        Direction8::ALL.map(|direction| self.clamp(coord.step(direction)))
    }

    /// Reports whether a single step from `from` into `to` respects the corner rule.
    ///
    /// Orthogonal steps are always allowed. A diagonal step needs one of its two
    /// flanking orthogonal cells to be passable, unless `to` can be pathed
    /// through, in which case the check is skipped.
    #[must_use]
    pub fn is_diagonal_open(&self, from: Coord2D, to: Coord2D) -> bool {
        let delta = to - from;
        if delta.x() == 0 || delta.y() == 0 {
            return true;
        }
        if self.cell(to).can_path_thru() {
            return true;
        }
        let horizontal = Coord2D::new(from.x() + delta.x(), from.y());
        let vertical = Coord2D::new(from.x(), from.y() + delta.y());
        self.cell(horizontal).is_passable() || self.cell(vertical).is_passable()
    }

    /// Reports whether a body could stand on `coord`.
    ///
    /// Out-of-range coordinates are never valid targets.
    #[must_use]
    pub fn can_occupy(&self, coord: Coord2D, ignore_occupied: bool) -> bool {
        if !self.contains(coord) {
            return false;
        }
        let cell = self.cell(coord);
        cell.is_passable() && (ignore_occupied || !cell.is_occupied())
    }

    /// Recorded position of a body, if it is on the grid.
    #[must_use]
    pub fn position_of(&self, body: AgentId) -> Option<Coord2D> {
        self.positions.get(&body).copied()
    }

    /// Number of moving bodies currently placed on the grid.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.positions.len()
    }

    /// Moves (or places) a body after checking passability and occupancy.
    ///
    /// Returns `false` and leaves the grid untouched when the move is refused.
    pub fn set_position(&mut self, body: AgentId, coord: Coord2D, ignore_occupied: bool) -> bool {
        let already_there = self.position_of(body) == Some(coord);
        if !already_there && !self.can_occupy(coord, ignore_occupied) {
            return false;
        }
        let _ = self.relocate(body, coord);
        true
    }

    /// Moves (or places) a body without any check, clamping onto the grid.
    ///
    /// Returns the coordinate the body ended up on.
    pub fn set_position_unsafe(&mut self, body: AgentId, coord: Coord2D) -> Coord2D {
        let coord = self.clamp(coord);
        self.relocate(body, coord)
    }

    /// Removes a body from its cell and from the position index.
    pub fn remove_body(&mut self, body: AgentId) -> Option<Coord2D> {
        let previous = self.positions.remove(&body)?;
        let _ = self.cell_mut_unchecked(previous).remove_occupant(body);
        trace!(target: "gridwalk::world", body = %body, cell = %previous, "body removed");
        Some(previous)
    }

    fn relocate(&mut self, body: AgentId, coord: Coord2D) -> Coord2D {
        if let Some(previous) = self.positions.insert(body, coord) {
            if previous == coord {
                return coord;
            }
            let _ = self.cell_mut_unchecked(previous).remove_occupant(body);
        }
        self.cell_mut_unchecked(coord).add_occupant(body);
        trace!(target: "gridwalk::world", body = %body, cell = %coord, "body moved");
        coord
    }

    pub(crate) fn cell_mut_unchecked(&mut self, coord: Coord2D) -> &mut Cell {
        let index = self.index(coord);
        &mut self.cells[index]
    }

    fn ensure_contains(&self, coord: Coord2D) -> Result<(), GridError> {
        if self.contains(coord) {
            Ok(())
        } else {
            Err(GridError::OutOfBounds {
                coord,
                size: self.size,
            })
        }
    }

    fn max_index(&self) -> i32 {
        i32::try_from(self.size - 1).unwrap_or(i32::MAX)
    }

    fn index(&self, coord: Coord2D) -> usize {
        let coord = self.clamp(coord);
        let width = usize::try_from(self.size).unwrap_or(0);
        let x = usize::try_from(coord.x()).unwrap_or(0);
        let y = usize::try_from(coord.y()).unwrap_or(0);
        y * width + x
    }
}

/// Grid handle shared between the simulation thread and path workers.
///
/// A panic while holding the lock cannot leave a cell half-written, so
/// poisoned locks are recovered rather than propagated.
#[derive(Clone, Debug)]
pub struct SharedGrid {
    inner: Arc<RwLock<Grid>>,
}

impl SharedGrid {
    /// Wraps a grid for shared access.
    #[must_use]
    pub fn new(grid: Grid) -> Self {
        Self {
            inner: Arc::new(RwLock::new(grid)),
        }
    }

    /// Acquires shared read access.
    pub fn read(&self) -> RwLockReadGuard<'_, Grid> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Acquires exclusive write access.
    pub fn write(&self) -> RwLockWriteGuard<'_, Grid> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Read-only spatial queries for collaborators outside the navigation core.
pub mod query {
    use gridwalk_core::{AgentId, Coord2D};

    use super::{Cell, Grid};

    /// Cell at `(x, y)`, clamped onto the grid.
    #[must_use]
    pub fn cell_at(grid: &Grid, x: i32, y: i32) -> &Cell {
        grid.at(x, y)
    }

    /// Reports whether the cell at `coord` is in bounds and passable.
    #[must_use]
    pub fn is_passable(grid: &Grid, coord: Coord2D) -> bool {
        grid.contains(coord) && grid.cell(coord).is_passable()
    }

    /// Reports whether any body stands on the cell at `coord`.
    #[must_use]
    pub fn is_occupied(grid: &Grid, coord: Coord2D) -> bool {
        grid.contains(coord) && grid.cell(coord).is_occupied()
    }

    /// Bodies standing on the cell at `coord`; empty when out of bounds.
    #[must_use]
    pub fn occupants(grid: &Grid, coord: Coord2D) -> &[AgentId] {
        if grid.contains(coord) {
            grid.cell(coord).occupants()
        } else {
            &[]
        }
    }

    /// Recorded grid position of a moving body.
    #[must_use]
    pub fn position_of(grid: &Grid, body: AgentId) -> Option<Coord2D> {
        grid.position_of(body)
    }
}
