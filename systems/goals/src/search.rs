//! Ring searches for goal cells around an origin.

use gridwalk_core::{AgentId, Coord2D};
use gridwalk_world::{Cell, Grid};

use crate::GoalEntry;

/// A goal matched at a specific cell.
#[derive(Clone, Debug)]
pub struct GoalMatch {
    /// Goal that matched.
    pub goal: GoalEntry,
    /// Cell where it matched.
    pub cell: Coord2D,
    /// First occupant of the cell, the body the goal is about.
    pub target: Option<AgentId>,
}

/// In-bounds cells at Chebyshev distance exactly `radius` from `origin`.
///
/// Cells are yielded row by row from the lowest `y`, which keeps searches
/// deterministic. Radius zero yields the origin itself.
pub fn ring(grid: &Grid, origin: Coord2D, radius: u32) -> impl Iterator<Item = Coord2D> + '_ {
    let r = i32::try_from(radius).unwrap_or(i32::MAX / 2);
    (-r..=r)
        .flat_map(move |dy| {
            let step = if dy.abs() == r { 1 } else { (2 * r).max(1) };
            (-r..=r)
                .step_by(usize::try_from(step).unwrap_or(1))
                .map(move |dx| origin + Coord2D::new(dx, dy))
        })
        .filter(move |coord| grid.contains(*coord))
}

/// Priority search: the first active goal, in priority order, that matches
/// any cell within `radius`, together with its nearest matching cell.
///
/// `accept` decides whether a goal is taken at a cell; it is where predicate
/// checks and interceptors run.
pub fn find_nearest_goal_with_priority<F>(
    grid: &Grid,
    origin: Coord2D,
    radius: u32,
    goals: &[GoalEntry],
    mut accept: F,
) -> Option<GoalMatch>
where
    F: FnMut(&GoalEntry, &Cell) -> bool,
{
    for goal in goals.iter().filter(|goal| goal.is_active()) {
        for distance in 1..=radius {
            for coord in ring(grid, origin, distance) {
                let cell = grid.cell(coord);
                if accept(goal, cell) {
                    return Some(GoalMatch {
                        goal: goal.clone(),
                        cell: coord,
                        target: cell.first_occupant(),
                    });
                }
            }
        }
    }
    None
}

/// Non-priority search: the nearest cell within `radius` matching any active goal.
///
/// Among goals matching the same cell, the higher priority one wins.
pub fn find_nearest_goal<F>(
    grid: &Grid,
    origin: Coord2D,
    radius: u32,
    goals: &[GoalEntry],
    mut accept: F,
) -> Option<GoalMatch>
where
    F: FnMut(&GoalEntry, &Cell) -> bool,
{
    for distance in 1..=radius {
        for coord in ring(grid, origin, distance) {
            let cell = grid.cell(coord);
            let matched = goals
                .iter()
                .filter(|goal| goal.is_active())
                .find(|goal| accept(*goal, cell));
            if let Some(goal) = matched {
                return Some(GoalMatch {
                    goal: goal.clone(),
                    cell: coord,
                    target: cell.first_occupant(),
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_walks_the_square_perimeter() {
        let grid = Grid::new(9).expect("grid");
        let origin = Coord2D::new(4, 4);
        assert_eq!(ring(&grid, origin, 0).collect::<Vec<_>>(), vec![origin]);
        assert_eq!(ring(&grid, origin, 1).count(), 8);
        assert_eq!(ring(&grid, origin, 3).count(), 24);
        assert!(ring(&grid, origin, 2).all(|coord| coord.distance_to(origin) == 2));
    }

    #[test]
    fn ring_skips_cells_outside_the_grid() {
        let grid = Grid::new(5).expect("grid");
        let corner: Vec<Coord2D> = ring(&grid, Coord2D::new(0, 0), 1).collect();
        assert_eq!(
            corner,
            vec![Coord2D::new(1, 0), Coord2D::new(0, 1), Coord2D::new(1, 1)]
        );
    }
}
