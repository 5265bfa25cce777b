use gridwalk_core::{AgentId, Coord2D};
use gridwalk_world::{query, Grid, GridError, Obstacle, SharedGrid};

#[test]
fn zero_sized_grid_is_rejected() {
    assert_eq!(Grid::new(0).unwrap_err(), GridError::ZeroSize);
}

#[test]
fn at_clamps_out_of_range_coordinates() {
    let grid = Grid::new(5).expect("grid");
    assert_eq!(grid.at(-3, 2).coord(), Coord2D::new(0, 2));
    assert_eq!(grid.at(7, 9).coord(), Coord2D::new(4, 4));
    assert_eq!(
        grid.get(Coord2D::new(5, 0)).unwrap_err(),
        GridError::OutOfBounds {
            coord: Coord2D::new(5, 0),
            size: 5
        }
    );
}

#[test]
fn neighbors_enumerate_counter_clockwise_from_east() {
    let grid = Grid::new(5).expect("grid");
    assert_eq!(
        grid.neighbors(Coord2D::new(2, 2)),
        [
            Coord2D::new(3, 2),
            Coord2D::new(3, 3),
            Coord2D::new(2, 3),
            Coord2D::new(1, 3),
            Coord2D::new(1, 2),
            Coord2D::new(1, 1),
            Coord2D::new(2, 1),
            Coord2D::new(3, 1),
        ]
    );
    let corner = grid.neighbors(Coord2D::new(0, 0));
    assert!(corner.iter().all(|coord| grid.contains(*coord)));
}

#[test]
fn diagonal_step_requires_an_open_flank() {
    let mut grid = Grid::new(3).expect("grid");
    grid.at_mut(1, 0).set_passable(false);
    grid.at_mut(0, 1).set_passable(false);

    let from = Coord2D::new(0, 0);
    let to = Coord2D::new(1, 1);
    assert!(!grid.is_diagonal_open(from, to));

    grid.at_mut(1, 1).set_can_path_thru(true);
    assert!(grid.is_diagonal_open(from, to));

    grid.at_mut(1, 1).set_can_path_thru(false);
    grid.at_mut(0, 1).set_passable(true);
    assert!(grid.is_diagonal_open(from, to));
}

#[test]
fn moves_keep_occupants_and_positions_in_sync() {
    let mut grid = Grid::new(6).expect("grid");
    let a = AgentId::new(1);
    let b = AgentId::new(2);

    assert!(grid.set_position(a, Coord2D::new(1, 1), false));
    assert!(grid.set_position(b, Coord2D::new(2, 1), false));
    assert!(!grid.set_position(a, Coord2D::new(2, 1), false));
    assert!(grid.set_position(a, Coord2D::new(2, 1), true));

    assert!(!query::is_occupied(&grid, Coord2D::new(1, 1)));
    assert_eq!(query::occupants(&grid, Coord2D::new(2, 1)), &[b, a]);
    assert_eq!(query::position_of(&grid, a), Some(Coord2D::new(2, 1)));

    assert_eq!(grid.remove_body(b), Some(Coord2D::new(2, 1)));
    assert_eq!(grid.cell(Coord2D::new(2, 1)).first_occupant(), Some(a));
    assert_eq!(grid.remove_body(b), None);
    assert_eq!(grid.body_count(), 1);
}

#[test]
fn checked_moves_refuse_walls_and_edges() {
    let mut grid = Grid::new(4).expect("grid");
    grid.at_mut(2, 2).set_passable(false);
    let body = AgentId::new(9);

    assert!(!grid.set_position(body, Coord2D::new(2, 2), true));
    assert!(!grid.set_position(body, Coord2D::new(4, 0), true));
    assert_eq!(grid.position_of(body), None);

    let placed = grid.set_position_unsafe(body, Coord2D::new(10, -1));
    assert_eq!(placed, Coord2D::new(3, 0));
    assert!(grid.cell(placed).contains(body));
}

#[test]
fn overlapping_footprints_are_reference_counted() {
    let mut grid = Grid::new(10).expect("grid");
    let barn = Obstacle::new(AgentId::new(100), Coord2D::new(4, 4), Coord2D::new(3, 3));
    let wall = Obstacle::new(AgentId::new(101), Coord2D::new(5, 5), Coord2D::new(1, 1));

    barn.bake_to_grid(&mut grid).expect("bake barn");
    wall.bake_to_grid(&mut grid).expect("bake wall");
    assert!(!query::is_passable(&grid, Coord2D::new(3, 3)));
    assert_eq!(
        query::occupants(&grid, Coord2D::new(5, 5)),
        &[AgentId::new(100), AgentId::new(101)]
    );

    barn.unbake_from_grid(&mut grid).expect("unbake barn");
    assert!(query::is_passable(&grid, Coord2D::new(3, 3)));
    assert!(!query::is_passable(&grid, Coord2D::new(5, 5)));

    wall.unbake_from_grid(&mut grid).expect("unbake wall");
    assert!(grid.cells().all(|cell| cell.is_passable() && !cell.is_occupied()));
}

#[test]
fn footprint_outside_the_grid_leaves_grid_untouched() {
    let mut grid = Grid::new(4).expect("grid");
    let obstacle = Obstacle::new(AgentId::new(5), Coord2D::new(3, 3), Coord2D::new(3, 3));
    let error = obstacle.bake_to_grid(&mut grid).unwrap_err();
    assert!(matches!(error, GridError::FootprintOutOfBounds { .. }));
    assert!(grid.cells().all(|cell| cell.is_passable()));
}

#[test]
fn shared_grid_exposes_one_authoritative_copy() {
    let shared = SharedGrid::new(Grid::new(3).expect("grid"));
    let clone = shared.clone();
    assert!(clone.write().set_position(AgentId::new(1), Coord2D::new(1, 1), false));
    assert_eq!(
        shared.read().position_of(AgentId::new(1)),
        Some(Coord2D::new(1, 1))
    );
}
