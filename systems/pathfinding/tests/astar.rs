use gridwalk_core::{AgentId, Coord2D};
use gridwalk_system_pathfinding::{PathFinder, SearchOptions};
use gridwalk_world::Grid;

fn open_grid(size: u32) -> Grid {
    Grid::new(size).expect("grid")
}

#[test]
fn diagonal_run_across_open_grid() {
    let grid = open_grid(10);
    let mut finder = PathFinder::new(2048);
    let path = finder
        .find(
            &grid,
            Coord2D::new(0, 0),
            Coord2D::new(9, 9),
            SearchOptions::new(true),
        )
        .expect("path exists");

    assert_eq!(path.len(), 9);
    assert_eq!(path.destination(), Some(Coord2D::new(9, 9)));
    assert!(!path.cells().contains(&Coord2D::new(0, 0)));
    let costs: Vec<u32> = path.iter().map(|step| step.g_cost).collect();
    assert!(costs.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(path.total_cost(), 126);
}

#[test]
fn open_grid_paths_cost_exactly_the_octile_distance() {
    let grid = open_grid(6);
    let mut finder = PathFinder::new(2048);
    for start in grid.cells().map(|cell| cell.coord()) {
        for end in grid.cells().map(|cell| cell.coord()) {
            let path = finder
                .find(&grid, start, end, SearchOptions::new(true))
                .expect("open grid is connected");
            assert_eq!(path.total_cost(), start.octile_distance(end));
            assert_eq!(path.len(), start.distance_to(end) as usize);
            if start != end {
                assert_eq!(path.destination(), Some(end));
            }
        }
    }
}

#[test]
fn enclosed_destination_is_unreachable() {
    let mut grid = open_grid(9);
    let end = Coord2D::new(6, 6);
    for neighbor in grid.neighbors(end) {
        grid.at_mut(neighbor.x(), neighbor.y()).set_passable(false);
    }
    let mut finder = PathFinder::new(2048);
    assert!(finder
        .find(&grid, Coord2D::new(0, 0), end, SearchOptions::new(true))
        .is_none());
}

#[test]
fn repeated_searches_are_identical() {
    let mut grid = open_grid(12);
    for y in 2..10 {
        grid.at_mut(5, y).set_passable(false);
    }
    let start = Coord2D::new(1, 6);
    let end = Coord2D::new(10, 5);

    let mut finder = PathFinder::new(2048);
    let first = finder.find(&grid, start, end, SearchOptions::new(true));
    let second = finder.find(&grid, start, end, SearchOptions::new(true));
    let fresh = PathFinder::new(2048).find(&grid, start, end, SearchOptions::new(true));

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(first, fresh);
}

#[test]
fn corner_cutting_through_solid_flanks_is_refused() {
    let mut grid = open_grid(4);
    grid.at_mut(1, 0).set_passable(false);
    grid.at_mut(0, 1).set_passable(false);
    let mut finder = PathFinder::new(2048);

    assert!(finder
        .find(
            &grid,
            Coord2D::new(0, 0),
            Coord2D::new(2, 2),
            SearchOptions::new(true)
        )
        .is_none());

    grid.at_mut(1, 1).set_can_path_thru(true);
    let path = finder
        .find(
            &grid,
            Coord2D::new(0, 0),
            Coord2D::new(2, 2),
            SearchOptions::new(true),
        )
        .expect("pass-through diagonal opens the corner");
    assert_eq!(path.cells(), vec![Coord2D::new(1, 1), Coord2D::new(2, 2)]);
}

#[test]
fn destination_behind_solid_corners_is_unreachable() {
    let mut grid = open_grid(4);
    grid.at_mut(1, 0).set_passable(false);
    grid.at_mut(0, 1).set_passable(false);
    assert!(!grid.is_diagonal_open(Coord2D::new(0, 0), Coord2D::new(1, 1)));
    let mut finder = PathFinder::new(2048);

    assert!(finder
        .find(
            &grid,
            Coord2D::new(0, 0),
            Coord2D::new(1, 1),
            SearchOptions::new(true)
        )
        .is_none());

    grid.at_mut(1, 0).set_passable(true);
    grid.at_mut(1, 1).set_passable(false);
    let path = finder
        .find(
            &grid,
            Coord2D::new(0, 0),
            Coord2D::new(1, 1),
            SearchOptions::new(true),
        )
        .expect("blocked goal cell with an open flank");
    assert_eq!(path.cells(), vec![Coord2D::new(1, 1)]);
}

#[test]
fn occupied_cells_are_skipped_unless_actors_are_ignored() {
    let mut grid = Grid::new(5).expect("grid");
    for y in 1..5 {
        grid.at_mut(2, y).set_passable(false);
    }
    assert!(grid.set_position(AgentId::new(7), Coord2D::new(2, 0), false));
    let mut finder = PathFinder::new(2048);

    assert!(finder
        .find(
            &grid,
            Coord2D::new(0, 0),
            Coord2D::new(4, 0),
            SearchOptions::new(false)
        )
        .is_none());

    let path = finder
        .find(
            &grid,
            Coord2D::new(0, 0),
            Coord2D::new(4, 0),
            SearchOptions::new(true),
        )
        .expect("actors ignored");
    assert!(path.cells().contains(&Coord2D::new(2, 0)));
    assert_eq!(path.total_cost(), 48);
}

#[test]
fn congestion_penalty_steers_around_crowds() {
    let mut grid = open_grid(5);
    assert!(grid.set_position(AgentId::new(1), Coord2D::new(2, 0), false));
    let mut finder = PathFinder::new(2048);

    let crowded = SearchOptions::new(true).with_congestion_penalty(20);
    let detour = finder
        .find(&grid, Coord2D::new(0, 0), Coord2D::new(4, 0), crowded)
        .expect("detour");
    assert!(!detour.cells().contains(&Coord2D::new(2, 0)));

    let free = SearchOptions::new(true).with_congestion_penalty(0);
    let straight = finder
        .find(&grid, Coord2D::new(0, 0), Coord2D::new(4, 0), free)
        .expect("straight");
    assert_eq!(straight.total_cost(), 40);
}

#[test]
fn occupied_destination_is_still_reachable() {
    let mut grid = open_grid(5);
    assert!(grid.set_position(AgentId::new(3), Coord2D::new(3, 3), false));
    let mut finder = PathFinder::new(2048);
    let path = finder
        .find(
            &grid,
            Coord2D::new(0, 0),
            Coord2D::new(3, 3),
            SearchOptions::new(false),
        )
        .expect("destination exempt from occupancy");
    assert_eq!(path.destination(), Some(Coord2D::new(3, 3)));
}

#[test]
fn heavy_cells_are_avoided() {
    let mut grid = open_grid(5);
    grid.at_mut(2, 0).set_weight(50);
    let mut finder = PathFinder::new(2048);
    let path = finder
        .find(
            &grid,
            Coord2D::new(0, 0),
            Coord2D::new(4, 0),
            SearchOptions::new(true),
        )
        .expect("path");
    assert!(!path.cells().contains(&Coord2D::new(2, 0)));
}

#[test]
fn bounded_search_fails_fast() {
    let grid = open_grid(40);
    let start = Coord2D::new(0, 0);
    let end = Coord2D::new(39, 0);

    let mut tiny = PathFinder::new(8);
    assert!(tiny
        .find(&grid, start, end, SearchOptions::new(true))
        .is_none());

    let mut roomy = PathFinder::new(2048);
    assert!(roomy
        .find(&grid, start, end, SearchOptions::new(true))
        .is_some());
}

#[test]
fn out_of_range_endpoints_are_clamped() {
    let grid = open_grid(5);
    let mut finder = PathFinder::new(2048);
    let path = finder
        .find(
            &grid,
            Coord2D::new(-4, 0),
            Coord2D::new(12, 0),
            SearchOptions::new(true),
        )
        .expect("clamped path");
    assert_eq!(path.destination(), Some(Coord2D::new(4, 0)));
    assert_eq!(path.len(), 4);
}
