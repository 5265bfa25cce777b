#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bounded A* search over the navigation grid.
//!
//! [`PathFinder::find`] expands cells in `(f, h)` order using an indexed
//! [`PriorityHeap`] as the open set. The search never grows past its
//! configured capacity: once either the open set or the closed set fills up,
//! the search gives up and reports no path, exactly as if the destination
//! were unreachable.

use std::{cmp::Ordering, collections::VecDeque};

use gridwalk_core::{config::PathfindingSettings, Coord2D};
use gridwalk_world::Grid;
use tracing::{debug, trace};

mod heap;

pub use heap::{HeapFull, HeapOrder, HeapSlots, PriorityHeap};

/// Options that vary between individual searches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOptions {
    /// Treat occupied cells as open instead of skipping them.
    pub ignore_actors: bool,
    /// Extra cost per occupant of a neighbour cell.
    pub congestion_penalty: u32,
}

impl SearchOptions {
    /// Options with the default congestion penalty.
    #[must_use]
    pub const fn new(ignore_actors: bool) -> Self {
        Self {
            ignore_actors,
            congestion_penalty: 8,
        }
    }

    /// Replaces the congestion penalty.
    #[must_use]
    pub const fn with_congestion_penalty(mut self, penalty: u32) -> Self {
        self.congestion_penalty = penalty;
        self
    }
}

/// One cell of a computed path together with the accumulated cost to reach it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathStep {
    /// Cell to step onto.
    pub cell: Coord2D,
    /// Accumulated cost from the search start.
    pub g_cost: u32,
}

/// Ordered cells leading from (but excluding) the start to the destination.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    steps: VecDeque<PathStep>,
}

impl Path {
    /// Builds a path from explicit steps.
    #[must_use]
    pub fn from_steps(steps: impl IntoIterator<Item = PathStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    /// Number of remaining steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Reports whether no steps remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Next step without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<&PathStep> {
        self.steps.front()
    }

    /// Step `index` positions ahead.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PathStep> {
        self.steps.get(index)
    }

    /// Final step of the path.
    #[must_use]
    pub fn destination(&self) -> Option<Coord2D> {
        self.steps.back().map(|step| step.cell)
    }

    /// Consumes the next step.
    pub fn advance(&mut self) -> Option<PathStep> {
        self.steps.pop_front()
    }

    /// Iterates remaining steps in travel order.
    pub fn iter(&self) -> impl Iterator<Item = &PathStep> {
        self.steps.iter()
    }

    /// Remaining cells in travel order.
    #[must_use]
    pub fn cells(&self) -> Vec<Coord2D> {
        self.steps.iter().map(|step| step.cell).collect()
    }

    /// Accumulated cost of the final step.
    #[must_use]
    pub fn total_cost(&self) -> u32 {
        self.steps.back().map_or(0, |step| step.g_cost)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct NodeRecord {
    generation: u32,
    g_cost: u32,
    h_cost: u32,
    parent: Option<usize>,
    heap_index: usize,
    closed: bool,
}

impl NodeRecord {
    fn f_cost(&self) -> u32 {
        self.g_cost.saturating_add(self.h_cost)
    }
}

/// Per-cell scratch state, valid only for records stamped with the current generation.
#[derive(Clone, Debug, Default)]
struct SearchNodes {
    records: Vec<NodeRecord>,
    generation: u32,
}

impl SearchNodes {
    fn begin(&mut self, cell_count: usize) {
        if self.records.len() != cell_count {
            self.records = vec![NodeRecord::default(); cell_count];
            self.generation = 0;
        }
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.records.fill(NodeRecord::default());
            self.generation = 1;
        }
    }

    fn record(&self, index: usize) -> Option<&NodeRecord> {
        self.records
            .get(index)
            .filter(|record| record.generation == self.generation)
    }

    fn touch(&mut self, index: usize) -> &mut NodeRecord {
        let generation = self.generation;
        let record = &mut self.records[index];
        if record.generation != generation {
            *record = NodeRecord {
                generation,
                g_cost: u32::MAX,
                ..NodeRecord::default()
            };
        }
        record
    }

    fn is_closed(&self, index: usize) -> bool {
        self.record(index).map_or(false, |record| record.closed)
    }

    fn g_cost(&self, index: usize) -> u32 {
        self.record(index).map_or(u32::MAX, |record| record.g_cost)
    }
}

impl HeapSlots<usize> for SearchNodes {
    fn heap_index(&self, key: usize) -> Option<usize> {
        self.record(key).map(|record| record.heap_index)
    }

    fn set_heap_index(&mut self, key: usize, index: usize) {
        self.touch(key).heap_index = index;
    }

    fn compare(&self, a: usize, b: usize) -> Ordering {
        let (Some(a), Some(b)) = (self.record(a), self.record(b)) else {
            return Ordering::Equal;
        };
        a.f_cost()
            .cmp(&b.f_cost())
            .then_with(|| a.h_cost.cmp(&b.h_cost))
    }
}

/// Reusable A* search with bounded open and closed sets.
///
/// The finder keeps its scratch buffers between searches; every search
/// overwrites the state it reads, so no information leaks between calls.
#[derive(Clone, Debug)]
pub struct PathFinder {
    nodes: SearchNodes,
    open: PriorityHeap<usize>,
    capacity: usize,
}

impl PathFinder {
    /// Creates a finder whose open and closed sets hold at most `capacity` cells.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: SearchNodes::default(),
            open: PriorityHeap::new(capacity, HeapOrder::Min),
            capacity,
        }
    }

    /// Creates a finder sized from configuration.
    #[must_use]
    pub fn from_settings(settings: &PathfindingSettings) -> Self {
        Self::new(settings.heap_capacity)
    }

    /// Capacity of the open and closed sets.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Searches for the cheapest path from `start` to `end`.
    ///
    /// Both endpoints are clamped onto the grid. The returned path excludes
    /// `start` and ends with `end`; it is empty when both are the same cell.
    /// `None` means the destination is unreachable or the search ran out of
    /// capacity.
    pub fn find(
        &mut self,
        grid: &Grid,
        start: Coord2D,
        end: Coord2D,
        options: SearchOptions,
    ) -> Option<Path> {
        let start = grid.clamp(start);
        let end = grid.clamp(end);
        if start == end {
            return Some(Path::default());
        }

        let size = usize::try_from(grid.size()).ok()?;
        let index_of = |coord: Coord2D| -> usize {
            let x = usize::try_from(coord.x()).unwrap_or(0);
            let y = usize::try_from(coord.y()).unwrap_or(0);
            y * size + x
        };

        self.nodes.begin(size * size);
        self.open.clear();

        let start_index = index_of(start);
        let end_index = index_of(end);
        {
            let record = self.nodes.touch(start_index);
            record.g_cost = 0;
            record.h_cost = start.octile_distance(end);
        }
        if self.open.push(start_index, &mut self.nodes).is_err() {
            return None;
        }

        let mut closed = 0usize;
        while let Some(current_index) = self.open.pop(&mut self.nodes) {
            let current = coord_of(current_index, size);
            self.nodes.touch(current_index).closed = true;
            closed += 1;

            if current_index == end_index {
                let path = self.retrace(start_index, end_index, size);
                debug!(
                    target: "gridwalk::pathfinding",
                    %start,
                    %end,
                    steps = path.len(),
                    cost = path.total_cost(),
                    expanded = closed,
                    "path found"
                );
                return Some(path);
            }

            if closed >= self.capacity {
                debug!(
                    target: "gridwalk::pathfinding",
                    %start,
                    %end,
                    capacity = self.capacity,
                    "closed set exhausted"
                );
                return None;
            }

            let current_g = self.nodes.g_cost(current_index);
            for neighbor in grid.neighbors(current) {
                if neighbor == current {
                    continue;
                }
                let neighbor_index = index_of(neighbor);
                if self.nodes.is_closed(neighbor_index) {
                    continue;
                }

                if !grid.is_diagonal_open(current, neighbor) {
                    continue;
                }
                // The destination may be a goal body: blocked or occupied.
                let cell = grid.cell(neighbor);
                if neighbor != end {
                    if !cell.is_passable() {
                        continue;
                    }
                    if !options.ignore_actors && cell.is_occupied() {
                        continue;
                    }
                }

                let congestion = u32::try_from(cell.occupant_count())
                    .unwrap_or(u32::MAX)
                    .saturating_mul(options.congestion_penalty);
                let cost = current_g
                    .saturating_add(current.octile_distance(neighbor))
                    .saturating_add(u32::from(cell.weight()))
                    .saturating_add(congestion);

                let in_open = self.open.contains(neighbor_index, &self.nodes);
                if in_open && cost >= self.nodes.g_cost(neighbor_index) {
                    continue;
                }

                {
                    let record = self.nodes.touch(neighbor_index);
                    record.g_cost = cost;
                    record.h_cost = neighbor.octile_distance(end);
                    record.parent = Some(current_index);
                }
                trace!(
                    target: "gridwalk::pathfinding",
                    cell = %neighbor,
                    g = cost,
                    "open set updated"
                );

                if in_open {
                    self.open.update_item(neighbor_index, &mut self.nodes);
                } else if self.open.push(neighbor_index, &mut self.nodes).is_err() {
                    debug!(
                        target: "gridwalk::pathfinding",
                        %start,
                        %end,
                        capacity = self.capacity,
                        "open set exhausted"
                    );
                    return None;
                }
            }
        }

        debug!(target: "gridwalk::pathfinding", %start, %end, "no path");
        None
    }

    fn retrace(&self, start_index: usize, end_index: usize, size: usize) -> Path {
        let mut steps = Vec::new();
        let mut cursor = end_index;
        while cursor != start_index {
            let Some(record) = self.nodes.record(cursor) else {
                break;
            };
            steps.push(PathStep {
                cell: coord_of(cursor, size),
                g_cost: record.g_cost,
            });
            match record.parent {
                Some(parent) => cursor = parent,
                None => break,
            }
        }
        steps.reverse();
        Path::from_steps(steps)
    }
}

fn coord_of(index: usize, size: usize) -> Coord2D {
    let x = i32::try_from(index % size).unwrap_or(i32::MAX);
    let y = i32::try_from(index / size).unwrap_or(i32::MAX);
    Coord2D::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_start_and_end_yields_empty_path() {
        let grid = Grid::new(4).expect("grid");
        let mut finder = PathFinder::new(64);
        let path = finder
            .find(
                &grid,
                Coord2D::new(2, 2),
                Coord2D::new(2, 2),
                SearchOptions::new(true),
            )
            .expect("trivial path");
        assert!(path.is_empty());
    }

    #[test]
    fn generations_isolate_consecutive_searches() {
        let mut grid = Grid::new(6).expect("grid");
        let mut finder = PathFinder::new(256);
        let first = finder.find(
            &grid,
            Coord2D::new(0, 0),
            Coord2D::new(5, 0),
            SearchOptions::new(true),
        );
        for y in 0..6 {
            if y != 5 {
                grid.at_mut(3, y).set_passable(false);
            }
        }
        let second = finder
            .find(
                &grid,
                Coord2D::new(0, 0),
                Coord2D::new(5, 0),
                SearchOptions::new(true),
            )
            .expect("detour exists");
        assert_eq!(first.map(|path| path.len()), Some(5));
        assert!(second.cells().contains(&Coord2D::new(3, 5)));
    }
}
