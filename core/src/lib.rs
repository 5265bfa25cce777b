#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the gridwalk navigation engine.
//!
//! This crate defines the vocabulary that connects the authoritative grid,
//! the pathfinding systems, the goal protocol and the agents that consume
//! them. Agents report what happened during a tick by pushing [`Event`]
//! values into caller-provided buffers; vetoable decisions are expressed as
//! [`Decision`] values returned by interceptors rather than mutable event
//! objects.

use std::{
    fmt,
    ops::{Add, Div, Mul, Sub},
};

use bitflags::bitflags;
use glam::IVec2;
use serde::{Deserialize, Serialize};

pub mod config;

pub use config::{
    AgentTuning, ConfigError, GridSettings, NavigationConfig, PathfindingSettings,
    RequestSettings, TimingSettings,
};

/// Cost of a single orthogonal step used by the octile heuristic.
pub const ORTHOGONAL_COST: u32 = 10;

/// Cost of a single diagonal step used by the octile heuristic.
pub const DIAGONAL_COST: u32 = 14;

/// Integer grid coordinate used both as a value and as a grid index.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Coord2D {
    x: i32,
    y: i32,
}

impl Coord2D {
    /// Creates a new coordinate from its components.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal component.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical component.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Chebyshev distance, the number of 8-directional steps between two coordinates.
    #[must_use]
    pub fn distance_to(self, other: Coord2D) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Integer octile distance scaled by ten.
    ///
    /// Diagonal steps cost [`DIAGONAL_COST`] and orthogonal steps cost
    /// [`ORTHOGONAL_COST`], so `(0, 0)` to `(3, 1)` costs `14 + 2 * 10`.
    #[must_use]
    pub fn octile_distance(self, other: Coord2D) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        let diagonal = dx.min(dy);
        let straight = dx.max(dy) - diagonal;
        DIAGONAL_COST * diagonal + ORTHOGONAL_COST * straight
    }

    /// Returns the coordinate offset by one step in the provided direction.
    #[must_use]
    pub fn step(self, direction: Direction8) -> Coord2D {
        self + direction.offset()
    }

    /// Reports whether the two coordinates touch, including diagonally.
    #[must_use]
    pub fn is_adjacent(self, other: Coord2D) -> bool {
        self != other && self.distance_to(other) == 1
    }
}

impl fmt::Display for Coord2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Add for Coord2D {
    type Output = Coord2D;

    fn add(self, rhs: Coord2D) -> Coord2D {
        Coord2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coord2D {
    type Output = Coord2D;

    fn sub(self, rhs: Coord2D) -> Coord2D {
        Coord2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul for Coord2D {
    type Output = Coord2D;

    fn mul(self, rhs: Coord2D) -> Coord2D {
        Coord2D::new(self.x * rhs.x, self.y * rhs.y)
    }
}

/// Component-wise integer division. Panics when either divisor component is zero.
impl Div for Coord2D {
    type Output = Coord2D;

    fn div(self, rhs: Coord2D) -> Coord2D {
        Coord2D::new(self.x / rhs.x, self.y / rhs.y)
    }
}

impl From<(i32, i32)> for Coord2D {
    fn from((x, y): (i32, i32)) -> Self {
        Coord2D::new(x, y)
    }
}

impl From<IVec2> for Coord2D {
    fn from(value: IVec2) -> Self {
        Coord2D::new(value.x, value.y)
    }
}

impl From<Coord2D> for IVec2 {
    fn from(value: Coord2D) -> Self {
        IVec2::new(value.x, value.y)
    }
}

bitflags! {
    /// Kinds of resources a body can hold, offer or accept.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ResourceKinds: u8 {
        /// Farmed food.
        const GRAIN = 1 << 0;
        /// Lumber from trees.
        const WOOD  = 1 << 1;
        /// Quarried stone.
        const STONE = 1 << 2;
        /// Mined gold.
        const GOLD  = 1 << 3;
    }
}

/// The eight directions of the Moore neighbourhood.
///
/// Declaration order is counter-clockwise starting from `+x`, which is also
/// the order used when enumerating cell neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction8 {
    /// Toward increasing `x`.
    East,
    /// Toward increasing `x` and `y`.
    NorthEast,
    /// Toward increasing `y`.
    North,
    /// Toward decreasing `x` and increasing `y`.
    NorthWest,
    /// Toward decreasing `x`.
    West,
    /// Toward decreasing `x` and `y`.
    SouthWest,
    /// Toward decreasing `y`.
    South,
    /// Toward increasing `x` and decreasing `y`.
    SouthEast,
}

impl Direction8 {
    /// All directions in neighbour enumeration order.
    pub const ALL: [Direction8; 8] = [
        Direction8::East,
        Direction8::NorthEast,
        Direction8::North,
        Direction8::NorthWest,
        Direction8::West,
        Direction8::SouthWest,
        Direction8::South,
        Direction8::SouthEast,
    ];

    /// Unit offset applied by a single step in this direction.
    #[must_use]
    pub const fn offset(self) -> Coord2D {
        match self {
            Direction8::East => Coord2D::new(1, 0),
            Direction8::NorthEast => Coord2D::new(1, 1),
            Direction8::North => Coord2D::new(0, 1),
            Direction8::NorthWest => Coord2D::new(-1, 1),
            Direction8::West => Coord2D::new(-1, 0),
            Direction8::SouthWest => Coord2D::new(-1, -1),
            Direction8::South => Coord2D::new(0, -1),
            Direction8::SouthEast => Coord2D::new(1, -1),
        }
    }

    /// Reports whether the direction moves along both axes.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction8::NorthEast
                | Direction8::NorthWest
                | Direction8::SouthWest
                | Direction8::SouthEast
        )
    }

    /// Direction of a single step between two adjacent coordinates.
    #[must_use]
    pub fn between(from: Coord2D, to: Coord2D) -> Option<Direction8> {
        let delta = to - from;
        Direction8::ALL
            .into_iter()
            .find(|direction| direction.offset() == delta)
    }
}

/// Unique identifier of a body placed on the grid (agents, resources, structures).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a goal entry inside a goal holder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GoalId(u32);

impl GoalId {
    /// Creates a new goal identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Verdict returned by interceptors consulted before a goal is accepted or used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Decision {
    /// The interceptor lets the goal proceed.
    #[default]
    Accept,
    /// The interceptor vetoes the goal.
    Reject,
}

impl Decision {
    /// Reports whether the decision allows the goal to proceed.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Decision::Accept)
    }
}

/// Reasons an agent wiped its decision state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResetReason {
    /// Every repath attempt failed.
    RepathFailed,
    /// The goal search reached its maximum radius without a match.
    SearchExhausted,
    /// An interceptor rejected the interaction with the current goal.
    InteractionRejected,
    /// The agent was reset by an external caller.
    Requested,
}

/// Notifications emitted by agents while they tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// An agent committed a grid step.
    AgentStepped {
        /// Agent that moved.
        agent: AgentId,
        /// Cell the agent left.
        from: Coord2D,
        /// Cell the agent entered.
        to: Coord2D,
        /// Whether the step passed through another agent.
        passed_through: bool,
    },
    /// An agent submitted a path request.
    PathRequested {
        /// Agent that asked for a path.
        agent: AgentId,
        /// Requested destination.
        target: Coord2D,
        /// Whether the search ignores occupied cells.
        ignore_actors: bool,
    },
    /// A search for a path returned nothing for the agent.
    PathNotFound {
        /// Agent whose request failed.
        agent: AgentId,
    },
    /// An agent accepted a goal at a cell.
    GoalFound {
        /// Agent that found the goal.
        agent: AgentId,
        /// Goal that matched.
        goal: GoalId,
        /// Cell where the goal matched.
        cell: Coord2D,
    },
    /// The goal an agent pursues changed between ticks.
    GoalChanged {
        /// Agent whose goal changed.
        agent: AgentId,
        /// Goal pursued during the previous tick.
        previous: Option<GoalId>,
        /// Goal pursued now.
        current: Option<GoalId>,
    },
    /// An agent reached interaction range of its goal and interacted with it.
    GoalInteracted {
        /// Agent that interacted.
        agent: AgentId,
        /// Goal that was interacted with.
        goal: GoalId,
        /// Cell of the goal.
        cell: Coord2D,
    },
    /// The goal search radius grew after a failed search.
    GoalSearchExpanded {
        /// Agent that searched.
        agent: AgentId,
        /// Radius that will be used for the next search.
        radius: u32,
    },
    /// A step along the current path was refused.
    StepBlocked {
        /// Agent that could not move.
        agent: AgentId,
        /// Cell the agent tried to enter.
        cell: Coord2D,
        /// Consecutive failed attempts so far.
        wait_tries: u32,
    },
    /// An agent forced a new path request after waiting too long.
    Repathed {
        /// Agent that repathed.
        agent: AgentId,
        /// Jittered destination of the new request.
        target: Coord2D,
        /// Attempt number, starting at one.
        attempt: u32,
    },
    /// Every repath attempt was exhausted; the agent gave up on its path.
    RepathFailed {
        /// Agent that gave up.
        agent: AgentId,
    },
    /// An agent cleared its path, goal, retry counters and goal memory.
    AiReset {
        /// Agent that reset.
        agent: AgentId,
        /// Why the reset happened.
        reason: ResetReason,
    },
    /// An agent left the grid and stopped ticking.
    Frozen {
        /// Agent that froze.
        agent: AgentId,
    },
    /// An agent rejoined the grid.
    Unfrozen {
        /// Agent that thawed.
        agent: AgentId,
        /// Cell the agent was placed on.
        cell: Coord2D,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octile_distance_matches_expectation() {
        let origin = Coord2D::new(0, 0);
        assert_eq!(origin.octile_distance(Coord2D::new(3, 1)), 34);
        assert_eq!(origin.octile_distance(Coord2D::new(9, 9)), 126);
        assert_eq!(origin.octile_distance(Coord2D::new(0, 4)), 40);
        assert_eq!(
            Coord2D::new(5, -2).octile_distance(Coord2D::new(1, 1)),
            Coord2D::new(1, 1).octile_distance(Coord2D::new(5, -2))
        );
    }

    #[test]
    fn chebyshev_distance_counts_diagonal_steps_once() {
        assert_eq!(Coord2D::new(2, 2).distance_to(Coord2D::new(5, 4)), 3);
        assert!(Coord2D::new(2, 2).is_adjacent(Coord2D::new(3, 3)));
        assert!(!Coord2D::new(2, 2).is_adjacent(Coord2D::new(2, 2)));
    }

    #[test]
    fn arithmetic_is_component_wise() {
        let a = Coord2D::new(6, 9);
        let b = Coord2D::new(2, 3);
        assert_eq!(a + b, Coord2D::new(8, 12));
        assert_eq!(a - b, Coord2D::new(4, 6));
        assert_eq!(a * b, Coord2D::new(12, 27));
        assert_eq!(a / b, Coord2D::new(3, 3));
    }

    #[test]
    fn directions_enumerate_counter_clockwise_from_east() {
        let offsets: Vec<(i32, i32)> = Direction8::ALL
            .iter()
            .map(|direction| (direction.offset().x(), direction.offset().y()))
            .collect();
        assert_eq!(
            offsets,
            vec![
                (1, 0),
                (1, 1),
                (0, 1),
                (-1, 1),
                (-1, 0),
                (-1, -1),
                (0, -1),
                (1, -1)
            ]
        );
        assert_eq!(
            Direction8::between(Coord2D::new(4, 4), Coord2D::new(3, 5)),
            Some(Direction8::NorthWest)
        );
        assert_eq!(
            Direction8::between(Coord2D::new(4, 4), Coord2D::new(6, 4)),
            None
        );
    }

    #[test]
    fn coord_round_trips_through_bincode() {
        let coord = Coord2D::new(-7, 42);
        let bytes = bincode::serialize(&coord).expect("serialize");
        let restored: Coord2D = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, coord);
    }
}
