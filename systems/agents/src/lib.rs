#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Autonomous agents walking the navigation grid.
//!
//! An [`Agent`] wraps a grid-bound [`Body`] with a decision loop: it searches
//! for the highest priority goal in expanding rings, asks the path request
//! service for a route, follows the route one cell per actor tick and falls
//! back to jittered repaths when the way stays blocked. The [`Simulation`]
//! driver owns the world and ticks every agent at a fixed rate.

use std::fmt;

use gridwalk_core::{AgentId, Coord2D};
use gridwalk_system_goals::{BodyCatalog, GoalInterceptors};
use gridwalk_system_path_requests::{PathRequestError, PathRequestManager};
use gridwalk_world::{GridError, SharedGrid};
use thiserror::Error;

mod agent;
mod body;
mod simulation;

pub use agent::Agent;
pub use body::Body;
pub use simulation::{ExecutionMode, Simulation};

/// Coarse decision state of an agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AgentState {
    /// No goal and no path.
    #[default]
    Idle,
    /// Heading for a goal or following a requested path.
    Seeking,
    /// Within interaction range of the current goal.
    Interacting,
}

/// Services an agent needs during a tick.
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    /// World the agent lives in.
    pub grid: &'a SharedGrid,
    /// Where path requests are submitted.
    pub paths: &'a PathRequestManager,
    /// Facts about the bodies goals look at.
    pub catalog: &'a dyn BodyCatalog,
    /// Hooks consulted on goal decisions.
    pub interceptors: &'a GoalInterceptors,
    /// Seconds covered by one fixed update.
    pub delta_seconds: f32,
}

impl fmt::Debug for TickContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickContext")
            .field("delta_seconds", &self.delta_seconds)
            .finish_non_exhaustive()
    }
}

/// Errors raised while setting up or tearing down a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The grid rejected the operation.
    #[error(transparent)]
    Grid(#[from] GridError),
    /// The path request service failed.
    #[error(transparent)]
    Paths(#[from] PathRequestError),
    /// An agent with the same id already lives in the world.
    #[error("agent {0} already exists")]
    DuplicateAgent(AgentId),
    /// The spawn cell is blocked or occupied.
    #[error("agent {agent} cannot be placed on {coord}")]
    CellUnavailable {
        /// Agent being spawned.
        agent: AgentId,
        /// Requested cell.
        coord: Coord2D,
    },
    /// Threaded execution was requested outside a tokio runtime.
    #[error("threaded path execution needs a running tokio runtime")]
    NoRuntime,
}
