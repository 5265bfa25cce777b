#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Path request service that keeps searches off the simulation tick.
//!
//! Agents submit requests through a cloneable [`PathRequestManager`]. The
//! requests travel over a bounded channel to a single [`PathExecutor`], which
//! keeps at most one pending request per agent: a newer request replaces the
//! target of the pending one in place. The executor either runs inline, a few
//! searches per fixed update ([`PathExecutor::pump`]), or on a dedicated
//! blocking task owned by a [`PathWorker`]. Results are published onto each
//! agent's [`AgentLink`].

use gridwalk_core::{Coord2D, NavigationConfig};
use gridwalk_world::SharedGrid;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

mod executor;
mod link;
mod worker;

pub use executor::{PathExecutor, WorkerReport};
pub use link::{AgentLink, PathOutcome, PathState};
pub use worker::PathWorker;

/// Errors surfaced to callers of the request service.
#[derive(Debug, Error)]
pub enum PathRequestError {
    /// The inbound queue reached its capacity; the request was dropped.
    #[error("path request queue is full")]
    QueueFull,
    /// The executor was dropped or shut down.
    #[error("path request executor is no longer running")]
    Closed,
    /// The worker task panicked or was cancelled.
    #[error("path worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}

/// A single search job.
#[derive(Clone, Debug)]
pub struct PathRequest {
    /// Link of the requesting agent; results are published here.
    pub link: AgentLink,
    /// Destination of the search.
    pub target: Coord2D,
    /// Whether occupied cells are treated as open.
    pub ignore_actors: bool,
}

/// Messages delivered to the executor.
#[derive(Debug)]
pub(crate) enum Command {
    /// Queue or coalesce a search.
    Request(PathRequest),
    /// Finish the pending searches and stop.
    Shutdown,
}

/// Submission side of the request service.
#[derive(Clone, Debug)]
pub struct PathRequestManager {
    tx: mpsc::Sender<Command>,
}

impl PathRequestManager {
    /// Creates the submission handle and the executor that serves it.
    #[must_use]
    pub fn new(grid: SharedGrid, config: &NavigationConfig) -> (Self, PathExecutor) {
        let capacity = config.requests.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let executor = PathExecutor::new(rx, grid, &config.pathfinding);
        (Self { tx }, executor)
    }

    /// Fire-and-forget request for a path from the agent's current cell to `(x, y)`.
    ///
    /// A newer request for the same agent supersedes the target of a pending one.
    pub fn request_path(
        &self,
        link: &AgentLink,
        x: i32,
        y: i32,
        ignore_actors: bool,
    ) -> Result<(), PathRequestError> {
        let target = Coord2D::new(x, y);
        let request = PathRequest {
            link: link.clone(),
            target,
            ignore_actors,
        };
        let previous = link.mark_pending(target);
        match self.tx.try_send(Command::Request(request)) {
            Ok(()) => {
                debug!(
                    target: "gridwalk::paths",
                    agent = %link.agent(),
                    destination = %target,
                    ignore_actors,
                    "path requested"
                );
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                link.restore(previous);
                warn!(
                    target: "gridwalk::paths",
                    agent = %link.agent(),
                    destination = %target,
                    "path request dropped, queue full"
                );
                Err(PathRequestError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                link.restore(previous);
                Err(PathRequestError::Closed)
            }
        }
    }

    /// Reports whether the executor side has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub(crate) fn sender(&self) -> mpsc::Sender<Command> {
        self.tx.clone()
    }
}
