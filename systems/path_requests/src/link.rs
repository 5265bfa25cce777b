//! Shared slot through which search results reach their agent.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gridwalk_core::{AgentId, Coord2D};
use gridwalk_system_pathfinding::Path;

/// Progress of the most recent path request of an agent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PathState {
    /// No request outstanding and no unread result.
    #[default]
    Idle,
    /// A request was accepted and has not produced a result yet.
    Pending {
        /// Latest requested destination.
        target: Coord2D,
    },
    /// A search published a path that the agent has not collected yet.
    Found {
        /// Destination the search ran for.
        target: Coord2D,
        /// Computed path.
        path: Path,
    },
    /// A search published "no path" and the agent has not collected it yet.
    NotFound {
        /// Destination the search ran for.
        target: Coord2D,
    },
}

/// Outcome collected by an agent from its link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathOutcome {
    /// A path towards `target`.
    Found {
        /// Destination the search ran for.
        target: Coord2D,
        /// Computed path.
        path: Path,
    },
    /// The destination could not be reached.
    NotFound {
        /// Destination the search ran for.
        target: Coord2D,
    },
}

#[derive(Debug)]
struct LinkInner {
    agent: AgentId,
    state: Mutex<PathState>,
}

/// Handle shared by an agent and the path executor.
///
/// Every write replaces the whole [`PathState`] under one lock, so readers
/// never observe a partially published path.
#[derive(Clone, Debug)]
pub struct AgentLink {
    inner: Arc<LinkInner>,
}

impl AgentLink {
    /// Creates an idle link for `agent`.
    #[must_use]
    pub fn new(agent: AgentId) -> Self {
        Self {
            inner: Arc::new(LinkInner {
                agent,
                state: Mutex::new(PathState::Idle),
            }),
        }
    }

    /// Agent the link belongs to.
    #[must_use]
    pub fn agent(&self) -> AgentId {
        self.inner.agent
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> PathState {
        self.lock().clone()
    }

    /// Reports whether a request is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(*self.lock(), PathState::Pending { .. })
    }

    /// Collects a published result, leaving the link idle.
    ///
    /// Pending and idle states are left untouched and yield `None`.
    pub fn take(&self) -> Option<PathOutcome> {
        let mut state = self.lock();
        match std::mem::take(&mut *state) {
            PathState::Found { target, path } => Some(PathOutcome::Found { target, path }),
            PathState::NotFound { target } => Some(PathOutcome::NotFound { target }),
            other => {
                *state = other;
                None
            }
        }
    }

    /// Drops any pending marker or unread result.
    pub fn reset(&self) {
        *self.lock() = PathState::Idle;
    }

    pub(crate) fn mark_pending(&self, target: Coord2D) -> PathState {
        std::mem::replace(&mut *self.lock(), PathState::Pending { target })
    }

    pub(crate) fn restore(&self, state: PathState) {
        *self.lock() = state;
    }

    pub(crate) fn publish(&self, target: Coord2D, path: Option<Path>) {
        let next = match path {
            Some(path) => PathState::Found { target, path },
            None => PathState::NotFound { target },
        };
        *self.lock() = next;
    }

    fn lock(&self) -> MutexGuard<'_, PathState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_published_results_only() {
        let link = AgentLink::new(AgentId::new(3));
        assert_eq!(link.take(), None);

        assert_eq!(link.mark_pending(Coord2D::new(2, 2)), PathState::Idle);
        assert_eq!(link.take(), None);
        assert!(link.is_pending());

        link.publish(Coord2D::new(2, 2), None);
        assert_eq!(
            link.take(),
            Some(PathOutcome::NotFound {
                target: Coord2D::new(2, 2)
            })
        );
        assert_eq!(link.state(), PathState::Idle);
    }

    #[test]
    fn clones_share_one_slot() {
        let link = AgentLink::new(AgentId::new(1));
        let worker_side = link.clone();
        worker_side.publish(Coord2D::new(1, 0), Some(Path::default()));
        assert!(matches!(link.take(), Some(PathOutcome::Found { .. })));
    }
}
