#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Goal protocol for autonomous agents.
//!
//! A [`Goal`] is a predicate over grid cells plus two flags: `active` goals
//! take part in searches and `dynamic` goals move when their [`GoalHolder`]
//! cycles. Facts about the bodies standing on a cell come from an injected
//! [`BodyCatalog`]. Whenever an agent is about to accept a goal, or interact
//! with one, the registered [`GoalInterceptors`] are consulted and any of them
//! may veto the decision.

use std::{fmt, sync::Arc};

use gridwalk_core::{AgentId, Coord2D, Decision, GoalId};
use gridwalk_world::Cell;
use tracing::debug;

mod catalog;
mod holder;
mod kinds;
mod search;

pub use catalog::{BodyCatalog, MemoryCatalog};
pub use holder::{GoalEntry, GoalHandle, GoalHolder, SharedGoal};
pub use kinds::{BuildRepair, GatherResource, TransportResource};
pub use search::{find_nearest_goal, find_nearest_goal_with_priority, ring, GoalMatch};

/// Flags shared by every goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GoalFlags {
    /// Inactive goals are skipped by searches and checks.
    pub active: bool,
    /// Dynamic goals rotate when the holder cycles.
    pub dynamic: bool,
}

impl Default for GoalFlags {
    fn default() -> Self {
        Self {
            active: true,
            dynamic: true,
        }
    }
}

/// Information available to goal predicates.
#[derive(Clone, Copy)]
pub struct GoalContext<'a> {
    /// Agent evaluating the goal.
    pub agent: AgentId,
    /// Facts about bodies on the grid.
    pub catalog: &'a dyn BodyCatalog,
}

impl fmt::Debug for GoalContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoalContext")
            .field("agent", &self.agent)
            .finish_non_exhaustive()
    }
}

/// Capability shared by every goal kind.
pub trait Goal: fmt::Debug + Send + Sync {
    /// Short diagnostic name.
    fn name(&self) -> &'static str;

    /// Current flags.
    fn flags(&self) -> GoalFlags;

    /// Mutable access to the flags.
    fn flags_mut(&mut self) -> &mut GoalFlags;

    /// Reports whether `cell` satisfies the goal.
    fn check_goal(&self, cell: &Cell, ctx: &GoalContext<'_>) -> bool;
}

/// What interceptors are told about a goal decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GoalNotice {
    /// Agent making the decision.
    pub agent: AgentId,
    /// Goal involved.
    pub goal: GoalId,
    /// Diagnostic name of the goal.
    pub goal_name: &'static str,
    /// Cell where the goal matched.
    pub cell: Coord2D,
    /// First occupant of the cell.
    pub target: Option<AgentId>,
}

/// Hook consulted before goals are accepted or interacted with.
///
/// Both methods accept by default.
pub trait GoalInterceptor: Send + Sync {
    /// Called when an agent is about to accept a goal at a cell.
    fn on_goal_found(&self, notice: &GoalNotice) -> Decision {
        let _ = notice;
        Decision::Accept
    }

    /// Called when an agent reached interaction range of its goal.
    fn on_goal_interact(&self, notice: &GoalNotice) -> Decision {
        let _ = notice;
        Decision::Accept
    }
}

/// Ordered chain of interceptors where any single rejection vetoes.
#[derive(Clone, Default)]
pub struct GoalInterceptors {
    chain: Vec<Arc<dyn GoalInterceptor>>,
}

impl fmt::Debug for GoalInterceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoalInterceptors")
            .field("len", &self.chain.len())
            .finish()
    }
}

impl GoalInterceptors {
    /// Creates an empty chain that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor.
    pub fn register(&mut self, interceptor: Arc<dyn GoalInterceptor>) {
        self.chain.push(interceptor);
    }

    /// Number of registered interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Reports whether no interceptor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Consults every interceptor about an accepted goal.
    #[must_use]
    pub fn goal_found(&self, notice: &GoalNotice) -> Decision {
        self.decide(notice, |interceptor, notice| interceptor.on_goal_found(notice))
    }

    /// Consults every interceptor about an interaction.
    #[must_use]
    pub fn goal_interact(&self, notice: &GoalNotice) -> Decision {
        self.decide(notice, |interceptor, notice| {
            interceptor.on_goal_interact(notice)
        })
    }

    fn decide(
        &self,
        notice: &GoalNotice,
        ask: impl Fn(&dyn GoalInterceptor, &GoalNotice) -> Decision,
    ) -> Decision {
        let rejected = self
            .chain
            .iter()
            .map(|interceptor| ask(interceptor.as_ref(), notice))
            .fold(false, |rejected, decision| {
                rejected || decision == Decision::Reject
            });
        if rejected {
            debug!(
                target: "gridwalk::goals",
                agent = %notice.agent,
                goal = notice.goal_name,
                cell = %notice.cell,
                "goal vetoed"
            );
            Decision::Reject
        } else {
            Decision::Accept
        }
    }
}

/// Checks a single goal: active and satisfied at `cell`.
#[must_use]
pub fn check_goal(goal: &GoalEntry, cell: &Cell, ctx: &GoalContext<'_>) -> bool {
    goal.is_active() && goal.check(cell, ctx)
}

/// Reports whether any active goal is satisfied at `cell`.
#[must_use]
pub fn is_goal(cell: &Cell, goals: &[GoalEntry], ctx: &GoalContext<'_>) -> bool {
    goals.iter().any(|goal| check_goal(goal, cell, ctx))
}

/// Checks `goal` at `cell` and asks the interceptors to accept it.
#[must_use]
pub fn try_goal(
    goal: &GoalEntry,
    cell: &Cell,
    ctx: &GoalContext<'_>,
    interceptors: &GoalInterceptors,
) -> bool {
    check_goal(goal, cell, ctx)
        && interceptors
            .goal_found(&notice(goal, cell, ctx))
            .is_accepted()
}

/// First goal, in priority order, that `try_goal` accepts at `cell`.
#[must_use]
pub fn try_goals(
    goals: &[GoalEntry],
    cell: &Cell,
    ctx: &GoalContext<'_>,
    interceptors: &GoalInterceptors,
) -> Option<GoalEntry> {
    goals
        .iter()
        .find(|goal| try_goal(goal, cell, ctx, interceptors))
        .cloned()
}

/// Checks `goal` at `cell` and asks the interceptors to allow the interaction.
#[must_use]
pub fn try_interact_goal(
    goal: &GoalEntry,
    cell: &Cell,
    ctx: &GoalContext<'_>,
    interceptors: &GoalInterceptors,
) -> bool {
    check_goal(goal, cell, ctx)
        && interceptors
            .goal_interact(&notice(goal, cell, ctx))
            .is_accepted()
}

/// Asks the interceptors to allow an interaction without checking the predicate.
///
/// Inactive goals are still refused.
#[must_use]
pub fn trigger_interact_goal(
    goal: &GoalEntry,
    cell: &Cell,
    ctx: &GoalContext<'_>,
    interceptors: &GoalInterceptors,
) -> bool {
    goal.is_active()
        && interceptors
            .goal_interact(&notice(goal, cell, ctx))
            .is_accepted()
}

fn notice(goal: &GoalEntry, cell: &Cell, ctx: &GoalContext<'_>) -> GoalNotice {
    GoalNotice {
        agent: ctx.agent,
        goal: goal.id(),
        goal_name: goal.name(),
        cell: cell.coord(),
        target: cell.first_occupant(),
    }
}
