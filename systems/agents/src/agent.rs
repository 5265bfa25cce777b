//! Per-agent decision and locomotion state machine.

use std::{collections::HashMap, sync::Arc};

use gridwalk_core::{AgentId, AgentTuning, Coord2D, Event, GoalId, NavigationConfig, ResetReason};
use gridwalk_system_goals::{
    check_goal, find_nearest_goal, find_nearest_goal_with_priority, try_goal, try_interact_goal,
    GoalContext, GoalEntry, GoalHolder, GoalMatch,
};
use gridwalk_system_path_requests::{AgentLink, PathOutcome, PathRequestManager};
use gridwalk_system_pathfinding::Path;
use gridwalk_world::Grid;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use crate::{body::nearby_coord, AgentState, Body, TickContext};

/// Where a goal was last satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Discovery {
    target: Option<AgentId>,
    cell: Coord2D,
}

/// An autonomous body that picks goals, requests paths and walks them.
///
/// The agent only advances inside [`Agent::fixed_update`]; every
/// `actor_tick_rate` fixed updates it runs one decision tick, which
/// collects path results, refreshes or searches for a goal, interacts when
/// in range and otherwise attempts one grid step.
#[derive(Debug)]
pub struct Agent {
    body: Body,
    link: AgentLink,
    goals: Arc<GoalHolder>,
    tuning: AgentTuning,
    tick_rate: u32,
    tick_timer: u32,
    state: AgentState,
    current_path: Option<Path>,
    current_goal: Option<GoalEntry>,
    goal_cell: Option<Coord2D>,
    goal_target: Option<AgentId>,
    previous_goal: Option<GoalId>,
    discovered_goals: HashMap<GoalId, Discovery>,
    search_radius: u32,
    wait_tries: u32,
    repath_tries: u32,
    last_target: Option<Coord2D>,
    path_locked: bool,
    frozen: bool,
    rng: ChaCha8Rng,
}

impl Agent {
    /// Creates an agent around `body`.
    ///
    /// `seed` drives the repath jitter, so equal seeds replay identically.
    #[must_use]
    pub fn new(body: Body, goals: Arc<GoalHolder>, config: &NavigationConfig, seed: u64) -> Self {
        let tuning = config.agents.clone();
        Self {
            link: AgentLink::new(body.id()),
            body,
            goals,
            search_radius: tuning.goal_search_step,
            tuning,
            tick_rate: config.timing.actor_tick_rate.max(1),
            tick_timer: 0,
            state: AgentState::Idle,
            current_path: None,
            current_goal: None,
            goal_cell: None,
            goal_target: None,
            previous_goal: None,
            discovered_goals: HashMap::new(),
            wait_tries: 0,
            repath_tries: 0,
            last_target: None,
            path_locked: false,
            frozen: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Identifier of the agent's body.
    #[must_use]
    pub fn id(&self) -> AgentId {
        self.body.id()
    }

    /// The agent's body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Link on which path results are published.
    #[must_use]
    pub fn link(&self) -> &AgentLink {
        &self.link
    }

    /// Prioritised goals of the agent.
    #[must_use]
    pub fn goals(&self) -> &Arc<GoalHolder> {
        &self.goals
    }

    /// Coarse state after the last tick.
    #[must_use]
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Remaining steps of the path being followed.
    #[must_use]
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_ref()
    }

    /// Goal currently pursued.
    #[must_use]
    pub fn current_goal(&self) -> Option<&GoalEntry> {
        self.current_goal.as_ref()
    }

    /// Cell of the current goal, refreshed every tick.
    #[must_use]
    pub fn goal_cell(&self) -> Option<Coord2D> {
        self.goal_cell
    }

    /// Body the current goal is about.
    #[must_use]
    pub fn goal_target(&self) -> Option<AgentId> {
        self.goal_target
    }

    /// Body remembered for `goal`, if it was ever satisfied by one.
    #[must_use]
    pub fn discovered_target(&self, goal: GoalId) -> Option<AgentId> {
        self.discovered_goals
            .get(&goal)
            .and_then(|discovery| discovery.target)
    }

    /// Number of goals with a remembered location.
    #[must_use]
    pub fn discovered_len(&self) -> usize {
        self.discovered_goals.len()
    }

    /// Radius the next goal search will use.
    #[must_use]
    pub fn search_radius(&self) -> u32 {
        self.search_radius
    }

    /// Consecutive refused steps.
    #[must_use]
    pub fn wait_tries(&self) -> u32 {
        self.wait_tries
    }

    /// Repath attempts since the last committed step.
    #[must_use]
    pub fn repath_tries(&self) -> u32 {
        self.repath_tries
    }

    /// Reports whether a path request is in flight.
    #[must_use]
    pub fn is_path_locked(&self) -> bool {
        self.path_locked
    }

    /// Reports whether the agent is frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Moves the physical position, typically while the agent is frozen.
    pub fn set_physical_position(&mut self, position: glam::Vec2) {
        self.body.set_physical_position(position);
    }

    /// Requests a path to `(x, y)` unless a path is held or already in flight.
    pub fn goto(&mut self, paths: &PathRequestManager, x: i32, y: i32, out: &mut Vec<Event>) -> bool {
        if self.current_path.is_some() || self.path_locked {
            return false;
        }
        self.goto_forced(paths, x, y, out)
    }

    /// Requests a path to `(x, y)` regardless of the current path.
    ///
    /// A refused submission is logged and reported as `false`; the agent
    /// retries on a later tick.
    pub fn goto_forced(
        &mut self,
        paths: &PathRequestManager,
        x: i32,
        y: i32,
        out: &mut Vec<Event>,
    ) -> bool {
        match paths.request_path(&self.link, x, y, true) {
            Ok(()) => {
                let target = Coord2D::new(x, y);
                self.last_target = Some(target);
                self.path_locked = true;
                out.push(Event::PathRequested {
                    agent: self.id(),
                    target,
                    ignore_actors: true,
                });
                true
            }
            Err(error) => {
                debug!(
                    target: "gridwalk::agents",
                    agent = %self.id(),
                    error = %error,
                    "path request refused"
                );
                false
            }
        }
    }

    /// Advances the agent by one fixed update.
    pub fn fixed_update(&mut self, ctx: &TickContext<'_>, out: &mut Vec<Event>) {
        if self.frozen {
            return;
        }
        self.tick_timer += 1;
        if self.tick_timer >= self.tick_rate {
            self.tick_timer = 0;
            self.tick(ctx, out);
        }
        self.body
            .interpolate(ctx.delta_seconds * self.tuning.movement_interpolation);
    }

    /// Runs one decision tick immediately.
    ///
    /// Interceptors are consulted while the grid is read-locked and must not
    /// write to it.
    pub fn tick(&mut self, ctx: &TickContext<'_>, out: &mut Vec<Event>) {
        if self.frozen {
            return;
        }
        self.collect_path(out);

        let interacted = {
            let grid = ctx.grid.read();
            self.update_goal(&grid, ctx, out);
            self.interact_or_pursue(&grid, ctx, out)
        };
        if !interacted {
            let mut grid = ctx.grid.write();
            self.follow_path(&mut grid, ctx, out);
        }

        self.announce_goal_change(out);
        self.state = if interacted {
            AgentState::Interacting
        } else if self.current_goal.is_some() || self.current_path.is_some() || self.path_locked {
            AgentState::Seeking
        } else {
            AgentState::Idle
        };
    }

    /// Clears path, goal, retry counters and goal memory.
    pub fn reset_ai(&mut self, reason: ResetReason, out: &mut Vec<Event>) {
        self.current_path = None;
        self.current_goal = None;
        self.goal_cell = None;
        self.goal_target = None;
        self.discovered_goals.clear();
        self.search_radius = self.tuning.goal_search_step;
        self.wait_tries = 0;
        self.repath_tries = 0;
        self.last_target = None;
        self.path_locked = false;
        self.link.reset();
        self.state = AgentState::Idle;
        debug!(target: "gridwalk::agents", agent = %self.id(), reason = ?reason, "ai reset");
        out.push(Event::AiReset {
            agent: self.id(),
            reason,
        });
    }

    /// Takes the agent off the grid and suspends ticking.
    pub fn freeze(&mut self, grid: &mut Grid, out: &mut Vec<Event>) {
        if self.frozen {
            return;
        }
        let _ = self.body.remove_from_grid(grid);
        self.frozen = true;
        debug!(target: "gridwalk::agents", agent = %self.id(), "frozen");
        out.push(Event::Frozen { agent: self.id() });
    }

    /// Puts the agent back on the grid at its physical location.
    ///
    /// The cell is taken regardless of occupancy; retry counters restart.
    pub fn unfreeze(&mut self, grid: &mut Grid, out: &mut Vec<Event>) {
        if !self.frozen {
            return;
        }
        let snapped = self.body.hard_snap_to_grid();
        let cell = self.body.set_position_unsafe(grid, snapped.x(), snapped.y());
        self.frozen = false;
        self.tick_timer = 0;
        self.wait_tries = 0;
        self.repath_tries = 0;
        debug!(target: "gridwalk::agents", agent = %self.id(), cell = %cell, "unfrozen");
        out.push(Event::Unfrozen {
            agent: self.id(),
            cell,
        });
    }

    /// Freezes a running agent or thaws a frozen one.
    pub fn toggle_freeze(&mut self, grid: &mut Grid, out: &mut Vec<Event>) {
        if self.frozen {
            self.unfreeze(grid, out);
        } else {
            self.freeze(grid, out);
        }
    }

    /// Removes the agent from the grid and hands back its body.
    pub fn despawn(self, grid: &mut Grid) -> Body {
        let _ = self.body.remove_from_grid(grid);
        self.link.reset();
        self.body
    }

    /// Places the body on its current cell, refusing blocked cells.
    pub(crate) fn place(&mut self, grid: &mut Grid) -> bool {
        let cell = self.body.grid_position();
        self.body.set_position(grid, cell.x(), cell.y(), false)
    }

    fn goal_context<'a>(&self, ctx: &TickContext<'a>) -> GoalContext<'a> {
        GoalContext {
            agent: self.id(),
            catalog: ctx.catalog,
        }
    }

    fn collect_path(&mut self, out: &mut Vec<Event>) {
        let Some(outcome) = self.link.take() else {
            return;
        };
        let target = match &outcome {
            PathOutcome::Found { target, .. } | PathOutcome::NotFound { target } => *target,
        };
        if self.last_target != Some(target) {
            trace!(
                target: "gridwalk::agents",
                agent = %self.id(),
                destination = %target,
                "stale path result dropped"
            );
            return;
        }
        self.path_locked = false;

        match outcome {
            PathOutcome::Found { path, .. } => {
                trace!(
                    target: "gridwalk::agents",
                    agent = %self.id(),
                    steps = path.len(),
                    "path received"
                );
                self.current_path = (!path.is_empty()).then_some(path);
            }
            PathOutcome::NotFound { .. } => {
                debug!(
                    target: "gridwalk::agents",
                    agent = %self.id(),
                    destination = %target,
                    "no path"
                );
                self.current_path = None;
                out.push(Event::PathNotFound { agent: self.id() });
                if self.repath_tries >= self.tuning.path_repath_tries {
                    self.give_up(out);
                } else {
                    self.repath_tries += 1;
                }
            }
        }
    }

    fn update_goal(&mut self, grid: &Grid, ctx: &TickContext<'_>, out: &mut Vec<Event>) {
        let goal_ctx = self.goal_context(ctx);
        if self.refresh_goal_cell(grid, &goal_ctx) {
            return;
        }
        if let Some(lost) = self.current_goal.take() {
            debug!(
                target: "gridwalk::agents",
                agent = %self.id(),
                goal = lost.name(),
                "goal lost"
            );
            // Deactivated goals keep their memory for when they come back.
            if lost.is_active() {
                let _ = self.discovered_goals.remove(&lost.id());
            }
            self.goal_cell = None;
            self.goal_target = None;
            self.current_path = None;
            self.path_locked = false;
        }

        let entries = self.goals.entries();
        self.discovered_goals
            .retain(|id, _| entries.iter().any(|entry| entry.id() == *id));
        if !entries.iter().any(GoalEntry::is_active) {
            return;
        }

        let found = match self.recall_goal(grid, &entries, &goal_ctx, ctx) {
            Some(found) => {
                self.search_radius = self.tuning.goal_search_step;
                Some(found)
            }
            None => self.search_goal(grid, &entries, &goal_ctx, ctx, out),
        };
        if let Some(found) = found {
            self.adopt(found, out);
        }
    }

    /// Follows a moving target and reports whether the goal still holds.
    fn refresh_goal_cell(&mut self, grid: &Grid, goal_ctx: &GoalContext<'_>) -> bool {
        let Some(goal) = self.current_goal.as_ref() else {
            return false;
        };
        let cell = self
            .goal_target
            .and_then(|target| grid.position_of(target))
            .or(self.goal_cell);
        let Some(cell) = cell else {
            return false;
        };
        let current = grid.cell(cell);
        let target_present = self
            .goal_target
            .map_or(true, |target| current.contains(target));
        if target_present && check_goal(goal, current, goal_ctx) {
            self.goal_cell = Some(cell);
            true
        } else {
            false
        }
    }

    /// Tries remembered goal locations in priority order.
    fn recall_goal(
        &self,
        grid: &Grid,
        entries: &[GoalEntry],
        goal_ctx: &GoalContext<'_>,
        ctx: &TickContext<'_>,
    ) -> Option<GoalMatch> {
        entries
            .iter()
            .filter(|entry| entry.is_active())
            .find_map(|entry| {
                let memory = self.discovered_goals.get(&entry.id())?;
                let cell = memory
                    .target
                    .and_then(|target| grid.position_of(target))
                    .unwrap_or(memory.cell);
                let current = grid.cell(cell);
                if memory.target.map_or(false, |target| !current.contains(target)) {
                    return None;
                }
                if !try_goal(entry, current, goal_ctx, ctx.interceptors) {
                    return None;
                }
                Some(GoalMatch {
                    goal: entry.clone(),
                    cell,
                    target: memory.target,
                })
            })
    }

    /// Ring search that widens on failure and resets once the maximum is exhausted.
    fn search_goal(
        &mut self,
        grid: &Grid,
        entries: &[GoalEntry],
        goal_ctx: &GoalContext<'_>,
        ctx: &TickContext<'_>,
        out: &mut Vec<Event>,
    ) -> Option<GoalMatch> {
        let origin = self.body.grid_position();
        let found = find_nearest_goal_with_priority(
            grid,
            origin,
            self.search_radius,
            entries,
            |goal, cell| try_goal(goal, cell, goal_ctx, ctx.interceptors),
        );
        if found.is_some() {
            self.search_radius = self.tuning.goal_search_step;
            return found;
        }

        if self.search_radius >= self.tuning.goal_search_distance {
            debug!(
                target: "gridwalk::agents",
                agent = %self.id(),
                radius = self.search_radius,
                "goal search exhausted"
            );
            self.reset_ai(ResetReason::SearchExhausted, out);
        } else {
            self.search_radius = (self.search_radius + self.tuning.goal_search_step)
                .min(self.tuning.goal_search_distance);
            trace!(
                target: "gridwalk::agents",
                agent = %self.id(),
                radius = self.search_radius,
                "goal search expanded"
            );
            out.push(Event::GoalSearchExpanded {
                agent: self.id(),
                radius: self.search_radius,
            });
        }
        None
    }

    fn adopt(&mut self, found: GoalMatch, out: &mut Vec<Event>) {
        let goal = found.goal.id();
        debug!(
            target: "gridwalk::agents",
            agent = %self.id(),
            goal = found.goal.name(),
            cell = %found.cell,
            "goal found"
        );
        let _ = self.discovered_goals.insert(
            goal,
            Discovery {
                target: found.target,
                cell: found.cell,
            },
        );
        self.current_goal = Some(found.goal);
        self.goal_cell = Some(found.cell);
        self.goal_target = found.target;
        self.current_path = None;
        self.path_locked = false;
        out.push(Event::GoalFound {
            agent: self.id(),
            goal,
            cell: found.cell,
        });
    }

    /// Interacts when in range, otherwise heads for the goal.
    fn interact_or_pursue(&mut self, grid: &Grid, ctx: &TickContext<'_>, out: &mut Vec<Event>) -> bool {
        let (Some(goal), Some(cell)) = (self.current_goal.clone(), self.goal_cell) else {
            return false;
        };

        if self.body.distance_to(cell) > self.tuning.interaction_range {
            let _ = self.goto(ctx.paths, cell.x(), cell.y(), out);
            return false;
        }

        let goal_ctx = self.goal_context(ctx);
        if !try_interact_goal(&goal, grid.cell(cell), &goal_ctx, ctx.interceptors) {
            self.reset_ai(ResetReason::InteractionRejected, out);
            return false;
        }
        trace!(
            target: "gridwalk::agents",
            agent = %self.id(),
            goal = goal.name(),
            cell = %cell,
            "goal interacted"
        );
        out.push(Event::GoalInteracted {
            agent: self.id(),
            goal: goal.id(),
            cell,
        });
        self.current_path = None;
        self.wait_tries = 0;
        self.repath_tries = 0;
        true
    }

    fn follow_path(&mut self, grid: &mut Grid, ctx: &TickContext<'_>, out: &mut Vec<Event>) {
        let Some(next) = self
            .current_path
            .as_ref()
            .and_then(Path::peek)
            .map(|step| step.cell)
        else {
            return;
        };
        let here = self.body.grid_position();
        if !here.is_adjacent(next) {
            debug!(
                target: "gridwalk::agents",
                agent = %self.id(),
                cell = %here,
                next = %next,
                "path no longer starts beside the agent"
            );
            self.current_path = None;
            return;
        }

        let pass_through = self.may_pass_through(grid, next);
        let moved = grid.is_diagonal_open(here, next)
            && self.body.set_position(grid, next.x(), next.y(), pass_through);
        if moved {
            self.commit_step(here, next, pass_through, out);
            self.microsearch(grid, ctx, out);
        } else {
            self.step_blocked(grid, ctx, next, out);
        }
    }

    /// Occupied cells may be crossed when the cell after them is free.
    fn may_pass_through(&self, grid: &Grid, next: Coord2D) -> bool {
        if !self.tuning.allow_pass_through || !grid.cell(next).is_occupied() {
            return false;
        }
        self.current_path
            .as_ref()
            .and_then(|path| path.get(1))
            .map_or(false, |after| grid.can_occupy(after.cell, false))
    }

    fn commit_step(&mut self, from: Coord2D, to: Coord2D, passed_through: bool, out: &mut Vec<Event>) {
        if let Some(path) = self.current_path.as_mut() {
            let _ = path.advance();
            if path.is_empty() {
                self.current_path = None;
            }
        }
        self.wait_tries = 0;
        self.repath_tries = 0;
        out.push(Event::AgentStepped {
            agent: self.id(),
            from,
            to,
            passed_through,
        });
    }

    /// Looks around after each step for a closer match than the current goal.
    fn microsearch(&mut self, grid: &Grid, ctx: &TickContext<'_>, out: &mut Vec<Event>) {
        if self.tuning.microsearch_radius == 0 {
            return;
        }
        let entries = self.goals.entries();
        let goal_ctx = self.goal_context(ctx);
        let origin = self.body.grid_position();
        let Some(found) = find_nearest_goal(
            grid,
            origin,
            self.tuning.microsearch_radius,
            &entries,
            |goal, cell| check_goal(goal, cell, &goal_ctx),
        ) else {
            return;
        };

        let closer = match (&self.current_goal, self.goal_cell) {
            (Some(current), Some(cell)) => {
                found.goal.id() == current.id()
                    && origin.distance_to(found.cell) < origin.distance_to(cell)
            }
            _ => true,
        };
        if closer && try_goal(&found.goal, grid.cell(found.cell), &goal_ctx, ctx.interceptors) {
            self.adopt(found, out);
        }
    }

    fn step_blocked(&mut self, grid: &Grid, ctx: &TickContext<'_>, next: Coord2D, out: &mut Vec<Event>) {
        self.wait_tries += 1;
        trace!(
            target: "gridwalk::agents",
            agent = %self.id(),
            cell = %next,
            wait_tries = self.wait_tries,
            "step blocked"
        );
        out.push(Event::StepBlocked {
            agent: self.id(),
            cell: next,
            wait_tries: self.wait_tries,
        });
        if self.wait_tries <= self.tuning.path_wait_tries {
            return;
        }
        if self.repath_tries < self.tuning.path_repath_tries {
            self.repath(grid, ctx.paths, out);
        } else {
            self.give_up(out);
        }
    }

    /// Forced request to a jittered cell near the path end.
    ///
    /// A path ending on the goal occupant is retargeted to a cell just
    /// outside the occupant instead.
    fn repath(&mut self, grid: &Grid, paths: &PathRequestManager, out: &mut Vec<Event>) {
        let anchor = self
            .current_path
            .as_ref()
            .and_then(Path::destination)
            .unwrap_or_else(|| self.body.grid_position());
        let near = if self.goal_target.is_some() && self.goal_cell == Some(anchor) {
            nearby_coord(anchor, Coord2D::new(1, 1), &mut self.rng)
        } else {
            anchor + Coord2D::new(self.rng.gen_range(-1..=1), self.rng.gen_range(-1..=1))
        };
        let target = grid.clamp(near);

        self.repath_tries += 1;
        self.wait_tries = 0;
        debug!(
            target: "gridwalk::agents",
            agent = %self.id(),
            destination = %target,
            attempt = self.repath_tries,
            "repathing"
        );
        out.push(Event::Repathed {
            agent: self.id(),
            target,
            attempt: self.repath_tries,
        });
        let _ = self.goto_forced(paths, target.x(), target.y(), out);
    }

    fn give_up(&mut self, out: &mut Vec<Event>) {
        warn!(
            target: "gridwalk::agents",
            agent = %self.id(),
            attempts = self.repath_tries,
            "repath failed"
        );
        out.push(Event::RepathFailed { agent: self.id() });
        self.reset_ai(ResetReason::RepathFailed, out);
    }

    fn announce_goal_change(&mut self, out: &mut Vec<Event>) {
        let current = self.current_goal.as_ref().map(GoalEntry::id);
        if current == self.previous_goal {
            return;
        }
        out.push(Event::GoalChanged {
            agent: self.id(),
            previous: self.previous_goal,
            current,
        });
        self.previous_goal = current;
    }
}
