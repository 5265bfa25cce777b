//! Fixed-step driver owning the grid, the request service and the agents.

use std::{collections::BTreeMap, sync::Arc};

use gridwalk_core::{AgentId, Coord2D, Event, NavigationConfig, ResetReason};
use gridwalk_system_goals::{GoalHolder, GoalInterceptors, MemoryCatalog};
use gridwalk_system_path_requests::{PathExecutor, PathRequestManager, PathWorker, WorkerReport};
use gridwalk_world::{Grid, Obstacle, SharedGrid};
use tracing::{debug, info};

use crate::{Agent, Body, SimulationError, TickContext};

/// Where path searches run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Searches run inline, `requests_per_tick` of them after every fixed update.
    #[default]
    Cooperative,
    /// Searches run on a dedicated blocking task.
    Threaded,
}

#[derive(Debug)]
enum Executor {
    Inline(PathExecutor),
    Worker(PathWorker),
}

/// Owns one world and every agent living in it.
#[derive(Debug)]
pub struct Simulation {
    config: NavigationConfig,
    grid: SharedGrid,
    paths: PathRequestManager,
    executor: Executor,
    agents: BTreeMap<AgentId, Agent>,
    catalog: MemoryCatalog,
    interceptors: GoalInterceptors,
    seed: u64,
    updates: u64,
}

impl Simulation {
    /// Builds an empty world sized by `config.grid`.
    ///
    /// [`ExecutionMode::Threaded`] must be selected from within a tokio runtime.
    pub fn new(
        config: NavigationConfig,
        mode: ExecutionMode,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        let grid = SharedGrid::new(Grid::new(config.grid.size)?);
        let (paths, executor) = PathRequestManager::new(grid.clone(), &config);
        let executor = match mode {
            ExecutionMode::Cooperative => Executor::Inline(executor),
            ExecutionMode::Threaded => {
                if tokio::runtime::Handle::try_current().is_err() {
                    return Err(SimulationError::NoRuntime);
                }
                Executor::Worker(PathWorker::spawn(&paths, executor))
            }
        };
        info!(
            target: "gridwalk::agents",
            size = config.grid.size,
            mode = ?mode,
            "simulation created"
        );
        Ok(Self {
            config,
            grid,
            paths,
            executor,
            agents: BTreeMap::new(),
            catalog: MemoryCatalog::new(),
            interceptors: GoalInterceptors::new(),
            seed,
            updates: 0,
        })
    }

    /// Configuration the simulation runs with.
    #[must_use]
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Shared handle to the grid.
    #[must_use]
    pub fn grid(&self) -> &SharedGrid {
        &self.grid
    }

    /// Submission handle of the request service.
    #[must_use]
    pub fn paths(&self) -> &PathRequestManager {
        &self.paths
    }

    /// Facts about non-agent bodies.
    #[must_use]
    pub fn catalog(&self) -> &MemoryCatalog {
        &self.catalog
    }

    /// Mutable access to the body facts.
    pub fn catalog_mut(&mut self) -> &mut MemoryCatalog {
        &mut self.catalog
    }

    /// Mutable access to the interceptor chain.
    pub fn interceptors_mut(&mut self) -> &mut GoalInterceptors {
        &mut self.interceptors
    }

    /// Fixed updates run so far.
    #[must_use]
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Looks up an agent.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Agents in id order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Bakes a static obstacle into the grid.
    pub fn bake_obstacle(&mut self, obstacle: &Obstacle) -> Result<(), SimulationError> {
        obstacle.bake_to_grid(&mut self.grid.write())?;
        Ok(())
    }

    /// Removes a previously baked obstacle.
    pub fn unbake_obstacle(&mut self, obstacle: &Obstacle) -> Result<(), SimulationError> {
        obstacle.unbake_from_grid(&mut self.grid.write())?;
        Ok(())
    }

    /// Places a new agent on `position` with the given goals.
    pub fn spawn_agent(
        &mut self,
        id: AgentId,
        position: Coord2D,
        goals: Arc<GoalHolder>,
    ) -> Result<AgentId, SimulationError> {
        if self.agents.contains_key(&id) {
            return Err(SimulationError::DuplicateAgent(id));
        }
        let body = Body::new(id, position, Coord2D::new(1, 1));
        let seed = self.seed ^ u64::from(id.get()).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let mut agent = Agent::new(body, goals, &self.config, seed);
        if !agent.place(&mut self.grid.write()) {
            return Err(SimulationError::CellUnavailable {
                agent: id,
                coord: position,
            });
        }
        debug!(target: "gridwalk::agents", agent = %id, cell = %position, "agent spawned");
        let _ = self.agents.insert(id, agent);
        Ok(id)
    }

    /// Removes an agent from the world and hands back its body.
    pub fn despawn_agent(&mut self, id: AgentId) -> Option<Body> {
        let agent = self.agents.remove(&id)?;
        debug!(target: "gridwalk::agents", agent = %id, "agent despawned");
        Some(agent.despawn(&mut self.grid.write()))
    }

    /// Requests a path for an agent, bypassing its current path.
    pub fn goto_forced(&mut self, id: AgentId, target: Coord2D, out: &mut Vec<Event>) -> bool {
        let Some(agent) = self.agents.get_mut(&id) else {
            return false;
        };
        agent.goto_forced(&self.paths, target.x(), target.y(), out)
    }

    /// Freezes or thaws an agent; `false` when the agent does not exist.
    pub fn toggle_freeze(&mut self, id: AgentId, out: &mut Vec<Event>) -> bool {
        let Some(agent) = self.agents.get_mut(&id) else {
            return false;
        };
        agent.toggle_freeze(&mut self.grid.write(), out);
        true
    }

    /// Moves a frozen agent's physical position.
    pub fn carry(&mut self, id: AgentId, position: glam::Vec2) -> bool {
        match self.agents.get_mut(&id) {
            Some(agent) if agent.is_frozen() => {
                agent.set_physical_position(position);
                true
            }
            _ => false,
        }
    }

    /// Wipes an agent's decision state.
    pub fn reset_agent(&mut self, id: AgentId, out: &mut Vec<Event>) -> bool {
        let Some(agent) = self.agents.get_mut(&id) else {
            return false;
        };
        agent.reset_ai(ResetReason::Requested, out);
        true
    }

    /// Runs one fixed update for every agent, then serves path requests.
    pub fn fixed_update(&mut self, out: &mut Vec<Event>) {
        let ctx = TickContext {
            grid: &self.grid,
            paths: &self.paths,
            catalog: &self.catalog,
            interceptors: &self.interceptors,
            delta_seconds: self.config.timing.fixed_delta_seconds(),
        };
        for agent in self.agents.values_mut() {
            agent.fixed_update(&ctx, out);
        }
        if let Executor::Inline(executor) = &mut self.executor {
            let _ = executor.pump(self.config.requests.requests_per_tick);
        }
        self.updates += 1;
    }

    /// Runs `updates` fixed updates and returns every event they produced.
    pub fn run(&mut self, updates: u64) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..updates {
            self.fixed_update(&mut events);
        }
        events
    }

    /// Stops the request service and reports its counters.
    ///
    /// In threaded mode this waits for the worker to drain its queue.
    pub async fn shutdown(self) -> Result<WorkerReport, SimulationError> {
        let report = match self.executor {
            Executor::Inline(executor) => executor.report(),
            Executor::Worker(worker) => worker.shutdown().await?,
        };
        info!(
            target: "gridwalk::agents",
            updates = self.updates,
            searches = report.searches,
            "simulation stopped"
        );
        Ok(report)
    }
}
