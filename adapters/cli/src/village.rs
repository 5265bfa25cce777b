//! Scripted village: resource nodes, a depot and villagers hauling goods.

use std::{collections::BTreeMap, fmt, sync::Arc};

use anyhow::{ensure, Context, Result};
use glam::Vec2;
use gridwalk_core::{AgentId, Coord2D, Event, GoalId, NavigationConfig, ResourceKinds};
use gridwalk_system_agents::{ExecutionMode, Simulation};
use gridwalk_system_goals::{
    ring, BuildRepair, GatherResource, Goal, GoalHandle, GoalHolder, TransportResource,
};
use gridwalk_world::Obstacle;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

const DEPOT: AgentId = AgentId::new(1_000);
const FIRST_RESOURCE: u32 = 2_000;
const CARGO_CAPACITY: u32 = 5;
const RESOURCE_AMOUNT: u32 = 12;
const REPAIR_WORK: u32 = 3;
const CARRY_UPDATES: u64 = 60;
const MIN_GRID: i32 = 12;

/// Knobs of one scripted run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct VillageOptions {
    pub(crate) villagers: u32,
    pub(crate) updates: u64,
    pub(crate) seed: u64,
    pub(crate) mode: ExecutionMode,
}

#[derive(Debug)]
struct Villager {
    goals: Arc<GoalHolder>,
    transport: GoalHandle<TransportResource>,
    cargo: ResourceKinds,
    carried: u32,
}

impl Villager {
    fn new() -> Self {
        let goals = GoalHolder::new();
        let _ = goals.add::<BuildRepair>();
        for kinds in [
            ResourceKinds::GRAIN,
            ResourceKinds::GOLD,
            ResourceKinds::STONE,
            ResourceKinds::WOOD,
        ] {
            let _ = goals.push(GatherResource::new(kinds));
        }
        let transport = goals.add::<TransportResource>();
        Self {
            goals: Arc::new(goals),
            transport,
            cargo: ResourceKinds::empty(),
            carried: 0,
        }
    }

    fn set_gathering(&self, active: bool) {
        for gather in self.goals.get_all::<GatherResource>() {
            gather.write().flags_mut().active = active;
        }
    }

    fn head_home(&mut self) {
        self.set_gathering(false);
        self.transport.write().kinds = self.cargo;
    }

    fn unload(&mut self) -> (ResourceKinds, u32) {
        let unloaded = (self.cargo, self.carried);
        self.carried = 0;
        self.cargo = ResourceKinds::empty();
        self.transport.write().kinds = ResourceKinds::empty();
        self.set_gathering(true);
        unloaded
    }
}

#[derive(Clone, Copy, Debug)]
struct Resource {
    obstacle: Obstacle,
    remaining: u32,
}

/// Counters printed after a run.
#[derive(Debug, Default)]
pub(crate) struct Summary {
    updates: u64,
    villagers: usize,
    steps: u64,
    pass_throughs: u64,
    goals_found: u64,
    interactions: u64,
    path_requests: u64,
    paths_not_found: u64,
    repath_failures: u64,
    resets: u64,
    searches: u64,
    searches_found: u64,
    coalesced: u64,
    depleted: u64,
    repairs: u64,
    stock: BTreeMap<&'static str, u32>,
}

impl Summary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::AgentStepped { passed_through, .. } => {
                    self.steps += 1;
                    if *passed_through {
                        self.pass_throughs += 1;
                    }
                }
                Event::GoalFound { .. } => self.goals_found += 1,
                Event::GoalInteracted { .. } => self.interactions += 1,
                Event::PathRequested { .. } => self.path_requests += 1,
                Event::PathNotFound { .. } => self.paths_not_found += 1,
                Event::RepathFailed { .. } => self.repath_failures += 1,
                Event::AiReset { .. } => self.resets += 1,
                _ => {}
            }
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "updates          {}", self.updates)?;
        writeln!(f, "villagers        {}", self.villagers)?;
        writeln!(f, "steps            {} ({} passing through)", self.steps, self.pass_throughs)?;
        writeln!(f, "goals found      {}", self.goals_found)?;
        writeln!(f, "interactions     {}", self.interactions)?;
        writeln!(
            f,
            "path requests    {} ({} searches, {} found, {} coalesced, {} unreachable)",
            self.path_requests, self.searches, self.searches_found, self.coalesced, self.paths_not_found
        )?;
        writeln!(f, "repath failures  {}", self.repath_failures)?;
        writeln!(f, "ai resets        {}", self.resets)?;
        writeln!(f, "depleted nodes   {}", self.depleted)?;
        writeln!(f, "depot repairs    {}", self.repairs)?;
        if self.stock.is_empty() {
            write!(f, "stock            none")
        } else {
            let stock: Vec<String> = self
                .stock
                .iter()
                .map(|(kind, amount)| format!("{}={amount}", kind.to_lowercase()))
                .collect();
            write!(f, "stock            {}", stock.join(" "))
        }
    }
}

/// Simulation plus the game rules layered on top of it.
pub(crate) struct Village {
    sim: Simulation,
    depot: Obstacle,
    villagers: BTreeMap<AgentId, Villager>,
    resources: BTreeMap<AgentId, Resource>,
    repair_work: u32,
    summary: Summary,
}

impl Village {
    /// Lays out the depot, resource nodes and villagers.
    pub(crate) fn build(config: NavigationConfig, options: &VillageOptions) -> Result<Self> {
        let size = i32::try_from(config.grid.size).context("grid size does not fit a coordinate")?;
        ensure!(size >= MIN_GRID, "the village needs a grid of at least {MIN_GRID} cells");
        let mut sim = Simulation::new(config, options.mode, options.seed)
            .context("creating the simulation")?;
        let center = Coord2D::new(size / 2, size / 2);

        let depot = Obstacle::new(DEPOT, center, Coord2D::new(3, 3));
        sim.bake_obstacle(&depot).context("placing the depot")?;
        sim.catalog_mut().insert_structure(DEPOT, ResourceKinds::all(), false);

        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        let kinds = [
            ResourceKinds::WOOD,
            ResourceKinds::STONE,
            ResourceKinds::GRAIN,
            ResourceKinds::GOLD,
        ];
        let wanted = usize::try_from(size).unwrap_or(0);
        let mut resources = BTreeMap::new();
        for attempt in 0..wanted * 4 {
            if resources.len() == wanted {
                break;
            }
            let at = Coord2D::new(rng.gen_range(1..size - 1), rng.gen_range(1..size - 1));
            if at.distance_to(center) < 5 || !sim.grid().read().can_occupy(at, false) {
                continue;
            }
            let id = AgentId::new(FIRST_RESOURCE + u32::try_from(attempt).unwrap_or(0));
            let obstacle = Obstacle::new(id, at, Coord2D::new(1, 1));
            sim.bake_obstacle(&obstacle).context("placing a resource node")?;
            sim.catalog_mut()
                .insert_resource(id, kinds[resources.len() % kinds.len()]);
            let _ = resources.insert(
                id,
                Resource {
                    obstacle,
                    remaining: RESOURCE_AMOUNT,
                },
            );
        }

        let homes: Vec<Coord2D> = {
            let grid = sim.grid().read();
            let homes: Vec<Coord2D> = ring(&grid, center, 3)
                .filter(|cell| grid.can_occupy(*cell, false))
                .take(usize::try_from(options.villagers).unwrap_or(0))
                .collect();
            homes
        };
        let mut villagers = BTreeMap::new();
        for (index, home) in homes.into_iter().enumerate() {
            let id = AgentId::new(1 + u32::try_from(index).unwrap_or(0));
            let villager = Villager::new();
            let _ = sim
                .spawn_agent(id, home, villager.goals.clone())
                .with_context(|| format!("spawning villager {id}"))?;
            let _ = villagers.insert(id, villager);
        }

        info!(
            target: "gridwalk::village",
            resources = resources.len(),
            villagers = villagers.len(),
            "village laid out"
        );
        Ok(Self {
            sim,
            depot,
            summary: Summary {
                villagers: villagers.len(),
                ..Summary::default()
            },
            villagers,
            resources,
            repair_work: 0,
        })
    }

    /// Runs the scripted scenario and returns its summary.
    pub(crate) async fn run(mut self, updates: u64) -> Result<Summary> {
        let mut events = Vec::new();
        for update in 0..updates {
            self.script(update, updates, &mut events);
            self.sim.fixed_update(&mut events);
            self.apply(&events)?;
            self.summary.record(&events);
            events.clear();
            tokio::task::yield_now().await;
        }

        self.summary.updates = self.sim.updates();
        let report = self.sim.shutdown().await.context("stopping path execution")?;
        self.summary.searches = report.searches;
        self.summary.searches_found = report.found;
        self.summary.coalesced = report.coalesced;
        Ok(self.summary)
    }

    /// Scripted interventions: a storm damages the depot and a villager is carried.
    fn script(&mut self, update: u64, updates: u64, out: &mut Vec<Event>) {
        let carried = AgentId::new(1);
        if update == updates / 3 {
            info!(target: "gridwalk::village", "storm damaged the depot");
            self.sim.catalog_mut().set_needs_repair(DEPOT, true);
        }
        if update == updates / 2 && self.sim.toggle_freeze(carried, out) {
            info!(target: "gridwalk::village", villager = %carried, "villager picked up");
        }
        if update == updates / 2 + CARRY_UPDATES {
            let drop = self.depot.position() + Coord2D::new(3, 0);
            if self.sim.carry(carried, Vec2::new(drop.x() as f32, drop.y() as f32)) {
                let _ = self.sim.reset_agent(carried, out);
                let _ = self.sim.toggle_freeze(carried, out);
                info!(target: "gridwalk::village", villager = %carried, cell = %drop, "villager dropped");
            }
        }
    }

    fn apply(&mut self, events: &[Event]) -> Result<()> {
        for event in events {
            match *event {
                Event::GoalInteracted { agent, goal, cell } => self.interact(agent, goal, cell)?,
                Event::RepathFailed { agent } => {
                    if let Some(villager) = self.villagers.get(&agent) {
                        villager.goals.cycle();
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn interact(&mut self, agent: AgentId, goal: GoalId, cell: Coord2D) -> Result<()> {
        let Some(villager) = self.villagers.get_mut(&agent) else {
            return Ok(());
        };
        let Some(entry) = villager.goals.entry(goal) else {
            return Ok(());
        };

        if let Some(gather) = entry.downcast::<GatherResource>() {
            let kinds = gather.read().kinds;
            let node = self.sim.grid().read().cell(cell).first_occupant();
            let Some(resource) = node.and_then(|node| self.resources.get_mut(&node)) else {
                return Ok(());
            };
            resource.remaining -= 1;
            if resource.remaining == 0 {
                let obstacle = resource.obstacle;
                let _ = self.resources.remove(&obstacle.id());
                let _ = self.sim.catalog_mut().remove(obstacle.id());
                self.sim
                    .unbake_obstacle(&obstacle)
                    .context("removing a depleted node")?;
                self.summary.depleted += 1;
            }
            if villager.cargo != kinds {
                villager.cargo = kinds;
                villager.carried = 0;
            }
            villager.carried += 1;
            if villager.carried >= CARGO_CAPACITY {
                villager.head_home();
            }
        } else if entry.is::<TransportResource>() {
            let (kinds, amount) = villager.unload();
            if let Some((name, _)) = kinds.iter_names().next() {
                *self.summary.stock.entry(name).or_default() += amount;
            }
        } else if entry.is::<BuildRepair>() {
            self.repair_work += 1;
            if self.repair_work >= REPAIR_WORK {
                self.repair_work = 0;
                self.summary.repairs += 1;
                self.sim.catalog_mut().set_needs_repair(DEPOT, false);
                info!(target: "gridwalk::village", villager = %agent, "depot repaired");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(mode: ExecutionMode) -> (NavigationConfig, VillageOptions) {
        let mut config = NavigationConfig::default();
        config.grid.size = 24;
        config.timing.actor_tick_rate = 1;
        let options = VillageOptions {
            villagers: 3,
            updates: 400,
            seed: 11,
            mode,
        };
        (config, options)
    }

    #[tokio::test]
    async fn villagers_gather_from_nearby_nodes() {
        let (config, options) = options(ExecutionMode::Cooperative);
        let village = Village::build(config, &options).expect("village");
        assert_eq!(village.villagers.len(), 3);
        assert!(!village.resources.is_empty());

        let summary = village.run(options.updates).await.expect("run");
        assert_eq!(summary.updates, 400);
        assert!(summary.steps > 0);
        assert!(summary.interactions > 0);
        assert!(summary.searches > 0);
    }

    #[test]
    fn tiny_grids_are_refused() {
        let (mut config, options) = options(ExecutionMode::Cooperative);
        config.grid.size = 6;
        assert!(Village::build(config, &options).is_err());
    }
}
