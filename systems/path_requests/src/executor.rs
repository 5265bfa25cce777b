//! Consumer side of the request channel.

use gridwalk_core::{config::PathfindingSettings, AgentId};
use gridwalk_system_pathfinding::{PathFinder, SearchOptions};
use gridwalk_world::SharedGrid;
use indexmap::IndexMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{Command, PathRequest};

/// Counters accumulated by an executor over its lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Searches executed.
    pub searches: u64,
    /// Searches that produced a path.
    pub found: u64,
    /// Requests that replaced the target of an already pending request.
    pub coalesced: u64,
}

/// Owns the pending queue and the search scratch state.
///
/// Requests are kept in arrival order of their agents; coalescing keeps the
/// original slot of the agent and only swaps the target.
#[derive(Debug)]
pub struct PathExecutor {
    rx: mpsc::Receiver<Command>,
    pending: IndexMap<AgentId, PathRequest>,
    finder: PathFinder,
    grid: SharedGrid,
    congestion_penalty: u32,
    report: WorkerReport,
    shutdown_requested: bool,
}

impl PathExecutor {
    pub(crate) fn new(
        rx: mpsc::Receiver<Command>,
        grid: SharedGrid,
        settings: &PathfindingSettings,
    ) -> Self {
        Self {
            rx,
            pending: IndexMap::new(),
            finder: PathFinder::from_settings(settings),
            grid,
            congestion_penalty: settings.congestion_penalty,
            report: WorkerReport::default(),
            shutdown_requested: false,
        }
    }

    /// Moves every request waiting in the channel into the pending queue.
    pub fn collect(&mut self) {
        while let Ok(command) = self.rx.try_recv() {
            self.accept(command);
        }
    }

    /// Collects new requests, then executes at most `budget` of them.
    ///
    /// Returns the number of searches executed.
    pub fn pump(&mut self, budget: usize) -> usize {
        self.collect();
        let mut executed = 0;
        while executed < budget {
            let Some(request) = self.next_request() else {
                break;
            };
            self.execute(request);
            executed += 1;
        }
        executed
    }

    /// Number of coalesced requests waiting for execution.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn report(&self) -> WorkerReport {
        self.report
    }

    /// Serves requests until shutdown is requested or every sender is dropped.
    ///
    /// Blocks the calling thread while idle; run it on a dedicated thread or a
    /// blocking task. Pending requests are drained before returning.
    pub fn run_blocking(mut self) -> WorkerReport {
        info!(target: "gridwalk::paths", "path worker started");
        loop {
            self.collect();
            if let Some(request) = self.next_request() {
                self.execute(request);
                continue;
            }
            if self.shutdown_requested {
                break;
            }
            match self.rx.blocking_recv() {
                Some(command) => self.accept(command),
                None => break,
            }
        }
        info!(
            target: "gridwalk::paths",
            searches = self.report.searches,
            found = self.report.found,
            coalesced = self.report.coalesced,
            "path worker stopped"
        );
        self.report
    }

    fn accept(&mut self, command: Command) {
        match command {
            Command::Request(request) => {
                let agent = request.link.agent();
                if let Some(slot) = self.pending.get_mut(&agent) {
                    debug!(
                        target: "gridwalk::paths",
                        agent = %agent,
                        superseded = %slot.target,
                        destination = %request.target,
                        "path request coalesced"
                    );
                    *slot = request;
                    self.report.coalesced += 1;
                } else {
                    let _ = self.pending.insert(agent, request);
                }
            }
            Command::Shutdown => self.shutdown_requested = true,
        }
    }

    fn next_request(&mut self) -> Option<PathRequest> {
        self.pending.shift_remove_index(0).map(|(_, request)| request)
    }

    fn execute(&mut self, request: PathRequest) {
        let agent = request.link.agent();
        let options = SearchOptions::new(request.ignore_actors)
            .with_congestion_penalty(self.congestion_penalty);
        let path = {
            let grid = self.grid.read();
            grid.position_of(agent)
                .and_then(|start| self.finder.find(&grid, start, request.target, options))
        };
        self.report.searches += 1;
        if path.is_some() {
            self.report.found += 1;
        }
        debug!(
            target: "gridwalk::paths",
            agent = %agent,
            destination = %request.target,
            found = path.is_some(),
            "path search finished"
        );
        request.link.publish(request.target, path);
    }
}
