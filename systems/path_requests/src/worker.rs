//! Dedicated worker running an executor on the blocking pool.

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

use crate::{Command, PathExecutor, PathRequestError, PathRequestManager, WorkerReport};

/// Handle to an executor running on its own blocking task.
#[derive(Debug)]
pub struct PathWorker {
    tx: mpsc::Sender<Command>,
    handle: JoinHandle<WorkerReport>,
}

impl PathWorker {
    /// Spawns `executor` on the tokio blocking pool.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(manager: &PathRequestManager, executor: PathExecutor) -> Self {
        let handle = tokio::task::spawn_blocking(move || executor.run_blocking());
        Self {
            tx: manager.sender(),
            handle,
        }
    }

    /// Reports whether the worker task already returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signals shutdown and waits for the worker to drain its queue.
    pub async fn shutdown(self) -> Result<WorkerReport, PathRequestError> {
        if self.tx.send(Command::Shutdown).await.is_err() {
            debug!(target: "gridwalk::paths", "path worker already stopped");
        }
        drop(self.tx);
        self.handle.await.map_err(PathRequestError::WorkerJoin)
    }
}
