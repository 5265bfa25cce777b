use std::time::Duration;

use gridwalk_core::{AgentId, Coord2D, NavigationConfig};
use gridwalk_system_path_requests::{
    AgentLink, PathOutcome, PathRequestError, PathRequestManager, PathState, PathWorker,
};
use gridwalk_world::{Grid, SharedGrid};

fn shared_grid_with(agents: &[(u32, Coord2D)]) -> SharedGrid {
    let mut grid = Grid::new(8).expect("grid");
    for (id, coord) in agents {
        assert!(grid.set_position(AgentId::new(*id), *coord, false));
    }
    SharedGrid::new(grid)
}

#[test]
fn newer_request_replaces_pending_target() {
    let grid = shared_grid_with(&[(1, Coord2D::new(0, 0))]);
    let (manager, mut executor) = PathRequestManager::new(grid, &NavigationConfig::default());
    let link = AgentLink::new(AgentId::new(1));

    manager.request_path(&link, 7, 0, false).expect("queued");
    manager.request_path(&link, 0, 7, false).expect("queued");

    assert_eq!(executor.pump(8), 1);
    let report = executor.report();
    assert_eq!(report.searches, 1);
    assert_eq!(report.coalesced, 1);

    match link.take() {
        Some(PathOutcome::Found { target, path }) => {
            assert_eq!(target, Coord2D::new(0, 7));
            assert_eq!(path.destination(), Some(Coord2D::new(0, 7)));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn pump_respects_its_budget() {
    let grid = shared_grid_with(&[
        (1, Coord2D::new(0, 0)),
        (2, Coord2D::new(1, 0)),
        (3, Coord2D::new(2, 0)),
    ]);
    let (manager, mut executor) = PathRequestManager::new(grid, &NavigationConfig::default());
    let links: Vec<AgentLink> = (1..=3).map(|id| AgentLink::new(AgentId::new(id))).collect();
    for link in &links {
        manager.request_path(link, 5, 5, true).expect("queued");
    }

    assert_eq!(executor.pump(2), 2);
    assert_eq!(executor.pending_len(), 1);
    assert!(matches!(links[0].state(), PathState::Found { .. }));
    assert!(matches!(links[1].state(), PathState::Found { .. }));
    assert!(links[2].is_pending());

    assert_eq!(executor.pump(2), 1);
    assert_eq!(executor.pump(2), 0);
}

#[test]
fn agent_missing_from_grid_gets_no_path() {
    let grid = shared_grid_with(&[]);
    let (manager, mut executor) = PathRequestManager::new(grid, &NavigationConfig::default());
    let link = AgentLink::new(AgentId::new(4));
    manager.request_path(&link, 3, 3, false).expect("queued");

    assert_eq!(executor.pump(1), 1);
    assert_eq!(
        link.take(),
        Some(PathOutcome::NotFound {
            target: Coord2D::new(3, 3)
        })
    );
    assert_eq!(executor.report().found, 0);
}

#[test]
fn full_queue_drops_request_and_keeps_previous_state() {
    let grid = shared_grid_with(&[(1, Coord2D::new(0, 0)), (2, Coord2D::new(4, 4))]);
    let mut config = NavigationConfig::default();
    config.requests.queue_capacity = 1;
    let (manager, _executor) = PathRequestManager::new(grid, &config);
    let first = AgentLink::new(AgentId::new(1));
    let second = AgentLink::new(AgentId::new(2));

    manager.request_path(&first, 2, 2, false).expect("queued");
    let error = manager.request_path(&second, 6, 6, false).unwrap_err();

    assert!(matches!(error, PathRequestError::QueueFull));
    assert_eq!(second.state(), PathState::Idle);
    assert_eq!(
        first.state(),
        PathState::Pending {
            target: Coord2D::new(2, 2)
        }
    );
}

#[test]
fn dropped_executor_closes_the_manager() {
    let grid = shared_grid_with(&[(1, Coord2D::new(0, 0))]);
    let (manager, executor) = PathRequestManager::new(grid, &NavigationConfig::default());
    drop(executor);

    assert!(manager.is_closed());
    let link = AgentLink::new(AgentId::new(1));
    let error = manager.request_path(&link, 1, 1, false).unwrap_err();
    assert!(matches!(error, PathRequestError::Closed));
    assert_eq!(link.state(), PathState::Idle);
}

#[tokio::test]
async fn worker_publishes_results_in_the_background() {
    let grid = shared_grid_with(&[(1, Coord2D::new(0, 0))]);
    let (manager, executor) = PathRequestManager::new(grid, &NavigationConfig::default());
    let worker = PathWorker::spawn(&manager, executor);
    let link = AgentLink::new(AgentId::new(1));

    manager.request_path(&link, 6, 3, false).expect("queued");

    let outcome = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(outcome) = link.take() {
                return outcome;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("worker answered");

    assert!(matches!(outcome, PathOutcome::Found { .. }));
    let report = worker.shutdown().await.expect("clean shutdown");
    assert_eq!(report.searches, 1);
    assert_eq!(report.found, 1);
}

#[tokio::test]
async fn worker_coalesces_requests_queued_before_it_starts() {
    let grid = shared_grid_with(&[(1, Coord2D::new(0, 0))]);
    let (manager, executor) = PathRequestManager::new(grid, &NavigationConfig::default());
    let link = AgentLink::new(AgentId::new(1));
    manager.request_path(&link, 7, 7, false).expect("queued");
    manager.request_path(&link, 3, 5, false).expect("queued");

    let worker = PathWorker::spawn(&manager, executor);
    let report = worker.shutdown().await.expect("clean shutdown");

    assert_eq!(report.searches, 1);
    assert_eq!(report.coalesced, 1);
    assert!(matches!(
        link.take(),
        Some(PathOutcome::Found { target, .. }) if target == Coord2D::new(3, 5)
    ));
}
