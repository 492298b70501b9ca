// crates/central-config-client/src/scheduler.rs
// ============================================================================
// Module: Refresh Scheduler
// Description: Background task issuing periodic unforced refreshes.
// Purpose: Keep the published configuration current without caller polling.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! The scheduler wakes on a fixed tick and asks the orchestrator for an
//! unforced refresh. Whether the service is contacted is still decided by the
//! trust record's refresh interval, so the tick only bounds how late a due
//! check can run. The first tick fires immediately.
//!
//! Shutdown is observed while waiting for a tick and while a refresh is in
//! flight.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::orchestrator::ConfigurationOrchestrator;

// ============================================================================
// SECTION: Scheduler
// ============================================================================

/// Handle to a running refresh loop.
///
/// Dropping the handle closes the shutdown channel, which also stops the loop.
pub struct RefreshScheduler {
    /// Shutdown signal.
    shutdown: broadcast::Sender<()>,
    /// Loop task.
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Spawns the refresh loop on the current Tokio runtime.
    ///
    /// A zero `tick` is raised to one millisecond.
    #[must_use]
    pub fn spawn(orchestrator: ConfigurationOrchestrator, tick: Duration) -> Self {
        let (shutdown, receiver) = broadcast::channel(1);
        let tick = tick.max(Duration::from_millis(1));
        let handle = tokio::spawn(run(orchestrator, tick, receiver));
        Self {
            shutdown,
            handle,
        }
    }

    /// Returns true once the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the loop and waits for it to exit.
    ///
    /// A refresh already in flight is not waited for; it completes on its own
    /// task and only writes state after verification.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

/// Ticks until shutdown, refreshing on each tick.
async fn run(
    orchestrator: ConfigurationOrchestrator,
    tick: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.recv() => break,
        }
        tokio::select! {
            _ = orchestrator.refresh(false) => {}
            _ = shutdown.recv() => break,
        }
    }
}
