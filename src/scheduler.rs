//! Periodic task scheduling with refresh coalescing
//!
//! Runs one task on a fixed interval and on manual refresh requests. Bursts
//! of refresh requests inside the cooldown window, and requests raised while
//! a run is in flight, collapse into a single run, so one account never has
//! two concurrent update cycles.

use crate::logging::get_logger;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval, sleep};

/// Handle for requesting refreshes and shutdown from other tasks
#[derive(Clone)]
pub struct SchedulerHandle {
    refresh_tx: mpsc::UnboundedSender<()>,
    shutdown_tx: mpsc::UnboundedSender<()>,
}

impl SchedulerHandle {
    /// Ask for a run outside the regular interval
    pub fn request_refresh(&self) {
        let _ = self.refresh_tx.send(());
    }

    /// Stop the scheduler after the current run
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Periodic runner with manual-refresh debouncing
pub struct Scheduler {
    period: Duration,
    cooldown: Duration,
    refresh_rx: mpsc::UnboundedReceiver<()>,
    shutdown_rx: mpsc::UnboundedReceiver<()>,
    logger: crate::logging::StructuredLogger,
}

impl Scheduler {
    /// Create a scheduler and its control handle
    pub fn new(period: Duration, cooldown: Duration) -> (Self, SchedulerHandle) {
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        (
            Self {
                period,
                cooldown,
                refresh_rx,
                shutdown_rx,
                logger: get_logger("scheduler"),
            },
            SchedulerHandle {
                refresh_tx,
                shutdown_tx,
            },
        )
    }

    /// Run `task` until shutdown. The first run happens immediately.
    pub async fn run<F, Fut>(mut self, mut task: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    task().await;
                    // Requests raised while the run was in flight are
                    // satisfied by the cursors it just committed.
                    self.drain_refreshes();
                }
                Some(()) = self.refresh_rx.recv() => {
                    sleep(self.cooldown).await;
                    let coalesced = self.drain_refreshes();
                    if coalesced > 0 {
                        self.logger
                            .debug(&format!("Coalesced {} refresh requests", coalesced));
                    }
                    task().await;
                    self.drain_refreshes();
                    ticker.reset();
                }
                _ = self.shutdown_rx.recv() => {
                    self.logger.info("Scheduler shutting down");
                    break;
                }
            }
        }
    }

    fn drain_refreshes(&mut self) -> usize {
        let mut drained = 0;
        while self.refresh_rx.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }
}
