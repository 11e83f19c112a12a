//! Drives monitors on timers.
//!
//! In concurrent mode every monitor owns a task and an interval, so a slow
//! live read for one attraction never delays another. In sequential mode a
//! single task sweeps all monitors with a fixed pause between items, which
//! keeps the upstream page to one request at a time.

use crate::lightning::{LaneContext, LaneWatch};
use crate::monitor::{Monitor, TickContext};
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerMode {
    Concurrent,
    Sequential { item_delay: Duration },
}

impl fmt::Display for SchedulerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerMode::Concurrent => f.write_str("concurrent"),
            SchedulerMode::Sequential { item_delay } => {
                write!(f, "sequential ({}ms between items)", item_delay.as_millis())
            }
        }
    }
}

pub struct SchedulerHandle {
    mode: SchedulerMode,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn mode(&self) -> SchedulerMode {
        self.mode
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Run Lightning Lane watches alongside the monitors, one task each.
    ///
    /// They stop with the rest of the scheduler on [`SchedulerHandle::shutdown`].
    pub fn spawn_lanes(&mut self, watches: Vec<LaneWatch>, ctx: LaneContext) {
        if let Ok(mut guard) = ctx.state.write() {
            for lane in &watches {
                guard.register_lane(lane.attraction_id().clone());
            }
        } else {
            warn!("State lock poisoned while registering lane watches");
        }

        info!(watches = watches.len(), "Starting Lightning Lane watches");
        for lane in watches {
            let shutdown = self.shutdown_tx.subscribe();
            self.tasks.push(tokio::spawn(run_lane(lane, ctx.clone(), shutdown)));
        }
    }

    /// Signal every task to stop at its next suspension point and wait for them.
    pub async fn shutdown(self) {
        self.shutdown_tx.send_replace(true);
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "Monitor task ended abnormally");
            }
        }
    }
}

pub fn spawn(monitors: Vec<Monitor>, ctx: TickContext, mode: SchedulerMode) -> SchedulerHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    if let Ok(mut guard) = ctx.state.write() {
        for monitor in &monitors {
            guard.register(monitor.attraction_id().clone());
        }
        guard.set_scheduler_mode(mode.to_string());
    } else {
        warn!("State lock poisoned while registering monitors");
    }

    info!(mode = %mode, monitors = monitors.len(), "Starting scheduler");

    let tasks = match mode {
        SchedulerMode::Concurrent => monitors
            .into_iter()
            .map(|monitor| tokio::spawn(run_monitor(monitor, ctx.clone(), shutdown_rx.clone())))
            .collect(),
        SchedulerMode::Sequential { item_delay } => {
            vec![tokio::spawn(run_sweep(monitors, ctx, item_delay, shutdown_rx))]
        }
    };

    SchedulerHandle {
        mode,
        shutdown_tx,
        tasks,
    }
}

async fn run_monitor(mut monitor: Monitor, ctx: TickContext, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(monitor.settings().interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }
        monitor.tick(&ctx).await;
    }
    info!(attraction = %monitor.attraction_id(), "Monitor stopped");
}

async fn run_lane(mut lane: LaneWatch, ctx: LaneContext, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(lane.settings().interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }
        lane.tick(&ctx).await;
    }
    info!(attraction = %lane.attraction_id(), "Lightning Lane watch stopped");
}

async fn run_sweep(
    mut monitors: Vec<Monitor>,
    ctx: TickContext,
    item_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    if monitors.is_empty() {
        warn!("Sequential sweep has no monitors");
        return;
    }

    'sweep: loop {
        for monitor in monitors.iter_mut() {
            if *shutdown.borrow() {
                break 'sweep;
            }
            monitor.tick(&ctx).await;
            tokio::select! {
                _ = tokio::time::sleep(item_delay) => {}
                _ = shutdown.changed() => break 'sweep,
            }
        }
    }
    info!("Sequential sweep stopped");
}
