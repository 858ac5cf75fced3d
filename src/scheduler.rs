// Node Sensor - Node-resident telemetry collector
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Background collection loop
//!
//! One thread per sensor waits for the poll delay, then runs a collection
//! cycle. The wait listens on a shutdown channel, so [`SchedulerHandle::stop`]
//! interrupts it and joins the thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::{AdapterError, Result, SensorError};
use crate::sensor::{Shared, TrackedInstance};
use crate::store::Resource;

/// What a collection cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The sensor is not configured yet
    Skipped,
    /// Every tracked instance was polled
    Collected {
        /// Snapshots merged into the store
        merged: usize,
        /// Adapter calls that failed or were rejected
        failed: usize,
        /// Samples appended
        appended: usize,
    },
}

/// Running scheduler thread
#[derive(Debug)]
pub(crate) struct SchedulerHandle {
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Spawn the collection loop for `shared`
    pub(crate) fn start(shared: Arc<Shared>) -> Result<Self> {
        let (shutdown, shutdown_rx) = crossbeam_channel::bounded(1);

        let thread = thread::Builder::new()
            .name("sensor-scheduler".to_string())
            .spawn(move || run(shared, shutdown_rx))
            .map_err(|e| {
                log::error!("failed to spawn a sensor scheduler thread: {}", e);
                SensorError::SchedulerSpawn(e.to_string())
            })?;

        Ok(Self {
            shutdown,
            thread: Some(thread),
        })
    }

    /// Check if the loop thread is still alive
    pub(crate) fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the loop and wait for it to exit
    pub(crate) fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        // A full channel already carries a pending stop
        let _ = self.shutdown.try_send(());
        if thread.join().is_err() {
            log::error!("sensor scheduler thread panicked");
        }
    }
}

#[cfg(test)]
impl SchedulerHandle {
    /// Handle whose loop thread has already returned
    pub(crate) fn exited() -> Self {
        let (shutdown, _) = crossbeam_channel::bounded(1);
        let thread = thread::spawn(|| {});
        while !thread.is_finished() {
            thread::yield_now();
        }
        Self {
            shutdown,
            thread: Some(thread),
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

fn run(shared: Arc<Shared>, shutdown: Receiver<()>) {
    log::debug!("sensor scheduler started");

    loop {
        // Re-read every iteration so a reconfiguration applies to the next wait
        let delay = shared.poll_delay();
        match shutdown.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        run_cycle(&shared);
    }

    log::debug!("sensor scheduler stopped");
}

/// Run one collection cycle
///
/// Cycles are serialized: a manual cycle waits for a running scheduler
/// cycle and the other way round.
pub(crate) fn run_cycle(shared: &Shared) -> CycleOutcome {
    let _cycle = shared.cycle.lock().unwrap_or_else(PoisonError::into_inner);

    let (window, tracked) = {
        let state = shared.read();
        (state.config.window(), state.tracked.clone())
    };

    let Some((_, interval_ms)) = window else {
        log::trace!("sensor not configured, skipping collection");
        shared.stats().record_skip();
        return CycleOutcome::Skipped;
    };
    shared.stats().record_cycle();

    let mut merged = 0;
    let mut failed = 0;
    let mut appended = 0;

    for instance in &tracked {
        // The adapter runs outside the guard so readers are never blocked on a probe
        let fetched = fetch(shared, instance);

        let mut state = shared.write();
        if !state.is_tracked(&instance.id) {
            continue;
        }

        match fetched {
            Ok(mut snapshot) => {
                snapshot.name.clone_from(&instance.id);
                match state.store.merge(&snapshot, interval_ms) {
                    Ok(outcome) => {
                        merged += 1;
                        appended += outcome.appended;
                        shared.stats().record_merge(&outcome);
                    }
                    Err(e) => {
                        log::warn!("dropping snapshot for {}: {}", instance.id, e);
                        failed += 1;
                        shared.stats().record_rejected();
                    }
                }
            }
            Err(AdapterError::InstanceGone(_)) => {
                if state.store.remove(&instance.id).is_some() {
                    log::info!("instance {} is gone, dropped its metrics", instance.id);
                }
                failed += 1;
                shared.stats().record_failure();
            }
            Err(e) => {
                log::warn!("no sample for {} this cycle: {}", instance.id, e);
                failed += 1;
                shared.stats().record_failure();
            }
        }
    }

    log::debug!(
        "sensor cycle: {} merged, {} failed, {} values appended",
        merged,
        failed,
        appended
    );
    CycleOutcome::Collected {
        merged,
        failed,
        appended,
    }
}

/// Call the adapter, turning a panic into a failed fetch
fn fetch(
    shared: &Shared,
    instance: &TrackedInstance,
) -> std::result::Result<Resource, AdapterError> {
    let call = AssertUnwindSafe(|| shared.adapter.fetch(&instance.id, &instance.sensor_ids));
    panic::catch_unwind(call).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::error!("collector adapter panicked for {}: {}", instance.id, reason);
        Err(AdapterError::Unavailable(format!("adapter panicked: {}", reason)))
    })
}
