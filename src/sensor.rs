// Node Sensor - Node-resident telemetry collector
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Collector instance
//!
//! A [`Sensor`] owns its configuration, metric store, tracked instances and
//! scheduler thread. Configuration, store and instance list sit behind one
//! read-write guard: the scheduler and [`Sensor::configure`] take it for
//! writing, exports and queries share it for reading.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::adapter::CollectorAdapter;
use crate::config::{self, SensorConfig, SensorOptions};
use crate::error::{Result, SensorError};
use crate::export::{self, ExportStatus};
use crate::history::Value;
use crate::registry::CounterKind;
use crate::scheduler::{self, CycleOutcome, SchedulerHandle};
use crate::stats::CollectorStats;
use crate::store::{MetricStore, Resource};

/// An instance the scheduler polls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedInstance {
    /// Instance identifier, also the resource name in the store
    pub id: String,
    /// Probe identifiers handed to the adapter
    pub sensor_ids: Vec<String>,
}

/// Guarded sensor state
#[derive(Debug)]
pub(crate) struct State {
    pub(crate) config: SensorConfig,
    pub(crate) store: MetricStore,
    pub(crate) tracked: Vec<TrackedInstance>,
}

impl State {
    pub(crate) fn is_tracked(&self, id: &str) -> bool {
        self.tracked.iter().any(|t| t.id == id)
    }
}

/// State shared with the scheduler thread
pub(crate) struct Shared {
    state: RwLock<State>,
    stats: Mutex<CollectorStats>,
    /// Held for the duration of a collection cycle
    pub(crate) cycle: Mutex<()>,
    pub(crate) adapter: Box<dyn CollectorAdapter>,
    options: SensorOptions,
}

impl Shared {
    // Every critical section leaves State consistent, so a poisoned guard is still usable.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn stats(&self) -> MutexGuard<'_, CollectorStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn poll_delay(&self) -> Duration {
        self.options.poll_delay_for(&self.read().config)
    }
}

/// Node-resident telemetry collector
///
/// ```rust
/// use node_sensor::{CounterKind, FixtureAdapter, Sensor};
///
/// let sensor = Sensor::new(FixtureAdapter::new());
/// sensor.configure(5, 20_000).unwrap();
/// sensor.track("i-1", Vec::new()).unwrap();
///
/// // Hosts may drive cycles themselves instead of calling init()
/// sensor.collect_once();
///
/// let values = sensor
///     .query("i-1", "CPUUtilization", CounterKind::Average, "default")
///     .unwrap();
/// assert_eq!(values.len(), 5);
/// ```
pub struct Sensor {
    shared: Arc<Shared>,
    scheduler: Mutex<Option<SchedulerHandle>>,
}

impl Sensor {
    /// Create a sensor with default options
    pub fn new(adapter: impl CollectorAdapter + 'static) -> Self {
        Self::with_options(adapter, SensorOptions::default())
    }

    /// Create a sensor with custom options
    pub fn with_options(adapter: impl CollectorAdapter + 'static, options: SensorOptions) -> Self {
        let state = State {
            config: SensorConfig::unset(options.idle_poll_delay),
            store: MetricStore::with_max_resources(0, options.max_resources),
            tracked: Vec::new(),
        };

        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(state),
                stats: Mutex::new(CollectorStats::new()),
                cycle: Mutex::new(()),
                adapter: Box::new(adapter),
                options,
            }),
            scheduler: Mutex::new(None),
        }
    }

    fn scheduler(&self) -> MutexGuard<'_, Option<SchedulerHandle>> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the scheduler thread
    ///
    /// Calling it again while the scheduler runs does nothing; a scheduler
    /// thread that has exited is replaced. A spawn failure is fatal: the
    /// sensor cannot collect.
    pub fn init(&self) -> Result<()> {
        let mut scheduler = self.scheduler();
        match scheduler.take() {
            Some(handle) if handle.is_running() => {
                *scheduler = Some(handle);
                return Ok(());
            }
            Some(handle) => {
                log::warn!("sensor scheduler exited, restarting it");
                handle.stop();
            }
            None => {}
        }
        *scheduler = Some(SchedulerHandle::start(Arc::clone(&self.shared))?);
        Ok(())
    }

    /// Stop the scheduler thread and wait for it to exit
    ///
    /// Retained metrics and configuration are kept; [`Sensor::init`]
    /// starts a new scheduler.
    pub fn stop(&self) {
        let handle = self.scheduler().take();
        if let Some(handle) = handle {
            handle.stop();
        }
    }

    /// Check if the scheduler thread is running
    pub fn is_running(&self) -> bool {
        self.scheduler()
            .as_ref()
            .is_some_and(SchedulerHandle::is_running)
    }

    /// Set the history size and collection interval
    ///
    /// Out-of-range values are rejected without touching the current
    /// configuration. Shrinking the history truncates every dimension
    /// immediately.
    pub fn configure(&self, history_size: i64, collection_interval_ms: i64) -> Result<()> {
        let (history_size, interval_ms) = config::validate(history_size, collection_interval_ms)
            .map_err(|e| {
                log::warn!("rejected sensor configuration: {}", e);
                SensorError::from(e)
            })?;

        let mut state = self.shared.write();
        if state.config.history_size != Some(history_size) {
            log::info!("setting sensor history size to {}", history_size);
            state.store.resize(history_size);
        }
        if state.config.collection_interval_ms != Some(interval_ms) {
            log::info!("setting sensor collection interval time to {}", interval_ms);
        }

        state.config = SensorConfig {
            history_size: Some(history_size),
            collection_interval_ms: Some(interval_ms),
            poll_delay: Duration::from_millis(interval_ms.unsigned_abs()),
        };
        Ok(())
    }

    /// Current live configuration
    pub fn config(&self) -> SensorConfig {
        self.shared.read().config
    }

    /// Start polling an instance
    pub fn track(&self, instance_id: impl Into<String>, sensor_ids: Vec<String>) -> Result<()> {
        let id = instance_id.into();
        let mut state = self.shared.write();

        if state.is_tracked(&id) {
            return Err(SensorError::DuplicateResource(id));
        }
        let max = state.store.max_resources();
        if state.tracked.len() >= max {
            return Err(SensorError::CapacityExceeded {
                what: "resources",
                max,
            });
        }

        log::debug!("tracking instance {}", id);
        state.tracked.push(TrackedInstance { id, sensor_ids });
        Ok(())
    }

    /// Stop polling an instance and drop its metrics
    ///
    /// Returns false if the instance was not tracked.
    pub fn untrack(&self, instance_id: &str) -> bool {
        let mut state = self.shared.write();
        let before = state.tracked.len();
        state.tracked.retain(|t| t.id != instance_id);
        state.store.remove(instance_id);
        state.tracked.len() != before
    }

    /// Tracked instances, in the order they were added
    pub fn tracked(&self) -> Vec<TrackedInstance> {
        self.shared.read().tracked.clone()
    }

    /// Run one collection cycle on the calling thread
    pub fn collect_once(&self) -> CycleOutcome {
        scheduler::run_cycle(&self.shared)
    }

    /// Copy of the whole metric tree
    pub fn snapshot(&self) -> Vec<Resource> {
        self.shared.read().store.resources().to_vec()
    }

    /// Copy of one resource subtree
    pub fn resource(&self, name: &str) -> Option<Resource> {
        self.shared.read().store.resource(name).cloned()
    }

    /// Retained samples of one dimension, oldest first
    pub fn query(
        &self,
        resource: &str,
        metric: &str,
        kind: CounterKind,
        dimension: &str,
    ) -> Option<Vec<Value>> {
        self.shared
            .read()
            .store
            .dimension(resource, metric, kind, dimension)
            .map(|d| d.history.to_vec())
    }

    /// Write the metric tree into `buf`, NUL-terminated
    pub fn export(&self, buf: &mut [u8]) -> ExportStatus {
        export::format(buf, self.shared.read().store.resources())
    }

    /// Render the metric tree as text
    pub fn render(&self) -> String {
        export::render(self.shared.read().store.resources())
    }

    /// Copy of the collector statistics
    pub fn stats(&self) -> CollectorStats {
        self.shared.stats().clone()
    }
}

impl Drop for Sensor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.read();
        f.debug_struct("Sensor")
            .field("config", &state.config)
            .field("tracked", &state.tracked.len())
            .field("resources", &state.store.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::FixtureAdapter;
    use crate::config::{MAX_COLLECTION_INTERVAL_MS, MAX_HISTORY_SIZE, MIN_COLLECTION_INTERVAL_MS};
    use crate::error::ConfigError;
    use crate::store::MAX_RESOURCES;

    #[test]
    fn test_configure_bounds() {
        let sensor = Sensor::new(FixtureAdapter::new());
        let max = MAX_HISTORY_SIZE as i64;

        assert!(sensor.configure(0, 20_000).is_ok());
        assert!(sensor.configure(max, 20_000).is_ok());
        assert!(sensor.configure(5, MIN_COLLECTION_INTERVAL_MS).is_ok());
        assert!(sensor.configure(5, MAX_COLLECTION_INTERVAL_MS).is_ok());

        assert!(sensor.configure(-1, 20_000).is_err());
        assert!(sensor.configure(max + 1, 20_000).is_err());
        assert!(sensor.configure(5, MIN_COLLECTION_INTERVAL_MS - 1).is_err());
        assert!(sensor.configure(5, MAX_COLLECTION_INTERVAL_MS + 1).is_err());
    }

    #[test]
    fn test_rejected_configure_keeps_state() {
        let sensor = Sensor::new(FixtureAdapter::new());
        sensor.configure(7, 30_000).unwrap();

        let err = sensor.configure(7, 10).unwrap_err();
        assert!(matches!(
            err,
            SensorError::Config(ConfigError::IntervalOutOfRange { value: 10, .. })
        ));

        let config = sensor.config();
        assert_eq!(config.history_size, Some(7));
        assert_eq!(config.collection_interval_ms, Some(30_000));
        assert_eq!(config.poll_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_unconfigured_cycle_is_skipped() {
        let sensor = Sensor::new(FixtureAdapter::new());
        sensor.track("i-1", Vec::new()).unwrap();

        assert_eq!(sensor.collect_once(), CycleOutcome::Skipped);
        assert!(sensor.snapshot().is_empty());
        assert_eq!(sensor.stats().skipped_cycles, 1);
    }

    #[test]
    fn test_track_duplicate() {
        let sensor = Sensor::new(FixtureAdapter::new());
        sensor.track("i-1", Vec::new()).unwrap();
        assert_eq!(
            sensor.track("i-1", Vec::new()),
            Err(SensorError::DuplicateResource("i-1".to_string()))
        );
    }

    #[test]
    fn test_track_limit() {
        let sensor =
            Sensor::with_options(FixtureAdapter::new(), SensorOptions::with_max_resources(1));
        sensor.track("i-1", Vec::new()).unwrap();
        assert!(matches!(
            sensor.track("i-2", Vec::new()),
            Err(SensorError::CapacityExceeded { max: 1, .. })
        ));
    }

    #[test]
    fn test_track_limit_capped_at_store_maximum() {
        let options = SensorOptions {
            max_resources: MAX_RESOURCES + 100,
            ..Default::default()
        };
        let sensor = Sensor::with_options(FixtureAdapter::new(), options);
        for i in 0..MAX_RESOURCES {
            sensor.track(format!("i-{}", i), Vec::new()).unwrap();
        }
        assert!(matches!(
            sensor.track("i-overflow", Vec::new()),
            Err(SensorError::CapacityExceeded { max: MAX_RESOURCES, .. })
        ));
        assert_eq!(
            SensorOptions::with_max_resources(MAX_RESOURCES * 2).max_resources,
            MAX_RESOURCES
        );
    }

    #[test]
    fn test_init_replaces_exited_scheduler() {
        let sensor = Sensor::new(FixtureAdapter::new());
        *sensor.scheduler() = Some(SchedulerHandle::exited());
        assert!(!sensor.is_running());

        sensor.init().unwrap();
        assert!(sensor.is_running());

        sensor.stop();
        assert!(!sensor.is_running());
    }

    #[test]
    fn test_untrack_drops_metrics() {
        let sensor = Sensor::new(FixtureAdapter::new());
        sensor.configure(5, 20_000).unwrap();
        sensor.track("i-1", Vec::new()).unwrap();
        sensor.collect_once();
        assert!(sensor.resource("i-1").is_some());

        assert!(sensor.untrack("i-1"));
        assert!(!sensor.untrack("i-1"));
        assert!(sensor.resource("i-1").is_none());
        assert!(sensor.tracked().is_empty());
    }

    #[test]
    fn test_fixture_cycle_sequence_numbers() {
        let sensor = Sensor::new(FixtureAdapter::new());
        sensor.configure(10, 20_000).unwrap();
        sensor.track("i-1", Vec::new()).unwrap();

        sensor.collect_once();
        let outcome = sensor.collect_once();
        assert_eq!(
            outcome,
            CycleOutcome::Collected {
                merged: 1,
                failed: 0,
                appended: 0
            }
        );

        let resource = sensor.resource("i-1").unwrap();
        for metric in &resource.metrics {
            assert_eq!(metric.counters[0].sequence_num, 2);
        }
        let stats = sensor.stats();
        assert_eq!(stats.values_appended, 14);
        assert_eq!(stats.values_stale, 14);
    }

    #[test]
    fn test_debug_output() {
        let sensor = Sensor::new(FixtureAdapter::new());
        let debug = format!("{:?}", sensor);
        assert!(debug.contains("Sensor"));
        assert!(debug.contains("tracked: 0"));
    }
}
