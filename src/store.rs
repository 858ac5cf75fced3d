// Node Sensor - Node-resident telemetry collector
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Hierarchical metric store
//!
//! Resource → Metric → Counter → Dimension → [`History`]. Insertion order is
//! preserved at every level, entries are created on first sighting and
//! updated in place afterwards. The same types describe an adapter snapshot,
//! which [`MetricStore::merge`] folds into the retained tree.

use crate::error::{Result, SensorError};
use crate::history::{History, Value};
use crate::registry::CounterKind;

/// Maximum number of resources a store tracks
pub const MAX_RESOURCES: usize = 2048;

/// Maximum number of metrics per resource
pub const MAX_METRICS: usize = 12;

/// Maximum number of counters per metric (one per kind)
pub const MAX_COUNTERS: usize = CounterKind::ALL.len();

/// Maximum number of dimensions per counter
pub const MAX_DIMENSIONS: usize = 32;

/// Maximum length of any name, in bytes
pub const MAX_NAME_LEN: usize = 64;

/// A named sub-series of a counter
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: String,
    pub history: History,
}

impl Dimension {
    /// Create an empty dimension retaining up to `capacity` samples
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            history: History::new(capacity),
        }
    }

    /// Create a dimension holding exactly `values`
    pub fn with_values(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            history: History::from_values(values),
        }
    }
}

/// One measured series of a metric
#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    pub kind: CounterKind,
    pub collection_interval_ms: i64,
    /// Incremented once per collection cycle touching this counter
    pub sequence_num: u64,
    pub dimensions: Vec<Dimension>,
}

impl Counter {
    /// Create a counter with no dimensions
    pub fn new(kind: CounterKind, collection_interval_ms: i64) -> Self {
        Self {
            kind,
            collection_interval_ms,
            sequence_num: 0,
            dimensions: Vec::new(),
        }
    }

    /// Add a dimension (builder style)
    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Find a dimension by name
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }
}

/// A named measurable aspect of a resource
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub counters: Vec<Counter>,
}

impl Metric {
    /// Create a metric with no counters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            counters: Vec::new(),
        }
    }

    /// Add a counter (builder style)
    pub fn with_counter(mut self, counter: Counter) -> Self {
        self.counters.push(counter);
        self
    }

    /// Find a counter by kind
    pub fn counter(&self, kind: CounterKind) -> Option<&Counter> {
        self.counters.iter().find(|c| c.kind == kind)
    }
}

/// A monitored entity with named metrics
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    pub resource_type: String,
    pub metrics: Vec<Metric>,
}

impl Resource {
    /// Create a resource with no metrics
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            metrics: Vec::new(),
        }
    }

    /// Add a metric (builder style)
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Find a metric by name
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Check names and structural limits
    pub fn validate(&self) -> Result<()> {
        check_name(&self.name)?;
        check_name(&self.resource_type)?;
        check_count("metrics", self.metrics.len(), MAX_METRICS)?;
        for (i, metric) in self.metrics.iter().enumerate() {
            check_name(&metric.name)?;
            check_unique("metric", &self.metrics[..i], |m| m.name == metric.name, &metric.name)?;
            check_count("counters", metric.counters.len(), MAX_COUNTERS)?;
            for (j, counter) in metric.counters.iter().enumerate() {
                check_unique(
                    "counter",
                    &metric.counters[..j],
                    |c| c.kind == counter.kind,
                    counter.kind.name(),
                )?;
                check_count("dimensions", counter.dimensions.len(), MAX_DIMENSIONS)?;
                for (k, dimension) in counter.dimensions.iter().enumerate() {
                    check_name(&dimension.name)?;
                    check_unique(
                        "dimension",
                        &counter.dimensions[..k],
                        |d| d.name == dimension.name,
                        &dimension.name,
                    )?;
                }
            }
        }
        Ok(())
    }
}

// Each merged counter must advance its sequence number once per snapshot
fn check_unique<T>(
    what: &'static str,
    earlier: &[T],
    same: impl Fn(&T) -> bool,
    name: &str,
) -> Result<()> {
    if earlier.iter().any(same) {
        return Err(SensorError::DuplicateEntry {
            what,
            name: name.to_string(),
        });
    }
    Ok(())
}

fn check_name(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(SensorError::NameTooLong {
            name: name.to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

fn check_count(what: &'static str, count: usize, max: usize) -> Result<()> {
    if count > max {
        return Err(SensorError::CapacityExceeded { what, max });
    }
    Ok(())
}

/// What a merge changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Samples appended to dimension histories
    pub appended: usize,
    /// Samples ignored because they were not newer than the retained ones
    pub stale: usize,
    /// Counters whose sequence number advanced
    pub counters: usize,
}

/// Retained metric tree for every tracked resource
#[derive(Debug, Clone)]
pub struct MetricStore {
    resources: Vec<Resource>,
    history_size: usize,
    max_resources: usize,
}

impl MetricStore {
    /// Create an empty store whose dimensions retain `history_size` samples
    pub fn new(history_size: usize) -> Self {
        Self::with_max_resources(history_size, MAX_RESOURCES)
    }

    /// Create an empty store with a custom resource limit
    pub fn with_max_resources(history_size: usize, max_resources: usize) -> Self {
        Self {
            resources: Vec::new(),
            history_size,
            max_resources: max_resources.min(MAX_RESOURCES),
        }
    }

    /// Maximum number of resources the store accepts
    pub fn max_resources(&self) -> usize {
        self.max_resources
    }

    /// Current per-dimension capacity
    pub fn history_size(&self) -> usize {
        self.history_size
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if the store holds no resources
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// All resources, in first-seen order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Find a resource by name
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Find a dimension by its full path
    pub fn dimension(
        &self,
        resource: &str,
        metric: &str,
        kind: CounterKind,
        dimension: &str,
    ) -> Option<&Dimension> {
        self.resource(resource)?
            .metric(metric)?
            .counter(kind)?
            .dimension(dimension)
    }

    /// Fold an adapter snapshot into the store
    ///
    /// Every counter present in the snapshot advances its sequence number by
    /// one. Samples newer than a dimension's newest retained sample are
    /// appended; the rest are counted as stale. Limits are checked before
    /// anything is modified, so a rejected snapshot leaves the store intact.
    pub fn merge(&mut self, snapshot: &Resource, collection_interval_ms: i64) -> Result<MergeOutcome> {
        snapshot.validate()?;
        let index = match self.resources.iter().position(|r| r.name == snapshot.name) {
            Some(index) => {
                self.check_growth(&self.resources[index], snapshot)?;
                index
            }
            None => {
                if self.resources.len() >= self.max_resources {
                    return Err(SensorError::CapacityExceeded {
                        what: "resources",
                        max: self.max_resources,
                    });
                }
                self.resources
                    .push(Resource::new(snapshot.name.clone(), snapshot.resource_type.clone()));
                self.resources.len() - 1
            }
        };

        let history_size = self.history_size;
        let resource = &mut self.resources[index];
        resource.resource_type.clone_from(&snapshot.resource_type);

        let mut outcome = MergeOutcome::default();
        for incoming_metric in &snapshot.metrics {
            let metric = find_or_insert(
                &mut resource.metrics,
                |m| m.name == incoming_metric.name,
                || Metric::new(incoming_metric.name.clone()),
            );

            for incoming_counter in &incoming_metric.counters {
                let counter = find_or_insert(
                    &mut metric.counters,
                    |c| c.kind == incoming_counter.kind,
                    || Counter::new(incoming_counter.kind, collection_interval_ms),
                );
                counter.collection_interval_ms = collection_interval_ms;
                counter.sequence_num += 1;
                outcome.counters += 1;

                for incoming_dimension in &incoming_counter.dimensions {
                    let dimension = find_or_insert(
                        &mut counter.dimensions,
                        |d| d.name == incoming_dimension.name,
                        || Dimension::new(incoming_dimension.name.clone(), history_size),
                    );

                    for value in incoming_dimension.history.iter() {
                        let newer = dimension
                            .history
                            .latest()
                            .map_or(true, |newest| value.timestamp_ms > newest.timestamp_ms);
                        if newer && dimension.history.push(*value) {
                            outcome.appended += 1;
                        } else {
                            outcome.stale += 1;
                        }
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// Reject a snapshot that would push an existing resource past a limit
    fn check_growth(&self, existing: &Resource, snapshot: &Resource) -> Result<()> {
        let new_metrics = snapshot
            .metrics
            .iter()
            .filter(|m| existing.metric(&m.name).is_none())
            .count();
        check_count("metrics", existing.metrics.len() + new_metrics, MAX_METRICS)?;

        for incoming in &snapshot.metrics {
            let Some(metric) = existing.metric(&incoming.name) else {
                continue;
            };
            for incoming_counter in &incoming.counters {
                let Some(counter) = metric.counter(incoming_counter.kind) else {
                    continue;
                };
                let new_dimensions = incoming_counter
                    .dimensions
                    .iter()
                    .filter(|d| counter.dimension(&d.name).is_none())
                    .count();
                check_count(
                    "dimensions",
                    counter.dimensions.len() + new_dimensions,
                    MAX_DIMENSIONS,
                )?;
            }
        }
        Ok(())
    }

    /// Drop a resource subtree. Returns the removed resource.
    pub fn remove(&mut self, name: &str) -> Option<Resource> {
        let index = self.resources.iter().position(|r| r.name == name)?;
        Some(self.resources.remove(index))
    }

    /// Change the capacity of every dimension
    ///
    /// Shrinking keeps the newest samples of each dimension; growing only
    /// affects future appends.
    pub fn resize(&mut self, history_size: usize) {
        self.history_size = history_size;
        for dimension in self.dimensions_mut() {
            dimension.history.resize(history_size);
        }
    }

    /// Drop every resource
    pub fn clear(&mut self) {
        self.resources.clear();
    }

    fn dimensions_mut(&mut self) -> impl Iterator<Item = &mut Dimension> {
        self.resources
            .iter_mut()
            .flat_map(|r| r.metrics.iter_mut())
            .flat_map(|m| m.counters.iter_mut())
            .flat_map(|c| c.dimensions.iter_mut())
    }
}

fn find_or_insert<T>(
    items: &mut Vec<T>,
    matches: impl Fn(&T) -> bool,
    create: impl FnOnce() -> T,
) -> &mut T {
    let index = match items.iter().position(matches) {
        Some(index) => index,
        None => {
            items.push(create());
            items.len() - 1
        }
    };
    &mut items[index]
}
