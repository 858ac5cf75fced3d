// Node Sensor - Node-resident telemetry collector
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Collector adapter boundary
//!
//! The scheduler obtains fresh samples through a [`CollectorAdapter`].
//! Platform probes live outside this crate; [`FixtureAdapter`] is the test
//! double used by the reference build.

use crate::error::AdapterError;
use crate::history::Value;
use crate::registry::CounterKind;
use crate::store::{Counter, Dimension, Metric, Resource};

/// Produces a metric snapshot for one instance
///
/// Calls are made from the scheduler thread without a timeout, so an
/// implementation that blocks stalls every later cycle.
pub trait CollectorAdapter: Send + Sync {
    /// Fetch current values for `instance_id`
    ///
    /// Returning [`AdapterError::InstanceGone`] makes the sensor drop the
    /// retained subtree for that instance.
    fn fetch(&self, instance_id: &str, sensor_ids: &[String]) -> Result<Resource, AdapterError>;
}

impl<F> CollectorAdapter for F
where
    F: Fn(&str, &[String]) -> Result<Resource, AdapterError> + Send + Sync,
{
    fn fetch(&self, instance_id: &str, sensor_ids: &[String]) -> Result<Resource, AdapterError> {
        self(instance_id, sensor_ids)
    }
}

/// First timestamp of the fixture series
const FIXTURE_START_MS: i64 = 1_344_056_910_424;

/// Spacing of the fixture series
const FIXTURE_INTERVAL_MS: i64 = 20_000;

/// Adapter returning a fixed two-metric example for any instance
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureAdapter;

impl FixtureAdapter {
    /// Create a fixture adapter
    pub fn new() -> Self {
        Self
    }

    fn series(samples: &[Option<f64>]) -> Vec<Value> {
        samples
            .iter()
            .enumerate()
            .map(|(i, sample)| {
                let ts = FIXTURE_START_MS + i as i64 * FIXTURE_INTERVAL_MS;
                match sample {
                    Some(v) => Value::new(ts, *v),
                    None => Value::unavailable(ts),
                }
            })
            .collect()
    }
}

impl CollectorAdapter for FixtureAdapter {
    fn fetch(&self, instance_id: &str, _sensor_ids: &[String]) -> Result<Resource, AdapterError> {
        let cpu = Metric::new("CPUUtilization").with_counter(
            Counter::new(CounterKind::Average, FIXTURE_INTERVAL_MS).with_dimension(
                Dimension::with_values(
                    "default",
                    Self::series(&[Some(33.3), Some(34.7), Some(31.1), None, Some(39.9)]),
                ),
            ),
        );

        let disk = Metric::new("DiskReadOps").with_counter(
            Counter::new(CounterKind::Summation, FIXTURE_INTERVAL_MS)
                .with_dimension(Dimension::with_values(
                    "root",
                    Self::series(&[Some(0.0), Some(111.0), Some(2_222_222.0)]),
                ))
                .with_dimension(Dimension::with_values(
                    "ephemeral0",
                    Self::series(&[Some(0.0), Some(0.0), Some(3_333_333.0)]),
                ))
                .with_dimension(Dimension::with_values(
                    "vol-34567",
                    Self::series(&[Some(0.0), Some(44_444.0), Some(55_555_555.0)]),
                )),
        );

        Ok(Resource::new(instance_id, "instance")
            .with_metric(cpu)
            .with_metric(disk))
    }
}
