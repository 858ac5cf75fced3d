// Node Sensor - Node-resident telemetry collector
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for the sensor
//!
//! [`SensorConfig`] is the live window configuration, changed at runtime
//! through [`crate::Sensor::configure`]. [`SensorOptions`] fixes per-instance
//! behaviour when the sensor is created.

use std::time::Duration;

use crate::error::ConfigError;

/// Largest accepted history size
pub const MAX_HISTORY_SIZE: usize = 32;

/// Smallest accepted collection interval (1 second)
pub const MIN_COLLECTION_INTERVAL_MS: i64 = 1_000;

/// Largest accepted collection interval (1 day)
pub const MAX_COLLECTION_INTERVAL_MS: i64 = 86_400_000;

/// Poll delay used while the sensor is unconfigured
pub const DEFAULT_IDLE_POLL_DELAY: Duration = Duration::from_secs(15);

/// Live schedule and window configuration
///
/// Both fields are `None` until the first successful configure; the
/// scheduler does not collect while either is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorConfig {
    /// Samples retained per dimension
    pub history_size: Option<usize>,
    /// Spacing between collection cycles
    pub collection_interval_ms: Option<i64>,
    /// Wait before the next cycle
    pub poll_delay: Duration,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self::unset(DEFAULT_IDLE_POLL_DELAY)
    }
}

impl SensorConfig {
    /// An unconfigured state polling every `idle_poll_delay`
    pub fn unset(idle_poll_delay: Duration) -> Self {
        Self {
            history_size: None,
            collection_interval_ms: None,
            poll_delay: idle_poll_delay,
        }
    }

    /// Check if both the history size and interval are set
    pub fn is_set(&self) -> bool {
        self.history_size.is_some() && self.collection_interval_ms.is_some()
    }

    /// The history size and interval, when both are set
    pub fn window(&self) -> Option<(usize, i64)> {
        Some((self.history_size?, self.collection_interval_ms?))
    }
}

/// Validate a requested history size and collection interval
///
/// Both bounds are inclusive.
pub fn validate(history_size: i64, collection_interval_ms: i64) -> Result<(usize, i64), ConfigError> {
    let history = usize::try_from(history_size)
        .ok()
        .filter(|h| *h <= MAX_HISTORY_SIZE)
        .ok_or(ConfigError::HistorySizeOutOfRange {
            value: history_size,
            max: MAX_HISTORY_SIZE,
        })?;

    if !(MIN_COLLECTION_INTERVAL_MS..=MAX_COLLECTION_INTERVAL_MS).contains(&collection_interval_ms) {
        return Err(ConfigError::IntervalOutOfRange {
            value: collection_interval_ms,
            min: MIN_COLLECTION_INTERVAL_MS,
            max: MAX_COLLECTION_INTERVAL_MS,
        });
    }

    Ok((history, collection_interval_ms))
}

/// Per-instance sensor options
#[derive(Debug, Clone)]
pub struct SensorOptions {
    /// Poll delay while unconfigured
    pub idle_poll_delay: Duration,

    /// Fixed poll delay overriding the configured collection interval
    pub poll_delay: Option<Duration>,

    /// Maximum number of tracked resources
    pub max_resources: usize,
}

impl Default for SensorOptions {
    fn default() -> Self {
        Self {
            idle_poll_delay: DEFAULT_IDLE_POLL_DELAY,
            poll_delay: None,
            max_resources: crate::store::MAX_RESOURCES,
        }
    }
}

impl SensorOptions {
    /// Options with a fixed poll delay
    pub fn with_poll_delay(poll_delay: Duration) -> Self {
        Self {
            poll_delay: Some(poll_delay),
            idle_poll_delay: poll_delay,
            ..Default::default()
        }
    }

    /// Options with a custom resource limit, capped at [`crate::store::MAX_RESOURCES`]
    pub fn with_max_resources(max_resources: usize) -> Self {
        Self {
            max_resources: max_resources.min(crate::store::MAX_RESOURCES),
            ..Default::default()
        }
    }

    /// Poll delay for the given live configuration
    pub fn poll_delay_for(&self, config: &SensorConfig) -> Duration {
        self.poll_delay.unwrap_or(config.poll_delay)
    }
}
