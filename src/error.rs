// Node Sensor - Node-resident telemetry collector
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the sensor
//!
//! Lookup misses in the type registry and export truncation are not errors:
//! they are reported through sentinels and [`crate::ExportStatus`].

use thiserror::Error;

/// Result type alias for sensor operations
pub type Result<T> = std::result::Result<T, SensorError>;

/// Main error type for sensor operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    /// The scheduler thread could not be created. The process should not proceed.
    #[error("Failed to spawn sensor scheduler: {0}")]
    SchedulerSpawn(String),

    /// Rejected configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Collector adapter failure
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// A structural maximum of the store would be exceeded
    #[error("Too many {what}: maximum is {max}")]
    CapacityExceeded { what: &'static str, max: usize },

    /// A resource, metric or dimension name is too long
    #[error("Name too long: '{name}' exceeds {max} bytes")]
    NameTooLong { name: String, max: usize },

    /// The instance is already tracked
    #[error("Resource already tracked: {0}")]
    DuplicateResource(String),

    /// A snapshot repeats a metric, counter kind or dimension
    #[error("Duplicate {what} in snapshot: {name}")]
    DuplicateEntry { what: &'static str, name: String },
}

/// Errors raised by [`crate::Sensor::configure`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// History size outside `[0, max]`
    #[error("History size {value} out of range [0, {max}]")]
    HistorySizeOutOfRange { value: i64, max: usize },

    /// Collection interval outside `[min, max]`
    #[error("Collection interval {value}ms out of range [{min}, {max}]")]
    IntervalOutOfRange { value: i64, min: i64, max: i64 },
}

/// Errors returned by a [`crate::CollectorAdapter`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    /// The instance no longer exists on this node
    #[error("Instance no longer exists: {0}")]
    InstanceGone(String),

    /// Metrics could not be acquired this time
    #[error("Metrics unavailable: {0}")]
    Unavailable(String),
}
