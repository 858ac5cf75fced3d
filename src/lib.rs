//! # Node Sensor - node-resident telemetry collector
//!
//! Gathers hierarchical resource metrics for the instances running on a
//! node, keeps a bounded rolling history per series, and exposes a
//! thread-safe query, export and live-reconfiguration surface.
//!
//! ## Key Features
//!
//! - **Bounded history**: every dimension is a fixed-capacity ring buffer
//! - **Live reconfiguration**: history size and interval change at runtime
//! - **Single writer**: one scheduler thread per sensor, readers share a guard
//! - **Bounded export**: text rendering into a caller-provided buffer
//!
//! ## Quick Start
//!
//! ```rust
//! use node_sensor::{ExportStatus, FixtureAdapter, Sensor};
//!
//! let sensor = Sensor::new(FixtureAdapter::new());
//! sensor.configure(5, 20_000).unwrap();
//! sensor.track("i-1", vec!["vol-34567".to_string()]).unwrap();
//!
//! // Start the background scheduler (idempotent)
//! sensor.init().unwrap();
//! sensor.init().unwrap();
//!
//! // Or run a cycle on this thread
//! sensor.collect_once();
//!
//! let mut buf = [0u8; 4096];
//! assert!(matches!(sensor.export(&mut buf), ExportStatus::Complete { .. }));
//!
//! sensor.stop();
//! ```
//!
//! ## Modules
//!
//! - [`registry`]: Counter kind codes and names
//! - [`config`]: Live configuration and instance options
//! - [`history`]: Ring buffer of samples
//! - [`store`]: Resource / metric / counter / dimension tree
//! - [`adapter`]: Metric acquisition boundary
//! - [`scheduler`]: Background collection loop
//! - [`export`]: Bounded text export
//! - [`sensor`]: Collector instance
//! - [`stats`]: Collector statistics

// Modules
pub mod adapter;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod registry;
pub mod scheduler;
pub mod sensor;
pub mod stats;
pub mod store;

// Re-exports for convenient access
pub use adapter::{CollectorAdapter, FixtureAdapter};
pub use config::{
    SensorConfig, SensorOptions, MAX_COLLECTION_INTERVAL_MS, MAX_HISTORY_SIZE,
    MIN_COLLECTION_INTERVAL_MS,
};
pub use error::{AdapterError, ConfigError, Result, SensorError};
pub use export::{format, render, BoundedWriter, ExportStatus};
pub use history::{History, Value};
pub use registry::{kind_from_name, name_from_kind, CounterKind, INVALID_KIND_CODE, INVALID_KIND_NAME};
pub use scheduler::CycleOutcome;
pub use sensor::{Sensor, TrackedInstance};
pub use stats::CollectorStats;
pub use store::{Counter, Dimension, MergeOutcome, Metric, MetricStore, Resource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
