//! Durable persistence of telemetry samples.
//!
//! One append-only `metrics` table in PostgreSQL. Every execution
//! context (monitor loop, query handler) owns its own connection for its
//! lifetime; connections are never shared across concurrent callers, so
//! no in-process locking is needed.

pub mod error;
pub mod postgres;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use postgres::MetricsStore;
pub use schema::{MetricRecord, MetricSample};
