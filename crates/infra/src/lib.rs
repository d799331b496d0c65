//! Infrastructure layer: tenant-partitioned storage and outbound audit transports.

pub mod store;

/// Audit sinks backed by external transports.
#[cfg(feature = "redis")]
pub mod audit_sink;
