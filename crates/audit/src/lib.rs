//! Usage/audit events: model, sinks, and the fire-and-forget emitter.

pub mod emitter;
pub mod event;
pub mod memory;
pub mod sink;
pub mod tenant;

pub use emitter::{AuditEmitter, EmitterConfig};
pub use event::AuditEvent;
pub use memory::InMemoryAuditSink;
pub use sink::{AuditSink, AuditSinkError, TracingAuditSink};
pub use tenant::TenantScoped;
