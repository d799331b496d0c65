pub mod redis_streams;

pub use redis_streams::RedisStreamsAuditSink;
