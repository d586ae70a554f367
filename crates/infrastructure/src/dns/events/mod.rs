pub mod emitter;
pub mod log_sink;

pub use emitter::{spawn_event_drain, QueryEventEmitter};
pub use log_sink::LoggingEventSink;
