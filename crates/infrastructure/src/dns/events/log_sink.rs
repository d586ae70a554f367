use bastion_dns_application::ports::{QueryEvent, QueryEventSink};
use tracing::info;

/// Default event consumer: one structured log line per answered query.
/// Stands where an analytics pipeline would plug in.
pub struct LoggingEventSink;

impl QueryEventSink for LoggingEventSink {
    fn deliver(&self, event: QueryEvent) {
        info!(
            target: "bastion_dns::query",
            domain = %event.domain,
            record_type = %event.record_type,
            outcome = event.outcome.as_str(),
            tier = event.hit_tier.unwrap_or("-"),
            upstream = event.upstream_server.as_deref().unwrap_or("-"),
            latency_us = event.latency_us,
            blocked = event.blocked,
            "query"
        );
    }
}
