mod block_filter;
mod client_policy;
mod dns_resolver;
mod query_sink;

pub use block_filter::{BlockFilter, NoopBlockFilter};
pub use client_policy::{ClientPolicyResolver, DefaultPolicyResolver, PolicyGroup};
pub use dns_resolver::{DnsResolver, Resolution, ResolutionSource};
pub use query_sink::{NullQueryEventSink, QueryEvent, QueryEventSink, QueryOutcome};
