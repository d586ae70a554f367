pub mod cache;
pub mod events;
pub mod forwarding;
pub mod maintenance;
pub mod resolver;
pub mod server;
pub mod transport;
pub mod upstream;
pub mod wire;

pub use cache::{CacheMetrics, CacheTier, CachedData, CachedRecord, DnsCache, DnsCacheConfig, NegativeKind};
pub use events::{QueryEventEmitter, spawn_event_drain};
pub use maintenance::CacheMaintenance;
pub use resolver::{CachedResolver, CoreResolver, ResolverBuilder};
pub use server::DnsServer;
pub use upstream::UpstreamPool;
