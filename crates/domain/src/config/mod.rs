mod dns;
mod errors;
mod logging;
mod root;
mod server;
mod upstream;

pub use dns::{CacheConfig, DnsConfig};
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
pub use upstream::UpstreamConfig;
