pub mod config;
pub mod dns_protocol;
pub mod dns_query;
pub mod errors;
pub mod record_data;
pub mod record_type;

pub use config::{CacheConfig, CliOverrides, Config, DnsConfig, LoggingConfig, ServerConfig, UpstreamConfig};
pub use dns_protocol::{DnsProtocol, UpstreamAddr};
pub use dns_query::{DnsClass, DnsQuery, DnsRequest};
pub use errors::DnsError;
pub use record_data::{RecordData, SoaData};
pub use record_type::RecordType;
