use super::dns::DnsConfig;
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::server::ServerConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub dns: DnsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind_address: Option<String>,
    pub dns_port: Option<u16>,
    pub udp_workers: Option<usize>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: Option<&str>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: p.to_string(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Config::default(),
        };
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(port) = overrides.dns_port {
            self.server.dns_port = port;
        }
        if let Some(workers) = overrides.udp_workers {
            self.server.udp_workers = workers;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dns.upstream.servers.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one upstream server is required".into(),
            ));
        }
        if self.dns.upstream.attempt_budget == 0 {
            return Err(ConfigError::Invalid("attempt_budget must be >= 1".into()));
        }
        let cache = &self.dns.cache;
        if cache.max_entries == 0 {
            return Err(ConfigError::Invalid("cache.max_entries must be >= 1".into()));
        }
        if !cache.shard_amount.is_power_of_two() {
            return Err(ConfigError::Invalid(
                "cache.shard_amount must be a power of two".into(),
            ));
        }
        if cache.min_ttl > cache.max_ttl {
            return Err(ConfigError::Invalid(
                "cache.min_ttl must not exceed cache.max_ttl".into(),
            ));
        }
        if !(0.0..=1.0).contains(&cache.refresh_fraction) {
            return Err(ConfigError::Invalid(
                "cache.refresh_fraction must be within [0.0, 1.0]".into(),
            ));
        }
        if cache.window_buckets == 0 || cache.bucket_width_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.window_buckets and cache.bucket_width_secs must be >= 1".into(),
            ));
        }
        if !(0.0..1.0).contains(&cache.bloom_fp_rate) || cache.bloom_fp_rate == 0.0 {
            return Err(ConfigError::Invalid(
                "cache.bloom_fp_rate must be within (0.0, 1.0)".into(),
            ));
        }
        Ok(())
    }
}
