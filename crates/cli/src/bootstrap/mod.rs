use bastion_dns_domain::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber from config. `RUST_LOG` wins
/// over the configured level when set.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .init();
}
