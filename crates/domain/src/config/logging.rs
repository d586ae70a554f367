use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// tracing env-filter directive, e.g. "info" or "bastion_dns=debug".
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_with_target")]
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            with_target: default_with_target(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_with_target() -> bool {
    false
}
