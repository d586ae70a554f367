use serde::{Deserialize, Serialize};

/// Upstream pool settings. Endpoints accept `udp://`, `tcp://`, `tls://`
/// and `https://` forms; a bare `ip[:port]` means plain UDP.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,

    /// Per-attempt timeout, milliseconds.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    /// Total attempts across servers before resolution fails.
    #[serde(default = "default_attempt_budget")]
    pub attempt_budget: usize,

    /// First cool-down applied to a failing server; doubles per consecutive
    /// failure up to `cooldown_max_ms`.
    #[serde(default = "default_cooldown_base_ms")]
    pub cooldown_base_ms: u64,

    #[serde(default = "default_cooldown_max_ms")]
    pub cooldown_max_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            attempt_budget: default_attempt_budget(),
            cooldown_base_ms: default_cooldown_base_ms(),
            cooldown_max_ms: default_cooldown_max_ms(),
        }
    }
}

fn default_servers() -> Vec<String> {
    vec!["9.9.9.9:53".to_string(), "1.1.1.1:53".to_string()]
}

fn default_attempt_timeout_ms() -> u64 {
    2000
}

fn default_attempt_budget() -> usize {
    3
}

fn default_cooldown_base_ms() -> u64 {
    500
}

fn default_cooldown_max_ms() -> u64 {
    30_000
}
