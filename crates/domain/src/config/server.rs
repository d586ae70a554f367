use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_dns_port")]
    pub dns_port: u16,

    /// Number of UDP ingress workers, each on its own SO_REUSEPORT socket.
    /// 0 means one per available core.
    #[serde(default)]
    pub udp_workers: usize,

    #[serde(default = "default_tcp_idle_timeout")]
    pub tcp_idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            dns_port: default_dns_port(),
            udp_workers: 0,
            tcp_idle_timeout_secs: default_tcp_idle_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn effective_udp_workers(&self) -> usize {
        if self.udp_workers > 0 {
            return self.udp_workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2)
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_dns_port() -> u16 {
    53
}

fn default_tcp_idle_timeout() -> u64 {
    10
}
