use super::query::query_server;
use super::server::UpstreamServer;
use crate::dns::forwarding::{MessageBuilder, UpstreamAnswer};
use crate::dns::transport::resolver;
use bastion_dns_domain::{DnsError, DnsProtocol, RecordType, UpstreamConfig};
use smallvec::SmallVec;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_ADDRS_PER_HOSTNAME: usize = 4;
const BOOTSTRAP_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// The set of configured upstream endpoints plus the failover policy.
///
/// `resolve` picks servers weighted by inverse recent latency among those
/// not sitting in a cool-down, spends up to the configured attempt budget
/// across distinct servers, and fails with `UpstreamExhausted` once the
/// budget is gone.
pub struct UpstreamPool {
    servers: Vec<Arc<UpstreamServer>>,
    attempt_timeout: Duration,
    attempt_budget: usize,
    cooldown_base_ms: u64,
    cooldown_max_ms: u64,
}

impl UpstreamPool {
    pub fn new(
        servers: Vec<UpstreamServer>,
        attempt_timeout: Duration,
        attempt_budget: usize,
        cooldown_base_ms: u64,
        cooldown_max_ms: u64,
    ) -> Self {
        Self {
            servers: servers.into_iter().map(Arc::new).collect(),
            attempt_timeout,
            attempt_budget: attempt_budget.max(1),
            cooldown_base_ms,
            cooldown_max_ms,
        }
    }

    pub async fn from_config(config: &UpstreamConfig) -> Result<Self, DnsError> {
        if config.servers.is_empty() {
            return Err(DnsError::Config(
                "at least one upstream server must be configured".into(),
            ));
        }

        let mut protocols = Vec::with_capacity(config.servers.len());
        for raw in &config.servers {
            let protocol = DnsProtocol::from_str(raw)
                .map_err(|e| DnsError::Config(format!("invalid upstream '{}': {}", raw, e)))?;
            protocols.push(protocol);
        }

        let expanded = expand_hostnames(protocols).await;
        let servers: Vec<UpstreamServer> = expanded.into_iter().map(UpstreamServer::new).collect();

        info!(servers = servers.len(), "Upstream pool ready");

        Ok(Self::new(
            servers,
            Duration::from_millis(config.attempt_timeout_ms),
            config.attempt_budget,
            config.cooldown_base_ms,
            config.cooldown_max_ms,
        ))
    }

    pub fn servers(&self) -> &[Arc<UpstreamServer>] {
        &self.servers
    }

    pub async fn resolve(
        &self,
        domain: &str,
        record_type: &RecordType,
        dnssec_ok: bool,
    ) -> Result<(UpstreamAnswer, Arc<str>), DnsError> {
        let query_bytes = MessageBuilder::build_query(domain, record_type, dnssec_ok)?;

        let mut tried: SmallVec<[usize; 8]> = SmallVec::new();
        let mut last_error = DnsError::UpstreamExhausted;

        for attempt in 0..self.attempt_budget {
            let Some(index) = self.pick_server(&tried) else {
                break;
            };
            tried.push(index);
            let server = &self.servers[index];

            debug!(
                server = %server.display,
                attempt,
                domain = %domain,
                "Dispatching upstream attempt"
            );

            match query_server(server, &query_bytes, self.attempt_timeout).await {
                Ok(reply) if reply.answer.is_server_error() => {
                    warn!(server = %server.display, "Upstream answered with a server failure");
                    server.record_failure(self.cooldown_base_ms, self.cooldown_max_ms);
                    last_error = DnsError::UpstreamTransport {
                        server: server.display.to_string(),
                        detail: "server failure rcode".into(),
                    };
                }
                Ok(reply) => {
                    server.record_success(reply.latency_us);
                    return Ok((reply.answer, Arc::clone(&server.display)));
                }
                Err(e) => {
                    warn!(server = %server.display, error = %e, "Upstream attempt failed");
                    server.record_failure(self.cooldown_base_ms, self.cooldown_max_ms);
                    last_error = e;
                }
            }
        }

        debug!(domain = %domain, error = %last_error, "Upstream attempts exhausted");
        Err(DnsError::UpstreamExhausted)
    }

    /// Weighted pick among available servers not yet tried this resolution;
    /// when every candidate is cooling down, falls back to the least-bad
    /// untried one rather than giving up without a network attempt.
    fn pick_server(&self, tried: &[usize]) -> Option<usize> {
        let untried: SmallVec<[usize; 8]> = (0..self.servers.len())
            .filter(|i| !tried.contains(i))
            .collect();
        if untried.is_empty() {
            return None;
        }

        let available: SmallVec<[usize; 8]> = untried
            .iter()
            .copied()
            .filter(|&i| self.servers[i].is_available())
            .collect();

        let candidates = if available.is_empty() {
            &untried
        } else {
            &available
        };

        let total_weight: f64 = candidates
            .iter()
            .map(|&i| self.servers[i].selection_weight())
            .sum();
        if total_weight <= 0.0 {
            return candidates.first().copied();
        }

        let mut roll = fastrand::f64() * total_weight;
        for &i in candidates.iter() {
            roll -= self.servers[i].selection_weight();
            if roll <= 0.0 {
                return Some(i);
            }
        }
        candidates.last().copied()
    }
}

/// Expands `tls://dns.example:853`-style endpoints into one entry per
/// resolved address, capped per family. Unresolvable hostnames are kept
/// unresolved and fail per-attempt instead of failing startup.
async fn expand_hostnames(protocols: Vec<DnsProtocol>) -> Vec<DnsProtocol> {
    let mut expanded = Vec::with_capacity(protocols.len());

    for protocol in protocols {
        if !protocol.needs_resolution() {
            expanded.push(protocol);
            continue;
        }

        let Some((hostname, port)) = (match &protocol {
            DnsProtocol::Udp { addr } | DnsProtocol::Tcp { addr } | DnsProtocol::Tls { addr, .. } => {
                addr.unresolved_parts().map(|(h, p)| (h.to_string(), p))
            }
            DnsProtocol::Https { .. } => None,
        }) else {
            expanded.push(protocol);
            continue;
        };

        match resolver::resolve_all(&hostname, port, BOOTSTRAP_RESOLVE_TIMEOUT).await {
            Ok(addrs) => {
                let mut v4 = 0usize;
                let mut v6 = 0usize;
                for addr in addrs {
                    let keep = if addr.is_ipv4() {
                        v4 += 1;
                        v4 <= MAX_ADDRS_PER_HOSTNAME
                    } else {
                        v6 += 1;
                        v6 <= MAX_ADDRS_PER_HOSTNAME
                    };
                    if keep {
                        info!(hostname = %hostname, addr = %addr, "Upstream hostname resolved");
                        expanded.push(protocol.with_resolved_addr(addr));
                    }
                }
            }
            Err(e) => {
                warn!(
                    hostname = %hostname,
                    error = %e,
                    "Failed to resolve upstream hostname, keeping unresolved"
                );
                expanded.push(protocol);
            }
        }
    }

    expanded
}
