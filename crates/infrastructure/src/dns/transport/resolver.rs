//! Bootstrap resolution of upstream hostnames (e.g. `tls://dns.quad9.net`)
//! via the system resolver, before our own pipeline is up.

use bastion_dns_domain::DnsError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::lookup_host;

pub async fn resolve_all(
    hostname: &str,
    port: u16,
    timeout: Duration,
) -> Result<Vec<SocketAddr>, DnsError> {
    let target = format!("{}:{}", hostname, port);
    let addrs: Vec<SocketAddr> = tokio::time::timeout(timeout, lookup_host(target))
        .await
        .map_err(|_| DnsError::UpstreamTimeout {
            server: hostname.to_string(),
        })?
        .map_err(|e| DnsError::Io(format!("Failed to resolve '{}': {}", hostname, e)))?
        .collect();

    if addrs.is_empty() {
        return Err(DnsError::Io(format!("'{}' resolved to no addresses", hostname)));
    }
    Ok(addrs)
}
