use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

/// An upstream endpoint address that may still need hostname resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpstreamAddr {
    Resolved(SocketAddr),
    Unresolved { hostname: Arc<str>, port: u16 },
}

impl UpstreamAddr {
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match self {
            UpstreamAddr::Resolved(addr) => Some(*addr),
            UpstreamAddr::Unresolved { .. } => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, UpstreamAddr::Unresolved { .. })
    }

    pub fn unresolved_parts(&self) -> Option<(&str, u16)> {
        match self {
            UpstreamAddr::Unresolved { hostname, port } => Some((hostname, *port)),
            UpstreamAddr::Resolved(_) => None,
        }
    }
}

impl fmt::Display for UpstreamAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamAddr::Resolved(addr) => write!(f, "{}", addr),
            UpstreamAddr::Unresolved { hostname, port } => write!(f, "{}:{}", hostname, port),
        }
    }
}

/// Closed set of upstream transports: plain UDP/TCP, DNS-over-TLS (RFC 7858)
/// and DNS-over-HTTPS (RFC 8484).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DnsProtocol {
    Udp { addr: UpstreamAddr },
    Tcp { addr: UpstreamAddr },
    Tls { addr: UpstreamAddr, hostname: Arc<str> },
    Https { url: Arc<str>, hostname: Arc<str> },
}

impl DnsProtocol {
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match self {
            DnsProtocol::Udp { addr }
            | DnsProtocol::Tcp { addr }
            | DnsProtocol::Tls { addr, .. } => addr.socket_addr(),
            DnsProtocol::Https { .. } => None,
        }
    }

    pub fn protocol_name(&self) -> &'static str {
        match self {
            DnsProtocol::Udp { .. } => "UDP",
            DnsProtocol::Tcp { .. } => "TCP",
            DnsProtocol::Tls { .. } => "TLS",
            DnsProtocol::Https { .. } => "HTTPS",
        }
    }

    pub fn needs_resolution(&self) -> bool {
        match self {
            DnsProtocol::Udp { addr }
            | DnsProtocol::Tcp { addr }
            | DnsProtocol::Tls { addr, .. } => addr.is_unresolved(),
            DnsProtocol::Https { .. } => false,
        }
    }

    pub fn with_resolved_addr(&self, resolved: SocketAddr) -> Self {
        match self {
            DnsProtocol::Udp { .. } => DnsProtocol::Udp {
                addr: UpstreamAddr::Resolved(resolved),
            },
            DnsProtocol::Tcp { .. } => DnsProtocol::Tcp {
                addr: UpstreamAddr::Resolved(resolved),
            },
            DnsProtocol::Tls { hostname, .. } => DnsProtocol::Tls {
                addr: UpstreamAddr::Resolved(resolved),
                hostname: hostname.clone(),
            },
            DnsProtocol::Https { .. } => self.clone(),
        }
    }
}

impl fmt::Display for DnsProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsProtocol::Udp { addr } => write!(f, "udp://{}", addr),
            DnsProtocol::Tcp { addr } => write!(f, "tcp://{}", addr),
            DnsProtocol::Tls { addr, .. } => write!(f, "tls://{}", addr),
            DnsProtocol::Https { url, .. } => write!(f, "{}", url),
        }
    }
}

fn parse_host_port(s: &str) -> Option<(&str, u16)> {
    if s.starts_with('[') {
        let end = s.find(']')?;
        let host = &s[1..end];
        let port = s[end + 1..].strip_prefix(':')?.parse::<u16>().ok()?;
        Some((host, port))
    } else {
        let (host, port_str) = s.rsplit_once(':')?;
        let port = port_str.parse::<u16>().ok()?;
        Some((host, port))
    }
}

fn parse_upstream_addr(addr_str: &str, default_port: u16) -> Result<UpstreamAddr, String> {
    if let Ok(addr) = addr_str.parse::<SocketAddr>() {
        return Ok(UpstreamAddr::Resolved(addr));
    }
    if let Ok(ip) = addr_str.parse::<std::net::IpAddr>() {
        return Ok(UpstreamAddr::Resolved(SocketAddr::new(ip, default_port)));
    }
    if let Some((host, port)) = parse_host_port(addr_str) {
        return Ok(UpstreamAddr::Unresolved {
            hostname: host.into(),
            port,
        });
    }
    if !addr_str.is_empty() && !addr_str.contains(':') {
        return Ok(UpstreamAddr::Unresolved {
            hostname: addr_str.into(),
            port: default_port,
        });
    }
    Err(format!("Invalid address '{}'", addr_str))
}

impl FromStr for DnsProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("udp://") {
            let addr = parse_upstream_addr(rest, 53)?;
            return Ok(DnsProtocol::Udp { addr });
        }
        if let Some(rest) = s.strip_prefix("tcp://") {
            let addr = parse_upstream_addr(rest, 53)?;
            return Ok(DnsProtocol::Tcp { addr });
        }
        if let Some(rest) = s.strip_prefix("tls://") {
            let addr = parse_upstream_addr(rest, 853)?;
            let hostname: Arc<str> = match &addr {
                UpstreamAddr::Unresolved { hostname, .. } => hostname.clone(),
                UpstreamAddr::Resolved(sock) => sock.ip().to_string().into(),
            };
            return Ok(DnsProtocol::Tls { addr, hostname });
        }
        if s.starts_with("https://") {
            let hostname: Arc<str> = s
                .strip_prefix("https://")
                .and_then(|rest| rest.split('/').next())
                .filter(|h| !h.is_empty())
                .ok_or_else(|| format!("Invalid HTTPS URL: {}", s))?
                .into();
            return Ok(DnsProtocol::Https {
                url: s.into(),
                hostname,
            });
        }
        // Bare "ip" or "ip:port" defaults to plain UDP.
        let addr = parse_upstream_addr(s, 53)?;
        Ok(DnsProtocol::Udp { addr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_ip_as_udp() {
        let p: DnsProtocol = "9.9.9.9".parse().unwrap();
        assert_eq!(p.protocol_name(), "UDP");
        assert_eq!(p.socket_addr().unwrap().port(), 53);
    }

    #[test]
    fn parses_tls_with_hostname() {
        let p: DnsProtocol = "tls://dns.quad9.net:853".parse().unwrap();
        match p {
            DnsProtocol::Tls { hostname, addr } => {
                assert_eq!(&*hostname, "dns.quad9.net");
                assert!(addr.is_unresolved());
            }
            other => panic!("expected TLS, got {:?}", other),
        }
    }

    #[test]
    fn parses_https_url() {
        let p: DnsProtocol = "https://cloudflare-dns.com/dns-query".parse().unwrap();
        match p {
            DnsProtocol::Https { hostname, .. } => assert_eq!(&*hostname, "cloudflare-dns.com"),
            other => panic!("expected HTTPS, got {:?}", other),
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!("udp://".parse::<DnsProtocol>().is_err());
    }
}
