use super::RecordType;
use std::net::IpAddr;
use std::sync::Arc;

/// DNS CLASS value from the question section. Only IN is served; anything
/// else is answered with NOTIMP at ingress and never reaches the caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DnsClass {
    In,
    Other(u16),
}

impl DnsClass {
    pub fn from_wire_code(code: u16) -> Self {
        match code {
            1 => Self::In,
            other => Self::Other(other),
        }
    }

    pub fn wire_code(&self) -> u16 {
        match self {
            Self::In => 1,
            Self::Other(code) => *code,
        }
    }
}

/// Normalized query identity: lowercase domain, no trailing dot.
#[derive(Debug, Clone)]
pub struct DnsQuery {
    pub domain: Arc<str>,
    pub record_type: RecordType,
    pub class: DnsClass,
}

impl DnsQuery {
    pub fn new(domain: impl Into<Arc<str>>, record_type: RecordType) -> Self {
        Self {
            domain: domain.into(),
            record_type,
            class: DnsClass::In,
        }
    }
}

/// A query together with its source address, as seen by the ingress server.
#[derive(Debug, Clone)]
pub struct DnsRequest {
    pub query: DnsQuery,
    pub client_ip: IpAddr,
}

impl DnsRequest {
    pub fn new(query: DnsQuery, client_ip: IpAddr) -> Self {
        Self { query, client_ip }
    }
}
