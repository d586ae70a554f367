use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DnsError {
    /// Unparseable inbound packet. Dropped without a response.
    #[error("Malformed DNS message")]
    MalformedMessage,

    #[error("Upstream {server} timed out")]
    UpstreamTimeout { server: String },

    #[error("Upstream {server} transport error: {detail}")]
    UpstreamTransport { server: String, detail: String },

    /// Upstream answered with bytes we could not decode. Counted against
    /// that server exactly like a transport failure.
    #[error("Upstream {server} returned an undecodable response")]
    RecordDecode { server: String },

    #[error("All upstream attempts exhausted")]
    UpstreamExhausted,

    #[error("Domain is blocked")]
    Blocked,

    #[error("Domain not found (NXDOMAIN)")]
    NxDomain,

    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl DnsError {
    /// Failures that should trigger failover to another upstream rather
    /// than being surfaced to the client.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            DnsError::UpstreamTimeout { .. }
                | DnsError::UpstreamTransport { .. }
                | DnsError::RecordDecode { .. }
        )
    }
}
