use bastion_dns_domain::{DnsError, RecordData, SoaData};
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RData;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamRcode {
    NoError,
    NxDomain,
    ServerError,
    Other,
}

/// Decoded upstream response, reduced to what the cache stores.
#[derive(Debug, Clone)]
pub struct UpstreamAnswer {
    /// Supported-type answer records in section order (CNAME chain included).
    pub answers: Vec<RecordData>,
    pub rcode: UpstreamRcode,
    pub truncated: bool,
    /// Smallest TTL across the answer set — the TTL the cache entry gets.
    pub min_ttl: Option<u32>,
    /// SOA MINIMUM from the authority section (RFC 2308 negative TTL).
    pub negative_ttl: Option<u32>,
}

impl UpstreamAnswer {
    pub fn is_nxdomain(&self) -> bool {
        self.rcode == UpstreamRcode::NxDomain
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self.rcode, UpstreamRcode::ServerError)
    }

    pub fn is_nodata(&self) -> bool {
        self.rcode == UpstreamRcode::NoError && self.answers.is_empty()
    }
}

pub struct ResponseParser;

impl ResponseParser {
    pub fn parse(response_bytes: &[u8]) -> Result<UpstreamAnswer, DnsError> {
        let message = Message::from_vec(response_bytes)
            .map_err(|e| DnsError::Io(format!("Failed to parse DNS response: {}", e)))?;

        let rcode = match message.response_code() {
            ResponseCode::NoError => UpstreamRcode::NoError,
            ResponseCode::NXDomain => UpstreamRcode::NxDomain,
            ResponseCode::ServFail | ResponseCode::Refused | ResponseCode::NotImp => {
                UpstreamRcode::ServerError
            }
            _ => UpstreamRcode::Other,
        };

        let mut answers = Vec::with_capacity(message.answers().len());
        let mut min_ttl: Option<u32> = None;

        for record in message.answers() {
            let Some(data) = convert_rdata(record.data()) else {
                continue;
            };
            let ttl = record.ttl();
            min_ttl = Some(min_ttl.map_or(ttl, |current| current.min(ttl)));
            answers.push(data);
        }

        let negative_ttl = message.name_servers().iter().find_map(|record| {
            if let RData::SOA(soa) = record.data() {
                Some(soa.minimum().min(record.ttl()))
            } else {
                None
            }
        });

        debug!(
            rcode = ?rcode,
            answers = answers.len(),
            truncated = message.truncated(),
            "Upstream response parsed"
        );

        Ok(UpstreamAnswer {
            answers,
            rcode,
            truncated: message.truncated(),
            min_ttl,
            negative_ttl,
        })
    }
}

fn normalize_name(name: &hickory_proto::rr::Name) -> Arc<str> {
    let mut s = name.to_utf8().to_lowercase();
    if s.ends_with('.') && s.len() > 1 {
        s.pop();
    }
    Arc::from(s)
}

fn convert_rdata(rdata: &RData) -> Option<RecordData> {
    match rdata {
        RData::A(a) => Some(RecordData::A(a.0)),
        RData::AAAA(aaaa) => Some(RecordData::Aaaa(aaaa.0)),
        RData::CNAME(cname) => Some(RecordData::Cname(normalize_name(cname))),
        RData::NS(ns) => Some(RecordData::Ns(normalize_name(ns))),
        RData::PTR(ptr) => Some(RecordData::Ptr(normalize_name(ptr))),
        RData::MX(mx) => Some(RecordData::Mx {
            preference: mx.preference(),
            exchange: normalize_name(mx.exchange()),
        }),
        RData::TXT(txt) => Some(RecordData::Txt(Arc::from(txt.txt_data().to_vec()))),
        RData::SOA(soa) => Some(RecordData::Soa(Box::new(SoaData {
            mname: normalize_name(soa.mname()),
            rname: normalize_name(soa.rname()),
            serial: soa.serial(),
            refresh: soa.refresh().max(0) as u32,
            retry: soa.retry().max(0) as u32,
            expire: soa.expire().max(0) as u32,
            minimum: soa.minimum(),
        }))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::forwarding::MessageBuilder;
    use bastion_dns_domain::RecordType;

    #[test]
    fn parse_rejects_garbage() {
        assert!(ResponseParser::parse(&[0x00, 0x01, 0x02]).is_err());
    }

    #[test]
    fn parses_an_empty_noerror_as_nodata() {
        // A freshly built query parses as a NoError message with no answers.
        let bytes = MessageBuilder::build_query("example.com", &RecordType::A, false).unwrap();
        let answer = ResponseParser::parse(&bytes).unwrap();
        assert!(answer.is_nodata());
        assert_eq!(answer.min_ttl, None);
    }
}
