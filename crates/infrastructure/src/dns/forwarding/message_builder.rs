use super::record_type_map::RecordTypeMapper;
use bastion_dns_domain::{DnsError, RecordType};
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::Name;
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use std::str::FromStr;

/// Advertised to upstreams in our OPT record.
const EDNS_PAYLOAD: u16 = 4096;

/// Builds upstream query messages in wire format via hickory-proto: random
/// ID, RD set, a single question, and an EDNS0 OPT carrying our payload
/// capacity plus the client's DNSSEC-OK bit.
pub struct MessageBuilder;

impl MessageBuilder {
    pub fn build_query(
        domain: &str,
        record_type: &RecordType,
        dnssec_ok: bool,
    ) -> Result<Vec<u8>, DnsError> {
        let name = Name::from_str(domain)
            .map_err(|e| DnsError::InvalidDomainName(format!("'{}': {}", domain, e)))?;

        let mut query = Query::new();
        query.set_name(name);
        query.set_query_type(RecordTypeMapper::to_hickory(record_type));
        query.set_query_class(hickory_proto::rr::DNSClass::IN);

        let mut message = Message::new(fastrand::u16(..), MessageType::Query, OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(query);

        let mut edns = Edns::new();
        edns.set_max_payload(EDNS_PAYLOAD);
        edns.set_version(0);
        edns.set_dnssec_ok(dnssec_ok);
        message.set_edns(edns);

        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);
        message
            .emit(&mut encoder)
            .map_err(|e| DnsError::Io(format!("Failed to serialize DNS query: {}", e)))?;

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_query_with_rd_set() {
        let bytes = MessageBuilder::build_query("example.com", &RecordType::A, false).unwrap();
        assert!(bytes.len() > 12);
        assert_eq!(bytes[2] & 0x01, 0x01, "RD flag should be set");
    }

    #[test]
    fn all_record_types_build() {
        for rt in [
            RecordType::A,
            RecordType::AAAA,
            RecordType::CNAME,
            RecordType::MX,
            RecordType::TXT,
            RecordType::NS,
            RecordType::SOA,
            RecordType::PTR,
        ] {
            assert!(MessageBuilder::build_query("example.com", &rt, false).is_ok());
        }
    }

    #[test]
    fn dnssec_ok_sets_do_bit_in_opt() {
        let bytes = MessageBuilder::build_query("example.com", &RecordType::A, true).unwrap();
        let parsed = Message::from_vec(&bytes).unwrap();
        assert!(parsed.extensions().as_ref().is_some_and(|e| e.flags().dnssec_ok));
    }
}
