use super::decoder::WireQuery;
use bastion_dns_domain::{RecordData, SoaData};

/// RCODEs this server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
}

impl ResponseCode {
    fn wire_value(&self) -> u8 {
        match self {
            Self::NoError => 0,
            Self::FormErr => 1,
            Self::ServFail => 2,
            Self::NxDomain => 3,
            Self::NotImp => 4,
            Self::Refused => 5,
        }
    }
}

pub struct EncodedResponse {
    pub bytes: Vec<u8>,
    pub truncated: bool,
}

const HEADER_LEN: usize = 12;
const OPT_RECORD_LEN: usize = 11;
/// Answer owner: pointer to the question name at offset 12.
const NAME_POINTER: [u8; 2] = [0xC0, 0x0C];

/// Builds a positive response: echoed question, answer records with the
/// recomputed TTL, OPT appended when the client sent one.
///
/// `udp_limit` is the client's advertised payload capacity (None over TCP).
/// A response that does not fit is reduced to a question-only reply with
/// the TC bit set so the client retries over TCP.
pub fn encode_answer_response(
    query: &WireQuery,
    query_buf: &[u8],
    answers: &[RecordData],
    ttl: u32,
    udp_limit: Option<usize>,
) -> EncodedResponse {
    let question = &query_buf[HEADER_LEN..query.question_end];
    let opt_len = if query.edns.is_some() { OPT_RECORD_LEN } else { 0 };

    let mut rdata_section = Vec::with_capacity(answers.len() * 32);
    for record in answers {
        encode_answer(&mut rdata_section, record, ttl);
    }

    let total = HEADER_LEN + question.len() + rdata_section.len() + opt_len;
    if let Some(limit) = udp_limit {
        if total > limit {
            return truncated_response(query, question);
        }
    }

    let mut bytes = Vec::with_capacity(total);
    write_header(
        &mut bytes,
        query,
        ResponseCode::NoError,
        answers.len() as u16,
        false,
    );
    bytes.extend_from_slice(question);
    bytes.extend_from_slice(&rdata_section);
    maybe_append_opt(&mut bytes, query);

    EncodedResponse {
        bytes,
        truncated: false,
    }
}

/// NODATA (empty NoError) or NXDOMAIN response.
pub fn encode_negative_response(
    query: &WireQuery,
    query_buf: &[u8],
    nxdomain: bool,
) -> EncodedResponse {
    let code = if nxdomain {
        ResponseCode::NxDomain
    } else {
        ResponseCode::NoError
    };
    encode_rcode_response(query, query_buf, code)
}

/// Header + echoed question with the given RCODE and no answers. Used for
/// SERVFAIL, REFUSED and NOTIMP paths.
pub fn encode_rcode_response(
    query: &WireQuery,
    query_buf: &[u8],
    code: ResponseCode,
) -> EncodedResponse {
    let question = &query_buf[HEADER_LEN..query.question_end];
    let mut bytes = Vec::with_capacity(HEADER_LEN + question.len() + OPT_RECORD_LEN);
    write_header(&mut bytes, query, code, 0, false);
    bytes.extend_from_slice(question);
    maybe_append_opt(&mut bytes, query);
    EncodedResponse {
        bytes,
        truncated: false,
    }
}

fn truncated_response(query: &WireQuery, question: &[u8]) -> EncodedResponse {
    let mut bytes = Vec::with_capacity(HEADER_LEN + question.len() + OPT_RECORD_LEN);
    write_header(&mut bytes, query, ResponseCode::NoError, 0, true);
    bytes.extend_from_slice(question);
    maybe_append_opt(&mut bytes, query);
    EncodedResponse {
        bytes,
        truncated: true,
    }
}

fn write_header(
    bytes: &mut Vec<u8>,
    query: &WireQuery,
    code: ResponseCode,
    ancount: u16,
    truncated: bool,
) {
    bytes.extend_from_slice(&query.id.to_be_bytes());

    // QR=1, RA=1; echo RD; AA stays clear — answers come from cache or
    // forwarding, never authority.
    let mut flags_hi = 0x80u8;
    if truncated {
        flags_hi |= 0x02;
    }
    if query.recursion_desired {
        flags_hi |= 0x01;
    }
    let flags_lo = 0x80u8 | code.wire_value();
    bytes.push(flags_hi);
    bytes.push(flags_lo);

    bytes.extend_from_slice(&1u16.to_be_bytes()); // qdcount
    bytes.extend_from_slice(&ancount.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes()); // nscount
    let arcount: u16 = if query.edns.is_some() { 1 } else { 0 };
    bytes.extend_from_slice(&arcount.to_be_bytes());
}

fn maybe_append_opt(bytes: &mut Vec<u8>, query: &WireQuery) {
    if query.edns.is_none() {
        return;
    }
    // Root name, TYPE=OPT, our payload capacity, zeroed ttl/flags, no rdata.
    bytes.push(0x00);
    bytes.extend_from_slice(&41u16.to_be_bytes());
    bytes.extend_from_slice(&4096u16.to_be_bytes());
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    bytes.extend_from_slice(&0u16.to_be_bytes());
}

fn encode_answer(bytes: &mut Vec<u8>, record: &RecordData, ttl: u32) {
    bytes.extend_from_slice(&NAME_POINTER);
    bytes.extend_from_slice(&record.record_type().wire_code().to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes()); // class IN
    bytes.extend_from_slice(&ttl.to_be_bytes());

    match record {
        RecordData::A(v4) => {
            bytes.extend_from_slice(&4u16.to_be_bytes());
            bytes.extend_from_slice(&v4.octets());
        }
        RecordData::Aaaa(v6) => {
            bytes.extend_from_slice(&16u16.to_be_bytes());
            bytes.extend_from_slice(&v6.octets());
        }
        RecordData::Cname(name) | RecordData::Ns(name) | RecordData::Ptr(name) => {
            bytes.extend_from_slice(&(name_wire_len(name) as u16).to_be_bytes());
            write_name(bytes, name);
        }
        RecordData::Mx { preference, exchange } => {
            let rdlen = 2 + name_wire_len(exchange);
            bytes.extend_from_slice(&(rdlen as u16).to_be_bytes());
            bytes.extend_from_slice(&preference.to_be_bytes());
            write_name(bytes, exchange);
        }
        RecordData::Txt(strings) => {
            let rdlen: usize = strings.iter().map(|s| 1 + s.len().min(255)).sum();
            bytes.extend_from_slice(&(rdlen as u16).to_be_bytes());
            for s in strings.iter() {
                let len = s.len().min(255);
                bytes.push(len as u8);
                bytes.extend_from_slice(&s[..len]);
            }
        }
        RecordData::Soa(soa) => {
            encode_soa(bytes, soa);
        }
    }
}

fn encode_soa(bytes: &mut Vec<u8>, soa: &SoaData) {
    let rdlen = name_wire_len(&soa.mname) + name_wire_len(&soa.rname) + 20;
    bytes.extend_from_slice(&(rdlen as u16).to_be_bytes());
    write_name(bytes, &soa.mname);
    write_name(bytes, &soa.rname);
    for v in [soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum] {
        bytes.extend_from_slice(&v.to_be_bytes());
    }
}

/// Uncompressed wire length of a dotted name: each label costs len+1, plus
/// the root byte.
fn name_wire_len(name: &str) -> usize {
    if name.is_empty() {
        return 1;
    }
    name.split('.').map(|label| label.len() + 1).sum::<usize>() + 1
}

/// Names inside rdata are written uncompressed.
fn write_name(bytes: &mut Vec<u8>, name: &str) {
    if !name.is_empty() {
        for label in name.split('.') {
            let len = label.len().min(63);
            bytes.push(len as u8);
            bytes.extend_from_slice(&label.as_bytes()[..len]);
        }
    }
    bytes.push(0x00);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::wire::decoder::decode_query;

    fn query_buf(edns_payload: Option<u16>) -> Vec<u8> {
        let mut buf = vec![
            0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        buf.extend_from_slice(b"\x07example\x03com\x00");
        buf.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
        if let Some(payload) = edns_payload {
            buf[11] = 0x01;
            buf.push(0x00);
            buf.extend_from_slice(&41u16.to_be_bytes());
            buf.extend_from_slice(&payload.to_be_bytes());
            buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
            buf.extend_from_slice(&0u16.to_be_bytes());
        }
        buf
    }

    #[test]
    fn answer_response_carries_id_and_ancount() {
        let buf = query_buf(None);
        let query = decode_query(&buf).unwrap();
        let answers = vec![
            RecordData::A("93.184.216.34".parse().unwrap()),
            RecordData::A("93.184.216.35".parse().unwrap()),
        ];
        let encoded = encode_answer_response(&query, &buf, &answers, 300, Some(512));

        assert!(!encoded.truncated);
        assert_eq!(&encoded.bytes[0..2], &[0x12, 0x34]);
        assert_eq!(encoded.bytes[2] & 0x80, 0x80, "QR must be set");
        assert_eq!(u16::from_be_bytes([encoded.bytes[6], encoded.bytes[7]]), 2);
    }

    #[test]
    fn response_echoes_the_question() {
        let buf = query_buf(None);
        let query = decode_query(&buf).unwrap();
        let answers = vec![RecordData::A("93.184.216.34".parse().unwrap())];
        let encoded = encode_answer_response(&query, &buf, &answers, 60, Some(512));
        assert_eq!(
            &encoded.bytes[12..query.question_end],
            &buf[12..query.question_end]
        );
    }

    #[test]
    fn oversized_answer_is_truncated_within_limit() {
        let buf = query_buf(None);
        let query = decode_query(&buf).unwrap();
        // ~40 A records blow well past 512 bytes.
        let answers: Vec<RecordData> = (0..40)
            .map(|i| RecordData::A(format!("10.0.{}.{}", i / 250, i % 250).parse().unwrap()))
            .collect();
        let encoded = encode_answer_response(&query, &buf, &answers, 300, Some(512));

        assert!(encoded.truncated);
        assert!(encoded.bytes.len() <= 512);
        assert_eq!(encoded.bytes[2] & 0x02, 0x02, "TC bit must be set");
        assert_eq!(u16::from_be_bytes([encoded.bytes[6], encoded.bytes[7]]), 0);
    }

    #[test]
    fn tcp_path_has_no_size_limit() {
        let buf = query_buf(None);
        let query = decode_query(&buf).unwrap();
        let answers: Vec<RecordData> = (0..40)
            .map(|i| RecordData::A(format!("10.0.0.{}", i % 250).parse().unwrap()))
            .collect();
        let encoded = encode_answer_response(&query, &buf, &answers, 300, None);
        assert!(!encoded.truncated);
        assert_eq!(u16::from_be_bytes([encoded.bytes[6], encoded.bytes[7]]), 40);
    }

    #[test]
    fn edns_client_gets_opt_in_response() {
        let buf = query_buf(Some(1232));
        let query = decode_query(&buf).unwrap();
        let answers = vec![RecordData::A("93.184.216.34".parse().unwrap())];
        let encoded = encode_answer_response(&query, &buf, &answers, 60, Some(1232));

        let arcount = u16::from_be_bytes([encoded.bytes[10], encoded.bytes[11]]);
        assert_eq!(arcount, 1, "OPT must be echoed for EDNS clients");
    }

    #[test]
    fn nxdomain_sets_rcode_3() {
        let buf = query_buf(None);
        let query = decode_query(&buf).unwrap();
        let encoded = encode_negative_response(&query, &buf, true);
        assert_eq!(encoded.bytes[3] & 0x0F, 3);
    }

    #[test]
    fn servfail_sets_rcode_2() {
        let buf = query_buf(None);
        let query = decode_query(&buf).unwrap();
        let encoded = encode_rcode_response(&query, &buf, ResponseCode::ServFail);
        assert_eq!(encoded.bytes[3] & 0x0F, 2);
    }

    #[test]
    fn mx_rdata_encodes_preference_then_exchange() {
        let buf = query_buf(None);
        let query = decode_query(&buf).unwrap();
        let answers = vec![RecordData::Mx {
            preference: 10,
            exchange: std::sync::Arc::from("mail.example.com"),
        }];
        let encoded = encode_answer_response(&query, &buf, &answers, 300, None);

        let answer_start = query.question_end;
        // name ptr (2) + type (2) + class (2) + ttl (4) + rdlen (2)
        let rdata_start = answer_start + 12;
        assert_eq!(
            &encoded.bytes[rdata_start..rdata_start + 2],
            &10u16.to_be_bytes()
        );
        assert_eq!(encoded.bytes[rdata_start + 2], 4); // "mail"
    }
}
