use bastion_dns_domain::{DnsClass, DnsError, RecordType};
use compact_str::CompactString;

const MAX_DOMAIN_LEN: usize = 253;

/// EDNS0 OPT data carried by the client (RFC 6891).
#[derive(Debug, Clone, Copy)]
pub struct EdnsInfo {
    pub payload_size: u16,
    pub dnssec_ok: bool,
}

/// A decoded client query. `record_type` is `None` for well-formed queries
/// of a type we do not serve — those get NOTIMP, not a silent drop.
#[derive(Debug, Clone)]
pub struct WireQuery {
    pub id: u16,
    /// Lowercased, no trailing dot.
    pub domain: CompactString,
    pub qtype: u16,
    pub record_type: Option<RecordType>,
    pub class: DnsClass,
    pub recursion_desired: bool,
    /// Byte offset where the question section ends in the original buffer;
    /// the encoder echoes `buf[12..question_end]` verbatim.
    pub question_end: usize,
    pub edns: Option<EdnsInfo>,
}

impl WireQuery {
    /// Advertised UDP payload capacity: EDNS size (floored at 512 per RFC
    /// 6891 §6.2.3) or the classic 512-byte limit.
    pub fn max_udp_payload(&self) -> usize {
        match self.edns {
            Some(edns) => edns.payload_size.max(512) as usize,
            None => 512,
        }
    }

    pub fn dnssec_ok(&self) -> bool {
        self.edns.map(|e| e.dnssec_ok).unwrap_or(false)
    }
}

/// Decodes a raw client datagram into a structured query.
///
/// Anything unparseable fails with `MalformedMessage` and the caller drops
/// the packet without a response — malformed input must never produce
/// amplification. Rejected outright: responses (QR=1), non-QUERY opcodes,
/// QDCOUNT != 1, compression pointers inside the QNAME, label or name
/// overflow, and EDNS versions above 0.
pub fn decode_query(buf: &[u8]) -> Result<WireQuery, DnsError> {
    if buf.len() < 17 {
        return Err(DnsError::MalformedMessage);
    }

    let id = u16::from_be_bytes([buf[0], buf[1]]);
    let flags = u16::from_be_bytes([buf[2], buf[3]]);

    // QR must be clear and OPCODE must be standard QUERY.
    if flags & 0xF800 != 0 {
        return Err(DnsError::MalformedMessage);
    }
    let recursion_desired = flags & 0x0100 != 0;

    let qdcount = u16::from_be_bytes([buf[4], buf[5]]);
    let ancount = u16::from_be_bytes([buf[6], buf[7]]);
    let nscount = u16::from_be_bytes([buf[8], buf[9]]);
    let arcount = u16::from_be_bytes([buf[10], buf[11]]);

    if qdcount != 1 || ancount != 0 || nscount != 0 {
        return Err(DnsError::MalformedMessage);
    }

    let (domain, mut pos) = parse_qname(buf, 12)?;

    if pos + 4 > buf.len() {
        return Err(DnsError::MalformedMessage);
    }
    let qtype = u16::from_be_bytes([buf[pos], buf[pos + 1]]);
    let qclass = u16::from_be_bytes([buf[pos + 2], buf[pos + 3]]);
    pos += 4;

    let question_end = pos;
    let edns = parse_additionals(buf, question_end, arcount)?;

    Ok(WireQuery {
        id,
        domain,
        qtype,
        record_type: RecordType::from_wire_code(qtype),
        class: DnsClass::from_wire_code(qclass),
        recursion_desired,
        question_end,
        edns,
    })
}

fn parse_qname(buf: &[u8], start: usize) -> Result<(CompactString, usize), DnsError> {
    let mut pos = start;
    let mut domain = CompactString::with_capacity(24);
    let mut first_label = true;

    loop {
        if pos >= buf.len() {
            return Err(DnsError::MalformedMessage);
        }
        let label_len = buf[pos] as usize;
        if label_len == 0 {
            pos += 1;
            break;
        }
        // Compression pointers and extended label types never appear in a
        // client question; anything with the top bits set is rejected.
        if label_len & 0xC0 != 0 {
            return Err(DnsError::MalformedMessage);
        }
        pos += 1;
        if pos + label_len > buf.len() {
            return Err(DnsError::MalformedMessage);
        }
        if !first_label {
            domain.push('.');
        }
        first_label = false;
        if domain.len() + label_len > MAX_DOMAIN_LEN {
            return Err(DnsError::MalformedMessage);
        }
        for &b in &buf[pos..pos + label_len] {
            domain.push(b.to_ascii_lowercase() as char);
        }
        pos += label_len;
    }

    Ok((domain, pos))
}

/// Scans the additional section for an OPT record; other records are
/// skipped. Returns the EDNS data if present.
fn parse_additionals(
    buf: &[u8],
    start: usize,
    arcount: u16,
) -> Result<Option<EdnsInfo>, DnsError> {
    let mut pos = start;
    let mut edns = None;

    for _ in 0..arcount {
        if pos >= buf.len() {
            // Counts promising more records than the buffer holds.
            return Err(DnsError::MalformedMessage);
        }
        pos = skip_name(buf, pos)?;

        if pos + 10 > buf.len() {
            return Err(DnsError::MalformedMessage);
        }
        let rr_type = u16::from_be_bytes([buf[pos], buf[pos + 1]]);

        if rr_type == 41 {
            // OPT: CLASS carries the payload size, TTL carries
            // ext-rcode/version/flags (RFC 6891 §6.1.2).
            let payload_size = u16::from_be_bytes([buf[pos + 2], buf[pos + 3]]);
            let version = buf[pos + 5];
            if version != 0 {
                return Err(DnsError::MalformedMessage);
            }
            let opt_flags = u16::from_be_bytes([buf[pos + 6], buf[pos + 7]]);
            edns = Some(EdnsInfo {
                payload_size,
                dnssec_ok: opt_flags & 0x8000 != 0,
            });
        }

        let rdlen = u16::from_be_bytes([buf[pos + 8], buf[pos + 9]]) as usize;
        pos += 10 + rdlen;
        if pos > buf.len() {
            return Err(DnsError::MalformedMessage);
        }
    }

    Ok(edns)
}

fn skip_name(buf: &[u8], start: usize) -> Result<usize, DnsError> {
    let mut pos = start;
    loop {
        if pos >= buf.len() {
            return Err(DnsError::MalformedMessage);
        }
        let len = buf[pos] as usize;
        if len == 0 {
            return Ok(pos + 1);
        }
        if len & 0xC0 == 0xC0 {
            // Compression pointer terminates the name.
            return Ok(pos + 2);
        }
        if len & 0xC0 != 0 {
            return Err(DnsError::MalformedMessage);
        }
        pos += 1 + len;
    }
}
