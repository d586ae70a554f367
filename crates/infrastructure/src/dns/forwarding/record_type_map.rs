use bastion_dns_domain::RecordType;
use hickory_proto::rr::RecordType as HickoryType;

/// Conversions between our closed record-type set and hickory's open one.
pub struct RecordTypeMapper;

impl RecordTypeMapper {
    pub fn to_hickory(record_type: &RecordType) -> HickoryType {
        match record_type {
            RecordType::A => HickoryType::A,
            RecordType::AAAA => HickoryType::AAAA,
            RecordType::CNAME => HickoryType::CNAME,
            RecordType::MX => HickoryType::MX,
            RecordType::TXT => HickoryType::TXT,
            RecordType::NS => HickoryType::NS,
            RecordType::SOA => HickoryType::SOA,
            RecordType::PTR => HickoryType::PTR,
        }
    }

    pub fn from_hickory(record_type: HickoryType) -> Option<RecordType> {
        match record_type {
            HickoryType::A => Some(RecordType::A),
            HickoryType::AAAA => Some(RecordType::AAAA),
            HickoryType::CNAME => Some(RecordType::CNAME),
            HickoryType::MX => Some(RecordType::MX),
            HickoryType::TXT => Some(RecordType::TXT),
            HickoryType::NS => Some(RecordType::NS),
            HickoryType::SOA => Some(RecordType::SOA),
            HickoryType::PTR => Some(RecordType::PTR),
            _ => None,
        }
    }
}
