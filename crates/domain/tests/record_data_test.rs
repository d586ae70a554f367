use bastion_dns_domain::{RecordData, RecordType, SoaData};
use std::sync::Arc;

#[test]
fn wire_codes_round_trip() {
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
        assert_eq!(RecordType::from_wire_code(rt.wire_code()), Some(rt));
    }
}

#[test]
fn unknown_wire_code_is_none() {
    assert_eq!(RecordType::from_wire_code(255), None);
    assert_eq!(RecordType::from_wire_code(41), None); // OPT is not a data type
}

#[test]
fn record_data_reports_its_type() {
    let mx = RecordData::Mx {
        preference: 10,
        exchange: Arc::from("mail.example.com"),
    };
    assert_eq!(mx.record_type(), RecordType::MX);

    let soa = RecordData::Soa(Box::new(SoaData {
        mname: Arc::from("ns1.example.com"),
        rname: Arc::from("hostmaster.example.com"),
        serial: 2024010101,
        refresh: 7200,
        retry: 3600,
        expire: 1209600,
        minimum: 300,
    }));
    assert_eq!(soa.record_type(), RecordType::SOA);
}

#[test]
fn only_address_records_expose_ips() {
    let a = RecordData::A("93.184.216.34".parse().unwrap());
    assert!(a.as_ip().is_some());

    let cname = RecordData::Cname(Arc::from("www.example.com"));
    assert!(cname.as_ip().is_none());
}

#[test]
fn record_type_parses_case_insensitively() {
    assert_eq!("aaaa".parse::<RecordType>().unwrap(), RecordType::AAAA);
    assert_eq!("Mx".parse::<RecordType>().unwrap(), RecordType::MX);
    assert!("HTTPS".parse::<RecordType>().is_err());
}
