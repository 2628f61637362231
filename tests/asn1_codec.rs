//! DER codec behaviour through the public API.

mod common;

use cms_signer::domain::asn1::{
    decode_der, tags, DecodeMode, Decoder, DerDecode, DerEncode, Encoder, ObjectIdentifier,
};
use cms_signer::domain::constants::{OID_DATA, OID_SIGNED_DATA};
use cms_signer::{Certificate, CmsSigningService, SignOptions, SignedData, SigningError};

fn encode(body: impl FnOnce(&mut Encoder)) -> Vec<u8> {
    let mut enc = Encoder::new();
    body(&mut enc);
    enc.finish()
}

#[test]
fn integers_use_minimal_twos_complement() {
    assert_eq!(encode(|e| { e.write_u64(0); }), [0x02, 0x01, 0x00]);
    assert_eq!(encode(|e| { e.write_u64(127); }), [0x02, 0x01, 0x7F]);
    assert_eq!(encode(|e| { e.write_u64(128); }), [0x02, 0x02, 0x00, 0x80]);
    assert_eq!(encode(|e| { e.write_integer(&[0, 0, 1]); }), [0x02, 0x01, 0x01]);

    let mut dec = Decoder::new(&[0x02, 0x02, 0x00, 0x05]);
    assert!(matches!(dec.read_integer(), Err(SigningError::MalformedEncoding(_))));
}

#[test]
fn lengths_use_shortest_definite_form() {
    let long = vec![0xAB; 200];
    let der = encode(|e| {
        e.write_octet_string(&long);
    });
    assert_eq!(&der[..3], &[0x04, 0x81, 0xC8]);
    assert_eq!(Decoder::new(&der).read_octet_string().unwrap(), long.as_slice());

    // 5 bytes in long form
    let non_minimal = [0x04, 0x81, 0x05, 1, 2, 3, 4, 5];
    assert!(Decoder::new(&non_minimal).read_octet_string().is_err());

    let indefinite = [0x30, 0x80, 0x00, 0x00];
    assert!(Decoder::new(&indefinite).read_sequence().is_err());
}

#[test]
fn truncated_elements_are_malformed() {
    let err = Decoder::new(&[0x30, 0x05, 0x02, 0x01]).read_sequence().unwrap_err();
    assert!(matches!(err, SigningError::MalformedEncoding(_)));
}

#[test]
fn set_of_is_sorted_by_encoding() {
    let der = encode(|e| {
        e.write_set_of_encoded(vec![vec![0x02, 0x01, 0x05], vec![0x02, 0x01, 0x01]]);
    });
    assert_eq!(der, [tags::SET, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x05]);
}

#[test]
fn object_identifiers_parse_and_print() {
    let oid: ObjectIdentifier = "1.2.840.113549.1.7.2".parse().unwrap();
    assert_eq!(oid, OID_SIGNED_DATA);
    assert_eq!(
        oid.to_der(),
        [0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x02]
    );
    assert_eq!(OID_DATA.to_string(), "1.2.840.113549.1.7.1");
    assert!("1".parse::<ObjectIdentifier>().is_err());
}

#[test]
fn times_switch_to_generalized_after_2049() {
    let last_utc = encode(|e| {
        e.write_time(2_524_607_999);
    });
    assert_eq!(last_utc[0], tags::UTC_TIME);
    assert_eq!(&last_utc[2..], b"491231235959Z");

    let first_generalized = encode(|e| {
        e.write_time(2_524_608_000);
    });
    assert_eq!(first_generalized[0], tags::GENERALIZED_TIME);
    assert_eq!(&first_generalized[2..], b"20500101000000Z");

    for der in [last_utc, first_generalized] {
        let decoded = Decoder::new(&der).read_time().unwrap();
        assert_eq!(encode(|e| { e.write_time(decoded); }), der);
    }
}

#[test]
fn strict_mode_rejects_trailing_bytes_and_lenient_ignores_them() {
    let mut der = OID_DATA.to_der();
    der.push(0x00);
    assert!(matches!(
        decode_der::<ObjectIdentifier>(&der, DecodeMode::Strict),
        Err(SigningError::MalformedEncoding(_))
    ));
    assert_eq!(
        decode_der::<ObjectIdentifier>(&der, DecodeMode::Lenient).unwrap(),
        OID_DATA
    );
}

#[test]
fn certificates_reencode_byte_for_byte() {
    for pki in common::all_pkis() {
        for cert in [&pki.root, &pki.leaf] {
            let decoded = Certificate::from_der(cert.der()).unwrap();
            assert_eq!(&decoded, cert);
            assert_eq!(decoded.to_der(), cert.der());
        }
    }
}

#[test]
fn signed_data_reencodes_byte_for_byte() {
    let pki = common::ec_pki();
    let signed = CmsSigningService::new(SignOptions::default())
        .sign(&common::PAYLOAD, &pki.chain(), &pki.leaf_key)
        .unwrap();
    let der = signed.to_content_info_der();
    let decoded = SignedData::from_content_info_der(&der, DecodeMode::Strict).unwrap();
    assert_eq!(decoded, signed);
    assert_eq!(decoded.to_content_info_der(), der);

    let mut padded = der.clone();
    padded.extend_from_slice(&[0, 0]);
    assert!(SignedData::from_content_info_der(&padded, DecodeMode::Strict).is_err());
    assert_eq!(
        SignedData::from_content_info_der(&padded, DecodeMode::Lenient).unwrap(),
        signed
    );
}

#[test]
fn impossible_calendar_dates_are_malformed() {
    let mut der = vec![tags::UTC_TIME, 13];
    der.extend_from_slice(b"250231000000Z");
    assert!(matches!(
        Decoder::new(&der).read_time(),
        Err(SigningError::MalformedEncoding(_))
    ));
}
