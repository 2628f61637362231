//! Tests for signed attributes canonical ordering.

use cms_signer::domain::asn1::DerEncode;
use cms_signer::domain::pkcs7::{Attribute, SignedAttributes};

#[test]
fn canonical_ordering_is_lexicographic_by_der() {
    let content_type = Attribute::content_type(&cms_signer::domain::constants::OID_DATA);
    let digest = Attribute::message_digest(&[0xAB; 32]);
    let time = Attribute::signing_time(1_700_000_000);

    let canonical = SignedAttributes::new(vec![time.clone(), digest.clone(), content_type.clone()]);
    let ders: Vec<Vec<u8>> = canonical.ordered().iter().map(|a| a.to_der()).collect();
    let mut sorted = ders.clone();
    sorted.sort();
    assert_eq!(ders, sorted, "Attributes not ordered lexicographically by DER");

    // Determinism check: input order does not change the encoding
    let canonical2 = SignedAttributes::new(vec![digest, content_type, time]);
    assert_eq!(canonical.implicit_der(), canonical2.implicit_der());
}

#[test]
fn signature_input_is_retagged_as_set() {
    let attrs = SignedAttributes::new(vec![Attribute::message_digest(&[1; 32])]);
    let input = attrs.signature_input();
    assert_eq!(input[0], 0x31);
    assert_eq!(attrs.implicit_der()[0], 0xA0);
    assert_eq!(&input[1..], &attrs.implicit_der()[1..]);

    let decoded = SignedAttributes::from_implicit(attrs.implicit_der()).unwrap();
    assert_eq!(decoded, attrs);
}
