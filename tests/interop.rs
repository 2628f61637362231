//! Produced structures decode with the RustCrypto `x509-cert` and `cms` parsers.

mod common;

use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::SignedData as RcSignedData;
use der::{Decode, Encode};

use cms_signer::{
    AlgorithmForm, CmsSigningService, IncludeOption, SignOptions, SignerIdentifierType,
};

#[test]
fn certificates_decode_with_x509_cert() {
    for pki in common::all_pkis() {
        for cert in [&pki.root, &pki.leaf] {
            let parsed = x509_cert::Certificate::from_der(cert.der()).unwrap();
            assert_eq!(parsed.to_der().unwrap(), cert.der());
            assert_eq!(
                parsed.tbs_certificate.subject.to_string(),
                cert.subject().to_string()
            );
            assert_eq!(
                parsed.tbs_certificate.serial_number.as_bytes(),
                cert.serial_number()
            );
        }
        let leaf = x509_cert::Certificate::from_der(pki.leaf.der()).unwrap();
        assert_eq!(leaf.tbs_certificate.subject.to_string(), "CN=my signer");
        assert_eq!(leaf.tbs_certificate.issuer.to_string(), "CN=my root");
    }
}

#[test]
fn signed_data_decodes_with_cms() {
    for pki in common::all_pkis() {
        for form in [AlgorithmForm::Combined, AlgorithmForm::Split] {
            let signed = CmsSigningService::new(SignOptions {
                form,
                include: IncludeOption::WholeChain,
                ..SignOptions::default()
            })
            .sign(&common::PAYLOAD, &pki.chain(), &pki.leaf_key)
            .unwrap();
            let der = signed.to_content_info_der();

            let content_info = ContentInfo::from_der(&der).unwrap();
            assert_eq!(content_info.content_type.to_string(), "1.2.840.113549.1.7.2");
            assert_eq!(content_info.to_der().unwrap(), der);

            let parsed: RcSignedData = content_info.content.decode_as().unwrap();
            assert_eq!(parsed.version, CmsVersion::V1);
            assert!(parsed.encap_content_info.econtent.is_none());
            assert_eq!(parsed.certificates.map(|set| set.0.len()), Some(2));
            assert_eq!(parsed.signer_infos.0.len(), 1);

            let signer = parsed.signer_infos.0.iter().next().unwrap();
            assert_eq!(
                signer.signature_algorithm.oid.to_string(),
                signed.signer_infos()[0].signature_algorithm.oid.to_string()
            );
            assert!(signer.signed_attrs.is_some());
        }
    }
}

#[test]
fn subject_key_identifier_signers_decode_with_cms() {
    let pki = common::ec_pki();
    let signed = CmsSigningService::new(SignOptions {
        identifier: SignerIdentifierType::SubjectKeyIdentifier,
        ..SignOptions::default()
    })
    .sign(&common::PAYLOAD, &pki.chain(), &pki.leaf_key)
    .unwrap();
    let content_info = ContentInfo::from_der(&signed.to_content_info_der()).unwrap();
    let parsed: RcSignedData = content_info.content.decode_as().unwrap();
    assert_eq!(parsed.version, CmsVersion::V3);
    let signer = parsed.signer_infos.0.iter().next().unwrap();
    assert_eq!(signer.version, CmsVersion::V3);
    assert!(matches!(
        signer.sid,
        cms::signed_data::SignerIdentifier::SubjectKeyIdentifier(_)
    ));
}
