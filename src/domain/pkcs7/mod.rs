//! PKCS#7 / CMS `SignedData` domain model (RFC 5652).
//!
//! `SET OF` fields (digestAlgorithms, certificates, signerInfos) are held in
//! DER order: [`SignedData::new`] sorts them, and decoding keeps the wire
//! order, so encode-then-decode of an engine-built value is the identity.

use std::fmt;

pub mod attributes;
pub mod signer_info;

pub use attributes::{Attribute, SignedAttributes};
pub use signer_info::{SignerIdentifier, SignerInfo};

use crate::domain::asn1::{
    decode_der, tags, DecodeMode, DerDecode, DerEncode, Decoder, Encoder, ObjectIdentifier,
};
use crate::domain::constants::{OID_DATA, OID_SIGNED_DATA};
use crate::domain::crypto::AlgorithmIdentifier;
use crate::domain::x509::Certificate;
use crate::infra::error::{SigningError, SigningResult};

/// `EncapsulatedContentInfo ::= SEQUENCE { eContentType, [0] EXPLICIT OCTET STRING OPTIONAL }`
#[derive(Clone, PartialEq, Eq)]
pub struct EncapsulatedContentInfo {
    pub content_type: ObjectIdentifier,
    /// `None` for detached signatures.
    pub content: Option<Vec<u8>>,
}

impl EncapsulatedContentInfo {
    pub fn detached(content_type: ObjectIdentifier) -> Self {
        Self {
            content_type,
            content: None,
        }
    }
}

impl fmt::Debug for EncapsulatedContentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EncapsulatedContentInfo(type={}, content={})",
            self.content_type,
            self.content
                .as_ref()
                .map_or_else(|| "detached".to_string(), |c| format!("{} bytes", c.len()))
        )
    }
}

impl DerEncode for EncapsulatedContentInfo {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_sequence(|seq| {
            seq.write_oid(&self.content_type);
            if let Some(content) = &self.content {
                seq.write_explicit(0, |inner| {
                    inner.write_octet_string(content);
                });
            }
        });
    }
}

impl DerDecode for EncapsulatedContentInfo {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        let mut seq = decoder.read_sequence()?;
        let content_type = seq.read_oid()?;
        let content = match seq.try_read_context_specific(0, true)? {
            Some(tlv) => {
                let mut inner = Decoder::new(tlv.value);
                let content = inner.read_octet_string()?.to_vec();
                inner.expect_end("eContent")?;
                Some(content)
            }
            None => None,
        };
        seq.expect_end("EncapsulatedContentInfo")?;
        Ok(Self {
            content_type,
            content,
        })
    }
}

/// CMS SignedData.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedData {
    version: u64,
    digest_algorithms: Vec<AlgorithmIdentifier>,
    encap_content_info: EncapsulatedContentInfo,
    certificates: Vec<Certificate>,
    signer_infos: Vec<SignerInfo>,
}

fn sort_by_der<T: DerEncode>(items: Vec<T>) -> Vec<T> {
    let mut keyed: Vec<(Vec<u8>, T)> = items.into_iter().map(|i| (i.to_der(), i)).collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.dedup_by(|a, b| a.0 == b.0);
    keyed.into_iter().map(|(_, i)| i).collect()
}

impl SignedData {
    /// Assemble SignedData, computing its version and sorting every SET OF.
    pub fn new(
        digest_algorithms: Vec<AlgorithmIdentifier>,
        encap_content_info: EncapsulatedContentInfo,
        certificates: Vec<Certificate>,
        signer_infos: Vec<SignerInfo>,
    ) -> Self {
        let version = if encap_content_info.content_type != OID_DATA
            || signer_infos.iter().any(|s| s.version == 3)
        {
            3
        } else {
            1
        };
        Self {
            version,
            digest_algorithms: sort_by_der(digest_algorithms),
            encap_content_info,
            certificates: sort_by_der(certificates),
            signer_infos: sort_by_der(signer_infos),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn digest_algorithms(&self) -> &[AlgorithmIdentifier] {
        &self.digest_algorithms
    }

    pub fn encap_content_info(&self) -> &EncapsulatedContentInfo {
        &self.encap_content_info
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn signer_infos(&self) -> &[SignerInfo] {
        &self.signer_infos
    }

    /// Wrap in ContentInfo and encode.
    pub fn to_content_info_der(&self) -> Vec<u8> {
        ContentInfo::SignedData(self.clone()).to_der()
    }

    /// Decode a ContentInfo that must hold SignedData.
    pub fn from_content_info_der(bytes: &[u8], mode: DecodeMode) -> SigningResult<Self> {
        match decode_der::<ContentInfo>(bytes, mode)? {
            ContentInfo::SignedData(signed_data) => Ok(signed_data),
        }
    }
}

impl fmt::Debug for SignedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedData")
            .field("version", &self.version)
            .field("digest_algorithms", &self.digest_algorithms.len())
            .field("encap_content_info", &self.encap_content_info)
            .field("certificates", &self.certificates)
            .field("signer_infos", &self.signer_infos)
            .finish()
    }
}

impl DerEncode for SignedData {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_sequence(|seq| {
            seq.write_u64(self.version);
            seq.write_set_of(&self.digest_algorithms);
            seq.write(&self.encap_content_info);
            if !self.certificates.is_empty() {
                let mut encoded: Vec<Vec<u8>> =
                    self.certificates.iter().map(DerEncode::to_der).collect();
                encoded.sort();
                seq.write_context_specific(0, true, &encoded.concat());
            }
            seq.write_set_of(&self.signer_infos);
        });
    }
}

impl DerDecode for SignedData {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        let mut seq = decoder.read_sequence()?;
        let version = seq.read_u64()?;
        if !matches!(version, 1 | 3 | 4 | 5) {
            return Err(SigningError::MalformedEncoding(format!(
                "unsupported SignedData version {version}"
            )));
        }

        let mut set = seq.read_set()?;
        let mut digest_algorithms = Vec::new();
        while !set.is_empty() {
            digest_algorithms.push(AlgorithmIdentifier::decode(&mut set)?);
        }

        let encap_content_info = EncapsulatedContentInfo::decode(&mut seq)?;

        let mut certificates = Vec::new();
        if let Some(tlv) = seq.try_read_context_specific(0, true)? {
            let mut certs = Decoder::new(tlv.value);
            while !certs.is_empty() {
                if !certs.next_is(tags::SEQUENCE) {
                    return Err(SigningError::MalformedEncoding(format!(
                        "unsupported CertificateChoices alternative {}",
                        certs.peek_tag()?
                    )));
                }
                certificates.push(Certificate::decode(&mut certs)?);
            }
        }

        if let Some(crls) = seq.try_read_context_specific(1, true)? {
            log::debug!("Ignoring {} bytes of revocation information", crls.value.len());
        }

        let mut set = seq.read_set()?;
        let mut signer_infos = Vec::new();
        while !set.is_empty() {
            signer_infos.push(SignerInfo::decode(&mut set)?);
        }
        seq.expect_end("SignedData")?;

        Ok(Self {
            version,
            digest_algorithms,
            encap_content_info,
            certificates,
            signer_infos,
        })
    }
}

/// `ContentInfo ::= SEQUENCE { contentType, [0] EXPLICIT content }`
///
/// Only SignedData content is supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentInfo {
    SignedData(SignedData),
}

impl DerEncode for ContentInfo {
    fn encode(&self, encoder: &mut Encoder) {
        match self {
            ContentInfo::SignedData(signed_data) => {
                encoder.write_sequence(|seq| {
                    seq.write_oid(&OID_SIGNED_DATA);
                    seq.write_explicit(0, |inner| {
                        inner.write(signed_data);
                    });
                });
            }
        }
    }
}

impl DerDecode for ContentInfo {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        let mut seq = decoder.read_sequence()?;
        let content_type = seq.read_oid()?;
        if content_type != OID_SIGNED_DATA {
            return Err(SigningError::InvalidInput(format!(
                "ContentInfo holds {content_type}, expected signedData ({OID_SIGNED_DATA})"
            )));
        }
        let tlv = seq.read_context_specific(0, true)?;
        let mut inner = Decoder::new(tlv.value);
        let signed_data = SignedData::decode(&mut inner)?;
        inner.expect_end("ContentInfo content")?;
        seq.expect_end("ContentInfo")?;
        Ok(ContentInfo::SignedData(signed_data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::{OID_SHA256, OID_SHA384};
    use crate::domain::x509::DistinguishedName;

    fn signer(serial: u8) -> SignerInfo {
        SignerInfo {
            version: 1,
            sid: SignerIdentifier::IssuerAndSerialNumber {
                issuer: DistinguishedName::common_name("Root"),
                serial_number: vec![serial],
            },
            digest_algorithm: AlgorithmIdentifier::null(OID_SHA256),
            signed_attrs: None,
            signature_algorithm: AlgorithmIdentifier::null(OID_SHA256),
            signature: vec![serial; 8],
            unsigned_attrs: None,
        }
    }

    #[test]
    fn test_signed_data_roundtrip_is_identity() {
        let sd = SignedData::new(
            vec![
                AlgorithmIdentifier::null(OID_SHA384),
                AlgorithmIdentifier::null(OID_SHA256),
            ],
            EncapsulatedContentInfo::detached(OID_DATA),
            Vec::new(),
            vec![signer(2), signer(1)],
        );
        assert_eq!(sd.version(), 1);
        let der = sd.to_content_info_der();
        let decoded = SignedData::from_content_info_der(&der, DecodeMode::Strict).unwrap();
        assert_eq!(decoded, sd);
        assert_eq!(decoded.to_content_info_der(), der);
    }

    #[test]
    fn test_digest_algorithms_are_deduplicated() {
        let sd = SignedData::new(
            vec![
                AlgorithmIdentifier::null(OID_SHA256),
                AlgorithmIdentifier::null(OID_SHA256),
            ],
            EncapsulatedContentInfo::detached(OID_DATA),
            Vec::new(),
            vec![signer(1)],
        );
        assert_eq!(sd.digest_algorithms().len(), 1);
    }

    #[test]
    fn test_embedded_content_roundtrip() {
        let sd = SignedData::new(
            vec![AlgorithmIdentifier::null(OID_SHA256)],
            EncapsulatedContentInfo {
                content_type: OID_DATA,
                content: Some(vec![1, 2, 3]),
            },
            Vec::new(),
            vec![signer(1)],
        );
        let decoded = SignedData::from_der(&sd.to_der()).unwrap();
        assert_eq!(decoded.encap_content_info().content, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_trailing_bytes_policy() {
        let sd = SignedData::new(
            vec![AlgorithmIdentifier::null(OID_SHA256)],
            EncapsulatedContentInfo::detached(OID_DATA),
            Vec::new(),
            vec![signer(1)],
        );
        let mut der = sd.to_content_info_der();
        der.extend_from_slice(&[0, 0, 0]);
        assert!(SignedData::from_content_info_der(&der, DecodeMode::Strict).is_err());
        assert_eq!(
            SignedData::from_content_info_der(&der, DecodeMode::Lenient).unwrap(),
            sd
        );
    }

    #[test]
    fn test_rejects_other_content_types() {
        let mut enc = Encoder::new();
        enc.write_sequence(|seq| {
            seq.write_oid(&OID_DATA);
            seq.write_explicit(0, |inner| {
                inner.write_octet_string(&[1]);
            });
        });
        assert!(matches!(
            ContentInfo::from_der(&enc.finish()),
            Err(SigningError::InvalidInput(_))
        ));
    }
}
