//! X.509 v3 certificate structure.

use std::fmt;

use super::{
    parse_subject_key_identifier, BasicConstraints, DistinguishedName, ExtendedKeyUsage,
    Extension, KeyUsage,
};
use crate::domain::asn1::{tags, DerDecode, DerEncode, Decoder, Encoder, ObjectIdentifier};
use crate::domain::constants::{
    OID_BASIC_CONSTRAINTS, OID_EC_PUBLIC_KEY, OID_EXT_KEY_USAGE, OID_KEY_USAGE,
    OID_RSA_ENCRYPTION, OID_SUBJECT_KEY_IDENTIFIER,
};
use crate::domain::crypto::{AlgorithmIdentifier, HashAlgorithm, KeyFamily};
use crate::infra::error::{SigningError, SigningResult};

/// Version field value for v3 certificates.
pub const VERSION_V3: u64 = 2;

/// `SubjectPublicKeyInfo ::= SEQUENCE { algorithm, subjectPublicKey BIT STRING }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectPublicKeyInfo {
    pub algorithm: AlgorithmIdentifier,
    /// BIT STRING contents (always whole octets).
    pub public_key: Vec<u8>,
}

impl SubjectPublicKeyInfo {
    /// Key family named by the algorithm OID.
    pub fn family(&self) -> Option<KeyFamily> {
        if self.algorithm.oid == OID_RSA_ENCRYPTION {
            Some(KeyFamily::Rsa)
        } else if self.algorithm.oid == OID_EC_PUBLIC_KEY {
            Some(KeyFamily::Ec)
        } else {
            None
        }
    }
}

impl DerEncode for SubjectPublicKeyInfo {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_sequence(|seq| {
            seq.write(&self.algorithm);
            seq.write_bit_string(0, &self.public_key);
        });
    }
}

impl DerDecode for SubjectPublicKeyInfo {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        let mut seq = decoder.read_sequence()?;
        let algorithm = AlgorithmIdentifier::decode(&mut seq)?;
        let (unused_bits, key) = seq.read_bit_string()?;
        if unused_bits != 0 {
            return Err(SigningError::MalformedEncoding(
                "subjectPublicKey must be a whole number of octets".into(),
            ));
        }
        seq.expect_end("SubjectPublicKeyInfo")?;
        Ok(Self {
            algorithm,
            public_key: key.to_vec(),
        })
    }
}

/// The signed portion of a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TbsCertificate {
    pub version: u64,
    /// INTEGER content bytes (two's complement, minimal).
    pub serial_number: Vec<u8>,
    pub signature: AlgorithmIdentifier,
    pub issuer: DistinguishedName,
    pub not_before: i64,
    pub not_after: i64,
    pub subject: DistinguishedName,
    pub subject_public_key_info: SubjectPublicKeyInfo,
    pub extensions: Vec<Extension>,
}

impl DerEncode for TbsCertificate {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_sequence(|seq| {
            if self.version != 0 {
                seq.write_explicit(0, |v| {
                    v.write_u64(self.version);
                });
            }
            seq.write_tlv(tags::INTEGER, &self.serial_number);
            seq.write(&self.signature);
            seq.write(&self.issuer);
            seq.write_sequence(|validity| {
                validity.write_time(self.not_before);
                validity.write_time(self.not_after);
            });
            seq.write(&self.subject);
            seq.write(&self.subject_public_key_info);
            if !self.extensions.is_empty() {
                seq.write_explicit(3, |wrapper| {
                    wrapper.write_sequence(|exts| {
                        for ext in &self.extensions {
                            exts.write(ext);
                        }
                    });
                });
            }
        });
    }
}

impl DerDecode for TbsCertificate {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        let mut tbs = decoder.read_sequence()?;

        // version [0] EXPLICIT INTEGER DEFAULT v1
        let version = match tbs.try_read_context_specific(0, true)? {
            Some(tlv) => {
                let mut v = Decoder::new(tlv.value);
                let version = v.read_u64()?;
                v.expect_end("version")?;
                version
            }
            None => 0,
        };

        let serial_number = tbs.read_integer()?.to_vec();
        let signature = AlgorithmIdentifier::decode(&mut tbs)?;
        let issuer = DistinguishedName::decode(&mut tbs)?;

        let mut validity = tbs.read_sequence()?;
        let not_before = validity.read_time()?;
        let not_after = validity.read_time()?;
        validity.expect_end("Validity")?;

        let subject = DistinguishedName::decode(&mut tbs)?;
        let subject_public_key_info = SubjectPublicKeyInfo::decode(&mut tbs)?;

        // issuerUniqueID [1] / subjectUniqueID [2] are not produced here and are skipped.
        let _ = tbs.try_read_context_specific(1, false)?;
        let _ = tbs.try_read_context_specific(2, false)?;

        let mut extensions = Vec::new();
        if let Some(tlv) = tbs.try_read_context_specific(3, true)? {
            let mut wrapper = Decoder::new(tlv.value);
            let mut exts = wrapper.read_sequence()?;
            wrapper.expect_end("extensions")?;
            while !exts.is_empty() {
                extensions.push(Extension::decode(&mut exts)?);
            }
        }
        tbs.expect_end("TBSCertificate")?;

        Ok(Self {
            version,
            serial_number,
            signature,
            issuer,
            not_before,
            not_after,
            subject,
            subject_public_key_info,
            extensions,
        })
    }
}

/// An X.509 certificate together with its exact DER encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    pub tbs: TbsCertificate,
    pub signature_algorithm: AlgorithmIdentifier,
    pub signature_value: Vec<u8>,
    der: Vec<u8>,
    tbs_der: Vec<u8>,
}

impl Certificate {
    /// Assemble a certificate from a TBS structure and its signature.
    pub fn new(
        tbs: TbsCertificate,
        signature_algorithm: AlgorithmIdentifier,
        signature_value: Vec<u8>,
    ) -> Self {
        let tbs_der = tbs.to_der();
        let mut enc = Encoder::new();
        enc.write_sequence(|seq| {
            seq.write_raw(&tbs_der);
            seq.write(&signature_algorithm);
            seq.write_bit_string(0, &signature_value);
        });
        Self {
            tbs,
            signature_algorithm,
            signature_value,
            der: enc.finish(),
            tbs_der,
        }
    }

    /// Exact DER of the whole certificate.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Exact DER of the TBSCertificate, the input to the issuer's signature.
    pub fn tbs_der(&self) -> &[u8] {
        &self.tbs_der
    }

    pub fn serial_number(&self) -> &[u8] {
        &self.tbs.serial_number
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.tbs.issuer
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.tbs.subject
    }

    pub fn public_key_info(&self) -> &SubjectPublicKeyInfo {
        &self.tbs.subject_public_key_info
    }

    pub fn extension(&self, oid: &ObjectIdentifier) -> Option<&Extension> {
        self.tbs.extensions.iter().find(|ext| ext.oid == *oid)
    }

    pub fn basic_constraints(&self) -> SigningResult<Option<BasicConstraints>> {
        self.extension(&OID_BASIC_CONSTRAINTS)
            .map(|ext| BasicConstraints::parse(&ext.value))
            .transpose()
    }

    pub fn key_usage(&self) -> SigningResult<Option<KeyUsage>> {
        self.extension(&OID_KEY_USAGE)
            .map(|ext| KeyUsage::parse(&ext.value))
            .transpose()
    }

    pub fn extended_key_usage(&self) -> SigningResult<Option<ExtendedKeyUsage>> {
        self.extension(&OID_EXT_KEY_USAGE)
            .map(|ext| ExtendedKeyUsage::parse(&ext.value))
            .transpose()
    }

    pub fn subject_key_identifier(&self) -> Option<Vec<u8>> {
        self.extension(&OID_SUBJECT_KEY_IDENTIFIER)
            .and_then(|ext| parse_subject_key_identifier(&ext.value).ok())
    }

    /// Issuer and subject names are identical.
    pub fn is_self_issued(&self) -> bool {
        self.tbs.issuer == self.tbs.subject
    }

    pub fn is_ca(&self) -> bool {
        matches!(self.basic_constraints(), Ok(Some(bc)) if bc.is_ca)
    }

    /// True when `at` (UNIX seconds) lies within the validity period.
    pub fn is_valid_at(&self, at: i64) -> bool {
        (self.tbs.not_before..=self.tbs.not_after).contains(&at)
    }

    /// Hex SHA-256 of the DER encoding.
    pub fn fingerprint(&self) -> String {
        hex::encode(HashAlgorithm::Sha256.digest(&self.der).as_slice())
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Certificate(subject=\"{}\", serial={}, len={})",
            self.tbs.subject,
            hex::encode(&self.tbs.serial_number),
            self.der.len()
        )
    }
}

impl DerEncode for Certificate {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_raw(&self.der);
    }
}

impl DerDecode for Certificate {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        let outer = decoder.read_tlv()?;
        if !outer.tag.is_universal(tags::SEQUENCE) {
            return Err(SigningError::MalformedEncoding(format!(
                "expected Certificate SEQUENCE, found {}",
                outer.tag
            )));
        }
        let mut seq = Decoder::new(outer.value);

        let before = seq.remaining();
        let tbs = TbsCertificate::decode(&mut seq)?;
        let tbs_der = before[..before.len() - seq.remaining().len()].to_vec();

        let signature_algorithm = AlgorithmIdentifier::decode(&mut seq)?;
        let (unused_bits, signature) = seq.read_bit_string()?;
        if unused_bits != 0 {
            return Err(SigningError::MalformedEncoding(
                "certificate signature must be a whole number of octets".into(),
            ));
        }
        seq.expect_end("Certificate")?;

        Ok(Self {
            tbs,
            signature_algorithm,
            signature_value: signature.to_vec(),
            der: outer.raw.to_vec(),
            tbs_der,
        })
    }
}
