//! CMS `SignerInfo` and signer identifiers.

use std::fmt;

use super::attributes::{decode_attribute_list, encode_unsigned_attributes, Attribute, SignedAttributes};
use crate::domain::asn1::{tags, DerDecode, DerEncode, Decoder, Encoder};
use crate::domain::crypto::AlgorithmIdentifier;
use crate::domain::x509::{Certificate, DistinguishedName};
use crate::infra::error::{SigningError, SigningResult};

/// `SignerIdentifier ::= CHOICE { issuerAndSerialNumber, [0] subjectKeyIdentifier }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerIdentifier {
    IssuerAndSerialNumber {
        issuer: DistinguishedName,
        /// INTEGER content bytes.
        serial_number: Vec<u8>,
    },
    SubjectKeyIdentifier(Vec<u8>),
}

impl SignerIdentifier {
    pub fn issuer_and_serial(cert: &Certificate) -> Self {
        SignerIdentifier::IssuerAndSerialNumber {
            issuer: cert.issuer().clone(),
            serial_number: cert.serial_number().to_vec(),
        }
    }

    /// SignerInfo version implied by this identifier (RFC 5652 §5.3).
    pub fn signer_info_version(&self) -> u64 {
        match self {
            SignerIdentifier::IssuerAndSerialNumber { .. } => 1,
            SignerIdentifier::SubjectKeyIdentifier(_) => 3,
        }
    }

    /// True when `cert` is the certificate this identifier names.
    pub fn matches(&self, cert: &Certificate) -> bool {
        match self {
            SignerIdentifier::IssuerAndSerialNumber {
                issuer,
                serial_number,
            } => cert.issuer() == issuer && cert.serial_number() == serial_number.as_slice(),
            SignerIdentifier::SubjectKeyIdentifier(key_id) => {
                cert.subject_key_identifier().as_deref() == Some(key_id.as_slice())
            }
        }
    }
}

impl fmt::Display for SignerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerIdentifier::IssuerAndSerialNumber {
                issuer,
                serial_number,
            } => write!(f, "issuer \"{issuer}\", serial {}", hex::encode(serial_number)),
            SignerIdentifier::SubjectKeyIdentifier(key_id) => {
                write!(f, "subject key identifier {}", hex::encode(key_id))
            }
        }
    }
}

impl DerEncode for SignerIdentifier {
    fn encode(&self, encoder: &mut Encoder) {
        match self {
            SignerIdentifier::IssuerAndSerialNumber {
                issuer,
                serial_number,
            } => {
                encoder.write_sequence(|seq| {
                    seq.write(issuer);
                    seq.write_tlv(tags::INTEGER, serial_number);
                });
            }
            SignerIdentifier::SubjectKeyIdentifier(key_id) => {
                encoder.write_context_specific(0, false, key_id);
            }
        }
    }
}

impl DerDecode for SignerIdentifier {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        if let Some(tlv) = decoder.try_read_context_specific(0, false)? {
            return Ok(SignerIdentifier::SubjectKeyIdentifier(tlv.value.to_vec()));
        }
        let mut seq = decoder.read_sequence()?;
        let issuer = DistinguishedName::decode(&mut seq)?;
        let serial_number = seq.read_integer()?.to_vec();
        seq.expect_end("IssuerAndSerialNumber")?;
        Ok(SignerIdentifier::IssuerAndSerialNumber {
            issuer,
            serial_number,
        })
    }
}

/// One signer's contribution to a SignedData.
#[derive(Clone, PartialEq, Eq)]
pub struct SignerInfo {
    pub version: u64,
    pub sid: SignerIdentifier,
    pub digest_algorithm: AlgorithmIdentifier,
    pub signed_attrs: Option<SignedAttributes>,
    pub signature_algorithm: AlgorithmIdentifier,
    pub signature: Vec<u8>,
    pub unsigned_attrs: Option<Vec<Attribute>>,
}

impl fmt::Debug for SignerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerInfo")
            .field("version", &self.version)
            .field("sid", &self.sid.to_string())
            .field("digest_algorithm", &self.digest_algorithm.to_string())
            .field("signature_algorithm", &self.signature_algorithm.to_string())
            .field("signed_attrs", &self.signed_attrs)
            .field("signature_len", &self.signature.len())
            .finish()
    }
}

impl DerEncode for SignerInfo {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_sequence(|seq| {
            seq.write_u64(self.version);
            seq.write(&self.sid);
            seq.write(&self.digest_algorithm);
            if let Some(attrs) = &self.signed_attrs {
                seq.write(attrs);
            }
            seq.write(&self.signature_algorithm);
            seq.write_octet_string(&self.signature);
            if let Some(attrs) = &self.unsigned_attrs {
                encode_unsigned_attributes(attrs, seq);
            }
        });
    }
}

impl DerDecode for SignerInfo {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        let mut seq = decoder.read_sequence()?;
        let version = seq.read_u64()?;
        let sid = SignerIdentifier::decode(&mut seq)?;
        if version != sid.signer_info_version() {
            return Err(SigningError::MalformedEncoding(format!(
                "SignerInfo version {version} does not match its signer identifier ({sid})"
            )));
        }
        let digest_algorithm = AlgorithmIdentifier::decode(&mut seq)?;
        let signed_attrs = match seq.try_read_context_specific(0, true)? {
            Some(tlv) => Some(SignedAttributes::from_implicit(tlv.raw)?),
            None => None,
        };
        let signature_algorithm = AlgorithmIdentifier::decode(&mut seq)?;
        let signature = seq.read_octet_string()?.to_vec();
        let unsigned_attrs = match seq.try_read_context_specific(1, true)? {
            Some(tlv) => Some(decode_attribute_list(tlv.value)?),
            None => None,
        };
        seq.expect_end("SignerInfo")?;
        Ok(Self {
            version,
            sid,
            digest_algorithm,
            signed_attrs,
            signature_algorithm,
            signature,
            unsigned_attrs,
        })
    }
}
