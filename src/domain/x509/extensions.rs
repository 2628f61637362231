//! X.509 v3 extensions used by the certificate builder and validator.

use crate::domain::asn1::{tags, DerDecode, DerEncode, Decoder, Encoder, ObjectIdentifier};
use crate::domain::constants::{
    OID_AUTHORITY_KEY_IDENTIFIER, OID_BASIC_CONSTRAINTS, OID_EXT_KEY_USAGE, OID_KEY_USAGE,
    OID_SUBJECT_KEY_IDENTIFIER,
};
use crate::infra::error::{SigningError, SigningResult};

/// `Extension ::= SEQUENCE { extnID, critical BOOLEAN DEFAULT FALSE, extnValue OCTET STRING }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// Contents of the extnValue OCTET STRING.
    pub value: Vec<u8>,
}

impl DerEncode for Extension {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_sequence(|seq| {
            seq.write_oid(&self.oid);
            if self.critical {
                seq.write_boolean(true);
            }
            seq.write_octet_string(&self.value);
        });
    }
}

impl DerDecode for Extension {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        let mut seq = decoder.read_sequence()?;
        let oid = seq.read_oid()?;
        let critical = if seq.next_is(tags::BOOLEAN) {
            let critical = seq.read_boolean()?;
            if !critical {
                return Err(SigningError::MalformedEncoding(
                    "DEFAULT FALSE critical flag must be omitted".into(),
                ));
            }
            critical
        } else {
            false
        };
        let value = seq.read_octet_string()?.to_vec();
        seq.expect_end("Extension")?;
        Ok(Self {
            oid,
            critical,
            value,
        })
    }
}

/// BasicConstraints (RFC 5280 §4.2.1.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub path_len_constraint: Option<u64>,
}

impl BasicConstraints {
    pub fn to_extension(&self, critical: bool) -> Extension {
        let mut enc = Encoder::new();
        enc.write_sequence(|seq| {
            if self.is_ca {
                seq.write_boolean(true);
            }
            if let Some(len) = self.path_len_constraint {
                seq.write_u64(len);
            }
        });
        Extension {
            oid: OID_BASIC_CONSTRAINTS,
            critical,
            value: enc.finish(),
        }
    }

    pub fn parse(value: &[u8]) -> SigningResult<Self> {
        let mut dec = Decoder::new(value);
        let mut seq = dec.read_sequence()?;
        let is_ca = if seq.next_is(tags::BOOLEAN) {
            seq.read_boolean()?
        } else {
            false
        };
        let path_len_constraint = if seq.is_empty() {
            None
        } else {
            Some(seq.read_u64()?)
        };
        seq.expect_end("BasicConstraints")?;
        dec.expect_end("basicConstraints extension")?;
        Ok(Self {
            is_ca,
            path_len_constraint,
        })
    }
}

/// KeyUsage (RFC 5280 §4.2.1.3) as a bit-flag mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub u16);

impl KeyUsage {
    // BIT STRING bit numbering: bit 0 = MSB of first byte (0x80).
    pub const DIGITAL_SIGNATURE: u16 = 0x0080;
    pub const NON_REPUDIATION: u16 = 0x0040;
    pub const KEY_ENCIPHERMENT: u16 = 0x0020;
    pub const DATA_ENCIPHERMENT: u16 = 0x0010;
    pub const KEY_AGREEMENT: u16 = 0x0008;
    pub const KEY_CERT_SIGN: u16 = 0x0004;
    pub const CRL_SIGN: u16 = 0x0002;
    pub const ENCIPHER_ONLY: u16 = 0x0001;
    pub const DECIPHER_ONLY: u16 = 0x8000;

    pub fn has(&self, flag: u16) -> bool {
        self.0 & flag != 0
    }

    /// Encode as a named BIT STRING with trailing zero bits removed.
    pub fn to_extension(&self, critical: bool) -> Extension {
        let bytes = [(self.0 & 0xFF) as u8, (self.0 >> 8) as u8];
        let used = if bytes[1] != 0 {
            2
        } else if bytes[0] != 0 {
            1
        } else {
            0
        };
        let data = &bytes[..used];
        let unused_bits = data.last().map_or(0, |b| b.trailing_zeros() as u8);
        let mut enc = Encoder::new();
        enc.write_bit_string(unused_bits, data);
        Extension {
            oid: OID_KEY_USAGE,
            critical,
            value: enc.finish(),
        }
    }

    pub fn parse(value: &[u8]) -> SigningResult<Self> {
        let mut dec = Decoder::new(value);
        let (unused_bits, data) = dec.read_bit_string()?;
        dec.expect_end("keyUsage extension")?;
        if data.len() > 2 {
            return Err(SigningError::MalformedEncoding(
                "keyUsage BIT STRING longer than 9 bits".into(),
            ));
        }
        let mut bytes = [0u8; 2];
        bytes[..data.len()].copy_from_slice(data);
        if let Some(last) = data.len().checked_sub(1) {
            bytes[last] &= 0xFFu8 << unused_bits;
        }
        Ok(KeyUsage(u16::from(bytes[0]) | (u16::from(bytes[1]) << 8)))
    }
}

/// ExtendedKeyUsage: `SEQUENCE OF KeyPurposeId`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub purposes: Vec<ObjectIdentifier>,
}

impl ExtendedKeyUsage {
    pub fn to_extension(&self, critical: bool) -> Extension {
        let mut enc = Encoder::new();
        enc.write_sequence(|seq| {
            for purpose in &self.purposes {
                seq.write_oid(purpose);
            }
        });
        Extension {
            oid: OID_EXT_KEY_USAGE,
            critical,
            value: enc.finish(),
        }
    }

    pub fn parse(value: &[u8]) -> SigningResult<Self> {
        let mut dec = Decoder::new(value);
        let mut seq = dec.read_sequence()?;
        let mut purposes = Vec::new();
        while !seq.is_empty() {
            purposes.push(seq.read_oid()?);
        }
        dec.expect_end("extKeyUsage extension")?;
        Ok(Self { purposes })
    }

    pub fn contains(&self, purpose: &ObjectIdentifier) -> bool {
        self.purposes.contains(purpose)
    }
}

/// subjectKeyIdentifier extension wrapping `key_id`.
pub fn subject_key_identifier(key_id: &[u8]) -> Extension {
    let mut enc = Encoder::new();
    enc.write_octet_string(key_id);
    Extension {
        oid: OID_SUBJECT_KEY_IDENTIFIER,
        critical: false,
        value: enc.finish(),
    }
}

pub fn parse_subject_key_identifier(value: &[u8]) -> SigningResult<Vec<u8>> {
    let mut dec = Decoder::new(value);
    let key_id = dec.read_octet_string()?.to_vec();
    dec.expect_end("subjectKeyIdentifier extension")?;
    Ok(key_id)
}

/// authorityKeyIdentifier carrying only `[0] keyIdentifier`.
pub fn authority_key_identifier(key_id: &[u8]) -> Extension {
    let mut enc = Encoder::new();
    enc.write_sequence(|seq| {
        seq.write_context_specific(0, false, key_id);
    });
    Extension {
        oid: OID_AUTHORITY_KEY_IDENTIFIER,
        critical: false,
        value: enc.finish(),
    }
}

/// keyIdentifier of an authorityKeyIdentifier extension, if present.
pub fn parse_authority_key_identifier(value: &[u8]) -> SigningResult<Option<Vec<u8>>> {
    let mut dec = Decoder::new(value);
    let mut seq = dec.read_sequence()?;
    let key_id = seq
        .try_read_context_specific(0, false)?
        .map(|tlv| tlv.value.to_vec());
    dec.expect_end("authorityKeyIdentifier extension")?;
    Ok(key_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::OID_KP_CODE_SIGNING;

    #[test]
    fn test_key_usage_digital_signature_encoding() {
        let ext = KeyUsage(KeyUsage::DIGITAL_SIGNATURE).to_extension(false);
        assert_eq!(ext.value, vec![0x03, 0x02, 0x07, 0x80]);
        let parsed = KeyUsage::parse(&ext.value).unwrap();
        assert!(parsed.has(KeyUsage::DIGITAL_SIGNATURE));
        assert!(!parsed.has(KeyUsage::KEY_CERT_SIGN));
    }

    #[test]
    fn test_key_usage_cert_sign_encoding() {
        let ext = KeyUsage(KeyUsage::KEY_CERT_SIGN | KeyUsage::CRL_SIGN).to_extension(true);
        assert_eq!(ext.value, vec![0x03, 0x02, 0x01, 0x06]);
    }

    #[test]
    fn test_basic_constraints_roundtrip() {
        let bc = BasicConstraints {
            is_ca: true,
            path_len_constraint: Some(0),
        };
        let ext = bc.to_extension(true);
        assert_eq!(ext.value, vec![0x30, 0x06, 0x01, 0x01, 0xFF, 0x02, 0x01, 0x00]);
        assert_eq!(BasicConstraints::parse(&ext.value).unwrap(), bc);

        let leaf = BasicConstraints {
            is_ca: false,
            path_len_constraint: None,
        };
        assert_eq!(leaf.to_extension(false).value, vec![0x30, 0x00]);
    }

    #[test]
    fn test_extended_key_usage() {
        let eku = ExtendedKeyUsage {
            purposes: vec![OID_KP_CODE_SIGNING],
        };
        let ext = eku.to_extension(true);
        assert!(ext.critical);
        let parsed = ExtendedKeyUsage::parse(&ext.value).unwrap();
        assert!(parsed.contains(&OID_KP_CODE_SIGNING));
    }

    #[test]
    fn test_extension_critical_flag_encoding() {
        let ext = subject_key_identifier(&[1, 2, 3]);
        let der = ext.to_der();
        assert_eq!(Extension::from_der(&der).unwrap(), ext);
        assert_eq!(parse_subject_key_identifier(&ext.value).unwrap(), vec![1, 2, 3]);

        let aki = authority_key_identifier(&[9, 9]);
        assert_eq!(
            parse_authority_key_identifier(&aki.value).unwrap(),
            Some(vec![9, 9])
        );
    }
}
