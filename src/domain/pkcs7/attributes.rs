//! CMS attributes and the signed-attribute set.
//!
//! The signature over signed attributes covers their DER encoding re-tagged
//! as a SET (RFC 5652 §5.4), so the exact bytes are kept from construction or
//! decoding and never re-derived.

use std::fmt;

use crate::domain::asn1::{tags, DerDecode, DerEncode, Decoder, Encoder, ObjectIdentifier, Tag};
use crate::domain::constants::{OID_CONTENT_TYPE, OID_MESSAGE_DIGEST, OID_SIGNING_TIME};
use crate::infra::error::{SigningError, SigningResult};

/// `Attribute ::= SEQUENCE { attrType OID, attrValues SET OF AttributeValue }`
#[derive(Clone, PartialEq, Eq)]
pub struct Attribute {
    pub oid: ObjectIdentifier,
    /// Complete DER encodings of each value.
    pub values: Vec<Vec<u8>>,
}

impl Attribute {
    pub fn content_type(content_type: &ObjectIdentifier) -> Self {
        Self {
            oid: OID_CONTENT_TYPE,
            values: vec![content_type.to_der()],
        }
    }

    pub fn message_digest(digest: &[u8]) -> Self {
        let mut enc = Encoder::new();
        enc.write_octet_string(digest);
        Self {
            oid: OID_MESSAGE_DIGEST,
            values: vec![enc.finish()],
        }
    }

    pub fn signing_time(timestamp: i64) -> Self {
        let mut enc = Encoder::new();
        enc.write_time(timestamp);
        Self {
            oid: OID_SIGNING_TIME,
            values: vec![enc.finish()],
        }
    }

    /// The single value of this attribute; multi-valued attributes are rejected.
    fn single_value(&self) -> SigningResult<&[u8]> {
        match self.values.as_slice() {
            [value] => Ok(value),
            _ => Err(SigningError::MalformedEncoding(format!(
                "attribute {} must have exactly one value, found {}",
                self.oid,
                self.values.len()
            ))),
        }
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute(oid={}, values={})", self.oid, self.values.len())
    }
}

impl DerEncode for Attribute {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_sequence(|seq| {
            seq.write_oid(&self.oid);
            seq.write_set_of_encoded(self.values.clone());
        });
    }
}

impl DerDecode for Attribute {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        let mut seq = decoder.read_sequence()?;
        let oid = seq.read_oid()?;
        let mut set = seq.read_set()?;
        let mut values = Vec::new();
        while !set.is_empty() {
            values.push(set.read_raw_element()?.to_vec());
        }
        seq.expect_end("Attribute")?;
        Ok(Self { oid, values })
    }
}

/// Decode the attributes held inside an IMPLICIT `[n]` SET OF Attribute.
pub(crate) fn decode_attribute_list(contents: &[u8]) -> SigningResult<Vec<Attribute>> {
    let mut dec = Decoder::new(contents);
    let mut attrs = Vec::new();
    while !dec.is_empty() {
        attrs.push(Attribute::decode(&mut dec)?);
    }
    Ok(attrs)
}

/// Signed attributes with their exact `[0] IMPLICIT` encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedAttributes {
    ordered: Vec<Attribute>,
    /// Complete `[0]` element as it appears inside SignerInfo.
    der: Vec<u8>,
}

impl SignedAttributes {
    /// Build from attributes, sorting them into DER SET order.
    #[must_use]
    pub fn new(attrs: Vec<Attribute>) -> Self {
        let mut encoded: Vec<(Vec<u8>, Attribute)> =
            attrs.into_iter().map(|a| (a.to_der(), a)).collect();
        encoded.sort_by(|a, b| a.0.cmp(&b.0));
        let concatenated: Vec<u8> = encoded.iter().flat_map(|(der, _)| der.clone()).collect();
        let mut enc = Encoder::new();
        enc.write_context_specific(0, true, &concatenated);
        Self {
            ordered: encoded.into_iter().map(|(_, a)| a).collect(),
            der: enc.finish(),
        }
    }

    /// Decode from the `[0]` element, keeping its bytes unchanged.
    pub fn from_implicit(raw: &[u8]) -> SigningResult<Self> {
        let mut dec = Decoder::new(raw);
        let tlv = dec.read_context_specific(0, true)?;
        dec.expect_end("signedAttrs")?;
        let ordered = decode_attribute_list(tlv.value)?;
        if ordered.is_empty() {
            return Err(SigningError::MalformedEncoding(
                "signedAttrs must contain at least one attribute".into(),
            ));
        }
        Ok(Self {
            ordered,
            der: raw.to_vec(),
        })
    }

    #[must_use]
    pub fn ordered(&self) -> &[Attribute] {
        &self.ordered
    }

    /// The `[0] IMPLICIT` encoding stored in SignerInfo.
    #[must_use]
    pub fn implicit_der(&self) -> &[u8] {
        &self.der
    }

    /// Bytes covered by the signature: the same encoding re-tagged as SET.
    #[must_use]
    pub fn signature_input(&self) -> Vec<u8> {
        let mut input = self.der.clone();
        if let Some(first) = input.first_mut() {
            *first = tags::SET;
        }
        input
    }

    pub fn get(&self, oid: &ObjectIdentifier) -> Option<&Attribute> {
        self.ordered.iter().find(|a| a.oid == *oid)
    }

    /// messageDigest attribute value.
    pub fn message_digest(&self) -> SigningResult<Option<Vec<u8>>> {
        let Some(attr) = self.get(&OID_MESSAGE_DIGEST) else {
            return Ok(None);
        };
        let mut dec = Decoder::new(attr.single_value()?);
        let digest = dec.read_octet_string()?.to_vec();
        dec.expect_end("messageDigest")?;
        Ok(Some(digest))
    }

    /// contentType attribute value.
    pub fn content_type(&self) -> SigningResult<Option<ObjectIdentifier>> {
        let Some(attr) = self.get(&OID_CONTENT_TYPE) else {
            return Ok(None);
        };
        Ok(Some(ObjectIdentifier::from_der(attr.single_value()?)?))
    }

    /// signingTime attribute value as UNIX seconds.
    pub fn signing_time(&self) -> SigningResult<Option<i64>> {
        let Some(attr) = self.get(&OID_SIGNING_TIME) else {
            return Ok(None);
        };
        let mut dec = Decoder::new(attr.single_value()?);
        let time = dec.read_time()?;
        dec.expect_end("signingTime")?;
        Ok(Some(time))
    }
}

impl fmt::Debug for SignedAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignedAttributes(count={}, total_len={})",
            self.ordered.len(),
            self.der.len()
        )
    }
}

impl DerEncode for SignedAttributes {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_raw(&self.der);
    }
}

/// Encode unsigned attributes as `[1] IMPLICIT SET OF Attribute`.
pub(crate) fn encode_unsigned_attributes(attrs: &[Attribute], encoder: &mut Encoder) {
    let mut encoded: Vec<Vec<u8>> = attrs.iter().map(DerEncode::to_der).collect();
    encoded.sort();
    encoder.write_tagged(Tag::context(1, true), &encoded.concat());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::OID_DATA;

    #[test]
    fn test_attributes_are_sorted() {
        let attrs = SignedAttributes::new(vec![
            Attribute::message_digest(&[0xAA; 32]),
            Attribute::signing_time(1_736_942_400),
            Attribute::content_type(&OID_DATA),
        ]);
        // SET OF order compares whole encodings, so the shorter signingTime
        // (30 1C) sorts before messageDigest (30 2F).
        let content_type = hex::decode(
            "3018\
             06092a864886f70d010903\
             310b06092a864886f70d010701",
        )
        .unwrap();
        let signing_time = hex::decode(
            "301c\
             06092a864886f70d010905\
             310f170d3235303131353132303030305a",
        )
        .unwrap();
        let mut message_digest = hex::decode(
            "302f\
             06092a864886f70d010904\
             31220420",
        )
        .unwrap();
        message_digest.extend_from_slice(&[0xAA; 32]);

        let ordered: Vec<Vec<u8>> = attrs.ordered().iter().map(DerEncode::to_der).collect();
        assert_eq!(ordered, vec![content_type, signing_time, message_digest]);
        let oids: Vec<_> = attrs.ordered().iter().map(|a| a.oid.clone()).collect();
        assert_eq!(oids, vec![OID_CONTENT_TYPE, OID_SIGNING_TIME, OID_MESSAGE_DIGEST]);
        assert_eq!(attrs.implicit_der()[0], 0xA0);
        assert_eq!(attrs.signature_input()[0], 0x31);
        assert_eq!(attrs.signature_input()[1..], attrs.implicit_der()[1..]);
    }

    #[test]
    fn test_accessors() {
        let attrs = SignedAttributes::new(vec![
            Attribute::content_type(&OID_DATA),
            Attribute::message_digest(&[0x01, 0x02]),
            Attribute::signing_time(1_736_942_400),
        ]);
        assert_eq!(attrs.content_type().unwrap(), Some(OID_DATA));
        assert_eq!(attrs.message_digest().unwrap(), Some(vec![0x01, 0x02]));
        assert_eq!(attrs.signing_time().unwrap(), Some(1_736_942_400));
    }

    #[test]
    fn test_decode_keeps_wire_bytes() {
        // Deliberately out of DER order: messageDigest before contentType.
        let digest = Attribute::message_digest(&[0x05]).to_der();
        let content_type = Attribute::content_type(&OID_DATA).to_der();
        let mut enc = Encoder::new();
        enc.write_context_specific(0, true, &[digest, content_type].concat());
        let raw = enc.finish();

        let attrs = SignedAttributes::from_implicit(&raw).unwrap();
        assert_eq!(attrs.implicit_der(), raw.as_slice());
        assert_eq!(attrs.ordered()[0].oid, OID_MESSAGE_DIGEST);
    }

    #[test]
    fn test_multi_valued_digest_is_rejected() {
        let mut attr = Attribute::message_digest(&[0x01]);
        attr.values.push(attr.values[0].clone());
        let attrs = SignedAttributes::new(vec![attr]);
        assert!(attrs.message_digest().is_err());
    }
}
