//! ASN.1 DER encoding and decoding.
//!
//! Covers the subset needed by X.509 certificates and CMS `SignedData`:
//! SEQUENCE, SET / SET OF, OBJECT IDENTIFIER, INTEGER, BOOLEAN, NULL,
//! OCTET STRING, BIT STRING, character strings, UTCTime / GeneralizedTime
//! and context-specific tags.
//!
//! Structures implement [`DerEncode`] and [`DerDecode`]; the top-level
//! helpers [`encode_der`] and [`decode_der`] apply the trailing-byte policy
//! selected through [`DecodeMode`].

mod decoder;
mod encoder;
mod oid;
mod tag;
mod time;

pub use decoder::{DecodeMode, Decoder};
pub use encoder::Encoder;
pub use oid::ObjectIdentifier;
pub use time::{datetime_to_unix, is_encodable, unix_to_datetime, TIME_MAX, TIME_MIN};

use crate::infra::error::{SigningError, SigningResult};

/// ASN.1 universal tag bytes.
pub mod tags {
    pub const BOOLEAN: u8 = 0x01;
    pub const INTEGER: u8 = 0x02;
    pub const BIT_STRING: u8 = 0x03;
    pub const OCTET_STRING: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const OID: u8 = 0x06;
    pub const UTF8_STRING: u8 = 0x0C;
    pub const PRINTABLE_STRING: u8 = 0x13;
    pub const T61_STRING: u8 = 0x14;
    pub const IA5_STRING: u8 = 0x16;
    pub const UTC_TIME: u8 = 0x17;
    pub const GENERALIZED_TIME: u8 = 0x18;
    pub const BMP_STRING: u8 = 0x1E;
    pub const SEQUENCE: u8 = 0x30;
    pub const SET: u8 = 0x31;
    pub const CONTEXT_SPECIFIC: u8 = 0x80;
    pub const CONSTRUCTED: u8 = 0x20;
}

/// Represents a parsed ASN.1 tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub class: TagClass,
    pub constructed: bool,
    pub number: u32,
}

/// ASN.1 tag class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

/// A borrowed ASN.1 TLV element.
///
/// `raw` spans the complete element (identifier, length and contents) so
/// callers can keep byte-exact copies of signed regions.
#[derive(Debug, Clone)]
pub struct Tlv<'a> {
    pub tag: Tag,
    pub value: &'a [u8],
    pub raw: &'a [u8],
}

/// Types with a DER encoding.
pub trait DerEncode {
    /// Append the DER encoding of `self` to `encoder`.
    fn encode(&self, encoder: &mut Encoder);

    /// DER encoding of `self` as an owned buffer.
    fn to_der(&self) -> Vec<u8> {
        let mut encoder = Encoder::new();
        self.encode(&mut encoder);
        encoder.finish()
    }
}

/// Types that can be decoded from DER.
pub trait DerDecode: Sized {
    /// Decode one value from the front of `decoder`.
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self>;

    /// Decode a complete DER buffer, rejecting trailing bytes.
    fn from_der(bytes: &[u8]) -> SigningResult<Self> {
        decode_der(bytes, DecodeMode::Strict)
    }
}

/// Encode any [`DerEncode`] value.
pub fn encode_der<T: DerEncode + ?Sized>(value: &T) -> Vec<u8> {
    value.to_der()
}

/// Decode a top-level value, applying `mode` to bytes left after it.
pub fn decode_der<T: DerDecode>(bytes: &[u8], mode: DecodeMode) -> SigningResult<T> {
    let mut decoder = Decoder::new(bytes);
    let value = T::decode(&mut decoder)?;
    let trailing = decoder.remaining().len();
    if trailing > 0 {
        match mode {
            DecodeMode::Strict => {
                return Err(SigningError::MalformedEncoding(format!(
                    "{trailing} trailing bytes after top-level element"
                )));
            }
            DecodeMode::Lenient => {
                log::warn!(
                    "Ignoring {trailing} trailing bytes after top-level DER element ({} declared)",
                    bytes.len() - trailing
                );
            }
        }
    }
    Ok(value)
}
