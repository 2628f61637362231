//! ASN.1 DER decoder.

use super::{tags, time, ObjectIdentifier, Tag, TagClass, Tlv};
use crate::infra::error::{SigningError, SigningResult};

/// Trailing-byte policy for top-level decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Any byte after the top-level element is an error.
    #[default]
    Strict,
    /// Bytes after the top-level element are logged and ignored.
    Lenient,
}

fn malformed(msg: impl Into<String>) -> SigningError {
    SigningError::MalformedEncoding(msg.into())
}

/// A streaming ASN.1 DER decoder.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder over the given data.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the remaining undecoded bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Fail unless every byte has been consumed.
    pub fn expect_end(&self, context: &str) -> SigningResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(malformed(format!(
                "{} unexpected bytes at end of {context}",
                self.data.len() - self.pos
            )))
        }
    }

    /// Parse the next TLV element.
    pub fn read_tlv(&mut self) -> SigningResult<Tlv<'a>> {
        let start = self.pos;
        let (tag, tag_len) = Tag::from_bytes(&self.data[self.pos..])?;
        self.pos += tag_len;

        let length = self.read_length()?;
        let end = self
            .pos
            .checked_add(length)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                malformed(format!(
                    "element {tag} declares {length} bytes but only {} remain",
                    self.data.len() - self.pos
                ))
            })?;

        let value = &self.data[self.pos..end];
        let raw = &self.data[start..end];
        self.pos = end;

        Ok(Tlv { tag, value, raw })
    }

    /// Parse a DER length, rejecting indefinite and non-minimal forms.
    fn read_length(&mut self) -> SigningResult<usize> {
        let Some(&first) = self.data.get(self.pos) else {
            return Err(malformed("unexpected end of input while reading length"));
        };
        self.pos += 1;

        if first < 0x80 {
            return Ok(usize::from(first));
        }
        if first == 0x80 {
            return Err(malformed("indefinite length is not allowed in DER"));
        }
        let num_bytes = usize::from(first & 0x7F);
        if num_bytes > std::mem::size_of::<usize>() {
            return Err(malformed(format!("length of {num_bytes} octets is too large")));
        }
        let bytes = self
            .data
            .get(self.pos..self.pos + num_bytes)
            .ok_or_else(|| malformed("truncated length"))?;
        if bytes[0] == 0 {
            return Err(malformed("non-minimal length: leading zero octet"));
        }
        let length = bytes
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
        if length < 0x80 {
            return Err(malformed(format!(
                "non-minimal length: {length} encoded in long form"
            )));
        }
        self.pos += num_bytes;
        Ok(length)
    }

    /// Peek at the next tag without consuming it.
    pub fn peek_tag(&self) -> SigningResult<Tag> {
        let (tag, _) = Tag::from_bytes(self.remaining())?;
        Ok(tag)
    }

    /// True when the next element carries the given universal tag byte.
    pub fn next_is(&self, tag_byte: u8) -> bool {
        self.peek_tag().is_ok_and(|t| t.is_universal(tag_byte))
    }

    fn read_expected(&mut self, tag_byte: u8, what: &str) -> SigningResult<Tlv<'a>> {
        let tlv = self.read_tlv()?;
        if !tlv.tag.is_universal(tag_byte) {
            return Err(malformed(format!("expected {what}, found {}", tlv.tag)));
        }
        Ok(tlv)
    }

    /// Read the next element and return its complete encoding.
    pub fn read_raw_element(&mut self) -> SigningResult<&'a [u8]> {
        Ok(self.read_tlv()?.raw)
    }

    /// Read an INTEGER and return its content bytes (two's complement).
    pub fn read_integer(&mut self) -> SigningResult<&'a [u8]> {
        let tlv = self.read_expected(tags::INTEGER, "INTEGER")?;
        match tlv.value {
            [] => Err(malformed("empty INTEGER")),
            [0x00, next, ..] if next & 0x80 == 0 => Err(malformed("non-minimal INTEGER")),
            [0xFF, next, ..] if next & 0x80 != 0 => Err(malformed("non-minimal INTEGER")),
            value => Ok(value),
        }
    }

    /// Read a non-negative INTEGER that fits in a u64.
    pub fn read_u64(&mut self) -> SigningResult<u64> {
        let value = self.read_integer()?;
        if value[0] & 0x80 != 0 {
            return Err(malformed("negative INTEGER where unsigned expected"));
        }
        let magnitude = if value[0] == 0 { &value[1..] } else { value };
        if magnitude.len() > 8 {
            return Err(malformed("INTEGER too large"));
        }
        Ok(magnitude.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    pub fn read_octet_string(&mut self) -> SigningResult<&'a [u8]> {
        Ok(self.read_expected(tags::OCTET_STRING, "OCTET STRING")?.value)
    }

    /// Read a BIT STRING and return (unused_bits, data).
    pub fn read_bit_string(&mut self) -> SigningResult<(u8, &'a [u8])> {
        let tlv = self.read_expected(tags::BIT_STRING, "BIT STRING")?;
        let Some((&unused, data)) = tlv.value.split_first() else {
            return Err(malformed("empty BIT STRING"));
        };
        if unused > 7 || (data.is_empty() && unused != 0) {
            return Err(malformed(format!("invalid BIT STRING unused bits {unused}")));
        }
        Ok((unused, data))
    }

    pub fn read_oid(&mut self) -> SigningResult<ObjectIdentifier> {
        let tlv = self.read_expected(tags::OID, "OBJECT IDENTIFIER")?;
        ObjectIdentifier::from_der_value(tlv.value)
    }

    pub fn read_null(&mut self) -> SigningResult<()> {
        let tlv = self.read_expected(tags::NULL, "NULL")?;
        if !tlv.value.is_empty() {
            return Err(malformed("NULL with non-empty contents"));
        }
        Ok(())
    }

    /// Read a BOOLEAN value (DER: 0x00=false, 0xFF=true).
    pub fn read_boolean(&mut self) -> SigningResult<bool> {
        let tlv = self.read_expected(tags::BOOLEAN, "BOOLEAN")?;
        match tlv.value {
            [0x00] => Ok(false),
            [0xFF] => Ok(true),
            _ => Err(malformed("BOOLEAN must be a single 0x00 or 0xFF octet")),
        }
    }

    /// Read a SEQUENCE, returning a sub-decoder over its contents.
    pub fn read_sequence(&mut self) -> SigningResult<Decoder<'a>> {
        let tlv = self.read_expected(tags::SEQUENCE, "SEQUENCE")?;
        Ok(Decoder::new(tlv.value))
    }

    /// Read a SET, returning a sub-decoder over its contents.
    pub fn read_set(&mut self) -> SigningResult<Decoder<'a>> {
        let tlv = self.read_expected(tags::SET, "SET")?;
        Ok(Decoder::new(tlv.value))
    }

    /// Read a context-specific tagged value with the expected tag number.
    pub fn read_context_specific(
        &mut self,
        tag_num: u32,
        constructed: bool,
    ) -> SigningResult<Tlv<'a>> {
        let tlv = self.read_tlv()?;
        if tlv.tag != Tag::context(tag_num, constructed) {
            return Err(malformed(format!(
                "expected [{tag_num}], found {}",
                tlv.tag
            )));
        }
        Ok(tlv)
    }

    /// Try to read a context-specific tagged value. Returns `None` if
    /// the next tag does not match, without consuming any bytes.
    pub fn try_read_context_specific(
        &mut self,
        tag_num: u32,
        constructed: bool,
    ) -> SigningResult<Option<Tlv<'a>>> {
        if self.is_empty() {
            return Ok(None);
        }
        if self.peek_tag()? == Tag::context(tag_num, constructed) {
            Ok(Some(self.read_tlv()?))
        } else {
            Ok(None)
        }
    }

    /// Read a string and return it with its tag byte.
    ///
    /// Supports UTF8String, PrintableString, IA5String, T61String and BMPString.
    pub fn read_string(&mut self) -> SigningResult<(String, u8)> {
        let tlv = self.read_tlv()?;
        if tlv.tag.class != TagClass::Universal || tlv.tag.constructed {
            return Err(malformed(format!("expected string, found {}", tlv.tag)));
        }
        let tag_byte = u8::try_from(tlv.tag.number)
            .map_err(|_| malformed(format!("unsupported string type {}", tlv.tag)))?;
        let text = match tag_byte {
            tags::UTF8_STRING | tags::PRINTABLE_STRING | tags::IA5_STRING => {
                String::from_utf8(tlv.value.to_vec())
                    .map_err(|_| malformed("string is not valid UTF-8"))?
            }
            tags::T61_STRING => tlv.value.iter().map(|&b| char::from(b)).collect(),
            tags::BMP_STRING => {
                if tlv.value.len() % 2 != 0 {
                    return Err(malformed("BMPString has odd length"));
                }
                let units: Vec<u16> = tlv
                    .value
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&units).map_err(|_| malformed("invalid BMPString"))?
            }
            _ => return Err(malformed(format!("unsupported string type {}", tlv.tag))),
        };
        Ok((text, tag_byte))
    }

    /// Read a Time value (UTCTime or GeneralizedTime) as a UNIX timestamp.
    pub fn read_time(&mut self) -> SigningResult<i64> {
        let tlv = self.read_tlv()?;
        let s = std::str::from_utf8(tlv.value).map_err(|_| malformed("time is not ASCII"))?;
        if tlv.tag.is_universal(tags::UTC_TIME) {
            time::parse_utc_time(s)
        } else if tlv.tag.is_universal(tags::GENERALIZED_TIME) {
            time::parse_generalized_time(s)
        } else {
            Err(malformed(format!("expected Time, found {}", tlv.tag)))
        }
    }
}
