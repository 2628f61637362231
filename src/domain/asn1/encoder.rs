//! ASN.1 DER encoder.

use super::{tags, time, DerEncode, ObjectIdentifier, Tag};

/// A builder for constructing DER-encoded ASN.1 data.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Consume the encoder and return the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Write a TLV with a single-byte identifier.
    pub fn write_tlv(&mut self, tag: u8, value: &[u8]) -> &mut Self {
        self.buf.push(tag);
        self.write_length(value.len());
        self.buf.extend_from_slice(value);
        self
    }

    /// Write a TLV with an arbitrary (possibly high-number) tag.
    pub fn write_tagged(&mut self, tag: Tag, value: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(&tag.to_bytes());
        self.write_length(value.len());
        self.buf.extend_from_slice(value);
        self
    }

    /// Definite length in the shortest form.
    fn write_length(&mut self, length: usize) {
        if length < 0x80 {
            self.buf.push(length as u8);
            return;
        }
        let bytes = length.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        let significant = &bytes[skip..];
        self.buf.push(0x80 | significant.len() as u8);
        self.buf.extend_from_slice(significant);
    }

    /// Write a constructed element whose contents are produced by `body`.
    pub fn write_constructed<F>(&mut self, tag: u8, body: F) -> &mut Self
    where
        F: FnOnce(&mut Encoder),
    {
        let mut inner = Encoder::new();
        body(&mut inner);
        self.write_tlv(tag, &inner.buf)
    }

    /// Write a SEQUENCE whose contents are produced by `body`.
    pub fn write_sequence<F>(&mut self, body: F) -> &mut Self
    where
        F: FnOnce(&mut Encoder),
    {
        self.write_constructed(tags::SEQUENCE, body)
    }

    /// Write a SET OF, sorting the element encodings into DER canonical order.
    pub fn write_set_of<T: DerEncode>(&mut self, items: &[T]) -> &mut Self {
        let encoded: Vec<Vec<u8>> = items.iter().map(DerEncode::to_der).collect();
        self.write_set_of_encoded(encoded)
    }

    /// Write a SET OF from already encoded elements, sorted by their bytes.
    pub fn write_set_of_encoded(&mut self, mut encoded: Vec<Vec<u8>>) -> &mut Self {
        encoded.sort();
        self.write_tlv(tags::SET, &encoded.concat())
    }

    /// Minimal INTEGER content for a non-negative big-endian magnitude.
    ///
    /// Redundant leading zeros are stripped; a single 0x00 is kept when the
    /// high bit would otherwise make the value negative.
    pub fn integer_content(magnitude: &[u8]) -> Vec<u8> {
        let skip = magnitude.iter().take_while(|b| **b == 0).count();
        let trimmed = &magnitude[skip..];
        match trimmed.first() {
            None => vec![0x00],
            Some(first) if first & 0x80 != 0 => {
                let mut padded = Vec::with_capacity(trimmed.len() + 1);
                padded.push(0x00);
                padded.extend_from_slice(trimmed);
                padded
            }
            Some(_) => trimmed.to_vec(),
        }
    }

    /// Write a non-negative INTEGER from big-endian magnitude bytes.
    pub fn write_integer(&mut self, magnitude: &[u8]) -> &mut Self {
        let content = Self::integer_content(magnitude);
        self.write_tlv(tags::INTEGER, &content)
    }

    /// Write a non-negative INTEGER.
    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.write_integer(&value.to_be_bytes())
    }

    pub fn write_octet_string(&mut self, value: &[u8]) -> &mut Self {
        self.write_tlv(tags::OCTET_STRING, value)
    }

    /// Write a BIT STRING with the given unused_bits count.
    pub fn write_bit_string(&mut self, unused_bits: u8, value: &[u8]) -> &mut Self {
        let mut content = Vec::with_capacity(value.len() + 1);
        content.push(unused_bits);
        content.extend_from_slice(value);
        self.write_tlv(tags::BIT_STRING, &content)
    }

    pub fn write_oid(&mut self, oid: &ObjectIdentifier) -> &mut Self {
        self.write_tlv(tags::OID, oid.as_bytes())
    }

    pub fn write_null(&mut self) -> &mut Self {
        self.write_tlv(tags::NULL, &[])
    }

    pub fn write_boolean(&mut self, val: bool) -> &mut Self {
        self.write_tlv(tags::BOOLEAN, &[if val { 0xFF } else { 0x00 }])
    }

    pub fn write_utf8_string(&mut self, s: &str) -> &mut Self {
        self.write_tlv(tags::UTF8_STRING, s.as_bytes())
    }

    pub fn write_printable_string(&mut self, s: &str) -> &mut Self {
        self.write_tlv(tags::PRINTABLE_STRING, s.as_bytes())
    }

    /// Write `s` under a string `tag`, in that type's character encoding.
    ///
    /// Inverse of `Decoder::read_string`: BMPString is UTF-16BE, T61String
    /// one octet per character (characters above U+00FF become `?`).
    pub fn write_string(&mut self, tag: u8, s: &str) -> &mut Self {
        match tag {
            tags::BMP_STRING => {
                let value: Vec<u8> = s.encode_utf16().flat_map(u16::to_be_bytes).collect();
                self.write_tlv(tag, &value)
            }
            tags::T61_STRING => {
                let value: Vec<u8> = s
                    .chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                    .collect();
                self.write_tlv(tag, &value)
            }
            _ => self.write_tlv(tag, s.as_bytes()),
        }
    }

    /// Write a context-specific tagged value.
    pub fn write_context_specific(
        &mut self,
        tag_num: u8,
        constructed: bool,
        content: &[u8],
    ) -> &mut Self {
        let tag = tags::CONTEXT_SPECIFIC
            | (if constructed { tags::CONSTRUCTED } else { 0 })
            | (tag_num & 0x1F);
        self.write_tlv(tag, content)
    }

    /// Write an explicit `[tag_num]` wrapper around contents produced by `body`.
    pub fn write_explicit<F>(&mut self, tag_num: u8, body: F) -> &mut Self
    where
        F: FnOnce(&mut Encoder),
    {
        let mut inner = Encoder::new();
        body(&mut inner);
        self.write_context_specific(tag_num, true, &inner.buf)
    }

    /// Write a certificate validity time: UTCTime through 2049, GeneralizedTime after.
    pub fn write_time(&mut self, timestamp: i64) -> &mut Self {
        if time::fits_utc_time(timestamp) {
            let s = time::unix_to_utc_time(timestamp);
            self.write_tlv(tags::UTC_TIME, s.as_bytes())
        } else {
            self.write_generalized_time(timestamp)
        }
    }

    /// Write a GeneralizedTime (YYYYMMDDHHmmSSZ).
    pub fn write_generalized_time(&mut self, timestamp: i64) -> &mut Self {
        let s = time::unix_to_generalized_time(timestamp);
        self.write_tlv(tags::GENERALIZED_TIME, s.as_bytes())
    }

    /// Write raw bytes directly (already DER-encoded).
    pub fn write_raw(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    /// Write any encodable value.
    pub fn write<T: DerEncode + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.encode(self);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_long_lengths() {
        let mut enc = Encoder::new();
        enc.write_octet_string(&[0xAB; 3]);
        assert_eq!(enc.finish(), vec![0x04, 0x03, 0xAB, 0xAB, 0xAB]);

        let mut enc = Encoder::new();
        enc.write_octet_string(&[0u8; 200]);
        let out = enc.finish();
        assert_eq!(&out[..3], &[0x04, 0x81, 200]);

        let mut enc = Encoder::new();
        enc.write_octet_string(&[0u8; 300]);
        let out = enc.finish();
        assert_eq!(&out[..4], &[0x04, 0x82, 0x01, 0x2C]);
    }

    #[test]
    fn test_integer_is_minimal() {
        let mut enc = Encoder::new();
        enc.write_integer(&[0x00, 0x00, 0x01]);
        assert_eq!(enc.finish(), vec![0x02, 0x01, 0x01]);

        let mut enc = Encoder::new();
        enc.write_integer(&[0x80]);
        assert_eq!(enc.finish(), vec![0x02, 0x02, 0x00, 0x80]);

        let mut enc = Encoder::new();
        enc.write_u64(0);
        assert_eq!(enc.finish(), vec![0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_set_of_sorted() {
        struct Raw(Vec<u8>);
        impl DerEncode for Raw {
            fn encode(&self, encoder: &mut Encoder) {
                encoder.write_raw(&self.0);
            }
        }

        let items = vec![
            Raw(vec![0x04, 0x01, 0x02]),
            Raw(vec![0x02, 0x01, 0x05]),
            Raw(vec![0x04, 0x01, 0x01]),
        ];
        let mut enc = Encoder::new();
        enc.write_set_of(&items);
        assert_eq!(
            enc.finish(),
            vec![0x31, 0x09, 0x02, 0x01, 0x05, 0x04, 0x01, 0x01, 0x04, 0x01, 0x02]
        );
    }

    #[test]
    fn test_nested_sequence() {
        let mut enc = Encoder::new();
        enc.write_sequence(|seq| {
            seq.write_null();
            seq.write_boolean(true);
        });
        assert_eq!(
            enc.finish(),
            vec![0x30, 0x05, 0x05, 0x00, 0x01, 0x01, 0xFF]
        );
    }
}
