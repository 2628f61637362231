//! ASN.1 tag parsing and encoding.

use super::{Tag, TagClass};
use crate::infra::error::{SigningError, SigningResult};

impl Tag {
    /// Universal, primitive tag.
    #[must_use]
    pub const fn universal(number: u32) -> Self {
        Self {
            class: TagClass::Universal,
            constructed: false,
            number,
        }
    }

    /// Context-specific tag `[number]`.
    #[must_use]
    pub const fn context(number: u32, constructed: bool) -> Self {
        Self {
            class: TagClass::ContextSpecific,
            constructed,
            number,
        }
    }

    /// Parse a tag from the first bytes of `input`.
    /// Returns the tag and number of bytes consumed.
    pub fn from_bytes(input: &[u8]) -> SigningResult<(Self, usize)> {
        let Some(&first) = input.first() else {
            return Err(SigningError::MalformedEncoding(
                "unexpected end of input while reading tag".into(),
            ));
        };

        let class = match (first >> 6) & 0x03 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        };
        let constructed = (first & 0x20) != 0;

        let low_bits = first & 0x1F;
        if low_bits < 0x1F {
            return Ok((
                Tag {
                    class,
                    constructed,
                    number: u32::from(low_bits),
                },
                1,
            ));
        }

        // High tag number form; DER forbids leading 0x80 padding and numbers < 31.
        let mut number: u32 = 0;
        let mut i = 1;
        loop {
            let Some(&byte) = input.get(i) else {
                return Err(SigningError::MalformedEncoding(
                    "truncated high tag number".into(),
                ));
            };
            if i == 1 && byte == 0x80 {
                return Err(SigningError::MalformedEncoding(
                    "non-minimal high tag number".into(),
                ));
            }
            number = number
                .checked_mul(128)
                .ok_or_else(|| SigningError::MalformedEncoding("tag number overflow".into()))?
                | u32::from(byte & 0x7F);
            i += 1;
            if (byte & 0x80) == 0 {
                break;
            }
        }
        if number < 0x1F {
            return Err(SigningError::MalformedEncoding(
                "high tag form used for low tag number".into(),
            ));
        }
        Ok((
            Tag {
                class,
                constructed,
                number,
            },
            i,
        ))
    }

    /// Encode this tag to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let class_bits = match self.class {
            TagClass::Universal => 0x00,
            TagClass::Application => 0x40,
            TagClass::ContextSpecific => 0x80,
            TagClass::Private => 0xC0,
        };
        let constructed_bit = if self.constructed { 0x20 } else { 0x00 };

        if self.number < 0x1F {
            return vec![class_bits | constructed_bit | (self.number as u8)];
        }

        let mut result = vec![class_bits | constructed_bit | 0x1F];
        let mut groups = Vec::new();
        let mut num = self.number;
        while num > 0 {
            groups.push((num & 0x7F) as u8);
            num >>= 7;
        }
        groups.reverse();
        let last = groups.len() - 1;
        for (i, b) in groups.iter().enumerate() {
            result.push(if i < last { b | 0x80 } else { *b });
        }
        result
    }

    /// True when this is the universal tag with the given single-byte encoding.
    #[must_use]
    pub fn is_universal(&self, tag_byte: u8) -> bool {
        self.class == TagClass::Universal
            && self.number == u32::from(tag_byte & 0x1F)
            && self.constructed == ((tag_byte & 0x20) != 0)
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.class {
            TagClass::Universal => write!(f, "UNIVERSAL {}", self.number),
            TagClass::Application => write!(f, "[APPLICATION {}]", self.number),
            TagClass::ContextSpecific => write!(f, "[{}]", self.number),
            TagClass::Private => write!(f, "[PRIVATE {}]", self.number),
        }
    }
}
