//! OBJECT IDENTIFIER values.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use super::{DerDecode, DerEncode, Decoder, Encoder};
use crate::infra::error::{SigningError, SigningResult};

/// An OBJECT IDENTIFIER holding its DER content bytes.
///
/// Equality is byte equality of the DER value, which for valid encodings is
/// equality of the arc sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdentifier {
    der: Cow<'static, [u8]>,
}

impl ObjectIdentifier {
    /// Wrap known-good DER content bytes. Used for compile-time constants.
    pub const fn from_static(der: &'static [u8]) -> Self {
        Self {
            der: Cow::Borrowed(der),
        }
    }

    /// Build an OID from its arcs. At least two arcs are required.
    pub fn from_arcs(arcs: &[u64]) -> SigningResult<Self> {
        if arcs.len() < 2 || arcs[0] > 2 || (arcs[0] < 2 && arcs[1] >= 40) {
            return Err(SigningError::InvalidInput(format!(
                "invalid OID arcs {arcs:?}"
            )));
        }
        let first = arcs[0]
            .checked_mul(40)
            .and_then(|v| v.checked_add(arcs[1]))
            .ok_or_else(|| SigningError::InvalidInput("OID arc overflow".into()))?;
        let mut der = Vec::new();
        push_base128(&mut der, first);
        for &arc in &arcs[2..] {
            push_base128(&mut der, arc);
        }
        Ok(Self {
            der: Cow::Owned(der),
        })
    }

    /// Wrap DER content bytes after checking they form a valid OID.
    pub fn from_der_value(der: &[u8]) -> SigningResult<Self> {
        if der.is_empty() {
            return Err(SigningError::MalformedEncoding("empty OID".into()));
        }
        if der.last().is_some_and(|b| b & 0x80 != 0) {
            return Err(SigningError::MalformedEncoding("truncated OID arc".into()));
        }
        let mut at_arc_start = true;
        for &b in der {
            if at_arc_start && b == 0x80 {
                return Err(SigningError::MalformedEncoding(
                    "non-minimal OID arc encoding".into(),
                ));
            }
            at_arc_start = b & 0x80 == 0;
        }
        let oid = Self {
            der: Cow::Owned(der.to_vec()),
        };
        // Reject arcs that do not fit u64.
        oid.try_arcs()?;
        Ok(oid)
    }

    /// DER content bytes (without tag and length).
    pub fn as_bytes(&self) -> &[u8] {
        &self.der
    }

    fn try_arcs(&self) -> SigningResult<Vec<u64>> {
        let mut arcs = Vec::new();
        let mut value: u64 = 0;
        for &b in self.der.iter() {
            value = value
                .checked_mul(128)
                .ok_or_else(|| SigningError::MalformedEncoding("OID arc overflow".into()))?
                | u64::from(b & 0x7F);
            if b & 0x80 == 0 {
                if arcs.is_empty() {
                    let (first, second) = match value {
                        0..=39 => (0, value),
                        40..=79 => (1, value - 40),
                        _ => (2, value - 80),
                    };
                    arcs.push(first);
                    arcs.push(second);
                } else {
                    arcs.push(value);
                }
                value = 0;
            }
        }
        Ok(arcs)
    }

    /// Arc sequence of this OID.
    pub fn arcs(&self) -> Vec<u64> {
        // Construction validates the encoding, so decoding cannot overflow.
        self.try_arcs().unwrap_or_default()
    }
}

impl DerEncode for ObjectIdentifier {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_oid(self);
    }
}

impl DerDecode for ObjectIdentifier {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        decoder.read_oid()
    }
}

fn push_base128(out: &mut Vec<u8>, mut value: u64) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7F) as u8;
        n += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        out.push(if i > 0 { groups[i] | 0x80 } else { groups[i] });
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arcs = self.arcs();
        let parts: Vec<String> = arcs.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl FromStr for ObjectIdentifier {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arcs = s
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| SigningError::InvalidInput(format!("invalid OID '{s}'")))
            })
            .collect::<SigningResult<Vec<u64>>>()?;
        Self::from_arcs(&arcs)
    }
}
