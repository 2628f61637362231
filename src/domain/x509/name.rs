//! X.501 distinguished names.

use std::fmt;
use std::str::FromStr;

use crate::domain::asn1::{tags, DerDecode, DerEncode, Decoder, Encoder, ObjectIdentifier};
use crate::domain::constants::{
    OID_COMMON_NAME, OID_COUNTRY_NAME, OID_LOCALITY_NAME, OID_ORGANIZATIONAL_UNIT_NAME,
    OID_ORGANIZATION_NAME, OID_STATE_NAME,
};
use crate::infra::error::{SigningError, SigningResult};

const SHORT_NAMES: [(&str, ObjectIdentifier); 6] = [
    ("CN", OID_COMMON_NAME),
    ("C", OID_COUNTRY_NAME),
    ("L", OID_LOCALITY_NAME),
    ("ST", OID_STATE_NAME),
    ("O", OID_ORGANIZATION_NAME),
    ("OU", OID_ORGANIZATIONAL_UNIT_NAME),
];

/// One `AttributeTypeAndValue`. The string tag is kept so decoded names
/// re-encode byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameAttribute {
    pub oid: ObjectIdentifier,
    pub value: String,
    pub string_tag: u8,
}

impl NameAttribute {
    /// New attribute; countryName uses PrintableString, everything else UTF8String.
    pub fn new(oid: ObjectIdentifier, value: impl Into<String>) -> Self {
        let string_tag = if oid == OID_COUNTRY_NAME {
            tags::PRINTABLE_STRING
        } else {
            tags::UTF8_STRING
        };
        Self {
            oid,
            value: value.into(),
            string_tag,
        }
    }

    fn short_name(&self) -> Option<&'static str> {
        SHORT_NAMES
            .iter()
            .find(|(_, oid)| *oid == self.oid)
            .map(|(name, _)| *name)
    }
}

impl DerEncode for NameAttribute {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_sequence(|seq| {
            seq.write_oid(&self.oid);
            seq.write_string(self.string_tag, &self.value);
        });
    }
}

impl DerDecode for NameAttribute {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        let mut seq = decoder.read_sequence()?;
        let oid = seq.read_oid()?;
        let (value, string_tag) = seq.read_string()?;
        seq.expect_end("AttributeTypeAndValue")?;
        Ok(Self {
            oid,
            value,
            string_tag,
        })
    }
}

/// `Name ::= SEQUENCE OF RelativeDistinguishedName`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DistinguishedName {
    pub rdns: Vec<Vec<NameAttribute>>,
}

impl DistinguishedName {
    /// Name with a single commonName.
    pub fn common_name(cn: impl Into<String>) -> Self {
        Self {
            rdns: vec![vec![NameAttribute::new(OID_COMMON_NAME, cn)]],
        }
    }

    /// First commonName value, if any.
    pub fn cn(&self) -> Option<&str> {
        self.rdns
            .iter()
            .flatten()
            .find(|attr| attr.oid == OID_COMMON_NAME)
            .map(|attr| attr.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .rdns
            .iter()
            .map(|rdn| {
                rdn.iter()
                    .map(|attr| match attr.short_name() {
                        Some(name) => format!("{name}={}", attr.value),
                        None => format!("{}={}", attr.oid, attr.value),
                    })
                    .collect::<Vec<_>>()
                    .join("+")
            })
            .collect();
        f.write_str(&parts.join(", "))
    }
}

impl FromStr for DistinguishedName {
    type Err = SigningError;

    /// Parse `CN=Root, O=Example` (one attribute per RDN, in order).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rdns = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                SigningError::InvalidInput(format!("name component '{part}' is not KEY=value"))
            })?;
            let key = key.trim();
            let oid = SHORT_NAMES
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, oid)| oid.clone())
                .map_or_else(|| key.parse::<ObjectIdentifier>(), Ok)?;
            rdns.push(vec![NameAttribute::new(oid, value.trim())]);
        }
        if rdns.is_empty() {
            return Err(SigningError::InvalidInput(format!(
                "distinguished name '{s}' is empty"
            )));
        }
        Ok(Self { rdns })
    }
}

impl DerEncode for DistinguishedName {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_sequence(|seq| {
            for rdn in &self.rdns {
                seq.write_set_of(rdn);
            }
        });
    }
}

impl DerDecode for DistinguishedName {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        let mut seq = decoder.read_sequence()?;
        let mut rdns = Vec::new();
        while !seq.is_empty() {
            let mut set = seq.read_set()?;
            let mut rdn = Vec::new();
            while !set.is_empty() {
                rdn.push(NameAttribute::decode(&mut set)?);
            }
            if rdn.is_empty() {
                return Err(SigningError::MalformedEncoding(
                    "empty RelativeDistinguishedName".into(),
                ));
            }
            rdns.push(rdn);
        }
        Ok(Self { rdns })
    }
}
