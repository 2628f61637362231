//! Algorithm identifiers and signature-algorithm canonicalization.
//!
//! A CMS `SignerInfo` names its signature scheme twice: `digestAlgorithm`
//! always carries the hash, while `signatureAlgorithm` is either a combined
//! OID (`sha256WithRSAEncryption`, `ecdsa-with-SHA256`) or a bare key
//! algorithm OID (`rsaEncryption`, `id-ecPublicKey`) that leaves the hash to
//! `digestAlgorithm`. Producers also disagree on NULL versus absent
//! parameters. [`canonicalize`] folds every accepted combination into one
//! [`SignatureAlgorithm`] value through an explicit table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::HashAlgorithm;
use crate::domain::asn1::{
    tags, DerDecode, DerEncode, Decoder, Encoder, ObjectIdentifier,
};
use crate::domain::constants::{
    OID_ECDSA_WITH_SHA256, OID_ECDSA_WITH_SHA384, OID_ECDSA_WITH_SHA512, OID_EC_PUBLIC_KEY,
    OID_PRIME256V1, OID_RSA_ENCRYPTION, OID_SHA256_WITH_RSA, OID_SHA384_WITH_RSA,
    OID_SHA512_WITH_RSA,
};
use crate::infra::error::{SigningError, SigningResult};

/// The optional `parameters` field of an AlgorithmIdentifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AlgorithmParameters {
    /// Field omitted.
    Absent,
    /// Explicit ASN.1 NULL.
    Null,
    /// Any other element, kept as its complete DER encoding.
    Other(Vec<u8>),
}

impl AlgorithmParameters {
    /// Absent and NULL both mean "no parameters".
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Absent | Self::Null)
    }

    pub fn is_other(&self) -> bool {
        matches!(self, Self::Other(_))
    }
}

/// `AlgorithmIdentifier ::= SEQUENCE { algorithm OID, parameters ANY OPTIONAL }`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlgorithmIdentifier {
    pub oid: ObjectIdentifier,
    pub parameters: AlgorithmParameters,
}

impl AlgorithmIdentifier {
    pub fn new(oid: ObjectIdentifier, parameters: AlgorithmParameters) -> Self {
        Self { oid, parameters }
    }

    pub fn absent(oid: ObjectIdentifier) -> Self {
        Self::new(oid, AlgorithmParameters::Absent)
    }

    pub fn null(oid: ObjectIdentifier) -> Self {
        Self::new(oid, AlgorithmParameters::Null)
    }

    /// Equal OIDs and parameters, treating absent and NULL as the same.
    pub fn equivalent(&self, other: &Self) -> bool {
        self.oid == other.oid
            && (self.parameters == other.parameters
                || (self.parameters.is_empty() && other.parameters.is_empty()))
    }

    /// Digest identifier written for `digest` under `encoding`.
    pub fn for_digest(digest: HashAlgorithm, encoding: ParameterEncoding) -> Self {
        match encoding {
            ParameterEncoding::AlwaysAbsent => Self::absent(digest.oid()),
            ParameterEncoding::Conventional | ParameterEncoding::AlwaysNull => {
                Self::null(digest.oid())
            }
        }
    }
}

impl fmt::Display for AlgorithmIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = SignatureAlgorithm::oid_name(&self.oid)
            .or_else(|| HashAlgorithm::from_oid(&self.oid).map(|h| h.as_str()));
        match name {
            Some(name) => write!(f, "{name} ({})", self.oid)?,
            None => write!(f, "{}", self.oid)?,
        }
        match &self.parameters {
            AlgorithmParameters::Absent => f.write_str(", parameters absent"),
            AlgorithmParameters::Null => f.write_str(", parameters NULL"),
            AlgorithmParameters::Other(der) => write!(f, ", parameters {}", hex::encode(der)),
        }
    }
}

impl DerEncode for AlgorithmIdentifier {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_sequence(|seq| {
            seq.write_oid(&self.oid);
            match &self.parameters {
                AlgorithmParameters::Absent => {}
                AlgorithmParameters::Null => {
                    seq.write_null();
                }
                AlgorithmParameters::Other(der) => {
                    seq.write_raw(der);
                }
            }
        });
    }
}

impl DerDecode for AlgorithmIdentifier {
    fn decode(decoder: &mut Decoder<'_>) -> SigningResult<Self> {
        let mut seq = decoder.read_sequence()?;
        let oid = seq.read_oid()?;
        let parameters = if seq.is_empty() {
            AlgorithmParameters::Absent
        } else if seq.next_is(tags::NULL) {
            seq.read_null()?;
            AlgorithmParameters::Null
        } else {
            AlgorithmParameters::Other(seq.read_raw_element()?.to_vec())
        };
        seq.expect_end("AlgorithmIdentifier")?;
        Ok(Self { oid, parameters })
    }
}

/// Key algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    Rsa,
    Ec,
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyFamily::Rsa => "RSA",
            KeyFamily::Ec => "EC",
        })
    }
}

/// How a producer writes `signatureAlgorithm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmForm {
    /// One OID naming hash and key algorithm (`sha256WithRSAEncryption`).
    #[default]
    Combined,
    /// Bare key algorithm OID (`rsaEncryption`); the hash comes from `digestAlgorithm`.
    Split,
}

impl fmt::Display for AlgorithmForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlgorithmForm::Combined => "combined",
            AlgorithmForm::Split => "split",
        })
    }
}

impl FromStr for AlgorithmForm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "combined" => Ok(AlgorithmForm::Combined),
            "split" => Ok(AlgorithmForm::Split),
            _ => Err(SigningError::ConfigurationError(format!(
                "unknown algorithm form '{s}' (expected combined or split)"
            ))),
        }
    }
}

/// Parameter policy for emitted algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterEncoding {
    /// RSA and digest identifiers carry NULL, ECDSA identifiers omit parameters.
    #[default]
    Conventional,
    AlwaysNull,
    AlwaysAbsent,
}

impl fmt::Display for ParameterEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParameterEncoding::Conventional => "conventional",
            ParameterEncoding::AlwaysNull => "always-null",
            ParameterEncoding::AlwaysAbsent => "always-absent",
        })
    }
}

impl FromStr for ParameterEncoding {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "conventional" => Ok(ParameterEncoding::Conventional),
            "always-null" | "null" => Ok(ParameterEncoding::AlwaysNull),
            "always-absent" | "absent" => Ok(ParameterEncoding::AlwaysAbsent),
            _ => Err(SigningError::ConfigurationError(format!(
                "unknown parameter encoding '{s}' (expected conventional, always-null or always-absent)"
            ))),
        }
    }
}

/// Canonical signature scheme: key family plus hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    RsaPkcs1(HashAlgorithm),
    Ecdsa(HashAlgorithm),
}

impl SignatureAlgorithm {
    pub fn for_key(family: KeyFamily, digest: HashAlgorithm) -> Self {
        match family {
            KeyFamily::Rsa => SignatureAlgorithm::RsaPkcs1(digest),
            KeyFamily::Ec => SignatureAlgorithm::Ecdsa(digest),
        }
    }

    pub fn family(&self) -> KeyFamily {
        match self {
            SignatureAlgorithm::RsaPkcs1(_) => KeyFamily::Rsa,
            SignatureAlgorithm::Ecdsa(_) => KeyFamily::Ec,
        }
    }

    pub fn digest(&self) -> HashAlgorithm {
        match self {
            SignatureAlgorithm::RsaPkcs1(h) | SignatureAlgorithm::Ecdsa(h) => *h,
        }
    }

    /// The `signatureAlgorithm` identifier a producer writes for this scheme.
    pub fn identifier(&self, form: AlgorithmForm, encoding: ParameterEncoding) -> AlgorithmIdentifier {
        let row = SIGNATURE_ALGORITHMS.iter().find(|row| {
            row.family == self.family()
                && row.form == form
                && (form == AlgorithmForm::Split || row.digest == Some(self.digest()))
        });
        // Every (family, digest, form) combination has a row.
        let oid = row.map_or_else(|| self.family_oid(), |row| row.oid.clone());
        let parameters = match (encoding, self.family()) {
            (ParameterEncoding::AlwaysNull, _) | (ParameterEncoding::Conventional, KeyFamily::Rsa) => {
                AlgorithmParameters::Null
            }
            (ParameterEncoding::AlwaysAbsent, _) | (ParameterEncoding::Conventional, KeyFamily::Ec) => {
                AlgorithmParameters::Absent
            }
        };
        AlgorithmIdentifier::new(oid, parameters)
    }

    fn family_oid(&self) -> ObjectIdentifier {
        match self.family() {
            KeyFamily::Rsa => OID_RSA_ENCRYPTION,
            KeyFamily::Ec => OID_EC_PUBLIC_KEY,
        }
    }

    /// Conventional name of a signature OID from the table.
    pub fn oid_name(oid: &ObjectIdentifier) -> Option<&'static str> {
        SIGNATURE_ALGORITHMS
            .iter()
            .find(|row| row.oid == *oid)
            .map(|row| row.name)
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureAlgorithm::RsaPkcs1(h) => write!(f, "RSA PKCS#1 v1.5 with {h}"),
            SignatureAlgorithm::Ecdsa(h) => write!(f, "ECDSA with {h}"),
        }
    }
}

/// Why a signature/digest identifier pair could not be canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanonicalizationError {
    #[error("unknown digest algorithm {0}")]
    UnknownDigest(String),
    #[error("unknown signature algorithm {0}")]
    UnknownSignatureAlgorithm(String),
    #[error("unexpected parameters on {0}")]
    UnexpectedParameters(String),
    #[error("signature algorithm {signature} implies {implied} but digestAlgorithm is {declared}")]
    DigestConflict {
        signature: String,
        implied: HashAlgorithm,
        declared: HashAlgorithm,
    },
}

struct AlgorithmRow {
    oid: ObjectIdentifier,
    name: &'static str,
    family: KeyFamily,
    /// Hash fixed by the OID; `None` for split-form rows.
    digest: Option<HashAlgorithm>,
    form: AlgorithmForm,
}

static SIGNATURE_ALGORITHMS: [AlgorithmRow; 8] = [
    AlgorithmRow {
        oid: OID_SHA256_WITH_RSA,
        name: "sha256WithRSAEncryption",
        family: KeyFamily::Rsa,
        digest: Some(HashAlgorithm::Sha256),
        form: AlgorithmForm::Combined,
    },
    AlgorithmRow {
        oid: OID_SHA384_WITH_RSA,
        name: "sha384WithRSAEncryption",
        family: KeyFamily::Rsa,
        digest: Some(HashAlgorithm::Sha384),
        form: AlgorithmForm::Combined,
    },
    AlgorithmRow {
        oid: OID_SHA512_WITH_RSA,
        name: "sha512WithRSAEncryption",
        family: KeyFamily::Rsa,
        digest: Some(HashAlgorithm::Sha512),
        form: AlgorithmForm::Combined,
    },
    AlgorithmRow {
        oid: OID_RSA_ENCRYPTION,
        name: "rsaEncryption",
        family: KeyFamily::Rsa,
        digest: None,
        form: AlgorithmForm::Split,
    },
    AlgorithmRow {
        oid: OID_ECDSA_WITH_SHA256,
        name: "ecdsa-with-SHA256",
        family: KeyFamily::Ec,
        digest: Some(HashAlgorithm::Sha256),
        form: AlgorithmForm::Combined,
    },
    AlgorithmRow {
        oid: OID_ECDSA_WITH_SHA384,
        name: "ecdsa-with-SHA384",
        family: KeyFamily::Ec,
        digest: Some(HashAlgorithm::Sha384),
        form: AlgorithmForm::Combined,
    },
    AlgorithmRow {
        oid: OID_ECDSA_WITH_SHA512,
        name: "ecdsa-with-SHA512",
        family: KeyFamily::Ec,
        digest: Some(HashAlgorithm::Sha512),
        form: AlgorithmForm::Combined,
    },
    AlgorithmRow {
        oid: OID_EC_PUBLIC_KEY,
        name: "id-ecPublicKey",
        family: KeyFamily::Ec,
        digest: None,
        form: AlgorithmForm::Split,
    },
];

/// Whether `parameters` are acceptable for `row`.
///
/// Split-form EC may name the P-256 curve, the way it appears in a
/// SubjectPublicKeyInfo; everything else takes no parameters.
fn parameters_accepted(row: &AlgorithmRow, parameters: &AlgorithmParameters) -> bool {
    match parameters {
        AlgorithmParameters::Absent | AlgorithmParameters::Null => true,
        AlgorithmParameters::Other(der) => {
            row.family == KeyFamily::Ec
                && row.form == AlgorithmForm::Split
                && ObjectIdentifier::from_der(der).is_ok_and(|curve| curve == OID_PRIME256V1)
        }
    }
}

/// Fold a `(signatureAlgorithm, digestAlgorithm)` pair into its canonical scheme.
pub fn canonicalize(
    signature_algorithm: &AlgorithmIdentifier,
    digest_algorithm: &AlgorithmIdentifier,
) -> Result<SignatureAlgorithm, CanonicalizationError> {
    let declared = HashAlgorithm::from_identifier(digest_algorithm)
        .ok_or_else(|| CanonicalizationError::UnknownDigest(digest_algorithm.to_string()))?;

    let row = SIGNATURE_ALGORITHMS
        .iter()
        .find(|row| row.oid == signature_algorithm.oid)
        .ok_or_else(|| {
            CanonicalizationError::UnknownSignatureAlgorithm(signature_algorithm.oid.to_string())
        })?;

    if !parameters_accepted(row, &signature_algorithm.parameters) {
        return Err(CanonicalizationError::UnexpectedParameters(
            signature_algorithm.to_string(),
        ));
    }

    if let Some(implied) = row.digest {
        if implied != declared {
            return Err(CanonicalizationError::DigestConflict {
                signature: row.name.to_string(),
                implied,
                declared,
            });
        }
    }

    Ok(SignatureAlgorithm::for_key(row.family, declared))
}
