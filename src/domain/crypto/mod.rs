//! Foundational cryptographic domain types.
//!
//! Provides strongly-typed wrappers for cryptographic artifacts including:
//! - Hash algorithms and digest values with size validation
//! - Algorithm identifiers and the signature-algorithm canonicalization table
//! - Key algorithm selection for certificate issuance
//! - Digital signature values tagged with their scheme
//!
//! The service layer resolves every wire identifier through these types
//! before touching key material.

mod algorithm;
mod digest_bytes;
mod hash;
mod keys;
mod signature;

pub use algorithm::{
    canonicalize, AlgorithmForm, AlgorithmIdentifier, AlgorithmParameters,
    CanonicalizationError, KeyFamily, ParameterEncoding, SignatureAlgorithm,
};
pub use digest_bytes::{DigestBytes, DigestBytesError};
pub use hash::HashAlgorithm;
pub use keys::{KeyAlgorithm, DEFAULT_RSA_BITS, MIN_RSA_BITS};
pub use signature::CmsSignature;
