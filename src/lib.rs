//! CMS Signer Library
//!
//! A self-contained library for detached CMS/PKCS#7 signing and verification.
//! Issues a root CA and code-signing certificate (RSA or ECDSA P-256), keeps
//! them in a password-protected container, and verifies signatures whose
//! `signatureAlgorithm` may use either the combined or the split identifier
//! form.

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

pub use infra::{config, error};

pub use adapters::{KeyGenerator, PrivateKey, PublicKey, SoftwareKeyGenerator};
pub use domain::crypto::{
    canonicalize, AlgorithmForm, AlgorithmIdentifier, HashAlgorithm, KeyAlgorithm, KeyFamily,
    ParameterEncoding, SignatureAlgorithm,
};
pub use domain::pkcs7::SignedData;
pub use domain::verification::{
    RejectionReason, SignerReport, VerificationError, VerificationReport, VerificationStage,
};
pub use domain::x509::{CertChain, Certificate, DistinguishedName, IncludeOption};
pub use error::{SigningError, SigningResult};
pub use services::{
    CertificateBuilder, CertificateContainer, CmsSigningService, SignOptions,
    SignerIdentifierType, Validity, VerificationService, VerifierPolicy,
};

/// Payload signed when none is supplied.
pub const DEFAULT_PAYLOAD: [u8; 3] = [1, 2, 3];

/// Sign `content` with the container's leaf, returning DER ContentInfo bytes.
pub fn sign_detached(
    content: &[u8],
    container: &CertificateContainer,
    options: SignOptions,
) -> SigningResult<Vec<u8>> {
    let signed = CmsSigningService::new(options).sign(
        content,
        &container.cert_chain(),
        &container.key,
    )?;
    Ok(signed.to_content_info_der())
}

/// Verify DER ContentInfo `signature` over `content`.
///
/// Returns `Ok(Err(_))` when a signer is rejected; the outer error covers
/// undecodable input only.
pub fn verify_detached(
    signature: &[u8],
    content: &[u8],
    policy: VerifierPolicy,
) -> SigningResult<Result<(), VerificationError>> {
    let report = VerificationService::new(policy).verify_der(signature, Some(content), &[])?;
    Ok(report.into_result())
}
