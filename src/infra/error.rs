//! Error types for CMS signing operations.
//! Error handling types and result definitions for encoding, signing and persistence.
//!
//! Verification failures are not represented here: a signature that does not
//! verify is reported through [`crate::domain::verification::VerificationError`]
//! as a normal result value.

use thiserror::Error;

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Comprehensive error types for signing operations
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SigningError {
    #[error("Malformed DER encoding: {0}")]
    #[diagnostic(code(cms_signer::malformed_encoding))]
    MalformedEncoding(String),

    #[error("Signature creation error: {0}")]
    #[diagnostic(code(cms_signer::signing))]
    SignatureError(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Certificate error: {0}")]
    CertificateError(String),

    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    #[error("Cryptographic error: {0}")]
    CryptographicError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<std::io::Error> for SigningError {
    fn from(error: std::io::Error) -> Self {
        SigningError::IoError(error.to_string())
    }
}

impl From<rsa::Error> for SigningError {
    fn from(error: rsa::Error) -> Self {
        SigningError::CryptographicError(format!("RSA: {error}"))
    }
}

impl From<p256::ecdsa::Error> for SigningError {
    fn from(error: p256::ecdsa::Error) -> Self {
        SigningError::CryptographicError(format!("ECDSA: {error}"))
    }
}

impl From<pkcs8::Error> for SigningError {
    fn from(error: pkcs8::Error) -> Self {
        SigningError::CryptographicError(format!("PKCS#8: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SigningError::MalformedEncoding("truncated length".to_string());
        assert_eq!(error.to_string(), "Malformed DER encoding: truncated length");

        let error = SigningError::InvalidInput("empty content".to_string());
        assert_eq!(error.to_string(), "Invalid input: empty content");
    }

    #[test]
    fn test_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "signature.p7s");
        let signing_error: SigningError = io.into();
        match signing_error {
            SigningError::IoError(msg) => assert!(msg.contains("signature.p7s")),
            _ => panic!("Wrong error type"),
        }
    }
}
