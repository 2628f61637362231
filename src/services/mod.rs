//! Service layer module root.
//! Contains certificate issuance, CMS signing/verification and persistence.

pub mod cert_builder;
pub mod cert_validator;
pub mod container;
pub mod signing;
pub mod verification;

pub use cert_builder::{key_identifier, unix_now, CertificateBuilder, Validity};
pub use cert_validator::{CertificateAnalysis, CertificateValidator};
pub use container::CertificateContainer;
pub use signing::{CmsSigningService, SignOptions, SignerIdentifierType};
pub use verification::{SignerInspection, VerificationService, VerifierPolicy};
