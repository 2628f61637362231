//! Key generation back-end trait.
//!
//! The certificate builder never creates key material itself; it asks a
//! [`KeyGenerator`] for it. The software generator is the only back-end
//! shipped, but tests and embedders can inject their own.

use super::software::{PrivateKey, SoftwareKeyGenerator};
use crate::domain::crypto::KeyAlgorithm;
use crate::infra::error::SigningResult;

/// Produces fresh private keys on request.
pub trait KeyGenerator: Send + Sync {
    /// Short back-end name used in logs.
    fn name(&self) -> &'static str;

    /// Generate a new key pair of the requested type.
    ///
    /// # Errors
    ///
    /// Returns `KeyGenerationError` if the back-end cannot produce the key.
    fn generate(&self, algorithm: KeyAlgorithm) -> SigningResult<PrivateKey>;
}

/// The generator used when none is injected.
pub fn default_generator() -> Box<dyn KeyGenerator> {
    log::debug!("Using software key generator");
    Box::new(SoftwareKeyGenerator)
}
