//! Adapter layer modules for key material.
//!
//! Provides adapters for:
//! - Injectable key generation (`KeyGenerator`)
//! - Software RSA and ECDSA P-256 keys, including PKCS#8 import/export

pub mod backend;
pub mod software;

pub use backend::{default_generator, KeyGenerator};
pub use software::{PrivateKey, PublicKey, SoftwareKeyGenerator, DEFAULT_KDF_ITERATIONS};
