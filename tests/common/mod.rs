//! Shared fixtures for integration tests.
//!
//! RSA key generation dominates test time, so one RSA-1024 PKI is built per
//! test binary and shared.

#![allow(dead_code)]

use std::sync::OnceLock;

use cms_signer::{
    CertChain, Certificate, CertificateBuilder, DistinguishedName, KeyAlgorithm, PrivateKey,
    Validity,
};

/// Root CA plus code-signing leaf.
pub struct Pki {
    pub root: Certificate,
    pub root_key: PrivateKey,
    pub leaf: Certificate,
    pub leaf_key: PrivateKey,
}

impl Pki {
    pub fn issue(key_algorithm: KeyAlgorithm) -> Self {
        let builder = CertificateBuilder::default();
        let validity = Validity::days_around_now(1).unwrap();
        let (root, root_key) = builder
            .create_self_signed(
                &DistinguishedName::common_name("my root"),
                validity,
                key_algorithm,
            )
            .unwrap();
        let (leaf, leaf_key) = builder
            .create_signed(
                &DistinguishedName::common_name("my signer"),
                &root,
                &root_key,
                1,
                validity,
                key_algorithm,
            )
            .unwrap();
        Self {
            root,
            root_key,
            leaf,
            leaf_key,
        }
    }

    pub fn chain(&self) -> CertChain {
        CertChain::new(self.leaf.clone()).with_issuers(vec![self.root.clone()])
    }
}

pub fn rsa_pki() -> &'static Pki {
    static PKI: OnceLock<Pki> = OnceLock::new();
    PKI.get_or_init(|| Pki::issue(KeyAlgorithm::Rsa { bits: 1024 }))
}

pub fn ec_pki() -> &'static Pki {
    static PKI: OnceLock<Pki> = OnceLock::new();
    PKI.get_or_init(|| Pki::issue(KeyAlgorithm::EcP256))
}

/// Both key families, for tests that run over each.
pub fn all_pkis() -> [&'static Pki; 2] {
    [rsa_pki(), ec_pki()]
}

pub const PAYLOAD: [u8; 3] = [1, 2, 3];
