//! Software key material backed by the RustCrypto `rsa` and `p256` crates.
//!
//! Both private key types zeroize their secret scalars on drop, including
//! when an error unwinds the owning call.

use std::fmt;

use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use pkcs8::{DecodePrivateKey, EncodePrivateKey, EncryptedPrivateKeyInfo, PrivateKeyInfo};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use super::backend::KeyGenerator;
use crate::domain::asn1::{DerEncode, Decoder, Encoder};
use crate::domain::constants::{OID_EC_PUBLIC_KEY, OID_PRIME256V1, OID_RSA_ENCRYPTION};
use crate::domain::crypto::{
    AlgorithmIdentifier, AlgorithmParameters, CmsSignature, DigestBytes, HashAlgorithm,
    KeyAlgorithm, KeyFamily, SignatureAlgorithm, MIN_RSA_BITS,
};
use crate::domain::x509::SubjectPublicKeyInfo;
use crate::infra::error::{SigningError, SigningResult};

/// PBKDF2 iteration count used when encrypting PKCS#8 keys.
pub const DEFAULT_KDF_ITERATIONS: u32 = 10_000;

fn pkcs1v15_scheme(hash: HashAlgorithm) -> Pkcs1v15Sign {
    match hash {
        HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
        HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
    }
}

/// A signing key held in process memory.
#[derive(Clone)]
pub enum PrivateKey {
    Rsa(Box<RsaPrivateKey>),
    EcP256(SigningKey),
}

impl PrivateKey {
    pub fn family(&self) -> KeyFamily {
        match self {
            PrivateKey::Rsa(_) => KeyFamily::Rsa,
            PrivateKey::EcP256(_) => KeyFamily::Ec,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Rsa(key) => PublicKey::Rsa(key.to_public_key()),
            PrivateKey::EcP256(key) => PublicKey::EcP256(*key.verifying_key()),
        }
    }

    /// Sign a precomputed digest with `algorithm`.
    ///
    /// # Errors
    ///
    /// Fails when the key family cannot produce `algorithm` or the digest was
    /// computed with a different hash.
    pub fn sign_digest(
        &self,
        algorithm: SignatureAlgorithm,
        digest: &DigestBytes,
    ) -> SigningResult<CmsSignature> {
        if algorithm.family() != self.family() {
            return Err(SigningError::SignatureError(format!(
                "{} key cannot produce {algorithm}",
                self.family()
            )));
        }
        if digest.algorithm() != algorithm.digest() {
            return Err(SigningError::SignatureError(format!(
                "digest computed with {} but {algorithm} requested",
                digest.algorithm()
            )));
        }
        let bytes = match self {
            PrivateKey::Rsa(key) => key.sign(pkcs1v15_scheme(algorithm.digest()), digest.as_slice())?,
            PrivateKey::EcP256(key) => {
                let signature: EcdsaSignature = key.sign_prehash(digest.as_slice())?;
                signature.to_der().as_bytes().to_vec()
            }
        };
        log::debug!("Produced {} byte {algorithm} signature", bytes.len());
        Ok(CmsSignature::new(algorithm, bytes))
    }

    /// Unencrypted PKCS#8 `PrivateKeyInfo`.
    pub fn to_pkcs8_der(&self) -> SigningResult<Zeroizing<Vec<u8>>> {
        let document = match self {
            PrivateKey::Rsa(key) => key.to_pkcs8_der()?,
            PrivateKey::EcP256(key) => key.to_pkcs8_der()?,
        };
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    pub fn from_pkcs8_der(der: &[u8]) -> SigningResult<Self> {
        let info = PrivateKeyInfo::try_from(der)?;
        let oid = info.algorithm.oid.as_bytes();
        if oid == OID_RSA_ENCRYPTION.as_bytes() {
            Ok(PrivateKey::Rsa(Box::new(RsaPrivateKey::from_pkcs8_der(der)?)))
        } else if oid == OID_EC_PUBLIC_KEY.as_bytes() {
            Ok(PrivateKey::EcP256(SigningKey::from_pkcs8_der(der)?))
        } else {
            Err(SigningError::UnsupportedAlgorithm(format!(
                "private key algorithm {}",
                info.algorithm.oid
            )))
        }
    }

    /// PKCS#8 `EncryptedPrivateKeyInfo` using PBES2 (PBKDF2-SHA256, AES-256-CBC).
    pub fn to_encrypted_pkcs8_der(
        &self,
        password: &[u8],
        iterations: u32,
    ) -> SigningResult<Vec<u8>> {
        let plain = self.to_pkcs8_der()?;
        let mut salt = [0u8; 16];
        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);
        let params =
            pkcs8::pkcs5::pbes2::Parameters::pbkdf2_sha256_aes256cbc(iterations, &salt, &iv)
                .map_err(|e| SigningError::CryptographicError(format!("PBES2 parameters: {e}")))?;
        let encrypted = PrivateKeyInfo::try_from(plain.as_slice())?
            .encrypt_with_params(params, password)?;
        Ok(encrypted.as_bytes().to_vec())
    }

    pub fn from_encrypted_pkcs8_der(der: &[u8], password: &[u8]) -> SigningResult<Self> {
        let document = EncryptedPrivateKeyInfo::try_from(der)?.decrypt(password)?;
        Self::from_pkcs8_der(document.as_bytes())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivateKey::Rsa(key) => write!(f, "PrivateKey::Rsa({} bits)", key.size() * 8),
            PrivateKey::EcP256(_) => f.write_str("PrivateKey::EcP256"),
        }
    }
}

/// A verification key, usually taken from a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcP256(VerifyingKey),
}

impl PublicKey {
    pub fn family(&self) -> KeyFamily {
        match self {
            PublicKey::Rsa(_) => KeyFamily::Rsa,
            PublicKey::EcP256(_) => KeyFamily::Ec,
        }
    }

    /// Check `signature` over a precomputed digest.
    ///
    /// # Errors
    ///
    /// `SignatureError` when the signature does not verify or is malformed.
    pub fn verify_digest(
        &self,
        algorithm: SignatureAlgorithm,
        digest: &[u8],
        signature: &[u8],
    ) -> SigningResult<()> {
        match self {
            PublicKey::Rsa(key) if algorithm.family() == KeyFamily::Rsa => key
                .verify(pkcs1v15_scheme(algorithm.digest()), digest, signature)
                .map_err(|e| SigningError::SignatureError(format!("RSA verification failed: {e}"))),
            PublicKey::EcP256(key) if algorithm.family() == KeyFamily::Ec => {
                let signature = EcdsaSignature::from_der(signature).map_err(|e| {
                    SigningError::SignatureError(format!("malformed ECDSA signature: {e}"))
                })?;
                key.verify_prehash(digest, &signature).map_err(|e| {
                    SigningError::SignatureError(format!("ECDSA verification failed: {e}"))
                })
            }
            _ => Err(SigningError::SignatureError(format!(
                "{} key cannot verify {algorithm}",
                self.family()
            ))),
        }
    }

    /// SubjectPublicKeyInfo as written into certificates.
    pub fn to_spki(&self) -> SubjectPublicKeyInfo {
        match self {
            PublicKey::Rsa(key) => {
                let mut enc = Encoder::new();
                enc.write_sequence(|seq| {
                    seq.write_integer(&key.n().to_bytes_be());
                    seq.write_integer(&key.e().to_bytes_be());
                });
                SubjectPublicKeyInfo {
                    algorithm: AlgorithmIdentifier::null(OID_RSA_ENCRYPTION),
                    public_key: enc.finish(),
                }
            }
            PublicKey::EcP256(key) => SubjectPublicKeyInfo {
                algorithm: AlgorithmIdentifier::new(
                    OID_EC_PUBLIC_KEY,
                    AlgorithmParameters::Other(OID_PRIME256V1.to_der()),
                ),
                public_key: key.to_encoded_point(false).as_bytes().to_vec(),
            },
        }
    }

    pub fn from_spki(spki: &SubjectPublicKeyInfo) -> SigningResult<Self> {
        match spki.family() {
            Some(KeyFamily::Rsa) => {
                let mut dec = Decoder::new(&spki.public_key);
                let mut seq = dec.read_sequence()?;
                let n = BigUint::from_bytes_be(seq.read_integer()?);
                let e = BigUint::from_bytes_be(seq.read_integer()?);
                seq.expect_end("RSAPublicKey")?;
                dec.expect_end("subjectPublicKey")?;
                Ok(PublicKey::Rsa(RsaPublicKey::new(n, e)?))
            }
            Some(KeyFamily::Ec) => {
                let curve = OID_PRIME256V1.to_der();
                if spki.algorithm.parameters != AlgorithmParameters::Other(curve) {
                    return Err(SigningError::UnsupportedAlgorithm(format!(
                        "EC public key on an unsupported curve ({})",
                        spki.algorithm
                    )));
                }
                Ok(PublicKey::EcP256(VerifyingKey::from_sec1_bytes(
                    &spki.public_key,
                )?))
            }
            None => Err(SigningError::UnsupportedAlgorithm(format!(
                "public key algorithm {}",
                spki.algorithm
            ))),
        }
    }
}

/// Generates keys with the operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareKeyGenerator;

impl KeyGenerator for SoftwareKeyGenerator {
    fn name(&self) -> &'static str {
        "software"
    }

    fn generate(&self, algorithm: KeyAlgorithm) -> SigningResult<PrivateKey> {
        log::info!("Generating {algorithm} key pair");
        match algorithm {
            KeyAlgorithm::Rsa { bits } if bits < MIN_RSA_BITS => {
                Err(SigningError::KeyGenerationError(format!(
                    "RSA keys must be at least {MIN_RSA_BITS} bits, {bits} requested"
                )))
            }
            KeyAlgorithm::Rsa { bits } => RsaPrivateKey::new(&mut OsRng, bits)
                .map(|key| PrivateKey::Rsa(Box::new(key)))
                .map_err(|e| SigningError::KeyGenerationError(e.to_string())),
            KeyAlgorithm::EcP256 => Ok(PrivateKey::EcP256(SigningKey::random(&mut OsRng))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ec_key() -> PrivateKey {
        SoftwareKeyGenerator.generate(KeyAlgorithm::EcP256).unwrap()
    }

    #[test]
    fn test_ecdsa_sign_and_verify_digest() {
        let key = ec_key();
        let alg = SignatureAlgorithm::Ecdsa(HashAlgorithm::Sha256);
        let digest = HashAlgorithm::Sha256.digest(&[1, 2, 3]);
        let signature = key.sign_digest(alg, &digest).unwrap();
        let public = key.public_key();
        assert!(public
            .verify_digest(alg, digest.as_slice(), signature.as_slice())
            .is_ok());

        let other = HashAlgorithm::Sha256.digest(&[1, 2, 4]);
        assert!(public
            .verify_digest(alg, other.as_slice(), signature.as_slice())
            .is_err());
    }

    #[test]
    fn test_family_mismatch_is_rejected() {
        let key = ec_key();
        let digest = HashAlgorithm::Sha256.digest(b"payload");
        let err = key
            .sign_digest(SignatureAlgorithm::RsaPkcs1(HashAlgorithm::Sha256), &digest)
            .unwrap_err();
        assert!(matches!(err, SigningError::SignatureError(_)));
    }

    #[test]
    fn test_digest_hash_must_match_algorithm() {
        let key = ec_key();
        let digest = HashAlgorithm::Sha384.digest(b"payload");
        assert!(key
            .sign_digest(SignatureAlgorithm::Ecdsa(HashAlgorithm::Sha256), &digest)
            .is_err());
    }

    #[test]
    fn test_spki_roundtrip_ec() {
        let public = ec_key().public_key();
        let spki = public.to_spki();
        assert_eq!(spki.family(), Some(KeyFamily::Ec));
        assert_eq!(spki.public_key.len(), 65);
        assert_eq!(PublicKey::from_spki(&spki).unwrap(), public);
    }

    #[test]
    fn test_encrypted_pkcs8_roundtrip_and_wrong_password() {
        let key = ec_key();
        let der = key.to_encrypted_pkcs8_der(b"our secret", 1_000).unwrap();
        let restored = PrivateKey::from_encrypted_pkcs8_der(&der, b"our secret").unwrap();
        assert_eq!(restored.public_key(), key.public_key());
        assert!(PrivateKey::from_encrypted_pkcs8_der(&der, b"not our secret").is_err());
    }

    #[test]
    fn test_small_rsa_keys_are_refused() {
        let err = SoftwareKeyGenerator
            .generate(KeyAlgorithm::Rsa { bits: 512 })
            .unwrap_err();
        assert!(matches!(err, SigningError::KeyGenerationError(_)));
    }
}
