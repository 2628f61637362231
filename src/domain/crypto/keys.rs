//! Key algorithm selection for certificate issuance.

use std::fmt;
use std::str::FromStr;

use super::KeyFamily;
use crate::infra::error::SigningError;

/// Default RSA modulus size.
pub const DEFAULT_RSA_BITS: usize = 2048;
/// Smallest RSA modulus the generator accepts.
pub const MIN_RSA_BITS: usize = 1024;

/// Key pair type requested from a `KeyGenerator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa { bits: usize },
    EcP256,
}

impl KeyAlgorithm {
    pub fn rsa() -> Self {
        KeyAlgorithm::Rsa {
            bits: DEFAULT_RSA_BITS,
        }
    }

    pub fn family(&self) -> KeyFamily {
        match self {
            KeyAlgorithm::Rsa { .. } => KeyFamily::Rsa,
            KeyAlgorithm::EcP256 => KeyFamily::Ec,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Rsa { bits } => write!(f, "RSA-{bits}"),
            KeyAlgorithm::EcP256 => f.write_str("ECDSA P-256"),
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = SigningError;

    /// Accepts `rsa`, `rsa-<bits>`, `ec`, `ecdsa`, `p256` and `ec-p256`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "rsa" => Ok(KeyAlgorithm::rsa()),
            "ec" | "ecdsa" | "p256" | "p-256" | "ec-p256" | "ecdsa-p256" => Ok(KeyAlgorithm::EcP256),
            other => {
                let bits = other
                    .strip_prefix("rsa-")
                    .and_then(|b| b.parse::<usize>().ok())
                    .ok_or_else(|| {
                        SigningError::UnsupportedAlgorithm(format!("unknown key algorithm '{s}'"))
                    })?;
                Ok(KeyAlgorithm::Rsa { bits })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_algorithms() {
        assert_eq!("rsa".parse::<KeyAlgorithm>().unwrap(), KeyAlgorithm::rsa());
        assert_eq!(
            "RSA-3072".parse::<KeyAlgorithm>().unwrap(),
            KeyAlgorithm::Rsa { bits: 3072 }
        );
        assert_eq!("ec".parse::<KeyAlgorithm>().unwrap(), KeyAlgorithm::EcP256);
        assert!("dsa".parse::<KeyAlgorithm>().is_err());
        assert!("rsa-big".parse::<KeyAlgorithm>().is_err());
    }

    #[test]
    fn test_family() {
        assert_eq!(KeyAlgorithm::rsa().family(), KeyFamily::Rsa);
        assert_eq!(KeyAlgorithm::EcP256.family(), KeyFamily::Ec);
    }
}
