use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Certificate;
use crate::infra::error::SigningError;

/// Which certificates a signer embeds in `SignedData.certificates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IncludeOption {
    /// Only the signing certificate.
    #[default]
    EndCertOnly,
    /// Signing certificate followed by every chain certificate.
    WholeChain,
    /// Like `WholeChain`, minus self-issued roots.
    ExcludeRoot,
}

impl fmt::Display for IncludeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IncludeOption::EndCertOnly => "end-cert-only",
            IncludeOption::WholeChain => "whole-chain",
            IncludeOption::ExcludeRoot => "exclude-root",
        })
    }
}

impl FromStr for IncludeOption {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "end-cert-only" | "endcertonly" => Ok(IncludeOption::EndCertOnly),
            "whole-chain" | "wholechain" => Ok(IncludeOption::WholeChain),
            "exclude-root" | "excluderoot" => Ok(IncludeOption::ExcludeRoot),
            _ => Err(SigningError::ConfigurationError(format!(
                "unknown include option '{s}' (expected end-cert-only, whole-chain or exclude-root)"
            ))),
        }
    }
}

/// Ordered certificate chain: signing certificate first, then its issuers.
#[derive(Clone)]
pub struct CertChain {
    leaf: Certificate,
    issuers: Vec<Certificate>,
}

impl CertChain {
    #[must_use]
    pub fn new(leaf: Certificate) -> Self {
        Self {
            leaf,
            issuers: Vec::new(),
        }
    }
    #[must_use]
    pub fn with_issuers(mut self, list: Vec<Certificate>) -> Self {
        self.issuers = list;
        self
    }
    #[must_use]
    pub fn leaf(&self) -> &Certificate {
        &self.leaf
    }
    #[must_use]
    pub fn issuers(&self) -> &[Certificate] {
        &self.issuers
    }

    /// Certificates to embed for `option`, signing certificate first.
    #[must_use]
    pub fn select(&self, option: IncludeOption) -> Vec<Certificate> {
        let mut selected = vec![self.leaf.clone()];
        match option {
            IncludeOption::EndCertOnly => {}
            IncludeOption::WholeChain => selected.extend(self.issuers.iter().cloned()),
            IncludeOption::ExcludeRoot => selected.extend(
                self.issuers
                    .iter()
                    .filter(|cert| !cert.is_self_issued())
                    .cloned(),
            ),
        }
        selected
    }
}

impl fmt::Debug for CertChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CertChain(leaf={:?}, issuers={})",
            self.leaf,
            self.issuers.len()
        )
    }
}
