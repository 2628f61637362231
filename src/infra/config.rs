//! Configuration management infrastructure.
//!
//! This module provides configuration file support, allowing users to save
//! and load file locations, producer choices and verifier policy.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::domain::crypto::{
    AlgorithmForm, HashAlgorithm, KeyAlgorithm, ParameterEncoding, MIN_RSA_BITS,
};
use crate::domain::x509::{DistinguishedName, IncludeOption};
use crate::infra::error::{SigningError, SigningResult};
use crate::services::signing::{SignOptions, SignerIdentifierType};
use crate::services::verification::VerifierPolicy;

/// Configuration file name used in the working directory.
pub const CONFIG_FILE_NAME: &str = "cms-signer.toml";
/// Container password used when neither the CLI nor the environment supply one.
pub const DEFAULT_PASSWORD: &str = "our secret";

/// Application configuration with all signing preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfiguration {
    /// Password-protected certificate container
    pub certificate_path: PathBuf,

    /// Detached signature output
    pub signature_path: PathBuf,

    /// Environment variable holding the container password
    pub password_env: String,

    /// Certificate issuance preferences
    pub certificates: CertificateSettings,

    /// CMS producer choices
    pub signing: SigningSettings,

    /// How `verify-signature` resolves signature algorithms
    pub verifier: VerifierPolicy,

    /// Tolerate trailing bytes after the signature's top-level element
    pub lenient_decoding: bool,
}

/// Certificate issuance configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateSettings {
    pub root_subject: String,
    pub signer_subject: String,
    pub signer_serial: u64,
    /// Validity extends this many days either side of now
    pub validity_days: u32,
    pub rsa_key_bits: usize,
}

/// Signing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningSettings {
    pub digest_algorithm: String,
    pub algorithm_form: AlgorithmForm,
    pub parameter_encoding: ParameterEncoding,
    pub include_option: IncludeOption,
    pub signer_identifier: SignerIdentifierType,
    pub signed_attributes: bool,
}

impl Default for SigningConfiguration {
    fn default() -> Self {
        Self {
            certificate_path: PathBuf::from("code-signing.pfx"),
            signature_path: PathBuf::from("signature.p7s"),
            password_env: "CMS_SIGNER_PASSWORD".to_string(),
            certificates: CertificateSettings::default(),
            signing: SigningSettings::default(),
            verifier: VerifierPolicy::default(),
            lenient_decoding: false,
        }
    }
}

impl Default for CertificateSettings {
    fn default() -> Self {
        Self {
            root_subject: "CN=my root".to_string(),
            signer_subject: "CN=my signer".to_string(),
            signer_serial: 1,
            validity_days: 1,
            rsa_key_bits: 2048,
        }
    }
}

impl Default for SigningSettings {
    fn default() -> Self {
        Self {
            digest_algorithm: "sha256".to_string(),
            algorithm_form: AlgorithmForm::Combined,
            parameter_encoding: ParameterEncoding::Conventional,
            include_option: IncludeOption::EndCertOnly,
            signer_identifier: SignerIdentifierType::IssuerAndSerialNumber,
            signed_attributes: true,
        }
    }
}

impl SigningConfiguration {
    /// Producer options described by this configuration.
    pub fn sign_options(&self) -> SigningResult<SignOptions> {
        Ok(SignOptions {
            digest: self.signing.digest_algorithm.parse::<HashAlgorithm>()?,
            form: self.signing.algorithm_form,
            parameter_encoding: self.signing.parameter_encoding,
            include: self.signing.include_option,
            signed_attributes: self.signing.signed_attributes,
            identifier: self.signing.signer_identifier,
            ..SignOptions::default()
        })
    }

    pub fn rsa_key_algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::Rsa {
            bits: self.certificates.rsa_key_bits,
        }
    }

    /// Container password: `explicit`, else the configured environment
    /// variable, else [`DEFAULT_PASSWORD`].
    pub fn resolve_password(&self, explicit: Option<&str>) -> Zeroizing<String> {
        if let Some(password) = explicit {
            return Zeroizing::new(password.to_string());
        }
        match std::env::var(&self.password_env) {
            Ok(password) if !password.is_empty() => {
                log::debug!("Using container password from {}", self.password_env);
                Zeroizing::new(password)
            }
            _ => Zeroizing::new(DEFAULT_PASSWORD.to_string()),
        }
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> SigningResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    ///
    /// A `cms-signer.toml` in the working directory wins; otherwise the
    /// user's config directory is used.
    pub fn default_config_path() -> SigningResult<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Ok(local);
        }
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("cms-signer").join(CONFIG_FILE_NAME))
        } else {
            Ok(local)
        }
    }

    /// Load configuration from file, falling back to defaults if it doesn't exist
    pub fn load_or_default(&self) -> SigningResult<SigningConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::debug!(
                "Configuration file {} not found, using defaults",
                self.config_path.display()
            );
            Ok(SigningConfiguration::default())
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> SigningResult<SigningConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = SigningConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> SigningResult<SigningConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config: SigningConfiguration = toml::from_str(&content).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &SigningConfiguration) -> SigningResult<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    SigningError::ConfigurationError(format!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        log::info!("Configuration saved successfully");
        Ok(())
    }

    /// Validate configuration values
    pub fn validate_config(config: &SigningConfiguration) -> SigningResult<()> {
        config
            .signing
            .digest_algorithm
            .parse::<HashAlgorithm>()
            .map_err(|_| {
                SigningError::ConfigurationError(format!(
                    "Invalid digest algorithm: {}",
                    config.signing.digest_algorithm
                ))
            })?;

        for subject in [
            &config.certificates.root_subject,
            &config.certificates.signer_subject,
        ] {
            subject.parse::<DistinguishedName>().map_err(|e| {
                SigningError::ConfigurationError(format!("Invalid subject '{subject}': {e}"))
            })?;
        }

        if config.certificates.validity_days == 0 {
            return Err(SigningError::ConfigurationError(
                "Validity days must be greater than 0".to_string(),
            ));
        }

        if config.certificates.rsa_key_bits < MIN_RSA_BITS {
            return Err(SigningError::ConfigurationError(format!(
                "RSA key size must be at least {MIN_RSA_BITS} bits"
            )));
        }

        if config.signing.signer_identifier == SignerIdentifierType::SubjectKeyIdentifier
            && !config.signing.signed_attributes
        {
            log::warn!("subject-key-identifier signers without signed attributes are unusual");
        }

        Ok(())
    }

    /// Update a specific configuration value
    pub fn update_value(&self, key: &str, value: &str) -> SigningResult<()> {
        let mut config = self.load_or_default()?;

        match key {
            "certificate_path" => config.certificate_path = PathBuf::from(value),
            "signature_path" => config.signature_path = PathBuf::from(value),
            "password_env" => config.password_env = value.to_string(),
            "digest_algorithm" => {
                value.parse::<HashAlgorithm>().map_err(|_| {
                    SigningError::ConfigurationError(format!("Invalid digest algorithm: {value}"))
                })?;
                config.signing.digest_algorithm = value.to_string();
            }
            "algorithm_form" => config.signing.algorithm_form = value.parse()?,
            "parameter_encoding" => config.signing.parameter_encoding = value.parse()?,
            "include_option" => config.signing.include_option = value.parse()?,
            "signer_identifier" => config.signing.signer_identifier = value.parse()?,
            "signed_attributes" => config.signing.signed_attributes = parse_bool(value)?,
            "verifier.canonicalize" => config.verifier.canonicalize = parse_bool(value)?,
            "verifier.expected_form" => config.verifier.expected_form = value.parse()?,
            "lenient_decoding" => config.lenient_decoding = parse_bool(value)?,
            "validity_days" => {
                config.certificates.validity_days = value.parse().map_err(|_| {
                    SigningError::ConfigurationError(format!("Invalid day count: {value}"))
                })?;
            }
            "rsa_key_bits" => {
                config.certificates.rsa_key_bits = value.parse().map_err(|_| {
                    SigningError::ConfigurationError(format!("Invalid key size: {value}"))
                })?;
            }
            _ => {
                return Err(SigningError::ConfigurationError(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }

        Self::validate_config(&config)?;
        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

fn parse_bool(value: &str) -> SigningResult<bool> {
    value
        .parse()
        .map_err(|_| SigningError::ConfigurationError(format!("Invalid boolean value: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_configuration() {
        let config = SigningConfiguration::default();
        assert_eq!(config.certificate_path, PathBuf::from("code-signing.pfx"));
        assert_eq!(config.signature_path, PathBuf::from("signature.p7s"));
        assert_eq!(config.signing.include_option, IncludeOption::EndCertOnly);
        assert!(config.verifier.canonicalize);
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = SigningConfiguration::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("algorithm_form = \"combined\""));
        let deserialized: SigningConfiguration = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: SigningConfiguration =
            toml::from_str("[signing]\nalgorithm_form = \"split\"\n").unwrap();
        assert_eq!(config.signing.algorithm_form, AlgorithmForm::Split);
        assert_eq!(config.signing.digest_algorithm, "sha256");
        assert_eq!(config.certificates.signer_serial, 1);
    }

    #[test]
    fn test_config_manager_with_temp_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");
        let manager = ConfigManager::with_path(&config_path);

        let config = manager.load_or_create_default().unwrap();
        assert!(config_path.exists());

        let loaded_config = manager.load().unwrap();
        assert_eq!(config, loaded_config);
    }

    #[test]
    fn test_update_value() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("cms-signer.toml"));

        manager.update_value("algorithm_form", "split").unwrap();
        manager.update_value("verifier.canonicalize", "false").unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config.signing.algorithm_form, AlgorithmForm::Split);
        assert!(!config.verifier.canonicalize);

        assert!(manager.update_value("digest_algorithm", "md5").is_err());
        assert!(manager.update_value("no_such_key", "1").is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = SigningConfiguration::default();
        config.certificates.rsa_key_bits = 512;
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = SigningConfiguration::default();
        config.certificates.signer_subject = "nonsense".to_string();
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = SigningConfiguration::default();
        config.certificates.validity_days = 0;
        assert!(ConfigManager::validate_config(&config).is_err());
    }

    #[test]
    fn test_sign_options_from_config() {
        let mut config = SigningConfiguration::default();
        config.signing.digest_algorithm = "sha384".to_string();
        config.signing.algorithm_form = AlgorithmForm::Split;
        let options = config.sign_options().unwrap();
        assert_eq!(options.digest, HashAlgorithm::Sha384);
        assert_eq!(options.form, AlgorithmForm::Split);
        assert!(options.detached);
    }

    #[test]
    fn test_explicit_password_wins() {
        let config = SigningConfiguration::default();
        assert_eq!(config.resolve_password(Some("pw")).as_str(), "pw");
    }
}
