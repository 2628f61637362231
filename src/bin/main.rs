//! CMS Signer CLI
//!
//! Command-line interface for issuing signing certificates, creating detached
//! CMS signatures and verifying them, with configuration file support.

use clap::{Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use cms_signer::{
    config::{ConfigManager, SigningConfiguration},
    domain::asn1::DecodeMode,
    pipelines::{CertificateRequest, CertificateWorkflow, SignWorkflow, VerifyWorkflow},
    services::{unix_now, CertificateValidator},
    AlgorithmForm, CertificateContainer, HashAlgorithm, IncludeOption, KeyAlgorithm,
    SignerIdentifierType, VerifierPolicy, DEFAULT_PAYLOAD,
};

/// Exit status when a signature is rejected.
const EXIT_REJECTED: i32 = 2;

#[derive(Parser)]
#[command(name = "cms-signer")]
#[command(about = "Detached CMS/PKCS#7 signing and verification")]
#[command(long_about = "
CMS Signer - create and verify detached CMS (PKCS#7) signatures

EXAMPLES:
    # Issue an ECDSA P-256 root and code-signing certificate
    cms-signer create-ec-certificate

    # Sign the default payload {1,2,3} using the split algorithm form
    cms-signer create-signature --form split

    # Verify a signature over a file
    cms-signer verify-signature --content payload.bin

    # Show what each signer declares
    cms-signer inspect

EXIT CODES:
    0   success
    1   operational error
    2   signature rejected

ENVIRONMENT VARIABLES:
    CMS_SIGNER_PASSWORD   Container password (default: \"our secret\")
    RUST_LOG              Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./cms-signer.toml or the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue an ECDSA P-256 root CA and code-signing certificate
    CreateEcCertificate {
        #[command(flatten)]
        target: ContainerArgs,
    },

    /// Issue an RSA root CA and code-signing certificate
    CreateRsaCertificate {
        #[command(flatten)]
        target: ContainerArgs,

        /// RSA modulus size (overrides config)
        #[arg(long, value_name = "BITS")]
        bits: Option<usize>,
    },

    /// Create a detached signature
    CreateSignature {
        #[command(flatten)]
        target: ContainerArgs,

        /// Signature output path (overrides config)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// File to sign (defaults to the bytes {1,2,3})
        #[arg(long, value_name = "FILE")]
        content: Option<PathBuf>,

        /// Digest algorithm
        #[arg(long, value_enum)]
        digest: Option<HashAlgorithmArg>,

        /// signatureAlgorithm identifier form
        #[arg(long, value_enum)]
        form: Option<AlgorithmFormArg>,

        /// Certificates to embed
        #[arg(long, value_enum)]
        include: Option<IncludeOptionArg>,

        /// How the SignerInfo names its certificate
        #[arg(long, value_enum)]
        identifier: Option<SignerIdentifierArg>,

        /// Sign the content digest directly instead of signed attributes
        #[arg(long)]
        no_signed_attributes: bool,

        /// Embed the content in the SignedData
        #[arg(long)]
        attached: bool,
    },

    /// Verify a detached signature
    VerifySignature {
        /// Signature to verify (overrides config)
        #[arg(short, long, value_name = "FILE")]
        signature: Option<PathBuf>,

        /// Signed file (defaults to the bytes {1,2,3}; ignored for attached signatures)
        #[arg(long, value_name = "FILE")]
        content: Option<PathBuf>,

        /// Compare signature OIDs literally instead of canonicalizing
        #[arg(long)]
        literal: bool,

        /// Form expected in literal mode
        #[arg(long, value_enum)]
        expected_form: Option<AlgorithmFormArg>,

        /// Ignore trailing bytes after the signature
        #[arg(long)]
        lenient: bool,

        /// Container whose certificates are searched before embedded ones
        #[arg(long, value_name = "FILE")]
        trusted: Option<PathBuf>,

        /// Container password for --trusted
        #[arg(long)]
        password: Option<String>,
    },

    /// Print the algorithm identifiers of each signer
    Inspect {
        /// Signature to inspect (overrides config)
        #[arg(short, long, value_name = "FILE")]
        signature: Option<PathBuf>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(clap::Args)]
struct ContainerArgs {
    /// Certificate container path (overrides config)
    #[arg(short, long, value_name = "FILE")]
    certificate: Option<PathBuf>,

    /// Container password (falls back to the configured environment variable)
    #[arg(long)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Create default configuration file
    Init,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum HashAlgorithmArg {
    Sha256,
    Sha384,
    Sha512,
}

impl From<HashAlgorithmArg> for HashAlgorithm {
    fn from(arg: HashAlgorithmArg) -> Self {
        match arg {
            HashAlgorithmArg::Sha256 => HashAlgorithm::Sha256,
            HashAlgorithmArg::Sha384 => HashAlgorithm::Sha384,
            HashAlgorithmArg::Sha512 => HashAlgorithm::Sha512,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum AlgorithmFormArg {
    Combined,
    Split,
}

impl From<AlgorithmFormArg> for AlgorithmForm {
    fn from(arg: AlgorithmFormArg) -> Self {
        match arg {
            AlgorithmFormArg::Combined => AlgorithmForm::Combined,
            AlgorithmFormArg::Split => AlgorithmForm::Split,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum IncludeOptionArg {
    EndCertOnly,
    WholeChain,
    ExcludeRoot,
}

impl From<IncludeOptionArg> for IncludeOption {
    fn from(arg: IncludeOptionArg) -> Self {
        match arg {
            IncludeOptionArg::EndCertOnly => IncludeOption::EndCertOnly,
            IncludeOptionArg::WholeChain => IncludeOption::WholeChain,
            IncludeOptionArg::ExcludeRoot => IncludeOption::ExcludeRoot,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum SignerIdentifierArg {
    IssuerSerial,
    Ski,
}

impl From<SignerIdentifierArg> for SignerIdentifierType {
    fn from(arg: SignerIdentifierArg) -> Self {
        match arg {
            SignerIdentifierArg::IssuerSerial => SignerIdentifierType::IssuerAndSerialNumber,
            SignerIdentifierArg::Ski => SignerIdentifierType::SubjectKeyIdentifier,
        }
    }
}

/// Parameters for the create-signature command
struct SignCommandArgs {
    target: ContainerArgs,
    output: Option<PathBuf>,
    content: Option<PathBuf>,
    digest: Option<HashAlgorithmArg>,
    form: Option<AlgorithmFormArg>,
    include: Option<IncludeOptionArg>,
    identifier: Option<SignerIdentifierArg>,
    no_signed_attributes: bool,
    attached: bool,
}

/// Parameters for the verify-signature command
struct VerifyCommandArgs {
    signature: Option<PathBuf>,
    content: Option<PathBuf>,
    literal: bool,
    expected_form: Option<AlgorithmFormArg>,
    lenient: bool,
    trusted: Option<PathBuf>,
    password: Option<String>,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new().into_diagnostic()?,
    };

    match cli.command {
        Commands::CreateEcCertificate { target } => {
            let config = load_config(&config_manager)?;
            handle_create_certificate(&config, &target, KeyAlgorithm::EcP256)?;
        }

        Commands::CreateRsaCertificate { target, bits } => {
            let config = load_config(&config_manager)?;
            let key_algorithm = match bits {
                Some(bits) => KeyAlgorithm::Rsa { bits },
                None => config.rsa_key_algorithm(),
            };
            handle_create_certificate(&config, &target, key_algorithm)?;
        }

        Commands::CreateSignature {
            target,
            output,
            content,
            digest,
            form,
            include,
            identifier,
            no_signed_attributes,
            attached,
        } => {
            let config = load_config(&config_manager)?;
            let args = SignCommandArgs {
                target,
                output,
                content,
                digest,
                form,
                include,
                identifier,
                no_signed_attributes,
                attached,
            };
            handle_sign_command(&config, args)?;
        }

        Commands::VerifySignature {
            signature,
            content,
            literal,
            expected_form,
            lenient,
            trusted,
            password,
        } => {
            let config = load_config(&config_manager)?;
            let args = VerifyCommandArgs {
                signature,
                content,
                literal,
                expected_form,
                lenient,
                trusted,
                password,
            };
            handle_verify_command(&config, args)?;
        }

        Commands::Inspect { signature } => {
            let config = load_config(&config_manager)?;
            handle_inspect_command(&config, signature)?;
        }

        Commands::Config(config_cmd) => {
            handle_config_command(&config_manager, config_cmd)?;
        }
    }

    Ok(())
}

fn load_config(config_manager: &ConfigManager) -> Result<SigningConfiguration> {
    config_manager
        .load_or_default()
        .into_diagnostic()
        .with_context(|| {
            format!(
                "Failed to load configuration {}",
                config_manager.config_path().display()
            )
        })
}

fn read_content(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path)
            .into_diagnostic()
            .with_context(|| format!("Failed to read content {}", path.display())),
        None => Ok(DEFAULT_PAYLOAD.to_vec()),
    }
}

fn handle_create_certificate(
    config: &SigningConfiguration,
    target: &ContainerArgs,
    key_algorithm: KeyAlgorithm,
) -> Result<()> {
    let output = target
        .certificate
        .clone()
        .unwrap_or_else(|| config.certificate_path.clone());
    let password = config.resolve_password(target.password.as_deref());

    let request = CertificateRequest::from_config(config, key_algorithm).into_diagnostic()?;
    let container = CertificateWorkflow::default()
        .issue_to_file(&request, &output, &password)
        .into_diagnostic()
        .context("Certificate creation failed")?;

    println!("✅ Certificate container written: {}", output.display());
    println!("  Subject: {}", container.certificate.subject());
    println!("  Issuer: {}", container.certificate.issuer());
    println!("  Key: {key_algorithm}");
    println!("  Fingerprint: {}", container.certificate.fingerprint());
    Ok(())
}

fn handle_sign_command(config: &SigningConfiguration, args: SignCommandArgs) -> Result<()> {
    let container_path = args
        .target
        .certificate
        .clone()
        .unwrap_or_else(|| config.certificate_path.clone());
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.signature_path.clone());
    let password = config.resolve_password(args.target.password.as_deref());

    // Command line arguments override the configuration file
    let mut options = config.sign_options().into_diagnostic()?;
    if let Some(digest) = args.digest {
        options.digest = digest.into();
    }
    if let Some(form) = args.form {
        options.form = form.into();
    }
    if let Some(include) = args.include {
        options.include = include.into();
    }
    if let Some(identifier) = args.identifier {
        options.identifier = identifier.into();
    }
    if args.no_signed_attributes {
        options.signed_attributes = false;
    }
    options.detached = !args.attached;

    let content = read_content(args.content.as_deref())?;
    let container = CertificateContainer::load(&container_path, &password)
        .into_diagnostic()
        .with_context(|| format!("Failed to open {}", container_path.display()))?;

    let now = unix_now().into_diagnostic()?;
    let analysis = CertificateValidator::validate_for_code_signing(&container.certificate, now)
        .into_diagnostic()?;
    for warning in &analysis.warnings {
        log::warn!("{warning}");
    }

    let workflow = SignWorkflow::new(options);
    let (signed, der) = workflow.sign(&content, &container).into_diagnostic()?;
    std::fs::write(&output, &der)
        .into_diagnostic()
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let opts = workflow.options();
    println!("✅ Signature written: {}", output.display());
    println!("  Content: {} bytes", content.len());
    println!("  Digest: {}", opts.digest);
    if let Some(signer) = signed.signer_infos().first() {
        println!("  Signature algorithm: {}", signer.signature_algorithm);
    }
    println!("  Algorithm form: {}", opts.form);
    println!("  Certificates embedded: {}", signed.certificates().len());
    Ok(())
}

fn handle_verify_command(config: &SigningConfiguration, args: VerifyCommandArgs) -> Result<()> {
    let signature_path = args
        .signature
        .clone()
        .unwrap_or_else(|| config.signature_path.clone());

    let mut policy = if args.literal {
        VerifierPolicy::literal(config.verifier.expected_form)
    } else {
        config.verifier
    };
    if let Some(form) = args.expected_form {
        policy.expected_form = form.into();
    }
    let decode_mode = if args.lenient || config.lenient_decoding {
        DecodeMode::Lenient
    } else {
        DecodeMode::Strict
    };

    let mut workflow = VerifyWorkflow::new(policy, decode_mode);
    if let Some(trusted_path) = &args.trusted {
        let password = config.resolve_password(args.password.as_deref());
        let container = CertificateContainer::load(trusted_path, &password)
            .into_diagnostic()
            .with_context(|| format!("Failed to open {}", trusted_path.display()))?;
        let mut trusted = vec![container.certificate];
        trusted.extend(container.chain);
        workflow = workflow.with_trusted(trusted);
    }

    let content = read_content(args.content.as_deref())?;
    println!("🔍 Verifying {}...", signature_path.display());
    let report = workflow
        .run_file(&signature_path, Some(&content))
        .into_diagnostic()
        .context("Verification could not run")?;

    for signer in &report.signers {
        let stage = signer
            .stage_reached
            .map_or_else(|| "none".to_string(), |s| s.to_string());
        match &signer.rejection {
            None => println!(
                "  Signer #{}: verified ({}, stage {stage})",
                signer.signer_index,
                signer
                    .canonical_algorithm
                    .map_or_else(String::new, |a| a.to_string())
            ),
            Some(rejection) => println!(
                "  Signer #{}: rejected at {}: {} ({})",
                signer.signer_index, rejection.stage, rejection.reason, rejection.detail
            ),
        }
    }

    match report.into_result() {
        Ok(()) => {
            println!("✅ Signature verified");
            Ok(())
        }
        Err(rejection) => {
            eprintln!("❌ Verification failed: {rejection}");
            std::process::exit(EXIT_REJECTED);
        }
    }
}

fn handle_inspect_command(config: &SigningConfiguration, signature: Option<PathBuf>) -> Result<()> {
    let signature_path = signature.unwrap_or_else(|| config.signature_path.clone());
    let decode_mode = if config.lenient_decoding {
        DecodeMode::Lenient
    } else {
        DecodeMode::Strict
    };
    let inspections = VerifyWorkflow::new(config.verifier, decode_mode)
        .inspect_file(&signature_path)
        .into_diagnostic()?;

    println!("📋 {} signer(s) in {}", inspections.len(), signature_path.display());
    for signer in &inspections {
        println!("  Signer #{} (version {})", signer.signer_index, signer.version);
        println!("    Identifier: {}", signer.signer_identifier);
        println!("    Digest algorithm: {}", signer.digest_algorithm);
        println!("    Signature algorithm: {}", signer.signature_algorithm);
        match &signer.canonical {
            Ok(algorithm) => println!("    Canonical: {algorithm}"),
            Err(e) => println!("    Canonical: unresolved ({e})"),
        }
        if let Some(time) = signer.signing_time {
            println!("    Signing time: {time}");
        }
    }
    Ok(())
}

fn handle_config_command(config_manager: &ConfigManager, config_cmd: ConfigCommands) -> Result<()> {
    match config_cmd {
        ConfigCommands::Show => match config_manager.load() {
            Ok(config) => {
                println!("📋 Current Configuration:");
                println!("  Certificate container: {}", config.certificate_path.display());
                println!("  Signature file: {}", config.signature_path.display());
                println!("  Password variable: {}", config.password_env);
                println!("  Digest algorithm: {}", config.signing.digest_algorithm);
                println!("  Algorithm form: {}", config.signing.algorithm_form);
                println!("  Parameter encoding: {}", config.signing.parameter_encoding);
                println!("  Include option: {}", config.signing.include_option);
                println!("  Signer identifier: {}", config.signing.signer_identifier);
                println!("  Signed attributes: {}", config.signing.signed_attributes);
                println!(
                    "  Verifier: canonicalize={} expected_form={}",
                    config.verifier.canonicalize, config.verifier.expected_form
                );
                println!("  Validity days: {}", config.certificates.validity_days);
                println!(
                    "  Configuration file: {}",
                    config_manager.config_path().display()
                );
            }
            Err(_) => {
                println!("📋 No configuration file found. Use 'config init' to create one.");
            }
        },

        ConfigCommands::Init => {
            let _config = config_manager.load_or_create_default().into_diagnostic()?;
            println!(
                "✅ Configuration initialized: {}",
                config_manager.config_path().display()
            );
            println!("   Edit the file to customize settings, or use 'config set' commands.");
        }

        ConfigCommands::Set { key, value } => {
            config_manager
                .update_value(&key, &value)
                .into_diagnostic()?;
            println!("✅ Configuration updated: {key} = {value}");
        }
    }

    Ok(())
}
