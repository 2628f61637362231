//! ECDSA scenario: issue, persist, reload, sign `{1,2,3}`, persist, reload, verify.

use std::path::Path;
use std::process::Command;

use cms_signer::domain::asn1::DecodeMode;
use cms_signer::pipelines::{
    CertificateRequest, CertificateWorkflow, SignWorkflow, VerifyWorkflow,
};
use cms_signer::{
    AlgorithmForm, CertificateContainer, DistinguishedName, KeyAlgorithm, RejectionReason,
    SignOptions, SigningError, VerificationStage, VerifierPolicy, DEFAULT_PAYLOAD,
};
use tempfile::TempDir;

const PASSWORD: &str = "our secret";

fn ec_request() -> CertificateRequest {
    CertificateRequest {
        root_subject: DistinguishedName::common_name("my root"),
        signer_subject: DistinguishedName::common_name("my signer"),
        signer_serial: 1,
        validity_days: 1,
        key_algorithm: KeyAlgorithm::EcP256,
    }
}

#[test]
fn ec_detached_signature_survives_persistence() {
    let dir = TempDir::new().unwrap();
    let pfx = dir.path().join("code-signing.pfx");
    let p7s = dir.path().join("signature.p7s");

    CertificateWorkflow::default()
        .issue_to_file(&ec_request(), &pfx, PASSWORD)
        .unwrap();

    for form in [AlgorithmForm::Combined, AlgorithmForm::Split] {
        SignWorkflow::new(SignOptions {
            form,
            ..SignOptions::default()
        })
        .sign_to_file(&DEFAULT_PAYLOAD, &pfx, PASSWORD, &p7s)
        .unwrap();

        let verifier = VerifyWorkflow::new(VerifierPolicy::default(), DecodeMode::Strict);
        let report = verifier
            .run_file(&p7s, Some(DEFAULT_PAYLOAD.as_slice()))
            .unwrap();
        assert!(report.success(), "{form}: {report:?}");
        assert_eq!(report.signers[0].signer_subject.as_deref(), Some("CN=my signer"));

        let tampered = verifier
            .run_file(&p7s, Some([1u8, 2, 4].as_slice()))
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(tampered.reason, RejectionReason::DigestMismatch);
        assert_eq!(tampered.stage, VerificationStage::DigestChecked);
    }
}

#[test]
fn reloaded_container_keeps_its_chain() {
    let dir = TempDir::new().unwrap();
    let pfx = dir.path().join("code-signing.pfx");
    let issued = CertificateWorkflow::default()
        .issue_to_file(&ec_request(), &pfx, PASSWORD)
        .unwrap();

    let loaded = CertificateContainer::load(&pfx, PASSWORD).unwrap();
    assert_eq!(loaded.certificate, issued.certificate);
    assert_eq!(loaded.chain, issued.chain);

    let err = CertificateContainer::load(&pfx, "wrong").unwrap_err();
    assert!(matches!(err, SigningError::CertificateError(_)));
}

#[test]
fn inspect_reports_the_emitted_form() {
    let dir = TempDir::new().unwrap();
    let pfx = dir.path().join("code-signing.pfx");
    let p7s = dir.path().join("signature.p7s");
    CertificateWorkflow::default()
        .issue_to_file(&ec_request(), &pfx, PASSWORD)
        .unwrap();
    SignWorkflow::new(SignOptions {
        form: AlgorithmForm::Split,
        ..SignOptions::default()
    })
    .sign_to_file(&DEFAULT_PAYLOAD, &pfx, PASSWORD, &p7s)
    .unwrap();

    let inspections = VerifyWorkflow::default().inspect_file(&p7s).unwrap();
    assert_eq!(inspections.len(), 1);
    assert!(inspections[0]
        .signature_algorithm
        .to_string()
        .contains("id-ecPublicKey"));
    assert!(inspections[0].canonical.is_ok());
    assert!(inspections[0].signing_time.is_some());
}

fn cli(dir: &Path, args: &[&str]) -> i32 {
    let config = dir.join("cms-signer.toml");
    let status = Command::new(env!("CARGO_BIN_EXE_cms-signer"))
        .arg("--config")
        .arg(&config)
        .args(args)
        .current_dir(dir)
        .env_remove("CMS_SIGNER_PASSWORD")
        .env("RUST_LOG", "warn")
        .status()
        .unwrap();
    status.code().unwrap()
}

#[test]
fn cli_exit_codes() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("tampered.bin"), [1u8, 2, 4]).unwrap();

    assert_eq!(cli(dir.path(), &["create-ec-certificate"]), 0);
    assert!(dir.path().join("code-signing.pfx").exists());

    assert_eq!(cli(dir.path(), &["create-signature", "--form", "split"]), 0);
    assert!(dir.path().join("signature.p7s").exists());

    assert_eq!(cli(dir.path(), &["verify-signature"]), 0);
    assert_eq!(cli(dir.path(), &["inspect"]), 0);
    assert_eq!(
        cli(dir.path(), &["verify-signature", "--literal", "--expected-form", "combined"]),
        2
    );
    assert_eq!(
        cli(dir.path(), &["verify-signature", "--content", "tampered.bin"]),
        2
    );
    assert_eq!(
        cli(dir.path(), &["verify-signature", "--signature", "missing.p7s"]),
        1
    );
    assert_eq!(
        cli(dir.path(), &["create-signature", "--password", "wrong"]),
        1
    );
}
