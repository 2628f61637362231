//! Workflow pipelines orchestrating stateless services.

pub mod certificate;
pub mod sign;
pub mod verify;

pub use certificate::{CertificateRequest, CertificateWorkflow};
pub use sign::SignWorkflow;
pub use verify::VerifyWorkflow;
