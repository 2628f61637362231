//! X.509 certificate model: names, extensions, certificates and chains.

mod certificate;
mod chain;
mod extensions;
mod name;

pub use certificate::{Certificate, SubjectPublicKeyInfo, TbsCertificate, VERSION_V3};
pub use chain::{CertChain, IncludeOption};
pub use extensions::{
    authority_key_identifier, parse_authority_key_identifier, parse_subject_key_identifier,
    subject_key_identifier, BasicConstraints, ExtendedKeyUsage, Extension, KeyUsage,
};
pub use name::{DistinguishedName, NameAttribute};
