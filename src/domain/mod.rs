pub mod asn1;
pub mod constants;
pub mod crypto;
pub mod pkcs7;
pub mod verification;
pub mod x509;
