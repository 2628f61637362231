//! Centralized OID constants for CMS, X.509 and the supported algorithms.
//! Keep this intentionally small; only broadly reused literals should live here.

use crate::domain::asn1::ObjectIdentifier;

// === PKCS#7/CMS content types ===

/// id-data (1.2.840.113549.1.7.1)
pub const OID_DATA: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x01]);

/// id-signedData (1.2.840.113549.1.7.2)
pub const OID_SIGNED_DATA: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x02]);

// === PKCS#9 attributes ===

/// contentType attribute (1.2.840.113549.1.9.3)
pub const OID_CONTENT_TYPE: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x09, 0x03]);

/// messageDigest attribute (1.2.840.113549.1.9.4)
pub const OID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x09, 0x04]);

/// signingTime attribute (1.2.840.113549.1.9.5)
pub const OID_SIGNING_TIME: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x09, 0x05]);

// === Digest algorithms ===

/// SHA-256 (2.16.840.1.101.3.4.2.1)
pub const OID_SHA256: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01]);

/// SHA-384 (2.16.840.1.101.3.4.2.2)
pub const OID_SHA384: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x02]);

/// SHA-512 (2.16.840.1.101.3.4.2.3)
pub const OID_SHA512: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x03]);

// === RSA ===

/// rsaEncryption (1.2.840.113549.1.1.1), the split-form RSA identifier
pub const OID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x01]);

/// sha256WithRSAEncryption (1.2.840.113549.1.1.11)
pub const OID_SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x0B]);

/// sha384WithRSAEncryption (1.2.840.113549.1.1.12)
pub const OID_SHA384_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x0C]);

/// sha512WithRSAEncryption (1.2.840.113549.1.1.13)
pub const OID_SHA512_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x0D]);

// === Elliptic curve ===

/// id-ecPublicKey (1.2.840.10045.2.1), the split-form EC identifier
pub const OID_EC_PUBLIC_KEY: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x02, 0x01]);

/// prime256v1 / secp256r1 (1.2.840.10045.3.1.7)
pub const OID_PRIME256V1: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07]);

/// ecdsa-with-SHA256 (1.2.840.10045.4.3.2)
pub const OID_ECDSA_WITH_SHA256: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x04, 0x03, 0x02]);

/// ecdsa-with-SHA384 (1.2.840.10045.4.3.3)
pub const OID_ECDSA_WITH_SHA384: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x04, 0x03, 0x03]);

/// ecdsa-with-SHA512 (1.2.840.10045.4.3.4)
pub const OID_ECDSA_WITH_SHA512: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x04, 0x03, 0x04]);

// === X.509 extensions (id-ce) ===

/// subjectKeyIdentifier (2.5.29.14)
pub const OID_SUBJECT_KEY_IDENTIFIER: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x55, 0x1D, 0x0E]);

/// keyUsage (2.5.29.15)
pub const OID_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::from_static(&[0x55, 0x1D, 0x0F]);

/// basicConstraints (2.5.29.19)
pub const OID_BASIC_CONSTRAINTS: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x55, 0x1D, 0x13]);

/// authorityKeyIdentifier (2.5.29.35)
pub const OID_AUTHORITY_KEY_IDENTIFIER: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x55, 0x1D, 0x23]);

/// extKeyUsage (2.5.29.37)
pub const OID_EXT_KEY_USAGE: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x55, 0x1D, 0x25]);

/// id-kp-codeSigning (1.3.6.1.5.5.7.3.3)
pub const OID_KP_CODE_SIGNING: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x2B, 0x06, 0x01, 0x05, 0x05, 0x07, 0x03, 0x03]);

// === Distinguished name attributes (id-at) ===

/// commonName (2.5.4.3)
pub const OID_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::from_static(&[0x55, 0x04, 0x03]);

/// countryName (2.5.4.6)
pub const OID_COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::from_static(&[0x55, 0x04, 0x06]);

/// localityName (2.5.4.7)
pub const OID_LOCALITY_NAME: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x55, 0x04, 0x07]);

/// stateOrProvinceName (2.5.4.8)
pub const OID_STATE_NAME: ObjectIdentifier = ObjectIdentifier::from_static(&[0x55, 0x04, 0x08]);

/// organizationName (2.5.4.10)
pub const OID_ORGANIZATION_NAME: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x55, 0x04, 0x0A]);

/// organizationalUnitName (2.5.4.11)
pub const OID_ORGANIZATIONAL_UNIT_NAME: ObjectIdentifier =
    ObjectIdentifier::from_static(&[0x55, 0x04, 0x0B]);

// === Container ===

/// Version written into the password-protected container.
pub const CONTAINER_VERSION: u64 = 1;

/// Length of the subject key identifier (truncated SHA-256 of the key bits).
pub const KEY_IDENTIFIER_LENGTH: usize = 20;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_match_dotted_form() {
        let table = [
            (OID_DATA, "1.2.840.113549.1.7.1"),
            (OID_SIGNED_DATA, "1.2.840.113549.1.7.2"),
            (OID_CONTENT_TYPE, "1.2.840.113549.1.9.3"),
            (OID_MESSAGE_DIGEST, "1.2.840.113549.1.9.4"),
            (OID_SIGNING_TIME, "1.2.840.113549.1.9.5"),
            (OID_SHA256, "2.16.840.1.101.3.4.2.1"),
            (OID_SHA384, "2.16.840.1.101.3.4.2.2"),
            (OID_SHA512, "2.16.840.1.101.3.4.2.3"),
            (OID_RSA_ENCRYPTION, "1.2.840.113549.1.1.1"),
            (OID_SHA256_WITH_RSA, "1.2.840.113549.1.1.11"),
            (OID_SHA384_WITH_RSA, "1.2.840.113549.1.1.12"),
            (OID_SHA512_WITH_RSA, "1.2.840.113549.1.1.13"),
            (OID_EC_PUBLIC_KEY, "1.2.840.10045.2.1"),
            (OID_PRIME256V1, "1.2.840.10045.3.1.7"),
            (OID_ECDSA_WITH_SHA256, "1.2.840.10045.4.3.2"),
            (OID_ECDSA_WITH_SHA384, "1.2.840.10045.4.3.3"),
            (OID_ECDSA_WITH_SHA512, "1.2.840.10045.4.3.4"),
            (OID_SUBJECT_KEY_IDENTIFIER, "2.5.29.14"),
            (OID_KEY_USAGE, "2.5.29.15"),
            (OID_BASIC_CONSTRAINTS, "2.5.29.19"),
            (OID_AUTHORITY_KEY_IDENTIFIER, "2.5.29.35"),
            (OID_EXT_KEY_USAGE, "2.5.29.37"),
            (OID_KP_CODE_SIGNING, "1.3.6.1.5.5.7.3.3"),
            (OID_COMMON_NAME, "2.5.4.3"),
            (OID_COUNTRY_NAME, "2.5.4.6"),
            (OID_LOCALITY_NAME, "2.5.4.7"),
            (OID_STATE_NAME, "2.5.4.8"),
            (OID_ORGANIZATION_NAME, "2.5.4.10"),
            (OID_ORGANIZATIONAL_UNIT_NAME, "2.5.4.11"),
        ];
        for (constant, dotted) in table {
            let parsed: ObjectIdentifier = dotted.parse().unwrap();
            assert_eq!(constant, parsed, "{dotted}");
        }
    }
}
