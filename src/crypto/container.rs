/// PKCS#8 container used as fingerprint input
///
/// Registries fingerprint `SEQUENCE { 0, { algorithm, NULL }, OCTET STRING native-key }`.
/// The NULL parameter is written for EC keys too, so the standard EC PKCS#8
/// encoder (which writes the curve OID) cannot be used here.
use crate::crypto::key::{KeyAlgorithm, PrivateKeyMaterial};
use crate::error::{AccessError, AccessResult};
use p256::elliptic_curve;
use pkcs8::{
    der::{asn1::AnyRef, Encode},
    AlgorithmIdentifierRef, ObjectIdentifier, PrivateKeyInfo,
};
use zeroize::Zeroizing;

/// Algorithm identifiers written into the PKCS#8 container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkcs8Profile {
    /// rsaEncryption, 1.2.840.113549.1.1.1
    pub rsa_oid: ObjectIdentifier,
    /// id-ecPublicKey, 1.2.840.10045.2.1
    pub ecdsa_oid: ObjectIdentifier,
}

impl Default for Pkcs8Profile {
    fn default() -> Self {
        Self {
            rsa_oid: rsa::pkcs1::ALGORITHM_OID,
            ecdsa_oid: elliptic_curve::ALGORITHM_OID,
        }
    }
}

impl Pkcs8Profile {
    pub fn algorithm_oid(&self, algorithm: KeyAlgorithm) -> ObjectIdentifier {
        match algorithm {
            KeyAlgorithm::Rsa => self.rsa_oid,
            KeyAlgorithm::Ecdsa => self.ecdsa_oid,
        }
    }

    /// Wrap the key's native encoding in a version 0 PKCS#8 structure
    pub fn encode(&self, key: &PrivateKeyMaterial) -> AccessResult<Zeroizing<Vec<u8>>> {
        let native = key.to_native_der()?;

        let algorithm = AlgorithmIdentifierRef {
            oid: self.algorithm_oid(key.algorithm()),
            parameters: Some(AnyRef::NULL),
        };
        let info = PrivateKeyInfo::new(algorithm, &native);

        let der = info
            .to_der()
            .map_err(|e| AccessError::Encoding(format!("failed to marshal to PKCS#8: {}", e)))?;

        Ok(Zeroizing::new(der))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkcs8::der::{Tag, Tagged};

    const RSA_PKCS1: &str = include_str!("../../tests/fixtures/rsa_pkcs1.pem");
    const RSA_PKCS8: &str = include_str!("../../tests/fixtures/rsa_pkcs8.pem");
    const EC_P256_SEC1: &str = include_str!("../../tests/fixtures/ec_p256_sec1.pem");

    #[test]
    fn test_rsa_matches_openssl_topk8() {
        // `openssl pkcs8 -topk8 -nocrypt` writes exactly this structure for RSA
        let key = PrivateKeyMaterial::from_pem(RSA_PKCS1.as_bytes()).unwrap();
        let encoded = Pkcs8Profile::default().encode(&key).unwrap();

        let expected = pem::parse(RSA_PKCS8).unwrap();
        assert_eq!(encoded.as_slice(), expected.contents());
    }

    #[test]
    fn test_ec_uses_null_parameters() {
        let key = PrivateKeyMaterial::from_pem(EC_P256_SEC1.as_bytes()).unwrap();
        let encoded = Pkcs8Profile::default().encode(&key).unwrap();

        let info = PrivateKeyInfo::try_from(encoded.as_slice()).unwrap();
        assert_eq!(info.algorithm.oid, elliptic_curve::ALGORITHM_OID);
        let params = info.algorithm.parameters.expect("parameters present");
        assert_eq!(params.tag(), Tag::Null);
        assert!(info.public_key.is_none());

        let sec1 = pem::parse(EC_P256_SEC1).unwrap();
        assert_eq!(info.private_key, sec1.contents());
    }

    #[test]
    fn test_profile_oids() {
        let profile = Pkcs8Profile::default();
        assert_eq!(
            profile.algorithm_oid(KeyAlgorithm::Rsa).to_string(),
            "1.2.840.113549.1.1.1"
        );
        assert_eq!(
            profile.algorithm_oid(KeyAlgorithm::Ecdsa).to_string(),
            "1.2.840.10045.2.1"
        );
    }
}
