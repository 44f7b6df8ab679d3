/// Private key material parsed from a PEM envelope
///
/// Accepts the three containers keys are usually stored in: PKCS#1
/// (`RSA PRIVATE KEY`), SEC1 (`EC PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`).
use crate::error::{AccessError, AccessResult};
use p256::elliptic_curve::{self, sec1::ToEncodedPoint};
use pkcs8::{AssociatedOid, DecodePrivateKey, ObjectIdentifier, PrivateKeyInfo};
use rsa::{
    pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey},
    traits::PublicKeyParts,
    RsaPrivateKey,
};
use sec1::der::Encode;
use std::fmt;
use zeroize::Zeroizing;

/// Key algorithms a fingerprint can be derived for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
    Ecdsa,
}

impl KeyAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => "rsa",
            KeyAlgorithm::Ecdsa => "ecdsa",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An algorithm-tagged private key
///
/// Lives only for the duration of one derivation. `Debug` never prints key data.
pub enum PrivateKeyMaterial {
    Rsa(RsaPrivateKey),
    EcdsaP256(p256::SecretKey),
    EcdsaP384(p384::SecretKey),
}

impl PrivateKeyMaterial {
    /// Parse the first decodable PEM block of `pem_bytes`
    pub fn from_pem(pem_bytes: &[u8]) -> AccessResult<Self> {
        let block = first_pem_block(pem_bytes)?;

        // Legacy OpenSSL encryption is signalled through PEM headers
        if block
            .headers()
            .get("Proc-Type")
            .is_some_and(|v| v.contains("ENCRYPTED"))
        {
            return Err(AccessError::UnsupportedAlgorithm(
                "encrypted private keys are not supported".to_string(),
            ));
        }

        let der = block.contents();
        match block.tag() {
            "RSA PRIVATE KEY" => Self::from_pkcs1_der(der),
            "EC PRIVATE KEY" => Self::from_sec1_der(der),
            "PRIVATE KEY" => Self::from_pkcs8_der(der),
            tag if tag.ends_with("PRIVATE KEY") => Err(AccessError::UnsupportedAlgorithm(
                format!("{} blocks are not supported", tag),
            )),
            tag => Err(AccessError::MalformedKey(format!(
                "PEM block {:?} does not hold a private key",
                tag
            ))),
        }
    }

    /// Parse a PKCS#1 `RSAPrivateKey`
    pub fn from_pkcs1_der(der: &[u8]) -> AccessResult<Self> {
        let key = RsaPrivateKey::from_pkcs1_der(der)
            .map_err(|e| AccessError::MalformedKey(format!("invalid PKCS#1 RSA key: {}", e)))?;
        Ok(PrivateKeyMaterial::Rsa(key))
    }

    /// Parse a SEC1 `ECPrivateKey`; the curve comes from its parameters
    pub fn from_sec1_der(der: &[u8]) -> AccessResult<Self> {
        let parsed = sec1::EcPrivateKey::try_from(der)
            .map_err(|e| AccessError::MalformedKey(format!("invalid SEC1 EC key: {}", e)))?;

        let curve = parsed
            .parameters
            .and_then(|params| params.named_curve())
            .ok_or_else(|| {
                AccessError::Encoding("EC private key does not name its curve".to_string())
            })?;

        if curve == p256::NistP256::OID {
            p256::SecretKey::from_sec1_der(der)
                .map(PrivateKeyMaterial::EcdsaP256)
                .map_err(|e| AccessError::MalformedKey(format!("invalid P-256 key: {}", e)))
        } else if curve == p384::NistP384::OID {
            p384::SecretKey::from_sec1_der(der)
                .map(PrivateKeyMaterial::EcdsaP384)
                .map_err(|e| AccessError::MalformedKey(format!("invalid P-384 key: {}", e)))
        } else {
            Err(unsupported_curve(curve))
        }
    }

    /// Parse a PKCS#8 `PrivateKeyInfo` holding an RSA or EC key
    pub fn from_pkcs8_der(der: &[u8]) -> AccessResult<Self> {
        let info = PrivateKeyInfo::try_from(der)
            .map_err(|e| AccessError::MalformedKey(format!("invalid PKCS#8 key: {}", e)))?;
        let algorithm = info.algorithm.oid;

        if algorithm == rsa::pkcs1::ALGORITHM_OID {
            let key = RsaPrivateKey::from_pkcs8_der(der)
                .map_err(|e| AccessError::MalformedKey(format!("invalid RSA key: {}", e)))?;
            return Ok(PrivateKeyMaterial::Rsa(key));
        }

        if algorithm != elliptic_curve::ALGORITHM_OID {
            return Err(AccessError::UnsupportedAlgorithm(format!(
                "PKCS#8 algorithm {} ({})",
                algorithm,
                algorithm_name(&algorithm)
            )));
        }

        let curve = info.algorithm.parameters_oid().map_err(|_| {
            AccessError::Encoding("EC private key does not name its curve".to_string())
        })?;

        if curve == p256::NistP256::OID {
            p256::SecretKey::from_pkcs8_der(der)
                .map(PrivateKeyMaterial::EcdsaP256)
                .map_err(|e| AccessError::MalformedKey(format!("invalid P-256 key: {}", e)))
        } else if curve == p384::NistP384::OID {
            p384::SecretKey::from_pkcs8_der(der)
                .map(PrivateKeyMaterial::EcdsaP384)
                .map_err(|e| AccessError::MalformedKey(format!("invalid P-384 key: {}", e)))
        } else {
            Err(unsupported_curve(curve))
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PrivateKeyMaterial::Rsa(_) => KeyAlgorithm::Rsa,
            PrivateKeyMaterial::EcdsaP256(_) | PrivateKeyMaterial::EcdsaP384(_) => {
                KeyAlgorithm::Ecdsa
            }
        }
    }

    /// Short description safe for logs, e.g. `rsa-2048` or `ecdsa-p256`
    pub fn describe(&self) -> String {
        match self {
            PrivateKeyMaterial::Rsa(key) => format!("rsa-{}", key.size() * 8),
            PrivateKeyMaterial::EcdsaP256(_) => "ecdsa-p256".to_string(),
            PrivateKeyMaterial::EcdsaP384(_) => "ecdsa-p384".to_string(),
        }
    }

    /// Algorithm-native serialization: PKCS#1 for RSA, SEC1 for ECDSA
    ///
    /// SEC1 output always carries the named curve and the uncompressed public key.
    pub fn to_native_der(&self) -> AccessResult<Zeroizing<Vec<u8>>> {
        match self {
            PrivateKeyMaterial::Rsa(key) => {
                let doc = key.to_pkcs1_der().map_err(|e| {
                    AccessError::Encoding(format!("failed to encode PKCS#1 key: {}", e))
                })?;
                Ok(Zeroizing::new(doc.as_bytes().to_vec()))
            }
            PrivateKeyMaterial::EcdsaP256(key) => encode_sec1(
                &Zeroizing::new(key.to_bytes().to_vec()),
                key.public_key().to_encoded_point(false).as_bytes(),
                p256::NistP256::OID,
            ),
            PrivateKeyMaterial::EcdsaP384(key) => encode_sec1(
                &Zeroizing::new(key.to_bytes().to_vec()),
                key.public_key().to_encoded_point(false).as_bytes(),
                p384::NistP384::OID,
            ),
        }
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKeyMaterial")
            .field(&self.describe())
            .finish()
    }
}

const PEM_BEGIN: &[u8] = b"-----BEGIN ";
const PEM_END: &[u8] = b"-----END ";

/// First block that decodes; blocks with a bad body are skipped
fn first_pem_block(input: &[u8]) -> AccessResult<pem::Pem> {
    let mut rest = input;
    let mut first_error = None;

    loop {
        match pem::parse(rest) {
            Ok(block) => return Ok(block),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }

        // Resume after the END marker of the block that failed
        let resume = find(rest, PEM_BEGIN).and_then(|begin| {
            let body = begin + PEM_BEGIN.len();
            find(&rest[body..], PEM_END).map(|end| body + end + PEM_END.len())
        });
        match resume {
            Some(offset) => rest = &rest[offset..],
            None => break,
        }
    }

    Err(AccessError::MalformedKey(match first_error {
        Some(e) => format!("no PEM block found: {}", e),
        None => "no PEM block found".to_string(),
    }))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// `ECPrivateKey` with the named curve in `[0]` and the public point in `[1]`
fn encode_sec1(
    scalar: &[u8],
    public_point: &[u8],
    curve: ObjectIdentifier,
) -> AccessResult<Zeroizing<Vec<u8>>> {
    let key = sec1::EcPrivateKey {
        private_key: scalar,
        parameters: Some(sec1::EcParameters::NamedCurve(curve)),
        public_key: Some(public_point),
    };

    key.to_der()
        .map(Zeroizing::new)
        .map_err(|e| AccessError::Encoding(format!("failed to encode SEC1 key: {}", e)))
}

fn unsupported_curve(curve: ObjectIdentifier) -> AccessError {
    AccessError::Encoding(format!("cannot encode EC key on curve {}", curve))
}

fn algorithm_name(oid: &ObjectIdentifier) -> &'static str {
    match oid.to_string().as_str() {
        "1.3.101.110" => "X25519",
        "1.3.101.111" => "X448",
        "1.3.101.112" => "Ed25519",
        "1.3.101.113" => "Ed448",
        "1.2.840.10040.4.1" => "DSA",
        _ => "unknown",
    }
}
