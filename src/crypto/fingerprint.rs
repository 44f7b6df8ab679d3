/// Fingerprint derivation
///
/// `derive` is pure: PEM in, fingerprint out, no I/O.
use crate::crypto::{container::Pkcs8Profile, key::PrivateKeyMaterial};
use crate::error::{AccessError, AccessResult};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// Number of byte pairs in a fingerprint (SHA-1 digest size)
pub const FINGERPRINT_LEN: usize = 20;

/// Lowercase hex byte pairs joined by `:`, e.g. `7b:68:f1:...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    fn from_digest(digest: &[u8]) -> Self {
        let pairs: Vec<String> = digest.iter().map(|b| hex::encode([*b])).collect();
        Fingerprint(pairs.join(":"))
    }

    /// Validate an externally supplied fingerprint string
    pub fn parse(value: &str) -> AccessResult<Self> {
        let pairs: Vec<&str> = value.split(':').collect();
        let well_formed = pairs.len() == FINGERPRINT_LEN
            && pairs.iter().all(|pair| {
                pair.len() == 2 && pair.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
            });

        if !well_formed {
            return Err(AccessError::Validation(format!(
                "not a fingerprint: {:?}",
                value
            )));
        }

        Ok(Fingerprint(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = AccessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Fingerprint::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Fingerprint {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Fingerprint {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Derives registry-compatible fingerprints from private keys
#[derive(Debug, Clone, Default)]
pub struct FingerprintEngine {
    profile: Pkcs8Profile,
}

impl FingerprintEngine {
    pub fn new(profile: Pkcs8Profile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &Pkcs8Profile {
        &self.profile
    }

    /// Fingerprint the first PEM block of `pem_bytes`
    ///
    /// The digest is taken over the PKCS#8 re-encoding of the key, never over
    /// the input bytes, so PKCS#1, SEC1 and PKCS#8 copies of one key agree.
    pub fn derive(&self, pem_bytes: &[u8]) -> AccessResult<Fingerprint> {
        let key = PrivateKeyMaterial::from_pem(pem_bytes)?;
        self.derive_from_key(&key)
    }

    /// Fingerprint already parsed key material
    pub fn derive_from_key(&self, key: &PrivateKeyMaterial) -> AccessResult<Fingerprint> {
        let pkcs8 = self.profile.encode(key)?;
        let digest = Sha1::digest(pkcs8.as_slice());
        Ok(Fingerprint::from_digest(&digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_digest_format() {
        let digest: Vec<u8> = (0u8..20).map(|i| i * 13).collect();
        let fp = Fingerprint::from_digest(&digest);
        assert_eq!(
            fp.as_str(),
            "00:0d:1a:27:34:41:4e:5b:68:75:82:8f:9c:a9:b6:c3:d0:dd:ea:f7"
        );
    }

    #[test]
    fn test_parse_accepts_canonical_form() {
        let value = "7b:68:f1:f5:5f:91:0c:d3:f4:55:2f:1a:9e:df:39:87:4b:19:cc:fe";
        let fp = Fingerprint::parse(value).unwrap();
        assert_eq!(fp, value);
        assert_eq!(fp.to_string(), value);
    }

    #[test]
    fn test_parse_rejects_other_forms() {
        // uppercase, wrong separator, MD5 length, empty
        for value in [
            "7B:68:F1:F5:5F:91:0C:D3:F4:55:2F:1A:9E:DF:39:87:4B:19:CC:FE",
            "7b-68-f1-f5-5f-91-0c-d3-f4-55-2f-1a-9e-df-39-87-4b-19-cc-fe",
            "7b:68:f1:f5:5f:91:0c:d3:f4:55:2f:1a:9e:df:39:87",
            "",
        ] {
            assert!(Fingerprint::parse(value).is_err(), "accepted {:?}", value);
        }
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let fp = Fingerprint::parse("00:0d:1a:27:34:41:4e:5b:68:75:82:8f:9c:a9:b6:c3:d0:dd:ea:f7")
            .unwrap();
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(
            json,
            "\"00:0d:1a:27:34:41:4e:5b:68:75:82:8f:9c:a9:b6:c3:d0:dd:ea:f7\""
        );
    }

    #[test]
    fn test_deserialize_validates_format() {
        let fp: Fingerprint = serde_json::from_str(
            "\"00:0d:1a:27:34:41:4e:5b:68:75:82:8f:9c:a9:b6:c3:d0:dd:ea:f7\"",
        )
        .unwrap();
        assert_eq!(fp, "00:0d:1a:27:34:41:4e:5b:68:75:82:8f:9c:a9:b6:c3:d0:dd:ea:f7");

        assert!(serde_json::from_str::<Fingerprint>("\"not-a-fingerprint\"").is_err());
        assert!(serde_json::from_str::<Fingerprint>("\"AA:BB\"").is_err());
    }

    #[test]
    fn test_derive_rejects_non_pem() {
        let engine = FingerprintEngine::default();
        let err = engine.derive(b"definitely not a key").unwrap_err();
        assert!(matches!(err, AccessError::MalformedKey(_)));
    }
}
