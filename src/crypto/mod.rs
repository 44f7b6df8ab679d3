/// Cryptography module for identity fingerprinting
///
/// Turns a PEM private key into the colon-separated SHA-1 fingerprint that
/// cloud key-pair registries record for keys they generated.

pub mod container;
pub mod fingerprint;
pub mod key;

pub use container::Pkcs8Profile;
pub use fingerprint::{Fingerprint, FingerprintEngine, FINGERPRINT_LEN};
pub use key::{KeyAlgorithm, PrivateKeyMaterial};
