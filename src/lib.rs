/// BlackIce - key-pair identity resolution for cloud instances
///
/// Derives the registry fingerprint of a PEM private key and resolves which
/// compute instances were launched with the matching key pair.
///
/// HTTP surface:
/// - `GET  /fingerprint`            fingerprint of the configured identity key
/// - `POST /fingerprint`            fingerprint of the PEM key in the body
/// - `GET  /scan`, `POST /scan`     allow-list for the configured / posted key
/// - `GET  /keypairs`               raw key-pair listing
/// - `GET  /instances/:keyname`     instances launched with a key pair
/// - `GET  /instances?name=&value=` instances matching an arbitrary filter
/// - `GET  /health[/live|/ready]`, `GET /metrics`

pub mod api;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod inventory;
pub mod metrics;
pub mod server;

pub use crypto::{Fingerprint, FingerprintEngine, PrivateKeyMaterial};
pub use error::{AccessError, AccessResult};
pub use identity::{IdentityResolver, ScanResult};
pub use inventory::{GatewayError, InstanceRecord, InventoryGateway, KeyPairRecord};
