/// Identity Resolution System
///
/// Resolves a private-key identity to the set of instances provisioned with
/// its key pair.

pub mod resolver;

pub use resolver::{IdentityResolver, ScanResult};
