/// Application context and dependency injection
use crate::{
    config::{InventoryConfig, ServerConfig},
    crypto::FingerprintEngine,
    error::{AccessError, AccessResult},
    identity::IdentityResolver,
    inventory::{InventoryGateway, MemoryGateway, MeteredGateway},
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroizing;

/// PEM identity loaded from `BLACKICE_IDENTITY_KEY_FILE`
pub struct IdentityKey {
    path: PathBuf,
    pem: Zeroizing<Vec<u8>>,
}

impl IdentityKey {
    pub async fn load(path: &Path) -> AccessResult<Self> {
        let pem = tokio::fs::read(path).await.map_err(|e| {
            AccessError::Validation(format!(
                "Failed to read identity key {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            pem: Zeroizing::new(pem),
        })
    }

    pub fn from_pem(pem: impl Into<Vec<u8>>) -> Self {
        Self {
            path: PathBuf::new(),
            pem: Zeroizing::new(pem.into()),
        }
    }

    pub fn pem(&self) -> &[u8] {
        &self.pem
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKey")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub resolver: Arc<IdentityResolver>,
    /// Identity used when a request carries no key of its own
    pub identity: Option<Arc<IdentityKey>>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AccessResult<Self> {
        // Validate configuration
        config.validate()?;

        let gateway = Self::build_gateway(&config).await?;

        let identity = match &config.identity.key_file {
            Some(path) => Some(IdentityKey::load(path).await?),
            None => None,
        };

        Self::with_gateway(config, gateway, identity)
    }

    /// Assemble a context around an existing gateway
    pub fn with_gateway(
        config: ServerConfig,
        gateway: Arc<dyn InventoryGateway>,
        identity: Option<IdentityKey>,
    ) -> AccessResult<Self> {
        let engine = FingerprintEngine::default();

        // Reject an unusable identity at startup rather than on first request
        if let Some(key) = &identity {
            let fingerprint = engine.derive(key.pem())?;
            tracing::info!(
                path = %key.path().display(),
                fingerprint = %fingerprint,
                "Identity key loaded"
            );
        }

        let gateway: Arc<dyn InventoryGateway> = Arc::new(MeteredGateway::new(gateway));
        let resolver = Arc::new(IdentityResolver::new(engine, gateway));

        Ok(Self {
            config: Arc::new(config),
            resolver,
            identity: identity.map(Arc::new),
        })
    }

    /// Build the configured inventory backend
    async fn build_gateway(config: &ServerConfig) -> AccessResult<Arc<dyn InventoryGateway>> {
        match &config.inventory {
            #[cfg(feature = "ec2")]
            InventoryConfig::Ec2 { region, endpoint } => {
                let ec2_config = crate::inventory::Ec2Config {
                    region: region.clone(),
                    endpoint: endpoint.clone(),
                };
                Ok(Arc::new(crate::inventory::Ec2Gateway::new(ec2_config).await))
            }
            #[cfg(not(feature = "ec2"))]
            InventoryConfig::Ec2 { .. } => Err(AccessError::Validation(
                "EC2 inventory requested but built without the `ec2` feature".to_string(),
            )),
            InventoryConfig::File { path, page_size } => {
                tracing::info!("Using inventory file {}", path.display());
                let gateway = MemoryGateway::from_file(path, *page_size).await?;
                Ok(Arc::new(gateway))
            }
        }
    }

    /// PEM of the configured identity
    pub fn identity_pem(&self) -> AccessResult<&[u8]> {
        self.identity.as_deref().map(IdentityKey::pem).ok_or_else(|| {
            AccessError::Validation(
                "No identity key configured (set BLACKICE_IDENTITY_KEY_FILE)".to_string(),
            )
        })
    }
}
