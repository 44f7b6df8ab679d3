/// Configuration management for BlackIce
use crate::error::{AccessError, AccessResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub inventory: InventoryConfig,
    pub identity: IdentityConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Inventory backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InventoryConfig {
    Ec2 {
        region: String,
        endpoint: Option<String>,
    },
    File {
        path: PathBuf,
        page_size: usize,
    },
}

/// Identity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// PEM private key served by `GET /fingerprint` and `GET /scan`
    pub key_file: Option<PathBuf>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AccessResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("BLACKICE_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("BLACKICE_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AccessError::Validation("Invalid port number".to_string()))?;

        let inventory = match env::var("BLACKICE_INVENTORY")
            .unwrap_or_else(|_| "ec2".to_string())
            .to_lowercase()
            .as_str()
        {
            "ec2" => InventoryConfig::Ec2 {
                region: env::var("BLACKICE_REGION")
                    .unwrap_or_else(|_| "eu-central-1".to_string()),
                endpoint: env::var("BLACKICE_EC2_ENDPOINT").ok(),
            },
            "file" => InventoryConfig::File {
                path: env::var("BLACKICE_INVENTORY_FILE")
                    .map(PathBuf::from)
                    .map_err(|_| {
                        AccessError::Validation("BLACKICE_INVENTORY_FILE required".to_string())
                    })?,
                page_size: env::var("BLACKICE_INVENTORY_PAGE_SIZE")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .map_err(|_| AccessError::Validation("Invalid page size".to_string()))?,
            },
            other => {
                return Err(AccessError::Validation(format!(
                    "Unknown inventory backend: {}",
                    other
                )))
            }
        };

        let key_file = env::var("BLACKICE_IDENTITY_KEY_FILE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "blackice=info,tower_http=info".to_string());
        let format = match env::var("BLACKICE_LOG_FORMAT")
            .unwrap_or_else(|_| "pretty".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(ServerConfig {
            service: ServiceConfig { hostname, port },
            inventory,
            identity: IdentityConfig { key_file },
            logging: LoggingConfig { level, format },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AccessResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AccessError::Validation("Hostname cannot be empty".to_string()));
        }

        match &self.inventory {
            InventoryConfig::Ec2 { region, .. } if region.is_empty() => {
                return Err(AccessError::Validation("Region cannot be empty".to_string()));
            }
            InventoryConfig::File { path, page_size } => {
                if path.as_os_str().is_empty() {
                    return Err(AccessError::Validation(
                        "Inventory file path cannot be empty".to_string(),
                    ));
                }
                if *page_size == 0 {
                    return Err(AccessError::Validation(
                        "Inventory page size must be at least 1".to_string(),
                    ));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.hostname, self.service.port)
    }
}
