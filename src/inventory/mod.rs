/// Inventory gateways
///
/// Read-only access to the key-pair registry and compute instance directory
/// of a cloud account. Supports multiple backend implementations (EC2, in-memory).

#[cfg(feature = "ec2")]
pub mod ec2;
pub mod memory;
pub mod metered;

#[cfg(feature = "ec2")]
pub use ec2::{Ec2Config, Ec2Gateway};
pub use memory::MemoryGateway;
pub use metered::MeteredGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Instance filter field for the key pair an instance was launched with
pub const KEY_NAME_FILTER: &str = "key-name";

/// Errors raised by inventory backends
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Network, credential or timeout failure before the API answered
    #[error("transport failure: {0}")]
    Transport(String),

    /// The API answered with an error
    #[error("{operation} failed ({code}): {message}")]
    Api {
        operation: &'static str,
        code: String,
        message: String,
    },

    /// The inventory source itself is unusable (bad file, bad page token)
    #[error("invalid inventory: {0}")]
    Inventory(String),
}

/// A registered key pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairRecord {
    pub name: String,
    pub fingerprint: String,
}

/// A compute instance as described by the inventory
///
/// `attributes` carries whatever else the backend reports and is passed
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    pub instance_id: String,
    pub private_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl InstanceRecord {
    pub fn new(instance_id: impl Into<String>, private_ip_address: Option<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            private_ip_address,
            key_name: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = Some(key_name.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Keep only the id and private address
    pub fn project(self) -> Self {
        Self::new(self.instance_id, self.private_ip_address)
    }
}

/// Instance filter, e.g. `key-name = [dev]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceFilter {
    pub name: String,
    pub values: Vec<String>,
}

impl InstanceFilter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    pub fn key_name(key_name: impl Into<String>) -> Self {
        Self::new(KEY_NAME_FILTER, key_name)
    }
}

/// One page of an instance listing
#[derive(Debug, Clone, Default)]
pub struct InstancePage {
    pub instances: Vec<InstanceRecord>,
    /// Continuation token; `None` (or empty) on the final page
    pub next_token: Option<String>,
}

impl InstancePage {
    pub fn is_last(&self) -> bool {
        self.next_token.as_deref().map_or(true, str::is_empty)
    }
}

/// Inventory backend trait
///
/// Credential acquisition, endpoint selection and retries belong to the
/// implementation.
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    /// Backend name for logs and metrics
    fn name(&self) -> &'static str;

    /// List every key pair registered on the account
    async fn list_key_pairs(&self) -> Result<Vec<KeyPairRecord>, GatewayError>;

    /// Fetch one page of instances matching `filter`
    async fn list_instances(
        &self,
        filter: &InstanceFilter,
        next_token: Option<String>,
    ) -> Result<InstancePage, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_drops_pass_through_fields() {
        let record = InstanceRecord::new("i-1", Some("10.0.0.1".into()))
            .with_key_name("dev")
            .with_attribute("instanceType", json!("t3.micro"));

        let projected = record.project();
        assert_eq!(projected, InstanceRecord::new("i-1", Some("10.0.0.1".into())));
        assert_eq!(
            serde_json::to_value(&projected).unwrap(),
            json!({"instanceId": "i-1", "privateIpAddress": "10.0.0.1"})
        );
    }

    #[test]
    fn test_page_end_detection() {
        let mut page = InstancePage::default();
        assert!(page.is_last());
        page.next_token = Some(String::new());
        assert!(page.is_last());
        page.next_token = Some("abc".into());
        assert!(!page.is_last());
    }
}
