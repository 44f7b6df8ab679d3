/// In-memory inventory backend
use crate::inventory::{
    GatewayError, InstanceFilter, InstancePage, InstanceRecord, InventoryGateway, KeyPairRecord,
    KEY_NAME_FILTER,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Default number of instances per page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Inventory document loaded from disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDocument {
    #[serde(default)]
    pub key_pairs: Vec<KeyPairRecord>,
    #[serde(default)]
    pub instances: Vec<InstanceRecord>,
}

/// Inventory held in memory
///
/// Applies filters the way EC2 does (any listed value matches) and pages
/// through results with opaque offset tokens.
#[derive(Debug, Clone)]
pub struct MemoryGateway {
    key_pairs: Vec<KeyPairRecord>,
    instances: Vec<InstanceRecord>,
    page_size: usize,
}

impl MemoryGateway {
    pub fn new(key_pairs: Vec<KeyPairRecord>, instances: Vec<InstanceRecord>) -> Self {
        Self {
            key_pairs,
            instances,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Load an inventory document (`{"keyPairs": [...], "instances": [...]}`)
    pub async fn from_file(path: impl AsRef<Path>, page_size: usize) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).await.map_err(|e| {
            GatewayError::Inventory(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let doc: InventoryDocument = serde_json::from_str(&raw).map_err(|e| {
            GatewayError::Inventory(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        debug!(
            path = %path.display(),
            key_pairs = doc.key_pairs.len(),
            instances = doc.instances.len(),
            "loaded inventory file"
        );

        Ok(Self::new(doc.key_pairs, doc.instances).with_page_size(page_size))
    }

    fn matches(instance: &InstanceRecord, filter: &InstanceFilter) -> bool {
        let field = match filter.name.as_str() {
            KEY_NAME_FILTER => instance.key_name.clone(),
            "instance-id" => Some(instance.instance_id.clone()),
            "private-ip-address" => instance.private_ip_address.clone(),
            other => instance
                .attributes
                .get(other)
                .and_then(|value| value.as_str())
                .map(str::to_string),
        };

        field.is_some_and(|value| filter.values.iter().any(|wanted| *wanted == value))
    }

    fn parse_token(token: Option<String>) -> Result<usize, GatewayError> {
        match token.as_deref() {
            None | Some("") => Ok(0),
            Some(raw) => raw
                .parse()
                .map_err(|_| GatewayError::Inventory(format!("Invalid page token {:?}", raw))),
        }
    }
}

#[async_trait]
impl InventoryGateway for MemoryGateway {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list_key_pairs(&self) -> Result<Vec<KeyPairRecord>, GatewayError> {
        Ok(self.key_pairs.clone())
    }

    async fn list_instances(
        &self,
        filter: &InstanceFilter,
        next_token: Option<String>,
    ) -> Result<InstancePage, GatewayError> {
        let offset = Self::parse_token(next_token)?;
        let matching: Vec<&InstanceRecord> = self
            .instances
            .iter()
            .filter(|instance| Self::matches(instance, filter))
            .collect();

        if offset > matching.len() {
            return Err(GatewayError::Inventory(format!(
                "Page token {} is past the end of the listing",
                offset
            )));
        }

        let end = (offset + self.page_size).min(matching.len());
        let instances = matching[offset..end].iter().map(|i| (*i).clone()).collect();
        let next_token = (end < matching.len()).then(|| end.to_string());

        Ok(InstancePage {
            instances,
            next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn gateway() -> MemoryGateway {
        let instances = vec![
            InstanceRecord::new("i-1", Some("10.0.0.1".into())).with_key_name("dev"),
            InstanceRecord::new("i-2", Some("10.0.0.2".into())).with_key_name("prod"),
            InstanceRecord::new("i-3", Some("10.0.0.3".into())).with_key_name("dev"),
            InstanceRecord::new("i-4", None)
                .with_key_name("dev")
                .with_attribute("instanceType", json!("t3.micro")),
        ];
        MemoryGateway::new(
            vec![KeyPairRecord {
                name: "dev".into(),
                fingerprint: "aa:bb".into(),
            }],
            instances,
        )
    }

    #[tokio::test]
    async fn test_filter_by_key_name() {
        let page = gateway()
            .list_instances(&InstanceFilter::key_name("dev"), None)
            .await
            .unwrap();

        let ids: Vec<_> = page.instances.iter().map(|i| i.instance_id.as_str()).collect();
        assert_eq!(ids, vec!["i-1", "i-3", "i-4"]);
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn test_filter_by_attribute() {
        let filter = InstanceFilter::new("instanceType", "t3.micro");
        let page = gateway().list_instances(&filter, None).await.unwrap();
        assert_eq!(page.instances.len(), 1);
        assert_eq!(page.instances[0].instance_id, "i-4");
    }

    #[tokio::test]
    async fn test_pagination_tokens() {
        let gw = gateway().with_page_size(2);
        let filter = InstanceFilter::key_name("dev");

        let first = gw.list_instances(&filter, None).await.unwrap();
        assert_eq!(first.instances.len(), 2);
        assert_eq!(first.next_token.as_deref(), Some("2"));

        let second = gw.list_instances(&filter, first.next_token).await.unwrap();
        assert_eq!(second.instances.len(), 1);
        assert_eq!(second.instances[0].instance_id, "i-4");
        assert!(second.is_last());
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let filter = InstanceFilter::key_name("dev");
        let err = gateway()
            .list_instances(&filter, Some("bogus".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Inventory(_)));

        let err = gateway()
            .list_instances(&filter, Some("99".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Inventory(_)));
    }

    #[tokio::test]
    async fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "keyPairs": [{{"name": "dev", "fingerprint": "aa:bb"}}],
                "instances": [
                    {{"instanceId": "i-1", "privateIpAddress": "10.0.0.1", "keyName": "dev",
                      "attributes": {{"state": "running"}}}}
                ]
            }}"#
        )
        .unwrap();

        let gw = MemoryGateway::from_file(file.path(), 10).await.unwrap();
        let key_pairs = gw.list_key_pairs().await.unwrap();
        assert_eq!(key_pairs[0].name, "dev");

        let page = gw
            .list_instances(&InstanceFilter::key_name("dev"), None)
            .await
            .unwrap();
        assert_eq!(page.instances[0].attributes["state"], json!("running"));
    }

    #[tokio::test]
    async fn test_from_missing_file() {
        let err = MemoryGateway::from_file("/nonexistent/inventory.json", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Inventory(_)));
    }
}
