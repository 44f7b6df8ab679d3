/// Identity Resolver - Orchestrates fingerprinting and inventory lookups
use crate::{
    crypto::{Fingerprint, FingerprintEngine},
    error::{AccessError, AccessResult},
    inventory::{InstanceFilter, InstanceRecord, InventoryGateway, KeyPairRecord},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a successful scan
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Key pair the identity resolved to
    pub key_name: String,
    pub fingerprint: Fingerprint,
    /// Id and private address of every instance launched with `key_name`, in listing order
    pub allowed_instances: Vec<InstanceRecord>,
    pub scanned_at: DateTime<Utc>,
}

/// Main identity resolver - combines the fingerprint engine with an inventory
///
/// Holds no per-call state; concurrent scans are independent.
#[derive(Clone)]
pub struct IdentityResolver {
    engine: FingerprintEngine,
    gateway: Arc<dyn InventoryGateway>,
}

impl IdentityResolver {
    /// Create a new identity resolver
    pub fn new(engine: FingerprintEngine, gateway: Arc<dyn InventoryGateway>) -> Self {
        Self { engine, gateway }
    }

    pub fn engine(&self) -> &FingerprintEngine {
        &self.engine
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway.name()
    }

    /// Resolve a PEM identity to its allow-list
    ///
    /// Resolution order:
    /// 1. Derive the identity's fingerprint
    /// 2. Find the key pair registered with that fingerprint
    /// 3. Collect every page of instances launched with that key pair
    ///
    /// Any failure aborts the scan; pages already fetched are discarded.
    pub async fn scan(&self, identity_pem: &[u8]) -> AccessResult<ScanResult> {
        let fingerprint = self.engine.derive(identity_pem)?;
        debug!("identity fingerprint derived");

        let key_pair = self.resolve_key_pair(&fingerprint).await?;
        debug!(key_name = %key_pair.name, "identity matched key pair");

        let allowed_instances: Vec<InstanceRecord> = self
            .list_instances_by_key_pair(&key_pair.name)
            .await?
            .into_iter()
            .map(InstanceRecord::project)
            .collect();

        debug!(
            key_name = %key_pair.name,
            allowed = allowed_instances.len(),
            "scan complete"
        );

        Ok(ScanResult {
            key_name: key_pair.name,
            fingerprint,
            allowed_instances,
            scanned_at: Utc::now(),
        })
    }

    /// Find the first key pair whose fingerprint equals `fingerprint` exactly
    pub async fn resolve_key_pair(&self, fingerprint: &Fingerprint) -> AccessResult<KeyPairRecord> {
        let key_pairs = self.list_key_pairs().await?;
        debug!(
            gateway = self.gateway.name(),
            key_pairs = key_pairs.len(),
            "key pairs fetched"
        );

        key_pairs
            .into_iter()
            .find(|kp| *fingerprint == kp.fingerprint.as_str())
            .ok_or_else(|| AccessError::IdentityNotFound {
                fingerprint: fingerprint.to_string(),
            })
    }

    /// List every registered key pair, unfiltered
    pub async fn list_key_pairs(&self) -> AccessResult<Vec<KeyPairRecord>> {
        Ok(self.gateway.list_key_pairs().await?)
    }

    /// List every instance launched with `key_name`
    ///
    /// Records the gateway tags with another key pair are dropped.
    pub async fn list_instances_by_key_pair(
        &self,
        key_name: &str,
    ) -> AccessResult<Vec<InstanceRecord>> {
        let filter = InstanceFilter::key_name(key_name);
        let mut instances = self.collect_instances(&filter).await?;

        let before = instances.len();
        instances.retain(|instance| {
            instance
                .key_name
                .as_deref()
                .map_or(true, |name| name == key_name)
        });
        if instances.len() != before {
            warn!(
                gateway = self.gateway.name(),
                key_name = %key_name,
                dropped = before - instances.len(),
                "gateway returned instances of another key pair"
            );
        }

        Ok(instances)
    }

    /// List every instance whose `filter_key` equals `filter_value`
    pub async fn list_instances_by_filter(
        &self,
        filter_key: &str,
        filter_value: &str,
    ) -> AccessResult<Vec<InstanceRecord>> {
        if filter_key.is_empty() {
            return Err(AccessError::Validation(
                "Filter name cannot be empty".to_string(),
            ));
        }

        self.collect_instances(&InstanceFilter::new(filter_key, filter_value))
            .await
    }

    /// Follow continuation tokens until the gateway reports the last page
    async fn collect_instances(&self, filter: &InstanceFilter) -> AccessResult<Vec<InstanceRecord>> {
        let mut instances = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.gateway.list_instances(filter, next_token.take()).await?;
            pages += 1;
            debug!(
                gateway = self.gateway.name(),
                filter = %filter.name,
                page = pages,
                instances = page.instances.len(),
                "instance page fetched"
            );

            let last = page.is_last();
            instances.extend(page.instances);
            if last {
                break;
            }
            next_token = page.next_token;
        }

        Ok(instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::MemoryGateway;

    const EC_P256_SEC1: &str = include_str!("../../tests/fixtures/ec_p256_sec1.pem");
    const EC_P256_FINGERPRINT: &str =
        "0b:41:23:09:ed:3b:f3:2e:2f:f9:c2:65:7b:07:61:f5:f8:c1:ec:a8";

    fn create_test_resolver(page_size: usize) -> IdentityResolver {
        let key_pairs = vec![
            KeyPairRecord {
                name: "prod".into(),
                fingerprint: "11:22:33".into(),
            },
            KeyPairRecord {
                name: "dev".into(),
                fingerprint: EC_P256_FINGERPRINT.into(),
            },
        ];
        let instances = (1..=5)
            .map(|n| {
                let key = if n == 3 { "prod" } else { "dev" };
                InstanceRecord::new(format!("i-{}", n), Some(format!("10.0.0.{}", n)))
                    .with_key_name(key)
                    .with_attribute("state", serde_json::json!("running"))
            })
            .collect();

        let gateway = MemoryGateway::new(key_pairs, instances).with_page_size(page_size);
        IdentityResolver::new(FingerprintEngine::default(), Arc::new(gateway))
    }

    #[tokio::test]
    async fn test_scan_collects_all_pages() {
        for page_size in [1, 2, 3, 100] {
            let resolver = create_test_resolver(page_size);
            let result = resolver.scan(EC_P256_SEC1.as_bytes()).await.unwrap();

            assert_eq!(result.key_name, "dev");
            assert_eq!(result.fingerprint, EC_P256_FINGERPRINT);
            let ids: Vec<_> = result
                .allowed_instances
                .iter()
                .map(|i| i.instance_id.as_str())
                .collect();
            assert_eq!(ids, vec!["i-1", "i-2", "i-4", "i-5"], "page size {}", page_size);
            assert!(result.allowed_instances.iter().all(|i| i.attributes.is_empty()));
        }
    }

    #[tokio::test]
    async fn test_list_instances_keeps_attributes() {
        let resolver = create_test_resolver(2);
        let instances = resolver.list_instances_by_key_pair("prod").await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].attributes["state"], serde_json::json!("running"));
    }

    #[tokio::test]
    async fn test_list_instances_by_filter() {
        let resolver = create_test_resolver(2);
        let instances = resolver
            .list_instances_by_filter("private-ip-address", "10.0.0.4")
            .await
            .unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].instance_id, "i-4");

        let err = resolver.list_instances_by_filter("", "x").await.unwrap_err();
        assert!(matches!(err, AccessError::Validation(_)));
    }

    #[tokio::test]
    async fn test_resolve_unknown_fingerprint() {
        let resolver = create_test_resolver(2);
        let fp = Fingerprint::parse("00:0d:1a:27:34:41:4e:5b:68:75:82:8f:9c:a9:b6:c3:d0:dd:ea:f7")
            .unwrap();
        let err = resolver.resolve_key_pair(&fp).await.unwrap_err();
        assert!(matches!(err, AccessError::IdentityNotFound { .. }));
    }

    #[tokio::test]
    async fn test_scan_rejects_bad_identity_before_io() {
        let resolver = create_test_resolver(2);
        let err = resolver.scan(b"not a pem").await.unwrap_err();
        assert!(matches!(err, AccessError::MalformedKey(_)));
    }
}
