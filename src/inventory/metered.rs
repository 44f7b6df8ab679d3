/// Metrics decorator for inventory backends
use crate::inventory::{GatewayError, InstanceFilter, InstancePage, InventoryGateway, KeyPairRecord};
use crate::metrics;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Wraps a gateway and records call counts and latencies
pub struct MeteredGateway {
    inner: Arc<dyn InventoryGateway>,
}

impl MeteredGateway {
    pub fn new(inner: Arc<dyn InventoryGateway>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl InventoryGateway for MeteredGateway {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn list_key_pairs(&self) -> Result<Vec<KeyPairRecord>, GatewayError> {
        let start = Instant::now();
        let result = self.inner.list_key_pairs().await;
        metrics::record_gateway_call(
            self.inner.name(),
            "list_key_pairs",
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    async fn list_instances(
        &self,
        filter: &InstanceFilter,
        next_token: Option<String>,
    ) -> Result<InstancePage, GatewayError> {
        let start = Instant::now();
        let result = self.inner.list_instances(filter, next_token).await;
        metrics::record_gateway_call(
            self.inner.name(),
            "list_instances",
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );
        result
    }
}
