/// AWS EC2 inventory backend
use crate::inventory::{
    GatewayError, InstanceFilter, InstancePage, InstanceRecord, InventoryGateway, KeyPairRecord,
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::{Filter, Instance};
use aws_sdk_ec2::Client;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration for the EC2 backend
#[derive(Debug, Clone)]
pub struct Ec2Config {
    /// AWS region (e.g., "eu-central-1")
    pub region: String,

    /// Custom endpoint for EC2-compatible APIs or local emulators
    pub endpoint: Option<String>,
}

impl Default for Ec2Config {
    fn default() -> Self {
        Self {
            region: "eu-central-1".to_string(),
            endpoint: None,
        }
    }
}

/// EC2 backend
///
/// Credentials and session come from the default AWS provider chain
/// (environment, shared config, instance profile).
#[derive(Clone)]
pub struct Ec2Gateway {
    client: Arc<Client>,
}

impl Ec2Gateway {
    /// Create a new EC2 backend
    pub async fn new(config: Ec2Config) -> Self {
        info!("Initializing EC2 inventory (region: {})", config.region);

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region));

        if let Some(endpoint) = config.endpoint {
            debug!("Using custom EC2 endpoint: {}", endpoint);
            loader = loader.endpoint_url(endpoint);
        }

        let shared_config = loader.load().await;
        Self::from_client(Client::new(&shared_config))
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl InventoryGateway for Ec2Gateway {
    fn name(&self) -> &'static str {
        "ec2"
    }

    async fn list_key_pairs(&self) -> Result<Vec<KeyPairRecord>, GatewayError> {
        let output = self
            .client
            .describe_key_pairs()
            .send()
            .await
            .map_err(|e| map_sdk_error("DescribeKeyPairs", e))?;

        let key_pairs = output
            .key_pairs()
            .iter()
            .filter_map(|kp| {
                Some(KeyPairRecord {
                    name: kp.key_name()?.to_string(),
                    fingerprint: kp.key_fingerprint()?.to_string(),
                })
            })
            .collect();

        Ok(key_pairs)
    }

    async fn list_instances(
        &self,
        filter: &InstanceFilter,
        next_token: Option<String>,
    ) -> Result<InstancePage, GatewayError> {
        let ec2_filter = Filter::builder()
            .name(&filter.name)
            .set_values(Some(filter.values.clone()))
            .build();

        let output = self
            .client
            .describe_instances()
            .filters(ec2_filter)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| map_sdk_error("DescribeInstances", e))?;

        let instances = output
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .filter_map(instance_record)
            .collect();

        Ok(InstancePage {
            instances,
            next_token: output.next_token().map(str::to_string),
        })
    }
}

/// Convert an SDK instance, keeping the commonly useful attributes
fn instance_record(instance: &Instance) -> Option<InstanceRecord> {
    let mut record = InstanceRecord::new(
        instance.instance_id()?,
        instance.private_ip_address().map(str::to_string),
    );

    if let Some(key_name) = instance.key_name() {
        record = record.with_key_name(key_name);
    }
    if let Some(instance_type) = instance.instance_type() {
        record = record.with_attribute("instanceType", json!(instance_type.as_str()));
    }
    if let Some(state) = instance.state().and_then(|s| s.name()) {
        record = record.with_attribute("state", json!(state.as_str()));
    }
    if let Some(az) = instance.placement().and_then(|p| p.availability_zone()) {
        record = record.with_attribute("availabilityZone", json!(az));
    }
    if let Some(ip) = instance.public_ip_address() {
        record = record.with_attribute("publicIpAddress", json!(ip));
    }
    if let Some(vpc_id) = instance.vpc_id() {
        record = record.with_attribute("vpcId", json!(vpc_id));
    }
    if let Some(launch_time) = instance.launch_time() {
        record = record.with_attribute("launchTime", json!(launch_time.to_string()));
    }

    let tags: Map<String, Value> = instance
        .tags()
        .iter()
        .filter_map(|tag| Some((tag.key()?.to_string(), json!(tag.value().unwrap_or_default()))))
        .collect();
    if !tags.is_empty() {
        record = record.with_attribute("tags", Value::Object(tags));
    }

    Some(record)
}

fn map_sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> GatewayError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::ServiceError(service) => {
            let inner = service.err();
            GatewayError::Api {
                operation,
                code: inner.code().unwrap_or("Unknown").to_string(),
                message: inner.message().unwrap_or_default().to_string(),
            }
        }
        _ => GatewayError::Transport(format!(
            "{} failed: {}",
            operation,
            DisplayErrorContext(&err)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::{InstanceState, InstanceStateName, InstanceType, Tag};

    #[test]
    fn test_instance_record_conversion() {
        let instance = Instance::builder()
            .instance_id("i-0abc")
            .private_ip_address("10.0.0.7")
            .key_name("dev")
            .instance_type(InstanceType::T3Micro)
            .state(InstanceState::builder().name(InstanceStateName::Running).build())
            .tags(Tag::builder().key("Name").value("bastion").build())
            .build();

        let record = instance_record(&instance).unwrap();
        assert_eq!(record.instance_id, "i-0abc");
        assert_eq!(record.private_ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(record.key_name.as_deref(), Some("dev"));
        assert_eq!(record.attributes["instanceType"], json!("t3.micro"));
        assert_eq!(record.attributes["state"], json!("running"));
        assert_eq!(record.attributes["tags"], json!({"Name": "bastion"}));
    }

    #[test]
    fn test_instance_without_id_is_skipped() {
        let instance = Instance::builder().private_ip_address("10.0.0.7").build();
        assert!(instance_record(&instance).is_none());
    }
}
