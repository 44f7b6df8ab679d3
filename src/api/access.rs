/// Access API endpoints
/// Fingerprint derivation, identity scans and raw inventory listings
use crate::{
    context::AppContext,
    crypto::{Fingerprint, PrivateKeyMaterial},
    error::{AccessError, AccessResult},
    identity::ScanResult,
    inventory::{InstanceRecord, KeyPairRecord},
    metrics,
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Build access routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/fingerprint", get(configured_fingerprint).post(fingerprint))
        .route("/scan", get(configured_scan).post(scan))
        .route("/keypairs", get(list_key_pairs))
        .route("/instances", get(list_instances_by_filter))
        .route("/instances/:keyname", get(list_instances))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintResponse {
    pub fingerprint: Fingerprint,
    /// e.g. `rsa-2048`, `ecdsa-p256`
    pub key_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairsResponse {
    pub key_pairs: Vec<KeyPairRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancesResponse {
    pub instances: Vec<InstanceRecord>,
}

#[derive(Debug, Deserialize)]
pub struct InstanceFilterParams {
    /// Filter name, e.g. `key-name` or `instance-id`
    pub name: String,
    pub value: String,
}

/// GET /fingerprint
///
/// Fingerprint of the configured identity key
pub async fn configured_fingerprint(
    State(ctx): State<AppContext>,
) -> AccessResult<Json<serde_json::Value>> {
    let pem = ctx.identity_pem()?;
    to_json(&derive(&ctx, pem)?)
}

/// POST /fingerprint
///
/// Fingerprint of the PEM private key in the request body
pub async fn fingerprint(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> AccessResult<Json<serde_json::Value>> {
    to_json(&derive(&ctx, &body)?)
}

/// GET /scan
///
/// Allow-list of the configured identity key
pub async fn configured_scan(State(ctx): State<AppContext>) -> AccessResult<Json<serde_json::Value>> {
    let pem = ctx.identity_pem()?;
    to_json(&run_scan(&ctx, pem).await?)
}

/// POST /scan
///
/// Allow-list of the PEM private key in the request body
pub async fn scan(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> AccessResult<Json<serde_json::Value>> {
    to_json(&run_scan(&ctx, &body).await?)
}

/// GET /keypairs
pub async fn list_key_pairs(State(ctx): State<AppContext>) -> AccessResult<Json<serde_json::Value>> {
    let key_pairs = ctx.resolver.list_key_pairs().await?;
    to_json(&KeyPairsResponse { key_pairs })
}

/// GET /instances/:keyname
///
/// Every instance launched with a key pair, with all reported attributes
pub async fn list_instances(
    State(ctx): State<AppContext>,
    Path(key_name): Path<String>,
) -> AccessResult<Json<serde_json::Value>> {
    let instances = ctx.resolver.list_instances_by_key_pair(&key_name).await?;
    to_json(&InstancesResponse { instances })
}

/// GET /instances?name=...&value=...
pub async fn list_instances_by_filter(
    State(ctx): State<AppContext>,
    Query(params): Query<InstanceFilterParams>,
) -> AccessResult<Json<serde_json::Value>> {
    let instances = ctx
        .resolver
        .list_instances_by_filter(&params.name, &params.value)
        .await?;
    to_json(&InstancesResponse { instances })
}

fn derive(ctx: &AppContext, pem: &[u8]) -> AccessResult<FingerprintResponse> {
    let key = PrivateKeyMaterial::from_pem(pem).inspect_err(|e| {
        metrics::record_fingerprint("unknown", e.code());
    })?;
    let algorithm = key.algorithm().as_str();

    let result = ctx
        .resolver
        .engine()
        .derive_from_key(&key)
        .map(|fingerprint| FingerprintResponse {
            fingerprint,
            key_type: key.describe(),
        });

    metrics::record_fingerprint(
        algorithm,
        match &result {
            Ok(_) => "ok",
            Err(e) => e.code(),
        },
    );

    result
}

async fn run_scan(ctx: &AppContext, pem: &[u8]) -> AccessResult<ScanResult> {
    let result = ctx.resolver.scan(pem).await;

    let outcome = match &result {
        Ok(scan) => {
            info!(
                key_name = %scan.key_name,
                allowed = scan.allowed_instances.len(),
                "scan allowed"
            );
            "allowed"
        }
        Err(AccessError::IdentityNotFound { .. }) => {
            info!("scan denied: no key pair matches the identity");
            "denied"
        }
        Err(e) if e.is_key_error() => "invalid_key",
        Err(AccessError::Gateway(_)) => "gateway_error",
        Err(_) => "error",
    };
    metrics::record_scan(
        outcome,
        result.as_ref().ok().map(|scan| scan.allowed_instances.len()),
    );

    result
}

/// Serialization failures surface as `Encoding` errors instead of a partial body
fn to_json<T: Serialize>(value: &T) -> AccessResult<Json<serde_json::Value>> {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| AccessError::Encoding(format!("Failed to serialize response: {}", e)))
}
