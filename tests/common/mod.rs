#![allow(dead_code)]

use std::{path::Path, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use mockito::{Matcher, Mock, ServerGuard};
use pool_snapshot::{
    cache::CacheStore,
    metadata::{NoTokenMetadata, TokenMetadataProvider},
    monitoring::MetricsLog,
    rpc::ResilientRpcClient,
    service::PoolService,
};
use serde_json::json;

pub const PROGRAM_ID: &str = "PooLProgram1111111111111111111111111111111";
pub const POOL_ADDRESS: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
pub const SYSTEM_ADDRESS: &str = "11111111111111111111111111111111";

/// Un compte pool de 170 octets : mints A = [0xff; 32], B = [0x11; 32].
pub fn pool_bytes(flags: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(170);
    data.extend_from_slice(&[0xf1, 0x9a, 0x6d, 0x04, 0x11, 0xb1, 0x6d, 0xbc]);
    data.extend_from_slice(&[0x22; 32]);
    data.extend_from_slice(&[0xff; 32]);
    data.extend_from_slice(&[0x11; 32]);
    data.extend_from_slice(&1u64.to_le_bytes());
    data.extend_from_slice(&1_000u64.to_le_bytes());
    data.extend_from_slice(&[255, 254, 253, 252]);
    data.push(flags);
    data.extend_from_slice(&[0u8; 5]);
    data.extend_from_slice(&10u64.to_le_bytes());
    data.extend_from_slice(&20u64.to_le_bytes());
    data.extend_from_slice(&30u64.to_le_bytes());
    data.extend_from_slice(&40u64.to_le_bytes());
    data.extend_from_slice(&1_700_000_000i64.to_le_bytes());
    data
}

pub fn account_body(owner: &str, data: &[u8]) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": {
            "context": { "slot": 250_000_000u64, "apiVersion": "2.1.0" },
            "value": {
                "data": [STANDARD.encode(data), "base64"],
                "executable": false,
                "lamports": 2_039_280u64,
                "owner": owner,
                "rentEpoch": 18_446_744_073_709_551_615u64,
                "space": data.len()
            }
        }
    })
    .to_string()
}

pub fn not_found_body() -> String {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": { "context": { "slot": 250_000_000u64 }, "value": null }
    })
    .to_string()
}

pub fn rpc_error_body() -> String {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": -32005, "message": "Node is behind" }
    })
    .to_string()
}

/// Un mock `getAccountInfo` qui attend exactement `hits` appels.
pub async fn mock_rpc(server: &mut ServerGuard, status: usize, body: String, hits: usize) -> Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "method": "getAccountInfo" })))
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

/// Un endpoint où rien n'écoute : échec réseau immédiat.
pub fn dead_endpoint() -> String {
    "http://127.0.0.1:9".to_string()
}

pub fn rpc_client(endpoints: Vec<String>, metrics: MetricsLog) -> ResilientRpcClient {
    ResilientRpcClient::new(endpoints, PROGRAM_ID.to_string(), Duration::from_secs(5), metrics)
        .expect("client RPC")
}

pub fn service(dir: &Path, endpoints: Vec<String>) -> PoolService {
    service_with_metadata(dir, endpoints, Box::new(NoTokenMetadata))
}

pub fn service_with_metadata(
    dir: &Path,
    endpoints: Vec<String>,
    metadata: Box<dyn TokenMetadataProvider>,
) -> PoolService {
    let metrics = MetricsLog::in_dir(dir);
    let cache = CacheStore::new(dir, Duration::from_secs(24 * 60 * 60), metrics.clone());
    PoolService::new(cache, rpc_client(endpoints, metrics.clone()), metadata, metrics)
}
