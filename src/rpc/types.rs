// src/rpc/types.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::decoders::{decode_account_data, DecodeError};

pub const GET_ACCOUNT_INFO: &str = "getAccountInfo";

// --- Requête ---

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: (&'a str, AccountInfoConfig<'a>),
}

#[derive(Debug, Serialize)]
pub struct AccountInfoConfig<'a> {
    pub encoding: &'a str,
    pub commitment: &'a str,
}

impl<'a> RpcRequest<'a> {
    pub fn get_account_info(address: &'a str, commitment: &'a str) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method: GET_ACCOUNT_INFO,
            params: (
                address,
                AccountInfoConfig {
                    encoding: "base64",
                    commitment,
                },
            ),
        }
    }
}

// --- Réponse ---

/// L'enveloppe JSON-RPC : exactement un de `result` / `error`.
#[derive(Debug, Deserialize)]
pub struct RpcEnvelope {
    #[serde(default)]
    pub result: Option<AccountInfoResult>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorObject {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

/// Le `result` de getAccountInfo, conservé tel quel dans le cache.
/// Les clés que l'on ne modélise pas passent par `extra` et sont réécrites à l'identique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfoResult {
    pub context: RpcContext,
    pub value: Option<AccountValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcContext {
    pub slot: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountValue {
    pub data: AccountData,
    pub owner: String,
    pub lamports: u64,
    pub executable: bool,
    pub rent_epoch: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `data: [payload, encoding]` tel qu'envoyé par le nœud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountData(pub String, pub String);

impl AccountData {
    pub fn payload(&self) -> &str {
        &self.0
    }

    pub fn encoding(&self) -> &str {
        &self.1
    }
}

impl AccountValue {
    /// Les octets bruts du compte, selon l'encodage déclaré.
    pub fn decode_data(&self) -> Result<Vec<u8>, DecodeError> {
        decode_account_data(self.data.payload(), self.data.encoding())
    }

    pub fn is_owned_by(&self, program_id: &str) -> bool {
        self.owner.trim() == program_id.trim()
    }
}
