// src/cache/mod.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decoders::DecodedPoolState;
use crate::rpc::AccountInfoResult;

pub mod store;

pub use store::{CacheError, CacheLookup, CacheStore, CachedSnapshot, MissReason};

/// Version du document persisté. À incrémenter à chaque changement
/// incompatible du décodeur : les anciennes entrées deviennent des miss.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Une entrée de cache : la réponse RPC brute + l'éventuel décodage.
/// C'est aussi, tel quel, le corps de la réponse HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub pool_address: String,
    pub rpc_response: AccountInfoResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_pool_data: Option<DecodedPoolState>,
}

impl PoolSnapshot {
    /// Un snapshot tout frais, à la version de schéma courante.
    pub fn new(pool_address: &str, rpc_response: AccountInfoResult) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            pool_address: pool_address.to_string(),
            rpc_response,
            parsed_pool_data: None,
        }
    }

    pub fn is_current_schema(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}
