use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Toute la configuration du service, construite une fois au démarrage
/// puis passée explicitement à chaque composant.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub solana_rpc_url: String,
    /// Fallbacks, dans l'ordre (`SOLANA_RPC_FALLBACK_URLS=url1,url2`).
    #[serde(default)]
    pub solana_rpc_fallback_urls: Vec<String>,
    /// Le programme qui doit posséder les comptes pool.
    pub pool_program_id: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    #[serde(default = "default_rpc_commitment")]
    pub rpc_commitment: String,
    #[serde(default = "default_min_account_data_len")]
    pub min_account_data_len: usize,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub token_metadata_url: Option<String>,
    #[serde(default = "default_token_metadata_timeout_ms")]
    pub token_metadata_timeout_ms: u64,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}
fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}
fn default_rpc_timeout_secs() -> u64 {
    15
}
fn default_rpc_commitment() -> String {
    "confirmed".to_string()
}
fn default_min_account_data_len() -> usize {
    100
}
fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_token_metadata_timeout_ms() -> u64 {
    2_000
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .context("Configuration invalide (SOLANA_RPC_URL et POOL_PROGRAM_ID sont requis)")?;
        config.validate()?;
        Ok(config)
    }

    /// Une configuration minimale, le reste aux valeurs par défaut.
    pub fn new(solana_rpc_url: impl Into<String>, pool_program_id: impl Into<String>) -> Self {
        Self {
            solana_rpc_url: solana_rpc_url.into(),
            solana_rpc_fallback_urls: Vec::new(),
            pool_program_id: pool_program_id.into(),
            cache_dir: default_cache_dir(),
            cache_ttl_secs: default_cache_ttl_secs(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            rpc_commitment: default_rpc_commitment(),
            min_account_data_len: default_min_account_data_len(),
            listen_addr: default_listen_addr(),
            token_metadata_url: None,
            token_metadata_timeout_ms: default_token_metadata_timeout_ms(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoints().is_empty() {
            bail!("Aucun endpoint RPC configuré");
        }
        if self.pool_program_id.trim().is_empty() {
            bail!("POOL_PROGRAM_ID est vide");
        }
        if self.rpc_timeout_secs == 0 {
            bail!("RPC_TIMEOUT_SECS doit être > 0");
        }
        Ok(())
    }

    /// Endpoint principal puis fallbacks, sans doublons ni entrées vides.
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = Vec::new();
        for url in std::iter::once(&self.solana_rpc_url).chain(&self.solana_rpc_fallback_urls) {
            let url = url.trim();
            if !url.is_empty() && !endpoints.iter().any(|e| e == url) {
                endpoints.push(url.to_string());
            }
        }
        endpoints
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn token_metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.token_metadata_timeout_ms)
    }
}
