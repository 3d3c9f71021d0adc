// DANS : src/service/coordinator.rs

use anyhow::Context;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::address::{short_address, validate_address, AddressError};
use crate::cache::{CacheLookup, CacheStore, CachedSnapshot, PoolSnapshot};
use crate::config::Config;
use crate::decoders::{decode_pool_state, DecodeError, DecodedPoolState};
use crate::metadata::{provider_from_config, PoolTokenMetadata, TokenMetadataProvider};
use crate::monitoring::{MetricEvent, MetricsLog};
use crate::rpc::{FetchError, ResilientRpcClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
        }
    }
}

/// Les seules issues visibles par le client. Tout le reste est absorbé
/// (miss de cache, échec de décodage, échec de sauvegarde).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Adresse de pool invalide: {0}")]
    BadRequest(#[from] AddressError),
    #[error("Pool introuvable: {0}")]
    NotFound(FetchError),
    #[error("Nœuds RPC indisponibles: {0}")]
    UpstreamUnavailable(FetchError),
    #[error("Erreur interne: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::Internal(_) => 500,
            ServiceError::UpstreamUnavailable(_) => 504,
        }
    }
}

impl From<FetchError> for ServiceError {
    fn from(error: FetchError) -> Self {
        if error.is_not_found() {
            ServiceError::NotFound(error)
        } else {
            ServiceError::UpstreamUnavailable(error)
        }
    }
}

/// Le document renvoyé : l'entrée de cache + les métadonnées de tokens éventuelles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolResponseBody {
    #[serde(flatten)]
    pub snapshot: PoolSnapshot,
    #[serde(skip_serializing_if = "PoolTokenMetadata::is_empty")]
    pub token_metadata: PoolTokenMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolResponse {
    pub body: PoolResponseBody,
    pub cache_status: CacheStatus,
}

impl PoolResponse {
    pub fn generated_at(&self) -> String {
        self.body.snapshot.generated_at.to_rfc3339()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ServiceError> {
        serde_json::to_vec(&self.body).map_err(|e| ServiceError::Internal(e.to_string()))
    }
}

/// Valide l'adresse → cache → (miss) RPC → décodage → sauvegarde → réponse.
pub struct PoolService {
    cache: CacheStore,
    rpc: ResilientRpcClient,
    metadata: Box<dyn TokenMetadataProvider>,
    metrics: MetricsLog,
}

impl PoolService {
    pub fn new(
        cache: CacheStore,
        rpc: ResilientRpcClient,
        metadata: Box<dyn TokenMetadataProvider>,
        metrics: MetricsLog,
    ) -> Self {
        Self {
            cache,
            rpc,
            metadata,
            metrics,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let metrics = MetricsLog::in_dir(&config.cache_dir);
        let cache = CacheStore::from_config(config, metrics.clone());
        cache
            .ensure_root()
            .with_context(|| format!("Impossible de créer le cache '{}'", config.cache_dir.display()))?;
        let rpc = ResilientRpcClient::from_config(config, metrics.clone())?;
        let metadata = provider_from_config(config)?;
        Ok(Self::new(cache, rpc, metadata, metrics))
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    #[instrument(name = "pool_request", skip_all)]
    pub async fn handle(&self, raw_address: Option<&str>) -> Result<PoolResponse, ServiceError> {
        // --- Validation ---
        let address = validate_address(raw_address.unwrap_or_default())?;

        // --- Cache ---
        match self.cache.load(address) {
            CacheLookup::Hit(cached) => {
                debug!(address = %short_address(address), "[Service] Servi depuis le cache");
                let snapshot = self.enrich_cached(address, cached);
                return Ok(self.respond(snapshot, CacheStatus::Hit).await);
            }
            CacheLookup::Miss(reason) => {
                debug!(address = %short_address(address), ?reason, "[Service] Miss, appel RPC");
            }
        }

        // --- RPC ---
        let rpc_response = self.rpc.get_account_info(address).await?;
        let mut snapshot = PoolSnapshot::new(address, rpc_response);

        // --- Décodage (best-effort) ---
        snapshot.parsed_pool_data = self.decode(address, &snapshot);

        // --- Sauvegarde (best-effort, déjà loggée par le store) ---
        if self.cache.save(address, &snapshot).is_err() {
            warn!(address = %short_address(address), "[Service] Réponse servie sans mise en cache");
        }

        info!(
            address = %short_address(address),
            slot = snapshot.rpc_response.context.slot,
            decoded = snapshot.parsed_pool_data.is_some(),
            "[Service] Pool récupéré depuis le RPC"
        );
        Ok(self.respond(snapshot, CacheStatus::Miss).await)
    }

    /// Décode le compte fraîchement récupéré ; un échec est loggé, compté,
    /// et donne une réponse brute seulement.
    fn decode(&self, address: &str, snapshot: &PoolSnapshot) -> Option<DecodedPoolState> {
        match decode_snapshot(snapshot)? {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(address = %short_address(address), error = %e, "[Service] Décodage impossible, réponse brute");
                self.metrics
                    .record(address, MetricEvent::DecodeFailure { error: e.to_string() });
                None
            }
        }
    }

    /// Attache `parsed_pool_data` à une entrée qui ne l'a pas encore, sans toucher à sa fraîcheur.
    fn enrich_cached(&self, address: &str, cached: CachedSnapshot) -> PoolSnapshot {
        let CachedSnapshot {
            mut snapshot,
            modified_at,
        } = cached;
        if snapshot.parsed_pool_data.is_some() {
            return snapshot;
        }

        // L'échec a déjà été compté lors du fetch : pas de nouvelle métrique à chaque hit.
        match decode_snapshot(&snapshot) {
            Some(Ok(decoded)) => snapshot.parsed_pool_data = Some(decoded),
            Some(Err(e)) => {
                debug!(address = %short_address(address), error = %e, "[Service] Entrée brute, toujours indécodable");
                return snapshot;
            }
            None => return snapshot,
        }
        if self
            .cache
            .save_preserving_mtime(address, &snapshot, modified_at)
            .is_ok()
        {
            self.metrics.record(address, MetricEvent::CacheEnriched);
        }
        snapshot
    }

    async fn respond(&self, snapshot: PoolSnapshot, cache_status: CacheStatus) -> PoolResponse {
        let token_metadata = self.lookup_metadata(snapshot.parsed_pool_data.as_ref()).await;
        PoolResponse {
            body: PoolResponseBody {
                snapshot,
                token_metadata,
            },
            cache_status,
        }
    }

    async fn lookup_metadata(&self, decoded: Option<&DecodedPoolState>) -> PoolTokenMetadata {
        let Some(decoded) = decoded else {
            return PoolTokenMetadata::default();
        };
        let (mint_a, mint_b) = decoded.get_mints();
        let (token_a, token_b) = tokio::join!(self.metadata.lookup(mint_a), self.metadata.lookup(mint_b));
        PoolTokenMetadata { token_a, token_b }
    }
}

/// `None` quand le compte n'a pas de `value` (rien à décoder).
fn decode_snapshot(snapshot: &PoolSnapshot) -> Option<Result<DecodedPoolState, DecodeError>> {
    let value = snapshot.rpc_response.value.as_ref()?;
    Some(value.decode_data().and_then(|bytes| decode_pool_state(&bytes)))
}
