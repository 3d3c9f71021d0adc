use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::types::{AccountInfoResult, RpcEnvelope, RpcRequest};
use crate::address::short_address;
use crate::config::Config;
use crate::monitoring::{MetricEvent, MetricsLog};

/// Échec d'une tentative sur un endpoint : on passe au suivant.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("Erreur réseau: {0}")]
    Network(String),
    #[error("Statut HTTP {0}")]
    HttpStatus(u16),
    #[error("Réponse JSON invalide: {0}")]
    MalformedBody(String),
    #[error("Erreur RPC: {0}")]
    Rpc(String),
}

#[derive(Debug)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub error: EndpointError,
}

/// Les issues qui arrêtent la chaîne de fallback, plus l'échec agrégé.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Compte introuvable")]
    NotFound,
    #[error("Propriétaire inattendu: {found} (attendu {expected})")]
    OwnerMismatch { expected: String, found: String },
    #[error("Données de compte insuffisantes: {actual} octets (minimum {minimum})")]
    InsufficientData { minimum: usize, actual: usize },
    #[error("Données de compte illisibles: {0}")]
    InvalidData(String),
    #[error("Tous les endpoints RPC ont échoué ({} tentatives)", .failures.len())]
    AllEndpointsFailed { failures: Vec<EndpointFailure> },
}

impl FetchError {
    /// Le nœud a répondu, mais le compte n'est pas (ou pas exploitable comme) un pool.
    pub fn is_not_found(&self) -> bool {
        !matches!(self, FetchError::AllEndpointsFailed { .. })
    }
}

/// Un client getAccountInfo qui essaie chaque endpoint dans l'ordre et
/// s'arrête à la première réponse exploitable.
#[derive(Clone)]
pub struct ResilientRpcClient {
    client: reqwest::Client,
    endpoints: Vec<String>,
    expected_owner: String,
    commitment: String,
    min_data_len: usize,
    metrics: MetricsLog,
}

impl ResilientRpcClient {
    /// Construit un nouveau client RPC résilient.
    pub fn new(
        endpoints: Vec<String>,
        expected_owner: String,
        timeout: Duration,
        metrics: MetricsLog,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Impossible de construire le client HTTP RPC")?;
        Ok(Self {
            client,
            endpoints,
            expected_owner,
            commitment: "confirmed".to_string(),
            min_data_len: 100,
            metrics,
        })
    }

    pub fn from_config(config: &Config, metrics: MetricsLog) -> Result<Self> {
        Ok(Self::new(
            config.endpoints(),
            config.pool_program_id.clone(),
            config.rpc_timeout(),
            metrics,
        )?
        .with_commitment(config.rpc_commitment.clone())
        .with_min_data_len(config.min_account_data_len))
    }

    pub fn with_commitment(mut self, commitment: String) -> Self {
        self.commitment = commitment;
        self
    }

    pub fn with_min_data_len(mut self, min_data_len: usize) -> Self {
        self.min_data_len = min_data_len;
        self
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Récupère un compte, endpoint par endpoint.
    /// `NotFound`, `OwnerMismatch` et `InsufficientData` sont des faits du ledger :
    /// on ne les ré-essaie pas ailleurs.
    pub async fn get_account_info(&self, address: &str) -> Result<AccountInfoResult, FetchError> {
        let mut failures = Vec::with_capacity(self.endpoints.len());

        for (index, url) in self.endpoints.iter().enumerate() {
            let label = endpoint_label(index);
            let started = Instant::now();
            let outcome = self.try_endpoint(url, address).await;
            let latency_ms = started.elapsed().as_millis() as u64;

            self.metrics.record(
                address,
                MetricEvent::RpcAttempt {
                    endpoint: label.clone(),
                    success: outcome.is_ok(),
                    latency_ms,
                    error: outcome.as_ref().err().map(ToString::to_string),
                },
            );

            match outcome {
                Ok(result) => {
                    debug!(endpoint = %label, latency_ms, slot = result.context.slot, "[RPC] Réponse reçue");
                    return self.validate(address, result);
                }
                Err(error) => {
                    warn!(
                        endpoint = %label,
                        address = %short_address(address),
                        latency_ms,
                        error = %error,
                        "[RPC] Échec, passage à l'endpoint suivant"
                    );
                    failures.push(EndpointFailure { endpoint: label, error });
                }
            }
        }

        Err(FetchError::AllEndpointsFailed { failures })
    }

    async fn try_endpoint(&self, url: &str, address: &str) -> Result<AccountInfoResult, EndpointError> {
        let request = RpcRequest::get_account_info(address, &self.commitment);
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EndpointError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EndpointError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EndpointError::Network(e.to_string()))?;
        let envelope: RpcEnvelope =
            serde_json::from_str(&body).map_err(|e| EndpointError::MalformedBody(e.to_string()))?;

        if let Some(error) = envelope.error {
            return Err(EndpointError::Rpc(match error.code {
                Some(code) => format!("{} ({})", error.message, code),
                None => error.message,
            }));
        }
        envelope
            .result
            .ok_or_else(|| EndpointError::MalformedBody("ni `result` ni `error`".to_string()))
    }

    fn validate(&self, address: &str, result: AccountInfoResult) -> Result<AccountInfoResult, FetchError> {
        let Some(value) = &result.value else {
            info!(address = %short_address(address), "[RPC] Le compte n'existe pas");
            return Err(FetchError::NotFound);
        };

        if !value.is_owned_by(&self.expected_owner) {
            warn!(address = %short_address(address), owner = %value.owner, "[RPC] Compte d'un autre programme");
            return Err(FetchError::OwnerMismatch {
                expected: self.expected_owner.trim().to_string(),
                found: value.owner.trim().to_string(),
            });
        }

        let data = value
            .decode_data()
            .map_err(|e| FetchError::InvalidData(e.to_string()))?;
        if data.len() < self.min_data_len {
            return Err(FetchError::InsufficientData {
                minimum: self.min_data_len,
                actual: data.len(),
            });
        }

        Ok(result)
    }
}

/// Label stable pour les métriques : jamais l'URL (elle peut contenir une clé d'API).
fn endpoint_label(index: usize) -> String {
    if index == 0 {
        "primary".to_string()
    } else {
        format!("fallback_{index}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_labels_hide_urls() {
        assert_eq!(endpoint_label(0), "primary");
        assert_eq!(endpoint_label(2), "fallback_2");
    }

    #[test]
    fn only_exhaustion_is_an_availability_failure() {
        assert!(FetchError::NotFound.is_not_found());
        assert!(FetchError::InsufficientData { minimum: 100, actual: 3 }.is_not_found());
        assert!(!FetchError::AllEndpointsFailed { failures: vec![] }.is_not_found());
    }
}
