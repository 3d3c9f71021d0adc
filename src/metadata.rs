// src/metadata.rs

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::short_address;
use crate::config::Config;

/// Ce que l'on sait afficher d'un token (symbol/name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub mint: String,
    pub symbol: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
}

/// Les métadonnées des deux côtés du pool, quand elles sont connues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTokenMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_a: Option<TokenMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_b: Option<TokenMetadata>,
}

impl PoolTokenMetadata {
    pub fn is_empty(&self) -> bool {
        self.token_a.is_none() && self.token_b.is_none()
    }
}

/// Collaborateur optionnel : une absence ou une erreur se traduit par `None`,
/// jamais par un échec de la requête principale.
#[async_trait]
pub trait TokenMetadataProvider: Send + Sync {
    async fn lookup(&self, mint: &str) -> Option<TokenMetadata>;
}

/// Le fournisseur par défaut quand aucun service n'est configuré.
pub struct NoTokenMetadata;

#[async_trait]
impl TokenMetadataProvider for NoTokenMetadata {
    async fn lookup(&self, _mint: &str) -> Option<TokenMetadata> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    symbol: String,
    name: String,
    #[serde(default)]
    decimals: Option<u8>,
}

/// Un appel HTTP unique `GET <base_url>?mint=<mint>` avec son propre timeout.
pub struct HttpTokenMetadata {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTokenMetadata {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Impossible de construire le client HTTP des métadonnées")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn fetch(&self, mint: &str) -> Result<TokenMetadata> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("mint", mint)])
            .send()
            .await?
            .error_for_status()?;
        let body: MetadataResponse = response.json().await?;
        Ok(TokenMetadata {
            mint: mint.to_string(),
            symbol: body.symbol,
            name: body.name,
            decimals: body.decimals,
        })
    }
}

#[async_trait]
impl TokenMetadataProvider for HttpTokenMetadata {
    async fn lookup(&self, mint: &str) -> Option<TokenMetadata> {
        match self.fetch(mint).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                debug!(mint = %short_address(mint), error = %e, "[Metadata] Métadonnées indisponibles");
                None
            }
        }
    }
}

/// Le fournisseur configuré, ou `NoTokenMetadata` si `TOKEN_METADATA_URL` est absent.
pub fn provider_from_config(config: &Config) -> Result<Box<dyn TokenMetadataProvider>> {
    match config.token_metadata_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => Ok(Box::new(HttpTokenMetadata::new(
            url,
            config.token_metadata_timeout(),
        )?)),
        _ => Ok(Box::new(NoTokenMetadata)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn http_provider_parses_symbol_and_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("mint".into(), "MintA111".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"symbol":"USDC","name":"USD Coin","decimals":6}"#)
            .create_async()
            .await;

        let provider = HttpTokenMetadata::new(server.url(), Duration::from_secs(2)).unwrap();
        let metadata = provider.lookup("MintA111").await.unwrap();
        assert_eq!(metadata.symbol, "USDC");
        assert_eq!(metadata.decimals, Some(6));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_provider_failures_become_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let provider = HttpTokenMetadata::new(server.url(), Duration::from_secs(2)).unwrap();
        assert!(provider.lookup("MintA111").await.is_none());
    }

    #[tokio::test]
    async fn no_provider_always_returns_none() {
        assert!(NoTokenMetadata.lookup("MintA111").await.is_none());
    }

    #[test]
    fn blank_url_falls_back_to_no_provider() {
        let mut config = Config::new("https://primary", "Prog111");
        config.token_metadata_url = Some("  ".into());
        assert!(provider_from_config(&config).is_ok());
    }
}
