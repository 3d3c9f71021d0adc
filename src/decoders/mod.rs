// src/decoders/mod.rs

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

// --- 1. Déclarer nos modules ---
pub mod base58;
pub mod pool;

// --- 2. Ré-exporter l'essentiel ---
pub use base58::encode_base58;
pub use pool::{decode_pool_state, DecodedPoolState, PoolFlags, POOL_STATE_FIELD_COUNT, POOL_STATE_LEN};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Données tronquées: {expected} octets attendus, {actual} reçus")]
    Truncated { expected: usize, actual: usize },
    #[error("Layout invalide: {0}")]
    Layout(String),
    #[error("Encodage de transport non supporté: {0}")]
    UnsupportedEncoding(String),
    #[error("Payload {encoding} invalide: {reason}")]
    InvalidPayload { encoding: String, reason: String },
}

/// Décode le premier élément de `data: [payload, encoding]` renvoyé par le RPC,
/// selon l'encodage déclaré par le fil lui-même.
pub fn decode_account_data(payload: &str, encoding: &str) -> Result<Vec<u8>, DecodeError> {
    match encoding {
        "base64" => STANDARD.decode(payload).map_err(|e| DecodeError::InvalidPayload {
            encoding: encoding.to_string(),
            reason: e.to_string(),
        }),
        "base58" => base58::decode_base58(payload).map_err(|e| DecodeError::InvalidPayload {
            encoding: encoding.to_string(),
            reason: e.to_string(),
        }),
        other => Err(DecodeError::UnsupportedEncoding(other.to_string())),
    }
}
