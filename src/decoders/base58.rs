// src/decoders/base58.rs

// `bs58` travaille en grand entier octet par octet : une clé de 32 octets
// dépasse largement un u64, il n'y a pas de chemin à largeur fixe.

/// Encode des octets en base58 (alphabet Bitcoin/Solana).
/// Chaque octet nul en tête devient un `1` en tête.
pub fn encode_base58(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Décode une chaîne base58, utilisé pour les payloads de compte encodés en base58.
pub fn decode_base58(encoded: &str) -> Result<Vec<u8>, bs58::decode::Error> {
    bs58::decode(encoded).into_vec()
}
