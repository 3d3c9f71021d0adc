// src/address.rs

use thiserror::Error;

/// Longueurs admises pour une adresse base58 (32 octets encodés).
pub const MIN_ADDRESS_LEN: usize = 32;
pub const MAX_ADDRESS_LEN: usize = 44;

/// Nombre de caractères gardés quand on logge une adresse.
const SHORT_ADDRESS_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Adresse manquante")]
    Missing,
    #[error("Longueur d'adresse invalide: {0} (attendu entre 32 et 44)")]
    InvalidLength(usize),
    #[error("Caractère hors de l'alphabet base58: {0:?}")]
    InvalidCharacter(char),
}

/// L'alphabet base58 de Bitcoin/Solana : chiffres et lettres ASCII sauf `0`, `O`, `I`, `l`.
pub fn is_base58_char(c: char) -> bool {
    c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

/// Valide une adresse fournie par l'extérieur et retourne sa forme nettoyée (trim).
pub fn validate_address(input: &str) -> Result<&str, AddressError> {
    let address = input.trim();
    if address.is_empty() {
        return Err(AddressError::Missing);
    }
    // L'alphabet est ASCII, on peut donc compter en octets une fois les caractères vérifiés.
    if let Some(bad) = address.chars().find(|c| !is_base58_char(*c)) {
        return Err(AddressError::InvalidCharacter(bad));
    }
    let len = address.len();
    if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&len) {
        return Err(AddressError::InvalidLength(len));
    }
    Ok(address)
}

/// Construit une clé de cache utilisable dans un nom de fichier.
/// Appliqué même sur une adresse déjà validée, avant toute construction de chemin.
pub fn sanitize_cache_key(address: &str) -> String {
    address.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Préfixe court pour les logs et le journal de métriques.
pub fn short_address(address: &str) -> String {
    address.chars().take(SHORT_ADDRESS_LEN).collect()
}
