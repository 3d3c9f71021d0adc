// src/decoders/pool.rs

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::base58::encode_base58;
use super::DecodeError;

/// Taille totale du compte pool on-chain.
pub const POOL_STATE_LEN: usize = std::mem::size_of::<PoolStateLayout>();

/// Nombre de champs documentés dans `DecodedPoolState` (hors `flags_decoded`).
pub const POOL_STATE_FIELD_COUNT: usize = 16;

// --- Bits du champ `flags` ---
pub const FLAG_ONE_TO_MANY_RATIO: u8 = 1 << 0;
pub const FLAG_LIQUIDITY_PAUSED: u8 = 1 << 1;
pub const FLAG_SWAPS_PAUSED: u8 = 1 << 2;
pub const FLAG_WITHDRAWAL_PROTECTION: u8 = 1 << 3;
pub const FLAG_SINGLE_LP_TOKEN_MODE: u8 = 1 << 4;
pub const FLAG_OWNER_ONLY: u8 = 1 << 5;

// --- STRUCTURE DE DONNÉES BRUTES (Miroir exact du compte on-chain) ---
// Tous les champs sont des tableaux d'octets : alignement 1, aucun padding,
// et on contrôle nous-mêmes l'endianness (little-endian) au décodage.
// L'ordre et la largeur des champs sont le contrat avec le programme : ne pas toucher.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct PoolStateLayout {
    pub discriminator: [u8; 8],
    pub owner: [u8; 32],
    pub token_a_mint: [u8; 32],
    pub token_b_mint: [u8; 32],
    pub ratio_a_numerator: [u8; 8],
    pub ratio_b_denominator: [u8; 8],
    pub pool_authority_bump: u8,
    pub token_a_vault_bump: u8,
    pub token_b_vault_bump: u8,
    pub lp_mint_bump: u8,
    pub flags: u8,
    pub reserved: [u8; 5],
    pub collected_token_a_fees: [u8; 8],
    pub collected_token_b_fees: [u8; 8],
    pub collected_sol_fees: [u8; 8],
    pub lp_supply: [u8; 8],
    pub last_updated_at: [u8; 8],
}

// --- STRUCTURE DE SORTIE PROPRE ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedPoolState {
    pub discriminator: String,
    pub owner: String,
    pub token_a_mint: String,
    pub token_b_mint: String,
    pub ratio_a_numerator: u64,
    pub ratio_b_denominator: u64,
    pub pool_authority_bump: u8,
    pub token_a_vault_bump: u8,
    pub token_b_vault_bump: u8,
    pub lp_mint_bump: u8,
    pub flags: u8,
    pub collected_token_a_fees: u64,
    pub collected_token_b_fees: u64,
    pub collected_sol_fees: u64,
    pub lp_supply: u64,
    pub last_updated_at: i64,
    pub flags_decoded: PoolFlags,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolFlags {
    pub one_to_many_ratio: bool,
    pub liquidity_paused: bool,
    pub swaps_paused: bool,
    pub withdrawal_protection: bool,
    pub single_lp_token_mode: bool,
    pub owner_only: bool,
}

impl PoolFlags {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            one_to_many_ratio: bits & FLAG_ONE_TO_MANY_RATIO != 0,
            liquidity_paused: bits & FLAG_LIQUIDITY_PAUSED != 0,
            swaps_paused: bits & FLAG_SWAPS_PAUSED != 0,
            withdrawal_protection: bits & FLAG_WITHDRAWAL_PROTECTION != 0,
            single_lp_token_mode: bits & FLAG_SINGLE_LP_TOKEN_MODE != 0,
            owner_only: bits & FLAG_OWNER_ONLY != 0,
        }
    }
}

impl DecodedPoolState {
    /// Le ratio du pool, pour l'affichage uniquement.
    pub fn ratio(&self) -> Option<f64> {
        if self.ratio_b_denominator == 0 {
            None
        } else {
            Some(self.ratio_a_numerator as f64 / self.ratio_b_denominator as f64)
        }
    }

    /// Les deux mints du pool, dans l'ordre (A, B).
    pub fn get_mints(&self) -> (&str, &str) {
        (&self.token_a_mint, &self.token_b_mint)
    }
}

/// Décode les données brutes d'un compte pool.
/// Les octets au-delà du layout sont ignorés ; un buffer plus court est une erreur.
pub fn decode_pool_state(data: &[u8]) -> Result<DecodedPoolState, DecodeError> {
    if data.len() < POOL_STATE_LEN {
        return Err(DecodeError::Truncated {
            expected: POOL_STATE_LEN,
            actual: data.len(),
        });
    }

    let layout: &PoolStateLayout = bytemuck::try_from_bytes(&data[..POOL_STATE_LEN])
        .map_err(|e| DecodeError::Layout(e.to_string()))?;

    Ok(DecodedPoolState {
        discriminator: hex::encode(layout.discriminator),
        owner: encode_base58(&layout.owner),
        token_a_mint: encode_base58(&layout.token_a_mint),
        token_b_mint: encode_base58(&layout.token_b_mint),
        ratio_a_numerator: u64::from_le_bytes(layout.ratio_a_numerator),
        ratio_b_denominator: u64::from_le_bytes(layout.ratio_b_denominator),
        pool_authority_bump: layout.pool_authority_bump,
        token_a_vault_bump: layout.token_a_vault_bump,
        token_b_vault_bump: layout.token_b_vault_bump,
        lp_mint_bump: layout.lp_mint_bump,
        flags: layout.flags,
        collected_token_a_fees: u64::from_le_bytes(layout.collected_token_a_fees),
        collected_token_b_fees: u64::from_le_bytes(layout.collected_token_b_fees),
        collected_sol_fees: u64::from_le_bytes(layout.collected_sol_fees),
        lp_supply: u64::from_le_bytes(layout.lp_supply),
        // Complément à deux : une valeur >= 2^63 redevient négative.
        last_updated_at: i64::from_le_bytes(layout.last_updated_at),
        flags_decoded: PoolFlags::from_bits(layout.flags),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::mem::offset_of;

    /// Construit un compte pool de 170 octets avec des valeurs reconnaissables.
    pub(crate) fn sample_pool_bytes(flags: u8) -> Vec<u8> {
        let mut data = Vec::with_capacity(POOL_STATE_LEN);
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data.extend_from_slice(&[0u8; 32]);
        data.extend_from_slice(&[0xff; 32]);
        let mut mint_b = [9u8; 32];
        mint_b[0] = 0;
        data.extend_from_slice(&mint_b);
        data.extend_from_slice(&1_000u64.to_le_bytes());
        data.extend_from_slice(&3u64.to_le_bytes());
        data.extend_from_slice(&[254, 253, 252, 251]);
        data.push(flags);
        data.extend_from_slice(&[0u8; 5]);
        data.extend_from_slice(&42u64.to_le_bytes());
        data.extend_from_slice(&u64::MAX.to_le_bytes());
        data.extend_from_slice(&5_000_000u64.to_le_bytes());
        data.extend_from_slice(&777u64.to_le_bytes());
        data.extend_from_slice(&1_700_000_000i64.to_le_bytes());
        data
    }

    #[test]
    fn layout_matches_the_on_chain_offsets() {
        assert_eq!(POOL_STATE_LEN, 170);
        assert_eq!(offset_of!(PoolStateLayout, owner), 8);
        assert_eq!(offset_of!(PoolStateLayout, token_b_mint), 72);
        assert_eq!(offset_of!(PoolStateLayout, ratio_a_numerator), 104);
        assert_eq!(offset_of!(PoolStateLayout, pool_authority_bump), 120);
        assert_eq!(offset_of!(PoolStateLayout, flags), 124);
        assert_eq!(offset_of!(PoolStateLayout, collected_token_a_fees), 130);
        assert_eq!(offset_of!(PoolStateLayout, last_updated_at), 162);
    }

    #[test]
    fn decodes_a_170_byte_pool() {
        let data = sample_pool_bytes(0b0000_0011);
        assert_eq!(data.len(), 170);

        let pool = decode_pool_state(&data).unwrap();
        assert_eq!(pool.discriminator, "0102030405060708");
        assert_eq!(pool.owner, "1".repeat(32));
        assert_eq!(pool.token_a_mint, "JEKNVnkbo3jma5nREBBJCDoXFVeKkD56V3xKrvRmWxFG");
        assert!(pool.token_b_mint.starts_with('1'));
        assert_eq!(pool.ratio_a_numerator, 1_000);
        assert_eq!(pool.ratio_b_denominator, 3);
        assert_eq!(
            (pool.pool_authority_bump, pool.token_a_vault_bump, pool.token_b_vault_bump, pool.lp_mint_bump),
            (254, 253, 252, 251)
        );
        assert_eq!(pool.collected_token_a_fees, 42);
        assert_eq!(pool.collected_token_b_fees, u64::MAX);
        assert_eq!(pool.collected_sol_fees, 5_000_000);
        assert_eq!(pool.lp_supply, 777);
        assert_eq!(pool.last_updated_at, 1_700_000_000);
    }

    #[test]
    fn flags_byte_three_sets_the_first_two_bits() {
        let pool = decode_pool_state(&sample_pool_bytes(0b0000_0011)).unwrap();
        assert_eq!(
            pool.flags_decoded,
            PoolFlags {
                one_to_many_ratio: true,
                liquidity_paused: true,
                swaps_paused: false,
                withdrawal_protection: false,
                single_lp_token_mode: false,
                owner_only: false,
            }
        );
    }

    #[test]
    fn every_flag_bit_maps_to_its_name() {
        let all = PoolFlags::from_bits(0b0011_1111);
        assert!(all.one_to_many_ratio && all.liquidity_paused && all.swaps_paused);
        assert!(all.withdrawal_protection && all.single_lp_token_mode && all.owner_only);

        assert!(PoolFlags::from_bits(FLAG_SWAPS_PAUSED).swaps_paused);
        assert!(PoolFlags::from_bits(FLAG_SINGLE_LP_TOKEN_MODE).single_lp_token_mode);
        // Les bits 6 et 7 ne sont pas interprétés.
        assert_eq!(PoolFlags::from_bits(0b1100_0000), PoolFlags::default());
    }

    #[test]
    fn serialized_record_has_the_documented_field_count() {
        let pool = decode_pool_state(&sample_pool_bytes(0)).unwrap();
        let value = serde_json::to_value(&pool).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), POOL_STATE_FIELD_COUNT + 1);
        assert!(object.contains_key("flags_decoded"));
    }

    #[test]
    fn negative_timestamp_uses_twos_complement() {
        let mut data = sample_pool_bytes(0);
        data[162..170].copy_from_slice(&[0xff; 8]);
        assert_eq!(decode_pool_state(&data).unwrap().last_updated_at, -1);

        data[162..170].copy_from_slice(&(1u64 << 63).to_le_bytes());
        assert_eq!(decode_pool_state(&data).unwrap().last_updated_at, i64::MIN);
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let data = sample_pool_bytes(0);
        let err = decode_pool_state(&data[..169]).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { expected: 170, actual: 169 });
        assert!(decode_pool_state(&[]).is_err());
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut data = sample_pool_bytes(0b100);
        let expected = decode_pool_state(&data).unwrap();
        data.extend_from_slice(&[0xaa; 30]);
        assert_eq!(decode_pool_state(&data).unwrap(), expected);
    }

    #[test]
    fn decoding_is_deterministic() {
        let data = sample_pool_bytes(0b10_1010);
        assert_eq!(decode_pool_state(&data).unwrap(), decode_pool_state(&data).unwrap());
    }

    #[test]
    fn ratio_guards_against_zero_denominator() {
        let mut pool = decode_pool_state(&sample_pool_bytes(0)).unwrap();
        assert!(pool.ratio().is_some());
        pool.ratio_b_denominator = 0;
        assert_eq!(pool.ratio(), None);
    }
}
