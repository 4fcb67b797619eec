// SPDX-License-Identifier: MIT OR Apache-2.0

//! Field-element packing and hex codecs.
//!
//! Strings enter the hash as UTF-8 bytes packed 31 at a time into BN254
//! field elements. 31 bytes is 248 bits, strictly below the 254-bit
//! modulus, so packing never wraps and the encoding is injective for a
//! fixed byte length.

use crate::F;
use ark_ff::{BigInteger, PrimeField};

/// Bytes per packed limb. 31 × 8 = 248 bits < 254.
pub const PACK_BYTES: usize = 31;

/// Pack a byte string into field elements, 31 bytes per limb, big-endian
/// within each limb, followed by a length limb to keep the encoding
/// injective across different lengths.
#[must_use]
pub fn pack_bytes(bytes: &[u8]) -> Vec<F> {
    let mut limbs: Vec<F> = bytes
        .chunks(PACK_BYTES)
        .map(F::from_be_bytes_mod_order)
        .collect();
    limbs.push(F::from(bytes.len() as u64));
    limbs
}

/// Hex-encode a field element as 32 big-endian bytes.
#[must_use]
pub fn field_to_hex(value: &F) -> String {
    hex::encode(value.into_bigint().to_bytes_be())
}

/// Decode a hex string into a field element.
///
/// Rejects strings longer than 32 bytes and values at or above the
/// modulus; the codec round-trips exactly.
pub fn field_from_hex(hex_str: &str) -> Result<F, FieldCodecError> {
    let bytes = hex::decode(hex_str).map_err(|_| FieldCodecError::NotHex)?;
    if bytes.len() > 32 {
        return Err(FieldCodecError::TooLong { len: bytes.len() });
    }
    let value = F::from_be_bytes_mod_order(&bytes);
    // A canonical encoding re-encodes to the same (left-padded) bytes.
    let mut padded = vec![0u8; 32 - bytes.len()];
    padded.extend_from_slice(&bytes);
    if value.into_bigint().to_bytes_be() != padded {
        return Err(FieldCodecError::NotCanonical);
    }
    Ok(value)
}

/// Errors from the hex codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldCodecError {
    /// Input is not valid hex.
    #[error("not a hex string")]
    NotHex,
    /// Input is longer than a field element.
    #[error("{len} bytes exceeds the 32-byte field encoding")]
    TooLong {
        /// Decoded byte length.
        len: usize,
    },
    /// Input encodes a value at or above the modulus.
    #[error("value is not a canonical field element")]
    NotCanonical,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::Zero;

    #[test]
    fn empty_bytes_pack_to_length_limb_only() {
        let limbs = pack_bytes(b"");
        assert_eq!(limbs, vec![F::from(0u64)]);
    }

    #[test]
    fn short_string_packs_to_two_limbs() {
        let limbs = pack_bytes(b"0612");
        assert_eq!(limbs.len(), 2);
        assert_eq!(limbs[1], F::from(4u64));
    }

    #[test]
    fn limb_boundary_is_exact() {
        assert_eq!(pack_bytes(&[0xAA; 31]).len(), 2);
        assert_eq!(pack_bytes(&[0xAA; 32]).len(), 3);
    }

    #[test]
    fn packing_is_injective_for_padded_variants() {
        // "06" and "06\0" must differ via the length limb.
        assert_ne!(pack_bytes(b"06"), pack_bytes(b"06\0"));
    }

    #[test]
    fn hex_round_trip() {
        let value = F::from(123456789u64);
        let hex = field_to_hex(&value);
        assert_eq!(hex.len(), 64);
        assert_eq!(field_from_hex(&hex).unwrap(), value);
    }

    #[test]
    fn zero_encodes_to_all_zero_hex() {
        let hex = field_to_hex(&F::zero());
        assert_eq!(hex, "0".repeat(64));
        assert_eq!(field_from_hex(&hex).unwrap(), F::zero());
    }

    #[test]
    fn non_canonical_hex_rejected() {
        // The modulus itself is not a canonical element.
        let modulus_hex = "30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001";
        assert_eq!(
            field_from_hex(modulus_hex),
            Err(FieldCodecError::NotCanonical)
        );
    }

    #[test]
    fn garbage_rejected() {
        assert_eq!(field_from_hex("zz"), Err(FieldCodecError::NotHex));
        assert!(matches!(
            field_from_hex(&"ab".repeat(40)),
            Err(FieldCodecError::TooLong { .. })
        ));
    }
}
