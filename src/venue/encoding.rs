//! Canonical byte encoding of field elements.
//!
//! All field elements are 32 bytes, BIG-ENDIAN, left zero-padded (the
//! Solidity `uint256` layout). Since every value is `< p < 2^254` it always
//! fits. The venue hash preimage is four such words in the fixed order
//! `[lat, lon, threshold_sq, event_id]`; reordering changes every hash.
//!
//! Circuit inputs are decimal strings, not these bytes. Do not mix the two.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;

use crate::field::{field_modulus, FieldError};

/// Byte length of the venue hash preimage (four 32-byte words).
pub const VENUE_HASH_INPUT_LEN: usize = 4 * 32;

/// Encode a field element as a 32-byte big-endian word.
pub fn encode_uint256(value: &Fr) -> [u8; 32] {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    let start = 32usize.saturating_sub(bytes.len());
    out[start..].copy_from_slice(&bytes[bytes.len() - (32 - start)..]);
    out
}

/// Decode a 32-byte big-endian word, rejecting non-canonical values.
pub fn decode_uint256(bytes: &[u8; 32]) -> Result<Fr, FieldError> {
    if BigUint::from_bytes_be(bytes) >= field_modulus() {
        return Err(FieldError::NonCanonical);
    }
    Ok(Fr::from_be_bytes_mod_order(bytes))
}

/// Concatenate the four venue commitment words in wire order.
pub fn encode_venue_hash_input(
    venue_lat: &Fr,
    venue_lon: &Fr,
    threshold_sq: &Fr,
    event_id: &Fr,
) -> [u8; VENUE_HASH_INPUT_LEN] {
    let mut out = [0u8; VENUE_HASH_INPUT_LEN];
    for (word, value) in out
        .chunks_exact_mut(32)
        .zip([venue_lat, venue_lon, threshold_sq, event_id])
    {
        word.copy_from_slice(&encode_uint256(value));
    }
    out
}

/// `0x`-prefixed, zero-padded 64 hex digit rendering (bytes32).
pub fn to_bytes32_hex(value: &Fr) -> String {
    format!("0x{}", hex::encode(encode_uint256(value)))
}

/// Parse a bytes32 hex string (prefix optional, at most 32 bytes).
pub fn from_bytes32_hex(input: &str) -> Result<Fr, FieldError> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    let padded = if digits.len() % 2 == 1 {
        format!("0{}", digits)
    } else {
        digits.to_string()
    };
    let bytes = hex::decode(&padded).map_err(|_| FieldError::Parse {
        input: input.to_string(),
        reason: "invalid hex",
    })?;
    if bytes.len() > 32 {
        return Err(FieldError::Parse {
            input: input.to_string(),
            reason: "longer than 32 bytes",
        });
    }

    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    decode_uint256(&word)
}
