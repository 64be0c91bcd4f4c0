//! Venue commitments: canonical encoding and the keyed venue hash.

pub mod encoding;
pub mod hash;

pub use encoding::{
    decode_uint256, encode_uint256, encode_venue_hash_input, from_bytes32_hex, to_bytes32_hex,
    VENUE_HASH_INPUT_LEN,
};
pub use hash::{
    compute_venue_hash, compute_venue_hash_from_scaled, venue_hash_hex, FnHasher,
    Keccak256Hasher, Sha256Hasher, VenueCommitment, VenueHasher,
};
