//! Venue hash: a digest over the canonical `(lat, lon, threshold_sq, event_id)`
//! encoding that binds a venue location commitment to one event.
//!
//! The hash function is injected through [`VenueHasher`]; prover, backend
//! signer and on-chain verifier only need to agree on it and on the byte
//! layout from [`super::encoding`].

use ark_bn254::Fr;
use sha2::Sha256;
use sha3::{Digest, Keccak256};

use super::encoding::{encode_venue_hash_input, VENUE_HASH_INPUT_LEN};
use crate::field::{event_id_to_field, EventId, FieldError};
use crate::gps::{calculate_threshold_sq, scale_gps, GpsCoordinate};

/// A hash capability over raw bytes.
pub trait VenueHasher {
    type Digest;

    fn hash(&self, data: &[u8]) -> Self::Digest;
}

/// Keccak-256, as used by the on-chain verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Keccak256Hasher;

impl VenueHasher for Keccak256Hasher {
    type Digest = [u8; 32];

    fn hash(&self, data: &[u8]) -> [u8; 32] {
        Keccak256::digest(data).into()
    }
}

/// SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl VenueHasher for Sha256Hasher {
    type Digest = [u8; 32];

    fn hash(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }
}

/// Adapter for any `Fn(&[u8]) -> D`, e.g. a hasher that returns hex.
#[derive(Debug, Clone, Copy)]
pub struct FnHasher<F>(pub F);

impl<F, D> VenueHasher for FnHasher<F>
where
    F: Fn(&[u8]) -> D,
{
    type Digest = D;

    fn hash(&self, data: &[u8]) -> D {
        (self.0)(data)
    }
}

/// The four field elements committed to by a venue hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueCommitment {
    pub venue_lat: Fr,
    pub venue_lon: Fr,
    pub threshold_sq: Fr,
    pub event_id: Fr,
}

impl VenueCommitment {
    pub fn new(
        venue_lat: Fr,
        venue_lon: Fr,
        threshold_sq: Fr,
        event_id: &EventId,
    ) -> Result<Self, FieldError> {
        Ok(Self {
            venue_lat,
            venue_lon,
            threshold_sq,
            event_id: event_id_to_field(event_id)?,
        })
    }

    /// Derive the commitment from plaintext venue parameters, using the same
    /// scaling path as the circuit inputs.
    pub fn from_location(
        venue: &GpsCoordinate,
        radius_meters: f64,
        event_id: &EventId,
    ) -> Result<Self, FieldError> {
        Self::new(
            scale_gps(venue.lat)?,
            scale_gps(venue.lon)?,
            calculate_threshold_sq(radius_meters)?,
            event_id,
        )
    }

    /// Canonical 128-byte preimage.
    pub fn encode(&self) -> [u8; VENUE_HASH_INPUT_LEN] {
        encode_venue_hash_input(
            &self.venue_lat,
            &self.venue_lon,
            &self.threshold_sq,
            &self.event_id,
        )
    }

    pub fn hash<H: VenueHasher>(&self, hasher: &H) -> H::Digest {
        hasher.hash(&self.encode())
    }
}

/// Hash already-scaled venue fields together with an event identifier.
pub fn compute_venue_hash<H: VenueHasher>(
    venue_lat: &Fr,
    venue_lon: &Fr,
    threshold_sq: &Fr,
    event_id: &EventId,
    hasher: &H,
) -> Result<H::Digest, FieldError> {
    let commitment = VenueCommitment::new(*venue_lat, *venue_lon, *threshold_sq, event_id)?;
    Ok(commitment.hash(hasher))
}

/// Scale raw venue coordinates (degrees) and radius, then hash.
///
/// Prefer this over [`compute_venue_hash`]: it goes through the same
/// scaling functions as the circuit input builder.
pub fn compute_venue_hash_from_scaled<H: VenueHasher>(
    venue_lat: f64,
    venue_lon: f64,
    radius_meters: f64,
    event_id: &EventId,
    hasher: &H,
) -> Result<H::Digest, FieldError> {
    let venue = GpsCoordinate::new(venue_lat, venue_lon);
    Ok(VenueCommitment::from_location(&venue, radius_meters, event_id)?.hash(hasher))
}

/// `0x`-prefixed lowercase hex of a 32-byte digest.
pub fn venue_hash_hex(digest: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(digest))
}
