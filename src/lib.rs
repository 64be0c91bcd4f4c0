//! WiFiProof - Prove you were at a venue without revealing where you stood
//!
//! A zero-knowledge proof of physical presence: the prover shows their GPS
//! position was within a radius of a venue's coordinates, bound to one event,
//! without disclosing the coordinates themselves.
//!
//! # Architecture
//!
//! 1. GPS coordinates and a radius are scaled into BN254 field elements
//! 2. The venue fields plus the event id are committed to as a venue hash
//! 3. The same fields feed the proximity circuit as its inputs
//! 4. Proof, public inputs and an optional IP attestation form a claim

pub mod attestation;
pub mod circuit;
pub mod claim;
pub mod field;
pub mod gps;
pub mod prover;
pub mod venue;
pub mod verifier;

// IP attestation over HTTP (only compiled when http-signer feature is enabled)
#[cfg(feature = "http-signer")]
pub mod ip_verify;

// WASM bindings (only compiled when wasm feature is enabled)
#[cfg(feature = "wasm")]
pub mod wasm;

use std::fmt;
use std::str::FromStr;

// Re-export main types
pub use circuit::{build_inputs, CircuitInputs};
pub use claim::{Claim, ClaimBuilder, ClaimRequest};
pub use field::{event_id_to_field, to_field, EventId, FieldError};
pub use gps::{calculate_threshold_sq, scale_gps, GpsCoordinate, GPS_SCALE, METERS_PER_DEGREE};
pub use prover::{Groth16Prover, ProofData, ProvingBackend};
pub use venue::{compute_venue_hash, compute_venue_hash_from_scaled, Keccak256Hasher, VenueHasher};
pub use verifier::Verifier;

/// Circuit variants in circulation. They have different public input layouts
/// and are not interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitProfile {
    /// Public inputs: venue_lat, venue_lon, threshold_sq, event_id
    #[default]
    WithEventId,
    /// Public inputs: venue_lat, venue_lon, threshold_sq
    WithoutEventId,
}

impl CircuitProfile {
    pub fn includes_event_id(self) -> bool {
        matches!(self, CircuitProfile::WithEventId)
    }

    /// Number of public inputs the circuit exposes.
    pub fn public_input_count(self) -> usize {
        if self.includes_event_id() {
            4
        } else {
            3
        }
    }

    /// Single-byte tag stored in key files.
    pub fn tag(self) -> u8 {
        match self {
            CircuitProfile::WithEventId => 1,
            CircuitProfile::WithoutEventId => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(CircuitProfile::WithEventId),
            2 => Some(CircuitProfile::WithoutEventId),
            _ => None,
        }
    }
}

impl fmt::Display for CircuitProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitProfile::WithEventId => f.write_str("with-event-id"),
            CircuitProfile::WithoutEventId => f.write_str("without-event-id"),
        }
    }
}

/// Unrecognized circuit profile name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown circuit profile: {0} (expected with-event-id or without-event-id)")]
pub struct UnknownProfile(pub String);

impl FromStr for CircuitProfile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "with-event-id" => Ok(CircuitProfile::WithEventId),
            "without-event-id" => Ok(CircuitProfile::WithoutEventId),
            other => Err(UnknownProfile(other.to_string())),
        }
    }
}
