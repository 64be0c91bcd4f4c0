//! Proximity proof circuit.
//!
//! This circuit proves that a user's scaled coordinates lie within a
//! squared distance `threshold_sq` of a venue's scaled coordinates WITHOUT
//! revealing the user's coordinates.
//!
//! Public inputs (in order):
//! - venue_lat, venue_lon: scaled venue coordinates
//! - threshold_sq: squared scaled radius
//! - event_id: only for [`CircuitProfile::WithEventId`]
//!
//! Private witnesses:
//! - user_lat, user_lon: scaled user coordinates
//!
//! Constraints:
//! 1. `dlat = user_lat - venue_lat`, `dlon = user_lon - venue_lon` are
//!    signed integers of at most [`DELTA_BITS`] bits
//! 2. `dlat^2 + dlon^2 <= threshold_sq`
//!
//! The range check in (1) stops a prover from picking a delta whose square
//! wraps around the modulus into a small value.

use std::cmp::Ordering;

use ark_bn254::Fr;
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use super::ProximityWitness;
use crate::CircuitProfile;

/// Bit width of a signed coordinate delta. Scaled coordinates span at most
/// 360 * 10^6 < 2^29, so 32 bits leaves headroom.
pub const DELTA_BITS: usize = 32;

/// Circuit for proving proximity to a venue.
#[derive(Clone, Debug)]
pub struct ProximityCircuit {
    /// Private: User's scaled latitude
    pub user_lat: Option<Fr>,
    /// Private: User's scaled longitude
    pub user_lon: Option<Fr>,

    /// Public: Venue's scaled latitude
    pub venue_lat: Option<Fr>,
    /// Public: Venue's scaled longitude
    pub venue_lon: Option<Fr>,
    /// Public: Squared scaled radius
    pub threshold_sq: Option<Fr>,
    /// Public: Event identifier (WithEventId only)
    pub event_id: Option<Fr>,

    profile: CircuitProfile,
}

impl ProximityCircuit {
    /// Create an empty circuit for trusted setup.
    ///
    /// The setup only needs the circuit shape, so all values are zero.
    pub fn new_empty(profile: CircuitProfile) -> Self {
        let zero = Fr::from(0u64);
        Self {
            user_lat: Some(zero),
            user_lon: Some(zero),
            venue_lat: Some(zero),
            venue_lon: Some(zero),
            threshold_sq: Some(zero),
            event_id: profile.includes_event_id().then_some(zero),
            profile,
        }
    }

    /// Create a circuit with actual witness values.
    pub fn new_with_witness(witness: &ProximityWitness) -> Self {
        Self {
            user_lat: Some(witness.user_lat),
            user_lon: Some(witness.user_lon),
            venue_lat: Some(witness.venue_lat),
            venue_lon: Some(witness.venue_lon),
            threshold_sq: Some(witness.threshold_sq),
            event_id: witness.event_id,
            profile: witness.profile(),
        }
    }

    pub fn profile(&self) -> CircuitProfile {
        self.profile
    }
}

impl ConstraintSynthesizer<Fr> for ProximityCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Allocate private witnesses
        let user_lat = FpVar::new_witness(cs.clone(), || {
            self.user_lat.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let user_lon = FpVar::new_witness(cs.clone(), || {
            self.user_lon.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // Allocate public inputs in their fixed order
        let venue_lat = FpVar::new_input(cs.clone(), || {
            self.venue_lat.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let venue_lon = FpVar::new_input(cs.clone(), || {
            self.venue_lon.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let threshold_sq = FpVar::new_input(cs.clone(), || {
            self.threshold_sq.ok_or(SynthesisError::AssignmentMissing)
        })?;
        if self.profile.includes_event_id() {
            // Bound through the public input vector only.
            FpVar::new_input(cs.clone(), || {
                self.event_id.ok_or(SynthesisError::AssignmentMissing)
            })?;
        }

        let d_lat = &user_lat - &venue_lat;
        let d_lon = &user_lon - &venue_lon;
        enforce_signed_range(&d_lat, DELTA_BITS)?;
        enforce_signed_range(&d_lon, DELTA_BITS)?;

        let distance_sq = d_lat.square()? + d_lon.square()?;
        distance_sq.enforce_cmp(&threshold_sq, Ordering::Less, true)?;

        Ok(())
    }
}

/// Enforce `-2^(bits-1) <= value < 2^(bits-1)` for a field-encoded signed value.
fn enforce_signed_range(value: &FpVar<Fr>, bits: usize) -> Result<(), SynthesisError> {
    let offset = FpVar::constant(Fr::from(1u64 << (bits - 1)));
    let shifted = value + offset;
    let shifted_bits = shifted.to_bits_le()?;
    for bit in &shifted_bits[bits..] {
        bit.enforce_equal(&Boolean::constant(false))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::build_inputs;
    use crate::field::EventId;
    use crate::gps::GpsCoordinate;
    use ark_relations::r1cs::ConstraintSystem;

    fn witness(user: (f64, f64), venue: (f64, f64), radius: f64) -> ProximityWitness {
        let event_id = EventId::from("0x1");
        build_inputs(
            &GpsCoordinate::new(user.0, user.1),
            &GpsCoordinate::new(venue.0, venue.1),
            radius,
            Some(&event_id),
            CircuitProfile::WithEventId,
        )
        .unwrap()
        .to_witness()
        .unwrap()
    }

    fn is_satisfied(circuit: ProximityCircuit) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    #[test]
    fn test_user_inside_radius() {
        // San Francisco, ~14 m apart
        let w = witness((37.7750, -122.4195), (37.7749, -122.4194), 100.0);
        assert!(is_satisfied(ProximityCircuit::new_with_witness(&w)));
    }

    #[test]
    fn test_user_outside_radius() {
        let w = witness((37.7849, -122.4194), (37.7749, -122.4194), 100.0);
        assert!(!is_satisfied(ProximityCircuit::new_with_witness(&w)));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        // 898 scaled units north of the venue, threshold 898^2.
        let w = witness((0.000898, 0.0), (0.0, 0.0), 100.0);
        assert!(is_satisfied(ProximityCircuit::new_with_witness(&w)));

        let w = witness((0.000899, 0.0), (0.0, 0.0), 100.0);
        assert!(!is_satisfied(ProximityCircuit::new_with_witness(&w)));
    }

    #[test]
    fn test_negative_coordinates_across_zero() {
        // Straddles the equator and prime meridian, so both deltas wrap.
        let w = witness((-0.0002, 0.0003), (0.0001, -0.0001), 100.0);
        assert!(is_satisfied(ProximityCircuit::new_with_witness(&w)));
    }

    #[test]
    fn test_zero_radius_requires_exact_match() {
        let w = witness((10.0, 20.0), (10.0, 20.0), 0.0);
        assert!(is_satisfied(ProximityCircuit::new_with_witness(&w)));

        let w = witness((10.000001, 20.0), (10.0, 20.0), 0.0);
        assert!(!is_satisfied(ProximityCircuit::new_with_witness(&w)));
    }

    #[test]
    fn test_wrapped_delta_is_rejected() {
        // A delta equal to sqrt(-1) mod p squares to p - 1; with the other
        // delta at 1 the sum wraps to zero. The range check must refuse it.
        let mut w = witness((0.0, 0.0), (0.0, 0.0), 100.0);
        let sqrt_minus_one = sqrt_of_minus_one();
        w.user_lat = sqrt_minus_one;
        w.user_lon = Fr::from(1u64);
        assert!(!is_satisfied(ProximityCircuit::new_with_witness(&w)));
    }

    fn sqrt_of_minus_one() -> Fr {
        use ark_ff::Field;
        (-Fr::from(1u64)).sqrt().unwrap()
    }

    #[test]
    fn test_empty_circuit_for_setup() {
        for profile in [CircuitProfile::WithEventId, CircuitProfile::WithoutEventId] {
            let cs = ConstraintSystem::<Fr>::new_ref();
            ProximityCircuit::new_empty(profile)
                .generate_constraints(cs.clone())
                .unwrap();
            assert!(cs.is_satisfied().unwrap());
            // One extra instance variable for the constant "one".
            assert_eq!(cs.num_instance_variables(), profile.public_input_count() + 1);
            println!("Constraints for {}: {}", profile, cs.num_constraints());
        }
    }
}
