//! Fixed-point GPS scaling and proximity threshold derivation.
//!
//! Coordinates are scaled by [`GPS_SCALE`] (six decimal places, roughly
//! 0.11 m at the equator) and rounded to integers before field reduction.
//! The radius is converted to the same scaled-degree unit using a flat
//! equatorial [`METERS_PER_DEGREE`] with no latitude correction.
//!
//! Both the circuit inputs and the venue hash are derived from the functions
//! in this module; they must agree bit-for-bit with the circuit's reference
//! arithmetic.

use ark_bn254::Fr;
use num_bigint::BigInt;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::field::{to_field, FieldError};

/// Scale factor for fixed-point coordinates (6 decimal places).
pub const GPS_SCALE: u32 = 1_000_000;

/// Equatorial approximation of one degree in meters.
pub const METERS_PER_DEGREE: u32 = 111_320;

/// Round to the nearest integer, ties toward positive infinity.
///
/// This is the rounding used by the reference prover (`2.5 -> 3`,
/// `-2.5 -> -2`), which differs from [`f64::round`] on negative ties.
pub fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

fn rounded_to_bigint(value: f64, what: &'static str) -> Result<BigInt, FieldError> {
    let non_finite = || FieldError::NonFinite {
        what,
        value: value.to_string(),
    };
    if !value.is_finite() {
        return Err(non_finite());
    }
    BigInt::from_f64(round_half_up(value)).ok_or_else(non_finite)
}

/// `round(coord * 10^6)` as a signed integer, before field reduction.
pub fn scaled_coordinate(coord: f64) -> Result<BigInt, FieldError> {
    if !coord.is_finite() {
        return Err(FieldError::NonFinite {
            what: "coordinate",
            value: coord.to_string(),
        });
    }
    rounded_to_bigint(coord * f64::from(GPS_SCALE), "scaled coordinate")
}

/// Convert a coordinate in degrees into its field representation.
///
/// No range validation is performed; callers that care about
/// `[-90, 90]` / `[-180, 180]` must check before calling.
pub fn scale_gps(coord: f64) -> Result<Fr, FieldError> {
    Ok(to_field(&scaled_coordinate(coord)?))
}

/// `round(radius * 10^6 / 111320)`, the radius in scaled-degree units.
pub fn scaled_radius(radius_meters: f64) -> Result<BigInt, FieldError> {
    if !radius_meters.is_finite() {
        return Err(FieldError::NonFinite {
            what: "radius",
            value: radius_meters.to_string(),
        });
    }
    let radius_scaled = radius_meters * f64::from(GPS_SCALE) / f64::from(METERS_PER_DEGREE);
    rounded_to_bigint(radius_scaled, "scaled radius")
}

/// Squared proximity threshold for a radius in meters.
///
/// The scaled radius is rounded first and then squared, matching the
/// circuit's `dlat^2 + dlon^2 <= threshold_sq` check.
pub fn calculate_threshold_sq(radius_meters: f64) -> Result<Fr, FieldError> {
    let radius = scaled_radius(radius_meters)?;
    Ok(to_field(&(&radius * &radius)))
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinate {
    pub lat: f64,
    pub lon: f64,
}

impl GpsCoordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Scaled `(lat, lon)` field elements.
    pub fn to_fields(&self) -> Result<(Fr, Fr), FieldError> {
        Ok((scale_gps(self.lat)?, scale_gps(self.lon)?))
    }
}
