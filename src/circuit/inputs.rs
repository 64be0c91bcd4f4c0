//! Named circuit inputs.
//!
//! The proving backend takes decimal-string field elements keyed by the
//! circuit's parameter names. These strings are produced by the same
//! scaling functions as the venue hash, so the shared quantities (venue
//! lat/lon, threshold) are bit-identical on both paths.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use super::CircuitError;
use crate::field::{event_id_to_field, field_from_decimal, field_to_decimal, EventId};
use crate::gps::{calculate_threshold_sq, GpsCoordinate};
use crate::CircuitProfile;

/// Decimal-string inputs, one per circuit parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitInputs {
    pub user_lat: String,
    pub user_lon: String,
    pub venue_lat: String,
    pub venue_lon: String,
    pub threshold_sq: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

/// Build the input set for `profile`.
///
/// `event_id` is required for [`CircuitProfile::WithEventId`] and must be
/// absent for [`CircuitProfile::WithoutEventId`].
pub fn build_inputs(
    user: &GpsCoordinate,
    venue: &GpsCoordinate,
    radius_meters: f64,
    event_id: Option<&EventId>,
    profile: CircuitProfile,
) -> Result<CircuitInputs, CircuitError> {
    let event_id = match (profile, event_id) {
        (CircuitProfile::WithEventId, Some(id)) => Some(field_to_decimal(&event_id_to_field(id)?)),
        (CircuitProfile::WithoutEventId, None) => None,
        (CircuitProfile::WithEventId, None) => {
            return Err(CircuitError::ProfileMismatch {
                profile,
                reason: "requires an event id",
            })
        }
        (CircuitProfile::WithoutEventId, Some(_)) => {
            return Err(CircuitError::ProfileMismatch {
                profile,
                reason: "does not take an event id",
            })
        }
    };

    let (user_lat, user_lon) = user.to_fields()?;
    let (venue_lat, venue_lon) = venue.to_fields()?;
    let threshold_sq = calculate_threshold_sq(radius_meters)?;

    Ok(CircuitInputs {
        user_lat: field_to_decimal(&user_lat),
        user_lon: field_to_decimal(&user_lon),
        venue_lat: field_to_decimal(&venue_lat),
        venue_lon: field_to_decimal(&venue_lon),
        threshold_sq: field_to_decimal(&threshold_sq),
        event_id,
    })
}

fn parse_input(name: &'static str, value: &str) -> Result<Fr, CircuitError> {
    field_from_decimal(value).map_err(|source| CircuitError::InvalidInput { name, source })
}

impl CircuitInputs {
    pub fn profile(&self) -> CircuitProfile {
        if self.event_id.is_some() {
            CircuitProfile::WithEventId
        } else {
            CircuitProfile::WithoutEventId
        }
    }

    /// Parse the decimal strings back into field elements.
    pub fn to_witness(&self) -> Result<ProximityWitness, CircuitError> {
        Ok(ProximityWitness {
            user_lat: parse_input("user_lat", &self.user_lat)?,
            user_lon: parse_input("user_lon", &self.user_lon)?,
            venue_lat: parse_input("venue_lat", &self.venue_lat)?,
            venue_lon: parse_input("venue_lon", &self.venue_lon)?,
            threshold_sq: parse_input("threshold_sq", &self.threshold_sq)?,
            event_id: self
                .event_id
                .as_deref()
                .map(|value| parse_input("event_id", value))
                .transpose()?,
        })
    }
}

/// Field-element form of [`CircuitInputs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityWitness {
    pub user_lat: Fr,
    pub user_lon: Fr,
    pub venue_lat: Fr,
    pub venue_lon: Fr,
    pub threshold_sq: Fr,
    pub event_id: Option<Fr>,
}

impl ProximityWitness {
    pub fn profile(&self) -> CircuitProfile {
        if self.event_id.is_some() {
            CircuitProfile::WithEventId
        } else {
            CircuitProfile::WithoutEventId
        }
    }

    /// Public inputs in circuit order.
    pub fn public_inputs(&self) -> Vec<Fr> {
        let mut inputs = vec![self.venue_lat, self.venue_lon, self.threshold_sq];
        inputs.extend(self.event_id);
        inputs
    }
}
