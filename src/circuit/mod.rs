//! Proximity circuit and the inputs it consumes.

mod inputs;
mod proximity;

pub use inputs::{build_inputs, CircuitInputs, ProximityWitness};
pub use proximity::{ProximityCircuit, DELTA_BITS};

use crate::field::FieldError;
use crate::CircuitProfile;

/// Errors raised while assembling circuit inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Circuit profile {profile} {reason}")]
    ProfileMismatch {
        profile: CircuitProfile,
        reason: &'static str,
    },

    #[error("Invalid circuit input {name}: {source}")]
    InvalidInput {
        name: &'static str,
        #[source]
        source: FieldError,
    },
}
