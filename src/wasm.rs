//! WASM bindings for WiFiProof
//!
//! Exposes venue hashing, circuit input building and Groth16 proximity
//! proofs to JavaScript via wasm-bindgen.

use wasm_bindgen::prelude::*;
use std::sync::{Mutex, MutexGuard};

use crate::circuit::{build_inputs, CircuitInputs};
use crate::field::EventId;
use crate::gps::GpsCoordinate;
use crate::prover::{Groth16Prover, ProofData, ProvingBackend};
use crate::venue::{
    compute_venue_hash_from_scaled, from_bytes32_hex, venue_hash_hex, Keccak256Hasher,
};
use crate::CircuitProfile;

// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

// ============== PROVER STATE ==============

/// Global prover for presence proofs
static PRESENCE_PROVER: Mutex<Option<Groth16Prover>> = Mutex::new(None);

fn prover_slot() -> MutexGuard<'static, Option<Groth16Prover>> {
    PRESENCE_PROVER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn profile_for(with_event_id: bool) -> CircuitProfile {
    if with_event_id {
        CircuitProfile::WithEventId
    } else {
        CircuitProfile::WithoutEventId
    }
}

// ============== RESULT TYPES ==============

/// Venue hash result for JavaScript
#[wasm_bindgen]
pub struct VenueHashResult {
    success: bool,
    venue_hash: String,
    error: Option<String>,
}

#[wasm_bindgen]
impl VenueHashResult {
    #[wasm_bindgen(getter)]
    pub fn success(&self) -> bool {
        self.success
    }

    #[wasm_bindgen(getter)]
    pub fn venue_hash(&self) -> String {
        self.venue_hash.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn error(&self) -> Option<String> {
        self.error.clone()
    }
}

/// Circuit inputs result for JavaScript
#[wasm_bindgen]
pub struct CircuitInputsResult {
    success: bool,
    inputs_json: String,
    error: Option<String>,
}

#[wasm_bindgen]
impl CircuitInputsResult {
    #[wasm_bindgen(getter)]
    pub fn success(&self) -> bool {
        self.success
    }

    /// Decimal-string inputs keyed by circuit parameter name.
    #[wasm_bindgen(getter)]
    pub fn inputs_json(&self) -> String {
        self.inputs_json.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn error(&self) -> Option<String> {
        self.error.clone()
    }
}

/// Presence proof result for JavaScript
#[wasm_bindgen]
pub struct PresenceProofResult {
    success: bool,
    proof_bytes: Vec<u8>,
    public_inputs: Vec<String>,
    venue_hash: String,
    error: Option<String>,
}

impl PresenceProofResult {
    fn failure(error: String) -> Self {
        Self {
            success: false,
            proof_bytes: Vec::new(),
            public_inputs: Vec::new(),
            venue_hash: String::new(),
            error: Some(error),
        }
    }
}

#[wasm_bindgen]
impl PresenceProofResult {
    #[wasm_bindgen(getter)]
    pub fn success(&self) -> bool {
        self.success
    }

    #[wasm_bindgen(getter)]
    pub fn proof_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.proof_bytes))
    }

    #[wasm_bindgen(getter)]
    pub fn proof_bytes(&self) -> Vec<u8> {
        self.proof_bytes.clone()
    }

    /// Public inputs as a JSON array of bytes32 hex words.
    #[wasm_bindgen(getter)]
    pub fn public_inputs_json(&self) -> String {
        serde_json::to_string(&self.public_inputs).unwrap_or_else(|_| "[]".to_string())
    }

    #[wasm_bindgen(getter)]
    pub fn venue_hash(&self) -> String {
        self.venue_hash.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn error(&self) -> Option<String> {
        self.error.clone()
    }
}

// ============== INITIALIZATION ==============

/// Initialize the presence prover for one circuit profile.
/// This performs trusted setup with fresh randomness (Web Crypto) - call
/// once at startup. NOT a ceremony.
/// Returns true if successful.
#[wasm_bindgen]
pub fn init_presence_prover(with_event_id: bool) -> bool {
    let profile = profile_for(with_event_id);
    let mut state = prover_slot();

    // Already initialized for this profile?
    if state.as_ref().is_some_and(|p| p.profile() == profile) {
        return true;
    }

    match Groth16Prover::setup(profile) {
        Ok((prover, _vk)) => {
            *state = Some(prover);
            let message = format!("✓ Presence prover initialized ({})", profile);
            web_sys::console::log_1(&message.into());
            true
        }
        Err(e) => {
            web_sys::console::error_1(&format!("Failed to init prover: {}", e).into());
            false
        }
    }
}

/// Check if the presence prover is initialized
#[wasm_bindgen]
pub fn is_prover_ready() -> bool {
    prover_slot().is_some()
}

// ============== VENUE HASH ==============

/// Keccak-256 venue hash of plaintext venue parameters.
#[wasm_bindgen]
pub fn compute_venue_hash_hex(
    venue_lat: f64,
    venue_lon: f64,
    radius_meters: f64,
    event_id: &str,
) -> VenueHashResult {
    match compute_venue_hash_from_scaled(
        venue_lat,
        venue_lon,
        radius_meters,
        &EventId::from(event_id),
        &Keccak256Hasher,
    ) {
        Ok(digest) => VenueHashResult {
            success: true,
            venue_hash: venue_hash_hex(&digest),
            error: None,
        },
        Err(e) => VenueHashResult {
            success: false,
            venue_hash: String::new(),
            error: Some(e.to_string()),
        },
    }
}

// ============== PRESENCE PROOFS ==============

fn presence_inputs(
    user_lat: f64,
    user_lon: f64,
    venue_lat: f64,
    venue_lon: f64,
    radius_meters: f64,
    event_id: Option<&EventId>,
) -> Result<CircuitInputs, String> {
    let profile = profile_for(event_id.is_some());
    build_inputs(
        &GpsCoordinate::new(user_lat, user_lon),
        &GpsCoordinate::new(venue_lat, venue_lon),
        radius_meters,
        event_id,
        profile,
    )
    .map_err(|e| e.to_string())
}

/// Build the circuit inputs. Pass `undefined` as `event_id` for the
/// circuit without an event binding.
#[wasm_bindgen]
pub fn build_circuit_inputs_json(
    user_lat: f64,
    user_lon: f64,
    venue_lat: f64,
    venue_lon: f64,
    radius_meters: f64,
    event_id: Option<String>,
) -> CircuitInputsResult {
    let event_id = event_id.map(EventId::from);
    let inputs = presence_inputs(
        user_lat,
        user_lon,
        venue_lat,
        venue_lon,
        radius_meters,
        event_id.as_ref(),
    )
    .and_then(|inputs| serde_json::to_string(&inputs).map_err(|e| e.to_string()));

    match inputs {
        Ok(inputs_json) => CircuitInputsResult {
            success: true,
            inputs_json,
            error: None,
        },
        Err(e) => CircuitInputsResult {
            success: false,
            inputs_json: String::new(),
            error: Some(e),
        },
    }
}

/// Generate a Groth16 proof that the user stands within the venue radius.
///
/// The user's coordinates stay private; only the venue fields, threshold
/// and event id become public inputs.
#[wasm_bindgen]
pub fn prove_presence(
    user_lat: f64,
    user_lon: f64,
    venue_lat: f64,
    venue_lon: f64,
    radius_meters: f64,
    event_id: Option<String>,
) -> PresenceProofResult {
    let event_id = event_id.map(EventId::from);
    let inputs = match presence_inputs(
        user_lat,
        user_lon,
        venue_lat,
        venue_lon,
        radius_meters,
        event_id.as_ref(),
    ) {
        Ok(inputs) => inputs,
        Err(e) => return PresenceProofResult::failure(e),
    };

    // The circuit without an event id is never bound to a venue hash.
    let venue_hash = match &event_id {
        Some(id) => match compute_venue_hash_from_scaled(
            venue_lat,
            venue_lon,
            radius_meters,
            id,
            &Keccak256Hasher,
        ) {
            Ok(digest) => venue_hash_hex(&digest),
            Err(e) => return PresenceProofResult::failure(e.to_string()),
        },
        None => String::new(),
    };

    let state = prover_slot();
    let prover = match state.as_ref() {
        Some(p) if p.profile() == inputs.profile() => p,
        _ => {
            return PresenceProofResult::failure(format!(
                "Prover not initialized for {}. Call init_presence_prover() first.",
                inputs.profile()
            ))
        }
    };

    let proof = prover
        .execute(&inputs)
        .and_then(|witness| prover.prove(witness));
    match proof {
        Ok(proof) => PresenceProofResult {
            success: true,
            public_inputs: proof.public_inputs_bytes32(),
            proof_bytes: proof.proof,
            venue_hash,
            error: None,
        },
        Err(e) => PresenceProofResult::failure(e.to_string()),
    }
}

/// Verify a presence proof against its bytes32 public inputs (JSON array).
#[wasm_bindgen]
pub fn verify_presence(proof_hex: &str, public_inputs_json: &str) -> bool {
    let proof_bytes = match hex::decode(proof_hex.trim_start_matches("0x")) {
        Ok(b) => b,
        Err(_) => return false,
    };

    let words: Vec<String> = match serde_json::from_str(public_inputs_json) {
        Ok(w) => w,
        Err(_) => return false,
    };

    let decoded: Result<Vec<_>, _> = words.iter().map(|w| from_bytes32_hex(w)).collect();
    let public_inputs = match decoded {
        Ok(inputs) => inputs,
        Err(_) => return false,
    };

    let state = prover_slot();
    let prover = match state.as_ref() {
        Some(p) if p.profile().public_input_count() == public_inputs.len() => p,
        _ => return false,
    };

    prover
        .verify(&ProofData {
            proof: proof_bytes,
            public_inputs,
        })
        .unwrap_or(false)
}

// ============== UTILITIES ==============

/// Get version info
#[wasm_bindgen]
pub fn get_version() -> String {
    format!("WiFiProof WASM v{} (Groth16/BN254)", env!("CARGO_PKG_VERSION"))
}
