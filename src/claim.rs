//! Claim assembly: the JSON artifact submitted to the WiFiProof contract.
//!
//! A claim bundles the proof, its public inputs re-encoded as bytes32 words,
//! the signature deadline and an IP attestation signature (`"0x"` when none
//! was obtained).

use std::time::{SystemTime, UNIX_EPOCH};

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::attestation::{
    AttestationError, Eip712Domain, IpVerification, TypedDataSigner, DEFAULT_CHAIN_ID,
};
use crate::circuit::{build_inputs, CircuitError};
use crate::field::{EventId, FieldError};
use crate::gps::GpsCoordinate;
use crate::prover::{ProofData, ProvingBackend};
use crate::venue::{
    compute_venue_hash_from_scaled, from_bytes32_hex, venue_hash_hex, Keccak256Hasher,
};
use crate::CircuitProfile;

pub const DEFAULT_SIG_DEADLINE_SECS: u64 = 120;
/// Placeholder signature for claims without an IP attestation.
pub const EMPTY_SIGNATURE: &str = "0x";

pub type ClaimResult<T> = Result<T, ClaimError>;

#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Proving backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Attestation(#[from] AttestationError),

    #[error("IP signer failed: {0}")]
    Signer(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Invalid proof hex: {0}")]
    InvalidProofHex(#[from] hex::FromHexError),

    #[error("Claim JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    /// WiFiProof contract address.
    pub wifiproof: String,
    /// Event id exactly as supplied.
    pub event_id: String,
    pub sig_deadline: u64,
    /// `0x`-prefixed proof bytes.
    pub proof: String,
    /// Public inputs as bytes32 hex words, in circuit order.
    pub public_inputs: Vec<String>,
    pub ip_signature: String,
}

impl Claim {
    pub fn to_json_pretty(&self) -> ClaimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> ClaimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn has_ip_signature(&self) -> bool {
        self.ip_signature != EMPTY_SIGNATURE && !self.ip_signature.is_empty()
    }

    pub fn proof_bytes(&self) -> ClaimResult<Vec<u8>> {
        let digits = self.proof.strip_prefix("0x").unwrap_or(&self.proof);
        Ok(hex::decode(digits)?)
    }

    pub fn public_input_fields(&self) -> ClaimResult<Vec<Fr>> {
        self.public_inputs
            .iter()
            .map(|word| from_bytes32_hex(word).map_err(ClaimError::from))
            .collect()
    }

    /// Decode back into the form a verifier consumes.
    pub fn to_proof_data(&self) -> ClaimResult<ProofData> {
        Ok(ProofData {
            proof: self.proof_bytes()?,
            public_inputs: self.public_input_fields()?,
        })
    }
}

/// Everything the claimant supplies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub user: GpsCoordinate,
    pub venue: GpsCoordinate,
    pub radius_meters: f64,
    pub event_id: String,
    #[serde(default)]
    pub wallet: Option<String>,
    /// Defaults to the Keccak-256 venue hash of the request's venue.
    #[serde(default)]
    pub venue_hash: Option<String>,
    #[serde(default)]
    pub sig_deadline: Option<u64>,
    /// A pre-obtained attestation; takes precedence over any signer.
    #[serde(default)]
    pub ip_signature: Option<String>,
}

impl ClaimRequest {
    pub fn new(
        user: GpsCoordinate,
        venue: GpsCoordinate,
        radius_meters: f64,
        event_id: impl Into<String>,
    ) -> Self {
        Self {
            user,
            venue,
            radius_meters,
            event_id: event_id.into(),
            wallet: None,
            venue_hash: None,
            sig_deadline: None,
            ip_signature: None,
        }
    }

    /// The explicit signature, unless absent or the `"0x"` placeholder.
    pub fn explicit_signature(&self) -> Option<&str> {
        self.ip_signature
            .as_deref()
            .filter(|signature| *signature != EMPTY_SIGNATURE && !signature.is_empty())
    }

    /// Whether a signer should be asked: a wallet is named and no
    /// signature was supplied.
    pub fn wants_attestation(&self) -> bool {
        self.wallet.is_some() && self.explicit_signature().is_none()
    }

    pub fn venue_hash_hex(&self) -> ClaimResult<String> {
        match &self.venue_hash {
            Some(hash) => Ok(hash.clone()),
            None => {
                let digest = compute_venue_hash_from_scaled(
                    self.venue.lat,
                    self.venue.lon,
                    self.radius_meters,
                    &EventId::from(self.event_id.as_str()),
                    &Keccak256Hasher,
                )?;
                Ok(venue_hash_hex(&digest))
            }
        }
    }
}

/// Assembles claims for one contract deployment and circuit profile.
#[derive(Debug, Clone)]
pub struct ClaimBuilder {
    profile: CircuitProfile,
    wifiproof: String,
    chain_id: u64,
}

impl ClaimBuilder {
    pub fn new(wifiproof: impl Into<String>) -> Self {
        Self {
            profile: CircuitProfile::default(),
            wifiproof: wifiproof.into(),
            chain_id: DEFAULT_CHAIN_ID,
        }
    }

    pub fn with_profile(mut self, profile: CircuitProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn profile(&self) -> CircuitProfile {
        self.profile
    }

    pub fn domain(&self) -> ClaimResult<Eip712Domain> {
        Ok(Eip712Domain::wifiproof(self.chain_id, &self.wifiproof)?)
    }

    /// Build a claim with the deadline relative to the current time.
    pub fn build<P: ProvingBackend>(
        &self,
        prover: &P,
        request: &ClaimRequest,
    ) -> ClaimResult<Claim> {
        self.build_at(prover, request, unix_now())
    }

    pub fn build_at<P: ProvingBackend>(
        &self,
        prover: &P,
        request: &ClaimRequest,
        now: u64,
    ) -> ClaimResult<Claim> {
        self.assemble(prover, None::<&NoSigner>, request, now)
    }

    /// Build a claim, asking `signer` for the IP attestation when the request
    /// names a wallet and carries no signature of its own.
    pub fn build_with_signer<P: ProvingBackend, S: TypedDataSigner>(
        &self,
        prover: &P,
        signer: &S,
        request: &ClaimRequest,
        now: u64,
    ) -> ClaimResult<Claim> {
        self.assemble(prover, Some(signer), request, now)
    }

    fn assemble<P: ProvingBackend, S: TypedDataSigner>(
        &self,
        prover: &P,
        signer: Option<&S>,
        request: &ClaimRequest,
        now: u64,
    ) -> ClaimResult<Claim> {
        let span =
            tracing::info_span!("claim", profile = %self.profile, event_id = %request.event_id);
        let _guard = span.enter();

        let event_id = EventId::from(request.event_id.as_str());
        let inputs = build_inputs(
            &request.user,
            &request.venue,
            request.radius_meters,
            self.profile.includes_event_id().then_some(&event_id),
            self.profile,
        )?;

        let witness = prover
            .execute(&inputs)
            .map_err(|e| ClaimError::Backend(Box::new(e)))?;
        let proof = prover
            .prove(witness)
            .map_err(|e| ClaimError::Backend(Box::new(e)))?;
        tracing::info!(bytes = proof.size(), "proof generated");

        let sig_deadline = request
            .sig_deadline
            .unwrap_or_else(|| now.saturating_add(DEFAULT_SIG_DEADLINE_SECS));

        let ip_signature = match (request.explicit_signature(), signer, &request.wallet) {
            (Some(signature), _, _) => signature.to_string(),
            (None, Some(signer), Some(wallet)) => {
                let message = IpVerification::new(
                    wallet,
                    &event_id,
                    &request.venue_hash_hex()?,
                    sig_deadline,
                )?;
                signer
                    .sign(&self.domain()?, &message)
                    .map_err(|e| ClaimError::Signer(Box::new(e)))?
            }
            _ => EMPTY_SIGNATURE.to_string(),
        };
        if ip_signature == EMPTY_SIGNATURE {
            tracing::warn!("IP signature missing; supply one or a wallet and signer");
        }

        Ok(Claim {
            wifiproof: self.wifiproof.clone(),
            event_id: request.event_id.clone(),
            sig_deadline,
            proof: proof.proof_hex(),
            public_inputs: proof.public_inputs_bytes32(),
            ip_signature,
        })
    }
}

/// Stand-in for claims assembled without an attestation signer.
struct NoSigner;

impl TypedDataSigner for NoSigner {
    type Error = std::convert::Infallible;

    fn sign(
        &self,
        _domain: &Eip712Domain,
        _message: &IpVerification,
    ) -> Result<String, Self::Error> {
        Ok(EMPTY_SIGNATURE.to_string())
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{CircuitInputs, ProximityWitness};
    use crate::prover::ProverError;
    use std::cell::RefCell;

    const CONTRACT: &str = "0x1111111111111111111111111111111111111111";
    const WALLET: &str = "0x2222222222222222222222222222222222222222";
    const NOW: u64 = 1_700_000_000;

    /// Records the inputs it was given and returns a fixed proof.
    #[derive(Default)]
    struct MockBackend {
        seen: RefCell<Option<CircuitInputs>>,
    }

    impl ProvingBackend for MockBackend {
        type Witness = ProximityWitness;
        type Error = ProverError;

        fn execute(&self, inputs: &CircuitInputs) -> Result<ProximityWitness, ProverError> {
            *self.seen.borrow_mut() = Some(inputs.clone());
            Ok(inputs.to_witness()?)
        }

        fn prove(&self, witness: ProximityWitness) -> Result<ProofData, ProverError> {
            Ok(ProofData {
                proof: vec![0xca, 0xfe],
                public_inputs: witness.public_inputs(),
            })
        }

        fn verify(&self, _proof: &ProofData) -> Result<bool, ProverError> {
            Ok(true)
        }
    }

    struct FailingBackend;

    impl ProvingBackend for FailingBackend {
        type Witness = ();
        type Error = ProverError;

        fn execute(&self, _inputs: &CircuitInputs) -> Result<(), ProverError> {
            Err(ProverError::Unsatisfied("outside".to_string()))
        }

        fn prove(&self, _witness: ()) -> Result<ProofData, ProverError> {
            unreachable!("execute always fails")
        }

        fn verify(&self, _proof: &ProofData) -> Result<bool, ProverError> {
            Ok(false)
        }
    }

    /// Signs with the hex of the EIP-712 digest.
    struct DigestSigner;

    impl TypedDataSigner for DigestSigner {
        type Error = AttestationError;

        fn sign(
            &self,
            domain: &Eip712Domain,
            message: &IpVerification,
        ) -> Result<String, AttestationError> {
            Ok(format!("0x{}", hex::encode(message.signing_hash(domain)?)))
        }
    }

    fn request() -> ClaimRequest {
        ClaimRequest::new(
            GpsCoordinate::new(37.7750, -122.4195),
            GpsCoordinate::new(37.7749, -122.4194),
            100.0,
            "0x1",
        )
    }

    #[test]
    fn test_build_claim_without_signature() {
        let backend = MockBackend::default();
        let claim = ClaimBuilder::new(CONTRACT)
            .build_at(&backend, &request(), NOW)
            .unwrap();

        assert_eq!(claim.event_id, "0x1");
        assert_eq!(claim.sig_deadline, NOW + 120);
        assert_eq!(claim.proof, "0xcafe");
        assert_eq!(claim.ip_signature, EMPTY_SIGNATURE);
        assert!(!claim.has_ip_signature());
        assert_eq!(claim.public_inputs.len(), 4);
        assert_eq!(claim.public_inputs[2], format!("0x{:064x}", 806_404));
        assert_eq!(claim.public_inputs[3], format!("0x{:064x}", 1));

        let seen = backend.seen.borrow().clone().unwrap();
        assert_eq!(seen.threshold_sq, "806404");
    }

    #[test]
    fn test_build_claim_without_event_profile() {
        let claim = ClaimBuilder::new(CONTRACT)
            .with_profile(CircuitProfile::WithoutEventId)
            .build_at(&MockBackend::default(), &request(), NOW)
            .unwrap();
        assert_eq!(claim.public_inputs.len(), 3);
    }

    #[test]
    fn test_explicit_signature_and_deadline_win() {
        let mut req = request();
        req.sig_deadline = Some(NOW + 30);
        req.ip_signature = Some("0xabcdef".to_string());
        req.wallet = Some(WALLET.to_string());

        let claim = ClaimBuilder::new(CONTRACT)
            .build_with_signer(&MockBackend::default(), &DigestSigner, &req, NOW)
            .unwrap();
        assert_eq!(claim.sig_deadline, NOW + 30);
        assert_eq!(claim.ip_signature, "0xabcdef");
    }

    #[test]
    fn test_signer_receives_computed_venue_hash() {
        let mut req = request();
        req.wallet = Some(WALLET.to_string());

        let builder = ClaimBuilder::new(CONTRACT);
        let claim = builder
            .build_with_signer(&MockBackend::default(), &DigestSigner, &req, NOW)
            .unwrap();

        let expected = IpVerification::new(
            WALLET,
            &EventId::from("0x1"),
            "0x69310045996ea66d1fb44d00514bd72d895d4d69503e0953fe1f4223323681e4",
            NOW + 120,
        )
        .unwrap()
        .signing_hash(&builder.domain().unwrap())
        .unwrap();
        assert_eq!(claim.ip_signature, format!("0x{}", hex::encode(expected)));
        assert!(claim.has_ip_signature());
    }

    #[test]
    fn test_signer_skipped_without_wallet() {
        let claim = ClaimBuilder::new(CONTRACT)
            .build_with_signer(&MockBackend::default(), &DigestSigner, &request(), NOW)
            .unwrap();
        assert_eq!(claim.ip_signature, EMPTY_SIGNATURE);
    }

    #[test]
    fn test_wants_attestation() {
        let mut req = request();
        assert!(!req.wants_attestation());

        req.wallet = Some(WALLET.to_string());
        assert!(req.wants_attestation());

        req.ip_signature = Some(EMPTY_SIGNATURE.to_string());
        assert!(req.wants_attestation());

        req.ip_signature = Some("0xabcdef".to_string());
        assert!(!req.wants_attestation());
        assert_eq!(req.explicit_signature(), Some("0xabcdef"));
    }

    #[test]
    fn test_placeholder_signature_still_asks_signer() {
        let mut req = request();
        req.wallet = Some(WALLET.to_string());
        req.ip_signature = Some(EMPTY_SIGNATURE.to_string());

        let claim = ClaimBuilder::new(CONTRACT)
            .build_with_signer(&MockBackend::default(), &DigestSigner, &req, NOW)
            .unwrap();
        assert!(claim.has_ip_signature());
    }

    #[test]
    fn test_deadline_saturates_at_max_time() {
        let claim = ClaimBuilder::new(CONTRACT)
            .build_at(&MockBackend::default(), &request(), u64::MAX)
            .unwrap();
        assert_eq!(claim.sig_deadline, u64::MAX);
    }

    #[test]
    fn test_backend_failure_is_reported() {
        let result = ClaimBuilder::new(CONTRACT).build_at(&FailingBackend, &request(), NOW);
        assert!(matches!(result, Err(ClaimError::Backend(_))));
    }

    #[test]
    fn test_claim_json_round_trip() {
        let claim = ClaimBuilder::new(CONTRACT)
            .build_at(&MockBackend::default(), &request(), NOW)
            .unwrap();
        let json = claim.to_json_pretty().unwrap();
        let keys = ["wifiproof", "eventId", "sigDeadline", "proof", "publicInputs", "ipSignature"];
        for key in keys {
            assert!(json.contains(&format!("\"{}\"", key)), "missing {}", key);
        }

        let parsed = Claim::from_json(&json).unwrap();
        assert_eq!(parsed, claim);

        let proof = parsed.to_proof_data().unwrap();
        assert_eq!(proof.proof, vec![0xca, 0xfe]);
        assert_eq!(proof.public_inputs[2], Fr::from(806_404u64));
    }

    #[test]
    fn test_invalid_proof_hex() {
        let mut claim = ClaimBuilder::new(CONTRACT)
            .build_at(&MockBackend::default(), &request(), NOW)
            .unwrap();
        claim.proof = "0xnothex".to_string();
        assert!(matches!(claim.proof_bytes(), Err(ClaimError::InvalidProofHex(_))));
    }
}
