//! Groth16 proof verification for proximity proofs.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, VerifyingKey};
use ark_serialize::CanonicalDeserialize;
use ark_snark::SNARK;
use std::path::Path;

use crate::prover::{load_verifying_key, save_verifying_key, ProofData, ProverError};
use crate::venue::VenueCommitment;
use crate::CircuitProfile;

/// Result type for verifier operations.
pub type VerifierResult<T> = Result<T, VerifierError>;

/// Errors that can occur during verification.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Invalid proof format: {0}")]
    InvalidProof(String),

    #[error("Key file error: {0}")]
    KeyFile(#[from] ProverError),

    #[error("Expected {expected} public inputs, got {found}")]
    PublicInputCount { expected: usize, found: usize },

    #[error("Public inputs do not match the expected venue")]
    PublicInputMismatch,
}

/// Verifier for proximity proofs.
pub struct Verifier {
    /// Prepared verifying key for fast verification.
    prepared_vk: PreparedVerifyingKey<Bn254>,
    /// Original verifying key (for serialization).
    verifying_key: VerifyingKey<Bn254>,
    /// Circuit variant the key belongs to.
    profile: CircuitProfile,
}

impl Verifier {
    /// Create a new verifier from a verifying key.
    pub fn new(vk: VerifyingKey<Bn254>, profile: CircuitProfile) -> VerifierResult<Self> {
        let prepared_vk = Groth16::<Bn254>::process_vk(&vk)
            .map_err(|e| VerifierError::VerificationFailed(e.to_string()))?;
        Ok(Self {
            prepared_vk,
            verifying_key: vk,
            profile,
        })
    }

    pub fn profile(&self) -> CircuitProfile {
        self.profile
    }

    /// Verify a proximity proof.
    ///
    /// Returns `true` if the proof is valid, `false` otherwise.
    pub fn verify(&self, proof: &ProofData) -> VerifierResult<bool> {
        let expected = self.profile.public_input_count();
        if proof.public_inputs.len() != expected {
            return Err(VerifierError::PublicInputCount {
                expected,
                found: proof.public_inputs.len(),
            });
        }

        let groth_proof = ark_groth16::Proof::<Bn254>::deserialize_compressed(&proof.proof[..])
            .map_err(|e| VerifierError::InvalidProof(e.to_string()))?;

        let valid = Groth16::<Bn254>::verify_with_processed_vk(
            &self.prepared_vk,
            &proof.public_inputs,
            &groth_proof,
        )
        .map_err(|e| VerifierError::VerificationFailed(e.to_string()))?;
        if !valid {
            tracing::warn!(profile = %self.profile, "proximity proof rejected");
        }
        Ok(valid)
    }

    /// Public inputs a valid proof for `commitment` must carry.
    pub fn expected_public_inputs(&self, commitment: &VenueCommitment) -> Vec<Fr> {
        let mut inputs = vec![
            commitment.venue_lat,
            commitment.venue_lon,
            commitment.threshold_sq,
        ];
        if self.profile.includes_event_id() {
            inputs.push(commitment.event_id);
        }
        inputs
    }

    /// Verify a proof against a specific venue commitment.
    ///
    /// This ensures the proof was generated for the expected venue, radius
    /// and (when the circuit carries it) event.
    pub fn verify_for_venue(
        &self,
        proof: &ProofData,
        commitment: &VenueCommitment,
    ) -> VerifierResult<bool> {
        if proof.public_inputs != self.expected_public_inputs(commitment) {
            return Err(VerifierError::PublicInputMismatch);
        }

        self.verify(proof)
    }

    /// Get a reference to the verifying key.
    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.verifying_key
    }

    /// Save verifying key to file.
    pub fn save(&self, path: &Path) -> VerifierResult<()> {
        save_verifying_key(&self.verifying_key, self.profile, path)?;
        Ok(())
    }

    /// Load verifier from file.
    pub fn load(path: &Path) -> VerifierResult<Self> {
        let (vk, profile) = load_verifying_key(path)?;
        Self::new(vk, profile)
    }
}

/// Verification result with additional metadata.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    /// Whether the proof is valid.
    pub is_valid: bool,
    /// Circuit variant the proof was checked against.
    pub profile: CircuitProfile,
    /// The public inputs the proof was verified against.
    pub public_inputs: Vec<Fr>,
    /// Size of the proof in bytes.
    pub proof_size: usize,
}

impl Verifier {
    /// Verify and produce a detailed report.
    pub fn verify_with_report(&self, proof: &ProofData) -> VerifierResult<VerificationReport> {
        let is_valid = self.verify(proof)?;

        Ok(VerificationReport {
            is_valid,
            profile: self.profile,
            public_inputs: proof.public_inputs.clone(),
            proof_size: proof.size(),
        })
    }
}
