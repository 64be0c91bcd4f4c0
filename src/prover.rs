//! Groth16 proof generation for proximity proofs.
//!
//! [`ProvingBackend`] is the proving capability the claim pipeline consumes;
//! [`Groth16Prover`] is the in-crate BN254 implementation of it.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, ProvingKey, VerifyingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{rngs::StdRng, SeedableRng};
use rand::rngs::OsRng;
use std::path::Path;

use crate::circuit::{CircuitError, CircuitInputs, ProximityCircuit, ProximityWitness};
use crate::venue::to_bytes32_hex;
use crate::CircuitProfile;

/// Result type for prover operations.
pub type ProverResult<T> = Result<T, ProverError>;

/// Errors that can occur during proving.
#[derive(Debug, thiserror::Error)]
pub enum ProverError {
    #[error("Trusted setup failed: {0}")]
    SetupFailed(String),

    #[error("Proof generation failed: {0}")]
    ProofGenerationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error("Circuit profile mismatch: prover is {expected}, inputs are {found}")]
    ProfileMismatch {
        expected: CircuitProfile,
        found: CircuitProfile,
    },

    #[error("Witness does not satisfy the circuit: {0}")]
    Unsatisfied(String),
}

/// A proving capability: witness generation, proving and verification.
pub trait ProvingBackend {
    type Witness;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Turn named circuit inputs into a witness, failing if the circuit's
    /// assertions do not hold.
    fn execute(&self, inputs: &CircuitInputs) -> Result<Self::Witness, Self::Error>;

    fn prove(&self, witness: Self::Witness) -> Result<ProofData, Self::Error>;

    fn verify(&self, proof: &ProofData) -> Result<bool, Self::Error>;
}

/// A serialized proof plus its ordered public inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofData {
    pub proof: Vec<u8>,
    pub public_inputs: Vec<Fr>,
}

impl ProofData {
    /// `0x`-prefixed proof bytes.
    pub fn proof_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.proof))
    }

    /// Public inputs as zero-padded bytes32 hex strings.
    pub fn public_inputs_bytes32(&self) -> Vec<String> {
        self.public_inputs.iter().map(to_bytes32_hex).collect()
    }

    pub fn size(&self) -> usize {
        self.proof.len()
    }
}

/// Prover for generating proximity proofs.
pub struct Groth16Prover {
    /// Groth16 proving key.
    proving_key: ProvingKey<Bn254>,
    /// Prepared key for local verification.
    prepared_vk: PreparedVerifyingKey<Bn254>,
    /// Circuit variant this prover was set up for.
    profile: CircuitProfile,
}

impl Groth16Prover {
    /// Perform trusted setup for a circuit profile with fresh randomness.
    ///
    /// In production, this should use a secure multi-party computation.
    pub fn setup(profile: CircuitProfile) -> ProverResult<(Self, VerifyingKey<Bn254>)> {
        Self::setup_with_rng(profile, &mut StdRng::from_entropy())
    }

    /// Deterministic setup (NOT secure for production, reproducible keys).
    pub fn setup_with_seed(
        profile: CircuitProfile,
        seed: u64,
    ) -> ProverResult<(Self, VerifyingKey<Bn254>)> {
        Self::setup_with_rng(profile, &mut StdRng::seed_from_u64(seed))
    }

    fn setup_with_rng(
        profile: CircuitProfile,
        rng: &mut StdRng,
    ) -> ProverResult<(Self, VerifyingKey<Bn254>)> {
        let circuit = ProximityCircuit::new_empty(profile);
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, rng)
            .map_err(|e| ProverError::SetupFailed(e.to_string()))?;
        tracing::info!(%profile, "proximity circuit setup complete");

        Ok((Self::from_proving_key(pk, profile)?, vk))
    }

    pub fn from_proving_key(
        proving_key: ProvingKey<Bn254>,
        profile: CircuitProfile,
    ) -> ProverResult<Self> {
        let prepared_vk = Groth16::<Bn254>::process_vk(&proving_key.vk)
            .map_err(|e| ProverError::SetupFailed(e.to_string()))?;
        Ok(Self {
            proving_key,
            prepared_vk,
            profile,
        })
    }

    /// Get the circuit profile this prover was set up for.
    pub fn profile(&self) -> CircuitProfile {
        self.profile
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.proving_key.vk
    }

    /// Save proving key to file.
    pub fn save_proving_key(&self, path: &Path) -> ProverResult<()> {
        let mut bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| ProverError::SerializationError(e.to_string()))?;

        // Prepend the profile tag
        let mut file_bytes = vec![self.profile.tag()];
        file_bytes.extend(bytes);

        std::fs::write(path, file_bytes)?;
        Ok(())
    }

    /// Load proving key from file.
    pub fn load_proving_key(path: &Path) -> ProverResult<Self> {
        let bytes = std::fs::read(path)?;
        let (profile, key_bytes) = split_profile_tag(&bytes)?;
        let pk = ProvingKey::deserialize_compressed(key_bytes)
            .map_err(|e| ProverError::SerializationError(e.to_string()))?;

        Self::from_proving_key(pk, profile)
    }
}

impl ProvingBackend for Groth16Prover {
    type Witness = ProximityWitness;
    type Error = ProverError;

    fn execute(&self, inputs: &CircuitInputs) -> ProverResult<ProximityWitness> {
        let witness = inputs.to_witness()?;
        if witness.profile() != self.profile {
            return Err(ProverError::ProfileMismatch {
                expected: self.profile,
                found: witness.profile(),
            });
        }

        let cs = ConstraintSystem::<Fr>::new_ref();
        ProximityCircuit::new_with_witness(&witness)
            .generate_constraints(cs.clone())
            .map_err(|e| ProverError::ProofGenerationFailed(e.to_string()))?;
        let satisfied = cs
            .is_satisfied()
            .map_err(|e| ProverError::ProofGenerationFailed(e.to_string()))?;
        if !satisfied {
            let constraint = cs
                .which_is_unsatisfied()
                .ok()
                .flatten()
                .unwrap_or_else(|| "unknown constraint".to_string());
            tracing::warn!(%constraint, "location is outside the venue radius");
            return Err(ProverError::Unsatisfied(
                "location is outside the venue radius".to_string(),
            ));
        }

        Ok(witness)
    }

    fn prove(&self, witness: ProximityWitness) -> ProverResult<ProofData> {
        let public_inputs = witness.public_inputs();
        let circuit = ProximityCircuit::new_with_witness(&witness);

        let proof = Groth16::<Bn254>::prove(&self.proving_key, circuit, &mut OsRng)
            .map_err(|e| ProverError::ProofGenerationFailed(e.to_string()))?;

        let mut proof_bytes = Vec::new();
        proof
            .serialize_compressed(&mut proof_bytes)
            .map_err(|e| ProverError::SerializationError(e.to_string()))?;
        tracing::debug!(bytes = proof_bytes.len(), "proximity proof generated");

        Ok(ProofData {
            proof: proof_bytes,
            public_inputs,
        })
    }

    fn verify(&self, proof: &ProofData) -> ProverResult<bool> {
        let groth_proof = ark_groth16::Proof::<Bn254>::deserialize_compressed(&proof.proof[..])
            .map_err(|e| ProverError::SerializationError(e.to_string()))?;
        Groth16::<Bn254>::verify_with_processed_vk(
            &self.prepared_vk,
            &proof.public_inputs,
            &groth_proof,
        )
        .map_err(|e| ProverError::ProofGenerationFailed(e.to_string()))
    }
}

fn split_profile_tag(bytes: &[u8]) -> ProverResult<(CircuitProfile, &[u8])> {
    let (tag, rest) = bytes
        .split_first()
        .ok_or_else(|| ProverError::SerializationError("empty key file".to_string()))?;
    let profile = CircuitProfile::from_tag(*tag).ok_or_else(|| {
        ProverError::SerializationError(format!("unknown circuit profile tag {}", tag))
    })?;
    Ok((profile, rest))
}

/// Save verifying key to file, tagged with its circuit profile.
pub fn save_verifying_key(
    vk: &VerifyingKey<Bn254>,
    profile: CircuitProfile,
    path: &Path,
) -> ProverResult<()> {
    let mut bytes = vec![profile.tag()];
    vk.serialize_compressed(&mut bytes)
        .map_err(|e| ProverError::SerializationError(e.to_string()))?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Load a verifying key and its circuit profile from file.
pub fn load_verifying_key(path: &Path) -> ProverResult<(VerifyingKey<Bn254>, CircuitProfile)> {
    let bytes = std::fs::read(path)?;
    let (profile, key_bytes) = split_profile_tag(&bytes)?;
    let vk = VerifyingKey::deserialize_compressed(key_bytes)
        .map_err(|e| ProverError::SerializationError(e.to_string()))?;
    Ok((vk, profile))
}
