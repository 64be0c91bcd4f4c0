//! End-to-end: setup, claim assembly with an IP attestation, and
//! verification of the claim against the venue commitment.

use wifiproof::attestation::{
    AttestationError, AttestationPolicy, Attestor, Eip712Domain, EventRecord, IpVerification,
    TypedDataSigner, DEFAULT_CHAIN_ID,
};
use wifiproof::claim::EMPTY_SIGNATURE;
use wifiproof::venue::{venue_hash_hex, VenueCommitment};
use wifiproof::verifier::VerifierError;
use wifiproof::{
    compute_venue_hash_from_scaled, CircuitProfile, Claim, ClaimBuilder, ClaimRequest, EventId,
    GpsCoordinate, Groth16Prover, Keccak256Hasher, ProvingBackend, Verifier,
};

const CONTRACT: &str = "0x1111111111111111111111111111111111111111";
const WALLET: &str = "0x2222222222222222222222222222222222222222";
const EVENT_ID: &str = "0x00000000000000000000000000000000000000000000000000000000000007e8";
const NOW: u64 = 1_700_000_000;

fn venue() -> GpsCoordinate {
    GpsCoordinate::new(37.7749, -122.4194)
}

fn request() -> ClaimRequest {
    ClaimRequest::new(GpsCoordinate::new(37.7750, -122.4195), venue(), 100.0, EVENT_ID)
}

fn venue_commitment() -> VenueCommitment {
    VenueCommitment::from_location(&venue(), 100.0, &EventId::from(EVENT_ID)).unwrap()
}

/// Signs by returning the EIP-712 digest, standing in for a wallet.
struct DigestSigner;

impl TypedDataSigner for DigestSigner {
    type Error = AttestationError;

    fn sign(
        &self,
        domain: &Eip712Domain,
        message: &IpVerification,
    ) -> Result<String, AttestationError> {
        Ok(venue_hash_hex(&message.signing_hash(domain)?))
    }
}

/// Signs through an [`Attestor`], the way the venue network service would.
struct NetworkSigner {
    attestor: Attestor<DigestSigner>,
    record: EventRecord,
    client_ip: &'static str,
}

impl TypedDataSigner for NetworkSigner {
    type Error = AttestationError;

    fn sign(
        &self,
        _domain: &Eip712Domain,
        message: &IpVerification,
    ) -> Result<String, AttestationError> {
        self.attestor.attest(message, &self.record, self.client_ip, NOW)
    }
}

fn network_signer(client_ip: &'static str) -> NetworkSigner {
    let venue_hash = compute_venue_hash_from_scaled(
        37.7749,
        -122.4194,
        100.0,
        &EventId::from(EVENT_ID),
        &Keccak256Hasher,
    )
    .unwrap();
    NetworkSigner {
        attestor: Attestor::new(
            Eip712Domain::wifiproof(DEFAULT_CHAIN_ID, CONTRACT).unwrap(),
            AttestationPolicy::default(),
            DigestSigner,
        ),
        record: EventRecord {
            event_id: EVENT_ID.to_string(),
            venue_hash: venue_hash_hex(&venue_hash),
            subnet_prefix: "10.42.".to_string(),
            start_time: None,
            end_time: None,
        },
        client_ip,
    }
}

#[test]
fn test_claim_round_trip_verifies_for_venue() {
    let (prover, vk) = Groth16Prover::setup_with_seed(CircuitProfile::WithEventId, 42).unwrap();
    let verifier = Verifier::new(vk, CircuitProfile::WithEventId).unwrap();

    let mut req = request();
    req.wallet = Some(WALLET.to_string());
    let builder = ClaimBuilder::new(CONTRACT);
    let claim = builder
        .build_with_signer(&prover, &network_signer("10.42.3.9"), &req, NOW)
        .unwrap();

    // The attested message binds the same venue hash the circuit fields produce.
    let commitment = venue_commitment();
    let expected = IpVerification::new(
        WALLET,
        &EventId::from(EVENT_ID),
        &venue_hash_hex(&commitment.hash(&Keccak256Hasher)),
        NOW + 120,
    )
    .unwrap()
    .signing_hash(&builder.domain().unwrap())
    .unwrap();
    assert_eq!(claim.ip_signature, venue_hash_hex(&expected));

    // Persist and reload, as the submitter would.
    let reloaded = Claim::from_json(&claim.to_json_pretty().unwrap()).unwrap();
    let proof = reloaded.to_proof_data().unwrap();
    assert!(prover.verify(&proof).unwrap());
    assert!(verifier.verify_for_venue(&proof, &commitment).unwrap());

    // A different event at the same venue is not covered by this claim.
    let other = VenueCommitment::from_location(&venue(), 100.0, &EventId::from("0x7e9")).unwrap();
    assert!(matches!(
        verifier.verify_for_venue(&proof, &other),
        Err(VerifierError::PublicInputMismatch)
    ));
}

#[test]
fn test_off_subnet_claim_is_not_attested() {
    let (prover, _vk) = Groth16Prover::setup_with_seed(CircuitProfile::WithEventId, 42).unwrap();

    let mut req = request();
    req.wallet = Some(WALLET.to_string());
    let result = ClaimBuilder::new(CONTRACT).build_with_signer(
        &prover,
        &network_signer("203.0.113.5"),
        &req,
        NOW,
    );
    assert!(result.is_err());

    // Without a signer the claim still assembles, unsigned.
    let claim = ClaimBuilder::new(CONTRACT).build_at(&prover, &req, NOW).unwrap();
    assert_eq!(claim.ip_signature, EMPTY_SIGNATURE);
}

#[test]
fn test_out_of_radius_user_cannot_claim() {
    let (prover, _vk) = Groth16Prover::setup_with_seed(CircuitProfile::WithEventId, 42).unwrap();
    let far = ClaimRequest::new(GpsCoordinate::new(37.80, -122.4194), venue(), 100.0, EVENT_ID);
    assert!(ClaimBuilder::new(CONTRACT).build_at(&prover, &far, NOW).is_err());
}

#[test]
fn test_keys_survive_disk_round_trip() {
    let dir = std::env::temp_dir().join(format!("wifiproof-keys-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let pk_path = dir.join("pk.bin");
    let vk_path = dir.join("vk.bin");

    let (prover, vk) = Groth16Prover::setup_with_seed(CircuitProfile::WithoutEventId, 3).unwrap();
    prover.save_proving_key(&pk_path).unwrap();
    Verifier::new(vk, CircuitProfile::WithoutEventId)
        .unwrap()
        .save(&vk_path)
        .unwrap();

    let prover = Groth16Prover::load_proving_key(&pk_path).unwrap();
    let verifier = Verifier::load(&vk_path).unwrap();
    assert_eq!(prover.profile(), CircuitProfile::WithoutEventId);
    assert_eq!(verifier.profile(), CircuitProfile::WithoutEventId);

    let claim = ClaimBuilder::new(CONTRACT)
        .with_profile(prover.profile())
        .build_at(&prover, &request(), NOW)
        .unwrap();
    let proof = claim.to_proof_data().unwrap();
    assert_eq!(proof.public_inputs.len(), 3);

    let commitment = venue_commitment();
    assert!(verifier.verify_for_venue(&proof, &commitment).unwrap());

    std::fs::remove_dir_all(&dir).unwrap();
}
