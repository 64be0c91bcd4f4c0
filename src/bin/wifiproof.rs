//! `wifiproof` command line: venue hashes, circuit inputs, key setup, claim
//! generation and claim verification.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use wifiproof::attestation::DEFAULT_CHAIN_ID;
use wifiproof::claim::unix_now;
use wifiproof::ip_verify::HttpIpSigner;
use wifiproof::prover::save_verifying_key;
use wifiproof::venue::{venue_hash_hex, Sha256Hasher, VenueCommitment};
use wifiproof::{
    build_inputs, CircuitProfile, Claim, ClaimBuilder, ClaimRequest, EventId, GpsCoordinate,
    Groth16Prover, Keccak256Hasher, Verifier,
};

#[derive(Parser, Debug)]
#[command(name = "wifiproof", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the venue hash for a venue, radius and event.
    VenueHash(VenueHashArgs),

    /// Print the circuit inputs as JSON.
    Inputs(InputsArgs),

    /// Run a (non-ceremony) trusted setup and write the key pair.
    Setup(SetupArgs),

    /// Prove presence and write the claim JSON.
    Claim(ClaimArgs),

    /// Check a claim file against a verifying key and venue parameters.
    Verify(VerifyArgs),
}

#[derive(Args, Debug)]
struct VenueArgs {
    #[arg(long, env = "VENUE_LAT", allow_hyphen_values = true)]
    venue_lat: f64,
    #[arg(long, env = "VENUE_LON", allow_hyphen_values = true)]
    venue_lon: f64,
    #[arg(long, env = "RADIUS_METERS")]
    radius_meters: f64,
}

impl VenueArgs {
    fn coordinate(&self) -> GpsCoordinate {
        GpsCoordinate::new(self.venue_lat, self.venue_lon)
    }
}

#[derive(Args, Debug)]
struct UserArgs {
    #[arg(long, env = "USER_LAT", allow_hyphen_values = true)]
    user_lat: f64,
    #[arg(long, env = "USER_LON", allow_hyphen_values = true)]
    user_lon: f64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HashAlgorithm {
    Keccak256,
    Sha256,
}

#[derive(Args, Debug)]
struct VenueHashArgs {
    #[command(flatten)]
    venue: VenueArgs,
    #[arg(long, env = "EVENT_ID")]
    event_id: String,
    #[arg(long, value_enum, default_value = "keccak256")]
    hash: HashAlgorithm,
}

#[derive(Args, Debug)]
struct InputsArgs {
    #[command(flatten)]
    user: UserArgs,
    #[command(flatten)]
    venue: VenueArgs,
    /// Omit for the circuit without an event binding.
    #[arg(long, env = "EVENT_ID")]
    event_id: Option<String>,
}

#[derive(Args, Debug)]
struct SetupArgs {
    #[arg(long, default_value_t = CircuitProfile::WithEventId)]
    profile: CircuitProfile,
    #[arg(long, default_value = "proving_key.bin")]
    proving_key: PathBuf,
    #[arg(long, default_value = "verifying_key.bin")]
    verifying_key: PathBuf,
    /// Deterministic setup. Reproducible keys, NOT secure.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct ClaimArgs {
    #[command(flatten)]
    user: UserArgs,
    #[command(flatten)]
    venue: VenueArgs,
    #[arg(long, env = "EVENT_ID")]
    event_id: String,
    #[arg(long, default_value = "proving_key.bin")]
    proving_key: PathBuf,
    #[arg(long, env = "WALLET_ADDRESS")]
    wallet: Option<String>,
    #[arg(long, env = "WIFIPROOF_ADDRESS", default_value = "")]
    wifiproof: String,
    #[arg(long, env = "VENUE_HASH")]
    venue_hash: Option<String>,
    /// Unix seconds; defaults to now + 120.
    #[arg(long, env = "SIG_DEADLINE")]
    sig_deadline: Option<u64>,
    #[arg(long, env = "IP_SIGNATURE")]
    ip_signature: Option<String>,
    /// verify-ip endpoint asked for the attestation when a wallet is set.
    #[arg(long, env = "IP_VERIFY_URL")]
    ip_verify_url: Option<String>,
    #[arg(long, env = "CHAIN_ID", default_value_t = DEFAULT_CHAIN_ID)]
    chain_id: u64,
    #[arg(long, env = "CLAIM_JSON", default_value = "claim.json")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    #[command(flatten)]
    venue: VenueArgs,
    #[arg(long, env = "CLAIM_JSON", default_value = "claim.json")]
    claim: PathBuf,
    #[arg(long, default_value = "verifying_key.bin")]
    verifying_key: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::VenueHash(args) => run_venue_hash(&args),
        Commands::Inputs(args) => run_inputs(&args),
        Commands::Setup(args) => run_setup(&args),
        Commands::Claim(args) => run_claim(&args),
        Commands::Verify(args) => run_verify(&args),
    }
}

fn run_venue_hash(args: &VenueHashArgs) -> Result<()> {
    let event_id = EventId::from(args.event_id.as_str());
    let commitment = VenueCommitment::from_location(
        &args.venue.coordinate(),
        args.venue.radius_meters,
        &event_id,
    )
    .context("failed to encode venue")?;
    let digest = match args.hash {
        HashAlgorithm::Keccak256 => commitment.hash(&Keccak256Hasher),
        HashAlgorithm::Sha256 => commitment.hash(&Sha256Hasher),
    };
    println!("{}", venue_hash_hex(&digest));
    Ok(())
}

fn run_inputs(args: &InputsArgs) -> Result<()> {
    let event_id = args.event_id.as_deref().map(EventId::from);
    let profile = if event_id.is_some() {
        CircuitProfile::WithEventId
    } else {
        CircuitProfile::WithoutEventId
    };
    let inputs = build_inputs(
        &GpsCoordinate::new(args.user.user_lat, args.user.user_lon),
        &args.venue.coordinate(),
        args.venue.radius_meters,
        event_id.as_ref(),
        profile,
    )
    .context("failed to build circuit inputs")?;
    println!("{}", serde_json::to_string_pretty(&inputs)?);
    Ok(())
}

fn run_setup(args: &SetupArgs) -> Result<()> {
    let (prover, vk) = match args.seed {
        Some(seed) => {
            tracing::warn!("deterministic setup requested; keys are not secure");
            Groth16Prover::setup_with_seed(args.profile, seed)
        }
        None => Groth16Prover::setup(args.profile),
    }
    .context("trusted setup failed")?;

    prover
        .save_proving_key(&args.proving_key)
        .with_context(|| format!("failed to write {}", args.proving_key.display()))?;
    save_verifying_key(&vk, args.profile, &args.verifying_key)
        .with_context(|| format!("failed to write {}", args.verifying_key.display()))?;

    tracing::info!(
        profile = %args.profile,
        proving_key = %args.proving_key.display(),
        verifying_key = %args.verifying_key.display(),
        "keys written"
    );
    Ok(())
}

fn run_claim(args: &ClaimArgs) -> Result<()> {
    let prover = Groth16Prover::load_proving_key(&args.proving_key)
        .with_context(|| format!("failed to load proving key {}", args.proving_key.display()))?;

    let mut request = ClaimRequest::new(
        GpsCoordinate::new(args.user.user_lat, args.user.user_lon),
        args.venue.coordinate(),
        args.venue.radius_meters,
        args.event_id.clone(),
    );
    request.wallet = args.wallet.clone();
    request.venue_hash = args.venue_hash.clone();
    request.sig_deadline = args.sig_deadline;
    request.ip_signature = args.ip_signature.clone();

    let builder = ClaimBuilder::new(args.wifiproof.clone())
        .with_profile(prover.profile())
        .with_chain_id(args.chain_id);
    let claim = match attestation_url(args.ip_verify_url.as_deref(), &request) {
        Some(url) => {
            let signer = HttpIpSigner::new(url).context("failed to create HTTP client")?;
            tracing::info!(url, "requesting IP attestation");
            builder
                .build_with_signer(&prover, &signer, &request, unix_now())
                .context("failed to build attested claim")?
        }
        None => builder.build(&prover, &request).context("failed to build claim")?,
    };

    fs::write(&args.output, claim.to_json_pretty()?)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    tracing::info!(path = %args.output.display(), "claim JSON written");
    if !claim.has_ip_signature() {
        tracing::warn!("IP signature missing. Set IP_SIGNATURE, or IP_VERIFY_URL with a wallet.");
    }
    Ok(())
}

/// The verify-ip endpoint to ask, if one is configured and the request still
/// needs an attestation.
fn attestation_url<'a>(url: Option<&'a str>, request: &ClaimRequest) -> Option<&'a str> {
    url.filter(|url| !url.trim().is_empty() && request.wants_attestation())
}

fn run_verify(args: &VerifyArgs) -> Result<()> {
    let json = fs::read_to_string(&args.claim)
        .with_context(|| format!("failed to read {}", args.claim.display()))?;
    let claim = Claim::from_json(&json).context("failed to parse claim json")?;
    let proof = claim.to_proof_data().context("malformed claim")?;

    let verifier = Verifier::load(&args.verifying_key)
        .with_context(|| format!("failed to load verifying key {}", args.verifying_key.display()))?;
    let commitment = VenueCommitment::from_location(
        &args.venue.coordinate(),
        args.venue.radius_meters,
        &EventId::from(claim.event_id.as_str()),
    )
    .context("failed to encode venue")?;

    if !verifier.verify_for_venue(&proof, &commitment)? {
        bail!("proof is invalid for {}", args.claim.display());
    }
    tracing::info!(profile = %verifier.profile(), "claim verified");
    Ok(())
}
