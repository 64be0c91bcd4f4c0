//! IP attestation: EIP-712 `IPVerification` typed data and the policy a
//! venue-network signer applies before signing it.
//!
//! The signature scheme itself is behind [`TypedDataSigner`]; this module
//! only builds the digest and JSON document a wallet-style signer consumes.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sha3::{Digest, Keccak256};

use crate::field::{EventId, FieldError};

pub const DOMAIN_NAME: &str = "WiFiProof";
pub const DOMAIN_VERSION: &str = "2";
/// Base Sepolia.
pub const DEFAULT_CHAIN_ID: u64 = 84532;
pub const DEFAULT_DEADLINE_WINDOW_SECS: u64 = 120;

const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
pub const IP_VERIFICATION_TYPE: &str =
    "IPVerification(address wallet,bytes32 eventId,bytes32 venueHash,uint64 deadline)";

pub type AttestationResult<T> = Result<T, AttestationError>;

#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error("Invalid {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("Event id does not fit in bytes32")]
    EventIdOutOfRange,

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Event id does not match the event record")]
    EventMismatch,

    #[error("Venue hash mismatch")]
    VenueHashMismatch,

    #[error("Not on venue subnet")]
    NotOnSubnet,

    #[error("Invalid deadline {deadline} (now {now}, window {window}s)")]
    InvalidDeadline { deadline: u64, now: u64, window: u64 },

    #[error("Event not active")]
    EventNotActive,

    #[error("Signer failed: {0}")]
    Signer(#[source] Box<dyn std::error::Error + Send + Sync>),
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

fn strip_hex_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

fn parse_fixed_hex<const N: usize>(field: &'static str, input: &str) -> AttestationResult<[u8; N]> {
    let digits = strip_hex_prefix(input.trim());
    if digits.len() != 2 * N {
        return Err(AttestationError::InvalidHex {
            field,
            reason: format!("expected {} hex digits, got {}", 2 * N, digits.len()),
        });
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).map_err(|e| AttestationError::InvalidHex {
        field,
        reason: e.to_string(),
    })?;
    Ok(out)
}

/// Parse a 20-byte `0x` address.
pub fn parse_address(field: &'static str, input: &str) -> AttestationResult<[u8; 20]> {
    parse_fixed_hex(field, input)
}

/// Parse a full-width bytes32 hex string.
pub fn parse_bytes32(field: &'static str, input: &str) -> AttestationResult<[u8; 32]> {
    parse_fixed_hex(field, input)
}

/// Event id as the bytes32 word carried in the typed data.
pub fn event_id_bytes32(event_id: &EventId) -> AttestationResult<[u8; 32]> {
    let value = event_id.to_bigint()?;
    let (sign, bytes) = value.to_bytes_be();
    if sign == num_bigint::Sign::Minus || bytes.len() > 32 {
        return Err(AttestationError::EventIdOutOfRange);
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(out)
}

fn uint256_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: &[u8; 20]) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address);
    word
}

fn hex_string(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// EIP-712 domain of the WiFiProof contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: String,
}

impl Eip712Domain {
    pub fn wifiproof(chain_id: u64, verifying_contract: &str) -> AttestationResult<Self> {
        let contract = parse_address("verifyingContract", verifying_contract)?;
        Ok(Self {
            name: DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            chain_id,
            verifying_contract: hex_string(&contract),
        })
    }

    pub fn separator(&self) -> AttestationResult<[u8; 32]> {
        let contract = parse_address("verifyingContract", &self.verifying_contract)?;

        let mut buf = Vec::with_capacity(5 * 32);
        buf.extend_from_slice(&keccak256(EIP712_DOMAIN_TYPE.as_bytes()));
        buf.extend_from_slice(&keccak256(self.name.as_bytes()));
        buf.extend_from_slice(&keccak256(self.version.as_bytes()));
        buf.extend_from_slice(&uint256_word(self.chain_id));
        buf.extend_from_slice(&address_word(&contract));
        Ok(keccak256(&buf))
    }
}

/// The `IPVerification` message, with hex fields normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpVerification {
    pub wallet: String,
    pub event_id: String,
    pub venue_hash: String,
    pub deadline: u64,
}

impl IpVerification {
    pub fn new(
        wallet: &str,
        event_id: &EventId,
        venue_hash: &str,
        deadline: u64,
    ) -> AttestationResult<Self> {
        Ok(Self {
            wallet: hex_string(&parse_address("wallet", wallet)?),
            event_id: hex_string(&event_id_bytes32(event_id)?),
            venue_hash: hex_string(&parse_bytes32("venueHash", venue_hash)?),
            deadline,
        })
    }

    pub fn type_hash() -> [u8; 32] {
        keccak256(IP_VERIFICATION_TYPE.as_bytes())
    }

    pub fn struct_hash(&self) -> AttestationResult<[u8; 32]> {
        let wallet = parse_address("wallet", &self.wallet)?;
        let event_id = parse_bytes32("eventId", &self.event_id)?;
        let venue_hash = parse_bytes32("venueHash", &self.venue_hash)?;

        let mut buf = Vec::with_capacity(5 * 32);
        buf.extend_from_slice(&Self::type_hash());
        buf.extend_from_slice(&address_word(&wallet));
        buf.extend_from_slice(&event_id);
        buf.extend_from_slice(&venue_hash);
        buf.extend_from_slice(&uint256_word(self.deadline));
        Ok(keccak256(&buf))
    }

    /// `keccak256(0x1901 || domainSeparator || structHash)`
    pub fn signing_hash(&self, domain: &Eip712Domain) -> AttestationResult<[u8; 32]> {
        let mut buf = Vec::with_capacity(2 + 2 * 32);
        buf.extend_from_slice(&[0x19, 0x01]);
        buf.extend_from_slice(&domain.separator()?);
        buf.extend_from_slice(&self.struct_hash()?);
        Ok(keccak256(&buf))
    }

    /// The `eth_signTypedData_v4` document for this message.
    pub fn typed_data_json(&self, domain: &Eip712Domain) -> serde_json::Value {
        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "IPVerification": [
                    { "name": "wallet", "type": "address" },
                    { "name": "eventId", "type": "bytes32" },
                    { "name": "venueHash", "type": "bytes32" },
                    { "name": "deadline", "type": "uint64" }
                ]
            },
            "primaryType": "IPVerification",
            "domain": domain,
            "message": self
        })
    }
}

/// Produces a hex signature over an `IPVerification` message.
pub trait TypedDataSigner {
    type Error: std::error::Error + Send + Sync + 'static;

    fn sign(&self, domain: &Eip712Domain, message: &IpVerification) -> Result<String, Self::Error>;
}

/// Stored parameters of an event, as the attesting service sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: String,
    pub venue_hash: String,
    pub subnet_prefix: String,
    #[serde(default)]
    pub start_time: Option<u64>,
    #[serde(default)]
    pub end_time: Option<u64>,
}

/// Checks applied before an IP attestation is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttestationPolicy {
    pub max_deadline_window_secs: u64,
}

impl Default for AttestationPolicy {
    fn default() -> Self {
        Self {
            max_deadline_window_secs: DEFAULT_DEADLINE_WINDOW_SECS,
        }
    }
}

impl AttestationPolicy {
    pub fn check(
        &self,
        request: &IpVerification,
        record: &EventRecord,
        client_ip: &str,
        now: u64,
    ) -> AttestationResult<()> {
        if !record.event_id.eq_ignore_ascii_case(&request.event_id) {
            return Err(AttestationError::EventMismatch);
        }
        if !record.venue_hash.eq_ignore_ascii_case(&request.venue_hash) {
            return Err(AttestationError::VenueHashMismatch);
        }
        if record.subnet_prefix.is_empty() || !client_ip.trim().starts_with(&record.subnet_prefix) {
            return Err(AttestationError::NotOnSubnet);
        }

        let window = self.max_deadline_window_secs;
        if request.deadline < now || request.deadline > now.saturating_add(window) {
            return Err(AttestationError::InvalidDeadline {
                deadline: request.deadline,
                now,
                window,
            });
        }

        if record.start_time.is_some_and(|start| now < start)
            || record.end_time.is_some_and(|end| now > end)
        {
            return Err(AttestationError::EventNotActive);
        }
        Ok(())
    }
}

/// A policy-checking front for a [`TypedDataSigner`].
pub struct Attestor<S> {
    domain: Eip712Domain,
    policy: AttestationPolicy,
    signer: S,
}

impl<S: TypedDataSigner> Attestor<S> {
    pub fn new(domain: Eip712Domain, policy: AttestationPolicy, signer: S) -> Self {
        Self {
            domain,
            policy,
            signer,
        }
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// Check `request` against `record` and sign it.
    pub fn attest(
        &self,
        request: &IpVerification,
        record: &EventRecord,
        client_ip: &str,
        now: u64,
    ) -> AttestationResult<String> {
        if let Err(e) = self.policy.check(request, record, client_ip, now) {
            tracing::warn!(wallet = %request.wallet, error = %e, "ip attestation refused");
            return Err(e);
        }

        let signature = self
            .signer
            .sign(&self.domain, request)
            .map_err(|e| AttestationError::Signer(Box::new(e)))?;
        tracing::info!(
            wallet = %request.wallet,
            deadline = request.deadline,
            "ip attestation signed"
        );
        Ok(signature)
    }
}
