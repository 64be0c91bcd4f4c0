//! IP attestation over HTTP.
//!
//! The venue network runs a verify-ip endpoint that checks the caller's
//! address and returns an EIP-712 signature over the posted
//! `IPVerification` message.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::attestation::{Eip712Domain, IpVerification, TypedDataSigner};

#[derive(Debug, thiserror::Error)]
pub enum IpVerifyError {
    #[error("IP verify request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IP verify failed ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("IP verify response missing signature")]
    MissingSignature,
}

#[derive(Debug, Deserialize)]
struct VerifyIpResponse {
    #[serde(default)]
    signature: Option<String>,
}

/// Pull the signature out of a verify-ip response.
pub fn signature_from_response(status: u16, body: &str) -> Result<String, IpVerifyError> {
    if !(200..300).contains(&status) {
        return Err(IpVerifyError::Status {
            status,
            body: body.to_string(),
        });
    }
    let response: VerifyIpResponse =
        serde_json::from_str(body).map_err(|_| IpVerifyError::MissingSignature)?;
    match response.signature {
        Some(signature) if !signature.is_empty() => Ok(signature),
        _ => Err(IpVerifyError::MissingSignature),
    }
}

/// Signs `IPVerification` messages by posting them to a verify-ip endpoint.
pub struct HttpIpSigner {
    client: Client,
    url: String,
}

impl HttpIpSigner {
    pub fn new(url: impl Into<String>) -> Result<Self, IpVerifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TypedDataSigner for HttpIpSigner {
    type Error = IpVerifyError;

    fn sign(
        &self,
        domain: &Eip712Domain,
        message: &IpVerification,
    ) -> Result<String, IpVerifyError> {
        // The endpoint signs under its own configured domain.
        tracing::debug!(
            url = %self.url,
            chain_id = domain.chain_id,
            contract = %domain.verifying_contract,
            "requesting ip attestation"
        );
        let response = self.client.post(&self.url).json(message).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        signature_from_response(status, &body)
    }
}
