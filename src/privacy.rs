//! Deterministic pseudonymization of applicant identifiers.
//!
//! HMAC-SHA256 over the raw identifier with a service-held key. The same
//! identifier always maps to the same token, so decisions remain joinable
//! downstream without the raw id ever leaving the transport layer.

use crate::error::{PipelineError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Keyed pseudonymizer for applicant identifiers.
#[derive(Clone)]
pub struct Pseudonymizer {
    mac: HmacSha256,
}

impl Pseudonymizer {
    pub fn new(key: &[u8]) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|e| PipelineError::Internal(format!("invalid HMAC key: {e}")))?;
        Ok(Self { mac })
    }

    /// Tokenize one identifier to a hex digest.
    pub fn tokenize(&self, identifier: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(identifier.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
