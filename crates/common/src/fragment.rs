// Copyright 2024, 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::canonical::{require_absolute_url, require_lower_hex, CanonicalError};
use crate::crypto::PUBKEY_HEX_LEN;
use crate::SPEC_VERSION;

/// The parsed representation of a LAP article.
///
/// Produced by issuance, transported as HTML, recovered by the fragment
/// parser at verification time. `canonical_content` is the authoritative
/// body the resource attestation hash commits to; `preview_content` is a
/// display copy and never participates in verification decisions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Fragment {
    /// Protocol version, must equal `"v0.2"`
    pub spec: String,
    /// Canonical URL of where this fragment asserts its content lives
    pub fragment_url: String,
    /// x-only secp256k1 public key asserted locally, 64 lowercase hex chars
    pub publisher_claim: String,
    /// Where the resource attestation is served
    pub resource_attestation_url: String,
    /// Where the namespace attestation is served
    pub namespace_attestation_url: String,
    /// The authoritative body bytes that were hashed
    pub canonical_content: Vec<u8>,
    /// Display-only rendition of the body
    pub preview_content: String,
}

impl Fragment {
    /// Checks the parse-time invariants: version pin, absolute URLs, claim
    /// hex shape, non-empty canonical content.
    ///
    /// Origin agreement between the three URLs is deliberately not checked
    /// here; the verification pipeline owns that decision so a cross-origin
    /// fragment is reported as a failed check rather than refused outright.
    pub fn validate(&self) -> Result<(), CanonicalError> {
        if self.spec != SPEC_VERSION {
            return Err(CanonicalError::MalformedPayload {
                field: "spec",
                reason: format!("expected {SPEC_VERSION:?}, got {:?}", self.spec),
            });
        }
        require_absolute_url("fragment_url", &self.fragment_url)?;
        require_lower_hex("publisher_claim", &self.publisher_claim, PUBKEY_HEX_LEN)?;
        require_absolute_url("resource_attestation_url", &self.resource_attestation_url)?;
        require_absolute_url("namespace_attestation_url", &self.namespace_attestation_url)?;
        if self.canonical_content.is_empty() {
            return Err(CanonicalError::MalformedPayload {
                field: "canonical_content",
                reason: "canonical content is empty".to_string(),
            });
        }
        Ok(())
    }
}
