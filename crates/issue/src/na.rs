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

use crate::IssueError;
use lap_common::attestation::{NamespaceAttestation, NamespacePayload};
use lap_common::crypto::SigningKey;
use lap_common::origin::canonicalize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default validity of a fresh namespace attestation: one 365-day year.
pub const DEFAULT_VALIDITY_SECS: i64 = 31_536_000;

/// Creates and signs a namespace attestation.
///
/// The namespace must arrive in canonical form ending in `/`. Without an
/// explicit expiry the attestation is valid for [DEFAULT_VALIDITY_SECS]
/// from now. Signing commits to `SHA256(canonical(payload))`, so any later
/// regeneration yields a fresh signature.
pub fn create_namespace_attestation(
    namespace_url: &str,
    exp: Option<i64>,
    key: &SigningKey,
) -> Result<NamespaceAttestation, IssueError> {
    let namespace = canonicalize(namespace_url)?;
    if !namespace.ends_with('/') {
        return Err(IssueError::InvalidNamespace(format!(
            "namespace must end in a slash, got {namespace:?}"
        )));
    }
    let exp = exp.unwrap_or_else(|| unix_now() + DEFAULT_VALIDITY_SECS);
    let payload = NamespacePayload { namespace, exp };
    let digest = payload.signing_digest()?;
    Ok(NamespaceAttestation {
        sig: key.sign_digest_hex(&digest),
        key: key.public_key_hex(),
        payload,
    })
}

/// Like [create_namespace_attestation], returning the canonical JSON bytes
/// to serve verbatim.
pub fn create_namespace_attestation_bytes(
    namespace_url: &str,
    exp: Option<i64>,
    key: &SigningKey,
) -> Result<Vec<u8>, IssueError> {
    let na = create_namespace_attestation(namespace_url, exp, key)?;
    Ok(na.canonical_bytes()?)
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
