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

use super::fetch_failure;
use crate::result::{Check, Failure, FailureReason};
use lap_common::attestation::NamespaceAttestation;
use lap_common::crypto::verify_schnorr;
use lap_common::fragment::Fragment;
use lap_common::origin::url_within_namespace;
use lap_fetch::FetchError;
use serde_json::json;

const CHECK: Check = Check::PublisherAssociation;

/// Publisher association: the namespace attestation exists, names the same
/// publisher key, has not expired at `now`, covers the fragment URL, and
/// carries a valid Schnorr signature over its canonical payload.
///
/// Expiry is strict: `now == exp` is already expired.
pub fn admit(
    fragment: &Fragment,
    fetched: Result<NamespaceAttestation, FetchError>,
    now: i64,
) -> Result<NamespaceAttestation, Failure> {
    let na = fetched
        .map_err(|e| fetch_failure(CHECK, &fragment.namespace_attestation_url, &e))?;
    na.validate().map_err(|e| {
        Failure::new(
            CHECK,
            FailureReason::Malformed,
            "namespace attestation carries malformed fields",
            json!({ "error": e.to_string() }),
        )
    })?;
    if na.key != fragment.publisher_claim {
        return Err(Failure::new(
            CHECK,
            FailureReason::PublisherClaimMismatch,
            "namespace attestation is keyed by a different publisher",
            json!({ "expected": fragment.publisher_claim, "actual": na.key }),
        ));
    }
    if now >= na.payload.exp {
        return Err(Failure::new(
            CHECK,
            FailureReason::Expired,
            "namespace attestation has expired",
            json!({ "exp": na.payload.exp, "now": now }),
        ));
    }
    if !url_within_namespace(&fragment.fragment_url, &na.payload.namespace) {
        return Err(Failure::new(
            CHECK,
            FailureReason::UrlNotUnderNamespace,
            "fragment URL is not covered by the attested namespace",
            json!({
                "fragment_url": fragment.fragment_url,
                "namespace": na.payload.namespace,
            }),
        ));
    }
    let digest = na.payload.signing_digest().map_err(|e| {
        Failure::new(
            CHECK,
            FailureReason::Malformed,
            "namespace payload has no canonical form",
            json!({ "error": e.to_string() }),
        )
    })?;
    // Any verification error counts as an invalid signature
    let valid = verify_schnorr(&na.key, &na.sig, &digest).unwrap_or(false);
    if !valid {
        return Err(Failure::new(
            CHECK,
            FailureReason::SignatureInvalid,
            "Schnorr signature does not verify over the canonical payload",
            json!({ "key": na.key }),
        ));
    }
    Ok(na)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lap_common::attestation::NamespacePayload;
    use lap_common::crypto::SigningKey;

    const NOW: i64 = 1700000000;

    fn signed_na(key: &SigningKey, namespace: &str, exp: i64) -> NamespaceAttestation {
        let payload = NamespacePayload {
            namespace: namespace.to_string(),
            exp,
        };
        let digest = payload.signing_digest().unwrap();
        NamespaceAttestation {
            sig: key.sign_digest_hex(&digest),
            key: key.public_key_hex(),
            payload,
        }
    }

    fn fragment_for(key: &SigningKey) -> Fragment {
        Fragment {
            spec: "v0.2".to_string(),
            fragment_url: "https://ex.com/p/a/posts/1".to_string(),
            publisher_claim: key.public_key_hex(),
            resource_attestation_url: "https://ex.com/p/a/posts/1/_la_resource.json".to_string(),
            namespace_attestation_url: "https://ex.com/p/a/_la_namespace.json".to_string(),
            canonical_content: b"<p>hi</p>".to_vec(),
            preview_content: "<p>hi</p>".to_string(),
        }
    }

    #[test]
    fn test_valid_association_admitted() {
        let key = SigningKey::generate();
        let fragment = fragment_for(&key);
        let na = signed_na(&key, "https://ex.com/p/a/", NOW + 3600);
        assert!(admit(&fragment, Ok(na), NOW).is_ok());
    }

    #[test]
    fn test_foreign_key_rejected() {
        let key = SigningKey::generate();
        let other = SigningKey::generate();
        let fragment = fragment_for(&key);
        // Signed consistently, but by someone else entirely
        let na = signed_na(&other, "https://ex.com/p/a/", NOW + 3600);
        let failure = admit(&fragment, Ok(na), NOW).unwrap_err();
        assert_eq!(failure.reason, FailureReason::PublisherClaimMismatch);
    }

    #[test]
    fn test_expiry_is_strict() {
        let key = SigningKey::generate();
        let fragment = fragment_for(&key);

        let na = signed_na(&key, "https://ex.com/p/a/", NOW - 1);
        assert_eq!(
            admit(&fragment, Ok(na), NOW).unwrap_err().reason,
            FailureReason::Expired
        );

        // exp == now is already expired
        let na = signed_na(&key, "https://ex.com/p/a/", NOW);
        assert_eq!(
            admit(&fragment, Ok(na), NOW).unwrap_err().reason,
            FailureReason::Expired
        );

        let na = signed_na(&key, "https://ex.com/p/a/", NOW + 1);
        assert!(admit(&fragment, Ok(na), NOW).is_ok());
    }

    #[test]
    fn test_url_outside_namespace_rejected() {
        let key = SigningKey::generate();
        let mut fragment = fragment_for(&key);
        fragment.fragment_url = "https://ex.com/p/bob/posts/1".to_string();
        let na = signed_na(&key, "https://ex.com/p/a/", NOW + 3600);
        let failure = admit(&fragment, Ok(na), NOW).unwrap_err();
        assert_eq!(failure.reason, FailureReason::UrlNotUnderNamespace);
    }

    #[test]
    fn test_namespace_equality_with_or_without_slash() {
        let key = SigningKey::generate();
        let mut fragment = fragment_for(&key);
        fragment.fragment_url = "https://ex.com/p/a".to_string();
        let na = signed_na(&key, "https://ex.com/p/a/", NOW + 3600);
        assert!(admit(&fragment, Ok(na), NOW).is_ok());

        fragment.fragment_url = "https://ex.com/p/a/".to_string();
        let na = signed_na(&key, "https://ex.com/p/a/", NOW + 3600);
        assert!(admit(&fragment, Ok(na), NOW).is_ok());
    }

    #[test]
    fn test_tampered_payload_fails_signature() {
        let key = SigningKey::generate();
        let fragment = fragment_for(&key);
        let mut na = signed_na(&key, "https://ex.com/p/a/", NOW + 3600);
        na.payload.exp += 1;
        let failure = admit(&fragment, Ok(na), NOW).unwrap_err();
        assert_eq!(failure.reason, FailureReason::SignatureInvalid);
    }

    #[test]
    fn test_uppercase_hex_is_malformed() {
        let key = SigningKey::generate();
        let fragment = fragment_for(&key);
        let mut na = signed_na(&key, "https://ex.com/p/a/", NOW + 3600);
        na.sig = na.sig.to_ascii_uppercase();
        let failure = admit(&fragment, Ok(na), NOW).unwrap_err();
        assert_eq!(failure.reason, FailureReason::Malformed);
    }

    #[test]
    fn test_fetch_failure_mapping() {
        let key = SigningKey::generate();
        let fragment = fragment_for(&key);
        let err = FetchError::Transport {
            url: fragment.namespace_attestation_url.clone(),
            message: "timed out".to_string(),
        };
        let failure = admit(&fragment, Err(err), NOW).unwrap_err();
        assert_eq!(failure.check, Check::PublisherAssociation);
        assert_eq!(failure.reason, FailureReason::FetchFailed);
    }
}
