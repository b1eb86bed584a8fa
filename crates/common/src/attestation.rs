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

use crate::canonical::{
    require_absolute_url, require_content_hash, require_lower_hex, strict_fields, strict_object,
    to_canonical_vec, CanonicalError,
};
use crate::crypto::{sha256, PUBKEY_HEX_LEN, SIGNATURE_HEX_LEN};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An unsigned attestation tying a canonical body hash to a fragment URL.
///
/// Served verbatim at the fragment's `data-la-resource-attestation-url` and
/// immutable for its publication lifetime. Field declaration order is the
/// canonical serialization order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResourceAttestation {
    /// Canonical URL the attested content claims to live at
    pub fragment_url: String,
    /// Tagged hash of the canonical body, `"sha256:" + 64 lowercase hex`
    pub hash: String,
    /// The publisher's x-only public key, 64 lowercase hex chars
    pub publisher_claim: String,
    /// Where the publisher's namespace attestation is served
    pub namespace_attestation_url: String,
}

impl ResourceAttestation {
    const FIELDS: &'static [&'static str] = &[
        "fragment_url",
        "hash",
        "publisher_claim",
        "namespace_attestation_url",
    ];

    /// Checks every field against its wire constraint.
    pub fn validate(&self) -> Result<(), CanonicalError> {
        require_absolute_url("fragment_url", &self.fragment_url)?;
        require_content_hash("hash", &self.hash)?;
        require_lower_hex("publisher_claim", &self.publisher_claim, PUBKEY_HEX_LEN)?;
        require_absolute_url("namespace_attestation_url", &self.namespace_attestation_url)
    }

    /// Serializes to canonical bytes after validating.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CanonicalError> {
        self.validate()?;
        to_canonical_vec(self)
    }

    /// Strict canonical parse: exactly the four declared fields, each valid.
    pub fn from_canonical_slice(bytes: &[u8]) -> Result<Self, CanonicalError> {
        let map = strict_object(bytes, Self::FIELDS)?;
        let ra: Self = serde_json::from_value(Value::Object(map))?;
        ra.validate()?;
        Ok(ra)
    }
}

/// The signed payload of a namespace attestation.
///
/// The exact canonical bytes of this payload are what gets hashed and
/// Schnorr-signed, so field order and compactness are load-bearing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NamespacePayload {
    /// The namespace the publisher asserts control over
    pub namespace: String,
    /// Expiration as Unix seconds, UTC
    pub exp: i64,
}

impl NamespacePayload {
    const FIELDS: &'static [&'static str] = &["namespace", "exp"];

    pub fn validate(&self) -> Result<(), CanonicalError> {
        require_absolute_url("namespace", &self.namespace)
    }

    /// Serializes to the exact bytes fed to SHA-256 before signing.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CanonicalError> {
        self.validate()?;
        to_canonical_vec(self)
    }

    /// The digest a namespace attestation signature commits to.
    pub fn signing_digest(&self) -> Result<[u8; 32], CanonicalError> {
        Ok(sha256(&self.canonical_bytes()?))
    }

    pub fn from_canonical_slice(bytes: &[u8]) -> Result<Self, CanonicalError> {
        let map = strict_object(bytes, Self::FIELDS)?;
        let payload: Self = serde_json::from_value(Value::Object(map))?;
        payload.validate()?;
        Ok(payload)
    }
}

/// A signed attestation asserting control of a namespace until an expiry.
///
/// Regenerating one of these always yields a different `sig` because BIP-340
/// nonces are randomized.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NamespaceAttestation {
    /// The signed payload
    pub payload: NamespacePayload,
    /// x-only public key of the signer, 64 lowercase hex chars
    pub key: String,
    /// BIP-340 Schnorr signature over `SHA256(canonical(payload))`, 128 hex
    pub sig: String,
}

impl NamespaceAttestation {
    const FIELDS: &'static [&'static str] = &["payload", "key", "sig"];

    pub fn validate(&self) -> Result<(), CanonicalError> {
        self.payload.validate()?;
        require_lower_hex("key", &self.key, PUBKEY_HEX_LEN)?;
        require_lower_hex("sig", &self.sig, SIGNATURE_HEX_LEN)
    }

    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CanonicalError> {
        self.validate()?;
        to_canonical_vec(self)
    }

    pub fn from_canonical_slice(bytes: &[u8]) -> Result<Self, CanonicalError> {
        let mut map = strict_object(bytes, Self::FIELDS)?;
        // The nested payload object is held to the same strictness
        let payload_value = map
            .remove("payload")
            .ok_or(CanonicalError::MissingField("payload"))?;
        strict_fields(payload_value.clone(), NamespacePayload::FIELDS)?;
        map.insert("payload".to_string(), payload_value);
        let na: Self = serde_json::from_value(Value::Object(map))?;
        na.validate()?;
        Ok(na)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ra() -> ResourceAttestation {
        ResourceAttestation {
            fragment_url: "https://ex.com/p/a/posts/1".to_string(),
            hash: format!("sha256:{}", "ab".repeat(32)),
            publisher_claim: "cd".repeat(32),
            namespace_attestation_url: "https://ex.com/p/a/_la_namespace.json".to_string(),
        }
    }

    fn sample_na() -> NamespaceAttestation {
        NamespaceAttestation {
            payload: NamespacePayload {
                namespace: "https://ex.com/p/a/".to_string(),
                exp: 1700000000,
            },
            key: "cd".repeat(32),
            sig: "ef".repeat(64),
        }
    }

    #[test]
    fn test_pinned_canonical_bytes() {
        // Byte-for-byte corpus; any drift here breaks cross-implementation
        // signature compatibility.
        let ra = ResourceAttestation {
            fragment_url: "https://ex.com/p/a/posts/1".to_string(),
            hash: format!("sha256:{}", "00".repeat(32)),
            publisher_claim: "11".repeat(32),
            namespace_attestation_url: "https://ex.com/p/a/_la_namespace.json".to_string(),
        };
        let expected = format!(
            "{{\"fragment_url\":\"https://ex.com/p/a/posts/1\",\"hash\":\"sha256:{}\",\"publisher_claim\":\"{}\",\"namespace_attestation_url\":\"https://ex.com/p/a/_la_namespace.json\"}}",
            "00".repeat(32),
            "11".repeat(32),
        );
        assert_eq!(ra.canonical_bytes().unwrap(), expected.as_bytes());

        let payload = NamespacePayload {
            namespace: "https://ex.com/p/a/".to_string(),
            exp: 1735689600,
        };
        assert_eq!(
            payload.canonical_bytes().unwrap(),
            br#"{"namespace":"https://ex.com/p/a/","exp":1735689600}"#
        );
    }

    #[test]
    fn test_no_html_entity_escaping() {
        // `<`, `>`, and `&` in a query travel as raw UTF-8 bytes
        let ra = ResourceAttestation {
            fragment_url: "https://ex.com/p/a/posts/1?q=<b>&lang=en".to_string(),
            ..sample_ra()
        };
        let bytes = ra.canonical_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("?q=<b>&lang=en"));
        assert!(!text.contains("\\u003c"));
        assert!(!text.contains("&amp;"));
    }

    #[test]
    fn test_negative_and_large_exp_survive_roundtrip() {
        for exp in [0i64, -1, i64::MAX, 1] {
            let payload = NamespacePayload {
                namespace: "https://ex.com/p/a/".to_string(),
                exp,
            };
            let bytes = payload.canonical_bytes().unwrap();
            let reparsed = NamespacePayload::from_canonical_slice(&bytes).unwrap();
            assert_eq!(reparsed.exp, exp);
        }
    }

    #[test]
    fn test_canonical_roundtrip_identity() {
        let ra = sample_ra();
        let bytes = ra.canonical_bytes().unwrap();
        let reparsed = ResourceAttestation::from_canonical_slice(&bytes).unwrap();
        assert_eq!(reparsed.canonical_bytes().unwrap(), bytes);

        let na = sample_na();
        let bytes = na.canonical_bytes().unwrap();
        let reparsed = NamespaceAttestation::from_canonical_slice(&bytes).unwrap();
        assert_eq!(reparsed.canonical_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_strict_parse_rejects_extra_fields() {
        let bytes = br#"{"fragment_url":"https://ex.com/1","hash":"sha256:00","publisher_claim":"00","namespace_attestation_url":"https://ex.com/na","etag":"x"}"#;
        assert!(matches!(
            ResourceAttestation::from_canonical_slice(bytes),
            Err(CanonicalError::UnknownField(_))
        ));
    }

    #[test]
    fn test_strict_parse_rejects_extra_payload_fields() {
        let bytes = br#"{"payload":{"namespace":"https://ex.com/p/a/","exp":1,"iat":0},"key":"00","sig":"00"}"#;
        assert!(matches!(
            NamespaceAttestation::from_canonical_slice(bytes),
            Err(CanonicalError::UnknownField(_))
        ));
    }

    #[test]
    fn test_validate_rejects_uppercase_hex() {
        let mut ra = sample_ra();
        ra.publisher_claim = ra.publisher_claim.to_ascii_uppercase();
        assert!(ra.validate().is_err());

        let mut na = sample_na();
        na.sig = na.sig.to_ascii_uppercase();
        assert!(na.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_hash_tag() {
        let mut ra = sample_ra();
        ra.hash = "ab".repeat(32);
        assert!(ra.validate().is_err());
        ra.hash = format!("sha512:{}", "ab".repeat(32));
        assert!(ra.validate().is_err());
    }

    #[test]
    fn test_network_decode_ignores_unknown_fields() {
        // The lenient serde path used on fetched artifacts tolerates
        // forward-compatible extras; only the canonical parse rejects them.
        let bytes = br#"{"payload":{"namespace":"https://ex.com/p/a/","exp":1},"key":"00","sig":"00","comment":"x"}"#;
        let na: NamespaceAttestation = serde_json::from_slice(bytes).unwrap();
        assert_eq!(na.payload.exp, 1);
    }

    #[test]
    fn test_non_integer_exp_rejected() {
        let bytes = br#"{"namespace":"https://ex.com/p/a/","exp":12.5}"#;
        assert!(NamespacePayload::from_canonical_slice(bytes).is_err());
    }
}
