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

use crate::crypto::is_lower_hex;
use crate::origin::is_absolute;
use serde::Serialize;
use serde_json::{Map, Value};

/// Prefix of the tagged content hash in a resource attestation.
pub const HASH_PREFIX: &str = "sha256:";

#[derive(Debug, thiserror::Error)]
pub enum CanonicalError {
    #[error("MalformedPayload error: field {field} {reason}")]
    MalformedPayload { field: &'static str, reason: String },

    #[error("UnknownField error: {0}")]
    UnknownField(String),

    #[error("MissingField error: {0}")]
    MissingField(&'static str),

    #[error("JsonError error: {0:?}")]
    JsonError(#[from] serde_json::Error),
}

/// Serializes a payload to its canonical byte representation.
///
/// Canonical form is compact JSON in declared field order with standard
/// string escaping and no HTML entity escaping, which is exactly what
/// `serde_json` emits for a struct. Callers validate field constraints
/// before invoking this.
pub fn to_canonical_vec<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    Ok(serde_json::to_vec(value)?)
}

/// Parses a canonical JSON object, rejecting anything but the expected keys.
///
/// The canonical parse is strict where the network decode is lenient: an
/// object carrying a field outside `fields`, or missing one of them, is
/// rejected rather than ignored.
pub fn strict_object(bytes: &[u8], fields: &[&'static str]) -> Result<Map<String, Value>, CanonicalError> {
    let value: Value = serde_json::from_slice(bytes)?;
    strict_fields(value, fields)
}

/// Checks an already-decoded JSON value against an exact field set.
pub fn strict_fields(value: Value, fields: &[&'static str]) -> Result<Map<String, Value>, CanonicalError> {
    let Value::Object(map) = value else {
        return Err(CanonicalError::MalformedPayload {
            field: "<root>",
            reason: "expected a JSON object".to_string(),
        });
    };
    for key in map.keys() {
        if !fields.contains(&key.as_str()) {
            return Err(CanonicalError::UnknownField(key.clone()));
        }
    }
    for field in fields {
        if !map.contains_key(*field) {
            return Err(CanonicalError::MissingField(field));
        }
    }
    Ok(map)
}

/// Requires a field to hold an absolute URL.
pub fn require_absolute_url(field: &'static str, value: &str) -> Result<(), CanonicalError> {
    if !is_absolute(value) {
        return Err(CanonicalError::MalformedPayload {
            field,
            reason: format!("expected an absolute URL, got {value:?}"),
        });
    }
    Ok(())
}

/// Requires a field to hold exactly `len` lowercase hex characters.
pub fn require_lower_hex(field: &'static str, value: &str, len: usize) -> Result<(), CanonicalError> {
    if !is_lower_hex(value, len) {
        return Err(CanonicalError::MalformedPayload {
            field,
            reason: format!("expected {len} lowercase hex chars"),
        });
    }
    Ok(())
}

/// Requires a field to hold a tagged content hash, `"sha256:" + 64 hex`.
pub fn require_content_hash(field: &'static str, value: &str) -> Result<(), CanonicalError> {
    let Some(digest) = value.strip_prefix(HASH_PREFIX) else {
        return Err(CanonicalError::MalformedPayload {
            field,
            reason: format!("expected a {HASH_PREFIX} prefix"),
        });
    };
    require_lower_hex(field, digest, 64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_object_rejects_unknown_fields() {
        let bytes = br#"{"a":1,"b":2,"c":3}"#;
        assert!(strict_object(bytes, &["a", "b"]).is_err());
        assert!(strict_object(bytes, &["a", "b", "c"]).is_ok());
    }

    #[test]
    fn test_strict_object_rejects_missing_fields() {
        let bytes = br#"{"a":1}"#;
        assert!(matches!(
            strict_object(bytes, &["a", "b"]),
            Err(CanonicalError::MissingField("b"))
        ));
    }

    #[test]
    fn test_strict_object_rejects_non_objects() {
        assert!(strict_object(br#"[1,2]"#, &[]).is_err());
        assert!(strict_object(br#""text""#, &[]).is_err());
    }

    #[test]
    fn test_field_validators() {
        assert!(require_absolute_url("u", "https://ex.com/a").is_ok());
        assert!(require_absolute_url("u", "/relative").is_err());
        assert!(require_lower_hex("h", &"ab".repeat(32), 64).is_ok());
        assert!(require_lower_hex("h", &"AB".repeat(32), 64).is_err());
        assert!(require_content_hash("hash", &format!("sha256:{}", "ab".repeat(32))).is_ok());
        assert!(require_content_hash("hash", &"ab".repeat(32)).is_err());
    }
}
