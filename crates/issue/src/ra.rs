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
use lap_common::attestation::ResourceAttestation;
use lap_common::crypto::content_hash;
use lap_common::origin::canonicalize;

/// Creates the unsigned resource attestation for a canonical body.
///
/// The hash commits to exactly the bytes passed here; URLs are stored in
/// canonical form so verification-time equality checks are byte equality.
pub fn create_resource_attestation(
    body: &[u8],
    fragment_url: &str,
    publisher_claim: &str,
    namespace_attestation_url: &str,
) -> Result<ResourceAttestation, IssueError> {
    let ra = ResourceAttestation {
        fragment_url: canonicalize(fragment_url)?,
        hash: content_hash(body),
        publisher_claim: publisher_claim.to_string(),
        namespace_attestation_url: canonicalize(namespace_attestation_url)?,
    };
    ra.validate()?;
    Ok(ra)
}

/// Like [create_resource_attestation], returning the canonical JSON bytes
/// to serve verbatim.
pub fn create_resource_attestation_bytes(
    body: &[u8],
    fragment_url: &str,
    publisher_claim: &str,
    namespace_attestation_url: &str,
) -> Result<Vec<u8>, IssueError> {
    let ra = create_resource_attestation(
        body,
        fragment_url,
        publisher_claim,
        namespace_attestation_url,
    )?;
    Ok(ra.canonical_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lap_common::crypto::SigningKey;

    #[test]
    fn test_create_resource_attestation() {
        let key = SigningKey::generate();
        let ra = create_resource_attestation(
            b"<p>hi</p>",
            "https://ex.com/p/a/posts/1",
            &key.public_key_hex(),
            "https://ex.com/p/a/_la_namespace.json",
        )
        .unwrap();
        assert_eq!(ra.hash, content_hash(b"<p>hi</p>"));
        assert_eq!(ra.fragment_url, "https://ex.com/p/a/posts/1");
        assert!(ra.validate().is_ok());
    }

    #[test]
    fn test_urls_canonicalized() {
        let key = SigningKey::generate();
        let ra = create_resource_attestation(
            b"<p>hi</p>",
            "HTTPS://Ex.com:443/p/a/posts/1",
            &key.public_key_hex(),
            "https://ex.com/p/a/_la_namespace.json",
        )
        .unwrap();
        assert_eq!(ra.fragment_url, "https://ex.com/p/a/posts/1");
    }

    #[test]
    fn test_bad_claim_rejected() {
        let result = create_resource_attestation(
            b"<p>hi</p>",
            "https://ex.com/p/a/posts/1",
            "not-a-key",
            "https://ex.com/p/a/_la_namespace.json",
        );
        assert!(matches!(result, Err(IssueError::MalformedInput(_))));
    }

    #[test]
    fn test_relative_url_rejected() {
        let key = SigningKey::generate();
        let result = create_resource_attestation(
            b"<p>hi</p>",
            "/p/a/posts/1",
            &key.public_key_hex(),
            "https://ex.com/p/a/_la_namespace.json",
        );
        assert!(matches!(result, Err(IssueError::InvalidUrl(_))));
    }

    #[test]
    fn test_canonical_bytes_shape() {
        let key = SigningKey::generate();
        let bytes = create_resource_attestation_bytes(
            b"<p>hi</p>",
            "https://ex.com/p/a/posts/1",
            &key.public_key_hex(),
            "https://ex.com/p/a/_la_namespace.json",
        )
        .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("{\"fragment_url\":\"https://ex.com/p/a/posts/1\",\"hash\":\"sha256:"));
        assert!(text.ends_with("\"namespace_attestation_url\":\"https://ex.com/p/a/_la_namespace.json\"}"));
    }
}
