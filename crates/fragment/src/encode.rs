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

use crate::{FragmentError, DATA_URL_PREFIX};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lap_common::canonical::{require_lower_hex, CanonicalError};
use lap_common::crypto::PUBKEY_HEX_LEN;
use lap_common::origin::canonicalize;
use lap_common::SPEC_VERSION;
use std::fmt::Write;

/// The three URLs stamped into an encoded fragment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FragmentUrls {
    /// Where the fragment asserts its content lives
    pub fragment_url: String,
    /// Where the resource attestation is served
    pub resource_attestation_url: String,
    /// Where the namespace attestation is served
    pub namespace_attestation_url: String,
}

/// Builds the self-contained HTML article carrying a canonical body.
///
/// The `<section class="la-preview">` holds a display copy of the body
/// indented by two spaces; the authoritative bytes travel in the hidden
/// `<link>` element as a standard-alphabet, padded base64 data URL. URLs are
/// canonicalized before emission.
pub fn encode_fragment(
    body: &[u8],
    urls: &FragmentUrls,
    publisher_claim: &str,
) -> Result<Vec<u8>, FragmentError> {
    if body.is_empty() {
        return Err(FragmentError::malformed("refusing to encode an empty body"));
    }
    require_lower_hex("publisher_claim", publisher_claim, PUBKEY_HEX_LEN)
        .map_err(FragmentError::MalformedInput)?;
    let fragment_url = canonical_attribute("fragment_url", &urls.fragment_url)?;
    let resource_attestation_url =
        canonical_attribute("resource_attestation_url", &urls.resource_attestation_url)?;
    let namespace_attestation_url =
        canonical_attribute("namespace_attestation_url", &urls.namespace_attestation_url)?;

    let preview = indent_body(body);
    let payload = STANDARD.encode(body);

    let mut html = String::new();
    let _ = writeln!(
        html,
        "<article data-la-spec=\"{SPEC_VERSION}\" data-la-fragment-url=\"{fragment_url}\">"
    );
    let _ = writeln!(html, "  <section class=\"la-preview\">");
    let _ = writeln!(html, "{preview}");
    let _ = writeln!(html, "  </section>");
    let _ = writeln!(html, "  <link rel=\"canonical\" type=\"text/html\"");
    let _ = writeln!(html, "        data-la-publisher-claim=\"{publisher_claim}\"");
    let _ = writeln!(
        html,
        "        data-la-resource-attestation-url=\"{resource_attestation_url}\""
    );
    let _ = writeln!(
        html,
        "        data-la-namespace-attestation-url=\"{namespace_attestation_url}\""
    );
    let _ = writeln!(html, "        href=\"{DATA_URL_PREFIX}{payload}\" hidden />");
    let _ = writeln!(html, "</article>");
    Ok(html.into_bytes())
}

/// Canonicalizes a URL destined for a `name="value"` attribute slot.
///
/// Attribute parsing on the read side is byte-literal with a `"` delimiter,
/// so a quote inside the value cannot be represented.
fn canonical_attribute(field: &'static str, url: &str) -> Result<String, FragmentError> {
    let canonical = canonicalize(url).map_err(|e| {
        FragmentError::MalformedInput(CanonicalError::MalformedPayload {
            field,
            reason: e.to_string(),
        })
    })?;
    if canonical.contains('"') {
        return Err(FragmentError::MalformedInput(
            CanonicalError::MalformedPayload {
                field,
                reason: "URL contains a double quote".to_string(),
            },
        ));
    }
    Ok(canonical)
}

/// Returns the display copy of the body, every line indented by two spaces.
fn indent_body(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
