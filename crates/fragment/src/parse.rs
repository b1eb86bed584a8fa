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
use lap_common::fragment::Fragment;
use lap_common::origin::canonicalize;
use std::ops::Range;
use tracing::debug;

const ARTICLE_OPEN: &[u8] = b"<article";
const ARTICLE_CLOSE: &[u8] = b"</article";
const FRAGMENT_URL_MARKER: &[u8] = b"data-la-fragment-url=\"";

/// Recovers a [Fragment] from an HTML document.
///
/// This is a byte-level extraction, not a DOM parse: the first
/// `data-la-fragment-url="` marker anchors the enclosing `<article>`, whose
/// matching close tag is found by depth-counting nested articles. Attribute
/// values are read byte-literally between `"` delimiters, and the
/// authoritative body is decoded from the standard-alphabet base64 payload
/// of the `<link>` element's data URL.
///
/// When `actual_url` is given, it wins over the embedded attribute as the
/// reported fragment URL; the carrier page owns the address the reader
/// actually visited, while the embedded attribute is only advisory for
/// locating the article.
///
/// # Errors
///
/// Every failure mode surfaces as [FragmentError::MalformedFragment]: a
/// missing marker or enclosing article, an article or attribute that never
/// closes, an undecodable payload, a missing required attribute, a spec
/// version other than `"v0.2"`, a relative URL, a malformed publisher
/// claim, or an empty canonical body.
pub fn parse_fragment(html: &[u8], actual_url: Option<&str>) -> Result<Fragment, FragmentError> {
    let marker = find(html, FRAGMENT_URL_MARKER)
        .ok_or_else(|| FragmentError::malformed("no data-la-fragment-url attribute"))?;
    let open = rfind(&html[..marker], ARTICLE_OPEN)
        .ok_or_else(|| FragmentError::malformed("no enclosing <article> tag"))?;
    let end = article_end(html, open)?;
    let article = &html[open..end];

    let spec = attribute(article, "data-la-spec")?;
    let embedded_url = attribute(article, "data-la-fragment-url")?;
    let publisher_claim = attribute(article, "data-la-publisher-claim")?;
    let resource_attestation_url = attribute(article, "data-la-resource-attestation-url")?;
    let namespace_attestation_url = attribute(article, "data-la-namespace-attestation-url")?;
    let payload = data_url_payload(article)?;

    let canonical_content = STANDARD
        .decode(payload)
        .map_err(|e| FragmentError::malformed(format!("undecodable base64 payload: {e}")))?;
    // The decoded body doubles as the (untrusted) preview text
    let preview_content = String::from_utf8_lossy(&canonical_content).into_owned();

    let reported_url = actual_url.unwrap_or(embedded_url);
    let fragment_url = canonicalize(reported_url)
        .map_err(|e| FragmentError::malformed(format!("bad fragment URL: {e}")))?;

    let fragment = Fragment {
        spec: spec.to_string(),
        fragment_url,
        publisher_claim: publisher_claim.to_string(),
        resource_attestation_url: resource_attestation_url.to_string(),
        namespace_attestation_url: namespace_attestation_url.to_string(),
        canonical_content,
        preview_content,
    };
    fragment
        .validate()
        .map_err(|e| FragmentError::malformed(e.to_string()))?;
    debug!(
        fragment_url = %fragment.fragment_url,
        content_length = fragment.canonical_content.len(),
        "parsed fragment"
    );
    Ok(fragment)
}

/// Finds the byte range of the `<article>` whose `data-la-fragment-url`
/// matches the given URL, for substitution inside a host document.
///
/// Comparison happens on canonical URL forms. Returns `None` when no article
/// in the document carries the URL.
pub fn find_article_span(
    html: &[u8],
    fragment_url: &str,
) -> Result<Option<Range<usize>>, FragmentError> {
    let target = canonicalize(fragment_url)
        .map_err(|e| FragmentError::malformed(format!("bad fragment URL: {e}")))?;
    let mut search_from = 0;
    while let Some(rel) = find(&html[search_from..], FRAGMENT_URL_MARKER) {
        let value_start = search_from + rel + FRAGMENT_URL_MARKER.len();
        let value_end = find(&html[value_start..], b"\"")
            .ok_or_else(|| FragmentError::malformed("unterminated data-la-fragment-url"))?
            + value_start;
        let value = std::str::from_utf8(&html[value_start..value_end])
            .map_err(|_| FragmentError::malformed("non-utf8 data-la-fragment-url"))?;
        if canonicalize(value).map(|v| v == target).unwrap_or(false) {
            let open = rfind(&html[..value_start], ARTICLE_OPEN)
                .ok_or_else(|| FragmentError::malformed("no enclosing <article> tag"))?;
            let end = article_end(html, open)?;
            return Ok(Some(open..end));
        }
        search_from = value_end + 1;
    }
    Ok(None)
}

/// Returns the end offset (exclusive) of the article opening at `open`,
/// counting nested `<article>`/`</article>` pairs.
fn article_end(html: &[u8], open: usize) -> Result<usize, FragmentError> {
    let mut depth = 0usize;
    let mut i = open;
    while i < html.len() {
        if html[i..].starts_with(ARTICLE_OPEN) {
            depth += 1;
            i += ARTICLE_OPEN.len();
        } else if html[i..].starts_with(ARTICLE_CLOSE) {
            depth = depth
                .checked_sub(1)
                .ok_or_else(|| FragmentError::malformed("unbalanced </article> tag"))?;
            let gt = find(&html[i..], b">")
                .ok_or_else(|| FragmentError::malformed("unterminated </article> tag"))?
                + i;
            if depth == 0 {
                return Ok(gt + 1);
            }
            i = gt + 1;
        } else {
            i += 1;
        }
    }
    Err(FragmentError::malformed("unclosed <article> tag"))
}

/// Reads the first `name="value"` pair in the article slice, byte-literally.
fn attribute<'a>(article: &'a [u8], name: &str) -> Result<&'a str, FragmentError> {
    let pattern = format!("{name}=\"");
    let start = find(article, pattern.as_bytes())
        .ok_or_else(|| FragmentError::malformed(format!("missing {name} attribute")))?
        + pattern.len();
    let end = find(&article[start..], b"\"")
        .ok_or_else(|| FragmentError::malformed(format!("unterminated {name} attribute")))?
        + start;
    std::str::from_utf8(&article[start..end])
        .map_err(|_| FragmentError::malformed(format!("non-utf8 {name} attribute")))
}

/// Extracts the base64 payload of the `href="data:text/html;base64,…"`
/// attribute carried by the article's `<link>` element.
fn data_url_payload(article: &[u8]) -> Result<&str, FragmentError> {
    let pattern = format!("href=\"{DATA_URL_PREFIX}");
    let start = find(article, pattern.as_bytes())
        .ok_or_else(|| FragmentError::malformed("missing canonical data URL"))?
        + pattern.len();
    let end = find(&article[start..], b"\"")
        .ok_or_else(|| FragmentError::malformed("unterminated href attribute"))?
        + start;
    std::str::from_utf8(&article[start..end])
        .map_err(|_| FragmentError::malformed("non-utf8 base64 payload"))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}
