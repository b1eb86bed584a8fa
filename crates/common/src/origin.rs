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

use std::fmt::{Display, Formatter};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error("ParseError error: {url} {source:?}")]
    ParseError {
        url: String,
        source: url::ParseError,
    },

    #[error("NoHost error: {0}")]
    NoHost(String),
}

/// Returns the canonical form of an absolute URL.
///
/// Canonicalization lowercases the scheme and host, strips the default port
/// (`:80` for http, `:443` for https), removes dot-segments from the path,
/// preserves the path and query otherwise, and drops the URL fragment.
///
/// # Errors
///
/// Returns a [UrlError::ParseError] if the input is relative or unparseable.
pub fn canonicalize(input: &str) -> Result<String, UrlError> {
    let mut url = parse_absolute(input)?;
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Returns true if the input parses as an absolute URL.
pub fn is_absolute(input: &str) -> bool {
    Url::parse(input).is_ok()
}

/// The scheme/host/port triple used for all same-origin decisions.
///
/// The host is folded to lowercase and default ports are stripped at
/// construction, so `http://HOST:80/x` and `http://host/y` compare equal.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Origin {
    /// Lowercase URL scheme
    pub scheme: String,
    /// Lowercase host name
    pub host: String,
    /// Port, if not the scheme default
    pub port: Option<u16>,
}

impl Origin {
    /// Derives the origin of an absolute URL.
    pub fn of(input: &str) -> Result<Self, UrlError> {
        let url = parse_absolute(input)?;
        let host = url
            .host_str()
            .ok_or_else(|| UrlError::NoHost(input.to_string()))?
            .to_ascii_lowercase();
        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            // Url::port() already reports None for scheme-default ports
            port: url.port(),
        })
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}://{}:{port}", self.scheme, self.host),
            None => write!(f, "{}://{}", self.scheme, self.host),
        }
    }
}

/// Compares the origins of two absolute URLs.
pub fn same_origin(a: &str, b: &str) -> Result<bool, UrlError> {
    Ok(Origin::of(a)? == Origin::of(b)?)
}

/// Decides whether a fragment URL is covered by a namespace URL.
///
/// The rule accepts exact equality, prefix coverage under a `/`-terminated
/// namespace, prefix coverage after appending `/` to a bare namespace, and
/// equality after trimming trailing slashes on both sides.
pub fn url_within_namespace(fragment_url: &str, namespace: &str) -> bool {
    if fragment_url == namespace {
        return true;
    }
    if namespace.ends_with('/') && fragment_url.starts_with(namespace) {
        return true;
    }
    if fragment_url.starts_with(&format!("{namespace}/")) {
        return true;
    }
    fragment_url.trim_end_matches('/') == namespace.trim_end_matches('/')
}

fn parse_absolute(input: &str) -> Result<Url, UrlError> {
    Url::parse(input).map_err(|source| UrlError::ParseError {
        url: input.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize() {
        assert_eq!(
            canonicalize("HTTP://Example.COM:80/a/../b?q=1#frag").unwrap(),
            "http://example.com/b?q=1"
        );
        assert_eq!(
            canonicalize("https://ex.com:443/p/a/").unwrap(),
            "https://ex.com/p/a/"
        );
        // Non-default ports survive
        assert_eq!(
            canonicalize("http://ex.com:8080/x").unwrap(),
            "http://ex.com:8080/x"
        );
        assert!(canonicalize("/relative/path").is_err());
    }

    #[test]
    fn test_origin_default_port_stripping() {
        assert!(same_origin("http://host:80/", "http://host/").unwrap());
        assert!(same_origin("https://host:443/a", "https://HOST/b").unwrap());
        assert!(!same_origin("http://host:8080/", "http://host/").unwrap());
        assert!(!same_origin("http://host/", "https://host/").unwrap());
        assert!(!same_origin("https://ex.com/", "https://evil.com/").unwrap());
    }

    #[test]
    fn test_origin_display() {
        assert_eq!(Origin::of("http://Ex.com/a").unwrap().to_string(), "http://ex.com");
        assert_eq!(
            Origin::of("http://ex.com:8080/a").unwrap().to_string(),
            "http://ex.com:8080"
        );
    }

    #[test]
    fn test_url_within_namespace() {
        let ns = "https://ex.com/p/a/";
        assert!(url_within_namespace("https://ex.com/p/a/", ns));
        assert!(url_within_namespace("https://ex.com/p/a", ns));
        assert!(url_within_namespace("https://ex.com/p/a/posts/1", ns));
        assert!(!url_within_namespace("https://ex.com/p/bob/posts/1", ns));
        // Bare namespace covers its own subtree
        let bare = "https://ex.com/p/a";
        assert!(url_within_namespace("https://ex.com/p/a", bare));
        assert!(url_within_namespace("https://ex.com/p/a/", bare));
        assert!(url_within_namespace("https://ex.com/p/a/posts/1", bare));
        // Sibling path sharing a string prefix is not covered
        assert!(!url_within_namespace("https://ex.com/p/ab", bare));
    }
}
