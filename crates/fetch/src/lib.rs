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

use async_trait::async_trait;
use lap_common::attestation::{NamespaceAttestation, ResourceAttestation};
use lap_common::origin::Origin;
use reqwest::redirect::{Action, Attempt, Policy};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-fetch timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default ceiling on same-origin redirect hops.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

#[derive(clap::Args, Clone, Debug)]
pub struct FetchArgs {
    /// Seconds to wait for each attestation fetch
    #[clap(long, env, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub attestation_timeout_secs: u64,
    /// Maximum number of same-origin redirects to follow
    #[clap(long, env, default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub max_redirects: usize,
}

impl Default for FetchArgs {
    fn default() -> Self {
        Self {
            attestation_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("StatusError error: {url} answered {status}")]
    Status { url: String, status: u16 },

    #[error("TransportError error: {url} {message}")]
    Transport { url: String, message: String },

    #[error("MalformedBody error: {url} {message}")]
    Malformed { url: String, message: String },

    #[error("ClientError error: {0:?}")]
    Client(reqwest::Error),
}

impl FetchError {
    /// True when the artifact arrived but could not be decoded; everything
    /// else is a delivery failure.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// The HTTP status code, when the failure was a status rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Where verification obtains attestations from.
///
/// The live implementation is [AttestationFetcher]; tests substitute
/// [StaticSource] to run the pipeline against pre-fetched artifacts.
#[async_trait]
pub trait AttestationSource {
    async fn resource_attestation(&self, url: &str) -> Result<ResourceAttestation, FetchError>;
    async fn namespace_attestation(&self, url: &str) -> Result<NamespaceAttestation, FetchError>;
}

/// HTTP attestation retrieval with the protocol's delivery guards.
///
/// Redirects are followed only to the same origin as the previous hop and
/// only up to the configured cap; both rules live in the client's redirect
/// policy rather than in calling code. Only status 200 is accepted. Unknown
/// JSON fields in a fetched artifact are ignored for forward compatibility.
pub struct AttestationFetcher {
    client: reqwest::Client,
}

impl AttestationFetcher {
    /// Builds a fetcher with a dedicated HTTP client.
    pub fn new(args: &FetchArgs) -> Result<Self, FetchError> {
        let max_redirects = args.max_redirects;
        let client = reqwest::Client::builder()
            .redirect(Policy::custom(move |attempt| {
                same_origin_redirects(attempt, max_redirects)
            }))
            .timeout(Duration::from_secs(args.attestation_timeout_secs))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        debug!(url, "fetching attestation");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        let status = response.status();
        if status != StatusCode::OK {
            warn!(url, status = status.as_u16(), "attestation fetch rejected");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, e))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl AttestationSource for AttestationFetcher {
    async fn resource_attestation(&self, url: &str) -> Result<ResourceAttestation, FetchError> {
        self.fetch_json(url).await
    }

    async fn namespace_attestation(&self, url: &str) -> Result<NamespaceAttestation, FetchError> {
        self.fetch_json(url).await
    }
}

/// The redirect policy installed on every fetcher client.
///
/// A hop to a different origin than the previous hop is fatal, as is
/// exceeding the redirect cap. Enforcing this inside the client means no
/// caller can forget it.
fn same_origin_redirects(attempt: Attempt, max_redirects: usize) -> Action {
    if attempt.previous().len() > max_redirects {
        return attempt.error("too many redirects");
    }
    let Some(previous) = attempt.previous().last().cloned() else {
        return attempt.follow();
    };
    if hop_allowed(previous.as_str(), attempt.url().as_str()) {
        attempt.follow()
    } else {
        attempt.error("cross-origin redirect")
    }
}

/// Decides whether one redirect hop is acceptable: the next location must
/// share the previous hop's origin. A location whose origin cannot be
/// derived is never followed.
fn hop_allowed(previous: &str, next: &str) -> bool {
    match (Origin::of(previous), Origin::of(next)) {
        (Ok(from), Ok(to)) => from == to,
        _ => false,
    }
}

fn transport_error(url: &str, error: reqwest::Error) -> FetchError {
    let message = if error.is_timeout() {
        "timed out".to_string()
    } else {
        error.to_string()
    };
    warn!(url, %message, "attestation fetch failed");
    FetchError::Transport {
        url: url.to_string(),
        message,
    }
}

/// An in-memory attestation source.
///
/// Serving an artifact means inserting it under its URL; removing it models
/// a publisher dissociating by ceasing to serve, and lookups of absent URLs
/// answer 404.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    resources: HashMap<String, ResourceAttestation>,
    namespaces: HashMap<String, NamespaceAttestation>,
}

impl StaticSource {
    pub fn serve_resource(&mut self, url: impl Into<String>, ra: ResourceAttestation) {
        self.resources.insert(url.into(), ra);
    }

    pub fn serve_namespace(&mut self, url: impl Into<String>, na: NamespaceAttestation) {
        self.namespaces.insert(url.into(), na);
    }

    pub fn withdraw_resource(&mut self, url: &str) {
        self.resources.remove(url);
    }

    pub fn withdraw_namespace(&mut self, url: &str) {
        self.namespaces.remove(url);
    }
}

#[async_trait]
impl AttestationSource for StaticSource {
    async fn resource_attestation(&self, url: &str) -> Result<ResourceAttestation, FetchError> {
        self.resources
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }

    async fn namespace_attestation(&self, url: &str) -> Result<NamespaceAttestation, FetchError> {
        self.namespaces
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}
