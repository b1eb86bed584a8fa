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
use lap_common::attestation::ResourceAttestation;
use lap_common::fragment::Fragment;
use lap_common::origin::Origin;
use lap_fetch::FetchError;
use serde_json::json;

const CHECK: Check = Check::ResourcePresence;

/// The pre-fetch half of resource presence: both attestation URLs must be
/// same-origin with the fragment URL.
///
/// Running this before the fetch means a cross-origin attestation URL is
/// never dereferenced and always surfaces as `origin_mismatch`, regardless
/// of what the foreign host would have answered.
pub fn check_origins(fragment: &Fragment) -> Result<(), Failure> {
    let fragment_origin = origin_of(&fragment.fragment_url)?;
    for (name, url) in [
        (
            "resource_attestation_url",
            &fragment.resource_attestation_url,
        ),
        (
            "namespace_attestation_url",
            &fragment.namespace_attestation_url,
        ),
    ] {
        let attestation_origin = origin_of(url)?;
        if attestation_origin != fragment_origin {
            return Err(Failure::new(
                CHECK,
                FailureReason::OriginMismatch,
                format!("{name} is not same-origin with the fragment URL"),
                json!({
                    "url": url,
                    "url_origin": attestation_origin.to_string(),
                    "fragment_origin": fragment_origin.to_string(),
                }),
            ));
        }
    }
    Ok(())
}

/// The post-fetch half of resource presence: the attestation decoded, its
/// fields are well-formed, and it agrees with the fragment.
pub fn admit(
    fragment: &Fragment,
    fetched: Result<ResourceAttestation, FetchError>,
) -> Result<ResourceAttestation, Failure> {
    let ra = fetched
        .map_err(|e| fetch_failure(CHECK, &fragment.resource_attestation_url, &e))?;
    ra.validate().map_err(|e| {
        Failure::new(
            CHECK,
            FailureReason::Malformed,
            "resource attestation carries malformed fields",
            json!({ "error": e.to_string() }),
        )
    })?;
    if ra.fragment_url != fragment.fragment_url {
        return Err(Failure::new(
            CHECK,
            FailureReason::FragmentUrlMismatch,
            "resource attestation names a different fragment URL",
            json!({ "expected": fragment.fragment_url, "actual": ra.fragment_url }),
        ));
    }
    if ra.publisher_claim != fragment.publisher_claim {
        return Err(Failure::new(
            CHECK,
            FailureReason::PublisherClaimMismatch,
            "resource attestation names a different publisher",
            json!({ "expected": fragment.publisher_claim, "actual": ra.publisher_claim }),
        ));
    }
    if ra.namespace_attestation_url != fragment.namespace_attestation_url {
        return Err(Failure::new(
            CHECK,
            FailureReason::NamespaceUrlMismatch,
            "resource attestation points at a different namespace attestation",
            json!({
                "expected": fragment.namespace_attestation_url,
                "actual": ra.namespace_attestation_url,
            }),
        ));
    }
    Ok(ra)
}

fn origin_of(url: &str) -> Result<Origin, Failure> {
    Origin::of(url).map_err(|e| {
        Failure::new(
            CHECK,
            FailureReason::OriginMismatch,
            "URL has no usable origin",
            json!({ "url": url, "error": e.to_string() }),
        )
    })
}
