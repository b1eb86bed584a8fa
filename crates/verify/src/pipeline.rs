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

use crate::result::{Check, PipelineRun, VerificationResult};
use crate::stages::{association, integrity, presence};
use lap_common::attestation::{NamespaceAttestation, ResourceAttestation};
use lap_common::fragment::Fragment;
use lap_fetch::AttestationSource;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Runs the pipeline over pre-fetched attestations.
///
/// Purely computational: no network, no suspension. The clock is sampled
/// once at entry and used both as `verified_at` and for the expiry check.
pub fn verify_fragment(
    fragment: &Fragment,
    ra: &ResourceAttestation,
    na: &NamespaceAttestation,
) -> VerificationResult {
    let now = unix_now();
    let mut run = PipelineRun::new();

    match presence::check_origins(fragment).and_then(|()| presence::admit(fragment, Ok(ra.clone())))
    {
        Ok(_) => run.pass(Check::ResourcePresence),
        Err(failure) => {
            run.fail(failure);
            return finish(run, fragment, now);
        }
    }

    if let Err(failure) = integrity::check(fragment, ra) {
        run.fail(failure);
        return finish(run, fragment, now);
    }
    run.pass(Check::ResourceIntegrity);

    match association::admit(fragment, Ok(na.clone()), now) {
        Ok(_) => run.pass(Check::PublisherAssociation),
        Err(failure) => run.fail(failure),
    }
    finish(run, fragment, now)
}

/// Runs the pipeline live, fetching the attestations as the stages need
/// them.
///
/// The three checks execute strictly in order: resource presence (origin
/// agreement, then the resource attestation fetch and field comparison),
/// resource integrity (content hash), and publisher association (the
/// namespace attestation fetch, expiry, coverage, and signature). The first
/// failure stops the run; later stages stay `"skip"` and no further fetch
/// is issued.
///
/// # Arguments
///
/// * `fragment` - An already-parsed fragment; parsing problems never reach
///   this function.
/// * `source` - Where attestations come from; the HTTP fetcher in
///   production, an in-memory source in tests.
///
/// # Returns
///
/// * `VerificationResult` - Always. Failures are reported in the result,
///   never raised, so a caller can serialize the outcome verbatim.
///
/// # Cancellation
///
/// The two awaits are the only suspension points; nothing external is
/// mutated across them, so dropping the future at either point is safe.
pub async fn verify_live<S: AttestationSource>(
    fragment: &Fragment,
    source: &S,
) -> VerificationResult {
    let now = unix_now();
    let mut run = PipelineRun::new();

    if let Err(failure) = presence::check_origins(fragment) {
        run.fail(failure);
        return finish(run, fragment, now);
    }
    let fetched = source
        .resource_attestation(&fragment.resource_attestation_url)
        .await;
    let ra = match presence::admit(fragment, fetched) {
        Ok(ra) => {
            run.pass(Check::ResourcePresence);
            ra
        }
        Err(failure) => {
            run.fail(failure);
            return finish(run, fragment, now);
        }
    };
    debug!(url = %fragment.resource_attestation_url, "resource presence passed");

    if let Err(failure) = integrity::check(fragment, &ra) {
        run.fail(failure);
        return finish(run, fragment, now);
    }
    run.pass(Check::ResourceIntegrity);

    let fetched = source
        .namespace_attestation(&fragment.namespace_attestation_url)
        .await;
    match association::admit(fragment, fetched, now) {
        Ok(_) => run.pass(Check::PublisherAssociation),
        Err(failure) => run.fail(failure),
    }
    finish(run, fragment, now)
}

fn finish(run: PipelineRun, fragment: &Fragment, now: i64) -> VerificationResult {
    let result = run.into_result(fragment, now);
    match &result.failure {
        None => info!(fragment_url = %fragment.fragment_url, "fragment verified"),
        Some(failure) => info!(
            fragment_url = %fragment.fragment_url,
            check = ?failure.check,
            reason = ?failure.reason,
            "fragment verification failed"
        ),
    }
    result
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
