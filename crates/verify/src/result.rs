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

use lap_common::fragment::Fragment;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one pipeline stage.
///
/// Stages start as `Skip` and only ever move to `Pass` or `Fail`; a failed
/// stage leaves everything after it skipped. Serialized as the lowercase
/// strings of the wire result.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pass,
    Fail,
    Skip,
}

/// The three ordered checks of the verification pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    ResourcePresence,
    ResourceIntegrity,
    PublisherAssociation,
}

/// Stable failure identifiers, one vocabulary per stage.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    FetchFailed,
    Malformed,
    FragmentUrlMismatch,
    PublisherClaimMismatch,
    NamespaceUrlMismatch,
    OriginMismatch,
    HashMismatch,
    Expired,
    UrlNotUnderNamespace,
    SignatureInvalid,
}

/// The exact description of why verification stopped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Which stage failed
    pub check: Check,
    /// The stable reason identifier
    pub reason: FailureReason,
    /// Human-readable summary; not part of the stable surface
    pub message: String,
    /// Enough structure to localize the failure (expected vs actual, etc.)
    pub details: Value,
}

impl Failure {
    pub fn new(
        check: Check,
        reason: FailureReason,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            check,
            reason,
            message: message.into(),
            details,
        }
    }
}

/// Where the verified artifacts were expected to live, and when the
/// verification ran.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationContext {
    pub resource_attestation_url: String,
    pub namespace_attestation_url: String,
    /// Unix seconds at pipeline start; also the clock used for expiry
    pub verified_at: i64,
}

/// The structured outcome of one verification.
///
/// Failures are reported here, never raised: the pipeline always returns a
/// result, with `failure` naming the first check that did not hold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    pub resource_presence: StageStatus,
    pub resource_integrity: StageStatus,
    pub publisher_association: StageStatus,
    pub failure: Option<Failure>,
    pub context: VerificationContext,
}

/// Mutable pipeline bookkeeping, collapsed into a [VerificationResult] once
/// the run terminates.
#[derive(Debug)]
pub(crate) struct PipelineRun {
    presence: StageStatus,
    integrity: StageStatus,
    association: StageStatus,
    failure: Option<Failure>,
}

impl PipelineRun {
    pub(crate) fn new() -> Self {
        Self {
            presence: StageStatus::Skip,
            integrity: StageStatus::Skip,
            association: StageStatus::Skip,
            failure: None,
        }
    }

    pub(crate) fn pass(&mut self, check: Check) {
        *self.slot(check) = StageStatus::Pass;
    }

    pub(crate) fn fail(&mut self, failure: Failure) {
        *self.slot(failure.check) = StageStatus::Fail;
        self.failure = Some(failure);
    }

    pub(crate) fn into_result(self, fragment: &Fragment, verified_at: i64) -> VerificationResult {
        let verified = self.presence == StageStatus::Pass
            && self.integrity == StageStatus::Pass
            && self.association == StageStatus::Pass;
        VerificationResult {
            verified,
            resource_presence: self.presence,
            resource_integrity: self.integrity,
            publisher_association: self.association,
            failure: self.failure,
            context: VerificationContext {
                resource_attestation_url: fragment.resource_attestation_url.clone(),
                namespace_attestation_url: fragment.namespace_attestation_url.clone(),
                verified_at,
            },
        }
    }

    fn slot(&mut self, check: Check) -> &mut StageStatus {
        match check {
            Check::ResourcePresence => &mut self.presence,
            Check::ResourceIntegrity => &mut self.integrity,
            Check::PublisherAssociation => &mut self.association,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_fragment() -> Fragment {
        Fragment {
            spec: "v0.2".to_string(),
            fragment_url: "https://ex.com/p/a/posts/1".to_string(),
            publisher_claim: "ab".repeat(32),
            resource_attestation_url: "https://ex.com/p/a/posts/1/_la_resource.json".to_string(),
            namespace_attestation_url: "https://ex.com/p/a/_la_namespace.json".to_string(),
            canonical_content: b"<p>hi</p>".to_vec(),
            preview_content: "<p>hi</p>".to_string(),
        }
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(serde_json::to_value(StageStatus::Pass).unwrap(), "pass");
        assert_eq!(serde_json::to_value(StageStatus::Fail).unwrap(), "fail");
        assert_eq!(serde_json::to_value(StageStatus::Skip).unwrap(), "skip");
    }

    #[test]
    fn test_reason_identifiers() {
        assert_eq!(
            serde_json::to_value(FailureReason::FetchFailed).unwrap(),
            "fetch_failed"
        );
        assert_eq!(
            serde_json::to_value(FailureReason::UrlNotUnderNamespace).unwrap(),
            "url_not_under_namespace"
        );
        assert_eq!(
            serde_json::to_value(Check::PublisherAssociation).unwrap(),
            "publisher_association"
        );
    }

    #[test]
    fn test_result_wire_shape() {
        let mut run = PipelineRun::new();
        run.pass(Check::ResourcePresence);
        run.fail(Failure::new(
            Check::ResourceIntegrity,
            FailureReason::HashMismatch,
            "content hash does not match the attestation",
            json!({"expected": "sha256:00", "actual": "sha256:11", "content_length": 9}),
        ));
        let result = run.into_result(&sample_fragment(), 1700000000);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["verified"], json!(false));
        assert_eq!(value["resource_presence"], json!("pass"));
        assert_eq!(value["resource_integrity"], json!("fail"));
        assert_eq!(value["publisher_association"], json!("skip"));
        assert_eq!(value["failure"]["check"], json!("resource_integrity"));
        assert_eq!(value["failure"]["reason"], json!("hash_mismatch"));
        assert_eq!(value["context"]["verified_at"], json!(1700000000));
    }

    #[test]
    fn test_success_requires_all_three_passes() {
        let mut run = PipelineRun::new();
        run.pass(Check::ResourcePresence);
        run.pass(Check::ResourceIntegrity);
        let result = run.into_result(&sample_fragment(), 0);
        assert!(!result.verified);

        let mut run = PipelineRun::new();
        run.pass(Check::ResourcePresence);
        run.pass(Check::ResourceIntegrity);
        run.pass(Check::PublisherAssociation);
        let result = run.into_result(&sample_fragment(), 0);
        assert!(result.verified);
        assert!(result.failure.is_none());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["failure"], json!(null));
    }
}
