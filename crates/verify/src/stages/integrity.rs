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

use crate::result::{Check, Failure, FailureReason};
use lap_common::attestation::ResourceAttestation;
use lap_common::crypto::content_hash;
use lap_common::fragment::Fragment;
use serde_json::json;

/// Resource integrity: the canonical body hashes to what the resource
/// attestation committed to.
pub fn check(fragment: &Fragment, ra: &ResourceAttestation) -> Result<(), Failure> {
    let actual = content_hash(&fragment.canonical_content);
    if actual == ra.hash {
        return Ok(());
    }
    Err(Failure::new(
        Check::ResourceIntegrity,
        FailureReason::HashMismatch,
        "canonical content does not hash to the attested value",
        json!({
            "expected": ra.hash,
            "actual": actual,
            "content_length": fragment.canonical_content.len(),
        }),
    ))
}
