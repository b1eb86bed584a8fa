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
use lap_fetch::FetchError;
use serde_json::json;

pub mod association;
pub mod integrity;
pub mod presence;

/// Maps a delivery failure onto a stage's failure vocabulary: an artifact
/// that arrived but would not decode is `malformed`, everything else is
/// `fetch_failed` with the status code in the details when there was one.
pub(crate) fn fetch_failure(check: Check, url: &str, error: &FetchError) -> Failure {
    if error.is_malformed() {
        return Failure::new(
            check,
            FailureReason::Malformed,
            "attestation body is not a well-formed artifact",
            json!({ "url": url, "error": error.to_string() }),
        );
    }
    Failure::new(
        check,
        FailureReason::FetchFailed,
        "attestation could not be fetched",
        json!({ "url": url, "status": error.status(), "error": error.to_string() }),
    )
}
