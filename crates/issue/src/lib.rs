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

use lap_common::canonical::CanonicalError;
use lap_common::origin::UrlError;
use lap_fragment::FragmentError;
use std::path::PathBuf;

pub mod na;
pub mod ra;
pub mod set;

pub use na::{create_namespace_attestation, create_namespace_attestation_bytes};
pub use ra::{create_resource_attestation, create_resource_attestation_bytes};
pub use set::{create_fragment_file, refresh_publisher_set, PostInput, PublisherSet, RefreshSummary};

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("InvalidNamespace error: {0}")]
    InvalidNamespace(String),

    #[error("InvalidUrl error: {0:?}")]
    InvalidUrl(#[from] UrlError),

    #[error("MalformedInput error: {0:?}")]
    MalformedInput(#[from] CanonicalError),

    #[error("FragmentError error: {0:?}")]
    Fragment(#[from] FragmentError),

    #[error("IoError error: {path:?} {source:?}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl IssueError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
