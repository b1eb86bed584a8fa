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

pub mod encode;
pub mod parse;

pub use encode::{encode_fragment, FragmentUrls};
pub use parse::{find_article_span, parse_fragment};

/// Marker prefix of the data URL carrying the authoritative body bytes.
pub const DATA_URL_PREFIX: &str = "data:text/html;base64,";

#[derive(Debug, thiserror::Error)]
pub enum FragmentError {
    #[error("MalformedFragment error: {0}")]
    MalformedFragment(String),

    #[error("MalformedInput error: {0:?}")]
    MalformedInput(#[from] CanonicalError),
}

impl FragmentError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFragment(reason.into())
    }
}
