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

use crate::na::create_namespace_attestation_bytes;
use crate::ra::create_resource_attestation_bytes;
use crate::IssueError;
use anyhow::Context;
use lap_common::crypto::SigningKey;
use lap_fragment::{encode_fragment, find_article_span, FragmentUrls};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default file name of a post's resource attestation.
pub const RESOURCE_FILE_NAME: &str = "_la_resource.json";
/// Default file name of a publisher's namespace attestation.
pub const NAMESPACE_FILE_NAME: &str = "_la_namespace.json";
/// Default file name of a post's encoded fragment.
pub const FRAGMENT_FILE_NAME: &str = "index.htmx";

/// One post inside a publisher set.
#[derive(Clone, Debug)]
pub struct PostInput {
    /// Canonical URL the post's content lives at
    pub fragment_url: String,
    /// Where the post's resource attestation is served
    pub resource_attestation_url: String,
    /// Directory receiving the regenerated RA and fragment
    pub dir: PathBuf,
    /// The canonical body bytes
    pub body: Vec<u8>,
}

/// A publisher's directory of posts, plus where its artifacts live.
#[derive(Clone, Debug)]
pub struct PublisherSet {
    /// Directory receiving the namespace attestation
    pub publisher_dir: PathBuf,
    /// Canonical namespace URL, ending in `/`
    pub namespace: String,
    /// Where the namespace attestation is served
    pub namespace_attestation_url: String,
    /// Host HTML document with embedded articles to substitute, if any
    pub host_document: Option<PathBuf>,
    pub posts: Vec<PostInput>,
    pub resource_file_name: String,
    pub namespace_file_name: String,
    pub fragment_file_name: String,
}

impl PublisherSet {
    pub fn new(
        publisher_dir: impl Into<PathBuf>,
        namespace: impl Into<String>,
        namespace_attestation_url: impl Into<String>,
    ) -> Self {
        Self {
            publisher_dir: publisher_dir.into(),
            namespace: namespace.into(),
            namespace_attestation_url: namespace_attestation_url.into(),
            host_document: None,
            posts: Vec::new(),
            resource_file_name: RESOURCE_FILE_NAME.to_string(),
            namespace_file_name: NAMESPACE_FILE_NAME.to_string(),
            fragment_file_name: FRAGMENT_FILE_NAME.to_string(),
        }
    }

    pub fn with_post(mut self, post: PostInput) -> Self {
        self.posts.push(post);
        self
    }

    pub fn with_host_document(mut self, path: impl Into<PathBuf>) -> Self {
        self.host_document = Some(path.into());
        self
    }
}

/// What a set refresh actually touched.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefreshSummary {
    pub posts_refreshed: usize,
    pub articles_patched: usize,
}

/// Encodes a fragment and writes it to a caller-chosen path.
pub fn create_fragment_file(
    path: &Path,
    body: &[u8],
    urls: &FragmentUrls,
    publisher_claim: &str,
) -> Result<(), IssueError> {
    let html = encode_fragment(body, urls, publisher_claim)?;
    write_atomic(path, &html)
}

/// Regenerates a publisher's artifact set.
///
/// The namespace attestation is re-signed with a fresh default expiry; every
/// post gets a regenerated resource attestation and fragment file; the host
/// document, when present, has each matching `<article>` substituted with
/// the freshly encoded fragment. Every artifact is written via
/// write-then-rename so a failure never leaves a torn file behind.
pub fn refresh_publisher_set(
    set: &PublisherSet,
    key: &SigningKey,
) -> anyhow::Result<RefreshSummary> {
    let publisher_claim = key.public_key_hex();

    let na_bytes = create_namespace_attestation_bytes(&set.namespace, None, key)
        .context("regenerating the namespace attestation")?;
    let na_path = set.publisher_dir.join(&set.namespace_file_name);
    write_atomic(&na_path, &na_bytes)
        .with_context(|| format!("writing namespace attestation {na_path:?}"))?;

    let mut host = match &set.host_document {
        Some(path) => Some(
            fs::read(path).with_context(|| format!("reading host document {path:?}"))?,
        ),
        None => None,
    };

    let mut articles_patched = 0;
    for post in &set.posts {
        let ra_bytes = create_resource_attestation_bytes(
            &post.body,
            &post.fragment_url,
            &publisher_claim,
            &set.namespace_attestation_url,
        )
        .with_context(|| format!("regenerating resource attestation for {}", post.fragment_url))?;
        let ra_path = post.dir.join(&set.resource_file_name);
        write_atomic(&ra_path, &ra_bytes)
            .with_context(|| format!("writing resource attestation {ra_path:?}"))?;

        let urls = FragmentUrls {
            fragment_url: post.fragment_url.clone(),
            resource_attestation_url: post.resource_attestation_url.clone(),
            namespace_attestation_url: set.namespace_attestation_url.clone(),
        };
        let html = encode_fragment(&post.body, &urls, &publisher_claim)
            .with_context(|| format!("encoding fragment for {}", post.fragment_url))?;
        let fragment_path = post.dir.join(&set.fragment_file_name);
        write_atomic(&fragment_path, &html)
            .with_context(|| format!("writing fragment {fragment_path:?}"))?;

        if let Some(doc) = host.as_mut() {
            match find_article_span(doc, &post.fragment_url)
                .with_context(|| format!("locating the article for {}", post.fragment_url))?
            {
                Some(span) => {
                    doc.splice(span, html.iter().copied());
                    articles_patched += 1;
                }
                None => {
                    warn!(
                        fragment_url = %post.fragment_url,
                        "host document carries no article for post"
                    );
                }
            }
        }
    }

    if let (Some(path), Some(doc)) = (&set.host_document, host) {
        write_atomic(path, &doc).with_context(|| format!("writing host document {path:?}"))?;
    }

    info!(
        posts = set.posts.len(),
        articles_patched, "publisher set refreshed"
    );
    Ok(RefreshSummary {
        posts_refreshed: set.posts.len(),
        articles_patched,
    })
}

/// Write-then-rename so readers never observe a torn artifact.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IssueError> {
    let mut tmp = path.to_path_buf();
    tmp.set_extension("atomic-tmp");
    fs::write(&tmp, bytes).map_err(|e| IssueError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| IssueError::io(path, e))
}
