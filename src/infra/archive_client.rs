// This file is part of orcfax-indexer.
// Copyright (C) 2026 Orcfax
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Arweave archive fetch + extraction (spec.md §4.9 steps 1-2).

use crate::error::IndexerError;
use flate2::read::GzDecoder;
use reqwest::Client as HttpClient;
use std::io::Read;
use tar::Archive;

/// One extracted archive entry: JSON is parsed eagerly, everything else is kept
/// as a raw string (spec.md §4.9 step 2).
#[derive(Debug, Clone)]
pub enum ArchiveEntry {
    Json { name: String, value: serde_json::Value },
    Text { name: String, content: String },
}

impl ArchiveEntry {
    pub fn name(&self) -> &str {
        match self {
            ArchiveEntry::Json { name, .. } => name,
            ArchiveEntry::Text { name, .. } => name,
        }
    }
}

/// Strips the first 12 characters of `storage_urn` and prefixes with the
/// gateway's host (spec.md §4.9 step 1, §9: the literal offset is preserved
/// without URN-scheme validation).
fn archive_url(endpoint: &str, storage_urn: &str) -> Option<String> {
    if storage_urn.chars().count() < 12 {
        return None;
    }
    let tail: String = storage_urn.chars().skip(12).collect();
    Some(format!("{}/{tail}", endpoint.trim_end_matches('/')))
}

#[derive(Debug, Clone)]
pub struct ArchiveClient {
    http: HttpClient,
    primary_endpoint: String,
    secondary_endpoint: String,
}

impl ArchiveClient {
    pub fn new(primary_endpoint: impl Into<String>, secondary_endpoint: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            primary_endpoint: primary_endpoint.into(),
            secondary_endpoint: secondary_endpoint.into(),
        }
    }

    /// Fetch and extract the archive bundle for `storage_urn`, falling back to
    /// the secondary gateway endpoint when the primary fetch fails (the
    /// resilience behavior this rewrite adds on top of the single-endpoint
    /// original).
    pub async fn fetch_bundle(&self, storage_urn: &str) -> Result<Vec<ArchiveEntry>, IndexerError> {
        match self.fetch_from(&self.primary_endpoint, storage_urn).await {
            Ok(entries) => Ok(entries),
            Err(primary_error) => self
                .fetch_from(&self.secondary_endpoint, storage_urn)
                .await
                .map_err(|secondary_error| {
                    IndexerError::PermanentArchiveError(format!(
                        "primary endpoint failed ({primary_error}), secondary also failed ({secondary_error})"
                    ))
                }),
        }
    }

    async fn fetch_from(
        &self,
        endpoint: &str,
        storage_urn: &str,
    ) -> Result<Vec<ArchiveEntry>, IndexerError> {
        let url = archive_url(endpoint, storage_urn).ok_or_else(|| {
            IndexerError::PermanentArchiveError(format!(
                "storage_urn too short to derive an archive url: {storage_urn:?}"
            ))
        })?;

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|error| IndexerError::PermanentArchiveError(error.to_string()))?;

        if !response.status().is_success() {
            return Err(IndexerError::PermanentArchiveError(format!(
                "archive fetch for {url} returned {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        if !(content_type.contains("x-tar") || content_type.contains("gzip")) {
            return Err(IndexerError::PermanentArchiveError(format!(
                "unexpected content-type for {url}: {content_type}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| IndexerError::PermanentArchiveError(error.to_string()))?;
        if bytes.is_empty() {
            return Err(IndexerError::PermanentArchiveError(format!(
                "empty archive body for {url}"
            )));
        }

        extract_entries(&bytes)
    }
}

fn extract_entries(bytes: &[u8]) -> Result<Vec<ArchiveEntry>, IndexerError> {
    let gunzipped = GzDecoder::new(bytes);
    let mut archive = Archive::new(gunzipped);

    let mut entries = Vec::new();
    for entry in archive
        .entries()
        .map_err(|error| IndexerError::PermanentArchiveError(error.to_string()))?
    {
        let mut entry =
            entry.map_err(|error| IndexerError::PermanentArchiveError(error.to_string()))?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry
            .path()
            .map_err(|error| IndexerError::PermanentArchiveError(error.to_string()))?
            .to_string_lossy()
            .into_owned();
        let Some(basename) = path.rsplit('/').next() else {
            continue;
        };

        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|error| IndexerError::PermanentArchiveError(error.to_string()))?;

        if basename.ends_with(".json") {
            let value = serde_json::from_str(&content).map_err(|error| {
                IndexerError::PermanentArchiveError(format!("{basename}: {error}"))
            })?;
            entries.push(ArchiveEntry::Json {
                name: basename.to_owned(),
                value,
            });
        } else if basename.ends_with(".txt") {
            entries.push(ArchiveEntry::Text {
                name: basename.to_owned(),
                content,
            });
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_url_strips_twelve_characters() {
        let url = archive_url("https://arweave.net", "urn:arweave:abcdef123456").unwrap();
        assert_eq!(url, "https://arweave.net/abcdef123456");
    }

    #[test]
    fn archive_url_rejects_short_urns() {
        assert!(archive_url("https://arweave.net", "short").is_none());
    }
}
