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

//! Feed manifest fetch (spec.md §4.5, §6).

use crate::error::IndexerError;
use reqwest::Client as HttpClient;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedManifest {
    pub meta: FeedManifestMeta,
    pub feeds: Vec<FeedManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedManifestMeta {
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedManifestEntry {
    pub pair: String,
    pub label: String,
    pub interval: i64,
    pub deviation: f64,
    pub source: Option<String>,
    pub calculation: String,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub r#type: String,
}

#[derive(Debug, Clone)]
pub struct FeedManifestClient {
    http: HttpClient,
}

impl FeedManifestClient {
    pub fn new() -> Self {
        Self {
            http: HttpClient::new(),
        }
    }

    pub async fn fetch(&self, url: &str) -> Result<FeedManifest, IndexerError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;

        if !response.status().is_success() {
            return Err(IndexerError::TransientFetch(format!(
                "GET feed manifest returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))
    }
}

impl Default for FeedManifestClient {
    fn default() -> Self {
        Self::new()
    }
}
