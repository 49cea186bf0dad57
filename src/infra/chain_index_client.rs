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

//! Chain-index HTTP client (spec.md §4.2, §6). Talks to a Kupo-compatible
//! chain-index service: `matches`, `datums`, `metadata`.

use crate::{domain::metadata::MetadataEntry, error::IndexerError};
use reqwest::{header, Client as HttpClient, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;

/// A single UTxO match (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct KupoMatch {
    pub transaction_index: i64,
    pub transaction_id: String,
    pub output_index: i64,
    pub address: String,
    pub value: KupoValue,
    pub datum_hash: Option<String>,
    pub datum_type: Option<String>,
    pub script_hash: Option<String>,
    pub created_at: KupoPoint,
    pub spent_at: Option<KupoPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KupoValue {
    pub coins: i64,
    #[serde(default)]
    pub assets: HashMap<String, i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KupoPoint {
    pub slot_no: i64,
    pub header_hash: String,
}

/// Ordering for `GET matches` (spec.md §4.2, §6).
#[derive(Debug, Clone, Copy)]
pub enum MatchOrder {
    OldestFirst,
    MostRecentFirst,
}

impl MatchOrder {
    fn as_query_value(self) -> &'static str {
        match self {
            MatchOrder::OldestFirst => "oldest_first",
            MatchOrder::MostRecentFirst => "most_recent_first",
        }
    }
}

/// Filters accepted by `GET matches` (spec.md §4.2, §6).
#[derive(Debug, Clone, Default)]
pub struct MatchQuery {
    pub order: Option<MatchOrder>,
    pub created_after: Option<i64>,
    pub created_before: Option<i64>,
    pub unspent: bool,
    /// `If-None-Match` request header (spec.md §4.2).
    pub if_none_match: Option<String>,
}

/// Outcome of a `GET matches` call. `NotModified` is a first-class result, not
/// an error, per spec.md §4.2 ("304 Not Modified → return 'no change'").
#[derive(Debug, Clone)]
pub enum MatchesResponse {
    NotModified,
    Matches {
        matches: Vec<KupoMatch>,
        /// `etag` response header: the current tip's block hash.
        block_hash: String,
        /// `x-most-recent-checkpoint` response header.
        most_recent_checkpoint: i64,
    },
}

/// Chain-index read surface (spec.md §4.2, §6). A trait, not an inherent impl
/// on [`ChainIndexClient`], so the pipeline can be driven against a fake in
/// tests the same way it already is for [`crate::domain::storage::Storage`].
#[trait_variant::make(Send)]
pub trait ChainIndex
where
    Self: Clone + Send + Sync + 'static,
{
    /// `GET /matches/{pattern}` (spec.md §4.2, §6).
    async fn fetch_matches(
        &self,
        pattern: &str,
        query: &MatchQuery,
    ) -> Result<MatchesResponse, IndexerError>;

    /// `GET /datums/{datum_hash}` (spec.md §4.2, §6).
    async fn fetch_datum(&self, datum_hash: &str) -> Result<Option<String>, IndexerError>;

    /// `GET /metadata/{slot}?transaction_id=…` (spec.md §4.2, §6).
    async fn fetch_metadata(
        &self,
        slot: i64,
        transaction_id: &str,
    ) -> Result<Vec<MetadataEntry>, IndexerError>;
}

#[derive(Debug, Clone)]
pub struct ChainIndexClient {
    http: HttpClient,
    base_url: String,
}

impl ChainIndexClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, IndexerError> {
        let http = HttpClient::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

impl ChainIndex for ChainIndexClient {
    async fn fetch_matches(
        &self,
        pattern: &str,
        query: &MatchQuery,
    ) -> Result<MatchesResponse, IndexerError> {
        let url = format!("{}/matches/{pattern}", self.base_url);
        let mut request = self.http.get(url);

        let mut params = Vec::new();
        if let Some(order) = query.order {
            params.push(("order", order.as_query_value().to_owned()));
        }
        if let Some(after) = query.created_after {
            params.push(("created_after", after.to_string()));
        }
        if let Some(before) = query.created_before {
            params.push(("created_before", before.to_string()));
        }
        if query.unspent {
            params.push(("unspent", String::new()));
        }
        request = request.query(&params);

        if let Some(etag) = &query.if_none_match {
            request = request.header(header::IF_NONE_MATCH, etag);
        }

        let response = request
            .send()
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;

        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(MatchesResponse::NotModified);
        }

        if !response.status().is_success() {
            return Err(IndexerError::TransientFetch(format!(
                "GET matches returned {}",
                response.status()
            )));
        }

        let block_hash = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| IndexerError::ProtocolViolation("matches response missing etag".into()))?
            .to_owned();

        let most_recent_checkpoint = response
            .headers()
            .get("x-most-recent-checkpoint")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| {
                IndexerError::ProtocolViolation(
                    "matches response missing x-most-recent-checkpoint".into(),
                )
            })?;

        let matches: Vec<KupoMatch> = response
            .json()
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;

        Ok(MatchesResponse::Matches {
            matches,
            block_hash,
            most_recent_checkpoint,
        })
    }

    async fn fetch_datum(&self, datum_hash: &str) -> Result<Option<String>, IndexerError> {
        #[derive(Deserialize)]
        struct DatumResponse {
            datum: Option<String>,
        }

        let url = format!("{}/datums/{datum_hash}", self.base_url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;

        if !response.status().is_success() {
            return Err(IndexerError::TransientFetch(format!(
                "GET datum returned {}",
                response.status()
            )));
        }

        let body: DatumResponse = response
            .json()
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
        Ok(body.datum)
    }

    async fn fetch_metadata(
        &self,
        slot: i64,
        transaction_id: &str,
    ) -> Result<Vec<MetadataEntry>, IndexerError> {
        let url = format!("{}/metadata/{slot}", self.base_url);
        let response = self
            .http
            .get(url)
            .query(&[("transaction_id", transaction_id)])
            .send()
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;

        if !response.status().is_success() {
            return Err(IndexerError::TransientFetch(format!(
                "GET metadata returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))
    }
}
