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

use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Active,
    Inactive,
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FeedStatus::Active => write!(f, "active"),
            FeedStatus::Inactive => write!(f, "inactive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceType {
    Cex,
    Dex,
    #[serde(other)]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundingType {
    Showcase,
    Paid,
    Subsidized,
    #[serde(other)]
    None,
}

/// A published price/data feed (spec.md §3). `feed_id` is `"type/label/version"`.
#[derive(Debug, Clone)]
pub struct Feed {
    pub id: i64,
    pub network: i64,
    pub feed_id: String,
    pub r#type: String,
    pub name: String,
    pub version: String,
    pub status: FeedStatus,
    pub source_type: Option<SourceType>,
    pub funding_type: Option<FundingType>,
    pub calculation_method: String,
    pub heartbeat_interval: i64,
    pub deviation: f64,
    pub base_asset: i64,
    pub quote_asset: i64,
}

/// A base or quote currency/asset referenced by a [`Feed`] (spec.md §3).
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: i64,
    /// Unique, case-insensitive.
    pub ticker: String,
    pub fingerprint: Option<String>,
    pub has_xerberus_risk_rating: bool,
}
