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

//! Configuration layer (spec.md §4.10, §6). Required environment variables are
//! loaded eagerly at startup through `figment`; any missing value is a fatal
//! `ConfigurationError`, matching the teacher's `Config::load` idiom.

use crate::error::IndexerError;
use figment::{
    providers::{Env, Serialized},
    Figment,
};
use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeEnv {
    Development,
    Production,
    Test,
}

impl fmt::Display for NodeEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            NodeEnv::Development => "development",
            NodeEnv::Production => "production",
            NodeEnv::Test => "test",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub db_host: String,
    pub db_email: String,
    pub db_password: SecretString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArweaveConfig {
    pub primary_arweave_endpoint: String,
    pub secondary_arweave_endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub node_env: NodeEnv,

    #[serde(flatten)]
    pub db: DbConfig,

    pub mainnet_chain_index_base_url: String,
    pub preview_chain_index_base_url: String,

    pub discord_webhook_url: String,

    #[serde(flatten)]
    pub arweave: ArweaveConfig,

    /// Cron expression for the scheduler (spec.md §5: default every 10 minutes, UTC).
    #[serde(default = "default_schedule")]
    pub schedule: String,

    /// Bounded concurrency for archive ingestion (spec.md §4.9, §9: width 5).
    #[serde(default = "default_archive_concurrency")]
    pub archive_concurrency: usize,
}

fn default_schedule() -> String {
    "0 */10 * * * *".to_owned()
}

fn default_archive_concurrency() -> usize {
    5
}

impl Config {
    /// Load configuration from the process environment, failing fast if a required
    /// variable is absent. Mirrors the teacher's `Config::load` composition-root call.
    pub fn load() -> Result<Self, IndexerError> {
        Figment::new()
            .merge(Serialized::defaults(PartialDefaults::default()))
            .merge(Env::raw())
            .extract()
            .map_err(|error| IndexerError::ConfigurationError(error.to_string()))
    }
}

/// Defaults that `figment` merges underneath the environment; every field with no
/// default here is required, so a missing env var surfaces as a `ConfigurationError`.
#[derive(Debug, Default, serde::Serialize)]
struct PartialDefaults {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_env_displays_with_expected_discord_prefix() {
        assert_eq!(NodeEnv::Production.to_string(), "production");
        assert_eq!(NodeEnv::Test.to_string(), "test");
    }
}
