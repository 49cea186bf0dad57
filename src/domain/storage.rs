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

//! Datastore boundary (spec.md §6). The pipeline depends only on this trait; it
//! is never aware that Postgres sits behind it.

use crate::domain::{
    fact::FactStatement,
    feed::{Asset, Feed},
    network::{Network, Policy},
    node_record::ArchiveNode,
    source::Source,
};

/// Sqlx transaction for Postgres.
pub type SqlxTransaction = sqlx::Transaction<'static, sqlx::Postgres>;

/// Signalled by `insert_fact` on a `(network, fact_urn)` uniqueness conflict.
/// Never a hard error: callers count it as "already indexed" and continue
/// (spec.md §4.8, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyIndexed,
}

/// Storage abstraction (spec.md §6 "Datastore boundary").
#[trait_variant::make(Send)]
pub trait Storage
where
    Self: Clone + Send + Sync + 'static,
{
    async fn create_tx(&self) -> Result<SqlxTransaction, sqlx::Error>;

    async fn list_networks(&self) -> Result<Vec<Network>, sqlx::Error>;
    async fn create_network(&self, network: &Network) -> Result<Network, sqlx::Error>;
    async fn update_network(&self, network: &Network) -> Result<(), sqlx::Error>;

    async fn list_policies(&self, network: i64) -> Result<Vec<Policy>, sqlx::Error>;
    async fn create_policy(&self, policy: &Policy) -> Result<Policy, sqlx::Error>;

    async fn list_feeds(&self, network: i64) -> Result<Vec<Feed>, sqlx::Error>;
    async fn create_feed(&self, feed: &Feed) -> Result<Feed, sqlx::Error>;
    async fn update_feed(&self, feed: &Feed) -> Result<(), sqlx::Error>;

    async fn list_assets(&self) -> Result<Vec<Asset>, sqlx::Error>;
    async fn create_asset(&self, asset: &Asset) -> Result<Asset, sqlx::Error>;

    /// Insert a fact statement inside `tx`. Returns
    /// [`InsertOutcome::AlreadyIndexed`] instead of an error on a
    /// `(network, fact_urn)` uniqueness conflict (spec.md §4.8).
    async fn insert_fact(
        &self,
        fact: &FactStatement,
        tx: &mut SqlxTransaction,
    ) -> Result<InsertOutcome, sqlx::Error>;

    async fn update_fact(&self, fact: &FactStatement) -> Result<(), sqlx::Error>;

    /// Rollback repair (spec.md §4.8 step 4): delete all stored facts for
    /// `network` with `slot > slot`.
    async fn delete_facts_with_slot_greater_than(
        &self,
        network: i64,
        slot: i64,
    ) -> Result<u64, sqlx::Error>;

    /// The most recently indexed fact for a network, ordered by slot then
    /// output_index, or `None` for an empty index (spec.md §4.7).
    async fn last_indexed_fact(&self, network: i64) -> Result<Option<FactStatement>, sqlx::Error>;

    /// Facts with `is_archive_indexed = false && storage_urn != ""` (spec.md §4.9).
    async fn list_unarchived_facts(&self, network: i64) -> Result<Vec<FactStatement>, sqlx::Error>;

    async fn list_nodes(&self, network: i64) -> Result<Vec<ArchiveNode>, sqlx::Error>;
    async fn create_node(&self, node: &ArchiveNode) -> Result<ArchiveNode, sqlx::Error>;

    async fn list_sources(&self, network: i64) -> Result<Vec<Source>, sqlx::Error>;
    async fn create_source(&self, source: &Source) -> Result<Source, sqlx::Error>;
    async fn update_source(&self, source: &Source) -> Result<(), sqlx::Error>;
}
