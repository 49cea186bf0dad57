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

//! In-memory fakes for the pipeline's two external boundaries
//! ([`Storage`], [`ChainIndex`]), shared by the `#[cfg(test)]` modules under
//! `pipeline/`. `FakeStorage::create_tx`/`insert_fact` are unreachable: every
//! test here stops before the real commit path, which stays exercised only
//! against a real Postgres (`Storage::create_tx` returns a concrete
//! `sqlx::Transaction`, which cannot be faked).

use crate::{
    domain::{
        fact::FactStatement,
        feed::{Asset, Feed},
        metadata::MetadataEntry,
        network::{Network, Policy},
        node_record::ArchiveNode,
        source::Source,
        storage::{InsertOutcome, SqlxTransaction, Storage},
    },
    error::IndexerError,
    infra::chain_index_client::{ChainIndex, MatchQuery, MatchesResponse},
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

#[derive(Clone, Default)]
pub struct FakeStorage {
    inner: Arc<Mutex<FakeStorageState>>,
}

#[derive(Default)]
struct FakeStorageState {
    networks: Vec<Network>,
    policies: Vec<Policy>,
    feeds: Vec<Feed>,
    assets: Vec<Asset>,
    facts: Vec<FactStatement>,
    nodes: Vec<ArchiveNode>,
    sources: Vec<Source>,
    next_id: i64,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(state: &mut FakeStorageState) -> i64 {
        state.next_id += 1;
        state.next_id
    }
}

impl Storage for FakeStorage {
    async fn create_tx(&self) -> Result<SqlxTransaction, sqlx::Error> {
        unreachable!("fake storage is only exercised along paths that never open a transaction")
    }

    async fn list_networks(&self) -> Result<Vec<Network>, sqlx::Error> {
        Ok(self.inner.lock().unwrap().networks.clone())
    }

    async fn create_network(&self, network: &Network) -> Result<Network, sqlx::Error> {
        let mut state = self.inner.lock().unwrap();
        let id = Self::next_id(&mut state);
        let created = Network {
            id,
            ..network.clone()
        };
        state.networks.push(created.clone());
        Ok(created)
    }

    async fn update_network(&self, network: &Network) -> Result<(), sqlx::Error> {
        let mut state = self.inner.lock().unwrap();
        if let Some(existing) = state.networks.iter_mut().find(|n| n.id == network.id) {
            *existing = network.clone();
        }
        Ok(())
    }

    async fn list_policies(&self, network: i64) -> Result<Vec<Policy>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .policies
            .iter()
            .filter(|policy| policy.network == network)
            .cloned()
            .collect())
    }

    async fn create_policy(&self, policy: &Policy) -> Result<Policy, sqlx::Error> {
        let mut state = self.inner.lock().unwrap();
        let id = Self::next_id(&mut state);
        let created = Policy {
            id,
            ..policy.clone()
        };
        state.policies.push(created.clone());
        Ok(created)
    }

    async fn list_feeds(&self, network: i64) -> Result<Vec<Feed>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .feeds
            .iter()
            .filter(|feed| feed.network == network)
            .cloned()
            .collect())
    }

    async fn create_feed(&self, feed: &Feed) -> Result<Feed, sqlx::Error> {
        let mut state = self.inner.lock().unwrap();
        let id = Self::next_id(&mut state);
        let created = Feed { id, ..feed.clone() };
        state.feeds.push(created.clone());
        Ok(created)
    }

    async fn update_feed(&self, feed: &Feed) -> Result<(), sqlx::Error> {
        let mut state = self.inner.lock().unwrap();
        if let Some(existing) = state.feeds.iter_mut().find(|f| f.id == feed.id) {
            *existing = feed.clone();
        }
        Ok(())
    }

    async fn list_assets(&self) -> Result<Vec<Asset>, sqlx::Error> {
        Ok(self.inner.lock().unwrap().assets.clone())
    }

    async fn create_asset(&self, asset: &Asset) -> Result<Asset, sqlx::Error> {
        let mut state = self.inner.lock().unwrap();
        let id = Self::next_id(&mut state);
        let created = Asset {
            id,
            ..asset.clone()
        };
        state.assets.push(created.clone());
        Ok(created)
    }

    async fn insert_fact(
        &self,
        _fact: &FactStatement,
        _tx: &mut SqlxTransaction,
    ) -> Result<InsertOutcome, sqlx::Error> {
        unreachable!("fake storage is only exercised along paths that never open a transaction")
    }

    async fn update_fact(&self, fact: &FactStatement) -> Result<(), sqlx::Error> {
        let mut state = self.inner.lock().unwrap();
        if let Some(existing) = state.facts.iter_mut().find(|f| f.id == fact.id) {
            *existing = fact.clone();
        }
        Ok(())
    }

    async fn delete_facts_with_slot_greater_than(
        &self,
        network: i64,
        slot: i64,
    ) -> Result<u64, sqlx::Error> {
        let mut state = self.inner.lock().unwrap();
        let before = state.facts.len();
        state
            .facts
            .retain(|fact| !(fact.network == network && fact.slot > slot));
        Ok((before - state.facts.len()) as u64)
    }

    async fn last_indexed_fact(&self, network: i64) -> Result<Option<FactStatement>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .facts
            .iter()
            .filter(|fact| fact.network == network)
            .max_by_key(|fact| (fact.slot, fact.output_index))
            .cloned())
    }

    async fn list_unarchived_facts(&self, network: i64) -> Result<Vec<FactStatement>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .facts
            .iter()
            .filter(|fact| {
                fact.network == network && !fact.is_archive_indexed && !fact.storage_urn.is_empty()
            })
            .cloned()
            .collect())
    }

    async fn list_nodes(&self, network: i64) -> Result<Vec<ArchiveNode>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .nodes
            .iter()
            .filter(|node| node.network == network)
            .cloned()
            .collect())
    }

    async fn create_node(&self, node: &ArchiveNode) -> Result<ArchiveNode, sqlx::Error> {
        let mut state = self.inner.lock().unwrap();
        let id = Self::next_id(&mut state);
        let created = ArchiveNode {
            id,
            ..node.clone()
        };
        state.nodes.push(created.clone());
        Ok(created)
    }

    async fn list_sources(&self, network: i64) -> Result<Vec<Source>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sources
            .iter()
            .filter(|source| source.network == network)
            .cloned()
            .collect())
    }

    async fn create_source(&self, source: &Source) -> Result<Source, sqlx::Error> {
        let mut state = self.inner.lock().unwrap();
        let id = Self::next_id(&mut state);
        let created = Source {
            id,
            ..source.clone()
        };
        state.sources.push(created.clone());
        Ok(created)
    }

    async fn update_source(&self, source: &Source) -> Result<(), sqlx::Error> {
        let mut state = self.inner.lock().unwrap();
        if let Some(existing) = state.sources.iter_mut().find(|s| s.id == source.id) {
            *existing = source.clone();
        }
        Ok(())
    }
}

/// Records every `pattern` a test passed to `fetch_matches`, so tests can
/// assert which policy id a query was built from.
#[derive(Clone, Default)]
pub struct FakeChainIndex {
    inner: Arc<Mutex<FakeChainIndexState>>,
}

#[derive(Default)]
struct FakeChainIndexState {
    matches_by_pattern: HashMap<String, VecDeque<MatchesResponse>>,
    datums: HashMap<String, String>,
    metadata_by_tx: HashMap<String, Vec<MetadataEntry>>,
    patterns_requested: Vec<String>,
}

impl FakeChainIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one response to hand back the next time `pattern` is fetched.
    /// Queued responses for the same pattern are returned in order.
    pub fn queue_matches(&self, pattern: &str, response: MatchesResponse) {
        self.inner
            .lock()
            .unwrap()
            .matches_by_pattern
            .entry(pattern.to_owned())
            .or_default()
            .push_back(response);
    }

    pub fn set_datum(&self, datum_hash: &str, hex_datum: &str) {
        self.inner
            .lock()
            .unwrap()
            .datums
            .insert(datum_hash.to_owned(), hex_datum.to_owned());
    }

    pub fn set_metadata(&self, transaction_id: &str, entries: Vec<MetadataEntry>) {
        self.inner
            .lock()
            .unwrap()
            .metadata_by_tx
            .insert(transaction_id.to_owned(), entries);
    }

    /// Every pattern `fetch_matches` was called with, in call order.
    pub fn patterns_requested(&self) -> Vec<String> {
        self.inner.lock().unwrap().patterns_requested.clone()
    }
}

impl ChainIndex for FakeChainIndex {
    async fn fetch_matches(
        &self,
        pattern: &str,
        _query: &MatchQuery,
    ) -> Result<MatchesResponse, IndexerError> {
        let mut state = self.inner.lock().unwrap();
        state.patterns_requested.push(pattern.to_owned());
        Ok(state
            .matches_by_pattern
            .get_mut(pattern)
            .and_then(|queued| queued.pop_front())
            .unwrap_or(MatchesResponse::Matches {
                matches: Vec::new(),
                block_hash: "fake-block-hash".to_owned(),
                most_recent_checkpoint: 0,
            }))
    }

    async fn fetch_datum(&self, datum_hash: &str) -> Result<Option<String>, IndexerError> {
        Ok(self.inner.lock().unwrap().datums.get(datum_hash).cloned())
    }

    async fn fetch_metadata(
        &self,
        _slot: i64,
        transaction_id: &str,
    ) -> Result<Vec<MetadataEntry>, IndexerError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .metadata_by_tx
            .get(transaction_id)
            .cloned()
            .unwrap_or_default())
    }
}
