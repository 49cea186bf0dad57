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

//! Shared "parse-and-index" routine (spec.md §4.8, "Parse-and-index per
//! transaction"). Used by both the backfill populator and the incremental
//! syncer, since both walk batches of [`KupoMatch`] records the same way.

use crate::{
    domain::{
        fact::{statement_hash, FactStatement},
        feed::{Asset, Feed, FeedStatus},
        network::Network,
        storage::{InsertOutcome, Storage},
    },
    error::IndexerError,
    infra::chain_index_client::{ChainIndex, KupoMatch},
};
use itertools::Itertools;
use log::{info, warn};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOutcome {
    pub inserted: u64,
    pub already_indexed: u64,
}

/// Mutable caches the indexing pass reads and lazily grows. Owned by the
/// scheduler and passed down by `&mut` reference (spec.md §5: caches are owned
/// by the scheduler, workers serialize updates back through the owner).
pub struct IndexingCaches<'a> {
    pub feeds: &'a mut Vec<Feed>,
    pub assets: &'a mut Vec<Asset>,
}

async fn ensure_asset(
    storage: &impl Storage,
    assets: &mut Vec<Asset>,
    ticker: &str,
) -> Result<i64, IndexerError> {
    if let Some(existing) = assets
        .iter()
        .find(|asset| asset.ticker.eq_ignore_ascii_case(ticker))
    {
        return Ok(existing.id);
    }
    let created = storage
        .create_asset(&Asset {
            id: 0,
            ticker: ticker.to_owned(),
            fingerprint: None,
            has_xerberus_risk_rating: false,
        })
        .await
        .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
    let id = created.id;
    assets.push(created);
    Ok(id)
}

/// Looks up a feed by `feed_id`, creating a minimal inactive record when
/// unknown (spec.md §4.8: "will be reconciled by §4.5").
async fn ensure_feed(
    storage: &impl Storage,
    caches: &mut IndexingCaches<'_>,
    network: i64,
    datum: &crate::domain::datum::CurrencyPairDatum,
) -> Result<i64, IndexerError> {
    if let Some(existing) = caches.feeds.iter().find(|feed| feed.feed_id == datum.feed_id) {
        return Ok(existing.id);
    }

    let base_asset = ensure_asset(storage, caches.assets, &datum.base_ticker).await?;
    let quote_asset = ensure_asset(storage, caches.assets, &datum.quote_ticker).await?;

    let created = storage
        .create_feed(&Feed {
            id: 0,
            network,
            feed_id: datum.feed_id.clone(),
            r#type: datum.feed_type.clone(),
            name: datum.feed_name.clone(),
            version: datum.feed_version.clone(),
            status: FeedStatus::Inactive,
            source_type: None,
            funding_type: None,
            calculation_method: String::new(),
            heartbeat_interval: 0,
            deviation: 0.0,
            base_asset,
            quote_asset,
        })
        .await
        .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
    let id = created.id;
    caches.feeds.push(created);
    Ok(id)
}

/// Parses and indexes a batch of matches belonging to a single policy
/// (spec.md §4.8). Matches are grouped by `transaction_id`; each group is
/// processed and committed as one transaction-scoped batch so that
/// `output_index` ordering is preserved within it.
pub async fn index_matches(
    storage: &impl Storage,
    client: &impl ChainIndex,
    network: &Network,
    policy_id: i64,
    caches: &mut IndexingCaches<'_>,
    matches: Vec<KupoMatch>,
) -> Result<IndexOutcome, IndexerError> {
    let mut outcome = IndexOutcome::default();

    let mut by_tx: HashMap<String, Vec<KupoMatch>> = HashMap::new();
    for kupo_match in matches {
        by_tx
            .entry(kupo_match.transaction_id.clone())
            .or_default()
            .push(kupo_match);
    }

    for (transaction_id, mut outputs) in by_tx.into_iter().sorted_by_key(|(id, _)| id.clone()) {
        outputs.sort_by_key(|o| o.output_index);

        let Some(slot) = outputs
            .iter()
            .map(|o| o.created_at.slot_no)
            .dedup()
            .exactly_one()
            .ok()
        else {
            warn!(transaction_id; "outputs span multiple slots, skipping transaction");
            continue;
        };

        let metadata_entries = match client.fetch_metadata(slot, &transaction_id).await {
            Ok(entries) => entries,
            Err(error) => {
                warn!(transaction_id; "metadata fetch failed: {error}");
                continue;
            }
        };

        let output_indices: Vec<i64> = outputs.iter().map(|o| o.output_index).collect();
        let datum_metadata =
            match crate::domain::metadata::extract_datum_metadata(&metadata_entries, &output_indices)
            {
                Ok(map) => map,
                Err(error) => {
                    warn!(transaction_id; "metadata decode failed: {error}");
                    continue;
                }
            };

        let mut facts = Vec::with_capacity(outputs.len());
        for output in &outputs {
            let Some(datum_hash) = &output.datum_hash else {
                warn!(transaction_id, output_index = output.output_index; "output missing datum hash");
                continue;
            };
            let Some(metadata) = datum_metadata.get(&output.output_index) else {
                warn!(transaction_id, output_index = output.output_index; "no metadata paired with output");
                continue;
            };

            let hex_datum = match client.fetch_datum(datum_hash).await {
                Ok(Some(hex_datum)) => hex_datum,
                Ok(None) => {
                    warn!(transaction_id, output_index = output.output_index; "datum hash resolved to no datum");
                    continue;
                }
                Err(error) => {
                    warn!(transaction_id, output_index = output.output_index; "datum fetch failed: {error}");
                    continue;
                }
            };

            let decoded = match crate::domain::datum::decode_datum(&hex_datum) {
                Ok(decoded) => decoded,
                Err(error) => {
                    warn!(transaction_id, output_index = output.output_index; "datum decode failed: {error}");
                    continue;
                }
            };

            let feed_id = match ensure_feed(storage, caches, network.id, &decoded).await {
                Ok(id) => id,
                Err(error) => {
                    warn!(transaction_id, output_index = output.output_index; "feed lookup failed: {error}");
                    continue;
                }
            };

            let hash = statement_hash(&decoded.datum_hash, &metadata.fact_urn);
            facts.push(FactStatement {
                id: 0,
                network: network.id,
                feed: feed_id,
                policy: policy_id,
                fact_urn: metadata.fact_urn.clone(),
                storage_urn: metadata.storage_urn.clone(),
                transaction_id: transaction_id.clone(),
                block_hash: output.created_at.header_hash.clone(),
                slot,
                address: output.address.clone(),
                output_index: output.output_index as i32,
                statement_hash: hash,
                value: decoded.value,
                value_inverse: decoded.inverse_value,
                publication_date: network.slot_clock().slot_to_date(slot),
                validation_date: decoded.validation_date,
                publication_cost: output.value.coins as f64 / 1_000_000.0,
                datum_hash: decoded.datum_hash,
                is_archive_indexed: false,
                content_signature: None,
                collection_date: None,
                participating_nodes: Vec::new(),
                sources: Vec::new(),
            });
        }

        if facts.is_empty() {
            continue;
        }

        let mut tx = storage
            .create_tx()
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
        for fact in &facts {
            let result = storage
                .insert_fact(fact, &mut tx)
                .await
                .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
            match result {
                InsertOutcome::Inserted => outcome.inserted += 1,
                InsertOutcome::AlreadyIndexed => outcome.already_indexed += 1,
            }
        }
        tx.commit()
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
        info!(transaction_id, count = facts.len(); "indexed transaction");
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::metadata::{Metadatum, MetadatumMapEntry},
        infra::chain_index_client::{KupoPoint, KupoValue},
        test_support::{FakeChainIndex, FakeStorage},
    };
    use std::collections::HashMap as StdHashMap;

    fn network() -> Network {
        Network {
            id: 1,
            name: "Mainnet".to_owned(),
            fact_statement_pointer: "fixed-pointer".to_owned(),
            script_token: "script-token".to_owned(),
            chain_index_base_url: "https://example.test".to_owned(),
            active_feeds_url: "https://example.test/feeds.json".to_owned(),
            zero_time: 0,
            zero_slot: 0,
            slot_length: 1_000,
            last_block_hash: None,
            last_checkpoint_slot: None,
            is_enabled: true,
            ignore_policies: std::collections::HashSet::new(),
            policies: Vec::new(),
        }
    }

    fn kupo_match(transaction_id: &str, output_index: i64, slot_no: i64, datum_hash: Option<&str>) -> KupoMatch {
        KupoMatch {
            transaction_index: 0,
            transaction_id: transaction_id.to_owned(),
            output_index,
            address: "addr1".to_owned(),
            value: KupoValue { coins: 2_000_000, assets: StdHashMap::new() },
            datum_hash: datum_hash.map(|hash| hash.to_owned()),
            datum_type: None,
            script_hash: None,
            created_at: KupoPoint { slot_no, header_hash: "block".to_owned() },
            spent_at: None,
        }
    }

    fn metadata_entry(records: Vec<Metadatum>) -> crate::domain::metadata::MetadataEntry {
        let mut schema = StdHashMap::new();
        schema.insert("1226".to_owned(), Metadatum::List { list: records });
        crate::domain::metadata::MetadataEntry {
            hash: "deadbeef".to_owned(),
            raw: String::new(),
            schema,
        }
    }

    fn map_entry(fact_urn: &str, storage_urn: &str) -> Metadatum {
        Metadatum::Map {
            map: vec![
                MetadatumMapEntry { k: Metadatum::Int { int: 0 }, v: Metadatum::String { string: fact_urn.to_owned() } },
                MetadatumMapEntry { k: Metadatum::Int { int: 1 }, v: Metadatum::String { string: storage_urn.to_owned() } },
            ],
        }
    }

    #[tokio::test]
    async fn outputs_spanning_multiple_slots_skip_the_transaction_without_touching_storage() {
        let network = network();
        let storage = FakeStorage::new();
        let client = FakeChainIndex::new();
        let mut feeds = Vec::new();
        let mut assets = Vec::new();
        let mut caches = IndexingCaches { feeds: &mut feeds, assets: &mut assets };

        let matches = vec![
            kupo_match("tx1", 0, 100, Some("hash0")),
            kupo_match("tx1", 1, 200, Some("hash1")),
        ];

        let outcome = index_matches(&storage, &client, &network, 1, &mut caches, matches)
            .await
            .expect("heterogeneous-slot transaction is skipped, not failed");

        assert_eq!(outcome.inserted, 0);
        assert_eq!(outcome.already_indexed, 0);
    }

    #[tokio::test]
    async fn a_transaction_whose_outputs_all_fail_datum_resolution_never_opens_a_transaction() {
        let network = network();
        let storage = FakeStorage::new();
        let client = FakeChainIndex::new();
        let mut feeds = Vec::new();
        let mut assets = Vec::new();
        let mut caches = IndexingCaches { feeds: &mut feeds, assets: &mut assets };

        let matches = vec![kupo_match("tx1", 0, 100, Some("hash0"))];
        client.set_metadata(
            "tx1",
            vec![metadata_entry(vec![map_entry("urn:fact:1", "urn:storage:1")])],
        );
        // Deliberately no `set_datum("hash0", ...)`: fetch_datum resolves to
        // `None`, so the output is skipped and `facts` stays empty.

        let outcome = index_matches(&storage, &client, &network, 1, &mut caches, matches)
            .await
            .expect("a transaction with no resolvable facts still succeeds, just inserts nothing");

        assert_eq!(outcome.inserted, 0);
        assert_eq!(outcome.already_indexed, 0);
    }
}
