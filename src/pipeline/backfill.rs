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

//! Backfill Populator (spec.md §4.7): for a network with an empty fact index,
//! walks day-sized slot windows from the earliest policy's `starting_slot` up
//! to "now" and indexes every match found.

use crate::{
    domain::{network::Network, storage::Storage},
    error::IndexerError,
    infra::chain_index_client::{ChainIndex, MatchOrder, MatchQuery, MatchesResponse},
    pipeline::{
        indexing::{index_matches, IndexOutcome, IndexingCaches},
        policy_tracker::pattern_for,
    },
};
use log::info;

const DAY_IN_MS: i64 = 24 * 60 * 60 * 1000;

/// Picks the policy governing a given slot: the last policy whose
/// `starting_slot <= slot`.
fn policy_for_slot(network: &Network, slot: i64) -> Option<&crate::domain::network::Policy> {
    network
        .policies
        .iter()
        .rev()
        .find(|policy| policy.starting_slot <= slot)
}

/// Runs the backfill pass for `network`, mutating `last_block_hash` /
/// `last_checkpoint_slot` on the returned network and persisting them via
/// `storage.update_network` once the walk completes.
pub async fn backfill_network(
    storage: &impl Storage,
    client: &impl ChainIndex,
    mut network: Network,
    caches: &mut IndexingCaches<'_>,
) -> Result<(Network, IndexOutcome), IndexerError> {
    let Some(first_policy) = network.policies.first() else {
        return Ok((network, IndexOutcome::default()));
    };

    let origin_slot = first_policy.starting_slot;
    let latest = network
        .slot_clock()
        .date_to_slot(chrono::Utc::now().timestamp_millis())
        .max(origin_slot);

    let window_slots = DAY_IN_MS / network.slot_length.max(1);
    let mut current = origin_slot;
    let mut outcome = IndexOutcome::default();

    while current < latest {
        let end = (current + window_slots).min(latest);

        // The window's facts live under the policy governing `current`, not
        // the network's fixed fact-statement-pointer lineage pattern: each
        // policy rotation is a distinct child token with its own UTxO stream.
        let Some(policy) = policy_for_slot(&network, current) else {
            current = end;
            continue;
        };
        let policy_id = policy.id;
        let pattern = pattern_for(&policy.policy_id, &network.script_token);

        let query = MatchQuery {
            order: Some(MatchOrder::OldestFirst),
            created_after: Some(current),
            created_before: Some(end),
            ..Default::default()
        };

        let response = client.fetch_matches(&pattern, &query).await?;
        if let MatchesResponse::Matches {
            matches,
            block_hash,
            most_recent_checkpoint,
        } = response
        {
            if !matches.is_empty() {
                let window_outcome =
                    index_matches(storage, client, &network, policy_id, caches, matches).await?;
                outcome.inserted += window_outcome.inserted;
                outcome.already_indexed += window_outcome.already_indexed;
            }
            network.last_block_hash = Some(block_hash);
            network.last_checkpoint_slot = Some(most_recent_checkpoint);
        }

        current = end;
    }

    storage
        .update_network(&network)
        .await
        .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
    info!(
        network = network.name, inserted = outcome.inserted, already_indexed = outcome.already_indexed;
        "backfill complete"
    );

    Ok((network, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::network::Policy,
        test_support::{FakeChainIndex, FakeStorage},
    };
    use std::collections::HashSet;

    fn policy(network: i64, policy_id: &str, starting_slot: i64) -> Policy {
        Policy {
            id: starting_slot,
            network,
            policy_id: policy_id.to_owned(),
            starting_slot,
            starting_block_hash: "hash".to_owned(),
            starting_date: starting_slot,
        }
    }

    fn network_with_policies(policies: Vec<Policy>) -> Network {
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
            ignore_policies: HashSet::new(),
            policies,
        }
    }

    #[test]
    fn policy_for_slot_picks_the_last_policy_reached() {
        let network = network_with_policies(vec![policy(1, "p1", 0), policy(1, "p2", 86_400)]);
        assert_eq!(policy_for_slot(&network, 0).unwrap().policy_id, "p1");
        assert_eq!(policy_for_slot(&network, 86_399).unwrap().policy_id, "p1");
        assert_eq!(policy_for_slot(&network, 86_400).unwrap().policy_id, "p2");
    }

    #[tokio::test]
    async fn backfill_fetches_each_window_under_its_own_policy_id_not_the_fixed_pointer() {
        // One day of slots at 1000ms/slot is 86_400 slots; two policies split a
        // two-day walk so the second window falls under the rotated policy.
        let network = network_with_policies(vec![
            policy(1, "policy-one", 0),
            policy(1, "policy-two", 86_400),
        ]);
        let latest_slot = 172_800;
        let storage = FakeStorage::new();
        let client = FakeChainIndex::new();
        let mut feeds = Vec::new();
        let mut assets = Vec::new();
        let mut caches = IndexingCaches {
            feeds: &mut feeds,
            assets: &mut assets,
        };

        let mut network = network;
        // Pin `date_to_slot(now)` to exactly `latest_slot` so the walk covers
        // precisely the two known windows.
        network.zero_time = chrono::Utc::now().timestamp_millis() - latest_slot * network.slot_length;

        let (_network, _outcome) =
            backfill_network(&storage, &client, network, &mut caches)
                .await
                .expect("backfill succeeds");

        let requested = client.patterns_requested();
        assert!(requested.contains(&"policy-one.script-token".to_owned()));
        assert!(requested.contains(&"policy-two.script-token".to_owned()));
        assert!(!requested.iter().any(|pattern| pattern.starts_with("fixed-pointer")));
    }
}
