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

//! Incremental Syncer (spec.md §4.8): per-tick advancement of a network from
//! its stored checkpoint, handling policy rotation and rollback repair.

use crate::{
    domain::{network::{Network, Policy}, storage::Storage},
    error::IndexerError,
    infra::{
        chain_index_client::{ChainIndex, MatchOrder, MatchQuery, MatchesResponse},
        feed_manifest_client::{FeedManifest, FeedManifestClient},
    },
    pipeline::{
        feed_sync::sync_feeds,
        indexing::{index_matches, IndexOutcome, IndexingCaches},
        policy_tracker::{check_for_rotation, pattern_for},
    },
};
use log::{info, warn};

/// Runs one sync tick for `network`. Returns the updated network (caller
/// persists it), the freshly fetched feed manifest (for the next tick's
/// cache), and the tick's indexing outcome.
pub async fn sync_network(
    storage: &impl Storage,
    chain_client: &impl ChainIndex,
    feed_client: &FeedManifestClient,
    mut network: Network,
    caches: &mut IndexingCaches<'_>,
    cached_manifest: Option<&FeedManifest>,
) -> Result<(Network, FeedManifest, IndexOutcome), IndexerError> {
    let manifest = sync_feeds(
        storage,
        feed_client,
        network.id,
        &network.active_feeds_url,
        cached_manifest,
    )
    .await?;

    let Some(current_policy) = network.current_policy().cloned() else {
        warn!(network = network.name; "no policy discovered yet, skipping sync tick");
        return Ok((network, manifest, IndexOutcome::default()));
    };

    let rotation = check_for_rotation(
        chain_client,
        &network.fact_statement_pointer,
        &network.script_token,
        &current_policy.policy_id,
    )
    .await?;

    let outcome = match rotation {
        Some(candidate) => {
            handle_rotation(storage, chain_client, &mut network, caches, &current_policy, candidate)
                .await?
        }
        None => handle_steady_state(storage, chain_client, &mut network, caches, &current_policy).await?,
    };

    storage
        .update_network(&network)
        .await
        .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;

    Ok((network, manifest, outcome))
}

/// Policy rotated mid-tick (spec.md §4.8 step 2, scenario S4): finish the
/// outstanding window under the old policy, then switch to the new one with
/// no upper bound.
async fn handle_rotation(
    storage: &impl Storage,
    client: &impl ChainIndex,
    network: &mut Network,
    caches: &mut IndexingCaches<'_>,
    old_policy: &Policy,
    candidate: crate::pipeline::policy_tracker::RotationCandidate,
) -> Result<IndexOutcome, IndexerError> {
    let last_slot = storage
        .last_indexed_fact(network.id)
        .await
        .map_err(|error| IndexerError::TransientFetch(error.to_string()))?
        .map(|fact| fact.slot)
        .unwrap_or(old_policy.starting_slot);

    let mut outcome = IndexOutcome::default();

    // The outstanding window still belongs to the policy that governed it
    // before the rotation was observed.
    let closing_pattern = pattern_for(&old_policy.policy_id, &network.script_token);
    let closing_query = MatchQuery {
        order: Some(MatchOrder::OldestFirst),
        created_after: Some(last_slot),
        created_before: Some(candidate.starting_slot),
        ..Default::default()
    };
    if let MatchesResponse::Matches {
        matches,
        block_hash,
        most_recent_checkpoint,
    } = client.fetch_matches(&closing_pattern, &closing_query).await?
    {
        let closing = index_matches(storage, client, network, old_policy.id, caches, matches).await?;
        outcome.inserted += closing.inserted;
        outcome.already_indexed += closing.already_indexed;
        network.last_block_hash = Some(block_hash);
        network.last_checkpoint_slot = Some(most_recent_checkpoint);
    }

    let new_policy = storage
        .create_policy(&Policy {
            id: 0,
            network: network.id,
            policy_id: candidate.policy_id.clone(),
            starting_slot: candidate.starting_slot,
            starting_block_hash: candidate.starting_block_hash.clone(),
            starting_date: network.slot_clock().slot_to_date(candidate.starting_slot),
        })
        .await
        .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
    info!(policy_id = new_policy.policy_id; "policy rotated");
    network.policies.push(new_policy.clone());

    let opening_pattern = pattern_for(&new_policy.policy_id, &network.script_token);
    let opening_query = MatchQuery {
        order: Some(MatchOrder::OldestFirst),
        created_after: Some(candidate.starting_slot),
        ..Default::default()
    };
    if let MatchesResponse::Matches {
        matches,
        block_hash,
        most_recent_checkpoint,
    } = client.fetch_matches(&opening_pattern, &opening_query).await?
    {
        let opening = index_matches(storage, client, network, new_policy.id, caches, matches).await?;
        outcome.inserted += opening.inserted;
        outcome.already_indexed += opening.already_indexed;
        network.last_block_hash = Some(block_hash);
        network.last_checkpoint_slot = Some(most_recent_checkpoint);
    }

    Ok(outcome)
}

/// No rotation this tick (spec.md §4.8 steps 3-5): conditional fetch from the
/// stored checkpoint, with rollback repair when the server's checkpoint has
/// regressed.
async fn handle_steady_state(
    storage: &impl Storage,
    client: &impl ChainIndex,
    network: &mut Network,
    caches: &mut IndexingCaches<'_>,
    current_policy: &Policy,
) -> Result<IndexOutcome, IndexerError> {
    let pattern = pattern_for(&current_policy.policy_id, &network.script_token);
    let query = MatchQuery {
        order: Some(MatchOrder::OldestFirst),
        created_after: network.last_checkpoint_slot,
        if_none_match: network.last_block_hash.clone(),
        ..Default::default()
    };

    let response = client.fetch_matches(&pattern, &query).await?;
    let MatchesResponse::Matches {
        matches,
        block_hash,
        most_recent_checkpoint,
    } = response
    else {
        return Ok(IndexOutcome::default());
    };

    if let Some(stored_checkpoint) = network.last_checkpoint_slot {
        if most_recent_checkpoint < stored_checkpoint {
            let removed = storage
                .delete_facts_with_slot_greater_than(network.id, most_recent_checkpoint)
                .await
                .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
            warn!(
                network = network.name, removed, most_recent_checkpoint, stored_checkpoint;
                "rollback detected, repaired stored facts"
            );
        }
    }

    let outcome =
        index_matches(storage, client, network, current_policy.id, caches, matches).await?;
    network.last_block_hash = Some(block_hash);
    network.last_checkpoint_slot = Some(most_recent_checkpoint);

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pipeline::policy_tracker::RotationCandidate,
        test_support::{FakeChainIndex, FakeStorage},
    };
    use std::collections::HashSet;

    fn network_with_policy(policy_id: &str) -> Network {
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
            last_checkpoint_slot: Some(100),
            is_enabled: true,
            ignore_policies: HashSet::new(),
            policies: vec![Policy {
                id: 1,
                network: 1,
                policy_id: policy_id.to_owned(),
                starting_slot: 0,
                starting_block_hash: "hash".to_owned(),
                starting_date: 0,
            }],
        }
    }

    #[tokio::test]
    async fn steady_state_queries_under_the_current_policy_id() {
        let mut network = network_with_policy("current-policy");
        let current_policy = network.current_policy().cloned().unwrap();
        let storage = FakeStorage::new();
        let client = FakeChainIndex::new();
        let mut feeds = Vec::new();
        let mut assets = Vec::new();
        let mut caches = IndexingCaches {
            feeds: &mut feeds,
            assets: &mut assets,
        };

        handle_steady_state(&storage, &client, &mut network, &mut caches, &current_policy)
            .await
            .expect("steady state sync succeeds");

        assert_eq!(
            client.patterns_requested(),
            vec!["current-policy.script-token".to_owned()]
        );
    }

    #[tokio::test]
    async fn rotation_queries_the_closing_window_under_the_old_policy_and_the_opening_window_under_the_new_one(
    ) {
        let mut network = network_with_policy("old-policy");
        let old_policy = network.current_policy().cloned().unwrap();
        let storage = FakeStorage::new();
        let client = FakeChainIndex::new();
        let mut feeds = Vec::new();
        let mut assets = Vec::new();
        let mut caches = IndexingCaches {
            feeds: &mut feeds,
            assets: &mut assets,
        };
        let candidate = RotationCandidate {
            policy_id: "new-policy".to_owned(),
            starting_slot: 500,
            starting_block_hash: "new-hash".to_owned(),
        };

        handle_rotation(&storage, &client, &mut network, &mut caches, &old_policy, candidate)
            .await
            .expect("rotation sync succeeds");

        let requested = client.patterns_requested();
        assert_eq!(
            requested,
            vec![
                "old-policy.script-token".to_owned(),
                "new-policy.script-token".to_owned(),
            ]
        );
        assert_eq!(network.policies.len(), 2);
        assert_eq!(network.policies[1].policy_id, "new-policy");
    }
}
