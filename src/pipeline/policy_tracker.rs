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

//! Policy Tracker (spec.md §4.6): discovers the oracle's fact-statement-pointer
//! policy lineage and detects policy-ID rotations.

use crate::{
    domain::{network::{Network, Policy}, storage::Storage},
    error::IndexerError,
    infra::chain_index_client::{ChainIndex, MatchOrder, MatchQuery, MatchesResponse},
};
use log::info;
use std::collections::HashSet;

pub(crate) fn pattern_for(policy_id: &str, script_token: &str) -> String {
    format!("{policy_id}.{script_token}")
}

/// First-time population (spec.md §4.6 paragraph 1): list all matches oldest
/// first under the fixed fact-statement-pointer lineage, decode each datum to
/// a hex policy ID, dedup preserving first occurrence, drop anything in
/// `network.ignore_policies`, persist ordered by `starting_slot`.
pub async fn discover_policy_lineage(
    storage: &impl Storage,
    client: &impl ChainIndex,
    network: &Network,
) -> Result<Vec<Policy>, IndexerError> {
    let slot_clock = network.slot_clock();
    let pattern = pattern_for(&network.fact_statement_pointer, &network.script_token);
    let query = MatchQuery {
        order: Some(MatchOrder::OldestFirst),
        ..Default::default()
    };

    let MatchesResponse::Matches { matches, .. } = client.fetch_matches(&pattern, &query).await?
    else {
        return Ok(Vec::new());
    };

    let mut seen = HashSet::new();
    let mut policies = Vec::new();

    for kupo_match in matches {
        let Some(datum_hash) = kupo_match.datum_hash else {
            continue;
        };
        let Some(datum_hex) = client.fetch_datum(&datum_hash).await? else {
            continue;
        };
        if !seen.insert(datum_hex.clone()) || network.ignore_policies.contains(&datum_hex) {
            continue;
        }

        let starting_slot = kupo_match.created_at.slot_no;
        let policy = storage
            .create_policy(&Policy {
                id: 0,
                network: network.id,
                policy_id: datum_hex,
                starting_slot,
                starting_block_hash: kupo_match.created_at.header_hash,
                starting_date: slot_clock.slot_to_date(starting_slot),
            })
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
        info!(policy_id = policy.policy_id; "discovered policy");
        policies.push(policy);
    }

    policies.sort_by_key(|policy| policy.starting_slot);
    Ok(policies)
}

/// A freshly observed policy rotation candidate, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationCandidate {
    pub policy_id: String,
    pub starting_slot: i64,
    pub starting_block_hash: String,
}

/// Per-tick check (spec.md §4.6 paragraph 2): fetch the most-recent unspent
/// match under the fixed fact-statement-pointer lineage and decode its
/// policy ID. Returns `Some` only when it differs from `current_policy_id`.
pub async fn check_for_rotation(
    client: &impl ChainIndex,
    fact_statement_pointer: &str,
    script_token: &str,
    current_policy_id: &str,
) -> Result<Option<RotationCandidate>, IndexerError> {
    let pattern = pattern_for(fact_statement_pointer, script_token);
    let query = MatchQuery {
        order: Some(MatchOrder::MostRecentFirst),
        unspent: true,
        ..Default::default()
    };

    let MatchesResponse::Matches { matches, .. } = client.fetch_matches(&pattern, &query).await?
    else {
        return Ok(None);
    };

    let Some(latest) = matches.into_iter().next() else {
        return Ok(None);
    };
    let Some(datum_hash) = latest.datum_hash else {
        return Ok(None);
    };
    let Some(datum_hex) = client.fetch_datum(&datum_hash).await? else {
        return Ok(None);
    };

    if datum_hex == current_policy_id {
        Ok(None)
    } else {
        Ok(Some(RotationCandidate {
            policy_id: datum_hex,
            starting_slot: latest.created_at.slot_no,
            starting_block_hash: latest.created_at.header_hash,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        infra::chain_index_client::{KupoMatch, KupoPoint},
        test_support::{FakeChainIndex, FakeStorage},
    };

    fn network() -> Network {
        Network {
            id: 7,
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
            policies: Vec::new(),
        }
    }

    #[tokio::test]
    async fn discovered_policies_carry_a_computed_starting_date_not_the_zero_sentinel() {
        let network = network();
        let storage = FakeStorage::new();
        let client = FakeChainIndex::new();
        let pattern = pattern_for(&network.fact_statement_pointer, &network.script_token);
        client.queue_matches(
            &pattern,
            MatchesResponse::Matches {
                matches: vec![KupoMatch {
                    transaction_index: 0,
                    transaction_id: "tx1".to_owned(),
                    output_index: 0,
                    address: "addr1".to_owned(),
                    value: crate::infra::chain_index_client::KupoValue {
                        coins: 0,
                        assets: std::collections::HashMap::new(),
                    },
                    datum_hash: Some("hash1".to_owned()),
                    datum_type: None,
                    script_hash: None,
                    created_at: KupoPoint {
                        slot_no: 10_000,
                        header_hash: "block1".to_owned(),
                    },
                    spent_at: None,
                }],
                block_hash: "tip".to_owned(),
                most_recent_checkpoint: 10_000,
            },
        );
        client.set_datum("hash1", "policy-one");

        let policies = discover_policy_lineage(&storage, &client, &network)
            .await
            .expect("lineage discovery succeeds");

        assert_eq!(policies.len(), 1);
        let expected_date = network.slot_clock().slot_to_date(10_000);
        assert_eq!(policies[0].starting_date, expected_date);
        assert_ne!(policies[0].starting_date, 0);
    }

    #[tokio::test]
    async fn rotation_check_queries_under_the_fixed_fact_statement_pointer() {
        let client = FakeChainIndex::new();

        let rotation = check_for_rotation(&client, "fixed-pointer", "script-token", "current-policy")
            .await
            .expect("rotation check succeeds");

        assert_eq!(rotation, None);
        assert_eq!(
            client.patterns_requested(),
            vec!["fixed-pointer.script-token".to_owned()]
        );
    }
}
