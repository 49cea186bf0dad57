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

use crate::time::SlotClock;
use std::collections::HashSet;

/// A chain-index-backed network the indexer mirrors, e.g. Mainnet or Preview
/// (spec.md §3).
#[derive(Debug, Clone)]
pub struct Network {
    pub id: i64,
    pub name: String,
    pub fact_statement_pointer: String,
    pub script_token: String,
    pub chain_index_base_url: String,
    pub active_feeds_url: String,
    pub zero_time: i64,
    pub zero_slot: i64,
    pub slot_length: i64,
    pub last_block_hash: Option<String>,
    pub last_checkpoint_slot: Option<i64>,
    pub is_enabled: bool,
    pub ignore_policies: HashSet<String>,
    /// Ordered by `starting_slot` ascending; the last entry is the current policy.
    pub policies: Vec<Policy>,
}

impl Network {
    pub fn slot_clock(&self) -> SlotClock {
        SlotClock {
            zero_time: self.zero_time,
            zero_slot: self.zero_slot,
            slot_length: self.slot_length,
        }
    }

    /// The current (most recently rotated-to) policy, if the network has been
    /// populated at all.
    pub fn current_policy(&self) -> Option<&Policy> {
        self.policies.last()
    }

    /// Invariant (spec.md §8, I1): policies are strictly increasing by
    /// `starting_slot`.
    pub fn policies_strictly_increasing(&self) -> bool {
        self.policies
            .windows(2)
            .all(|pair| pair[0].starting_slot < pair[1].starting_slot)
    }
}

/// One generation of the oracle's fact-statement-pointer policy lineage
/// (spec.md §3, §4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub id: i64,
    pub network: i64,
    pub policy_id: String,
    pub starting_slot: i64,
    pub starting_block_hash: String,
    pub starting_date: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(starting_slot: i64) -> Policy {
        Policy {
            id: starting_slot,
            network: 1,
            policy_id: format!("policy-{starting_slot}"),
            starting_slot,
            starting_block_hash: "hash".to_owned(),
            starting_date: starting_slot,
        }
    }

    #[test]
    fn detects_non_monotonic_policies() {
        let mut network = sample_network();
        network.policies = vec![policy(50), policy(200)];
        assert!(network.policies_strictly_increasing());

        network.policies = vec![policy(200), policy(50)];
        assert!(!network.policies_strictly_increasing());
    }

    #[test]
    fn current_policy_is_the_last_one() {
        let mut network = sample_network();
        network.policies = vec![policy(50), policy(200)];
        assert_eq!(network.current_policy().unwrap().starting_slot, 200);
    }

    fn sample_network() -> Network {
        Network {
            id: 1,
            name: "Mainnet".to_owned(),
            fact_statement_pointer: "aa".to_owned(),
            script_token: "bb".to_owned(),
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
}
