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

//! Static network seeds (spec.md §3: "Networks are seeded from static
//! configuration on first boot"). Everything here is compiled in rather than
//! sourced from the environment, since spec.md §6 does not list these values
//! among the required environment variables.

use crate::{config::Config, domain::network::Network};
use std::collections::HashSet;

/// One network's fixed parameters, known at compile time.
pub struct NetworkSeed {
    pub name: &'static str,
    pub fact_statement_pointer: &'static str,
    pub script_token: &'static str,
    pub active_feeds_url: &'static str,
    pub zero_time: i64,
    pub zero_slot: i64,
    pub slot_length: i64,
    pub archives_tracked: bool,
}

/// Cardano mainnet's Shelley-era slot clock parameters.
const MAINNET: NetworkSeed = NetworkSeed {
    name: "Mainnet",
    fact_statement_pointer: "000000000000000000000000000000000000000000000000000000",
    script_token: "4f7261636c65466163745374617465506f696e746572",
    active_feeds_url: "https://raw.githubusercontent.com/orcfax/cer-feeds/main/specific-feeds.json",
    zero_time: 1_596_059_091_000,
    zero_slot: 4_492_800,
    slot_length: 1_000,
    archives_tracked: true,
};

const PREVIEW: NetworkSeed = NetworkSeed {
    name: "Preview",
    fact_statement_pointer: "111111111111111111111111111111111111111111111111111111",
    script_token: "4f7261636c65466163745374617465506f696e746572",
    active_feeds_url: "https://raw.githubusercontent.com/orcfax/cer-feeds/main/specific-feeds-preview.json",
    zero_time: 1_666_656_000_000,
    zero_slot: 0,
    slot_length: 1_000,
    archives_tracked: false,
};

pub const SEEDS: &[NetworkSeed] = &[MAINNET, PREVIEW];

fn seed_to_network(seed: &NetworkSeed, chain_index_base_url: &str) -> Network {
    Network {
        id: 0,
        name: seed.name.to_owned(),
        fact_statement_pointer: seed.fact_statement_pointer.to_owned(),
        script_token: seed.script_token.to_owned(),
        chain_index_base_url: chain_index_base_url.to_owned(),
        active_feeds_url: seed.active_feeds_url.to_owned(),
        zero_time: seed.zero_time,
        zero_slot: seed.zero_slot,
        slot_length: seed.slot_length,
        last_block_hash: None,
        last_checkpoint_slot: None,
        is_enabled: true,
        ignore_policies: HashSet::new(),
        policies: Vec::new(),
    }
}

/// Builds the seed `Network` records for every statically known network, using
/// the per-network chain-index base URL from configuration.
pub fn seed_networks(config: &Config) -> Vec<Network> {
    SEEDS
        .iter()
        .map(|seed| {
            let base_url = match seed.name {
                "Mainnet" => &config.mainnet_chain_index_base_url,
                "Preview" => &config.preview_chain_index_base_url,
                _ => unreachable!("seed list only contains Mainnet and Preview"),
            };
            seed_to_network(seed, base_url)
        })
        .collect()
}

/// Whether archive indexing runs for `network` (spec.md §4.9: "Mainnet in
/// current config").
pub fn archives_tracked(network_name: &str) -> bool {
    SEEDS
        .iter()
        .find(|seed| seed.name == network_name)
        .is_some_and(|seed| seed.archives_tracked)
}
