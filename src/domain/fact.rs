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

use blake2::{digest::consts::U32, Blake2b, Digest};

/// A single oracle publication mirrored from chain (spec.md §3). Uniqueness key:
/// `(network, fact_urn)`.
#[derive(Debug, Clone)]
pub struct FactStatement {
    pub id: i64,
    pub network: i64,
    pub feed: i64,
    pub policy: i64,
    pub fact_urn: String,
    /// Empty when archival failed or was never attempted.
    pub storage_urn: String,
    pub transaction_id: String,
    pub block_hash: String,
    pub slot: i64,
    pub address: String,
    pub output_index: i32,
    /// BLAKE2b-256 hex of `datum_hash || fact_urn`.
    pub statement_hash: String,
    pub value: f64,
    pub value_inverse: f64,
    pub publication_date: i64,
    pub validation_date: i64,
    pub publication_cost: f64,
    pub datum_hash: String,
    pub is_archive_indexed: bool,
    pub content_signature: Option<String>,
    pub collection_date: Option<i64>,
    pub participating_nodes: Vec<i64>,
    pub sources: Vec<i64>,
}

type Blake2b256 = Blake2b<U32>;

/// `statement_hash = BLAKE2b-256(datum_hash || fact_urn)`, hex-encoded with a
/// 32-byte output (spec.md §4.8, §8 invariant I2).
pub fn statement_hash(datum_hash: &str, fact_urn: &str) -> String {
    let mut hasher = Blake2b256::new();
    hasher.update(datum_hash.as_bytes());
    hasher.update(fact_urn.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_hash_is_32_bytes_hex_encoded() {
        let hash = statement_hash("deadbeef", "urn:fact:example");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn statement_hash_is_deterministic_and_order_sensitive() {
        let a = statement_hash("aa", "bb");
        let b = statement_hash("aa", "bb");
        let c = statement_hash("bb", "aa");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
