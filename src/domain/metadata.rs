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

//! Metadata Decoder (spec.md §4.4). Extracts per-output fact/storage URNs from a
//! transaction's Orcfax metadata (label 1226).

use crate::error::IndexerError;
use serde::Deserialize;
use std::collections::HashMap;

/// Mirrors a chain-index `/metadata` response's `Metadatum` schema: an untagged
/// union over CBOR-ish metadata values.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Metadatum {
    Int {
        int: i64,
    },
    String {
        string: String,
    },
    Bytes {
        bytes: String,
    },
    List {
        list: Vec<Metadatum>,
    },
    Map {
        map: Vec<MetadatumMapEntry>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadatumMapEntry {
    pub k: Metadatum,
    pub v: Metadatum,
}

/// One transaction's metadata envelope, as returned by `GET /metadata`.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataEntry {
    pub hash: String,
    pub raw: String,
    pub schema: HashMap<String, Metadatum>,
}

const ORCFAX_LABEL: &str = "1226";

const TOS_DISCLAIMERS: &[&str] = &[
    "Use oracle data at your own risk: https://orcfax.io/tos/",
    "Use Orcfax data at your own risk: https://orcfax.io/tos/",
];

const ARWEAVE_FAILURE_SENTINELS: &[&str] = &[
    "arweave tx not created",
    "send to Arkly feature is not currently enabled",
];

/// The fact/storage URN pair recorded for a single transaction output
/// (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatumMetadata {
    pub fact_urn: String,
    pub storage_urn: String,
}

fn as_string(value: &Metadatum) -> Result<&str, IndexerError> {
    match value {
        Metadatum::String { string } => Ok(string),
        other => Err(IndexerError::ProtocolViolation(format!(
            "expected metadatum string, got {other:?}"
        ))),
    }
}

fn disclaimer_head(value: &Metadatum) -> bool {
    matches!(value, Metadatum::String { string } if TOS_DISCLAIMERS.contains(&string.as_str()))
}

/// Parse the first metadata entry's `schema["1226"].list` into one
/// [`DatumMetadata`] per transaction output, indexed by `output_index` (after
/// sorting outputs ascending). An optional ToS disclaimer head element is
/// skipped if present.
pub fn extract_datum_metadata(
    entries: &[MetadataEntry],
    output_indices: &[i64],
) -> Result<HashMap<i64, DatumMetadata>, IndexerError> {
    let Some(first) = entries.first() else {
        return Ok(HashMap::new());
    };

    let Some(Metadatum::List { list }) = first.schema.get(ORCFAX_LABEL) else {
        return Err(IndexerError::ProtocolViolation(
            "metadata entry missing label 1226 list".to_owned(),
        ));
    };

    let records = match list.split_first() {
        Some((head, rest)) if disclaimer_head(head) => rest,
        _ => list.as_slice(),
    };

    let mut sorted_indices = output_indices.to_vec();
    sorted_indices.sort_unstable();

    if records.len() != sorted_indices.len() {
        return Err(IndexerError::ProtocolViolation(format!(
            "metadata record count {} does not match output count {}",
            records.len(),
            sorted_indices.len()
        )));
    }

    let mut result = HashMap::new();
    for (output_index, record) in sorted_indices.into_iter().zip(records.iter()) {
        let Metadatum::Map { map } = record else {
            return Err(IndexerError::ProtocolViolation(format!(
                "expected a map metadatum for output {output_index}, got {record:?}"
            )));
        };
        if map.len() < 2 {
            return Err(IndexerError::ProtocolViolation(format!(
                "metadata map for output {output_index} has fewer than 2 entries"
            )));
        }

        let fact_urn = as_string(&map[0].v)?.to_owned();
        let mut storage_urn = as_string(&map[1].v)?.to_owned();
        if ARWEAVE_FAILURE_SENTINELS
            .iter()
            .any(|sentinel| storage_urn.contains(sentinel))
        {
            storage_urn.clear();
        }

        result.insert(output_index, DatumMetadata { fact_urn, storage_urn });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_entry(fact_urn: &str, storage_urn: &str) -> Metadatum {
        Metadatum::Map {
            map: vec![
                MetadatumMapEntry {
                    k: Metadatum::Int { int: 0 },
                    v: Metadatum::String {
                        string: fact_urn.to_owned(),
                    },
                },
                MetadatumMapEntry {
                    k: Metadatum::Int { int: 1 },
                    v: Metadatum::String {
                        string: storage_urn.to_owned(),
                    },
                },
            ],
        }
    }

    fn entry_with(list: Vec<Metadatum>) -> MetadataEntry {
        let mut schema = HashMap::new();
        schema.insert(ORCFAX_LABEL.to_owned(), Metadatum::List { list });
        MetadataEntry {
            hash: "deadbeef".to_owned(),
            raw: "".to_owned(),
            schema,
        }
    }

    #[test]
    fn s5_metadata_with_tos_head_pairs_outputs_in_order() {
        let entries = vec![entry_with(vec![
            Metadatum::String {
                string: "Use oracle data at your own risk: https://orcfax.io/tos/".to_owned(),
            },
            map_entry("urn:fact:1", "urn:storage:1"),
            map_entry("urn:fact:2", "urn:storage:2"),
        ])];

        let extracted = extract_datum_metadata(&entries, &[0, 1]).expect("parses");
        assert_eq!(extracted[&0].fact_urn, "urn:fact:1");
        assert_eq!(extracted[&1].fact_urn, "urn:fact:2");
    }

    #[test]
    fn blanks_out_arweave_failure_sentinels() {
        let entries = vec![entry_with(vec![map_entry(
            "urn:fact:1",
            "something: arweave tx not created, sorry",
        )])];

        let extracted = extract_datum_metadata(&entries, &[0]).expect("parses");
        assert_eq!(extracted[&0].storage_urn, "");
    }

    #[test]
    fn no_disclaimer_head_when_first_element_is_already_a_record() {
        let entries = vec![entry_with(vec![map_entry("urn:fact:1", "urn:storage:1")])];
        let extracted = extract_datum_metadata(&entries, &[0]).expect("parses");
        assert_eq!(extracted[&0].storage_urn, "urn:storage:1");
    }
}
