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

//! Domain model and persistence boundary (spec.md §3, §6).

pub mod datum;
pub mod fact;
pub mod feed;
pub mod metadata;
pub mod network;
pub mod node_record;
pub mod source;
pub mod storage;

pub use datum::{decode_datum, CurrencyPairDatum};
pub use fact::{statement_hash, FactStatement};
pub use feed::{Asset, Feed, FeedStatus, FundingType, SourceType};
pub use metadata::{extract_datum_metadata, DatumMetadata, MetadataEntry, Metadatum};
pub use network::{Network, Policy};
pub use node_record::{ArchiveNode, NodeType};
pub use source::{Source, SourceKind};
pub use storage::{InsertOutcome, SqlxTransaction, Storage};
