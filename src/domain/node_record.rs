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

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Federated,
    Decentralized,
    Itn,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            NodeType::Federated => "federated",
            NodeType::Decentralized => "decentralized",
            NodeType::Itn => "itn",
        };
        write!(f, "{s}")
    }
}

/// A contributor node that participated in producing a fact's archival package
/// (spec.md §3, §4.9). Uniqueness: `(network, node_urn)`.
#[derive(Debug, Clone)]
pub struct ArchiveNode {
    pub id: i64,
    pub network: i64,
    pub node_urn: String,
    pub name: String,
    pub status: String,
    pub r#type: NodeType,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub geo: Option<String>,
}
