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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    CexApi,
    DexLp,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::CexApi => "CEX API",
            SourceKind::DexLp => "DEX LP",
        }
    }
}

/// A contributor data source for one of a fact's archived messages
/// (spec.md §3, §4.9). Uniqueness anchor: `recipient` within a network.
#[derive(Debug, Clone)]
pub struct Source {
    pub id: i64,
    pub network: i64,
    pub name: String,
    pub r#type: SourceKind,
    pub sender: String,
    pub recipient: String,
    pub status: String,
    pub website: Option<String>,
    pub image_path: Option<String>,
    pub background_color: Option<String>,
}
