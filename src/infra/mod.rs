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

//! Outbound adapters: chain-index HTTP client, archive gateway client, feed
//! manifest client, and the Postgres `Storage` implementation.

pub mod archive_client;
pub mod chain_index_client;
pub mod feed_manifest_client;
pub mod postgres_storage;

pub use archive_client::{ArchiveClient, ArchiveEntry};
pub use chain_index_client::{ChainIndexClient, KupoMatch, MatchOrder, MatchQuery, MatchesResponse};
pub use feed_manifest_client::{FeedManifest, FeedManifestClient};
pub use postgres_storage::Storage as PostgresStorage;
