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

//! The indexing pipeline (spec.md §4.5-§4.9): feed/policy reconciliation,
//! backfill, incremental sync, and archive indexing.

pub mod archive_indexer;
pub mod backfill;
pub mod feed_sync;
pub mod indexing;
pub mod incremental_sync;
pub mod policy_tracker;
