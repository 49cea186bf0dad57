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

//! Error taxonomy shared by every pipeline stage. See spec.md §7.

use thiserror::Error;

/// The four error kinds the indexing pipeline distinguishes. Each carries enough
/// context for the scheduler to decide whether a checkpoint may advance.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Network errors, 5xx responses, or a schema-parse failure on a single response.
    /// The enclosing tick logs this and moves on to the next network; checkpoints never
    /// advance past a transient failure.
    #[error("transient fetch failure: {0}")]
    TransientFetch(String),

    /// Missing headers on a 200, heterogeneous slots across one transaction's outputs,
    /// or a missing datum hash on a matched output. Fails the current transaction only.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Bad content-type, tar extraction failure, or a missing `validation-*` entry.
    /// Marks only the offending fact as unprocessable for this tick.
    #[error("permanent archive error: {0}")]
    PermanentArchiveError(String),

    /// Missing required environment/config value. Fatal at startup.
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
