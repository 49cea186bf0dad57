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

//! Logging bootstrap and the Discord alerting sink described in spec.md §7: in
//! `production`/`test` `NODE_ENV`, warnings and errors are also posted to a Discord
//! webhook with the `"{NODE_ENV}: "` prefix. A failed alert is logged locally and
//! never propagates — never retry inside a handler, the scheduler is the retry
//! mechanism.

use crate::config::NodeEnv;
use log::warn;
use serde_json::json;

/// Initialize the process-wide structured logger. Call once from `main`.
pub fn init_logging() {
    logforth::starter_log::build()
        .apply()
        .expect("logging backend initializes exactly once per process");
}

/// Posts operator-facing alerts to a Discord webhook. Constructed once in the
/// composition root and handed to every pipeline stage that can fail.
#[derive(Debug, Clone)]
pub struct Alerter {
    client: reqwest::Client,
    webhook_url: String,
    node_env: NodeEnv,
}

impl Alerter {
    pub fn new(webhook_url: String, node_env: NodeEnv) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
            node_env,
        }
    }

    /// Post `message` to Discord, prefixed with `"{NODE_ENV}: "`. A no-op in
    /// `development`. Network failures are swallowed after a local log line.
    pub async fn alert(&self, message: impl AsRef<str>) {
        if self.node_env == NodeEnv::Development {
            return;
        }

        let body = json!({ "content": format!("{}: {}", self.node_env, message.as_ref()) });

        if let Err(error) = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
        {
            warn!(error:%; "failed to post alert to discord webhook");
        }
    }
}
