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

use anyhow::Context;
use log::{error, info};
use orcfax_indexer::{application, config::Config, infra::postgres_storage, telemetry};
use sqlx::postgres::PgPoolOptions;
use std::panic;
use tokio::signal::unix::{signal, SignalKind};

#[tokio::main]
async fn main() {
    telemetry::init_logging();
    panic::set_hook(Box::new(|panic| error!(panic:%; "process panicked")));

    if let Err(error) = run().await {
        let error = format!("{error:#}");
        error!(error; "process exited with ERROR");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let sigterm = signal(SignalKind::terminate()).context("register SIGTERM handler")?;

    let config = Config::load().context("load configuration")?;
    info!(node_env:% = config.node_env; "starting");

    let connection_string = format!(
        "postgres://{}:{}@{}/orcfax",
        config.db.db_email,
        secrecy::ExposeSecret::expose_secret(&config.db.db_password),
        config.db.db_host,
    );
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&connection_string)
        .await
        .context("connect to Postgres")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("run database migrations")?;

    let storage = postgres_storage::Storage::new(pool);

    application::run(config, storage, sigterm)
        .await
        .context("run orcfax-indexer application")
}
