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

//! Postgres implementation of the [`domain::storage::Storage`] boundary.

use crate::domain::{
    self,
    fact::FactStatement,
    feed::{Asset, Feed, FeedStatus, FundingType, SourceType},
    network::{Network, Policy},
    node_record::{ArchiveNode, NodeType},
    source::{Source, SourceKind},
    storage::{InsertOutcome, SqlxTransaction},
};
use fastrace::trace;
use indoc::indoc;
use sqlx::PgPool;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Storage {
    pool: PgPool,
}

impl Storage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn node_type_str(t: NodeType) -> &'static str {
    match t {
        NodeType::Federated => "federated",
        NodeType::Decentralized => "decentralized",
        NodeType::Itn => "itn",
    }
}

fn node_type_from_str(s: &str) -> NodeType {
    match s {
        "decentralized" => NodeType::Decentralized,
        "itn" => NodeType::Itn,
        _ => NodeType::Federated,
    }
}

fn source_kind_str(k: SourceKind) -> &'static str {
    k.as_str()
}

fn source_type_str(s: SourceType) -> Option<&'static str> {
    match s {
        SourceType::Cex => Some("CEX"),
        SourceType::Dex => Some("DEX"),
        SourceType::None => None,
    }
}

fn funding_type_str(f: FundingType) -> Option<&'static str> {
    match f {
        FundingType::Showcase => Some("showcase"),
        FundingType::Paid => Some("paid"),
        FundingType::Subsidized => Some("subsidized"),
        FundingType::None => None,
    }
}

fn source_kind_from_str(s: &str) -> SourceKind {
    match s {
        "DEX LP" => SourceKind::DexLp,
        _ => SourceKind::CexApi,
    }
}

impl domain::storage::Storage for Storage {
    #[trace]
    async fn create_tx(&self) -> Result<SqlxTransaction, sqlx::Error> {
        self.pool.begin().await
    }

    async fn list_networks(&self) -> Result<Vec<Network>, sqlx::Error> {
        let rows = sqlx::query_as::<_, NetworkRow>(indoc! {"
            SELECT id, name, fact_statement_pointer, script_token, chain_index_base_url,
                   active_feeds_url, zero_time, zero_slot, slot_length, last_block_hash,
                   last_checkpoint_slot, is_enabled, ignore_policies
            FROM networks
            ORDER BY id
        "})
        .fetch_all(&self.pool)
        .await?;

        let mut networks = Vec::with_capacity(rows.len());
        for row in rows {
            let policies = self.list_policies(row.id).await?;
            networks.push(row.into_network(policies));
        }
        Ok(networks)
    }

    async fn create_network(&self, network: &Network) -> Result<Network, sqlx::Error> {
        let ignore_policies: Vec<String> = network.ignore_policies.iter().cloned().collect();
        let id: i64 = sqlx::query_scalar(indoc! {"
            INSERT INTO networks (
                name, fact_statement_pointer, script_token, chain_index_base_url,
                active_feeds_url, zero_time, zero_slot, slot_length, last_block_hash,
                last_checkpoint_slot, is_enabled, ignore_policies
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
        "})
        .bind(&network.name)
        .bind(&network.fact_statement_pointer)
        .bind(&network.script_token)
        .bind(&network.chain_index_base_url)
        .bind(&network.active_feeds_url)
        .bind(network.zero_time)
        .bind(network.zero_slot)
        .bind(network.slot_length)
        .bind(&network.last_block_hash)
        .bind(network.last_checkpoint_slot)
        .bind(network.is_enabled)
        .bind(&ignore_policies)
        .fetch_one(&self.pool)
        .await?;

        Ok(Network {
            id,
            ..network.clone()
        })
    }

    async fn update_network(&self, network: &Network) -> Result<(), sqlx::Error> {
        sqlx::query(indoc! {"
            UPDATE networks
            SET last_block_hash = $2, last_checkpoint_slot = $3, is_enabled = $4
            WHERE id = $1
        "})
        .bind(network.id)
        .bind(&network.last_block_hash)
        .bind(network.last_checkpoint_slot)
        .bind(network.is_enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_policies(&self, network: i64) -> Result<Vec<Policy>, sqlx::Error> {
        sqlx::query_as::<_, PolicyRow>(indoc! {"
            SELECT id, network, policy_id, starting_slot, starting_block_hash, starting_date
            FROM policies
            WHERE network = $1
            ORDER BY starting_slot ASC
        "})
        .bind(network)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
    }

    async fn create_policy(&self, policy: &Policy) -> Result<Policy, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(indoc! {"
            INSERT INTO policies (network, policy_id, starting_slot, starting_block_hash, starting_date)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (network, policy_id) DO UPDATE SET policy_id = EXCLUDED.policy_id
            RETURNING id
        "})
        .bind(policy.network)
        .bind(&policy.policy_id)
        .bind(policy.starting_slot)
        .bind(&policy.starting_block_hash)
        .bind(policy.starting_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(Policy {
            id,
            ..policy.clone()
        })
    }

    async fn list_feeds(&self, network: i64) -> Result<Vec<Feed>, sqlx::Error> {
        sqlx::query_as::<_, FeedRow>(indoc! {"
            SELECT id, network, feed_id, type, name, version, status, source_type,
                   funding_type, calculation_method, heartbeat_interval, deviation,
                   base_asset, quote_asset
            FROM feeds
            WHERE network = $1
            ORDER BY id
        "})
        .bind(network)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
    }

    async fn create_feed(&self, feed: &Feed) -> Result<Feed, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(indoc! {"
            INSERT INTO feeds (
                network, feed_id, type, name, version, status, source_type, funding_type,
                calculation_method, heartbeat_interval, deviation, base_asset, quote_asset
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (network, feed_id) DO UPDATE SET feed_id = EXCLUDED.feed_id
            RETURNING id
        "})
        .bind(feed.network)
        .bind(&feed.feed_id)
        .bind(&feed.r#type)
        .bind(&feed.name)
        .bind(&feed.version)
        .bind(feed.status.to_string())
        .bind(feed.source_type.and_then(source_type_str))
        .bind(feed.funding_type.and_then(funding_type_str))
        .bind(&feed.calculation_method)
        .bind(feed.heartbeat_interval)
        .bind(feed.deviation)
        .bind(feed.base_asset)
        .bind(feed.quote_asset)
        .fetch_one(&self.pool)
        .await?;

        Ok(Feed { id, ..feed.clone() })
    }

    async fn update_feed(&self, feed: &Feed) -> Result<(), sqlx::Error> {
        sqlx::query(indoc! {"
            UPDATE feeds
            SET name = $2, source_type = $3, funding_type = $4, calculation_method = $5,
                heartbeat_interval = $6, deviation = $7, status = $8
            WHERE id = $1
        "})
        .bind(feed.id)
        .bind(&feed.name)
        .bind(feed.source_type.and_then(source_type_str))
        .bind(feed.funding_type.and_then(funding_type_str))
        .bind(&feed.calculation_method)
        .bind(feed.heartbeat_interval)
        .bind(feed.deviation)
        .bind(feed.status.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_assets(&self) -> Result<Vec<Asset>, sqlx::Error> {
        sqlx::query_as::<_, AssetRow>(indoc! {"
            SELECT id, ticker, fingerprint, has_xerberus_risk_rating
            FROM assets
            ORDER BY id
        "})
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
    }

    async fn create_asset(&self, asset: &Asset) -> Result<Asset, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(indoc! {"
            INSERT INTO assets (ticker, fingerprint, has_xerberus_risk_rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (ticker) DO UPDATE SET ticker = EXCLUDED.ticker
            RETURNING id
        "})
        .bind(&asset.ticker)
        .bind(&asset.fingerprint)
        .bind(asset.has_xerberus_risk_rating)
        .fetch_one(&self.pool)
        .await?;

        Ok(Asset {
            id,
            ..asset.clone()
        })
    }

    #[trace]
    async fn insert_fact(
        &self,
        fact: &FactStatement,
        tx: &mut SqlxTransaction,
    ) -> Result<InsertOutcome, sqlx::Error> {
        let result = sqlx::query(indoc! {"
            INSERT INTO fact_statements (
                network, feed, policy, fact_urn, storage_urn, transaction_id, block_hash,
                slot, address, output_index, statement_hash, value, value_inverse,
                publication_date, validation_date, publication_cost, datum_hash,
                is_archive_indexed, content_signature, collection_date, participating_nodes, sources
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            ON CONFLICT (network, fact_urn) DO NOTHING
        "})
        .bind(fact.network)
        .bind(fact.feed)
        .bind(fact.policy)
        .bind(&fact.fact_urn)
        .bind(&fact.storage_urn)
        .bind(&fact.transaction_id)
        .bind(&fact.block_hash)
        .bind(fact.slot)
        .bind(&fact.address)
        .bind(fact.output_index)
        .bind(&fact.statement_hash)
        .bind(fact.value)
        .bind(fact.value_inverse)
        .bind(fact.publication_date)
        .bind(fact.validation_date)
        .bind(fact.publication_cost)
        .bind(&fact.datum_hash)
        .bind(fact.is_archive_indexed)
        .bind(&fact.content_signature)
        .bind(fact.collection_date)
        .bind(&fact.participating_nodes)
        .bind(&fact.sources)
        .execute(&mut **tx)
        .await?;

        Ok(if result.rows_affected() == 0 {
            InsertOutcome::AlreadyIndexed
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn update_fact(&self, fact: &FactStatement) -> Result<(), sqlx::Error> {
        sqlx::query(indoc! {"
            UPDATE fact_statements
            SET is_archive_indexed = $2, content_signature = $3, collection_date = $4,
                participating_nodes = $5, sources = $6
            WHERE id = $1
        "})
        .bind(fact.id)
        .bind(fact.is_archive_indexed)
        .bind(&fact.content_signature)
        .bind(fact.collection_date)
        .bind(&fact.participating_nodes)
        .bind(&fact.sources)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_facts_with_slot_greater_than(
        &self,
        network: i64,
        slot: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(indoc! {"
            DELETE FROM fact_statements WHERE network = $1 AND slot > $2
        "})
        .bind(network)
        .bind(slot)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn last_indexed_fact(&self, network: i64) -> Result<Option<FactStatement>, sqlx::Error> {
        sqlx::query_as::<_, FactRow>(indoc! {"
            SELECT id, network, feed, policy, fact_urn, storage_urn, transaction_id, block_hash,
                   slot, address, output_index, statement_hash, value, value_inverse,
                   publication_date, validation_date, publication_cost, datum_hash,
                   is_archive_indexed, content_signature, collection_date, participating_nodes, sources
            FROM fact_statements
            WHERE network = $1
            ORDER BY slot DESC, output_index DESC
            LIMIT 1
        "})
        .bind(network)
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(Into::into))
    }

    async fn list_unarchived_facts(&self, network: i64) -> Result<Vec<FactStatement>, sqlx::Error> {
        sqlx::query_as::<_, FactRow>(indoc! {"
            SELECT id, network, feed, policy, fact_urn, storage_urn, transaction_id, block_hash,
                   slot, address, output_index, statement_hash, value, value_inverse,
                   publication_date, validation_date, publication_cost, datum_hash,
                   is_archive_indexed, content_signature, collection_date, participating_nodes, sources
            FROM fact_statements
            WHERE network = $1 AND is_archive_indexed = FALSE AND storage_urn <> ''
            ORDER BY id
        "})
        .bind(network)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
    }

    async fn list_nodes(&self, network: i64) -> Result<Vec<ArchiveNode>, sqlx::Error> {
        sqlx::query_as::<_, NodeRow>(indoc! {"
            SELECT id, network, node_urn, name, status, type, locality, region, geo
            FROM nodes
            WHERE network = $1
            ORDER BY id
        "})
        .bind(network)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
    }

    async fn create_node(&self, node: &ArchiveNode) -> Result<ArchiveNode, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(indoc! {"
            INSERT INTO nodes (network, node_urn, name, status, type, locality, region, geo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (network, node_urn) DO UPDATE SET node_urn = EXCLUDED.node_urn
            RETURNING id
        "})
        .bind(node.network)
        .bind(&node.node_urn)
        .bind(&node.name)
        .bind(&node.status)
        .bind(node_type_str(node.r#type))
        .bind(&node.locality)
        .bind(&node.region)
        .bind(&node.geo)
        .fetch_one(&self.pool)
        .await?;

        Ok(ArchiveNode { id, ..node.clone() })
    }

    async fn list_sources(&self, network: i64) -> Result<Vec<Source>, sqlx::Error> {
        sqlx::query_as::<_, SourceRow>(indoc! {"
            SELECT id, network, name, type, sender, recipient, status, website, image_path, background_color
            FROM sources
            WHERE network = $1
            ORDER BY id
        "})
        .bind(network)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
    }

    async fn create_source(&self, source: &Source) -> Result<Source, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(indoc! {"
            INSERT INTO sources (network, name, type, sender, recipient, status, website, image_path, background_color)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (network, recipient) DO UPDATE SET recipient = EXCLUDED.recipient
            RETURNING id
        "})
        .bind(source.network)
        .bind(&source.name)
        .bind(source_kind_str(source.r#type))
        .bind(&source.sender)
        .bind(&source.recipient)
        .bind(&source.status)
        .bind(&source.website)
        .bind(&source.image_path)
        .bind(&source.background_color)
        .fetch_one(&self.pool)
        .await?;

        Ok(Source {
            id,
            ..source.clone()
        })
    }

    async fn update_source(&self, source: &Source) -> Result<(), sqlx::Error> {
        sqlx::query(indoc! {"
            UPDATE sources SET status = $2 WHERE id = $1
        "})
        .bind(source.id)
        .bind(&source.status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct NetworkRow {
    id: i64,
    name: String,
    fact_statement_pointer: String,
    script_token: String,
    chain_index_base_url: String,
    active_feeds_url: String,
    zero_time: i64,
    zero_slot: i64,
    slot_length: i64,
    last_block_hash: Option<String>,
    last_checkpoint_slot: Option<i64>,
    is_enabled: bool,
    ignore_policies: Vec<String>,
}

impl NetworkRow {
    fn into_network(self, policies: Vec<Policy>) -> Network {
        Network {
            id: self.id,
            name: self.name,
            fact_statement_pointer: self.fact_statement_pointer,
            script_token: self.script_token,
            chain_index_base_url: self.chain_index_base_url,
            active_feeds_url: self.active_feeds_url,
            zero_time: self.zero_time,
            zero_slot: self.zero_slot,
            slot_length: self.slot_length,
            last_block_hash: self.last_block_hash,
            last_checkpoint_slot: self.last_checkpoint_slot,
            is_enabled: self.is_enabled,
            ignore_policies: self.ignore_policies.into_iter().collect::<HashSet<_>>(),
            policies,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PolicyRow {
    id: i64,
    network: i64,
    policy_id: String,
    starting_slot: i64,
    starting_block_hash: String,
    starting_date: i64,
}

impl From<PolicyRow> for Policy {
    fn from(row: PolicyRow) -> Self {
        Policy {
            id: row.id,
            network: row.network,
            policy_id: row.policy_id,
            starting_slot: row.starting_slot,
            starting_block_hash: row.starting_block_hash,
            starting_date: row.starting_date,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FeedRow {
    id: i64,
    network: i64,
    feed_id: String,
    r#type: String,
    name: String,
    version: String,
    status: String,
    source_type: Option<String>,
    funding_type: Option<String>,
    calculation_method: String,
    heartbeat_interval: i64,
    deviation: f64,
    base_asset: i64,
    quote_asset: i64,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            network: row.network,
            feed_id: row.feed_id,
            r#type: row.r#type,
            name: row.name,
            version: row.version,
            status: if row.status == "active" {
                FeedStatus::Active
            } else {
                FeedStatus::Inactive
            },
            source_type: row.source_type.and_then(|s| match s.as_str() {
                "CEX" => Some(SourceType::Cex),
                "DEX" => Some(SourceType::Dex),
                _ => None,
            }),
            funding_type: row.funding_type.and_then(|f| match f.as_str() {
                "showcase" => Some(FundingType::Showcase),
                "paid" => Some(FundingType::Paid),
                "subsidized" => Some(FundingType::Subsidized),
                _ => None,
            }),
            calculation_method: row.calculation_method,
            heartbeat_interval: row.heartbeat_interval,
            deviation: row.deviation,
            base_asset: row.base_asset,
            quote_asset: row.quote_asset,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AssetRow {
    id: i64,
    ticker: String,
    fingerprint: Option<String>,
    has_xerberus_risk_rating: bool,
}

impl From<AssetRow> for Asset {
    fn from(row: AssetRow) -> Self {
        Asset {
            id: row.id,
            ticker: row.ticker,
            fingerprint: row.fingerprint,
            has_xerberus_risk_rating: row.has_xerberus_risk_rating,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FactRow {
    id: i64,
    network: i64,
    feed: i64,
    policy: i64,
    fact_urn: String,
    storage_urn: String,
    transaction_id: String,
    block_hash: String,
    slot: i64,
    address: String,
    output_index: i32,
    statement_hash: String,
    value: f64,
    value_inverse: f64,
    publication_date: i64,
    validation_date: i64,
    publication_cost: f64,
    datum_hash: String,
    is_archive_indexed: bool,
    content_signature: Option<String>,
    collection_date: Option<i64>,
    participating_nodes: Vec<i64>,
    sources: Vec<i64>,
}

impl From<FactRow> for FactStatement {
    fn from(row: FactRow) -> Self {
        FactStatement {
            id: row.id,
            network: row.network,
            feed: row.feed,
            policy: row.policy,
            fact_urn: row.fact_urn,
            storage_urn: row.storage_urn,
            transaction_id: row.transaction_id,
            block_hash: row.block_hash,
            slot: row.slot,
            address: row.address,
            output_index: row.output_index,
            statement_hash: row.statement_hash,
            value: row.value,
            value_inverse: row.value_inverse,
            publication_date: row.publication_date,
            validation_date: row.validation_date,
            publication_cost: row.publication_cost,
            datum_hash: row.datum_hash,
            is_archive_indexed: row.is_archive_indexed,
            content_signature: row.content_signature,
            collection_date: row.collection_date,
            participating_nodes: row.participating_nodes,
            sources: row.sources,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NodeRow {
    id: i64,
    network: i64,
    node_urn: String,
    name: String,
    status: String,
    r#type: String,
    locality: Option<String>,
    region: Option<String>,
    geo: Option<String>,
}

impl From<NodeRow> for ArchiveNode {
    fn from(row: NodeRow) -> Self {
        ArchiveNode {
            id: row.id,
            network: row.network,
            node_urn: row.node_urn,
            name: row.name,
            status: row.status,
            r#type: node_type_from_str(&row.r#type),
            locality: row.locality,
            region: row.region,
            geo: row.geo,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SourceRow {
    id: i64,
    network: i64,
    name: String,
    r#type: String,
    sender: String,
    recipient: String,
    status: String,
    website: Option<String>,
    image_path: Option<String>,
    background_color: Option<String>,
}

impl From<SourceRow> for Source {
    fn from(row: SourceRow) -> Self {
        Source {
            id: row.id,
            network: row.network,
            name: row.name,
            r#type: source_kind_from_str(&row.r#type),
            sender: row.sender,
            recipient: row.recipient,
            status: row.status,
            website: row.website,
            image_path: row.image_path,
            background_color: row.background_color,
        }
    }
}
