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

//! Feed Catalog Sync (spec.md §4.5).

use crate::{
    domain::{
        feed::{Asset, Feed, FeedStatus, FundingType, SourceType},
        storage::Storage,
    },
    error::IndexerError,
    infra::feed_manifest_client::{FeedManifest, FeedManifestClient, FeedManifestEntry},
};
use log::{info, warn};

fn parse_source_type(source: Option<&str>) -> Option<SourceType> {
    match source?.to_uppercase().as_str() {
        "CEX" => Some(SourceType::Cex),
        "DEX" => Some(SourceType::Dex),
        _ => None,
    }
}

fn parse_funding_type(status: Option<&str>) -> Option<FundingType> {
    match status?.to_lowercase().as_str() {
        "showcase" => Some(FundingType::Showcase),
        "paid" => Some(FundingType::Paid),
        "subsidized" => Some(FundingType::Subsidized),
        _ => None,
    }
}

/// Splits a manifest `label` into `{base, quote}` on `/` or `-` (spec.md §4.5
/// step 2). Exactly two parts are required.
fn split_label(label: &str) -> Result<(&str, &str), IndexerError> {
    let separator = if label.contains('/') {
        '/'
    } else if label.contains('-') {
        '-'
    } else {
        return Err(IndexerError::ProtocolViolation(format!(
            "feed label has no recognized separator: {label}"
        )));
    };

    let mut parts = label.splitn(2, separator);
    let base = parts.next().unwrap_or_default();
    let quote = parts.next().unwrap_or_default();
    if base.is_empty() || quote.is_empty() || parts.next().is_some() {
        return Err(IndexerError::ProtocolViolation(format!(
            "feed label must split into exactly two parts: {label}"
        )));
    }
    Ok((base, quote))
}

async fn ensure_asset(
    storage: &impl Storage,
    assets: &mut Vec<Asset>,
    ticker: &str,
) -> Result<i64, IndexerError> {
    if let Some(existing) = assets
        .iter()
        .find(|asset| asset.ticker.eq_ignore_ascii_case(ticker))
    {
        return Ok(existing.id);
    }

    let created = storage
        .create_asset(&Asset {
            id: 0,
            ticker: ticker.to_owned(),
            fingerprint: None,
            has_xerberus_risk_rating: false,
        })
        .await
        .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
    let id = created.id;
    assets.push(created);
    Ok(id)
}

fn mutable_fields_differ(stored: &Feed, incoming: &Feed) -> bool {
    stored.name != incoming.name
        || stored.source_type != incoming.source_type
        || stored.funding_type != incoming.funding_type
        || stored.calculation_method != incoming.calculation_method
        || stored.heartbeat_interval != incoming.heartbeat_interval
        || stored.deviation != incoming.deviation
}

fn manifest_entry_to_feed(
    network: i64,
    entry: &FeedManifestEntry,
    base_asset: i64,
    quote_asset: i64,
) -> Result<Feed, IndexerError> {
    let feed_id = format!("{}/{}/3", entry.r#type, entry.label);
    Ok(Feed {
        id: 0,
        network,
        feed_id,
        r#type: entry.r#type.clone(),
        name: entry.label.clone(),
        version: "3".to_owned(),
        status: FeedStatus::Active,
        source_type: parse_source_type(entry.source.as_deref()),
        funding_type: parse_funding_type(entry.status.as_deref()),
        calculation_method: entry.calculation.clone(),
        heartbeat_interval: entry.interval,
        deviation: entry.deviation,
        base_asset,
        quote_asset,
    })
}

/// Reconcile the remote feed manifest with stored feed records (spec.md §4.5).
/// Returns the freshly fetched manifest for use as the next tick's cache.
pub async fn sync_feeds(
    storage: &impl Storage,
    client: &FeedManifestClient,
    network: i64,
    active_feeds_url: &str,
    cached_manifest: Option<&FeedManifest>,
) -> Result<FeedManifest, IndexerError> {
    let manifest = client.fetch(active_feeds_url).await?;

    if cached_manifest == Some(&manifest) {
        return Ok(manifest);
    }

    let mut assets = storage
        .list_assets()
        .await
        .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
    let mut stored_feeds = storage
        .list_feeds(network)
        .await
        .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;

    let mut manifest_feed_ids = Vec::with_capacity(manifest.feeds.len());

    for entry in &manifest.feeds {
        let (base_ticker, quote_ticker) = match split_label(&entry.label) {
            Ok(parts) => parts,
            Err(error) => {
                warn!("{error}");
                continue;
            }
        };

        let base_asset = ensure_asset(storage, &mut assets, base_ticker).await?;
        let quote_asset = ensure_asset(storage, &mut assets, quote_ticker).await?;
        let incoming = manifest_entry_to_feed(network, entry, base_asset, quote_asset)?;
        manifest_feed_ids.push(incoming.feed_id.clone());

        match stored_feeds
            .iter_mut()
            .find(|feed| feed.feed_id == incoming.feed_id)
        {
            None => {
                let created = storage
                    .create_feed(&incoming)
                    .await
                    .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
                info!(feed_id = created.feed_id; "created feed");
                stored_feeds.push(created);
            }
            Some(stored) if mutable_fields_differ(stored, &incoming) => {
                let updated = Feed {
                    id: stored.id,
                    status: stored.status,
                    ..incoming
                };
                storage
                    .update_feed(&updated)
                    .await
                    .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
                *stored = updated;
            }
            Some(_) => {}
        }
    }

    for feed in stored_feeds
        .iter_mut()
        .filter(|feed| feed.status == FeedStatus::Active)
        .filter(|feed| !manifest_feed_ids.contains(&feed.feed_id))
    {
        feed.status = FeedStatus::Inactive;
        storage
            .update_feed(feed)
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
        info!(feed_id = feed.feed_id; "deactivated feed absent from manifest");
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_label_on_slash_or_dash() {
        assert_eq!(split_label("ADA/USD").unwrap(), ("ADA", "USD"));
        assert_eq!(split_label("ADA-USD").unwrap(), ("ADA", "USD"));
        assert!(split_label("ADAUSD").is_err());
    }

    #[test]
    fn feed_id_uses_fixed_version_three() {
        let entry = FeedManifestEntry {
            pair: "ADA/USD".to_owned(),
            label: "ADA-USD".to_owned(),
            interval: 60,
            deviation: 0.01,
            source: Some("cex".to_owned()),
            calculation: "median".to_owned(),
            status: Some("showcase".to_owned()),
            r#type: "CER".to_owned(),
        };
        let feed = manifest_entry_to_feed(1, &entry, 10, 20).unwrap();
        assert_eq!(feed.feed_id, "CER/ADA-USD/3");
    }
}
