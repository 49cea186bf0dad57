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

//! Archive Indexer (spec.md §4.9): resolves each fact's Arweave archival
//! package into node/source records and marks the fact archived. Bounded to
//! 5 concurrent fact workers (spec.md §5).

use crate::{
    domain::{
        fact::FactStatement,
        node_record::{ArchiveNode, NodeType},
        source::{Source, SourceKind},
        storage::Storage,
    },
    error::IndexerError,
    infra::archive_client::{ArchiveClient, ArchiveEntry},
};
use chrono::DateTime;
use futures::stream::{self, StreamExt};
use log::{info, warn};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationFile {
    is_based_on: ValidationIsBasedOn,
    contributor: ValidationContributor,
    additional_type: Vec<ValidationAdditionalType>,
}

#[derive(Debug, Deserialize)]
struct ValidationIsBasedOn {
    identifier: String,
}

#[derive(Debug, Deserialize, Default)]
struct ValidationContributor {
    name: Option<String>,
    locality: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationAdditionalType {
    recorded_in: ValidationRecordedIn,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationRecordedIn {
    description: ValidationDescription,
    has_part: Vec<ValidationHasPart>,
}

#[derive(Debug, Deserialize)]
struct ValidationDescription {
    sha256: String,
}

#[derive(Debug, Deserialize)]
struct ValidationHasPart {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FactSourceMessage {
    is_based_on: SourceIsBasedOn,
    sender: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceIsBasedOn {
    additional_type: Option<String>,
}

fn source_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"-([\w]+?)(?:\.tick_|-\d{4}-\d{2}-\d{2}T)").expect("static regex")
    })
}

fn extract_source_name(basename: &str) -> Option<String> {
    source_name_pattern()
        .captures(basename)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_owned())
}

fn normalize_sender(sender: &str) -> String {
    if let Some(rest) = sender.strip_prefix("https://") {
        if let Some((host, _)) = rest.split_once('/') {
            return format!("https//{host}");
        }
        return format!("https//{rest}");
    }
    sender.to_owned()
}

fn parse_collection_date(text: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

async fn ensure_node(
    storage: &impl Storage,
    nodes: &mut Vec<ArchiveNode>,
    network: i64,
    validation: &ValidationFile,
) -> Result<i64, IndexerError> {
    if let Some(existing) = nodes
        .iter()
        .find(|node| node.node_urn == validation.is_based_on.identifier)
    {
        return Ok(existing.id);
    }

    let created = storage
        .create_node(&ArchiveNode {
            id: 0,
            network,
            node_urn: validation.is_based_on.identifier.clone(),
            name: validation.contributor.name.clone().unwrap_or_default(),
            status: "active".to_owned(),
            r#type: NodeType::Federated,
            locality: validation.contributor.locality.clone(),
            region: None,
            geo: None,
        })
        .await
        .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
    let id = created.id;
    nodes.push(created);
    Ok(id)
}

/// Resolves the source record for one `message-*` archive entry, applying the
/// reuse/rotate/create rules of spec.md §4.9 step 4 (scenario S6).
async fn ensure_source(
    storage: &impl Storage,
    sources: &mut Vec<Source>,
    network: i64,
    name: &str,
    kind: SourceKind,
    sender: &str,
    recipient: &str,
) -> Result<i64, IndexerError> {
    if let Some(existing) = sources.iter().find(|source| source.recipient == recipient) {
        return Ok(existing.id);
    }

    if let Some(position) = sources
        .iter()
        .position(|s| s.name == name && s.r#type == kind && s.sender == sender)
    {
        let prior = sources[position].clone();
        let mut deactivated = prior.clone();
        deactivated.status = "inactive".to_owned();
        storage
            .update_source(&deactivated)
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
        sources[position] = deactivated;

        let created = storage
            .create_source(&Source {
                id: 0,
                network,
                name: name.to_owned(),
                r#type: kind,
                sender: sender.to_owned(),
                recipient: recipient.to_owned(),
                status: "active".to_owned(),
                website: prior.website.clone(),
                image_path: prior.image_path.clone(),
                background_color: prior.background_color.clone(),
            })
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
        let id = created.id;
        info!(recipient, name; "rotated source to new recipient");
        sources.push(created);
        return Ok(id);
    }

    let created = storage
        .create_source(&Source {
            id: 0,
            network,
            name: name.to_owned(),
            r#type: kind,
            sender: sender.to_owned(),
            recipient: recipient.to_owned(),
            status: "active".to_owned(),
            website: None,
            image_path: None,
            background_color: None,
        })
        .await
        .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
    let id = created.id;
    sources.push(created);
    Ok(id)
}

/// Processes one unarchived fact end to end. Failures mark only this fact
/// unprocessable for the tick; the caller does not propagate the error.
async fn process_fact(
    storage: &impl Storage,
    archive_client: &ArchiveClient,
    network: i64,
    nodes: &tokio::sync::Mutex<Vec<ArchiveNode>>,
    sources: &tokio::sync::Mutex<Vec<Source>>,
    mut fact: FactStatement,
) -> Result<(), IndexerError> {
    let entries = archive_client.fetch_bundle(&fact.storage_urn).await?;

    let validation_entry = entries
        .iter()
        .find(|entry| entry.name().contains("validation-"))
        .ok_or_else(|| IndexerError::PermanentArchiveError("missing validation-* entry".into()))?;
    let ArchiveEntry::Json { value, .. } = validation_entry else {
        return Err(IndexerError::PermanentArchiveError(
            "validation entry is not json".into(),
        ));
    };
    let validation: ValidationFile = serde_json::from_value(value.clone())
        .map_err(|error| IndexerError::PermanentArchiveError(error.to_string()))?;

    let node_id = {
        let mut nodes = nodes.lock().await;
        ensure_node(storage, &mut nodes, network, &validation).await?
    };

    let mut source_ids = Vec::new();
    for entry in entries
        .iter()
        .filter(|entry| entry.name().contains("message-"))
    {
        let ArchiveEntry::Json { name, value } = entry else {
            continue;
        };
        let Some(source_name) = extract_source_name(name) else {
            warn!(entry = name; "could not extract source name from message entry");
            continue;
        };
        let message: FactSourceMessage = match serde_json::from_value(value.clone()) {
            Ok(message) => message,
            Err(error) => {
                warn!(entry = name; "message entry failed to parse: {error}");
                continue;
            }
        };

        let kind = if message.is_based_on.additional_type.as_deref() == Some("Central Exchange Data")
        {
            SourceKind::CexApi
        } else {
            SourceKind::DexLp
        };
        let sender = normalize_sender(&message.sender);
        let recipient = format!("{}:{}", fact.fact_urn, source_name);

        let mut sources = sources.lock().await;
        let source_id =
            ensure_source(storage, &mut sources, network, &source_name, kind, &sender, &recipient)
                .await?;
        source_ids.push(source_id);
    }

    let recorded_in = validation
        .additional_type
        .first()
        .ok_or_else(|| IndexerError::PermanentArchiveError("additionalType[0] missing".into()))?;
    let content_signature = recorded_in.recorded_in.description.sha256.clone();
    let collection_text = recorded_in
        .recorded_in
        .has_part
        .first()
        .ok_or_else(|| IndexerError::PermanentArchiveError("hasPart[0] missing".into()))?
        .text
        .clone();
    let collection_date = parse_collection_date(&collection_text);

    fact.content_signature = Some(content_signature);
    fact.collection_date = collection_date;
    fact.participating_nodes = vec![node_id];
    fact.sources = source_ids;
    fact.is_archive_indexed = true;

    storage
        .update_fact(&fact)
        .await
        .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
    Ok(())
}

/// Archives every unarchived fact for `network` with at most `concurrency`
/// simultaneous workers.
pub async fn index_archives(
    storage: &impl Storage,
    archive_client: &ArchiveClient,
    network: i64,
    concurrency: usize,
) -> Result<(), IndexerError> {
    let facts = storage
        .list_unarchived_facts(network)
        .await
        .map_err(|error| IndexerError::TransientFetch(error.to_string()))?;
    if facts.is_empty() {
        return Ok(());
    }

    let nodes = tokio::sync::Mutex::new(
        storage
            .list_nodes(network)
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?,
    );
    let sources = tokio::sync::Mutex::new(
        storage
            .list_sources(network)
            .await
            .map_err(|error| IndexerError::TransientFetch(error.to_string()))?,
    );

    let processed = facts.len();
    stream::iter(facts)
        .for_each_concurrent(concurrency.max(1), |fact| {
            let fact_urn = fact.fact_urn.clone();
            async move {
                match process_fact(storage, archive_client, network, &nodes, &sources, fact).await {
                    Ok(()) => info!(fact_urn; "fact archived"),
                    Err(error) => warn!(fact_urn; "archive indexing failed: {error}"),
                }
            }
        })
        .await;

    info!(network, processed; "archive indexing tick complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_source_name_before_tick_suffix() {
        assert_eq!(
            extract_source_name("message-kraken.tick_20240101.json"),
            Some("kraken".to_owned())
        );
    }

    #[test]
    fn extracts_source_name_before_date_suffix() {
        assert_eq!(
            extract_source_name("message-kraken-2024-01-01T00:00:00.json"),
            Some("kraken".to_owned())
        );
    }

    #[test]
    fn normalizes_https_sender_to_protocol_and_host() {
        assert_eq!(
            normalize_sender("https://api.kraken.com/whatever"),
            "https//api.kraken.com"
        );
    }
}
