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

//! Datum Decoder (spec.md §4.3). Decodes a CBOR-encoded Plutus datum into a typed
//! [`CurrencyPairDatum`]. CBOR tag 121 (and any other tag nested inside the
//! structure) is treated as a transparent wrapper around its payload, matching the
//! source's "any nested tagged element is replaced by its value" rule.

use crate::error::IndexerError;
use minicbor::{data::Type, Decoder};
use regex::Regex;
use std::sync::OnceLock;

/// A decoded oracle price datum (spec.md §4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyPairDatum {
    pub feed_id: String,
    pub feed_type: String,
    pub feed_name: String,
    pub feed_version: String,
    pub base_ticker: String,
    pub quote_ticker: String,
    pub validation_date: i64,
    /// Raw hex of the CBOR region occupied by the outermost sequence's first
    /// element. See spec.md §9: this field shape is CBOR-implementation-sensitive
    /// and is preserved literally rather than reinterpreted.
    pub datum_hash: String,
    pub value: f64,
    pub inverse_value: f64,
}

/// An untagged CBOR value tree: every tag encountered while decoding is stripped
/// and replaced by the value it wraps, per spec.md §4.3.
#[derive(Debug, Clone)]
enum Cbor {
    Int(i128),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Cbor>),
    Map(Vec<(Cbor, Cbor)>),
    Bool(bool),
    Null,
}

fn decode_value(d: &mut Decoder) -> Result<Cbor, IndexerError> {
    let ty = d
        .datatype()
        .map_err(|error| IndexerError::ProtocolViolation(format!("cbor datatype: {error}")))?;

    match ty {
        Type::Tag => {
            d.tag()
                .map_err(|error| IndexerError::ProtocolViolation(format!("cbor tag: {error}")))?;
            // Transparent wrapper: recurse into whatever the tag wraps.
            decode_value(d)
        }
        Type::Array | Type::ArrayIndef => {
            let len = d
                .array()
                .map_err(|error| IndexerError::ProtocolViolation(format!("cbor array: {error}")))?;
            let mut items = Vec::new();
            match len {
                Some(len) => {
                    for _ in 0..len {
                        items.push(decode_value(d)?);
                    }
                }
                None => {
                    while d.datatype().map(|t| t != Type::Break).unwrap_or(false) {
                        items.push(decode_value(d)?);
                    }
                    d.skip().ok();
                }
            }
            Ok(Cbor::Array(items))
        }
        Type::Map | Type::MapIndef => {
            let len = d
                .map()
                .map_err(|error| IndexerError::ProtocolViolation(format!("cbor map: {error}")))?;
            let mut items = Vec::new();
            match len {
                Some(len) => {
                    for _ in 0..len {
                        let k = decode_value(d)?;
                        let v = decode_value(d)?;
                        items.push((k, v));
                    }
                }
                None => {
                    while d.datatype().map(|t| t != Type::Break).unwrap_or(false) {
                        let k = decode_value(d)?;
                        let v = decode_value(d)?;
                        items.push((k, v));
                    }
                    d.skip().ok();
                }
            }
            Ok(Cbor::Map(items))
        }
        Type::Bytes | Type::BytesIndef => Ok(Cbor::Bytes(
            d.bytes()
                .map_err(|error| IndexerError::ProtocolViolation(format!("cbor bytes: {error}")))?
                .to_vec(),
        )),
        Type::String | Type::StringIndef => Ok(Cbor::Text(
            d.str()
                .map_err(|error| IndexerError::ProtocolViolation(format!("cbor str: {error}")))?
                .to_owned(),
        )),
        Type::Bool => Ok(Cbor::Bool(d.bool().map_err(|error| {
            IndexerError::ProtocolViolation(format!("cbor bool: {error}"))
        })?)),
        Type::Null | Type::Undefined => {
            d.skip().ok();
            Ok(Cbor::Null)
        }
        Type::U8 | Type::U16 | Type::U32 | Type::U64 => Ok(Cbor::Int(
            d.u64()
                .map_err(|error| IndexerError::ProtocolViolation(format!("cbor uint: {error}")))?
                as i128,
        )),
        Type::I8 | Type::I16 | Type::I32 | Type::I64 => Ok(Cbor::Int(
            d.i64()
                .map_err(|error| IndexerError::ProtocolViolation(format!("cbor int: {error}")))?
                as i128,
        )),
        other => Err(IndexerError::ProtocolViolation(format!(
            "unsupported cbor type in datum: {other:?}"
        ))),
    }
}

impl Cbor {
    fn as_array(&self) -> Result<&[Cbor], IndexerError> {
        match self {
            Cbor::Array(items) => Ok(items),
            other => Err(IndexerError::ProtocolViolation(format!(
                "expected cbor array, got {other:?}"
            ))),
        }
    }

    fn as_bytes(&self) -> Result<&[u8], IndexerError> {
        match self {
            Cbor::Bytes(bytes) => Ok(bytes),
            other => Err(IndexerError::ProtocolViolation(format!(
                "expected cbor bytes, got {other:?}"
            ))),
        }
    }

    fn as_int(&self) -> Result<i128, IndexerError> {
        match self {
            Cbor::Int(value) => Ok(*value),
            other => Err(IndexerError::ProtocolViolation(format!(
                "expected cbor int, got {other:?}"
            ))),
        }
    }
}

fn feed_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^/]+/[^/]+-[^/]+/[^/]+$").expect("static regex"))
}

/// `formattedValue = value < 1e-6 ? round(value, 10) : round(value, 6)`. These
/// rounding boundaries are contractual and must match bit-for-bit (spec.md §4.3).
fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

fn formatted_value(value: f64) -> f64 {
    if value.abs() < 1e-6 {
        round_to(value, 10)
    } else {
        round_to(value, 6)
    }
}

/// Decode a hex-encoded CBOR Plutus datum into a [`CurrencyPairDatum`].
pub fn decode_datum(hex_datum: &str) -> Result<CurrencyPairDatum, IndexerError> {
    let bytes = hex::decode(hex_datum)
        .map_err(|error| IndexerError::ProtocolViolation(format!("invalid datum hex: {error}")))?;

    let mut decoder = Decoder::new(&bytes);
    let outer = decode_value(&mut decoder)?;
    let outer = outer.as_array()?;

    if outer.len() != 2 {
        return Err(IndexerError::ProtocolViolation(format!(
            "expected a 2-tuple [body, signature_group], got {} elements",
            outer.len()
        )));
    }

    let body = outer[0].as_array()?;
    let signature_group = outer[1].as_array()?;
    if !(1..=2).contains(&signature_group.len()) {
        return Err(IndexerError::ProtocolViolation(format!(
            "signature group must have 1 or 2 elements, got {}",
            signature_group.len()
        )));
    }

    if body.len() != 3 {
        return Err(IndexerError::ProtocolViolation(format!(
            "expected [feed_id, validation_ts, [numerator, denominator]], got {} elements",
            body.len()
        )));
    }

    let feed_id_bytes = body[0].as_bytes()?;
    let feed_id = String::from_utf8(feed_id_bytes.to_vec())
        .map_err(|error| IndexerError::ProtocolViolation(format!("feed_id not utf8: {error}")))?;
    let validation_date = body[1].as_int()? as i64;

    let pair = body[2].as_array()?;
    if pair.len() != 2 {
        return Err(IndexerError::ProtocolViolation(format!(
            "expected [numerator, denominator], got {} elements",
            pair.len()
        )));
    }
    let numerator = pair[0].as_int()? as f64;
    let denominator = pair[1].as_int()? as f64;
    if denominator == 0.0 {
        return Err(IndexerError::ProtocolViolation(
            "datum denominator is zero".to_owned(),
        ));
    }

    if !feed_id_pattern().is_match(&feed_id) {
        return Err(IndexerError::ProtocolViolation(format!(
            "feed_id does not match expected shape: {feed_id}"
        )));
    }
    let mut slash_parts = feed_id.splitn(3, '/');
    let feed_type = slash_parts.next().unwrap_or_default().to_owned();
    let label = slash_parts.next().unwrap_or_default().to_owned();
    let feed_version = slash_parts.next().unwrap_or_default().to_owned();
    let mut dash_parts = label.splitn(2, '-');
    let base_ticker = dash_parts.next().unwrap_or_default().to_owned();
    let quote_ticker = dash_parts.next().unwrap_or_default().to_owned();

    let value = numerator / denominator;
    let formatted = formatted_value(value);
    let inverse_value = 1.0 / formatted;

    // datum_hash: the raw, as-returned first element of the outermost decoded
    // sequence (spec.md §4.3, §9). Re-encoding the parsed body back to CBOR and
    // hex-encoding it is the closest a statically typed rewrite can come to "as
    // returned by the decoder" without golden chain samples to pin the exact
    // byte-for-byte original encoding.
    let mut reencoded = Vec::new();
    encode_value(&outer[0], &mut reencoded);
    let datum_hash = hex::encode(reencoded);

    Ok(CurrencyPairDatum {
        feed_id,
        feed_type,
        feed_name: label,
        feed_version,
        base_ticker,
        quote_ticker,
        validation_date,
        datum_hash,
        value,
        inverse_value,
    })
}

fn encode_value(value: &Cbor, out: &mut Vec<u8>) {
    let mut encoder = minicbor::Encoder::new(out);
    encode_into(value, &mut encoder);
}

fn encode_into<W: minicbor::encode::Write>(value: &Cbor, encoder: &mut minicbor::Encoder<W>) {
    match value {
        Cbor::Int(v) => {
            let _ = encoder.i64(*v as i64);
        }
        Cbor::Bytes(bytes) => {
            let _ = encoder.bytes(bytes);
        }
        Cbor::Text(text) => {
            let _ = encoder.str(text);
        }
        Cbor::Bool(b) => {
            let _ = encoder.bool(*b);
        }
        Cbor::Null => {
            let _ = encoder.null();
        }
        Cbor::Array(items) => {
            let _ = encoder.array(items.len() as u64);
            for item in items {
                encode_into(item, encoder);
            }
        }
        Cbor::Map(items) => {
            let _ = encoder.map(items.len() as u64);
            for (k, v) in items {
                encode_into(k, encoder);
                encode_into(v, encoder);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_s1_sample() -> String {
        // [ [ b"CER/ADA-USD/3", 1700000000000, [5, 20000000] ], [ bytes(32) ] ]
        let mut buf = Vec::new();
        {
            let mut e = minicbor::Encoder::new(&mut buf);
            e.tag(minicbor::data::Tag::new(121)).unwrap();
            e.array(2).unwrap();
            e.array(3).unwrap();
            e.bytes(b"CER/ADA-USD/3").unwrap();
            e.i64(1_700_000_000_000).unwrap();
            e.array(2).unwrap();
            e.u32(5).unwrap();
            e.u32(20_000_000).unwrap();
            e.array(1).unwrap();
            e.bytes(&[7u8; 32]).unwrap();
        }
        hex::encode(buf)
    }

    #[test]
    fn s1_datum_decoding_scenario() {
        let hex_datum = encode_s1_sample();
        let datum = decode_datum(&hex_datum).expect("datum decodes");

        assert_eq!(datum.base_ticker, "ADA");
        assert_eq!(datum.quote_ticker, "USD");
        assert_eq!(datum.feed_version, "3");
        assert_eq!(datum.feed_type, "CER");
        assert_eq!(datum.value, 2.5e-7);
        assert_eq!(datum.inverse_value, 4_000_000.0);
    }

    #[test]
    fn rounding_boundary_switches_at_1e_minus_6() {
        assert_eq!(formatted_value(2.5e-7), round_to(2.5e-7, 10));
        assert_eq!(formatted_value(1.5e-5), round_to(1.5e-5, 6));
    }

    #[test]
    fn rejects_feed_id_with_wrong_shape() {
        let mut buf = Vec::new();
        {
            let mut e = minicbor::Encoder::new(&mut buf);
            e.array(2).unwrap();
            e.array(3).unwrap();
            e.bytes(b"not-a-valid-feed-id").unwrap();
            e.i64(1).unwrap();
            e.array(2).unwrap();
            e.u32(1).unwrap();
            e.u32(1).unwrap();
            e.array(1).unwrap();
            e.bytes(&[0u8; 32]).unwrap();
        }
        let result = decode_datum(&hex::encode(buf));
        assert!(matches!(result, Err(IndexerError::ProtocolViolation(_))));
    }
}
