// Copyright (c) 2026 Aura PoCA Contributors
// SPDX-License-Identifier: Apache-2.0

//! Canonical serialization shared by the audit chain and the certificate
//! generator. Canonical form is the compact JSON encoding of the value with
//! all object keys sorted recursively; numeric formatting is serde_json's
//! shortest-round-trip rendering. Two independent serializations of the same
//! value are byte-identical, so hashes over canonical bytes are stable.

use crate::error::AuraResult;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub fn canonical_json(v: &impl Serialize) -> AuraResult<Vec<u8>> {
    let value = serde_json::to_value(v)?;
    let sorted = sort_json(value);
    Ok(serde_json::to_vec(&sorted)?)
}

fn sort_json(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, val) in entries {
                sorted.insert(k, sort_json(val));
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json).collect()),
        other => other,
    }
}

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(bytes);
    h.finalize().into()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(sha256(bytes))
}
