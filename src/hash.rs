// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Content hashing for content-addressed object names.
//!
//! Uses the kustomize/kubectl name hasher's algorithm. For a `ConfigMap` record the suffix is
//! the same one kustomize emits; kustomize's `Secret` record also carries `type`, which the
//! records hashed here leave out, so `Secret` suffixes differ from kustomize's.
//!
//! The hash of a record:
//!
//! 1. Object keys are sorted recursively (arrays keep their order).
//! 2. The record is serialized as compact JSON.
//! 3. The UTF-8 bytes are hashed with SHA-256 and hex encoded.
//! 4. The first 10 hex characters are kept.
//! 5. `0`, `1`, `3`, `a` and `e` are substituted so the suffix cannot spell words.
//!
//! # Example
//!
//! ```rust
//! use k8s_constructs::hash::hash_value;
//! use serde_json::json;
//!
//! assert_eq!(hash_value(&json!({})), "44hk6fmk55");
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::constants::HASH_SUFFIX_LENGTH;

/// Sorts object keys at every nesting level. Arrays keep their element order.
///
/// Entries are re-inserted in sorted order so the result is canonical even when
/// `serde_json` is built with `preserve_order`.
#[must_use]
pub fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(key, value)| (key.clone(), sort_keys(value)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Replaces the hex characters that can form words with safe letters.
///
/// Only the first [`HASH_SUFFIX_LENGTH`] characters of `hex` are encoded.
#[must_use]
pub fn encode_hash(hex: &str) -> String {
    hex.chars()
        .take(HASH_SUFFIX_LENGTH)
        .map(|c| match c {
            '0' => 'g',
            '1' => 'h',
            '3' => 'k',
            'a' => 'm',
            'e' => 't',
            other => other,
        })
        .collect()
}

/// Hashes a JSON value into a 10-character content suffix.
#[must_use]
pub fn hash_value(value: &Value) -> String {
    let canonical = sort_keys(value).to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    encode_hash(&format!("{:x}", hasher.finalize()))
}

/// Hashes any serializable record into a 10-character content suffix.
///
/// # Errors
///
/// Returns an error if the record cannot be represented as JSON (e.g. a map with
/// non-string keys).
pub fn content_hash<T: Serialize>(record: &T) -> Result<String, serde_json::Error> {
    Ok(hash_value(&serde_json::to_value(record)?))
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod hash_tests;
