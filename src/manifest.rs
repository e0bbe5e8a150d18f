// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Multi-document YAML manifests.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::workload::ManifestObject;

/// Parses every non-empty document of a YAML stream. JSON input is accepted as YAML.
///
/// # Errors
///
/// Returns an error naming the 1-based document index that fails to parse.
pub fn parse_documents(text: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = Value::deserialize(document)
            .with_context(|| format!("Failed to parse document {}", index + 1))?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Parses a YAML stream into typed manifest objects.
///
/// # Errors
///
/// Returns an error if a document is not valid YAML or does not match its kind.
pub fn parse_objects(text: &str) -> Result<Vec<ManifestObject>> {
    parse_documents(text)?
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            ManifestObject::from_value(value)
                .with_context(|| format!("Invalid object in document {}", index + 1))
        })
        .collect()
}

/// Renders values as a multi-document YAML stream.
///
/// # Errors
///
/// Returns an error if a value cannot be serialized.
pub fn render_documents(values: &[Value]) -> Result<String> {
    let mut out = String::new();
    for value in values {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(value).context("Failed to render document")?);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod manifest_tests;
