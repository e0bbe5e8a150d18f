// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `manifest.rs`

use super::*;

const MANIFEST: &str = r"
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
data:
  LOG_LEVEL: info
---
---
apiVersion: batch/v1
kind: Job
metadata:
  name: migrate
spec:
  template:
    spec:
      restartPolicy: Never
      containers:
        - name: migrate
          image: shop/migrate
";

#[test]
fn test_empty_documents_are_skipped() {
    let documents = parse_documents(MANIFEST).unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0]["kind"], "ConfigMap");
    assert_eq!(documents[1]["metadata"]["name"], "migrate");
}

#[test]
fn test_parse_objects_types_each_document() {
    let objects = parse_objects(MANIFEST).unwrap();
    assert!(matches!(objects[0], ManifestObject::Other { .. }));
    assert!(matches!(objects[1], ManifestObject::Job(_)));
}

#[test]
fn test_invalid_yaml_names_document() {
    let err = parse_documents("kind: Pod\n---\nkind: [unclosed\n").unwrap_err();
    assert!(err.to_string().starts_with("Failed to parse document"));
}

#[test]
fn test_object_without_kind_names_document() {
    let err = parse_objects("kind: ConfigMap\n---\nmetadata: {}\n").unwrap_err();
    assert_eq!(err.to_string(), "Invalid object in document 2");
}

#[test]
fn test_render_documents() {
    let values = vec![
        serde_json::json!({ "kind": "Service" }),
        serde_json::json!({ "kind": "Ingress" }),
    ];
    let rendered = render_documents(&values).unwrap();
    assert_eq!(rendered, "---\nkind: Service\n---\nkind: Ingress\n");
    assert_eq!(parse_documents(&rendered).unwrap(), values);
}
