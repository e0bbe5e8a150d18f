// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

use super::*;
use std::collections::HashMap;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_from_lookup_reads_every_variable() {
    let config = ChartConfig::from_lookup(lookup(&[
        ("APP", "shop"),
        ("ENVIRONMENT", "production"),
        ("REGION", "eu-west-1"),
        ("RELEASE", "2024.06.1"),
        ("NAMESPACE", "shop"),
        ("DOCKER_TAG", "abc123"),
        ("CANARY_STAGE", "post-canary"),
        ("REDACT_SECRETS", "true"),
    ]))
    .unwrap();

    assert_eq!(
        config,
        ChartConfig {
            app: "shop".into(),
            environment: "production".into(),
            region: "eu-west-1".into(),
            release: Some("2024.06.1".into()),
            namespace: Some("shop".into()),
            docker_tag: Some("abc123".into()),
            canary_stage: Some(CanaryStage::PostCanary),
            redact_secrets: true,
        }
    );
}

#[test]
fn test_from_lookup_requires_app() {
    let err = ChartConfig::from_lookup(lookup(&[("ENVIRONMENT", "dev")])).unwrap_err();
    assert_eq!(
        err,
        ConfigError::MissingVariable {
            variable: "APP".into()
        }
    );

    let err = ChartConfig::from_lookup(lookup(&[("APP", "  ")])).unwrap_err();
    assert!(matches!(err, ConfigError::MissingVariable { .. }));
}

#[test]
fn test_from_lookup_defaults() {
    let config = ChartConfig::from_lookup(lookup(&[("APP", "shop")])).unwrap();
    assert_eq!(config, ChartConfig::new("shop"));
    assert!(!config.redact_secrets);
    assert!(config.canary_stage.is_none());
}

#[test]
fn test_from_lookup_rejects_bad_values() {
    let err = ChartConfig::from_lookup(lookup(&[("APP", "shop"), ("CANARY_STAGE", "done")]))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidCanaryStage { .. }));

    let err = ChartConfig::from_lookup(lookup(&[("APP", "shop"), ("REDACT_SECRETS", "maybe")]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Configuration variable REDACT_SECRETS has invalid boolean value 'maybe'"
    );
}

#[test]
fn test_labels_omit_empty_values() {
    let mut config = ChartConfig::new("shop");
    config.environment = "production".into();

    let labels = config.labels();
    assert_eq!(labels.get("app").unwrap(), "shop");
    assert_eq!(labels.get("environment").unwrap(), "production");
    assert!(!labels.contains_key("region"));
    assert!(!labels.contains_key("release"));
    assert_eq!(
        labels.get("app.kubernetes.io/managed-by").unwrap(),
        "k8s-constructs"
    );
}

#[test]
fn test_deserialize_from_yaml() {
    let config: ChartConfig = serde_yaml::from_str(
        "app: shop\nenvironment: staging\nregion: us-east-1\ncanaryStage: base\nredactSecrets: true\n",
    )
    .unwrap();
    assert_eq!(config.canary_stage, Some(CanaryStage::Base));
    assert!(config.redact_secrets);
    assert_eq!(config.region, "us-east-1");
}
