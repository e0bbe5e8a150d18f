// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `data_store.rs`

use super::*;
use std::io::Write;

fn config_map(name: &str) -> NamedConfigMap {
    NamedConfigMap::new(
        &["chart", "config"],
        ConfigMapProps {
            name: Some(name.into()),
            ..Default::default()
        },
    )
    .unwrap()
}

fn secret(name: &str, redact: bool) -> NamedSecret {
    NamedSecret::new(
        &["chart", "secret"],
        SecretProps {
            name: Some(name.into()),
            redact,
            ..Default::default()
        },
    )
    .unwrap()
}

#[test]
fn test_config_map_name_matches_kustomize_hash() {
    let mut cm = config_map("my-config");
    cm.set_data("foo", "bar").unwrap();
    assert_eq!(cm.resolve_name(), "my-config-hg568khh4t");
}

#[test]
fn test_empty_config_map_name() {
    let cm = config_map("my-config");
    assert_eq!(cm.resolve_name(), "my-config-4k58hgk4mb");
}

#[test]
fn test_binary_data_is_hashed_when_present() {
    let mut cm = config_map("my-config");
    cm.set_data("foo", "bar").unwrap();
    cm.set_binary_data("bin", "AQID").unwrap();
    assert_eq!(cm.resolve_name(), "my-config-dmt5h8bb2m");
}

#[test]
fn test_secret_name_is_pinned() {
    let mut s = secret("creds", false);
    s.set_data("password", "hunter2").unwrap();
    assert_eq!(s.data().get("password").unwrap(), "aHVudGVyMg==");
    assert_eq!(s.resolve_name(), "creds-mc67bt9h8h");
}

#[test]
fn test_name_is_independent_of_insertion_order() {
    let mut first = config_map("settings");
    first.set_data("a", "1").unwrap();
    first.set_data("b", "2").unwrap();

    let mut second = config_map("settings");
    second.set_data("b", "2").unwrap();
    second.set_data("a", "1").unwrap();

    assert_eq!(first.resolve_name(), second.resolve_name());
}

#[test]
fn test_mutation_invalidates_cached_hash() {
    let mut cm = config_map("settings");
    cm.set_data("LOG_LEVEL", "info").unwrap();
    let before = cm.resolve_name();
    assert_eq!(before, cm.resolve_name(), "resolution must be idempotent");

    cm.set_data("LOG_LEVEL", "debug").unwrap();
    let after = cm.resolve_name();
    assert_ne!(before, after);

    cm.set_data("LOG_LEVEL", "info").unwrap();
    assert_eq!(before, cm.resolve_name(), "same content, same name");
}

#[test]
fn test_data_then_binary_data_collides() {
    let mut cm = config_map("settings");
    cm.set_data("k", "v").unwrap();
    let err = cm.set_binary_data("k", "AQID").unwrap_err();
    assert!(matches!(
        err,
        DataStoreError::KeyCollision { ref key, bucket: DataBucket::Data } if key == "k"
    ));
    assert_eq!(err.to_string(), "Key 'k' is already used in data");
}

#[test]
fn test_binary_data_then_data_collides() {
    let mut cm = config_map("settings");
    cm.set_binary_data("k", "AQID").unwrap();
    let err = cm.set_data("k", "v").unwrap_err();
    assert_eq!(err.to_string(), "Key 'k' is already used in binaryData");
}

#[test]
fn test_secret_string_data_collisions() {
    let mut s = secret("creds", false);
    s.set_string_data("token", "abc").unwrap();
    let err = s.set_data("token", "abc").unwrap_err();
    assert_eq!(err.to_string(), "Key 'token' is already used in stringData");

    s.set_data("password", "x").unwrap();
    let err = s.set_string_data("password", "x").unwrap_err();
    assert_eq!(err.to_string(), "Key 'password' is already used in data");
}

#[test]
fn test_seeded_props_collision_fails() {
    let mut props = ConfigMapProps::default();
    props.data.insert("k".into(), "v".into());
    props.binary_data.insert("k".into(), "AQID".into());
    assert!(NamedConfigMap::new(&["chart", "cfg"], props).is_err());
}

#[test]
fn test_invalid_binary_data_is_rejected() {
    let mut cm = config_map("settings");
    let err = cm.set_binary_data("bin", "not base64!").unwrap_err();
    assert!(matches!(err, DataStoreError::InvalidBase64 { .. }));
}

#[test]
fn test_prunable_label_follows_suffixing() {
    let cm = config_map("settings");
    assert_eq!(cm.store().labels().get("prunable").unwrap(), "true");

    let stable = NamedConfigMap::new(
        &["chart", "config"],
        ConfigMapProps {
            name: Some("settings".into()),
            disable_name_suffix_hash: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(!stable.store().labels().contains_key("prunable"));
    assert_eq!(stable.resolve_name(), "settings");
}

#[test]
fn test_generated_base_name_when_unnamed() {
    let cm = NamedConfigMap::new(&["shop", "settings"], ConfigMapProps::default()).unwrap();
    assert_eq!(cm.store().base_name(), dns_label(&["shop", "settings"]));
    assert!(cm
        .resolve_name()
        .starts_with(&format!("{}-", dns_label(&["shop", "settings"]))));
}

#[test]
fn test_to_config_map() {
    let mut props = ConfigMapProps {
        name: Some("settings".into()),
        namespace: Some("shop".into()),
        ..Default::default()
    };
    props.labels.insert("app".into(), "shop".into());
    let mut cm = NamedConfigMap::new(&["shop", "settings"], props).unwrap();
    cm.set_data("LOG_LEVEL", "info").unwrap();
    cm.set_binary_data("blob", "AQID").unwrap();

    let object = cm.to_config_map().unwrap();
    assert_eq!(object.metadata.name, Some(cm.resolve_name()));
    assert_eq!(object.metadata.namespace.as_deref(), Some("shop"));
    let labels = object.metadata.labels.unwrap();
    assert_eq!(labels.get("app").unwrap(), "shop");
    assert_eq!(labels.get("prunable").unwrap(), "true");
    assert_eq!(object.data.unwrap().get("LOG_LEVEL").unwrap(), "info");
    assert_eq!(
        object.binary_data.unwrap().get("blob").unwrap().0,
        vec![1_u8, 2, 3]
    );
}

#[test]
fn test_secret_redaction_masks_encoded_value() {
    let mut s = secret("creds", true);
    s.set_data("password", "hunter2").unwrap();
    // "hunter2" encodes to 12 characters.
    assert_eq!(s.data().get("password").unwrap(), "************");

    s.set_string_data("token", "abc").unwrap();
    assert_eq!(s.string_data().get("token").unwrap(), "***");
}

#[test]
fn test_secret_manifest() {
    let mut s = NamedSecret::new(
        &["shop", "creds"],
        SecretProps {
            name: Some("creds".into()),
            namespace: Some("shop".into()),
            type_: Some("kubernetes.io/basic-auth".into()),
            ..Default::default()
        },
    )
    .unwrap();
    s.set_data("password", "hunter2").unwrap();
    s.set_encoded_data("username", "YWRtaW4=").unwrap();

    let manifest = s.to_manifest();
    assert_eq!(manifest["apiVersion"], "v1");
    assert_eq!(manifest["kind"], "Secret");
    assert_eq!(manifest["type"], "kubernetes.io/basic-auth");
    assert_eq!(manifest["metadata"]["name"], s.resolve_name());
    assert_eq!(manifest["metadata"]["namespace"], "shop");
    assert_eq!(manifest["data"]["password"], "aHVudGVyMg==");
    assert_eq!(manifest["data"]["username"], "YWRtaW4=");
    assert!(manifest.get("stringData").is_none());
}

#[test]
fn test_secret_defaults_to_opaque() {
    let s = secret("creds", false);
    assert_eq!(s.to_manifest()["type"], "Opaque");
}

#[test]
fn test_set_file_uses_file_name_as_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nginx.conf");
    std::fs::write(&path, "worker_processes 1;\n").unwrap();

    let mut cm = config_map("settings");
    cm.set_file(&path, None).unwrap();
    cm.set_file(&path, Some("custom.conf")).unwrap();
    assert_eq!(cm.data().get("nginx.conf").unwrap(), "worker_processes 1;\n");
    assert_eq!(cm.data().get("custom.conf").unwrap(), "worker_processes 1;\n");
}

#[test]
fn test_set_binary_file_encodes_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logo.bin");
    std::fs::write(&path, [1_u8, 2, 3]).unwrap();

    let mut cm = config_map("settings");
    cm.set_binary_file(&path, None).unwrap();
    assert_eq!(cm.binary_data().get("logo.bin").unwrap(), "AQID");
}

#[test]
fn test_missing_file_fails_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let mut cm = config_map("settings");
    let err = cm.set_file(&dir.path().join("absent.txt"), None).unwrap_err();
    assert!(matches!(err, DataStoreError::Io { .. }));
}

#[test]
fn test_env_file_last_write_wins() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "LOG_LEVEL=info").unwrap();
    writeln!(file, "FEATURE_X=on").unwrap();
    writeln!(file, "LOG_LEVEL=debug").unwrap();

    let mut cm = config_map("settings");
    cm.set_data("LOG_LEVEL", "warn").unwrap();
    cm.set_from_env_file(file.path()).unwrap();
    assert_eq!(cm.data().get("LOG_LEVEL").unwrap(), "debug");
    assert_eq!(cm.data().get("FEATURE_X").unwrap(), "on");
}

#[test]
fn test_env_file_parse_error_propagates() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "GOOD=1").unwrap();
    writeln!(file, "BAD").unwrap();

    let mut s = secret("creds", false);
    let err = s.set_from_env_file(file.path()).unwrap_err();
    assert_eq!(err.to_string(), "Malformed line 2 in env file: 'BAD'");
}

#[test]
fn test_secret_env_file_values_are_encoded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "PASSWORD=hunter2").unwrap();

    let mut s = secret("creds", false);
    s.set_from_env_file(file.path()).unwrap();
    assert_eq!(s.data().get("PASSWORD").unwrap(), "aHVudGVyMg==");
}

#[test]
fn test_set_from_directory_skips_subdirectories() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("b.txt"), "B").unwrap();
    std::fs::write(dir.path().join("a.txt"), "A").unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();

    let mut cm = config_map("settings");
    cm.set_from_directory(dir.path()).unwrap();
    assert_eq!(
        cm.data().keys().cloned().collect::<Vec<_>>(),
        vec!["a.txt".to_string(), "b.txt".to_string()]
    );
}
