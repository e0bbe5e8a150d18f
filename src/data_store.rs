// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Content-addressed `ConfigMap` and `Secret` constructs.
//!
//! Both constructs own two disjoint key/value buckets (`data` + `binaryData` for a
//! `ConfigMap`, `data` + `stringData` for a `Secret`). A key may live in only one of them.
//!
//! The object name is resolved lazily, when the manifest is built: `{base}-{hash}` where
//! `hash` is the content hash of `{kind, name: base, data, <other bucket> if non-empty}`.
//! `ConfigMap` names match kustomize's; `Secret` names do not, since `type` is not hashed.
//! Identical content always yields the same name, changed content a new one, so workloads
//! referencing the object roll automatically. Content-versioned objects carry `prunable=true` so garbage collection can
//! delete stale versions. With `disable_name_suffix_hash` the base name is used verbatim
//! and the label is omitted.
//!
//! # Example
//!
//! ```rust
//! use k8s_constructs::data_store::{ConfigMapProps, NamedConfigMap};
//!
//! let mut config = NamedConfigMap::new(
//!     &["shop"],
//!     ConfigMapProps {
//!         name: Some("settings".into()),
//!         ..Default::default()
//!     },
//! )
//! .unwrap();
//! config.set_data("LOG_LEVEL", "info").unwrap();
//!
//! let name = config.resolve_name();
//! assert!(name.starts_with("settings-"));
//! assert_eq!(name.len(), "settings-".len() + 10);
//! ```

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::constants::{DEFAULT_SECRET_TYPE, KIND_CONFIG_MAP, KIND_SECRET, REDACTION_CHAR};
use crate::env_file::read_env_file;
use crate::errors::DataStoreError;
use crate::hash::hash_value;
use crate::labels::{LABEL_PRUNABLE, LABEL_VALUE_TRUE};
use crate::naming::dns_label;

/// One of the key/value buckets of a data object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataBucket {
    /// `data` (both kinds)
    Data,
    /// `binaryData` (`ConfigMap`)
    BinaryData,
    /// `stringData` (`Secret`)
    StringData,
}

impl DataBucket {
    /// Manifest field name of the bucket.
    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::BinaryData => "binaryData",
            Self::StringData => "stringData",
        }
    }
}

impl fmt::Display for DataBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Naming, labeling and bucket bookkeeping shared by [`NamedConfigMap`] and [`NamedSecret`].
#[derive(Clone, Debug)]
pub struct NamedDataStore {
    kind: &'static str,
    generated_name: String,
    base_name: Option<String>,
    namespace: Option<String>,
    labels: BTreeMap<String, String>,
    disable_name_suffix_hash: bool,
    data: BTreeMap<String, String>,
    other: BTreeMap<String, String>,
    other_bucket: DataBucket,
    // Reset by every mutation.
    hash: OnceCell<String>,
}

impl NamedDataStore {
    fn new(
        kind: &'static str,
        other_bucket: DataBucket,
        path: &[&str],
        base_name: Option<String>,
        namespace: Option<String>,
        labels: BTreeMap<String, String>,
        disable_name_suffix_hash: bool,
    ) -> Self {
        Self {
            kind,
            generated_name: dns_label(path),
            base_name,
            namespace,
            labels,
            disable_name_suffix_hash,
            data: BTreeMap::new(),
            other: BTreeMap::new(),
            other_bucket,
            hash: OnceCell::new(),
        }
    }

    /// Kind of the object (`ConfigMap` or `Secret`).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Name before the content suffix: the custom name if one was given, otherwise the
    /// name generated from the construct path.
    #[must_use]
    pub fn base_name(&self) -> &str {
        self.base_name.as_deref().unwrap_or(&self.generated_name)
    }

    /// Whether the name carries a content hash suffix.
    #[must_use]
    pub fn hashes_name(&self) -> bool {
        !self.disable_name_suffix_hash
    }

    /// The `data` bucket.
    #[must_use]
    pub fn data(&self) -> &BTreeMap<String, String> {
        &self.data
    }

    /// The second bucket (`binaryData` or `stringData`).
    #[must_use]
    pub fn other(&self) -> &BTreeMap<String, String> {
        &self.other
    }

    /// Content hash over kind, base name and both buckets. Computed once until the next
    /// mutation.
    pub fn content_hash(&self) -> &str {
        self.hash.get_or_init(|| {
            let mut record = Map::new();
            record.insert("kind".into(), json!(self.kind));
            record.insert("name".into(), json!(self.base_name()));
            record.insert("data".into(), json!(self.data));
            if !self.other.is_empty() {
                record.insert(self.other_bucket.field_name().into(), json!(self.other));
            }
            let hash = hash_value(&Value::Object(record));
            debug!(
                kind = self.kind,
                base_name = %self.base_name(),
                hash = %hash,
                "Computed content hash"
            );
            hash
        })
    }

    /// Final object name: `{base}-{hash}`, or the base name when suffixing is disabled.
    #[must_use]
    pub fn resolve_name(&self) -> String {
        if self.disable_name_suffix_hash {
            return self.base_name().to_string();
        }
        format!("{}-{}", self.base_name(), self.content_hash())
    }

    /// Labels of the object, including `prunable=true` when the name is content-versioned.
    #[must_use]
    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.labels.clone();
        if self.hashes_name() {
            labels.insert(LABEL_PRUNABLE.into(), LABEL_VALUE_TRUE.into());
        }
        labels
    }

    fn metadata(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.resolve_name()),
            namespace: self.namespace.clone(),
            labels: Some(self.labels()),
            ..Default::default()
        }
    }

    fn insert(&mut self, bucket: DataBucket, key: &str, value: String) -> Result<(), DataStoreError> {
        let (target, conflicting, conflicting_bucket) = if bucket == DataBucket::Data {
            (&mut self.data, &self.other, self.other_bucket)
        } else {
            (&mut self.other, &self.data, DataBucket::Data)
        };

        if conflicting.contains_key(key) {
            return Err(DataStoreError::KeyCollision {
                key: key.to_string(),
                bucket: conflicting_bucket,
            });
        }

        target.insert(key.to_string(), value);
        self.hash = OnceCell::new();
        Ok(())
    }
}

/// Properties of a [`NamedConfigMap`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapProps {
    /// Base name; generated from the construct path when unset
    #[serde(default)]
    pub name: Option<String>,

    /// Namespace of the object
    #[serde(default)]
    pub namespace: Option<String>,

    /// Extra labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Initial `data` entries
    #[serde(default)]
    pub data: BTreeMap<String, String>,

    /// Initial `binaryData` entries, base64 encoded
    #[serde(default)]
    pub binary_data: BTreeMap<String, String>,

    /// Use the base name verbatim instead of appending a content hash
    #[serde(default)]
    pub disable_name_suffix_hash: bool,
}

/// A `ConfigMap` whose name is derived from its content.
#[derive(Clone, Debug)]
pub struct NamedConfigMap {
    store: NamedDataStore,
}

impl NamedConfigMap {
    /// Creates a `ConfigMap` construct seeded from `props`.
    ///
    /// # Arguments
    ///
    /// * `path` - Construct path (chart name, construct id, ...) used to generate a name
    ///   when `props.name` is unset
    /// * `props` - Initial content and naming options
    ///
    /// # Errors
    ///
    /// Returns an error if a seeded key appears in both buckets or a binary value is not
    /// valid base64.
    pub fn new(path: &[&str], props: ConfigMapProps) -> Result<Self, DataStoreError> {
        let mut config_map = Self {
            store: NamedDataStore::new(
                KIND_CONFIG_MAP,
                DataBucket::BinaryData,
                path,
                props.name,
                props.namespace,
                props.labels,
                props.disable_name_suffix_hash,
            ),
        };
        for (key, value) in props.data {
            config_map.set_data(&key, value)?;
        }
        for (key, value) in props.binary_data {
            config_map.set_binary_data(&key, value)?;
        }
        Ok(config_map)
    }

    /// Shared naming and bucket state.
    #[must_use]
    pub fn store(&self) -> &NamedDataStore {
        &self.store
    }

    /// See [`NamedDataStore::resolve_name`].
    #[must_use]
    pub fn resolve_name(&self) -> String {
        self.store.resolve_name()
    }

    /// The `data` bucket.
    #[must_use]
    pub fn data(&self) -> &BTreeMap<String, String> {
        self.store.data()
    }

    /// The `binaryData` bucket, base64 encoded.
    #[must_use]
    pub fn binary_data(&self) -> &BTreeMap<String, String> {
        self.store.other()
    }

    /// Sets a `data` entry, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::KeyCollision`] if `key` is already in `binaryData`.
    pub fn set_data(&mut self, key: &str, value: impl Into<String>) -> Result<(), DataStoreError> {
        self.store.insert(DataBucket::Data, key, value.into())
    }

    /// Sets a `binaryData` entry from its base64 encoding.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::KeyCollision`] if `key` is already in `data`, or
    /// [`DataStoreError::InvalidBase64`] if `value` does not decode.
    pub fn set_binary_data(
        &mut self,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), DataStoreError> {
        let value = value.into();
        STANDARD
            .decode(&value)
            .map_err(|e| DataStoreError::InvalidBase64 {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        self.store.insert(DataBucket::BinaryData, key, value)
    }

    /// Sets a `data` entry from the contents of a UTF-8 file.
    ///
    /// The key defaults to the file name.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the key collides.
    pub fn set_file(&mut self, path: &Path, key: Option<&str>) -> Result<(), DataStoreError> {
        let key = file_key(path, key)?;
        let contents = std::fs::read_to_string(path).map_err(|source| DataStoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.set_data(&key, contents)
    }

    /// Sets a `binaryData` entry from the raw bytes of a file.
    ///
    /// The key defaults to the file name.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the key collides.
    pub fn set_binary_file(&mut self, path: &Path, key: Option<&str>) -> Result<(), DataStoreError> {
        let key = file_key(path, key)?;
        let contents = std::fs::read(path).map_err(|source| DataStoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.set_binary_data(&key, STANDARD.encode(contents))
    }

    /// Sets one `data` entry per `KEY=VALUE` line of a `.env` file. Later keys win.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a key collides.
    pub fn set_from_env_file(&mut self, path: &Path) -> Result<(), DataStoreError> {
        for (key, value) in read_env_file(path)? {
            self.set_data(&key, value)?;
        }
        Ok(())
    }

    /// Sets one `data` entry per regular file in `dir`, keyed by file name.
    ///
    /// Subdirectories are skipped. Files are added in file name order.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or one of its files cannot be read, or a key collides.
    pub fn set_from_directory(&mut self, dir: &Path) -> Result<(), DataStoreError> {
        let io_error = |source| DataStoreError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            if entry.file_type().map_err(io_error)?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        debug!(dir = %dir.display(), files = files.len(), "Adding directory to ConfigMap");
        for file in files {
            self.set_file(&file, None)?;
        }
        Ok(())
    }

    /// Builds the `ConfigMap`, resolving its name.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::InvalidBase64`] if a binary value does not decode.
    pub fn to_config_map(&self) -> Result<ConfigMap, DataStoreError> {
        let binary_data = self
            .binary_data()
            .iter()
            .map(|(key, value)| {
                STANDARD
                    .decode(value)
                    .map(|bytes| (key.clone(), ByteString(bytes)))
                    .map_err(|e| DataStoreError::InvalidBase64 {
                        key: key.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(ConfigMap {
            metadata: self.store.metadata(),
            data: Some(self.data().clone()),
            binary_data: (!binary_data.is_empty()).then_some(binary_data),
            ..Default::default()
        })
    }
}

/// Properties of a [`NamedSecret`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretProps {
    /// Base name; generated from the construct path when unset
    #[serde(default)]
    pub name: Option<String>,

    /// Namespace of the object
    #[serde(default)]
    pub namespace: Option<String>,

    /// Extra labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Initial `data` entries as plain text; encoded on insert
    #[serde(default)]
    pub data: BTreeMap<String, String>,

    /// Initial `stringData` entries
    #[serde(default)]
    pub string_data: BTreeMap<String, String>,

    /// Secret type, `Opaque` when unset
    #[serde(default, rename = "type")]
    pub type_: Option<String>,

    /// Use the base name verbatim instead of appending a content hash
    #[serde(default)]
    pub disable_name_suffix_hash: bool,

    /// Replace every value character with `*` in the exported manifest
    #[serde(default)]
    pub redact: bool,
}

/// A `Secret` whose name is derived from its content.
#[derive(Clone, Debug)]
pub struct NamedSecret {
    store: NamedDataStore,
    secret_type: String,
    redact: bool,
}

impl NamedSecret {
    /// Creates a `Secret` construct seeded from `props`.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::KeyCollision`] if a seeded key appears in both buckets.
    pub fn new(path: &[&str], props: SecretProps) -> Result<Self, DataStoreError> {
        let mut secret = Self {
            store: NamedDataStore::new(
                KIND_SECRET,
                DataBucket::StringData,
                path,
                props.name,
                props.namespace,
                props.labels,
                props.disable_name_suffix_hash,
            ),
            secret_type: props.type_.unwrap_or_else(|| DEFAULT_SECRET_TYPE.to_string()),
            redact: props.redact,
        };
        for (key, value) in props.data {
            secret.set_data(&key, &value)?;
        }
        for (key, value) in props.string_data {
            secret.set_string_data(&key, value)?;
        }
        Ok(secret)
    }

    /// Shared naming and bucket state.
    #[must_use]
    pub fn store(&self) -> &NamedDataStore {
        &self.store
    }

    /// See [`NamedDataStore::resolve_name`].
    #[must_use]
    pub fn resolve_name(&self) -> String {
        self.store.resolve_name()
    }

    /// The `data` bucket: base64 encoded (or redacted) values.
    #[must_use]
    pub fn data(&self) -> &BTreeMap<String, String> {
        self.store.data()
    }

    /// The `stringData` bucket.
    #[must_use]
    pub fn string_data(&self) -> &BTreeMap<String, String> {
        self.store.other()
    }

    /// Sets a `data` entry, base64-encoding `value`.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::KeyCollision`] if `key` is already in `stringData`.
    pub fn set_data(&mut self, key: &str, value: &str) -> Result<(), DataStoreError> {
        self.set_encoded_data(key, STANDARD.encode(value.as_bytes()))
    }

    /// Sets a `data` entry whose value is already base64 encoded.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::KeyCollision`] if `key` is already in `stringData`.
    pub fn set_encoded_data(
        &mut self,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), DataStoreError> {
        let value = self.redacted(value.into());
        self.store.insert(DataBucket::Data, key, value)
    }

    /// Sets a `stringData` entry.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::KeyCollision`] if `key` is already in `data`.
    pub fn set_string_data(
        &mut self,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), DataStoreError> {
        let value = self.redacted(value.into());
        self.store.insert(DataBucket::StringData, key, value)
    }

    /// Sets a `data` entry from the contents of a UTF-8 file. The key defaults to the file name.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the key collides.
    pub fn set_file(&mut self, path: &Path, key: Option<&str>) -> Result<(), DataStoreError> {
        let key = file_key(path, key)?;
        let contents = std::fs::read_to_string(path).map_err(|source| DataStoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.set_data(&key, &contents)
    }

    /// Sets one `data` entry per `KEY=VALUE` line of a `.env` file. Later keys win.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a key collides.
    pub fn set_from_env_file(&mut self, path: &Path) -> Result<(), DataStoreError> {
        for (key, value) in read_env_file(path)? {
            self.set_data(&key, &value)?;
        }
        Ok(())
    }

    /// Builds the `Secret` manifest, resolving its name.
    ///
    /// Returned as JSON because redacted `data` values are not valid base64.
    #[must_use]
    pub fn to_manifest(&self) -> Value {
        let mut manifest = json!({
            "apiVersion": "v1",
            "kind": KIND_SECRET,
            "metadata": self.store.metadata(),
            "type": self.secret_type,
            "data": self.data(),
        });
        if !self.string_data().is_empty() {
            manifest["stringData"] = json!(self.string_data());
        }
        manifest
    }

    fn redacted(&self, value: String) -> String {
        if self.redact {
            REDACTION_CHAR.to_string().repeat(value.chars().count())
        } else {
            value
        }
    }
}

fn file_key(path: &Path, key: Option<&str>) -> Result<String, DataStoreError> {
    if let Some(key) = key {
        return Ok(key.to_string());
    }
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| DataStoreError::MissingFileName {
            path: path.to_path_buf(),
        })
}

#[cfg(test)]
#[path = "data_store_tests.rs"]
mod data_store_tests;
