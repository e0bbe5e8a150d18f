// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # k8s-constructs - Kubernetes manifest constructs
//!
//! Building blocks for rendering Kubernetes manifests from typed configuration, with
//! deterministic names and a computed namespace quota.
//!
//! ## Overview
//!
//! - Content-addressed `ConfigMap` and `Secret` names (`ConfigMap` suffixes match kustomize's
//!   `nameSuffixHash`), so changed content rolls pods and stale objects can be pruned
//! - A web service construct that walks a four-stage canary release
//! - A quota aggregator that sizes a `ResourceQuota` from the workloads of a chart,
//!   including autoscaler ceilings and rolling-update surge
//!
//! ## Modules
//!
//! - [`units`] - CPU and memory quantity conversion
//! - [`hash`] - Content hashing of JSON values
//! - [`data_store`] - Named `ConfigMap` and `Secret` with hashed names
//! - [`canary`] - Canary stages and instances
//! - [`web_service`] - Web service composition
//! - [`workload`] - Typed view over workloads and autoscalers
//! - [`quota`] - Resource quota aggregation
//! - [`config`] - Chart configuration
//! - [`manifest`] - Multi-document YAML input and output
//!
//! ## Example
//!
//! ```rust,no_run
//! use k8s_constructs::data_store::{ConfigMapProps, NamedConfigMap};
//!
//! let mut settings = NamedConfigMap::new(
//!     &["shop", "settings"],
//!     ConfigMapProps {
//!         name: Some("my-config".to_string()),
//!         ..Default::default()
//!     },
//! )?;
//! settings.set_data("foo", "bar")?;
//!
//! assert_eq!(settings.resolve_name(), "my-config-hg568khh4t");
//! # Ok::<(), k8s_constructs::errors::DataStoreError>(())
//! ```

pub mod canary;
pub mod config;
pub mod constants;
pub mod data_store;
pub mod env_file;
pub mod errors;
pub mod hash;
pub mod labels;
pub mod manifest;
pub mod naming;
pub mod quota;
pub mod units;
pub mod web_service;
pub mod workload;
