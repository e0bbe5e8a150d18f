// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for manifest composition.
//!
//! This module provides specialized error types for:
//! - Kubernetes quantity parsing (CPU, memory, percent-or-absolute values)
//! - Content-addressed `ConfigMap`/`Secret` data stores
//! - `.env` file parsing
//! - Web service composition (validation and derived-name limits)
//! - Resource quota aggregation
//! - Chart configuration loading
//!
//! None of these are retryable. Composition either produces the full object set or fails.

use std::path::PathBuf;

use thiserror::Error;

use crate::data_store::DataBucket;

/// Errors raised while converting Kubernetes quantity values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantityError {
    /// Value is not a recognised quantity for the resource
    ///
    /// Covers malformed numeric prefixes, unknown suffixes, negative and non-finite numbers.
    #[error("Invalid {resource} quantity '{value}': {reason}")]
    Invalid {
        /// Resource the value was parsed for (`cpu` or `memory`)
        resource: String,
        /// The offending value as written
        value: String,
        /// What is wrong with it
        reason: String,
    },

    /// Value is neither an integer nor a percentage string
    #[error("Invalid int-or-percent value '{value}': expected an integer or a string ending in '%'")]
    InvalidIntOrPercent {
        /// The offending value as written
        value: String,
    },
}

/// Errors raised by the content-addressed `ConfigMap`/`Secret` stores.
#[derive(Error, Debug)]
pub enum DataStoreError {
    /// Key is already present in the other data bucket
    #[error("Key '{key}' is already used in {bucket}")]
    KeyCollision {
        /// The colliding key
        key: String,
        /// The bucket that already holds the key
        bucket: DataBucket,
    },

    /// Binary data value is not valid base64
    #[error("Value for key '{key}' in binaryData is not valid base64: {reason}")]
    InvalidBase64 {
        /// The key being set
        key: String,
        /// Decoder error message
        reason: String,
    },

    /// File key could not be derived because the path has no file name
    #[error("Cannot derive a data key from path '{}'", path.display())]
    MissingFileName {
        /// The path without a file name component
        path: PathBuf,
    },

    /// File or directory could not be read
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        /// The path being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// `.env` file could not be loaded
    #[error(transparent)]
    EnvFile(#[from] EnvFileError),
}

/// Errors raised while reading `.env` files.
#[derive(Error, Debug)]
pub enum EnvFileError {
    /// Line is neither blank, a comment, nor `KEY=VALUE`
    #[error("Malformed line {line_number} in env file: '{line}'")]
    MalformedLine {
        /// 1-based line number
        line_number: usize,
        /// Content of the line
        line: String,
    },

    /// File could not be read
    #[error("Failed to read env file '{}': {source}", path.display())]
    Io {
        /// The env file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while composing a web service.
///
/// All validation happens before any object is emitted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WebServiceError {
    /// Both or neither of `replicas` and `horizontalPodAutoscaler` were given
    #[error("Web service '{name}' must set exactly one of replicas or horizontalPodAutoscaler")]
    ReplicasOrAutoscaler {
        /// Web service name
        name: String,
    },

    /// Canary release requested without a stage
    #[error("Web service '{name}' enables canary but no canary stage was given")]
    MissingCanaryStage {
        /// Web service name
        name: String,
    },

    /// Application port and sidecar port are equal
    #[error("Web service '{name}' application port and sidecar port are both {port}")]
    PortConflict {
        /// Web service name
        name: String,
        /// The shared port
        port: i32,
    },

    /// Ingress host list is empty
    #[error("Web service '{name}' must declare at least one ingress host")]
    MissingIngressHosts {
        /// Web service name
        name: String,
    },

    /// Numeric property outside its allowed range
    #[error("Web service '{name}' property {property} = {value} is out of range: {reason}")]
    OutOfRange {
        /// Web service name
        name: String,
        /// Property path (e.g. `horizontalPodAutoscaler.maxReplicas`)
        property: String,
        /// The offending value
        value: i64,
        /// Allowed range description
        reason: String,
    },

    /// Derived load balancer name exceeds the platform limit
    #[error("Load balancer name '{lb_name}' is {length} characters, limit is {max}")]
    LoadBalancerNameTooLong {
        /// The composed name
        lb_name: String,
        /// Its length
        length: usize,
        /// The limit
        max: usize,
    },
}

/// Errors raised while aggregating a resource quota.
#[derive(Error, Debug)]
pub enum QuotaError {
    /// Container declares neither a request nor a limit for a resource
    #[error("Container '{container}' of {workload} declares no {resource} request or limit")]
    MissingResourceRequest {
        /// Workload identifier (`{kind}/{name}`)
        workload: String,
        /// Container name
        container: String,
        /// Resource name (`cpu` or `memory`)
        resource: String,
    },

    /// Object of a workload kind whose shape does not match that kind
    #[error("Unrecognized {kind} workload '{id}': {reason}")]
    UnrecognizedWorkload {
        /// Declared kind
        kind: String,
        /// Workload identifier (`{kind}/{name}`)
        id: String,
        /// What is missing or malformed
        reason: String,
    },

    /// Object has no `kind` field
    #[error("Manifest object has no kind")]
    MissingKind,

    /// A quantity inside a workload could not be converted
    #[error("Workload {workload}: {source}")]
    Quantity {
        /// Workload identifier (`{kind}/{name}`)
        workload: String,
        /// Underlying conversion error
        #[source]
        source: QuantityError,
    },

    /// A resource total does not fit in 64 bits
    #[error("{resource} total of {scope} overflows")]
    Overflow {
        /// Workload identifier (`{kind}/{name}`), or `all workloads` for the summed quota
        scope: String,
        /// Resource name (`cpu` or `memory`)
        resource: String,
    },
}

/// Errors raised while loading chart configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Required variable is unset or empty
    #[error("Required configuration variable {variable} is not set")]
    MissingVariable {
        /// Variable name
        variable: String,
    },

    /// Canary stage is not one of the known stages
    #[error("Unknown canary stage '{value}', expected one of base, canary, post-canary, full")]
    InvalidCanaryStage {
        /// The offending value
        value: String,
    },

    /// Boolean variable has an unrecognised value
    #[error("Configuration variable {variable} has invalid boolean value '{value}'")]
    InvalidBool {
        /// Variable name
        variable: String,
        /// The offending value
        value: String,
    },
}
