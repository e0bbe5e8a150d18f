// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the manifest constructs.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Kind Constants
// ============================================================================

/// Kind name for `ConfigMap` resources
pub const KIND_CONFIG_MAP: &str = "ConfigMap";

/// Kind name for `Secret` resources
pub const KIND_SECRET: &str = "Secret";

/// Kind name for bare `Pod` workloads
pub const KIND_POD: &str = "Pod";

/// Kind name for `CronJob` workloads
pub const KIND_CRON_JOB: &str = "CronJob";

/// Kind name for `DaemonSet` workloads
pub const KIND_DAEMON_SET: &str = "DaemonSet";

/// Kind name for `Deployment` workloads
pub const KIND_DEPLOYMENT: &str = "Deployment";

/// Kind name for `Job` workloads
pub const KIND_JOB: &str = "Job";

/// Kind name for `StatefulSet` workloads
pub const KIND_STATEFUL_SET: &str = "StatefulSet";

/// Kind name for `HorizontalPodAutoscaler` resources
pub const KIND_HORIZONTAL_POD_AUTOSCALER: &str = "HorizontalPodAutoscaler";

/// Kind name for KEDA `ScaledObject` resources
pub const KIND_SCALED_OBJECT: &str = "ScaledObject";

/// API version of the `apps` group (target of autoscaler scale references)
pub const API_VERSION_APPS_V1: &str = "apps/v1";

/// Legacy autoscaling API version, converted on read
pub const API_VERSION_AUTOSCALING_V1: &str = "autoscaling/v1";

// ============================================================================
// Content Hash Constants
// ============================================================================

/// Number of hex characters of the SHA-256 digest kept in a content hash suffix
pub const HASH_SUFFIX_LENGTH: usize = 10;

/// Number of hex characters of the path digest appended to generated names
pub const GENERATED_NAME_HASH_LENGTH: usize = 8;

/// Maximum length of a DNS-1123 label (generated object names)
pub const MAX_DNS_LABEL_LENGTH: usize = 63;

// ============================================================================
// Secret Constants
// ============================================================================

/// Default `type` for generated Secrets
pub const DEFAULT_SECRET_TYPE: &str = "Opaque";

/// Character every redacted secret value character is replaced with
pub const REDACTION_CHAR: char = '*';

// ============================================================================
// Quantity Constants
// ============================================================================

/// Millicores in a single CPU core
pub const MILLICORES_PER_CORE: u64 = 1000;

/// Bytes in one mebibyte (quota memory output unit)
pub const BYTES_PER_MEBIBYTE: u64 = 1 << 20;

/// Resource name for CPU in container resource maps
pub const RESOURCE_CPU: &str = "cpu";

/// Resource name for memory in container resource maps
pub const RESOURCE_MEMORY: &str = "memory";

// ============================================================================
// Rollout and Autoscaling Constants
// ============================================================================

/// Default `maxSurge` applied when a rolling update strategy does not set one
pub const DEFAULT_MAX_SURGE: &str = "25%";

/// Replica count used when a workload does not declare one
pub const DEFAULT_REPLICAS: i32 = 1;

/// Replica count of the canary Deployment, regardless of the requested replicas
pub const CANARY_REPLICAS: i32 = 1;

/// KEDA's default `maxReplicaCount` when a `ScaledObject` omits it
pub const KEDA_DEFAULT_MAX_REPLICA_COUNT: i32 = 100;

/// Default CPU utilization target for generated autoscalers (percent)
pub const DEFAULT_TARGET_CPU_UTILIZATION: i32 = 70;

/// Default minimum replica count for generated autoscalers
pub const DEFAULT_MIN_REPLICAS: i32 = 1;

// ============================================================================
// Web Service Constants
// ============================================================================

/// Name suffix of the canary instance of a web service
pub const CANARY_INSTANCE_SUFFIX: &str = "-canary";

/// Load balancer name part marking the canary instance
pub const CANARY_LOAD_BALANCER_PART: &str = "c";

/// Maximum length of a cloud load balancer name
pub const MAX_LOAD_BALANCER_NAME_LENGTH: usize = 32;

/// Port exposed by every web service `Service`
pub const WEB_SERVICE_PORT: i32 = 80;

/// Name of the HTTP port on services and containers
pub const HTTP_PORT_NAME: &str = "http";

/// Container name of the nginx sidecar
pub const CONTAINER_NAME_NGINX: &str = "nginx";

/// Default ingress class for web service ingresses
pub const DEFAULT_INGRESS_CLASS: &str = "alb";

/// Default path routed by web service ingresses
pub const DEFAULT_INGRESS_PATH: &str = "/";

/// Health probe initial delay
pub const PROBE_INITIAL_DELAY_SECS: i32 = 10;

/// Health probe period
pub const PROBE_PERIOD_SECS: i32 = 10;

/// Health probe failure threshold
pub const PROBE_FAILURE_THRESHOLD: i32 = 3;

// ============================================================================
// Configuration Environment Variables
// ============================================================================

/// Environment variable holding the application name (required)
pub const ENV_APP: &str = "APP";

/// Environment variable holding the deployment environment (e.g. `production`)
pub const ENV_ENVIRONMENT: &str = "ENVIRONMENT";

/// Environment variable holding the region
pub const ENV_REGION: &str = "REGION";

/// Environment variable holding the release identifier
pub const ENV_RELEASE: &str = "RELEASE";

/// Environment variable holding the target namespace
pub const ENV_NAMESPACE: &str = "NAMESPACE";

/// Environment variable holding the docker tag appended to untagged images
pub const ENV_DOCKER_TAG: &str = "DOCKER_TAG";

/// Environment variable holding the canary stage
pub const ENV_CANARY_STAGE: &str = "CANARY_STAGE";

/// Environment variable enabling secret value redaction
pub const ENV_REDACT_SECRETS: &str = "REDACT_SECRETS";
