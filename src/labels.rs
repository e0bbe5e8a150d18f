// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all constructs.
//!
//! This module defines standard Kubernetes labels and platform-specific labels/annotations
//! to ensure consistency across all objects the constructs emit.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the name of the application component (e.g., "api", "worker")
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value for `app.kubernetes.io/managed-by` on every emitted object
pub const MANAGED_BY_CONSTRUCTS: &str = "k8s-constructs";

// ============================================================================
// Chart Labels
// ============================================================================

/// Chart-level label holding the application name
pub const LABEL_APP: &str = "app";

/// Chart-level label holding the deployment environment
pub const LABEL_ENVIRONMENT: &str = "environment";

/// Chart-level label holding the region
pub const LABEL_REGION: &str = "region";

/// Chart-level label holding the release identifier
pub const LABEL_RELEASE: &str = "release";

// ============================================================================
// Construct Labels
// ============================================================================

/// Discriminator label separating canary pods from live pods
pub const LABEL_CANARY: &str = "canary";

/// Marks content-versioned objects that garbage collection may delete once stale
pub const LABEL_PRUNABLE: &str = "prunable";

/// Value of boolean labels when set
pub const LABEL_VALUE_TRUE: &str = "true";

/// Value of boolean labels when unset
pub const LABEL_VALUE_FALSE: &str = "false";

// ============================================================================
// Annotations
// ============================================================================

/// Annotation naming the cloud load balancer provisioned for an ingress
pub const LOAD_BALANCER_NAME_ANNOTATION: &str = "alb.ingress.kubernetes.io/load-balancer-name";
