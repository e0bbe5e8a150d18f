// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Derived object names.
//!
//! - [`dns_label`] turns a construct path (chart name, construct id, ...) into a stable
//!   DNS-1123 label. Single-component paths are used as-is; longer paths get a short
//!   digest of the full path appended so distinct paths never collide after truncation.
//! - [`load_balancer_name`] composes the cloud load balancer name of a web service
//!   instance and enforces the provider's 32 character limit.

use sha2::{Digest, Sha256};

use crate::constants::{
    CANARY_LOAD_BALANCER_PART, GENERATED_NAME_HASH_LENGTH, MAX_DNS_LABEL_LENGTH,
    MAX_LOAD_BALANCER_NAME_LENGTH,
};
use crate::errors::WebServiceError;

/// Builds a DNS-1123 label from a construct path.
///
/// Components are lowercased and stripped of anything but `[a-z0-9]`; empty components and
/// consecutive duplicates are dropped.
///
/// # Example
///
/// ```rust
/// use k8s_constructs::naming::dns_label;
///
/// assert_eq!(dns_label(&["Frontend"]), "frontend");
///
/// let name = dns_label(&["shop", "Config_Map"]);
/// assert!(name.starts_with("shop-configmap-"));
/// assert_eq!(name.len(), "shop-configmap-".len() + 8);
/// ```
#[must_use]
pub fn dns_label(path: &[&str]) -> String {
    let mut components: Vec<String> = Vec::with_capacity(path.len());
    for component in path {
        let normalized: String = component
            .to_lowercase()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        if normalized.is_empty() || components.last() == Some(&normalized) {
            continue;
        }
        components.push(normalized);
    }

    if path.len() == 1 && components.len() == 1 {
        let mut name = components.remove(0);
        name.truncate(MAX_DNS_LABEL_LENGTH);
        return name;
    }

    let mut hasher = Sha256::new();
    hasher.update(path.join("/").as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let suffix = &digest[..GENERATED_NAME_HASH_LENGTH];

    let mut prefix = components.join("-");
    prefix.truncate(MAX_DNS_LABEL_LENGTH - GENERATED_NAME_HASH_LENGTH - 1);
    let prefix = prefix.trim_end_matches('-');

    if prefix.is_empty() {
        suffix.to_string()
    } else {
        format!("{prefix}-{suffix}")
    }
}

/// Inputs of a load balancer name.
#[derive(Clone, Debug, Default)]
pub struct LoadBalancerNameParts<'a> {
    /// Application name
    pub app: &'a str,
    /// Optional instance identifier distinguishing several services of one app
    pub instance_id: Option<&'a str>,
    /// Whether the name is for the canary instance
    pub canary: bool,
    /// Deployment environment
    pub environment: &'a str,
    /// Region
    pub region: &'a str,
}

/// Composes `{app}-{instance-id}-{c}-{environment}-{region}`, omitting empty parts.
///
/// # Errors
///
/// Returns [`WebServiceError::LoadBalancerNameTooLong`] if the result exceeds
/// [`MAX_LOAD_BALANCER_NAME_LENGTH`]. Names are never truncated.
pub fn load_balancer_name(parts: &LoadBalancerNameParts<'_>) -> Result<String, WebServiceError> {
    let canary = if parts.canary {
        CANARY_LOAD_BALANCER_PART
    } else {
        ""
    };

    let name = [
        parts.app,
        parts.instance_id.unwrap_or_default(),
        canary,
        parts.environment,
        parts.region,
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join("-");

    if name.len() > MAX_LOAD_BALANCER_NAME_LENGTH {
        return Err(WebServiceError::LoadBalancerNameTooLong {
            length: name.len(),
            lb_name: name,
            max: MAX_LOAD_BALANCER_NAME_LENGTH,
        });
    }

    Ok(name)
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod naming_tests;
