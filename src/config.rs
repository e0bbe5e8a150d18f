// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Chart-level configuration.
//!
//! [`ChartConfig`] is passed explicitly into every construct. Nothing in the composition,
//! hashing or aggregation code reads the process environment; [`ChartConfig::from_env`] is
//! the single boundary that does, and it is only called by the CLI.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::canary::CanaryStage;
use crate::constants::{
    ENV_APP, ENV_CANARY_STAGE, ENV_DOCKER_TAG, ENV_ENVIRONMENT, ENV_NAMESPACE, ENV_REDACT_SECRETS,
    ENV_REGION, ENV_RELEASE,
};
use crate::errors::ConfigError;
use crate::labels::{
    K8S_MANAGED_BY, LABEL_APP, LABEL_ENVIRONMENT, LABEL_REGION, LABEL_RELEASE,
    MANAGED_BY_CONSTRUCTS,
};

/// Configuration shared by every construct of a chart.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    /// Application name, the `app` label of every object
    pub app: String,

    /// Deployment environment (e.g. `production`)
    #[serde(default)]
    pub environment: String,

    /// Region the chart is deployed to
    #[serde(default)]
    pub region: String,

    /// Release identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,

    /// Namespace of every emitted object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Tag appended to container images that do not carry one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_tag: Option<String>,

    /// Canary stage used by web services that do not set their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canary_stage: Option<CanaryStage>,

    /// Replace secret values with asterisks in exported manifests
    #[serde(default)]
    pub redact_secrets: bool,
}

impl ChartConfig {
    /// Creates a configuration for an app with every other field unset.
    #[must_use]
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            ..Default::default()
        }
    }

    /// Chart-level labels: `app`, `environment`, `region`, `release` and `managed-by`.
    ///
    /// Empty values are omitted.
    #[must_use]
    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        let entries = [
            (LABEL_APP, Some(self.app.as_str())),
            (LABEL_ENVIRONMENT, Some(self.environment.as_str())),
            (LABEL_REGION, Some(self.region.as_str())),
            (LABEL_RELEASE, self.release.as_deref()),
        ];
        for (key, value) in entries {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                labels.insert(key.to_string(), value.to_string());
            }
        }
        labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_CONSTRUCTS.into());
        labels
    }

    /// Loads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// See [`ChartConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVariable`] if `APP` is unset or empty,
    /// [`ConfigError::InvalidCanaryStage`] for an unknown `CANARY_STAGE`, and
    /// [`ConfigError::InvalidBool`] for a `REDACT_SECRETS` value that is not a boolean.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let app = get(ENV_APP).ok_or_else(|| ConfigError::MissingVariable {
            variable: ENV_APP.to_string(),
        })?;

        let canary_stage = get(ENV_CANARY_STAGE)
            .map(|value| value.parse::<CanaryStage>())
            .transpose()?;

        let redact_secrets = match get(ENV_REDACT_SECRETS) {
            Some(value) => parse_bool(ENV_REDACT_SECRETS, &value)?,
            None => false,
        };

        let config = Self {
            app,
            environment: get(ENV_ENVIRONMENT).unwrap_or_default(),
            region: get(ENV_REGION).unwrap_or_default(),
            release: get(ENV_RELEASE),
            namespace: get(ENV_NAMESPACE),
            docker_tag: get(ENV_DOCKER_TAG),
            canary_stage,
            redact_secrets,
        };

        debug!(
            app = %config.app,
            environment = %config.environment,
            region = %config.region,
            canary_stage = ?config.canary_stage,
            redact_secrets = config.redact_secrets,
            "Loaded chart configuration"
        );

        Ok(config)
    }
}

fn parse_bool(variable: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            variable: variable.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
