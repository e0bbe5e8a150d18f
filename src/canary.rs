// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Canary release stages and instances.
//!
//! A canary-enabled web service runs two instances side by side: the live instance and the
//! canary instance. The release walks through four stages:
//!
//! | Stage         | Live Deployment | Live Service selects        |
//! |---------------|-----------------|-----------------------------|
//! | `base`        | emitted         | live pods only              |
//! | `canary`      | skipped         | live pods only              |
//! | `post-canary` | skipped         | live and canary pods        |
//! | `full`        | emitted         | live and canary pods        |
//!
//! The canary Deployment and canary Service exist in every stage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::CANARY_INSTANCE_SUFFIX;
use crate::errors::ConfigError;
use crate::labels::{LABEL_VALUE_FALSE, LABEL_VALUE_TRUE};

/// Stage of a canary release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CanaryStage {
    /// Canary deployed next to the live version, receiving its own traffic only
    Base,
    /// Live Deployment withdrawn, traffic shifting to the canary
    Canary,
    /// Canary promoted; the live Service now selects every pod
    PostCanary,
    /// Rollout complete; both Deployments run the new version
    Full,
}

impl CanaryStage {
    /// All stages in release order.
    pub const ALL: [CanaryStage; 4] = [Self::Base, Self::Canary, Self::PostCanary, Self::Full];

    /// Stage name as written in configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Canary => "canary",
            Self::PostCanary => "post-canary",
            Self::Full => "full",
        }
    }

    /// Whether the live Service selector pins the canary discriminator to `false`.
    #[must_use]
    pub fn live_selector_is_discriminated(self) -> bool {
        matches!(self, Self::Base | Self::Canary)
    }

    /// Whether the live Deployment is emitted.
    #[must_use]
    pub fn emits_live_deployment(self) -> bool {
        !matches!(self, Self::Canary | Self::PostCanary)
    }
}

impl fmt::Display for CanaryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanaryStage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s.trim())
            .ok_or_else(|| ConfigError::InvalidCanaryStage {
                value: s.to_string(),
            })
    }
}

/// One of the object sets a web service emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instance {
    /// The stable instance, named after the service
    Live,
    /// The canary instance, named with a `-canary` suffix
    Canary,
}

impl Instance {
    /// Instances emitted for a web service.
    #[must_use]
    pub fn for_service(canary_enabled: bool) -> &'static [Instance] {
        if canary_enabled {
            &[Self::Live, Self::Canary]
        } else {
            &[Self::Live]
        }
    }

    /// Suffix appended to the service name.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Live => "",
            Self::Canary => CANARY_INSTANCE_SUFFIX,
        }
    }

    /// Value of the `canary` discriminator label.
    #[must_use]
    pub fn discriminator(self) -> &'static str {
        match self {
            Self::Live => LABEL_VALUE_FALSE,
            Self::Canary => LABEL_VALUE_TRUE,
        }
    }

    /// Whether this is the canary instance.
    #[must_use]
    pub fn is_canary(self) -> bool {
        self == Self::Canary
    }
}

#[cfg(test)]
#[path = "canary_tests.rs"]
mod canary_tests;
