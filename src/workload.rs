// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed view over the objects of a rendered chart.
//!
//! [`ManifestObject`] is the tagged union the quota aggregator walks. Workload kinds nest their
//! containers differently; [`Workload`] hides that behind uniform accessors so callers never
//! probe object shapes themselves.
//!
//! # Supported kinds
//!
//! | Kind                      | Containers at                          | Rolling surge      |
//! |---------------------------|----------------------------------------|--------------------|
//! | `Pod`                     | `spec.containers`                      | none               |
//! | `Deployment`              | `spec.template.spec.containers`        | `maxSurge`, `25%`  |
//! | `DaemonSet`               | `spec.template.spec.containers`        | `maxSurge`, `25%`  |
//! | `StatefulSet`             | `spec.template.spec.containers`        | none               |
//! | `Job`                     | `spec.template.spec.containers`        | none               |
//! | `CronJob`                 | `spec.jobTemplate.spec.template.spec`  | none               |
//!
//! `HorizontalPodAutoscaler` (`autoscaling/v1` and `autoscaling/v2`) and KEDA `ScaledObject`
//! are recognized as autoscalers; every other kind is carried as [`ManifestObject::Other`].

use k8s_openapi::api::{
    apps::v1::{DaemonSet, Deployment, StatefulSet},
    autoscaling::{
        v1::HorizontalPodAutoscaler as HorizontalPodAutoscalerV1,
        v2::{CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec},
    },
    batch::v1::{CronJob, Job},
    core::v1::{Container, Pod, PodSpec},
};
use k8s_openapi::apimachinery::pkg::{
    apis::meta::v1::ObjectMeta, util::intstr::IntOrString,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{
    API_VERSION_AUTOSCALING_V1, DEFAULT_MAX_SURGE, KIND_CRON_JOB, KIND_DAEMON_SET,
    KIND_DEPLOYMENT, KIND_HORIZONTAL_POD_AUTOSCALER, KIND_JOB, KIND_POD, KIND_SCALED_OBJECT,
    KIND_STATEFUL_SET,
};
use crate::errors::{QuantityError, QuotaError};
use crate::units::{resolve_int_or_percent, Rounding};
use crate::web_service::WebService;

/// KEDA `ScaledObject`, reduced to the fields that bound a workload's replica count.
///
/// # Example
///
/// ```yaml
/// apiVersion: keda.sh/v1alpha1
/// kind: ScaledObject
/// metadata:
///   name: worker
/// spec:
///   scaleTargetRef:
///     name: worker
///   maxReplicaCount: 20
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "keda.sh",
    version = "v1alpha1",
    kind = "ScaledObject",
    namespaced,
    doc = "ScaledObject scales a workload between minReplicaCount and maxReplicaCount based on external event sources."
)]
#[serde(rename_all = "camelCase")]
pub struct ScaledObjectSpec {
    /// Workload scaled by this object
    pub scale_target_ref: ScaleTargetRef,

    /// Lower replica bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replica_count: Option<i32>,

    /// Upper replica bound, 100 when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replica_count: Option<i32>,
}

/// Reference to the workload a [`ScaledObject`] scales.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScaleTargetRef {
    /// Workload name
    pub name: String,

    /// Workload kind, `Deployment` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Workload API version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// An object of a rendered chart.
#[derive(Clone, Debug)]
pub enum ManifestObject {
    /// Bare pod
    Pod(Pod),
    /// Scheduled job
    CronJob(CronJob),
    /// One pod per node
    DaemonSet(DaemonSet),
    /// Replicated stateless workload
    Deployment(Deployment),
    /// Run-to-completion job
    Job(Job),
    /// Replicated stateful workload
    StatefulSet(StatefulSet),
    /// Autoscaler; `autoscaling/v1` objects are converted on parse
    HorizontalPodAutoscaler(HorizontalPodAutoscaler),
    /// KEDA autoscaler
    ScaledObject(ScaledObject),
    /// Composite contributing its own Deployments and autoscaler
    WebService(Box<WebService>),
    /// Any kind the aggregator does not account for
    Other {
        /// Declared kind
        kind: String,
        /// `metadata.name`, empty when unset
        name: String,
    },
}

impl ManifestObject {
    /// Parses a JSON object by dispatching on its `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::MissingKind`] if the object has no `kind`, and
    /// [`QuotaError::UnrecognizedWorkload`] if a known kind does not match its schema.
    pub fn from_value(value: Value) -> Result<Self, QuotaError> {
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .ok_or(QuotaError::MissingKind)?
            .to_string();
        let name = value
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let api_version = value
            .get("apiVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let parsed = match kind.as_str() {
            KIND_POD => serde_json::from_value(value).map(Self::Pod),
            KIND_CRON_JOB => serde_json::from_value(value).map(Self::CronJob),
            KIND_DAEMON_SET => serde_json::from_value(value).map(Self::DaemonSet),
            KIND_DEPLOYMENT => serde_json::from_value(value).map(Self::Deployment),
            KIND_JOB => serde_json::from_value(value).map(Self::Job),
            KIND_STATEFUL_SET => serde_json::from_value(value).map(Self::StatefulSet),
            KIND_HORIZONTAL_POD_AUTOSCALER if api_version == API_VERSION_AUTOSCALING_V1 => {
                serde_json::from_value::<HorizontalPodAutoscalerV1>(value)
                    .map(|hpa| Self::HorizontalPodAutoscaler(autoscaler_from_v1(hpa)))
            }
            KIND_HORIZONTAL_POD_AUTOSCALER => {
                serde_json::from_value(value).map(Self::HorizontalPodAutoscaler)
            }
            KIND_SCALED_OBJECT => serde_json::from_value(value).map(Self::ScaledObject),
            _ => return Ok(Self::Other { kind, name }),
        };

        parsed.map_err(|e| QuotaError::UnrecognizedWorkload {
            id: workload_id(&kind, &name),
            kind,
            reason: e.to_string(),
        })
    }

    /// Kind of the object.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Pod(_) => KIND_POD,
            Self::CronJob(_) => KIND_CRON_JOB,
            Self::DaemonSet(_) => KIND_DAEMON_SET,
            Self::Deployment(_) => KIND_DEPLOYMENT,
            Self::Job(_) => KIND_JOB,
            Self::StatefulSet(_) => KIND_STATEFUL_SET,
            Self::HorizontalPodAutoscaler(_) => KIND_HORIZONTAL_POD_AUTOSCALER,
            Self::ScaledObject(_) => KIND_SCALED_OBJECT,
            Self::WebService(_) => "WebService",
            Self::Other { kind, .. } => kind,
        }
    }

    /// Workload view of the object, if it schedules pods directly.
    #[must_use]
    pub fn as_workload(&self) -> Option<Workload<'_>> {
        match self {
            Self::Pod(pod) => Some(Workload::Pod(pod)),
            Self::CronJob(cron_job) => Some(Workload::CronJob(cron_job)),
            Self::DaemonSet(daemon_set) => Some(Workload::DaemonSet(daemon_set)),
            Self::Deployment(deployment) => Some(Workload::Deployment(deployment)),
            Self::Job(job) => Some(Workload::Job(job)),
            Self::StatefulSet(stateful_set) => Some(Workload::StatefulSet(stateful_set)),
            _ => None,
        }
    }
}

macro_rules! impl_from_object {
    ($($variant:ident => $object:ty),* $(,)?) => {
        $(
            impl From<$object> for ManifestObject {
                fn from(object: $object) -> Self {
                    Self::$variant(object)
                }
            }
        )*
    };
}

impl_from_object! {
    Pod => Pod,
    CronJob => CronJob,
    DaemonSet => DaemonSet,
    Deployment => Deployment,
    Job => Job,
    StatefulSet => StatefulSet,
    HorizontalPodAutoscaler => HorizontalPodAutoscaler,
    ScaledObject => ScaledObject,
}

impl From<WebService> for ManifestObject {
    fn from(web_service: WebService) -> Self {
        Self::WebService(Box::new(web_service))
    }
}

fn autoscaler_from_v1(hpa: HorizontalPodAutoscalerV1) -> HorizontalPodAutoscaler {
    HorizontalPodAutoscaler {
        metadata: hpa.metadata,
        spec: hpa.spec.map(|spec| HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: spec.scale_target_ref.api_version,
                kind: spec.scale_target_ref.kind,
                name: spec.scale_target_ref.name,
            },
            min_replicas: spec.min_replicas,
            max_replicas: spec.max_replicas,
            ..Default::default()
        }),
        status: None,
    }
}

/// Identifier correlating a workload with the autoscalers targeting it.
#[must_use]
pub fn workload_id(kind: &str, name: &str) -> String {
    format!("{kind}/{name}")
}

/// Borrowed view over an object that schedules pods.
#[derive(Clone, Copy, Debug)]
pub enum Workload<'a> {
    /// Bare pod
    Pod(&'a Pod),
    /// Scheduled job
    CronJob(&'a CronJob),
    /// One pod per node
    DaemonSet(&'a DaemonSet),
    /// Replicated stateless workload
    Deployment(&'a Deployment),
    /// Run-to-completion job
    Job(&'a Job),
    /// Replicated stateful workload
    StatefulSet(&'a StatefulSet),
}

impl<'a> Workload<'a> {
    /// Kind of the workload.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pod(_) => KIND_POD,
            Self::CronJob(_) => KIND_CRON_JOB,
            Self::DaemonSet(_) => KIND_DAEMON_SET,
            Self::Deployment(_) => KIND_DEPLOYMENT,
            Self::Job(_) => KIND_JOB,
            Self::StatefulSet(_) => KIND_STATEFUL_SET,
        }
    }

    fn metadata(&self) -> &'a ObjectMeta {
        match *self {
            Self::Pod(pod) => &pod.metadata,
            Self::CronJob(cron_job) => &cron_job.metadata,
            Self::DaemonSet(daemon_set) => &daemon_set.metadata,
            Self::Deployment(deployment) => &deployment.metadata,
            Self::Job(job) => &job.metadata,
            Self::StatefulSet(stateful_set) => &stateful_set.metadata,
        }
    }

    /// Name of the workload, empty when unset.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// `{kind}/{name}` identifier.
    #[must_use]
    pub fn id(&self) -> String {
        workload_id(self.kind(), self.name())
    }

    fn pod_spec(&self) -> Option<&'a PodSpec> {
        match *self {
            Self::Pod(pod) => pod.spec.as_ref(),
            Self::CronJob(cron_job) => cron_job
                .spec
                .as_ref()
                .and_then(|spec| spec.job_template.spec.as_ref())
                .and_then(|job| job.template.spec.as_ref()),
            Self::DaemonSet(daemon_set) => daemon_set
                .spec
                .as_ref()
                .and_then(|spec| spec.template.spec.as_ref()),
            Self::Deployment(deployment) => deployment
                .spec
                .as_ref()
                .and_then(|spec| spec.template.spec.as_ref()),
            Self::Job(job) => job
                .spec
                .as_ref()
                .and_then(|spec| spec.template.spec.as_ref()),
            Self::StatefulSet(stateful_set) => stateful_set
                .spec
                .as_ref()
                .and_then(|spec| spec.template.spec.as_ref()),
        }
    }

    /// Containers of the workload's pod template.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::UnrecognizedWorkload`] if the object carries no pod spec.
    pub fn containers(&self) -> Result<&'a [Container], QuotaError> {
        self.pod_spec()
            .map(|spec| spec.containers.as_slice())
            .ok_or_else(|| QuotaError::UnrecognizedWorkload {
                kind: self.kind().to_string(),
                id: self.id(),
                reason: "no pod spec found".to_string(),
            })
    }

    /// Declared replica count, for kinds that carry one.
    #[must_use]
    pub fn replicas(&self) -> Option<i32> {
        match self {
            Self::Deployment(deployment) => deployment.spec.as_ref().and_then(|s| s.replicas),
            Self::StatefulSet(stateful_set) => {
                stateful_set.spec.as_ref().and_then(|s| s.replicas)
            }
            _ => None,
        }
    }

    /// Extra pods allowed above `replicas` during a rolling update.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::InvalidIntOrPercent`] for a malformed `maxSurge`.
    pub fn surge(&self, replicas: i32) -> Result<i32, QuantityError> {
        let max_surge = match self {
            Self::Deployment(deployment) => {
                let strategy = deployment.spec.as_ref().and_then(|s| s.strategy.as_ref());
                if strategy.and_then(|s| s.type_.as_deref()) == Some("Recreate") {
                    return Ok(0);
                }
                strategy
                    .and_then(|s| s.rolling_update.as_ref())
                    .and_then(|r| r.max_surge.clone())
            }
            Self::DaemonSet(daemon_set) => {
                let strategy = daemon_set
                    .spec
                    .as_ref()
                    .and_then(|s| s.update_strategy.as_ref());
                if strategy.and_then(|s| s.type_.as_deref()) == Some("OnDelete") {
                    return Ok(0);
                }
                strategy
                    .and_then(|s| s.rolling_update.as_ref())
                    .and_then(|r| r.max_surge.clone())
            }
            _ => return Ok(0),
        };

        let max_surge =
            max_surge.unwrap_or_else(|| IntOrString::String(DEFAULT_MAX_SURGE.to_string()));
        resolve_int_or_percent(&max_surge, replicas, Rounding::Ceil)
    }
}

#[cfg(test)]
#[path = "workload_tests.rs"]
mod workload_tests;
