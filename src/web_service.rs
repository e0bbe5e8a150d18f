// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Web service construct with canary releases.
//!
//! A web service emits, per instance, a `Deployment`, a `Service` and an `Ingress`, plus an
//! optional `HorizontalPodAutoscaler` on the live `Deployment`. With `canary: true` a second
//! `-canary` instance is emitted and the [`CanaryStage`] decides:
//!
//! - whether the live `Deployment` exists (not during `canary` and `post-canary`);
//! - whether the live `Service` selector pins `canary=false` (only during `base` and
//!   `canary`), so after promotion the live `Service` reaches old and new pods alike.
//!
//! The canary `Deployment` always runs a single replica and its `Service` always selects
//! `canary=true`. All validation happens before any object is built.

use std::collections::BTreeMap;

use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentSpec},
    autoscaling::v2::{
        CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec,
        MetricSpec, MetricTarget, ResourceMetricSource,
    },
    core::v1::{
        Container, ContainerPort, EnvVar, HTTPGetAction, PodSpec, PodTemplateSpec, Probe,
        ResourceRequirements, Service, ServicePort, ServiceSpec,
    },
    networking::v1::{
        HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
        IngressServiceBackend, IngressSpec, ServiceBackendPort,
    },
};
use k8s_openapi::apimachinery::pkg::{
    apis::meta::v1::{LabelSelector, ObjectMeta},
    util::intstr::IntOrString,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::canary::{CanaryStage, Instance};
use crate::config::ChartConfig;
use crate::constants::{
    API_VERSION_APPS_V1, CANARY_REPLICAS, CONTAINER_NAME_NGINX, DEFAULT_INGRESS_CLASS,
    DEFAULT_INGRESS_PATH, DEFAULT_MIN_REPLICAS, DEFAULT_TARGET_CPU_UTILIZATION, HTTP_PORT_NAME,
    KIND_DEPLOYMENT, PROBE_FAILURE_THRESHOLD, PROBE_INITIAL_DELAY_SECS, PROBE_PERIOD_SECS,
    RESOURCE_CPU, WEB_SERVICE_PORT,
};
use crate::errors::WebServiceError;
use crate::labels::{K8S_INSTANCE, K8S_NAME, LABEL_CANARY, LOAD_BALANCER_NAME_ANNOTATION};
use crate::naming::{load_balancer_name, LoadBalancerNameParts};

/// Name of the application container port
const APP_PORT_NAME: &str = "app";

/// Properties of a [`WebService`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebServiceProps {
    /// Service name; the live instance uses it verbatim
    pub name: String,

    /// Application container image
    pub image: String,

    /// Port the application listens on
    pub port: i32,

    /// Environment variables of the application container
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Resource requests and limits of the application container
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,

    /// HTTP path probed for liveness and readiness
    #[serde(default)]
    pub health_check_path: Option<String>,

    /// Optional nginx sidecar fronting the application
    #[serde(default)]
    pub sidecar: Option<NginxSidecarProps>,

    /// Fixed replica count (exclusive with `horizontal_pod_autoscaler`)
    #[serde(default)]
    pub replicas: Option<i32>,

    /// Autoscaler settings (exclusive with `replicas`)
    #[serde(default)]
    pub horizontal_pod_autoscaler: Option<AutoscalerProps>,

    /// Emit a canary instance next to the live one
    #[serde(default)]
    pub canary: bool,

    /// Canary stage; falls back to the chart's stage
    #[serde(default)]
    pub stage: Option<CanaryStage>,

    /// Ingress settings
    #[serde(default)]
    pub ingress: IngressProps,
}

/// nginx sidecar container receiving the service traffic.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NginxSidecarProps {
    /// Sidecar image
    pub image: String,

    /// Port nginx listens on; must differ from the application port
    pub port: i32,

    /// Resource requests and limits of the sidecar
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
}

/// Horizontal autoscaling of the live `Deployment`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalerProps {
    /// Lower replica bound, 1 when unset
    #[serde(default)]
    pub min_replicas: Option<i32>,

    /// Upper replica bound
    pub max_replicas: i32,

    /// Average CPU utilization target in percent, 70 when unset
    #[serde(default)]
    pub target_cpu_utilization: Option<i32>,
}

/// Ingress and load balancer settings.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressProps {
    /// Hosts routed to the service
    pub hosts: Vec<String>,

    /// Identifier distinguishing several load balancers of one app
    #[serde(default)]
    pub instance_id: Option<String>,

    /// Extra ingress annotations
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    /// Ingress class, `alb` when unset
    #[serde(default)]
    pub ingress_class: Option<String>,

    /// Routed path prefix, `/` when unset
    #[serde(default)]
    pub path: Option<String>,
}

/// Objects emitted for one instance of a web service.
#[derive(Clone, Debug)]
pub struct InstanceObjects {
    /// Which instance these objects belong to
    pub instance: Instance,
    /// Load balancer name of the instance's ingress
    pub load_balancer_name: String,
    /// The `Deployment`, absent for the live instance during `canary` and `post-canary`
    pub deployment: Option<Deployment>,
    /// The `Service`
    pub service: Service,
    /// The `Ingress`
    pub ingress: Ingress,
}

/// A composed web service.
#[derive(Clone, Debug)]
pub struct WebService {
    name: String,
    stage: Option<CanaryStage>,
    instances: Vec<InstanceObjects>,
    horizontal_pod_autoscaler: Option<HorizontalPodAutoscaler>,
}

impl WebService {
    /// Validates `props` and builds every object of the web service.
    ///
    /// # Arguments
    ///
    /// * `chart` - Chart configuration (labels, namespace, docker tag, default canary stage)
    /// * `props` - Web service properties
    ///
    /// # Errors
    ///
    /// Returns a [`WebServiceError`] if the properties are inconsistent or a derived load
    /// balancer name is too long. Nothing is emitted in that case.
    pub fn new(chart: &ChartConfig, props: WebServiceProps) -> Result<Self, WebServiceError> {
        let stage = props.stage.or(chart.canary_stage);
        validate(&props, stage)?;

        let instances = Instance::for_service(props.canary);
        let load_balancer_names = instances
            .iter()
            .map(|&instance| {
                load_balancer_name(&LoadBalancerNameParts {
                    app: &chart.app,
                    instance_id: props.ingress.instance_id.as_deref(),
                    canary: instance.is_canary(),
                    environment: &chart.environment,
                    region: &chart.region,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let composer = Composer {
            chart,
            props: &props,
            stage,
        };

        let instances: Vec<InstanceObjects> = instances
            .iter()
            .zip(load_balancer_names)
            .map(|(&instance, lb_name)| composer.build_instance(instance, lb_name))
            .collect();

        let horizontal_pod_autoscaler = instances
            .iter()
            .find(|objects| objects.instance == Instance::Live && objects.deployment.is_some())
            .and_then(|_| {
                props
                    .horizontal_pod_autoscaler
                    .as_ref()
                    .map(|hpa| composer.build_autoscaler(hpa))
            });

        info!(
            name = %props.name,
            canary = props.canary,
            stage = ?stage,
            deployments = instances.iter().filter(|o| o.deployment.is_some()).count(),
            autoscaled = horizontal_pod_autoscaler.is_some(),
            "Composed web service"
        );

        Ok(Self {
            name: props.name,
            stage,
            instances,
            horizontal_pod_autoscaler,
        })
    }

    /// Service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective canary stage.
    #[must_use]
    pub fn stage(&self) -> Option<CanaryStage> {
        self.stage
    }

    /// Objects of every emitted instance, live first.
    #[must_use]
    pub fn instances(&self) -> &[InstanceObjects] {
        &self.instances
    }

    /// Objects of one instance, if emitted.
    #[must_use]
    pub fn instance(&self, instance: Instance) -> Option<&InstanceObjects> {
        self.instances.iter().find(|objects| objects.instance == instance)
    }

    /// Every emitted `Deployment`.
    pub fn deployments(&self) -> impl Iterator<Item = &Deployment> {
        self.instances
            .iter()
            .filter_map(|objects| objects.deployment.as_ref())
    }

    /// Every emitted `Service`.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.instances.iter().map(|objects| &objects.service)
    }

    /// Every emitted `Ingress`.
    pub fn ingresses(&self) -> impl Iterator<Item = &Ingress> {
        self.instances.iter().map(|objects| &objects.ingress)
    }

    /// Autoscaler of the live `Deployment`, if configured and the live `Deployment` exists.
    #[must_use]
    pub fn horizontal_pod_autoscaler(&self) -> Option<&HorizontalPodAutoscaler> {
        self.horizontal_pod_autoscaler.as_ref()
    }

    /// Serializes every emitted object, instance by instance.
    ///
    /// # Errors
    ///
    /// Returns an error if an object cannot be serialized.
    pub fn to_manifests(&self) -> Result<Vec<Value>, serde_json::Error> {
        let mut manifests = Vec::new();
        for objects in &self.instances {
            if let Some(deployment) = &objects.deployment {
                manifests.push(serde_json::to_value(deployment)?);
            }
            manifests.push(serde_json::to_value(&objects.service)?);
            manifests.push(serde_json::to_value(&objects.ingress)?);
        }
        if let Some(hpa) = &self.horizontal_pod_autoscaler {
            manifests.push(serde_json::to_value(hpa)?);
        }
        Ok(manifests)
    }
}

fn validate(props: &WebServiceProps, stage: Option<CanaryStage>) -> Result<(), WebServiceError> {
    let name = || props.name.clone();
    let out_of_range = |property: &str, value: i32, reason: &str| WebServiceError::OutOfRange {
        name: name(),
        property: property.to_string(),
        value: i64::from(value),
        reason: reason.to_string(),
    };

    if props.replicas.is_some() == props.horizontal_pod_autoscaler.is_some() {
        return Err(WebServiceError::ReplicasOrAutoscaler { name: name() });
    }
    if props.canary && stage.is_none() {
        return Err(WebServiceError::MissingCanaryStage { name: name() });
    }
    if !(1..=65535).contains(&props.port) {
        return Err(out_of_range("port", props.port, "must be between 1 and 65535"));
    }
    if let Some(sidecar) = &props.sidecar {
        if sidecar.port == props.port {
            return Err(WebServiceError::PortConflict {
                name: name(),
                port: props.port,
            });
        }
        if !(1..=65535).contains(&sidecar.port) {
            return Err(out_of_range(
                "sidecar.port",
                sidecar.port,
                "must be between 1 and 65535",
            ));
        }
    }
    if let Some(replicas) = props.replicas {
        if replicas < 0 {
            return Err(out_of_range("replicas", replicas, "must not be negative"));
        }
    }
    if let Some(hpa) = &props.horizontal_pod_autoscaler {
        let min = hpa.min_replicas.unwrap_or(DEFAULT_MIN_REPLICAS);
        if min < 1 {
            return Err(out_of_range(
                "horizontalPodAutoscaler.minReplicas",
                min,
                "must be at least 1",
            ));
        }
        if hpa.max_replicas < min {
            return Err(out_of_range(
                "horizontalPodAutoscaler.maxReplicas",
                hpa.max_replicas,
                "must not be below minReplicas",
            ));
        }
        let target = hpa
            .target_cpu_utilization
            .unwrap_or(DEFAULT_TARGET_CPU_UTILIZATION);
        if !(1..=100).contains(&target) {
            return Err(out_of_range(
                "horizontalPodAutoscaler.targetCpuUtilization",
                target,
                "must be between 1 and 100",
            ));
        }
    }
    if props.ingress.hosts.is_empty() {
        return Err(WebServiceError::MissingIngressHosts { name: name() });
    }
    Ok(())
}

/// Builds the objects of a validated web service.
struct Composer<'a> {
    chart: &'a ChartConfig,
    props: &'a WebServiceProps,
    stage: Option<CanaryStage>,
}

impl Composer<'_> {
    fn instance_name(&self, instance: Instance) -> String {
        format!("{}{}", self.props.name, instance.suffix())
    }

    /// Stage-driven decisions only apply when a canary instance exists.
    fn canary_stage(&self) -> Option<CanaryStage> {
        if self.props.canary {
            self.stage
        } else {
            None
        }
    }

    fn object_labels(&self, instance: Instance) -> BTreeMap<String, String> {
        let mut labels = self.chart.labels();
        labels.insert(K8S_NAME.into(), self.props.name.clone());
        labels.insert(K8S_INSTANCE.into(), self.instance_name(instance));
        if self.props.canary {
            labels.insert(LABEL_CANARY.into(), instance.discriminator().into());
        }
        labels
    }

    fn pod_labels(&self, instance: Instance) -> BTreeMap<String, String> {
        let mut labels = self.chart.labels();
        labels.extend(self.selector(instance, self.props.canary));
        labels
    }

    fn selector(&self, instance: Instance, discriminated: bool) -> BTreeMap<String, String> {
        let mut selector = BTreeMap::new();
        selector.insert(K8S_NAME.to_string(), self.props.name.clone());
        if discriminated {
            selector.insert(LABEL_CANARY.to_string(), instance.discriminator().to_string());
        }
        selector
    }

    fn service_selector(&self, instance: Instance) -> BTreeMap<String, String> {
        let discriminated = match (instance, self.canary_stage()) {
            (_, None) => false,
            (Instance::Canary, Some(_)) => true,
            (Instance::Live, Some(stage)) => stage.live_selector_is_discriminated(),
        };
        self.selector(instance, discriminated)
    }

    fn metadata(&self, instance: Instance) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.instance_name(instance)),
            namespace: self.chart.namespace.clone(),
            labels: Some(self.object_labels(instance)),
            ..Default::default()
        }
    }

    fn build_instance(&self, instance: Instance, load_balancer_name: String) -> InstanceObjects {
        let emits_deployment = match (instance, self.canary_stage()) {
            (Instance::Live, Some(stage)) => stage.emits_live_deployment(),
            _ => true,
        };
        debug!(
            name = %self.instance_name(instance),
            emits_deployment,
            load_balancer = %load_balancer_name,
            "Building web service instance"
        );

        InstanceObjects {
            instance,
            deployment: emits_deployment.then(|| self.build_deployment(instance)),
            service: self.build_service(instance),
            ingress: self.build_ingress(instance, &load_balancer_name),
            load_balancer_name,
        }
    }

    fn build_deployment(&self, instance: Instance) -> Deployment {
        let replicas = match instance {
            Instance::Canary => Some(CANARY_REPLICAS),
            // The autoscaler owns the replica count when configured.
            Instance::Live => self.props.replicas,
        };

        Deployment {
            metadata: self.metadata(instance),
            spec: Some(DeploymentSpec {
                replicas,
                selector: LabelSelector {
                    match_labels: Some(self.selector(instance, self.props.canary)),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(self.pod_labels(instance)),
                        ..Default::default()
                    }),
                    spec: Some(self.build_pod_spec()),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn build_pod_spec(&self) -> PodSpec {
        let mut containers = vec![self.build_app_container()];
        if let Some(sidecar) = &self.props.sidecar {
            containers.push(Container {
                name: CONTAINER_NAME_NGINX.into(),
                image: Some(self.image(&sidecar.image)),
                ports: Some(vec![ContainerPort {
                    name: Some(HTTP_PORT_NAME.into()),
                    container_port: sidecar.port,
                    protocol: Some("TCP".into()),
                    ..Default::default()
                }]),
                resources: sidecar.resources.clone(),
                ..Default::default()
            });
        }

        PodSpec {
            containers,
            ..Default::default()
        }
    }

    fn build_app_container(&self) -> Container {
        let env: Vec<EnvVar> = self
            .props
            .env
            .iter()
            .map(|(name, value)| EnvVar {
                name: name.clone(),
                value: Some(value.clone()),
                ..Default::default()
            })
            .collect();

        let probe = self.props.health_check_path.as_ref().map(|path| Probe {
            http_get: Some(HTTPGetAction {
                path: Some(path.clone()),
                port: IntOrString::Int(self.props.port),
                ..Default::default()
            }),
            initial_delay_seconds: Some(PROBE_INITIAL_DELAY_SECS),
            period_seconds: Some(PROBE_PERIOD_SECS),
            failure_threshold: Some(PROBE_FAILURE_THRESHOLD),
            ..Default::default()
        });

        Container {
            name: self.props.name.clone(),
            image: Some(self.image(&self.props.image)),
            ports: Some(vec![ContainerPort {
                name: Some(APP_PORT_NAME.into()),
                container_port: self.props.port,
                protocol: Some("TCP".into()),
                ..Default::default()
            }]),
            env: (!env.is_empty()).then_some(env),
            resources: self.props.resources.clone(),
            liveness_probe: probe.clone(),
            readiness_probe: probe,
            ..Default::default()
        }
    }

    /// Appends the chart's docker tag to images that carry neither a tag nor a digest.
    fn image(&self, image: &str) -> String {
        let last_segment = image.rsplit('/').next().unwrap_or(image);
        match &self.chart.docker_tag {
            Some(tag) if !last_segment.contains(':') && !image.contains('@') => {
                format!("{image}:{tag}")
            }
            _ => image.to_string(),
        }
    }

    fn build_service(&self, instance: Instance) -> Service {
        let target_port = self
            .props
            .sidecar
            .as_ref()
            .map_or(self.props.port, |sidecar| sidecar.port);

        Service {
            metadata: self.metadata(instance),
            spec: Some(ServiceSpec {
                selector: Some(self.service_selector(instance)),
                ports: Some(vec![ServicePort {
                    name: Some(HTTP_PORT_NAME.into()),
                    port: WEB_SERVICE_PORT,
                    target_port: Some(IntOrString::Int(target_port)),
                    protocol: Some("TCP".into()),
                    ..Default::default()
                }]),
                type_: Some("ClusterIP".into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn build_ingress(&self, instance: Instance, load_balancer_name: &str) -> Ingress {
        let ingress = &self.props.ingress;
        let mut annotations = ingress.annotations.clone();
        annotations.insert(
            LOAD_BALANCER_NAME_ANNOTATION.into(),
            load_balancer_name.to_string(),
        );

        let path = HTTPIngressPath {
            path: Some(
                ingress
                    .path
                    .clone()
                    .unwrap_or_else(|| DEFAULT_INGRESS_PATH.into()),
            ),
            path_type: "Prefix".into(),
            backend: IngressBackend {
                service: Some(IngressServiceBackend {
                    name: self.instance_name(instance),
                    port: Some(ServiceBackendPort {
                        number: Some(WEB_SERVICE_PORT),
                        ..Default::default()
                    }),
                }),
                ..Default::default()
            },
        };

        let rules = ingress
            .hosts
            .iter()
            .map(|host| IngressRule {
                host: Some(host.clone()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![path.clone()],
                }),
            })
            .collect();

        let mut metadata = self.metadata(instance);
        metadata.annotations = Some(annotations);

        Ingress {
            metadata,
            spec: Some(IngressSpec {
                ingress_class_name: Some(
                    ingress
                        .ingress_class
                        .clone()
                        .unwrap_or_else(|| DEFAULT_INGRESS_CLASS.into()),
                ),
                rules: Some(rules),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn build_autoscaler(&self, hpa: &AutoscalerProps) -> HorizontalPodAutoscaler {
        let target = self.instance_name(Instance::Live);

        HorizontalPodAutoscaler {
            metadata: self.metadata(Instance::Live),
            spec: Some(HorizontalPodAutoscalerSpec {
                scale_target_ref: CrossVersionObjectReference {
                    api_version: Some(API_VERSION_APPS_V1.into()),
                    kind: KIND_DEPLOYMENT.into(),
                    name: target,
                },
                min_replicas: Some(hpa.min_replicas.unwrap_or(DEFAULT_MIN_REPLICAS)),
                max_replicas: hpa.max_replicas,
                metrics: Some(vec![MetricSpec {
                    type_: "Resource".into(),
                    resource: Some(ResourceMetricSource {
                        name: RESOURCE_CPU.into(),
                        target: MetricTarget {
                            type_: "Utilization".into(),
                            average_utilization: Some(
                                hpa.target_cpu_utilization
                                    .unwrap_or(DEFAULT_TARGET_CPU_UTILIZATION),
                            ),
                            ..Default::default()
                        },
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[cfg(test)]
#[path = "web_service_tests.rs"]
mod web_service_tests;
