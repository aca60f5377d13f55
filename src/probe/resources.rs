//! Resource-utilization probe via the Kubernetes metrics API
//!
//! `metrics.k8s.io` is not covered by k8s-openapi, so the probe issues a raw
//! request through the kube client and deserializes into local types. CPU and
//! memory quantities are parsed numerically and compared per container
//! against the declared limits with a fixed high-water mark. Resource
//! pressure alone is not an outage, so this probe never reports Critical.

use super::Probe;
use crate::check::{CheckResult, Status};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Utilization above this fraction of the declared limit is reported
const HIGH_WATER_MARK: f64 = 0.8;

#[derive(Debug, Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,

    #[error("invalid quantity: {0}")]
    Invalid(String),
}

/// Response shape of `GET /apis/metrics.k8s.io/v1beta1/namespaces/{ns}/pods`
#[derive(Debug, Deserialize)]
pub(crate) struct PodMetricsList {
    pub items: Vec<PodMetrics>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PodMetrics {
    pub metadata: PodMetricsMeta,
    pub containers: Vec<ContainerMetrics>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PodMetricsMeta {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContainerMetrics {
    pub name: String,
    pub usage: ResourceUsage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceUsage {
    pub cpu: String,
    pub memory: String,
}

/// One usage-over-limit ratio for a container resource.
#[derive(Debug, Clone)]
pub(crate) struct ResourceSample {
    pub pod: String,
    pub container: String,
    pub resource: &'static str,
    /// usage divided by declared limit
    pub ratio: f64,
}

pub struct ResourcesProbe {
    client: Client,
    namespace: String,
    app: String,
}

impl ResourcesProbe {
    pub fn new(client: Client, namespace: &str, app: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            app: app.to_string(),
        }
    }

    async fn fetch_metrics(&self, selector: &str) -> Result<PodMetricsList, kube::Error> {
        let path = format!(
            "/apis/metrics.k8s.io/v1beta1/namespaces/{}/pods?labelSelector={}",
            self.namespace,
            selector.replace('=', "%3D").replace(',', "%2C")
        );
        let request = http::Request::get(path)
            .body(Vec::new())
            .map_err(kube::Error::HttpError)?;
        self.client.request::<PodMetricsList>(request).await
    }

    /// Declared limits per (pod, container), parsed into cores and bytes.
    async fn fetch_limits(
        &self,
        selector: &str,
    ) -> Result<HashMap<(String, String), (Option<f64>, Option<f64>)>, kube::Error> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = pods.list(&ListParams::default().labels(selector)).await?;

        let mut limits = HashMap::new();
        for pod in &list.items {
            let Some(pod_name) = pod.metadata.name.clone() else { continue };
            let Some(spec) = &pod.spec else { continue };

            for container in &spec.containers {
                let declared = container
                    .resources
                    .as_ref()
                    .and_then(|r| r.limits.as_ref());
                let cpu = declared
                    .and_then(|l| l.get("cpu"))
                    .and_then(|q| parse_cpu(&q.0).ok());
                let memory = declared
                    .and_then(|l| l.get("memory"))
                    .and_then(|q| parse_memory(&q.0).ok());
                limits.insert((pod_name.clone(), container.name.clone()), (cpu, memory));
            }
        }
        Ok(limits)
    }
}

#[async_trait]
impl Probe for ResourcesProbe {
    fn component(&self) -> &'static str {
        "resources"
    }

    async fn run(&self) -> CheckResult {
        let selector = format!("app={}", self.app);

        let metrics = match self.fetch_metrics(&selector).await {
            Ok(m) => m,
            Err(e) => {
                return CheckResult::warning(
                    self.component(),
                    format!("metrics API unavailable: {}", e),
                );
            }
        };

        let limits = match self.fetch_limits(&selector).await {
            Ok(l) => l,
            Err(e) => {
                return CheckResult::warning(
                    self.component(),
                    format!("cannot read declared limits: {}", e),
                );
            }
        };

        let mut samples = Vec::new();
        for pod in &metrics.items {
            for container in &pod.containers {
                let key = (pod.metadata.name.clone(), container.name.clone());
                let Some((cpu_limit, mem_limit)) = limits.get(&key) else { continue };

                if let (Some(limit), Ok(usage)) = (cpu_limit, parse_cpu(&container.usage.cpu)) {
                    if *limit > 0.0 {
                        samples.push(ResourceSample {
                            pod: pod.metadata.name.clone(),
                            container: container.name.clone(),
                            resource: "cpu",
                            ratio: usage / limit,
                        });
                    }
                }
                if let (Some(limit), Ok(usage)) =
                    (mem_limit, parse_memory(&container.usage.memory))
                {
                    if *limit > 0.0 {
                        samples.push(ResourceSample {
                            pod: pod.metadata.name.clone(),
                            container: container.name.clone(),
                            resource: "memory",
                            ratio: usage / limit,
                        });
                    }
                }
            }
        }

        debug!(samples = samples.len(), "Resource samples collected");
        let (status, message) = classify_resources(&samples, HIGH_WATER_MARK);
        CheckResult::new(self.component(), status, message)
    }
}

pub(crate) fn classify_resources(samples: &[ResourceSample], threshold: f64) -> (Status, String) {
    if samples.is_empty() {
        return (
            Status::Healthy,
            "no resource limits declared, utilization check skipped".to_string(),
        );
    }

    let over: Vec<String> = samples
        .iter()
        .filter(|s| s.ratio > threshold)
        .map(|s| {
            format!(
                "{}/{} {} at {:.0}% of limit",
                s.pod,
                s.container,
                s.resource,
                s.ratio * 100.0
            )
        })
        .collect();

    if over.is_empty() {
        (
            Status::Healthy,
            format!(
                "{} usage samples below {:.0}% of limits",
                samples.len(),
                threshold * 100.0
            ),
        )
    } else {
        (Status::Warning, over.join("; "))
    }
}

/// Parse a Kubernetes CPU quantity into cores.
///
/// Accepts plain core counts ("1", "0.5") and the `n`/`u`/`m` suffixes the
/// metrics server emits (nanocores, microcores, millicores).
pub(crate) fn parse_cpu(quantity: &str) -> Result<f64, QuantityError> {
    let quantity = quantity.trim();
    if quantity.is_empty() {
        return Err(QuantityError::Empty);
    }

    let (number, scale) = match quantity.as_bytes()[quantity.len() - 1] {
        b'n' => (&quantity[..quantity.len() - 1], 1e-9),
        b'u' => (&quantity[..quantity.len() - 1], 1e-6),
        b'm' => (&quantity[..quantity.len() - 1], 1e-3),
        _ => (quantity, 1.0),
    };

    number
        .parse::<f64>()
        .map(|v| v * scale)
        .map_err(|_| QuantityError::Invalid(quantity.to_string()))
}

/// Parse a Kubernetes memory quantity into bytes.
///
/// Accepts binary suffixes (Ki, Mi, Gi, Ti), decimal suffixes (k, M, G, T)
/// and plain byte counts.
pub(crate) fn parse_memory(quantity: &str) -> Result<f64, QuantityError> {
    let quantity = quantity.trim();
    if quantity.is_empty() {
        return Err(QuantityError::Empty);
    }

    const SUFFIXES: [(&str, f64); 8] = [
        ("Ki", 1024.0),
        ("Mi", 1024.0 * 1024.0),
        ("Gi", 1024.0 * 1024.0 * 1024.0),
        ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("k", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
    ];

    for (suffix, scale) in SUFFIXES {
        if let Some(number) = quantity.strip_suffix(suffix) {
            return number
                .parse::<f64>()
                .map(|v| v * scale)
                .map_err(|_| QuantityError::Invalid(quantity.to_string()));
        }
    }

    quantity
        .parse::<f64>()
        .map_err(|_| QuantityError::Invalid(quantity.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_quantities() {
        assert_eq!(parse_cpu("1").unwrap(), 1.0);
        assert_eq!(parse_cpu("500m").unwrap(), 0.5);
        assert_eq!(parse_cpu("250000000n").unwrap(), 0.25);
        assert_eq!(parse_cpu("1500u").unwrap(), 0.0015);
    }

    #[test]
    fn test_parse_cpu_rejects_garbage() {
        assert!(matches!(parse_cpu(""), Err(QuantityError::Empty)));
        assert!(matches!(parse_cpu("abc"), Err(QuantityError::Invalid(_))));
    }

    #[test]
    fn test_parse_memory_quantities() {
        assert_eq!(parse_memory("128Mi").unwrap(), 128.0 * 1024.0 * 1024.0);
        assert_eq!(parse_memory("1Gi").unwrap(), 1024.0 * 1024.0 * 1024.0);
        assert_eq!(parse_memory("1000k").unwrap(), 1_000_000.0);
        assert_eq!(parse_memory("2048").unwrap(), 2048.0);
    }

    #[test]
    fn test_parse_memory_rejects_garbage() {
        assert!(matches!(parse_memory(""), Err(QuantityError::Empty)));
        assert!(matches!(parse_memory("12Qi"), Err(QuantityError::Invalid(_))));
    }

    #[test]
    fn test_classify_no_samples_is_healthy() {
        let (status, message) = classify_resources(&[], 0.8);
        assert_eq!(status, Status::Healthy);
        assert!(message.contains("skipped"));
    }

    #[test]
    fn test_classify_all_below_watermark() {
        let samples = vec![ResourceSample {
            pod: "app-1".to_string(),
            container: "app".to_string(),
            resource: "cpu",
            ratio: 0.5,
        }];
        let (status, message) = classify_resources(&samples, 0.8);
        assert_eq!(status, Status::Healthy);
        assert_eq!(message, "1 usage samples below 80% of limits");
    }

    #[test]
    fn test_classify_over_watermark_is_warning() {
        let samples = vec![
            ResourceSample {
                pod: "app-1".to_string(),
                container: "app".to_string(),
                resource: "cpu",
                ratio: 0.5,
            },
            ResourceSample {
                pod: "app-2".to_string(),
                container: "app".to_string(),
                resource: "memory",
                ratio: 0.91,
            },
        ];
        let (status, message) = classify_resources(&samples, 0.8);
        assert_eq!(status, Status::Warning);
        assert_eq!(message, "app-2/app memory at 91% of limit");
    }

    #[test]
    fn test_pod_metrics_deserialization() {
        // Shape returned by the metrics server
        let json = r#"{
            "kind": "PodMetricsList",
            "apiVersion": "metrics.k8s.io/v1beta1",
            "items": [
                {
                    "metadata": {"name": "app-7c9d-x1"},
                    "timestamp": "2024-05-01T12:00:00Z",
                    "containers": [
                        {"name": "app", "usage": {"cpu": "250m", "memory": "128Mi"}}
                    ]
                }
            ]
        }"#;

        let parsed: PodMetricsList = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].metadata.name, "app-7c9d-x1");
        assert_eq!(parsed.items[0].containers[0].usage.cpu, "250m");
    }
}
