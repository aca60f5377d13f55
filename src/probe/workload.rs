//! Workload probe: the application Deployment and its pods
//!
//! Reads the Deployment to learn the declared replica count, then lists its
//! pods and counts running/ready instances. Classification:
//! - all running and all ready -> Healthy
//! - zero running -> Critical
//! - anything in between -> Warning

use super::{count_pods, Probe};
use crate::check::{CheckResult, Status};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;
use tracing::debug;

pub struct WorkloadProbe {
    client: Client,
    namespace: String,
    app: String,
}

impl WorkloadProbe {
    pub fn new(client: Client, namespace: &str, app: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            app: app.to_string(),
        }
    }

    /// Label selector string from the Deployment's matchLabels, falling back
    /// to `app=<name>` when the Deployment declares none.
    fn selector_for(&self, deployment: &Deployment) -> String {
        deployment
            .spec
            .as_ref()
            .and_then(|s| s.selector.match_labels.as_ref())
            .filter(|labels| !labels.is_empty())
            .map(|labels| {
                labels
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_else(|| format!("app={}", self.app))
    }
}

#[async_trait]
impl Probe for WorkloadProbe {
    fn component(&self) -> &'static str {
        "workload"
    }

    async fn run(&self) -> CheckResult {
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);

        let deployment = match deployments.get_opt(&self.app).await {
            Ok(Some(d)) => d,
            Ok(None) => {
                return CheckResult::critical(
                    self.component(),
                    format!("deployment {} not found in {}", self.app, self.namespace),
                );
            }
            Err(e) => {
                // Observation failure, not an observed outage
                return CheckResult::warning(
                    self.component(),
                    format!("cannot query deployments: {}", e),
                );
            }
        };

        let desired = deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(1)
            .max(0) as usize;

        let selector = self.selector_for(&deployment);
        debug!(selector = %selector, desired = desired, "Listing workload pods");

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let pod_list = match pods.list(&ListParams::default().labels(&selector)).await {
            Ok(list) => list.items,
            Err(e) => {
                return CheckResult::warning(
                    self.component(),
                    format!("cannot list pods for selector {}: {}", selector, e),
                );
            }
        };

        let counts = count_pods(&pod_list);
        let (status, message) = classify_workload(counts.running, counts.ready, desired);
        CheckResult::new(self.component(), status, message)
    }
}

/// Map running/ready counts against the declared total onto a status.
pub(crate) fn classify_workload(running: usize, ready: usize, desired: usize) -> (Status, String) {
    if running == 0 {
        return (
            Status::Critical,
            format!("0/{} pods running", desired),
        );
    }
    if running >= desired && ready >= desired {
        return (
            Status::Healthy,
            format!("{}/{} pods running, {}/{} ready", running, desired, ready, desired),
        );
    }
    (
        Status::Warning,
        format!("{}/{} pods running, {}/{} ready", running, desired, ready, desired),
    )
}
