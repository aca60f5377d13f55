//! Monitoring-stack probe
//!
//! Verifies the expected monitoring components have at least one Running pod
//! each. Absence degrades observability, not correctness, so the worst this
//! probe reports is Warning.

use super::Probe;
use crate::check::{CheckResult, Status};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;

/// Expected components and the label selectors that identify their pods.
const MONITORING_COMPONENTS: [(&str, &str); 2] = [
    ("prometheus", "app.kubernetes.io/name=prometheus"),
    ("grafana", "app.kubernetes.io/name=grafana"),
];

pub struct MonitoringProbe {
    client: Client,
    namespace: String,
}

impl MonitoringProbe {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
        }
    }
}

#[async_trait]
impl Probe for MonitoringProbe {
    fn component(&self) -> &'static str {
        "monitoring"
    }

    async fn run(&self) -> CheckResult {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let mut down: Vec<&str> = Vec::new();

        for (name, selector) in MONITORING_COMPONENTS {
            let list = match pods.list(&ListParams::default().labels(selector)).await {
                Ok(list) => list,
                Err(e) => {
                    return CheckResult::warning(
                        self.component(),
                        format!("cannot list monitoring pods: {}", e),
                    );
                }
            };

            let running = list.items.iter().any(|p| {
                p.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Running")
            });
            if !running {
                down.push(name);
            }
        }

        let (status, message) = classify_monitoring(&down);
        CheckResult::new(self.component(), status, message)
    }
}

pub(crate) fn classify_monitoring(down: &[&str]) -> (Status, String) {
    if down.is_empty() {
        (
            Status::Healthy,
            "monitoring stack running".to_string(),
        )
    } else {
        (
            Status::Warning,
            format!("monitoring components not running: {}", down.join(", ")),
        )
    }
}
