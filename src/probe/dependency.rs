//! Backing-service probes: database and cache pods by label selector
//!
//! Same ready-count logic as the workload probe, with one deliberate policy
//! difference: if the pod list cannot even be obtained the result is Warning,
//! not Critical, because the probe could not observe reality. "Unobservable"
//! is reported distinctly from "observed bad".

use super::{count_pods, Probe};
use crate::check::{CheckResult, Status};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;

/// Probe for one backing service (database, cache) identified by a label
/// selector. The component id is fixed at construction so one type serves
/// both roles.
pub struct DependencyProbe {
    client: Client,
    namespace: String,
    component: &'static str,
    selector: String,
}

impl DependencyProbe {
    pub fn database(client: Client, namespace: &str, selector: &str) -> Self {
        Self::new(client, namespace, "database", selector)
    }

    pub fn cache(client: Client, namespace: &str, selector: &str) -> Self {
        Self::new(client, namespace, "cache", selector)
    }

    fn new(client: Client, namespace: &str, component: &'static str, selector: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            component,
            selector: selector.to_string(),
        }
    }
}

#[async_trait]
impl Probe for DependencyProbe {
    fn component(&self) -> &'static str {
        self.component
    }

    async fn run(&self) -> CheckResult {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);

        let pod_list = match pods.list(&ListParams::default().labels(&self.selector)).await {
            Ok(list) => list.items,
            Err(e) => {
                return CheckResult::warning(
                    self.component,
                    format!("cannot list {} pods ({}): {}", self.component, self.selector, e),
                );
            }
        };

        let counts = count_pods(&pod_list);
        let (status, message) = classify_dependency(counts.running, counts.ready, counts.total);
        CheckResult::new(self.component, status, message)
    }
}

/// Ready-count classification for a backing service.
pub(crate) fn classify_dependency(
    running: usize,
    ready: usize,
    total: usize,
) -> (Status, String) {
    if total == 0 {
        return (Status::Critical, "no pods match selector".to_string());
    }
    if running == 0 {
        return (Status::Critical, format!("0/{} pods running", total));
    }
    if ready == total {
        return (Status::Healthy, format!("{}/{} pods ready", ready, total));
    }
    (
        Status::Warning,
        format!("{}/{} pods running, {}/{} ready", running, total, ready, total),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_all_ready() {
        let (status, message) = classify_dependency(2, 2, 2);
        assert_eq!(status, Status::Healthy);
        assert_eq!(message, "2/2 pods ready");
    }

    #[test]
    fn test_classify_no_matching_pods() {
        let (status, message) = classify_dependency(0, 0, 0);
        assert_eq!(status, Status::Critical);
        assert_eq!(message, "no pods match selector");
    }

    #[test]
    fn test_classify_none_running() {
        let (status, _) = classify_dependency(0, 0, 2);
        assert_eq!(status, Status::Critical);
    }

    #[test]
    fn test_classify_partially_ready() {
        let (status, message) = classify_dependency(2, 1, 2);
        assert_eq!(status, Status::Warning);
        assert!(message.contains("1/2 ready"));
    }
}
