//! Network exposure probes: service endpoints and ingress presence

use super::Probe;
use crate::check::{CheckResult, Status};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Endpoints;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::Api;
use kube::Client;
use tracing::debug;

/// Checks that every declared logical service has at least one reachable
/// network endpoint.
pub struct ServicesProbe {
    client: Client,
    namespace: String,
    services: Vec<String>,
}

impl ServicesProbe {
    pub fn new(client: Client, namespace: &str, services: Vec<String>) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            services,
        }
    }
}

fn has_addresses(endpoints: &Endpoints) -> bool {
    endpoints
        .subsets
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|s| s.addresses.as_deref().is_some_and(|a| !a.is_empty()))
}

#[async_trait]
impl Probe for ServicesProbe {
    fn component(&self) -> &'static str {
        "network-services"
    }

    async fn run(&self) -> CheckResult {
        if self.services.is_empty() {
            return CheckResult::warning(self.component(), "no services declared");
        }

        let api: Api<Endpoints> = Api::namespaced(self.client.clone(), &self.namespace);
        let mut reachable = 0usize;
        let mut missing: Vec<&str> = Vec::new();

        for service in &self.services {
            match api.get_opt(service).await {
                Ok(Some(ep)) if has_addresses(&ep) => reachable += 1,
                Ok(_) => missing.push(service),
                Err(e) => {
                    return CheckResult::warning(
                        self.component(),
                        format!("cannot query endpoints for {}: {}", service, e),
                    );
                }
            }
        }

        debug!(reachable = reachable, total = self.services.len(), "Service endpoints checked");
        let (status, message) = classify_services(reachable, self.services.len(), &missing);
        CheckResult::new(self.component(), status, message)
    }
}

pub(crate) fn classify_services(
    reachable: usize,
    total: usize,
    missing: &[&str],
) -> (Status, String) {
    if reachable == total {
        return (
            Status::Healthy,
            format!("{}/{} services have endpoints", reachable, total),
        );
    }
    if reachable == 0 {
        return (
            Status::Critical,
            format!("no service has endpoints ({})", missing.join(", ")),
        );
    }
    (
        Status::Warning,
        format!(
            "{}/{} services have endpoints, missing: {}",
            reachable,
            total,
            missing.join(", ")
        ),
    )
}

/// Presence-only ingress check. Absence is a Warning rather than Critical:
/// traffic may legitimately be routed another way.
pub struct IngressProbe {
    client: Client,
    namespace: String,
    name: String,
}

impl IngressProbe {
    pub fn new(client: Client, namespace: &str, name: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Probe for IngressProbe {
    fn component(&self) -> &'static str {
        "ingress"
    }

    async fn run(&self) -> CheckResult {
        let api: Api<Ingress> = Api::namespaced(self.client.clone(), &self.namespace);

        match api.get_opt(&self.name).await {
            Ok(Some(_)) => CheckResult::healthy(
                self.component(),
                format!("ingress {} present", self.name),
            ),
            Ok(None) => CheckResult::warning(
                self.component(),
                format!("ingress {} not found", self.name),
            ),
            Err(e) => CheckResult::warning(
                self.component(),
                format!("cannot query ingress {}: {}", self.name, e),
            ),
        }
    }
}
