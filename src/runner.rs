//! Run orchestration: precondition check, probe selection and execution
//!
//! The runner verifies the Kubernetes API is reachable at all before any
//! probe runs; if it is not, the run short-circuits to a Fatal outcome with
//! an empty ledger (exit code 3), which callers can distinguish from an
//! ordinary Critical (exit code 2). Probes then run concurrently under one
//! overall deadline; a probe still pending at the deadline is recorded as a
//! Warning, never silently dropped.

use crate::check::{aggregate, CheckResult, RunOutcome, StatusLedger};
use crate::config::RunConfig;
use crate::probe::dependency::DependencyProbe;
use crate::probe::monitoring::MonitoringProbe;
use crate::probe::network::{IngressProbe, ServicesProbe};
use crate::probe::resources::ResourcesProbe;
use crate::probe::synthetic::SyntheticProbe;
use crate::probe::workload::WorkloadProbe;
use crate::probe::{Probe, Selection};
use kube::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct Runner {
    client: Client,
    config: RunConfig,
}

impl Runner {
    pub fn new(client: Client, config: RunConfig) -> Self {
        Self { client, config }
    }

    /// Execute one run for the given selection.
    ///
    /// Sequences: precondition -> probes -> aggregation. Reporting is the
    /// caller's job so the ledger and outcome stay inspectable.
    pub async fn run(&self, selection: Selection) -> (StatusLedger, RunOutcome) {
        // Precondition: can we reach the apiserver at all? Anything else is
        // meaningless if not.
        match tokio::time::timeout(self.config.probe_timeout, self.client.apiserver_version())
            .await
        {
            Ok(Ok(version)) => {
                debug!(version = %version.git_version, "Kubernetes API reachable");
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Kubernetes API unreachable, aborting run");
                return (
                    StatusLedger::new(),
                    RunOutcome::fatal(format!("cannot reach Kubernetes API: {}", e)),
                );
            }
            Err(_) => {
                warn!("Kubernetes API did not respond in time, aborting run");
                return (
                    StatusLedger::new(),
                    RunOutcome::fatal(format!(
                        "cannot reach Kubernetes API: no response within {}s",
                        self.config.probe_timeout.as_secs()
                    )),
                );
            }
        }

        let probes = self.build_probes(selection);
        info!(
            selection = ?selection,
            probes = probes.len(),
            namespace = %self.config.namespace,
            "Running health checks"
        );

        let ledger = run_probes(&probes, self.config.timeout).await;
        let outcome = aggregate(&ledger);
        info!(overall = %outcome.overall, checks = ledger.len(), "Run complete");
        (ledger, outcome)
    }

    fn build_probes(&self, selection: Selection) -> Vec<Box<dyn Probe>> {
        let c = &self.config;
        let client = &self.client;

        let mut probes: Vec<Box<dyn Probe>> = Vec::new();
        for component in selection.components() {
            match *component {
                "workload" => probes.push(Box::new(WorkloadProbe::new(
                    client.clone(),
                    &c.namespace,
                    &c.app,
                ))),
                "database" => probes.push(Box::new(DependencyProbe::database(
                    client.clone(),
                    &c.namespace,
                    &c.database_selector,
                ))),
                "cache" => probes.push(Box::new(DependencyProbe::cache(
                    client.clone(),
                    &c.namespace,
                    &c.cache_selector,
                ))),
                "network-services" => probes.push(Box::new(ServicesProbe::new(
                    client.clone(),
                    &c.namespace,
                    c.services.clone(),
                ))),
                "ingress" => probes.push(Box::new(IngressProbe::new(
                    client.clone(),
                    &c.namespace,
                    &c.app,
                ))),
                "synthetic-endpoints" => probes.push(Box::new(SyntheticProbe::new(
                    client.clone(),
                    &c.namespace,
                    &c.app,
                    c.app_port,
                    c.endpoint_url.clone(),
                    c.probe_timeout,
                ))),
                "monitoring" => probes.push(Box::new(MonitoringProbe::new(
                    client.clone(),
                    &c.monitoring_namespace,
                ))),
                "resources" => probes.push(Box::new(ResourcesProbe::new(
                    client.clone(),
                    &c.namespace,
                    &c.app,
                ))),
                other => debug!(component = other, "No probe registered for component"),
            }
        }
        probes
    }
}

/// Run a set of probes concurrently under one overall deadline and collect
/// their results into a ledger in probe order.
///
/// Aggregation is a commutative, associative max, so completion order does
/// not matter; recording in probe order keeps reports stable across runs.
pub(crate) async fn run_probes(probes: &[Box<dyn Probe>], timeout: Duration) -> StatusLedger {
    let deadline = tokio::time::Instant::now() + timeout;

    let tasks = probes.iter().map(|probe| async move {
        match tokio::time::timeout_at(deadline, probe.run()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(component = probe.component(), "Probe timed out");
                CheckResult::warning(
                    probe.component(),
                    format!("probe timed out after {}s", timeout.as_secs()),
                )
            }
        }
    });

    let mut ledger = StatusLedger::new();
    for result in futures::future::join_all(tasks).await {
        ledger.record(result);
    }
    ledger
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
