//! Probe interface and concrete probes for each application subsystem
//!
//! Each probe queries one external collaborator (the Kubernetes API, the
//! metrics API, a synthetic HTTP endpoint) and maps what it sees onto a
//! three-valued [`Status`]. Probes never panic and never return errors:
//! ordinary failure (service absent, timeout, partial availability) becomes a
//! Warning or Critical result, and a probe whose own query mechanism is
//! unavailable reports Warning naming the missing capability rather than
//! silently omitting its result.

pub mod dependency;
pub mod monitoring;
pub mod network;
pub mod resources;
pub mod synthetic;
pub mod workload;

use crate::check::CheckResult;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;

/// One unit of health-check work.
///
/// `run` is infallible by contract: every failure mode is encoded in the
/// returned [`CheckResult`]. The single escalation above this model is the
/// precondition check in the runner, which fires before any probe exists.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Short stable component identifier, unique per run
    fn component(&self) -> &'static str;

    /// Query the collaborator and classify what was observed.
    async fn run(&self) -> CheckResult;
}

/// Which probes a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Selection {
    /// Full run over every component (the default)
    Check,
    /// Workload pods only
    App,
    /// Backing services only (database and cache)
    Database,
    /// Monitoring stack only
    Monitoring,
    /// Synthetic endpoint probes only
    Endpoints,
}

impl Selection {
    /// Component identifiers this selection covers, in invocation order.
    pub fn components(&self) -> &'static [&'static str] {
        match self {
            Selection::Check => &[
                "workload",
                "database",
                "cache",
                "network-services",
                "ingress",
                "synthetic-endpoints",
                "monitoring",
                "resources",
            ],
            Selection::App => &["workload"],
            Selection::Database => &["database", "cache"],
            Selection::Monitoring => &["monitoring"],
            Selection::Endpoints => &["synthetic-endpoints"],
        }
    }
}

/// Running/ready counts over a set of pods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct PodCounts {
    pub total: usize,
    pub running: usize,
    pub ready: usize,
}

/// Count pods in the Running phase and pods whose Ready condition is True.
pub(crate) fn count_pods(pods: &[Pod]) -> PodCounts {
    let mut counts = PodCounts {
        total: pods.len(),
        ..Default::default()
    };

    for pod in pods {
        let Some(status) = &pod.status else { continue };

        if status.phase.as_deref() == Some("Running") {
            counts.running += 1;
        }

        let ready = status
            .conditions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|c| c.type_ == "Ready" && c.status == "True");
        if ready {
            counts.ready += 1;
        }
    }

    counts
}
