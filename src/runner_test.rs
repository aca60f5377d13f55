//! Tests for probe orchestration: deadlines, ordering, aggregation

use super::*;
use crate::check::{Overall, Status};
use async_trait::async_trait;

/// Probe stub returning a fixed result after an optional delay
struct StaticProbe {
    component: &'static str,
    status: Status,
    message: &'static str,
    delay: Duration,
}

impl StaticProbe {
    fn new(component: &'static str, status: Status, message: &'static str) -> Box<dyn Probe> {
        Box::new(Self {
            component,
            status,
            message,
            delay: Duration::ZERO,
        })
    }

    fn slow(component: &'static str, delay: Duration) -> Box<dyn Probe> {
        Box::new(Self {
            component,
            status: Status::Healthy,
            message: "eventually fine",
            delay,
        })
    }
}

#[async_trait]
impl Probe for StaticProbe {
    fn component(&self) -> &'static str {
        self.component
    }

    async fn run(&self) -> CheckResult {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        CheckResult::new(self.component, self.status, self.message)
    }
}

#[tokio::test]
async fn test_run_probes_records_in_probe_order() {
    let probes = vec![
        StaticProbe::new("workload", Status::Healthy, "3/3 ready"),
        StaticProbe::new("database", Status::Healthy, "up"),
        StaticProbe::new("cache", Status::Warning, "no endpoints found"),
    ];

    let ledger = run_probes(&probes, Duration::from_secs(5)).await;

    let components: Vec<&str> = ledger.all().iter().map(|r| r.component.as_str()).collect();
    assert_eq!(components, vec!["workload", "database", "cache"]);

    let outcome = aggregate(&ledger);
    assert_eq!(outcome.overall, Overall::Warning);
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_probe_becomes_timeout_warning() {
    // Scenario E: a probe that outlives the deadline is synthesized as a
    // Warning, not dropped
    let probes = vec![
        StaticProbe::new("workload", Status::Healthy, "3/3 ready"),
        StaticProbe::slow("database", Duration::from_secs(60)),
    ];

    let ledger = run_probes(&probes, Duration::from_secs(2)).await;

    assert_eq!(ledger.len(), 2);
    let database = &ledger.all()[1];
    assert_eq!(database.component, "database");
    assert_eq!(database.status, Status::Warning);
    assert_eq!(database.message, "probe timed out after 2s");

    let outcome = aggregate(&ledger);
    assert_eq!(outcome.overall, Overall::Warning);
}

#[tokio::test(start_paused = true)]
async fn test_probes_run_concurrently_under_shared_deadline() {
    // Two probes each slower than half the deadline still both finish,
    // because they run concurrently against the same deadline
    let probes = vec![
        StaticProbe::slow("workload", Duration::from_secs(3)),
        StaticProbe::slow("database", Duration::from_secs(3)),
    ];

    let ledger = run_probes(&probes, Duration::from_secs(4)).await;

    assert_eq!(ledger.len(), 2);
    assert!(ledger.all().iter().all(|r| r.status == Status::Healthy));
}

#[tokio::test]
async fn test_single_warning_probe_run() {
    // Scenario D: a subset run invoking only one probe
    let probes = vec![StaticProbe::new(
        "synthetic-endpoints",
        Status::Warning,
        "1/2 endpoints responding",
    )];

    let ledger = run_probes(&probes, Duration::from_secs(5)).await;

    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.all()[0].component, "synthetic-endpoints");

    let outcome = aggregate(&ledger);
    assert_eq!(outcome.overall, Overall::Warning);
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn test_empty_probe_set_is_healthy() {
    let ledger = run_probes(&[], Duration::from_secs(5)).await;
    assert!(ledger.is_empty());

    // Empty by choice, not by failure
    let outcome = aggregate(&ledger);
    assert_eq!(outcome.overall, Overall::Healthy);
    assert_eq!(outcome.exit_code(), 0);
}
