use serde::Serialize;
use std::fmt;

/// Severity of a single health check.
///
/// A closed three-valued enum with a total order: `Healthy < Warning < Critical`.
/// The derived `Ord` is what makes the aggregator's `max` reduction type-safe;
/// anything a probe cannot express in these three values is a defect in the
/// probe, not a fourth state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Warning,
    Critical,
}

impl Status {
    /// Uppercase tag used in the text report (`HEALTHY` / `WARNING` / `CRITICAL`)
    pub fn tag(&self) -> &'static str {
        match self {
            Status::Healthy => "HEALTHY",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Immutable result of one probe invocation.
///
/// `message` is always present, even for Healthy results (e.g. "3/3 pods ready"),
/// so the report never shows a bare status without context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub component: String,
    pub status: Status,
    pub message: String,
}

impl CheckResult {
    pub fn new(component: impl Into<String>, status: Status, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status,
            message: message.into(),
        }
    }

    pub fn healthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(component, Status::Healthy, message)
    }

    pub fn warning(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(component, Status::Warning, message)
    }

    pub fn critical(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(component, Status::Critical, message)
    }
}

/// Ordered collection of check results for one run.
///
/// Append-only: `record` either appends or, when a result for the same
/// component already exists, overwrites it in place (keeping its original
/// position). There is no removal. The ledger is discarded at the end of the
/// run; nothing persists across runs.
#[derive(Debug, Default, Clone, Serialize)]
pub struct StatusLedger {
    results: Vec<CheckResult>,
}

impl StatusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result, overwriting any prior entry for the same component.
    pub fn record(&mut self, result: CheckResult) {
        match self
            .results
            .iter_mut()
            .find(|r| r.component == result.component)
        {
            Some(existing) => *existing = result,
            None => self.results.push(result),
        }
    }

    /// All results in insertion order.
    pub fn all(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}
