use super::status::{Status, StatusLedger};
use serde::Serialize;
use std::fmt;

/// Overall verdict of a run.
///
/// The first three variants mirror [`Status`]; `Fatal` sits outside the normal
/// three-state order and is reserved for precondition failures (the Kubernetes
/// API could not be reached at all), so automation can tell "your app is
/// broken" apart from "I couldn't even check".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Overall {
    Healthy,
    Warning,
    Critical,
    Fatal,
}

impl Overall {
    /// Process exit code for this verdict.
    ///
    /// Stable contract relied on by callers (CI gating, rollback automation):
    /// Healthy=0, Warning=1, Critical=2, Fatal=3. Must never change meaning.
    pub fn exit_code(&self) -> i32 {
        match self {
            Overall::Healthy => 0,
            Overall::Warning => 1,
            Overall::Critical => 2,
            Overall::Fatal => 3,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Overall::Healthy => "HEALTHY",
            Overall::Warning => "WARNING",
            Overall::Critical => "CRITICAL",
            Overall::Fatal => "FATAL",
        }
    }
}

impl From<Status> for Overall {
    fn from(status: Status) -> Self {
        match status {
            Status::Healthy => Overall::Healthy,
            Status::Warning => Overall::Warning,
            Status::Critical => Overall::Critical,
        }
    }
}

impl fmt::Display for Overall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Derived outcome of one run: overall verdict plus an optional diagnostic
/// (set on the fatal path, where there are no check results to explain it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub overall: Overall,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunOutcome {
    /// Fatal outcome for a precondition failure. Short-circuits the whole run;
    /// no probe results exist, so the diagnostic travels on the outcome itself.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            overall: Overall::Fatal,
            message: Some(message.into()),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.overall.exit_code()
    }
}

/// Reduce a ledger to one overall outcome.
///
/// `overall = max(status of all results)` under `Healthy < Warning < Critical`.
/// An empty ledger here means a deliberate subset run asked for zero applicable
/// probes and is Healthy; the other empty-ledger case (precondition failure)
/// never reaches this function because the runner short-circuits to
/// [`RunOutcome::fatal`] first.
pub fn aggregate(ledger: &StatusLedger) -> RunOutcome {
    let overall = ledger
        .all()
        .iter()
        .map(|r| r.status)
        .max()
        .map(Overall::from)
        .unwrap_or(Overall::Healthy);

    RunOutcome {
        overall,
        message: None,
    }
}
