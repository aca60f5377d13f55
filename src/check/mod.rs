//! Core health-check model: status values, check results, the per-run ledger
//! and the aggregation that reduces a ledger to one overall outcome.

mod outcome;
mod status;

pub use outcome::{aggregate, Overall, RunOutcome};
pub use status::{CheckResult, Status, StatusLedger};

#[cfg(test)]
#[path = "status_test.rs"]
mod status_tests;

#[cfg(test)]
#[path = "outcome_test.rs"]
mod outcome_tests;
