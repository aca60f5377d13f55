//! vahti - deployment health-check aggregator for Kubernetes
//!
//! Polls the subsystems of a deployed application (workload pods, database,
//! cache, network services, ingress, synthetic endpoints, monitoring stack,
//! resource utilization) and folds their states into one overall verdict with
//! a stable exit-code contract:
//!
//! - `0` healthy
//! - `1` warning
//! - `2` critical
//! - `3` precondition failure (the Kubernetes API itself is unreachable)
//!
//! The exit-code mapping is the external API of the whole tool and must never
//! change meaning across versions.

pub mod check;
pub mod config;
pub mod probe;
pub mod report;
pub mod runner;
