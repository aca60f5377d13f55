//! Runtime configuration from environment variables
//!
//! All settings use the `VAHTI_` prefix and have working defaults so the tool
//! can run against a conventionally labeled deployment with no configuration.
//! CLI flags override individual fields after [`RunConfig::from_env`].

use std::time::Duration;

/// Default overall deadline for one run
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default timeout for a single network call inside a probe
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Configuration for one health-check run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Namespace the application is deployed in
    pub namespace: String,
    /// Name of the application Deployment (also used as the default pod label)
    pub app: String,
    /// Container port the synthetic endpoint probe targets
    pub app_port: u16,
    /// Overall deadline for the whole run; probes still pending at the
    /// deadline are reported as timed out, not dropped
    pub timeout: Duration,
    /// Per-call timeout inside individual probes
    pub probe_timeout: Duration,
    /// Optional base URL for synthetic endpoint probes; when set, probes go
    /// direct over HTTP instead of through a port-forward tunnel
    pub endpoint_url: Option<String>,
    /// Logical services whose endpoints must be reachable
    pub services: Vec<String>,
    /// Label selector for database pods
    pub database_selector: String,
    /// Label selector for cache pods
    pub cache_selector: String,
    /// Namespace the monitoring stack runs in
    pub monitoring_namespace: String,
    /// Print only the overall verdict, not per-component lines
    pub quiet: bool,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

impl RunConfig {
    /// Build configuration from `VAHTI_*` environment variables.
    pub fn from_env() -> Self {
        let app = env_or("VAHTI_APP", "app");

        // Default declared services: just the app's own Service
        let services = std::env::var("VAHTI_SERVICES")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| vec![app.clone()]);

        Self {
            namespace: env_or("VAHTI_NAMESPACE", "default"),
            app_port: std::env::var("VAHTI_APP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            timeout: env_secs("VAHTI_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            probe_timeout: env_secs("VAHTI_PROBE_TIMEOUT_SECS", DEFAULT_PROBE_TIMEOUT_SECS),
            endpoint_url: std::env::var("VAHTI_ENDPOINT_URL")
                .ok()
                .filter(|v| !v.is_empty()),
            services,
            database_selector: env_or(
                "VAHTI_DATABASE_SELECTOR",
                "app.kubernetes.io/name=postgresql",
            ),
            cache_selector: env_or("VAHTI_CACHE_SELECTOR", "app.kubernetes.io/name=redis"),
            monitoring_namespace: env_or("VAHTI_MONITORING_NAMESPACE", "monitoring"),
            quiet: false,
            app,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            app: "app".to_string(),
            app_port: 8080,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            endpoint_url: None,
            services: vec!["app".to_string()],
            database_selector: "app.kubernetes.io/name=postgresql".to_string(),
            cache_selector: "app.kubernetes.io/name=redis".to_string(),
            monitoring_namespace: "monitoring".to_string(),
            quiet: false,
        }
    }
}
