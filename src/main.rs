use clap::Parser;
use kube::Client;
use std::time::Duration;
use tracing::{error, info};
use vahti::check::{RunOutcome, StatusLedger};
use vahti::config::RunConfig;
use vahti::probe::Selection;
use vahti::report::{report, Format};
use vahti::runner::Runner;

/// Deployment health-check aggregator for Kubernetes.
///
/// Exit codes: 0 healthy, 1 warning, 2 critical, 3 precondition failure
/// (Kubernetes API unreachable). This mapping is a stable contract.
#[derive(Parser)]
#[command(name = "vahti", version, about)]
struct Cli {
    /// Which checks to run
    #[arg(value_enum, default_value = "check")]
    selection: Selection,

    /// Target namespace (overrides VAHTI_NAMESPACE)
    #[arg(long)]
    namespace: Option<String>,

    /// Application name (overrides VAHTI_APP)
    #[arg(long)]
    app: Option<String>,

    /// Overall deadline in seconds (overrides VAHTI_TIMEOUT_SECS)
    #[arg(long)]
    timeout: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Print only the overall verdict
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable for callers
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = RunConfig::from_env();
    if let Some(namespace) = cli.namespace {
        config.namespace = namespace;
    }
    if let Some(app) = cli.app {
        config.app = app;
    }
    if std::env::var("VAHTI_SERVICES").is_err() {
        // Declared services default to the app's own Service
        config.services = vec![config.app.clone()];
    }
    if let Some(secs) = cli.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    config.quiet = cli.quiet;

    // A missing kubeconfig/credential is the one failure that makes every
    // probe meaningless: report it as the fatal outcome, exit code 3.
    let (ledger, outcome) = match Client::try_default().await {
        Ok(client) => {
            info!(namespace = %config.namespace, app = %config.app, "Starting health checks");
            Runner::new(client, config.clone()).run(cli.selection).await
        }
        Err(e) => {
            error!(error = %e, "Failed to create Kubernetes client");
            (
                StatusLedger::new(),
                RunOutcome::fatal(format!("cannot create Kubernetes client: {}", e)),
            )
        }
    };

    let mut stdout = std::io::stdout();
    let exit_code = report(&mut stdout, &ledger, &outcome, cli.format, config.quiet)?;
    std::process::exit(exit_code);
}
