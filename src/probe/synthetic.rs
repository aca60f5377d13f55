//! Synthetic endpoint probe: bounded-timeout GETs against a fixed URL list
//!
//! Issues one request per endpoint either directly (when a base URL is
//! configured) or through a temporary port-forward tunnel to a running
//! application pod. The tunnel is a scoped resource: acquired before the
//! call, released on every path including timeout and request failure.
//!
//! An unreachable synthetic endpoint alone is never Critical; the workload
//! probe already covers instance health, so this probe caps at Warning.

use super::Probe;
use crate::check::{CheckResult, Status};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Fixed endpoints probed on every run: the health endpoint and the primary
/// API endpoint.
const SYNTHETIC_PATHS: [&str; 2] = ["/health", "/api/v1/status"];

#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("port-forward stream unavailable")]
    NoStream,

    #[error("no running pod to tunnel to")]
    NoPod,

    #[error("I/O error over tunnel: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed HTTP response: {0}")]
    BadResponse(String),

    #[error("request timed out")]
    Timeout,
}

pub struct SyntheticProbe {
    client: Client,
    namespace: String,
    app: String,
    port: u16,
    /// When set, requests go straight to `<base_url><path>` over HTTP and the
    /// tunnel machinery is bypassed entirely.
    base_url: Option<String>,
    timeout: Duration,
}

impl SyntheticProbe {
    pub fn new(
        client: Client,
        namespace: &str,
        app: &str,
        port: u16,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            app: app.to_string(),
            port,
            base_url,
            timeout,
        }
    }

    /// Pick a running pod of the application to tunnel to.
    async fn find_target_pod(&self) -> Result<String, TunnelError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let selector = format!("app={}", self.app);
        let list = pods.list(&ListParams::default().labels(&selector)).await?;

        list.items
            .iter()
            .find(|p| {
                p.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Running")
            })
            .and_then(|p| p.metadata.name.clone())
            .ok_or(TunnelError::NoPod)
    }

    /// GET one path through a freshly acquired port-forward tunnel.
    ///
    /// The forwarder is dropped before this function returns, whatever the
    /// request outcome, so no tunnel outlives its single request.
    async fn fetch_via_tunnel(&self, pod: &str, path: &str) -> Result<u16, TunnelError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let mut forwarder = pods.portforward(pod, &[self.port]).await?;
        let stream = forwarder.take_stream(self.port).ok_or(TunnelError::NoStream);

        let result = match stream {
            Ok(stream) => {
                match tokio::time::timeout(
                    self.timeout,
                    request_over(stream, &self.app, path),
                )
                .await
                {
                    Ok(r) => r,
                    Err(_) => Err(TunnelError::Timeout),
                }
            }
            Err(e) => Err(e),
        };

        forwarder.abort();
        result
    }

    /// GET one path directly over HTTP (base URL configured).
    async fn fetch_direct(&self, base: &str, path: &str) -> Result<u16, TunnelError> {
        let url = format!("{}{}", base.trim_end_matches('/'), path);
        let client = reqwest::Client::new();
        let response = client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TunnelError::Timeout
                } else {
                    TunnelError::BadResponse(e.to_string())
                }
            })?;
        Ok(response.status().as_u16())
    }
}

#[async_trait]
impl Probe for SyntheticProbe {
    fn component(&self) -> &'static str {
        "synthetic-endpoints"
    }

    async fn run(&self) -> CheckResult {
        let target_pod = if self.base_url.is_none() {
            match self.find_target_pod().await {
                Ok(pod) => Some(pod),
                Err(e) => {
                    return CheckResult::warning(
                        self.component(),
                        format!("cannot probe endpoints: {}", e),
                    );
                }
            }
        } else {
            None
        };

        let mut ok = 0usize;
        let mut failures: Vec<String> = Vec::new();

        for path in SYNTHETIC_PATHS {
            let result = match (&self.base_url, &target_pod) {
                (Some(base), _) => self.fetch_direct(base, path).await,
                (None, Some(pod)) => self.fetch_via_tunnel(pod, path).await,
                // find_target_pod already returned above in this case
                (None, None) => Err(TunnelError::NoPod),
            };

            match result {
                Ok(code) if (200..300).contains(&code) => {
                    debug!(path = path, code = code, "Synthetic endpoint responded");
                    ok += 1;
                }
                Ok(code) => failures.push(format!("{}: HTTP {}", path, code)),
                Err(e) => failures.push(format!("{}: {}", path, e)),
            }
        }

        let (status, message) = classify_endpoints(ok, SYNTHETIC_PATHS.len(), &failures);
        CheckResult::new(self.component(), status, message)
    }
}

pub(crate) fn classify_endpoints(ok: usize, total: usize, failures: &[String]) -> (Status, String) {
    if ok == total {
        (
            Status::Healthy,
            format!("{}/{} endpoints responding", ok, total),
        )
    } else {
        (
            Status::Warning,
            format!(
                "{}/{} endpoints responding ({})",
                ok,
                total,
                failures.join("; ")
            ),
        )
    }
}

/// Speak minimal HTTP/1.1 over an established tunnel stream and return the
/// response status code.
async fn request_over<S>(mut stream: S, host: &str, path: &str) -> Result<u16, TunnelError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: vahti\r\nConnection: close\r\n\r\n",
        path, host
    );
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    // Only the status line matters; read until the first CRLF
    let mut buf = Vec::with_capacity(256);
    let mut chunk = [0u8; 256];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(2).any(|w| w == b"\r\n") || buf.len() > 8192 {
            break;
        }
    }

    let text = String::from_utf8_lossy(&buf);
    let line = text.lines().next().unwrap_or("");
    parse_status_line(line)
}

/// Extract the status code from an HTTP/1.x status line like "HTTP/1.1 200 OK".
pub(crate) fn parse_status_line(line: &str) -> Result<u16, TunnelError> {
    let mut parts = line.split_whitespace();
    let version = parts
        .next()
        .ok_or_else(|| TunnelError::BadResponse("empty status line".to_string()))?;
    if !version.starts_with("HTTP/") {
        return Err(TunnelError::BadResponse(format!(
            "not an HTTP response: {}",
            line
        )));
    }
    parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| TunnelError::BadResponse(format!("no status code in: {}", line)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_line_ok() {
        assert_eq!(parse_status_line("HTTP/1.1 200 OK").ok(), Some(200));
        assert_eq!(parse_status_line("HTTP/1.0 503 Service Unavailable").ok(), Some(503));
    }

    #[test]
    fn test_parse_status_line_rejects_garbage() {
        assert!(parse_status_line("").is_err());
        assert!(parse_status_line("not http at all").is_err());
        assert!(parse_status_line("HTTP/1.1").is_err());
        assert!(parse_status_line("HTTP/1.1 abc OK").is_err());
    }

    #[test]
    fn test_classify_all_endpoints_ok() {
        let (status, message) = classify_endpoints(2, 2, &[]);
        assert_eq!(status, Status::Healthy);
        assert_eq!(message, "2/2 endpoints responding");
    }

    #[test]
    fn test_classify_endpoint_failure_is_warning_not_critical() {
        let failures = vec!["/health: request timed out".to_string()];
        let (status, message) = classify_endpoints(1, 2, &failures);
        assert_eq!(status, Status::Warning);
        assert!(message.contains("/health: request timed out"));
    }

    #[tokio::test]
    async fn test_request_over_duplex_stream() {
        // Simulate the pod side of a tunnel with an in-memory duplex stream
        let (client_side, mut server_side) = tokio::io::duplex(1024);

        let server = tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let n = server_side.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            server_side
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
                .await
                .unwrap();
            request
        });

        let code = request_over(client_side, "my-app", "/health").await.unwrap();
        assert_eq!(code, 200);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /health HTTP/1.1\r\n"));
        assert!(request.contains("Host: my-app\r\n"));
        assert!(request.contains("Connection: close"));
    }
}
