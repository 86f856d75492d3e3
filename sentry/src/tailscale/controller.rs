//! Tailscale state controller.
//!
//! Owns binary invocation, the status cache and desired-state reconciliation.
//! HTTP handlers and workers talk to the tailnet exclusively through this
//! type.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::errors::SentryError;
use crate::metrics::history::{MetricsHistory, MetricsSample};
use crate::tailscale::binary::resolve_binary_path;
use crate::tailscale::cache::{Clock, StatusCache};
use crate::tailscale::reconcile::{
    build_up_args, validate_auth_key, validate_cidr, ReconcileRequest,
};
use crate::tailscale::runner::CommandRunner;
use crate::tailscale::service::{self, ServiceAction, ServiceOutcome};
use crate::tailscale::status::{DeviceStatus, PeerSummary};
use crate::tailscale::text::{annotate_online_from, parse_status_text, Device};

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Explicit binary path; discovered when unset.
    pub binary_path: Option<String>,

    /// Status cache TTL.
    pub cache_ttl: Duration,

    /// Bypass the cache on every read.
    pub always_live: bool,

    /// Timeout for status reads.
    pub read_timeout: Duration,

    /// Timeout for mutating calls and service control.
    pub mutate_timeout: Duration,

    /// Current accept-routes preference, always re-stated on `up`.
    pub accept_routes: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            binary_path: None,
            cache_ttl: Duration::from_secs(5),
            always_live: false,
            read_timeout: Duration::from_secs(10),
            mutate_timeout: Duration::from_secs(30),
            accept_routes: true,
        }
    }
}

/// State controller over the tailscale CLI.
pub struct TailscaleController {
    binary: String,
    options: ControllerOptions,
    runner: Arc<dyn CommandRunner>,
    cache: StatusCache,
    history: Arc<MetricsHistory>,
    local_hostname: String,
}

impl TailscaleController {
    pub fn new(
        options: ControllerOptions,
        runner: Arc<dyn CommandRunner>,
        clock: Arc<dyn Clock>,
        history: Arc<MetricsHistory>,
    ) -> Self {
        let binary = options
            .binary_path
            .clone()
            .unwrap_or_else(resolve_binary_path);
        let cache = StatusCache::new(options.cache_ttl, clock);

        Self {
            binary,
            options,
            runner,
            cache,
            history,
            local_hostname: crate::utils::local_hostname(),
        }
    }

    /// Resolved binary path in use.
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Metrics history fed by status refreshes.
    pub fn history(&self) -> &Arc<MetricsHistory> {
        &self.history
    }

    /// Current status snapshot, cached within the TTL window.
    pub async fn get_status(&self, force_live: bool) -> Result<Arc<DeviceStatus>, SentryError> {
        let live = force_live || self.options.always_live;
        self.cache.get_with(live, || self.fetch_status()).await
    }

    /// One live refresh. Each successful refresh records a metrics sample;
    /// cache hits never do. Recording is best-effort and never fails the read.
    async fn fetch_status(&self) -> Result<DeviceStatus, SentryError> {
        let output = self
            .runner
            .run(
                &self.binary,
                &["status".to_string(), "--json".to_string()],
                self.options.read_timeout,
            )
            .await?
            .into_result()?;

        let status = DeviceStatus::parse(&output.stdout)?;
        self.history
            .record(MetricsSample::from_status(&status))
            .await;

        Ok(status)
    }

    /// Drop the cached status so the next read is live.
    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }

    /// Join or re-apply configuration with `tailscale up`.
    ///
    /// The auth key, when present, is validated against the token charset and
    /// passed as a single discrete argument.
    pub async fn up(
        &self,
        auth_key: Option<&str>,
        extra_args: &[String],
    ) -> Result<(), SentryError> {
        let mut args = vec!["up".to_string()];

        if let Some(key) = auth_key {
            validate_auth_key(key)?;
            args.push(format!("--authkey={}", key));
        }

        for arg in extra_args {
            validate_extra_arg(arg)?;
            args.push(arg.clone());
        }

        info!(args = ?redact_auth_key(&args), "Running tailscale up");
        self.runner
            .run(&self.binary, &args, self.options.mutate_timeout)
            .await?
            .into_result()?;

        self.invalidate().await;
        Ok(())
    }

    /// Disconnect from the tailnet.
    pub async fn down(&self) -> Result<(), SentryError> {
        info!("Running tailscale down");
        self.runner
            .run(
                &self.binary,
                &["down".to_string()],
                self.options.mutate_timeout,
            )
            .await?
            .into_result()?;

        self.invalidate().await;
        Ok(())
    }

    /// Reconcile a desired-state change against live status and apply it.
    pub async fn apply(&self, desired: &ReconcileRequest) -> Result<(), SentryError> {
        let current = self.get_status(true).await?;
        let args = build_up_args(
            &current.self_node,
            desired,
            &self.local_hostname,
            self.options.accept_routes,
        )?;

        info!(args = ?args, "Applying tailscale configuration");
        self.runner
            .run(&self.binary, &args, self.options.mutate_timeout)
            .await?
            .into_result()?;

        self.invalidate().await;
        Ok(())
    }

    /// Replace the advertised subnet routes.
    ///
    /// After applying, the route set is re-read and compared; a mismatch is
    /// logged rather than failed since propagation can lag the CLI call.
    pub async fn set_subnet_routes(&self, routes: &[String]) -> Result<(), SentryError> {
        for route in routes {
            validate_cidr(route)?;
        }

        let desired = ReconcileRequest {
            advertise_routes: Some(routes.to_vec()),
            ..Default::default()
        };
        self.apply(&desired).await?;

        match self.get_status(true).await {
            Ok(status) => {
                let mut applied = status.self_node.subnet_routes();
                let mut requested = routes.to_vec();
                applied.sort();
                requested.sort();
                if applied != requested {
                    warn!(
                        requested = ?requested,
                        applied = ?applied,
                        "Advertised routes have not settled yet"
                    );
                }
            }
            Err(e) => warn!(error = %e, "Could not verify applied routes"),
        }

        Ok(())
    }

    /// Enable or disable advertising this device as an exit node.
    pub async fn set_exit_node(&self, enable: bool) -> Result<(), SentryError> {
        let desired = ReconcileRequest {
            exit_node: Some(enable),
            ..Default::default()
        };
        self.apply(&desired).await
    }

    /// Current device's advertised routes, exit-node sentinels excluded.
    pub async fn subnet_routes(&self) -> Result<Vec<String>, SentryError> {
        let status = self.get_status(false).await?;
        Ok(status.self_node.subnet_routes())
    }

    /// The peer currently in use as this device's exit node, if any.
    pub async fn active_exit_node(&self) -> Result<Option<PeerSummary>, SentryError> {
        let status = self.get_status(false).await?;
        Ok(status.active_exit_node())
    }

    /// All known devices.
    ///
    /// The JSON peer map is authoritative; the plain-text table is the
    /// fallback when JSON is unavailable. Text-derived online flags are
    /// heuristic, so the last cached JSON snapshot, stale or not, overrides
    /// them wherever the two sources cover the same host.
    pub async fn all_devices(&self) -> Result<Vec<Device>, SentryError> {
        match self.get_status(false).await {
            Ok(status) => Ok(devices_from_status(&status)),
            Err(json_err) => {
                warn!(error = %json_err, "JSON status unavailable, falling back to text parsing");
                let output = self
                    .runner
                    .run(
                        &self.binary,
                        &["status".to_string()],
                        self.options.read_timeout,
                    )
                    .await?
                    .into_result()?;

                let mut devices = parse_status_text(&output.stdout);
                if let Some(cached) = self.cache.peek().await {
                    annotate_online_from(&mut devices, &cached);
                }
                Ok(devices)
            }
        }
    }

    /// Control the tailscaled daemon.
    pub async fn service_control(
        &self,
        action: ServiceAction,
    ) -> Result<ServiceOutcome, SentryError> {
        let outcome = service::service_control(
            self.runner.as_ref(),
            &self.binary,
            action,
            self.options.mutate_timeout,
        )
        .await?;

        if action != ServiceAction::Status {
            self.invalidate().await;
        }

        Ok(outcome)
    }
}

/// Build device rows from the JSON status document.
fn devices_from_status(status: &DeviceStatus) -> Vec<Device> {
    std::iter::once(&status.self_node)
        .chain(status.peers.values())
        .map(|node| Device {
            ip: node.primary_ip().to_string(),
            hostname: node.host_name.clone(),
            user: String::new(),
            os: node.os.clone(),
            online: node.online,
            is_exit_node: node.exit_node_option || node.capabilities.exit_node,
            uses_exit_node: node.exit_node,
            is_subnet_router: node.capabilities.subnet_router || !node.subnet_routes().is_empty(),
            tagged: !node.tags.is_empty(),
            status_text: String::new(),
        })
        .collect()
}

/// Extra `up` flags pass a narrow allow-list; anything shell-adjacent is
/// rejected before invocation.
fn validate_extra_arg(arg: &str) -> Result<(), SentryError> {
    if arg.is_empty()
        || !arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '=' | ',' | ':' | '/'))
    {
        return Err(SentryError::ValidationError(format!(
            "extra argument contains disallowed characters: {:?}",
            arg
        )));
    }
    Ok(())
}

/// Log-safe copy of an argv with any auth key masked.
fn redact_auth_key(args: &[String]) -> Vec<String> {
    args.iter()
        .map(|a| {
            if a.starts_with("--authkey=") {
                "--authkey=***".to_string()
            } else {
                a.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_arg_validation() {
        assert!(validate_extra_arg("--ssh").is_ok());
        assert!(validate_extra_arg("--advertise-tags=tag:server").is_ok());
        assert!(validate_extra_arg("--flag; rm -rf /").is_err());
        assert!(validate_extra_arg("").is_err());
    }

    #[test]
    fn test_auth_key_redaction() {
        let args = vec!["up".to_string(), "--authkey=tskey-secret".to_string()];
        let redacted = redact_auth_key(&args);
        assert_eq!(redacted[1], "--authkey=***");
    }
}
