//! Daemon service control.
//!
//! Actions are a closed enum; nothing caller-supplied is ever spliced into a
//! command line. Platform fallbacks run in a fixed order and each stage logs
//! its own failure before the next one is tried.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::SentryError;
use crate::tailscale::runner::CommandRunner;

/// Validated service-control actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Status,
    Down,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
            ServiceAction::Status => "status",
            ServiceAction::Down => "down",
        }
    }
}

impl std::str::FromStr for ServiceAction {
    type Err = SentryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" => Ok(ServiceAction::Start),
            "stop" => Ok(ServiceAction::Stop),
            "restart" => Ok(ServiceAction::Restart),
            "status" => Ok(ServiceAction::Status),
            "down" => Ok(ServiceAction::Down),
            other => Err(SentryError::ValidationError(format!(
                "unknown service action: {:?}",
                other
            ))),
        }
    }
}

/// Result of a service-control request.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceOutcome {
    pub action: ServiceAction,
    pub detail: String,
}

/// Apply `action` to the tailscaled daemon.
///
/// `binary` is the resolved tailscale CLI path, used for the `down` action
/// and as the last-resort status probe.
pub async fn service_control<R: CommandRunner + ?Sized>(
    runner: &R,
    binary: &str,
    action: ServiceAction,
    timeout: Duration,
) -> Result<ServiceOutcome, SentryError> {
    if action == ServiceAction::Down {
        runner
            .run(binary, &["down".to_string()], timeout)
            .await?
            .into_result()?;
        return Ok(ServiceOutcome {
            action,
            detail: "tailscale down completed".to_string(),
        });
    }

    let detail = platform_service_control(runner, binary, action, timeout).await?;
    Ok(ServiceOutcome { action, detail })
}

#[cfg(target_os = "linux")]
async fn platform_service_control<R: CommandRunner + ?Sized>(
    runner: &R,
    binary: &str,
    action: ServiceAction,
    timeout: Duration,
) -> Result<String, SentryError> {
    let _ = binary;
    let verb = action.as_str().to_string();

    // Stage 1: systemd
    match runner
        .run(
            "systemctl",
            &[verb.clone(), "tailscaled".to_string()],
            timeout,
        )
        .await
    {
        Ok(output) if output.success() => {
            return Ok(format!("systemctl {} tailscaled succeeded", verb));
        }
        Ok(output) => {
            warn!(
                action = %verb,
                code = output.code,
                stderr = %output.stderr.trim(),
                "systemctl stage failed, trying process-level fallback"
            );
        }
        Err(e) => {
            warn!(action = %verb, error = %e, "systemctl unavailable, trying process-level fallback");
        }
    }

    // Stage 2: direct process management
    match action {
        ServiceAction::Status => {
            let output = runner
                .run("pgrep", &["-x".to_string(), "tailscaled".to_string()], timeout)
                .await?;
            if output.success() {
                Ok("tailscaled process is running".to_string())
            } else {
                Ok("tailscaled process not found".to_string())
            }
        }
        ServiceAction::Stop => {
            runner
                .run("pkill", &["-x".to_string(), "tailscaled".to_string()], timeout)
                .await?
                .into_result()?;
            Ok("tailscaled stopped via pkill".to_string())
        }
        ServiceAction::Start | ServiceAction::Restart => {
            // Stage 3: nothing left to try automatically.
            warn!(action = %verb, "no fallback can start tailscaled without systemd");
            Err(SentryError::CliError {
                code: -1,
                stderr: format!(
                    "unable to {} tailscaled: systemctl failed and no fallback applies; \
                     start the daemon manually",
                    verb
                ),
            })
        }
        ServiceAction::Down => unreachable!("handled by caller"),
    }
}

#[cfg(target_os = "windows")]
async fn platform_service_control<R: CommandRunner + ?Sized>(
    runner: &R,
    binary: &str,
    action: ServiceAction,
    timeout: Duration,
) -> Result<String, SentryError> {
    let sc_verb = match action {
        ServiceAction::Start => "start",
        ServiceAction::Stop => "stop",
        ServiceAction::Restart => "stop", // restarted below
        ServiceAction::Status => "query",
        ServiceAction::Down => unreachable!("handled by caller"),
    };

    // Stage 1: service control manager
    match runner
        .run(
            "sc",
            &[sc_verb.to_string(), "Tailscale".to_string()],
            timeout,
        )
        .await
    {
        Ok(output) if output.success() => {
            if action == ServiceAction::Restart {
                runner
                    .run(
                        "sc",
                        &["start".to_string(), "Tailscale".to_string()],
                        timeout,
                    )
                    .await?
                    .into_result()?;
            }
            return Ok(format!("sc {} Tailscale succeeded", sc_verb));
        }
        Ok(output) => {
            warn!(
                action = %action.as_str(),
                code = output.code,
                "SCM stage failed, trying direct CLI status"
            );
        }
        Err(e) => {
            warn!(action = %action.as_str(), error = %e, "SCM unavailable, trying direct CLI status");
        }
    }

    // Stage 2: direct CLI status probe
    if action == ServiceAction::Status {
        let output = runner.run(binary, &["status".to_string()], timeout).await?;
        if output.success() {
            return Ok("tailscale responds to status; service appears up".to_string());
        }
        return Ok("tailscale did not respond; service appears down".to_string());
    }

    // Stage 3: manual instruction
    warn!(action = %action.as_str(), "all service-control stages failed");
    Err(SentryError::CliError {
        code: -1,
        stderr: format!(
            "unable to {} the Tailscale service; use the Windows services console",
            action.as_str()
        ),
    })
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
async fn platform_service_control<R: CommandRunner + ?Sized>(
    runner: &R,
    binary: &str,
    action: ServiceAction,
    timeout: Duration,
) -> Result<String, SentryError> {
    // No service manager integration; the CLI itself is the only probe.
    if action == ServiceAction::Status {
        let output = runner.run(binary, &["status".to_string()], timeout).await?;
        if output.success() {
            return Ok("tailscale responds to status".to_string());
        }
        return Ok("tailscale did not respond".to_string());
    }

    warn!(action = %action.as_str(), "service control not supported on this platform");
    Err(SentryError::CliError {
        code: -1,
        stderr: format!(
            "service action {:?} is not supported on this platform",
            action.as_str()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parsing_closed_set() {
        assert_eq!("restart".parse::<ServiceAction>().unwrap(), ServiceAction::Restart);
        assert_eq!("STATUS".parse::<ServiceAction>().unwrap(), ServiceAction::Status);
        assert!("restart; rm -rf /".parse::<ServiceAction>().is_err());
        assert!("".parse::<ServiceAction>().is_err());
    }
}
