//! Controller integration tests against scripted command runners.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use tailsentry::errors::SentryError;
use tailsentry::metrics::history::MetricsHistory;
use tailsentry::tailscale::cache::SystemClock;
use tailsentry::tailscale::controller::{ControllerOptions, TailscaleController};
use tailsentry::tailscale::runner::{CommandOutput, CommandRunner};
use tailsentry::tailscale::service::ServiceAction;

/// Runner returning a fixed JSON document for every invocation, recording
/// each argv it sees.
struct FakeRunner {
    stdout: String,
    delay: Duration,
    calls: AtomicUsize,
    log: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    fn new(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    fn with_delay(stdout: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(stdout)
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn recorded(&self) -> Vec<Vec<String>> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        _program: &str,
        args: &[String],
        _timeout: Duration,
    ) -> Result<CommandOutput, SentryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(args.to_vec());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(CommandOutput {
            code: 0,
            stdout: self.stdout.clone(),
            stderr: String::new(),
        })
    }
}

/// Runner failing JSON status but serving the plain-text table.
struct TextOnlyRunner {
    table: String,
}

#[async_trait]
impl CommandRunner for TextOnlyRunner {
    async fn run(
        &self,
        _program: &str,
        args: &[String],
        _timeout: Duration,
    ) -> Result<CommandOutput, SentryError> {
        if args.contains(&"--json".to_string()) {
            return Ok(CommandOutput {
                code: 1,
                stdout: String::new(),
                stderr: "json status unavailable".to_string(),
            });
        }
        Ok(CommandOutput {
            code: 0,
            stdout: self.table.clone(),
            stderr: String::new(),
        })
    }
}

const STATUS_JSON: &str = r#"{
    "Self": {
        "HostName": "h1",
        "TailscaleIPs": ["100.64.0.1"],
        "AdvertisedRoutes": ["0.0.0.0/0", "::/0", "10.0.0.0/24"],
        "Online": true
    },
    "Peer": {
        "peer-a": {
            "HostName": "h2",
            "TailscaleIPs": ["100.64.0.2"],
            "ExitNode": true,
            "Online": true
        }
    }
}"#;

fn controller_with(runner: Arc<dyn CommandRunner>, ttl: Duration) -> TailscaleController {
    let options = ControllerOptions {
        binary_path: Some("tailscale".to_string()),
        cache_ttl: ttl,
        ..Default::default()
    };
    TailscaleController::new(
        options,
        runner,
        Arc::new(SystemClock),
        Arc::new(MetricsHistory::new(Duration::from_secs(24 * 3600), None)),
    )
}

#[tokio::test]
async fn test_cache_ttl_bounds_invocations() {
    let runner = Arc::new(FakeRunner::new(STATUS_JSON));
    let controller = controller_with(runner.clone(), Duration::from_secs(60));

    for _ in 0..5 {
        controller.get_status(false).await.unwrap();
    }

    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn test_single_flight_under_concurrency() {
    let runner = Arc::new(FakeRunner::with_delay(
        STATUS_JSON,
        Duration::from_millis(50),
    ));
    let controller = Arc::new(controller_with(runner.clone(), Duration::from_secs(60)));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let c = controller.clone();
        handles.push(tokio::spawn(async move { c.get_status(false).await }));
    }

    for handle in handles {
        let status = handle.await.unwrap().unwrap();
        assert_eq!(status.self_node.host_name, "h1");
    }

    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn test_exit_node_peer_and_sentinel_exclusion() {
    let runner = Arc::new(FakeRunner::new(STATUS_JSON));
    let controller = controller_with(runner, Duration::from_secs(60));

    let exit = controller.active_exit_node().await.unwrap().unwrap();
    assert_eq!(exit.host_name, "h2");
    assert_eq!(exit.ip, "100.64.0.2");

    let routes = controller.subnet_routes().await.unwrap();
    assert_eq!(routes, vec!["10.0.0.0/24"]);
}

#[tokio::test]
async fn test_mutation_invalidates_cache() {
    let runner = Arc::new(FakeRunner::new(STATUS_JSON));
    let controller = controller_with(runner.clone(), Duration::from_secs(60));

    controller.get_status(false).await.unwrap();
    assert_eq!(runner.call_count(), 1);

    controller.down().await.unwrap();

    controller.get_status(false).await.unwrap();
    // status, down, then a fresh status after invalidation
    assert_eq!(runner.call_count(), 3);
}

#[tokio::test]
async fn test_set_subnet_routes_builds_explicit_up() {
    let runner = Arc::new(FakeRunner::new(STATUS_JSON));
    let controller = controller_with(runner.clone(), Duration::from_secs(60));

    controller
        .set_subnet_routes(&["192.168.7.0/24".to_string()])
        .await
        .unwrap();

    let up_args = runner
        .recorded()
        .into_iter()
        .find(|args| args.first().is_some_and(|a| a == "up"))
        .expect("an up invocation");

    assert!(up_args.contains(&"--hostname=h1".to_string()));
    assert!(up_args.contains(&"--accept-routes".to_string()));
    let routes_arg = up_args
        .iter()
        .find(|a| a.starts_with("--advertise-routes="))
        .unwrap();
    assert!(routes_arg.contains("192.168.7.0/24"));
    // Exit node was active and the request did not mention it; it stays.
    assert!(up_args.contains(&"--advertise-exit-node".to_string()));
}

#[tokio::test]
async fn test_clearing_all_routes_emits_empty_advertise() {
    let runner = Arc::new(FakeRunner::new(STATUS_JSON));
    let controller = controller_with(runner.clone(), Duration::from_secs(60));

    controller.set_subnet_routes(&[]).await.unwrap();

    let up_args = runner
        .recorded()
        .into_iter()
        .find(|args| args.first().is_some_and(|a| a == "up"))
        .expect("an up invocation");

    let routes_arg = up_args
        .iter()
        .find(|a| a.starts_with("--advertise-routes="))
        .expect("a route-clearing argument");
    // The exit node stays active, so only the sentinels remain.
    assert!(!routes_arg.contains("10.0.0.0/24"));
    assert!(routes_arg.contains("0.0.0.0/0"));
}

#[tokio::test]
async fn test_history_records_one_sample_per_refresh() {
    let runner = Arc::new(FakeRunner::new(STATUS_JSON));
    let controller = controller_with(runner.clone(), Duration::from_secs(60));

    for _ in 0..5 {
        controller.get_status(false).await.unwrap();
    }

    assert_eq!(runner.call_count(), 1);
    assert_eq!(controller.history().all().await.len(), 1);
}

#[tokio::test]
async fn test_injection_rejected_before_invocation() {
    let runner = Arc::new(FakeRunner::new(STATUS_JSON));
    let controller = controller_with(runner.clone(), Duration::from_secs(60));

    let err = controller
        .set_subnet_routes(&["10.0.0.0/24; rm -rf /".to_string()])
        .await;
    assert!(matches!(err, Err(SentryError::ValidationError(_))));

    let err = controller.up(Some("abc$(whoami)"), &[]).await;
    assert!(matches!(err, Err(SentryError::ValidationError(_))));

    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_all_devices_falls_back_to_text() {
    let table = "\
# Health check:

100.64.0.1   laptop    alice@   linux   idle
100.64.0.2   gateway   bob@     linux   active; offers exit node
";
    let runner = Arc::new(TextOnlyRunner {
        table: table.to_string(),
    });
    let controller = controller_with(runner, Duration::from_secs(60));

    let devices = controller.all_devices().await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[1].hostname, "gateway");
    assert!(devices[1].is_exit_node);
}

/// Runner serving JSON status once, then only the plain-text table.
struct OneShotJsonRunner {
    json: String,
    table: String,
    json_calls: AtomicUsize,
}

#[async_trait]
impl CommandRunner for OneShotJsonRunner {
    async fn run(
        &self,
        _program: &str,
        args: &[String],
        _timeout: Duration,
    ) -> Result<CommandOutput, SentryError> {
        if args.contains(&"--json".to_string()) {
            if self.json_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(CommandOutput {
                    code: 0,
                    stdout: self.json.clone(),
                    stderr: String::new(),
                });
            }
            return Ok(CommandOutput {
                code: 1,
                stdout: String::new(),
                stderr: "json status unavailable".to_string(),
            });
        }
        Ok(CommandOutput {
            code: 0,
            stdout: self.table.clone(),
            stderr: String::new(),
        })
    }
}

#[tokio::test]
async fn test_text_fallback_annotated_from_stale_json() {
    let json = r#"{
        "Self": {"HostName": "laptop", "TailscaleIPs": ["100.64.0.1"], "Online": false},
        "Peer": {}
    }"#;
    let runner = Arc::new(OneShotJsonRunner {
        json: json.to_string(),
        table: "100.64.0.1 laptop alice@ linux idle\n".to_string(),
        json_calls: AtomicUsize::new(0),
    });
    // Zero TTL: the snapshot is cached but immediately stale.
    let controller = controller_with(runner, Duration::ZERO);

    controller.get_status(false).await.unwrap();

    let devices = controller.all_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    // The text heuristic reads "idle" as online; the cached JSON knows better.
    assert!(!devices[0].online);
}

#[tokio::test]
async fn test_all_devices_prefers_json() {
    let runner = Arc::new(FakeRunner::new(STATUS_JSON));
    let controller = controller_with(runner.clone(), Duration::from_secs(60));

    let devices = controller.all_devices().await.unwrap();
    assert_eq!(devices.len(), 2);

    let names: Vec<&str> = devices.iter().map(|d| d.hostname.as_str()).collect();
    assert!(names.contains(&"h1"));
    assert!(names.contains(&"h2"));

    // One call: the cached JSON document, never the text path.
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn test_service_down_runs_cli_down() {
    let runner = Arc::new(FakeRunner::new(""));
    let controller = controller_with(runner.clone(), Duration::from_secs(60));

    let outcome = controller
        .service_control(ServiceAction::Down)
        .await
        .unwrap();
    assert_eq!(outcome.action, ServiceAction::Down);

    let recorded = runner.recorded();
    assert_eq!(recorded[0], vec!["down".to_string()]);
}
