//! TailSentry - Entry Point
//!
//! A local agent exposing Tailscale status, routing and exit-node control
//! over a small HTTP API.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use tailsentry::app::options::{AppOptions, ServerOptions};
use tailsentry::app::run::run;
use tailsentry::logs::{init_logging, LogOptions};
use tailsentry::storage::layout::StorageLayout;
use tailsentry::storage::settings::Settings;
use tailsentry::tailscale::controller::ControllerOptions;
use tailsentry::utils::version_info;
use tailsentry::workers::sampler;

use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to render version info: {e}"),
        }
        return;
    }

    // Retrieve the settings file; a missing file runs on defaults
    let layout = cli_args
        .get("data-dir")
        .map(StorageLayout::new)
        .unwrap_or_default();
    let settings_file = layout.settings_file();
    let settings = if settings_file.exists().await {
        match settings_file.read_json::<Settings>().await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read settings file: {}", e);
                return;
            }
        }
    } else {
        Settings::default()
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: Some(layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    if settings_file.exists().await {
        info!(path = %settings_file.path().display(), "Loaded settings");
    } else {
        warn!(path = %settings_file.path().display(), "No settings file, using defaults");
    }

    // Run the agent
    let options = AppOptions {
        storage: layout,
        server: ServerOptions {
            host: settings.server.host.clone(),
            port: settings.server.port,
        },
        sampler: sampler::Options {
            interval: Duration::from_secs(settings.sampler.interval_secs),
            ..Default::default()
        },
        enable_sampler: settings.sampler.enabled,
        controller: ControllerOptions {
            binary_path: settings.tailscale.binary_path.clone(),
            cache_ttl: Duration::from_secs(settings.tailscale.cache_ttl_secs),
            always_live: settings.tailscale.always_live,
            read_timeout: Duration::from_secs(settings.tailscale.read_timeout_secs),
            mutate_timeout: Duration::from_secs(settings.tailscale.mutate_timeout_secs),
            accept_routes: settings.tailscale.accept_routes,
        },
        api: settings.api.clone(),
        ..Default::default()
    };

    info!("Running TailSentry {}", version.version);
    let result = run(options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run the agent: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received, shutting down...");
    }
}
