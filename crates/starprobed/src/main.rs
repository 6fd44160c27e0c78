// # starprobed - Measurement Daemon
//
// Thin integration layer: all measurement and classification logic lives in
// starprobe-core. The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering ISP lookups and building application state
// 4. Serving HTTP until SIGINT/SIGTERM, then draining in-flight transfers
//
// See `starprobed::config` for the full variable list.
//
// ## Example
//
// ```bash
// export STARPROBE_BIND_ADDR=0.0.0.0:8000
// export STARPROBE_LOOKUP_CACHE_TTL_SECS=300
// export STARPROBE_LOG_LEVEL=debug
//
// starprobed
// ```

use anyhow::Result;
use starprobe_core::LookupRegistry;
use starprobed::{AppState, DaemonConfig, create_router};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Upper bound on draining in-flight requests after a shutdown signal
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum StarprobeExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<StarprobeExitCode> for ExitCode {
    fn from(code: StarprobeExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match DaemonConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return StarprobeExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return StarprobeExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = config.log_level().unwrap_or(tracing::Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return StarprobeExitCode::ConfigError.into();
    }

    info!("Starting starprobed daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return StarprobeExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => StarprobeExitCode::CleanShutdown,
            Err(DaemonError::Startup(e)) => {
                error!("Startup error: {:#}", e);
                StarprobeExitCode::ConfigError
            }
            Err(DaemonError::Runtime(e)) => {
                error!("Daemon error: {:#}", e);
                StarprobeExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Failure phase, which decides the exit code
enum DaemonError {
    Startup(anyhow::Error),
    Runtime(anyhow::Error),
}

/// Run the daemon
async fn run_daemon(config: DaemonConfig) -> std::result::Result<(), DaemonError> {
    let registry = LookupRegistry::new();

    #[cfg(feature = "ip-api")]
    {
        info!("Registering ip-api lookup");
        starprobe_lookup_http::register(&registry);
    }

    let cors = config.cors_origins().map_err(DaemonError::Startup)?;
    let state = AppState::from_registry(
        config.speed_test_config(),
        &registry,
        config.trust_forwarded,
    )
    .map_err(|e| DaemonError::Startup(e.into()))?;

    let app = create_router(state, &cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| {
            DaemonError::Startup(anyhow::anyhow!("Failed to bind {}: {}", config.bind_addr, e))
        })?;

    info!(
        bind_addr = %config.bind_addr,
        trust_forwarded = config.trust_forwarded,
        "Listening for measurement requests"
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = stop_rx.await;
        })
        .await
    });

    tokio::select! {
        signal = wait_for_shutdown() => {
            let signal = signal.map_err(DaemonError::Runtime)?;
            info!("Received shutdown signal: {}", signal);
        }
        result = &mut server => {
            // The server stopped on its own, which only happens on failure
            return match result {
                Ok(Ok(())) => Err(DaemonError::Runtime(anyhow::anyhow!("Server exited unexpectedly"))),
                Ok(Err(e)) => Err(DaemonError::Runtime(e.into())),
                Err(e) => Err(DaemonError::Runtime(anyhow::anyhow!("Server task failed: {}", e))),
            };
        }
    }

    let _ = stop_tx.send(());
    info!("Draining in-flight requests");

    match tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, server).await {
        Ok(Ok(Ok(()))) => {
            info!("Shutdown complete");
            Ok(())
        }
        Ok(Ok(Err(e))) => Err(DaemonError::Runtime(e.into())),
        Ok(Err(e)) => Err(DaemonError::Runtime(anyhow::anyhow!("Server task failed: {}", e))),
        Err(_) => {
            warn!(
                "In-flight requests still open after {:?}; exiting anyway",
                SHUTDOWN_DRAIN_TIMEOUT
            );
            Ok(())
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
