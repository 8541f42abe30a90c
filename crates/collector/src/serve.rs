//! The serve loop: load settings, run the plane, wait for signals

use std::path::PathBuf;
use std::process::ExitCode;

use sluice_config::Settings;
use sluice_control::ControlPlane;

/// Arguments for the serve command
#[derive(Debug)]
pub struct ServeArgs {
    pub config: PathBuf,
    pub log_level: Option<String>,
}

/// Run the collector until SIGINT/SIGTERM. SIGHUP triggers a reload.
pub async fn run(args: ServeArgs) -> ExitCode {
    let settings = match Settings::load(&args.config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("failed to load settings from {}: {e}", args.config.display());
            return ExitCode::from(1);
        }
    };

    let level = args
        .log_level
        .as_deref()
        .unwrap_or(&settings.log.level)
        .to_owned();
    if let Err(e) = crate::init_logging(&level) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::from(1);
    }

    let mut plane = match ControlPlane::new(settings) {
        Ok(plane) => plane,
        Err(e) => {
            tracing::error!(error = %e, "initialization failed");
            return ExitCode::from(1);
        }
    };

    match plane.start().await {
        Ok(()) => {}
        Err(e) if e.is_bind_failure() => {
            tracing::error!(error = %e, "startup bind failure");
            return ExitCode::from(2);
        }
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return ExitCode::from(1);
        }
    }

    tracing::info!("sluiced running");
    wait_for_shutdown(&mut plane).await;

    plane.stop().await;
    tracing::info!("sluiced stopped cleanly");
    ExitCode::SUCCESS
}

/// Block until SIGINT or SIGTERM; reload the plane on SIGHUP.
#[cfg(unix)]
async fn wait_for_shutdown(plane: &mut ControlPlane) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    let mut sighup = signal(SignalKind::hangup()).ok();

    loop {
        let hangup = async {
            match sighup.as_mut() {
                Some(stream) => {
                    stream.recv().await;
                }
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = sigterm.recv() => break,
            _ = hangup => {
                tracing::info!("SIGHUP received, reloading");
                if let Err(e) = plane.reload().await {
                    tracing::error!(error = %e, "reload failed");
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_plane: &mut ControlPlane) {
    let _ = tokio::signal::ctrl_c().await;
}
