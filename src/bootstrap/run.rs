//! Daemon main loop: wire the use cases, bring the wallet up, then serve
//! line commands from stdin until quit or a shutdown signal.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use ow_app::usecases::WalletLifecycleCoordinator;
use ow_core::config::AppConfig;
use ow_core::transport::{BridgeConfiguration, TransportSnapshot, TransportStatus};
use ow_core::wallet::{WalletError, WalletState};

use super::commands::{describe_status, parse_command, BridgeRequest, DaemonCommand, HELP};
use super::wiring::{wire_dependencies, AppRuntime};

enum Flow {
    Continue,
    Quit,
}

pub async fn run_daemon(config: AppConfig) -> anyhow::Result<()> {
    let span = info_span!("daemon.run", data_dir = %config.data_dir.display());

    async {
        let runtime = wire_dependencies(&config).context("Failed to wire dependencies")?;
        let logger = spawn_status_logger(runtime.transport.subscribe(), runtime.wallet.subscribe());

        spawn_foreground(&runtime.wallet);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown signal received");
                    break;
                }
                line = lines.next_line(), if stdin_open => match line {
                    Ok(Some(line)) => match parse_command(&line) {
                        Ok(Some(command)) => {
                            if let Flow::Quit = execute(&runtime, command).await {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(err) => eprintln!("{err}"),
                    },
                    Ok(None) => {
                        debug!("stdin closed, waiting for a shutdown signal");
                        stdin_open = false;
                    }
                    Err(err) => {
                        warn!(error = %err, "stdin read failed, command input disabled");
                        stdin_open = false;
                    }
                },
            }
        }

        if let Err(err) = runtime.wallet.disconnect_wallet().await {
            warn!(error = %err, "wallet disconnect on shutdown failed");
        }
        if let Err(err) = runtime.transport.stop().await {
            warn!(error = %err, "transport stop on shutdown failed");
        }
        logger.abort();

        info!("daemon stopped");
        Ok(())
    }
    .instrument(span)
    .await
}

async fn execute(runtime: &AppRuntime, command: DaemonCommand) -> Flow {
    match command {
        DaemonCommand::Foreground => spawn_foreground(&runtime.wallet),
        DaemonCommand::Background => {
            if let Err(err) = runtime.wallet.on_background().await {
                eprintln!("background: {err:#}");
            }
        }
        DaemonCommand::Status => {
            println!(
                "{}",
                describe_status(
                    &runtime.transport.snapshot(),
                    &runtime.wallet.state(),
                    runtime.wallet.is_disconnection_disabled(),
                )
            );
        }
        DaemonCommand::Network(network) => {
            if let Err(err) = runtime.wallet.select_network(network).await {
                eprintln!("network: {err:#}");
                return Flow::Continue;
            }
            spawn_foreground(&runtime.wallet);
        }
        DaemonCommand::Bridges(request) => {
            let bridges = match request {
                BridgeRequest::None => BridgeConfiguration::none(),
                BridgeRequest::Custom(path) => match tokio::fs::read_to_string(&path).await {
                    Ok(raw) => {
                        let bridges = BridgeConfiguration::custom(&raw);
                        if bridges.effective_lines().is_empty() {
                            warn!(path = %path.display(), "bridge file has no usable lines");
                        }
                        bridges
                    }
                    Err(err) => {
                        eprintln!("bridges: cannot read {}: {err}", path.display());
                        return Flow::Continue;
                    }
                },
            };
            if let Err(err) = runtime.apply_bridges.execute(bridges).await {
                eprintln!("bridges: {err}");
            }
        }
        DaemonCommand::Hold => runtime.wallet.set_disconnection_disabled(true),
        DaemonCommand::Release => runtime.wallet.set_disconnection_disabled(false),
        DaemonCommand::Retry => {
            let result = if runtime.transport.snapshot().status == TransportStatus::Disconnected {
                runtime.transport.start().await
            } else {
                runtime.transport.kick().await
            };
            if let Err(err) = result {
                eprintln!("retry: {err}");
            }
        }
        DaemonCommand::Help => println!("{HELP}"),
        DaemonCommand::Quit => return Flow::Quit,
    }
    Flow::Continue
}

/// Foreground handling can wait on transport readiness for a long time, so it
/// never runs inline with the command loop.
fn spawn_foreground(wallet: &Arc<WalletLifecycleCoordinator>) {
    let wallet = wallet.clone();
    tokio::spawn(
        async move {
            match wallet.on_foreground().await {
                Ok(()) => {}
                Err(WalletError::Cancelled) => debug!("wallet start cancelled by a disconnect"),
                Err(err) => warn!(error = %err, "foreground handling failed"),
            }
        }
        .in_current_span(),
    );
}

fn spawn_status_logger(
    mut transport: watch::Receiver<TransportSnapshot>,
    mut wallet: watch::Receiver<WalletState>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = transport.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = transport.borrow_and_update().clone();
                    info!(
                        status = ?snapshot.status,
                        progress = snapshot.bootstrap_progress,
                        "transport status changed"
                    );
                }
                changed = wallet.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = wallet.borrow_and_update().clone();
                    info!(state = ?state, "wallet state changed");
                }
            }
        }
    })
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
