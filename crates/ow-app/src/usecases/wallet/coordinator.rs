//! Wallet lifecycle coordinator
//!
//! Drives the wallet backend's connect/disconnect against transport
//! readiness and app foreground/background signals.
//!
//! ```text
//! NotReady ──(transport ready)──► Starting ──► Started
//!    ▲                               │
//!    └──── disconnect / select ◄─────┴──► StartFailed(err)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, info_span, warn, Instrument};

use ow_core::ports::{PassphrasePort, SettingsPort, WalletBackendPort};
use ow_core::transport::TransportSnapshot;
use ow_core::wallet::{BackendStatus, Network, WalletError, WalletHandle, WalletState};

use super::comms::CommsConfigFactory;
use crate::usecases::transport::TransportControl;

pub struct WalletLifecycleCoordinatorDeps {
    pub transport: Arc<dyn TransportControl>,
    pub backend: Arc<dyn WalletBackendPort>,
    pub settings: Arc<dyn SettingsPort>,
    pub passphrase: Arc<dyn PassphrasePort>,
    pub comms: CommsConfigFactory,
}

pub struct WalletLifecycleCoordinator {
    transport: Arc<dyn TransportControl>,
    backend: Arc<dyn WalletBackendPort>,
    settings: Arc<dyn SettingsPort>,
    passphrase: Arc<dyn PassphrasePort>,
    comms: CommsConfigFactory,
    state_tx: watch::Sender<WalletState>,
    handle: Mutex<Option<WalletHandle>>,
    start_gate: Mutex<()>,
    /// Bumped by every disconnect, under the `handle` lock. A start that
    /// sees a different value when it finishes was cancelled.
    epoch_tx: watch::Sender<u64>,
    disconnection_disabled: AtomicBool,
}

impl WalletLifecycleCoordinator {
    pub fn new(deps: WalletLifecycleCoordinatorDeps) -> Self {
        let WalletLifecycleCoordinatorDeps {
            transport,
            backend,
            settings,
            passphrase,
            comms,
        } = deps;

        let (state_tx, _) = watch::channel(WalletState::NotReady);
        let (epoch_tx, _) = watch::channel(0);

        Self {
            transport,
            backend,
            settings,
            passphrase,
            comms,
            state_tx,
            handle: Mutex::new(None),
            start_gate: Mutex::new(()),
            epoch_tx,
            disconnection_disabled: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> WalletState {
        self.state_tx.borrow().clone()
    }

    pub fn backend_status(&self) -> watch::Receiver<BackendStatus> {
        self.backend.status()
    }

    /// Keep the wallet and transport alive across background signals, e.g.
    /// during a long recovery.
    pub fn set_disconnection_disabled(&self, disabled: bool) {
        self.disconnection_disabled.store(disabled, Ordering::SeqCst);
        info!(disabled, "wallet disconnection flag updated");
    }

    pub fn is_disconnection_disabled(&self) -> bool {
        self.disconnection_disabled.load(Ordering::SeqCst)
    }

    /// Suspend until the transport reports `PortsOpen` or `Connected`.
    pub async fn wait_for_transport_ready(&self) -> Result<TransportSnapshot, WalletError> {
        let mut rx = self.transport.subscribe();
        let snapshot = rx
            .wait_for(|snapshot| snapshot.is_ready())
            .await
            .map_err(|_| WalletError::TransportUnavailable)?
            .clone();
        Ok(snapshot)
    }

    /// Connect the wallet backend once the transport is ready.
    ///
    /// Only one start runs at a time; a concurrent call fails with
    /// [`WalletError::StartInProgress`]. A disconnect while waiting or
    /// connecting cancels the start with [`WalletError::Cancelled`].
    pub async fn start_wallet(&self) -> Result<WalletHandle, WalletError> {
        let span = info_span!("usecase.wallet.start");

        async {
            let _gate = self
                .start_gate
                .try_lock()
                .map_err(|_| WalletError::StartInProgress)?;

            if let Some(handle) = self.handle.lock().await.clone() {
                debug!(wallet = %handle.id, "wallet already started");
                return Ok(handle);
            }

            let mut epoch_rx = self.epoch_tx.subscribe();
            let epoch = *epoch_rx.borrow();

            let transport = tokio::select! {
                ready = self.wait_for_transport_ready() => ready?,
                _ = epoch_rx.changed() => {
                    debug!("wallet disconnected while waiting for the transport");
                    return Err(WalletError::Cancelled);
                }
            };
            debug!(status = ?transport.status, "transport ready, connecting wallet");
            self.state_tx.send_replace(WalletState::Starting);

            let result = self.connect_backend().await;

            let mut slot = self.handle.lock().await;
            if *self.epoch_tx.borrow() != epoch {
                self.state_tx.send_replace(WalletState::NotReady);
                drop(slot);
                if let Ok(handle) = result {
                    info!(wallet = %handle.id, "wallet disconnected while connecting, closing new session");
                    if let Err(err) = self.backend.disconnect(handle).await {
                        warn!(error = %err, "closing cancelled wallet session failed");
                    }
                }
                return Err(WalletError::Cancelled);
            }

            match result {
                Ok(handle) => {
                    *slot = Some(handle.clone());
                    self.state_tx.send_replace(WalletState::Started);
                    info!(wallet = %handle.id, network = %handle.network, "wallet started");
                    Ok(handle)
                }
                Err(err) => {
                    warn!(error = %err, "wallet start failed");
                    self.state_tx.send_replace(WalletState::StartFailed(err.clone()));
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn connect_backend(&self) -> Result<WalletHandle, WalletError> {
        let settings = self.settings.load().await?;
        let network = settings.wallet.selected_network;
        let passphrase = self.passphrase.load().await?;
        let config = self.comms.build(network, passphrase);

        let first_attempt = self.backend.connect(&config).await;
        match first_attempt {
            Err(WalletError::BadPassphrase) if config.passphrase.is_some() => {
                warn!(%network, "wallet rejected stored passphrase, retrying without one");
                self.backend.connect(&config.without_passphrase()).await
            }
            result => result,
        }
    }

    /// Disconnect the backend and return to `NotReady`. Also cancels a
    /// start that is still running.
    ///
    /// The state is `NotReady` afterwards even when the backend reports an
    /// error; the handle is not kept.
    pub async fn disconnect_wallet(&self) -> anyhow::Result<()> {
        let handle = {
            let mut slot = self.handle.lock().await;
            self.epoch_tx.send_modify(|epoch| *epoch += 1);
            self.state_tx.send_replace(WalletState::NotReady);
            slot.take()
        };

        if let Some(handle) = handle {
            info!(wallet = %handle.id, "disconnecting wallet");
            self.backend.disconnect(handle).await?;
        }
        Ok(())
    }

    /// App entered the foreground: bring the transport up, then reconnect
    /// the wallet if auto-reconnect is on and the backend is offline.
    ///
    /// A failed transport start is returned as
    /// [`WalletError::TransportUnavailable`] without touching the wallet.
    pub async fn on_foreground(&self) -> Result<(), WalletError> {
        let span = info_span!("usecase.wallet.foreground");

        async {
            if let Err(err) = self.transport.start().await {
                warn!(error = %err, "transport start on foreground failed");
                return Err(WalletError::TransportUnavailable);
            }

            let settings = self.settings.load().await?;
            if !settings.wallet.auto_reconnect {
                debug!("auto-reconnect disabled, leaving wallet down");
                return Ok(());
            }
            if self.backend.status().borrow().is_connected() {
                debug!("wallet backend already connected");
                return Ok(());
            }

            match self.start_wallet().await {
                Ok(_) | Err(WalletError::StartInProgress) => Ok(()),
                Err(err) => Err(err),
            }
        }
        .instrument(span)
        .await
    }

    /// App entered the background: drop the wallet and the transport unless
    /// disconnection is disabled. The transport is stopped even when the
    /// wallet disconnect fails.
    pub async fn on_background(&self) -> anyhow::Result<()> {
        let span = info_span!("usecase.wallet.background");

        async {
            if self.is_disconnection_disabled() {
                info!("disconnection disabled, keeping wallet and transport up");
                return Ok(());
            }

            let wallet = self.disconnect_wallet().await;
            if let Err(err) = &wallet {
                warn!(error = %err, "wallet disconnect failed, stopping transport anyway");
            }
            self.transport.stop().await?;
            wallet
        }
        .instrument(span)
        .await
    }

    /// Switch the active network. The wallet is disconnected first and is
    /// not reconnected.
    pub async fn select_network(&self, network: Network) -> anyhow::Result<()> {
        let span = info_span!("usecase.wallet.select_network", %network);

        async {
            self.disconnect_wallet().await?;

            let mut settings = self.settings.load().await?;
            settings.wallet.selected_network = network;
            self.settings.save(&settings).await?;

            info!("wallet network selected");
            Ok(())
        }
        .instrument(span)
        .await
    }
}
