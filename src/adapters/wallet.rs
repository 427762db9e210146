//! Stand-in wallet backend.
//!
//! No wallet library is linked into the daemon yet. This adapter does the
//! parts of a connect that only depend on the transport: it prepares the
//! database directory and checks that the SOCKS endpoint accepts
//! connections, then reports itself online.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{info, info_span, warn, Instrument};

use ow_core::ports::WalletBackendPort;
use ow_core::wallet::{
    BackendConnectivity, BackendStatus, CommsConfig, SyncStatus, WalletError, WalletHandle,
};

const SOCKS_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SocksCheckWalletBackend {
    status_tx: watch::Sender<BackendStatus>,
    connect_timeout: Duration,
}

impl Default for SocksCheckWalletBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SocksCheckWalletBackend {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(BackendStatus::default());
        Self {
            status_tx,
            connect_timeout: SOCKS_CONNECT_TIMEOUT,
        }
    }

    fn set_connectivity(&self, connectivity: BackendConnectivity) {
        self.status_tx.send_modify(|status| {
            status.connectivity = connectivity;
            if connectivity == BackendConnectivity::Offline {
                status.sync = SyncStatus::Idle;
            }
        });
    }

    async fn open(&self, config: &CommsConfig) -> Result<WalletHandle, WalletError> {
        tokio::fs::create_dir_all(&config.database_dir)
            .await
            .map_err(|e| {
                WalletError::Backend(format!(
                    "create wallet database dir {} failed: {e}",
                    config.database_dir.display()
                ))
            })?;

        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(config.socks_endpoint))
            .await
        {
            Ok(Ok(_stream)) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "SOCKS endpoint refused the wallet");
                return Err(WalletError::TransportUnavailable);
            }
            Err(_) => {
                warn!(timeout = ?self.connect_timeout, "SOCKS endpoint did not answer");
                return Err(WalletError::TransportUnavailable);
            }
        }

        info!(
            database = %config.database_name,
            public_address = %config.public_address,
            has_passphrase = config.passphrase.is_some(),
            "wallet comms ready"
        );
        Ok(WalletHandle::new(config.network))
    }
}

#[async_trait]
impl WalletBackendPort for SocksCheckWalletBackend {
    async fn connect(&self, config: &CommsConfig) -> Result<WalletHandle, WalletError> {
        let span = info_span!(
            "adapter.wallet.connect",
            network = %config.network,
            socks = %config.socks_endpoint
        );

        async {
            self.set_connectivity(BackendConnectivity::Connecting);
            let result = self.open(config).await;
            self.set_connectivity(if result.is_ok() {
                BackendConnectivity::Online
            } else {
                BackendConnectivity::Offline
            });
            result
        }
        .instrument(span)
        .await
    }

    async fn disconnect(&self, handle: WalletHandle) -> anyhow::Result<()> {
        self.set_connectivity(BackendConnectivity::Offline);
        info!(network = %handle.network, id = %handle.id, "wallet disconnected");
        Ok(())
    }

    fn status(&self) -> watch::Receiver<BackendStatus> {
        self.status_tx.subscribe()
    }
}
