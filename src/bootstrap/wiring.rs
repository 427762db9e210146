//! # Dependency Injection
//!
//! The only place that depends on `ow-infra`, `ow-platform` and `ow-app` at
//! once. It assembles; it does not decide.

use std::sync::Arc;

use ow_app::usecases::{
    ApplyBridgeConfiguration, CommsConfigFactory, TransportControl, TransportOptions,
    TransportOrchestrator, TransportOrchestratorDeps, WalletLifecycleCoordinator,
    WalletLifecycleCoordinatorDeps,
};
use ow_core::config::AppConfig;
use ow_core::ports::{SettingsPort, WalletBackendPort};
use ow_infra::{FilePassphraseStore, FileSettingsRepository};
use ow_platform::{
    ExecPluggableTransports, LocalNetworkProbe, TorControlConnector, TorProcess,
};

use crate::adapters::SocksCheckWalletBackend;

/// Result type for wiring operations
pub type WiringResult<T> = Result<T, WiringError>;

/// Errors during dependency injection
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("Data directory initialization failed: {0}")]
    DataDirInit(String),
}

/// Fully assembled use cases, shared by the command loop.
pub struct AppRuntime {
    pub transport: TransportOrchestrator,
    pub wallet: Arc<WalletLifecycleCoordinator>,
    pub apply_bridges: ApplyBridgeConfiguration,
}

pub fn wire_dependencies(config: &AppConfig) -> WiringResult<AppRuntime> {
    std::fs::create_dir_all(&config.data_dir).map_err(|e| {
        WiringError::DataDirInit(format!("{}: {e}", config.data_dir.display()))
    })?;

    let backend: Arc<dyn WalletBackendPort> = Arc::new(SocksCheckWalletBackend::new());
    wire_with_backend(config, backend)
}

/// Wire everything around the given wallet backend.
pub fn wire_with_backend(
    config: &AppConfig,
    backend: Arc<dyn WalletBackendPort>,
) -> WiringResult<AppRuntime> {
    let settings: Arc<dyn SettingsPort> =
        Arc::new(FileSettingsRepository::new(config.settings_path()));

    let transport = TransportOrchestrator::new(TransportOrchestratorDeps {
        process: Arc::new(TorProcess::new(
            config.tor_binary.clone(),
            config.transport_config(),
        )),
        pluggable: Arc::new(ExecPluggableTransports::new(
            config.pluggable_transport_binary.clone(),
        )),
        connector: Arc::new(TorControlConnector::new()),
        probe: Arc::new(LocalNetworkProbe::new()),
        settings: settings.clone(),
        options: TransportOptions::from_app_config(config),
    });
    let transport_control: Arc<dyn TransportControl> = Arc::new(transport.clone());

    let wallet = Arc::new(WalletLifecycleCoordinator::new(
        WalletLifecycleCoordinatorDeps {
            transport: transport_control.clone(),
            backend,
            settings: settings.clone(),
            passphrase: Arc::new(FilePassphraseStore::new(config.passphrase_path())),
            comms: CommsConfigFactory::from_app_config(config),
        },
    ));

    let apply_bridges = ApplyBridgeConfiguration::new(settings, transport_control);

    Ok(AppRuntime {
        transport,
        wallet,
        apply_bridges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ow_core::transport::TransportStatus;
    use ow_core::wallet::WalletState;

    #[tokio::test]
    async fn wiring_creates_the_data_dir_and_starts_idle() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::with_system_defaults(dir.path().join("data"));

        let runtime = wire_dependencies(&config).unwrap();

        assert!(config.data_dir.is_dir());
        assert_eq!(
            runtime.transport.snapshot().status,
            TransportStatus::Disconnected
        );
        assert_eq!(runtime.wallet.state(), WalletState::NotReady);
        assert!(!runtime.wallet.is_disconnection_disabled());
    }
}
