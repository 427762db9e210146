//! Port interfaces for the application layer
//!
//! Ports define the contract between the lifecycle use cases and the
//! platform/infra adapters that drive the proxy process, its control
//! channel, persisted settings and the wallet backend.

pub mod app_dirs;
pub mod control_channel;
pub mod errors;
pub mod network_probe;
pub mod passphrase;
pub mod pluggable;
pub mod settings;
pub mod transport_process;
pub mod wallet_backend;

pub use app_dirs::AppDirsPort;
pub use control_channel::{ControlChannelConnectorPort, ControlChannelPort};
pub use errors::AppDirsError;
pub use network_probe::NetworkProbePort;
pub use passphrase::PassphrasePort;
pub use pluggable::PluggableTransportPort;
pub use settings::{SettingsMigrationPort, SettingsPort};
pub use transport_process::TransportProcessPort;
pub use wallet_backend::WalletBackendPort;
