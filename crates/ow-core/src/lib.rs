//! # ow-core
//!
//! Domain models and port interfaces for OnionWallet.
//!
//! This crate holds the transport and wallet lifecycle state machines and the
//! traits the application layer depends on. It performs no I/O.

pub mod app_dirs;
pub mod config;
pub mod ports;
pub mod security;
pub mod settings;
pub mod transport;
pub mod wallet;

pub use app_dirs::AppDirs;
pub use config::AppConfig;
pub use security::SecretString;
pub use settings::Settings;
pub use transport::{TransportError, TransportSnapshot, TransportStatus};
pub use wallet::{Network, WalletError, WalletState};
