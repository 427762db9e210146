//! # ow-platform
//!
//! Platform-specific implementations for OnionWallet.
//!
//! This crate contains the adapters that talk to the operating system: the
//! proxy child process, its control port, local network interfaces and the
//! per-user application directories.

pub mod app_dirs;
pub mod net_probe;
pub mod pluggable;
pub mod tor;

pub use app_dirs::DirsAppDirsAdapter;
pub use net_probe::LocalNetworkProbe;
pub use pluggable::ExecPluggableTransports;
pub use tor::{TorControlChannel, TorControlConnector, TorProcess};
