//! Lifecycle use cases
//!
//! ```text
//! start()/stop() ──► TransportOrchestrator ──► process / control channel ports
//!                          │ watch<TransportSnapshot>
//!                          ▼
//!              WalletLifecycleCoordinator ──► wallet backend port
//! ```

pub mod apply_bridges;
pub mod transport;
pub mod wallet;

pub use apply_bridges::{ApplyBridgeConfiguration, ApplyBridgesError};
pub use transport::{
    ControlChannelClient, RetryScheduler, TransportControl, TransportOptions,
    TransportOrchestrator, TransportOrchestratorDeps,
};
pub use wallet::{CommsConfigFactory, WalletLifecycleCoordinator, WalletLifecycleCoordinatorDeps};
