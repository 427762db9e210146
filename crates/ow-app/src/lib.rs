//! OnionWallet application orchestration layer
//!
//! Transport and wallet lifecycle use cases, written against the ports in
//! `ow-core`.

pub mod usecases;

pub use usecases::{
    ApplyBridgeConfiguration, CommsConfigFactory, TransportControl, TransportOptions,
    TransportOrchestrator, TransportOrchestratorDeps, WalletLifecycleCoordinator,
    WalletLifecycleCoordinatorDeps,
};
